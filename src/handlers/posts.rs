use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{Duration, Utc};
use sqlx::{PgPool, types::Json as SqlJson};
use validator::Validate;

use crate::{
    error::AppError,
    handlers::current_user,
    models::{
        post::{
            CreatePostRequest, ModeratePostRequest, POST_COLUMNS, Post, PostListParams,
            PostSummary, UpdatePostRequest, validate_images,
        },
        reply::{CreateReplyRequest, Reply, ReplyResponse},
    },
    services::{
        bump::{BUMP_COOLDOWN_HOURS, BumpRejection, check_bump},
        capability::{self, Capability},
        listing::{LISTING_ORDER_SQL, toggle_pin},
    },
    utils::{html::clean_text_field, jwt::Claims},
};

/// `SELECT ... FROM` prefix yielding `PostSummary` rows.
fn summary_select() -> String {
    format!(
        r#"
        SELECT {POST_COLUMNS}, u.username AS author_username, c.slug AS category_slug
        FROM posts p
        JOIN users u ON u.id = p.author_id
        JOIN categories c ON c.id = p.category_id
        "#
    )
}

pub(crate) async fn fetch_post(pool: &PgPool, id: i64) -> Result<Post, AppError> {
    let sql = format!("SELECT {POST_COLUMNS} FROM posts p WHERE p.id = $1");
    sqlx::query_as::<_, Post>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Post not found".to_string()))
}

fn sanitized_body(content: &str) -> Result<String, AppError> {
    let cleaned = clean_text_field(content);
    if cleaned.is_empty() {
        return Err(AppError::BadRequest("Content cannot be empty".to_string()));
    }
    Ok(cleaned)
}

/// Active posts in listing order: pinned first, then most recently bumped
/// (or created). Optional `category` slug filter and offset pagination.
pub async fn list_posts(
    State(pool): State<PgPool>,
    Query(params): Query<PostListParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params.limit.unwrap_or(50).clamp(1, 100);
    let offset = params.offset.unwrap_or(0).max(0);

    let sql = format!(
        r#"
        {}
        WHERE p.is_active
          AND ($1::TEXT IS NULL OR c.slug = $1)
        ORDER BY {LISTING_ORDER_SQL}
        LIMIT $2 OFFSET $3
        "#,
        summary_select()
    );
    let posts = sqlx::query_as::<_, PostSummary>(&sql)
        .bind(params.category.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list posts: {:?}", e);
            AppError::from(e)
        })?;

    Ok(Json(posts))
}

/// Active posts by one author, in listing order.
pub async fn list_user_posts(
    State(pool): State<PgPool>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let sql = format!(
        "{} WHERE p.author_id = $1 AND p.is_active ORDER BY {LISTING_ORDER_SQL}",
        summary_select()
    );
    let posts = sqlx::query_as::<_, PostSummary>(&sql)
        .bind(user_id)
        .fetch_all(&pool)
        .await?;

    Ok(Json(posts))
}

/// Get a single active post by ID and count the view.
pub async fn get_post(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let counted = sqlx::query("UPDATE posts SET views = views + 1 WHERE id = $1 AND is_active")
        .bind(id)
        .execute(&pool)
        .await?;

    if counted.rows_affected() == 0 {
        return Err(AppError::NotFound("Post not found".to_string()));
    }

    let sql = format!("{} WHERE p.id = $1", summary_select());
    let post = sqlx::query_as::<_, PostSummary>(&sql)
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Post not found".to_string()))?;

    Ok(Json(post))
}

/// Create a new listing. `bumped_at` starts at the creation time, so the
/// first bump becomes available a full cooldown later.
pub async fn create_post(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let images = payload.images.unwrap_or_default();
    validate_images(&images).map_err(AppError::BadRequest)?;

    let content = sanitized_body(&payload.content)?;
    let user = current_user(&pool, &claims).await?;

    let category_exists: Option<i64> = sqlx::query_scalar("SELECT id FROM categories WHERE id = $1")
        .bind(payload.category_id)
        .fetch_optional(&pool)
        .await?;
    if category_exists.is_none() {
        return Err(AppError::BadRequest("Unknown category".to_string()));
    }

    let sql = format!(
        r#"
        INSERT INTO posts AS p (
            title, content, author_id, category_id, price, location, contact_info,
            images, willing_to_travel, willing_to_ship, willing_to_trade,
            created_at, updated_at, bumped_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NOW(), NOW(), NOW())
        RETURNING {POST_COLUMNS}
        "#
    );
    let post = sqlx::query_as::<_, Post>(&sql)
        .bind(payload.title.trim())
        .bind(&content)
        .bind(user.id)
        .bind(payload.category_id)
        .bind(payload.price)
        .bind(payload.location.as_deref())
        .bind(payload.contact_info.as_deref())
        .bind(SqlJson(images))
        .bind(payload.willing_to_travel.unwrap_or(false))
        .bind(payload.willing_to_ship.unwrap_or(false))
        .bind(payload.willing_to_trade.unwrap_or(false))
        .fetch_one(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create post: {:?}", e);
            AppError::from(e)
        })?;

    tracing::info!(post_id = post.id, author_id = user.id, "post created");

    Ok((StatusCode::CREATED, Json(post)))
}

/// Owner edit. Absent fields are left unchanged.
pub async fn update_post(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    if let Some(images) = &payload.images {
        validate_images(images).map_err(AppError::BadRequest)?;
    }
    let content = payload.content.as_deref().map(sanitized_body).transpose()?;

    let user = current_user(&pool, &claims).await?;
    let post = fetch_post(&pool, id).await?;

    if post.author_id != user.id {
        return Err(AppError::Forbidden("You can only edit your own posts".to_string()));
    }

    if payload.is_active == Some(true) && !post.is_active {
        let moderated_by: Option<i64> =
            sqlx::query_scalar("SELECT moderated_by FROM posts WHERE id = $1")
                .bind(id)
                .fetch_one(&pool)
                .await?;
        if moderated_by.is_some() {
            return Err(AppError::Forbidden(
                "This post was deactivated by a moderator".to_string(),
            ));
        }
    }

    let sql = format!(
        r#"
        UPDATE posts p
        SET title = COALESCE($2, p.title),
            content = COALESCE($3, p.content),
            category_id = COALESCE($4, p.category_id),
            price = COALESCE($5, p.price),
            location = COALESCE($6, p.location),
            contact_info = COALESCE($7, p.contact_info),
            images = COALESCE($8, p.images),
            is_active = COALESCE($9, p.is_active),
            willing_to_travel = COALESCE($10, p.willing_to_travel),
            willing_to_ship = COALESCE($11, p.willing_to_ship),
            willing_to_trade = COALESCE($12, p.willing_to_trade),
            updated_at = NOW()
        WHERE p.id = $1
        RETURNING {POST_COLUMNS}
        "#
    );
    let updated = sqlx::query_as::<_, Post>(&sql)
        .bind(id)
        .bind(payload.title.as_deref().map(str::trim))
        .bind(content)
        .bind(payload.category_id)
        .bind(payload.price)
        .bind(payload.location.as_deref())
        .bind(payload.contact_info.as_deref())
        .bind(payload.images.map(SqlJson))
        .bind(payload.is_active)
        .bind(payload.willing_to_travel)
        .bind(payload.willing_to_ship)
        .bind(payload.willing_to_trade)
        .fetch_one(&pool)
        .await
        .map_err(|e| {
            // Foreign key violation on category_id.
            if e.as_database_error().and_then(|d| d.code()).is_some_and(|c| c == "23503") {
                AppError::BadRequest("Unknown category".to_string())
            } else {
                AppError::from(e)
            }
        })?;

    Ok(Json(updated))
}

/// Move the caller's own post back to the top, at most once per cooldown.
pub async fn bump_post(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user = current_user(&pool, &claims).await?;
    let post = fetch_post(&pool, id).await?;
    let now = Utc::now();

    check_bump(post.author_id, post.bumped_at, user.id, now).map_err(|rejection| {
        tracing::info!(post_id = id, user_id = user.id, %rejection, "bump rejected");
        match rejection {
            BumpRejection::NotOwner => AppError::Forbidden(rejection.to_string()),
            BumpRejection::Cooldown { .. } => AppError::BadRequest(rejection.to_string()),
        }
    })?;

    // The cooldown is re-checked in the update, so of two racing bumps only one lands.
    let sql = format!(
        r#"
        UPDATE posts p
        SET bumped_at = $2
        WHERE p.id = $1
          AND p.author_id = $3
          AND (p.bumped_at IS NULL OR p.bumped_at <= $4)
        RETURNING {POST_COLUMNS}
        "#
    );
    let bumped = sqlx::query_as::<_, Post>(&sql)
        .bind(id)
        .bind(now)
        .bind(user.id)
        .bind(now - Duration::hours(BUMP_COOLDOWN_HOURS))
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::Conflict("This post was just bumped".to_string()))?;

    tracing::info!(post_id = id, user_id = user.id, "post bumped");

    Ok(Json(bumped))
}

/// Pin or unpin a post. Moderators and admins only.
pub async fn toggle_pin_post(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let moderator = current_user(&pool, &claims).await?;
    capability::require(&moderator, Capability::PinPost)?;

    let post = fetch_post(&pool, id).await?;
    let pin = toggle_pin(post.is_pinned, Utc::now());

    let sql = format!(
        r#"
        UPDATE posts p
        SET is_pinned = $2, pinned_at = $3, updated_at = NOW()
        WHERE p.id = $1
        RETURNING {POST_COLUMNS}
        "#
    );
    let updated = sqlx::query_as::<_, Post>(&sql)
        .bind(id)
        .bind(pin.is_pinned)
        .bind(pin.pinned_at)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Post not found".to_string()))?;

    tracing::info!(post_id = id, moderator_id = moderator.id, pinned = pin.is_pinned, "pin toggled");

    Ok(Json(updated))
}

/// Soft (de)activation by a moderator. A deactivated post records who pulled
/// it, which keeps its owner from reactivating it.
pub async fn moderate_post(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<ModeratePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    let moderator = current_user(&pool, &claims).await?;
    capability::require(&moderator, Capability::ModeratePost)?;

    let sql = format!(
        r#"
        UPDATE posts p
        SET is_active = $2,
            moderated_by = CASE WHEN $2 THEN NULL ELSE $3 END,
            updated_at = NOW()
        WHERE p.id = $1
        RETURNING {POST_COLUMNS}
        "#
    );
    let updated = sqlx::query_as::<_, Post>(&sql)
        .bind(id)
        .bind(payload.is_active)
        .bind(moderator.id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Post not found".to_string()))?;

    tracing::info!(
        post_id = id,
        moderator_id = moderator.id,
        is_active = payload.is_active,
        "post moderated"
    );

    Ok(Json(updated))
}

/// Hard delete by a moderator. Replies and featured rows cascade.
pub async fn delete_post(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let moderator = current_user(&pool, &claims).await?;
    capability::require(&moderator, Capability::ModeratePost)?;

    let result = sqlx::query("DELETE FROM posts WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete post: {:?}", e);
            AppError::from(e)
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Post not found".to_string()));
    }

    tracing::info!(post_id = id, moderator_id = moderator.id, "post deleted");

    Ok(Json(serde_json::json!({ "message": "Post deleted successfully" })))
}

/// Replies to an active post, oldest first.
pub async fn list_replies(
    State(pool): State<PgPool>,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let post = fetch_post(&pool, post_id).await?;
    if !post.is_active {
        return Err(AppError::NotFound("Post not found".to_string()));
    }

    let replies = sqlx::query_as::<_, ReplyResponse>(
        r#"
        SELECT r.id, r.post_id, r.author_id, u.username AS author_username,
               u.profile_picture AS author_profile_picture, r.content, r.created_at
        FROM replies r
        JOIN users u ON u.id = r.author_id
        WHERE r.post_id = $1
        ORDER BY r.created_at ASC, r.id ASC
        "#,
    )
    .bind(post_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(replies))
}

pub async fn create_reply(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<i64>,
    Json(payload): Json<CreateReplyRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let content = sanitized_body(&payload.content)?;

    let user = current_user(&pool, &claims).await?;
    let post = fetch_post(&pool, post_id).await?;
    if !post.is_active {
        return Err(AppError::BadRequest("This post is no longer active".to_string()));
    }

    let reply = sqlx::query_as::<_, Reply>(
        r#"
        INSERT INTO replies (post_id, author_id, content)
        VALUES ($1, $2, $3)
        RETURNING id, post_id, author_id, content, created_at
        "#,
    )
    .bind(post_id)
    .bind(user.id)
    .bind(&content)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(reply)))
}
