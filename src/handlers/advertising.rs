use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    handlers::{current_user, posts::fetch_post},
    models::advertising::{
        AdListParams, AdSize, Advertisement, CreateAdvertisementRequest,
        CreateFeaturedListingRequest, FeaturedListing, FeaturedPost, UpdateAdvertisementRequest,
    },
    services::capability::{self, Capability},
    utils::jwt::Claims,
};

/// Live ads only, optionally for one slot.
pub async fn list_ads(
    State(pool): State<PgPool>,
    Query(params): Query<AdListParams>,
) -> Result<impl IntoResponse, AppError> {
    let ads = sqlx::query_as::<_, Advertisement>(
        r#"
        SELECT * FROM advertisements
        WHERE is_active
          AND start_date <= NOW()
          AND (end_date IS NULL OR end_date > NOW())
          AND ($1::ad_position IS NULL OR position = $1)
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(params.position)
    .fetch_all(&pool)
    .await?;

    Ok(Json(ads))
}

pub async fn create_ad(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateAdvertisementRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let admin = current_user(&pool, &claims).await?;
    capability::require(&admin, Capability::ManageAdvertising)?;

    let start_date = payload.start_date.unwrap_or_else(Utc::now);
    if payload.end_date.is_some_and(|end| end <= start_date) {
        return Err(AppError::BadRequest(
            "End date must be after the start date".to_string(),
        ));
    }

    let ad = sqlx::query_as::<_, Advertisement>(
        r#"
        INSERT INTO advertisements (
            title, description, image_url, target_url, sponsor, sponsor_email,
            position, size, start_date, end_date, monthly_rate
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING *
        "#,
    )
    .bind(payload.title.trim())
    .bind(payload.description.trim())
    .bind(payload.image_url.as_deref())
    .bind(&payload.target_url)
    .bind(payload.sponsor.trim())
    .bind(&payload.sponsor_email)
    .bind(payload.position)
    .bind(payload.size.unwrap_or(AdSize::Medium))
    .bind(start_date)
    .bind(payload.end_date)
    .bind(payload.monthly_rate)
    .fetch_one(&pool)
    .await?;

    tracing::info!(ad_id = ad.id, admin_id = admin.id, "advertisement created");

    Ok((StatusCode::CREATED, Json(ad)))
}

pub async fn update_ad(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateAdvertisementRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let admin = current_user(&pool, &claims).await?;
    capability::require(&admin, Capability::ManageAdvertising)?;

    let existing = sqlx::query_as::<_, Advertisement>("SELECT * FROM advertisements WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Advertisement not found".to_string()))?;

    if payload.end_date.is_some_and(|end| end <= existing.start_date) {
        return Err(AppError::BadRequest(
            "End date must be after the start date".to_string(),
        ));
    }

    let ad = sqlx::query_as::<_, Advertisement>(
        r#"
        UPDATE advertisements
        SET title = COALESCE($2, title),
            description = COALESCE($3, description),
            image_url = COALESCE($4, image_url),
            target_url = COALESCE($5, target_url),
            position = COALESCE($6, position),
            size = COALESCE($7, size),
            is_active = COALESCE($8, is_active),
            end_date = COALESCE($9, end_date),
            monthly_rate = COALESCE($10, monthly_rate),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(payload.title.as_deref().map(str::trim))
    .bind(payload.description.as_deref().map(str::trim))
    .bind(payload.image_url.as_deref())
    .bind(payload.target_url.as_deref())
    .bind(payload.position)
    .bind(payload.size)
    .bind(payload.is_active)
    .bind(payload.end_date)
    .bind(payload.monthly_rate)
    .fetch_one(&pool)
    .await?;

    tracing::info!(ad_id = id, admin_id = admin.id, "advertisement updated");

    Ok(Json(ad))
}

async fn live_ad(pool: &PgPool, id: i64) -> Result<Advertisement, AppError> {
    sqlx::query_as::<_, Advertisement>("SELECT * FROM advertisements WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .filter(|ad| ad.is_live(Utc::now()))
        .ok_or(AppError::NotFound("Advertisement not found".to_string()))
}

pub async fn record_impression(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    live_ad(&pool, id).await?;

    sqlx::query("UPDATE advertisements SET impressions = impressions + 1 WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Counts the click and hands back the URL to redirect to.
pub async fn record_click(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let ad = live_ad(&pool, id).await?;

    sqlx::query("UPDATE advertisements SET clicks = clicks + 1 WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    Ok(Json(json!({ "target_url": ad.target_url })))
}

/// Currently featured listings, soonest to expire last.
pub async fn list_featured(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let featured = sqlx::query_as::<_, FeaturedPost>(
        r#"
        SELECT f.*, p.title, p.price, p.location
        FROM featured_listings f
        JOIN posts p ON p.id = f.post_id
        WHERE f.is_active AND f.featured_until > NOW() AND p.is_active
        ORDER BY f.featured_until DESC, f.id DESC
        "#,
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(featured))
}

/// Features a post until a given time. The post's author is the sponsor.
pub async fn create_featured(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateFeaturedListingRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let admin = current_user(&pool, &claims).await?;
    capability::require(&admin, Capability::ManageAdvertising)?;

    if payload.featured_until <= Utc::now() {
        return Err(AppError::BadRequest(
            "Featured until must be in the future".to_string(),
        ));
    }

    let post = fetch_post(&pool, payload.post_id).await?;

    let listing = sqlx::query_as::<_, FeaturedListing>(
        r#"
        INSERT INTO featured_listings (post_id, sponsor_id, featured_until, daily_rate)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(post.id)
    .bind(post.author_id)
    .bind(payload.featured_until)
    .bind(payload.daily_rate)
    .fetch_one(&pool)
    .await?;

    tracing::info!(post_id = post.id, admin_id = admin.id, "listing featured");

    Ok((StatusCode::CREATED, Json(listing)))
}
