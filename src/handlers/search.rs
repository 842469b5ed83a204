use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::{
        post::{POST_COLUMNS, PostSummary},
        user::PublicUser,
    },
    services::listing::LISTING_ORDER_SQL,
};

const MAX_RESULTS: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResults {
    pub posts: Vec<PostSummary>,
    pub users: Vec<PublicUser>,
}

#[derive(Debug, Serialize)]
pub struct SiteStats {
    pub total_members: i64,
    pub active_listings: i64,
    pub posts_today: i64,
}

/// Escapes `LIKE` wildcards so the term matches literally.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Case-insensitive search over active posts and non-suspended users.
pub async fn search(
    State(pool): State<PgPool>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, AppError> {
    let term = params.q.as_deref().map(str::trim).unwrap_or_default();
    if term.is_empty() {
        return Err(AppError::BadRequest("Search query is required".to_string()));
    }
    let pattern = like_pattern(term);

    let sql = format!(
        r#"
        SELECT {POST_COLUMNS}, u.username AS author_username, c.slug AS category_slug
        FROM posts p
        JOIN users u ON u.id = p.author_id
        JOIN categories c ON c.id = p.category_id
        WHERE p.is_active
          AND (p.title ILIKE $1 OR p.content ILIKE $1 OR p.location ILIKE $1)
        ORDER BY {LISTING_ORDER_SQL}
        LIMIT $2
        "#
    );
    let posts = sqlx::query_as::<_, PostSummary>(&sql)
        .bind(&pattern)
        .bind(MAX_RESULTS)
        .fetch_all(&pool)
        .await?;

    let users = sqlx::query_as::<_, PublicUser>(
        r#"
        SELECT id, username, first_name, last_name, location, bio, profile_picture,
               is_verified, created_at
        FROM users
        WHERE NOT is_suspended
          AND (username ILIKE $1 OR first_name ILIKE $1 OR last_name ILIKE $1 OR location ILIKE $1)
        ORDER BY username ASC
        LIMIT $2
        "#,
    )
    .bind(&pattern)
    .bind(MAX_RESULTS)
    .fetch_all(&pool)
    .await?;

    tracing::debug!(term, posts = posts.len(), users = users.len(), "search");

    Ok(Json(SearchResults { posts, users }))
}

/// Front page counters.
pub async fn stats(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let midnight = Utc::now()
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|t| t.and_utc())
        .ok_or(AppError::InternalServerError("Invalid date".to_string()))?;

    let total_members: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&pool)
        .await?;
    let active_listings: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE is_active")
        .fetch_one(&pool)
        .await?;
    let posts_today: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE created_at >= $1")
        .bind(midnight)
        .fetch_one(&pool)
        .await?;

    Ok(Json(SiteStats {
        total_members,
        active_listings,
        posts_today,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcards_are_escaped() {
        assert_eq!(like_pattern("glock"), "%glock%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
    }
}
