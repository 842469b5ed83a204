use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::category::{Category, CategoryPostCount},
};

/// All categories, grouped by listing type.
pub async fn list_categories(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let categories = sqlx::query_as::<_, Category>(
        "SELECT id, name, slug, type, description, icon FROM categories ORDER BY type, id",
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(categories))
}

/// Number of active posts in every category that has any.
pub async fn category_post_counts(
    State(pool): State<PgPool>,
) -> Result<impl IntoResponse, AppError> {
    let counts = sqlx::query_as::<_, CategoryPostCount>(
        r#"
        SELECT category_id, COUNT(*) AS post_count
        FROM posts
        WHERE is_active
        GROUP BY category_id
        ORDER BY category_id
        "#,
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(counts))
}

pub async fn get_category(
    State(pool): State<PgPool>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let category = sqlx::query_as::<_, Category>(
        "SELECT id, name, slug, type, description, icon FROM categories WHERE slug = $1",
    )
    .bind(&slug)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Category not found".to_string()))?;

    Ok(Json(category))
}
