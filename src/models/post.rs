use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use url::Url;
use validator::Validate;

pub const MAX_IMAGES: usize = 5;

/// Column list for `posts` aliased as `p`.
pub const POST_COLUMNS: &str = r#"
    p.id, p.title, p.content, p.author_id, p.category_id, p.price,
    p.location, p.contact_info, p.images, p.is_active, p.views,
    p.is_pinned, p.pinned_at, p.willing_to_travel, p.willing_to_ship,
    p.willing_to_trade, p.created_at, p.updated_at, p.bumped_at
"#;

/// Represents the 'posts' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub author_id: i64,
    pub category_id: i64,

    /// Asking price in whole dollars.
    pub price: Option<i32>,
    pub location: Option<String>,
    pub contact_info: Option<String>,

    /// Image URLs, stored as a JSON array.
    pub images: Json<Vec<String>>,

    /// Inactive posts are hidden from listings (sold, or pulled by a moderator).
    pub is_active: bool,
    pub views: i32,

    pub is_pinned: bool,
    pub pinned_at: Option<DateTime<Utc>>,

    pub willing_to_travel: bool,
    pub willing_to_ship: bool,
    pub willing_to_trade: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub bumped_at: Option<DateTime<Utc>>,
}

/// A post joined with the names shown next to it in listings.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PostSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub post: Post,
    pub author_username: String,
    pub category_slug: String,
}

/// DTO for creating a new post.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(
        min = 1,
        max = 200,
        message = "Title length must be between 1 and 200 chars"
    ))]
    pub title: String,

    #[validate(length(
        min = 1,
        max = 10000,
        message = "Content length must be between 1 and 10000 chars"
    ))]
    pub content: String,

    pub category_id: i64,

    #[validate(range(min = 0, message = "Price cannot be negative"))]
    pub price: Option<i32>,

    #[validate(length(max = 100))]
    pub location: Option<String>,

    #[validate(length(max = 200))]
    pub contact_info: Option<String>,

    #[validate(length(max = 5, message = "Maximum 5 images allowed"))]
    pub images: Option<Vec<String>>,

    pub willing_to_travel: Option<bool>,
    pub willing_to_ship: Option<bool>,
    pub willing_to_trade: Option<bool>,
}

/// DTO for an owner's edit. Pin, bump and view state are not editable here.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePostRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 10000))]
    pub content: Option<String>,
    pub category_id: Option<i64>,
    #[validate(range(min = 0, message = "Price cannot be negative"))]
    pub price: Option<i32>,
    #[validate(length(max = 100))]
    pub location: Option<String>,
    #[validate(length(max = 200))]
    pub contact_info: Option<String>,
    #[validate(length(max = 5, message = "Maximum 5 images allowed"))]
    pub images: Option<Vec<String>>,
    pub is_active: Option<bool>,
    pub willing_to_travel: Option<bool>,
    pub willing_to_ship: Option<bool>,
    pub willing_to_trade: Option<bool>,
}

/// Body of `PATCH /api/posts/{id}/moderate`.
#[derive(Debug, Deserialize)]
pub struct ModeratePostRequest {
    pub is_active: bool,
}

/// Query parameters for listing posts.
#[derive(Debug, Deserialize)]
pub struct PostListParams {
    /// Category slug filter.
    pub category: Option<String>,

    /// Number of items to return (default: 50, max: 100).
    pub limit: Option<i64>,

    pub offset: Option<i64>,
}

/// Image URLs must be absolute http(s) links; at most `MAX_IMAGES`.
pub fn validate_images(images: &[String]) -> Result<(), String> {
    if images.len() > MAX_IMAGES {
        return Err("Maximum 5 images allowed".to_string());
    }
    for image in images {
        let parsed = Url::parse(image).map_err(|_| format!("Invalid image URL: {}", image))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(format!("Invalid image URL: {}", image));
        }
    }
    Ok(())
}
