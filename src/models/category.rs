use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Listing category type: want to sell / buy / trade, or plain discussion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "post_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PostType {
    Wts,
    Wtb,
    Wtt,
    Discussion,
}

/// Represents the 'categories' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: PostType,
    pub description: Option<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct CategoryPostCount {
    pub category_id: i64,
    pub post_count: i64,
}
