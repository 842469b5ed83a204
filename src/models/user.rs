// src/models/user.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use validator::Validate;

use crate::error::AppError;

pub const USER_COLUMNS: &str = r#"
    id, username, email, password, date_of_birth, first_name, last_name,
    location, bio, profile_picture, is_verified, is_admin, is_moderator,
    is_suspended, require_password_reset, require_username_change,
    created_at, updated_at
"#;

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    /// Unique username.
    pub username: String,

    pub email: String,

    /// Argon2 password hash (or a legacy plain-text value awaiting reset).
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    pub date_of_birth: NaiveDate,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,

    pub is_verified: bool,
    pub is_admin: bool,
    pub is_moderator: bool,
    pub is_suspended: bool,

    /// Login is gated until the user picks a new password.
    pub require_password_reset: bool,
    /// Login is gated until the user picks a new username.
    pub require_username_change: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(user)
    }

    pub async fn find_by_username(pool: &PgPool, username: &str) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(pool)
            .await?;
        Ok(user)
    }

    /// Loads a user that must exist, e.g. a moderation target.
    pub async fn get(pool: &PgPool, id: i64) -> Result<User, AppError> {
        Self::find_by_id(pool, id)
            .await?
            .ok_or(AppError::NotFound("User not found".to_string()))
    }
}

/// Profile fields that are safe to show to anyone.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PublicUser {
    pub id: i64,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            location: user.location,
            bio: user.bio,
            profile_picture: user.profile_picture,
            is_verified: user.is_verified,
            created_at: user.created_at,
        }
    }
}

/// DTO for creating a new user (Registration).
/// Username shape, password policy and age are checked in the handler.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    pub username: String,
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    pub password: String,
    pub date_of_birth: NaiveDate,
    #[validate(length(min = 1, max = 50, message = "First name must be between 1 and 50 characters"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 50, message = "Last name must be between 1 and 50 characters"))]
    pub last_name: String,
    #[validate(length(max = 100))]
    pub location: Option<String>,
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangeUsernameRequest {
    pub new_username: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 50))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub last_name: Option<String>,
    #[validate(length(max = 100))]
    pub location: Option<String>,
    #[validate(length(max = 1000))]
    pub bio: Option<String>,
    #[validate(url)]
    pub profile_picture: Option<String>,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_user() -> User {
        let now = Utc::now();
        User {
            id: 1,
            username: "sample".to_string(),
            email: "sample@example.com".to_string(),
            password: String::new(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            first_name: Some("Sam".to_string()),
            last_name: Some("Ple".to_string()),
            location: None,
            bio: None,
            profile_picture: None,
            is_verified: false,
            is_admin: false,
            is_moderator: false,
            is_suspended: false,
            require_password_reset: false,
            require_username_change: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn password_never_serialises() {
        let mut user = sample_user();
        user.password = "$argon2id$secret".to_string();
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["username"], "sample");
    }

    #[test]
    fn public_view_drops_private_fields() {
        let json = serde_json::to_value(PublicUser::from(sample_user())).unwrap();
        assert!(json.get("email").is_none());
        assert!(json.get("is_admin").is_none());
    }
}
