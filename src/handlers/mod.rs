// src/handlers/mod.rs

use sqlx::PgPool;

use crate::{error::AppError, models::user::User, utils::jwt::Claims};

pub mod admin;
pub mod advertising;
pub mod auth;
pub mod categories;
pub mod messages;
pub mod posts;
pub mod profile;
pub mod search;

/// Loads the user behind a token for an action that changes state.
///
/// Read fresh on every call so that suspensions and role changes apply to
/// tokens that were issued earlier.
pub(crate) async fn current_user(pool: &PgPool, claims: &Claims) -> Result<User, AppError> {
    let user = User::find_by_id(pool, claims.user_id()?)
        .await?
        .ok_or(AppError::AuthError("User no longer exists".to_string()))?;

    if user.is_suspended {
        return Err(AppError::Forbidden("Your account has been suspended.".to_string()));
    }

    Ok(user)
}
