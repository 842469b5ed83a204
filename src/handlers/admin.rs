// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    response::IntoResponse,
};
use serde_json::json;
use sqlx::PgPool;

use crate::{
    bootstrap::flag_legacy_passwords,
    error::AppError,
    handlers::current_user,
    models::user::{USER_COLUMNS, User},
    services::capability::{self, Capability},
    utils::jwt::Claims,
};

/// Loads the acting staff member and checks the capability in one go.
async fn acting_staff(
    pool: &PgPool,
    claims: &Claims,
    capability: Capability,
) -> Result<User, AppError> {
    let staff = current_user(pool, claims).await?;
    capability::require(&staff, capability)?;
    Ok(staff)
}

/// Applies one `SET` fragment to a user and returns the updated row.
async fn update_user_flags(pool: &PgPool, id: i64, set_clause: &str) -> Result<User, AppError> {
    let sql = format!(
        "UPDATE users SET {set_clause}, updated_at = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
    );
    sqlx::query_as::<_, User>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update user {}: {:?}", id, e);
            AppError::from(e)
        })?
        .ok_or(AppError::NotFound("User not found".to_string()))
}

/// Lists all users in the system, newest first.
pub async fn list_users(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    acting_staff(&pool, &claims, Capability::ModerateUsers).await?;

    let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id DESC");
    let users = sqlx::query_as::<_, User>(&sql)
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list users: {:?}", e);
            AppError::from(e)
        })?;

    Ok(Json(users))
}

/// Suspends or reinstates a user. Moderators cannot touch admins and no one
/// can suspend themselves.
pub async fn toggle_suspension(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let staff = acting_staff(&pool, &claims, Capability::ModerateUsers).await?;

    if staff.id == id {
        return Err(AppError::BadRequest("You cannot suspend yourself".to_string()));
    }

    let target = User::get(&pool, id).await?;
    if target.is_admin && !staff.is_admin {
        return Err(AppError::Forbidden(
            "Moderators cannot suspend administrators".to_string(),
        ));
    }

    let updated = update_user_flags(&pool, id, "is_suspended = NOT is_suspended").await?;

    tracing::info!(
        staff_id = staff.id,
        user_id = id,
        suspended = updated.is_suspended,
        "suspension toggled"
    );

    Ok(Json(updated))
}

pub async fn toggle_moderator(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let admin = acting_staff(&pool, &claims, Capability::ManageRoles).await?;

    let updated = update_user_flags(&pool, id, "is_moderator = NOT is_moderator").await?;

    tracing::info!(
        admin_id = admin.id,
        user_id = id,
        moderator = updated.is_moderator,
        "moderator role toggled"
    );

    Ok(Json(updated))
}

pub async fn make_admin(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let admin = acting_staff(&pool, &claims, Capability::ManageRoles).await?;

    let updated = update_user_flags(&pool, id, "is_admin = TRUE").await?;

    tracing::info!(admin_id = admin.id, user_id = id, "user promoted to admin");

    Ok(Json(updated))
}

/// Forces the user to pick a new username at next login.
pub async fn flag_username_change(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let staff = acting_staff(&pool, &claims, Capability::ModerateUsers).await?;

    let updated = update_user_flags(&pool, id, "require_username_change = TRUE").await?;

    tracing::info!(staff_id = staff.id, user_id = id, "username change required");

    Ok(Json(updated))
}

/// Forces the user to pick a new password at next login.
pub async fn flag_password_reset(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let staff = acting_staff(&pool, &claims, Capability::ModerateUsers).await?;

    let updated = update_user_flags(&pool, id, "require_password_reset = TRUE").await?;

    tracing::info!(staff_id = staff.id, user_id = id, "password reset required");

    Ok(Json(updated))
}

pub async fn clear_password_reset(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let staff = acting_staff(&pool, &claims, Capability::ModerateUsers).await?;

    let updated = update_user_flags(&pool, id, "require_password_reset = FALSE").await?;

    tracing::info!(staff_id = staff.id, user_id = id, "password reset cleared");

    Ok(Json(updated))
}

/// Deletes a user with all their posts, replies and conversations.
pub async fn delete_user(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let admin = acting_staff(&pool, &claims, Capability::DeleteUsers).await?;

    if admin.id == id {
        return Err(AppError::BadRequest("You cannot delete yourself".to_string()));
    }

    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete user: {:?}", e);
            AppError::from(e)
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    tracing::warn!(admin_id = admin.id, user_id = id, "user deleted");

    Ok(Json(json!({ "message": "User deleted successfully" })))
}

/// Flags every account still holding a plain-text password.
pub async fn flag_legacy(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let admin = acting_staff(&pool, &claims, Capability::ManageRoles).await?;

    let flagged = flag_legacy_passwords(&pool).await?;

    tracing::info!(admin_id = admin.id, flagged, "legacy passwords flagged");

    Ok(Json(json!({ "flagged": flagged })))
}
