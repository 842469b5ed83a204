use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    config::Config,
    error::{AppError, conflict_on_unique},
    handlers::{auth::login_outcome, current_user},
    models::{
        preferences::{UpdatePreferencesRequest, UserPreferences},
        user::{ChangeUsernameRequest, PublicUser, USER_COLUMNS, UpdateProfileRequest, User},
    },
    services::{
        account::validate_username,
        login_gate::{LoginGate, permits},
    },
    utils::jwt::Claims,
};

/// Get current user's full profile.
pub async fn get_profile(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = User::get(&pool, claims.user_id()?).await?;
    Ok(Json(user))
}

/// Update the editable profile fields. Absent fields are left unchanged.
pub async fn update_profile(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let user = current_user(&pool, &claims).await?;

    let sql = format!(
        r#"
        UPDATE users
        SET first_name = COALESCE($2, first_name),
            last_name = COALESCE($3, last_name),
            location = COALESCE($4, location),
            bio = COALESCE($5, bio),
            profile_picture = COALESCE($6, profile_picture),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {USER_COLUMNS}
        "#
    );
    let updated = sqlx::query_as::<_, User>(&sql)
        .bind(user.id)
        .bind(payload.first_name.as_deref().map(str::trim))
        .bind(payload.last_name.as_deref().map(str::trim))
        .bind(payload.location.as_deref())
        .bind(payload.bio.as_deref())
        .bind(payload.profile_picture.as_deref())
        .fetch_one(&pool)
        .await?;

    Ok(Json(updated))
}

/// Public profile of any user.
pub async fn get_public_user(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user = User::get(&pool, id).await?;
    Ok(Json(PublicUser::from(user)))
}

/// Picks a new username.
///
/// Accepts a normal token or one gated on a username change; on success the
/// flag is cleared and the next login outcome is returned.
pub async fn change_username(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ChangeUsernameRequest>,
) -> Result<impl IntoResponse, AppError> {
    if !permits(claims.gate, LoginGate::UsernameChange) {
        return Err(AppError::Forbidden(
            "You must change your password before continuing.".to_string(),
        ));
    }

    let new_username = payload.new_username.trim();
    validate_username(new_username).map_err(|m| AppError::BadRequest(m.to_string()))?;

    let user = current_user(&pool, &claims).await?;

    if user.require_username_change && user.username.eq_ignore_ascii_case(new_username) {
        return Err(AppError::BadRequest(
            "Please choose a different username".to_string(),
        ));
    }

    let sql = format!(
        r#"
        UPDATE users
        SET username = $1, require_username_change = FALSE, updated_at = NOW()
        WHERE id = $2
        RETURNING {USER_COLUMNS}
        "#
    );
    let updated = sqlx::query_as::<_, User>(&sql)
        .bind(new_username)
        .bind(user.id)
        .fetch_one(&pool)
        .await
        .map_err(|e| conflict_on_unique(e, "Username already exists"))?;

    tracing::info!(user_id = user.id, old = %user.username, new = %updated.username, "username changed");

    Ok(Json(login_outcome(updated, &config)?))
}

async fn ensure_preferences(pool: &PgPool, user_id: i64) -> Result<(), AppError> {
    sqlx::query("INSERT INTO user_preferences (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Get the caller's preferences, creating the defaults on first read.
pub async fn get_preferences(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    ensure_preferences(&pool, user_id).await?;

    let preferences = sqlx::query_as::<_, UserPreferences>(
        "SELECT * FROM user_preferences WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(preferences))
}

pub async fn update_preferences(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdatePreferencesRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    ensure_preferences(&pool, user_id).await?;

    let preferences = sqlx::query_as::<_, UserPreferences>(
        r#"
        UPDATE user_preferences
        SET email_notifications = COALESCE($2, email_notifications),
            message_notifications = COALESCE($3, message_notifications),
            marketing_emails = COALESCE($4, marketing_emails),
            profile_visibility = COALESCE($5, profile_visibility),
            show_email = COALESCE($6, show_email),
            show_location = COALESCE($7, show_location),
            theme = COALESCE($8, theme),
            updated_at = NOW()
        WHERE user_id = $1
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(payload.email_notifications)
    .bind(payload.message_notifications)
    .bind(payload.marketing_emails)
    .bind(payload.profile_visibility)
    .bind(payload.show_email)
    .bind(payload.show_location)
    .bind(payload.theme)
    .fetch_one(&pool)
    .await?;

    Ok(Json(preferences))
}
