// src/handlers/auth.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use sqlx::{PgConnection, PgPool};
use validator::Validate;

use crate::{
    config::Config,
    error::{AppError, conflict_on_unique},
    handlers::current_user,
    models::user::{ChangePasswordRequest, LoginRequest, RegisterRequest, USER_COLUMNS, User},
    services::{
        account::{is_adult, validate_username},
        capability::{self, Capability, Role},
        login_gate::{LoginGate, pending_gate, permits},
        password_history::{PasswordHistory, REUSE_MESSAGE},
        password_policy,
    },
    utils::{
        hash::{hash_password, verify_stored_password},
        jwt::{Claims, sign_jwt},
    },
};

/// Body returned by every call that establishes (or gates) a session.
#[derive(Debug, Serialize)]
pub struct LoginOutcome {
    /// `ok`, or the pending gate (`password_reset_required`,
    /// `username_change_required`).
    pub status: &'static str,
    pub token: String,
    #[serde(rename = "type")]
    pub token_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub user: User,
}

/// Issues a full token, or a gated one if the user still owes a follow-up.
pub fn login_outcome(user: User, config: &Config) -> Result<LoginOutcome, AppError> {
    let gate = pending_gate(user.require_password_reset, user.require_username_change);
    let token = sign_jwt(
        user.id,
        Role::of(&user).as_str(),
        gate,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    Ok(LoginOutcome {
        status: gate.map_or("ok", LoginGate::status),
        token,
        token_type: "Bearer",
        message: gate.map(LoginGate::message),
        user,
    })
}

/// A user's stored password hashes, newest first.
pub(crate) async fn load_password_history(
    conn: &mut PgConnection,
    user_id: i64,
) -> Result<PasswordHistory, AppError> {
    let hashes: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT password_hash FROM password_history
        WHERE user_id = $1
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(PasswordHistory::from_newest_first(hashes))
}

/// Stores a new hash and deletes the rows that fall out of the window.
pub(crate) async fn record_password_history(
    conn: &mut PgConnection,
    user_id: i64,
    history: &mut PasswordHistory,
    password_hash: &str,
) -> Result<(), AppError> {
    sqlx::query("INSERT INTO password_history (user_id, password_hash) VALUES ($1, $2)")
        .bind(user_id)
        .bind(password_hash)
        .execute(&mut *conn)
        .await?;

    let pruned = history.record(password_hash.to_string());
    if !pruned.is_empty() {
        sqlx::query("DELETE FROM password_history WHERE user_id = $1 AND password_hash = ANY($2)")
            .bind(user_id)
            .bind(&pruned)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

/// Registers a new user.
///
/// Enforces the username rule, the password policy and the minimum age,
/// then stores the Argon2 hash and seeds the password history.
pub async fn register(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    validate_username(&payload.username).map_err(|m| AppError::BadRequest(m.to_string()))?;

    let report = password_policy::validate(&payload.password);
    if !report.is_valid() {
        return Err(AppError::Validation(report.messages()));
    }

    if !is_adult(payload.date_of_birth, Utc::now().date_naive()) {
        return Err(AppError::BadRequest(
            "You must be at least 18 years old to register".to_string(),
        ));
    }

    let hashed_password = hash_password(&payload.password)?;

    let mut tx = pool.begin().await?;

    let sql = format!(
        r#"
        INSERT INTO users (username, email, password, date_of_birth, first_name, last_name, location)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {USER_COLUMNS}
        "#
    );
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(&payload.username)
        .bind(payload.email.trim().to_lowercase())
        .bind(&hashed_password)
        .bind(payload.date_of_birth)
        .bind(payload.first_name.trim())
        .bind(payload.last_name.trim())
        .bind(payload.location.as_deref())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "Username or email already exists"))?;

    record_password_history(&mut *tx, user.id, &mut PasswordHistory::default(), &hashed_password)
        .await?;

    tx.commit().await?;

    tracing::info!(user_id = user.id, username = %user.username, "user registered");

    Ok((StatusCode::CREATED, Json(login_outcome(user, &config)?)))
}

/// Checks credentials. Unknown user and wrong password are
/// indistinguishable to the caller.
async fn authenticate(pool: &PgPool, payload: &LoginRequest) -> Result<User, AppError> {
    payload.validate()?;

    let user = User::find_by_username(pool, &payload.username)
        .await?
        .ok_or(AppError::AuthError("Invalid credentials".to_string()))?;

    if !verify_stored_password(&payload.password, &user.password)? {
        tracing::info!(username = %payload.username, "failed login attempt");
        return Err(AppError::AuthError("Invalid credentials".to_string()));
    }

    if user.is_suspended {
        return Err(AppError::Forbidden("Your account has been suspended.".to_string()));
    }

    Ok(user)
}

/// Authenticates a user and returns a JWT token.
///
/// Users flagged for a password reset or username change receive a gated
/// token and a distinguished `status` instead of a normal session.
pub async fn login(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = authenticate(&pool, &payload).await?;
    let outcome = login_outcome(user, &config)?;

    tracing::info!(user_id = outcome.user.id, status = outcome.status, "user logged in");

    Ok(Json(outcome))
}

/// Login for the admin panel; only staff accounts get through.
pub async fn admin_login(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = authenticate(&pool, &payload).await?;
    capability::require(&user, Capability::ViewAdminPanel)?;

    let outcome = login_outcome(user, &config)?;
    tracing::info!(user_id = outcome.user.id, "staff logged in to admin panel");

    Ok(Json(outcome))
}

/// Tokens are stateless; the client discards its copy.
pub async fn logout() -> impl IntoResponse {
    Json(json!({ "message": "Logged out successfully" }))
}

/// Returns the authenticated user's own record.
pub async fn me(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = User::get(&pool, claims.user_id()?).await?;
    Ok(Json(user))
}

pub async fn password_requirements() -> impl IntoResponse {
    Json(json!({ "requirements": password_policy::requirements() }))
}

/// Changes the caller's password.
///
/// Accepts a normal token or one gated on a password reset; on success the
/// reset flag is cleared and the next login outcome is returned.
pub async fn change_password(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    if !permits(claims.gate, LoginGate::PasswordReset) {
        return Err(AppError::Forbidden(
            "You must change your username before continuing.".to_string(),
        ));
    }
    payload.validate()?;

    let user = current_user(&pool, &claims).await?;

    if !verify_stored_password(&payload.current_password, &user.password)? {
        return Err(AppError::BadRequest("Current password is incorrect".to_string()));
    }

    if payload.new_password != payload.confirm_password {
        return Err(AppError::BadRequest(
            "New password and confirmation must match".to_string(),
        ));
    }

    let report = password_policy::validate(&payload.new_password);
    if !report.is_valid() {
        return Err(AppError::Validation(report.messages()));
    }

    let mut tx = pool.begin().await?;

    let mut history = load_password_history(&mut *tx, user.id).await?;
    if history.was_used_recently(&payload.new_password)? {
        return Err(AppError::BadRequest(REUSE_MESSAGE.to_string()));
    }

    let new_hash = hash_password(&payload.new_password)?;

    let sql = format!(
        r#"
        UPDATE users
        SET password = $1, require_password_reset = FALSE, updated_at = NOW()
        WHERE id = $2
        RETURNING {USER_COLUMNS}
        "#
    );
    let updated = sqlx::query_as::<_, User>(&sql)
        .bind(&new_hash)
        .bind(user.id)
        .fetch_one(&mut *tx)
        .await?;

    record_password_history(&mut *tx, user.id, &mut history, &new_hash).await?;

    tx.commit().await?;

    tracing::info!(user_id = user.id, "password changed");

    Ok(Json(login_outcome(updated, &config)?))
}
