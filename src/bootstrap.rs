// src/bootstrap.rs

//! Start-up data tasks: default categories, the configured admin account and
//! legacy password flagging.

use chrono::NaiveDate;
use sqlx::PgPool;

use crate::{
    config::Config,
    error::AppError,
    handlers::auth::record_password_history,
    models::category::PostType,
    services::{password_history::PasswordHistory, password_policy},
    utils::hash::{hash_password, is_legacy_hash},
};

/// (name, slug, type, description, icon)
const DEFAULT_CATEGORIES: &[(&str, &str, PostType, &str, &str)] = &[
    ("Handguns", "wts-handguns", PostType::Wts, "Handguns for sale", "fas fa-handgun"),
    ("Long Guns", "wts-long-guns", PostType::Wts, "Rifles and shotguns for sale", "fas fa-gun"),
    ("Antique Firearms", "wts-antique", PostType::Wts, "Antique firearms for sale", "fas fa-history"),
    ("Ammunition", "wts-ammo", PostType::Wts, "Ammunition for sale", "fas fa-circle"),
    ("Parts & Accessories", "wts-parts", PostType::Wts, "Parts and accessories for sale", "fas fa-cog"),
    ("Handguns", "wtb-handguns", PostType::Wtb, "Looking for handguns", "fas fa-handgun"),
    ("Long Guns", "wtb-long-guns", PostType::Wtb, "Looking for rifles and shotguns", "fas fa-gun"),
    ("Antique Firearms", "wtb-antique", PostType::Wtb, "Looking for antique firearms", "fas fa-history"),
    ("Ammunition", "wtb-ammo", PostType::Wtb, "Looking for ammunition", "fas fa-circle"),
    ("Parts & Accessories", "wtb-parts", PostType::Wtb, "Looking for parts and accessories", "fas fa-cog"),
    ("Handguns", "wtt-handguns", PostType::Wtt, "Want to trade handguns", "fas fa-handgun"),
    ("Long Guns", "wtt-long-guns", PostType::Wtt, "Want to trade rifles and shotguns", "fas fa-gun"),
    ("Antique Firearms", "wtt-antique", PostType::Wtt, "Want to trade antique firearms", "fas fa-history"),
    ("Ammunition", "wtt-ammo", PostType::Wtt, "Want to trade ammunition", "fas fa-circle"),
    ("Parts & Accessories", "wtt-parts", PostType::Wtt, "Want to trade parts and accessories", "fas fa-cog"),
    ("General Discussion", "general", PostType::Discussion, "General discussions", "fas fa-comments"),
    ("CA Gun Laws", "ca-laws", PostType::Discussion, "California gun law discussions", "fas fa-gavel"),
    ("Reviews & Recommendations", "reviews", PostType::Discussion, "Product reviews and recommendations", "fas fa-star"),
    ("Training & Safety", "training", PostType::Discussion, "Training and safety discussions", "fas fa-shield-alt"),
    ("Off Topic", "off-topic", PostType::Discussion, "Off topic discussions", "fas fa-chat"),
];

/// Inserts the default categories into an empty table.
pub async fn seed_categories(pool: &PgPool) -> Result<u64, AppError> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        return Ok(0);
    }

    let mut inserted = 0;
    let mut tx = pool.begin().await?;
    for (name, slug, kind, description, icon) in DEFAULT_CATEGORIES {
        // Another instance may be seeding at the same time.
        inserted += sqlx::query(
            r#"
            INSERT INTO categories (name, slug, type, description, icon)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (slug) DO NOTHING
            "#,
        )
        .bind(name)
        .bind(slug)
        .bind(kind)
        .bind(description)
        .bind(icon)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    }
    tx.commit().await?;

    tracing::info!("Seeded {} categories.", inserted);
    Ok(inserted)
}

/// Creates the admin from `ADMIN_USERNAME` / `ADMIN_PASSWORD` if both are set
/// and no user of that name (ignoring case) exists yet. The password also
/// starts the admin's password history.
pub async fn seed_admin_user(pool: &PgPool, config: &Config) -> Result<(), AppError> {
    let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) else {
        return Ok(());
    };

    let user_exists: Option<i64> =
        sqlx::query_scalar("SELECT id FROM users WHERE LOWER(username) = LOWER($1)")
            .bind(username)
            .fetch_optional(pool)
            .await?;
    if user_exists.is_some() {
        return Ok(());
    }

    if !password_policy::validate(password).is_valid() {
        tracing::warn!("ADMIN_PASSWORD does not meet the password policy.");
    }

    tracing::info!("Seeding admin user: {}", username);
    let hashed_password = hash_password(password)?;
    let date_of_birth = NaiveDate::from_ymd_opt(1970, 1, 1)
        .ok_or(AppError::InternalServerError("Invalid date".to_string()))?;

    let mut tx = pool.begin().await?;
    let admin_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO users (username, email, password, date_of_birth, is_admin, is_verified)
        VALUES ($1, $2, $3, $4, TRUE, TRUE)
        RETURNING id
        "#,
    )
    .bind(username)
    .bind(format!("{username}@localhost"))
    .bind(&hashed_password)
    .bind(date_of_birth)
    .fetch_one(&mut *tx)
    .await?;

    record_password_history(&mut *tx, admin_id, &mut PasswordHistory::default(), &hashed_password)
        .await?;
    tx.commit().await?;

    tracing::info!("Admin user created successfully.");
    Ok(())
}

/// Sets `require_password_reset` on every user whose stored password is not
/// an Argon2 hash. Returns how many users were newly flagged.
pub async fn flag_legacy_passwords(pool: &PgPool) -> Result<u64, AppError> {
    let candidates: Vec<(i64, String)> =
        sqlx::query_as("SELECT id, password FROM users WHERE NOT require_password_reset")
            .fetch_all(pool)
            .await?;

    let legacy: Vec<i64> = candidates
        .into_iter()
        .filter(|(_, stored)| is_legacy_hash(stored))
        .map(|(id, _)| id)
        .collect();

    if legacy.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query(
        "UPDATE users SET require_password_reset = TRUE, updated_at = NOW() WHERE id = ANY($1)",
    )
    .bind(&legacy)
    .execute(pool)
    .await?;

    tracing::warn!("Flagged {} users with legacy passwords for reset.", result.rows_affected());
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn default_slugs_are_unique() {
        let slugs: HashSet<_> = DEFAULT_CATEGORIES.iter().map(|c| c.1).collect();
        assert_eq!(slugs.len(), DEFAULT_CATEGORIES.len());
    }

    #[test]
    fn every_trade_type_has_categories() {
        for kind in [PostType::Wts, PostType::Wtb, PostType::Wtt, PostType::Discussion] {
            assert!(DEFAULT_CATEGORIES.iter().any(|c| c.2 == kind));
        }
    }
}
