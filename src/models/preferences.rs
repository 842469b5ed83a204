use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "profile_visibility", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProfileVisibility {
    Public,
    Registered,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "theme", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    System,
}

/// Represents the 'user_preferences' table in the database.
/// A row with column defaults is created the first time it is read.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserPreferences {
    pub id: i64,
    pub user_id: i64,
    pub email_notifications: bool,
    pub message_notifications: bool,
    pub marketing_emails: bool,
    pub profile_visibility: ProfileVisibility,
    pub show_email: bool,
    pub show_location: bool,
    pub theme: Theme,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePreferencesRequest {
    pub email_notifications: Option<bool>,
    pub message_notifications: Option<bool>,
    pub marketing_emails: Option<bool>,
    pub profile_visibility: Option<ProfileVisibility>,
    pub show_email: Option<bool>,
    pub show_location: Option<bool>,
    pub theme: Option<Theme>,
}
