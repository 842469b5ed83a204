use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "ad_position", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum AdPosition {
    Header,
    Sidebar,
    Footer,
    InFeed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "ad_size", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AdSize {
    Small,
    Medium,
    Large,
}

/// Represents the 'advertisements' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Advertisement {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub target_url: String,
    pub sponsor: String,
    pub sponsor_email: String,
    pub position: AdPosition,
    pub size: AdSize,
    pub is_active: bool,
    pub impressions: i32,
    pub clicks: i32,
    pub start_date: DateTime<Utc>,
    /// Open-ended when unset.
    pub end_date: Option<DateTime<Utc>>,
    /// Monthly rate in whole dollars.
    pub monthly_rate: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Advertisement {
    /// Active, started and not yet ended.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.start_date <= now && self.end_date.is_none_or(|end| end > now)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAdvertisementRequest {
    #[validate(length(min = 1, max = 100))]
    pub title: String,
    #[validate(length(min = 1, max = 500))]
    pub description: String,
    #[validate(url)]
    pub image_url: Option<String>,
    #[validate(url(message = "Target URL must be a valid URL"))]
    pub target_url: String,
    #[validate(length(min = 1, max = 100))]
    pub sponsor: String,
    #[validate(email)]
    pub sponsor_email: String,
    pub position: AdPosition,
    pub size: Option<AdSize>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[validate(range(min = 0))]
    pub monthly_rate: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAdvertisementRequest {
    #[validate(length(min = 1, max = 100))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 500))]
    pub description: Option<String>,
    #[validate(url)]
    pub image_url: Option<String>,
    #[validate(url)]
    pub target_url: Option<String>,
    pub position: Option<AdPosition>,
    pub size: Option<AdSize>,
    pub is_active: Option<bool>,
    pub end_date: Option<DateTime<Utc>>,
    #[validate(range(min = 0))]
    pub monthly_rate: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct AdListParams {
    pub position: Option<AdPosition>,
}

/// Represents the 'featured_listings' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct FeaturedListing {
    pub id: i64,
    pub post_id: i64,
    pub sponsor_id: i64,
    pub featured_until: DateTime<Utc>,
    /// Daily rate in whole dollars.
    pub daily_rate: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct FeaturedPost {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub listing: FeaturedListing,
    pub title: String,
    pub price: Option<i32>,
    pub location: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateFeaturedListingRequest {
    pub post_id: i64,
    pub featured_until: DateTime<Utc>,
    #[validate(range(min = 0))]
    pub daily_rate: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn ad(now: DateTime<Utc>) -> Advertisement {
        Advertisement {
            id: 1,
            title: "Range day".into(),
            description: "Two lanes for the price of one".into(),
            image_url: None,
            target_url: "https://range.example.com".into(),
            sponsor: "Range".into(),
            sponsor_email: "ads@range.example.com".into(),
            position: AdPosition::Sidebar,
            size: AdSize::Medium,
            is_active: true,
            impressions: 0,
            clicks: 0,
            start_date: now - Duration::days(1),
            end_date: None,
            monthly_rate: Some(100),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn ad_window() {
        let now = Utc::now();
        let mut advert = ad(now);
        assert!(advert.is_live(now));

        advert.end_date = Some(now);
        assert!(!advert.is_live(now));

        advert.end_date = None;
        advert.start_date = now + Duration::hours(1);
        assert!(!advert.is_live(now));

        advert.start_date = now - Duration::hours(1);
        advert.is_active = false;
        assert!(!advert.is_live(now));
    }

    #[test]
    fn position_uses_kebab_case() {
        let position: AdPosition = serde_json::from_str("\"in-feed\"").unwrap();
        assert_eq!(position, AdPosition::InFeed);
    }
}
