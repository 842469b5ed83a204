//! Listing order and the moderator pin toggle.

use chrono::{DateTime, Utc};

/// `ORDER BY` clause for queries aliasing `posts` as `p`: pinned first, then
/// most recent activity (bump, or creation if never bumped), newest id last.
pub const LISTING_ORDER_SQL: &str =
    "p.is_pinned DESC, COALESCE(p.bumped_at, p.created_at) DESC, p.created_at DESC, p.id DESC";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinState {
    pub is_pinned: bool,
    pub pinned_at: Option<DateTime<Utc>>,
}

/// Flips the pin; `pinned_at` is stamped on pin and cleared on unpin.
pub fn toggle_pin(currently_pinned: bool, now: DateTime<Utc>) -> PinState {
    if currently_pinned {
        PinState { is_pinned: false, pinned_at: None }
    } else {
        PinState { is_pinned: true, pinned_at: Some(now) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(hours: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::hours(hours)
    }

    #[test]
    fn double_toggle_restores_state() {
        let now = at(3);
        let pinned = toggle_pin(false, now);
        assert_eq!(pinned, PinState { is_pinned: true, pinned_at: Some(now) });

        let unpinned = toggle_pin(pinned.is_pinned, at(4));
        assert_eq!(unpinned, PinState { is_pinned: false, pinned_at: None });
    }
}
