//! Author-initiated "bump" of a listing back to the top.

use chrono::{DateTime, Duration, Utc};
use std::fmt;

pub const BUMP_COOLDOWN_HOURS: i64 = 24;

const MILLIS_PER_HOUR: i64 = 60 * 60 * 1000;

/// Why a bump was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BumpRejection {
    NotOwner,
    Cooldown { hours_remaining: i64 },
}

impl fmt::Display for BumpRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BumpRejection::NotOwner => write!(f, "You can only bump your own posts"),
            BumpRejection::Cooldown { hours_remaining } => write!(
                f,
                "You can bump this post again later: {} hour(s) remaining",
                hours_remaining
            ),
        }
    }
}

/// Decides whether `requester_id` may bump a post now.
///
/// Remaining cooldown is reported in whole hours, rounded up, so a post
/// bumped 23h59m ago reports one hour.
pub fn check_bump(
    author_id: i64,
    bumped_at: Option<DateTime<Utc>>,
    requester_id: i64,
    now: DateTime<Utc>,
) -> Result<(), BumpRejection> {
    if author_id != requester_id {
        return Err(BumpRejection::NotOwner);
    }

    let Some(last) = bumped_at else {
        return Ok(());
    };

    let remaining = Duration::hours(BUMP_COOLDOWN_HOURS) - (now - last);
    if remaining > Duration::zero() {
        let millis = remaining.num_milliseconds();
        let hours_remaining = (millis + MILLIS_PER_HOUR - 1) / MILLIS_PER_HOUR;
        return Err(BumpRejection::Cooldown {
            hours_remaining: hours_remaining.max(1),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn non_owner_is_rejected_regardless_of_time() {
        let now = t0() + Duration::days(3);
        assert_eq!(check_bump(1, Some(t0()), 2, now), Err(BumpRejection::NotOwner));
        assert_eq!(check_bump(1, None, 2, now), Err(BumpRejection::NotOwner));
    }

    #[test]
    fn never_bumped_post_can_be_bumped() {
        assert_eq!(check_bump(7, None, 7, t0()), Ok(()));
    }

    #[test]
    fn one_minute_short_reports_one_hour() {
        let now = t0() + Duration::hours(23) + Duration::minutes(59);
        let rejection = check_bump(7, Some(t0()), 7, now).unwrap_err();
        assert_eq!(rejection, BumpRejection::Cooldown { hours_remaining: 1 });
        assert!(rejection.to_string().contains("1 hour(s) remaining"));
    }

    #[test]
    fn remaining_hours_round_up() {
        let now = t0() + Duration::hours(2) + Duration::minutes(30);
        assert_eq!(
            check_bump(7, Some(t0()), 7, now),
            Err(BumpRejection::Cooldown { hours_remaining: 22 })
        );

        let now = t0() + Duration::seconds(1);
        assert_eq!(
            check_bump(7, Some(t0()), 7, now),
            Err(BumpRejection::Cooldown { hours_remaining: 24 })
        );
    }

    #[test]
    fn exactly_twenty_four_hours_is_allowed() {
        let now = t0() + Duration::hours(24);
        assert_eq!(check_bump(7, Some(t0()), 7, now), Ok(()));
    }
}
