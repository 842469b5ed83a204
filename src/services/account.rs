//! Registration rules that `validator` attributes do not cover.

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::sync::LazyLock;

pub const MINIMUM_AGE: i32 = 18;

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]{3,20}$").expect("username regex is valid"));

pub fn validate_username(username: &str) -> Result<(), &'static str> {
    let len = username.chars().count();
    if len < 3 {
        return Err("Username must be at least 3 characters long");
    }
    if len > 20 {
        return Err("Username cannot exceed 20 characters");
    }
    if !USERNAME_RE.is_match(username) {
        return Err(
            "Username can only contain letters, numbers, underscores, and hyphens (no spaces)",
        );
    }
    Ok(())
}

/// Age in whole years on `today`.
pub fn age_on(date_of_birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - date_of_birth.year();
    if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
        age -= 1;
    }
    age
}

pub fn is_adult(date_of_birth: NaiveDate, today: NaiveDate) -> bool {
    age_on(date_of_birth, today) >= MINIMUM_AGE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn usernames() {
        assert!(validate_username("range_day-42").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("a".repeat(21).as_str()).is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username("dot.name").is_err());
    }

    #[test]
    fn eighteenth_birthday_counts() {
        let dob = date(2007, 6, 15);
        assert!(!is_adult(dob, date(2025, 6, 14)));
        assert!(is_adult(dob, date(2025, 6, 15)));
    }

    #[test]
    fn age_counts_whole_years() {
        assert_eq!(age_on(date(1990, 12, 31), date(2025, 1, 1)), 34);
    }
}
