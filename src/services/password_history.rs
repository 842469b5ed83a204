//! Rolling window of a user's most recent password hashes.

use std::collections::VecDeque;

use crate::{error::AppError, utils::hash::verify_password};

/// How many previous passwords are remembered and refused.
pub const HISTORY_DEPTH: usize = 4;

pub const REUSE_MESSAGE: &str =
    "New password cannot be the same as any of your last 4 passwords";

/// Newest hash first. Only the first `HISTORY_DEPTH` entries count, and
/// `record` prunes everything beyond them.
#[derive(Debug, Clone, Default)]
pub struct PasswordHistory {
    hashes: VecDeque<String>,
}

impl PasswordHistory {
    pub fn from_newest_first(hashes: impl IntoIterator<Item = String>) -> Self {
        Self {
            hashes: hashes.into_iter().collect(),
        }
    }

    /// Salted hashes cannot be compared directly; each entry is verified.
    pub fn was_used_recently(&self, candidate: &str) -> Result<bool, AppError> {
        for hash in self.hashes.iter().take(HISTORY_DEPTH) {
            if verify_password(candidate, hash)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Pushes a new hash, returning the entries that fell out of the window.
    pub fn record(&mut self, hash: String) -> Vec<String> {
        self.hashes.push_front(hash);
        let mut pruned = Vec::new();
        while self.hashes.len() > HISTORY_DEPTH {
            if let Some(oldest) = self.hashes.pop_back() {
                pruned.push(oldest);
            }
        }
        pruned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::hash::hash_password;

    #[test]
    fn keeps_only_the_last_four() {
        let mut history = PasswordHistory::default();
        for i in 0..4 {
            assert!(history.record(format!("h{i}")).is_empty());
        }
        assert_eq!(history.record("h4".to_string()), vec!["h0".to_string()]);
        assert_eq!(history.record("h5".to_string()), vec!["h1".to_string()]);
    }

    #[test]
    fn overlong_stored_history_is_pruned_on_next_record() {
        let mut history = PasswordHistory::from_newest_first((0..6).map(|i| format!("h{i}")));
        let pruned = history.record("new".to_string());
        assert_eq!(pruned, vec!["h5", "h4", "h3", "h2"]);
    }

    #[test]
    fn fifth_oldest_password_may_be_reused() {
        let passwords = [
            "Initial1pass!",
            "Change1pass!a",
            "Change2pass!b",
            "Change3pass!c",
            "Change4pass!d",
            "Change5pass!e",
        ];

        // Registration stores the initial password, then five changes follow.
        let mut history = PasswordHistory::default();
        history.record(hash_password(passwords[0]).unwrap());
        for password in &passwords[1..] {
            assert!(!history.was_used_recently(password).unwrap());
            history.record(hash_password(password).unwrap());
        }

        // Password #1 was set five changes ago and is outside the window.
        assert!(!history.was_used_recently(passwords[1]).unwrap());
        for recent in &passwords[2..] {
            assert!(history.was_used_recently(recent).unwrap(), "{recent}");
        }
    }
}
