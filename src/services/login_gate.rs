//! Blocking follow-up actions demanded at login.

use serde::{Deserialize, Serialize};

/// A follow-up the user must complete before receiving a normal session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginGate {
    PasswordReset,
    UsernameChange,
}

impl LoginGate {
    /// Value of the `status` field in the login response.
    pub fn status(self) -> &'static str {
        match self {
            LoginGate::PasswordReset => "password_reset_required",
            LoginGate::UsernameChange => "username_change_required",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            LoginGate::PasswordReset => "You must change your password before continuing.",
            LoginGate::UsernameChange => "You must change your username before continuing.",
        }
    }
}

/// The gate that applies to a user with the given flags, if any.
/// A pending password reset is presented before a username change.
pub fn pending_gate(require_password_reset: bool, require_username_change: bool) -> Option<LoginGate> {
    if require_password_reset {
        Some(LoginGate::PasswordReset)
    } else if require_username_change {
        Some(LoginGate::UsernameChange)
    } else {
        None
    }
}

/// Whether a token carrying `token_gate` may call an endpoint that
/// completes `endpoint_gate`. Ungated tokens may call every endpoint.
pub fn permits(token_gate: Option<LoginGate>, endpoint_gate: LoginGate) -> bool {
    match token_gate {
        None => true,
        Some(gate) => gate == endpoint_gate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_flags_means_no_gate() {
        assert_eq!(pending_gate(false, false), None);
    }

    #[test]
    fn each_flag_selects_its_gate() {
        assert_eq!(pending_gate(true, false), Some(LoginGate::PasswordReset));
        assert_eq!(pending_gate(false, true), Some(LoginGate::UsernameChange));
    }

    #[test]
    fn password_reset_is_presented_first() {
        assert_eq!(pending_gate(true, true), Some(LoginGate::PasswordReset));
    }

    #[test]
    fn gated_tokens_only_reach_their_follow_up() {
        assert!(permits(None, LoginGate::PasswordReset));
        assert!(permits(Some(LoginGate::PasswordReset), LoginGate::PasswordReset));
        assert!(!permits(Some(LoginGate::PasswordReset), LoginGate::UsernameChange));
        assert!(!permits(Some(LoginGate::UsernameChange), LoginGate::PasswordReset));
    }

    #[test]
    fn gate_serialises_as_snake_case() {
        let json = serde_json::to_string(&LoginGate::UsernameChange).unwrap();
        assert_eq!(json, "\"username_change\"");
        assert_eq!(LoginGate::PasswordReset.status(), "password_reset_required");
    }
}
