//! Password strength rules.
//!
//! `validate` never short-circuits: every unmet rule is reported, in a fixed
//! order, so the client can show the full list at once.

/// Characters that satisfy the "special character" rule. Nothing else
/// outside `[A-Za-z0-9]` is accepted.
pub const SPECIAL_CHARACTERS: &str = "@$!%*?&";

pub const MIN_LENGTH: usize = 10;

/// One unmet password rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyViolation {
    TooShort,
    MissingLowercase,
    MissingUppercase,
    MissingDigit,
    MissingSpecial,
    DisallowedCharacter,
}

impl PolicyViolation {
    pub fn message(self) -> &'static str {
        match self {
            PolicyViolation::TooShort => "Password must be at least 10 characters long",
            PolicyViolation::MissingLowercase => {
                "Password must contain at least one lowercase letter"
            }
            PolicyViolation::MissingUppercase => {
                "Password must contain at least one uppercase letter"
            }
            PolicyViolation::MissingDigit => "Password must contain at least one number",
            PolicyViolation::MissingSpecial => {
                "Password must contain at least one special character (@$!%*?&)"
            }
            PolicyViolation::DisallowedCharacter => {
                "Password can only contain letters, numbers, and these special characters: @$!%*?&"
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyReport {
    pub violations: Vec<PolicyViolation>,
}

impl PolicyReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn messages(&self) -> Vec<String> {
        self.violations.iter().map(|v| v.message().to_string()).collect()
    }
}

fn is_special(c: char) -> bool {
    SPECIAL_CHARACTERS.contains(c)
}

pub fn validate(password: &str) -> PolicyReport {
    let mut violations = Vec::new();

    if password.chars().count() < MIN_LENGTH {
        violations.push(PolicyViolation::TooShort);
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        violations.push(PolicyViolation::MissingLowercase);
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        violations.push(PolicyViolation::MissingUppercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        violations.push(PolicyViolation::MissingDigit);
    }
    if !password.chars().any(is_special) {
        violations.push(PolicyViolation::MissingSpecial);
    }
    // An empty password has no allowed characters either.
    if password.is_empty()
        || !password
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || is_special(c))
    {
        violations.push(PolicyViolation::DisallowedCharacter);
    }

    PolicyReport { violations }
}

/// Human-readable requirement list shown next to password forms.
pub fn requirements() -> Vec<&'static str> {
    vec![
        "At least 10 characters long",
        "Contains at least one lowercase letter (a-z)",
        "Contains at least one uppercase letter (A-Z)",
        "Contains at least one number (0-9)",
        "Contains at least one special character (@$!%*?&)",
        "Only contains letters, numbers, and allowed special characters",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strong_password_passes() {
        let report = validate("Correct1horse!");
        assert!(report.is_valid());
        assert!(report.messages().is_empty());
    }

    #[test]
    fn each_missing_class_reports_only_itself() {
        let cases = [
            ("CORRECT1HORSE!", PolicyViolation::MissingLowercase),
            ("correct1horse!", PolicyViolation::MissingUppercase),
            ("CorrectXhorse!", PolicyViolation::MissingDigit),
            ("Correct1horseX", PolicyViolation::MissingSpecial),
        ];

        for (password, expected) in cases {
            assert_eq!(validate(password).violations, vec![expected], "{password}");
        }
    }

    #[test]
    fn short_password_reports_length() {
        assert_eq!(validate("Ab1!xyz").violations, vec![PolicyViolation::TooShort]);
    }

    #[test]
    fn disallowed_characters_are_reported() {
        let report = validate("Correct1 horse!");
        assert_eq!(report.violations, vec![PolicyViolation::DisallowedCharacter]);

        let report = validate("Correct1horse!#");
        assert_eq!(report.violations, vec![PolicyViolation::DisallowedCharacter]);
    }

    #[test]
    fn empty_password_fails_everything() {
        assert_eq!(validate("").violations.len(), 6);
    }

    #[test]
    fn missing_several_classes_reports_each_in_order() {
        let report = validate("alllowercase");
        assert_eq!(
            report.violations,
            vec![
                PolicyViolation::MissingUppercase,
                PolicyViolation::MissingDigit,
                PolicyViolation::MissingSpecial,
            ]
        );
        assert_eq!(
            report.messages()[0],
            "Password must contain at least one uppercase letter"
        );
    }
}
