use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use crate::error::AppError;

/// Prefix of every hash this service writes.
const ARGON2_PREFIX: &str = "$argon2";

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);

    let argon2 = Argon2::default();

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .to_string();

    Ok(password_hash)
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    let result = Argon2::default().verify_password(password.as_bytes(), &parsed_hash);

    match result {
        Ok(_) => Ok(true),
        Err(_) => Ok(false),
    }
}

/// Rows imported from the old site may still hold the password itself.
pub fn is_legacy_hash(stored: &str) -> bool {
    !stored.starts_with(ARGON2_PREFIX)
}

/// Checks a login or current-password attempt against a stored credential,
/// accepting legacy plain-text rows so their owners can reach the reset gate.
pub fn verify_stored_password(password: &str, stored: &str) -> Result<bool, AppError> {
    if is_legacy_hash(stored) {
        return Ok(!stored.is_empty() && stored == password);
    }
    verify_password(password, stored)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_round_trip() {
        let hash = hash_password("Sup3r$ecret").unwrap();
        assert!(!is_legacy_hash(&hash));
        assert!(verify_password("Sup3r$ecret", &hash).unwrap());
        assert!(!verify_password("sup3r$ecret", &hash).unwrap());
    }

    #[test]
    fn legacy_rows_compare_directly() {
        assert!(is_legacy_hash("hunter2"));
        assert!(verify_stored_password("hunter2", "hunter2").unwrap());
        assert!(!verify_stored_password("hunter3", "hunter2").unwrap());
        assert!(!verify_stored_password("", "").unwrap());
    }
}
