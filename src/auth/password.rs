use crate::error::{AppError, Result};

pub use bcrypt::DEFAULT_COST;

/// Salted bcrypt hash stored in the users table
pub fn hash_password(plain: &str, cost: u32) -> Result<String> {
    bcrypt::hash(plain, cost)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

/// Check a plaintext password against a stored bcrypt hash
///
/// Malformed stored values never verify.
pub fn verify_password(plain: &str, stored: &str) -> bool {
    bcrypt::verify(plain, stored).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_COST: u32 = 4; // bcrypt's (private) MIN_COST

    #[test]
    fn test_verify() {
        let hash = hash_password("s3cret", TEST_COST).unwrap();
        assert!(verify_password("s3cret", &hash));
        assert!(!verify_password("s3cret!", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        let first = hash_password("password", TEST_COST).unwrap();
        let second = hash_password("password", TEST_COST).unwrap();

        assert_ne!(first, second);
        assert!(first.starts_with("$2b$"));
        assert!(verify_password("password", &second));
    }

    #[test]
    fn test_malformed_stored_value() {
        assert!(!verify_password("s3cret", "short"));
        assert!(!verify_password(
            "password",
            "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8"
        ));
        assert!(!verify_password("", ""));
    }

    #[test]
    fn test_invalid_cost_rejected() {
        assert!(matches!(
            hash_password("s3cret", 99),
            Err(AppError::Internal(_))
        ));
    }
}
