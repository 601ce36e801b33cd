use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::Rng;

use crate::errors::ServiceError;

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const TEMP_PASSWORD_LENGTH: usize = 12;

const TEMP_PASSWORD_CHARSET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!@#$%";

/// Hash a password into a PHC string.
pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::HashError(e.to_string()))
}

/// Check a password against a stored hash. Malformed hashes never verify.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// One-time password handed to new employees and vendor accounts.
pub fn generate_temporary_password() -> String {
    let mut rng = rand::thread_rng();
    (0..TEMP_PASSWORD_LENGTH)
        .map(|_| TEMP_PASSWORD_CHARSET[rng.gen_range(0..TEMP_PASSWORD_CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("s3cret-pass").unwrap();
        assert!(verify_password("s3cret-pass", &hash));
        assert!(!verify_password("wrong", &hash));
        assert!(!verify_password("s3cret-pass", "not-a-phc-string"));
    }

    #[test]
    fn temporary_passwords_use_the_allowed_alphabet() {
        let pw = generate_temporary_password();
        assert_eq!(pw.len(), TEMP_PASSWORD_LENGTH);
        assert!(pw.bytes().all(|b| TEMP_PASSWORD_CHARSET.contains(&b)));
    }
}
