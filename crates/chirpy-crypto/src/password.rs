use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use tracing::error;

use chirpy_types::{Error, Result};

/// Hash a password with Argon2id and a fresh salt.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| Error::internal(format!("password hashing failed: {}", e)))?;
    Ok(hash.to_string())
}

/// Check `password` against a stored PHC string.
///
/// A mismatch is `Error::Auth`. A stored hash that does not parse is
/// `Error::Internal`, since it means the document is damaged rather than the
/// caller being wrong.
pub fn verify_password(hash: &str, password: &str) -> Result<()> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!("Stored password hash is malformed: {}", e);
        Error::internal("malformed password hash")
    })?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| Error::auth("invalid credentials"))
}
