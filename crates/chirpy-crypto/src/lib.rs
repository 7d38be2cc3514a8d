/// Chirpy credential verification.
///
/// Passwords are hashed with Argon2id and a per-password random salt. The
/// stored form is the PHC string, which carries the algorithm, cost
/// parameters and salt alongside the digest.
pub mod password;

pub use password::{hash_password, verify_password};
