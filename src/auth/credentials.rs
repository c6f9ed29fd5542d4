use rand::Rng;
use sha2::{Digest, Sha256};

const PASSWORD_COST: u32 = 10;

pub fn hash_password(plain: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(plain, PASSWORD_COST)
}

/// Constant-time via bcrypt. A malformed stored hash never matches.
pub fn verify_password(plain: &str, hash: &str) -> bool {
    bcrypt::verify(plain, hash).unwrap_or(false)
}

/// Reset tokens carry 256 bits of entropy, so a fast digest is enough.
pub fn hash_reset_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Stable avatar identifier for an email address.
pub fn derive_avatar(email: &str) -> String {
    let normalized = email.trim().to_lowercase();
    hex::encode(Sha256::digest(normalized.as_bytes()))
}

/// Generate a cryptographically random 32-byte hex token.
pub fn generate_reset_token() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    hex::encode(bytes)
}
