use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};

/// Generate an opaque trigger token for the scheduler to send.
/// Only hash(token) goes into the server configuration.
// Called from the hashtoken binary; the server itself only verifies.
#[cfg_attr(not(test), allow(dead_code))]
pub fn generate_access_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Hash token for config storage (SHA-256 hex).
pub fn hash_access_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    let out = hasher.finalize();
    hex::encode(out)
}

/// Compare a presented token against the configured hash.
pub fn token_matches(token: &str, expected_hash: &str) -> bool {
    let presented = hash_access_token(token);
    // Both sides are 64 hex chars; fold to avoid an early exit on mismatch.
    presented.len() == expected_hash.len()
        && presented
            .bytes()
            .zip(expected_hash.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}
