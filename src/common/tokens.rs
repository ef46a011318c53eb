// src/common/tokens.rs

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Unguessable opaque token: 32 random bytes, hex encoded.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Tokens that are looked up but never shown again are stored hashed.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
