//! Device token fingerprinting for logs.

use sha2::{Digest as _, Sha256};

/// Stable one-way fingerprint of a device token.
///
/// Only this value may appear in logs; the token itself never does.
pub fn token_hash(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(&digest[..8])
}
