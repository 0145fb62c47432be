//! Hex digests used by request signing and credential issuance.

use md5::Md5;
use sha2::{Digest, Sha256};

/// MD5 of a request body, hex-encoded. This is the body hash that goes
/// into the canonical string.
pub fn md5_hex(body: &[u8]) -> String {
    hex::encode(Md5::digest(body))
}

/// SHA-256 of a plaintext password, hex-encoded.
///
/// The service never accepts a raw password; clients send this value
/// instead and the service hashes it again before storage.
pub fn prehash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}
