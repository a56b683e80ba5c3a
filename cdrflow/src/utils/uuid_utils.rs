//! Identifier helpers: instance ids, namespace suffixes and idempotency tokens.

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Length of a generated namespace suffix.
pub const NAMESPACE_SUFFIX_LEN: usize = 8;

/// Generates a new random UUID (v4).
#[must_use]
pub fn generate_uuid() -> Uuid {
    Uuid::new_v4()
}

/// Generates a short lowercase suffix suitable for resource names.
#[must_use]
pub fn generate_suffix() -> String {
    let simple = Uuid::new_v4().simple().to_string();
    simple[simple.len() - NAMESPACE_SUFFIX_LEN..].to_string()
}

/// Derives a deterministic token for an action-start call.
///
/// The same run and stage always yield the same token, so a repeated start
/// call is recognisable as a duplicate by the receiving service.
#[must_use]
pub fn idempotency_token(run_id: Uuid, stage_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(run_id.as_bytes());
    hasher.update(b":");
    hasher.update(stage_key.as_bytes());
    hex::encode(hasher.finalize())
}
