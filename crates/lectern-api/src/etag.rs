//! ETag computation for baseline snapshots.
//!
//! The ETag is a SHA-256 hash over the snapshot's serialised bytes. Snapshot
//! serialisation is deterministic, so unchanged data always yields the same
//! ETag and any change to a row in scope yields a different one.

use lectern_core::snapshot::Snapshot;
use sha2::{Digest, Sha256};

/// Compute a strong ETag (quoted hex digest) for `snapshot`.
pub fn compute_etag(snapshot: &Snapshot) -> serde_json::Result<String> {
  let bytes = serde_json::to_vec(snapshot)?;
  let hash = Sha256::digest(&bytes);
  Ok(format!("\"{}\"", hex::encode(hash)))
}
