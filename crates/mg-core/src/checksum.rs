//! SHA-256 checksums for detecting migrations edited after they were applied.

use sha2::{Digest, Sha256};

/// Checksum of a migration's forward and reverse bodies.
///
/// The separator keeps `("ab", "")` and `("a", "b")` from colliding.
pub fn migration_checksum(up: &str, down: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(up.as_bytes());
    hasher.update([0u8]);
    if let Some(down) = down {
        hasher.update(down.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}
