//! SHA-256 check that a restored file matches its snapshot

use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::RestoreError;
use crate::fs::HostFs;

/// Lowercase hex SHA-256 of `bytes`
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Read `target` back and compare it with the snapshot content that was written
pub fn verify_restored(fs: &impl HostFs, target: &Path, expected: &[u8]) -> Result<(), RestoreError> {
    let written = fs.read(target).map_err(|source| RestoreError::ReadBack {
        path: target.to_path_buf(),
        source,
    })?;

    let expected_hash = sha256_hex(expected);
    let actual_hash = sha256_hex(&written);
    if expected_hash != actual_hash {
        return Err(RestoreError::VerificationFailed {
            path: target.to_path_buf(),
            expected: expected_hash,
            actual: actual_hash,
        });
    }

    tracing::debug!("✔️  Verified {} (sha256 {})", target.display(), actual_hash);
    Ok(())
}
