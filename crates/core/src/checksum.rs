//! SHA-256 digests for upload checksums

use crate::error::Result;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Hex-encoded SHA-256 of everything `reader` yields.
pub fn compute_sha256<R: Read>(mut reader: R) -> Result<String> {
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Hex-encoded SHA-256 of a file's contents.
pub fn compute_sha256_file(path: impl AsRef<Path>) -> Result<String> {
    compute_sha256(File::open(path)?)
}
