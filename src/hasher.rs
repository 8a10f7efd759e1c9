//! Content fingerprints.
//!
//! Files are hashed with SHA-256 in fixed-size chunks, so memory use does not
//! grow with file size. Two files with the same fingerprint are duplicates no
//! matter their names, timestamps or locations.

use crate::error::{OrganizeError, OrganizeResult};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

/// Chunk size for streaming hash computation (1 MiB)
pub const CHUNK_SIZE: usize = 1 << 20;

/// SHA-256 digest of a file's full byte content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Computes the fingerprint of everything `reader` yields.
pub fn fingerprint_reader<R: Read>(mut reader: R) -> std::io::Result<Fingerprint> {
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..bytes_read]);
    }

    let mut digest = [0u8; 32];
    digest.copy_from_slice(&hasher.finalize());
    Ok(Fingerprint(digest))
}

/// Computes the fingerprint of the file at `path`.
///
/// Fails with `OrganizeError::Read` if the file cannot be opened or a read
/// fails part-way through.
pub fn fingerprint(path: &Path) -> OrganizeResult<Fingerprint> {
    let read_error = |source| OrganizeError::Read {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(read_error)?;
    fingerprint_reader(file).map_err(read_error)
}
