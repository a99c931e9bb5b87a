//! SHA-256 digests of archive files.

use super::error::{ErrorExt, Result};
use sha2::{Digest, Sha256};
use std::{fs::File, io, path::Path};

/// Hash a file on disk, returning the lowercase hex digest.
///
/// Blocking; call from a blocking context.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).fs_context("opening archive for hashing", path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).fs_context("hashing archive", path)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Hash an in-memory buffer, returning the lowercase hex digest.
pub fn sha256_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_value() {
        assert_eq!(
            sha256_bytes(b"hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_file_and_bytes_agree() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, b"world").unwrap();
        assert_eq!(sha256_file(&path).unwrap(), sha256_bytes(b"world"));
    }
}
