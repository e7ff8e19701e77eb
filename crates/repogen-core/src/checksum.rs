use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{RepoError, Result};

const ARCHIVE_HASH_EXT: &str = "sha256";

/// Lowercase hex MD5, the digest repository consumers expect for the index
pub fn compute_md5(content: &[u8]) -> String {
    format!("{:x}", md5::compute(content))
}

pub fn compute_sha256(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

pub fn sha256_file(path: &Path) -> Result<String> {
    let content = fs::read(path)?;
    Ok(compute_sha256(&content))
}

/// Digest the index file as it exists on disk and store the hex string.
///
/// Nothing is written when the index is missing.
pub fn write_checksum(index_path: &Path, checksum_path: &Path) -> Result<String> {
    let content = read_index(index_path)?;
    let digest = compute_md5(&content);
    fs::write(checksum_path, &digest)?;
    Ok(digest)
}

/// Recompute the index digest and compare it with the stored checksum.
pub fn verify_checksum(index_path: &Path, checksum_path: &Path) -> Result<String> {
    let content = read_index(index_path)?;
    let actual = compute_md5(&content);
    let expected = fs::read_to_string(checksum_path)?.trim().to_ascii_lowercase();

    if expected != actual {
        return Err(RepoError::ChecksumMismatch {
            path: index_path.to_path_buf(),
            expected,
            actual,
        });
    }
    Ok(actual)
}

fn read_index(index_path: &Path) -> Result<Vec<u8>> {
    if !index_path.is_file() {
        return Err(RepoError::ChecksumSourceMissing {
            path: index_path.to_path_buf(),
        });
    }
    Ok(fs::read(index_path)?)
}

/// `<archive>.sha256`
pub fn archive_hash_path(archive: &Path) -> PathBuf {
    let mut name = archive.as_os_str().to_os_string();
    name.push(".");
    name.push(ARCHIVE_HASH_EXT);
    PathBuf::from(name)
}

/// Write the SHA-256 of an archive next to it
pub fn write_archive_hash(archive: &Path) -> Result<PathBuf> {
    let digest = sha256_file(archive)?;
    let path = archive_hash_path(archive);
    fs::write(&path, digest)?;
    Ok(path)
}
