// File system locations for the local database and config
use sha2::{Digest, Sha256};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

const APP_IDENTIFIER: &str = "com.opendatajabar.app";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to get app data directory")]
    NoAppDataDir,
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Get the app data directory, creating it if needed
pub fn get_app_data_dir() -> StorageResult<PathBuf> {
    let data_dir = dirs::data_dir().ok_or(StorageError::NoAppDataDir)?;
    let app_dir = data_dir.join(APP_IDENTIFIER);
    fs::create_dir_all(&app_dir)?;
    Ok(app_dir)
}

/// Resolve a file name inside the app data directory
pub fn app_data_file(name: &str) -> StorageResult<PathBuf> {
    Ok(get_app_data_dir()?.join(name))
}

/// Calculate SHA256 hash of data
pub fn calculate_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_sha256() {
        let data = b"hello world";
        let hash = calculate_sha256(data);
        assert_eq!(
            hash,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_empty_digest_is_stable() {
        assert_eq!(calculate_sha256(b""), calculate_sha256(&[]));
        assert_ne!(calculate_sha256(b"a"), calculate_sha256(b"b"));
    }
}
