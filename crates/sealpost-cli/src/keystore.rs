//! Filesystem key store.

use std::path::{Path, PathBuf};

use sealpost_client::{CollaboratorError, KeyStore, StoredKeys};
use sealpost_crypto::Zeroizing;
use tokio::{fs, io::AsyncWriteExt};

/// [`KeyStore`] persisting one identity's private keys as a JSON file.
///
/// Writes go to a sibling temp file and are renamed into place, so a crash
/// never leaves a truncated key file. On unix the temp file is created owner
/// read/write only, so the keys are never readable by others.
#[derive(Debug, Clone)]
pub struct FsKeyStore {
    path: PathBuf,
}

impl FsKeyStore {
    /// Store backed by `path`. Parent directories are created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Key file location.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyStore for FsKeyStore {
    async fn get(&self) -> Result<Option<StoredKeys>, CollaboratorError> {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => Zeroizing::new(raw),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        serde_json::from_slice(&raw).map(Some).map_err(|err| {
            CollaboratorError::Io(format!("corrupt key file {}: {err}", self.path.display()))
        })
    }

    async fn put(&self, keys: &StoredKeys) -> Result<(), CollaboratorError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let encoded = Zeroizing::new(
            serde_json::to_vec(keys).map_err(|err| CollaboratorError::Io(err.to_string()))?,
        );
        let tmp = self.path.with_extension("json.tmp");
        if let Err(err) = fs::remove_file(&tmp).await
            && err.kind() != std::io::ErrorKind::NotFound
        {
            return Err(err.into());
        }

        let mut file = create_private(&tmp).await?;
        file.write_all(encoded.as_slice()).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&tmp, &self.path).await?;

        tracing::debug!(path = %self.path.display(), "stored keys");
        Ok(())
    }

    async fn clear(&self) -> Result<(), CollaboratorError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Create `path` exclusively; on unix it is owner read/write from the start.
async fn create_private(path: &Path) -> std::io::Result<fs::File> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);
    options.open(path).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StoredKeys {
        serde_json::from_str(r#"{"encryptionPrivateKey":"ENC","signingPrivateKey":"SIG"}"#).unwrap()
    }

    #[tokio::test]
    async fn missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsKeyStore::new(dir.path().join("alice/keys.json"));

        assert_eq!(store.get().await.unwrap(), None);
    }

    #[tokio::test]
    async fn put_then_get_then_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsKeyStore::new(dir.path().join("alice/keys.json"));

        store.put(&sample()).await.unwrap();
        assert_eq!(store.get().await.unwrap(), Some(sample()));

        store.clear().await.unwrap();
        store.clear().await.unwrap();
        assert_eq!(store.get().await.unwrap(), None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn key_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FsKeyStore::new(dir.path().join("keys.json"));
        store.put(&sample()).await.unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stale_world_readable_temp_file_is_replaced() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FsKeyStore::new(dir.path().join("keys.json"));
        let tmp = dir.path().join("keys.json.tmp");
        std::fs::write(&tmp, b"leftover").unwrap();
        std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o644)).unwrap();

        store.put(&sample()).await.unwrap();

        assert!(!tmp.exists());
        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(store.get().await.unwrap(), Some(sample()));
    }

    #[tokio::test]
    async fn corrupt_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.json");
        std::fs::write(&path, b"not json").unwrap();

        let err = FsKeyStore::new(path).get().await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Io(_)));
    }
}
