//! Shared-directory relay.
//!
//! A directory tree standing in for the relay service: the public key
//! directory and one mailbox per receiver. Anyone with write access to the
//! tree can swap keys or rewrite envelopes, which the receive path detects
//! through the signature and key checks.

use std::path::{Path, PathBuf};

use sealpost_client::{CollaboratorError, Directory, Transport};
use sealpost_crypto::{CryptoProvider, SystemProvider};
use sealpost_proto::{DirectoryEntry, DownloadResponse, Envelope, InboxEntry, KeyBundle, UploadReceipt};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::validate_identity;

/// Random bytes in a relay file id.
const FILE_ID_BYTES: usize = 16;

/// One mailbox file.
#[derive(Debug, Serialize, Deserialize)]
struct MailboxRecord {
    entry: InboxEntry,
    envelope: Envelope,
}

/// Filesystem relay acting as both [`Directory`] and [`Transport`].
///
/// `identity` is the session owner: uploads are stamped with it and
/// `list_inbox`/`fetch` read its mailbox.
#[derive(Debug, Clone)]
pub struct FsRelay {
    root: PathBuf,
    identity: String,
}

impl FsRelay {
    /// Relay rooted at `root`, acting as `identity`.
    pub fn new(root: impl Into<PathBuf>, identity: impl Into<String>) -> Self {
        Self { root: root.into(), identity: identity.into() }
    }

    /// Relay root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn directory_path(&self, identity: &str) -> Result<PathBuf, CollaboratorError> {
        checked_identity(identity)?;
        Ok(self.root.join("directory").join(format!("{identity}.json")))
    }

    fn mailbox(&self, receiver: &str) -> Result<PathBuf, CollaboratorError> {
        checked_identity(receiver)?;
        Ok(self.root.join("mailbox").join(receiver))
    }
}

impl Directory for FsRelay {
    async fn lookup_public_key(&self, identity: &str) -> Result<DirectoryEntry, CollaboratorError> {
        let raw = fs::read(self.directory_path(identity)?).await.map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => CollaboratorError::NotFound(identity.to_string()),
            _ => err.into(),
        })?;
        serde_json::from_slice(&raw)
            .map_err(|err| CollaboratorError::Io(format!("corrupt directory entry: {err}")))
    }

    async fn register_public_key(
        &self,
        identity: &str,
        bundle: &KeyBundle,
    ) -> Result<(), CollaboratorError> {
        let entry = DirectoryEntry { user_id: identity.to_string(), public_key: bundle.to_json() };
        write_json(&self.directory_path(identity)?, &entry).await?;
        tracing::info!(identity, "registered public key bundle");
        Ok(())
    }
}

impl Transport for FsRelay {
    async fn upload(&self, envelope: &Envelope) -> Result<UploadReceipt, CollaboratorError> {
        let receiver = envelope.receiver_id.as_str();
        if fs::metadata(self.directory_path(receiver)?).await.is_err() {
            return Err(CollaboratorError::NotFound(receiver.to_string()));
        }

        let file_id = new_file_id();
        let entry = InboxEntry {
            file_id: file_id.clone(),
            file_name: envelope.file_name.clone(),
            sender_id: self.identity.clone(),
            uploaded_at: unix_seconds().to_string(),
        };
        let record = MailboxRecord { entry, envelope: envelope.clone() };
        write_json(&self.mailbox(receiver)?.join(format!("{file_id}.json")), &record).await?;

        tracing::debug!(receiver, file_id, "stored envelope");
        Ok(UploadReceipt { file_id })
    }

    async fn list_inbox(&self) -> Result<Vec<InboxEntry>, CollaboratorError> {
        let mailbox = self.mailbox(&self.identity)?;
        let mut dir = match fs::read_dir(&mailbox).await {
            Ok(dir) => dir,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut entries = Vec::new();
        while let Some(file) = dir.next_entry().await? {
            let path = file.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            match read_record(&path).await {
                Ok(record) => entries.push(record.entry),
                Err(err) => tracing::warn!(path = %path.display(), error = %err, "skipping mailbox file"),
            }
        }

        entries.sort_by(|a, b| {
            let stamp = |e: &InboxEntry| e.uploaded_at.parse::<u64>().unwrap_or(0);
            stamp(a).cmp(&stamp(b)).then_with(|| a.file_id.cmp(&b.file_id))
        });
        Ok(entries)
    }

    async fn fetch(&self, file_id: &str) -> Result<DownloadResponse, CollaboratorError> {
        if !is_file_id(file_id) {
            return Err(CollaboratorError::NotFound(file_id.to_string()));
        }

        let path = self.mailbox(&self.identity)?.join(format!("{file_id}.json"));
        let record = read_record(&path).await?;
        Ok(DownloadResponse::new(record.envelope.to_json()))
    }
}

fn checked_identity(identity: &str) -> Result<(), CollaboratorError> {
    validate_identity(identity).map_err(|_| CollaboratorError::NotFound(identity.to_string()))
}

fn new_file_id() -> String {
    let mut bytes = [0u8; FILE_ID_BYTES];
    SystemProvider::new().random_bytes(&mut bytes);
    hex::encode(bytes)
}

fn is_file_id(file_id: &str) -> bool {
    file_id.len() == FILE_ID_BYTES * 2 && file_id.bytes().all(|b| b.is_ascii_hexdigit())
}

#[allow(clippy::disallowed_methods)]
fn unix_seconds() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}

async fn read_record(path: &Path) -> Result<MailboxRecord, CollaboratorError> {
    let raw = fs::read(path).await?;
    serde_json::from_slice(&raw)
        .map_err(|err| CollaboratorError::Io(format!("corrupt mailbox record: {err}")))
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), CollaboratorError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let encoded = serde_json::to_vec(value).map_err(|err| CollaboratorError::Io(err.to_string()))?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, encoded).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_ids_are_hex_and_unique() {
        let a = new_file_id();
        let b = new_file_id();

        assert!(is_file_id(&a));
        assert_ne!(a, b);
    }

    #[test]
    fn path_like_file_ids_are_rejected() {
        assert!(!is_file_id("../../directory/alice"));
        assert!(!is_file_id(""));
        assert!(!is_file_id(&"g".repeat(32)));
    }

    #[tokio::test]
    async fn lookup_of_unregistered_identity_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let relay = FsRelay::new(dir.path(), "alice");

        let err = relay.lookup_public_key("bob").await.unwrap_err();
        assert_eq!(err, CollaboratorError::NotFound("bob".to_string()));

        let err = relay.lookup_public_key("../bob").await.unwrap_err();
        assert!(matches!(err, CollaboratorError::NotFound(_)));
    }

    #[tokio::test]
    async fn register_then_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let relay = FsRelay::new(dir.path(), "alice");
        let bundle = KeyBundle::new("ENC", "SIG");

        relay.register_public_key("alice", &bundle).await.unwrap();
        let entry = relay.lookup_public_key("alice").await.unwrap();

        assert_eq!(entry.user_id, "alice");
        assert_eq!(entry.public_key, bundle.to_json());
    }

    #[tokio::test]
    async fn empty_mailbox_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let relay = FsRelay::new(dir.path(), "alice");

        assert!(relay.list_inbox().await.unwrap().is_empty());
    }
}
