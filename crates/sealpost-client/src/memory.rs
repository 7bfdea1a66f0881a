//! In-memory collaborators for tests and simulation.
//!
//! State is shared through `Arc<Mutex<_>>`, so clones observe the same store.
//! Locks are never held across an await.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use sealpost_proto::{
    DirectoryEntry, DownloadResponse, Envelope, InboxEntry, KeyBundle, UploadReceipt, headers,
};

use crate::{CollaboratorError, Directory, FileSink, KeyStore, StoredKeys, Transport};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory [`KeyStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyStore {
    keys: Arc<Mutex<Option<StoredKeys>>>,
}

impl MemoryKeyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if keys are stored.
    pub fn has_keys(&self) -> bool {
        lock(&self.keys).is_some()
    }
}

impl KeyStore for MemoryKeyStore {
    async fn get(&self) -> Result<Option<StoredKeys>, CollaboratorError> {
        Ok(lock(&self.keys).clone())
    }

    async fn put(&self, keys: &StoredKeys) -> Result<(), CollaboratorError> {
        *lock(&self.keys) = Some(keys.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), CollaboratorError> {
        *lock(&self.keys) = None;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct RelayInner {
    /// Published bundles by identity
    directory: HashMap<String, String>,

    /// Mailboxes by receiver, files in upload order (ids are zero-padded
    /// counters, so string order is upload order)
    mailboxes: HashMap<String, BTreeMap<String, StoredFile>>,

    /// Monotonic counter for file ids and upload stamps
    uploads: u64,

    /// Serve downloads in the header-carrying binary shape
    binary_downloads: bool,
}

#[derive(Debug, Clone)]
struct StoredFile {
    entry: InboxEntry,
    envelope: Envelope,
}

/// In-memory relay acting as both [`Directory`] and [`Transport`].
///
/// One relay is shared by every participant; [`MemoryRelay::session`] scopes
/// a handle to the identity that uploads and lists. Upload stamps are a
/// logical counter, not wall-clock time.
#[derive(Debug, Clone)]
pub struct MemoryRelay {
    inner: Arc<Mutex<RelayInner>>,
    identity: String,
}

impl MemoryRelay {
    /// Create an empty relay with an anonymous session.
    pub fn new() -> Self {
        Self { inner: Arc::new(Mutex::new(RelayInner::default())), identity: String::new() }
    }

    /// Handle to the same relay acting as `identity`.
    #[must_use]
    pub fn session(&self, identity: &str) -> Self {
        Self { inner: Arc::clone(&self.inner), identity: identity.to_string() }
    }

    /// Serve downloads as raw body plus headers instead of JSON.
    pub fn set_binary_downloads(&self, enabled: bool) {
        lock(&self.inner).binary_downloads = enabled;
    }

    /// Publish a raw key string, bypassing [`KeyBundle`] encoding.
    pub fn publish_raw(&self, identity: &str, public_key: &str) {
        lock(&self.inner).directory.insert(identity.to_string(), public_key.to_string());
    }

    /// Mutate a stored envelope in place, as a hostile relay could.
    ///
    /// Returns false if no such file exists.
    pub fn tamper(&self, receiver: &str, file_id: &str, edit: impl FnOnce(&mut Envelope)) -> bool {
        let mut inner = lock(&self.inner);
        let Some(file) = inner.mailboxes.get_mut(receiver).and_then(|m| m.get_mut(file_id)) else {
            return false;
        };
        edit(&mut file.envelope);
        true
    }

    /// Number of files waiting for `receiver`.
    pub fn pending(&self, receiver: &str) -> usize {
        lock(&self.inner).mailboxes.get(receiver).map_or(0, BTreeMap::len)
    }
}

impl Default for MemoryRelay {
    fn default() -> Self {
        Self::new()
    }
}

impl Directory for MemoryRelay {
    async fn lookup_public_key(&self, identity: &str) -> Result<DirectoryEntry, CollaboratorError> {
        let inner = lock(&self.inner);
        let public_key = inner
            .directory
            .get(identity)
            .ok_or_else(|| CollaboratorError::NotFound(identity.to_string()))?;
        Ok(DirectoryEntry { user_id: identity.to_string(), public_key: public_key.clone() })
    }

    async fn register_public_key(
        &self,
        identity: &str,
        bundle: &KeyBundle,
    ) -> Result<(), CollaboratorError> {
        lock(&self.inner).directory.insert(identity.to_string(), bundle.to_json());
        Ok(())
    }
}

impl Transport for MemoryRelay {
    async fn upload(&self, envelope: &Envelope) -> Result<UploadReceipt, CollaboratorError> {
        let mut inner = lock(&self.inner);
        if !inner.directory.contains_key(&envelope.receiver_id) {
            return Err(CollaboratorError::NotFound(envelope.receiver_id.clone()));
        }

        inner.uploads += 1;
        let file_id = format!("file-{:020}", inner.uploads);
        let entry = InboxEntry {
            file_id: file_id.clone(),
            file_name: envelope.file_name.clone(),
            sender_id: self.identity.clone(),
            uploaded_at: inner.uploads.to_string(),
        };
        inner
            .mailboxes
            .entry(envelope.receiver_id.clone())
            .or_default()
            .insert(file_id.clone(), StoredFile { entry, envelope: envelope.clone() });

        Ok(UploadReceipt { file_id })
    }

    async fn list_inbox(&self) -> Result<Vec<InboxEntry>, CollaboratorError> {
        let inner = lock(&self.inner);
        Ok(inner
            .mailboxes
            .get(&self.identity)
            .map(|mailbox| mailbox.values().map(|file| file.entry.clone()).collect())
            .unwrap_or_default())
    }

    async fn fetch(&self, file_id: &str) -> Result<DownloadResponse, CollaboratorError> {
        let inner = lock(&self.inner);
        let file = inner
            .mailboxes
            .get(&self.identity)
            .and_then(|mailbox| mailbox.get(file_id))
            .ok_or_else(|| CollaboratorError::NotFound(file_id.to_string()))?;

        if inner.binary_downloads {
            Ok(binary_response(&file.envelope))
        } else {
            Ok(DownloadResponse::new(file.envelope.to_json()))
        }
    }
}

fn binary_response(envelope: &Envelope) -> DownloadResponse {
    use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};

    DownloadResponse::new(envelope.ciphertext.clone())
        .with_header(headers::ENCRYPTED_AES_KEY, BASE64.encode(&envelope.wrapped_key))
        .with_header(headers::NONCE, BASE64.encode(envelope.nonce.as_bytes()))
        .with_header(headers::AUTH_TAG, BASE64.encode(envelope.tag.as_bytes()))
        .with_header(headers::SIGNATURE, BASE64.encode(envelope.signature.as_bytes()))
        .with_header(headers::SENDER_PUBLIC_KEY, envelope.sender_bundle.clone())
        .with_header(headers::FILE_NAME, urlencoding::encode(&envelope.file_name).into_owned())
        .with_header(headers::RECEIVER_ID, envelope.receiver_id.clone())
}

/// In-memory [`FileSink`] recording every saved file.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    files: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Saved files in save order.
    pub fn files(&self) -> Vec<(String, Vec<u8>)> {
        lock(&self.files).clone()
    }
}

impl FileSink for MemorySink {
    async fn save(&self, file_name: &str, plaintext: Vec<u8>) -> Result<(), CollaboratorError> {
        lock(&self.files).push((file_name.to_string(), plaintext));
        Ok(())
    }
}
