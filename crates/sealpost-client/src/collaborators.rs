//! Collaborator traits for key storage, directory, transport, and file output.
//!
//! The orchestrator owns protocol logic only. Everything that touches disk or
//! network goes through these traits, so the same send/receive sequences run
//! against the in-memory doubles in tests and the filesystem relay in the
//! CLI.
//!
//! # Implementations
//!
//! - **Memory**: [`crate::MemoryKeyStore`], [`crate::MemoryRelay`],
//!   [`crate::MemorySink`]
//! - **Filesystem**: `sealpost-cli` key store and relay

use std::future::Future;

use sealpost_proto::{DirectoryEntry, DownloadResponse, Envelope, InboxEntry, KeyBundle, UploadReceipt};

use crate::{CollaboratorError, StoredKeys};

/// Local persistence of one identity's private keys.
///
/// Single writer. `put` replaces whatever was stored.
pub trait KeyStore: Send + Sync {
    /// Stored keys, or `None` if this device has none.
    fn get(&self) -> impl Future<Output = Result<Option<StoredKeys>, CollaboratorError>> + Send;

    /// Persist `keys`, replacing any previous keys.
    fn put(&self, keys: &StoredKeys) -> impl Future<Output = Result<(), CollaboratorError>> + Send;

    /// Remove stored keys. Succeeds if none were stored.
    fn clear(&self) -> impl Future<Output = Result<(), CollaboratorError>> + Send;
}

/// Public key directory.
pub trait Directory: Send + Sync {
    /// Published bundle for `identity`.
    ///
    /// # Errors
    ///
    /// - `NotFound`: the identity has never registered
    fn lookup_public_key(
        &self,
        identity: &str,
    ) -> impl Future<Output = Result<DirectoryEntry, CollaboratorError>> + Send;

    /// Publish `bundle` for `identity`, replacing any previous bundle.
    fn register_public_key(
        &self,
        identity: &str,
        bundle: &KeyBundle,
    ) -> impl Future<Output = Result<(), CollaboratorError>> + Send;
}

/// Envelope relay, scoped to the local identity's session.
///
/// Timeouts and retries of individual requests belong to the implementation.
pub trait Transport: Send + Sync {
    /// Store `envelope` for its receiver.
    fn upload(
        &self,
        envelope: &Envelope,
    ) -> impl Future<Output = Result<UploadReceipt, CollaboratorError>> + Send;

    /// Files waiting for the local identity.
    fn list_inbox(&self) -> impl Future<Output = Result<Vec<InboxEntry>, CollaboratorError>> + Send;

    /// Raw download response for `file_id`.
    fn fetch(
        &self,
        file_id: &str,
    ) -> impl Future<Output = Result<DownloadResponse, CollaboratorError>> + Send;
}

/// Destination for verified, decrypted files.
pub trait FileSink: Send + Sync {
    /// Save `plaintext` under `file_name`.
    fn save(
        &self,
        file_name: &str,
        plaintext: Vec<u8>,
    ) -> impl Future<Output = Result<(), CollaboratorError>> + Send;
}
