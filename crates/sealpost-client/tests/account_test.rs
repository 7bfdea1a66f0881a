//! Account provisioning tests.
//!
//! Provisioning decides when keys may be generated. A returning account that
//! lost its local keys must be stopped, never silently re-keyed.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use sealpost_client::{
    Account, AccountStatus, CollaboratorError, Directory, ErrorKind, KeyStore, MemoryKeyStore,
    MemoryRelay, TransferError,
};
use sealpost_crypto::{KeyPairManager, SeededProvider};
use sealpost_proto::{DirectoryEntry, KeyBundle};

/// Directory whose first `failures` registrations are dropped.
#[derive(Clone)]
struct FlakyDirectory {
    relay: MemoryRelay,
    failures: Arc<AtomicUsize>,
}

impl FlakyDirectory {
    fn new(relay: &MemoryRelay, failures: usize) -> Self {
        Self { relay: relay.clone(), failures: Arc::new(AtomicUsize::new(failures)) }
    }
}

impl Directory for FlakyDirectory {
    async fn lookup_public_key(&self, identity: &str) -> Result<DirectoryEntry, CollaboratorError> {
        self.relay.lookup_public_key(identity).await
    }

    async fn register_public_key(
        &self,
        identity: &str,
        bundle: &KeyBundle,
    ) -> Result<(), CollaboratorError> {
        let dropped = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if dropped {
            return Err(CollaboratorError::Io("connection reset".to_string()));
        }
        self.relay.register_public_key(identity, bundle).await
    }
}

#[tokio::test]
async fn new_account_generates_stores_and_publishes() {
    let store = MemoryKeyStore::new();
    let relay = MemoryRelay::new();
    let account = Account::new(store.clone(), relay.clone(), SeededProvider::new(31));

    let keys = account.provision("alice", AccountStatus::New).await.unwrap();

    assert!(store.has_keys());
    let entry = relay.lookup_public_key("alice").await.unwrap();
    assert_eq!(entry.public_key, keys.bundle().to_json());
    assert_eq!(entry.bundle().signing_key(), Some(keys.bundle().signing.as_str()));
}

#[tokio::test]
async fn existing_keys_are_loaded_not_regenerated() {
    let store = MemoryKeyStore::new();
    let relay = MemoryRelay::new();
    let account = Account::new(store.clone(), relay.clone(), SeededProvider::new(32));

    let first = account.provision("alice", AccountStatus::New).await.unwrap();
    let again = account.provision("alice", AccountStatus::Existing).await.unwrap();

    assert_eq!(again.bundle(), first.bundle());
}

#[tokio::test]
async fn existing_account_without_keys_is_key_missing() {
    let store = MemoryKeyStore::new();
    let relay = MemoryRelay::new();
    let account = Account::new(store.clone(), relay.clone(), SeededProvider::new(33));

    let err = account.provision("alice", AccountStatus::Existing).await.unwrap_err();

    assert_eq!(err, TransferError::KeyMissing);
    assert!(!store.has_keys(), "no keys may be generated for a returning account");
    assert!(relay.lookup_public_key("alice").await.is_err(), "nothing may be published");
}

#[tokio::test]
async fn logout_clears_keys_and_is_idempotent() {
    let store = MemoryKeyStore::new();
    let account = Account::new(store.clone(), MemoryRelay::new(), SeededProvider::new(34));

    account.provision("alice", AccountStatus::New).await.unwrap();
    account.logout().await.unwrap();
    account.logout().await.unwrap();

    assert!(!store.has_keys());
    assert_eq!(
        account.provision("alice", AccountStatus::Existing).await.unwrap_err(),
        TransferError::KeyMissing
    );
}

#[tokio::test]
async fn corrupt_stored_keys_are_key_format_error() {
    let store = MemoryKeyStore::new();
    let manager = KeyPairManager::new(SeededProvider::new(35));
    let valid = sealpost_client::LocalKeys::generate(&manager).unwrap().export(&manager).unwrap();

    let mut json: serde_json::Value = serde_json::to_value(&valid).unwrap();
    json["signingPrivateKey"] = serde_json::Value::String("AAAA".to_string());
    store.put(&serde_json::from_value(json).unwrap()).await.unwrap();

    let account = Account::new(store, MemoryRelay::new(), SeededProvider::new(36));
    let err = account.provision("alice", AccountStatus::Existing).await.unwrap_err();

    assert!(matches!(err, TransferError::KeyFormat { .. }));
}

/// A publish that fails after the keys were stored is retried by the next
/// provision instead of leaving the account unreachable.
#[tokio::test]
async fn failed_publish_is_repaired_on_next_provision() {
    let store = MemoryKeyStore::new();
    let relay = MemoryRelay::new();
    let account = Account::new(store.clone(), FlakyDirectory::new(&relay, 1), SeededProvider::new(37));

    let err = account.provision("alice", AccountStatus::New).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(err.is_retryable());
    assert!(store.has_keys(), "generated keys must survive a failed publish");
    assert_eq!(
        relay.lookup_public_key("alice").await.unwrap_err(),
        CollaboratorError::NotFound("alice".to_string())
    );

    let keys = account.provision("alice", AccountStatus::Existing).await.unwrap();
    let entry = relay.lookup_public_key("alice").await.unwrap();
    assert_eq!(entry.public_key, keys.bundle().to_json());
}

#[tokio::test]
async fn loading_keys_does_not_republish_a_known_bundle() {
    let store = MemoryKeyStore::new();
    let relay = MemoryRelay::new();
    let account = Account::new(store.clone(), relay.clone(), SeededProvider::new(38));
    account.provision("alice", AccountStatus::New).await.unwrap();

    // Any further registration would fail; loading must not attempt one
    let strict = Account::new(store, FlakyDirectory::new(&relay, usize::MAX), SeededProvider::new(39));
    strict.provision("alice", AccountStatus::Existing).await.unwrap();
}
