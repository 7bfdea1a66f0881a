//! Account provisioning and logout.

use sealpost_crypto::{CryptoProvider, KeyPairManager};

use crate::{CollaboratorError, Directory, KeyStore, LocalKeys, TransferError};

/// Whether the identity provider knows this account already.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountStatus {
    /// First sign-in; keys may be generated.
    New,
    /// Returning account; keys must already be on this device.
    Existing,
}

/// Local key lifecycle for one identity.
#[derive(Debug, Clone)]
pub struct Account<K, D, P> {
    store: K,
    directory: D,
    manager: KeyPairManager<P>,
}

impl<K, D, P> Account<K, D, P>
where
    K: KeyStore,
    D: Directory,
    P: CryptoProvider,
{
    /// Create an account over the given collaborators.
    pub fn new(store: K, directory: D, provider: P) -> Self {
        Self { store, directory, manager: KeyPairManager::new(provider) }
    }

    /// Load or create the local keys for `identity`.
    ///
    /// - Keys in the store are imported and returned. If the directory does
    ///   not know `identity`, the bundle is published again, so a publish
    ///   that failed after the keys were stored is repaired here.
    /// - A new account without keys generates both pairs, stores them, and
    ///   publishes the public bundle.
    /// - An existing account without keys is refused; files already sent to
    ///   the published bundle stay undecryptable on this device.
    ///
    /// # Errors
    ///
    /// - `KeyMissing`: existing account with no local keys
    /// - `KeyFormat`: stored keys are corrupt
    /// - `Storage`: key store failed
    /// - `Lookup`: directory refused the bundle for this identity
    /// - `Transport`: directory unreachable while publishing (retryable; the
    ///   stored keys are kept and published on the next call)
    pub async fn provision(
        &self,
        identity: &str,
        status: AccountStatus,
    ) -> Result<LocalKeys, TransferError> {
        if let Some(stored) = self.store.get().await.map_err(TransferError::storage)? {
            let keys = LocalKeys::import(&stored, &self.manager)?;
            tracing::debug!(identity, "loaded local keys");
            self.ensure_published(identity, &keys).await?;
            return Ok(keys);
        }

        if status == AccountStatus::Existing {
            tracing::warn!(identity, "existing account has no local keys");
            return Err(TransferError::KeyMissing);
        }

        let manager = self.manager.clone();
        let keys = tokio::task::spawn_blocking(move || LocalKeys::generate(&manager))
            .await
            .map_err(|join| TransferError::CryptoOperation {
                operation: "key generation task",
                reason: join.to_string(),
            })??;

        let stored = keys.export(&self.manager)?;
        self.store.put(&stored).await.map_err(TransferError::storage)?;
        self.publish(identity, &keys).await?;

        tracing::info!(identity, "provisioned new account keys");
        Ok(keys)
    }

    async fn publish(&self, identity: &str, keys: &LocalKeys) -> Result<(), TransferError> {
        self.directory
            .register_public_key(identity, keys.bundle())
            .await
            .map_err(|e| TransferError::directory(identity, e))
    }

    async fn ensure_published(&self, identity: &str, keys: &LocalKeys) -> Result<(), TransferError> {
        match self.directory.lookup_public_key(identity).await {
            Ok(entry) => {
                if entry.public_key != keys.bundle().to_json() {
                    tracing::warn!(identity, "directory holds a different bundle for this account");
                }
                Ok(())
            },
            Err(CollaboratorError::NotFound(_)) => {
                tracing::info!(identity, "bundle missing from directory, publishing");
                self.publish(identity, keys).await
            },
            Err(CollaboratorError::Io(reason)) => {
                tracing::warn!(identity, %reason, "directory unreachable, publication not checked");
                Ok(())
            },
        }
    }

    /// Clear local keys. Idempotent.
    pub async fn logout(&self) -> Result<(), TransferError> {
        match self.store.clear().await {
            Ok(()) | Err(CollaboratorError::NotFound(_)) => Ok(()),
            Err(err) => Err(TransferError::storage(err)),
        }
    }
}
