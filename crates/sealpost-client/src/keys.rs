//! The local identity's key material.

use std::sync::Arc;

use sealpost_crypto::{CryptoError, CryptoProvider, KeyPair, KeyPairManager, KeyPurpose, PrivateKey};
use sealpost_proto::KeyBundle;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// Portable form of [`LocalKeys`] as persisted by a [`crate::KeyStore`].
///
/// Holds base64 PKCS#8 private keys; the public bundle is re-derived on
/// import. Zeroized on drop, `Debug` is redacted.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredKeys {
    encryption_private_key: String,
    signing_private_key: String,
}

impl Drop for StoredKeys {
    fn drop(&mut self) {
        self.encryption_private_key.zeroize();
        self.signing_private_key.zeroize();
    }
}

impl std::fmt::Debug for StoredKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StoredKeys(..)")
    }
}

/// Both key pairs of the local identity plus the derived public bundle.
///
/// Cheap to clone; clones share the key material.
#[derive(Clone)]
pub struct LocalKeys {
    inner: Arc<LocalKeysInner>,
}

struct LocalKeysInner {
    encryption: KeyPair,
    signing: KeyPair,
    bundle: KeyBundle,
}

impl LocalKeys {
    /// Generate a fresh encryption pair and signing pair.
    pub fn generate<P: CryptoProvider>(manager: &KeyPairManager<P>) -> Result<Self, CryptoError> {
        let encryption = manager.generate_encryption_key_pair()?;
        let signing = manager.generate_signing_key_pair()?;
        Self::from_pairs(manager, encryption, signing)
    }

    /// Assemble from existing pairs, checking their purposes.
    ///
    /// # Errors
    ///
    /// - `KeyFormat`: a pair has the wrong purpose
    pub fn from_pairs<P: CryptoProvider>(
        manager: &KeyPairManager<P>,
        encryption: KeyPair,
        signing: KeyPair,
    ) -> Result<Self, CryptoError> {
        if encryption.purpose() != KeyPurpose::Encryption || signing.purpose() != KeyPurpose::Signing
        {
            return Err(CryptoError::KeyFormat {
                reason: "local keys need one encryption pair and one signing pair".to_string(),
            });
        }

        let bundle = KeyBundle::new(
            manager.export_public(encryption.public_key())?,
            manager.export_public(signing.public_key())?,
        );
        Ok(Self { inner: Arc::new(LocalKeysInner { encryption, signing, bundle }) })
    }

    /// Portable form for the key store.
    pub fn export<P: CryptoProvider>(
        &self,
        manager: &KeyPairManager<P>,
    ) -> Result<StoredKeys, CryptoError> {
        Ok(StoredKeys {
            encryption_private_key: manager
                .export_private(self.inner.encryption.private_key())?
                .to_string(),
            signing_private_key: manager.export_private(self.inner.signing.private_key())?.to_string(),
        })
    }

    /// Restore from the key store's portable form.
    ///
    /// # Errors
    ///
    /// - `KeyFormat`: either key is malformed or stored under the wrong
    ///   purpose
    pub fn import<P: CryptoProvider>(
        stored: &StoredKeys,
        manager: &KeyPairManager<P>,
    ) -> Result<Self, CryptoError> {
        let encryption =
            manager.import_private(&stored.encryption_private_key, KeyPurpose::Encryption)?;
        let signing = manager.import_private(&stored.signing_private_key, KeyPurpose::Signing)?;
        Self::from_pairs(manager, KeyPair::from_private(encryption), KeyPair::from_private(signing))
    }

    /// Public bundle to publish and embed in envelopes.
    pub fn bundle(&self) -> &KeyBundle {
        &self.inner.bundle
    }

    /// Private RSA-OAEP key used to unwrap content keys.
    pub fn encryption_key(&self) -> &PrivateKey {
        self.inner.encryption.private_key()
    }

    /// Private RSA-PSS key used to sign transcripts.
    pub fn signing_key(&self) -> &PrivateKey {
        self.inner.signing.private_key()
    }
}

impl std::fmt::Debug for LocalKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalKeys").field("bundle", &self.inner.bundle).finish_non_exhaustive()
    }
}
