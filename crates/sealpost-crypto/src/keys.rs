//! RSA key pair generation and portable encoding.
//!
//! Public keys are exported as base64 SPKI, private keys as base64 PKCS#8.
//! The AlgorithmIdentifier records the key's purpose:
//!
//! - Encryption: `rsaEncryption` (1.2.840.113549.1.1.1), NULL parameters
//! - Signing: `id-RSASSA-PSS` (1.2.840.113549.1.1.10), parameters absent
//!   (RFC 4055 §3.1: the key may be used with any PSS parameters)
//!
//! Import checks the identifier against the requested purpose, so a signing
//! key can never be imported as an encryption key or the reverse.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use rsa::{
    RsaPrivateKey, RsaPublicKey,
    pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPrivateKey, EncodeRsaPublicKey},
    pkcs8::{
        ObjectIdentifier, PrivateKeyInfo,
        der::{
            Encode,
            asn1::{AnyRef, BitStringRef},
        },
        spki::{AlgorithmIdentifierRef, SubjectPublicKeyInfoRef},
    },
    traits::PublicKeyParts,
};
use zeroize::Zeroizing;

use crate::{CryptoError, CryptoProvider, PUBLIC_EXPONENT, RSA_MODULUS_BITS};

/// `rsaEncryption` (PKCS #1).
const RSA_ENCRYPTION_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");

/// `id-RSASSA-PSS` (RFC 4055).
const RSASSA_PSS_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.10");

/// What a key pair may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyPurpose {
    /// RSA-OAEP content-key wrapping.
    Encryption,
    /// RSA-PSS signing.
    Signing,
}

impl KeyPurpose {
    /// Human-readable name used in errors and logs.
    pub fn label(self) -> &'static str {
        match self {
            Self::Encryption => "encryption",
            Self::Signing => "signing",
        }
    }

    fn oid(self) -> ObjectIdentifier {
        match self {
            Self::Encryption => RSA_ENCRYPTION_OID,
            Self::Signing => RSASSA_PSS_OID,
        }
    }

    fn algorithm(self) -> AlgorithmIdentifierRef<'static> {
        match self {
            Self::Encryption => {
                AlgorithmIdentifierRef { oid: RSA_ENCRYPTION_OID, parameters: Some(AnyRef::NULL) }
            },
            Self::Signing => AlgorithmIdentifierRef { oid: RSASSA_PSS_OID, parameters: None },
        }
    }

    fn check(self, found: ObjectIdentifier) -> Result<(), CryptoError> {
        if found == self.oid() {
            return Ok(());
        }
        let found_label = if found == RSA_ENCRYPTION_OID {
            Self::Encryption.label().to_string()
        } else if found == RSASSA_PSS_OID {
            Self::Signing.label().to_string()
        } else {
            found.to_string()
        };
        Err(CryptoError::key_format(format!(
            "expected {} key, found {found_label} key",
            self.label()
        )))
    }
}

/// RSA public key tagged with its purpose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    purpose: KeyPurpose,
    inner: RsaPublicKey,
}

impl PublicKey {
    /// Purpose this key was generated or imported for.
    pub fn purpose(&self) -> KeyPurpose {
        self.purpose
    }

    /// Underlying RSA key, if it has the required purpose.
    pub(crate) fn rsa_for(&self, purpose: KeyPurpose) -> Result<&RsaPublicKey, CryptoError> {
        purpose.check(self.purpose.oid())?;
        Ok(&self.inner)
    }
}

/// RSA private key tagged with its purpose.
///
/// `Debug` never prints key material.
#[derive(Clone)]
pub struct PrivateKey {
    purpose: KeyPurpose,
    inner: RsaPrivateKey,
}

impl PrivateKey {
    /// Purpose this key was generated or imported for.
    pub fn purpose(&self) -> KeyPurpose {
        self.purpose
    }

    /// Matching public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey { purpose: self.purpose, inner: self.inner.to_public_key() }
    }

    pub(crate) fn rsa_for(&self, purpose: KeyPurpose) -> Result<&RsaPrivateKey, CryptoError> {
        purpose.check(self.purpose.oid())?;
        Ok(&self.inner)
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKey").field("purpose", &self.purpose).finish_non_exhaustive()
    }
}

/// A generated key pair.
#[derive(Debug, Clone)]
pub struct KeyPair {
    public: PublicKey,
    private: PrivateKey,
}

impl KeyPair {
    /// Purpose of both halves.
    pub fn purpose(&self) -> KeyPurpose {
        self.private.purpose
    }

    /// Public half, safe to publish.
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Private half. Never transmitted.
    pub fn private_key(&self) -> &PrivateKey {
        &self.private
    }

    /// Rebuild a pair from its private half.
    pub fn from_private(private: PrivateKey) -> Self {
        Self { public: private.public_key(), private }
    }

    /// Split into (public, private).
    pub fn into_parts(self) -> (PublicKey, PrivateKey) {
        (self.public, self.private)
    }
}

/// Generates, exports, and imports RSA key pairs.
///
/// Stateless apart from the provider, has no side effects beyond returning
/// key handles. Persistence belongs to the caller.
#[derive(Debug, Clone)]
pub struct KeyPairManager<P> {
    provider: P,
}

impl<P: CryptoProvider> KeyPairManager<P> {
    /// Create a manager drawing randomness from `provider`.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Generate a 2048-bit RSA-OAEP key pair (e = 65537).
    pub fn generate_encryption_key_pair(&self) -> Result<KeyPair, CryptoError> {
        self.generate(KeyPurpose::Encryption)
    }

    /// Generate a 2048-bit RSA-PSS key pair (e = 65537).
    pub fn generate_signing_key_pair(&self) -> Result<KeyPair, CryptoError> {
        self.generate(KeyPurpose::Signing)
    }

    fn generate(&self, purpose: KeyPurpose) -> Result<KeyPair, CryptoError> {
        let inner = self.provider.generate_rsa_key(RSA_MODULUS_BITS, PUBLIC_EXPONENT)?;
        tracing::debug!(purpose = purpose.label(), bits = RSA_MODULUS_BITS, "generated key pair");

        Ok(KeyPair::from_private(PrivateKey { purpose, inner }))
    }

    /// Export a public key as base64 SPKI.
    pub fn export_public(&self, key: &PublicKey) -> Result<String, CryptoError> {
        let pkcs1 = key.inner.to_pkcs1_der().map_err(CryptoError::key_format)?;
        let spki = SubjectPublicKeyInfoRef {
            algorithm: key.purpose.algorithm(),
            subject_public_key: BitStringRef::from_bytes(pkcs1.as_bytes())
                .map_err(CryptoError::key_format)?,
        };
        let der = spki.to_der().map_err(CryptoError::key_format)?;
        Ok(BASE64.encode(der))
    }

    /// Export a private key as base64 PKCS#8.
    pub fn export_private(&self, key: &PrivateKey) -> Result<Zeroizing<String>, CryptoError> {
        let pkcs1 = key.inner.to_pkcs1_der().map_err(CryptoError::key_format)?;
        let info = PrivateKeyInfo::new(key.purpose.algorithm(), pkcs1.as_bytes());
        let der = Zeroizing::new(info.to_der().map_err(CryptoError::key_format)?);
        Ok(Zeroizing::new(BASE64.encode(der.as_slice())))
    }

    /// Import a base64 SPKI public key for `purpose`.
    ///
    /// # Errors
    ///
    /// - `KeyFormat`: invalid base64 or DER, wrong purpose, or a modulus other
    ///   than 2048 bits
    pub fn import_public(&self, encoded: &str, purpose: KeyPurpose) -> Result<PublicKey, CryptoError> {
        let der = decode_base64(encoded)?;
        let spki = SubjectPublicKeyInfoRef::try_from(der.as_slice())
            .map_err(|e| CryptoError::key_format(format!("invalid SPKI: {e}")))?;
        purpose.check(spki.algorithm.oid)?;

        let inner = RsaPublicKey::from_pkcs1_der(spki.subject_public_key.raw_bytes())
            .map_err(|e| CryptoError::key_format(format!("invalid RSA public key: {e}")))?;
        check_modulus(inner.size())?;

        Ok(PublicKey { purpose, inner })
    }

    /// Import a base64 PKCS#8 private key for `purpose`.
    ///
    /// # Errors
    ///
    /// - `KeyFormat`: invalid base64 or DER, wrong purpose, or a modulus other
    ///   than 2048 bits
    pub fn import_private(
        &self,
        encoded: &str,
        purpose: KeyPurpose,
    ) -> Result<PrivateKey, CryptoError> {
        let der = Zeroizing::new(decode_base64(encoded)?);
        let info = PrivateKeyInfo::try_from(der.as_slice())
            .map_err(|e| CryptoError::key_format(format!("invalid PKCS#8: {e}")))?;
        purpose.check(info.algorithm.oid)?;

        // Error detail from a private key parser is withheld
        let inner = RsaPrivateKey::from_pkcs1_der(info.private_key)
            .map_err(|_| CryptoError::key_format("invalid RSA private key"))?;
        check_modulus(inner.size())?;

        Ok(PrivateKey { purpose, inner })
    }
}

fn decode_base64(encoded: &str) -> Result<Vec<u8>, CryptoError> {
    BASE64
        .decode(encoded.trim())
        .map_err(|e| CryptoError::key_format(format!("invalid base64: {e}")))
}

fn check_modulus(size_bytes: usize) -> Result<(), CryptoError> {
    if size_bytes * 8 == RSA_MODULUS_BITS {
        Ok(())
    } else {
        Err(CryptoError::key_format(format!(
            "expected {RSA_MODULUS_BITS}-bit modulus, got {} bits",
            size_bytes * 8
        )))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::OnceLock;

    use rsa::BigUint;

    use super::*;
    use crate::SeededProvider;

    fn manager() -> KeyPairManager<SeededProvider> {
        KeyPairManager::new(SeededProvider::new(0x5EA1))
    }

    fn pairs() -> &'static (KeyPair, KeyPair) {
        static PAIRS: OnceLock<(KeyPair, KeyPair)> = OnceLock::new();
        PAIRS.get_or_init(|| {
            let manager = manager();
            (
                manager.generate_encryption_key_pair().unwrap(),
                manager.generate_signing_key_pair().unwrap(),
            )
        })
    }

    #[test]
    fn generated_pairs_have_requested_parameters() {
        let (encryption, signing) = pairs();

        assert_eq!(encryption.purpose(), KeyPurpose::Encryption);
        assert_eq!(signing.purpose(), KeyPurpose::Signing);

        for pair in [encryption, signing] {
            let rsa = pair.public_key().rsa_for(pair.purpose()).unwrap();
            assert_eq!(rsa.size() * 8, RSA_MODULUS_BITS);
            assert_eq!(rsa.e(), &BigUint::from(PUBLIC_EXPONENT));
        }
    }

    #[test]
    fn public_export_import_preserves_key() {
        let (encryption, signing) = pairs();
        let manager = manager();

        for pair in [encryption, signing] {
            let exported = manager.export_public(pair.public_key()).unwrap();
            let imported = manager.import_public(&exported, pair.purpose()).unwrap();
            assert_eq!(&imported, pair.public_key());
        }
    }

    #[test]
    fn private_export_import_preserves_key() {
        let (encryption, signing) = pairs();
        let manager = manager();

        for pair in [encryption, signing] {
            let exported = manager.export_private(pair.private_key()).unwrap();
            let imported = manager.import_private(&exported, pair.purpose()).unwrap();
            assert_eq!(&imported.public_key(), pair.public_key());
        }
    }

    #[test]
    fn encryption_public_key_is_standard_spki() {
        let (encryption, _) = pairs();
        let manager = manager();

        let exported = manager.export_public(encryption.public_key()).unwrap();
        let der = BASE64.decode(exported).unwrap();

        use rsa::pkcs8::DecodePublicKey;
        let standard = RsaPublicKey::from_public_key_der(&der).unwrap();
        assert_eq!(&standard, encryption.public_key().rsa_for(KeyPurpose::Encryption).unwrap());
    }

    #[test]
    fn wrong_purpose_public_import_fails() {
        let (encryption, signing) = pairs();
        let manager = manager();

        let enc = manager.export_public(encryption.public_key()).unwrap();
        let sig = manager.export_public(signing.public_key()).unwrap();

        assert!(matches!(
            manager.import_public(&enc, KeyPurpose::Signing),
            Err(CryptoError::KeyFormat { reason }) if reason.contains("expected signing")
        ));
        assert!(matches!(
            manager.import_public(&sig, KeyPurpose::Encryption),
            Err(CryptoError::KeyFormat { .. })
        ));
    }

    #[test]
    fn wrong_purpose_private_import_fails() {
        let (encryption, signing) = pairs();
        let manager = manager();

        let enc = manager.export_private(encryption.private_key()).unwrap();
        let sig = manager.export_private(signing.private_key()).unwrap();

        assert!(matches!(
            manager.import_private(&enc, KeyPurpose::Signing),
            Err(CryptoError::KeyFormat { .. })
        ));
        assert!(matches!(
            manager.import_private(&sig, KeyPurpose::Encryption),
            Err(CryptoError::KeyFormat { .. })
        ));
    }

    #[test]
    fn garbage_import_fails_without_panic() {
        let manager = manager();

        for input in ["", "not base64 !!", "AAAA", "eyJlbmNyeXB0aW9uIjoiIn0="] {
            assert!(matches!(
                manager.import_public(input, KeyPurpose::Encryption),
                Err(CryptoError::KeyFormat { .. })
            ));
            assert!(matches!(
                manager.import_private(input, KeyPurpose::Signing),
                Err(CryptoError::KeyFormat { .. })
            ));
        }
    }

    #[test]
    fn private_key_debug_is_redacted() {
        let (encryption, _) = pairs();
        let debug = format!("{:?}", encryption.private_key());

        assert!(debug.contains("Encryption"));
        assert!(!debug.contains("inner"));
    }

    #[test]
    fn handle_rejects_wrong_purpose_use() {
        let (encryption, _) = pairs();

        assert!(encryption.public_key().rsa_for(KeyPurpose::Signing).is_err());
        assert!(encryption.private_key().rsa_for(KeyPurpose::Signing).is_err());
    }
}
