//! File content encryption with AES-256-GCM and RSA-OAEP key wrapping.
//!
//! All randomness comes from the injected provider. [`EnvelopeEncryptor::seal`]
//! is the protocol entry point: it generates the content key and nonce
//! together, so no caller ever holds a nonce that could be paired with a
//! second plaintext under the same key.

use zeroize::Zeroize;

use crate::{
    CONTENT_KEY_SIZE, CryptoError, CryptoProvider, KeyPurpose, NONCE_SIZE, PrivateKey, PublicKey,
    TAG_SIZE,
};

/// One-time AES-256 content key.
///
/// Used for a single file and then dropped. Zeroized on drop; `Debug` never
/// prints key material.
#[derive(Clone, PartialEq, Eq)]
pub struct ContentKey([u8; CONTENT_KEY_SIZE]);

impl ContentKey {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; CONTENT_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; CONTENT_KEY_SIZE] {
        &self.0
    }
}

impl Drop for ContentKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl std::fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ContentKey(..)")
    }
}

/// 96-bit AES-GCM nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nonce([u8; NONCE_SIZE]);

impl Nonce {
    /// Wrap raw nonce bytes.
    pub fn from_bytes(bytes: [u8; NONCE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Raw nonce bytes.
    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }
}

impl TryFrom<&[u8]> for Nonce {
    type Error = CryptoError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        <[u8; NONCE_SIZE]>::try_from(bytes).map(Self).map_err(|_| {
            CryptoError::operation(
                "nonce decoding",
                format!("expected {NONCE_SIZE} bytes, got {}", bytes.len()),
            )
        })
    }
}

/// 128-bit AES-GCM authentication tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthTag([u8; TAG_SIZE]);

impl AuthTag {
    /// Wrap raw tag bytes.
    pub fn from_bytes(bytes: [u8; TAG_SIZE]) -> Self {
        Self(bytes)
    }

    /// Raw tag bytes.
    pub fn as_bytes(&self) -> &[u8; TAG_SIZE] {
        &self.0
    }
}

impl TryFrom<&[u8]> for AuthTag {
    type Error = CryptoError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        <[u8; TAG_SIZE]>::try_from(bytes).map(Self).map_err(|_| {
            CryptoError::operation(
                "tag decoding",
                format!("expected {TAG_SIZE} bytes, got {}", bytes.len()),
            )
        })
    }
}

/// Output of [`EnvelopeEncryptor::seal`].
#[derive(Debug)]
pub struct SealedContent {
    /// Fresh content key. Wrap it for the receiver, then drop it.
    pub key: ContentKey,
    /// Fresh nonce, generated with `key`.
    pub nonce: Nonce,
    /// Ciphertext without the tag. Same length as the plaintext.
    pub ciphertext: Vec<u8>,
    /// Authentication tag split from the AEAD output.
    pub tag: AuthTag,
}

/// Content encryption and content-key wrapping.
#[derive(Debug, Clone)]
pub struct EnvelopeEncryptor<P> {
    provider: P,
}

impl<P: CryptoProvider> EnvelopeEncryptor<P> {
    /// Create an encryptor drawing randomness from `provider`.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Generate a fresh AES-256 content key.
    pub fn generate_content_key(&self) -> ContentKey {
        let mut key = ContentKey([0u8; CONTENT_KEY_SIZE]);
        self.provider.random_bytes(&mut key.0);
        key
    }

    /// Generate a fresh 12-byte nonce.
    pub fn generate_nonce(&self) -> Nonce {
        let mut nonce = [0u8; NONCE_SIZE];
        self.provider.random_bytes(&mut nonce);
        Nonce(nonce)
    }

    /// Encrypt with a fresh key and nonce generated inside this call.
    pub fn seal(&self, plaintext: &[u8]) -> Result<SealedContent, CryptoError> {
        let key = self.generate_content_key();
        let nonce = self.generate_nonce();
        let (ciphertext, tag) = self.encrypt(plaintext, &key, &nonce)?;
        Ok(SealedContent { key, nonce, ciphertext, tag })
    }

    /// AES-256-GCM encryption, returning (ciphertext, tag) pre-split.
    ///
    /// Deterministic in (plaintext, key, nonce). Callers MUST NOT reuse a
    /// (key, nonce) pair; prefer [`Self::seal`].
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        key: &ContentKey,
        nonce: &Nonce,
    ) -> Result<(Vec<u8>, AuthTag), CryptoError> {
        let mut sealed = self.provider.aes_gcm_seal(&key.0, &nonce.0, plaintext)?;

        let Some(split) = sealed.len().checked_sub(TAG_SIZE) else {
            return Err(CryptoError::operation("aes-gcm encryption", "output shorter than tag"));
        };
        let tag = AuthTag::try_from(&sealed[split..])?;
        sealed.truncate(split);

        Ok((sealed, tag))
    }

    /// AES-256-GCM decryption.
    ///
    /// # Errors
    ///
    /// - `Integrity`: the tag does not authenticate the ciphertext and nonce
    ///   (tamper, corruption, or wrong key)
    pub fn decrypt(
        &self,
        ciphertext: &[u8],
        tag: &AuthTag,
        key: &ContentKey,
        nonce: &Nonce,
    ) -> Result<Vec<u8>, CryptoError> {
        let mut sealed = Vec::with_capacity(ciphertext.len() + TAG_SIZE);
        sealed.extend_from_slice(ciphertext);
        sealed.extend_from_slice(&tag.0);

        self.provider.aes_gcm_open(&key.0, &nonce.0, &sealed)
    }

    /// Wrap the raw content key under the recipient's encryption key
    /// (RSA-OAEP, SHA-256).
    ///
    /// # Errors
    ///
    /// - `KeyFormat`: `recipient` is not an encryption key
    pub fn wrap_key(&self, key: &ContentKey, recipient: &PublicKey) -> Result<Vec<u8>, CryptoError> {
        let rsa = recipient.rsa_for(KeyPurpose::Encryption)?;
        self.provider.oaep_encrypt(rsa, &key.0)
    }

    /// Recover a content key wrapped by [`Self::wrap_key`].
    ///
    /// # Errors
    ///
    /// - `KeyUnwrap`: for every failure (wrong key, bad padding, wrong
    ///   length, wrong purpose). The cause is never reported.
    pub fn unwrap_key(&self, wrapped: &[u8], local: &PrivateKey) -> Result<ContentKey, CryptoError> {
        let rsa = local.rsa_for(KeyPurpose::Encryption).map_err(|_| CryptoError::KeyUnwrap)?;
        let raw = self.provider.oaep_decrypt(rsa, wrapped).map_err(|_| CryptoError::KeyUnwrap)?;

        let bytes =
            <[u8; CONTENT_KEY_SIZE]>::try_from(raw.as_slice()).map_err(|_| CryptoError::KeyUnwrap)?;
        Ok(ContentKey(bytes))
    }
}
