//! Cryptographic provider abstraction.
//!
//! Decouples the protocol from the platform's cryptographic provider. The only
//! required capability is a source of random bytes; every primitive has a
//! default implementation on top of the RustCrypto crates that draws its
//! randomness from that source. Production uses [`SystemProvider`] (OS RNG),
//! tests use [`SeededProvider`] for reproducible keys and nonces, and test
//! doubles can override individual primitives to observe or fail them.

use std::sync::{Arc, Mutex, PoisonError};

use aes_gcm::{
    Aes256Gcm, Key, Nonce as GcmNonce,
    aead::{Aead, KeyInit},
};
use rand::rngs::OsRng;
use rand_chacha::ChaCha20Rng;
use rand_core::{CryptoRng, RngCore, SeedableRng, impls};
use rsa::{
    BigUint, Oaep, RsaPrivateKey, RsaPublicKey,
    pss::{BlindedSigningKey, Signature as PssSignature, VerifyingKey},
    signature::{RandomizedSigner, SignatureEncoding, Verifier},
};
use sha2::{Digest as _, Sha256};
use zeroize::Zeroizing;

use crate::{CONTENT_KEY_SIZE, CryptoError, DIGEST_SIZE, NONCE_SIZE, PSS_SALT_LEN};

/// Injected cryptographic capability.
///
/// # Safety
///
/// Implementations MUST guarantee:
///
/// - `random_bytes()` uses cryptographically secure entropy in production
/// - `pss_verify()` never panics and returns `false` for any malformed input
/// - `oaep_decrypt()` reports every failure as [`CryptoError::KeyUnwrap`]
///   without distinguishing padding errors from wrong-key errors
pub trait CryptoProvider: Clone + Send + Sync + 'static {
    /// Fills the provided buffer with random bytes.
    ///
    /// # Invariants
    ///
    /// - Given the same RNG seed, this produces the same sequence of bytes
    /// - Uses cryptographically secure RNG
    fn random_bytes(&self, buffer: &mut [u8]);

    /// RNG adapter over [`Self::random_bytes`] for APIs that take an
    /// `RngCore`.
    fn rng(&self) -> ProviderRng<'_, Self> {
        ProviderRng { provider: self }
    }

    /// Generate an RSA private key.
    fn generate_rsa_key(&self, bits: usize, exponent: u64) -> Result<RsaPrivateKey, CryptoError> {
        RsaPrivateKey::new_with_exp(&mut self.rng(), bits, &BigUint::from(exponent))
            .map_err(|e| CryptoError::operation("rsa key generation", e))
    }

    /// AES-256-GCM encryption without associated data.
    ///
    /// Returns ciphertext with the 16-byte tag appended.
    fn aes_gcm_seal(
        &self,
        key: &[u8; CONTENT_KEY_SIZE],
        nonce: &[u8; NONCE_SIZE],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
        cipher
            .encrypt(GcmNonce::from_slice(nonce), plaintext)
            .map_err(|_| CryptoError::operation("aes-gcm encryption", "plaintext too large"))
    }

    /// AES-256-GCM decryption of ciphertext with the tag appended.
    ///
    /// # Errors
    ///
    /// - `Integrity`: the tag does not authenticate
    fn aes_gcm_open(
        &self,
        key: &[u8; CONTENT_KEY_SIZE],
        nonce: &[u8; NONCE_SIZE],
        sealed: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
        cipher.decrypt(GcmNonce::from_slice(nonce), sealed).map_err(|_| CryptoError::Integrity)
    }

    /// RSA-OAEP (SHA-256, MGF1-SHA-256) encryption.
    fn oaep_encrypt(&self, key: &RsaPublicKey, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        key.encrypt(&mut self.rng(), Oaep::new::<Sha256>(), message)
            .map_err(|e| CryptoError::operation("rsa-oaep encryption", e))
    }

    /// Blinded RSA-OAEP (SHA-256, MGF1-SHA-256) decryption.
    ///
    /// # Errors
    ///
    /// - `KeyUnwrap`: any failure, without detail
    fn oaep_decrypt(
        &self,
        key: &RsaPrivateKey,
        ciphertext: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        key.decrypt_blinded(&mut self.rng(), Oaep::new::<Sha256>(), ciphertext)
            .map(Zeroizing::new)
            .map_err(|_| CryptoError::KeyUnwrap)
    }

    /// RSA-PSS (SHA-256, 32-byte salt) signature over `message`.
    fn pss_sign(&self, key: &RsaPrivateKey, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let signing_key = BlindedSigningKey::<Sha256>::new_with_salt_len(key.clone(), PSS_SALT_LEN);
        signing_key
            .try_sign_with_rng(&mut self.rng(), message)
            .map(|signature| signature.to_vec())
            .map_err(|e| CryptoError::operation("rsa-pss signing", e))
    }

    /// RSA-PSS (SHA-256, 32-byte salt) verification.
    ///
    /// Returns `false` for malformed signatures as well as mismatches.
    fn pss_verify(&self, key: &RsaPublicKey, message: &[u8], signature: &[u8]) -> bool {
        let Ok(signature) = PssSignature::try_from(signature) else {
            return false;
        };
        VerifyingKey::<Sha256>::new(key.clone()).verify(message, &signature).is_ok()
    }

    /// SHA-256 over the concatenation of `parts`.
    fn sha256(&self, parts: &[&[u8]]) -> [u8; DIGEST_SIZE] {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part);
        }
        hasher.finalize().into()
    }
}

/// `RngCore` adapter that draws from a [`CryptoProvider`].
pub struct ProviderRng<'a, P> {
    provider: &'a P,
}

impl<P: CryptoProvider> RngCore for ProviderRng<'_, P> {
    fn next_u32(&mut self) -> u32 {
        impls::next_u32_via_fill(self)
    }

    fn next_u64(&mut self) -> u64 {
        impls::next_u64_via_fill(self)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.provider.random_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.provider.random_bytes(dest);
        Ok(())
    }
}

impl<P: CryptoProvider> CryptoRng for ProviderRng<'_, P> {}

/// Production provider backed by the OS RNG.
///
/// # Panics
///
/// Panics if the OS RNG fails. A client without functioning cryptographic
/// randomness cannot generate keys or nonces safely, and continuing would
/// risk nonce reuse.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProvider;

impl SystemProvider {
    /// Create a new system provider.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl CryptoProvider for SystemProvider {
    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        OsRng
            .try_fill_bytes(buffer)
            .expect("invariant: OS RNG failure is unrecoverable - cannot generate keys or nonces");
    }
}

/// Deterministic provider seeded from a `u64`.
///
/// Clones share one ChaCha20 stream, so a test that hands clones to several
/// components still sees a single reproducible sequence. Not for production.
#[derive(Clone)]
pub struct SeededProvider {
    rng: Arc<Mutex<ChaCha20Rng>>,
}

impl SeededProvider {
    /// Create a provider whose output is fully determined by `seed`.
    pub fn new(seed: u64) -> Self {
        Self { rng: Arc::new(Mutex::new(ChaCha20Rng::seed_from_u64(seed))) }
    }
}

impl std::fmt::Debug for SeededProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeededProvider").finish_non_exhaustive()
    }
}

impl CryptoProvider for SeededProvider {
    fn random_bytes(&self, buffer: &mut [u8]) {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner).fill_bytes(buffer);
    }
}
