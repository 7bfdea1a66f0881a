//! Transcript digests and RSA-PSS signatures.

use crate::{
    AuthTag, CryptoError, CryptoProvider, DIGEST_SIZE, KeyPurpose, Nonce, PrivateKey, PublicKey,
};

/// SHA-256 digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Digest([u8; DIGEST_SIZE]);

impl Digest {
    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; DIGEST_SIZE] {
        &self.0
    }
}

/// RSA-PSS signature bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature(Vec<u8>);

impl Signature {
    /// Wrap signature bytes received from the wire. Not validated here;
    /// malformed bytes simply fail verification.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Raw signature bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume into raw bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

/// Digest computation and RSA-PSS signing/verification.
///
/// The digest (not the raw content) is the message handed to PSS, which
/// hashes it once more with SHA-256 internally.
#[derive(Debug, Clone)]
pub struct SignatureService<P> {
    provider: P,
}

impl<P: CryptoProvider> SignatureService<P> {
    /// Create a service on top of `provider`.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// SHA-256 over exactly `bytes`.
    pub fn digest(&self, bytes: &[u8]) -> Digest {
        Digest(self.provider.sha256(&[bytes]))
    }

    /// `SHA-256(ciphertext ‖ nonce ‖ tag)`, the value both sides sign and
    /// verify. The order is part of the protocol.
    pub fn transcript_digest(&self, ciphertext: &[u8], nonce: &Nonce, tag: &AuthTag) -> Digest {
        Digest(self.provider.sha256(&[ciphertext, nonce.as_bytes(), tag.as_bytes()]))
    }

    /// Sign `digest` with RSA-PSS (32-byte salt).
    ///
    /// # Errors
    ///
    /// - `KeyFormat`: `key` is not a signing key
    /// - `Operation`: the signing primitive failed
    pub fn sign(&self, digest: &Digest, key: &PrivateKey) -> Result<Signature, CryptoError> {
        let rsa = key.rsa_for(KeyPurpose::Signing)?;
        self.provider.pss_sign(rsa, &digest.0).map(Signature)
    }

    /// Verify `signature` over `digest`.
    ///
    /// Fail-closed predicate: returns `false` on any mismatch, malformed
    /// signature, or non-signing key. Never errors, and `false` must be
    /// treated as a final rejection.
    pub fn verify(&self, signature: &Signature, digest: &Digest, key: &PublicKey) -> bool {
        let Ok(rsa) = key.rsa_for(KeyPurpose::Signing) else {
            return false;
        };
        self.provider.pss_verify(rsa, &digest.0, &signature.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{KeyPairManager, NONCE_SIZE, SeededProvider, TAG_SIZE};

    fn service() -> SignatureService<SeededProvider> {
        SignatureService::new(SeededProvider::new(11))
    }

    #[test]
    fn digest_is_sha256_of_input() {
        let digest = service().digest(b"abc");
        assert_eq!(digest.as_bytes()[..4], [0xba, 0x78, 0x16, 0xbf]);
    }

    #[test]
    fn transcript_digest_order_is_ciphertext_nonce_tag() {
        let service = service();
        let nonce = Nonce::from_bytes([1; NONCE_SIZE]);
        let tag = AuthTag::from_bytes([2; TAG_SIZE]);

        let mut joined = b"ciphertext".to_vec();
        joined.extend_from_slice(nonce.as_bytes());
        joined.extend_from_slice(tag.as_bytes());

        assert_eq!(service.transcript_digest(b"ciphertext", &nonce, &tag), service.digest(&joined));

        let mut reordered = b"ciphertext".to_vec();
        reordered.extend_from_slice(tag.as_bytes());
        reordered.extend_from_slice(nonce.as_bytes());
        assert_ne!(
            service.transcript_digest(b"ciphertext", &nonce, &tag),
            service.digest(&reordered)
        );
    }

    #[test]
    fn sign_and_verify() {
        let provider = SeededProvider::new(12);
        let pair = KeyPairManager::new(provider.clone()).generate_signing_key_pair().unwrap();
        let service = SignatureService::new(provider);

        let digest = service.digest(b"file transcript");
        let signature = service.sign(&digest, pair.private_key()).unwrap();

        assert!(service.verify(&signature, &digest, pair.public_key()));
        assert!(!service.verify(&signature, &service.digest(b"other"), pair.public_key()));
        assert!(!service.verify(&Signature::from_bytes(vec![]), &digest, pair.public_key()));
        assert!(!service.verify(&Signature::from_bytes(vec![0xFF; 7]), &digest, pair.public_key()));
    }

    #[test]
    fn sign_rejects_encryption_key_and_verify_returns_false() {
        let provider = SeededProvider::new(13);
        let pair = KeyPairManager::new(provider.clone()).generate_encryption_key_pair().unwrap();
        let service = SignatureService::new(provider);
        let digest = service.digest(b"x");

        assert!(matches!(service.sign(&digest, pair.private_key()), Err(CryptoError::KeyFormat { .. })));
        assert!(!service.verify(&Signature::from_bytes(vec![0; 256]), &digest, pair.public_key()));
    }
}
