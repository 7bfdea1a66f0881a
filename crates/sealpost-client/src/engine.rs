//! Pure envelope sealing and opening.
//!
//! [`ProtocolEngine`] holds no I/O and no state. The orchestrator drives its
//! individual steps so each one gets its own observable phase; [`seal`] and
//! [`open`] compose the same steps for callers that only need the result.
//!
//! [`seal`]: ProtocolEngine::seal
//! [`open`]: ProtocolEngine::open

use sealpost_crypto::{
    ContentKey, CryptoProvider, EnvelopeEncryptor, KeyPairManager, KeyPurpose, SealedContent,
    Signature, SignatureService,
};
use sealpost_proto::{DecodedBundle, Envelope};

use crate::{LocalKeys, TransferError};

/// An envelope whose sender signature has verified.
///
/// Only [`ProtocolEngine::verify`] creates one, and
/// [`ProtocolEngine::decrypt`] accepts nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedEnvelope {
    envelope: Envelope,
}

impl VerifiedEnvelope {
    /// The verified envelope.
    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// Name the sender gave the file.
    pub fn file_name(&self) -> &str {
        &self.envelope.file_name
    }
}

/// Send and receive protocol steps over one [`CryptoProvider`].
#[derive(Debug, Clone)]
pub struct ProtocolEngine<P> {
    manager: KeyPairManager<P>,
    encryptor: EnvelopeEncryptor<P>,
    signatures: SignatureService<P>,
}

impl<P: CryptoProvider> ProtocolEngine<P> {
    /// Create an engine whose primitives all draw on `provider`.
    pub fn new(provider: P) -> Self {
        Self {
            manager: KeyPairManager::new(provider.clone()),
            encryptor: EnvelopeEncryptor::new(provider.clone()),
            signatures: SignatureService::new(provider),
        }
    }

    /// Key manager for provisioning and key import.
    pub fn manager(&self) -> &KeyPairManager<P> {
        &self.manager
    }

    /// Encrypt `plaintext` under a fresh content key and nonce.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<SealedContent, TransferError> {
        Ok(self.encryptor.seal(plaintext)?)
    }

    /// Sign `SHA-256(ciphertext ‖ nonce ‖ tag)` with the local signing key.
    pub fn sign(&self, sealed: &SealedContent, keys: &LocalKeys) -> Result<Signature, TransferError> {
        let digest =
            self.signatures.transcript_digest(&sealed.ciphertext, &sealed.nonce, &sealed.tag);
        Ok(self.signatures.sign(&digest, keys.signing_key())?)
    }

    /// Wrap `key` under the receiver's encryption key.
    ///
    /// A legacy raw-key bundle is accepted here: its only key is the
    /// encryption key.
    pub fn wrap(&self, key: &ContentKey, receiver: &DecodedBundle) -> Result<Vec<u8>, TransferError> {
        let public = self.manager.import_public(receiver.encryption_key(), KeyPurpose::Encryption)?;
        Ok(self.encryptor.wrap_key(key, &public)?)
    }

    /// Assemble the envelope. Consumes and drops the content key.
    pub fn assemble(
        &self,
        receiver_id: &str,
        file_name: &str,
        sealed: SealedContent,
        signature: Signature,
        wrapped_key: Vec<u8>,
        keys: &LocalKeys,
    ) -> Envelope {
        let SealedContent { key, nonce, ciphertext, tag } = sealed;
        drop(key);

        Envelope {
            receiver_id: receiver_id.to_string(),
            wrapped_key,
            nonce,
            tag,
            ciphertext,
            signature,
            sender_bundle: keys.bundle().to_json(),
            file_name: file_name.to_string(),
        }
    }

    /// Full send sequence: encrypt, sign, wrap, assemble.
    pub fn seal(
        &self,
        receiver_id: &str,
        receiver: &DecodedBundle,
        file_name: &str,
        plaintext: &[u8],
        keys: &LocalKeys,
    ) -> Result<Envelope, TransferError> {
        let sealed = self.encrypt(plaintext)?;
        let signature = self.sign(&sealed, keys)?;
        let wrapped_key = self.wrap(&sealed.key, receiver)?;
        Ok(self.assemble(receiver_id, file_name, sealed, signature, wrapped_key, keys))
    }

    /// Verify the sender signature over the received bytes.
    ///
    /// # Errors
    ///
    /// - `SignatureInvalid`: signature mismatch, or the sender bundle carries
    ///   no usable signing key (including a legacy raw key)
    pub fn verify(&self, envelope: Envelope) -> Result<VerifiedEnvelope, TransferError> {
        let sender = envelope.sender_keys();
        let Some(encoded) = sender.signing_key() else {
            tracing::warn!("sender published no signing key");
            return Err(TransferError::SignatureInvalid);
        };
        let public = self.manager.import_public(encoded, KeyPurpose::Signing).map_err(|e| {
            tracing::warn!(error = %e, "sender signing key unusable");
            TransferError::SignatureInvalid
        })?;

        let digest =
            self.signatures.transcript_digest(&envelope.ciphertext, &envelope.nonce, &envelope.tag);
        if self.signatures.verify(&envelope.signature, &digest, &public) {
            Ok(VerifiedEnvelope { envelope })
        } else {
            Err(TransferError::SignatureInvalid)
        }
    }

    /// Unwrap the content key and decrypt a verified envelope.
    ///
    /// # Errors
    ///
    /// - `KeyUnwrap`: the content key was not wrapped for `keys`
    /// - `Integrity`: the ciphertext does not authenticate
    pub fn decrypt(
        &self,
        verified: &VerifiedEnvelope,
        keys: &LocalKeys,
    ) -> Result<Vec<u8>, TransferError> {
        let envelope = &verified.envelope;
        let key = self.encryptor.unwrap_key(&envelope.wrapped_key, keys.encryption_key())?;
        Ok(self.encryptor.decrypt(&envelope.ciphertext, &envelope.tag, &key, &envelope.nonce)?)
    }

    /// Full receive sequence: verify, then unwrap and decrypt.
    pub fn open(&self, envelope: Envelope, keys: &LocalKeys) -> Result<Vec<u8>, TransferError> {
        let verified = self.verify(envelope)?;
        self.decrypt(&verified, keys)
    }
}
