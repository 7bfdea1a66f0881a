//! The encrypted envelope and its JSON wire form.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use sealpost_crypto::{AuthTag, NONCE_SIZE, Nonce, Signature, TAG_SIZE};
use serde::{Deserialize, Serialize};

use crate::{DecodedBundle, ProtocolError};

/// Everything a receiver needs to verify and decrypt one file.
///
/// Holds decoded bytes. Fixed-size fields are checked during decoding, so an
/// `Envelope` always has a 12-byte nonce and a 16-byte tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireEnvelope", into = "WireEnvelope")]
pub struct Envelope {
    /// Intended receiver's identity.
    pub receiver_id: String,
    /// Content key wrapped under the receiver's encryption key.
    pub wrapped_key: Vec<u8>,
    /// AES-GCM nonce.
    pub nonce: Nonce,
    /// AES-GCM tag, split from the ciphertext.
    pub tag: AuthTag,
    /// Ciphertext without the tag.
    pub ciphertext: Vec<u8>,
    /// Sender's signature over `SHA-256(ciphertext ‖ nonce ‖ tag)`.
    pub signature: Signature,
    /// Sender's public key bundle, as an opaque string.
    pub sender_bundle: String,
    /// Original file name. Not authenticated.
    pub file_name: String,
}

impl Envelope {
    /// Decode the sender's key bundle.
    pub fn sender_keys(&self) -> DecodedBundle {
        DecodedBundle::parse(&self.sender_bundle)
    }

    /// Encode as a JSON body.
    pub fn to_json(&self) -> Vec<u8> {
        // All fields are strings after base64 encoding
        serde_json::to_vec(&WireEnvelope::from(self.clone())).unwrap_or_default()
    }

    /// Decode a JSON body.
    ///
    /// # Errors
    ///
    /// - `MalformedJson`: not a JSON envelope or a field is missing
    /// - `InvalidBase64`: a binary field is not base64
    /// - `InvalidLength`: nonce is not 12 bytes or tag is not 16 bytes
    pub fn from_json(body: &[u8]) -> Result<Self, ProtocolError> {
        let wire: WireEnvelope = serde_json::from_slice(body)?;
        Self::try_from(wire)
    }
}

/// JSON field layout of an envelope.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WireEnvelope {
    #[serde(rename = "receiverId")]
    receiver_id: String,
    #[serde(rename = "encryptedAESKey")]
    encrypted_aes_key: String,
    nonce: String,
    #[serde(rename = "authTag")]
    auth_tag: String,
    signature: String,
    #[serde(rename = "senderPublicKey")]
    sender_public_key: String,
    file: String,
    #[serde(rename = "fileName")]
    file_name: String,
}

impl From<Envelope> for WireEnvelope {
    fn from(envelope: Envelope) -> Self {
        Self {
            receiver_id: envelope.receiver_id,
            encrypted_aes_key: BASE64.encode(&envelope.wrapped_key),
            nonce: BASE64.encode(envelope.nonce.as_bytes()),
            auth_tag: BASE64.encode(envelope.tag.as_bytes()),
            signature: BASE64.encode(envelope.signature.as_bytes()),
            sender_public_key: envelope.sender_bundle,
            file: BASE64.encode(&envelope.ciphertext),
            file_name: envelope.file_name,
        }
    }
}

impl TryFrom<WireEnvelope> for Envelope {
    type Error = ProtocolError;

    fn try_from(wire: WireEnvelope) -> Result<Self, Self::Error> {
        Ok(Self {
            receiver_id: wire.receiver_id,
            wrapped_key: decode_field("encryptedAESKey", &wire.encrypted_aes_key)?,
            nonce: decode_nonce("nonce", &wire.nonce)?,
            tag: decode_tag("authTag", &wire.auth_tag)?,
            ciphertext: decode_field("file", &wire.file)?,
            signature: Signature::from_bytes(decode_field("signature", &wire.signature)?),
            sender_bundle: wire.sender_public_key,
            file_name: wire.file_name,
        })
    }
}

pub(crate) fn decode_field(field: &'static str, value: &str) -> Result<Vec<u8>, ProtocolError> {
    BASE64.decode(value.trim()).map_err(|_| ProtocolError::InvalidBase64 { field })
}

pub(crate) fn decode_nonce(field: &'static str, value: &str) -> Result<Nonce, ProtocolError> {
    let bytes = decode_field(field, value)?;
    let array = <[u8; NONCE_SIZE]>::try_from(bytes.as_slice()).map_err(|_| {
        ProtocolError::InvalidLength { field, expected: NONCE_SIZE, actual: bytes.len() }
    })?;
    Ok(Nonce::from_bytes(array))
}

pub(crate) fn decode_tag(field: &'static str, value: &str) -> Result<AuthTag, ProtocolError> {
    let bytes = decode_field(field, value)?;
    let array = <[u8; TAG_SIZE]>::try_from(bytes.as_slice()).map_err(|_| {
        ProtocolError::InvalidLength { field, expected: TAG_SIZE, actual: bytes.len() }
    })?;
    Ok(AuthTag::from_bytes(array))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Envelope {
        Envelope {
            receiver_id: "bob".to_string(),
            wrapped_key: vec![1; 256],
            nonce: Nonce::from_bytes([2; NONCE_SIZE]),
            tag: AuthTag::from_bytes([3; TAG_SIZE]),
            ciphertext: b"ciphertext".to_vec(),
            signature: Signature::from_bytes(vec![4; 256]),
            sender_bundle: r#"{"encryption":"E","signing":"S"}"#.to_string(),
            file_name: "report.pdf".to_string(),
        }
    }

    fn wire_json(field: &str, value: &str) -> Vec<u8> {
        let mut value_map: serde_json::Value = serde_json::from_slice(&sample().to_json()).unwrap();
        value_map[field] = serde_json::Value::String(value.to_string());
        serde_json::to_vec(&value_map).unwrap()
    }

    #[test]
    fn json_round_trip() {
        let envelope = sample();
        assert_eq!(Envelope::from_json(&envelope.to_json()).unwrap(), envelope);
    }

    #[test]
    fn json_uses_wire_field_names() {
        let value: serde_json::Value = serde_json::from_slice(&sample().to_json()).unwrap();

        for field in [
            "receiverId",
            "encryptedAESKey",
            "nonce",
            "authTag",
            "signature",
            "senderPublicKey",
            "file",
            "fileName",
        ] {
            assert!(value.get(field).is_some(), "missing {field}");
        }
        assert_eq!(value["file"], BASE64.encode(b"ciphertext"));
        assert_eq!(value["senderPublicKey"], r#"{"encryption":"E","signing":"S"}"#);
    }

    #[test]
    fn wrong_nonce_length_rejected() {
        let body = wire_json("nonce", &BASE64.encode([0u8; 11]));
        assert_eq!(
            Envelope::from_json(&body),
            Err(ProtocolError::InvalidLength { field: "nonce", expected: 12, actual: 11 })
        );
    }

    #[test]
    fn wrong_tag_length_rejected() {
        let body = wire_json("authTag", &BASE64.encode([0u8; 17]));
        assert_eq!(
            Envelope::from_json(&body),
            Err(ProtocolError::InvalidLength { field: "authTag", expected: 16, actual: 17 })
        );
    }

    #[test]
    fn invalid_base64_rejected() {
        let body = wire_json("file", "not*base64");
        assert_eq!(Envelope::from_json(&body), Err(ProtocolError::InvalidBase64 { field: "file" }));
    }

    #[test]
    fn missing_field_is_malformed() {
        let result = Envelope::from_json(br#"{"receiverId":"bob"}"#);
        assert!(matches!(result, Err(ProtocolError::MalformedJson(_))));
    }

    #[test]
    fn sender_keys_decodes_bundle() {
        assert_eq!(sample().sender_keys().signing_key(), Some("S"));
    }

    #[test]
    fn serde_embedding_uses_wire_form() {
        let value = serde_json::to_value(sample()).unwrap();
        assert!(value.get("encryptedAESKey").is_some());

        let back: Envelope = serde_json::from_value(value).unwrap();
        assert_eq!(back, sample());
    }
}
