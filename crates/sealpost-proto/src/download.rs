//! Download response decoding.
//!
//! A relay answers a download in one of two shapes:
//!
//! - JSON body carrying every envelope field, ciphertext base64 (`file`)
//! - raw ciphertext body with the remaining fields in headers
//!
//! The binary shape is recognised by the presence of
//! [`headers::ENCRYPTED_AES_KEY`]. Header names match case-insensitively.

use sealpost_crypto::Signature;

use crate::{
    Envelope, ProtocolError,
    envelope::{decode_field, decode_nonce, decode_tag},
};

/// Header names of the binary download shape.
pub mod headers {
    /// Base64 wrapped content key.
    pub const ENCRYPTED_AES_KEY: &str = "X-Encrypted-AES-Key";
    /// Base64 12-byte nonce.
    pub const NONCE: &str = "X-Nonce";
    /// Base64 16-byte tag.
    pub const AUTH_TAG: &str = "X-Auth-Tag";
    /// Base64 signature.
    pub const SIGNATURE: &str = "X-Signature";
    /// Sender key bundle string.
    pub const SENDER_PUBLIC_KEY: &str = "X-Sender-Public-Key";
    /// File name, optionally percent-encoded.
    pub const FILE_NAME: &str = "X-File-Name";
    /// Receiver identity. Optional.
    pub const RECEIVER_ID: &str = "X-Receiver-Id";
}

/// A raw download response as delivered by the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadResponse {
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl DownloadResponse {
    /// Response with `body` and no headers.
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self { headers: Vec::new(), body: body.into() }
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// First header named `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Response body.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Decode into an envelope.
    ///
    /// `receiver_id` fills the receiver field of a binary response that lacks
    /// [`headers::RECEIVER_ID`].
    ///
    /// # Errors
    ///
    /// - `MissingHeader`: binary shape without a required header
    /// - `InvalidHeader`: file name is not valid percent-encoding
    /// - any error of [`Envelope::from_json`]
    pub fn decode(&self, receiver_id: &str) -> Result<Envelope, ProtocolError> {
        if self.header(headers::ENCRYPTED_AES_KEY).is_none() {
            return Envelope::from_json(&self.body);
        }

        let file_name = urlencoding::decode(self.required(headers::FILE_NAME)?)
            .map_err(|e| ProtocolError::InvalidHeader {
                name: headers::FILE_NAME,
                reason: e.to_string(),
            })?
            .into_owned();

        Ok(Envelope {
            receiver_id: self.header(headers::RECEIVER_ID).unwrap_or(receiver_id).to_string(),
            wrapped_key: decode_field(
                headers::ENCRYPTED_AES_KEY,
                self.required(headers::ENCRYPTED_AES_KEY)?,
            )?,
            nonce: decode_nonce(headers::NONCE, self.required(headers::NONCE)?)?,
            tag: decode_tag(headers::AUTH_TAG, self.required(headers::AUTH_TAG)?)?,
            ciphertext: self.body.clone(),
            signature: Signature::from_bytes(decode_field(
                headers::SIGNATURE,
                self.required(headers::SIGNATURE)?,
            )?),
            sender_bundle: self.required(headers::SENDER_PUBLIC_KEY)?.to_string(),
            file_name,
        })
    }

    fn required(&self, name: &'static str) -> Result<&str, ProtocolError> {
        self.header(name).ok_or(ProtocolError::MissingHeader(name))
    }
}
