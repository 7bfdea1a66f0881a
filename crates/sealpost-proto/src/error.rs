//! Wire decoding errors

use thiserror::Error;

/// Errors from decoding untrusted wire data.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A binary field was not valid standard base64
    #[error("field {field} is not valid base64")]
    InvalidBase64 {
        /// Wire name of the field
        field: &'static str,
    },

    /// A fixed-size field had the wrong length
    #[error("field {field} must be {expected} bytes, got {actual}")]
    InvalidLength {
        /// Wire name of the field
        field: &'static str,
        /// Required length
        expected: usize,
        /// Decoded length
        actual: usize,
    },

    /// Body was not the expected JSON document
    #[error("malformed JSON: {0}")]
    MalformedJson(String),

    /// A required download header was absent
    #[error("missing header {0}")]
    MissingHeader(&'static str),

    /// A download header value could not be decoded
    #[error("invalid header {name}: {reason}")]
    InvalidHeader {
        /// Header name
        name: &'static str,
        /// What was wrong with the value
        reason: String,
    },
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedJson(err.to_string())
    }
}
