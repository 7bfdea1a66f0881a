//! Error types for cryptographic operations

use thiserror::Error;

/// Errors from key handling, content encryption, and key wrapping.
///
/// Signature verification is deliberately absent: [`crate::SignatureService::verify`]
/// is a boolean predicate and never fails.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Key material is malformed or was imported under the wrong purpose
    #[error("key format error: {reason}")]
    KeyFormat {
        /// What was wrong with the key
        reason: String,
    },

    /// An underlying primitive failed (key generation, encryption, signing)
    #[error("{operation} failed: {reason}")]
    Operation {
        /// Primitive that failed
        operation: &'static str,
        /// Reason reported by the primitive
        reason: String,
    },

    /// AES-GCM authentication tag did not verify
    #[error("integrity check failed: content was corrupted or tampered with")]
    Integrity,

    /// Wrapped content key could not be recovered
    ///
    /// Carries no detail: padding failures and wrong-key failures must be
    /// indistinguishable to the caller.
    #[error("content key unwrap failed")]
    KeyUnwrap,
}

impl CryptoError {
    pub(crate) fn key_format(reason: impl ToString) -> Self {
        Self::KeyFormat { reason: reason.to_string() }
    }

    pub(crate) fn operation(operation: &'static str, reason: impl ToString) -> Self {
        Self::Operation { operation, reason: reason.to_string() }
    }

    /// Returns true if this error is evidence of tampering or corruption.
    ///
    /// Such errors must abort the transfer and must never be retried against
    /// the same bytes.
    pub fn is_tamper_evidence(&self) -> bool {
        match self {
            Self::Integrity | Self::KeyUnwrap => true,
            Self::KeyFormat { .. } | Self::Operation { .. } => false,
        }
    }
}
