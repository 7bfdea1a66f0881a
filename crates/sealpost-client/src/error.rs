//! Transfer error taxonomy

use sealpost_crypto::CryptoError;
use sealpost_proto::ProtocolError;
use thiserror::Error;

/// Failure reported by a collaborator (key store, directory, transport, sink).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    /// The requested identity or file does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Any other I/O failure
    #[error("{0}")]
    Io(String),
}

impl From<std::io::Error> for CollaboratorError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(err.to_string()),
            _ => Self::Io(err.to_string()),
        }
    }
}

/// Errors from provisioning, sending, and receiving.
///
/// Every variant except [`TransferError::Transport`] is terminal for the
/// transfer. Cryptographic and integrity failures must never be retried
/// against the same envelope.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransferError {
    /// Receiver identity could not be resolved by the directory
    #[error("lookup of {identity} failed: {reason}")]
    Lookup {
        /// Identity that was looked up
        identity: String,
        /// Directory failure
        reason: String,
    },

    /// Local keys are absent for an account that should have them
    #[error("local keys are missing for this account")]
    KeyMissing,

    /// Key material is malformed or has the wrong purpose
    #[error("key format error: {reason}")]
    KeyFormat {
        /// What was wrong with the key
        reason: String,
    },

    /// A cryptographic primitive failed
    #[error("{operation} failed: {reason}")]
    CryptoOperation {
        /// Primitive that failed
        operation: &'static str,
        /// Failure detail
        reason: String,
    },

    /// Ciphertext did not authenticate under the unwrapped content key
    #[error("integrity check failed")]
    Integrity,

    /// Sender signature did not verify; nothing was decrypted
    #[error("sender signature is invalid")]
    SignatureInvalid,

    /// Content key could not be unwrapped with the local encryption key
    #[error("content key unwrap failed")]
    KeyUnwrap,

    /// Relay communication failed or returned an unusable response
    #[error("transport error: {reason}")]
    Transport {
        /// Failure detail
        reason: String,
    },

    /// Local key store or file sink failed
    #[error("local storage error: {reason}")]
    Storage {
        /// Failure detail
        reason: String,
    },

    /// Operation was cancelled; no plaintext was produced
    #[error("transfer cancelled")]
    Cancelled,

    /// Operation started while the previous one is in a terminal state
    #[error("{operation} requires reset() after the previous transfer")]
    NotIdle {
        /// Operation that was refused
        operation: &'static str,
    },
}

/// Fieldless discriminant of [`TransferError`], carried by error phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`TransferError::Lookup`]
    Lookup,
    /// See [`TransferError::KeyMissing`]
    KeyMissing,
    /// See [`TransferError::KeyFormat`]
    KeyFormat,
    /// See [`TransferError::CryptoOperation`]
    CryptoOperation,
    /// See [`TransferError::Integrity`]
    Integrity,
    /// See [`TransferError::SignatureInvalid`]
    SignatureInvalid,
    /// See [`TransferError::KeyUnwrap`]
    KeyUnwrap,
    /// See [`TransferError::Transport`]
    Transport,
    /// See [`TransferError::Storage`]
    Storage,
    /// See [`TransferError::Cancelled`]
    Cancelled,
    /// See [`TransferError::NotIdle`]
    NotIdle,
}

impl TransferError {
    /// Discriminant of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Lookup { .. } => ErrorKind::Lookup,
            Self::KeyMissing => ErrorKind::KeyMissing,
            Self::KeyFormat { .. } => ErrorKind::KeyFormat,
            Self::CryptoOperation { .. } => ErrorKind::CryptoOperation,
            Self::Integrity => ErrorKind::Integrity,
            Self::SignatureInvalid => ErrorKind::SignatureInvalid,
            Self::KeyUnwrap => ErrorKind::KeyUnwrap,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Storage { .. } => ErrorKind::Storage,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::NotIdle { .. } => ErrorKind::NotIdle,
        }
    }

    /// Returns true if the caller may retry the whole operation.
    ///
    /// Only transport failures qualify. The orchestrator itself never
    /// retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    pub(crate) fn transport(reason: impl ToString) -> Self {
        Self::Transport { reason: reason.to_string() }
    }

    pub(crate) fn storage(reason: impl ToString) -> Self {
        Self::Storage { reason: reason.to_string() }
    }

    /// Directory failure for `identity`. Only an unknown identity is a lookup
    /// failure; anything else is the relay being unreachable.
    pub(crate) fn directory(identity: &str, err: CollaboratorError) -> Self {
        match err {
            CollaboratorError::NotFound(reason) => {
                Self::Lookup { identity: identity.to_string(), reason }
            },
            CollaboratorError::Io(reason) => Self::Transport { reason },
        }
    }
}

impl From<CryptoError> for TransferError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::KeyFormat { reason } => Self::KeyFormat { reason },
            CryptoError::Operation { operation, reason } => Self::CryptoOperation { operation, reason },
            CryptoError::Integrity => Self::Integrity,
            CryptoError::KeyUnwrap => Self::KeyUnwrap,
        }
    }
}

/// Bytes delivered by the relay that do not form an envelope are a
/// transport failure.
impl From<ProtocolError> for TransferError {
    fn from(err: ProtocolError) -> Self {
        Self::transport(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transport_is_retryable() {
        assert!(TransferError::transport("connection reset").is_retryable());

        for err in [
            TransferError::KeyMissing,
            TransferError::Integrity,
            TransferError::SignatureInvalid,
            TransferError::KeyUnwrap,
            TransferError::Cancelled,
            TransferError::storage("disk full"),
        ] {
            assert!(!err.is_retryable(), "{err} must not be retryable");
        }
    }

    #[test]
    fn directory_io_failure_is_transport_not_lookup() {
        let unknown = TransferError::directory("bob", CollaboratorError::NotFound("bob".into()));
        assert_eq!(unknown.kind(), ErrorKind::Lookup);
        assert!(!unknown.is_retryable());

        let offline = TransferError::directory("bob", CollaboratorError::Io("connection reset".into()));
        assert_eq!(offline, TransferError::transport("connection reset"));
        assert!(offline.is_retryable());
    }

    #[test]
    fn crypto_errors_keep_their_kind() {
        assert_eq!(TransferError::from(CryptoError::Integrity).kind(), ErrorKind::Integrity);
        assert_eq!(TransferError::from(CryptoError::KeyUnwrap).kind(), ErrorKind::KeyUnwrap);
    }

    #[test]
    fn protocol_errors_are_transport() {
        let err = TransferError::from(ProtocolError::MissingHeader("X-Nonce"));
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[test]
    fn io_not_found_maps_to_not_found() {
        let err = CollaboratorError::from(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert!(matches!(err, CollaboratorError::NotFound(_)));
    }
}
