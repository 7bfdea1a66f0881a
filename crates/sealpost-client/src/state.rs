//! Observable transfer state.
//!
//! These are the view-model types a presentation layer renders. They carry
//! phases and error kinds only, never key material or file contents.

use crate::ErrorKind;

/// Phase of the send sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SendPhase {
    /// Ready to send.
    #[default]
    Idle,
    /// Resolving the receiver's key bundle.
    ReceiverLookup,
    /// Receiver resolved; file accepted for sealing.
    FileSelected,
    /// Encrypting file content under a fresh content key.
    Encrypting,
    /// Signing the transcript digest.
    Signing,
    /// Wrapping the content key for the receiver.
    KeyWrapping,
    /// Uploading the envelope.
    Uploading,
    /// Envelope accepted by the relay.
    Success,
    /// Failed; `reset()` before the next send.
    Error(ErrorKind),
}

/// Phase of the receive sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReceivePhase {
    /// Ready to list or receive.
    #[default]
    Idle,
    /// Fetching the inbox listing.
    Listing,
    /// Downloading an envelope.
    Downloading,
    /// Verifying the sender signature.
    Verifying,
    /// Unwrapping the content key and decrypting.
    Decrypting,
    /// Handing plaintext to the file sink.
    Saving,
    /// File saved.
    Success,
    /// Failed; `reset()` before the next receive.
    Error(ErrorKind),
}

impl SendPhase {
    /// Returns true for `Success` and `Error`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Error(_))
    }
}

impl ReceivePhase {
    /// Returns true for `Success` and `Error`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Error(_))
    }
}

/// Combined state of one orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransferState {
    /// Send machine.
    pub send: SendPhase,
    /// Receive machine.
    pub receive: ReceivePhase,
}
