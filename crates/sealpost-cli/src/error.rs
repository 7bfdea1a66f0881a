//! CLI error types.

use sealpost_client::TransferError;
use thiserror::Error;

/// Errors surfaced by `sealpost` commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Missing or invalid configuration (user, paths).
    ///
    /// Fix the flags or environment and rerun.
    #[error("configuration error: {0}")]
    Config(String),

    /// Protocol or collaborator failure during a transfer.
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// Local file could not be read.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Returns true if rerunning the same command may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transfer(err) => err.is_retryable(),
            Self::Config(_) | Self::Io(_) => false,
        }
    }
}
