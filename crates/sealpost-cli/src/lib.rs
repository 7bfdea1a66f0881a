//! Sealpost command-line client
//!
//! Filesystem-backed collaborators and the command implementations behind the
//! `sealpost` binary. The relay is a shared directory, so two users on one
//! machine (or on a shared mount) can exchange files end to end.
//!
//! # Layout
//!
//! ```text
//! <home>/<user>/keys.json                      private keys (mode 0600)
//! <relay>/directory/<user>.json                published key bundle
//! <relay>/mailbox/<receiver>/<file-id>.json    envelope + inbox metadata
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod commands;
mod config;
mod error;
mod keystore;
mod relay;
mod sink;

pub use config::{Config, validate_identity};
pub use error::CliError;
pub use keystore::FsKeyStore;
pub use relay::FsRelay;
pub use sink::DirSink;
