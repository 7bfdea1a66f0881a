//! Sealpost Client
//!
//! Send and receive orchestration for the Sealpost file-drop protocol. The
//! crate composes the primitives of `sealpost-crypto` into the two protocol
//! sequences and exposes their progress as observable state, while all disk
//! and network access stays behind collaborator traits.
//!
//! # Components
//!
//! - [`ProtocolEngine`]: pure seal/open steps, no I/O
//! - [`TransferOrchestrator`]: send/receive state machines over collaborators
//! - [`Account`]: local key provisioning and logout
//! - [`KeyStore`], [`Directory`], [`Transport`], [`FileSink`]: collaborator
//!   contracts
//! - [`MemoryKeyStore`], [`MemoryRelay`], [`MemorySink`]: in-memory
//!   collaborators for tests

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod account;
mod collaborators;
mod engine;
mod error;
mod keys;
mod memory;
mod orchestrator;
mod state;

pub use account::{Account, AccountStatus};
pub use collaborators::{Directory, FileSink, KeyStore, Transport};
pub use engine::{ProtocolEngine, VerifiedEnvelope};
pub use error::{CollaboratorError, ErrorKind, TransferError};
pub use keys::{LocalKeys, StoredKeys};
pub use memory::{MemoryKeyStore, MemoryRelay, MemorySink};
pub use orchestrator::{ReceivedFile, TransferOrchestrator};
pub use state::{ReceivePhase, SendPhase, TransferState};
