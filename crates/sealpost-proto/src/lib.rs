//! Sealpost Wire Protocol
//!
//! Everything that crosses the relay: key bundles, envelopes, inbox and
//! directory records, and the two accepted shapes of a download response.
//! This crate only encodes and decodes. It performs no cryptography and never
//! decides whether an envelope is authentic.
//!
//! # Envelope (JSON)
//!
//! ```text
//! {
//!   "receiverId":      "<identity>",
//!   "encryptedAESKey": "<base64 RSA-OAEP(content key)>",
//!   "nonce":           "<base64, 12 bytes>",
//!   "authTag":         "<base64, 16 bytes>",
//!   "signature":       "<base64 RSA-PSS>",
//!   "senderPublicKey": "<KeyBundle JSON string>",
//!   "file":            "<base64 ciphertext, tag split off>",
//!   "fileName":        "<name>"
//! }
//! ```
//!
//! # Key Bundle
//!
//! `{"encryption": "<base64 SPKI>", "signing": "<base64 SPKI>"}`, carried as
//! an opaque string. Decoding never fails: anything that is not a bundle is
//! taken as a bare legacy encryption key (see [`DecodedBundle`]).

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod bundle;
mod download;
mod envelope;
mod error;
mod records;

pub use bundle::{DecodedBundle, KeyBundle};
pub use download::{DownloadResponse, headers};
pub use envelope::Envelope;
pub use error::ProtocolError;
pub use records::{DirectoryEntry, InboxEntry, UploadReceipt};
