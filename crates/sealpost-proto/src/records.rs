//! Relay records: directory entries, uploads, and inbox listings.

use serde::{Deserialize, Serialize};

use crate::DecodedBundle;

/// Directory answer for one identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    /// Identity the key belongs to.
    pub user_id: String,
    /// Key bundle string as published.
    pub public_key: String,
}

impl DirectoryEntry {
    /// Decode the published bundle.
    pub fn bundle(&self) -> DecodedBundle {
        DecodedBundle::parse(&self.public_key)
    }
}

/// Relay acknowledgement of an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    /// Relay-assigned file identifier.
    pub file_id: String,
}

/// One pending file in a receiver's inbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxEntry {
    /// Relay-assigned file identifier.
    pub file_id: String,
    /// File name as given by the sender.
    pub file_name: String,
    /// Sender identity as reported by the relay. Not authenticated.
    pub sender_id: String,
    /// Upload time as reported by the relay (Unix seconds for the bundled
    /// relays). Opaque to the client.
    pub uploaded_at: String,
}
