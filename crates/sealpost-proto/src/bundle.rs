//! Public key bundles.

use serde::{Deserialize, Serialize};

/// One identity's two portable public keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBundle {
    /// Base64 SPKI of the RSA-OAEP encryption key.
    pub encryption: String,
    /// Base64 SPKI of the RSA-PSS signing key.
    pub signing: String,
}

impl KeyBundle {
    /// Bundle two exported public keys.
    pub fn new(encryption: impl Into<String>, signing: impl Into<String>) -> Self {
        Self { encryption: encryption.into(), signing: signing.into() }
    }

    /// Opaque string form carried in envelopes and directory entries.
    pub fn to_json(&self) -> String {
        // Two string fields cannot fail to serialize
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Result of decoding a key-bundle string.
///
/// Early clients published a bare encryption key instead of a bundle, so any
/// string that does not parse as a [`KeyBundle`] is kept whole as
/// [`DecodedBundle::RawKey`]. Decoding never fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedBundle {
    /// Both public keys.
    Bundle(KeyBundle),
    /// A bare encryption key; no signing key is known.
    RawKey(String),
}

impl DecodedBundle {
    /// Parse-or-fallback decoding of a bundle string.
    pub fn parse(encoded: &str) -> Self {
        match serde_json::from_str::<KeyBundle>(encoded) {
            Ok(bundle) => Self::Bundle(bundle),
            Err(_) => Self::RawKey(encoded.to_string()),
        }
    }

    /// Encryption key, present in both forms.
    pub fn encryption_key(&self) -> &str {
        match self {
            Self::Bundle(bundle) => &bundle.encryption,
            Self::RawKey(key) => key,
        }
    }

    /// Signing key, absent for a legacy raw key.
    pub fn signing_key(&self) -> Option<&str> {
        match self {
            Self::Bundle(bundle) => Some(&bundle.signing),
            Self::RawKey(_) => None,
        }
    }
}
