//! Sealpost Cryptographic Primitives
//!
//! Building blocks for the Sealpost file-drop protocol: RSA key pairs for key
//! wrapping and signing, AES-256-GCM for file content, and SHA-256 digests.
//! All randomness flows through an injected [`CryptoProvider`], so a seeded
//! provider makes every operation reproducible in tests.
//!
//! # Envelope Construction
//!
//! ```text
//! plaintext
//!     │
//!     ▼
//! AES-256-GCM (fresh content key + fresh 96-bit nonce)
//!     │
//!     ├──► ciphertext ‖ tag
//!     │        │
//!     │        ▼
//!     │    SHA-256(ciphertext ‖ nonce ‖ tag) → RSA-PSS signature (sender)
//!     │
//!     ▼
//! RSA-OAEP(content key) under the receiver's encryption key
//! ```
//!
//! The content key and nonce are generated together inside
//! [`EnvelopeEncryptor::seal`] and never leave the sealing call except as the
//! wrapped key, so a (key, nonce) pair cannot be reused.
//!
//! # Security
//!
//! Confidentiality:
//! - Only the holder of the receiver's private encryption key can unwrap the
//!   content key
//! - Content keys are zeroized on drop and never persisted
//!
//! Integrity and Authenticity:
//! - AES-GCM tag detects any modification of ciphertext, nonce, or tag
//! - RSA-PSS signature over the transcript digest binds the content to the
//!   sender's signing key
//!
//! Purpose Separation:
//! - Encryption keys carry the `rsaEncryption` OID, signing keys carry
//!   `id-RSASSA-PSS`; a key imported under the wrong purpose is rejected
//! - Typed handles refuse to wrap with a signing key or sign with an
//!   encryption key

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod envelope;
mod error;
mod keys;
mod provider;
mod signature;

pub use envelope::{AuthTag, ContentKey, EnvelopeEncryptor, Nonce, SealedContent};
pub use error::CryptoError;
pub use keys::{KeyPair, KeyPairManager, KeyPurpose, PrivateKey, PublicKey};
pub use provider::{CryptoProvider, ProviderRng, SeededProvider, SystemProvider};
pub use rsa::{RsaPrivateKey, RsaPublicKey};
pub use signature::{Digest, Signature, SignatureService};
pub use zeroize::Zeroizing;

/// RSA modulus size for both key pairs.
pub const RSA_MODULUS_BITS: usize = 2048;

/// RSA public exponent for both key pairs.
pub const PUBLIC_EXPONENT: u64 = 65_537;

/// AES-256 content key size (32 bytes).
pub const CONTENT_KEY_SIZE: usize = 32;

/// AES-GCM nonce size (12 bytes).
pub const NONCE_SIZE: usize = 12;

/// AES-GCM authentication tag size (16 bytes).
pub const TAG_SIZE: usize = 16;

/// SHA-256 digest size (32 bytes).
pub const DIGEST_SIZE: usize = 32;

/// RSA-PSS salt length (32 bytes).
pub const PSS_SALT_LEN: usize = 32;
