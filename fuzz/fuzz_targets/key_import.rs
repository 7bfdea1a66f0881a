//! Fuzz target for public and private key import
//!
//! # Invariants
//!
//! - NEVER panic on arbitrary base64 or DER
//! - Every accepted key carries the purpose it was imported for

#![no_main]

use libfuzzer_sys::fuzz_target;
use sealpost_crypto::{KeyPairManager, KeyPurpose, SeededProvider};

fuzz_target!(|input: &str| {
    let manager = KeyPairManager::new(SeededProvider::new(0));

    for purpose in [KeyPurpose::Encryption, KeyPurpose::Signing] {
        if let Ok(key) = manager.import_public(input, purpose) {
            assert_eq!(key.purpose(), purpose);
        }
        if let Ok(key) = manager.import_private(input, purpose) {
            assert_eq!(key.purpose(), purpose);
        }
    }
});
