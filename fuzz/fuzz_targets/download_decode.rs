//! Fuzz target for binary download responses
//!
//! Arbitrary header sets and bodies, as a hostile relay could return them.
//!
//! # Invariants
//!
//! - NEVER panic on missing, duplicated, or malformed headers
//! - The binary body is taken as ciphertext byte for byte

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sealpost_proto::{DownloadResponse, headers};

const NAMES: [&str; 7] = [
    headers::ENCRYPTED_AES_KEY,
    headers::NONCE,
    headers::AUTH_TAG,
    headers::SIGNATURE,
    headers::SENDER_PUBLIC_KEY,
    headers::FILE_NAME,
    headers::RECEIVER_ID,
];

#[derive(Debug, Arbitrary)]
struct Response {
    headers: Vec<(u8, bool, String)>,
    body: Vec<u8>,
}

fuzz_target!(|input: Response| {
    let mut response = DownloadResponse::new(input.body.clone());
    for (index, upper, value) in input.headers {
        let name = NAMES[usize::from(index) % NAMES.len()];
        let name = if upper { name.to_ascii_uppercase() } else { name.to_ascii_lowercase() };
        response = response.with_header(name, value);
    }

    if let Ok(envelope) = response.decode("fuzz") {
        if response.header(headers::ENCRYPTED_AES_KEY).is_some() {
            assert_eq!(envelope.ciphertext, input.body);
        }
    }
});
