//! Fuzz target for key bundle parsing
//!
//! # Invariants
//!
//! - `DecodedBundle::parse` is total: never panics, never errors
//! - Input that is not a JSON bundle is kept verbatim as a raw key
//! - A parsed bundle re-encodes to a string that parses to the same bundle

#![no_main]

use libfuzzer_sys::fuzz_target;
use sealpost_proto::DecodedBundle;

fuzz_target!(|input: &str| {
    match DecodedBundle::parse(input) {
        DecodedBundle::Bundle(bundle) => {
            let reparsed = DecodedBundle::parse(&bundle.to_json());
            assert_eq!(reparsed, DecodedBundle::Bundle(bundle));
        }
        DecodedBundle::RawKey(raw) => {
            assert_eq!(raw, input);
        }
    }
});
