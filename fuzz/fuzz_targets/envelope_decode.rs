//! Fuzz target for JSON envelope decoding
//!
//! # Strategy
//!
//! - Random bytes: arbitrary relay response bodies
//! - Field mutation: well-formed JSON with arbitrary field values
//!
//! # Invariants
//!
//! - NEVER panic on a malformed body
//! - A decoded envelope has a 12-byte nonce and a 16-byte tag
//! - A decoded envelope survives a re-encode unchanged

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sealpost_proto::Envelope;

#[derive(Debug, Arbitrary)]
enum Body {
    RandomBytes(Vec<u8>),
    Fields {
        receiver_id: String,
        wrapped_key: String,
        nonce: String,
        tag: String,
        signature: String,
        sender: String,
        file: String,
        file_name: String,
    },
}

fuzz_target!(|body: Body| {
    let bytes = match body {
        Body::RandomBytes(bytes) => bytes,
        Body::Fields { receiver_id, wrapped_key, nonce, tag, signature, sender, file, file_name } => {
            let map: std::collections::BTreeMap<&str, String> = [
                ("receiverId", receiver_id),
                ("encryptedAESKey", wrapped_key),
                ("nonce", nonce),
                ("authTag", tag),
                ("signature", signature),
                ("senderPublicKey", sender),
                ("file", file),
                ("fileName", file_name),
            ]
            .into_iter()
            .collect();
            serde_json::to_vec(&map).unwrap_or_default()
        }
    };

    if let Ok(envelope) = Envelope::from_json(&bytes) {
        assert_eq!(envelope.nonce.as_bytes().len(), 12);
        assert_eq!(envelope.tag.as_bytes().len(), 16);

        let again = Envelope::from_json(&envelope.to_json()).expect("re-encoded envelope decodes");
        assert_eq!(again, envelope);
    }
});
