//! End-to-end tests over the filesystem relay
//!
//! Two users share one relay directory under a temp dir. Every test drives
//! the same command functions the binary calls.

use std::path::Path;

use sealpost_cli::{CliError, Config, commands};
use sealpost_client::TransferError;
use tokio_util::sync::CancellationToken;

fn config(root: &Path, user: &str) -> Config {
    Config::new(root.join(format!("home-{user}")), Some(root.join("relay")), Some(user.to_string()))
}

fn mailbox_files(root: &Path, user: &str) -> Vec<std::path::PathBuf> {
    std::fs::read_dir(root.join("relay/mailbox").join(user))
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect()
}

/// Alice sends a file to Bob; Bob lists, receives, and gets the same bytes.
#[tokio::test]
async fn send_inbox_receive_roundtrip() {
    let root = tempfile::tempdir().unwrap();
    let (alice, bob) = (config(root.path(), "alice"), config(root.path(), "bob"));
    let cancel = CancellationToken::new();

    commands::init(&alice, false).await.unwrap();
    commands::init(&bob, false).await.unwrap();

    let source = root.path().join("notes.txt");
    std::fs::write(&source, b"meet at noon").unwrap();
    let receipt = commands::send(&alice, "bob", &source, &cancel).await.unwrap();

    let inbox = commands::inbox(&bob, &cancel).await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].file_id, receipt.file_id);
    assert_eq!(inbox[0].sender_id, "alice");
    assert_eq!(inbox[0].file_name, "notes.txt");

    let out = root.path().join("downloads");
    let saved = commands::receive(&bob, &receipt.file_id, &out, &cancel).await.unwrap();
    assert_eq!(saved.path, out.join("notes.txt"));
    assert_eq!(saved.file.size, 12);
    assert_eq!(std::fs::read(&saved.path).unwrap(), b"meet at noon");

    // Alice's own inbox stays empty
    assert!(commands::inbox(&alice, &cancel).await.unwrap().is_empty());
}

/// `init` twice reuses the stored keys instead of generating new ones.
#[tokio::test]
async fn init_is_stable_and_whoami_matches() {
    let root = tempfile::tempdir().unwrap();
    let alice = config(root.path(), "alice");

    let first = commands::init(&alice, false).await.unwrap();
    let second = commands::init(&alice, false).await.unwrap();
    let whoami = commands::whoami(&alice).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first, whoami);
    assert_eq!(first.fingerprint.len(), 64);
}

/// A returning account on a fresh device must not silently rotate keys.
#[tokio::test]
async fn existing_account_without_keys_is_refused() {
    let root = tempfile::tempdir().unwrap();
    let alice = config(root.path(), "alice");

    let err = commands::init(&alice, true).await.unwrap_err();
    assert!(matches!(err, CliError::Transfer(TransferError::KeyMissing)));

    let err = commands::whoami(&alice).await.unwrap_err();
    assert!(matches!(err, CliError::Transfer(TransferError::KeyMissing)));
}

/// Logout removes keys and is idempotent.
#[tokio::test]
async fn logout_removes_keys() {
    let root = tempfile::tempdir().unwrap();
    let alice = config(root.path(), "alice");

    commands::init(&alice, false).await.unwrap();
    commands::logout(&alice).await.unwrap();
    commands::logout(&alice).await.unwrap();

    assert!(!alice.key_path().unwrap().exists());
    assert!(commands::whoami(&alice).await.is_err());
}

/// Sending to someone who never registered fails at lookup.
#[tokio::test]
async fn send_to_unknown_receiver_is_lookup_error() {
    let root = tempfile::tempdir().unwrap();
    let alice = config(root.path(), "alice");
    commands::init(&alice, false).await.unwrap();

    let source = root.path().join("a.bin");
    std::fs::write(&source, b"x").unwrap();

    let err = commands::send(&alice, "carol", &source, &CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, CliError::Transfer(TransferError::Lookup { .. })));
}

/// A relay that rewrites the stored envelope is caught before anything is
/// written to the output directory.
#[tokio::test]
async fn tampered_mailbox_record_is_rejected() {
    let root = tempfile::tempdir().unwrap();
    let (alice, bob) = (config(root.path(), "alice"), config(root.path(), "bob"));
    let cancel = CancellationToken::new();
    commands::init(&alice, false).await.unwrap();
    commands::init(&bob, false).await.unwrap();

    let source = root.path().join("secret.txt");
    std::fs::write(&source, b"original contents").unwrap();
    let receipt = commands::send(&alice, "bob", &source, &cancel).await.unwrap();

    let record_path = &mailbox_files(root.path(), "bob")[0];
    let mut record: serde_json::Value =
        serde_json::from_slice(&std::fs::read(record_path).unwrap()).unwrap();
    record["envelope"]["nonce"] = serde_json::Value::String("AAAAAAAAAAAAAAAA".to_string());
    std::fs::write(record_path, serde_json::to_vec(&record).unwrap()).unwrap();

    let out = root.path().join("downloads");
    let err = commands::receive(&bob, &receipt.file_id, &out, &cancel).await.unwrap_err();

    assert!(matches!(err, CliError::Transfer(TransferError::SignatureInvalid)));
    assert!(!out.join("secret.txt").exists());
}

/// Unknown or path-like file ids never escape the caller's mailbox.
#[tokio::test]
async fn receive_unknown_file_is_transport_error() {
    let root = tempfile::tempdir().unwrap();
    let bob = config(root.path(), "bob");
    commands::init(&bob, false).await.unwrap();
    let cancel = CancellationToken::new();

    for file_id in ["0123456789abcdef0123456789abcdef", "../../directory/bob"] {
        let err = commands::receive(&bob, file_id, root.path(), &cancel).await.unwrap_err();
        assert!(matches!(err, CliError::Transfer(TransferError::Transport { .. })), "{file_id}");
    }
}

/// Commands refuse to run without a usable identity.
#[tokio::test]
async fn missing_or_unsafe_user_is_config_error() {
    let root = tempfile::tempdir().unwrap();
    let nobody = Config::new(root.path().to_path_buf(), None, None);
    let escaping = Config::new(root.path().to_path_buf(), None, Some("../x".to_string()));

    assert!(matches!(commands::init(&nobody, false).await, Err(CliError::Config(_))));
    assert!(matches!(commands::init(&escaping, false).await, Err(CliError::Config(_))));
}
