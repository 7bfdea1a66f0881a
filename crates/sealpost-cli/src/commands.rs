//! Command implementations.
//!
//! Each command resolves its collaborators from [`Config`], runs one client
//! operation, and returns a summary for the binary to print.

use std::path::{Path, PathBuf};

use sealpost_client::{Account, AccountStatus, LocalKeys, ReceivedFile, TransferOrchestrator};
use sealpost_crypto::{CryptoProvider, SystemProvider};
use sealpost_proto::{InboxEntry, KeyBundle, UploadReceipt};
use tokio_util::sync::CancellationToken;

use crate::{CliError, Config, DirSink, FsKeyStore, FsRelay, validate_identity};

/// Local identity and its published key fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Local user.
    pub user: String,
    /// Hex SHA-256 of the published bundle JSON.
    pub fingerprint: String,
}

/// A received file and where it was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Saved {
    /// Transfer summary.
    pub file: ReceivedFile,
    /// Output path.
    pub path: PathBuf,
}

fn account(config: &Config) -> Result<Account<FsKeyStore, FsRelay, SystemProvider>, CliError> {
    let user = config.user()?;
    Ok(Account::new(
        FsKeyStore::new(config.key_path()?),
        FsRelay::new(config.relay(), user),
        SystemProvider::new(),
    ))
}

async fn load_keys(config: &Config) -> Result<LocalKeys, CliError> {
    let keys = account(config)?.provision(config.user()?, AccountStatus::Existing).await?;
    Ok(keys)
}

async fn orchestrator(
    config: &Config,
) -> Result<TransferOrchestrator<SystemProvider, FsRelay, FsRelay>, CliError> {
    let user = config.user()?;
    let keys = load_keys(config).await?;
    let relay = FsRelay::new(config.relay(), user);
    Ok(TransferOrchestrator::new(SystemProvider::new(), user, keys, relay.clone(), relay))
}

/// Hex SHA-256 fingerprint of `bundle`.
pub fn fingerprint(bundle: &KeyBundle) -> String {
    hex::encode(SystemProvider::new().sha256(&[bundle.to_json().as_bytes()]))
}

/// Provision keys for the configured user.
///
/// `existing` marks an account that was set up on another device; it never
/// generates keys.
pub async fn init(config: &Config, existing: bool) -> Result<Identity, CliError> {
    let user = config.user()?;
    let status = if existing { AccountStatus::Existing } else { AccountStatus::New };
    let keys = account(config)?.provision(user, status).await?;
    Ok(Identity { user: user.to_string(), fingerprint: fingerprint(keys.bundle()) })
}

/// Report the configured user and its key fingerprint.
pub async fn whoami(config: &Config) -> Result<Identity, CliError> {
    let keys = load_keys(config).await?;
    Ok(Identity { user: config.user()?.to_string(), fingerprint: fingerprint(keys.bundle()) })
}

/// Encrypt the file at `path` for `receiver` and upload it.
pub async fn send(
    config: &Config,
    receiver: &str,
    path: &Path,
    cancel: &CancellationToken,
) -> Result<UploadReceipt, CliError> {
    validate_identity(receiver)?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| CliError::Config(format!("{} has no usable file name", path.display())))?
        .to_string();
    let plaintext = tokio::fs::read(path).await?;

    let mut orchestrator = orchestrator(config).await?;
    let receipt = orchestrator.send(receiver, &file_name, plaintext, cancel).await?;
    Ok(receipt)
}

/// List files waiting for the configured user.
pub async fn inbox(config: &Config, cancel: &CancellationToken) -> Result<Vec<InboxEntry>, CliError> {
    let mut orchestrator = orchestrator(config).await?;
    Ok(orchestrator.list_inbox(cancel).await?)
}

/// Download, verify, and decrypt `file_id` into `out`.
pub async fn receive(
    config: &Config,
    file_id: &str,
    out: &Path,
    cancel: &CancellationToken,
) -> Result<Saved, CliError> {
    let sink = DirSink::new(out);
    let mut orchestrator = orchestrator(config).await?;
    let file = orchestrator.receive(file_id, &sink, cancel).await?;
    let path = sink.target(&file.file_name);
    Ok(Saved { file, path })
}

/// Remove the configured user's local keys. Idempotent.
pub async fn logout(config: &Config) -> Result<(), CliError> {
    account(config)?.logout().await?;
    Ok(())
}
