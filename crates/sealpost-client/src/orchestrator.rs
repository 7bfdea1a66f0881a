//! Send and receive sequences with observable state.
//!
//! The orchestrator drives [`ProtocolEngine`] steps between collaborator
//! calls and publishes every phase change on a `watch` channel.
//!
//! # Sequencing
//!
//! ```text
//! send:    Idle → ReceiverLookup → FileSelected → Encrypting → Signing
//!               → KeyWrapping → Uploading → Success | Error
//!
//! receive: Idle → Downloading → Verifying → Decrypting → Saving
//!               → Success | Error
//! ```
//!
//! Verification completes strictly before the content key is unwrapped. A
//! terminal phase stays until [`TransferOrchestrator::reset`], so a failed
//! transfer is only retried on request.
//!
//! Every suspension point races the caller's [`CancellationToken`]. RSA and
//! AES-GCM work runs on the blocking pool.

use std::future::Future;

use sealpost_crypto::{CryptoProvider, SealedContent};
use sealpost_proto::{DecodedBundle, InboxEntry, UploadReceipt};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::{
    Directory, FileSink, LocalKeys, ProtocolEngine, ReceivePhase, SendPhase, TransferError,
    TransferState, Transport,
};

/// A file that was verified, decrypted, and saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedFile {
    /// Relay file identifier.
    pub file_id: String,
    /// Name handed to the file sink.
    pub file_name: String,
    /// Plaintext length in bytes.
    pub size: usize,
}

/// Drives send and receive transfers for one local identity.
///
/// # Type Parameters
///
/// - `P`: Cryptographic provider
/// - `D`: Public key directory
/// - `T`: Envelope relay
pub struct TransferOrchestrator<P, D, T> {
    engine: ProtocolEngine<P>,
    identity: String,
    keys: LocalKeys,
    directory: D,
    transport: T,
    state: watch::Sender<TransferState>,
}

impl<P, D, T> TransferOrchestrator<P, D, T>
where
    P: CryptoProvider,
    D: Directory,
    T: Transport,
{
    /// Create an orchestrator for `identity` in the idle state.
    pub fn new(
        provider: P,
        identity: impl Into<String>,
        keys: LocalKeys,
        directory: D,
        transport: T,
    ) -> Self {
        let (state, _) = watch::channel(TransferState::default());
        Self {
            engine: ProtocolEngine::new(provider),
            identity: identity.into(),
            keys,
            directory,
            transport,
            state,
        }
    }

    /// Local identity.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Current state.
    pub fn state(&self) -> TransferState {
        *self.state.borrow()
    }

    /// Watch every phase change.
    pub fn subscribe(&self) -> watch::Receiver<TransferState> {
        self.state.subscribe()
    }

    /// Return terminal phases to `Idle`. In-flight phases cannot exist here;
    /// operations hold `&mut self`.
    pub fn reset(&mut self) {
        let current = self.state();
        if current.send.is_terminal() {
            self.set_send(SendPhase::Idle);
        }
        if current.receive.is_terminal() {
            self.set_receive(ReceivePhase::Idle);
        }
    }

    /// Seal `plaintext` for `receiver_id` and upload it.
    ///
    /// # Errors
    ///
    /// - `NotIdle`: previous send not reset; state is unchanged
    /// - `Lookup`: receiver unknown to the directory
    /// - `Transport`: directory unreachable, or upload failed (retryable)
    /// - `KeyFormat`: receiver's encryption key is unusable
    /// - `Cancelled`: `cancel` fired; nothing was uploaded after that point
    pub async fn send(
        &mut self,
        receiver_id: &str,
        file_name: &str,
        plaintext: Vec<u8>,
        cancel: &CancellationToken,
    ) -> Result<UploadReceipt, TransferError> {
        if self.state().send != SendPhase::Idle {
            return Err(TransferError::NotIdle { operation: "send" });
        }

        let result = self.run_send(receiver_id, file_name, plaintext, cancel).await;
        match &result {
            Ok(receipt) => {
                tracing::info!(receiver = receiver_id, file_id = %receipt.file_id, "file sent");
                self.set_send(SendPhase::Success);
            },
            Err(err) => {
                tracing::warn!(receiver = receiver_id, kind = ?err.kind(), error = %err, "send failed");
                self.set_send(SendPhase::Error(err.kind()));
            },
        }
        result
    }

    async fn run_send(
        &self,
        receiver_id: &str,
        file_name: &str,
        plaintext: Vec<u8>,
        cancel: &CancellationToken,
    ) -> Result<UploadReceipt, TransferError> {
        self.set_send(SendPhase::ReceiverLookup);
        let entry = guarded(cancel, self.directory.lookup_public_key(receiver_id))
            .await?
            .map_err(|e| TransferError::directory(receiver_id, e))?;
        let receiver = entry.bundle();
        if matches!(receiver, DecodedBundle::RawKey(_)) {
            tracing::debug!(receiver = receiver_id, "receiver published a bare encryption key");
        }

        self.set_send(SendPhase::FileSelected);
        tracing::debug!(receiver = receiver_id, bytes = plaintext.len(), "file selected");

        self.set_send(SendPhase::Encrypting);
        let engine = self.engine.clone();
        let sealed = blocking(cancel, move || engine.encrypt(&plaintext)).await?;

        self.set_send(SendPhase::Signing);
        let (engine, keys) = (self.engine.clone(), self.keys.clone());
        let (sealed, signature) = blocking(cancel, move || {
            let signature = engine.sign(&sealed, &keys)?;
            Ok((sealed, signature))
        })
        .await?;

        self.set_send(SendPhase::KeyWrapping);
        let engine = self.engine.clone();
        let (sealed, wrapped_key): (SealedContent, Vec<u8>) = blocking(cancel, move || {
            let wrapped = engine.wrap(&sealed.key, &receiver)?;
            Ok((sealed, wrapped))
        })
        .await?;

        let envelope =
            self.engine.assemble(receiver_id, file_name, sealed, signature, wrapped_key, &self.keys);

        self.set_send(SendPhase::Uploading);
        guarded(cancel, self.transport.upload(&envelope)).await?.map_err(TransferError::transport)
    }

    /// List files waiting for the local identity.
    ///
    /// Moves the receive machine through `Listing` and back to `Idle`.
    pub async fn list_inbox(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Vec<InboxEntry>, TransferError> {
        if self.state().receive != ReceivePhase::Idle {
            return Err(TransferError::NotIdle { operation: "list_inbox" });
        }

        self.set_receive(ReceivePhase::Listing);
        let result = guarded(cancel, self.transport.list_inbox())
            .await
            .and_then(|listing| listing.map_err(TransferError::transport));

        match &result {
            Ok(entries) => {
                tracing::debug!(count = entries.len(), "inbox listed");
                self.set_receive(ReceivePhase::Idle);
            },
            Err(err) => self.set_receive(ReceivePhase::Error(err.kind())),
        }
        result
    }

    /// Download, verify, decrypt, and save `file_id`.
    ///
    /// The signature is verified before any decryption. On failure nothing
    /// reaches `sink`.
    ///
    /// # Errors
    ///
    /// - `NotIdle`: previous receive not reset; state is unchanged
    /// - `Transport`: download failed or the response is not an envelope
    /// - `SignatureInvalid`: signature does not verify under the sender key
    /// - `KeyUnwrap`: content key was not wrapped for the local key
    /// - `Integrity`: ciphertext does not authenticate
    /// - `Storage`: the sink refused the file
    /// - `Cancelled`: `cancel` fired; nothing was saved
    pub async fn receive<S: FileSink>(
        &mut self,
        file_id: &str,
        sink: &S,
        cancel: &CancellationToken,
    ) -> Result<ReceivedFile, TransferError> {
        if self.state().receive != ReceivePhase::Idle {
            return Err(TransferError::NotIdle { operation: "receive" });
        }

        let result = self.run_receive(file_id, sink, cancel).await;
        match &result {
            Ok(received) => {
                tracing::info!(file_id, bytes = received.size, "file received");
                self.set_receive(ReceivePhase::Success);
            },
            Err(err) => {
                tracing::warn!(file_id, kind = ?err.kind(), error = %err, "receive failed");
                self.set_receive(ReceivePhase::Error(err.kind()));
            },
        }
        result
    }

    async fn run_receive<S: FileSink>(
        &self,
        file_id: &str,
        sink: &S,
        cancel: &CancellationToken,
    ) -> Result<ReceivedFile, TransferError> {
        self.set_receive(ReceivePhase::Downloading);
        let response =
            guarded(cancel, self.transport.fetch(file_id)).await?.map_err(TransferError::transport)?;
        let envelope = response.decode(&self.identity)?;

        self.set_receive(ReceivePhase::Verifying);
        let engine = self.engine.clone();
        let verified = blocking(cancel, move || engine.verify(envelope)).await?;

        self.set_receive(ReceivePhase::Decrypting);
        let (engine, keys) = (self.engine.clone(), self.keys.clone());
        let file_name = verified.file_name().to_string();
        let plaintext = blocking(cancel, move || engine.decrypt(&verified, &keys)).await?;

        self.set_receive(ReceivePhase::Saving);
        let size = plaintext.len();
        guarded(cancel, sink.save(&file_name, plaintext)).await?.map_err(TransferError::storage)?;

        Ok(ReceivedFile { file_id: file_id.to_string(), file_name, size })
    }

    fn set_send(&self, phase: SendPhase) {
        self.state.send_modify(|state| {
            tracing::debug!(from = ?state.send, to = ?phase, "send transition");
            state.send = phase;
        });
    }

    fn set_receive(&self, phase: ReceivePhase) {
        self.state.send_modify(|state| {
            tracing::debug!(from = ?state.receive, to = ?phase, "receive transition");
            state.receive = phase;
        });
    }
}

/// Race `future` against cancellation. Cancellation wins ties.
async fn guarded<F: Future>(cancel: &CancellationToken, future: F) -> Result<F::Output, TransferError> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(TransferError::Cancelled),
        output = future => Ok(output),
    }
}

/// Run CPU-bound protocol work on the blocking pool under cancellation.
async fn blocking<R, F>(cancel: &CancellationToken, work: F) -> Result<R, TransferError>
where
    R: Send + 'static,
    F: FnOnce() -> Result<R, TransferError> + Send + 'static,
{
    match guarded(cancel, tokio::task::spawn_blocking(work)).await? {
        Ok(result) => result,
        Err(join) => Err(TransferError::CryptoOperation {
            operation: "blocking task",
            reason: join.to_string(),
        }),
    }
}
