//! Output directory sink.

use std::path::{Path, PathBuf};

use sealpost_client::{CollaboratorError, FileSink};
use tokio::fs;

/// Name used when the sender's file name has no usable final component.
const FALLBACK_NAME: &str = "received.bin";

/// [`FileSink`] writing received files into one directory.
///
/// Only the final component of the sender-chosen name is used, so a name
/// like `../../.bashrc` lands as `.bashrc` inside the output directory.
#[derive(Debug, Clone)]
pub struct DirSink {
    dir: PathBuf,
}

impl DirSink {
    /// Sink writing into `dir`, created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Where `file_name` would be written.
    pub fn target(&self, file_name: &str) -> PathBuf {
        let name = Path::new(file_name)
            .file_name()
            .and_then(|name| name.to_str())
            .filter(|name| !name.is_empty())
            .unwrap_or(FALLBACK_NAME);
        self.dir.join(name)
    }
}

impl FileSink for DirSink {
    async fn save(&self, file_name: &str, plaintext: Vec<u8>) -> Result<(), CollaboratorError> {
        fs::create_dir_all(&self.dir).await?;
        let target = self.target(file_name);
        fs::write(&target, plaintext).await?;
        tracing::debug!(path = %target.display(), "saved file");
        Ok(())
    }
}
