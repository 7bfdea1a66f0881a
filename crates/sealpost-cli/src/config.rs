//! Resolved command-line configuration.

use std::path::{Path, PathBuf};

use crate::CliError;

/// Longest accepted identity.
const MAX_IDENTITY_LEN: usize = 64;

/// Paths and identity shared by every command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    home: PathBuf,
    relay: PathBuf,
    user: Option<String>,
}

impl Config {
    /// Resolve configuration. `relay` defaults to `<home>/relay`.
    pub fn new(home: PathBuf, relay: Option<PathBuf>, user: Option<String>) -> Self {
        let relay = relay.unwrap_or_else(|| home.join("relay"));
        Self { home, relay, user }
    }

    /// Local state directory.
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Relay root directory.
    pub fn relay(&self) -> &Path {
        &self.relay
    }

    /// Local identity.
    ///
    /// # Errors
    ///
    /// - `Config`: no user configured, or the identity is not path-safe
    pub fn user(&self) -> Result<&str, CliError> {
        let user = self.user.as_deref().ok_or_else(|| {
            CliError::Config("no user given; pass --user or set SEALPOST_USER".to_string())
        })?;
        validate_identity(user)?;
        Ok(user)
    }

    /// Key file of the local identity.
    pub fn key_path(&self) -> Result<PathBuf, CliError> {
        Ok(self.home.join(self.user()?).join("keys.json"))
    }
}

/// Check that `identity` is usable as a single path component.
///
/// Accepts 1 to 64 ASCII letters, digits, `.`, `_`, `-`, not starting with
/// `.`.
pub fn validate_identity(identity: &str) -> Result<(), CliError> {
    let valid = !identity.is_empty()
        && identity.len() <= MAX_IDENTITY_LEN
        && !identity.starts_with('.')
        && identity.bytes().all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'));

    if valid {
        Ok(())
    } else {
        Err(CliError::Config(format!("invalid identity {identity:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_defaults_under_home() {
        let config = Config::new(PathBuf::from("/tmp/sp"), None, Some("alice".to_string()));

        assert_eq!(config.relay(), Path::new("/tmp/sp/relay"));
        assert_eq!(config.key_path().unwrap(), Path::new("/tmp/sp/alice/keys.json"));
    }

    #[test]
    fn missing_user_is_config_error() {
        let config = Config::new(PathBuf::from("h"), None, None);
        assert!(matches!(config.user(), Err(CliError::Config(_))));
    }

    #[test]
    fn identities_must_be_path_safe() {
        for ok in ["alice", "bob.smith", "user_1", "a-b"] {
            assert!(validate_identity(ok).is_ok(), "{ok}");
        }
        for bad in ["", ".", "..", "../etc", "a/b", "a\\b", ".hidden", "späce", &"x".repeat(65)] {
            assert!(validate_identity(bad).is_err(), "{bad}");
        }
    }
}
