//! SSH key credential shared by every repository task.
//!
//! Built once at startup and never mutated afterwards, so tasks share it
//! behind an `Arc` without synchronization.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// User name offered to the server when the remote URL carries none.
pub const DEFAULT_SSH_USER: &str = "git";

/// Key material for authenticated transports.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    username: String,
    private_key: PathBuf,
    passphrase: Option<String>,
}

impl Credential {
    /// Validate `private_key` and build a credential around it.
    ///
    /// The key must be a readable regular file. An empty passphrase is
    /// treated as no passphrase.
    pub fn from_key_file(
        username: impl Into<String>,
        private_key: impl Into<PathBuf>,
        passphrase: Option<String>,
    ) -> Result<Self, ConfigError> {
        let private_key = private_key.into();
        let meta = std::fs::metadata(&private_key).map_err(|e| ConfigError::CredentialUnreadable {
            path: private_key.clone(),
            reason: e.to_string(),
        })?;
        if !meta.is_file() {
            return Err(ConfigError::CredentialUnreadable {
                path: private_key,
                reason: "not a regular file".to_string(),
            });
        }
        std::fs::File::open(&private_key).map_err(|e| ConfigError::CredentialUnreadable {
            path: private_key.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            username: username.into(),
            private_key,
            passphrase: passphrase.filter(|p| !p.is_empty()),
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn private_key(&self) -> &Path {
        &self.private_key
    }

    pub fn passphrase(&self) -> Option<&str> {
        self.passphrase.as_deref()
    }
}

// Keeps the passphrase out of log lines.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("private_key", &self.private_key)
            .field("passphrase", &self.passphrase.as_ref().map(|_| "***"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_key_is_rejected() {
        let dir = TempDir::new().expect("tempdir");
        let err = Credential::from_key_file("git", dir.path().join("id_none"), None)
            .expect_err("missing key");
        assert!(matches!(err, ConfigError::CredentialUnreadable { .. }));
    }

    #[test]
    fn directory_is_not_a_key() {
        let dir = TempDir::new().expect("tempdir");
        let err = Credential::from_key_file("git", dir.path(), None).expect_err("dir key");
        assert!(err.to_string().contains("not a regular file"));
    }

    #[test]
    fn empty_passphrase_becomes_none_and_debug_hides_secret() {
        let dir = TempDir::new().expect("tempdir");
        let key = dir.path().join("id_ed25519");
        std::fs::write(&key, "key").expect("write key");

        let cred = Credential::from_key_file("git", &key, Some(String::new())).expect("cred");
        assert_eq!(cred.passphrase(), None);
        assert_eq!(cred.private_key(), key.as_path());

        let cred = Credential::from_key_file("git", &key, Some("hunter2".into())).expect("cred");
        assert_eq!(cred.passphrase(), Some("hunter2"));
        assert!(!format!("{cred:?}").contains("hunter2"));
    }
}
