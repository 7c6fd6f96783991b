//! Domain types shared by the engine, the scheduler and the CLI.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem paths.
//! A [`RepositoryDescriptor`] is built once from configuration and is read-only
//! for the rest of the process lifetime.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Poll interval used when an entry leaves `polling` unset or non-positive.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(600);

/// Remote used when an entry leaves `remote` empty.
pub const DEFAULT_REMOTE: &str = "origin";

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Human-readable label of a repository, unique within one run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepoName(pub String);

impl fmt::Display for RepoName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for RepoName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RepoName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A revision identifier (hex object id) as reported by the VCS backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Revision(pub String);

impl Revision {
    /// First seven characters, for log lines.
    pub fn short(&self) -> &str {
        self.0.get(..7).unwrap_or(&self.0)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Revision {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Revision {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// The single action kind a repository is reconciled with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Bring remote changes into the local checkout.
    Pull,
    /// Commit local changes and publish them to the remote.
    Push,
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMode::Pull => write!(f, "pull"),
            SyncMode::Push => write!(f, "push"),
        }
    }
}

// ---------------------------------------------------------------------------
// Descriptor
// ---------------------------------------------------------------------------

/// Immutable configuration unit for one synchronized checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryDescriptor {
    pub name: RepoName,
    pub mode: SyncMode,
    /// Root of an existing checkout; never created by keepsync.
    pub local_path: PathBuf,
    pub remote_name: String,
    /// Always positive; see [`coerce_poll_interval`].
    pub poll_interval: Duration,
    /// Skips the precondition check, forces the transfer, and silences
    /// success notifications.
    pub force: bool,
    pub post_action_hook: Option<PathBuf>,
    /// Informational remote URL from the configuration entry.
    pub url: Option<String>,
}

impl RepositoryDescriptor {
    /// Descriptor with defaults for everything but name, mode and path.
    pub fn new(name: impl Into<RepoName>, mode: SyncMode, local_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            mode,
            local_path: local_path.into(),
            remote_name: DEFAULT_REMOTE.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            force: false,
            post_action_hook: None,
            url: None,
        }
    }

    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote_name = remote.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = coerce_poll_interval(interval);
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_hook(mut self, hook: impl Into<PathBuf>) -> Self {
        self.post_action_hook = Some(hook.into());
        self
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }
}

/// Replace a zero interval with [`DEFAULT_POLL_INTERVAL`].
pub fn coerce_poll_interval(interval: Duration) -> Duration {
    if interval.is_zero() {
        DEFAULT_POLL_INTERVAL
    } else {
        interval
    }
}

/// Interval from a signed seconds count as written in configuration files.
pub fn poll_interval_from_secs(secs: Option<i64>) -> Duration {
    match secs {
        Some(secs) if secs > 0 => Duration::from_secs(secs.unsigned_abs()),
        _ => DEFAULT_POLL_INTERVAL,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
