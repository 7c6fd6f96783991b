//! keepsync core library: domain types, configuration loading, errors.
//!
//! Public API surface:
//! - [`types`]: newtypes and the repository descriptor
//! - [`credential`]: the read-only SSH credential handle
//! - [`config`]: settings + repository list loading
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod credential;
pub mod error;
pub mod types;

pub use config::Settings;
pub use credential::Credential;
pub use error::ConfigError;
pub use types::{RepoName, RepositoryDescriptor, Revision, SyncMode, DEFAULT_POLL_INTERVAL};
