//! Error types for keepsync-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while loading configuration or key material.
///
/// Every variant is fatal at startup; the daemon never runs on a partial load.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure, annotated with the offending path.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The daemon settings file is not valid TOML.
    #[error("failed to parse settings at {path}: {source}")]
    Settings {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// The repository list is not valid JSON.
    #[error("failed to parse repository list at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The repository list is not valid YAML.
    #[error("failed to parse repository list at {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Entry `index` of the repository list violates a field rule.
    #[error("repository entry #{index}: {reason}")]
    InvalidEntry { index: usize, reason: String },

    /// Two entries share the same `name`.
    #[error("duplicate repository name '{name}'")]
    DuplicateName { name: String },

    /// The configured SSH key cannot be used.
    #[error("cannot read ssh key {path}: {reason}")]
    CredentialUnreadable { path: PathBuf, reason: String },

    /// No settings file was given and none exists at the default locations.
    #[error("no settings file found (looked in {looked_in:?})")]
    SettingsNotFound { looked_in: Vec<PathBuf> },
}

/// Convenience constructor for [`ConfigError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
