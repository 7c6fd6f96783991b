//! Settings and repository list loading.
//!
//! # File layout
//!
//! ```text
//! config.toml            (daemon settings, TOML)
//!   repositories = "repos.json"
//!   ssh_key      = "~/.ssh/id_ed25519"   (optional)
//!   ssh_passphrase = "..."               (optional)
//! repos.json | repos.yaml (repository list, array of entries)
//! ```
//!
//! # API pattern
//!
//! - `load_at(path)`: explicit settings file; used in tests with `TempDir`
//! - `load()`: resolves the default location, delegates to `load_at`
//!
//! Loading is all-or-nothing: any malformed entry aborts with a
//! [`ConfigError`] and nothing is returned.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::credential::{Credential, DEFAULT_SSH_USER};
use crate::error::{io_err, ConfigError};
use crate::types::{poll_interval_from_secs, RepositoryDescriptor, SyncMode, DEFAULT_REMOTE};

/// Settings file name looked up in the working directory and config dir.
pub const SETTINGS_FILE: &str = "config.toml";

/// Repository list used when the settings leave `repositories` empty.
pub const DEFAULT_REPOSITORY_LIST: &str = "repos.json";

// ---------------------------------------------------------------------------
// 1. On-disk shapes
// ---------------------------------------------------------------------------

/// Raw daemon settings as written in `config.toml`.
///
/// The aliases accept the short key names of older configuration files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsFile {
    #[serde(default, alias = "repoconfig")]
    pub repositories: Option<PathBuf>,
    #[serde(default, alias = "sshkey")]
    pub ssh_key: Option<PathBuf>,
    #[serde(default, alias = "sshpw")]
    pub ssh_passphrase: Option<String>,
    #[serde(default)]
    pub ssh_user: Option<String>,
    #[serde(default)]
    pub desktop_notifications: Option<bool>,
}

/// One raw entry of the repository list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryEntry {
    pub job: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,
    #[serde(default)]
    pub path: PathBuf,
    /// Seconds between attempts; zero, negative or absent means the default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polling: Option<i64>,
    #[serde(default)]
    pub force: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
}

// ---------------------------------------------------------------------------
// 2. Resolved settings
// ---------------------------------------------------------------------------

/// Fully validated configuration for one daemon run.
#[derive(Clone)]
pub struct Settings {
    /// The settings file this was loaded from.
    pub source: PathBuf,
    pub repositories_file: PathBuf,
    pub repositories: Vec<RepositoryDescriptor>,
    pub ssh_key: Option<PathBuf>,
    pub ssh_passphrase: Option<String>,
    pub ssh_user: String,
    pub desktop_notifications: bool,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("source", &self.source)
            .field("repositories_file", &self.repositories_file)
            .field("repositories", &self.repositories)
            .field("ssh_key", &self.ssh_key)
            .field("ssh_passphrase", &self.ssh_passphrase.as_ref().map(|_| "***"))
            .field("ssh_user", &self.ssh_user)
            .field("desktop_notifications", &self.desktop_notifications)
            .finish()
    }
}

impl Settings {
    /// Resolve the configured key into a credential, or `None` for
    /// anonymous transport.
    pub fn credential(&self) -> Result<Option<Credential>, ConfigError> {
        match &self.ssh_key {
            None => Ok(None),
            Some(key) => Credential::from_key_file(
                self.ssh_user.clone(),
                key.clone(),
                self.ssh_passphrase.clone(),
            )
            .map(Some),
        }
    }
}

// ---------------------------------------------------------------------------
// 3. Load
// ---------------------------------------------------------------------------

/// Candidate settings locations, in lookup order.
pub fn default_settings_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(SETTINGS_FILE)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("keepsync").join(SETTINGS_FILE));
    }
    paths
}

/// Load settings from the first existing default location.
pub fn load() -> Result<Settings, ConfigError> {
    let candidates = default_settings_paths();
    match candidates.iter().find(|p| p.is_file()) {
        Some(path) => load_at(path),
        None => Err(ConfigError::SettingsNotFound {
            looked_in: candidates,
        }),
    }
}

/// Load settings from `path` and the repository list it points at.
pub fn load_at(path: &Path) -> Result<Settings, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let raw: SettingsFile = toml::from_str(&contents).map_err(|e| ConfigError::Settings {
        path: path.to_path_buf(),
        source: e,
    })?;
    let base = parent_dir(path);

    let repositories_file = match raw.repositories {
        Some(p) if !p.as_os_str().is_empty() => resolve(&base, &p),
        _ => base.join(DEFAULT_REPOSITORY_LIST),
    };
    let repositories = load_repositories_at(&repositories_file)?;

    let ssh_key = raw
        .ssh_key
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| resolve(&base, &expand_home(&p)));

    Ok(Settings {
        source: path.to_path_buf(),
        repositories_file,
        repositories,
        ssh_key,
        ssh_passphrase: raw.ssh_passphrase.filter(|p| !p.is_empty()),
        ssh_user: raw
            .ssh_user
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_SSH_USER.to_string()),
        desktop_notifications: raw.desktop_notifications.unwrap_or(true),
    })
}

/// Load and validate a repository list. YAML is chosen by the `.yaml` /
/// `.yml` extension; everything else is parsed as JSON.
pub fn load_repositories_at(path: &Path) -> Result<Vec<RepositoryDescriptor>, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let entries: Vec<RepositoryEntry> = if is_yaml(path) {
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::Yaml {
            path: path.to_path_buf(),
            source: e,
        })?
    } else {
        serde_json::from_str(&contents).map_err(|e| ConfigError::Json {
            path: path.to_path_buf(),
            source: e,
        })?
    };
    descriptors_from_entries(entries, &parent_dir(path))
}

/// Validate raw entries and turn them into descriptors.
///
/// Relative `path` and `script` values resolve against `base`.
pub fn descriptors_from_entries(
    entries: Vec<RepositoryEntry>,
    base: &Path,
) -> Result<Vec<RepositoryDescriptor>, ConfigError> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(entries.len());

    for (index, entry) in entries.into_iter().enumerate() {
        let name = entry.name.trim().to_string();
        if name.is_empty() {
            return Err(invalid(index, "name must not be empty"));
        }
        if !seen.insert(name.clone()) {
            return Err(ConfigError::DuplicateName { name });
        }
        let mode = parse_mode(&entry.job).ok_or_else(|| {
            invalid(
                index,
                format!("unknown job '{}'; expected: pull, push", entry.job),
            )
        })?;
        if entry.path.as_os_str().is_empty() {
            return Err(invalid(index, "path must not be empty"));
        }

        let remote_name = entry
            .remote
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DEFAULT_REMOTE.to_string());
        let post_action_hook = entry
            .script
            .filter(|s| !s.trim().is_empty())
            .map(|s| resolve(base, &expand_home(Path::new(&s))));

        out.push(RepositoryDescriptor {
            name: name.into(),
            mode,
            local_path: resolve(base, &expand_home(&entry.path)),
            remote_name,
            poll_interval: poll_interval_from_secs(entry.polling),
            force: entry.force,
            post_action_hook,
            url: entry.url.filter(|u| !u.is_empty()),
        });
    }

    Ok(out)
}

// ---------------------------------------------------------------------------
// 4. Helpers
// ---------------------------------------------------------------------------

fn parse_mode(job: &str) -> Option<SyncMode> {
    match job.trim().to_ascii_lowercase().as_str() {
        "pull" => Some(SyncMode::Pull),
        "push" => Some(SyncMode::Push),
        _ => None,
    }
}

fn invalid(index: usize, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidEntry {
        index,
        reason: reason.into(),
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
        .unwrap_or(false)
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// `~/x` → `<home>/x`; anything else is returned unchanged.
fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
