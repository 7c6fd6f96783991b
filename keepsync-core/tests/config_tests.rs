//! Settings + repository list loading: happy paths, defaults, and the
//! all-or-nothing error rules.

use std::fs;
use std::path::Path;
use std::time::Duration;

use assert_fs::prelude::*;
use keepsync_core::{
    config::{self, RepositoryEntry},
    ConfigError, SyncMode, DEFAULT_POLL_INTERVAL,
};
use rstest::rstest;

fn write_settings(dir: &Path, body: &str) -> std::path::PathBuf {
    let path = dir.join("config.toml");
    fs::write(&path, body).expect("write settings");
    path
}

// ---------------------------------------------------------------------------
// 1. Settings
// ---------------------------------------------------------------------------

#[test]
fn legacy_keys_and_json_list_load() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    dir.child("id_test").write_str("key").expect("key");
    dir.child("repos.json")
        .write_str(
            r#"[
                {"job": "pull", "name": "docs", "url": "git@example.com:docs.git",
                 "remote": "upstream", "path": "checkouts/docs", "polling": 30,
                 "force": false, "script": ""},
                {"job": "push", "name": "notes", "path": "/srv/notes", "force": true,
                 "script": "hooks/after.sh"}
            ]"#,
        )
        .expect("repos");
    let settings_path = write_settings(
        dir.path(),
        "repoconfig = \"repos.json\"\nsshkey = \"id_test\"\nsshpw = \"\"\n",
    );

    let settings = config::load_at(&settings_path).expect("load");
    assert_eq!(settings.repositories.len(), 2);
    assert_eq!(settings.ssh_user, "git");
    assert!(settings.desktop_notifications);
    assert_eq!(settings.ssh_passphrase, None);

    let docs = &settings.repositories[0];
    assert_eq!(docs.name.0, "docs");
    assert_eq!(docs.mode, SyncMode::Pull);
    assert_eq!(docs.remote_name, "upstream");
    assert_eq!(docs.poll_interval, Duration::from_secs(30));
    assert_eq!(docs.local_path, dir.path().join("checkouts/docs"));
    assert_eq!(docs.post_action_hook, None);
    assert_eq!(docs.url.as_deref(), Some("git@example.com:docs.git"));

    let notes = &settings.repositories[1];
    assert_eq!(notes.mode, SyncMode::Push);
    assert_eq!(notes.remote_name, "origin");
    assert_eq!(notes.poll_interval, DEFAULT_POLL_INTERVAL);
    assert!(notes.force);
    assert_eq!(notes.local_path, Path::new("/srv/notes"));
    assert_eq!(
        notes.post_action_hook.as_deref(),
        Some(dir.path().join("hooks/after.sh").as_path())
    );

    let cred = settings.credential().expect("credential").expect("some");
    assert_eq!(cred.private_key(), dir.path().join("id_test").as_path());
}

#[test]
fn debug_output_masks_the_passphrase() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    dir.child("id_test").write_str("key").expect("key");
    dir.child("repos.json").write_str("[]").expect("repos");
    let settings_path = write_settings(
        dir.path(),
        "ssh_key = \"id_test\"\nssh_passphrase = \"hunter2\"\n",
    );

    let settings = config::load_at(&settings_path).expect("load");
    let cred = settings.credential().expect("credential").expect("some");

    assert_eq!(settings.ssh_passphrase.as_deref(), Some("hunter2"));
    assert!(!format!("{settings:?}").contains("hunter2"));
    assert!(!format!("{cred:?}").contains("hunter2"));
}

#[test]
fn settings_default_to_repos_json_next_to_settings() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    dir.child("repos.json").write_str("[]").expect("repos");
    let settings_path = write_settings(dir.path(), "desktop_notifications = false\n");

    let settings = config::load_at(&settings_path).expect("load");
    assert!(settings.repositories.is_empty());
    assert_eq!(settings.repositories_file, dir.path().join("repos.json"));
    assert!(!settings.desktop_notifications);
    assert!(settings.credential().expect("anonymous").is_none());
}

#[test]
fn yaml_repository_list_is_supported() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    dir.child("repos.yaml")
        .write_str("- job: push\n  name: wiki\n  path: wiki\n  polling: -1\n")
        .expect("repos");
    let settings_path = write_settings(dir.path(), "repositories = \"repos.yaml\"\n");

    let settings = config::load_at(&settings_path).expect("load");
    assert_eq!(settings.repositories.len(), 1);
    assert_eq!(settings.repositories[0].mode, SyncMode::Push);
    assert_eq!(settings.repositories[0].poll_interval, DEFAULT_POLL_INTERVAL);
}

#[test]
fn missing_key_file_fails_credential_resolution() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    dir.child("repos.json").write_str("[]").expect("repos");
    let settings_path = write_settings(dir.path(), "ssh_key = \"nope\"\n");

    let settings = config::load_at(&settings_path).expect("load");
    let err = settings.credential().expect_err("missing key");
    assert!(matches!(err, ConfigError::CredentialUnreadable { .. }), "got: {err}");
}

#[test]
fn missing_repository_list_is_io_error_with_path() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let settings_path = write_settings(dir.path(), "repositories = \"absent.json\"\n");

    let err = config::load_at(&settings_path).expect_err("missing list");
    assert!(matches!(err, ConfigError::Io { .. }), "got: {err}");
    assert!(err.to_string().contains("absent.json"));
}

#[test]
fn corrupt_settings_returns_parse_error_with_path() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let settings_path = write_settings(dir.path(), "repositories = [unclosed\n");

    let err = config::load_at(&settings_path).expect_err("corrupt");
    assert!(matches!(err, ConfigError::Settings { .. }), "got: {err}");
    assert!(err.to_string().contains("config.toml"));
}

#[test]
fn corrupt_json_list_returns_parse_error() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    dir.child("repos.json").write_str("{ not json").expect("repos");
    let settings_path = write_settings(dir.path(), "");

    let err = config::load_at(&settings_path).expect_err("corrupt");
    assert!(matches!(err, ConfigError::Json { .. }), "got: {err}");
}

// ---------------------------------------------------------------------------
// 2. Entry validation
// ---------------------------------------------------------------------------

fn entry(job: &str, name: &str, path: &str) -> RepositoryEntry {
    RepositoryEntry {
        job: job.to_string(),
        name: name.to_string(),
        path: path.into(),
        ..RepositoryEntry::default()
    }
}

#[rstest]
#[case::empty_name(entry("pull", "  ", "/a"), "name must not be empty")]
#[case::unknown_job(entry("mirror", "a", "/a"), "unknown job 'mirror'")]
#[case::empty_path(entry("push", "a", ""), "path must not be empty")]
fn invalid_entries_abort_the_load(#[case] bad: RepositoryEntry, #[case] expected: &str) {
    let entries = vec![entry("pull", "ok", "/ok"), bad];
    let err = config::descriptors_from_entries(entries, Path::new("/")).expect_err("invalid");
    match &err {
        ConfigError::InvalidEntry { index, reason } => {
            assert_eq!(*index, 1);
            assert!(reason.contains(expected), "reason: {reason}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn duplicate_names_are_rejected() {
    let entries = vec![entry("pull", "docs", "/a"), entry("push", "docs", "/b")];
    let err = config::descriptors_from_entries(entries, Path::new("/")).expect_err("dup");
    assert!(matches!(err, ConfigError::DuplicateName { ref name } if name == "docs"));
}

#[test]
fn descriptor_order_follows_list_order() {
    let entries = vec![
        entry("pull", "c", "/c"),
        entry("pull", "a", "/a"),
        entry("push", "b", "/b"),
    ];
    let repos = config::descriptors_from_entries(entries, Path::new("/")).expect("valid");
    let names: Vec<_> = repos.iter().map(|r| r.name.0.as_str()).collect();
    assert_eq!(names, ["c", "a", "b"]);
}
