use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread::sleep;
use std::time::{Duration, Instant};

use assert_cmd::prelude::*;
use git2::{IndexAddOption, Repository, RepositoryInitOptions, Signature};
use predicates::str::contains;
use tempfile::TempDir;

fn keepsync_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("keepsync"));
    cmd.env("NO_COLOR", "1").env("RUST_LOG", "warn");
    cmd
}

/// Bare remote + one clone under `root`; returns (remote, checkout).
fn git_pair(root: &Path) -> (PathBuf, PathBuf) {
    let remote = root.join("remote.git");
    let mut bare = RepositoryInitOptions::new();
    bare.bare(true).initial_head("main");
    Repository::init_opts(&remote, &bare).expect("init bare");

    let seed_path = root.join("seed");
    let mut opts = RepositoryInitOptions::new();
    opts.initial_head("main");
    let seed = Repository::init_opts(&seed_path, &opts).expect("init seed");
    fs::write(seed_path.join("README.md"), "hello\n").expect("readme");
    let mut index = seed.index().expect("index");
    index
        .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
        .expect("add");
    index.write().expect("write index");
    let tree = seed
        .find_tree(index.write_tree().expect("tree"))
        .expect("find tree");
    let sig = Signature::now("test", "test@example.com").expect("sig");
    seed.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[])
        .expect("commit");
    seed.remote("origin", remote.to_str().expect("utf8"))
        .expect("remote")
        .push(&["refs/heads/main:refs/heads/main"], None)
        .expect("push");

    let checkout = root.join("notes");
    Repository::clone(remote.to_str().expect("utf8"), &checkout).expect("clone");
    (remote, checkout)
}

fn remote_tree_has(remote: &Path, file: &str) -> bool {
    let repo = Repository::open_bare(remote).expect("open remote");
    let commit = repo
        .find_reference("refs/heads/main")
        .expect("main")
        .peel_to_commit()
        .expect("commit");
    let tree = commit.tree().expect("tree");
    let found = tree.get_name(file).is_some();
    found
}

fn write_config(root: &Path, repos_json: &str) -> PathBuf {
    fs::write(root.join("repos.json"), repos_json).expect("repos");
    let settings = root.join("config.toml");
    fs::write(
        &settings,
        "repositories = \"repos.json\"\ndesktop_notifications = false\n",
    )
    .expect("settings");
    settings
}

#[test]
fn check_lists_repositories_and_flags_missing_checkouts() {
    let root = TempDir::new().expect("root");
    let (_remote, _checkout) = git_pair(root.path());
    let settings = write_config(
        root.path(),
        r#"[{"job": "push", "name": "notes", "path": "notes", "polling": 90},
            {"job": "pull", "name": "ghost", "path": "does-not-exist"}]"#,
    );

    keepsync_cmd()
        .arg("check")
        .arg(&settings)
        .assert()
        .success()
        .stdout(contains("notes"))
        .stdout(contains("1m30s"))
        .stdout(contains("ghost: not a checkout"))
        .stdout(contains("anonymous"));
}

#[test]
fn check_json_reports_checkout_state() {
    let root = TempDir::new().expect("root");
    let (_remote, _checkout) = git_pair(root.path());
    let settings = write_config(
        root.path(),
        r#"[{"job": "push", "name": "notes", "path": "notes"}]"#,
    );

    let output = keepsync_cmd()
        .args(["check", "--json"])
        .arg(&settings)
        .output()
        .expect("run check");
    assert!(output.status.success());
    let payload: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("json output");
    assert_eq!(payload["repositories"][0]["name"], "notes");
    assert_eq!(payload["repositories"][0]["checkout_ok"], true);
    assert_eq!(payload["repositories"][0]["interval_secs"], 600);
}

#[test]
fn invalid_configuration_fails_startup() {
    let root = TempDir::new().expect("root");
    let settings = write_config(
        root.path(),
        r#"[{"job": "pull", "name": "dup", "path": "a"},
            {"job": "push", "name": "dup", "path": "b"}]"#,
    );

    for command in ["check", "once", "run"] {
        keepsync_cmd()
            .arg(command)
            .arg(&settings)
            .assert()
            .failure()
            .stderr(contains("duplicate repository name 'dup'"));
    }
}

#[test]
fn once_pushes_local_changes() {
    let root = TempDir::new().expect("root");
    let (remote, checkout) = git_pair(root.path());
    fs::write(checkout.join("today.md"), "did things\n").expect("write");
    let settings = write_config(
        root.path(),
        r#"[{"job": "push", "name": "notes", "path": "notes"}]"#,
    );

    keepsync_cmd()
        .arg("once")
        .arg(&settings)
        .assert()
        .success()
        .stdout(contains("notes: successfully pushed"))
        .stdout(contains("'notes': synchronized"));

    assert!(remote_tree_has(&remote, "today.md"));
}

#[cfg(unix)]
#[test]
fn sigterm_triggers_a_final_pass_before_exit() {
    let root = TempDir::new().expect("root");
    let (remote, checkout) = git_pair(root.path());
    fs::write(checkout.join("first.md"), "1\n").expect("write");
    let settings = write_config(
        root.path(),
        r#"[{"job": "push", "name": "notes", "path": "notes", "polling": 3600}]"#,
    );

    let mut child = keepsync_cmd()
        .arg("run")
        .arg(&settings)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn daemon");

    // The first tick publishes first.md; the loop then sleeps for an hour.
    let deadline = Instant::now() + Duration::from_secs(10);
    while !remote_tree_has(&remote, "first.md") {
        assert!(Instant::now() < deadline, "first tick never pushed");
        sleep(Duration::from_millis(50));
    }

    fs::write(checkout.join("second.md"), "2\n").expect("write");
    let status = Command::new("kill")
        .args(["-TERM", &child.id().to_string()])
        .status()
        .expect("send SIGTERM");
    assert!(status.success());

    let deadline = Instant::now() + Duration::from_secs(10);
    let exit = loop {
        if let Some(exit) = child.try_wait().expect("try_wait") {
            break exit;
        }
        if Instant::now() > deadline {
            let _ = child.kill();
            panic!("daemon did not exit after SIGTERM");
        }
        sleep(Duration::from_millis(50));
    };

    assert!(exit.success(), "daemon exit status: {exit}");
    assert!(
        remote_tree_has(&remote, "second.md"),
        "final pass must publish changes made while the loop slept"
    );
}
