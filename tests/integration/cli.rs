//! Tests that drive the compiled binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

use super::common::{
    PREFIX, TestInstall, release_archive, serve_archive, serve_version, serve_version_status,
};
use app_updater::test_utils::ArchiveBuilder;
use wiremock::MockServer;

fn updater_cmd(install: &TestInstall) -> Command {
    let mut cmd = Command::cargo_bin("app-updater").unwrap();
    cmd.arg("--config")
        .arg(&install.config_path)
        .arg("--no-progress")
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG");
    cmd
}

#[tokio::test]
async fn test_remote_unavailable_exits_one_without_changes() {
    let install = TestInstall::new();
    install.seed("1.0.0");
    let before = install.snapshot();

    let server = MockServer::start().await;
    serve_version_status(&server, 404).await;
    serve_archive(&server, release_archive(), 0).await;
    install.write_config(&server, "");

    updater_cmd(&install)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Cannot get remote version"))
        .stderr(predicate::str::contains("Cannot get remote version from"));

    assert_eq!(install.snapshot(), before);
}

#[tokio::test]
async fn test_up_to_date_exits_zero() {
    let install = TestInstall::new();
    install.seed("1.0.0\n");
    let before = install.snapshot();

    let server = MockServer::start().await;
    serve_version(&server, "1.0.0").await;
    serve_archive(&server, release_archive(), 0).await;
    install.write_config(&server, "");

    updater_cmd(&install)
        .assert()
        .success()
        .stdout(predicate::str::contains("Already up to date: 1.0.0"));

    assert_eq!(install.snapshot(), before);
}

#[tokio::test]
async fn test_update_without_launch() {
    let install = TestInstall::new();
    install.seed("1.0.0");

    let server = MockServer::start().await;
    serve_version(&server, "1.0.1").await;
    serve_archive(&server, release_archive().file("app-updater", b"new updater"), 1).await;
    install.write_config(&server, "");

    updater_cmd(&install)
        .arg("--no-launch")
        .assert()
        .success()
        .stdout(predicate::str::contains("New version found: 1.0.0 → 1.0.1"))
        .stdout(predicate::str::contains("Code updated at"));

    assert_eq!(install.read("app.py"), b"X");
    assert_eq!(install.read("extra/config.txt"), b"Y");
    assert_eq!(install.read_string("VERSION"), "1.0.1");
    assert_eq!(install.read("app-updater"), b"running updater");
    assert!(!install.root.join("old").exists());
}

#[tokio::test]
async fn test_check_only_leaves_tree_untouched() {
    let install = TestInstall::new();
    install.seed("1.0.0");
    let before = install.snapshot();

    let server = MockServer::start().await;
    serve_version(&server, "1.0.1").await;
    serve_archive(&server, release_archive(), 0).await;
    install.write_config(&server, "");

    updater_cmd(&install)
        .arg("--check")
        .assert()
        .success()
        .stdout(predicate::str::contains("New version found: 1.0.0 → 1.0.1"));

    assert_eq!(install.snapshot(), before);
}

#[tokio::test]
async fn test_invalid_config_exits_one() {
    let install = TestInstall::new();
    fs::write(&install.config_path, "install_root = [not toml").unwrap();

    updater_cmd(&install)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to parse config"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_update_launches_entry_with_interpreter() {
    let install = TestInstall::new();
    install.seed("1.0.0");

    let server = MockServer::start().await;
    serve_version(&server, "1.0.1").await;
    serve_archive(
        &server,
        ArchiveBuilder::new(PREFIX).file("app.sh", b"echo started > launched.txt\n"),
        1,
    )
    .await;
    install.write_config(&server, "interpreter = '/bin/sh'\nentry_file = 'app.sh'");

    updater_cmd(&install).assert().success();

    // Waited on, ran from the installation root
    assert_eq!(install.read_string("launched.txt"), "started\n");

    use std::os::unix::fs::PermissionsExt;
    let mode = fs::metadata(install.root.join("app.sh")).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o755);
}

#[tokio::test]
async fn test_staged_policy_flag() {
    let install = TestInstall::new();
    install.seed("1.0.0");

    let server = MockServer::start().await;
    serve_version(&server, "1.0.1").await;
    serve_archive(&server, release_archive(), 1).await;
    install.write_config(&server, "");

    updater_cmd(&install)
        .args(["--policy", "staged", "--no-launch"])
        .assert()
        .success();

    assert_eq!(install.read("app.py"), b"X");
    assert_eq!(install.read("app-updater"), b"running updater");
    assert_eq!(install.read_string("VERSION"), "1.0.1");
    assert!(!install.parent().join("install.staging").exists());
    assert!(!install.parent().join("install.previous").exists());
}

#[tokio::test]
async fn test_config_path_from_environment() {
    let install = TestInstall::new();
    install.seed("1.0.0");

    let server = MockServer::start().await;
    serve_version(&server, "1.0.0").await;
    install.write_config(&server, "");

    Command::cargo_bin("app-updater")
        .unwrap()
        .env("APP_UPDATER_CONFIG", &install.config_path)
        .env("NO_COLOR", "1")
        .assert()
        .success()
        .stdout(predicate::str::contains("Already up to date: 1.0.0"));
}
