//! Update cycles driven through the library API with a config file.

use app_updater::config::UpdaterConfig;
use app_updater::core::UpdaterError;
use app_updater::upgrade::{
    FileVersionStore, LaunchOutcome, RecordingLauncher, UpdateOutcome, Updater,
};
use wiremock::MockServer;

use super::common::{
    PREFIX, TestInstall, release_archive, serve_archive, serve_version, serve_version_status,
};
use app_updater::test_utils::{ArchiveBuilder, init_test_logging};

async fn updater_for(install: &TestInstall) -> Updater<FileVersionStore, RecordingLauncher> {
    let config = UpdaterConfig::load_with_optional(Some(install.config_path.clone())).await.unwrap();
    let store = FileVersionStore::new(&config.install_root, &config.version_file);
    Updater::with_parts(config, store, RecordingLauncher::new())
}

#[tokio::test]
async fn test_release_scenario_from_config_file() {
    init_test_logging(None);

    let install = TestInstall::new();
    install.seed("1.0.0");

    let server = MockServer::start().await;
    serve_version(&server, "1.0.1").await;
    serve_archive(&server, release_archive(), 1).await;
    install.write_config(&server, "");

    let updater = updater_for(&install).await;
    let outcome = updater.run().await.unwrap();

    assert_eq!(
        outcome,
        UpdateOutcome::Updated {
            from: "1.0.0".to_string(),
            to: "1.0.1".to_string(),
            launch: Some(LaunchOutcome::Exited {
                code: Some(0)
            }),
        }
    );
    assert_eq!(install.read("app.py"), b"X");
    assert_eq!(install.read("extra/config.txt"), b"Y");
    assert_eq!(install.read_string("VERSION"), "1.0.1");

    let requests = updater.launcher().requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].program, install.root.join("app.py"));
}

#[tokio::test]
async fn test_second_run_is_up_to_date() {
    let install = TestInstall::new();
    install.seed("1.0.0");

    let server = MockServer::start().await;
    serve_version(&server, "1.0.1").await;
    serve_archive(&server, release_archive(), 1).await;
    install.write_config(&server, "");

    let updater = updater_for(&install).await;
    updater.run().await.unwrap();
    let after_first = install.snapshot();

    let outcome = updater.run().await.unwrap();
    assert_eq!(
        outcome,
        UpdateOutcome::UpToDate {
            version: "1.0.1".to_string()
        }
    );
    assert_eq!(install.snapshot(), after_first);
    assert_eq!(updater.launcher().requests().len(), 1);
}

#[tokio::test]
async fn test_wipe_policy_installs_archive_updater() {
    let install = TestInstall::new();
    install.seed("1.0.0");

    let server = MockServer::start().await;
    serve_version(&server, "1.0.1").await;
    serve_archive(&server, release_archive().file("app-updater", b"updater from archive"), 1)
        .await;
    install.write_config(&server, "replace_policy = 'wipe'");

    let updater = updater_for(&install).await;
    updater.run().await.unwrap();

    assert_eq!(install.read("app-updater"), b"updater from archive");
    assert!(!install.root.join("old").exists());
    assert_eq!(install.read_string("VERSION"), "1.0.1");
}

#[tokio::test]
async fn test_fresh_install_into_missing_root() {
    let install = TestInstall::new();

    let server = MockServer::start().await;
    serve_version(&server, "1.0.0").await;
    serve_archive(&server, release_archive(), 1).await;
    install.write_config(&server, "");

    let updater = updater_for(&install).await.launch(false);
    let outcome = updater.run().await.unwrap();

    assert_eq!(
        outcome,
        UpdateOutcome::Updated {
            from: "0.0.0".to_string(),
            to: "1.0.0".to_string(),
            launch: None,
        }
    );
    assert_eq!(install.read("app.py"), b"X");
}

#[tokio::test]
async fn test_unsafe_archive_rejected() {
    let install = TestInstall::new();
    install.seed("1.0.0");

    let server = MockServer::start().await;
    serve_version(&server, "1.0.1").await;
    serve_archive(
        &server,
        ArchiveBuilder::new(PREFIX).raw_file(&format!("{PREFIX}../../escape.txt"), b"evil"),
        1,
    )
    .await;
    install.write_config(&server, "replace_policy = 'staged'");

    let updater = updater_for(&install).await;
    let err = updater.run().await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<UpdaterError>(),
        Some(UpdaterError::UnsafeArchiveEntry { .. })
    ));
    assert!(!install.parent().join("escape.txt").exists());
    // Staged extraction failed before the swap
    assert_eq!(install.read_string("VERSION"), "1.0.0");
    assert!(updater.launcher().requests().is_empty());
}

#[tokio::test]
async fn test_server_error_is_remote_unavailable() {
    let install = TestInstall::new();
    install.seed("1.0.0");
    let before = install.snapshot();

    let server = MockServer::start().await;
    serve_version_status(&server, 500).await;
    install.write_config(&server, "");

    let err = updater_for(&install).await.run().await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<UpdaterError>(),
        Some(UpdaterError::RemoteVersionUnavailable { .. })
    ));
    assert_eq!(install.snapshot(), before);
}
