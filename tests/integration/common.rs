//! Shared fixtures: a temporary installation root and a mock branch server.

use app_updater::test_utils::ArchiveBuilder;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Inner prefix of archives served for the default repository and branch.
pub const PREFIX: &str = "smartfarm-pi-code-v1-main/";

/// A temporary installation root plus a config file pointing at it.
pub struct TestInstall {
    _temp: TempDir,
    pub root: PathBuf,
    pub config_path: PathBuf,
}

impl TestInstall {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("install");
        let config_path = temp.path().join("config.toml");
        Self {
            root,
            config_path,
            _temp: temp,
        }
    }

    /// Directory containing the root, where staging siblings appear.
    pub fn parent(&self) -> &Path {
        self.root.parent().unwrap()
    }

    /// Populate the root with an old release and the running updater.
    pub fn seed(&self, version: &str) {
        fs::create_dir_all(self.root.join("old")).unwrap();
        fs::write(self.root.join("old/legacy.py"), "old").unwrap();
        fs::write(self.root.join("app.py"), "old app").unwrap();
        fs::write(self.root.join("app-updater"), "running updater").unwrap();
        fs::write(self.root.join("VERSION"), version).unwrap();
    }

    /// Write a config that points both URLs at `server`, followed by `extra`.
    pub fn write_config(&self, server: &MockServer, extra: &str) {
        let content = format!(
            "install_root = '{}'\nversion_url = '{}/VERSION'\narchive_url = '{}/archive.zip'\n{}\n",
            self.root.display(),
            server.uri(),
            server.uri(),
            extra
        );
        fs::write(&self.config_path, content).unwrap();
    }

    pub fn read(&self, relative: &str) -> Vec<u8> {
        fs::read(self.root.join(relative)).unwrap()
    }

    pub fn read_string(&self, relative: &str) -> String {
        fs::read_to_string(self.root.join(relative)).unwrap()
    }

    /// Every file under the root with its contents, sorted by path.
    pub fn snapshot(&self) -> Vec<(String, Vec<u8>)> {
        if !self.root.exists() {
            return Vec::new();
        }
        let mut files: Vec<(String, Vec<u8>)> = walkdir::WalkDir::new(&self.root)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(|e| {
                let rel = e.path().strip_prefix(&self.root).unwrap().to_string_lossy().into_owned();
                (rel, fs::read(e.path()).unwrap())
            })
            .collect();
        files.sort();
        files
    }
}

pub async fn serve_version(server: &MockServer, version: &str) {
    Mock::given(method("GET"))
        .and(path("/VERSION"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!("{version}\n")))
        .mount(server)
        .await;
}

pub async fn serve_version_status(server: &MockServer, status: u16) {
    Mock::given(method("GET"))
        .and(path("/VERSION"))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Serve `builder` as the branch archive, expecting exactly `calls` downloads.
pub async fn serve_archive(server: &MockServer, builder: ArchiveBuilder, calls: u64) {
    Mock::given(method("GET"))
        .and(path("/archive.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(builder.build().unwrap()))
        .expect(calls)
        .mount(server)
        .await;
}

/// The `1.0.1` release: `app.py` and `extra/config.txt`.
pub fn release_archive() -> ArchiveBuilder {
    ArchiveBuilder::new(PREFIX)
        .file("app.py", b"X")
        .dir("extra/")
        .file("extra/config.txt", b"Y")
}
