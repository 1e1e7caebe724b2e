//! Integration tests for the download manager

use opendir_dl::download::{DownloadManager, DownloadOptions};
use opendir_dl::head::FileHead;
use opendir_dl::search::SearchEngine;
use opendir_dl::storage::{SqliteStorage, Storage};
use opendir_dl::OpendirError;
use reqwest::Client;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Fixture {
    dir: TempDir,
    storage: SqliteStorage,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let storage = SqliteStorage::new(&dir.path().join("catalog.db")).unwrap();
        Self { dir, storage }
    }

    fn output_dir(&self) -> std::path::PathBuf {
        self.dir.path().join("downloads")
    }

    fn options(&self, no_index: bool) -> DownloadOptions {
        DownloadOptions {
            output_dir: self.output_dir(),
            no_index,
        }
    }
}

async fn serve_file(server: &MockServer, at: &str, body: &'static [u8]) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(body)
                .insert_header("last-modified", "Tue, 01 Mar 2016 10:00:05 GMT"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_download_writes_file_and_row() {
    let mock_server = MockServer::start().await;
    serve_file(&mock_server, "/pub/file%20name.txt", b"hello world").await;

    let mut fixture = Fixture::new();
    let options = fixture.options(false);
    let url = format!("{}/pub/file%20name.txt", mock_server.uri());

    let report = DownloadManager::new(Client::new(), &mut fixture.storage, options)
        .start(&[url.clone()])
        .await
        .unwrap();

    let written = fixture.output_dir().join("file name.txt");
    assert_eq!(report.files, vec![written.clone()]);
    assert_eq!(report.bytes, 11);
    assert_eq!(std::fs::read(&written).unwrap(), b"hello world");
    assert!(!fixture.output_dir().join("file name.txt.part").exists());

    let records = fixture.storage.all_files().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].url, url);
    assert_eq!(records[0].name, "file name.txt");
    assert_eq!(records[0].content_length, 11);
    assert!(records[0].last_modified.is_some());
}

#[tokio::test]
async fn test_download_not_found_writes_nothing() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing.bin"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut fixture = Fixture::new();
    let options = fixture.options(false);
    let url = format!("{}/missing.bin", mock_server.uri());

    let report = DownloadManager::new(Client::new(), &mut fixture.storage, options)
        .start(&[url])
        .await
        .unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(report.downloaded(), 0);
    assert!(!fixture.output_dir().join("missing.bin").exists());
    assert_eq!(fixture.storage.count_files().unwrap(), 0);
}

#[tokio::test]
async fn test_download_missing_index_names_catalog() {
    let mut fixture = Fixture::new();
    let options = fixture.options(false);
    let source = fixture.storage.source().to_string();

    let err = DownloadManager::new(Client::new(), &mut fixture.storage, options)
        .start(&["4242"])
        .await
        .unwrap_err();

    assert!(matches!(err, OpendirError::IndexNotFound { id: 4242, .. }));
    assert_eq!(
        err.to_string(),
        format!("No results found for index '4242' in database '{}'.", source)
    );
}

#[tokio::test]
async fn test_missing_index_stops_later_items() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(&b"x"[..]))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut fixture = Fixture::new();
    let options = fixture.options(false);
    let items = ["7".to_string(), format!("{}/later.bin", mock_server.uri())];

    let result = DownloadManager::new(Client::new(), &mut fixture.storage, options)
        .start(&items)
        .await;

    assert!(result.is_err());
    assert!(!fixture.output_dir().join("later.bin").exists());
}

#[tokio::test]
async fn test_download_no_index_skips_row() {
    let mock_server = MockServer::start().await;
    serve_file(&mock_server, "/data.bin", b"0123456789").await;

    let mut fixture = Fixture::new();
    let options = fixture.options(true);
    let url = format!("{}/data.bin", mock_server.uri());

    let report = DownloadManager::new(Client::new(), &mut fixture.storage, options)
        .start(&[url])
        .await
        .unwrap();

    assert_eq!(report.downloaded(), 1);
    assert!(fixture.output_dir().join("data.bin").exists());
    assert_eq!(fixture.storage.count_files().unwrap(), 0);
}

#[tokio::test]
async fn test_download_by_index_refreshes_row() {
    let mock_server = MockServer::start().await;
    serve_file(&mock_server, "/iso/debian.iso", b"not really an iso").await;

    let mut fixture = Fixture::new();
    let url = format!("{}/iso/debian.iso", mock_server.uri());
    let id = fixture.storage.upsert(&FileHead::bare(&url)).unwrap().id();
    let options = fixture.options(false);

    let report = DownloadManager::new(Client::new(), &mut fixture.storage, options)
        .start(&[id.to_string()])
        .await
        .unwrap();

    assert_eq!(report.downloaded(), 1);
    assert!(fixture.output_dir().join("debian.iso").exists());

    let record = fixture.storage.get_file(id).unwrap().unwrap();
    assert_eq!(record.content_length, 17);
    assert_eq!(fixture.storage.count_files().unwrap(), 1);
}

#[tokio::test]
async fn test_download_search_matches() {
    let mock_server = MockServer::start().await;
    serve_file(&mock_server, "/a/linux.iso", b"iso").await;
    Mock::given(method("GET"))
        .and(path("/a/notes.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(&b"txt"[..]))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut fixture = Fixture::new();
    for name in ["linux.iso", "notes.txt"] {
        let url = format!("{}/a/{}", mock_server.uri(), name);
        fixture.storage.upsert(&FileHead::bare(&url)).unwrap();
    }
    let options = fixture.options(true);

    let engine = SearchEngine::new(["LINUX"]);
    let report = DownloadManager::new(Client::new(), &mut fixture.storage, options)
        .download_matches(&engine)
        .await
        .unwrap();

    assert_eq!(report.downloaded(), 1);
    assert!(fixture.output_dir().join("linux.iso").exists());
    assert!(!fixture.output_dir().join("notes.txt").exists());
}
