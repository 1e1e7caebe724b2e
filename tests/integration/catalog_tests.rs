//! Integration tests for catalog resolution over HTTP

use opendir_dl::config::{Config, ProfileEntry};
use opendir_dl::head::FileHead;
use opendir_dl::search::SearchEngine;
use opendir_dl::storage::{open_catalog, SqliteStorage, Storage, StorageError};
use opendir_dl::OpendirError;
use reqwest::Client;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Builds a small catalog on disk and returns its bytes
fn catalog_bytes(dir: &TempDir) -> Vec<u8> {
    let db_path = dir.path().join("shared.db");
    {
        let mut storage = SqliteStorage::new(&db_path).unwrap();
        storage
            .upsert(&FileHead::bare("http://mirror.example.com/pub/ubuntu.iso"))
            .unwrap();
        storage
            .upsert(&FileHead::bare("http://mirror.example.com/pub/readme.txt"))
            .unwrap();
    }
    std::fs::read(db_path).unwrap()
}

#[tokio::test]
async fn test_catalog_from_url_is_searchable() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/shared.db"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(catalog_bytes(&dir)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = format!("{}/shared.db", mock_server.uri());
    let storage = open_catalog(&Config::default(), &Client::new(), &url)
        .await
        .unwrap();

    assert_eq!(storage.source(), url);
    assert!(storage.is_read_only());
    assert_eq!(storage.count_files().unwrap(), 2);

    let results = SearchEngine::new(["ubuntu"]).query(&storage).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].name, "ubuntu.iso");
}

#[tokio::test]
async fn test_catalog_from_url_rejects_writes() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/shared.db"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(catalog_bytes(&dir)))
        .mount(&mock_server)
        .await;

    let url = format!("{}/shared.db", mock_server.uri());
    let mut storage = open_catalog(&Config::default(), &Client::new(), &url)
        .await
        .unwrap();

    let result = storage.upsert(&FileHead::bare("http://mirror.example.com/new.bin"));
    assert!(matches!(result, Err(StorageError::NotWritable(_))));
    assert_eq!(storage.count_files().unwrap(), 2);
}

#[tokio::test]
async fn test_catalog_fetch_error_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gone.db"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let url = format!("{}/gone.db", mock_server.uri());
    let err = open_catalog(&Config::default(), &Client::new(), &url)
        .await
        .err()
        .expect("a 404 must not resolve");

    assert!(matches!(err, OpendirError::CatalogFetch { status: 404, .. }));
    assert_eq!(
        err.to_string(),
        format!(
            "HTTP GET request for database {} failed with status 404. Expected 2xx.",
            url
        )
    );
}

#[tokio::test]
async fn test_profile_pointing_at_url() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/shared.db"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(catalog_bytes(&dir)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = Config::default();
    config.profiles.push(ProfileEntry {
        name: "mirror".to_string(),
        resource: format!("{}/shared.db", mock_server.uri()),
    });

    let storage = open_catalog(&config, &Client::new(), "mirror").await.unwrap();
    assert_eq!(storage.count_files().unwrap(), 2);
}
