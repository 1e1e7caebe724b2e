//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock open directories and run the
//! full crawl cycle end-to-end against a catalog on disk.

use opendir_dl::config::Config;
use opendir_dl::crawler::{crawl, CrawlReport};
use opendir_dl::head::FileHead;
use opendir_dl::storage::{SqliteStorage, Storage};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{http::Method, Mock, MockServer, ResponseTemplate};

/// Creates a configuration tuned for fast test crawls
fn create_test_config(quick: bool, max_depth: Option<u32>) -> Config {
    let mut config = Config::default();
    config.crawler.workers = 2;
    config.crawler.quick = quick;
    config.crawler.max_depth = max_depth;
    config.crawler.poll_interval_ms = 10;
    config.crawler.dequeue_timeout_ms = 10;
    config.crawler.head_retries = 0;
    config.crawler.retry_delay_ms = 1;
    config
}

fn create_catalog(dir: &TempDir) -> Arc<Mutex<SqliteStorage>> {
    let storage = SqliteStorage::new(&dir.path().join("catalog.db"))
        .expect("Failed to create catalog");
    Arc::new(Mutex::new(storage))
}

async fn run_crawl(
    config: &Config,
    storage: &Arc<Mutex<SqliteStorage>>,
    seeds: &[String],
) -> CrawlReport {
    crawl(
        config,
        storage.clone(),
        seeds,
        Arc::new(AtomicBool::new(false)),
    )
    .await
    .expect("Crawl failed")
}

fn listing(links: &[&str]) -> ResponseTemplate {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}">{}</a>"#, href, href))
        .collect();
    let body = format!(
        "<html><head><title>Index of /</title></head><body>\
         <a href=\"?C=N;O=D\">Name</a><a href=\"../\">Parent Directory</a>{}</body></html>",
        anchors
    );
    ResponseTemplate::new(200).set_body_raw(body, "text/html")
}

async fn mount_head(server: &MockServer, at: &str, content_type: &str) {
    Mock::given(method("HEAD"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", content_type))
        .mount(server)
        .await;
}

fn file_names(storage: &Arc<Mutex<SqliteStorage>>) -> Vec<String> {
    let storage = storage.lock().unwrap();
    let mut names: Vec<String> = storage
        .all_files()
        .unwrap()
        .into_iter()
        .map(|record| record.name)
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_standard_crawl_records_files_and_recurses() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_head(&mock_server, "/", "text/html").await;
    mount_head(&mock_server, "/sub/", "text/html").await;
    mount_head(&mock_server, "/file.txt", "text/plain").await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(listing(&["sub/", "file.txt"]))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/sub/"))
        .respond_with(listing(&[]))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let storage = create_catalog(&dir);
    let config = create_test_config(false, None);

    let report = run_crawl(&config, &storage, &[format!("{}/", base_url)]).await;

    assert_eq!(report.pages_fetched, 2);
    assert_eq!(report.files_inserted, 1);
    assert!(!report.interrupted);
    assert_eq!(file_names(&storage), vec!["file.txt"]);

    let storage = storage.lock().unwrap();
    let record = storage.all_files().unwrap().remove(0);
    assert_eq!(record.url, format!("{}/file.txt", base_url));
    assert_eq!(record.domain, "127.0.0.1");
    assert_eq!(record.content_type, "text/plain");
}

#[tokio::test]
async fn test_quick_crawl_makes_no_head_requests() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(listing(&["sub/", "file.txt"]))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/sub/"))
        .respond_with(listing(&["deep.iso"]))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let storage = create_catalog(&dir);
    let config = create_test_config(true, None);

    let report = run_crawl(&config, &storage, &[format!("{}/", base_url)]).await;

    assert_eq!(report.pages_fetched, 2);
    assert_eq!(file_names(&storage), vec!["deep.iso", "file.txt"]);
}

#[tokio::test]
async fn test_depth_limit_stops_recursion() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(listing(&["sub/", "file.txt"]))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/sub/"))
        .respond_with(listing(&["deep.iso"]))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let storage = create_catalog(&dir);
    let config = create_test_config(true, Some(0));

    let report = run_crawl(&config, &storage, &[format!("{}/", base_url)]).await;

    assert_eq!(report.pages_fetched, 1);
    assert_eq!(file_names(&storage), vec!["file.txt"]);
}

#[tokio::test]
async fn test_failed_head_skips_link() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_head(&mock_server, "/", "text/html").await;
    mount_head(&mock_server, "/file.txt", "text/plain").await;
    Mock::given(method("HEAD"))
        .and(path("/missing.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(listing(&["missing.txt", "file.txt"]))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let storage = create_catalog(&dir);
    let config = create_test_config(false, None);

    let report = run_crawl(&config, &storage, &[format!("{}/", base_url)]).await;

    assert_eq!(report.classify_failures, 1);
    assert_eq!(file_names(&storage), vec!["file.txt"]);
}

#[tokio::test]
async fn test_failed_listing_is_counted() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(listing(&["broken/"]))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/broken/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let storage = create_catalog(&dir);
    let config = create_test_config(true, None);

    let report = run_crawl(&config, &storage, &[format!("{}/", base_url)]).await;

    assert_eq!(report.pages_fetched, 1);
    assert_eq!(report.pages_failed, 1);
    assert!(file_names(&storage).is_empty());
}

#[tokio::test]
async fn test_recrawl_updates_existing_rows() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(listing(&["file.txt", "other.txt"]))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let storage = create_catalog(&dir);
    let config = create_test_config(true, None);
    let seeds = [format!("{}/", base_url)];

    let first = run_crawl(&config, &storage, &seeds).await;
    assert_eq!(first.files_inserted, 2);

    let second = run_crawl(&config, &storage, &seeds).await;
    assert_eq!(second.files_inserted, 0);
    assert_eq!(second.files_updated, 2);
    assert_eq!(storage.lock().unwrap().count_files().unwrap(), 2);
}

#[tokio::test]
async fn test_catalog_index_as_seed() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/pub/"))
        .respond_with(listing(&["file.txt"]))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let storage = create_catalog(&dir);
    let seed_id = storage
        .lock()
        .unwrap()
        .upsert(&FileHead::bare(&format!("{}/pub/", base_url)))
        .unwrap()
        .id();
    let config = create_test_config(true, None);

    // The unknown index is logged and skipped
    let seeds = ["99999".to_string(), seed_id.to_string()];
    let report = run_crawl(&config, &storage, &seeds).await;

    assert_eq!(report.pages_fetched, 1);
    assert_eq!(file_names(&storage), vec!["file.txt", "index.html"]);
}

#[tokio::test]
async fn test_interrupted_crawl_returns_report() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .respond_with(listing(&["file.txt"]))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let storage = create_catalog(&dir);
    let config = create_test_config(true, None);

    let report = crawl(
        &config,
        storage.clone(),
        &[format!("{}/", base_url)],
        Arc::new(AtomicBool::new(true)),
    )
    .await
    .expect("Crawl failed");

    assert!(report.interrupted);
    assert_eq!(report.pages_fetched, 0);
}

#[tokio::test]
async fn test_interrupt_during_crawl_commits_sent_files() {
    let mock_server = Arc::new(MockServer::start().await);
    let base_url = mock_server.uri();

    let links: Vec<String> = (0..20).map(|i| format!("file{}.bin", i)).collect();
    let hrefs: Vec<&str> = links.iter().map(String::as_str).collect();

    mount_head(&mock_server, "/", "text/html").await;
    Mock::given(method("HEAD"))
        .and(path_regex(r"^/file\d+\.bin$"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/octet-stream")
                .set_delay(Duration::from_millis(100)),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(listing(&hrefs))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let storage = create_catalog(&dir);
    let mut config = create_test_config(false, None);
    config.crawler.workers = 1;

    let exit = Arc::new(AtomicBool::new(false));
    let interrupter = {
        let exit = exit.clone();
        let mock_server = mock_server.clone();
        tokio::spawn(async move {
            loop {
                let requests = mock_server.received_requests().await.unwrap_or_default();
                if requests.iter().any(|r| r.method == Method::Get) {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            tokio::time::sleep(Duration::from_millis(350)).await;
            exit.store(true, Ordering::SeqCst);
        })
    };

    let report = crawl(
        &config,
        storage.clone(),
        &[format!("{}/", base_url)],
        exit,
    )
    .await
    .expect("Crawl failed");
    interrupter.await.unwrap();

    let cataloged = storage.lock().unwrap().count_files().unwrap();
    assert!(report.interrupted);
    assert_eq!(report.pages_fetched, 1);
    assert!(cataloged > 0, "files classified before the interrupt are kept");
    assert!(cataloged < links.len() as u64, "classification stopped early");
    assert_eq!(report.files_inserted, cataloged);
}
