//! End-to-end crawls against a mock HTTP listing

use crate::common::{create_test_config, write_domain};
use pagewalk::crawler::{Coordinator, FetchError, HttpFetcher, PageFetcher};
use pagewalk::domain::{UnitKey, WorkUnit};
use pagewalk::storage::ProgressStore;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Renders a listing page with `count` rows starting at `first`
fn listing_page(first: usize, count: usize, total: usize, next: bool) -> String {
    let rows: String = (first..first + count)
        .map(|i| format!("<tr><td>FF-{:04}</td><td>Fighter {}</td></tr>", i, i))
        .collect();
    let next_link = if next {
        r#"<li><a href="?page=next">Next</a></li>"#
    } else {
        ""
    };
    format!(
        r#"<html><body>
        <table class="table"><thead><tr><th>Id</th><th>Name</th></tr></thead>
        <tbody>{}</tbody></table>
        <div class="dataTables_info">Showing {} to {} of {} entries</div>
        <ul class="pagination"><li><a href="?page=prev">Previous</a></li>{}</ul>
        </body></html>"#,
        rows,
        first,
        first + count.saturating_sub(1),
        total,
        next_link
    )
}

async fn mount_page(server: &MockServer, district: &str, page: &str, body: String) {
    Mock::given(method("GET"))
        .and(path("/list"))
        .and(query_param("district_id", district))
        .and(query_param("page", page))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_crawl_over_http() {
    let server = MockServer::start().await;
    mount_page(&server, "a", "1", listing_page(1, 10, 13, true)).await;
    mount_page(&server, "a", "2", listing_page(11, 3, 13, false)).await;
    mount_page(&server, "b", "1", listing_page(0, 0, 0, false)).await;

    let dir = TempDir::new().unwrap();
    write_domain(dir.path(), &["a", "b"]);
    let config = create_test_config(dir.path(), &format!("{}/list", server.uri()));
    let progress_path = config.output.progress_path.clone();

    let coordinator = Coordinator::new(config, false).expect("Failed to create coordinator");
    let summary = coordinator.run().await.expect("Crawl failed");

    assert_eq!(summary.completed, 2);
    assert_eq!(summary.new_records, 13);
    assert_eq!(summary.records_in_sink, Some(13));

    let state = ProgressStore::load(Path::new(&progress_path));
    let a = state.entry(&UnitKey::new("1", "a")).unwrap();
    assert_eq!(a.last_page, 2);
    assert_eq!(a.total_pages, Some(2));
    assert!(a.completed);

    let b = state.entry(&UnitKey::new("1", "b")).unwrap();
    assert_eq!(b.last_page, 1);
    assert!(b.completed);
}

#[tokio::test]
async fn test_unmatched_page_fails_unit() {
    let server = MockServer::start().await;
    mount_page(&server, "a", "1", listing_page(1, 10, 30, true)).await;

    let dir = TempDir::new().unwrap();
    write_domain(dir.path(), &["a"]);
    let config = create_test_config(dir.path(), &format!("{}/list", server.uri()));
    let progress_path = config.output.progress_path.clone();

    let summary = Coordinator::new(config, false)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.new_records, 10);

    let state = ProgressStore::load(Path::new(&progress_path));
    let entry = state.entry(&UnitKey::new("1", "a")).unwrap();
    assert_eq!(entry.last_page, 1);
    assert!(!entry.completed);
}

fn work_unit() -> WorkUnit {
    WorkUnit {
        key: UnitKey::new("1", "a"),
        dimensions: vec![
            ("division_id".to_string(), "1".to_string()),
            ("district_id".to_string(), "a".to_string()),
        ],
        label: "Division > District a".to_string(),
        start_page: 1,
    }
}

#[tokio::test]
async fn test_fetcher_retries_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/list"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), &format!("{}/list", server.uri()));
    let fetcher = HttpFetcher::new(&config.source).unwrap();

    let result = fetcher.fetch(&work_unit(), 1).await;

    assert!(matches!(result, Err(FetchError::Status { status: 503, .. })));
}

#[tokio::test]
async fn test_fetcher_does_not_retry_client_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/list"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), &format!("{}/list", server.uri()));
    let fetcher = HttpFetcher::new(&config.source).unwrap();

    let result = fetcher.fetch(&work_unit(), 1).await;

    assert!(matches!(result, Err(FetchError::Status { status: 404, .. })));
}

#[tokio::test]
async fn test_fetcher_sends_unit_dimensions() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/list"))
        .and(query_param("division_id", "1"))
        .and(query_param("district_id", "a"))
        .and(query_param("page", "7"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), &format!("{}/list", server.uri()));
    let fetcher = HttpFetcher::new(&config.source).unwrap();

    assert_eq!(fetcher.fetch(&work_unit(), 7).await.unwrap(), "ok");
}
