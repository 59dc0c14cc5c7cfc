//! Resume, dedup and failure scenarios over scripted pages

use crate::common::{create_test_config, scripted_coordinator, write_domain, ScriptedFetcher};
use pagewalk::crawler::Coordinator;
use pagewalk::domain::UnitKey;
use pagewalk::state::Checkpoint;
use pagewalk::storage::ProgressStore;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn key(child: &str) -> UnitKey {
    UnitKey::new("1", child)
}

fn calls(entries: &[(&str, u32)]) -> Vec<(String, u32)> {
    entries.iter().map(|(c, p)| (c.to_string(), *p)).collect()
}

#[tokio::test]
async fn test_full_run_two_units() {
    let dir = TempDir::new().unwrap();
    write_domain(dir.path(), &["a", "b"]);
    let config = create_test_config(dir.path(), "http://unused");
    let progress_path = config.output.progress_path.clone();

    let fetcher = Arc::new(ScriptedFetcher::new().unit("a", 2, 10).unit("b", 2, 10));
    let summary = scripted_coordinator(config, fetcher.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(summary.completed, 2);
    assert_eq!(summary.new_records, 40);
    assert_eq!(summary.records_in_sink, Some(40));
    assert_eq!(summary.pending(), 0);
    assert!(!summary.has_storage_errors());
    assert_eq!(
        fetcher.calls(),
        calls(&[("a", 1), ("a", 2), ("b", 1), ("b", 2)])
    );

    let state = ProgressStore::load(Path::new(&progress_path));
    for child in ["a", "b"] {
        let entry = state.entry(&key(child)).unwrap();
        assert_eq!(entry.last_page, 2);
        assert!(entry.completed);
    }
    assert_eq!(state.new_records_found, 40);
    assert!(state.domain_hash.is_some());
}

#[tokio::test]
async fn test_resume_from_saved_progress() {
    let dir = TempDir::new().unwrap();
    write_domain(dir.path(), &["a", "b"]);
    let config = create_test_config(dir.path(), "http://unused");

    ProgressStore::open(Path::new(&config.output.progress_path))
        .checkpoint(&Checkpoint {
            unit: key("a"),
            page: 1,
            total_pages: None,
            completed: false,
            new_records: 10,
        })
        .unwrap();

    let fetcher = Arc::new(ScriptedFetcher::new().unit("a", 2, 10).unit("b", 2, 10));
    let summary = scripted_coordinator(config, fetcher.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(fetcher.calls(), calls(&[("a", 2), ("b", 1), ("b", 2)]));
    assert_eq!(summary.completed, 2);
    assert_eq!(summary.new_records, 30);
}

#[tokio::test]
async fn test_fetch_failure_leaves_unit_pending() {
    let dir = TempDir::new().unwrap();
    write_domain(dir.path(), &["a", "b"]);
    let config = create_test_config(dir.path(), "http://unused");
    let progress_path = config.output.progress_path.clone();

    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .unit("a", 2, 10)
            .unit("b", 2, 10)
            .failing("b", 1),
    );
    let summary = scripted_coordinator(config.clone(), fetcher)
        .run()
        .await
        .unwrap();

    assert_eq!(summary.completed, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.pending(), 1);
    assert_eq!(summary.new_records, 20);

    let state = ProgressStore::load(Path::new(&progress_path));
    assert!(state.is_completed(&key("a")));
    assert!(state.entry(&key("b")).is_none());

    // The next run picks up only the failed unit.
    let fetcher = Arc::new(ScriptedFetcher::new().unit("a", 2, 10).unit("b", 2, 10));
    let summary = scripted_coordinator(config, fetcher.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(fetcher.calls(), calls(&[("b", 1), ("b", 2)]));
    assert_eq!(summary.previously_completed, 1);
    assert_eq!(summary.pending(), 0);
    assert_eq!(summary.new_records, 20);
}

#[tokio::test]
async fn test_completed_run_is_idempotent() {
    let dir = TempDir::new().unwrap();
    write_domain(dir.path(), &["a", "b"]);
    let config = create_test_config(dir.path(), "http://unused");

    let first = Arc::new(ScriptedFetcher::new().unit("a", 2, 10).unit("b", 1, 5));
    scripted_coordinator(config.clone(), first)
        .run()
        .await
        .unwrap();

    let second = Arc::new(ScriptedFetcher::new().unit("a", 2, 10).unit("b", 1, 5));
    let summary = scripted_coordinator(config, second.clone())
        .run()
        .await
        .unwrap();

    assert!(second.calls().is_empty());
    assert_eq!(summary.dispatched, 0);
    assert_eq!(summary.new_records, 0);
    assert_eq!(summary.previously_completed, 2);
    assert_eq!(summary.records_in_sink, Some(25));
}

#[tokio::test]
async fn test_fresh_run_refetches_without_duplicates() {
    let dir = TempDir::new().unwrap();
    write_domain(dir.path(), &["a"]);
    let config = create_test_config(dir.path(), "http://unused");

    let first = Arc::new(ScriptedFetcher::new().unit("a", 2, 10));
    scripted_coordinator(config.clone(), first)
        .run()
        .await
        .unwrap();

    let second = Arc::new(ScriptedFetcher::new().unit("a", 2, 10));
    let coordinator = Coordinator::with_collaborators(
        config,
        true,
        second.clone(),
        Arc::new(crate::common::ScriptedParser),
    )
    .unwrap();
    let summary = coordinator.run().await.unwrap();

    assert_eq!(second.calls(), calls(&[("a", 1), ("a", 2)]));
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.new_records, 0);
    assert_eq!(summary.records_in_sink, Some(20));
}

#[tokio::test]
async fn test_page_ceiling_stops_unit() {
    let dir = TempDir::new().unwrap();
    write_domain(dir.path(), &["a"]);
    let mut config = create_test_config(dir.path(), "http://unused");
    config.crawler.max_pages_per_unit = 3;
    let progress_path = config.output.progress_path.clone();

    let fetcher = Arc::new(ScriptedFetcher::new().unit("a", 50, 10));
    let summary = scripted_coordinator(config, fetcher.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(fetcher.calls().len(), 3);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.new_records, 30);

    let state = ProgressStore::load(Path::new(&progress_path));
    let entry = state.entry(&key("a")).unwrap();
    assert_eq!(entry.last_page, 3);
    assert!(!entry.completed);
}

#[tokio::test]
async fn test_records_deduplicated_across_units() {
    let dir = TempDir::new().unwrap();
    write_domain(dir.path(), &["a", "b", "c"]);
    let config = create_test_config(dir.path(), "http://unused");

    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .unit("a", 1, 10)
            .unit("b", 1, 10)
            .unit("c", 1, 10)
            .shared_keys(),
    );
    let summary = scripted_coordinator(config, fetcher).run().await.unwrap();

    assert_eq!(summary.completed, 3);
    assert_eq!(summary.new_records, 10);
    assert_eq!(summary.records_in_sink, Some(10));
}

#[tokio::test]
async fn test_corrupt_progress_is_set_aside() {
    let dir = TempDir::new().unwrap();
    write_domain(dir.path(), &["a"]);
    let config = create_test_config(dir.path(), "http://unused");
    std::fs::write(&config.output.progress_path, "{ not json").unwrap();

    let fetcher = Arc::new(ScriptedFetcher::new().unit("a", 1, 3));
    let summary = scripted_coordinator(config, fetcher).run().await.unwrap();

    assert_eq!(summary.completed, 1);
    assert!(dir.path().join("progress.json.corrupt").exists());
}

#[tokio::test]
async fn test_cancelled_run_dispatches_nothing() {
    let dir = TempDir::new().unwrap();
    write_domain(dir.path(), &["a", "b"]);
    let config = create_test_config(dir.path(), "http://unused");

    let fetcher = Arc::new(ScriptedFetcher::new().unit("a", 1, 3).unit("b", 1, 3));
    let coordinator = scripted_coordinator(config, fetcher.clone());
    coordinator.cancellation_token().cancel();

    let summary = coordinator.run().await.unwrap();

    assert!(fetcher.calls().is_empty());
    assert!(summary.stopped_early);
    assert_eq!(summary.interrupted, 2);
    assert_eq!(summary.pending(), 2);
}

#[tokio::test]
async fn test_missing_domain_is_fatal() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), "http://unused");

    let result = Coordinator::with_collaborators(
        config,
        false,
        Arc::new(ScriptedFetcher::new()),
        Arc::new(crate::common::ScriptedParser),
    );

    assert!(result.is_err());
}
