//! Retention sweeps, session logs and the response cache

mod common;

use common::{
    count_rows, db_path, open_manager, open_manager_with, set_cache_timestamp,
    set_record_timestamp, set_session_timestamp,
};
use deepcli_memory::{RetentionPolicy, DEFAULT_NAMESPACE};
use tempfile::TempDir;

const LONG_AGO: &str = "2000-01-01T00:00:00.000000Z";

#[tokio::test]
async fn test_sweep_removes_only_expired_rows() {
    let dir = TempDir::new().unwrap();
    let manager = open_manager(&dir).await;
    let path = db_path(&dir);

    manager.store("old", "stale", DEFAULT_NAMESPACE, None).await.unwrap();
    manager.store("fresh", "current", DEFAULT_NAMESPACE, None).await.unwrap();
    set_record_timestamp(&path, "old", DEFAULT_NAMESPACE, LONG_AGO);

    manager.append_session("old-chat", "q", "a", vec![]).await.unwrap();
    manager.append_session("new-chat", "q", "a", vec![]).await.unwrap();
    set_session_timestamp(&path, "old-chat", LONG_AGO);

    manager.cache_response("prompt", "model-x", "answer", Some(12)).await.unwrap();
    set_cache_timestamp(&path, LONG_AGO);

    let report = manager.sweep().await.unwrap();
    assert_eq!(report.records, 1);
    assert_eq!(report.sessions, 1);
    assert_eq!(report.cached_responses, 1);
    assert_eq!(report.total(), 3);

    assert_eq!(manager.recall("old", DEFAULT_NAMESPACE).await.unwrap(), None);
    assert!(manager.recall("fresh", DEFAULT_NAMESPACE).await.unwrap().is_some());
    assert!(manager.session_history("old-chat", 10).await.unwrap().is_empty());
    assert_eq!(manager.session_history("new-chat", 10).await.unwrap().len(), 1);
    assert!(manager.cached_response("prompt", "model-x").await.unwrap().is_none());
}

#[tokio::test]
async fn test_zero_days_disables_that_part() {
    let dir = TempDir::new().unwrap();
    let manager = open_manager_with(&dir, |config| {
        config.retention.max_age_days = 0;
    })
    .await;
    let path = db_path(&dir);

    manager.store("old", "stale", DEFAULT_NAMESPACE, None).await.unwrap();
    set_record_timestamp(&path, "old", DEFAULT_NAMESPACE, LONG_AGO);
    manager.append_session("old-chat", "q", "a", vec![]).await.unwrap();
    set_session_timestamp(&path, "old-chat", LONG_AGO);

    let report = manager.sweep().await.unwrap();
    assert_eq!(report.records, 0);
    assert_eq!(report.sessions, 1);
    assert_eq!(count_rows(&path, "memory_entries"), 1);

    let report = manager.sweep_with(RetentionPolicy::disabled()).await.unwrap();
    assert_eq!(report, Default::default());
}

#[tokio::test]
async fn test_recently_recalled_but_old_record_is_still_swept() {
    let dir = TempDir::new().unwrap();
    let manager = open_manager(&dir).await;
    let path = db_path(&dir);

    manager.store("old", "stale", DEFAULT_NAMESPACE, None).await.unwrap();
    set_record_timestamp(&path, "old", DEFAULT_NAMESPACE, LONG_AGO);
    manager.recall("old", DEFAULT_NAMESPACE).await.unwrap();

    assert_eq!(manager.sweep().await.unwrap().records, 1);
}

#[tokio::test]
async fn test_session_history_returns_latest_entries_oldest_first() {
    let dir = TempDir::new().unwrap();
    let manager = open_manager(&dir).await;

    for i in 0..5 {
        manager
            .append_session("chat", &format!("q{}", i), &format!("a{}", i), vec![format!("turn-{}", i)])
            .await
            .unwrap();
    }
    manager.append_session("other", "x", "y", vec![]).await.unwrap();

    let history = manager.session_history("chat", 3).await.unwrap();
    let requests: Vec<&str> = history.iter().map(|e| e.request_text.as_str()).collect();
    assert_eq!(requests, vec!["q2", "q3", "q4"]);
    assert_eq!(history[2].tags, vec!["turn-4".to_string()]);
    assert!(history.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));

    assert_eq!(manager.get_stats().await.unwrap().sessions, 6);
}

#[tokio::test]
async fn test_response_cache_counts_hits_per_model() {
    let dir = TempDir::new().unwrap();
    let manager = open_manager(&dir).await;

    manager
        .cache_response("explain lifetimes", "model-a", "borrowing...", Some(40))
        .await
        .unwrap();

    assert!(manager
        .cached_response("explain lifetimes", "model-b")
        .await
        .unwrap()
        .is_none());

    let first = manager
        .cached_response("explain lifetimes", "model-a")
        .await
        .unwrap()
        .unwrap();
    let second = manager
        .cached_response("explain lifetimes", "model-a")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.response, "borrowing...");
    assert_eq!(first.tokens_used, Some(40));
    assert_eq!(first.hit_count, 1);
    assert_eq!(second.hit_count, 2);

    // Replacing the response resets the hit count
    manager
        .cache_response("explain lifetimes", "model-a", "ownership...", None)
        .await
        .unwrap();
    let replaced = manager
        .cached_response("explain lifetimes", "model-a")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(replaced.response, "ownership...");
    assert_eq!(replaced.hit_count, 1);
    assert_eq!(manager.get_stats().await.unwrap().cached_responses, 1);
}
