//! Substring search ordering and limits

mod common;

use common::{db_path, open_manager, set_record_timestamp, tick};
use deepcli_memory::DEFAULT_NAMESPACE;
use serde_json::json;
use tempfile::TempDir;

fn keys(hits: &[deepcli_memory::SearchHit]) -> Vec<&str> {
    hits.iter().map(|h| h.key.as_str()).collect()
}

#[tokio::test]
async fn test_orders_by_access_count_descending() {
    let dir = TempDir::new().unwrap();
    let manager = open_manager(&dir).await;

    for key in ["low", "mid", "high"] {
        manager
            .store(key, "shared note", DEFAULT_NAMESPACE, None)
            .await
            .unwrap();
    }
    for (key, times) in [("low", 1), ("mid", 2), ("high", 3)] {
        for _ in 0..times {
            manager.recall(key, DEFAULT_NAMESPACE).await.unwrap();
        }
    }

    let hits = manager.search("note", None, 10).await.unwrap();
    assert_eq!(keys(&hits), vec!["high", "mid", "low"]);
    assert_eq!(hits[0].access_count, 3);
}

#[tokio::test]
async fn test_equal_access_prefers_later_update() {
    let dir = TempDir::new().unwrap();
    let manager = open_manager(&dir).await;

    manager.store("older", "a note", DEFAULT_NAMESPACE, None).await.unwrap();
    tick().await;
    manager.store("newer", "a note", DEFAULT_NAMESPACE, None).await.unwrap();

    let hits = manager.search("note", None, 10).await.unwrap();
    assert_eq!(keys(&hits), vec!["newer", "older"]);
}

#[tokio::test]
async fn test_full_tie_breaks_on_key() {
    let dir = TempDir::new().unwrap();
    let manager = open_manager(&dir).await;

    for key in ["charlie", "alpha", "bravo"] {
        manager.store(key, "a note", DEFAULT_NAMESPACE, None).await.unwrap();
    }
    let path = db_path(&dir);
    for key in ["charlie", "alpha", "bravo"] {
        set_record_timestamp(&path, key, DEFAULT_NAMESPACE, "2026-01-01T00:00:00.000000Z");
    }

    let hits = manager.search("note", None, 10).await.unwrap();
    assert_eq!(keys(&hits), vec!["alpha", "bravo", "charlie"]);
}

#[tokio::test]
async fn test_limit_is_respected() {
    let dir = TempDir::new().unwrap();
    let manager = open_manager(&dir).await;

    for i in 0..25 {
        manager
            .store(&format!("item-{:02}", i), "match me", DEFAULT_NAMESPACE, None)
            .await
            .unwrap();
    }

    assert_eq!(manager.search("match", None, 7).await.unwrap().len(), 7);
    assert_eq!(manager.search("match", None, 1).await.unwrap().len(), 1);
    assert_eq!(manager.search("match", None, 1000).await.unwrap().len(), 25);
}

#[tokio::test]
async fn test_matches_key_or_value_case_insensitively() {
    let dir = TempDir::new().unwrap();
    let manager = open_manager(&dir).await;

    manager.store("Project-Plan", "ship it", "work", None).await.unwrap();
    manager.store("todo", "Write the PLAN doc", "work", None).await.unwrap();
    manager.store("other", "unrelated", "work", None).await.unwrap();

    let hits = manager.search("plan", Some("work"), 10).await.unwrap();
    let mut found = keys(&hits);
    found.sort();
    assert_eq!(found, vec!["Project-Plan", "todo"]);
}

#[tokio::test]
async fn test_like_wildcards_are_literal() {
    let dir = TempDir::new().unwrap();
    let manager = open_manager(&dir).await;

    manager.store("pct", "100% done", DEFAULT_NAMESPACE, None).await.unwrap();
    manager.store("plain", "1000 done", DEFAULT_NAMESPACE, None).await.unwrap();
    manager.store("under", "snake_case", DEFAULT_NAMESPACE, None).await.unwrap();
    manager.store("space", "snake case", DEFAULT_NAMESPACE, None).await.unwrap();

    assert_eq!(keys(&manager.search("0%", None, 10).await.unwrap()), vec!["pct"]);
    assert_eq!(keys(&manager.search("e_c", None, 10).await.unwrap()), vec!["under"]);
}

#[tokio::test]
async fn test_json_values_are_searchable() {
    let dir = TempDir::new().unwrap();
    let manager = open_manager(&dir).await;

    manager
        .store("prefs", json!({"editor": "helix"}), DEFAULT_NAMESPACE, None)
        .await
        .unwrap();

    let hits = manager.search("helix", None, 10).await.unwrap();
    assert_eq!(keys(&hits), vec!["prefs"]);
    assert_eq!(hits[0].score, 1.0);
}

#[tokio::test]
async fn test_binary_values_match_by_key_only() {
    let dir = TempDir::new().unwrap();
    let manager = open_manager(&dir).await;

    // base64 of these bytes is "aGVsbG8="
    manager
        .store("avatar", b"hello".to_vec(), DEFAULT_NAMESPACE, None)
        .await
        .unwrap();

    assert!(manager.search("aGVs", None, 10).await.unwrap().is_empty());
    assert_eq!(keys(&manager.search("avat", None, 10).await.unwrap()), vec!["avatar"]);
}

#[tokio::test]
async fn test_empty_query_lists_namespace() {
    let dir = TempDir::new().unwrap();
    let manager = open_manager(&dir).await;

    manager.store("a", "x", "ns", None).await.unwrap();
    manager.store("b", "y", "ns", None).await.unwrap();
    manager.store("c", "z", "elsewhere", None).await.unwrap();

    assert_eq!(manager.search("", Some("ns"), 10).await.unwrap().len(), 2);
    assert_eq!(manager.search("", None, 10).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_whitespace_query_is_a_literal_pattern() {
    let dir = TempDir::new().unwrap();
    let manager = open_manager(&dir).await;

    manager.store("double", "a  b", "ns", None).await.unwrap();
    manager.store("single", "a b", "ns", None).await.unwrap();
    manager.store("none", "ab", "ns", None).await.unwrap();

    let hits = manager.search("  ", None, 10).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].key, "double");

    assert_eq!(manager.search(" ", None, 10).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_unknown_namespace_yields_nothing() {
    let dir = TempDir::new().unwrap();
    let manager = open_manager(&dir).await;

    manager.store("a", "note", "ns", None).await.unwrap();
    assert!(manager.search("note", Some("missing"), 10).await.unwrap().is_empty());
    assert!(manager.search("", Some("missing"), 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_search_does_not_count_as_access() {
    let dir = TempDir::new().unwrap();
    let manager = open_manager(&dir).await;

    manager.store("a", "note", DEFAULT_NAMESPACE, None).await.unwrap();
    manager.search("note", None, 10).await.unwrap();

    let record = manager.peek("a", DEFAULT_NAMESPACE).await.unwrap().unwrap();
    assert_eq!(record.access_count, 0);
}

#[tokio::test]
async fn test_json_values_match_in_serialized_form() {
    let dir = TempDir::new().unwrap();
    let manager = open_manager(&dir).await;

    manager
        .store("win-path", json!({"p": "C:\\x"}), DEFAULT_NAMESPACE, None)
        .await
        .unwrap();
    manager
        .store("text-path", "C:\\x", DEFAULT_NAMESPACE, None)
        .await
        .unwrap();

    let keys = |hits: Vec<deepcli_memory::SearchHit>| -> Vec<String> {
        hits.into_iter().map(|hit| hit.key).collect()
    };

    // The stored JSON text is {"p":"C:\\x"}
    assert_eq!(
        keys(manager.search("C:\\x", None, 10).await.unwrap()),
        vec!["text-path".to_string()]
    );
    assert_eq!(
        keys(manager.search("C:\\\\x", None, 10).await.unwrap()),
        vec!["win-path".to_string()]
    );
}
