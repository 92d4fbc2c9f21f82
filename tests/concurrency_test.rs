//! Concurrent queries, background indexing and reindex serialization

mod common;

use attribute_index::models::{Indexable, Organization};
use attribute_index::search::{Index, IndexRegistry};
use common::{acme, ids, node, open_index, shared, test_config};
use serde_json::json;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

fn fleet(count: usize) -> Vec<Arc<dyn Indexable>> {
    (0..count)
        .map(|i| {
            let platform = if i % 2 == 0 { "ubuntu" } else { "centos" };
            shared(node(
                &format!("node{:03}", i),
                json!({ "platform": platform, "rack": format!("{:02}", i % 10) }),
            ))
        })
        .collect()
}

#[test]
fn test_concurrent_searches_agree() {
    let dir = TempDir::new().unwrap();
    let index = Arc::new(open_index(dir.path()));
    for entity in fleet(64) {
        index.index_entity(entity.as_ref()).unwrap();
    }
    let expected = index.search("node", "platform:ubu*", false).unwrap();
    assert_eq!(expected.len(), 32);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let index = index.clone();
            thread::spawn(move || index.search("node", "platform:ubu*", false).unwrap())
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}

#[test]
fn test_queries_never_see_partial_documents() {
    let dir = TempDir::new().unwrap();
    let index = Arc::new(open_index(dir.path()));
    for entity in fleet(16) {
        index.index_entity(entity.as_ref()).unwrap();
    }

    let writer = {
        let index = index.clone();
        thread::spawn(move || {
            for round in 0..50 {
                let platform = if round % 2 == 0 { "arch" } else { "ubuntu" };
                index
                    .index_entity(&node("node000", json!({ "platform": platform })))
                    .unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let index = index.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    let exact = index.search("node", "name:node000", false).unwrap();
                    assert!(exact.contains("node000"));
                    let text = index.search_text("node", "node000", false).unwrap();
                    assert!(text.contains("node000"));
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reindexes_are_serialized() {
    let dir = TempDir::new().unwrap();
    let index = Arc::new(open_index(dir.path()));

    let first = {
        let index = index.clone();
        tokio::spawn(async move { index.reindex(fleet(40)).await })
    };
    let second = {
        let index = index.clone();
        tokio::spawn(async move { index.reindex(fleet(10)).await })
    };

    let first = first.await.unwrap().unwrap();
    let second = second.await.unwrap().unwrap();
    assert_eq!(first.indexed, 40);
    assert_eq!(second.indexed, 10);

    // whichever finished last wins wholesale
    let count = index.all_documents("node").unwrap().len();
    assert!(count == 40 || count == 10, "unexpected document count {}", count);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_searches_during_reindex_see_complete_index() {
    let dir = TempDir::new().unwrap();
    let index = Arc::new(open_index(dir.path()));
    index
        .index_entity(&node("old", json!({ "platform": "ubuntu" })))
        .unwrap();

    let reindex = {
        let index = index.clone();
        tokio::spawn(async move { index.reindex(fleet(200)).await })
    };

    loop {
        let hits = index.search("node", "platform:ubuntu", false).unwrap();
        // either the old index or the fully rebuilt one
        assert!(hits == ids(&["old"]) || hits.len() == 100, "partial view: {}", hits.len());
        if reindex.is_finished() {
            break;
        }
        tokio::task::yield_now().await;
    }

    let report = reindex.await.unwrap().unwrap();
    assert_eq!(report.indexed, 200);
    assert_eq!(index.search("node", "platform:ubuntu", false).unwrap().len(), 100);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_background_indexing_eventually_visible() {
    let dir = TempDir::new().unwrap();
    let registry = IndexRegistry::init(test_config(dir.path()), &[acme()]).unwrap();

    let handles: Vec<_> = fleet(50)
        .into_iter()
        .map(|entity| registry.index_entity(entity))
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let index = registry.index("acme").unwrap();
    assert_eq!(index.all_documents("node").unwrap().len(), 50);
    assert_eq!(index.search("node", "rack:03", false).unwrap().len(), 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_background_reindex_completion_signal() {
    let dir = TempDir::new().unwrap();
    let registry = IndexRegistry::init(
        test_config(dir.path()),
        &[acme(), Organization::new("globex", 2)],
    )
    .unwrap();

    let acme_done = registry.reindex_in_background("acme", fleet(20));
    let globex_done = registry.reindex_in_background("globex", fleet(5));
    let missing_done = registry.reindex_in_background("initech", fleet(1));

    let acme_report = acme_done.await.unwrap().unwrap();
    let globex_report = globex_done.await.unwrap().unwrap();
    assert_eq!(acme_report.indexed, 20);
    // every fleet entity belongs to acme
    assert_eq!(globex_report.indexed, 0);
    assert_eq!(globex_report.failed.len(), 5);
    assert!(missing_done.await.unwrap().is_err());

    let index: Arc<Index> = registry.index("globex").unwrap();
    assert!(index.all_documents("node").unwrap().is_empty());
}
