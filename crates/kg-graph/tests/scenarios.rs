//! Store-level scenarios over a small seeded graph, run against every built-in backend.

use kg_graph::{
    Direction, Edge, ExploreOptions, GraphStore, GraphStoreFactory, MemoryGraph, Props,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const SEED: [(&str, &str, &str); 9] = [
    ("A", "A", "0"),
    ("A", "A", "1"),
    ("A", "B", "2"),
    ("B", "C", "3"),
    ("B", "D", "4"),
    ("C", "D", "5"),
    ("B", "E", "6"),
    ("F", "E", "7"),
    ("E", "F", "8"),
];

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn seed_graph() -> MemoryGraph {
    let mut g = MemoryGraph::new();
    for (s, t, r) in SEED {
        g.append_edge(Edge::labeled(s, t, r).unwrap());
    }
    g
}

async fn seeded_store() -> Arc<dyn GraphStore> {
    init_tracing();
    let store = GraphStoreFactory::with_builtin()
        .create_with("memory", |config| config.set_name("scenarios"))
        .unwrap();
    store.insert_graph(&seed_graph()).await.unwrap();
    store
}

fn sorted(mut triplets: Vec<(String, String)>) -> Vec<(String, String)> {
    triplets.sort();
    triplets
}

fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|(r, o)| (r.to_string(), o.to_string()))
        .collect()
}

#[tokio::test]
async fn get_triplets_lists_outbound_relations() {
    let store = seeded_store().await;
    assert_eq!(
        sorted(store.get_triplets("A").await.unwrap()),
        pairs(&[("0", "A"), ("1", "A"), ("2", "B")])
    );
    assert!(store.get_triplets("Z").await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_triplet_removes_only_that_edge() {
    let store = seeded_store().await;
    store.delete_triplet("A", "2", "B").await.unwrap();
    assert_eq!(
        sorted(store.get_triplets("A").await.unwrap()),
        pairs(&[("0", "A"), ("1", "A")])
    );

    let full = store.get_full_graph().await.unwrap();
    assert_eq!(full.edge_count(), 8);
    assert!(full.has_vertex("B"));
    assert!(full
        .get_neighbor_edges("A", Direction::Out, None)
        .iter()
        .all(|e| e.tid() == "A"));

    // second delete is a no-op
    store.delete_triplet("A", "2", "B").await.unwrap();
    assert_eq!(store.get_full_graph().await.unwrap().edge_count(), 8);
}

#[tokio::test]
async fn explore_out_depth_two() {
    let store = seeded_store().await;
    let subs = vec!["A".to_string(), "B".to_string()];
    let sub = store
        .explore(
            &subs,
            &ExploreOptions {
                direction: Direction::Out,
                depth: Some(2),
                fan: None,
                limit: Some(10),
            },
        )
        .await
        .unwrap();

    let mut vids: Vec<_> = sub.vertices().map(|v| v.vid().to_string()).collect();
    vids.sort();
    assert_eq!(vids, vec!["A", "B", "C", "D", "E"]);
    assert_eq!(sub.edge_count(), 6);
}

#[tokio::test]
async fn explore_missing_seed_is_empty() {
    let store = seeded_store().await;
    let sub = store
        .explore(&["Z".to_string()], &ExploreOptions::default())
        .await
        .unwrap();
    assert_eq!(sub.vertex_count(), 0);
    assert_eq!(sub.edge_count(), 0);
}

#[tokio::test]
async fn explore_both_respects_result_limit() {
    let store = seeded_store().await;
    let sub = store
        .explore(
            &["B".to_string()],
            &ExploreOptions {
                limit: Some(2),
                ..ExploreOptions::default()
            },
        )
        .await
        .unwrap();
    assert!(sub.edge_count() <= 2);
    assert!(sub.has_vertex("B"));
}

#[tokio::test]
async fn explore_fan_limit_caps_each_vertex() {
    let store = seeded_store().await;
    let sub = store
        .explore(
            &["B".to_string()],
            &ExploreOptions {
                direction: Direction::Out,
                depth: Some(1),
                fan: Some(1),
                limit: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(sub.edge_count(), 1);
    assert_eq!(sub.vertex_count(), 2);
}

#[tokio::test]
async fn triplet_round_trip() {
    let store = seeded_store().await;
    store.insert_triplet("X", "r1", "Y").await.unwrap();
    store.insert_triplet("X", "r1", "Y").await.unwrap();
    assert_eq!(store.get_triplets("X").await.unwrap(), pairs(&[("r1", "Y")]));
    assert_eq!(store.get_full_graph().await.unwrap().edge_count(), 10);

    store.delete_triplet("X", "r1", "Y").await.unwrap();
    assert!(store.get_triplets("X").await.unwrap().is_empty());
}

#[tokio::test]
async fn truncate_and_schema() {
    let store = seeded_store().await;
    let schema: serde_json::Value =
        serde_json::from_str(&store.get_schema(false).await.unwrap()).unwrap();
    assert_eq!(schema["schema"].as_array().unwrap().len(), 2);

    store.truncate().await.unwrap();
    let full = store.get_full_graph().await.unwrap();
    assert!(full.is_empty());
    assert_ne!(store.get_schema(false).await.unwrap(), schema.to_string());

    store.drop_graph().await.unwrap();
    assert!(store.query("anything", &Props::new()).await.is_err());
}

#[cfg(feature = "sqlite")]
mod sqlite {
    use super::*;

    #[tokio::test]
    async fn sqlite_backend_matches_memory_traversal() {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenarios.db");
        let store = GraphStoreFactory::with_builtin()
            .create_with("SQLITE", |config| {
                if let kg_graph::GraphStoreConfig::Sqlite(c) = config {
                    c.path = path.clone();
                }
            })
            .unwrap();
        store.insert_graph(&seed_graph()).await.unwrap();

        let options = ExploreOptions {
            direction: Direction::Out,
            depth: Some(2),
            fan: None,
            limit: Some(10),
        };
        let subs = vec!["A".to_string(), "B".to_string()];
        let from_sqlite = store.explore(&subs, &options).await.unwrap();
        let from_memory = seed_graph().search(&subs, Direction::Out, Some(2), None, Some(10));
        assert_eq!(from_sqlite.vertex_count(), from_memory.vertex_count());
        assert_eq!(from_sqlite.edge_count(), from_memory.edge_count());

        store.delete_triplet("A", "2", "B").await.unwrap();
        assert_eq!(
            sorted(store.get_triplets("A").await.unwrap()),
            pairs(&[("0", "A"), ("1", "A")])
        );
    }
}
