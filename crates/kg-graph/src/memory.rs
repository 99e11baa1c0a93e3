//! In-memory graph store backed by a single [`MemoryGraph`].

use crate::config::{GraphStoreConfig, MemoryGraphConfig};
use crate::graph::MemoryGraph;
use crate::store::{ExploreOptions, GraphStore, GraphStoreError};
use kg_types::{props, Direction, Edge};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Graph store keeping everything in one `MemoryGraph`.
///
/// The graph sits behind a `RwLock`: reads (`get_*`, `explore`) share it, mutations take
/// it exclusively. Triplets are stored as edges whose `edge_label` property holds the
/// relation.
pub struct MemoryGraphStore {
    config: GraphStoreConfig,
    graph: Arc<RwLock<MemoryGraph>>,
    /// Serialized schema, dropped on every mutation.
    schema_cache: Arc<RwLock<Option<String>>>,
}

impl MemoryGraphStore {
    pub fn new(config: MemoryGraphConfig) -> Result<Self, GraphStoreError> {
        let config = GraphStoreConfig::Memory(config);
        config.validate()?;
        tracing::debug!(graph = config.name(), "memory graph store created");
        Ok(Self {
            config,
            graph: Arc::new(RwLock::new(MemoryGraph::new())),
            schema_cache: Arc::new(RwLock::new(None)),
        })
    }

    fn edge_label(&self) -> &str {
        self.config.edge_label()
    }

    /// Called with the graph write guard held; `get_schema` stores under the read guard.
    async fn invalidate_schema(&self) {
        self.schema_cache.write().await.take();
    }
}

#[async_trait::async_trait]
impl GraphStore for MemoryGraphStore {
    fn config(&self) -> &GraphStoreConfig {
        &self.config
    }

    async fn insert_triplet(
        &self,
        sub: &str,
        rel: &str,
        obj: &str,
    ) -> Result<(), GraphStoreError> {
        let edge = Edge::new(sub, obj)?.with_prop(self.edge_label(), rel);
        let mut graph = self.graph.write().await;
        if graph.append_edge(edge) {
            self.invalidate_schema().await;
        }
        Ok(())
    }

    async fn insert_graph(&self, graph: &MemoryGraph) -> Result<(), GraphStoreError> {
        let mut current = self.graph.write().await;
        current.upsert_graph(graph);
        self.invalidate_schema().await;
        Ok(())
    }

    async fn get_triplets(&self, sub: &str) -> Result<Vec<(String, String)>, GraphStoreError> {
        let graph = self.graph.read().await;
        let mut triplets = Vec::new();
        for edge in graph.get_neighbor_edges(sub, Direction::Out, None) {
            let triplet = edge
                .triplet(Some(self.edge_label()))
                .or_else(|_| edge.triplet(None))?;
            triplets.push((triplet.rel, triplet.obj));
        }
        Ok(triplets)
    }

    async fn delete_triplet(
        &self,
        sub: &str,
        rel: &str,
        obj: &str,
    ) -> Result<(), GraphStoreError> {
        let mut graph = self.graph.write().await;
        if graph.del_edges(sub, obj, &props([(self.edge_label(), rel)])) > 0 {
            self.invalidate_schema().await;
        }
        Ok(())
    }

    async fn truncate(&self) -> Result<(), GraphStoreError> {
        let mut graph = self.graph.write().await;
        graph.truncate();
        self.invalidate_schema().await;
        Ok(())
    }

    async fn drop_graph(&self) -> Result<(), GraphStoreError> {
        tracing::debug!(graph = self.config.name(), "dropping memory graph");
        self.truncate().await
    }

    async fn get_schema(&self, refresh: bool) -> Result<String, GraphStoreError> {
        if !refresh {
            if let Some(cached) = self.schema_cache.read().await.as_ref() {
                return Ok(cached.clone());
            }
        }
        let graph = self.graph.read().await;
        let schema = graph.schema().to_string();
        *self.schema_cache.write().await = Some(schema.clone());
        drop(graph);
        Ok(schema)
    }

    async fn get_full_graph(&self) -> Result<MemoryGraph, GraphStoreError> {
        Ok(self.graph.read().await.clone())
    }

    async fn explore(
        &self,
        subs: &[String],
        options: &ExploreOptions,
    ) -> Result<MemoryGraph, GraphStoreError> {
        tracing::debug!(
            graph = self.config.name(),
            seeds = subs.len(),
            direction = %options.direction,
            depth = ?options.depth,
            fan = ?options.fan,
            limit = ?options.limit,
            "explore"
        );
        let graph = self.graph.read().await;
        Ok(graph.search(
            subs,
            options.direction,
            options.depth,
            options.fan,
            options.limit,
        ))
    }
}
