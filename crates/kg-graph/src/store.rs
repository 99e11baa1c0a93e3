//! Graph store contract implemented by every backend.

use crate::config::GraphStoreConfig;
use crate::graph::MemoryGraph;
use async_trait::async_trait;
use kg_types::{Direction, GraphError, Props};

/// Bounds of an `explore` call. The default walks both directions without limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExploreOptions {
    pub direction: Direction,
    /// Vertices at this depth (seeds are depth 0) are not expanded.
    pub depth: Option<usize>,
    /// Per-vertex cap on neighbor edges.
    pub fan: Option<usize>,
    /// Ceiling on the number of edges in the result.
    pub limit: Option<usize>,
}

impl Default for ExploreOptions {
    fn default() -> Self {
        Self {
            direction: Direction::Both,
            depth: None,
            fan: None,
            limit: None,
        }
    }
}

/// Graph store abstraction. An empty result means "found nothing"; a backend failure is
/// always an error.
#[async_trait]
pub trait GraphStore: Send + Sync {
    fn config(&self) -> &GraphStoreConfig;

    /// Insert `sub -[rel]-> obj`. Inserting the same triplet twice stores one edge.
    async fn insert_triplet(&self, sub: &str, rel: &str, obj: &str)
        -> Result<(), GraphStoreError>;

    /// Merge a whole graph: vertices are upserted, edges appended with dedup.
    async fn insert_graph(&self, graph: &MemoryGraph) -> Result<(), GraphStoreError>;

    /// Outbound `(relation, object)` pairs one hop from `sub`.
    async fn get_triplets(&self, sub: &str) -> Result<Vec<(String, String)>, GraphStoreError>;

    /// Remove `sub -[rel]-> obj`. Absent triplets are a no-op.
    async fn delete_triplet(&self, sub: &str, rel: &str, obj: &str)
        -> Result<(), GraphStoreError>;

    /// Remove every vertex and edge, keeping the store usable.
    async fn truncate(&self) -> Result<(), GraphStoreError>;

    /// Release the graph's storage.
    async fn drop_graph(&self) -> Result<(), GraphStoreError>;

    /// Backend-defined schema description. `refresh` bypasses any cached copy.
    async fn get_schema(&self, refresh: bool) -> Result<String, GraphStoreError>;

    async fn get_full_graph(&self) -> Result<MemoryGraph, GraphStoreError>;

    /// Bounded subgraph around `subs`, with the semantics of [`MemoryGraph::search`].
    async fn explore(
        &self,
        subs: &[String],
        options: &ExploreOptions,
    ) -> Result<MemoryGraph, GraphStoreError>;

    /// Run a backend-native query and map its rows into a graph.
    async fn query(&self, query: &str, params: &Props) -> Result<MemoryGraph, GraphStoreError> {
        let _ = (query, params);
        Err(GraphStoreError::Unsupported {
            operation: "query",
            backend: self.config().backend(),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GraphStoreError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("{operation} is not supported by the {backend} graph store")]
    Unsupported {
        operation: &'static str,
        backend: &'static str,
    },
    #[error("{operation} failed on graph '{graph}': {message}")]
    Backend {
        operation: &'static str,
        graph: String,
        message: String,
    },
    #[error("failed to create {backend} graph store '{graph}': {source}")]
    Construction {
        backend: String,
        graph: String,
        #[source]
        source: Box<GraphStoreError>,
    },
    #[error(transparent)]
    Graph(#[from] GraphError),
}
