//! In-memory property graph, bounded subgraph search, and the graph store contract.

mod config;
mod factory;
mod graph;
mod memory;
mod store;
mod traversal;

#[cfg(feature = "sqlite")]
mod sqlite;

pub use config::{GraphStoreConfig, MemoryGraphConfig, SqliteGraphConfig};
#[cfg(feature = "sqlite")]
pub use factory::SqliteBackend;
pub use factory::{GraphStoreBackend, GraphStoreFactory, MemoryBackend};
pub use graph::MemoryGraph;
pub use kg_types::{
    props, Direction, Edge, Elem, GraphError, PropertyValue, Props, Triplet, Vertex,
};
pub use memory::MemoryGraphStore;
pub use store::{ExploreOptions, GraphStore, GraphStoreError};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteGraphStore;
