//! Typed graph store configuration, one struct per backend.

use crate::store::GraphStoreError;
use kg_types::DEFAULT_EDGE_LABEL;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const DEFAULT_GRAPH_NAME: &str = "knowledge_graph";

fn default_graph_name() -> String {
    std::env::var("KG_GRAPH_NAME").unwrap_or_else(|_| DEFAULT_GRAPH_NAME.to_string())
}

fn default_edge_label() -> String {
    std::env::var("KG_EDGE_LABEL").unwrap_or_else(|_| DEFAULT_EDGE_LABEL.to_string())
}

fn default_sqlite_path() -> PathBuf {
    std::env::var("KG_SQLITE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(":memory:"))
}

/// Configuration of the in-memory backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryGraphConfig {
    #[serde(default = "default_graph_name")]
    pub name: String,
    /// Edge property holding the relation of a triplet.
    #[serde(default = "default_edge_label")]
    pub edge_label: String,
}

impl MemoryGraphConfig {
    /// Reads `KG_GRAPH_NAME` and `KG_EDGE_LABEL`, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            name: default_graph_name(),
            edge_label: default_edge_label(),
        }
    }
}

impl Default for MemoryGraphConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_GRAPH_NAME.to_string(),
            edge_label: DEFAULT_EDGE_LABEL.to_string(),
        }
    }
}

/// Configuration of the SQLite backend. `path` may be `:memory:`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliteGraphConfig {
    #[serde(default = "default_graph_name")]
    pub name: String,
    #[serde(default = "default_sqlite_path")]
    pub path: PathBuf,
    #[serde(default = "default_edge_label")]
    pub edge_label: String,
}

impl SqliteGraphConfig {
    /// Reads `KG_GRAPH_NAME`, `KG_SQLITE_PATH` and `KG_EDGE_LABEL`.
    pub fn from_env() -> Self {
        Self {
            name: default_graph_name(),
            path: default_sqlite_path(),
            edge_label: default_edge_label(),
        }
    }
}

impl Default for SqliteGraphConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_GRAPH_NAME.to_string(),
            path: PathBuf::from(":memory:"),
            edge_label: DEFAULT_EDGE_LABEL.to_string(),
        }
    }
}

/// Configuration handed to a graph store, tagged by backend type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GraphStoreConfig {
    Memory(MemoryGraphConfig),
    Sqlite(SqliteGraphConfig),
}

impl GraphStoreConfig {
    pub fn backend(&self) -> &'static str {
        match self {
            GraphStoreConfig::Memory(_) => "memory",
            GraphStoreConfig::Sqlite(_) => "sqlite",
        }
    }

    pub fn name(&self) -> &str {
        match self {
            GraphStoreConfig::Memory(c) => &c.name,
            GraphStoreConfig::Sqlite(c) => &c.name,
        }
    }

    pub fn edge_label(&self) -> &str {
        match self {
            GraphStoreConfig::Memory(c) => &c.edge_label,
            GraphStoreConfig::Sqlite(c) => &c.edge_label,
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        match self {
            GraphStoreConfig::Memory(c) => c.name = name.into(),
            GraphStoreConfig::Sqlite(c) => c.name = name.into(),
        }
    }

    pub fn set_edge_label(&mut self, label: impl Into<String>) {
        match self {
            GraphStoreConfig::Memory(c) => c.edge_label = label.into(),
            GraphStoreConfig::Sqlite(c) => c.edge_label = label.into(),
        }
    }

    pub fn validate(&self) -> Result<(), GraphStoreError> {
        if self.name().trim().is_empty() {
            return Err(GraphStoreError::InvalidArgument(
                "graph name must not be empty".to_string(),
            ));
        }
        if self.edge_label().trim().is_empty() {
            return Err(GraphStoreError::InvalidArgument(
                "edge label key must not be empty".to_string(),
            ));
        }
        if let GraphStoreConfig::Sqlite(c) = self {
            if c.path.as_os_str().is_empty() {
                return Err(GraphStoreError::InvalidArgument(
                    "sqlite path must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

impl From<MemoryGraphConfig> for GraphStoreConfig {
    fn from(c: MemoryGraphConfig) -> Self {
        GraphStoreConfig::Memory(c)
    }
}

impl From<SqliteGraphConfig> for GraphStoreConfig {
    fn from(c: SqliteGraphConfig) -> Self {
        GraphStoreConfig::Sqlite(c)
    }
}
