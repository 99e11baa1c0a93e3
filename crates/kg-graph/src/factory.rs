//! Registry of graph store backends, selected by type name.

use crate::config::{GraphStoreConfig, MemoryGraphConfig};
use crate::memory::MemoryGraphStore;
use crate::store::{GraphStore, GraphStoreError};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A constructible graph store backend.
pub trait GraphStoreBackend: Send + Sync {
    /// Lowercase name the factory looks the backend up by.
    fn type_name(&self) -> &'static str;

    /// Configuration handed to `configure` before the store is built.
    fn default_config(&self) -> GraphStoreConfig;

    fn build(&self, config: GraphStoreConfig) -> Result<Arc<dyn GraphStore>, GraphStoreError>;
}

/// Backend for [`MemoryGraphStore`].
pub struct MemoryBackend;

impl GraphStoreBackend for MemoryBackend {
    fn type_name(&self) -> &'static str {
        "memory"
    }

    fn default_config(&self) -> GraphStoreConfig {
        GraphStoreConfig::Memory(MemoryGraphConfig::from_env())
    }

    fn build(&self, config: GraphStoreConfig) -> Result<Arc<dyn GraphStore>, GraphStoreError> {
        match config {
            GraphStoreConfig::Memory(c) => Ok(Arc::new(MemoryGraphStore::new(c)?)),
            other => Err(GraphStoreError::InvalidArgument(format!(
                "memory backend can not use {} configuration",
                other.backend()
            ))),
        }
    }
}

/// Backend for [`SqliteGraphStore`](crate::SqliteGraphStore).
#[cfg(feature = "sqlite")]
pub struct SqliteBackend;

#[cfg(feature = "sqlite")]
impl GraphStoreBackend for SqliteBackend {
    fn type_name(&self) -> &'static str {
        "sqlite"
    }

    fn default_config(&self) -> GraphStoreConfig {
        GraphStoreConfig::Sqlite(crate::config::SqliteGraphConfig::from_env())
    }

    fn build(&self, config: GraphStoreConfig) -> Result<Arc<dyn GraphStore>, GraphStoreError> {
        match config {
            GraphStoreConfig::Sqlite(c) => Ok(Arc::new(crate::sqlite::SqliteGraphStore::new(c)?)),
            other => Err(GraphStoreError::InvalidArgument(format!(
                "sqlite backend can not use {} configuration",
                other.backend()
            ))),
        }
    }
}

/// Owned registry of backends. Build one at startup and pass it to whoever creates
/// stores; there is no process-wide instance.
#[derive(Default)]
pub struct GraphStoreFactory {
    backends: BTreeMap<String, Box<dyn GraphStoreBackend>>,
}

impl GraphStoreFactory {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every backend compiled into this crate.
    pub fn with_builtin() -> Self {
        let mut factory = Self::new();
        factory.register(MemoryBackend);
        #[cfg(feature = "sqlite")]
        factory.register(SqliteBackend);
        factory
    }

    /// Add or replace a backend under its type name.
    pub fn register(&mut self, backend: impl GraphStoreBackend + 'static) {
        let name = backend.type_name().to_ascii_lowercase();
        tracing::debug!(backend = %name, "graph store backend registered");
        self.backends.insert(name, Box::new(backend));
    }

    /// Registered type names, sorted.
    pub fn types(&self) -> Vec<&str> {
        self.backends.keys().map(String::as_str).collect()
    }

    /// Build a store of `type_name` with the backend's default configuration.
    pub fn create(&self, type_name: &str) -> Result<Arc<dyn GraphStore>, GraphStoreError> {
        self.create_with(type_name, |_| {})
    }

    /// Build a store of `type_name` (case-insensitive), letting `configure` adjust the
    /// default configuration first.
    pub fn create_with<F>(
        &self,
        type_name: &str,
        configure: F,
    ) -> Result<Arc<dyn GraphStore>, GraphStoreError>
    where
        F: FnOnce(&mut GraphStoreConfig),
    {
        let backend = self
            .backends
            .get(&type_name.to_ascii_lowercase())
            .ok_or_else(|| {
                GraphStoreError::InvalidArgument(format!(
                    "unsupported graph store type: {}",
                    type_name
                ))
            })?;

        let mut config = backend.default_config();
        configure(&mut config);
        let graph = config.name().to_string();
        let store = config
            .validate()
            .and_then(|_| backend.build(config))
            .map_err(|e| GraphStoreError::Construction {
                backend: backend.type_name().to_string(),
                graph: graph.clone(),
                source: Box::new(e),
            })?;
        tracing::debug!(backend = backend.type_name(), graph = %graph, "graph store created");
        Ok(store)
    }

    /// Unregister every backend. Stores already created stay usable.
    pub fn dispose(&mut self) {
        self.backends.clear();
    }
}
