//! Entity/chunk/document semantics and community bookkeeping on top of a [`GraphStore`].

use crate::community::{
    community_subgraph, community_subgraphs, weakly_connected_components, Community,
    COMMUNITY_ID_KEY,
};
use crate::error::CommunityError;
use crate::metastore::{CommunityMetastore, CommunitySummarizer};
use kg_graph::{Edge, Elem, GraphStore, MemoryGraph, Vertex};
use std::sync::Arc;

pub const ENTITY_TYPE: &str = "entity";
pub const CHUNK_TYPE: &str = "chunk";
pub const DOCUMENT_TYPE: &str = "document";
pub const COMMUNITY_TYPE: &str = "community";

/// Document -> chunk and chunk -> entity.
pub const INCLUDE_LABEL: &str = "include";
/// Chunk -> following chunk.
pub const NEXT_LABEL: &str = "next";

/// Key holding a chunk's text.
pub const CONTENT_KEY: &str = "content";

/// Store adapter that types vertices as entities, chunks or documents and keeps community
/// summaries next to the graph.
///
/// Relation labels are written under the store's configured edge label key, so
/// `get_triplets` on the wrapped store keeps working.
pub struct CommunityStoreAdapter {
    store: Arc<dyn GraphStore>,
    metastore: CommunityMetastore,
}

impl CommunityStoreAdapter {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self::with_metastore(store, CommunityMetastore::new())
    }

    pub fn with_metastore(store: Arc<dyn GraphStore>, metastore: CommunityMetastore) -> Self {
        Self { store, metastore }
    }

    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    pub fn metastore(&self) -> &CommunityMetastore {
        &self.metastore
    }

    /// Upsert entity vertices, tagging each with the `entity` type.
    pub async fn upsert_entities<I>(&self, entities: I) -> Result<(), CommunityError>
    where
        I: IntoIterator<Item = Vertex>,
    {
        self.upsert_typed(entities, ENTITY_TYPE).await
    }

    /// Upsert chunks given as `(id, content)` pairs.
    pub async fn upsert_chunks<I, S, C>(&self, chunks: I) -> Result<(), CommunityError>
    where
        I: IntoIterator<Item = (S, C)>,
        S: Into<String>,
        C: Into<String>,
    {
        let mut vertices = Vec::new();
        for (id, content) in chunks {
            let content: String = content.into();
            vertices.push(Vertex::new(id)?.with_prop(CONTENT_KEY, content));
        }
        self.upsert_typed(vertices, CHUNK_TYPE).await
    }

    /// Upsert documents given as `(id, name)` pairs.
    pub async fn upsert_documents<I, S, N>(&self, documents: I) -> Result<(), CommunityError>
    where
        I: IntoIterator<Item = (S, N)>,
        S: Into<String>,
        N: Into<String>,
    {
        let mut vertices = Vec::new();
        for (id, name) in documents {
            vertices.push(Vertex::new(id)?.with_name(name));
        }
        self.upsert_typed(vertices, DOCUMENT_TYPE).await
    }

    /// Entity -> entity relation labeled `relation`.
    pub async fn upsert_relation(
        &self,
        sub: &str,
        relation: &str,
        obj: &str,
    ) -> Result<(), CommunityError> {
        self.upsert_edge(sub, relation, obj).await
    }

    pub async fn upsert_doc_include_chunk(
        &self,
        doc_id: &str,
        chunk_id: &str,
    ) -> Result<(), CommunityError> {
        self.upsert_edge(doc_id, INCLUDE_LABEL, chunk_id).await
    }

    pub async fn upsert_chunk_include_entity(
        &self,
        chunk_id: &str,
        entity_id: &str,
    ) -> Result<(), CommunityError> {
        self.upsert_edge(chunk_id, INCLUDE_LABEL, entity_id).await
    }

    pub async fn upsert_chunk_next_chunk(
        &self,
        chunk_id: &str,
        next_chunk_id: &str,
    ) -> Result<(), CommunityError> {
        self.upsert_edge(chunk_id, NEXT_LABEL, next_chunk_id).await
    }

    /// Group entities into weakly connected components and tag every member with its
    /// community id (`community_0`, `community_1`, ... in discovery order). Returns the ids.
    ///
    /// Only entity -> entity edges connect entities; chunks and documents do not.
    pub async fn discover_communities(&self) -> Result<Vec<String>, CommunityError> {
        let full = self.store.get_full_graph().await?;
        let components = weakly_connected_components(&full, Some(ENTITY_TYPE));

        let mut tagged = MemoryGraph::new();
        let mut ids = Vec::with_capacity(components.len());
        for (i, members) in components.iter().enumerate() {
            let id = format!("{}_{}", COMMUNITY_TYPE, i);
            for vid in members {
                let mut vertex = full.get_vertex(vid)?.clone();
                vertex.set_prop(COMMUNITY_ID_KEY, id.as_str());
                tagged.upsert_vertex(vertex);
            }
            ids.push(id);
        }
        self.store.insert_graph(&tagged).await?;

        tracing::debug!(
            graph = self.store.config().name(),
            communities = ids.len(),
            entities = tagged.vertex_count(),
            "communities discovered"
        );
        Ok(ids)
    }

    /// Members of `community_id` with the edges between them and the stored summary.
    pub async fn get_community(&self, community_id: &str) -> Result<Community, CommunityError> {
        let full = self.store.get_full_graph().await?;
        let graph = community_subgraph(&full, community_id);
        if graph.is_empty() {
            return Err(CommunityError::CommunityNotFound(community_id.to_string()));
        }
        let summary = self.metastore.get(community_id).await.map(|s| s.summary);
        Ok(Community {
            id: community_id.to_string(),
            summary,
            graph,
        })
    }

    /// Discover communities, summarize each with `summarizer` and store the summaries.
    ///
    /// Summaries of communities that no longer exist are dropped first. A summarizer
    /// failure aborts the build.
    pub async fn build_communities(
        &self,
        summarizer: &dyn CommunitySummarizer,
    ) -> Result<Vec<Community>, CommunityError> {
        let ids = self.discover_communities().await?;
        self.metastore.truncate().await;

        let full = self.store.get_full_graph().await?;
        let mut subgraphs = community_subgraphs(&full);
        let mut communities = Vec::with_capacity(ids.len());
        for id in ids {
            let graph = subgraphs
                .swap_remove(&id)
                .ok_or_else(|| CommunityError::CommunityNotFound(id.clone()))?;
            let summary = summarizer.summarize(&id, &graph).await?;
            self.metastore.upsert(&id, summary.as_str()).await;
            communities.push(Community {
                id,
                summary: Some(summary),
                graph,
            });
        }
        tracing::debug!(
            graph = self.store.config().name(),
            communities = communities.len(),
            "communities built"
        );
        Ok(communities)
    }

    /// Communities whose summary best matches `keyword`, at most `top_k`.
    pub async fn search_communities(
        &self,
        keyword: &str,
        top_k: usize,
    ) -> Result<Vec<Community>, CommunityError> {
        let hits = self.metastore.search(keyword, top_k).await;
        if hits.is_empty() {
            return Ok(Vec::new());
        }
        let full = self.store.get_full_graph().await?;
        let mut subgraphs = community_subgraphs(&full);
        let mut communities = Vec::with_capacity(hits.len());
        for summary in hits {
            match subgraphs.swap_remove(&summary.id) {
                Some(graph) => communities.push(Community {
                    id: summary.id,
                    summary: Some(summary.summary),
                    graph,
                }),
                None => {
                    tracing::warn!(community = %summary.id, "summary without members, skipped");
                }
            }
        }
        Ok(communities)
    }

    /// Clear both the graph and the community summaries.
    pub async fn truncate(&self) -> Result<(), CommunityError> {
        self.store.truncate().await?;
        self.metastore.truncate().await;
        Ok(())
    }

    async fn upsert_typed<I>(&self, vertices: I, vertex_type: &str) -> Result<(), CommunityError>
    where
        I: IntoIterator<Item = Vertex>,
    {
        let mut graph = MemoryGraph::new();
        for vertex in vertices {
            graph.upsert_vertex(vertex.with_vertex_type(vertex_type));
        }
        self.store.insert_graph(&graph).await?;
        Ok(())
    }

    async fn upsert_edge(&self, sid: &str, label: &str, tid: &str) -> Result<(), CommunityError> {
        let edge = Edge::new(sid, tid)?.with_prop(self.store.config().edge_label(), label);
        let mut graph = MemoryGraph::new();
        graph.append_edge(edge);
        self.store.insert_graph(&graph).await?;
        Ok(())
    }
}
