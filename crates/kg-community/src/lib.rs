//! Community layer for the knowledge graph kernel.
//!
//! Types vertices as entities, chunks and documents on top of any [`kg_graph::GraphStore`],
//! groups entities into communities and keeps caller-produced community summaries.

mod adapter;
mod community;
mod error;
mod metastore;

pub use adapter::{
    CommunityStoreAdapter, CHUNK_TYPE, COMMUNITY_TYPE, CONTENT_KEY, DOCUMENT_TYPE, ENTITY_TYPE,
    INCLUDE_LABEL, NEXT_LABEL,
};
pub use community::{
    community_subgraph, community_subgraphs, weakly_connected_components, Community,
    COMMUNITY_ID_KEY,
};
pub use error::CommunityError;
pub use metastore::{CommunityMetastore, CommunitySummarizer, CommunitySummary};
