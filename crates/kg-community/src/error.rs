use kg_graph::{GraphError, GraphStoreError};

#[derive(Debug, thiserror::Error)]
pub enum CommunityError {
    #[error(transparent)]
    Store(#[from] GraphStoreError),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error("community not found: {0}")]
    CommunityNotFound(String),
    #[error("summarizer failed for community {community}: {message}")]
    Summarizer { community: String, message: String },
}
