//! Errors raised by graph elements and the in-memory graph.

/// Model-level failure. Absent-but-valid operations (deleting a missing edge, searching
/// from a missing seed) are not errors and never produce one of these.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
