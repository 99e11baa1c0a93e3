//! Core types for the knowledge graph kernel: property values, vertices, edges.

mod elem;
mod error;
mod model;

pub use elem::{props, Elem, PropertyValue, Props};
pub use error::GraphError;
pub use model::{
    Direction, Edge, Triplet, Vertex, DEFAULT_EDGE_LABEL, NAME_KEY, VERTEX_TYPE_KEY,
};
