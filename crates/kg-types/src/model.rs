//! Vertex, edge, direction and triplet types.

use crate::elem::{Elem, Props, PropertyValue};
use crate::error::GraphError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Property key holding a vertex's display name.
pub const NAME_KEY: &str = "name";
/// Property key holding a vertex's type (entity, chunk, document, ...).
pub const VERTEX_TYPE_KEY: &str = "vertex_type";
/// Default property key holding an edge's relation label.
pub const DEFAULT_EDGE_LABEL: &str = "label";

/// Traversal direction relative to a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Edges where the vertex is the source.
    Out,
    /// Edges where the vertex is the target.
    In,
    Both,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Out => f.write_str("out"),
            Direction::In => f.write_str("in"),
            Direction::Both => f.write_str("both"),
        }
    }
}

/// Graph vertex identified by a caller-assigned, non-empty `vid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawVertex")]
pub struct Vertex {
    vid: String,
    #[serde(default)]
    props: Props,
}

#[derive(Deserialize)]
struct RawVertex {
    vid: String,
    #[serde(default)]
    props: Props,
}

impl TryFrom<RawVertex> for Vertex {
    type Error = GraphError;

    fn try_from(raw: RawVertex) -> Result<Self, Self::Error> {
        Ok(Vertex::new(raw.vid)?.with_props(raw.props))
    }
}

impl Vertex {
    pub fn new(vid: impl Into<String>) -> Result<Self, GraphError> {
        let vid = vid.into();
        if vid.is_empty() {
            return Err(GraphError::InvalidArgument(
                "vertex id must not be empty".to_string(),
            ));
        }
        Ok(Self {
            vid,
            props: Props::new(),
        })
    }

    pub fn vid(&self) -> &str {
        &self.vid
    }

    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.set_prop(key, value);
        self
    }

    pub fn with_props(mut self, props: Props) -> Self {
        self.props.extend(props);
        self
    }

    pub fn with_name(self, name: impl Into<String>) -> Self {
        self.with_prop(NAME_KEY, name.into())
    }

    pub fn with_vertex_type(self, vertex_type: impl Into<String>) -> Self {
        self.with_prop(VERTEX_TYPE_KEY, vertex_type.into())
    }

    pub fn name(&self) -> Option<&str> {
        self.get_prop(NAME_KEY).and_then(PropertyValue::as_str)
    }

    pub fn vertex_type(&self) -> Option<&str> {
        self.get_prop(VERTEX_TYPE_KEY).and_then(PropertyValue::as_str)
    }
}

impl Elem for Vertex {
    fn props(&self) -> &Props {
        &self.props
    }

    fn props_mut(&mut self) -> &mut Props {
        &mut self.props
    }
}

/// Directed edge `sid -> tid`.
///
/// Equality and hashing cover the id pair and every property, so two edges between the
/// same vertices coexist as long as their properties differ.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawEdge")]
pub struct Edge {
    sid: String,
    tid: String,
    #[serde(default)]
    props: Props,
}

#[derive(Deserialize)]
struct RawEdge {
    sid: String,
    tid: String,
    #[serde(default)]
    props: Props,
}

impl TryFrom<RawEdge> for Edge {
    type Error = GraphError;

    fn try_from(raw: RawEdge) -> Result<Self, Self::Error> {
        Ok(Edge::new(raw.sid, raw.tid)?.with_props(raw.props))
    }
}

impl Edge {
    pub fn new(sid: impl Into<String>, tid: impl Into<String>) -> Result<Self, GraphError> {
        let (sid, tid) = (sid.into(), tid.into());
        if sid.is_empty() || tid.is_empty() {
            return Err(GraphError::InvalidArgument(format!(
                "edge endpoints must not be empty: '{}' -> '{}'",
                sid, tid
            )));
        }
        Ok(Self {
            sid,
            tid,
            props: Props::new(),
        })
    }

    /// Edge carrying `label` under [`DEFAULT_EDGE_LABEL`].
    pub fn labeled(
        sid: impl Into<String>,
        tid: impl Into<String>,
        label: impl Into<PropertyValue>,
    ) -> Result<Self, GraphError> {
        Ok(Self::new(sid, tid)?.with_prop(DEFAULT_EDGE_LABEL, label))
    }

    pub fn sid(&self) -> &str {
        &self.sid
    }

    pub fn tid(&self) -> &str {
        &self.tid
    }

    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.set_prop(key, value);
        self
    }

    pub fn with_props(mut self, props: Props) -> Self {
        self.props.extend(props);
        self
    }

    /// Property-less vertices for the source and target endpoints.
    pub fn endpoint_vertices(&self) -> [Vertex; 2] {
        [
            Vertex {
                vid: self.sid.clone(),
                props: Props::new(),
            },
            Vertex {
                vid: self.tid.clone(),
                props: Props::new(),
            },
        ]
    }

    /// The endpoint opposite to `vid`.
    pub fn nid(&self, vid: &str) -> Result<&str, GraphError> {
        if vid == self.sid {
            Ok(&self.tid)
        } else if vid == self.tid {
            Ok(&self.sid)
        } else {
            Err(GraphError::NotFound(format!(
                "vertex {} is not an endpoint of edge {} -> {}",
                vid, self.sid, self.tid
            )))
        }
    }

    /// Cast to `(sid, label, tid)`.
    ///
    /// With `label_key` the label is that property. Without one the edge must carry
    /// exactly one property, which becomes the label.
    pub fn triplet(&self, label_key: Option<&str>) -> Result<Triplet, GraphError> {
        let rel = match label_key {
            Some(key) => self.get_prop(key).ok_or_else(|| {
                GraphError::InvalidArgument(format!(
                    "edge {} -> {} has no '{}' property",
                    self.sid, self.tid, key
                ))
            })?,
            None => {
                if self.props.len() != 1 {
                    return Err(GraphError::InvalidArgument(format!(
                        "can not infer label of edge {} -> {} from {} properties",
                        self.sid,
                        self.tid,
                        self.props.len()
                    )));
                }
                self.props.values().next().ok_or_else(|| {
                    GraphError::InvalidArgument("edge has no properties".to_string())
                })?
            }
        };
        Ok(Triplet {
            sub: self.sid.clone(),
            rel: rel.to_string(),
            obj: self.tid.clone(),
        })
    }
}

impl Elem for Edge {
    fn props(&self) -> &Props {
        &self.props
    }

    fn props_mut(&mut self) -> &mut Props {
        &mut self.props
    }
}

/// `(subject, relation, object)`, the unit of text-extracted knowledge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triplet {
    pub sub: String,
    pub rel: String,
    pub obj: String,
}

impl Triplet {
    pub fn new(sub: impl Into<String>, rel: impl Into<String>, obj: impl Into<String>) -> Self {
        Self {
            sub: sub.into(),
            rel: rel.into(),
            obj: obj.into(),
        }
    }
}

impl fmt::Display for Triplet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})-[{}]->({})", self.sub, self.rel, self.obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elem::props;

    #[test]
    fn empty_ids_are_rejected() {
        assert!(matches!(
            Vertex::new(""),
            Err(GraphError::InvalidArgument(_))
        ));
        assert!(Edge::new("a", "").is_err());
        assert!(Edge::new("", "b").is_err());
        assert!(serde_json::from_str::<Vertex>(r#"{"vid":""}"#).is_err());
    }

    #[test]
    fn nid_returns_other_endpoint() {
        let e = Edge::new("a", "b").unwrap();
        assert_eq!(e.nid("a").unwrap(), "b");
        assert_eq!(e.nid("b").unwrap(), "a");
        assert!(matches!(e.nid("c"), Err(GraphError::NotFound(_))));

        let loop_edge = Edge::new("a", "a").unwrap();
        assert_eq!(loop_edge.nid("a").unwrap(), "a");
    }

    #[test]
    fn edges_compare_by_value() {
        let e1 = Edge::labeled("x", "y", "r1").unwrap();
        let e2 = Edge::labeled("x", "y", "r1").unwrap();
        let e3 = Edge::labeled("x", "y", "r2").unwrap();
        assert_eq!(e1, e2);
        assert_ne!(e1, e3);

        let mut e4 = e1.clone();
        e4.set_prop("weight", 2i64);
        assert_ne!(e1, e4);
        e4.del_prop("weight");
        assert_eq!(e1, e4);
    }

    #[test]
    fn has_props_ignores_unlisted_keys() {
        let e = Edge::labeled("x", "y", "r1").unwrap().with_prop("w", 1i64);
        assert!(e.has_props(&props([("label", "r1")])));
        assert!(e.has_props(&Props::new()));
        assert!(!e.has_props(&props([("label", "r2")])));
        assert!(!e.has_props(&props([("missing", "r1")])));
    }

    #[test]
    fn triplet_inference() {
        let e = Edge::new("a", "b").unwrap().with_prop("rel", "0");
        assert_eq!(e.triplet(None).unwrap(), Triplet::new("a", "0", "b"));

        let multi = e.clone().with_prop("weight", 1.0);
        assert!(matches!(
            multi.triplet(None),
            Err(GraphError::InvalidArgument(_))
        ));
        assert_eq!(
            multi.triplet(Some("rel")).unwrap().to_string(),
            "(a)-[0]->(b)"
        );
        assert!(multi.triplet(Some("label")).is_err());
    }

    #[test]
    fn vertex_convenience_props() {
        let v = Vertex::new("v1")
            .unwrap()
            .with_name("Alice")
            .with_vertex_type("entity");
        assert_eq!(v.vid(), "v1");
        assert_eq!(v.name(), Some("Alice"));
        assert_eq!(v.vertex_type(), Some("entity"));
    }
}
