//! In-memory property graph with forward/backward adjacency indexes.

use crate::traversal::{bounded_search, interleave_unique, Neighborhood};
use indexmap::{IndexMap, IndexSet};
use kg_types::{Direction, Edge, Elem, GraphError, Props, Vertex};
use serde_json::json;
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt;

/// vid -> peer vid -> edges between the pair.
type Adjacency = IndexMap<String, IndexMap<String, IndexSet<Edge>>>;

/// In-memory graph.
///
/// `out_edges[s][t]` and `in_edges[t][s]` always hold the same edge set, both endpoints of
/// every edge exist in the vertex table, and `edge_count` equals the number of edges in
/// either index. Insertion order is kept so traversal output is deterministic.
///
/// No internal locking: callers serialize mutation (see `MemoryGraphStore`).
#[derive(Debug, Clone, Default)]
pub struct MemoryGraph {
    vertices: IndexMap<String, Vertex>,
    out_edges: Adjacency,
    in_edges: Adjacency,
    edge_count: usize,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Insert `vertex`, replacing any vertex with the same vid. Edges are untouched.
    pub fn upsert_vertex(&mut self, vertex: Vertex) {
        self.vertices.insert(vertex.vid().to_string(), vertex);
    }

    /// Append `edge` unless an equal edge already links the same pair.
    ///
    /// Missing endpoints are created as property-less vertices. Returns whether the edge
    /// was inserted.
    pub fn append_edge(&mut self, edge: Edge) -> bool {
        let exists = self
            .out_edges
            .get(edge.sid())
            .and_then(|peers| peers.get(edge.tid()))
            .is_some_and(|edges| edges.contains(&edge));
        if exists {
            return false;
        }

        for vertex in edge.endpoint_vertices() {
            if !self.vertices.contains_key(vertex.vid()) {
                self.upsert_vertex(vertex);
            }
        }

        self.out_edges
            .entry(edge.sid().to_string())
            .or_default()
            .entry(edge.tid().to_string())
            .or_default()
            .insert(edge.clone());
        self.in_edges
            .entry(edge.tid().to_string())
            .or_default()
            .entry(edge.sid().to_string())
            .or_default()
            .insert(edge);
        self.edge_count += 1;
        true
    }

    pub fn has_vertex(&self, vid: &str) -> bool {
        self.vertices.contains_key(vid)
    }

    pub fn get_vertex(&self, vid: &str) -> Result<&Vertex, GraphError> {
        self.vertices
            .get(vid)
            .ok_or_else(|| GraphError::NotFound(format!("vertex not found: {}", vid)))
    }

    /// Edges incident to `vid` in `direction`, at most `limit` of them.
    ///
    /// `Both` alternates between outgoing and incoming edges and drops duplicates, so a
    /// self-loop is reported once.
    pub fn get_neighbor_edges(
        &self,
        vid: &str,
        direction: Direction,
        limit: Option<usize>,
    ) -> Vec<&Edge> {
        let limit = limit.unwrap_or(usize::MAX);
        match direction {
            Direction::Out => adjacent(&self.out_edges, vid).take(limit).collect(),
            Direction::In => adjacent(&self.in_edges, vid).take(limit).collect(),
            Direction::Both => interleave_unique(
                adjacent(&self.out_edges, vid),
                adjacent(&self.in_edges, vid),
                Some(limit),
            ),
        }
    }

    /// Remove the given vertices together with every incident edge. Unknown vids are skipped.
    pub fn del_vertices<I, S>(&mut self, vids: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for vid in vids {
            let vid = vid.as_ref();
            self.del_neighbor_edges(vid, Direction::Both);
            self.vertices.shift_remove(vid);
        }
    }

    /// Remove edges `sid -> tid`: all of them when `expected` is empty, otherwise only those
    /// whose properties match. Returns the number removed.
    pub fn del_edges(&mut self, sid: &str, tid: &str, expected: &Props) -> usize {
        let removed = take_edges(&mut self.out_edges, sid, tid, expected);
        for edge in &removed {
            remove_mirror(&mut self.in_edges, tid, sid, edge);
        }
        self.edge_count -= removed.len();
        removed.len()
    }

    /// Remove every edge incident to `vid` in `direction`. Returns the number removed.
    pub fn del_neighbor_edges(&mut self, vid: &str, direction: Direction) -> usize {
        let mut removed = 0;
        if matches!(direction, Direction::Out | Direction::Both) {
            if let Some(peers) = self.out_edges.shift_remove(vid) {
                for (tid, edges) in peers {
                    for edge in &edges {
                        remove_mirror(&mut self.in_edges, &tid, vid, edge);
                    }
                    removed += edges.len();
                }
            }
        }
        if matches!(direction, Direction::In | Direction::Both) {
            if let Some(peers) = self.in_edges.shift_remove(vid) {
                for (sid, edges) in peers {
                    for edge in &edges {
                        remove_mirror(&mut self.out_edges, &sid, vid, edge);
                    }
                    removed += edges.len();
                }
            }
        }
        self.edge_count -= removed;
        removed
    }

    /// Clear all vertices and edges in place.
    pub fn truncate(&mut self) {
        self.vertices.clear();
        self.out_edges.clear();
        self.in_edges.clear();
        self.edge_count = 0;
    }

    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> + '_ {
        self.vertices.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> + '_ {
        self.out_edges
            .values()
            .flat_map(|peers| peers.values().flatten())
    }

    /// Merge `other` into this graph. Edges are deduplicated as in [`append_edge`];
    /// property-less vertices from `other` never overwrite an existing vertex.
    ///
    /// [`append_edge`]: MemoryGraph::append_edge
    pub fn upsert_graph(&mut self, other: &MemoryGraph) {
        for vertex in other.vertices() {
            if vertex.props().is_empty() && self.has_vertex(vertex.vid()) {
                continue;
            }
            self.upsert_vertex(vertex.clone());
        }
        for edge in other.edges() {
            self.append_edge(edge.clone());
        }
    }

    /// Bounded subgraph extraction from `vids`.
    ///
    /// Every seed is expanded depth-first with an explicit stack; the visited set is shared
    /// across seeds so overlapping traversals never revisit a vertex. Per vertex, neighbor
    /// edges are first truncated to `fan_limit`; then, before each edge, the result's edge
    /// count is checked against `result_limit` and the whole search stops once it is
    /// reached. A vertex at depth `depth_limit` is not visited. Unknown seeds contribute
    /// nothing.
    pub fn search<S: AsRef<str>>(
        &self,
        vids: &[S],
        direction: Direction,
        depth_limit: Option<usize>,
        fan_limit: Option<usize>,
        result_limit: Option<usize>,
    ) -> MemoryGraph {
        let subgraph = match bounded_search(
            self,
            vids,
            direction,
            depth_limit,
            fan_limit,
            result_limit,
        ) {
            Ok(subgraph) => subgraph,
            Err(never) => match never {},
        };

        tracing::trace!(
            seeds = vids.len(),
            vertices = subgraph.vertex_count(),
            edges = subgraph.edge_count(),
            "subgraph search finished"
        );
        subgraph
    }

    /// JSON description of the vertex and edge property names and their types.
    pub fn schema(&self) -> serde_json::Value {
        let describe = |columns: BTreeMap<&str, &str>| -> Vec<serde_json::Value> {
            columns
                .into_iter()
                .map(|(name, ty)| json!({ "name": name, "type": ty, "optional": true }))
                .collect()
        };

        let mut vertex_columns = BTreeMap::new();
        for vertex in self.vertices() {
            for (key, value) in vertex.props() {
                vertex_columns.insert(key.as_str(), value.type_name());
            }
        }
        let mut edge_columns = BTreeMap::new();
        for edge in self.edges() {
            for (key, value) in edge.props() {
                edge_columns.insert(key.as_str(), value.type_name());
            }
        }

        let mut vertex_properties =
            vec![json!({ "name": "id", "type": "STRING", "optional": false })];
        vertex_properties.extend(describe(vertex_columns));
        let mut edge_properties = vec![
            json!({ "name": "sid", "type": "STRING", "optional": false }),
            json!({ "name": "tid", "type": "STRING", "optional": false }),
        ];
        edge_properties.extend(describe(edge_columns));

        json!({
            "schema": [
                { "type": "VERTEX", "label": "vertex", "primary": "id", "properties": vertex_properties },
                { "type": "EDGE", "label": "edge", "properties": edge_properties },
            ]
        })
    }

    /// Graphviz DOT rendering.
    pub fn graphviz(&self, name: &str) -> String {
        let mut dot = format!("digraph {} {{\n", quote(name));
        for vertex in self.vertices() {
            let label = vertex.name().unwrap_or(vertex.vid());
            dot.push_str(&format!(
                "  {} [label={}];\n",
                quote(vertex.vid()),
                quote(label)
            ));
        }
        for edge in self.edges() {
            dot.push_str(&format!(
                "  {} -> {} [label={}];\n",
                quote(edge.sid()),
                quote(edge.tid()),
                quote(&format_props(edge.props()))
            ));
        }
        dot.push('}');
        dot
    }
}

impl Neighborhood for MemoryGraph {
    type Error = Infallible;

    fn vertex(&self, vid: &str) -> Result<Option<Vertex>, Infallible> {
        Ok(self.vertices.get(vid).cloned())
    }

    fn neighbor_edges(
        &self,
        vid: &str,
        direction: Direction,
        limit: Option<usize>,
    ) -> Result<Vec<Edge>, Infallible> {
        Ok(self
            .get_neighbor_edges(vid, direction, limit)
            .into_iter()
            .cloned()
            .collect())
    }
}

/// Text rendering used as prompt context: an `Entities:` block followed by a
/// `Relationships:` block. An empty graph renders as an empty string.
impl fmt::Display for MemoryGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        writeln!(f, "Entities:")?;
        for vertex in self.vertices() {
            writeln!(f, "({}{})", vertex.vid(), props_suffix(vertex.props()))?;
        }
        write!(f, "\nRelationships:")?;
        for edge in self.edges() {
            write!(
                f,
                "\n({})-[{}]->({})",
                edge.sid(),
                format_props(edge.props()),
                edge.tid()
            )?;
        }
        Ok(())
    }
}

fn adjacent<'a>(index: &'a Adjacency, vid: &str) -> impl Iterator<Item = &'a Edge> + 'a {
    index
        .get(vid)
        .into_iter()
        .flat_map(|peers| peers.values().flatten())
}

fn take_edges(index: &mut Adjacency, from: &str, to: &str, expected: &Props) -> Vec<Edge> {
    let Some(peers) = index.get_mut(from) else {
        return Vec::new();
    };
    let Some(edges) = peers.get_mut(to) else {
        return Vec::new();
    };
    let removed: Vec<Edge> = if expected.is_empty() {
        std::mem::take(edges).into_iter().collect()
    } else {
        let matching: Vec<Edge> = edges
            .iter()
            .filter(|edge| edge.has_props(expected))
            .cloned()
            .collect();
        for edge in &matching {
            edges.shift_remove(edge);
        }
        matching
    };
    if edges.is_empty() {
        peers.shift_remove(to);
    }
    if peers.is_empty() {
        index.shift_remove(from);
    }
    removed
}

fn remove_mirror(index: &mut Adjacency, from: &str, to: &str, edge: &Edge) {
    let Some(peers) = index.get_mut(from) else {
        return;
    };
    if let Some(edges) = peers.get_mut(to) {
        edges.shift_remove(edge);
        if edges.is_empty() {
            peers.shift_remove(to);
        }
    }
    if peers.is_empty() {
        index.shift_remove(from);
    }
}

fn format_props(props: &Props) -> String {
    props
        .iter()
        .map(|(k, v)| format!("{}:{}", k, v))
        .collect::<Vec<_>>()
        .join(",")
}

fn props_suffix(props: &Props) -> String {
    if props.is_empty() {
        String::new()
    } else {
        format!(":{{{}}}", format_props(props))
    }
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kg_types::props;

    fn edge(sid: &str, tid: &str, rel: &str) -> Edge {
        Edge::new(sid, tid).unwrap().with_prop("rel", rel)
    }

    /// A->A[0], A->A[1], A->B[2], B->C[3], B->D[4], C->D[5], B->E[6], F->E[7], E->F[8]
    fn seeded() -> MemoryGraph {
        let mut g = MemoryGraph::new();
        for (s, t, r) in [
            ("A", "A", "0"),
            ("A", "A", "1"),
            ("A", "B", "2"),
            ("B", "C", "3"),
            ("B", "D", "4"),
            ("C", "D", "5"),
            ("B", "E", "6"),
            ("F", "E", "7"),
            ("E", "F", "8"),
        ] {
            assert!(g.append_edge(edge(s, t, r)));
        }
        g
    }

    fn assert_mirrored(g: &MemoryGraph) {
        let mut forward = 0;
        for (sid, peers) in &g.out_edges {
            for (tid, edges) in peers {
                for e in edges {
                    assert!(g.in_edges[tid][sid].contains(e));
                    assert!(g.has_vertex(sid) && g.has_vertex(tid));
                    forward += 1;
                }
            }
        }
        let backward: usize = g
            .in_edges
            .values()
            .flat_map(|peers| peers.values())
            .map(|edges| edges.len())
            .sum();
        assert_eq!(forward, backward);
        assert_eq!(forward, g.edge_count());
        assert_eq!(g.edges().count(), g.edge_count());
    }

    #[test]
    fn append_edge_dedups_by_value() {
        let mut g = MemoryGraph::new();
        assert!(g.append_edge(Edge::labeled("X", "Y", "r1").unwrap()));
        assert!(!g.append_edge(Edge::labeled("X", "Y", "r1").unwrap()));
        assert_eq!(g.edge_count(), 1);
        assert!(g.append_edge(Edge::labeled("X", "Y", "r2").unwrap()));
        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.vertex_count(), 2);
        assert_mirrored(&g);
    }

    #[test]
    fn append_edge_creates_endpoints() {
        let mut g = MemoryGraph::new();
        g.append_edge(edge("S", "S", "loop"));
        assert_eq!(g.vertex_count(), 1);
        assert!(g.get_vertex("S").unwrap().props().is_empty());
        assert!(matches!(g.get_vertex("T"), Err(GraphError::NotFound(_))));
    }

    #[test]
    fn upsert_vertex_keeps_edges() {
        let mut g = seeded();
        g.upsert_vertex(Vertex::new("A").unwrap().with_name("alpha"));
        assert_eq!(g.get_vertex("A").unwrap().name(), Some("alpha"));
        assert_eq!(g.edge_count(), 9);
        assert_eq!(g.vertex_count(), 6);
    }

    #[test]
    fn neighbor_edges_by_direction() {
        let g = seeded();
        assert_eq!(g.get_neighbor_edges("B", Direction::Out, None).len(), 3);
        assert_eq!(g.get_neighbor_edges("B", Direction::In, None).len(), 1);
        assert_eq!(g.get_neighbor_edges("B", Direction::Both, None).len(), 4);
        assert_eq!(g.get_neighbor_edges("B", Direction::Both, Some(2)).len(), 2);
        // self-loops sit in both indexes but are reported once
        assert_eq!(g.get_neighbor_edges("A", Direction::Both, None).len(), 3);
        assert!(g.get_neighbor_edges("Z", Direction::Both, None).is_empty());

        let both = g.get_neighbor_edges("E", Direction::Both, None);
        assert_eq!(both[0], &edge("E", "F", "8"));
        assert_eq!(both[1], &edge("B", "E", "6"));
    }

    #[test]
    fn del_edges_with_and_without_props() {
        let mut g = seeded();
        assert_eq!(g.del_edges("A", "A", &props([("rel", "1")])), 1);
        assert_eq!(g.edge_count(), 8);
        assert_eq!(g.del_edges("A", "A", &props([("rel", "9")])), 0);
        assert_eq!(g.del_edges("A", "B", &Props::new()), 1);
        assert_eq!(g.del_edges("A", "B", &Props::new()), 0);
        assert_eq!(g.edge_count(), 7);
        assert_eq!(g.get_neighbor_edges("A", Direction::Out, None).len(), 1);
        assert!(g.has_vertex("B"));
        assert_mirrored(&g);
    }

    #[test]
    fn del_vertices_removes_incident_edges() {
        let mut g = seeded();
        g.del_vertices(["B", "missing"]);
        assert!(!g.has_vertex("B"));
        // A->B, B->C, B->D, B->E gone
        assert_eq!(g.edge_count(), 5);
        assert_eq!(g.vertex_count(), 5);
        assert_mirrored(&g);

        g.del_vertices(["A"]);
        assert_eq!(g.edge_count(), 3);
        assert_mirrored(&g);
    }

    #[test]
    fn del_neighbor_edges_per_direction() {
        let mut g = seeded();
        assert_eq!(g.del_neighbor_edges("E", Direction::In), 2);
        assert_eq!(g.edge_count(), 7);
        assert_mirrored(&g);
        assert_eq!(g.del_neighbor_edges("A", Direction::Both), 3);
        assert_eq!(g.edge_count(), 4);
        assert_mirrored(&g);
        assert_eq!(g.del_neighbor_edges("A", Direction::Out), 0);
    }

    #[test]
    fn truncate_clears_everything() {
        let mut g = seeded();
        g.truncate();
        assert_eq!(g.vertex_count(), 0);
        assert_eq!(g.edge_count(), 0);
        assert_eq!(g.edges().count(), 0);
        assert_eq!(g.to_string(), "");
    }

    #[test]
    fn search_out_depth_two_from_two_seeds() {
        let g = seeded();
        let sub = g.search(&["A", "B"], Direction::Out, Some(2), None, Some(10));
        let mut vids: Vec<&str> = sub.vertices().map(|v| v.vid()).collect();
        vids.sort();
        assert_eq!(vids, vec!["A", "B", "C", "D", "E"]);
        assert_eq!(sub.edge_count(), 6);
        assert!(!sub.edges().any(|e| e == &edge("C", "D", "5")));
    }

    #[test]
    fn search_unbounded_terminates_on_cycles() {
        let g = seeded();
        let sub = g.search(&["A"], Direction::Out, None, None, None);
        assert_eq!(sub.edge_count(), 9);
        let sub = g.search(&["F"], Direction::Both, None, None, None);
        assert_eq!(sub.vertex_count(), 6);
        assert_eq!(sub.edge_count(), 9);
    }

    #[test]
    fn search_missing_seed_is_empty() {
        let g = seeded();
        let sub = g.search(&["Z"], Direction::Out, None, None, None);
        assert_eq!(sub.vertex_count(), 0);
        assert_eq!(sub.edge_count(), 0);

        let sub = g.search(&["Z", "C"], Direction::Out, None, None, None);
        assert_eq!(sub.vertex_count(), 2);
        assert_eq!(sub.edge_count(), 1);
    }

    #[test]
    fn search_limits() {
        let g = seeded();
        let sub = g.search(&["B"], Direction::Both, None, None, Some(2));
        assert!(sub.edge_count() <= 2);

        let sub = g.search(&["B"], Direction::Out, Some(1), Some(1), None);
        assert_eq!(sub.edge_count(), 1);
        assert_eq!(sub.vertex_count(), 2);

        let sub = g.search(&["A"], Direction::Out, Some(0), None, None);
        assert!(sub.is_empty());
    }

    #[test]
    fn search_keeps_vertex_props() {
        let mut g = seeded();
        g.upsert_vertex(Vertex::new("C").unwrap().with_name("charlie"));
        let sub = g.search(&["B"], Direction::Out, Some(1), None, None);
        assert_eq!(sub.get_vertex("C").unwrap().name(), Some("charlie"));
    }

    #[test]
    fn upsert_graph_merges() {
        let mut g = MemoryGraph::new();
        g.upsert_vertex(Vertex::new("A").unwrap().with_name("alpha"));
        let other = seeded();
        g.upsert_graph(&other);
        assert_eq!(g.edge_count(), 9);
        assert_eq!(g.get_vertex("A").unwrap().name(), Some("alpha"));
        g.upsert_graph(&other);
        assert_eq!(g.edge_count(), 9);
    }

    #[test]
    fn renders_text_dot_and_schema() {
        let mut g = MemoryGraph::new();
        g.upsert_vertex(Vertex::new("A").unwrap().with_name("alpha"));
        g.append_edge(edge("A", "B", "knows"));
        assert_eq!(
            g.to_string(),
            "Entities:\n(A:{name:alpha})\n(B)\n\nRelationships:\n(A)-[rel:knows]->(B)"
        );

        let dot = g.graphviz("g");
        assert!(dot.starts_with("digraph \"g\" {"));
        assert!(dot.contains("\"A\" -> \"B\" [label=\"rel:knows\"];"));

        let schema = g.schema();
        assert_eq!(schema["schema"][0]["properties"][1]["name"], "name");
        assert_eq!(schema["schema"][1]["properties"][2]["name"], "rel");
        assert_eq!(schema["schema"][1]["properties"][2]["type"], "STRING");
    }

    #[test]
    fn identically_built_graphs_render_identically() {
        let build = || {
            let mut g = MemoryGraph::new();
            for i in 0..8 {
                g.append_edge(edge(&format!("X{}", i), &format!("Z{}", i), "r"));
            }
            g.append_edge(edge("Z3", "X0", "back"));
            g
        };
        let (a, b) = (build(), build());
        assert_eq!(a.to_string(), b.to_string());
        assert_eq!(a.graphviz("g"), b.graphviz("g"));

        let sids: Vec<_> = a.edges().map(|e| e.sid().to_string()).collect();
        assert_eq!(
            sids,
            vec!["X0", "X1", "X2", "X3", "X4", "X5", "X6", "X7", "Z3"]
        );

        let mut c = build();
        c.del_neighbor_edges("X2", Direction::Both);
        let mut d = build();
        d.del_edges("X2", "Z2", &Props::new());
        assert_eq!(c.to_string(), d.to_string());
    }

    #[test]
    fn overlapping_seeds_expand_each_vertex_once() {
        let g = seeded();
        let forward = g.search(&["A", "B"], Direction::Both, None, None, None);
        let backward = g.search(&["B", "A"], Direction::Both, None, None, None);
        for sub in [&forward, &backward] {
            assert_eq!(sub.vertex_count(), 6);
            assert_eq!(sub.edge_count(), 9);
            assert_mirrored(sub);
        }
        // an edge already taken from its far side adds no next hop
        let sub = g.search(&["E", "F"], Direction::Both, Some(1), None, None);
        assert_eq!(sub.edge_count(), 3);
        assert_eq!(sub.vertex_count(), 3);
        assert!(!sub.edges().any(|e| e.sid() == "B" && e.tid() == "C"));
    }
}
