//! Community detection over a [`MemoryGraph`].

use indexmap::IndexMap;
use kg_graph::{Elem, MemoryGraph, Vertex};
use serde::Serialize;
use std::collections::HashMap;

/// Property holding the community an entity was assigned to.
pub const COMMUNITY_ID_KEY: &str = "community_id";

/// A detected community: its member subgraph and the stored summary, if any.
#[derive(Debug, Clone, Serialize)]
pub struct Community {
    pub id: String,
    pub summary: Option<String>,
    #[serde(skip)]
    pub graph: MemoryGraph,
}

impl Community {
    /// Vids of the member vertices, in graph order.
    pub fn members(&self) -> Vec<&str> {
        self.graph.vertices().map(|v| v.vid()).collect()
    }
}

struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<usize>,
}

impl UnionFind {
    fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
            rank: vec![0; size],
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        let mut root = i;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        // path compression
        while self.parent[i] != root {
            let next = self.parent[i];
            self.parent[i] = root;
            i = next;
        }
        root
    }

    fn union(&mut self, i: usize, j: usize) {
        let root_i = self.find(i);
        let root_j = self.find(j);
        if root_i == root_j {
            return;
        }
        match self.rank[root_i].cmp(&self.rank[root_j]) {
            std::cmp::Ordering::Less => self.parent[root_i] = root_j,
            std::cmp::Ordering::Greater => self.parent[root_j] = root_i,
            std::cmp::Ordering::Equal => {
                self.parent[root_j] = root_i;
                self.rank[root_i] += 1;
            }
        }
    }
}

/// Weakly connected components of the vertices whose `vertex_type` equals `vertex_type`
/// (all vertices when `None`). Edge direction is ignored and only edges between two
/// selected vertices connect them.
///
/// Components come out in the order their first member appears in `graph`, members in
/// graph order, so repeated runs over the same graph agree.
pub fn weakly_connected_components(
    graph: &MemoryGraph,
    vertex_type: Option<&str>,
) -> Vec<Vec<String>> {
    let selected: Vec<&str> = graph
        .vertices()
        .filter(|v| vertex_type.is_none() || v.vertex_type() == vertex_type)
        .map(|v| v.vid())
        .collect();
    let index: HashMap<&str, usize> = selected
        .iter()
        .enumerate()
        .map(|(i, vid)| (*vid, i))
        .collect();

    let mut uf = UnionFind::new(selected.len());
    for edge in graph.edges() {
        if let (Some(&s), Some(&t)) = (index.get(edge.sid()), index.get(edge.tid())) {
            uf.union(s, t);
        }
    }

    let mut slot_of_root: HashMap<usize, usize> = HashMap::new();
    let mut components: Vec<Vec<String>> = Vec::new();
    for (i, vid) in selected.iter().enumerate() {
        let root = uf.find(i);
        let slot = *slot_of_root.entry(root).or_insert_with(|| {
            components.push(Vec::new());
            components.len() - 1
        });
        components[slot].push(vid.to_string());
    }
    components
}

fn community_of(vertex: &Vertex) -> Option<&str> {
    vertex.get_prop(COMMUNITY_ID_KEY).and_then(|v| v.as_str())
}

/// Subgraph of `graph` made of the vertices tagged with `community_id` and the edges
/// between them.
pub fn community_subgraph(graph: &MemoryGraph, community_id: &str) -> MemoryGraph {
    let mut subgraph = MemoryGraph::new();
    for vertex in graph.vertices() {
        if community_of(vertex) == Some(community_id) {
            subgraph.upsert_vertex(vertex.clone());
        }
    }
    for edge in graph.edges() {
        if subgraph.has_vertex(edge.sid()) && subgraph.has_vertex(edge.tid()) {
            subgraph.append_edge(edge.clone());
        }
    }
    subgraph
}

/// Every community's subgraph, built in one pass over `graph`, keyed by community id in
/// order of first appearance.
pub fn community_subgraphs(graph: &MemoryGraph) -> IndexMap<String, MemoryGraph> {
    let mut communities: IndexMap<String, MemoryGraph> = IndexMap::new();
    let mut membership: HashMap<&str, &str> = HashMap::new();
    for vertex in graph.vertices() {
        if let Some(id) = community_of(vertex) {
            communities
                .entry(id.to_string())
                .or_default()
                .upsert_vertex(vertex.clone());
            membership.insert(vertex.vid(), id);
        }
    }
    for edge in graph.edges() {
        let (Some(s), Some(t)) = (membership.get(edge.sid()), membership.get(edge.tid())) else {
            continue;
        };
        if s == t {
            if let Some(subgraph) = communities.get_mut(*s) {
                subgraph.append_edge(edge.clone());
            }
        }
    }
    communities
}
