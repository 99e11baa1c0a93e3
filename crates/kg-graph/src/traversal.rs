//! Bounded multi-seed traversal shared by every backend.

use crate::graph::MemoryGraph;
use indexmap::IndexSet;
use kg_types::{Direction, Edge, Vertex};
use std::collections::HashSet;
use std::hash::Hash;

/// Read access to vertices and their incident edges.
pub(crate) trait Neighborhood {
    type Error;

    fn vertex(&self, vid: &str) -> Result<Option<Vertex>, Self::Error>;

    fn neighbor_edges(
        &self,
        vid: &str,
        direction: Direction,
        limit: Option<usize>,
    ) -> Result<Vec<Edge>, Self::Error>;
}

/// Alternate items from `first` and `second`, dropping repeats, until `limit` is reached.
pub(crate) fn interleave_unique<T, A, B>(first: A, second: B, limit: Option<usize>) -> Vec<T>
where
    T: Eq + Hash + Clone,
    A: IntoIterator<Item = T>,
    B: IntoIterator<Item = T>,
{
    let limit = limit.unwrap_or(usize::MAX);
    let mut first = first.into_iter().fuse();
    let mut second = second.into_iter().fuse();
    let mut seen = HashSet::new();
    let mut result = Vec::new();
    while result.len() < limit {
        let (a, b) = (first.next(), second.next());
        if a.is_none() && b.is_none() {
            break;
        }
        for item in [a, b].into_iter().flatten() {
            if result.len() < limit && seen.insert(item.clone()) {
                result.push(item);
            }
        }
    }
    result
}

/// Depth-first expansion of every seed with an explicit stack and a visited set shared
/// across seeds.
///
/// `fan_limit` truncates each vertex's neighbor edges before anything is inserted;
/// `result_limit` is checked before each edge and ends the whole traversal once reached.
pub(crate) fn bounded_search<N, S>(
    source: &N,
    seeds: &[S],
    direction: Direction,
    depth_limit: Option<usize>,
    fan_limit: Option<usize>,
    result_limit: Option<usize>,
) -> Result<MemoryGraph, N::Error>
where
    N: Neighborhood + ?Sized,
    S: AsRef<str>,
{
    let mut subgraph = MemoryGraph::new();
    let mut visited: HashSet<String> = HashSet::new();

    'seeds: for seed in seeds {
        let mut stack: Vec<(String, usize)> = vec![(seed.as_ref().to_string(), 0)];
        while let Some((vid, depth)) = stack.pop() {
            if visited.contains(&vid) || depth_limit.is_some_and(|max| depth >= max) {
                continue;
            }
            let Some(vertex) = source.vertex(&vid)? else {
                continue;
            };
            subgraph.upsert_vertex(vertex);
            visited.insert(vid.clone());

            let mut next_hops: IndexSet<String> = IndexSet::new();
            for edge in source.neighbor_edges(&vid, direction, fan_limit)? {
                if result_limit.is_some_and(|max| subgraph.edge_count() >= max) {
                    break 'seeds;
                }
                let Ok(nid) = edge.nid(&vid) else {
                    continue;
                };
                let nid = nid.to_string();
                if !subgraph.has_vertex(&nid) {
                    if let Some(neighbor) = source.vertex(&nid)? {
                        subgraph.upsert_vertex(neighbor);
                    }
                }
                if subgraph.append_edge(edge) && !visited.contains(&nid) {
                    next_hops.insert(nid);
                }
            }
            for nid in next_hops.into_iter().rev() {
                stack.push((nid, depth + 1));
            }
        }
    }

    Ok(subgraph)
}
