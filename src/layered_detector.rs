use std::collections::{BTreeSet, HashSet};

use crate::graph::{AdjacencyMaps, TransactionGraph};
use crate::ring::{Pattern, RawRing};
use crate::PipelineConfig;

/// Enumerates simple directed paths of `layered_min_edges..=layered_max_edges`
/// edges whose interior nodes all satisfy the intermediate predicate
/// (non-merchant, degree within `[layered_min_degree, layered_max_degree]`).
///
/// The predicate is checked on a node the moment it is about to gain a
/// second incident edge in the path (i.e. stop being the path's terminal
/// node), not against a fixed target length — the DFS explores every path
/// length in the range in one pass, so a node only ever needs to qualify at
/// the point it is actually used as a conduit.
pub fn detect_layered(
    graph: &TransactionGraph,
    adjacency: &AdjacencyMaps,
    config: &PipelineConfig,
) -> Vec<RawRing> {
    let mut out = Vec::new();
    let mut seen: HashSet<BTreeSet<String>> = HashSet::new();
    let nodes: Vec<String> = graph.nodes().cloned().collect();

    for start in &nodes {
        let mut path = vec![start.clone()];
        let mut on_path: HashSet<String> = HashSet::new();
        on_path.insert(start.clone());
        walk(graph, adjacency, &mut path, &mut on_path, &mut seen, &mut out, config);
    }

    out.sort_by(|a, b| a.members.iter().cmp(b.members.iter()));
    out
}

#[allow(clippy::too_many_arguments)]
fn walk(
    graph: &TransactionGraph,
    adjacency: &AdjacencyMaps,
    path: &mut Vec<String>,
    on_path: &mut HashSet<String>,
    seen: &mut HashSet<BTreeSet<String>>,
    out: &mut Vec<RawRing>,
    config: &PipelineConfig,
) {
    let edges_so_far = path.len() - 1;

    if edges_so_far >= config.layered_min_edges && edges_so_far <= config.layered_max_edges {
        let key: BTreeSet<String> = path.iter().cloned().collect();
        if seen.insert(key.clone()) {
            out.push(RawRing {
                members: key,
                pattern: Pattern::Layered,
                provisional_total_amount: None,
                provisional_transaction_count: None,
            });
        }
    }

    if edges_so_far >= config.layered_max_edges {
        return;
    }

    let current = path.last().unwrap().clone();
    if path.len() > 1 && !is_intermediate(&current, adjacency, config) {
        return;
    }

    for next in graph.simple_successors(&current) {
        if on_path.contains(next) {
            continue;
        }
        path.push(next.clone());
        on_path.insert(next.clone());
        walk(graph, adjacency, path, on_path, seen, out, config);
        path.pop();
        on_path.remove(next);
    }
}

fn is_intermediate(account: &str, adjacency: &AdjacencyMaps, config: &PipelineConfig) -> bool {
    let degree = adjacency.total_transactions(account);
    degree >= config.layered_min_degree
        && degree <= config.layered_max_degree
        && degree <= config.layered_merchant_threshold
}
