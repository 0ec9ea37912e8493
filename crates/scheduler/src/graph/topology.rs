//! Topological ordering and cycle detection.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use super::types::IndexGraph;

/// Error returned when a graph has no topological order.
///
/// `involved_nodes` lists every node that could not be ordered: the nodes on
/// a cycle and any node reachable only through one, ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleError {
    pub involved_nodes: Vec<usize>,
}

/// Order the nodes of a directed graph so every edge points forward, using
/// Kahn's algorithm.
///
/// Among nodes that are ready at the same time, the one with the smallest
/// `key` goes first, so the result is a deterministic function of the graph
/// and the keys.
pub fn topological_order<K, F>(graph: &IndexGraph, key: F) -> Result<Vec<usize>, CycleError>
where
    K: Ord,
    F: Fn(usize) -> K,
{
    let count = graph.node_count();
    let mut in_degree = vec![0usize; count];
    for (_, to) in graph.edges() {
        in_degree[to] += 1;
    }

    let mut ready: BinaryHeap<Reverse<(K, usize)>> = (0..count)
        .filter(|&node| in_degree[node] == 0)
        .map(|node| Reverse((key(node), node)))
        .collect();

    let mut order = Vec::with_capacity(count);
    while let Some(Reverse((_, node))) = ready.pop() {
        order.push(node);
        for next in graph.neighbors(node) {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.push(Reverse((key(next), next)));
            }
        }
    }

    if order.len() != count {
        let involved_nodes = (0..count).filter(|&node| in_degree[node] > 0).collect();
        return Err(CycleError { involved_nodes });
    }

    Ok(order)
}
