//! Adjacency structure over small integer node indices.

use std::collections::{BTreeSet, VecDeque};

use serde::Serialize;

/// A graph over nodes `0..node_count()`, stored as ordered adjacency sets.
///
/// The same type serves directed graphs ([`add_edge`](Self::add_edge)) and
/// undirected ones ([`add_undirected`](Self::add_undirected)); ordered sets
/// keep iteration deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexGraph {
    adjacency: Vec<BTreeSet<usize>>,
}

impl IndexGraph {
    /// Create a graph with `count` nodes and no edges.
    pub fn with_nodes(count: usize) -> Self {
        Self {
            adjacency: vec![BTreeSet::new(); count],
        }
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Number of stored (directed) adjacency entries.
    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(BTreeSet::len).sum()
    }

    /// Add a directed edge `from -> to`.
    pub fn add_edge(&mut self, from: usize, to: usize) {
        self.adjacency[from].insert(to);
    }

    /// Add an edge in both directions.
    pub fn add_undirected(&mut self, a: usize, b: usize) {
        self.adjacency[a].insert(b);
        self.adjacency[b].insert(a);
    }

    pub fn contains(&self, from: usize, to: usize) -> bool {
        self.adjacency
            .get(from)
            .is_some_and(|targets| targets.contains(&to))
    }

    pub fn neighbors(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        self.adjacency[node].iter().copied()
    }

    /// All stored edges as `(from, to)` pairs in node order.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.adjacency
            .iter()
            .enumerate()
            .flat_map(|(from, targets)| targets.iter().map(move |&to| (from, to)))
    }

    /// Connected components, treating every edge as undirected.
    ///
    /// Components are listed by their smallest node; nodes within a component
    /// are sorted ascending.
    pub fn components(&self) -> Vec<Vec<usize>> {
        let mut undirected = vec![BTreeSet::new(); self.node_count()];
        for (from, to) in self.edges() {
            undirected[from].insert(to);
            undirected[to].insert(from);
        }

        let mut seen = vec![false; self.node_count()];
        let mut components = Vec::new();
        for start in 0..self.node_count() {
            if seen[start] {
                continue;
            }
            seen[start] = true;
            let mut component = vec![start];
            let mut queue = VecDeque::from([start]);
            while let Some(node) = queue.pop_front() {
                for &next in &undirected[node] {
                    if !seen[next] {
                        seen[next] = true;
                        component.push(next);
                        queue.push_back(next);
                    }
                }
            }
            component.sort_unstable();
            components.push(component);
        }
        components
    }
}
