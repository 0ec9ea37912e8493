//! Conflict, relation and priority graphs over the scheduled actions.

use indexmap::IndexSet;
use tracing::{debug, warn};

use crate::builder::Declarations;
use crate::error::{Error, Result};
use crate::types::{ActionId, Priority};
use crate::usage::UsageMap;

use super::topology::topological_order;
use super::types::IndexGraph;

/// The static graphs a schedule is derived from.
///
/// Graph nodes are positions in [`nodes`](Self::nodes); the global order and
/// the components refer to the same indices.
#[derive(Debug, Clone)]
pub struct ScheduleGraphs {
    /// Scheduled actions; a node index is a position in this set.
    pub nodes: IndexSet<ActionId>,
    /// Undirected: the two actions must never both be granted.
    pub conflicts: IndexGraph,
    /// Undirected: conflicts plus orderings, the basis of components.
    pub relations: IndexGraph,
    /// Directed: preferred action to deferred action.
    pub priorities: IndexGraph,
    /// Nodes in global order.
    pub sequence: Vec<usize>,
    /// Global order position of every node.
    pub position: Vec<usize>,
    /// Connected components of `relations`, members sorted by position,
    /// components sorted by their first member.
    pub components: Vec<Vec<usize>>,
}

impl ScheduleGraphs {
    /// Derive the graphs from declarations and the resolved usage map.
    pub(crate) fn build(decls: &Declarations, usage: &UsageMap) -> Result<Self> {
        let nodes: IndexSet<ActionId> = usage.actions().collect();
        let count = nodes.len();
        let mut conflicts = IndexGraph::with_nodes(count);
        let mut relations = IndexGraph::with_nodes(count);
        let mut priorities = IndexGraph::with_nodes(count);
        let node = |action: ActionId| nodes.get_index_of(&action);

        // Users of an exclusive resource exclude each other.
        for resource in usage.resources() {
            if decls.resource(resource).spec.nonexclusive {
                continue;
            }
            let users: Vec<usize> = usage.actions_using(resource).iter().filter_map(|&a| node(a)).collect();
            for (i, &a) in users.iter().enumerate() {
                for &b in &users[i + 1..] {
                    conflicts.add_undirected(a, b);
                    relations.add_undirected(a, b);
                }
            }
        }

        for relation in decls.relations() {
            if !relation.conflict {
                let (before, after) = (decls.decl(relation.start), decls.decl(relation.end));
                if let (Some(b), Some(a)) = (before.def_order, after.def_order)
                    && a < b
                {
                    return Err(Error::ScheduleOrder {
                        before: before.name.clone(),
                        after: after.name.clone(),
                    });
                }
            }

            let starts = usage.actions_for(decls.redirect(relation.start));
            let ends = usage.actions_for(decls.redirect(relation.end));
            for &s in &starts {
                for &e in &ends {
                    let (Some(sn), Some(en)) = (node(s), node(e)) else {
                        continue;
                    };
                    if sn == en {
                        warn!(
                            start = decls.name(relation.start),
                            end = decls.name(relation.end),
                            action = decls.name(s.into()),
                            "relation endpoints meet in one action, skipping"
                        );
                        continue;
                    }
                    relations.add_undirected(sn, en);
                    if relation.conflict {
                        conflicts.add_undirected(sn, en);
                    }
                    match relation.priority {
                        Priority::Left => priorities.add_edge(sn, en),
                        Priority::Right => priorities.add_edge(en, sn),
                        Priority::Undefined => {}
                    }
                }
            }
        }

        let def_order = |n: usize| decls.action(nodes[n]).decl.def_order.unwrap_or(u64::MAX);
        let sequence = topological_order(&priorities, |n| (def_order(n), nodes[n])).map_err(|cycle| {
            Error::PriorityCycle {
                actions: cycle
                    .involved_nodes
                    .iter()
                    .map(|&n| decls.action(nodes[n]).decl.name.clone())
                    .collect(),
            }
        })?;

        let mut position = vec![0; count];
        for (pos, &n) in sequence.iter().enumerate() {
            position[n] = pos;
        }

        let mut components = relations.components();
        for component in &mut components {
            component.sort_by_key(|&n| position[n]);
        }
        components.sort_by_key(|component| component.first().map(|&n| position[n]));

        debug!(
            actions = count,
            conflicts = conflicts.edge_count() / 2,
            priorities = priorities.edge_count(),
            components = components.len(),
            "schedule graphs built"
        );

        Ok(Self {
            nodes,
            conflicts,
            relations,
            priorities,
            sequence,
            position,
            components,
        })
    }

    /// Graph node of a scheduled action.
    pub fn node_of(&self, action: ActionId) -> Option<usize> {
        self.nodes.get_index_of(&action)
    }

    pub fn action_at(&self, node: usize) -> ActionId {
        self.nodes[node]
    }

    /// Scheduled actions in global order.
    pub fn ordered_actions(&self) -> impl Iterator<Item = ActionId> + '_ {
        self.sequence.iter().map(|&n| self.nodes[n])
    }

    pub fn conflicting(&self, a: ActionId, b: ActionId) -> bool {
        match (self.node_of(a), self.node_of(b)) {
            (Some(a), Some(b)) => self.conflicts.contains(a, b),
            _ => false,
        }
    }
}
