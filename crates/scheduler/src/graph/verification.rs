//! Structural verification of built schedule graphs.

use thiserror::Error;

use crate::artifact::ScheduleArtifact;
use crate::builder::Declarations;
use crate::types::Entity;
use crate::usage::UsageMap;

use super::conflict::ScheduleGraphs;

/// A structural invariant a built schedule fails to uphold.
///
/// None of these can be produced by a correct build; they exist so a build
/// can check its own output before handing it out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleViolation {
    /// Two users of an exclusive resource are not marked as conflicting.
    #[error("{first} and {second} share exclusive {resource} without conflicting")]
    UnguardedResource {
        resource: String,
        first: String,
        second: String,
    },

    /// The global order places a deferred action before its preferred peer.
    #[error("{deferred} ordered before preferred {preferred}")]
    PriorityInverted { preferred: String, deferred: String },

    /// A conflict edge missing from the relation graph.
    #[error("conflict between {first} and {second} missing from relation graph")]
    ConflictOutsideRelations { first: String, second: String },

    /// An action absent from every component, or present in several.
    #[error("{action} appears in {count} components")]
    ComponentPartition { action: String, count: usize },
}

/// Check every structural invariant of a built schedule.
pub fn verify_schedule(artifact: &ScheduleArtifact) -> Result<(), ScheduleViolation> {
    check_invariants(artifact.declarations(), artifact.usage(), artifact.graphs())
}

pub(crate) fn check_invariants(
    decls: &Declarations,
    usage: &UsageMap,
    graphs: &ScheduleGraphs,
) -> Result<(), ScheduleViolation> {
    let name = |node: usize| decls.name(Entity::Action(graphs.action_at(node))).to_string();

    for resource in usage.resources() {
        if decls.resource(resource).spec.nonexclusive {
            continue;
        }
        let users: Vec<usize> = usage
            .actions_using(resource)
            .iter()
            .filter_map(|&a| graphs.node_of(a))
            .collect();
        for (i, &a) in users.iter().enumerate() {
            for &b in &users[i + 1..] {
                if !graphs.conflicts.contains(a, b) {
                    return Err(ScheduleViolation::UnguardedResource {
                        resource: decls.name(Entity::Resource(resource)).to_string(),
                        first: name(a),
                        second: name(b),
                    });
                }
            }
        }
    }

    for (preferred, deferred) in graphs.priorities.edges() {
        if graphs.position[preferred] >= graphs.position[deferred] {
            return Err(ScheduleViolation::PriorityInverted {
                preferred: name(preferred),
                deferred: name(deferred),
            });
        }
    }

    for (a, b) in graphs.conflicts.edges() {
        if !graphs.relations.contains(a, b) {
            return Err(ScheduleViolation::ConflictOutsideRelations {
                first: name(a),
                second: name(b),
            });
        }
    }

    let mut seen = vec![0usize; graphs.nodes.len()];
    for &node in graphs.components.iter().flatten() {
        seen[node] += 1;
    }
    if let Some((node, &count)) = seen.iter().enumerate().find(|(_, count)| **count != 1) {
        return Err(ScheduleViolation::ComponentPartition {
            action: name(node),
            count,
        });
    }

    Ok(())
}
