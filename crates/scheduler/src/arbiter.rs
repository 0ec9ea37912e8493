//! Per-component grant decisions.
//!
//! Every connected component of the relation graph gets its own arbiter.
//! Components share no conflicts, so each arbiter decides from its own
//! members' eligibility alone. Members are passed in global order, and
//! `eligible[k]` means member `k` requests and every resource it uses is
//! ready.

use crate::config::ArbiterPolicy;
use crate::graph::IndexGraph;

/// Decides the grants of one component for one cycle.
pub trait Arbiter: Send {
    fn policy(&self) -> ArbiterPolicy;

    /// Grant a subset of the eligible members, never two conflicting ones.
    fn arbitrate(&mut self, eligible: &[bool]) -> Vec<bool>;
}

/// Grants in global order: a member is granted when it is eligible and no
/// earlier conflicting member was granted.
///
/// Blocking follows conflict edges only, so non-conflicting members fire
/// together and the grant set is maximal.
#[derive(Debug, Clone)]
pub struct EagerArbiter {
    /// For each member, the earlier members it conflicts with.
    earlier: Vec<Vec<usize>>,
}

impl EagerArbiter {
    /// `members` are graph nodes in global order.
    pub fn new(members: &[usize], conflicts: &IndexGraph) -> Self {
        let earlier = members
            .iter()
            .enumerate()
            .map(|(k, &node)| {
                members[..k]
                    .iter()
                    .enumerate()
                    .filter(|&(_, &other)| conflicts.contains(node, other))
                    .map(|(j, _)| j)
                    .collect()
            })
            .collect();
        Self { earlier }
    }
}

impl Arbiter for EagerArbiter {
    fn policy(&self) -> ArbiterPolicy {
        ArbiterPolicy::Eager
    }

    fn arbitrate(&mut self, eligible: &[bool]) -> Vec<bool> {
        let mut grants = vec![false; self.earlier.len()];
        for (k, blockers) in self.earlier.iter().enumerate() {
            grants[k] = eligible[k] && blockers.iter().all(|&j| !grants[j]);
        }
        grants
    }
}

/// Grants at most one member per cycle, rotating fairly.
///
/// The pointer holds the last granted member; the next grant goes to the
/// first eligible member after it, wrapping. A cycle with nothing eligible
/// leaves the pointer in place.
#[derive(Debug, Clone)]
pub struct RoundRobinArbiter {
    len: usize,
    last: Option<usize>,
}

impl RoundRobinArbiter {
    pub fn new(len: usize) -> Self {
        Self { len, last: None }
    }

    /// Member granted most recently.
    pub fn last_granted(&self) -> Option<usize> {
        self.last
    }
}

impl Arbiter for RoundRobinArbiter {
    fn policy(&self) -> ArbiterPolicy {
        ArbiterPolicy::RoundRobin
    }

    fn arbitrate(&mut self, eligible: &[bool]) -> Vec<bool> {
        let mut grants = vec![false; self.len];
        let start = self.last.map_or(0, |last| last + 1);
        let winner = (0..self.len)
            .map(|offset| (start + offset) % self.len)
            .find(|&k| eligible[k]);
        if let Some(k) = winner {
            grants[k] = true;
            self.last = Some(k);
        }
        grants
    }
}
