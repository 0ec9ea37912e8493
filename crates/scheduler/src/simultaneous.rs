//! Merging of simultaneity groups into synthetic actions.
//!
//! A declaration `[e1, e2, ...]` asks that its entities fire together. Each
//! entity stands for the actions using it, so one declaration expands into
//! the cartesian product of those alternatives. Alternatives of the same
//! declaration are mutually exclusive, and that declaration's conflict set
//! remembers them.
//!
//! Groups that share an action are united until nothing changes, except
//! that two groups sitting in a common conflict set are never united. Only
//! maximal groups survive. The work queue holds candidate pairs, so the
//! search is superlinear in the number of declared groups; universes are
//! fixed at build time and small enough in practice.
//!
//! A surviving group becomes one synthetic action. Each constituent turns
//! into a proxy resource that is ready when the constituent requests, keeps
//! the constituent's uses, and runs exactly when the constituent would have
//! been granted. The synthetic action calls every proxy of its group.

use std::collections::{BTreeSet, VecDeque};

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use strobe_foundation::{Layout, Record};

use crate::builder::{ActionDecl, Decl, Declarations, OutputSource, ResourceDecl, ResourceSpec};
use crate::types::{ActionId, CallSite, Condition, Entity, Operand, ResourceId};
use crate::usage::UsageMap;

/// A set of actions that fire together.
pub type Group = BTreeSet<ActionId>;

/// One synthetic action and the constituents it replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedGroup {
    pub action: ActionId,
    pub constituents: Vec<ActionId>,
}

/// Every combination picking one user per declared entity.
fn alternatives(group: &[Entity], usage: &UsageMap) -> IndexSet<Group> {
    let mut partial: Vec<Vec<ActionId>> = vec![Vec::new()];
    for &entity in group {
        let choices = usage.actions_for(entity);
        partial = partial
            .iter()
            .flat_map(|prefix| {
                choices.iter().map(move |&choice| {
                    let mut next = prefix.clone();
                    next.push(choice);
                    next
                })
            })
            .collect();
    }
    partial.into_iter().map(|picked| picked.into_iter().collect()).collect()
}

struct Merger {
    conflicts: Vec<IndexSet<Group>>,
    simultaneous: IndexSet<Group>,
}

impl Merger {
    fn conflicting(&self, a: &Group, b: &Group) -> bool {
        self.conflicts
            .iter()
            .any(|set| set.contains(a) && set.contains(b))
    }

    fn mergeable_pairs(&self, group: &Group) -> Vec<(Group, Group)> {
        self.simultaneous
            .iter()
            .filter(|other| !group.is_disjoint(other) && !self.conflicting(group, other))
            .map(|other| (group.clone(), other.clone()))
            .collect()
    }

    fn run(mut self) -> Vec<Group> {
        let mut queue: VecDeque<(Group, Group)> = VecDeque::new();
        for group in &self.simultaneous {
            queue.extend(self.mergeable_pairs(group));
        }

        while let Some((a, b)) = queue.pop_front() {
            let joined: Group = a.union(&b).copied().collect();
            if self.simultaneous.contains(&joined) {
                continue;
            }
            queue.extend(self.mergeable_pairs(&joined));
            self.simultaneous.insert(joined.clone());
            for set in &mut self.conflicts {
                if set.contains(&a) || set.contains(&b) {
                    set.insert(joined.clone());
                }
            }
        }

        let maximal = |group: &Group| {
            !self
                .simultaneous
                .iter()
                .any(|other| other != group && group.is_subset(other))
        };
        let mut groups: Vec<Group> = self.simultaneous.iter().filter(|g| maximal(g)).cloned().collect();
        groups.sort();
        groups
    }
}

/// Compute the maximal simultaneity groups of the declared universe.
///
/// Groups of a single action are dropped: firing alone already satisfies them.
pub(crate) fn merge_groups(decls: &Declarations, usage: &UsageMap) -> Vec<Group> {
    let declared = decls
        .resources
        .iter()
        .map(|r| &r.decl)
        .chain(decls.actions.iter().map(|a| &a.decl))
        .flat_map(|decl| decl.simultaneous.iter());

    let conflicts: Vec<IndexSet<Group>> = declared.map(|group| alternatives(group, usage)).collect();
    if conflicts.is_empty() {
        return Vec::new();
    }
    let simultaneous = conflicts.iter().flatten().cloned().collect();

    let mut groups = Merger {
        conflicts,
        simultaneous,
    }
    .run();
    groups.retain(|group| group.len() > 1);
    groups
}

/// Replace every group by a synthetic action calling one proxy per constituent.
pub(crate) fn absorb(decls: &mut Declarations, groups: &[Group]) -> Vec<MergedGroup> {
    let constituents: BTreeSet<ActionId> = groups.iter().flatten().copied().collect();
    let mut proxies: IndexMap<ActionId, ResourceId> = IndexMap::new();

    for action in constituents {
        let proxy = ResourceId(decls.resources.len());
        let source = &mut decls.actions[action.0];
        source.proxy = Some(proxy);
        let decl = Decl {
            name: source.decl.name.clone(),
            owner: source.decl.owner.clone(),
            def_order: source.decl.def_order,
            uses: std::mem::take(&mut source.decl.uses),
            relations: Vec::new(),
            simultaneous: Vec::new(),
        };
        let ready = source.request;
        decls.resources.push(ResourceDecl {
            decl,
            spec: ResourceSpec::new(Layout::empty(), Layout::empty()),
            ready,
            source: OutputSource::Zero,
            proxy_of: Some(action),
        });
        proxies.insert(action, proxy);
    }

    let mut merged = Vec::with_capacity(groups.len());
    for group in groups {
        let members: Vec<&ActionDecl> = group.iter().map(|&a| decls.action(a)).collect();
        let name = members
            .iter()
            .map(|a| a.decl.name.as_str())
            .collect::<Vec<_>>()
            .join("+");
        let owner = members[0].decl.owner.clone();
        let def_order = members.iter().filter_map(|a| a.decl.def_order).min();
        let uses = group
            .iter()
            .filter_map(|a| proxies.get(a))
            .map(|&proxy| {
                let site = CallSite {
                    arg: Operand::Const(Record::unit()),
                    enable: Condition::Always,
                };
                (proxy, site)
            })
            .collect();

        debug!(action = %name, members = group.len(), "merged simultaneous group");
        let action = ActionId(decls.actions.len());
        decls.actions.push(ActionDecl {
            decl: Decl {
                name,
                owner,
                def_order,
                uses,
                relations: Vec::new(),
                simultaneous: Vec::new(),
            },
            request: Condition::Always,
            proxy: None,
        });
        merged.push(MergedGroup {
            action,
            constituents: group.iter().copied().collect(),
        });
    }
    merged
}
