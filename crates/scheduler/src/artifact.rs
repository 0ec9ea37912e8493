//! The built schedule and its per-cycle evaluation.

use serde::Serialize;
use tracing::{debug, info, instrument, trace};

use strobe_foundation::{Path, Record};

use crate::arbiter::Arbiter;
use crate::builder::Declarations;
use crate::config::{ArbiterPolicy, SchedulerConfig};
use crate::error::{Error, Result};
use crate::frame::Frame;
use crate::graph::{check_invariants, ScheduleGraphs};
use crate::router::{Caller, RoutePlan};
use crate::simultaneous::{absorb, merge_groups, MergedGroup};
use crate::types::{ActionId, Entity, ResourceId};
use crate::usage::UsageMap;

struct Component {
    /// Graph nodes in global order.
    members: Vec<usize>,
    arbiter: Box<dyn Arbiter>,
}

/// A frozen universe with its graphs, arbiters and routing.
///
/// Stepping never fails: every error is caught while building.
pub struct ScheduleArtifact {
    decls: Declarations,
    usage: UsageMap,
    graphs: ScheduleGraphs,
    plan: RoutePlan,
    components: Vec<Component>,
    merged: Vec<MergedGroup>,
    /// Arena sizes before merging; larger ids are internal.
    user_actions: usize,
    user_resources: usize,
    cycle: u64,
}

impl ScheduleArtifact {
    #[instrument(skip_all, name = "build")]
    pub(crate) fn build(mut decls: Declarations, config: &SchedulerConfig) -> Result<Self> {
        if let Some(action) = decls.actions.iter().find(|a| !a.decl.defined()) {
            return Err(Error::UndefinedAction(action.decl.name.clone()));
        }
        let user_actions = decls.actions.len();
        let user_resources = decls.resources.len();

        let declared = UsageMap::build(&decls, &decls.scheduled_actions())?;
        let groups = merge_groups(&decls, &declared);
        let merged = absorb(&mut decls, &groups);

        let scheduled = decls.scheduled_actions();
        let usage = UsageMap::build(&decls, &scheduled)?;
        let graphs = ScheduleGraphs::build(&decls, &usage)?;
        check_invariants(&decls, &usage, &graphs)?;
        let plan = RoutePlan::build(&decls, &usage)?;

        let mut artifact = Self {
            decls,
            usage,
            graphs,
            plan,
            components: Vec::new(),
            merged,
            user_actions,
            user_resources,
            cycle: 0,
        };
        artifact.components = artifact
            .graphs
            .components
            .iter()
            .map(|members| {
                let names = members
                    .iter()
                    .flat_map(|&node| artifact.names_behind(artifact.graphs.action_at(node)));
                let policy = config.policy_for(names);
                Component {
                    members: members.clone(),
                    arbiter: policy.instantiate(members, &artifact.graphs.conflicts),
                }
            })
            .collect();

        debug!(order = ?artifact.order_names(), "global order");
        info!(
            actions = scheduled.len(),
            resources = artifact.usage.resources().count(),
            components = artifact.components.len(),
            merged = artifact.merged.len(),
            "schedule built"
        );
        Ok(artifact)
    }

    /// Names that select an action's component policy: its own, and those
    /// of the constituents it absorbed.
    fn names_behind(&self, action: ActionId) -> Vec<&str> {
        let mut names = vec![self.decls.name(action.into())];
        if let Some(group) = self.merged.iter().find(|g| g.action == action) {
            names.extend(group.constituents.iter().map(|&a| self.decls.name(a.into())));
        }
        names
    }

    /// A zeroed frame for this schedule's signals.
    pub fn frame(&self) -> Frame {
        Frame::new(self.decls.signals.iter().map(|s| s.layout.clone()).collect())
    }

    /// Number of cycles stepped so far.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Arbitrate and route one cycle.
    #[instrument(skip_all, name = "cycle", fields(cycle = self.cycle))]
    pub fn step(&mut self, frame: &Frame) -> CycleReport {
        let (user_actions, user_resources) = (self.user_actions, self.user_resources);
        let cycle = self.cycle;
        let Self {
            decls,
            usage,
            graphs,
            plan,
            components,
            ..
        } = self;

        let mut grants = vec![false; decls.actions.len()];
        for component in components.iter_mut() {
            let eligible: Vec<bool> = component
                .members
                .iter()
                .map(|&node| eligible(decls, usage, frame, graphs.action_at(node)))
                .collect();
            let granted = component.arbiter.arbitrate(&eligible);
            for (&node, grant) in component.members.iter().zip(granted) {
                grants[graphs.action_at(node).0] = grant;
            }
        }

        let rank = |caller: Caller, grants: &[bool]| match caller {
            Caller::Action(action) => graphs.node_of(action).map_or(usize::MAX, |n| graphs.position[n]),
            Caller::Resource(resource) => usage
                .actions_using(resource)
                .iter()
                .filter(|a| grants[a.0])
                .filter_map(|&a| graphs.node_of(a))
                .map(|n| graphs.position[n])
                .min()
                .unwrap_or(usize::MAX),
        };
        let mut routing = plan.route(decls, frame, &mut grants, rank);

        // hide proxies behind the actions they stand for
        let callers = routing
            .callers
            .drain(..user_resources)
            .map(|list| {
                list.into_iter()
                    .map(|caller| match caller {
                        Caller::Resource(r) => decls.resource(r).proxy_of.map_or(caller, Caller::Action),
                        Caller::Action(_) => caller,
                    })
                    .collect()
            })
            .collect();
        grants.truncate(user_actions);
        routing.run.truncate(user_resources);
        routing.input.truncate(user_resources);
        routing.output.truncate(user_resources);

        let report = CycleReport {
            cycle,
            grants,
            run: routing.run,
            input: routing.input,
            output: routing.output,
            callers,
        };
        trace!(granted = ?report.granted_actions(), "cycle arbitrated");
        self.cycle += 1;
        report
    }

    /// Scheduled actions in global order.
    pub fn order(&self) -> Vec<ActionId> {
        self.graphs.ordered_actions().collect()
    }

    fn order_names(&self) -> Vec<&str> {
        self.graphs
            .ordered_actions()
            .map(|a| self.decls.name(a.into()))
            .collect()
    }

    /// The scheduled action deciding `action`'s grant: itself, or the
    /// synthetic action that absorbed it.
    pub fn representative(&self, action: ActionId) -> Option<ActionId> {
        if self.usage.contains(action) {
            return Some(action);
        }
        self.merged
            .iter()
            .find(|group| group.constituents.contains(&action))
            .map(|group| group.action)
    }

    /// Global order position of the action deciding `action`'s grant.
    pub fn position(&self, action: ActionId) -> Option<usize> {
        let node = self.graphs.node_of(self.representative(action)?)?;
        Some(self.graphs.position[node])
    }

    /// True when the two actions can never be granted in the same cycle.
    pub fn conflicts(&self, a: ActionId, b: ActionId) -> bool {
        match (self.representative(a), self.representative(b)) {
            (Some(a), Some(b)) => self.graphs.conflicting(a, b),
            _ => false,
        }
    }

    /// Connected components, members in global order.
    pub fn components(&self) -> Vec<Vec<ActionId>> {
        self.components
            .iter()
            .map(|c| c.members.iter().map(|&n| self.graphs.action_at(n)).collect())
            .collect()
    }

    pub fn component_policies(&self) -> Vec<ArbiterPolicy> {
        self.components.iter().map(|c| c.arbiter.policy()).collect()
    }

    pub fn resources_used_by(&self, action: ActionId) -> &[ResourceId] {
        self.usage.resources_for(action)
    }

    pub fn actions_using(&self, resource: ResourceId) -> &[ActionId] {
        self.usage.actions_using(resource)
    }

    pub fn merged_groups(&self) -> &[MergedGroup] {
        &self.merged
    }

    pub fn name_of(&self, entity: impl Into<Entity>) -> &str {
        self.decls.name(entity.into())
    }

    /// Module that declared `entity`. A merged action belongs to the owner
    /// of its first constituent.
    pub fn owner_of(&self, entity: impl Into<Entity>) -> &Path {
        &self.decls.decl(entity.into()).owner
    }

    pub fn usage(&self) -> &UsageMap {
        &self.usage
    }

    pub fn graphs(&self) -> &ScheduleGraphs {
        &self.graphs
    }

    pub(crate) fn declarations(&self) -> &Declarations {
        &self.decls
    }

    /// Names-only view of the computed schedule.
    pub fn summary(&self) -> ScheduleSummary {
        let name = |node: usize| self.decls.name(self.graphs.action_at(node).into()).to_string();
        let position = &self.graphs.position;

        let mut pairs: Vec<(usize, usize)> = self
            .graphs
            .conflicts
            .edges()
            .filter(|&(a, b)| position[a] < position[b])
            .collect();
        pairs.sort_by_key(|&(a, b)| (position[a], position[b]));

        ScheduleSummary {
            order: self.order_names().into_iter().map(str::to_string).collect(),
            components: self
                .components
                .iter()
                .map(|c| ComponentSummary {
                    policy: c.arbiter.policy(),
                    actions: c.members.iter().map(|&n| name(n)).collect(),
                })
                .collect(),
            conflicts: pairs.into_iter().map(|(a, b)| (name(a), name(b))).collect(),
            merged: self
                .merged
                .iter()
                .map(|g| MergedSummary {
                    action: self.decls.name(g.action.into()).to_string(),
                    constituents: g
                        .constituents
                        .iter()
                        .map(|&a| self.decls.name(a.into()).to_string())
                        .collect(),
                })
                .collect(),
        }
    }
}

/// An action may fire when it requests and every resource it uses is ready.
fn eligible(decls: &Declarations, usage: &UsageMap, frame: &Frame, action: ActionId) -> bool {
    frame.holds(decls.action(action).request)
        && usage
            .resources_for(action)
            .iter()
            .all(|&r| frame.holds(decls.resource(r).ready))
}

/// Outcome of one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    cycle: u64,
    grants: Vec<bool>,
    run: Vec<bool>,
    input: Vec<Record>,
    output: Vec<Record>,
    callers: Vec<Vec<Caller>>,
}

impl CycleReport {
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn granted(&self, action: ActionId) -> bool {
        self.grants.get(action.0).copied().unwrap_or(false)
    }

    pub fn ran(&self, resource: ResourceId) -> bool {
        self.run.get(resource.0).copied().unwrap_or(false)
    }

    /// Effective input of a resource this cycle.
    pub fn input(&self, resource: ResourceId) -> Option<&Record> {
        self.input.get(resource.0)
    }

    /// Output of a resource, as every caller observes it.
    pub fn output(&self, resource: ResourceId) -> Option<&Record> {
        self.output.get(resource.0)
    }

    /// Active callers whose call was enabled.
    pub fn callers(&self, resource: ResourceId) -> &[Caller] {
        self.callers.get(resource.0).map_or(&[], Vec::as_slice)
    }

    pub fn granted_actions(&self) -> Vec<ActionId> {
        self.grants
            .iter()
            .enumerate()
            .filter(|&(_, &granted)| granted)
            .map(|(index, _)| ActionId(index))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleSummary {
    pub order: Vec<String>,
    pub components: Vec<ComponentSummary>,
    /// Conflicting pairs, earlier action first.
    pub conflicts: Vec<(String, String)>,
    pub merged: Vec<MergedSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentSummary {
    pub policy: ArbiterPolicy,
    pub actions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedSummary {
    pub action: String,
    pub constituents: Vec<String>,
}
