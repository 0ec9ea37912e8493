//! Resource admission and data routing.
//!
//! For every resource the router collects its callers: scheduled actions
//! and other resources whose bodies call it. Each cycle a resource runs when
//! some active caller enables its call, where an action is active when
//! granted and a resource when it runs. Exclusive resources take their
//! input from the active caller; nonexclusive ones merge the enabled calls
//! through their [`Combiner`] and hand the single output to every caller.
//!
//! Resources are evaluated in a fixed order computed at build time: callers
//! before callees, and any resource whose input or output feeds a call
//! argument before the resource receiving it.

use std::fmt;
use std::sync::Arc;

use strobe_foundation::Record;
use tracing::debug;

use crate::builder::{Declarations, OutputSource};
use crate::error::{Error, Result};
use crate::frame::Frame;
use crate::graph::{topological_order, IndexGraph};
use crate::types::{ActionId, CallSite, Operand, ResourceId};
use crate::usage::UsageMap;

/// One enabled call presented to a combiner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallArg {
    /// Global order position of the calling action; lower goes first.
    pub order: usize,
    pub value: Record,
}

/// Reduction merging simultaneous calls of a nonexclusive resource.
///
/// Every built-in strategy breaks ties toward the lowest order, so the
/// effective input never depends on evaluation order.
#[derive(Clone, Default)]
pub enum Combiner {
    /// The call of the earliest caller in global order.
    #[default]
    First,
    /// The smallest argument.
    Min,
    /// The largest argument.
    Max,
    /// Caller-supplied reduction over the calls, sorted by order. Never
    /// invoked with an empty slice.
    Custom(Arc<dyn Fn(&[CallArg]) -> Record + Send + Sync>),
}

impl Combiner {
    pub fn custom(f: impl Fn(&[CallArg]) -> Record + Send + Sync + 'static) -> Self {
        Combiner::Custom(Arc::new(f))
    }

    /// Merge `args`, or `None` when nobody calls.
    pub fn combine(&self, args: &[CallArg]) -> Option<Record> {
        let picked = match self {
            Combiner::First => args.iter().min_by_key(|arg| arg.order),
            Combiner::Min => args
                .iter()
                .min_by(|a, b| a.value.cmp(&b.value).then(a.order.cmp(&b.order))),
            Combiner::Max => args
                .iter()
                .max_by(|a, b| a.value.cmp(&b.value).then(b.order.cmp(&a.order))),
            Combiner::Custom(f) => {
                if args.is_empty() {
                    return None;
                }
                let mut sorted = args.to_vec();
                sorted.sort_by_key(|arg| arg.order);
                return Some(f(&sorted));
            }
        };
        picked.map(|arg| arg.value.clone())
    }
}

impl fmt::Debug for Combiner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Combiner::First => write!(f, "First"),
            Combiner::Min => write!(f, "Min"),
            Combiner::Max => write!(f, "Max"),
            Combiner::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Who issues a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Caller {
    Action(ActionId),
    Resource(ResourceId),
}

/// One evaluation step of the routing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    /// Decide `run` and the effective input.
    Input(ResourceId),
    /// Compute the output from the effective input.
    Output(ResourceId),
}

/// Per-cycle routing result.
#[derive(Debug, Clone, Default)]
pub(crate) struct Routing {
    pub run: Vec<bool>,
    pub input: Vec<Record>,
    pub output: Vec<Record>,
    /// Active callers with their enable high, per resource.
    pub callers: Vec<Vec<Caller>>,
}

/// Static routing structure of a build.
#[derive(Debug, Clone)]
pub(crate) struct RoutePlan {
    callers: Vec<Vec<(Caller, CallSite)>>,
    order: Vec<Step>,
}

impl RoutePlan {
    /// Collect callers and fix the evaluation order.
    ///
    /// Fails with [`Error::CombinationalLoop`] when call arguments depend on
    /// each other in a cycle.
    pub fn build(decls: &Declarations, usage: &UsageMap) -> Result<Self> {
        let count = decls.resources.len();
        // resources no scheduled action reaches never run and take no part
        let mut reached = vec![false; count];
        for resource in usage.resources() {
            reached[resource.0] = true;
        }

        let mut callers: Vec<Vec<(Caller, CallSite)>> = vec![Vec::new(); count];
        for action in usage.actions() {
            for (&resource, site) in &decls.action(action).decl.uses {
                callers[resource.0].push((Caller::Action(action), site.clone()));
            }
        }
        for (index, resource) in decls.resources.iter().enumerate() {
            if !reached[index] {
                continue;
            }
            for (&callee, site) in &resource.decl.uses {
                callers[callee.0].push((Caller::Resource(ResourceId(index)), site.clone()));
            }
        }

        let input = |r: ResourceId| 2 * r.0;
        let output = |r: ResourceId| 2 * r.0 + 1;
        let mut deps = IndexGraph::with_nodes(2 * count);
        for (index, resource) in decls.resources.iter().enumerate() {
            let id = ResourceId(index);
            deps.add_edge(input(id), output(id));
            if !reached[index] {
                continue;
            }
            if let OutputSource::Forward(target) = resource.source {
                deps.add_edge(output(target), output(id));
            }
            for (caller, site) in &callers[index] {
                if let Caller::Resource(source) = caller {
                    deps.add_edge(input(*source), input(id));
                }
                match site.arg {
                    Operand::Output(source) => deps.add_edge(output(source), input(id)),
                    Operand::Input(source) => deps.add_edge(input(source), input(id)),
                    Operand::Const(_) | Operand::Signal(_) => {}
                }
            }
        }

        let order = topological_order(&deps, |node| node).map_err(|cycle| {
            let mut resources: Vec<String> = cycle
                .involved_nodes
                .iter()
                .map(|&node| decls.resource(ResourceId(node / 2)).decl.name.clone())
                .collect();
            resources.dedup();
            Error::CombinationalLoop { resources }
        })?;
        let order: Vec<Step> = order
            .into_iter()
            .map(|node| {
                let resource = ResourceId(node / 2);
                if node % 2 == 0 {
                    Step::Input(resource)
                } else {
                    Step::Output(resource)
                }
            })
            .collect();
        debug!(steps = order.len(), "route plan ready");

        Ok(Self { callers, order })
    }

    pub fn callers(&self, resource: ResourceId) -> &[(Caller, CallSite)] {
        &self.callers[resource.0]
    }

    /// Route one cycle.
    ///
    /// `grants` holds the grant of every action and receives the grants of
    /// absorbed constituents as their proxies run. `rank` gives the combiner
    /// order of an active caller.
    pub fn route(
        &self,
        decls: &Declarations,
        frame: &Frame,
        grants: &mut [bool],
        rank: impl Fn(Caller, &[bool]) -> usize,
    ) -> Routing {
        let count = decls.resources.len();
        let mut routing = Routing {
            run: vec![false; count],
            input: decls.resources.iter().map(|r| r.spec.input.zero()).collect(),
            output: decls.resources.iter().map(|r| r.spec.output.zero()).collect(),
            callers: vec![Vec::new(); count],
        };

        for &step in &self.order {
            match step {
                Step::Input(id) => {
                    let resource = decls.resource(id);
                    let mut first_active = None;
                    let mut calls = Vec::new();
                    for (caller, site) in &self.callers[id.0] {
                        let active = match *caller {
                            Caller::Action(action) => grants[action.0],
                            Caller::Resource(source) => routing.run[source.0],
                        };
                        if !active {
                            continue;
                        }
                        first_active.get_or_insert(site);
                        if frame.holds(site.enable) {
                            routing.callers[id.0].push(*caller);
                            calls.push(CallArg {
                                order: rank(*caller, &*grants),
                                value: evaluate(&site.arg, frame, &routing),
                            });
                        }
                    }

                    let value = if resource.spec.nonexclusive {
                        let combiner = resource.spec.combiner.clone().unwrap_or_default();
                        combiner.combine(&calls)
                    } else {
                        first_active.map(|site| evaluate(&site.arg, frame, &routing))
                    };
                    routing.run[id.0] = !calls.is_empty();
                    routing.input[id.0] = resource.spec.input.truncate(&value.unwrap_or_default());

                    if let Some(action) = resource.proxy_of {
                        grants[action.0] = routing.run[id.0];
                    }
                }
                Step::Output(id) => {
                    let resource = decls.resource(id);
                    let value = match &resource.source {
                        OutputSource::Zero => resource.spec.output.zero(),
                        OutputSource::Behavior(behavior) => behavior(&routing.input[id.0]),
                        OutputSource::Forward(target) => routing.output[target.0].clone(),
                    };
                    routing.output[id.0] = resource.spec.output.truncate(&value);
                }
            }
        }
        routing
    }
}

fn evaluate(operand: &Operand, frame: &Frame, routing: &Routing) -> Record {
    match operand {
        Operand::Const(record) => record.clone(),
        Operand::Signal(id) => frame.value(*id).cloned().unwrap_or_default(),
        Operand::Output(id) => routing.output[id.0].clone(),
        Operand::Input(id) => routing.input[id.0].clone(),
    }
}
