//! Declaration phase: registering actions, resources and their relations.
//!
//! A [`ScheduleBuilder`] is the explicit declaration context of one build.
//! Every registration and every call goes through it, so independent builds
//! never share state and can coexist in one process.
//!
//! # Lifecycle
//!
//! ```text
//! register_action / register_resource      (handles)
//!         │
//! call / declare_* while not finalized     (uses, relations, groups)
//!         │
//! finalize_action / finalize_resource      (declaration order fixed, frozen)
//!         │
//! build(config)                            (ScheduleArtifact)
//! ```

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use strobe_foundation::{Layout, Path, Record};

use crate::artifact::ScheduleArtifact;
use crate::config::SchedulerConfig;
use crate::error::{Error, Result};
use crate::router::Combiner;
use crate::types::{ActionId, CallSite, Condition, Entity, Operand, Priority, Relation, ResourceId, SignalId};

/// Computes a resource's output from its effective input.
pub type Behavior = Arc<dyn Fn(&Record) -> Record + Send + Sync>;

/// Static shape of a resource, fixed at registration.
#[derive(Debug, Clone, Default)]
pub struct ResourceSpec {
    pub input: Layout,
    pub output: Layout,
    /// May be called by several granted actions in one cycle, sharing one call.
    pub nonexclusive: bool,
    /// Merges simultaneous calls to a nonexclusive resource. `None` means
    /// [`Combiner::First`].
    pub combiner: Option<Combiner>,
}

impl ResourceSpec {
    pub fn new(input: Layout, output: Layout) -> Self {
        Self {
            input,
            output,
            nonexclusive: false,
            combiner: None,
        }
    }

    /// Mark the resource nonexclusive, merging simultaneous calls with `combiner`.
    pub fn nonexclusive(mut self, combiner: Combiner) -> Self {
        self.nonexclusive = true;
        self.combiner = Some(combiner);
        self
    }
}

/// Body of a resource, supplied when it is finalized.
#[derive(Clone, Default)]
pub struct ResourceBody {
    ready: Condition,
    behavior: Option<Behavior>,
}

impl ResourceBody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Condition under which the resource may be called this cycle.
    pub fn ready(mut self, ready: impl Into<Condition>) -> Self {
        self.ready = ready.into();
        self
    }

    /// Output logic. Without one the resource returns a zero record.
    pub fn behavior(mut self, behavior: impl Fn(&Record) -> Record + Send + Sync + 'static) -> Self {
        self.behavior = Some(Arc::new(behavior));
        self
    }
}

impl fmt::Debug for ResourceBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceBody")
            .field("ready", &self.ready)
            .field("behavior", &self.behavior.is_some())
            .finish()
    }
}

/// Where a resource's output comes from.
#[derive(Clone, Default)]
pub(crate) enum OutputSource {
    #[default]
    Zero,
    Behavior(Behavior),
    /// Proxies return what their target returns.
    Forward(ResourceId),
}

/// State common to actions and resources.
#[derive(Debug, Clone)]
pub(crate) struct Decl {
    pub name: String,
    pub owner: Path,
    /// Assigned when finalized; `None` while the body is still open.
    pub def_order: Option<u64>,
    pub uses: IndexMap<ResourceId, CallSite>,
    pub relations: Vec<Relation>,
    pub simultaneous: Vec<Vec<Entity>>,
}

impl Decl {
    fn new(owner: Path, name: &str) -> Self {
        Self {
            name: owner.child(name).to_string(),
            owner,
            def_order: None,
            uses: IndexMap::new(),
            relations: Vec::new(),
            simultaneous: Vec::new(),
        }
    }

    pub fn defined(&self) -> bool {
        self.def_order.is_some()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ActionDecl {
    pub decl: Decl,
    pub request: Condition,
    /// Set when the action was absorbed into a simultaneity group; the proxy
    /// stands in for it from then on.
    pub proxy: Option<ResourceId>,
}

#[derive(Clone)]
pub(crate) struct ResourceDecl {
    pub decl: Decl,
    pub spec: ResourceSpec,
    pub ready: Condition,
    pub source: OutputSource,
    /// Constituent action this resource replaces after merging.
    pub proxy_of: Option<ActionId>,
}

#[derive(Debug, Clone)]
pub(crate) struct SignalDecl {
    pub name: String,
    pub layout: Layout,
}

/// The arenas of one build.
#[derive(Clone, Default)]
pub(crate) struct Declarations {
    pub actions: Vec<ActionDecl>,
    pub resources: Vec<ResourceDecl>,
    pub signals: Vec<SignalDecl>,
}

impl Declarations {
    pub fn action(&self, id: ActionId) -> &ActionDecl {
        &self.actions[id.0]
    }

    pub fn resource(&self, id: ResourceId) -> &ResourceDecl {
        &self.resources[id.0]
    }

    pub fn decl(&self, entity: Entity) -> &Decl {
        match entity {
            Entity::Action(id) => &self.actions[id.0].decl,
            Entity::Resource(id) => &self.resources[id.0].decl,
        }
    }

    pub fn name(&self, entity: Entity) -> &str {
        &self.decl(entity).name
    }

    /// All declared relations, resources first.
    pub fn relations(&self) -> impl Iterator<Item = &Relation> + '_ {
        self.resources
            .iter()
            .map(|r| &r.decl)
            .chain(self.actions.iter().map(|a| &a.decl))
            .flat_map(|decl| decl.relations.iter())
    }

    /// Replace an absorbed action by the proxy resource standing in for it.
    pub fn redirect(&self, entity: Entity) -> Entity {
        match entity {
            Entity::Action(id) => self.actions[id.0]
                .proxy
                .map_or(entity, Entity::Resource),
            Entity::Resource(_) => entity,
        }
    }

    /// Actions that are arbitrated on their own.
    pub fn scheduled_actions(&self) -> Vec<ActionId> {
        (0..self.actions.len())
            .map(ActionId)
            .filter(|&id| self.action(id).proxy.is_none())
            .collect()
    }

    /// Layout a signal, operand or condition carries.
    fn signal_layout(&self, id: SignalId) -> &Layout {
        &self.signals[id.0].layout
    }
}

/// Declaration context of one schedule build.
#[derive(Default)]
pub struct ScheduleBuilder {
    decls: Declarations,
    def_counter: u64,
}

impl ScheduleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an externally driven signal.
    pub fn signal(&mut self, name: impl Into<String>, layout: Layout) -> SignalId {
        self.decls.signals.push(SignalDecl {
            name: name.into(),
            layout,
        });
        SignalId(self.decls.signals.len() - 1)
    }

    /// Declare a 1-bit signal, usable as a [`Condition`].
    pub fn flag(&mut self, name: impl Into<String>) -> SignalId {
        self.signal(name, Layout::flag())
    }

    /// Register an action owned by the module at `owner`.
    pub fn register_action(&mut self, owner: impl Into<Path>, name: &str) -> ActionId {
        self.decls.actions.push(ActionDecl {
            decl: Decl::new(owner.into(), name),
            request: Condition::Always,
            proxy: None,
        });
        ActionId(self.decls.actions.len() - 1)
    }

    /// Register a resource owned by the module at `owner`.
    pub fn register_resource(&mut self, owner: impl Into<Path>, name: &str, spec: ResourceSpec) -> ResourceId {
        self.decls.resources.push(ResourceDecl {
            decl: Decl::new(owner.into(), name),
            spec,
            ready: Condition::Always,
            source: OutputSource::Zero,
            proxy_of: None,
        });
        ResourceId(self.decls.resources.len() - 1)
    }

    /// Declare that `a` and `b` must never fire in the same cycle.
    ///
    /// With [`Priority::Left`] `a` wins when both are ready, with
    /// [`Priority::Right`] `b` does.
    pub fn declare_conflict(
        &mut self,
        a: impl Into<Entity>,
        b: impl Into<Entity>,
        priority: Priority,
    ) -> Result<()> {
        self.relate(a.into(), b.into(), priority, true)
    }

    /// Declare that `a` is ordered before `b` without excluding co-firing.
    ///
    /// `a` must be finalized no later than `b`; this is checked at build.
    pub fn declare_schedule_before(&mut self, a: impl Into<Entity>, b: impl Into<Entity>) -> Result<()> {
        self.relate(a.into(), b.into(), Priority::Left, false)
    }

    fn relate(&mut self, start: Entity, end: Entity, priority: Priority, conflict: bool) -> Result<()> {
        self.check(start)?;
        self.check(end)?;
        self.decl_mut(start).relations.push(Relation {
            start,
            end,
            priority,
            conflict,
        });
        Ok(())
    }

    /// Declare that the members of `group` always fire together or not at all.
    pub fn declare_simultaneous(&mut self, group: &[Entity]) -> Result<()> {
        let Some((&first, _)) = group.split_first() else {
            return Ok(());
        };
        for &entity in group {
            self.check(entity)?;
        }
        self.decl_mut(first).simultaneous.push(group.to_vec());
        Ok(())
    }

    /// Record that `caller` calls `resource` with `arg`, gated by `enable`.
    ///
    /// Returns the operand carrying the resource's output, which the caller
    /// may pass on to further calls.
    pub fn call(
        &mut self,
        caller: impl Into<Entity>,
        resource: ResourceId,
        arg: impl Into<Operand>,
        enable: impl Into<Condition>,
    ) -> Result<Operand> {
        let caller = caller.into();
        let (arg, enable) = (arg.into(), enable.into());
        self.check(caller)?;
        self.check(Entity::Resource(resource))?;

        let caller_decl = self.decls.decl(caller);
        let callee_name = self.decls.resource(resource).decl.name.clone();
        if caller_decl.defined() {
            return Err(Error::UseAfterFinalize {
                caller: caller_decl.name.clone(),
                resource: callee_name,
            });
        }
        if caller_decl.uses.contains_key(&resource) {
            return Err(Error::DoubleUse {
                caller: caller_decl.name.clone(),
                resource: callee_name,
            });
        }

        let context = format!("call of {callee_name}");
        let expected = self.decls.resource(resource).spec.input.clone();
        self.check_operand(&arg, &expected, &context)?;
        self.check_condition(enable, &context)?;

        self.decl_mut(caller)
            .uses
            .insert(resource, CallSite { arg, enable });
        Ok(Operand::Output(resource))
    }

    /// Finalize an action body. `request` says when it wants to run.
    pub fn finalize_action(&mut self, action: ActionId, request: impl Into<Condition>) -> Result<()> {
        let request = request.into();
        let entity = Entity::Action(action);
        self.check(entity)?;
        self.check_condition(request, "action request")?;
        self.mark_defined(entity)?;
        self.decls.actions[action.0].request = request;
        Ok(())
    }

    /// Finalize a resource body with its ready condition and output logic.
    pub fn finalize_resource(&mut self, resource: ResourceId, body: ResourceBody) -> Result<()> {
        let entity = Entity::Resource(resource);
        self.check(entity)?;
        self.check_condition(body.ready, "resource ready")?;
        self.mark_defined(entity)?;
        let decl = &mut self.decls.resources[resource.0];
        decl.ready = body.ready;
        decl.source = body.behavior.map_or(OutputSource::Zero, OutputSource::Behavior);
        Ok(())
    }

    /// Define `resource` as a forwarder: always ready, passes its input to
    /// `target` and returns `target`'s output.
    pub fn define_proxy(&mut self, resource: ResourceId, target: ResourceId) -> Result<()> {
        self.check(Entity::Resource(resource))?;
        self.check(Entity::Resource(target))?;
        let decl = &self.decls.resource(resource).decl;
        if decl.defined() {
            return Err(Error::AlreadyDefined(decl.name.clone()));
        }
        let found = self.decls.resource(target).spec.output.clone();
        let expected = self.decls.resource(resource).spec.output.clone();
        if found != expected {
            return Err(Error::LayoutMismatch {
                context: format!("proxy output of {}", self.decls.resource(resource).decl.name),
                expected,
                found,
            });
        }
        self.call(resource, target, Operand::Input(resource), Condition::Always)?;
        self.mark_defined(Entity::Resource(resource))?;
        let decl = &mut self.decls.resources[resource.0];
        decl.ready = Condition::Always;
        decl.source = OutputSource::Forward(target);
        Ok(())
    }

    /// Run the build-time analysis and produce the per-cycle schedule.
    pub fn build(self, config: &SchedulerConfig) -> Result<ScheduleArtifact> {
        debug!(
            actions = self.decls.actions.len(),
            resources = self.decls.resources.len(),
            signals = self.decls.signals.len(),
            "building schedule"
        );
        ScheduleArtifact::build(self.decls, config)
    }

    pub(crate) fn declarations(&self) -> &Declarations {
        &self.decls
    }

    fn mark_defined(&mut self, entity: Entity) -> Result<()> {
        let order = self.def_counter;
        let decl = self.decl_mut(entity);
        if decl.defined() {
            return Err(Error::AlreadyDefined(decl.name.clone()));
        }
        decl.def_order = Some(order);
        self.def_counter += 1;
        Ok(())
    }

    fn check(&self, entity: Entity) -> Result<()> {
        let (kind, index, len) = match entity {
            Entity::Action(id) => ("action", id.0, self.decls.actions.len()),
            Entity::Resource(id) => ("resource", id.0, self.decls.resources.len()),
        };
        if index < len {
            Ok(())
        } else {
            Err(Error::UnknownEntity { kind, index })
        }
    }

    fn check_signal(&self, id: SignalId) -> Result<()> {
        if id.0 < self.decls.signals.len() {
            Ok(())
        } else {
            Err(Error::UnknownEntity {
                kind: "signal",
                index: id.0,
            })
        }
    }

    fn check_condition(&self, condition: Condition, context: &str) -> Result<()> {
        let Condition::Signal(id) = condition else {
            return Ok(());
        };
        self.check_signal(id)?;
        let found = self.decls.signal_layout(id);
        if found.width() != 1 {
            return Err(Error::LayoutMismatch {
                context: format!("{context} ({})", self.decls.signals[id.0].name),
                expected: Layout::flag(),
                found: found.clone(),
            });
        }
        Ok(())
    }

    fn check_operand(&self, operand: &Operand, expected: &Layout, context: &str) -> Result<()> {
        let found = match operand {
            Operand::Const(record) if expected.conforms(record) => return Ok(()),
            Operand::Const(record) => {
                return Err(Error::ConstantMismatch {
                    context: context.to_string(),
                    expected: expected.clone(),
                    values: record.values().to_vec(),
                });
            }
            Operand::Signal(id) => {
                self.check_signal(*id)?;
                self.decls.signal_layout(*id)
            }
            Operand::Output(id) => {
                self.check(Entity::Resource(*id))?;
                &self.decls.resource(*id).spec.output
            }
            Operand::Input(id) => {
                self.check(Entity::Resource(*id))?;
                &self.decls.resource(*id).spec.input
            }
        };
        if found == expected {
            Ok(())
        } else {
            Err(Error::LayoutMismatch {
                context: context.to_string(),
                expected: expected.clone(),
                found: found.clone(),
            })
        }
    }

    fn decl_mut(&mut self, entity: Entity) -> &mut Decl {
        match entity {
            Entity::Action(id) => &mut self.decls.actions[id.0].decl,
            Entity::Resource(id) => &mut self.decls.resources[id.0].decl,
        }
    }
}
