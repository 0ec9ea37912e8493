//! Handles and declaration vocabulary shared by every stage of the scheduler.
//!
//! Actions, resources and signals live in index arenas owned by the
//! [`ScheduleBuilder`](crate::ScheduleBuilder); the handles below are plain
//! indices into those arenas, so every graph in the crate is an adjacency
//! structure over small integers.

use std::fmt;

use serde::{Deserialize, Serialize};
use strobe_foundation::Record;

/// Handle of a registered action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActionId(pub(crate) usize);

impl ActionId {
    /// Position of the action in its builder's arena.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "action#{}", self.0)
    }
}

/// Handle of a registered resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId(pub(crate) usize);

impl ResourceId {
    /// Position of the resource in its builder's arena.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resource#{}", self.0)
    }
}

/// Handle of an externally driven signal (request, ready, argument, enable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SignalId(pub(crate) usize);

impl SignalId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Either side of a relation or a simultaneity declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Entity {
    Action(ActionId),
    Resource(ResourceId),
}

impl From<ActionId> for Entity {
    fn from(id: ActionId) -> Self {
        Entity::Action(id)
    }
}

impl From<ResourceId> for Entity {
    fn from(id: ResourceId) -> Self {
        Entity::Resource(id)
    }
}

/// Which side of a conflict, if any, wins when both are ready.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    /// Conflicting entities have no priority order.
    #[default]
    Undefined,
    /// The left (declaring) entity is preferred.
    Left,
    /// The right (other) entity is preferred.
    Right,
}

/// A directed fact between two entities, stored on its `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
    pub start: Entity,
    pub end: Entity,
    pub priority: Priority,
    /// `false` for schedule-before orderings, which never exclude co-firing.
    pub conflict: bool,
}

/// A 1-bit condition: action request, resource ready, or call enable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Condition {
    #[default]
    Always,
    Signal(SignalId),
}

impl From<SignalId> for Condition {
    fn from(id: SignalId) -> Self {
        Condition::Signal(id)
    }
}

/// A data source for a call argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operand {
    Const(Record),
    Signal(SignalId),
    /// The value a resource returns to its callers this cycle.
    Output(ResourceId),
    /// The effective input of a resource this cycle; lets a resource body
    /// forward its own argument to the resources it calls.
    Input(ResourceId),
}

impl From<Record> for Operand {
    fn from(value: Record) -> Self {
        Operand::Const(value)
    }
}

impl From<SignalId> for Operand {
    fn from(id: SignalId) -> Self {
        Operand::Signal(id)
    }
}

/// One recorded use of a resource: the argument passed and the enable gating it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub arg: Operand,
    pub enable: Condition,
}
