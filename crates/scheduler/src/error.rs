//! Build-time errors.
//!
//! Every error is detected while declaring or building the schedule, never
//! while stepping it: a built [`ScheduleArtifact`](crate::ScheduleArtifact)
//! has no failure path. None of these errors is recoverable; the declaring
//! design must be fixed and the schedule rebuilt.

use thiserror::Error;

use strobe_foundation::{Layout, LayoutError};

use crate::graph::ScheduleViolation;

/// Scheduler result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while declaring or building a schedule.
#[derive(Debug, Error)]
pub enum Error {
    /// The same resource is used twice by one caller, directly or through
    /// the resources it calls (a resource calling itself included).
    #[error("{resource} can't be called twice from {caller}")]
    DoubleUse { caller: String, resource: String },

    /// A resource reachable from some action never had its body finalized.
    #[error("{caller} uses {resource}, which is not defined")]
    UndefinedResourceUse { caller: String, resource: String },

    /// An action or resource body was finalized twice.
    #[error("{0} already defined")]
    AlreadyDefined(String),

    /// A schedule-before relation names an entity defined after the one it
    /// is supposed to precede.
    #[error("{before} scheduled before {after}, but defined afterwards")]
    ScheduleOrder { before: String, after: String },

    /// The priority graph has no topological order.
    ///
    /// `actions` names every action left on or behind the cycle.
    #[error("priority cycle, no schedule exists for: {actions:?}")]
    PriorityCycle { actions: Vec<String> },

    /// A call recorded on a caller whose body is already finalized.
    #[error("{caller} is already defined, it can no longer call {resource}")]
    UseAfterFinalize { caller: String, resource: String },

    /// An action was registered but never finalized before `build`.
    #[error("action {0} was never defined")]
    UndefinedAction(String),

    /// A handle that does not belong to this builder.
    #[error("unknown {kind} handle #{index}")]
    UnknownEntity { kind: &'static str, index: usize },

    /// An operand or condition has the wrong shape for where it is used.
    #[error("layout mismatch in {context}: expected {expected:?}, found {found:?}")]
    LayoutMismatch {
        context: String,
        expected: Layout,
        found: Layout,
    },

    /// A constant argument that does not fit the callee's input layout.
    #[error("constant {values:?} in {context} does not fit {expected:?}")]
    ConstantMismatch {
        context: String,
        expected: Layout,
        values: Vec<u64>,
    },

    /// Call arguments depend on each other in a cycle.
    #[error("combinational loop through resources: {resources:?}")]
    CombinationalLoop { resources: Vec<String> },

    /// Self-verification of a freshly built schedule failed.
    #[error(transparent)]
    ScheduleViolation(#[from] ScheduleViolation),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error("invalid scheduler configuration: {0}")]
    Config(#[from] serde_json::Error),
}
