//! Static scheduling graphs.
//!
//! This module derives, from the frozen declarations and the usage map, the
//! graphs every cycle is arbitrated against.
//!
//! # Structure
//!
//! - [`IndexGraph`] - adjacency sets over small integer node indices
//! - [`ScheduleGraphs`] - the conflict, relation and priority graphs of one build,
//!   the global order and the connected components
//! - [`topological_order`] - Kahn's algorithm with a deterministic tie-break
//!
//! # Ordering
//!
//! Priority edges point from the preferred action to the deferred one. The
//! global order is a topological order of that graph; among incomparable
//! actions the one finalized first goes first. A cycle leaves no valid
//! order and fails the build.

mod conflict;
mod topology;
mod types;
mod verification;


pub use conflict::ScheduleGraphs;
pub use topology::{topological_order, CycleError};
pub use types::IndexGraph;
pub use verification::{verify_schedule, ScheduleViolation};

pub(crate) use verification::check_invariants;
