//! Strobe Scheduler.
//!
//! Build-time scheduling of atomic actions competing for shared resources,
//! and the per-cycle arbitration and routing derived from it.
//!
//! # Architecture
//!
//! - [`builder`] - Declaration context: actions, resources, signals, calls, relations
//! - [`usage`] - Transitive action/resource usage map
//! - [`graph`] - Conflict, relation and priority graphs, global order, components
//! - [`simultaneous`] - Merging of simultaneity groups into synthetic actions
//! - [`arbiter`] - Per-component grant policies
//! - [`router`] - Resource activation, argument combining and data routing
//! - [`artifact`] - The built schedule, stepped one cycle at a time
//! - [`config`] - Arbitration policy configuration
//! - [`error`] - Build errors
//!
//! # Cycle Model
//!
//! Each cycle:
//!
//! 1. **Eligibility** - an action is eligible when it requests and every
//!    resource it uses is ready
//! 2. **Arbitration** - every component grants a conflict-free subset of its
//!    eligible actions
//! 3. **Routing** - resources run for their enabled, active callers and
//!    compute their outputs
//!
//! # Example
//!
//! ```
//! use strobe_foundation::{Layout, Record};
//! use strobe_scheduler::{Condition, ResourceBody, ResourceSpec, ScheduleBuilder, SchedulerConfig};
//!
//! let mut builder = ScheduleBuilder::new();
//! let port = builder.register_resource("rf", "write", ResourceSpec::new(Layout::scalar(8), Layout::empty()));
//! builder.finalize_resource(port, ResourceBody::new()).unwrap();
//!
//! let fetch = builder.register_action("core", "fetch");
//! builder.call(fetch, port, Record::scalar(7), Condition::Always).unwrap();
//! builder.finalize_action(fetch, Condition::Always).unwrap();
//!
//! let mut schedule = builder.build(&SchedulerConfig::default()).unwrap();
//! let frame = schedule.frame();
//! let report = schedule.step(&frame);
//! assert!(report.granted(fetch));
//! assert_eq!(report.input(port), Some(&Record::scalar(7)));
//! ```

pub mod arbiter;
pub mod artifact;
pub mod builder;
pub mod config;
pub mod error;
pub mod frame;
pub mod graph;
pub mod router;
pub mod simultaneous;
pub mod types;
pub mod usage;

pub use arbiter::{Arbiter, EagerArbiter, RoundRobinArbiter};
pub use artifact::{ComponentSummary, CycleReport, MergedSummary, ScheduleArtifact, ScheduleSummary};
pub use builder::{Behavior, ResourceBody, ResourceSpec, ScheduleBuilder};
pub use config::{ArbiterPolicy, SchedulerConfig};
pub use error::{Error, Result};
pub use frame::Frame;
pub use graph::{verify_schedule, IndexGraph, ScheduleGraphs, ScheduleViolation};
pub use router::{CallArg, Caller, Combiner};
pub use simultaneous::{Group, MergedGroup};
pub use types::*;
pub use usage::UsageMap;
