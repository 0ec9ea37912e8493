//! Arbitration policy configuration.
//!
//! The only knobs of a build are which arbitration policy each connected
//! component of the relation graph uses. Configuration is plain serde data so
//! a surrounding design can keep it next to its other build parameters.
//!
//! ```json
//! {
//!     "default_policy": "eager",
//!     "component_policies": { "testbench.driver": "round_robin" }
//! }
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::arbiter::{Arbiter, EagerArbiter, RoundRobinArbiter};
use crate::error::Result;
use crate::graph::IndexGraph;

/// Arbitration policy of one connected component.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArbiterPolicy {
    /// Grant in global order; non-conflicting actions fire together.
    #[default]
    Eager,
    /// One grant per component per cycle, rotating across candidates.
    RoundRobin,
}

impl ArbiterPolicy {
    /// Create the per-cycle arbiter for a component.
    ///
    /// `members` are graph nodes sorted by global order; `conflicts` is the
    /// conflict graph over the same node indices.
    pub(crate) fn instantiate(self, members: &[usize], conflicts: &IndexGraph) -> Box<dyn Arbiter> {
        match self {
            ArbiterPolicy::Eager => Box::new(EagerArbiter::new(members, conflicts)),
            ArbiterPolicy::RoundRobin => Box::new(RoundRobinArbiter::new(members.len())),
        }
    }
}

/// Build configuration of a schedule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Policy of every component not named in `component_policies`.
    pub default_policy: ArbiterPolicy,
    /// Per-component overrides, keyed by the full name of any action in the
    /// component. When several named actions share a component, the one
    /// earliest in global order decides.
    pub component_policies: IndexMap<String, ArbiterPolicy>,
}

impl SchedulerConfig {
    /// Configuration using one policy everywhere.
    pub fn uniform(policy: ArbiterPolicy) -> Self {
        Self {
            default_policy: policy,
            component_policies: IndexMap::new(),
        }
    }

    /// Parse a JSON configuration document.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Override the policy of the component containing `action`.
    pub fn with_component(mut self, action: impl Into<String>, policy: ArbiterPolicy) -> Self {
        self.component_policies.insert(action.into(), policy);
        self
    }

    /// Resolve the policy of a component from its action names, given in
    /// global order.
    pub(crate) fn policy_for<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> ArbiterPolicy {
        names
            .into_iter()
            .find_map(|name| self.component_policies.get(name).copied())
            .unwrap_or(self.default_policy)
    }
}
