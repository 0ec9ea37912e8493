//! Owner paths for declared actions and resources.
//!
//! Every action and resource is declared by some module of the surrounding
//! design. The owner is recorded as a dot-separated path (e.g. `"core.rf"`)
//! so diagnostics can name where a conflicting declaration came from.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A hierarchical, dot-separated module path (e.g. `"core.backend.rob"`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Path {
    /// Ordered segments of the path, outermost module first.
    pub segments: Vec<String>,
}

impl Path {
    /// Creates a path from a list of segments.
    pub fn new(segments: Vec<String>) -> Self {
        Self { segments }
    }

    /// Parses a dot-separated string. Empty segments are dropped, so `""`
    /// parses to the root path.
    pub fn from_path_str(s: &str) -> Self {
        Self {
            segments: s
                .split('.')
                .filter(|segment| !segment.is_empty())
                .map(String::from)
                .collect(),
        }
    }

    /// Append a segment, producing the path of a child module or entity.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self::new(segments)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl From<&str> for Path {
    fn from(s: &str) -> Self {
        Self::from_path_str(s)
    }
}

impl From<String> for Path {
    fn from(s: String) -> Self {
        Self::from_path_str(&s)
    }
}

impl PartialEq<&str> for Path {
    fn eq(&self, other: &&str) -> bool {
        self.to_string() == *other
    }
}
