//! Roadmap result type

use serde::{Deserialize, Serialize};

/// Target number of tasks requested from the provider
pub const TARGET_TASKS: usize = 6;

/// Upper bound on tasks kept from a provider reply
pub const MAX_TASKS: usize = 7;

/// A short description plus an ordered task list for one idea
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadmapResult {
    pub description: String,
    pub tasks: Vec<String>,
}

/// Where a roadmap came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoadmapOrigin {
    Cache,
    Provider,
    Fallback,
}

impl RoadmapOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoadmapOrigin::Cache => "cache",
            RoadmapOrigin::Provider => "provider",
            RoadmapOrigin::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for RoadmapOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
