use std::collections::BTreeMap;

use uuid::Uuid;

use crate::resolve::{NodeOutputs, ResolveError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Applied,
    /// Conditional-one node whose toggle was false.
    Disabled,
    Failed,
    /// A dependency failed; never attempted.
    Blocked,
    /// The run was cancelled before this node started.
    Skipped,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Applied => "applied",
            NodeStatus::Disabled => "disabled",
            NodeStatus::Failed => "failed",
            NodeStatus::Blocked => "blocked",
            NodeStatus::Skipped => "skipped",
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ExecutionResult {
    pub run_id: Uuid,
    pub statuses: BTreeMap<String, NodeStatus>,
    pub outputs: BTreeMap<String, NodeOutputs>,
    /// Node-tagged apply failure messages, in completion order.
    pub errors: Vec<String>,
}

impl ExecutionResult {
    pub fn succeeded(&self) -> bool {
        self.statuses
            .values()
            .all(|s| matches!(s, NodeStatus::Applied | NodeStatus::Disabled))
    }

    pub fn count(&self, status: NodeStatus) -> usize {
        self.statuses.values().filter(|s| **s == status).count()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// Structural or resolution failure; the run aborts with dependents
    /// untouched.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("node task panicked: {0}")]
    TaskJoin(String),
}
