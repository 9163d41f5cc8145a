use std::collections::{BTreeMap, BTreeSet};

use crate::error::ValidationError;
use crate::planner::DependencyGraph;
use crate::types::TagMap;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PlanningOutcome {
    pub validation: ValidationSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<Plan>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ValidationSummary {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationSummary {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn invalid_from(err: ValidationError) -> Self {
        let errors = err
            .violations
            .into_iter()
            .map(|v| format!("{}: {}", v.path, v.message))
            .collect();
        Self {
            is_valid: false,
            errors,
            warnings: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Plan {
    pub summary: PlanSummary,
    pub graph: DependencyGraph,
    pub nodes: Vec<PlanNode>,
}

impl Plan {
    pub fn node(&self, id: &str) -> Option<&PlanNode> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PlanSummary {
    pub manifest_version: String,
    pub missing_vars: BTreeSet<String>,
    /// Nodes whose dependencies cross more than one tier boundary.
    pub spanning_nodes: Vec<String>,
}

/// One node's slot in the ordered, human-inspectable plan.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PlanNode {
    pub id: String,
    pub tier: usize,
    pub depends_on: Vec<String>,
    pub instantiation: PlanInstantiation,
    pub declared_outputs: Vec<String>,
    pub referenced_vars: BTreeSet<String>,
    pub missing_vars: BTreeSet<String>,
    pub secrets: bool,
    /// Base manifest tags merged with the node's own; node tags win.
    pub tags: TagMap,
    /// Rendered binding summaries for review. Secret payloads live in the
    /// Secret Source, never in bindings, so only the key set shows here.
    pub inputs: BTreeMap<String, String>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PlanInstantiation {
    Always,
    Conditional {
        toggle: String,
        /// Decided at plan time when the toggle is a var the caller
        /// supplied; otherwise left for apply time.
        #[serde(skip_serializing_if = "Option::is_none")]
        enabled: Option<bool>,
    },
    Keyed {
        keys: Vec<String>,
    },
}
