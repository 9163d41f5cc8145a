use std::collections::BTreeMap;

use async_trait::async_trait;

use strata_core::types::{AnyValue, TagMap};

use crate::resolve::Resolved;
use crate::secrets::SecretValue;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceKey {
    Single,
    Key(String),
}

impl std::fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstanceKey::Single => f.write_str("-"),
            InstanceKey::Key(k) => f.write_str(k),
        }
    }
}

/// One concrete apply call: a node instance with its inputs already fixed.
///
/// `secret` carries at most the one value belonging to this instance's
/// key; `Debug` on the request stays redacted through `SecretValue`.
#[derive(Debug)]
pub struct ApplyRequest {
    pub node: String,
    pub instance: InstanceKey,
    pub inputs: BTreeMap<String, Resolved>,
    pub tags: TagMap,
    pub secret: Option<SecretValue>,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("apply failed for node '{node}': {message}")]
pub struct ApplyError {
    pub node: String,
    pub message: String,
}

/// External collaborator that creates/updates the concrete resource
/// behind a node instance. The engine never retries; a failure blocks
/// dependents and nothing else.
#[async_trait]
pub trait ApplyExecutor: Send + Sync {
    async fn apply(&self, request: ApplyRequest) -> Result<BTreeMap<String, AnyValue>, ApplyError>;
}

/// Dry-run executor: fabricates a placeholder value per declared output.
pub struct EchoExecutor {
    outputs_by_node: BTreeMap<String, Vec<String>>,
}

impl EchoExecutor {
    pub fn new(manifest: &strata_core::types::Manifest) -> Self {
        Self {
            outputs_by_node: manifest
                .nodes
                .iter()
                .map(|n| (n.id.clone(), n.outputs.clone()))
                .collect(),
        }
    }
}

#[async_trait]
impl ApplyExecutor for EchoExecutor {
    async fn apply(&self, request: ApplyRequest) -> Result<BTreeMap<String, AnyValue>, ApplyError> {
        let declared = self
            .outputs_by_node
            .get(&request.node)
            .map(|v| v.as_slice())
            .unwrap_or(&[]);

        Ok(declared
            .iter()
            .map(|output| {
                let value = match &request.instance {
                    InstanceKey::Single => format!("{}.{output}", request.node),
                    InstanceKey::Key(k) => format!("{}[{k}].{output}", request.node),
                };
                (output.clone(), AnyValue::String(value))
            })
            .collect())
    }
}
