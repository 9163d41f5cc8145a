use std::collections::BTreeMap;

use strata_core::types::{Manifest, NodeDecl};

use crate::resolve::ResolveError;
use crate::secrets::{SecretSource, SecretValue};

/// Per-run secret material, fetched once before any apply step.
///
/// Keyed by node id, then by the node's public key. Only the instance
/// applying a given key ever receives its value.
pub type SecretBundle = BTreeMap<String, BTreeMap<String, SecretValue>>;

/// Verify `K ⊆ keys(V)` for every secrets node and collect the values.
///
/// All missing keys of a node are reported together so one corrective pass
/// can fix them; failure here means zero apply calls were made.
pub async fn preflight_secrets(
    manifest: &Manifest,
    source: &dyn SecretSource,
) -> Result<SecretBundle, ResolveError> {
    let mut bundle = SecretBundle::new();
    for node in manifest.nodes.iter().filter(|n| n.secrets) {
        bundle.insert(node.id.clone(), collect_node_secrets(node, source).await?);
    }
    Ok(bundle)
}

async fn collect_node_secrets(
    node: &NodeDecl,
    source: &dyn SecretSource,
) -> Result<BTreeMap<String, SecretValue>, ResolveError> {
    let keys = node.keys().unwrap_or(&[]);

    let mut values = BTreeMap::new();
    let mut missing = Vec::new();
    for key in keys {
        match source.get(&node.id, key).await {
            Ok(Some(value)) => {
                values.insert(key.clone(), value);
            }
            Ok(None) => missing.push(key.clone()),
            Err(e) => {
                return Err(ResolveError::SecretSource {
                    node: node.id.clone(),
                    key: key.clone(),
                    message: e.message,
                })
            }
        }
    }

    if !missing.is_empty() {
        return Err(ResolveError::MissingSecretValues {
            node: node.id.clone(),
            keys: missing,
        });
    }
    Ok(values)
}
