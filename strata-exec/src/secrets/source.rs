use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::secrets::SecretValue;

#[derive(Debug, thiserror::Error)]
#[error("secret source error for '{node}/{key}': {message}")]
pub struct SecretSourceError {
    pub node: String,
    pub key: String,
    pub message: String,
}

/// Supplies the sensitive value map `V` for secrets nodes. The engine only
/// ever asks for keys from the node's public key set `K`.
#[async_trait]
pub trait SecretSource: Send + Sync {
    async fn get(&self, node: &str, key: &str) -> Result<Option<SecretValue>, SecretSourceError>;
}

/// In-memory source, mainly for tests and embedding callers.
#[derive(Default)]
pub struct StaticSecrets {
    values: BTreeMap<(String, String), SecretValue>,
}

impl StaticSecrets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        node: impl Into<String>,
        key: impl Into<String>,
        value: SecretValue,
    ) -> &mut Self {
        self.values.insert((node.into(), key.into()), value);
        self
    }
}

#[async_trait]
impl SecretSource for StaticSecrets {
    async fn get(&self, node: &str, key: &str) -> Result<Option<SecretValue>, SecretSourceError> {
        Ok(self
            .values
            .get(&(node.to_string(), key.to_string()))
            .cloned())
    }
}

/// Reads `{prefix}{NODE}_{KEY}` from the environment, uppercased with `-`
/// mapped to `_`.
#[derive(Debug, Clone)]
pub struct EnvSecrets {
    pub prefix: String,
}

impl Default for EnvSecrets {
    fn default() -> Self {
        Self {
            prefix: "STRATA_SECRET_".to_string(),
        }
    }
}

impl EnvSecrets {
    fn env_key(&self, node: &str, key: &str) -> String {
        let mangle = |s: &str| s.to_ascii_uppercase().replace('-', "_");
        format!("{}{}_{}", self.prefix, mangle(node), mangle(key))
    }
}

#[async_trait]
impl SecretSource for EnvSecrets {
    async fn get(&self, node: &str, key: &str) -> Result<Option<SecretValue>, SecretSourceError> {
        match std::env::var(self.env_key(node, key)) {
            Ok(v) => Ok(Some(SecretValue::from_string(v))),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(e) => Err(SecretSourceError {
                node: node.to_string(),
                key: key.to_string(),
                message: e.to_string(),
            }),
        }
    }
}
