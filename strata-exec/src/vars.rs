use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use strata_core::types::AnyValue;

#[derive(Debug, thiserror::Error)]
#[error("variable source error for '{name}': {message}")]
pub struct VarError {
    pub name: String,
    pub message: String,
}

/// Caller-supplied resolved configuration values. Opaque to the engine:
/// fallback chains consume them, nothing mutates them.
#[async_trait]
pub trait VariableSource: Send + Sync {
    async fn get(&self, name: &str) -> Result<Option<AnyValue>, VarError>;
}

/// Vars from a JSON object, the common CLI path.
#[derive(Debug, Clone, Default)]
pub struct StaticVars {
    values: serde_json::Map<String, AnyValue>,
}

impl StaticVars {
    pub fn from_value(value: AnyValue) -> Self {
        Self {
            values: value.as_object().cloned().unwrap_or_default(),
        }
    }
}

#[async_trait]
impl VariableSource for StaticVars {
    async fn get(&self, name: &str) -> Result<Option<AnyValue>, VarError> {
        Ok(self.values.get(name).cloned())
    }
}

/// Reads `{prefix}{NAME}` from the environment as string values.
#[derive(Debug, Clone)]
pub struct EnvVars {
    pub prefix: String,
}

impl Default for EnvVars {
    fn default() -> Self {
        Self {
            prefix: "STRATA_VAR_".to_string(),
        }
    }
}

#[async_trait]
impl VariableSource for EnvVars {
    async fn get(&self, name: &str) -> Result<Option<AnyValue>, VarError> {
        let key = format!(
            "{}{}",
            self.prefix,
            name.to_ascii_uppercase().replace('-', "_")
        );
        match std::env::var(&key) {
            Ok(v) => Ok(Some(AnyValue::String(v))),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(e) => Err(VarError {
                name: name.to_string(),
                message: e.to_string(),
            }),
        }
    }
}

/// Tries each source in order; the first hit wins.
#[derive(Default)]
pub struct ChainedVars {
    sources: Vec<Arc<dyn VariableSource>>,
}

impl ChainedVars {
    pub fn new(sources: Vec<Arc<dyn VariableSource>>) -> Self {
        Self { sources }
    }
}

#[async_trait]
impl VariableSource for ChainedVars {
    async fn get(&self, name: &str) -> Result<Option<AnyValue>, VarError> {
        for source in &self.sources {
            if let Some(v) = source.get(name).await? {
                return Ok(Some(v));
            }
        }
        Ok(None)
    }
}

/// Memoizes lookups for the duration of a run so every referencing node
/// observes the same value even against an eventually-consistent backend.
pub struct MemoizedVars {
    inner: Arc<dyn VariableSource>,
    cache: Mutex<BTreeMap<String, Option<AnyValue>>>,
}

impl MemoizedVars {
    pub fn new(inner: Arc<dyn VariableSource>) -> Self {
        Self {
            inner,
            cache: Mutex::new(BTreeMap::new()),
        }
    }
}

#[async_trait]
impl VariableSource for MemoizedVars {
    async fn get(&self, name: &str) -> Result<Option<AnyValue>, VarError> {
        {
            let cache = self.cache.lock().await;
            if let Some(hit) = cache.get(name) {
                return Ok(hit.clone());
            }
        }

        let fetched = self.inner.get(name).await?;
        let mut cache = self.cache.lock().await;
        cache.insert(name.to_string(), fetched.clone());
        Ok(fetched)
    }
}
