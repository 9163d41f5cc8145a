use strata_core::types::CountSpec;

use crate::resolve::{resolve_toggle, ResolveContext, ResolveError};

/// The per-run instantiation decision for one node, made once before any
/// dependent resolves.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Instantiation {
    /// Exactly one instance.
    Single,
    /// Conditional-one with a false toggle: zero instances, all outputs
    /// absent.
    Disabled,
    /// One instance per key.
    Keyed { keys: Vec<String> },
}

pub async fn decide_instantiation(
    ctx: &ResolveContext<'_>,
) -> Result<Instantiation, ResolveError> {
    match &ctx.node.count {
        None => Ok(Instantiation::Single),
        Some(CountSpec::ForEach { for_each }) => Ok(Instantiation::Keyed {
            keys: for_each.clone(),
        }),
        Some(CountSpec::When { when }) => {
            if resolve_toggle(when, ctx).await? {
                Ok(Instantiation::Single)
            } else {
                Ok(Instantiation::Disabled)
            }
        }
    }
}
