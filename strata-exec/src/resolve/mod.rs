mod instantiate;
mod outputs;

pub use instantiate::{decide_instantiation, Instantiation};
pub use outputs::{NodeOutputs, Resolved};

use std::collections::BTreeMap;

use strata_core::expressions::{parse_template, parse_toggle, Reference, Segment};
use strata_core::types::{AnyValue, InputBinding, NodeDecl};

use crate::vars::{VarError, VariableSource};

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("node '{node}': required input '{input}' resolved to no value and has no default")]
    RequiredInputMissing { node: String, input: String },

    #[error("node '{node}' is missing secret values for keys: {}", keys.join(", "))]
    MissingSecretValues { node: String, keys: Vec<String> },

    #[error("node '{node}': unguarded reference to absent output '{reference}'")]
    UnguardedAbsent { node: String, reference: String },

    #[error("node '{node}': toggle '{toggle}' resolved to non-boolean value")]
    InvalidToggle { node: String, toggle: String },

    #[error("node '{node}': referenced node '{dependency}' has not resolved yet")]
    DependencyNotResolved { node: String, dependency: String },

    #[error("node '{node}': executor returned no output '{output}'")]
    MissingOutput { node: String, output: String },

    #[error("node '{node}': each.key used outside a keyed instance")]
    EachKeyUnavailable { node: String },

    #[error(transparent)]
    Var(#[from] VarError),

    #[error("secret source error for '{node}/{key}': {message}")]
    SecretSource {
        node: String,
        key: String,
        message: String,
    },
}

/// Everything a node needs to turn its declared bindings into values.
///
/// Resolution is pure with respect to this context: same outputs, same
/// vars, same key — same result.
pub struct ResolveContext<'a> {
    pub node: &'a NodeDecl,
    /// Outputs of every node in earlier tiers, fixed before this tier ran.
    pub outputs: &'a BTreeMap<String, NodeOutputs>,
    pub vars: &'a dyn VariableSource,
    /// Current instance key inside a keyed-set node.
    pub each_key: Option<&'a str>,
}

pub async fn resolve_inputs(
    ctx: &ResolveContext<'_>,
) -> Result<BTreeMap<String, Resolved>, ResolveError> {
    let mut out = BTreeMap::new();
    for (name, binding) in &ctx.node.inputs {
        let resolved = resolve_binding(binding, name, ctx, false).await?;
        out.insert(name.clone(), resolved);
    }
    Ok(out)
}

pub async fn resolve_binding(
    binding: &InputBinding,
    input: &str,
    ctx: &ResolveContext<'_>,
    in_fallback: bool,
) -> Result<Resolved, ResolveError> {
    match binding {
        InputBinding::Value(value) => resolve_value(value, input, ctx, in_fallback).await,
        InputBinding::Conditional {
            when,
            then,
            otherwise,
        } => {
            let branch = if resolve_toggle(when, ctx).await? {
                then
            } else {
                otherwise
            };
            Box::pin(resolve_binding(branch, input, ctx, in_fallback)).await
        }
        InputBinding::Fallback { fallback, default } => {
            // Strictly in declared order; the first candidate producing a
            // non-empty value wins. Candidates tolerate absence.
            for candidate in fallback {
                let resolved = Box::pin(resolve_binding(candidate, input, ctx, true)).await?;
                if !resolved.is_unset() {
                    return Ok(resolved);
                }
            }
            match default {
                Some(d) => resolve_value(d, input, ctx, true).await,
                None => Err(ResolveError::RequiredInputMissing {
                    node: ctx.node.id.clone(),
                    input: input.to_string(),
                }),
            }
        }
    }
}

pub async fn resolve_value(
    value: &AnyValue,
    input: &str,
    ctx: &ResolveContext<'_>,
    in_fallback: bool,
) -> Result<Resolved, ResolveError> {
    match value {
        AnyValue::Null | AnyValue::Bool(_) | AnyValue::Number(_) => {
            Ok(Resolved::Present(value.clone()))
        }
        AnyValue::String(s) => resolve_string(s, input, ctx, in_fallback).await,
        AnyValue::Array(arr) => {
            let mut out = Vec::with_capacity(arr.len());
            for v in arr {
                match Box::pin(resolve_value(v, input, ctx, in_fallback)).await? {
                    Resolved::Present(v) => out.push(v),
                    // One absent element makes the collection absent.
                    Resolved::Absent => return Ok(Resolved::Absent),
                }
            }
            Ok(Resolved::Present(AnyValue::Array(out)))
        }
        AnyValue::Object(map) => {
            let mut out = serde_json::Map::new();
            for (k, v) in map {
                match Box::pin(resolve_value(v, input, ctx, in_fallback)).await? {
                    Resolved::Present(v) => {
                        out.insert(k.clone(), v);
                    }
                    Resolved::Absent => return Ok(Resolved::Absent),
                }
            }
            Ok(Resolved::Present(AnyValue::Object(out)))
        }
    }
}

async fn resolve_string(
    s: &str,
    input: &str,
    ctx: &ResolveContext<'_>,
    in_fallback: bool,
) -> Result<Resolved, ResolveError> {
    // Validation has already run; a parse failure here is a caller bug and
    // surfaces as a missing input rather than a panic.
    let Ok(template) = parse_template(s) else {
        return Err(ResolveError::RequiredInputMissing {
            node: ctx.node.id.clone(),
            input: input.to_string(),
        });
    };

    // A single-expression template keeps the referenced value's type.
    if let Some(reference) = template.as_single_expr() {
        return resolve_reference(reference, ctx, in_fallback).await;
    }

    let mut out = String::new();
    for segment in &template.segments {
        match segment {
            Segment::Literal(l) => out.push_str(l),
            Segment::Expr(reference) => {
                match resolve_reference(reference, ctx, in_fallback).await? {
                    // A guarded absent reference poisons the whole string
                    // rather than rendering an empty fragment.
                    Resolved::Absent => return Ok(Resolved::Absent),
                    Resolved::Present(v) => match v {
                        AnyValue::String(s) => out.push_str(&s),
                        AnyValue::Number(n) => out.push_str(&n.to_string()),
                        AnyValue::Bool(b) => out.push_str(if b { "true" } else { "false" }),
                        AnyValue::Null => {}
                        other => out.push_str(&other.to_string()),
                    },
                }
            }
        }
    }
    Ok(Resolved::Present(AnyValue::String(out)))
}

async fn resolve_reference(
    reference: &Reference,
    ctx: &ResolveContext<'_>,
    in_fallback: bool,
) -> Result<Resolved, ResolveError> {
    match reference {
        Reference::Var(name) => match ctx.vars.get(name).await? {
            Some(v) => Ok(Resolved::Present(v)),
            None => Ok(Resolved::Absent),
        },
        Reference::EachKey => match ctx.each_key {
            Some(key) => Ok(Resolved::Present(AnyValue::String(key.to_string()))),
            None => Err(ResolveError::EachKeyUnavailable {
                node: ctx.node.id.clone(),
            }),
        },
        Reference::Output(r) => {
            let Some(outputs) = ctx.outputs.get(&r.node) else {
                return Err(ResolveError::DependencyNotResolved {
                    node: ctx.node.id.clone(),
                    dependency: r.node.clone(),
                });
            };
            match outputs {
                NodeOutputs::Absent if !(r.guarded || in_fallback) => {
                    Err(ResolveError::UnguardedAbsent {
                        node: ctx.node.id.clone(),
                        reference: r.to_string(),
                    })
                }
                NodeOutputs::Absent => Ok(Resolved::Absent),
                present => match present.get(&r.output) {
                    Resolved::Present(v) => Ok(Resolved::Present(v)),
                    Resolved::Absent => Err(ResolveError::MissingOutput {
                        node: r.node.clone(),
                        output: r.output.clone(),
                    }),
                },
            }
        }
    }
}

/// Evaluate an instantiation or branch toggle. A guarded reference to an
/// absent output counts as false.
pub async fn resolve_toggle(toggle: &str, ctx: &ResolveContext<'_>) -> Result<bool, ResolveError> {
    let invalid = || ResolveError::InvalidToggle {
        node: ctx.node.id.clone(),
        toggle: toggle.to_string(),
    };

    let template = parse_template(toggle).map_err(|_| invalid())?;
    if let Some(reference) = template.as_single_expr() {
        return match resolve_reference(reference, ctx, false).await? {
            Resolved::Absent => Ok(false),
            Resolved::Present(v) => parse_toggle(&v).ok_or_else(invalid),
        };
    }

    parse_toggle(&AnyValue::String(toggle.trim().to_string())).ok_or_else(invalid)
}
