use crate::types::{AnyValue, Expression};

/// One input's declared binding.
///
/// Untagged: a map with `when`/`then`/`else` is a conditional, a map with
/// `fallback` is an ordered candidate chain, anything else is a literal
/// value whose strings may embed `${...}` expressions.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum InputBinding {
    Conditional {
        when: Expression,
        then: Box<InputBinding>,
        #[serde(rename = "else")]
        otherwise: Box<InputBinding>,
    },
    Fallback {
        fallback: Vec<InputBinding>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<AnyValue>,
    },
    Value(AnyValue),
}
