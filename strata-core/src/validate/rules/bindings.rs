use crate::error::ViolationKind;
use crate::expressions::{parse_template, Reference, Template};
use crate::types::{AnyValue, InputBinding, NodeDecl};
use crate::validate::validator::Validator;

use super::Registry;

/// Walk one input binding, checking every embedded expression.
///
/// `in_fallback` marks fallback candidates: absence there falls through to
/// the next candidate, so references inside a chain are implicitly guarded.
pub(crate) fn validate_binding(
    v: &mut Validator,
    path: &str,
    binding: &InputBinding,
    owner: &NodeDecl,
    registry: &Registry,
    in_fallback: bool,
) {
    match binding {
        InputBinding::Value(value) => validate_value(v, path, value, owner, registry, in_fallback),
        InputBinding::Conditional {
            when,
            then,
            otherwise,
        } => {
            validate_toggle(v, &format!("{path}.when"), when, owner, registry);
            // Both branches contribute edges regardless of the toggle, so
            // both are checked.
            validate_binding(v, &format!("{path}.then"), then, owner, registry, in_fallback);
            validate_binding(
                v,
                &format!("{path}.else"),
                otherwise,
                owner,
                registry,
                in_fallback,
            );
        }
        InputBinding::Fallback { fallback, default } => {
            if fallback.is_empty() {
                v.push(
                    format!("{path}.fallback"),
                    ViolationKind::Structure,
                    "fallback chain must not be empty",
                );
            }
            for (idx, candidate) in fallback.iter().enumerate() {
                validate_binding(
                    v,
                    &format!("{path}.fallback[{idx}]"),
                    candidate,
                    owner,
                    registry,
                    true,
                );
            }
            if let Some(default) = default {
                validate_value(
                    v,
                    &format!("{path}.default"),
                    default,
                    owner,
                    registry,
                    in_fallback,
                );
            }
        }
    }
}

fn validate_value(
    v: &mut Validator,
    path: &str,
    value: &AnyValue,
    owner: &NodeDecl,
    registry: &Registry,
    in_fallback: bool,
) {
    match value {
        AnyValue::Null | AnyValue::Bool(_) | AnyValue::Number(_) => {}
        AnyValue::String(s) => validate_string(v, path, s, owner, registry, in_fallback),
        AnyValue::Array(arr) => {
            for (idx, item) in arr.iter().enumerate() {
                validate_value(v, &format!("{path}[{idx}]"), item, owner, registry, in_fallback);
            }
        }
        AnyValue::Object(map) => {
            for (k, item) in map {
                validate_value(v, &format!("{path}.{k}"), item, owner, registry, in_fallback);
            }
        }
    }
}

fn validate_string(
    v: &mut Validator,
    path: &str,
    s: &str,
    owner: &NodeDecl,
    registry: &Registry,
    in_fallback: bool,
) {
    let template = match parse_template(s) {
        Ok(t) => t,
        Err(e) => {
            v.push(path, ViolationKind::Expression, e.to_string());
            return;
        }
    };
    for reference in template.references() {
        validate_reference(v, path, reference, owner, registry, in_fallback);
    }
}

pub(crate) fn validate_reference(
    v: &mut Validator,
    path: &str,
    reference: &Reference,
    owner: &NodeDecl,
    registry: &Registry,
    in_fallback: bool,
) {
    match reference {
        Reference::Var(_) => {}
        Reference::EachKey => {
            if owner.keys().is_none() {
                v.push(
                    path,
                    ViolationKind::Expression,
                    "each.key is only valid inside a count.forEach node",
                );
            }
        }
        Reference::Output(r) => {
            let Some(target) = registry.get(&r.node) else {
                v.push(
                    path,
                    ViolationKind::UnresolvedReference,
                    format!("reference to unknown node '{}'", r.node),
                );
                return;
            };
            if !target.declares_output(&r.output) {
                v.push(
                    path,
                    ViolationKind::UnresolvedReference,
                    format!("node '{}' declares no output '{}'", r.node, r.output),
                );
                return;
            }
            if target.is_conditional() && !r.guarded && !in_fallback {
                v.push(
                    path,
                    ViolationKind::UnguardedAbsentReference,
                    format!(
                        "'{}.{}' may be absent; guard the reference with '?' or place it in a fallback chain",
                        r.node, r.output
                    ),
                );
            }
        }
    }
}

/// A toggle is either a literal `true`/`false` or a single `${...}`
/// expression; it never mixes literal text with references.
pub(crate) fn validate_toggle(
    v: &mut Validator,
    path: &str,
    toggle: &str,
    owner: &NodeDecl,
    registry: &Registry,
) {
    let template = match parse_template(toggle) {
        Ok(t) => t,
        Err(e) => {
            v.push(path, ViolationKind::Expression, e.to_string());
            return;
        }
    };

    if let Some(reference) = template.as_single_expr() {
        validate_reference(v, path, reference, owner, registry, false);
        return;
    }

    if !is_literal_bool(&template) {
        v.push(
            path,
            ViolationKind::Expression,
            "toggle must be 'true', 'false', or a single ${...} expression",
        );
    }
}

fn is_literal_bool(template: &Template) -> bool {
    use crate::expressions::Segment;
    match template.segments.as_slice() {
        [Segment::Literal(s)] => {
            let t = s.trim();
            t.eq_ignore_ascii_case("true") || t.eq_ignore_ascii_case("false")
        }
        [] => false,
        _ => false,
    }
}
