use crate::planner::{Plan, PlanNode};
use crate::types::{AnyValue, InputBinding};

pub const REDACTED: &str = "<redacted>";

/// Compact, single-line rendering of a binding for plan review.
pub fn render_binding(binding: &InputBinding) -> String {
    match binding {
        InputBinding::Value(value) => render_value(value),
        InputBinding::Conditional {
            when,
            then,
            otherwise,
        } => format!(
            "when {when}: {} else {}",
            render_binding(then),
            render_binding(otherwise)
        ),
        InputBinding::Fallback { fallback, default } => {
            let candidates = fallback
                .iter()
                .map(render_binding)
                .collect::<Vec<_>>()
                .join(" | ");
            match default {
                Some(d) => format!("fallback[{candidates}] default {}", render_value(d)),
                None => format!("fallback[{candidates}]"),
            }
        }
    }
}

fn render_value(value: &AnyValue) -> String {
    match value {
        AnyValue::String(s) => s.clone(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

/// Changed-inputs view between two plans. Secret-bearing nodes always show
/// the redaction placeholder on both sides.
pub fn diff_plans(prev: &Plan, next: &Plan) -> Vec<String> {
    let mut lines = Vec::new();

    for node in &next.nodes {
        match prev.node(&node.id) {
            None => lines.push(format!("+ {}", node.id)),
            Some(old) => diff_node(old, node, &mut lines),
        }
    }
    for node in &prev.nodes {
        if next.node(&node.id).is_none() {
            lines.push(format!("- {}", node.id));
        }
    }

    lines
}

fn diff_node(old: &PlanNode, new: &PlanNode, lines: &mut Vec<String>) {
    for (name, rendered) in &new.inputs {
        match old.inputs.get(name) {
            None => lines.push(format!("+ {}.{name}: {rendered}", new.id)),
            Some(prev) if prev != rendered => {
                if new.secrets || old.secrets {
                    lines.push(format!("~ {}.{name}: {REDACTED} -> {REDACTED}", new.id));
                } else {
                    lines.push(format!("~ {}.{name}: {prev} -> {rendered}", new.id));
                }
            }
            Some(_) => {}
        }
    }
    for name in old.inputs.keys() {
        if !new.inputs.contains_key(name) {
            lines.push(format!("- {}.{name}", new.id));
        }
    }
}
