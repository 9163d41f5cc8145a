use std::collections::{BTreeMap, BTreeSet};

use crate::expressions::{parse_template, OutputRef, Reference};
use crate::types::{AnyValue, CountSpec, InputBinding, Manifest, NodeDecl};

#[derive(Debug, Default)]
pub(crate) struct ScanResult {
    /// Typed edges per node: every output another node's bindings touch,
    /// including both branches of conditionals and all fallback candidates.
    pub node_dependencies: BTreeMap<String, BTreeSet<OutputRef>>,
    pub referenced_vars_by_node: BTreeMap<String, BTreeSet<String>>,
    pub missing_vars_by_node: BTreeMap<String, BTreeSet<String>>,
    pub missing_vars_all: BTreeSet<String>,
}

pub(crate) fn scan_manifest(manifest: &Manifest, vars: Option<&serde_json::Value>) -> ScanResult {
    let mut out = ScanResult::default();
    for node in &manifest.nodes {
        let mut deps = BTreeSet::<OutputRef>::new();
        let mut vars_ref = BTreeSet::<String>::new();

        scan_node(node, &mut deps, &mut vars_ref);

        out.node_dependencies.insert(node.id.clone(), deps);
        out.referenced_vars_by_node
            .insert(node.id.clone(), vars_ref.clone());

        let missing = compute_missing_vars(&vars_ref, vars);
        if !missing.is_empty() {
            out.missing_vars_all.extend(missing.iter().cloned());
            out.missing_vars_by_node.insert(node.id.clone(), missing);
        }
    }
    out
}

fn scan_node(node: &NodeDecl, deps: &mut BTreeSet<OutputRef>, vars_ref: &mut BTreeSet<String>) {
    if let Some(CountSpec::When { when }) = &node.count {
        scan_string(when, deps, vars_ref);
    }
    for binding in node.inputs.values() {
        scan_binding(binding, deps, vars_ref);
    }
}

fn scan_binding(
    binding: &InputBinding,
    deps: &mut BTreeSet<OutputRef>,
    vars_ref: &mut BTreeSet<String>,
) {
    match binding {
        InputBinding::Value(value) => scan_value(value, deps, vars_ref),
        InputBinding::Conditional {
            when,
            then,
            otherwise,
        } => {
            // Edges are conservative: both branches count even though only
            // one is taken at apply time.
            scan_string(when, deps, vars_ref);
            scan_binding(then, deps, vars_ref);
            scan_binding(otherwise, deps, vars_ref);
        }
        InputBinding::Fallback { fallback, default } => {
            for candidate in fallback {
                scan_binding(candidate, deps, vars_ref);
            }
            if let Some(default) = default {
                scan_value(default, deps, vars_ref);
            }
        }
    }
}

fn scan_value(value: &AnyValue, deps: &mut BTreeSet<OutputRef>, vars_ref: &mut BTreeSet<String>) {
    match value {
        AnyValue::Null | AnyValue::Bool(_) | AnyValue::Number(_) => {}
        AnyValue::String(s) => scan_string(s, deps, vars_ref),
        AnyValue::Array(arr) => {
            for v in arr {
                scan_value(v, deps, vars_ref);
            }
        }
        AnyValue::Object(map) => {
            for (_k, v) in map {
                scan_value(v, deps, vars_ref);
            }
        }
    }
}

fn scan_string(s: &str, deps: &mut BTreeSet<OutputRef>, vars_ref: &mut BTreeSet<String>) {
    // Unparseable strings are the validator's problem; the scan only runs
    // on manifests that already passed validation.
    let Ok(template) = parse_template(s) else {
        return;
    };
    for reference in template.references() {
        match reference {
            Reference::Output(r) => {
                deps.insert(r.clone());
            }
            Reference::Var(name) => {
                vars_ref.insert(name.clone());
            }
            Reference::EachKey => {}
        }
    }
}

fn compute_missing_vars(
    referenced: &BTreeSet<String>,
    vars: Option<&serde_json::Value>,
) -> BTreeSet<String> {
    let Some(vars) = vars else {
        return referenced.clone();
    };

    referenced
        .iter()
        .filter(|name| !var_present(vars, name))
        .cloned()
        .collect()
}

fn var_present(vars: &serde_json::Value, name: &str) -> bool {
    vars.as_object().is_some_and(|obj| obj.contains_key(name))
}
