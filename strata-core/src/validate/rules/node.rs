use std::collections::HashSet;

use crate::error::ViolationKind;
use crate::types::{CountSpec, NodeDecl};
use crate::validate::validator::{Validator, ID_RE};

use super::{bindings, Registry};

pub(crate) fn validate_node(v: &mut Validator, n: &NodeDecl, path: &str, registry: &Registry) {
    let mut seen_outputs = HashSet::new();
    for (oidx, out) in n.outputs.iter().enumerate() {
        let opath = format!("{path}.outputs[{oidx}]");
        if out.is_empty() || !ID_RE.is_match(out) {
            v.push(&opath, ViolationKind::Structure, "must match [A-Za-z0-9_-]+");
        }
        if !seen_outputs.insert(out.as_str()) {
            v.push(
                &opath,
                ViolationKind::Structure,
                format!("duplicate output name '{out}'"),
            );
        }
    }

    match &n.count {
        None => {}
        Some(CountSpec::When { when }) => {
            bindings::validate_toggle(v, &format!("{path}.count.when"), when, n, registry);
        }
        Some(CountSpec::ForEach { for_each }) => {
            if for_each.is_empty() {
                v.push(
                    format!("{path}.count.forEach"),
                    ViolationKind::Structure,
                    "key set must not be empty",
                );
            }
            let mut seen = HashSet::new();
            for (kidx, key) in for_each.iter().enumerate() {
                let kpath = format!("{path}.count.forEach[{kidx}]");
                if key.is_empty() || !ID_RE.is_match(key) {
                    v.push(&kpath, ViolationKind::Structure, "must match [A-Za-z0-9_-]+");
                }
                if !seen.insert(key.as_str()) {
                    v.push(
                        &kpath,
                        ViolationKind::Structure,
                        format!("duplicate key '{key}'"),
                    );
                }
            }
        }
    }

    if n.secrets && n.keys().is_none() {
        // The public key set is what keeps secret values out of addressing.
        v.push(
            format!("{path}.secrets"),
            ViolationKind::Structure,
            "a secrets node requires a count.forEach key set",
        );
    }

    for (name, binding) in &n.inputs {
        bindings::validate_binding(
            v,
            &format!("{path}.inputs.{name}"),
            binding,
            n,
            registry,
            false,
        );
    }
}
