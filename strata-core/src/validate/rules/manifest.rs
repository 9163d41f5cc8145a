use std::collections::HashSet;

use crate::error::ViolationKind;
use crate::expressions::RESERVED_ROOTS;
use crate::types::Manifest;
use crate::validate::validator::{Validator, ID_RE};

use super::{node, Registry};

pub(crate) fn validate_manifest(v: &mut Validator, manifest: &Manifest) {
    v.validate_format_version("strata", &manifest.strata);

    let mut seen = HashSet::new();
    for (idx, n) in manifest.nodes.iter().enumerate() {
        let path = format!("nodes[{idx}]");

        if n.id.is_empty() || !ID_RE.is_match(&n.id) {
            v.push(
                format!("{path}.id"),
                ViolationKind::Structure,
                "must match [A-Za-z0-9_-]+",
            );
        }
        if RESERVED_ROOTS.contains(&n.id.as_str()) {
            v.push(
                format!("{path}.id"),
                ViolationKind::Structure,
                format!("'{}' is a reserved expression root", n.id),
            );
        }
        if !seen.insert(n.id.as_str()) {
            v.push(
                format!("{path}.id"),
                ViolationKind::Structure,
                format!("duplicate node id '{}'", n.id),
            );
        }
    }

    let registry = Registry::new(&manifest.nodes);
    for (idx, n) in manifest.nodes.iter().enumerate() {
        node::validate_node(v, n, &format!("nodes[{idx}]"), &registry);
    }
}
