mod format;
mod graph;
mod model;
mod scan;

use crate::error::ParseError;
use crate::expressions::{parse_template, parse_toggle, Reference};
use crate::parser::{parse_manifest_str, ManifestFormat};
use crate::types::{CountSpec, Manifest, NodeDecl, TagMap};
use crate::validate::validate_manifest;

pub use format::{diff_plans, render_binding, REDACTED};
pub use graph::{DependencyGraph, GraphError};
pub use model::{
    Plan, PlanInstantiation, PlanNode, PlanSummary, PlanningOutcome, ValidationSummary,
};

#[derive(Debug, Clone, Default)]
pub struct PlanOptions {
    /// Optional caller-resolved variables (used to report missing vars and
    /// to decide conditional instantiation ahead of apply).
    pub vars: Option<serde_json::Value>,
}

pub fn plan_from_str(
    input: &str,
    format: ManifestFormat,
    options: PlanOptions,
) -> Result<PlanningOutcome, PlanError> {
    let parsed = parse_manifest_str(input, format).map_err(PlanError::Parse)?;
    plan_manifest(&parsed.manifest, options)
}

pub fn plan_manifest(
    manifest: &Manifest,
    options: PlanOptions,
) -> Result<PlanningOutcome, PlanError> {
    let validation = match validate_manifest(manifest) {
        Ok(()) => ValidationSummary::valid(),
        Err(e) => ValidationSummary::invalid_from(e),
    };

    if !validation.is_valid {
        return Ok(PlanningOutcome {
            validation,
            plan: None,
        });
    }

    let plan = build_plan(manifest, options.vars.as_ref())?;
    Ok(PlanningOutcome {
        validation,
        plan: Some(plan),
    })
}

fn build_plan(manifest: &Manifest, vars: Option<&serde_json::Value>) -> Result<Plan, PlanError> {
    let scan = scan::scan_manifest(manifest, vars);
    let graph = graph::build_dependency_graph(manifest, &scan.node_dependencies)?;

    let nodes = graph
        .topo_order
        .iter()
        .filter_map(|id| manifest.node(id))
        .map(|n| {
            let depends_on = graph.depends_on.get(&n.id).cloned().unwrap_or_default();

            PlanNode {
                id: n.id.clone(),
                tier: graph.tier_of.get(&n.id).copied().unwrap_or(0),
                depends_on,
                instantiation: plan_instantiation(n, vars),
                declared_outputs: n.outputs.clone(),
                referenced_vars: scan
                    .referenced_vars_by_node
                    .get(&n.id)
                    .cloned()
                    .unwrap_or_default(),
                missing_vars: scan
                    .missing_vars_by_node
                    .get(&n.id)
                    .cloned()
                    .unwrap_or_default(),
                secrets: n.secrets,
                tags: merged_tags(&manifest.tags, &n.tags),
                inputs: n
                    .inputs
                    .iter()
                    .map(|(name, binding)| (name.clone(), render_binding(binding)))
                    .collect(),
            }
        })
        .collect::<Vec<_>>();

    Ok(Plan {
        summary: PlanSummary {
            manifest_version: manifest.strata.clone(),
            missing_vars: scan.missing_vars_all,
            spanning_nodes: graph.spanning.clone(),
        },
        graph,
        nodes,
    })
}

fn plan_instantiation(node: &NodeDecl, vars: Option<&serde_json::Value>) -> PlanInstantiation {
    match &node.count {
        None => PlanInstantiation::Always,
        Some(CountSpec::ForEach { for_each }) => PlanInstantiation::Keyed {
            keys: for_each.clone(),
        },
        Some(CountSpec::When { when }) => PlanInstantiation::Conditional {
            toggle: when.clone(),
            enabled: decide_toggle_early(when, vars),
        },
    }
}

/// A toggle can be decided at plan time only when it is a literal or a var
/// the caller already supplied; output-driven toggles wait for apply.
fn decide_toggle_early(toggle: &str, vars: Option<&serde_json::Value>) -> Option<bool> {
    let template = parse_template(toggle).ok()?;
    match template.as_single_expr() {
        Some(Reference::Var(name)) => {
            let value = vars?.as_object()?.get(name)?;
            parse_toggle(value)
        }
        Some(_) => None,
        None => parse_toggle(&serde_json::Value::String(toggle.trim().to_string())),
    }
}

/// Pure merge of base manifest tags with a node's own; node tags win.
pub fn merged_tags(base: &TagMap, node: &TagMap) -> TagMap {
    let mut out = base.clone();
    for (k, v) in node {
        out.insert(k.clone(), v.clone());
    }
    out
}

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Graph(#[from] GraphError),
}
