use std::collections::{BTreeMap, BTreeSet};

use crate::expressions::OutputRef;
use crate::types::Manifest;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DependencyGraph {
    /// For each node, which nodes it depends on.
    pub depends_on: BTreeMap<String, Vec<String>>,
    /// Nodes grouped by execution tier; tier i+1 never starts before all
    /// of tier i has completed.
    pub tiers: Vec<Vec<String>>,
    /// A deterministic topological order (dependencies first).
    pub topo_order: Vec<String>,
    pub tier_of: BTreeMap<String, usize>,
    /// Nodes whose direct dependencies land in more than one tier.
    pub spanning: Vec<String>,
}

impl DependencyGraph {
    pub fn to_dot(&self, title: &str) -> String {
        let mut out = String::new();
        out.push_str("digraph strata {\n");
        out.push_str(&format!("  label=\"{title}\";\n"));
        out.push_str("  labelloc=t;\n");
        out.push_str("  rankdir=LR;\n");

        for (node, deps) in &self.depends_on {
            if deps.is_empty() {
                out.push_str(&format!("  \"{node}\";\n"));
            } else {
                for dep in deps {
                    out.push_str(&format!("  \"{dep}\" -> \"{node}\";\n"));
                }
            }
        }

        for tier in &self.tiers {
            if tier.len() > 1 {
                out.push_str("  { rank=same; ");
                for n in tier {
                    out.push_str(&format!("\"{n}\"; "));
                }
                out.push_str("}\n");
            }
        }

        out.push_str("}\n");
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// The chain lists node ids in depends-on order; the first id is
    /// repeated at the end to close the loop.
    #[error("dependency cycle: {}", chain.join(" -> "))]
    Cycle { chain: Vec<String> },
    #[error("edge '{from}' -> '{to}' closes a cycle back through spanning node '{node}'")]
    SpanningCycle {
        node: String,
        from: String,
        to: String,
    },
}

pub(crate) fn build_dependency_graph(
    manifest: &Manifest,
    deps: &BTreeMap<String, BTreeSet<OutputRef>>,
) -> Result<DependencyGraph, GraphError> {
    let node_ids: BTreeSet<String> = manifest.nodes.iter().map(|n| n.id.clone()).collect();

    let mut depends_on: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for id in &node_ids {
        let mut d: Vec<String> = deps
            .get(id)
            .map(|refs| {
                refs.iter()
                    .map(|r| r.node.clone())
                    .filter(|n| node_ids.contains(n))
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect()
            })
            .unwrap_or_default();
        d.sort();
        depends_on.insert(id.clone(), d);
    }

    let topo_order = match dfs_topo(&node_ids, &depends_on) {
        Ok(order) => order,
        Err((chain, back_edge)) => {
            return Err(classify_cycle(&node_ids, &depends_on, chain, back_edge))
        }
    };

    let (tiers, tier_of) = compute_tiers(&topo_order, &depends_on);
    let spanning = spanning_nodes(&depends_on, &tier_of);

    Ok(DependencyGraph {
        depends_on,
        tiers,
        topo_order,
        tier_of,
        spanning,
    })
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Depth-first topological sort with an explicit recursion stack.
///
/// On a back-edge, returns the full cycle chain (first node repeated at the
/// end) and the offending edge.
fn dfs_topo(
    nodes: &BTreeSet<String>,
    depends_on: &BTreeMap<String, Vec<String>>,
) -> Result<Vec<String>, (Vec<String>, (String, String))> {
    let mut marks: BTreeMap<&str, Mark> = BTreeMap::new();
    let mut stack: Vec<&str> = Vec::new();
    let mut out: Vec<String> = Vec::with_capacity(nodes.len());

    for node in nodes {
        if marks.contains_key(node.as_str()) {
            continue;
        }
        if let Some(cycle) = visit(node, depends_on, &mut marks, &mut stack, &mut out) {
            return Err(cycle);
        }
    }
    Ok(out)
}

fn visit<'a>(
    node: &'a str,
    depends_on: &'a BTreeMap<String, Vec<String>>,
    marks: &mut BTreeMap<&'a str, Mark>,
    stack: &mut Vec<&'a str>,
    out: &mut Vec<String>,
) -> Option<(Vec<String>, (String, String))> {
    marks.insert(node, Mark::InProgress);
    stack.push(node);

    for dep in depends_on.get(node).map(|v| v.as_slice()).unwrap_or(&[]) {
        match marks.get(dep.as_str()) {
            Some(Mark::Done) => {}
            Some(Mark::InProgress) => {
                // dep is on the stack: the slice from dep to the current
                // node, closed by this edge, is the cycle.
                let pos = stack
                    .iter()
                    .position(|n| *n == dep.as_str())
                    .unwrap_or_default();
                let mut chain: Vec<String> = stack[pos..].iter().map(|s| s.to_string()).collect();
                chain.push(dep.clone());
                return Some((chain, (node.to_string(), dep.clone())));
            }
            None => {
                if let Some(cycle) = visit(dep, depends_on, marks, stack, out) {
                    return Some(cycle);
                }
            }
        }
    }

    stack.pop();
    marks.insert(node, Mark::Done);
    out.push(node.to_string());
    None
}

/// Longest-path tiers: a node sits one past its deepest dependency, roots
/// at tier 0. No valid tiering can place any node earlier.
fn compute_tiers(
    topo: &[String],
    depends_on: &BTreeMap<String, Vec<String>>,
) -> (Vec<Vec<String>>, BTreeMap<String, usize>) {
    let mut tier_of: BTreeMap<String, usize> = BTreeMap::new();
    for node in topo {
        let deps = depends_on.get(node).map(|v| v.as_slice()).unwrap_or(&[]);
        let tier = deps
            .iter()
            .filter_map(|d| tier_of.get(d).copied())
            .max()
            .map(|m| m + 1)
            .unwrap_or(0);
        tier_of.insert(node.clone(), tier);
    }

    let max_tier = tier_of.values().copied().max().unwrap_or(0);
    let mut tiers = vec![Vec::<String>::new(); if tier_of.is_empty() { 0 } else { max_tier + 1 }];
    for node in topo {
        tiers[tier_of[node]].push(node.clone());
    }
    for tier in &mut tiers {
        tier.sort();
    }
    (tiers, tier_of)
}

fn spanning_nodes(
    depends_on: &BTreeMap<String, Vec<String>>,
    tier_of: &BTreeMap<String, usize>,
) -> Vec<String> {
    depends_on
        .iter()
        .filter(|(_, deps)| {
            let distinct: BTreeSet<usize> = deps
                .iter()
                .filter_map(|d| tier_of.get(d).copied())
                .collect();
            distinct.len() > 1
        })
        .map(|(n, _)| n.clone())
        .collect()
}

/// Distinguish an ordinary cycle from one closed back through a spanning
/// node: drop the back-edge, tier the residual graph, and see whether any
/// node on the chain draws direct dependencies from more than one tier.
fn classify_cycle(
    nodes: &BTreeSet<String>,
    depends_on: &BTreeMap<String, Vec<String>>,
    chain: Vec<String>,
    back_edge: (String, String),
) -> GraphError {
    let (from, to) = back_edge;

    let mut residual = depends_on.clone();
    if let Some(deps) = residual.get_mut(&from) {
        deps.retain(|d| *d != to);
    }

    let Ok(topo) = dfs_topo(nodes, &residual) else {
        // Still cyclic without this edge; report the plain cycle.
        return GraphError::Cycle { chain };
    };
    let (_, tier_of) = compute_tiers(&topo, &residual);

    // Walk the chain starting from the node the back-edge re-enters.
    let mut candidates: Vec<&String> = chain.iter().collect();
    candidates.dedup();
    for node in candidates {
        let deps = residual.get(node).map(|v| v.as_slice()).unwrap_or(&[]);
        let distinct: BTreeSet<usize> = deps
            .iter()
            .filter_map(|d| tier_of.get(d).copied())
            .collect();
        if distinct.len() > 1 {
            return GraphError::SpanningCycle {
                node: node.clone(),
                from,
                to,
            };
        }
    }

    GraphError::Cycle { chain }
}
