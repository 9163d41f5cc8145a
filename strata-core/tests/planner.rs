use strata_core::{
    plan_from_str, GraphError, ManifestFormat, PlanError, PlanInstantiation, PlanOptions,
};

fn plan_yaml(yaml: &str, vars: Option<serde_json::Value>) -> strata_core::Plan {
    let outcome = plan_from_str(yaml, ManifestFormat::Yaml, PlanOptions { vars }).unwrap();
    assert!(outcome.validation.is_valid, "{:?}", outcome.validation);
    outcome.plan.unwrap()
}

fn diamond_yaml() -> &'static str {
    r#"
strata: "0.1"
nodes:
  - id: a
    outputs: [id]
  - id: b
    outputs: [id]
  - id: c
    inputs:
      left: "${a.id}"
      right: "${b.id}"
    outputs: [id]
  - id: d
    inputs:
      parent: "${c.id}"
"#
}

#[test]
fn tiers_follow_longest_dependency_path() {
    let plan = plan_yaml(diamond_yaml(), None);

    assert_eq!(plan.graph.tiers.len(), 3);
    assert_eq!(plan.graph.tiers[0], vec!["a".to_string(), "b".to_string()]);
    assert_eq!(plan.graph.tiers[1], vec!["c".to_string()]);
    assert_eq!(plan.graph.tiers[2], vec!["d".to_string()]);

    assert_eq!(plan.graph.tier_of["a"], 0);
    assert_eq!(plan.graph.tier_of["b"], 0);
    assert_eq!(plan.graph.tier_of["c"], 1);
    assert_eq!(plan.graph.tier_of["d"], 2);
}

#[test]
fn topo_order_puts_dependencies_first() {
    let plan = plan_yaml(diamond_yaml(), None);
    let pos = |id: &str| plan.graph.topo_order.iter().position(|n| n == id).unwrap();

    assert!(pos("a") < pos("c"));
    assert!(pos("b") < pos("c"));
    assert!(pos("c") < pos("d"));
}

#[test]
fn planning_is_deterministic() {
    let first = plan_yaml(diamond_yaml(), None);
    let second = plan_yaml(diamond_yaml(), None);
    assert_eq!(first.graph.topo_order, second.graph.topo_order);
    assert_eq!(first.graph.tiers, second.graph.tiers);
}

#[test]
fn dependencies_found_in_all_binding_positions() {
    let yaml = r#"
strata: "0.1"
nodes:
  - id: base
    outputs: [id]
  - id: cond
    inputs:
      x:
        when: "${var.flag}"
        then: "${base.id}"
        else: "static"
  - id: chain
    inputs:
      x:
        fallback:
          - "${var.override}"
          - "${base.id}"
  - id: toggled
    count:
      when: "${base.id}"
"#;
    let plan = plan_yaml(yaml, None);
    assert_eq!(plan.graph.depends_on["cond"], vec!["base".to_string()]);
    assert_eq!(plan.graph.depends_on["chain"], vec!["base".to_string()]);
    assert_eq!(plan.graph.depends_on["toggled"], vec!["base".to_string()]);
}

#[test]
fn cycle_reports_a_closed_chain() {
    let yaml = r#"
strata: "0.1"
nodes:
  - id: a
    inputs:
      x: "${c.id}"
    outputs: [id]
  - id: b
    inputs:
      x: "${a.id}"
    outputs: [id]
  - id: c
    inputs:
      x: "${b.id}"
    outputs: [id]
"#;
    let err = plan_from_str(yaml, ManifestFormat::Yaml, PlanOptions::default()).unwrap_err();
    let PlanError::Graph(GraphError::Cycle { chain }) = err else {
        panic!("expected cycle, got {err:?}");
    };

    assert!(chain.len() >= 4);
    assert_eq!(chain.first(), chain.last());
    // Consecutive pairs must be real depends-on edges.
    let depends_on = |from: &str, to: &str| match (from, to) {
        ("a", "c") | ("b", "a") | ("c", "b") => true,
        _ => false,
    };
    for pair in chain.windows(2) {
        assert!(depends_on(&pair[0], &pair[1]), "{pair:?} is not an edge");
    }
}

#[test]
fn cycle_through_spanning_node_names_the_back_edge() {
    let yaml = r#"
strata: "0.1"
nodes:
  - id: x
    outputs: [id]
  - id: m1
    inputs:
      p: "${x.id}"
    outputs: [id]
  - id: m2
    inputs:
      p: "${m1.id}"
    outputs: [id]
  - id: y
    inputs:
      p: "${m2.id}"
      q: "${s.id}"
    outputs: [id]
  - id: s
    inputs:
      near: "${x.id}"
      far: "${y.id}"
    outputs: [id]
"#;
    let err = plan_from_str(yaml, ManifestFormat::Yaml, PlanOptions::default()).unwrap_err();
    let PlanError::Graph(GraphError::SpanningCycle { node, from, to }) = err else {
        panic!("expected spanning cycle, got {err:?}");
    };
    assert_eq!(node, "s");
    assert_eq!(from, "y");
    assert_eq!(to, "s");
}

#[test]
fn spanning_nodes_are_reported_in_summary() {
    let yaml = r#"
strata: "0.1"
nodes:
  - id: x
    outputs: [id]
  - id: mid
    inputs:
      p: "${x.id}"
    outputs: [id]
  - id: s
    inputs:
      near: "${x.id}"
      far: "${mid.id}"
"#;
    let plan = plan_yaml(yaml, None);
    assert_eq!(plan.summary.spanning_nodes, vec!["s".to_string()]);
}

#[test]
fn missing_vars_reported_without_failing_the_plan() {
    let yaml = r#"
strata: "0.1"
nodes:
  - id: a
    inputs:
      region: "${var.region}"
      zone: "${var.zone}"
"#;
    let plan = plan_yaml(yaml, Some(serde_json::json!({ "region": "eu-1" })));
    assert!(plan.summary.missing_vars.contains("zone"));
    assert!(!plan.summary.missing_vars.contains("region"));

    let node = plan.node("a").unwrap();
    assert!(node.referenced_vars.contains("region"));
    assert!(node.referenced_vars.contains("zone"));
    assert_eq!(node.missing_vars.len(), 1);
}

#[test]
fn conditional_toggle_decided_early_from_supplied_vars() {
    let yaml = r#"
strata: "0.1"
nodes:
  - id: a
    count:
      when: "${var.enabled}"
"#;
    let plan = plan_yaml(yaml, Some(serde_json::json!({ "enabled": "false" })));
    match &plan.node("a").unwrap().instantiation {
        PlanInstantiation::Conditional { enabled, .. } => assert_eq!(*enabled, Some(false)),
        other => panic!("unexpected instantiation {other:?}"),
    }

    // Without the var the decision waits for apply time.
    let plan = plan_yaml(yaml, None);
    match &plan.node("a").unwrap().instantiation {
        PlanInstantiation::Conditional { enabled, .. } => assert_eq!(*enabled, None),
        other => panic!("unexpected instantiation {other:?}"),
    }
}

#[test]
fn keyed_instantiation_lists_declared_keys() {
    let yaml = r#"
strata: "0.1"
nodes:
  - id: accounts
    count:
      forEach: [alpha, beta]
"#;
    let plan = plan_yaml(yaml, None);
    match &plan.node("accounts").unwrap().instantiation {
        PlanInstantiation::Keyed { keys } => {
            assert_eq!(keys, &vec!["alpha".to_string(), "beta".to_string()]);
        }
        other => panic!("unexpected instantiation {other:?}"),
    }
}

#[test]
fn node_tags_override_manifest_tags() {
    let yaml = r#"
strata: "0.1"
tags:
  env: prod
  team: core
nodes:
  - id: a
    tags:
      env: staging
"#;
    let plan = plan_yaml(yaml, None);
    let tags = &plan.node("a").unwrap().tags;
    assert_eq!(tags["env"], "staging");
    assert_eq!(tags["team"], "core");
}

#[test]
fn invalid_manifest_yields_no_plan() {
    let yaml = r#"
strata: "0.1"
nodes:
  - id: a
    inputs:
      x: "${ghost.id}"
"#;
    let outcome = plan_from_str(yaml, ManifestFormat::Yaml, PlanOptions::default()).unwrap();
    assert!(!outcome.validation.is_valid);
    assert!(outcome.plan.is_none());
}

#[test]
fn diff_reports_added_removed_and_changed_inputs() {
    let before = plan_yaml(
        r#"
strata: "0.1"
nodes:
  - id: a
    inputs:
      size: small
  - id: gone
"#,
        None,
    );
    let after = plan_yaml(
        r#"
strata: "0.1"
nodes:
  - id: a
    inputs:
      size: large
  - id: fresh
"#,
        None,
    );

    let diff = strata_core::diff_plans(&before, &after);
    assert!(diff.contains(&"~ a.size: small -> large".to_string()));
    assert!(diff.contains(&"+ fresh".to_string()));
    assert!(diff.contains(&"- gone".to_string()));
}

#[test]
fn diff_redacts_changed_inputs_of_secret_nodes() {
    let before = plan_yaml(
        r#"
strata: "0.1"
nodes:
  - id: api-keys
    secrets: true
    count:
      forEach: [billing]
    inputs:
      rotation: 30d
"#,
        None,
    );
    let after = plan_yaml(
        r#"
strata: "0.1"
nodes:
  - id: api-keys
    secrets: true
    count:
      forEach: [billing]
    inputs:
      rotation: 60d
"#,
        None,
    );

    let diff = strata_core::diff_plans(&before, &after);
    assert!(diff.contains(&"~ api-keys.rotation: <redacted> -> <redacted>".to_string()));
    assert!(!diff.iter().any(|line| line.contains("30d") || line.contains("60d")));
}
