use std::collections::BTreeMap;

use strata_core::{parse_manifest_str, ManifestFormat, Manifest};
use strata_exec::resolve::{
    decide_instantiation, resolve_inputs, Instantiation, NodeOutputs, Resolved, ResolveContext,
    ResolveError,
};
use strata_exec::vars::StaticVars;

fn manifest(yaml: &str) -> Manifest {
    parse_manifest_str(yaml, ManifestFormat::Yaml)
        .unwrap()
        .manifest
}

fn single_outputs(pairs: &[(&str, serde_json::Value)]) -> NodeOutputs {
    NodeOutputs::Single(
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect(),
    )
}

#[tokio::test]
async fn literal_values_pass_through_with_their_type() {
    let m = manifest(
        r#"
strata: "0.1"
nodes:
  - id: a
    inputs:
      count: 3
      flag: true
      name: plain
"#,
    );
    let outputs = BTreeMap::new();
    let vars = StaticVars::default();
    let ctx = ResolveContext {
        node: m.node("a").unwrap(),
        outputs: &outputs,
        vars: &vars,
        each_key: None,
    };

    let resolved = resolve_inputs(&ctx).await.unwrap();
    assert_eq!(resolved["count"], Resolved::Present(serde_json::json!(3)));
    assert_eq!(resolved["flag"], Resolved::Present(serde_json::json!(true)));
    assert_eq!(
        resolved["name"],
        Resolved::Present(serde_json::json!("plain"))
    );
}

#[tokio::test]
async fn single_expression_preserves_referenced_type() {
    let m = manifest(
        r#"
strata: "0.1"
nodes:
  - id: base
    outputs: [port]
  - id: a
    inputs:
      port: "${base.port}"
      url: "http://host:${base.port}/"
"#,
    );
    let mut outputs = BTreeMap::new();
    outputs.insert(
        "base".to_string(),
        single_outputs(&[("port", serde_json::json!(8080))]),
    );
    let vars = StaticVars::default();
    let ctx = ResolveContext {
        node: m.node("a").unwrap(),
        outputs: &outputs,
        vars: &vars,
        each_key: None,
    };

    let resolved = resolve_inputs(&ctx).await.unwrap();
    assert_eq!(resolved["port"], Resolved::Present(serde_json::json!(8080)));
    assert_eq!(
        resolved["url"],
        Resolved::Present(serde_json::json!("http://host:8080/"))
    );
}

#[tokio::test]
async fn fallback_takes_first_non_empty_candidate_in_order() {
    let m = manifest(
        r#"
strata: "0.1"
nodes:
  - id: a
    inputs:
      region:
        fallback:
          - "${var.override}"
          - "${var.region}"
        default: eu-central
"#,
    );
    let outputs = BTreeMap::new();

    // Blank counts as unset, so the chain moves past it.
    let vars = StaticVars::from_value(serde_json::json!({ "override": "", "region": "us-east" }));
    let ctx = ResolveContext {
        node: m.node("a").unwrap(),
        outputs: &outputs,
        vars: &vars,
        each_key: None,
    };
    let resolved = resolve_inputs(&ctx).await.unwrap();
    assert_eq!(
        resolved["region"],
        Resolved::Present(serde_json::json!("us-east"))
    );

    let vars = StaticVars::from_value(serde_json::json!({ "override": "primary" }));
    let ctx = ResolveContext {
        node: m.node("a").unwrap(),
        outputs: &outputs,
        vars: &vars,
        each_key: None,
    };
    let resolved = resolve_inputs(&ctx).await.unwrap();
    assert_eq!(
        resolved["region"],
        Resolved::Present(serde_json::json!("primary"))
    );
}

#[tokio::test]
async fn fallback_default_applies_when_every_candidate_is_unset() {
    let m = manifest(
        r#"
strata: "0.1"
nodes:
  - id: a
    inputs:
      region:
        fallback:
          - "${var.override}"
        default: eu-central
"#,
    );
    let outputs = BTreeMap::new();
    let vars = StaticVars::default();
    let ctx = ResolveContext {
        node: m.node("a").unwrap(),
        outputs: &outputs,
        vars: &vars,
        each_key: None,
    };

    let resolved = resolve_inputs(&ctx).await.unwrap();
    assert_eq!(
        resolved["region"],
        Resolved::Present(serde_json::json!("eu-central"))
    );
}

#[tokio::test]
async fn exhausted_fallback_without_default_is_an_error() {
    let m = manifest(
        r#"
strata: "0.1"
nodes:
  - id: a
    inputs:
      region:
        fallback:
          - "${var.override}"
"#,
    );
    let outputs = BTreeMap::new();
    let vars = StaticVars::default();
    let ctx = ResolveContext {
        node: m.node("a").unwrap(),
        outputs: &outputs,
        vars: &vars,
        each_key: None,
    };

    let err = resolve_inputs(&ctx).await.unwrap_err();
    match err {
        ResolveError::RequiredInputMissing { node, input } => {
            assert_eq!(node, "a");
            assert_eq!(input, "region");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn empty_collections_count_as_unset_in_fallbacks() {
    let m = manifest(
        r#"
strata: "0.1"
nodes:
  - id: a
    inputs:
      zones:
        fallback:
          - "${var.zones}"
        default: [default-zone]
"#,
    );
    let outputs = BTreeMap::new();
    let vars = StaticVars::from_value(serde_json::json!({ "zones": [] }));
    let ctx = ResolveContext {
        node: m.node("a").unwrap(),
        outputs: &outputs,
        vars: &vars,
        each_key: None,
    };

    let resolved = resolve_inputs(&ctx).await.unwrap();
    assert_eq!(
        resolved["zones"],
        Resolved::Present(serde_json::json!(["default-zone"]))
    );
}

#[tokio::test]
async fn conditional_binding_follows_the_toggle() {
    let m = manifest(
        r#"
strata: "0.1"
nodes:
  - id: a
    inputs:
      tier:
        when: "${var.big}"
        then: xlarge
        else: small
"#,
    );
    let outputs = BTreeMap::new();

    let vars = StaticVars::from_value(serde_json::json!({ "big": true }));
    let ctx = ResolveContext {
        node: m.node("a").unwrap(),
        outputs: &outputs,
        vars: &vars,
        each_key: None,
    };
    let resolved = resolve_inputs(&ctx).await.unwrap();
    assert_eq!(resolved["tier"], Resolved::Present(serde_json::json!("xlarge")));

    // Absent toggle defaults to false.
    let vars = StaticVars::default();
    let ctx = ResolveContext {
        node: m.node("a").unwrap(),
        outputs: &outputs,
        vars: &vars,
        each_key: None,
    };
    let resolved = resolve_inputs(&ctx).await.unwrap();
    assert_eq!(resolved["tier"], Resolved::Present(serde_json::json!("small")));
}

#[tokio::test]
async fn non_boolean_toggle_is_rejected() {
    let m = manifest(
        r#"
strata: "0.1"
nodes:
  - id: a
    inputs:
      tier:
        when: "${var.big}"
        then: xlarge
        else: small
"#,
    );
    let outputs = BTreeMap::new();
    let vars = StaticVars::from_value(serde_json::json!({ "big": "yes" }));
    let ctx = ResolveContext {
        node: m.node("a").unwrap(),
        outputs: &outputs,
        vars: &vars,
        each_key: None,
    };

    let err = resolve_inputs(&ctx).await.unwrap_err();
    assert!(matches!(err, ResolveError::InvalidToggle { .. }));
}

#[tokio::test]
async fn guarded_absent_reference_poisons_the_whole_value() {
    let m = manifest(
        r#"
strata: "0.1"
nodes:
  - id: maybe
    count:
      when: "false"
    outputs: [id]
  - id: a
    inputs:
      tagline:
        fallback:
          - "attached to ${maybe.id?}"
        default: standalone
"#,
    );
    let mut outputs = BTreeMap::new();
    outputs.insert("maybe".to_string(), NodeOutputs::Absent);
    let vars = StaticVars::default();
    let ctx = ResolveContext {
        node: m.node("a").unwrap(),
        outputs: &outputs,
        vars: &vars,
        each_key: None,
    };

    let resolved = resolve_inputs(&ctx).await.unwrap();
    assert_eq!(
        resolved["tagline"],
        Resolved::Present(serde_json::json!("standalone"))
    );
}

#[tokio::test]
async fn unguarded_reference_to_absent_outputs_is_an_error() {
    let m = manifest(
        r#"
strata: "0.1"
nodes:
  - id: maybe
    count:
      when: "false"
    outputs: [id]
  - id: a
    inputs:
      x: "${maybe.id}"
"#,
    );
    let mut outputs = BTreeMap::new();
    outputs.insert("maybe".to_string(), NodeOutputs::Absent);
    let vars = StaticVars::default();
    let ctx = ResolveContext {
        node: m.node("a").unwrap(),
        outputs: &outputs,
        vars: &vars,
        each_key: None,
    };

    let err = resolve_inputs(&ctx).await.unwrap_err();
    assert!(matches!(err, ResolveError::UnguardedAbsent { .. }));
}

#[tokio::test]
async fn keyed_outputs_expose_a_map_by_instance_key() {
    let m = manifest(
        r#"
strata: "0.1"
nodes:
  - id: accounts
    count:
      forEach: [alpha, beta]
    outputs: [id]
  - id: a
    inputs:
      accounts: "${accounts.id}"
"#,
    );
    let mut by_key = BTreeMap::new();
    by_key.insert(
        "alpha".to_string(),
        BTreeMap::from([("id".to_string(), serde_json::json!("acc-1"))]),
    );
    by_key.insert(
        "beta".to_string(),
        BTreeMap::from([("id".to_string(), serde_json::json!("acc-2"))]),
    );
    let mut outputs = BTreeMap::new();
    outputs.insert("accounts".to_string(), NodeOutputs::Keyed(by_key));
    let vars = StaticVars::default();
    let ctx = ResolveContext {
        node: m.node("a").unwrap(),
        outputs: &outputs,
        vars: &vars,
        each_key: None,
    };

    let resolved = resolve_inputs(&ctx).await.unwrap();
    assert_eq!(
        resolved["accounts"],
        Resolved::Present(serde_json::json!({ "alpha": "acc-1", "beta": "acc-2" }))
    );
}

#[tokio::test]
async fn each_key_resolves_inside_a_keyed_instance() {
    let m = manifest(
        r#"
strata: "0.1"
nodes:
  - id: accounts
    count:
      forEach: [alpha]
    inputs:
      name: "account-${each.key}"
"#,
    );
    let outputs = BTreeMap::new();
    let vars = StaticVars::default();
    let ctx = ResolveContext {
        node: m.node("accounts").unwrap(),
        outputs: &outputs,
        vars: &vars,
        each_key: Some("alpha"),
    };

    let resolved = resolve_inputs(&ctx).await.unwrap();
    assert_eq!(
        resolved["name"],
        Resolved::Present(serde_json::json!("account-alpha"))
    );

    let ctx = ResolveContext {
        node: m.node("accounts").unwrap(),
        outputs: &outputs,
        vars: &vars,
        each_key: None,
    };
    let err = resolve_inputs(&ctx).await.unwrap_err();
    assert!(matches!(err, ResolveError::EachKeyUnavailable { .. }));
}

#[tokio::test]
async fn instantiation_decision_covers_all_three_shapes() {
    let m = manifest(
        r#"
strata: "0.1"
nodes:
  - id: plain
  - id: toggled
    count:
      when: "${var.enabled}"
  - id: keyed
    count:
      forEach: [a, b]
"#,
    );
    let outputs = BTreeMap::new();
    let vars = StaticVars::from_value(serde_json::json!({ "enabled": false }));

    let ctx = ResolveContext {
        node: m.node("plain").unwrap(),
        outputs: &outputs,
        vars: &vars,
        each_key: None,
    };
    assert_eq!(
        decide_instantiation(&ctx).await.unwrap(),
        Instantiation::Single
    );

    let ctx = ResolveContext {
        node: m.node("toggled").unwrap(),
        outputs: &outputs,
        vars: &vars,
        each_key: None,
    };
    assert_eq!(
        decide_instantiation(&ctx).await.unwrap(),
        Instantiation::Disabled
    );

    let ctx = ResolveContext {
        node: m.node("keyed").unwrap(),
        outputs: &outputs,
        vars: &vars,
        each_key: None,
    };
    assert_eq!(
        decide_instantiation(&ctx).await.unwrap(),
        Instantiation::Keyed {
            keys: vec!["a".to_string(), "b".to_string()]
        }
    );
}
