use strata_core::{parse_manifest_str, validate_manifest, ManifestFormat, ViolationKind};

fn minimal_valid_yaml() -> &'static str {
    r#"
strata: "0.1"
tags:
  env: prod
nodes:
  - id: network
    outputs: [net_id]
  - id: cluster
    inputs:
      network: "${network.net_id}"
      name: "main-${var.region}"
    outputs: [endpoint]
"#
}

#[test]
fn parse_yaml_and_validate_ok() {
    let parsed = parse_manifest_str(minimal_valid_yaml(), ManifestFormat::Yaml).unwrap();
    validate_manifest(&parsed.manifest).unwrap();
}

#[test]
fn parse_auto_detects_yaml() {
    let parsed = parse_manifest_str(minimal_valid_yaml(), ManifestFormat::Auto).unwrap();
    assert_eq!(parsed.format, ManifestFormat::Yaml);
}

#[test]
fn parse_json_and_validate_ok() {
    let json = r#"
{
  "strata": "0.1",
  "nodes": [
    { "id": "network", "outputs": ["net_id"] },
    { "id": "cluster", "inputs": { "network": "${network.net_id}" }, "outputs": ["endpoint"] }
  ]
}
"#;
    let parsed = parse_manifest_str(json, ManifestFormat::Auto).unwrap();
    assert_eq!(parsed.format, ManifestFormat::Json);
    validate_manifest(&parsed.manifest).unwrap();
}

#[test]
fn parse_auto_reports_error_for_the_likely_format() {
    let err = parse_manifest_str("{ \"strata\": ", ManifestFormat::Auto).unwrap_err();
    assert!(matches!(err, strata_core::ParseError::Json(_)));

    let err = parse_manifest_str("strata: [unclosed", ManifestFormat::Auto).unwrap_err();
    assert!(matches!(err, strata_core::ParseError::Yaml(_)));
}

fn violations_of(yaml: &str) -> Vec<(String, ViolationKind)> {
    let parsed = parse_manifest_str(yaml, ManifestFormat::Yaml).unwrap();
    let err = validate_manifest(&parsed.manifest).unwrap_err();
    err.violations
        .into_iter()
        .map(|v| (v.path, v.kind))
        .collect()
}

#[test]
fn rejects_unsupported_version() {
    let yaml = r#"
strata: "1.0"
nodes:
  - id: a
"#;
    let violations = violations_of(yaml);
    assert!(violations
        .iter()
        .any(|(path, kind)| path == "strata" && *kind == ViolationKind::Structure));
}

#[test]
fn rejects_duplicate_node_ids() {
    let yaml = r#"
strata: "0.1"
nodes:
  - id: a
  - id: a
"#;
    let violations = violations_of(yaml);
    assert!(violations
        .iter()
        .any(|(_, kind)| *kind == ViolationKind::Structure));
}

#[test]
fn rejects_reserved_node_id() {
    let yaml = r#"
strata: "0.1"
nodes:
  - id: var
"#;
    let violations = violations_of(yaml);
    assert!(!violations.is_empty());
}

#[test]
fn rejects_reference_to_unknown_node() {
    let yaml = r#"
strata: "0.1"
nodes:
  - id: a
    inputs:
      x: "${ghost.id}"
"#;
    let violations = violations_of(yaml);
    assert!(violations
        .iter()
        .any(|(_, kind)| *kind == ViolationKind::UnresolvedReference));
}

#[test]
fn rejects_reference_to_undeclared_output() {
    let yaml = r#"
strata: "0.1"
nodes:
  - id: a
    outputs: [id]
  - id: b
    inputs:
      x: "${a.nope}"
"#;
    let violations = violations_of(yaml);
    assert!(violations
        .iter()
        .any(|(_, kind)| *kind == ViolationKind::UnresolvedReference));
}

#[test]
fn rejects_unguarded_reference_to_conditional_node() {
    let yaml = r#"
strata: "0.1"
nodes:
  - id: maybe
    count:
      when: "${var.enabled}"
    outputs: [id]
  - id: b
    inputs:
      x: "${maybe.id}"
"#;
    let violations = violations_of(yaml);
    assert!(violations
        .iter()
        .any(|(_, kind)| *kind == ViolationKind::UnguardedAbsentReference));
}

#[test]
fn guard_suffix_satisfies_conditional_reference() {
    let yaml = r#"
strata: "0.1"
nodes:
  - id: maybe
    count:
      when: "${var.enabled}"
    outputs: [id]
  - id: b
    inputs:
      x:
        fallback:
          - "${maybe.id?}"
        default: none
"#;
    let parsed = parse_manifest_str(yaml, ManifestFormat::Yaml).unwrap();
    validate_manifest(&parsed.manifest).unwrap();
}

#[test]
fn fallback_position_implicitly_guards() {
    let yaml = r#"
strata: "0.1"
nodes:
  - id: maybe
    count:
      when: "${var.enabled}"
    outputs: [id]
  - id: b
    inputs:
      x:
        fallback:
          - "${maybe.id}"
        default: none
"#;
    let parsed = parse_manifest_str(yaml, ManifestFormat::Yaml).unwrap();
    validate_manifest(&parsed.manifest).unwrap();
}

#[test]
fn rejects_non_boolean_toggle() {
    let yaml = r#"
strata: "0.1"
nodes:
  - id: a
    count:
      when: "maybe"
"#;
    let violations = violations_of(yaml);
    assert!(violations
        .iter()
        .any(|(_, kind)| *kind == ViolationKind::Expression));
}

#[test]
fn rejects_secrets_without_for_each() {
    let yaml = r#"
strata: "0.1"
nodes:
  - id: creds
    secrets: true
"#;
    let violations = violations_of(yaml);
    assert!(violations
        .iter()
        .any(|(_, kind)| *kind == ViolationKind::Structure));
}

#[test]
fn rejects_each_key_outside_for_each() {
    let yaml = r#"
strata: "0.1"
nodes:
  - id: a
    inputs:
      x: "${each.key}"
"#;
    let violations = violations_of(yaml);
    assert!(violations
        .iter()
        .any(|(_, kind)| *kind == ViolationKind::Expression));
}

#[test]
fn rejects_unclosed_expression() {
    let yaml = r#"
strata: "0.1"
nodes:
  - id: a
    inputs:
      x: "${var.name"
"#;
    let violations = violations_of(yaml);
    assert!(violations
        .iter()
        .any(|(_, kind)| *kind == ViolationKind::Expression));
}

#[test]
fn rejects_empty_for_each_key_set() {
    let yaml = r#"
strata: "0.1"
nodes:
  - id: a
    count:
      forEach: []
"#;
    let violations = violations_of(yaml);
    assert!(violations
        .iter()
        .any(|(_, kind)| *kind == ViolationKind::Structure));
}

#[test]
fn collects_all_violations_in_one_pass() {
    let yaml = r#"
strata: "0.1"
nodes:
  - id: a
    inputs:
      x: "${ghost.id}"
      y: "${each.key}"
"#;
    let violations = violations_of(yaml);
    assert!(violations.len() >= 2);
}
