use strata_core::{parse_manifest_str, ManifestFormat, Manifest};
use strata_exec::resolve::ResolveError;
use strata_exec::secrets::{preflight_secrets, EnvSecrets, SecretSource, SecretValue, StaticSecrets};

fn secrets_manifest() -> Manifest {
    parse_manifest_str(
        r#"
strata: "0.1"
nodes:
  - id: api-keys
    secrets: true
    count:
      forEach: [billing, metrics, audit]
"#,
        ManifestFormat::Yaml,
    )
    .unwrap()
    .manifest
}

#[tokio::test]
async fn preflight_collects_every_declared_key() {
    let mut source = StaticSecrets::new();
    source
        .insert("api-keys", "billing", SecretValue::from_string("s1"))
        .insert("api-keys", "metrics", SecretValue::from_string("s2"))
        .insert("api-keys", "audit", SecretValue::from_string("s3"));

    let bundle = preflight_secrets(&secrets_manifest(), &source).await.unwrap();
    let node = &bundle["api-keys"];
    assert_eq!(node.len(), 3);
    assert_eq!(node["billing"].expose_str().unwrap(), "s1");
}

#[tokio::test]
async fn preflight_reports_all_missing_keys_together() {
    let mut source = StaticSecrets::new();
    source.insert("api-keys", "billing", SecretValue::from_string("s1"));

    let err = preflight_secrets(&secrets_manifest(), &source)
        .await
        .unwrap_err();
    match err {
        ResolveError::MissingSecretValues { node, keys } => {
            assert_eq!(node, "api-keys");
            assert_eq!(keys, vec!["metrics".to_string(), "audit".to_string()]);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn nodes_without_secrets_are_not_consulted() {
    let manifest = parse_manifest_str(
        r#"
strata: "0.1"
nodes:
  - id: plain
    outputs: [id]
"#,
        ManifestFormat::Yaml,
    )
    .unwrap()
    .manifest;

    let bundle = preflight_secrets(&manifest, &StaticSecrets::new())
        .await
        .unwrap();
    assert!(bundle.is_empty());
}

#[test]
fn secret_values_never_leak_through_debug() {
    let secret = SecretValue::from_string("super-sensitive");
    let debug = format!("{secret:?}");
    assert!(!debug.contains("super-sensitive"));
    assert!(debug.contains("redacted"));
}

#[tokio::test]
async fn env_source_mangles_node_and_key_names() {
    std::env::set_var("STRATA_SECRET_API_KEYS_BILLING", "from-env");
    let source = EnvSecrets::default();
    let value = source.get("api-keys", "billing").await.unwrap().unwrap();
    assert_eq!(value.expose_str().unwrap(), "from-env");
    std::env::remove_var("STRATA_SECRET_API_KEYS_BILLING");

    assert!(source.get("api-keys", "absent").await.unwrap().is_none());
}
