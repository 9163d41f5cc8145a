use std::collections::BTreeMap;

pub type AnyValue = serde_json::Value;

/// Raw `${...}`-bearing string, parsed into a typed expression at build time.
pub type Expression = String;

pub type TagMap = BTreeMap<String, String>;
