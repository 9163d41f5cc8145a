use std::collections::BTreeMap;

use strata_core::types::AnyValue;

/// Three-state resolution result. Absence is explicit; an empty string is
/// never overloaded to mean "unset".
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "lowercase")]
pub enum Resolved {
    Present(AnyValue),
    Absent,
}

impl Resolved {
    /// Unset for fallback purposes: absent, null, or an empty
    /// string/array/object.
    pub fn is_unset(&self) -> bool {
        match self {
            Resolved::Absent => true,
            Resolved::Present(v) => match v {
                AnyValue::Null => true,
                AnyValue::String(s) => s.is_empty(),
                AnyValue::Array(a) => a.is_empty(),
                AnyValue::Object(o) => o.is_empty(),
                _ => false,
            },
        }
    }

    pub fn into_value(self) -> Option<AnyValue> {
        match self {
            Resolved::Present(v) => Some(v),
            Resolved::Absent => None,
        }
    }
}

/// Recorded outputs of a completed node, shaped by its instantiation.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "shape", content = "outputs", rename_all = "lowercase")]
pub enum NodeOutputs {
    /// Conditional-one node whose toggle was false.
    Absent,
    Single(BTreeMap<String, AnyValue>),
    /// Keyed-set: instance key -> that instance's outputs.
    Keyed(BTreeMap<String, BTreeMap<String, AnyValue>>),
}

impl NodeOutputs {
    /// Read one declared output. Keyed nodes expose a map keyed by
    /// instance key.
    pub fn get(&self, output: &str) -> Resolved {
        match self {
            NodeOutputs::Absent => Resolved::Absent,
            NodeOutputs::Single(map) => match map.get(output) {
                Some(v) => Resolved::Present(v.clone()),
                None => Resolved::Absent,
            },
            NodeOutputs::Keyed(instances) => {
                let mut out = serde_json::Map::new();
                for (key, map) in instances {
                    if let Some(v) = map.get(output) {
                        out.insert(key.clone(), v.clone());
                    }
                }
                Resolved::Present(AnyValue::Object(out))
            }
        }
    }
}
