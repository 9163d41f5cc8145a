use std::collections::BTreeMap;

use crate::types::{Expression, InputBinding, TagMap};

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NodeDecl {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inputs: BTreeMap<String, InputBinding>,

    /// Output names this node exposes to downstream references.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<String>,

    /// Instantiation policy. Omitted = always exactly one instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<CountSpec>,

    /// Keyed-set node whose per-key payloads come from the secret source.
    /// The key set stays public; the values never enter the plan surface.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub secrets: bool,

    #[serde(default, skip_serializing_if = "TagMap::is_empty")]
    pub tags: TagMap,
}

impl NodeDecl {
    pub fn declares_output(&self, name: &str) -> bool {
        self.outputs.iter().any(|o| o == name)
    }

    pub fn is_conditional(&self) -> bool {
        matches!(self.count, Some(CountSpec::When { .. }))
    }

    pub fn keys(&self) -> Option<&[String]> {
        match &self.count {
            Some(CountSpec::ForEach { for_each }) => Some(for_each),
            _ => None,
        }
    }
}

/// Instantiation policy beyond the default always-one.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum CountSpec {
    /// Conditional-one: zero or one instance, driven by a boolean toggle.
    When { when: Expression },
    /// Keyed-set: one instance per key, outputs exposed as a map by key.
    ForEach {
        #[serde(rename = "forEach")]
        for_each: Vec<String>,
    },
}
