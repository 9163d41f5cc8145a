use crate::types::{NodeDecl, TagMap};

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Manifest {
    /// Manifest format version (major.minor[.patch]); 0.1.x is current.
    pub strata: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Base tags merged into every node's resolved record (node tags win).
    #[serde(default, skip_serializing_if = "TagMap::is_empty")]
    pub tags: TagMap,

    pub nodes: Vec<NodeDecl>,
}

impl Manifest {
    pub fn node(&self, id: &str) -> Option<&NodeDecl> {
        self.nodes.iter().find(|n| n.id == id)
    }
}
