pub(crate) mod bindings;
pub(crate) mod manifest;
pub(crate) mod node;

use std::collections::HashMap;

use crate::types::NodeDecl;

/// Cross-referencing context shared by the node and binding rules.
pub(crate) struct Registry<'a> {
    nodes: HashMap<&'a str, &'a NodeDecl>,
}

impl<'a> Registry<'a> {
    pub(crate) fn new(nodes: &'a [NodeDecl]) -> Self {
        Self {
            nodes: nodes.iter().map(|n| (n.id.as_str(), n)).collect(),
        }
    }

    pub(crate) fn get(&self, id: &str) -> Option<&'a NodeDecl> {
        self.nodes.get(id).copied()
    }
}
