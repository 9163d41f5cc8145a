mod binding;
mod common;
mod manifest;
mod node;

pub use binding::InputBinding;
pub use common::{AnyValue, Expression, TagMap};
pub use manifest::Manifest;
pub use node::{CountSpec, NodeDecl};
