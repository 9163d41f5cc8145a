mod reference;
mod template;
mod toggle;

pub use reference::{parse_reference, OutputRef, Reference, ReferenceError, RESERVED_ROOTS};
pub use template::{parse_template, Segment, Template, TemplateError};
pub use toggle::parse_toggle;
