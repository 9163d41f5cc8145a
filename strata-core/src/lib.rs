#![forbid(unsafe_code)]

pub mod error;
pub mod expressions;
pub mod parser;
pub mod planner;
pub mod types;
pub mod validate;

pub use crate::error::{ParseError, StrataError, ValidationError, Violation, ViolationKind};
pub use crate::parser::{parse_manifest_str, ManifestFormat, ParsedManifest};
pub use crate::planner::{
    diff_plans, merged_tags, plan_from_str, plan_manifest, DependencyGraph, GraphError, Plan,
    PlanError, PlanInstantiation, PlanNode, PlanOptions, PlanSummary, PlanningOutcome,
    ValidationSummary,
};
pub use crate::types::Manifest;
pub use crate::validate::{validate_manifest, Validate};
