use std::sync::LazyLock;

use regex::Regex;

use crate::error::{ValidationError, Violation, ViolationKind};
use crate::types::Manifest;

use super::rules;

pub(crate) static ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_\-]+$").expect("valid"));

pub struct Validator {
    violations: Vec<Violation>,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            violations: Vec::new(),
        }
    }

    pub fn finish(self) -> Result<(), ValidationError> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(self.violations))
        }
    }

    pub fn validate_manifest(&mut self, manifest: &Manifest) {
        rules::manifest::validate_manifest(self, manifest);
    }

    pub(crate) fn push(
        &mut self,
        path: impl Into<String>,
        kind: ViolationKind,
        message: impl Into<String>,
    ) {
        self.violations.push(Violation::new(path, kind, message));
    }

    pub(crate) fn validate_format_version(&mut self, path: &str, version: &str) {
        // Tooling treats 0.1.x as one feature-set (major.minor).
        let parts: Vec<&str> = version.split('.').collect();
        if parts.len() < 2 {
            self.push(
                path,
                ViolationKind::Structure,
                "must be a semver-like string (major.minor[.patch])",
            );
            return;
        }
        if parts[0] != "0" || parts[1] != "1" {
            self.push(
                path,
                ViolationKind::Structure,
                "only strata manifest format 0.1.x is currently supported",
            );
        }
    }
}
