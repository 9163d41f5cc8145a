use std::sync::LazyLock;

use regex::Regex;

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_\-]+$").expect("valid regex"));

/// Roots that can never be node ids.
pub const RESERVED_ROOTS: &[&str] = &["var", "each"];

/// A parsed `${...}` expression.
///
/// References are typed tokens: after parsing, every later stage works on
/// (node, output) pairs and never re-interprets strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Reference {
    /// `<node>.<output>`, optionally guarded with a trailing `?` so the
    /// consumer tolerates the target node being conditionally absent.
    Output(OutputRef),
    /// `var.<name>`: a Variable Source lookup.
    Var(String),
    /// `each.key`: the current key inside a keyed-set node.
    EachKey,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct OutputRef {
    pub node: String,
    pub output: String,
    pub guarded: bool,
}

impl std::fmt::Display for OutputRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{}{}",
            self.node,
            self.output,
            if self.guarded { "?" } else { "" }
        )
    }
}

pub fn parse_reference(input: &str) -> Result<Reference, ReferenceError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(ReferenceError::Empty);
    }

    let (body, guarded) = match s.strip_suffix('?') {
        Some(body) => (body.trim_end(), true),
        None => (s, false),
    };

    let Some((root, rest)) = body.split_once('.') else {
        return Err(ReferenceError::MissingOutput(body.to_string()));
    };
    validate_name(root)?;

    match root {
        "var" => {
            if guarded {
                return Err(ReferenceError::GuardNotAllowed(s.to_string()));
            }
            validate_name(rest)?;
            Ok(Reference::Var(rest.to_string()))
        }
        "each" => {
            if guarded {
                return Err(ReferenceError::GuardNotAllowed(s.to_string()));
            }
            if rest != "key" {
                return Err(ReferenceError::UnknownEachField(rest.to_string()));
            }
            Ok(Reference::EachKey)
        }
        node => {
            // Exactly `<node>.<output>`: deeper paths would reintroduce
            // stringly-typed lookups downstream.
            validate_name(rest)?;
            Ok(Reference::Output(OutputRef {
                node: node.to_string(),
                output: rest.to_string(),
                guarded,
            }))
        }
    }
}

fn validate_name(name: &str) -> Result<(), ReferenceError> {
    if name.is_empty() {
        return Err(ReferenceError::EmptyName);
    }
    if !NAME_RE.is_match(name) {
        return Err(ReferenceError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReferenceError {
    #[error("expression must not be empty")]
    Empty,
    #[error("name segment must not be empty")]
    EmptyName,
    #[error("invalid name segment: {0}")]
    InvalidName(String),
    #[error("reference must be of the form <node>.<output>: {0}")]
    MissingOutput(String),
    #[error("guard '?' is only allowed on output references: {0}")]
    GuardNotAllowed(String),
    #[error("unknown field on 'each': {0} (only 'each.key' exists)")]
    UnknownEachField(String),
}
