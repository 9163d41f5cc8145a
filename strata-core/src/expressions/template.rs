use super::reference::{parse_reference, Reference, ReferenceError};

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Literal(String),
    Expr(Reference),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub segments: Vec<Segment>,
}

impl Template {
    /// A template that is exactly one `${...}` expression keeps the
    /// referenced value's type; anything else renders to a string.
    pub fn as_single_expr(&self) -> Option<&Reference> {
        match self.segments.as_slice() {
            [Segment::Expr(r)] => Some(r),
            _ => None,
        }
    }

    pub fn references(&self) -> impl Iterator<Item = &Reference> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Expr(r) => Some(r),
            Segment::Literal(_) => None,
        })
    }
}

pub fn parse_template(input: &str) -> Result<Template, TemplateError> {
    let mut segments = Vec::new();
    let mut buf = String::new();
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'

            // Find matching } (no nesting support).
            let mut inner = String::new();
            let mut found = false;
            for n in chars.by_ref() {
                if n == '}' {
                    found = true;
                    break;
                }
                inner.push(n);
            }
            if !found {
                return Err(TemplateError::UnclosedExpression);
            }

            let reference = parse_reference(&inner)?;
            if !buf.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut buf)));
            }
            segments.push(Segment::Expr(reference));
        } else {
            buf.push(ch);
        }
    }

    if !buf.is_empty() {
        segments.push(Segment::Literal(buf));
    }

    Ok(Template { segments })
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("invalid reference expression: {0}")]
    InvalidReference(#[from] ReferenceError),
    #[error("unclosed embedded expression (missing '}}')")]
    UnclosedExpression,
}
