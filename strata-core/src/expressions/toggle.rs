use crate::types::AnyValue;

/// Interpret a resolved value as an instantiation toggle.
///
/// Only real booleans and the strings "true"/"false" (case-insensitive)
/// qualify; anything else is `None` so callers fail loudly instead of
/// treating an arbitrary value as falsy.
pub fn parse_toggle(value: &AnyValue) -> Option<bool> {
    match value {
        AnyValue::Bool(b) => Some(*b),
        AnyValue::String(s) => match s.trim() {
            t if t.eq_ignore_ascii_case("true") => Some(true),
            t if t.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        },
        _ => None,
    }
}
