//! Tag name grammar.
//!
//! ```text
//! label := [A-Za-z0-9_]+
//! name  := label ('.' label)*
//! ```
//!
//! Everything else (empty names, leading/trailing dots, `..`, spaces,
//! non-ASCII letters) is rejected with the byte position of the first
//! offending character.

use crate::error::{Result, TagError};

const SEPARATOR: u8 = b'.';

#[inline]
const fn is_label_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Consume one label starting at `pos`; returns the position after it,
/// or `None` if there is no label there.
fn accept_label(bytes: &[u8], mut pos: usize) -> Option<usize> {
    let start = pos;
    while pos < bytes.len() && is_label_byte(bytes[pos]) {
        pos += 1;
    }
    (pos > start).then_some(pos)
}

/// Validate a full tag name.
pub fn validate_name(name: &str) -> Result<()> {
    let invalid = |position| TagError::InvalidTagName {
        name: name.to_string(),
        position,
    };

    let bytes = name.as_bytes();
    let mut pos = accept_label(bytes, 0).ok_or_else(|| invalid(0))?;

    while pos < bytes.len() {
        if bytes[pos] != SEPARATOR {
            return Err(invalid(pos));
        }
        pos += 1;
        pos = accept_label(bytes, pos).ok_or_else(|| invalid(pos))?;
    }

    Ok(())
}

/// Returns `true` if `name` follows the grammar.
#[inline]
pub fn is_valid_name(name: &str) -> bool {
    validate_name(name).is_ok()
}

/// Number of labels in a (valid) name: `"A"` is level 1, `"A.B.C"` level 3.
pub fn hierarchy_level(name: &str) -> usize {
    name.bytes().filter(|&b| b == SEPARATOR).count() + 1
}

/// The last label: `"A.B.C"` → `"C"`.
pub fn label(name: &str) -> &str {
    match name.rfind('.') {
        Some(pos) => &name[pos + 1..],
        None => name,
    }
}

/// The immediate parent name: `"A.B.C"` → `Some("A.B")`, `"A"` → `None`.
pub fn parent_name(name: &str) -> Option<&str> {
    name.rfind('.').map(|pos| &name[..pos])
}

/// Every name in the hierarchy of `name`, root first, `name` itself last.
///
/// `"A.B.C"` → `["A", "A.B", "A.B.C"]`
pub fn hierarchy_names(name: &str) -> Vec<&str> {
    let mut names: Vec<&str> = name
        .match_indices('.')
        .map(|(pos, _)| &name[..pos])
        .collect();
    names.push(name);
    names
}

/// Case-insensitive ordering used for runtime index assignment.
///
/// Compares ASCII-uppercased bytes. Since `.` sorts below every label byte,
/// a name is immediately followed by all of its descendants.
pub fn compare_names(a: &str, b: &str) -> std::cmp::Ordering {
    a.bytes()
        .map(|b| b.to_ascii_uppercase())
        .cmp(b.bytes().map(|b| b.to_ascii_uppercase()))
}
