//! Top-level field extraction from JSON text.
//!
//! Routing only ever needs a handful of top-level fields (`jsonrpc`, `id`,
//! `method`, `params`, and a couple inside `params`). These scanners locate a
//! key and decode its value without building a document tree; nested values
//! are handed on as raw text.
//!
//! Key lookup is top-level only. The scanner tracks nesting depth and string
//! state, so a key that appears inside a nested object or inside a string
//! value never matches.

use crate::mcp::codec::unescape;

/// Finds the first top-level `"key":` and returns the text starting at its
/// value, with leading whitespace skipped.
pub(crate) fn find_value<'a>(json: &'a str, key: &str) -> Option<&'a str> {
    let bytes = json.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' | b'[' => depth += 1,
            b'}' | b']' => depth = depth.saturating_sub(1),
            b'"' => {
                let start = i + 1;
                let end = string_end(bytes, start)?;
                i = end + 1;

                if depth != 1 {
                    continue;
                }

                let after = skip_whitespace(bytes, i);
                if bytes.get(after) != Some(&b':') {
                    continue;
                }

                if &json[start..end] == key {
                    let value = skip_whitespace(bytes, after + 1);
                    return Some(&json[value..]);
                }

                i = after + 1;
                continue;
            }
            _ => {}
        }
        i += 1;
    }

    None
}

/// Extracts a top-level string value, unescaped.
///
/// Returns `None` when the key is missing or the value is not a string.
#[must_use]
pub fn extract_string(json: &str, key: &str) -> Option<String> {
    let value = find_value(json, key)?;
    let bytes = value.as_bytes();
    if bytes.first() != Some(&b'"') {
        return None;
    }

    let end = string_end(bytes, 1)?;
    Some(unescape(&value[1..end]))
}

/// Extracts a top-level integer value.
///
/// An explicit `null` yields `Some(-1)`. Parsing stops at the first
/// non-digit; a value with no digits (or one that overflows `i64`) yields
/// `None`.
#[must_use]
pub fn extract_int(json: &str, key: &str) -> Option<i64> {
    let value = find_value(json, key)?;
    if value.starts_with("null") {
        return Some(-1);
    }

    let digits_start = usize::from(value.starts_with('-'));
    let digits_len = value[digits_start..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();

    if digits_len == 0 {
        return None;
    }

    value[..digits_start + digits_len].parse().ok()
}

/// Extracts a top-level object value as the exact raw substring, braces
/// included.
///
/// Returns `None` when the key is missing, the value is not an object, or
/// the braces never balance.
#[must_use]
pub fn extract_object<'a>(json: &'a str, key: &str) -> Option<&'a str> {
    let value = find_value(json, key)?;
    let bytes = value.as_bytes();
    if bytes.first() != Some(&b'{') {
        return None;
    }

    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&value[..=i]);
                }
            }
            b'"' => i = string_end(bytes, i + 1)?,
            _ => {}
        }
        i += 1;
    }

    None
}

/// Returns the index of the closing quote of a string whose content starts at
/// `start`, honouring backslash escapes.
fn string_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return Some(i),
            _ => i += 1,
        }
    }
    None
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while bytes.get(i).is_some_and(u8::is_ascii_whitespace) {
        i += 1;
    }
    i
}
