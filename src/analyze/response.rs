//! Defensive reading of collaborator output.
//!
//! The response text is untrusted: it may wrap the JSON in prose or code fences,
//! use strings where numbers were asked for, or point at indices that do not
//! exist. Everything here is total: it returns `Result`/`Option`, never panics.

use serde_json::Value;

use crate::error::ParseError;

/// Locate the first `[` ... last `]` span and parse it as a JSON array.
pub fn extract_json_array(text: &str) -> Result<Vec<Value>, ParseError> {
    let start = text.find('[').ok_or(ParseError::NoStructuredData)?;
    let end = text.rfind(']').ok_or(ParseError::NoStructuredData)?;
    if end < start {
        return Err(ParseError::NoStructuredData);
    }
    let arr: Vec<Value> = serde_json::from_str(&text[start..=end])?;
    Ok(arr)
}

/// Integer field; accepts `3`, `3.0` and `"3"`.
pub fn field_i64(v: &Value, key: &str) -> Option<i64> {
    match v.get(key)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f as i64),
        _ => None,
    }
}

/// Float field; accepts numbers and numeric strings.
pub fn field_f64(v: &Value, key: &str) -> Option<f64> {
    match v.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|f| f.is_finite())
}

/// Non-blank string field, trimmed.
pub fn field_str(v: &Value, key: &str) -> Option<String> {
    v.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Array of integer indices; non-numeric entries are skipped.
pub fn field_indices(v: &Value, key: &str) -> Vec<i64> {
    v.get(key)
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|x| match x {
                    Value::Number(n) => n.as_i64(),
                    Value::String(s) => s.trim().parse::<i64>().ok(),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

/// `Some(i)` only when `idx` addresses an element of a `len`-sized slice.
pub fn checked_index(idx: Option<i64>, len: usize) -> Option<usize> {
    let i = idx?;
    usize::try_from(i).ok().filter(|&i| i < len)
}

/// Index into the candidate list, aliasing anything invalid to element 0.
///
/// Callers must only use this with `len > 0`.
pub fn resolve_index_or_first(idx: Option<i64>, len: usize) -> usize {
    checked_index(idx, len).unwrap_or(0)
}

/// Drop one enclosing quote character at each end.
pub fn strip_enclosing_quotes(s: &str) -> String {
    const QUOTES: [char; 4] = ['"', '\'', '\u{201C}', '\u{201D}'];
    let t = s.trim();
    let t = t.strip_prefix(QUOTES).unwrap_or(t);
    let t = t.strip_suffix(QUOTES).unwrap_or(t);
    t.trim().to_string()
}
