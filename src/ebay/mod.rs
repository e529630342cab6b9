pub mod browse;
pub mod finding;
pub mod token;
pub mod trading;

use serde_json::Value;

/// Escapes text interpolated into a Trading API request body.
pub(crate) fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// The Finding API wraps every field in a one-element array. Unwraps one
/// level so path walking reads naturally.
pub(crate) fn first(v: &Value) -> &Value {
    match v {
        Value::Array(arr) => arr.first().unwrap_or(&Value::Null),
        other => other,
    }
}

/// Walks a path through a Finding-style JSON tree, unwrapping the
/// one-element arrays at each step. Missing paths read as the empty string.
pub(crate) fn path_str(v: &Value, path: &[&str]) -> String {
    let mut current = first(v);
    for key in path {
        current = match current.get(*key) {
            Some(next) => first(next),
            None => return String::new(),
        };
    }
    current.as_str().unwrap_or("").to_string()
}
