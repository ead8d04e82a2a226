//! `${...}` placeholder resolution against captured responses

use serde_json::Value;

use super::path::{parse_path, Segment};
use super::CaptureStore;

/// Substituted when an index points past the end of an array
pub const OUT_OF_BOUNDS: &str = "array index out of bounds";

/// Replace every `${path}` placeholder in `template` with its captured value
///
/// Placeholders are scanned left to right without overlapping. A capture
/// that cannot be found is replaced by the key name it stopped at, which
/// leaves the problem visible in the outgoing request.
pub fn resolve(template: &str, store: &CaptureStore) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        result.push_str(&lookup(&after[..end], store));
        rest = &after[end + 1..];
    }

    result.push_str(rest);
    result
}

/// Resolve a single placeholder body such as `createUser.items[0].id`
pub fn lookup(path: &str, store: &CaptureStore) -> String {
    let segments = match parse_path(path) {
        Ok(segments) => segments,
        Err(raw) => return raw,
    };
    let mut segments = segments.iter().peekable();

    let mut key = match segments.next() {
        Some(Segment::Field(name)) => name.as_str(),
        _ => return path.to_string(),
    };
    let mut current = match store.get(key) {
        Some(value) => value,
        None => return key.to_string(),
    };

    loop {
        match current {
            Value::Number(n) => return render_number(n),
            Value::String(s) => return s.clone(),
            Value::Object(map) => match segments.next() {
                Some(Segment::Field(name)) => {
                    key = name.as_str();
                    current = match map.get(key) {
                        Some(value) => value,
                        None => return key.to_string(),
                    };
                }
                // an index on an object selects nothing
                Some(Segment::Index(_)) => {}
                None => return key.to_string(),
            },
            Value::Array(items) => {
                let explicit = match segments.peek() {
                    Some(Segment::Index(i)) => Some(*i),
                    _ => None,
                };
                if explicit.is_some() {
                    segments.next();
                }
                match items.get(explicit.unwrap_or(0)) {
                    Some(Value::Array(_)) if !matches!(segments.peek(), Some(Segment::Index(_))) => {
                        return key.to_string();
                    }
                    Some(element) => current = element,
                    None => return OUT_OF_BOUNDS.to_string(),
                }
            }
            Value::Bool(_) | Value::Null => return key.to_string(),
        }
    }
}

fn render_number(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        i.to_string()
    } else if let Some(u) = n.as_u64() {
        u.to_string()
    } else {
        format!("{:.0}", n.as_f64().unwrap_or_default())
    }
}
