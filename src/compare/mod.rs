//! Response body comparison
//!
//! Decides whether an actual response body satisfies the expected one. Plain
//! text supports `%` wildcards; JSON is compared case-insensitively with
//! subset semantics so tests only assert the fields they care about.

mod json;
mod text;

pub use json::match_subset;
pub use text::matches_wildcard;

use serde_json::Value;

use crate::common::{truncate, Error, Result};

/// Compare an expected body with an actual one
///
/// Returns `ContentMismatch` when the bodies differ and `InvalidJson` when
/// either side looks like JSON but fails to parse.
///
/// A body containing `{` on either side selects JSON. Bracketed text is
/// only treated as a JSON array when both sides start with `[` and the
/// expected body parses; log-style text such as `[INFO] done` stays text.
pub fn compare(expected: &str, actual: &str) -> Result<()> {
    if expected.is_empty() || expected == actual {
        return Ok(());
    }

    if !json_mode(expected, actual) {
        if matches_wildcard(expected, actual) {
            return Ok(());
        }
        return Err(Error::ContentMismatch(format!(
            "wanted text '{}', got '{}'",
            truncate(expected, 64),
            truncate(actual, 64)
        )));
    }

    let wanted = parse_lowercase(expected, "expected")?;
    let got = parse_lowercase(actual, "actual")?;
    match_subset(&wanted, &got, "$").map_err(Error::ContentMismatch)
}

fn json_mode(expected: &str, actual: &str) -> bool {
    if expected.contains('{') || actual.contains('{') {
        return true;
    }
    starts_array(expected)
        && starts_array(actual)
        && serde_json::from_str::<Value>(&expected.to_lowercase()).is_ok()
}

fn starts_array(body: &str) -> bool {
    body.trim_start().starts_with('[')
}

fn parse_lowercase(body: &str, side: &str) -> Result<Value> {
    serde_json::from_str(&body.to_lowercase())
        .map_err(|e| Error::InvalidJson(format!("{} body: {}", side, e)))
}
