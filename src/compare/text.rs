//! Plain-text matching with `%` wildcards

const WILDCARD: char = '%';

/// Match `actual` against a pattern that may start and/or end with `%`
///
/// - `%foo`  matches anything ending with `foo`
/// - `foo%`  matches anything starting with `foo`
/// - `%foo%` matches anything containing `foo`
/// - otherwise the strings must be equal
pub fn matches_wildcard(pattern: &str, actual: &str) -> bool {
    let leading = pattern.starts_with(WILDCARD);
    let body = if leading { &pattern[1..] } else { pattern };
    let trailing = body.ends_with(WILDCARD);
    let body = if trailing { &body[..body.len() - 1] } else { body };

    match (leading, trailing) {
        (true, true) => actual.contains(body),
        (true, false) => actual.ends_with(body),
        (false, true) => actual.starts_with(body),
        (false, false) => actual == pattern,
    }
}
