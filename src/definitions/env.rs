//! `${env:NAME}` substitution

const ENV_PREFIX: &str = "${env:";

/// Replace every `${env:NAME}` in `value` with the variable's value
///
/// Unset variables expand to an empty string. An unterminated reference is
/// copied through as-is.
pub fn substitute_env(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find(ENV_PREFIX) {
        let after = &rest[start + ENV_PREFIX.len()..];
        let Some(end) = after.find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        result.push_str(&std::env::var(&after[..end]).unwrap_or_default());
        rest = &after[end + 1..];
    }

    result.push_str(rest);
    result
}
