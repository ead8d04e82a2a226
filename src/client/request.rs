//! URL and header assembly for outgoing requests

use crate::definitions::{ServerProfile, TestCase};

use super::session::SessionState;

/// Header carrying the test name on every request
pub const TEST_NAME_HEADER: &str = "X-Apicheck-Test";

/// Join `endpoint` onto `host` unless it is already absolute
pub fn endpoint_url(host: &str, endpoint: &str) -> String {
    if endpoint.contains("://") {
        return endpoint.to_string();
    }
    format!(
        "{}/{}",
        host.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}

/// Headers for one request, in the order they are attached
///
/// Test headers replace the profile's default headers entirely.
pub fn request_headers(
    profile: &ServerProfile,
    session: &SessionState,
    test: &TestCase,
) -> Vec<(String, String)> {
    let mut headers = Vec::new();

    if let Some(key) = profile.api_key() {
        headers.push((key.header.clone(), key.api_key.clone()));
    }
    let user_agent = profile.user_agent();
    if !user_agent.is_empty() {
        headers.push(("User-Agent".to_string(), user_agent.to_string()));
    }
    if let Some(jwt) = session.jwt() {
        headers.push(("Authorization".to_string(), format!("Bearer {}", jwt)));
    }
    if let (Some(value), Some(name)) = (
        session.cookie(),
        profile.session().and_then(|s| s.cookie.as_deref()),
    ) {
        headers.push(("Cookie".to_string(), format!("{}={}", name, value)));
    }
    headers.push((TEST_NAME_HEADER.to_string(), test.name.clone()));

    let extra = if test.headers.is_empty() {
        &profile.headers
    } else {
        &test.headers
    };
    headers.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
    headers
}
