//! Running a single test: resolve, send, judge, capture

use std::time::Instant;

use crate::capture::CaptureScope;
use crate::client::{Clients, Response};
use crate::common::{Error, Result};
use crate::compare::compare;
use crate::definitions::TestCase;

use super::outcome::{Outcome, OutcomeBuilder};

/// Copy of `test` with every `${...}` placeholder substituted
pub fn resolve_placeholders(test: &TestCase, captures: &CaptureScope) -> TestCase {
    let mut resolved = test.clone();
    resolved.endpoint = captures.resolve(&test.endpoint);
    resolved.payload = captures.resolve(&test.payload);
    resolved.expected.response = captures.resolve(&test.expected.response);
    for value in resolved.headers.values_mut() {
        *value = captures.resolve(value);
    }
    for value in resolved.url_params.values_mut() {
        *value = captures.resolve(value);
    }
    resolved
}

/// Decide whether `response` satisfies `test`
pub fn judge(test: &TestCase, response: &mut Response) -> Result<()> {
    if response.status != test.expected.status_code {
        return Err(Error::StatusMismatch {
            expected: test.expected.status_code,
            actual: response.status,
        });
    }
    if let Some(e) = response.jwt_error.take() {
        return Err(e);
    }
    compare(&test.expected.response, &response.body)
}

/// Run one test and produce its outcome
///
/// Only errors that should abort the whole run are returned; anything the
/// test itself got wrong ends up in a failed outcome.
pub(crate) async fn run_test(
    test: &TestCase,
    builder: OutcomeBuilder<'_>,
    clients: &Clients,
    captures: &mut CaptureScope,
) -> Result<Outcome> {
    let started = Instant::now();
    if test.skip {
        tracing::debug!(test = %test.name, "skipped");
        return Ok(builder.skipped(test, started));
    }

    let resolved = resolve_placeholders(test, captures);
    let client = clients.for_test(&resolved)?;
    let mut response = client.execute(&resolved).await?;

    if test.capture {
        captures.capture_body(&test.name, &response.body);
    }

    match judge(&resolved, &mut response) {
        Ok(()) => Ok(builder.passed(&resolved, started, response)),
        Err(e) if e.is_test_failure() => {
            tracing::debug!(test = %test.name, error = %e, "test failed");
            Ok(builder.failed(&resolved, started, response, &e))
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureStore;
    use serde_json::json;

    fn test_case(value: serde_json::Value) -> TestCase {
        serde_json::from_value(value).unwrap()
    }

    fn response(status: u16, body: &str) -> Response {
        Response {
            status,
            body: body.to_string(),
            logs: Vec::new(),
            jwt_error: None,
        }
    }

    #[test]
    fn test_resolve_every_field() {
        let mut store = CaptureStore::new();
        store.insert("create", json!({"id": 42, "token": "t0k"}));
        let scope = CaptureScope::Batch(store);

        let test = test_case(json!({
            "name": "get",
            "method": "GET",
            "endpoint": "/users/${create.id}",
            "headers": {"Authorization": "Bearer ${create.token}"},
            "urlParams": {"owner": "${create.id}"},
            "payload": "{\"id\": ${create.id}}",
            "expected": {"statusCode": 200, "response": "{\"id\": ${create.id}}"}
        }));
        let resolved = resolve_placeholders(&test, &scope);
        assert_eq!(resolved.endpoint, "/users/42");
        assert_eq!(resolved.headers["Authorization"], "Bearer t0k");
        assert_eq!(resolved.url_params["owner"], "42");
        assert_eq!(resolved.payload, "{\"id\": 42}");
        assert_eq!(resolved.expected.response, "{\"id\": 42}");
        assert_eq!(test.endpoint, "/users/${create.id}");
    }

    #[test]
    fn test_judge() {
        let test = test_case(json!({
            "name": "t", "method": "GET", "endpoint": "/",
            "expected": {"statusCode": 200, "response": {"ok": true}}
        }));
        assert!(judge(&test, &mut response(200, r#"{"ok": true, "n": 1}"#)).is_ok());
        assert!(matches!(
            judge(&test, &mut response(500, r#"{"ok": true}"#)),
            Err(Error::StatusMismatch { expected: 200, actual: 500 })
        ));
        assert!(matches!(
            judge(&test, &mut response(200, r#"{"ok": false}"#)),
            Err(Error::ContentMismatch(_))
        ));
        assert!(matches!(
            judge(&test, &mut response(200, "plain text")),
            Err(Error::InvalidJson(_))
        ));

        let mut with_jwt_error = response(200, r#"{"ok": true}"#);
        with_jwt_error.jwt_error = Some(Error::JwtExtraction("missing".to_string()));
        assert!(matches!(
            judge(&test, &mut with_jwt_error),
            Err(Error::JwtExtraction(_))
        ));
    }
}
