//! Per-test results flowing from workers to the aggregator

use std::time::{Duration, Instant};

use crate::client::Response;
use crate::common::{truncate, Error};
use crate::definitions::TestCase;

/// Longest body shown on a failure line
const SHOWN_BODY_CHARS: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Passed,
    Failed,
    Skipped,
}

/// Result of running one test
#[derive(Debug, Clone)]
pub struct Outcome {
    /// Name of the file the test came from
    pub file: String,
    pub test: String,
    /// Position of the test within its file
    pub index: usize,
    pub status: Status,
    pub elapsed: Duration,
    /// Report lines, already formatted
    pub logs: Vec<String>,
    /// When the file's tests were handed to the pool
    pub file_started: Instant,
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        self.status == Status::Failed
    }
}

/// Builds an [`Outcome`] for one test of one file
pub(crate) struct OutcomeBuilder<'a> {
    pub file: &'a str,
    pub index: usize,
    pub file_started: Instant,
    pub verbose: bool,
}

impl OutcomeBuilder<'_> {
    pub fn skipped(&self, test: &TestCase, started: Instant) -> Outcome {
        let elapsed = started.elapsed();
        let mut logs = Vec::new();
        if self.verbose {
            logs.push(status_line("SKIP", &test.name, elapsed));
        }
        self.build(test, Status::Skipped, elapsed, logs)
    }

    pub fn passed(&self, test: &TestCase, started: Instant, response: Response) -> Outcome {
        let elapsed = started.elapsed();
        let mut logs = response.logs;
        if self.verbose {
            logs.push(status_line("PASS", &test.name, elapsed));
        }
        self.build(test, Status::Passed, elapsed, logs)
    }

    pub fn failed(&self, test: &TestCase, started: Instant, response: Response, reason: &Error) -> Outcome {
        let elapsed = started.elapsed();
        let mut logs = response.logs;
        logs.push(status_line("FAIL", &test.name, elapsed));
        logs.push(format!(
            "    wanted: '{}' ({}), got '{}' ({})",
            truncate(&test.expected.response, SHOWN_BODY_CHARS),
            test.expected.status_code,
            truncate(response.body.trim_matches('\n'), SHOWN_BODY_CHARS),
            response.status
        ));
        logs.push(format!("    {}", reason));
        self.build(test, Status::Failed, elapsed, logs)
    }

    fn build(&self, test: &TestCase, status: Status, elapsed: Duration, logs: Vec<String>) -> Outcome {
        Outcome {
            file: self.file.to_string(),
            test: test.name.clone(),
            index: self.index,
            status,
            elapsed,
            logs,
            file_started: self.file_started,
        }
    }
}

fn status_line(label: &str, name: &str, elapsed: Duration) -> String {
    format!("    --- {}:\t{} ({:.2}s)", label, name, elapsed.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_case() -> TestCase {
        serde_json::from_str(
            r#"{"name": "get_user", "method": "GET", "endpoint": "/u",
                "expected": {"statusCode": 200, "response": {"id": 1}}}"#,
        )
        .unwrap()
    }

    fn response(status: u16, body: &str) -> Response {
        Response {
            status,
            body: body.to_string(),
            logs: Vec::new(),
            jwt_error: None,
        }
    }

    fn builder(verbose: bool) -> OutcomeBuilder<'static> {
        OutcomeBuilder {
            file: "users.test.json",
            index: 3,
            file_started: Instant::now(),
            verbose,
        }
    }

    #[test]
    fn test_pass_line_only_when_verbose() {
        let quiet = builder(false).passed(&test_case(), Instant::now(), response(200, "{}"));
        assert_eq!(quiet.status, Status::Passed);
        assert!(quiet.logs.is_empty());

        let loud = builder(true).passed(&test_case(), Instant::now(), response(200, "{}"));
        assert_eq!(loud.logs.len(), 1);
        assert!(loud.logs[0].starts_with("    --- PASS:\tget_user ("));
        assert_eq!(loud.index, 3);
        assert_eq!(loud.file, "users.test.json");
    }

    #[test]
    fn test_failure_lines() {
        let reason = Error::StatusMismatch {
            expected: 200,
            actual: 404,
        };
        let outcome = builder(false).failed(
            &test_case(),
            Instant::now(),
            response(404, "not found\n"),
            &reason,
        );
        assert!(outcome.is_failure());
        assert!(outcome.logs[0].starts_with("    --- FAIL:\tget_user ("));
        assert_eq!(
            outcome.logs[1],
            r#"    wanted: '{"id":1}' (200), got 'not found' (404)"#
        );
        assert_eq!(outcome.logs[2], "    status code mismatched: wanted 200, got 404");
    }

    #[test]
    fn test_failure_bodies_are_truncated() {
        let body = "x".repeat(1000);
        let outcome = builder(false).failed(
            &test_case(),
            Instant::now(),
            response(500, &body),
            &Error::ContentMismatch("differs".to_string()),
        );
        let expected = format!("got '{}...' (500)", "x".repeat(256));
        assert!(outcome.logs[1].ends_with(&expected), "{}", outcome.logs[1]);
    }
}
