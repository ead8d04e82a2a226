//! Test case definitions
//!
//! Defines the data structures for deserializing `*.test.json` files.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::common::{Error, Result};

use super::env::substitute_env;

/// One declarative HTTP request and its expected response
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    /// Globally unique test name, used as the capture key
    #[serde(default)]
    pub name: String,
    /// Server profile name; may be empty when `endpoint` is absolute
    #[serde(default)]
    pub server: String,
    /// HTTP method
    #[serde(default)]
    pub method: String,
    /// Endpoint, absolute or relative to the server's host
    #[serde(default)]
    pub endpoint: String,
    /// Headers replacing the server's default headers
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Query parameters
    #[serde(default, alias = "urlparams", alias = "query")]
    pub url_params: BTreeMap<String, String>,
    /// Request body; `@file` and `@<name>` load it from disk
    #[serde(default, deserialize_with = "body_text")]
    pub payload: String,
    /// Expected response
    pub expected: ExpectedResponse,
    /// Store the decoded response under this test's name
    #[serde(default)]
    pub capture: bool,
    /// Replace the session JWT from this test's response
    #[serde(default, rename = "captureJWT", alias = "captureJwt", alias = "capturejwt")]
    pub capture_jwt: bool,
    /// Record a skipped outcome without sending anything
    #[serde(default)]
    pub skip: bool,
    /// Include request and response details in the report
    #[serde(default)]
    pub debug: bool,
}

/// What a test expects back from the server
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedResponse {
    /// Expected HTTP status code
    #[serde(alias = "statuscode", alias = "status")]
    pub status_code: u16,
    /// Expected body; empty means the body is not checked
    #[serde(default, alias = "body", deserialize_with = "body_text")]
    pub response: String,
}

/// Accept a body either as a string or as inline JSON
fn body_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

impl TestCase {
    /// Check the structural invariants of a test definition
    pub fn validate(&self) -> Result<()> {
        if self.name.contains('.') {
            return Err(Error::invalid_test(
                &self.name,
                "name cannot contain the . (period) character",
            ));
        }
        if self.server.is_empty() && !self.is_absolute() {
            return Err(Error::invalid_test(
                &self.name,
                "empty server or relative endpoint",
            ));
        }
        if self.method.is_empty() || self.endpoint.is_empty() {
            return Err(Error::invalid_test(
                &self.name,
                "empty method, endpoint or expectations",
            ));
        }
        if reqwest::Method::from_bytes(self.method.to_uppercase().as_bytes()).is_err() {
            return Err(Error::invalid_test(
                &self.name,
                format!("invalid HTTP method '{}'", self.method),
            ));
        }
        Ok(())
    }

    /// Whether the endpoint already carries a scheme
    pub fn is_absolute(&self) -> bool {
        self.endpoint.contains("://")
    }

    /// Whether the payload or expected body is loaded from a file
    pub fn uses_file_refs(&self) -> bool {
        self.payload.starts_with('@') || self.expected.response.starts_with('@')
    }

    /// Replace `${env:NAME}` references with environment values
    pub fn substitute_env(&mut self) {
        self.endpoint = substitute_env(&self.endpoint);
        self.payload = substitute_env(&self.payload);
        self.expected.response = substitute_env(&self.expected.response);
        for value in self.headers.values_mut() {
            *value = substitute_env(value);
        }
        for value in self.url_params.values_mut() {
            *value = substitute_env(value);
        }
    }
}
