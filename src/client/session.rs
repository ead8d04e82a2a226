//! Session state captured from login and test responses

use parking_lot::RwLock;
use reqwest::header::{HeaderMap, AUTHORIZATION};
use serde_json::Value;

use crate::common::{Error, Result};
use crate::definitions::JwtSource;

/// Cookie and JWT attached to every request of one client
///
/// Automatic capture fills each field at most once; concurrent readers only
/// ever see a field go from empty to set.
#[derive(Debug, Default)]
pub struct SessionState {
    cookie: RwLock<Option<String>>,
    jwt: RwLock<Option<String>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current cookie value
    pub fn cookie(&self) -> Option<String> {
        self.cookie.read().clone()
    }

    /// Current JWT
    pub fn jwt(&self) -> Option<String> {
        self.jwt.read().clone()
    }

    /// Set the cookie unless one is already held
    pub fn set_cookie_once(&self, value: String) -> bool {
        let mut cookie = self.cookie.write();
        if cookie.is_some() {
            return false;
        }
        *cookie = Some(value);
        true
    }

    /// Set the JWT unless one is already held
    pub fn set_jwt_once(&self, value: String) -> bool {
        let mut jwt = self.jwt.write();
        if jwt.is_some() {
            return false;
        }
        *jwt = Some(value);
        true
    }

    /// Unconditionally replace the JWT
    pub fn replace_jwt(&self, value: String) {
        *self.jwt.write() = Some(value);
    }

    /// Independent copy of the current state
    pub fn snapshot(&self) -> Self {
        Self {
            cookie: RwLock::new(self.cookie()),
            jwt: RwLock::new(self.jwt()),
        }
    }
}

/// Pull a JWT out of a response according to `source`
pub fn extract_jwt(source: &JwtSource, headers: &HeaderMap, body: &str) -> Result<String> {
    let token = match source {
        JwtSource::Payload => body.trim().to_string(),
        JwtSource::AuthorizationHeader => {
            let value = header_text(headers, AUTHORIZATION.as_str())?;
            value
                .strip_prefix("Bearer ")
                .map(str::to_string)
                .unwrap_or(value)
        }
        JwtSource::Header(name) => header_text(headers, name)?,
        JwtSource::PayloadField(path) => payload_field(body, path)?,
    };

    if token.is_empty() {
        return Err(Error::JwtExtraction("token is empty".to_string()));
    }
    Ok(token)
}

fn header_text(headers: &HeaderMap, name: &str) -> Result<String> {
    let value = headers
        .get(name)
        .ok_or_else(|| Error::JwtExtraction(format!("response has no '{}' header", name)))?;
    value
        .to_str()
        .map(|v| v.trim().to_string())
        .map_err(|_| Error::JwtExtraction(format!("header '{}' is not valid text", name)))
}

/// Walk `path` through the JSON body, matching keys case-insensitively
fn payload_field(body: &str, path: &[String]) -> Result<String> {
    let mut current: Value = serde_json::from_str(body)
        .map_err(|e| Error::JwtExtraction(format!("response is not JSON: {}", e)))?;

    for field in path {
        let found = match &mut current {
            Value::Object(map) => map
                .iter_mut()
                .find(|(key, _)| key.to_lowercase() == *field)
                .map(|(_, value)| value.take()),
            _ => None,
        };
        current = found
            .ok_or_else(|| Error::JwtExtraction(format!("field '{}' not found", path.join("."))))?;
    }

    match current {
        Value::String(token) => Ok(token),
        other => Err(Error::JwtExtraction(format!(
            "field '{}' is not a string: {}",
            path.join("."),
            other
        ))),
    }
}
