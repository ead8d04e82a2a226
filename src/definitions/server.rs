//! Server profile definitions

use serde::Deserialize;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use crate::common::config::RunConfig;
use crate::common::{Error, Result};

use super::env::substitute_env;
use super::test_case::TestCase;

/// Connection settings for one named server
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ServerProfile {
    /// Common prefix of every relative endpoint, e.g. `https://api.local/v1`
    #[serde(default)]
    pub host: String,
    /// Headers sent when a test doesn't provide its own
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Authentication mode
    #[serde(default)]
    pub auth: Option<Authentication>,
    /// User agent; falls back to the run default
    #[serde(default, alias = "useragent")]
    pub user_agent: Option<String>,
    /// Request timeout in seconds; falls back to the run default
    #[serde(default)]
    pub timeout: Option<u64>,
}

/// How a client authenticates against its server
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Authentication {
    /// Request executed once at startup
    #[serde(default)]
    pub login: Option<Box<TestCase>>,
    /// What the login hands back and how to carry it forward
    #[serde(default)]
    pub session: Option<SessionConfig>,
    /// Static API key sent with every request
    #[serde(default, alias = "apikey")]
    pub api_key: Option<ApiKey>,
}

/// How the session is maintained after login
#[derive(Deserialize, Debug, Clone, Default)]
pub struct SessionConfig {
    /// Name of the session cookie to persist
    #[serde(default)]
    pub cookie: Option<String>,
    /// Where the bearer token comes from
    #[serde(default)]
    pub jwt: Option<JwtSource>,
}

/// Static API key authentication
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ApiKey {
    /// The key itself
    #[serde(alias = "apikey", alias = "key")]
    pub api_key: String,
    /// Header carrying the key
    pub header: String,
}

/// Location of the JWT in a response
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(try_from = "String")]
pub enum JwtSource {
    /// `payload`: the whole body is the token
    Payload,
    /// `payload.<field>[.<field>...]`: a string at a field path in the JSON body
    PayloadField(Vec<String>),
    /// `header`: the Authorization response header
    AuthorizationHeader,
    /// `header.<name>`: a named response header
    Header(String),
}

impl FromStr for JwtSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "payload" => Ok(Self::Payload),
            "header" => Ok(Self::AuthorizationHeader),
            _ => {
                if let Some(path) = s.strip_prefix("payload.") {
                    let fields: Vec<String> = path.split('.').map(str::to_lowercase).collect();
                    if fields.iter().any(String::is_empty) {
                        return Err(format!("invalid JWT payload path '{}'", s));
                    }
                    Ok(Self::PayloadField(fields))
                } else if let Some(name) = s.strip_prefix("header.").filter(|n| !n.is_empty()) {
                    Ok(Self::Header(name.to_string()))
                } else {
                    Err(format!(
                        "unknown JWT source '{}'. Supported: 'payload', 'payload.<field>', 'header', 'header.<name>'",
                        s
                    ))
                }
            }
        }
    }
}

impl TryFrom<String> for JwtSource {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl ServerProfile {
    /// Validate the profile and fill in run-level defaults
    pub fn prepare(&mut self, name: &str, config: &RunConfig) -> Result<()> {
        self.host = substitute_env(&self.host);
        if !self.host.contains("://") {
            return Err(Error::invalid_server(
                name,
                format!("host '{}' is not an absolute URL", self.host),
            ));
        }

        for value in self.headers.values_mut() {
            *value = substitute_env(value);
        }
        if self.headers.is_empty() {
            self.headers
                .insert("Content-Type".to_string(), config.content_type.clone());
            self.headers
                .insert("Accept".to_string(), config.accept.clone());
        }
        if self.user_agent.is_none() {
            self.user_agent = Some(config.user_agent.clone());
        }
        if self.timeout.is_none() {
            self.timeout = Some(config.timeout.as_secs());
        }

        if let Some(auth) = &mut self.auth {
            auth.prepare(name)?;
        }
        Ok(())
    }

    /// User agent sent with every request
    pub fn user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or_default()
    }

    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout.unwrap_or(30))
    }

    /// The login request, when login authentication is configured
    pub fn login(&self) -> Option<&TestCase> {
        self.auth.as_ref().and_then(|a| a.login.as_deref())
    }

    /// The session descriptor, when one is configured
    pub fn session(&self) -> Option<&SessionConfig> {
        self.auth.as_ref().and_then(|a| a.session.as_ref())
    }

    /// The API key, when key authentication is configured
    pub fn api_key(&self) -> Option<&ApiKey> {
        self.auth.as_ref().and_then(|a| a.api_key.as_ref())
    }
}

impl Authentication {
    fn prepare(&mut self, server: &str) -> Result<()> {
        if self.login.is_some() && self.api_key.is_some() {
            return Err(Error::invalid_server(
                server,
                "auth cannot use both login and apiKey",
            ));
        }

        if let Some(key) = &mut self.api_key {
            key.api_key = substitute_env(&key.api_key);
            if key.api_key.is_empty() || key.header.is_empty() {
                return Err(Error::invalid_server(
                    server,
                    "apiKey requires both a key and a header",
                ));
            }
        }

        match (&mut self.login, &self.session) {
            (Some(login), session) => {
                let has_session = session.as_ref().is_some_and(|s| {
                    s.cookie.as_deref().is_some_and(|c| !c.is_empty()) || s.jwt.is_some()
                });
                if !has_session {
                    return Err(Error::invalid_server(
                        server,
                        "login requires a session cookie or JWT",
                    ));
                }
                if login.name.is_empty() {
                    login.name = "login".to_string();
                }
                if login.server.is_empty() {
                    login.server = server.to_string();
                }
                login.substitute_env();
                login
                    .validate()
                    .map_err(|e| Error::invalid_server(server, e.to_string()))?;
            }
            (None, Some(_)) => {
                return Err(Error::invalid_server(
                    server,
                    "session requires a login request",
                ));
            }
            (None, None) => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(json: &str) -> ServerProfile {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_parse_jwt_sources() {
        assert_eq!("payload".parse(), Ok(JwtSource::Payload));
        assert_eq!("header".parse(), Ok(JwtSource::AuthorizationHeader));
        assert_eq!(
            "payload.Token".parse(),
            Ok(JwtSource::PayloadField(vec!["token".to_string()]))
        );
        assert_eq!(
            "payload.data.token".parse(),
            Ok(JwtSource::PayloadField(vec![
                "data".to_string(),
                "token".to_string()
            ]))
        );
        assert_eq!(
            "header.X-Token".parse(),
            Ok(JwtSource::Header("X-Token".to_string()))
        );
        assert!("cookie".parse::<JwtSource>().is_err());
        assert!("payload.".parse::<JwtSource>().is_err());
    }

    #[test]
    fn test_prepare_fills_defaults() {
        let config = RunConfig::new("s.json", "tests");
        let mut server = profile(r#"{"host": "http://localhost:8080"}"#);
        server.prepare("api", &config).unwrap();

        assert_eq!(
            server.headers.get("Content-Type").map(String::as_str),
            Some("application/json")
        );
        assert_eq!(server.headers.get("Accept").map(String::as_str), Some("application/json"));
        assert_eq!(server.user_agent(), config.user_agent);
        assert_eq!(server.timeout(), config.timeout);
    }

    #[test]
    fn test_prepare_keeps_explicit_headers() {
        let config = RunConfig::new("s.json", "tests");
        let mut server = profile(
            r#"{"host": "http://localhost", "headers": {"Accept": "text/plain"}, "timeout": 3}"#,
        );
        server.prepare("api", &config).unwrap();
        assert_eq!(server.headers.len(), 1);
        assert_eq!(server.timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_login_requires_session() {
        let config = RunConfig::new("s.json", "tests");
        let mut server = profile(
            r#"{"host": "http://localhost", "auth": {"login": {
                "method": "POST", "endpoint": "/login", "expected": {"statusCode": 200}
            }}}"#,
        );
        let err = server.prepare("api", &config).unwrap_err();
        assert!(err.to_string().contains("session cookie or JWT"));
    }

    #[test]
    fn test_login_inherits_server_name() {
        let config = RunConfig::new("s.json", "tests");
        let mut server = profile(
            r#"{"host": "http://localhost", "auth": {
                "login": {"method": "POST", "endpoint": "/login", "expected": {"statusCode": 200}},
                "session": {"jwt": "payload.token"}
            }}"#,
        );
        server.prepare("api", &config).unwrap();
        let login = server.login().unwrap();
        assert_eq!(login.name, "login");
        assert_eq!(login.server, "api");
    }

    #[test]
    fn test_invalid_jwt_source_fails_to_parse() {
        let result: std::result::Result<ServerProfile, _> = serde_json::from_str(
            r#"{"host": "http://localhost", "auth": {"session": {"jwt": "body"}}}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_relative_host_is_rejected() {
        let config = RunConfig::new("s.json", "tests");
        let mut server = profile(r#"{"host": "localhost:8080"}"#);
        assert!(matches!(
            server.prepare("api", &config),
            Err(Error::InvalidServer { .. })
        ));
    }

    #[test]
    fn test_api_key_requires_header() {
        let config = RunConfig::new("s.json", "tests");
        let mut server = profile(
            r#"{"host": "http://localhost", "auth": {"apiKey": {"apiKey": "k", "header": ""}}}"#,
        );
        assert!(server.prepare("api", &config).is_err());
    }
}
