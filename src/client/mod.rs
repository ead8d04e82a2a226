//! HTTP client for one server profile
//!
//! A [`Client`] owns the connection pool for its server plus the session
//! state captured at login. Workers share a client and read the session
//! concurrently; per-file batches work on a [`Client::fork`] so session
//! changes made by one file never leak into another.

mod request;
mod session;

pub use request::{endpoint_url, request_headers, TEST_NAME_HEADER};
pub use session::{extract_jwt, SessionState};

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::Method;

use crate::common::config::RunConfig;
use crate::common::{Error, Result};
use crate::definitions::{JwtSource, ServerProfile, TestCase};

/// Idle connections kept per host
const POOL_IDLE_PER_HOST: usize = 100;

/// TCP connect timeout, independent of the request timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// What came back from one request
#[derive(Debug)]
pub struct Response {
    pub status: u16,
    pub body: String,
    /// Request and response details, filled in for `debug` tests
    pub logs: Vec<String>,
    /// Set when a session JWT was expected in this response but couldn't be read
    pub jwt_error: Option<Error>,
}

/// Client bound to one server profile
#[derive(Debug, Clone)]
pub struct Client {
    name: String,
    profile: Arc<ServerProfile>,
    http: reqwest::Client,
    session: Arc<SessionState>,
}

impl Client {
    /// Create a client for a prepared profile
    pub fn new(name: &str, profile: ServerProfile) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(profile.timeout())
            .connect_timeout(CONNECT_TIMEOUT)
            .pool_max_idle_per_host(POOL_IDLE_PER_HOST)
            .build()
            .map_err(|e| {
                Error::Config(format!("cannot create HTTP client for '{}': {}", name, e))
            })?;

        Ok(Self {
            name: name.to_string(),
            profile: Arc::new(profile),
            http,
            session: Arc::new(SessionState::new()),
        })
    }

    /// Client without authentication, used for absolute endpoints that
    /// name no server
    pub fn anonymous(config: &RunConfig) -> Result<Self> {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), config.content_type.clone());
        headers.insert("Accept".to_string(), config.accept.clone());
        let profile = ServerProfile {
            host: String::new(),
            headers,
            auth: None,
            user_agent: Some(config.user_agent.clone()),
            timeout: Some(config.timeout.as_secs()),
        };
        Self::new("", profile)
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Same connection pool, private copy of the session
    pub fn fork(&self) -> Self {
        Self {
            session: Arc::new(self.session.snapshot()),
            ..self.clone()
        }
    }

    /// Run the login request, if the profile has one
    ///
    /// Any failure is wrapped in `ConnectFailed` naming this server.
    pub async fn connect(&self) -> Result<()> {
        let Some(login) = self.profile.login() else {
            return Ok(());
        };
        tracing::info!(server = %self.name, endpoint = %login.endpoint, "logging in");

        self.login(login).await.map_err(|e| Error::ConnectFailed {
            server: self.name.clone(),
            source: Box::new(e),
        })
    }

    async fn login(&self, login: &TestCase) -> Result<()> {
        let response = self.execute(login).await?;
        if response.status != login.expected.status_code {
            return Err(Error::StatusMismatch {
                expected: login.expected.status_code,
                actual: response.status,
            });
        }
        if let Some(e) = response.jwt_error {
            return Err(e);
        }
        Ok(())
    }

    /// Send the request described by `test`
    ///
    /// Only transport problems are returned as errors. Whatever the server
    /// answered is handed back for the caller to judge.
    pub async fn execute(&self, test: &TestCase) -> Result<Response> {
        let url = endpoint_url(&self.profile.host, &test.endpoint);
        let method = Method::from_bytes(test.method.to_uppercase().as_bytes())
            .map_err(|_| Error::invalid_test(&test.name, format!("invalid method '{}'", test.method)))?;
        let headers = request_headers(&self.profile, &self.session, test);

        let mut logs = Vec::new();
        if test.debug {
            logs.push(format!("--- {}", test.name));
            logs.push("API Request:".to_string());
            logs.push(format!("  URL: {}", url));
            logs.push(format!("  Method: {}", method));
            logs.push(format!("  Payload: {}", test.payload));
            logs.push("  Headers:".to_string());
            logs.extend(headers.iter().map(|(k, v)| format!("    {}: {}", k, v)));
        }

        let mut request = self.http.request(method, &url);
        if !test.url_params.is_empty() {
            request = request.query(&test.url_params);
        }
        for (name, value) in &headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if !test.payload.is_empty() {
            request = request.body(test.payload.clone());
        }

        tracing::debug!(test = %test.name, %url, "sending request");
        let response = request
            .send()
            .await
            .map_err(|e| Error::transport(&test.name, e))?;

        let status = response.status();
        let cookie = self.wanted_cookie().and_then(|name| {
            response
                .cookies()
                .find(|c| c.name() == name)
                .map(|c| c.value().to_string())
        });
        let response_headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(|e| Error::transport(&test.name, e))?;

        if test.debug {
            logs.push("API Response:".to_string());
            logs.push(format!("  Response: {}", body));
        }

        let mut result = Response {
            status: status.as_u16(),
            body,
            logs,
            jwt_error: None,
        };
        if status.is_success() {
            if let Some(cookie) = cookie {
                if self.session.set_cookie_once(cookie) {
                    tracing::debug!(server = %self.name, "captured session cookie");
                }
            }
            result.jwt_error = self
                .capture_jwt(test, &response_headers, &result.body)
                .err();
        }
        Ok(result)
    }

    /// Cookie name to capture, while none is held yet
    fn wanted_cookie(&self) -> Option<&str> {
        if self.session.cookie().is_some() {
            return None;
        }
        self.profile.session().and_then(|s| s.cookie.as_deref())
    }

    fn capture_jwt(&self, test: &TestCase, headers: &HeaderMap, body: &str) -> Result<()> {
        let configured = self.profile.session().and_then(|s| s.jwt.as_ref());

        if test.capture_jwt {
            let source = configured.unwrap_or(&JwtSource::Payload);
            let token = extract_jwt(source, headers, body)?;
            tracing::debug!(server = %self.name, test = %test.name, "replaced session JWT");
            self.session.replace_jwt(token);
            return Ok(());
        }

        if let Some(source) = configured {
            if self.session.jwt().is_none() {
                let token = extract_jwt(source, headers, body)?;
                if self.session.set_jwt_once(token) {
                    tracing::debug!(server = %self.name, "captured session JWT");
                }
            }
        }
        Ok(())
    }
}

/// Every connected client of a run, keyed by profile name
#[derive(Debug, Clone)]
pub struct Clients {
    servers: BTreeMap<String, Client>,
    anonymous: Client,
}

impl Clients {
    /// Create and connect one client per profile, one at a time in name order
    pub async fn connect(profiles: BTreeMap<String, ServerProfile>, config: &RunConfig) -> Result<Self> {
        let mut servers = BTreeMap::new();
        for (name, profile) in profiles {
            let client = Client::new(&name, profile)?;
            client.connect().await?;
            servers.insert(name, client);
        }
        Ok(Self {
            servers,
            anonymous: Client::anonymous(config)?,
        })
    }

    /// Client that should run `test`
    pub fn for_test(&self, test: &TestCase) -> Result<&Client> {
        if test.server.is_empty() {
            return Ok(&self.anonymous);
        }
        self.servers
            .get(&test.server)
            .ok_or_else(|| Error::UnknownServer {
                test: test.name.clone(),
                server: test.server.clone(),
            })
    }

    /// Fork every client, giving a batch its own sessions
    pub fn fork(&self) -> Self {
        Self {
            servers: self
                .servers
                .iter()
                .map(|(name, client)| (name.clone(), client.fork()))
                .collect(),
            anonymous: self.anonymous.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}
