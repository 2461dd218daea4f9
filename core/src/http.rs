//! HTTP transport for the fitness API.
//!
//! # Design
//! Resource operations talk to the network through the `Transport` trait and
//! never see a socket type; `HttpTransport` is the production implementation
//! over a blocking `ureq` agent, and tests substitute a recording fake. The
//! transport is stateless between calls. It holds only the agent, the
//! normalized base URL, and the prebuilt `Authorization` header, so a single
//! instance is safe to share across concurrently running operations.

use std::time::Duration;

use ureq::Agent;

use crate::error::ErrorKind;

/// Default connect and read timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// HTTP method used by the API contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
        }
    }
}

/// One HTTP round trip.
///
/// `path_and_query` is appended verbatim to the base URL and must start with
/// a slash. A `Ok` return is the raw body of a sub-400 response; a status
/// >= 400 maps to `ErrorKind::Request` with the body preserved.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        method: Method,
        path_and_query: &str,
        body: Option<&str>,
    ) -> Result<String, ErrorKind>;
}

/// Blocking transport over a `ureq` agent.
///
/// Attaches the bearer token, content type, and client user agent to every
/// request. Statuses are returned as data (not ureq errors) so the client
/// decides what counts as failure.
pub struct HttpTransport {
    agent: Agent,
    base_url: String,
    auth_header: String,
}

impl HttpTransport {
    /// Transport with the default 10 second connect/read timeouts.
    pub fn new(base_url: &str, access_token: &str) -> Self {
        Self::builder(base_url, access_token).build()
    }

    pub fn builder(base_url: &str, access_token: &str) -> HttpTransportBuilder {
        HttpTransportBuilder {
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
            connect_timeout: DEFAULT_TIMEOUT,
            read_timeout: DEFAULT_TIMEOUT,
        }
    }
}

pub struct HttpTransportBuilder {
    base_url: String,
    access_token: String,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl HttpTransportBuilder {
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn build(self) -> HttpTransport {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_connect(Some(self.connect_timeout))
            .timeout_recv_response(Some(self.read_timeout))
            .build()
            .new_agent();

        HttpTransport {
            agent,
            base_url: self.base_url,
            auth_header: format!("Bearer {}", self.access_token),
        }
    }
}

impl Transport for HttpTransport {
    fn send(
        &self,
        method: Method,
        path_and_query: &str,
        body: Option<&str>,
    ) -> Result<String, ErrorKind> {
        let url = format!("{}{}", self.base_url, path_and_query);
        tracing::debug!(method = method.as_str(), %url, "dispatching request");

        let mut response = match (method, body) {
            (Method::Get, _) => self
                .agent
                .get(&url)
                .header("Authorization", self.auth_header.as_str())
                .header("Content-Type", "application/json")
                .header("User-Agent", USER_AGENT)
                .call()?,
            (Method::Post, Some(body)) => self
                .agent
                .post(&url)
                .header("Authorization", self.auth_header.as_str())
                .header("User-Agent", USER_AGENT)
                .content_type("application/json")
                .send(body.as_bytes())?,
            (Method::Post, None) => self
                .agent
                .post(&url)
                .header("Authorization", self.auth_header.as_str())
                .header("Content-Type", "application/json")
                .header("User-Agent", USER_AGENT)
                .send_empty()?,
            (Method::Patch, Some(body)) => self
                .agent
                .patch(&url)
                .header("Authorization", self.auth_header.as_str())
                .header("User-Agent", USER_AGENT)
                .content_type("application/json")
                .send(body.as_bytes())?,
            (Method::Patch, None) => self
                .agent
                .patch(&url)
                .header("Authorization", self.auth_header.as_str())
                .header("Content-Type", "application/json")
                .header("User-Agent", USER_AGENT)
                .send_empty()?,
        };

        let status = response.status().as_u16();
        let text = response.body_mut().read_to_string()?;

        if status >= 400 {
            tracing::warn!(status, %url, "request rejected");
            return Err(ErrorKind::Request { status, body: text });
        }
        Ok(text)
    }
}
