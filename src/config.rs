//! Credentials and runtime configuration.
//!
//! The standalone server reads everything from the environment once at
//! start-up. The hosted server receives credentials per session through the
//! query string of the MCP endpoint, either as plain `username`/`password`
//! parameters or as a base64-encoded JSON `config` parameter.

use std::env;
use std::fmt;
use std::time::Duration;

use base64::engine::general_purpose::{STANDARD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use schemars::JsonSchema;
use serde::Deserialize;
use url::Url;

use crate::api::DEFAULT_BASE_URL;
use crate::client::CoziError;
use crate::options::TransportOptions;

pub const USERNAME_VAR: &str = "COZI_USERNAME";
pub const PASSWORD_VAR: &str = "COZI_PASSWORD";
pub const BASE_URL_VAR: &str = "COZI_BASE_URL";
pub const TIMEOUT_VAR: &str = "COZI_HTTP_TIMEOUT_SECS";
pub const PROXY_VAR: &str = "COZI_HTTP_PROXY";
pub const HEADERS_VAR: &str = "COZI_HTTP_HEADERS";

/// Cozi account credentials. The password never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Both values must be non-blank.
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, CoziError> {
        let username = username.into();
        let password = password.into();
        if username.trim().is_empty() || password.is_empty() {
            return Err(CoziError::Authentication(
                "Cozi username and password must be provided".to_string(),
            ));
        }
        Ok(Self { username, password })
    }

    /// Read `COZI_USERNAME` and `COZI_PASSWORD`.
    pub fn from_env() -> Result<Self, CoziError> {
        let username = env::var(USERNAME_VAR).unwrap_or_default();
        let password = env::var(PASSWORD_VAR).unwrap_or_default();
        if username.trim().is_empty() || password.is_empty() {
            return Err(CoziError::Authentication(format!(
                "{USERNAME_VAR} and {PASSWORD_VAR} environment variables must be set"
            )));
        }
        Self::new(username, password)
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Per-session configuration supplied by the hosting platform.
#[derive(Clone, Deserialize, JsonSchema)]
pub struct SessionConfig {
    /// Cozi account username/email
    pub username: String,
    /// Cozi account password
    pub password: String,
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl SessionConfig {
    /// Parse the session configuration from a request query string.
    ///
    /// A `config` parameter (base64 JSON) takes precedence over plain
    /// `username`/`password` parameters.
    pub fn from_query(query: &str) -> Result<Self, CoziError> {
        let mut username = None;
        let mut password = None;
        let mut encoded = None;

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "username" => username = Some(value.into_owned()),
                "password" => password = Some(value.into_owned()),
                "config" => encoded = Some(value.into_owned()),
                _ => {}
            }
        }

        if let Some(encoded) = encoded {
            return Self::from_encoded(&encoded);
        }

        match (username, password) {
            (Some(username), Some(password)) => Ok(Self { username, password }),
            _ => Err(CoziError::Authentication(
                "Cozi username and password must be provided".to_string(),
            )),
        }
    }

    fn from_encoded(encoded: &str) -> Result<Self, CoziError> {
        let bytes = [STANDARD, URL_SAFE, URL_SAFE_NO_PAD]
            .iter()
            .find_map(|engine| engine.decode(encoded.trim()).ok())
            .ok_or_else(|| {
                CoziError::Authentication("session config is not valid base64".to_string())
            })?;
        serde_json::from_slice(&bytes).map_err(|e| {
            CoziError::Authentication(format!("session config does not match the schema: {e}"))
        })
    }

    pub fn credentials(&self) -> Result<Credentials, CoziError> {
        Credentials::new(self.username.clone(), self.password.clone())
    }
}

/// Where a server instance gets its credentials from.
#[derive(Debug, Clone)]
pub enum CredentialSource {
    /// Resolved once for the whole process. `None` means they were absent,
    /// which fails every call.
    Environment(Option<Credentials>),
    /// Read from the session configuration on every call.
    Session,
}

/// Process-level settings for the REST client.
#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: Url,
    pub transport: TransportOptions,
}

impl Config {
    pub fn new(base_url: Url, transport: TransportOptions) -> Self {
        Self {
            base_url,
            transport,
        }
    }

    /// Build from `COZI_BASE_URL`, `COZI_HTTP_TIMEOUT_SECS`,
    /// `COZI_HTTP_PROXY` and `COZI_HTTP_HEADERS`, falling back to defaults.
    pub fn from_env() -> Result<Self, CoziError> {
        let base_url = match env::var(BASE_URL_VAR) {
            Ok(raw) if !raw.trim().is_empty() => Url::parse(raw.trim()).map_err(|e| {
                CoziError::validation(format!("{BASE_URL_VAR} is not a valid URL: {e}"))
            })?,
            _ => default_base_url()?,
        };

        let mut transport = TransportOptions::new();
        if let Some(secs) = env::var(TIMEOUT_VAR).ok().and_then(|v| v.trim().parse().ok()) {
            transport = transport.with_timeout(Duration::from_secs(secs));
        }
        if let Ok(proxy) = env::var(PROXY_VAR) {
            if !proxy.trim().is_empty() {
                transport = transport.with_proxy(proxy.trim());
            }
        }
        if let Ok(raw) = env::var(HEADERS_VAR) {
            for (name, value) in parse_headers(&raw)? {
                transport = transport.with_header(name, value);
            }
        }

        Ok(Self {
            base_url,
            transport,
        })
    }
}

/// Parse `Name=value` pairs separated by commas, e.g.
/// `X-Client=cozi-mcp,X-Trace=1`. Blank entries are skipped.
pub fn parse_headers(raw: &str) -> Result<Vec<(String, String)>, CoziError> {
    raw.split(',')
        .filter(|entry| !entry.trim().is_empty())
        .map(parse_header)
        .collect()
}

/// Parse a single `Name=value` header.
pub fn parse_header(entry: &str) -> Result<(String, String), CoziError> {
    match entry.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(CoziError::validation(format!(
            "Invalid header {entry:?}: expected Name=value"
        ))),
    }
}

fn default_base_url() -> Result<Url, CoziError> {
    Url::parse(DEFAULT_BASE_URL)
        .map_err(|e| CoziError::validation(format!("invalid default base URL: {e}")))
}

/// JSON schema of [`SessionConfig`], as advertised to hosting platforms.
pub fn session_config_schema() -> serde_json::Value {
    serde_json::to_value(schemars::schema_for!(SessionConfig)).unwrap_or_default()
}
