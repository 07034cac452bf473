//! Transport configuration for the Cozi REST client.

use std::collections::HashMap;
use std::time::Duration;

/// Default request timeout when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Transport configuration options.
///
/// Controls how requests are sent over the network.
#[derive(Debug, Clone)]
pub enum TransportOptions {
    /// HTTP transport configuration
    Http {
        /// Request timeout. If None, [`DEFAULT_TIMEOUT`] is used.
        timeout: Option<Duration>,
        /// HTTP proxy URL.
        proxy: Option<String>,
        /// Additional HTTP headers to send with every request.
        headers: Option<HashMap<String, String>>,
    },
}

impl Default for TransportOptions {
    fn default() -> Self {
        TransportOptions::Http {
            timeout: None,
            proxy: None,
            headers: None,
        }
    }
}

impl TransportOptions {
    /// Create new default HTTP transport options.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, duration: Duration) -> Self {
        match &mut self {
            TransportOptions::Http { timeout, .. } => *timeout = Some(duration),
        }
        self
    }

    pub fn with_proxy(mut self, proxy_url: impl Into<String>) -> Self {
        match &mut self {
            TransportOptions::Http { proxy, .. } => *proxy = Some(proxy_url.into()),
        }
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        match &mut self {
            TransportOptions::Http { headers, .. } => {
                headers
                    .get_or_insert_with(HashMap::new)
                    .insert(key.into(), value.into());
            }
        }
        self
    }

    /// The timeout that will actually be applied.
    pub fn effective_timeout(&self) -> Duration {
        match self {
            TransportOptions::Http { timeout, .. } => timeout.unwrap_or(DEFAULT_TIMEOUT),
        }
    }
}
