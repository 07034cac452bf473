//! HTTP plumbing shared by every Cozi request.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;

use crate::client::CoziError;
use crate::options::TransportOptions;

/// Build a configured HTTP client from transport options.
///
/// Extra headers become default headers of the client, so every request
/// (login included) carries them.
pub fn build_http_client(transport_options: &TransportOptions) -> Result<Client, CoziError> {
    let mut builder = Client::builder().timeout(transport_options.effective_timeout());

    match transport_options {
        TransportOptions::Http { proxy, headers, .. } => {
            if let Some(proxy_url) = proxy {
                match reqwest::Proxy::all(proxy_url) {
                    Ok(p) => builder = builder.proxy(p),
                    Err(e) => tracing::warn!("Ignoring invalid proxy {}: {}", proxy_url, e),
                }
            }
            if let Some(headers) = headers {
                builder = builder.default_headers(header_map(headers)?);
            }
        }
    }

    Ok(builder.build()?)
}

fn header_map<'a, I>(headers: I) -> Result<HeaderMap, CoziError>
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| CoziError::validation(format!("Invalid header name: {name}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| CoziError::validation(format!("Invalid value for header {name}")))?;
        map.insert(name, value);
    }
    Ok(map)
}

/// Extension trait for RequestBuilder that logs request body.
pub trait RequestBuilderExt {
    /// Set JSON request body and log it. Never use this for bodies carrying
    /// credentials.
    fn json_logged<T: serde::Serialize + ?Sized>(self, json: &T) -> Self;
}

impl RequestBuilderExt for RequestBuilder {
    fn json_logged<T: serde::Serialize + ?Sized>(self, json: &T) -> Self {
        if let Ok(req_body) = serde_json::to_string_pretty(json) {
            tracing::debug!("Cozi request body ({} bytes):\n{}", req_body.len(), req_body);
        }

        self.json(json)
    }
}

/// Error payload of a failed Cozi call. Either field may carry the text.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

/// Pull a readable message out of an error response body.
pub(crate) fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message.or(b.error))
}

/// Extension trait for Response: status mapping and body logging.
#[async_trait::async_trait]
pub trait ResponseExt: Sized {
    /// Pass a success through; turn anything else into a [`CoziError`].
    ///
    /// 401 is an authentication failure, every other status is a remote
    /// error carrying the service's message.
    async fn checked(self) -> Result<Self, CoziError>;

    /// Get response text and log it. Consumes the response.
    async fn text_logged(self) -> Result<String, reqwest::Error>;

    /// Parse response as JSON and log it. Consumes the response.
    async fn json_logged<T: serde::de::DeserializeOwned>(self) -> Result<T, CoziError>;
}

#[async_trait::async_trait]
impl ResponseExt for Response {
    async fn checked(self) -> Result<Self, CoziError> {
        let status = self.status();
        if status.is_success() {
            return Ok(self);
        }

        let body = self.text_logged().await.unwrap_or_default();
        let message = error_message(&body).unwrap_or_else(|| {
            if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                body
            }
        });

        if status == StatusCode::UNAUTHORIZED {
            return Err(CoziError::Authentication(message));
        }
        Err(CoziError::Remote {
            status: status.as_u16(),
            message,
        })
    }

    async fn text_logged(self) -> Result<String, reqwest::Error> {
        let text = self.text().await?;
        tracing::debug!("Cozi response ({} bytes):\n{}", text.len(), text);
        Ok(text)
    }

    async fn json_logged<T: serde::de::DeserializeOwned>(self) -> Result<T, CoziError> {
        let bytes = self.bytes().await?;

        if let Ok(text) = std::str::from_utf8(&bytes) {
            tracing::debug!("Cozi response ({} bytes):\n{}", text.len(), text);
        }

        serde_json::from_slice(&bytes).map_err(CoziError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn error_body_message_is_extracted() {
        assert_eq!(
            error_message(r#"{"message":"List not found"}"#).as_deref(),
            Some("List not found")
        );
        assert_eq!(error_message(r#"{"error":"bad token"}"#).as_deref(), Some("bad token"));
        assert_eq!(error_message("<html>"), None);
    }

    #[test]
    fn invalid_header_names_are_rejected() {
        let headers = HashMap::from([("bad header".to_string(), "x".to_string())]);
        let err = header_map(&headers).unwrap_err();
        assert!(err.to_string().contains("Invalid header name"));
    }

    #[test]
    fn client_builds_with_extra_headers() {
        let options = TransportOptions::new().with_header("X-Client", "cozi-mcp");
        assert!(build_http_client(&options).is_ok());
    }
}
