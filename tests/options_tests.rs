use cozi_mcp::config::session_config_schema;
use cozi_mcp::options::DEFAULT_TIMEOUT;
use cozi_mcp::{Config, SessionConfig, TransportOptions};
use std::time::Duration;

#[test]
fn test_transport_options_builder() {
    let options = TransportOptions::new()
        .with_timeout(Duration::from_secs(10))
        .with_proxy("http://proxy.example.com")
        .with_header("X-Client", "cozi-mcp");

    assert_eq!(options.effective_timeout(), Duration::from_secs(10));
    match options {
        TransportOptions::Http {
            timeout,
            proxy,
            headers,
        } => {
            assert_eq!(timeout, Some(Duration::from_secs(10)));
            assert_eq!(proxy, Some("http://proxy.example.com".to_string()));

            let headers = headers.unwrap();
            assert_eq!(headers.get("X-Client"), Some(&"cozi-mcp".to_string()));
        }
    }
}

#[test]
fn test_default_timeout_applies() {
    assert_eq!(TransportOptions::new().effective_timeout(), DEFAULT_TIMEOUT);
}

#[test]
fn test_config_keeps_base_url() {
    let base_url = url::Url::parse("http://localhost:9000/api/ext/").unwrap();
    let config = Config::new(base_url.clone(), TransportOptions::new());

    assert_eq!(config.base_url, base_url);
    assert_eq!(config.transport.effective_timeout(), DEFAULT_TIMEOUT);
}

#[test]
fn test_session_config_plain_params_win_only_without_config() {
    let config = SessionConfig::from_query("foo=bar&password=pw&username=sam").unwrap();
    assert_eq!(config.username, "sam");

    let err = SessionConfig::from_query("config=%%%&username=sam&password=pw").unwrap_err();
    assert!(err.to_string().contains("base64"));
}

#[test]
fn test_session_schema_is_an_object() {
    let schema = session_config_schema();
    assert_eq!(schema["type"], "object");
    assert!(schema["properties"]["username"].is_object());
    assert!(schema["properties"]["password"].is_object());
}
