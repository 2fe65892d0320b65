//! HTTP transport settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Suffix the REST API expects on every resource path.
pub const DEFAULT_ENDPOINT_SUFFIX: &str = ".json";

/// Settings for [`HttpTransport`](crate::HttpTransport).
///
/// Every field is optional when deserializing.
///
/// # Example
///
/// ```
/// use firebase_http::HttpTransportConfig;
///
/// let config: HttpTransportConfig =
///     serde_json::from_str(r#"{"timeout_ms": 2500}"#).unwrap();
/// assert_eq!(config.timeout_ms, Some(2500));
/// assert_eq!(config.endpoint_suffix, ".json");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpTransportConfig {
    /// Whole-request timeout. `None` keeps the client default.
    pub timeout_ms: Option<u64>,
    pub user_agent: Option<String>,
    /// Appended to the location path to form the request URL.
    pub endpoint_suffix: String,
}

impl HttpTransportConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            timeout_ms: None,
            user_agent: None,
            endpoint_suffix: DEFAULT_ENDPOINT_SUFFIX.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let config = HttpTransportConfig::default();
        assert_eq!(config.endpoint_suffix, ".json");
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn test_deserialize_empty() {
        let config: HttpTransportConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, HttpTransportConfig::default());
    }

    #[test]
    fn test_deserialize_full() {
        let config: HttpTransportConfig = serde_json::from_str(
            r#"{"timeout_ms": 100, "user_agent": "agent/1", "endpoint_suffix": ""}"#,
        )
        .unwrap();
        assert_eq!(config.timeout(), Some(Duration::from_millis(100)));
        assert_eq!(config.user_agent.as_deref(), Some("agent/1"));
        assert_eq!(config.endpoint_suffix, "");
    }
}
