//! [`Transport`] over the REST API using a blocking `reqwest` client.

use firebase_ref::path::Location;
use firebase_ref::{Params, PushResponse, Transport, TransportError};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde_json::Value;

use crate::config::HttpTransportConfig;

/// Request URL for `location`: the endpoint suffix goes after the path and
/// before any query or fragment.
///
/// # Example
///
/// ```
/// use firebase_http::endpoint_url;
///
/// assert_eq!(endpoint_url("https://h/a/", ".json"), "https://h/a/.json");
/// assert_eq!(endpoint_url("https://h", ".json"), "https://h/.json");
/// assert_eq!(endpoint_url("https://h/a/?ns=x", ".json"), "https://h/a/.json?ns=x");
/// ```
pub fn endpoint_url(location: &str, suffix: &str) -> String {
    let location = Location::parse(location);
    format!(
        "{}{}{}{}",
        location.origin(),
        location.path(),
        suffix,
        location.suffix()
    )
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    config: HttpTransportConfig,
}

impl HttpTransport {
    /// Transport with default settings.
    pub fn new() -> Result<Self, TransportError> {
        Self::with_config(HttpTransportConfig::default())
    }

    pub fn with_config(config: HttpTransportConfig) -> Result<Self, TransportError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        let client = builder.build().map_err(backend)?;
        Ok(Self { client, config })
    }

    /// Transport around an already configured client.
    pub fn with_client(client: Client, config: HttpTransportConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &HttpTransportConfig {
        &self.config
    }

    fn request(&self, method: Method, location: &str, params: &Params) -> RequestBuilder {
        let url = endpoint_url(location, &self.config.endpoint_suffix);
        tracing::debug!(%method, %url, "request");
        self.client.request(method, url).query(params)
    }

    fn with_body(builder: RequestBuilder, data: &Value) -> Result<RequestBuilder, TransportError> {
        let body = serde_json::to_string(data)?;
        Ok(builder.header(CONTENT_TYPE, "application/json").body(body))
    }

    /// Send the request and return the raw body of a successful response.
    fn send(builder: RequestBuilder) -> Result<String, TransportError> {
        let response = builder.send().map_err(backend)?;
        let status = response.status();
        let body = response.text().map_err(backend)?;
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), %body, "request failed");
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

impl Transport for HttpTransport {
    fn get(&self, location: &str, params: &Params) -> Result<Option<Value>, TransportError> {
        let body = Self::send(self.request(Method::GET, location, params))?;
        let value: Value = serde_json::from_str(&body)?;
        Ok((!value.is_null()).then_some(value))
    }

    fn set(&self, location: &str, params: &Params, data: Value) -> Result<Value, TransportError> {
        let builder = Self::with_body(self.request(Method::PUT, location, params), &data)?;
        Ok(serde_json::from_str(&Self::send(builder)?)?)
    }

    fn push(
        &self,
        location: &str,
        params: &Params,
        data: Value,
    ) -> Result<PushResponse, TransportError> {
        let builder = Self::with_body(self.request(Method::POST, location, params), &data)?;
        Ok(serde_json::from_str(&Self::send(builder)?)?)
    }

    fn update(
        &self,
        location: &str,
        params: &Params,
        data: Value,
    ) -> Result<Value, TransportError> {
        let builder = Self::with_body(self.request(Method::PATCH, location, params), &data)?;
        Ok(serde_json::from_str(&Self::send(builder)?)?)
    }

    fn remove(&self, location: &str, params: &Params) -> Result<(), TransportError> {
        Self::send(self.request(Method::DELETE, location, params))?;
        Ok(())
    }
}

fn backend(err: reqwest::Error) -> TransportError {
    TransportError::Backend(Box::new(err))
}
