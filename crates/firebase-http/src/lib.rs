//! HTTP transport for [`firebase_ref`] references.
//!
//! Each location is turned into a REST endpoint by appending `.json` to its
//! path; reads, overwrites, pushes, merges and deletes map to `GET`, `PUT`,
//! `POST`, `PATCH` and `DELETE`. A response outside the 2xx range becomes
//! [`TransportError::Status`] carrying the response body.
//!
//! ```no_run
//! use serde_json::json;
//!
//! let root = firebase_http::connect("https://example.firebaseio.com", None).unwrap();
//! root.child("greeting").set(json!("hello"), None).unwrap();
//! ```

pub mod config;
pub mod transport;

use std::sync::Arc;

use firebase_ref::{Reference, TransportError};

pub use config::HttpTransportConfig;
pub use transport::{endpoint_url, HttpTransport};

/// Reference to `location` over a default [`HttpTransport`].
pub fn connect(
    location: &str,
    auth: Option<&str>,
) -> Result<Reference<HttpTransport>, TransportError> {
    let reference = Reference::new(location, Arc::new(HttpTransport::new()?));
    Ok(match auth {
        Some(token) => reference.with_auth(token),
        None => reference,
    })
}
