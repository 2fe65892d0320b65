//! The boundary between references and the store.
//!
//! A [`Transport`] receives normalized locations (always ending in `/`) and
//! decides how to turn them into requests. Failures are returned as
//! [`TransportError`] and reach the caller untouched.

use std::collections::BTreeMap;
use std::error::Error as StdError;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Request parameters, e.g. `auth` or `format`.
pub type Params = BTreeMap<String, String>;

/// Parameter carrying the auth token.
pub const AUTH_PARAM: &str = "auth";

/// Parameter selecting the read format.
pub const FORMAT_PARAM: &str = "format";

/// Read format that keeps priority metadata in the response.
pub const FORMAT_EXPORT: &str = "export";

/// Store reply to a push: the generated child name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushResponse {
    pub name: String,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("store responded with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("permission denied")]
    Unauthorized,
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("invalid JSON response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error(transparent)]
    Backend(Box<dyn StdError + Send + Sync>),
}

impl TransportError {
    /// Status code for errors that carry one.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            TransportError::Unauthorized => Some(401),
            TransportError::InvalidData(_) => Some(400),
            _ => None,
        }
    }
}

/// Operations a store must offer over a location string.
pub trait Transport {
    /// Read the value at `location`. `None` means nothing is stored there.
    fn get(&self, location: &str, params: &Params) -> Result<Option<Value>, TransportError>;

    /// Overwrite the value at `location`, returning what the store accepted.
    fn set(&self, location: &str, params: &Params, data: Value) -> Result<Value, TransportError>;

    /// Store `data` under a new, uniquely named child of `location`.
    fn push(
        &self,
        location: &str,
        params: &Params,
        data: Value,
    ) -> Result<PushResponse, TransportError>;

    /// Merge the keys of `data` into the value at `location`.
    fn update(&self, location: &str, params: &Params, data: Value)
        -> Result<Value, TransportError>;

    fn remove(&self, location: &str, params: &Params) -> Result<(), TransportError>;
}
