//! References to locations in the tree.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::codec::{self, ServerValue, PRIORITY_KEY};
use crate::error::Result;
use crate::path::Location;
use crate::transport::{Params, Transport, AUTH_PARAM, FORMAT_PARAM};

/// A location in the tree together with the credentials and transport used
/// to reach it.
///
/// References are values: navigation returns a new reference and leaves the
/// original alone. Every derived reference shares the auth token and the
/// transport of the one it came from.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use firebase_ref::{MemoryTransport, Reference};
/// use serde_json::json;
///
/// let root = Reference::new("https://h", Arc::new(MemoryTransport::new()));
/// let user = root.child("users/alice");
/// assert_eq!(user.location(), "https://h/users/alice/");
/// assert_eq!(user.parent().location(), "https://h/users/");
///
/// user.set(json!({"age": 30}), None).unwrap();
/// assert_eq!(user.get(None).unwrap(), Some(json!({"age": 30})));
/// ```
pub struct Reference<T: ?Sized> {
    location: String,
    auth: Option<String>,
    transport: Arc<T>,
}

impl<T: ?Sized> Reference<T> {
    pub fn new(location: impl AsRef<str>, transport: Arc<T>) -> Self {
        Self {
            location: Location::parse(location.as_ref()).to_string(),
            auth: None,
            transport,
        }
    }

    /// Attach an auth token sent with every request as `auth`.
    pub fn with_auth(mut self, token: impl Into<String>) -> Self {
        self.auth = Some(token.into());
        self
    }

    /// The normalized location, always ending in `/`.
    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn auth(&self) -> Option<&str> {
        self.auth.as_deref()
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Name of the addressed node, `None` at the root.
    pub fn key(&self) -> Option<String> {
        Location::parse(&self.location).key().map(str::to_string)
    }

    pub fn is_root(&self) -> bool {
        Location::parse(&self.location).is_root()
    }

    fn derive(&self, location: Location) -> Self {
        Self {
            location: location.to_string(),
            auth: self.auth.clone(),
            transport: Arc::clone(&self.transport),
        }
    }

    /// Reference to `path` resolved relative to this one.
    ///
    /// `path` may hold several segments as well as `.` and `..`; a leading
    /// separator does not make it absolute.
    pub fn child(&self, path: &str) -> Self {
        self.derive(Location::parse(&self.location).join(path))
    }

    /// Reference one level up. The root is its own parent.
    pub fn parent(&self) -> Self {
        self.derive(Location::parse(&self.location).parent())
    }

    pub fn root(&self) -> Self {
        self.derive(Location::parse(&self.location).root())
    }

    /// Merge the auth token into caller supplied parameters.
    ///
    /// An explicit `auth` parameter always wins.
    pub fn params(&self, mut explicit: Params) -> Params {
        if let Some(auth) = &self.auth {
            explicit
                .entry(AUTH_PARAM.to_string())
                .or_insert_with(|| auth.clone());
        }
        explicit
    }
}

impl<T: Transport + ?Sized> Reference<T> {
    /// Read the value stored here. `format` is passed as the `format`
    /// parameter; `Some("export")` keeps priority metadata.
    pub fn get(&self, format: Option<&str>) -> Result<Option<Value>> {
        let mut explicit = Params::new();
        if let Some(format) = format {
            explicit.insert(FORMAT_PARAM.to_string(), format.to_string());
        }
        tracing::debug!(location = %self.location, ?format, "get");
        let params = self.params(explicit);
        Ok(self.transport.get(&self.location, &params)?)
    }

    pub fn get_priority(&self) -> Result<Option<Value>> {
        self.child(PRIORITY_KEY).get(None)
    }

    /// Overwrite the value stored here, optionally with a priority.
    pub fn set(&self, value: Value, priority: Option<f64>) -> Result<Value> {
        let data = codec::prepare(value, priority)?;
        tracing::debug!(location = %self.location, ?priority, "set");
        let params = self.params(Params::new());
        Ok(self.transport.set(&self.location, &params, data)?)
    }

    /// Set the priority of the value stored here. `None` clears it.
    pub fn set_priority(&self, priority: Option<f64>) -> Result<Value> {
        let data = match priority {
            Some(priority) => codec::priority_value(priority)?,
            None => Value::Null,
        };
        self.child(PRIORITY_KEY).set(data, None)
    }

    pub fn set_server_value(&self, server_value: ServerValue) -> Result<Value> {
        self.set(server_value.to_value(), None)
    }

    /// Store `value` under a new child with a store-assigned name and return
    /// a reference to it.
    pub fn push(&self, value: Value, priority: Option<f64>) -> Result<Self> {
        let data = codec::prepare(value, priority)?;
        tracing::debug!(location = %self.location, ?priority, "push");
        let params = self.params(Params::new());
        let pushed = self.transport.push(&self.location, &params, data)?;
        Ok(self.child(&pushed.name))
    }

    /// Merge the keys of `value` into the value stored here. Sibling keys
    /// not named in `value` are left alone.
    pub fn update(&self, value: Value, priority: Option<f64>) -> Result<Value> {
        let data = codec::prepare(value, priority)?;
        tracing::debug!(location = %self.location, ?priority, "update");
        let params = self.params(Params::new());
        Ok(self.transport.update(&self.location, &params, data)?)
    }

    pub fn remove(&self) -> Result<()> {
        tracing::debug!(location = %self.location, "remove");
        let params = self.params(Params::new());
        Ok(self.transport.remove(&self.location, &params)?)
    }
}

impl<T: ?Sized> Clone for Reference<T> {
    fn clone(&self) -> Self {
        Self {
            location: self.location.clone(),
            auth: self.auth.clone(),
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T: ?Sized> PartialEq for Reference<T> {
    fn eq(&self, other: &Self) -> bool {
        self.location == other.location && self.auth == other.auth
    }
}

impl<T: ?Sized> Eq for Reference<T> {}

impl<T: ?Sized> fmt::Debug for Reference<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reference")
            .field("location", &self.location)
            .field("auth", &self.auth.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl<T: ?Sized> fmt::Display for Reference<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.location)
    }
}
