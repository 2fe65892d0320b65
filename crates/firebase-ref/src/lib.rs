//! References into Firebase-style JSON tree stores.
//!
//! A [`Reference`] names one node of a remote JSON tree by an absolute,
//! URL-like location and forwards reads and writes to a [`Transport`].
//! Navigation (`child`, `parent`, `root`) is pure path algebra and never
//! touches the network.
//!
//! Values are plain [`serde_json::Value`]s. When a write carries a priority,
//! the [`codec`] module takes care of the wire layout (`.value` and
//! `.priority` keys).
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use firebase_ref::{MemoryTransport, Reference};
//! use serde_json::json;
//!
//! let root = Reference::new("https://example.firebaseio.com", Arc::new(MemoryTransport::new()));
//! let messages = root.child("messages");
//!
//! let first = messages.push(json!({"text": "hello"}), Some(1.0)).unwrap();
//! assert_eq!(first.parent(), messages);
//! assert_eq!(first.get(None).unwrap(), Some(json!({"text": "hello"})));
//! assert_eq!(first.get_priority().unwrap(), Some(json!(1.0)));
//!
//! first.remove().unwrap();
//! assert_eq!(first.get(None).unwrap(), None);
//! ```

pub mod codec;
pub mod error;
pub mod memory;
pub mod path;
pub mod push_id;
pub mod reference;
pub mod transport;

pub use codec::{is_structured, prepare, wrap, CodecError, ServerValue};
pub use error::{Error, Result};
pub use memory::MemoryTransport;
pub use path::Location;
pub use reference::Reference;
pub use transport::{Params, PushResponse, Transport, TransportError};
