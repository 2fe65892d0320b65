//! An in-process store that behaves like the remote one.
//!
//! The whole tree lives in one [`Value`] in export layout, the same shape
//! [`codec::prepare`](crate::codec::prepare) produces: priorities sit under
//! `.priority` and prioritized non-mappings are wrapped under `.value`. The
//! origin of a location is ignored; only its path selects the node.
//!
//! Store rules mirrored here:
//! - writing `null` or an empty mapping deletes the node,
//! - a node left without children disappears,
//! - writing to `<node>/.priority` sets the priority of `<node>`,
//! - `{".sv": "timestamp"}` becomes the current time in milliseconds.
//!
//! Sequences are kept as leaves. Writing beneath one turns it into a mapping
//! keyed by index, as the remote store does.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::{Map, Value};

use crate::codec::{self, ServerValue, PRIORITY_KEY, VALUE_KEY};
use crate::path::Location;
use crate::push_id::{now_millis, PushIdGenerator};
use crate::transport::{
    Params, PushResponse, Transport, TransportError, AUTH_PARAM, FORMAT_EXPORT, FORMAT_PARAM,
};

#[derive(Debug, Default)]
struct State {
    tree: Value,
    ids: PushIdGenerator,
}

/// Thread-safe in-memory [`Transport`].
///
/// # Example
///
/// ```
/// use firebase_ref::{MemoryTransport, Params, Transport};
/// use serde_json::json;
///
/// let store = MemoryTransport::new();
/// store.set("/a/", &Params::new(), json!({"b": 1})).unwrap();
/// assert_eq!(store.get("/a/b/", &Params::new()).unwrap(), Some(json!(1)));
/// assert_eq!(store.get("/missing/", &Params::new()).unwrap(), None);
/// ```
#[derive(Debug, Default)]
pub struct MemoryTransport {
    state: Mutex<State>,
    required_auth: Option<String>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that rejects every call lacking `auth=<token>`.
    pub fn with_auth(token: impl Into<String>) -> Self {
        Self {
            state: Mutex::default(),
            required_auth: Some(token.into()),
        }
    }

    /// The whole tree in export layout, `None` when empty.
    pub fn snapshot(&self) -> Option<Value> {
        let state = self.lock();
        (!state.tree.is_null()).then(|| state.tree.clone())
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn authorize(&self, params: &Params) -> Result<(), TransportError> {
        match &self.required_auth {
            Some(token) if params.get(AUTH_PARAM) != Some(token) => {
                Err(TransportError::Unauthorized)
            }
            _ => Ok(()),
        }
    }
}

impl Transport for MemoryTransport {
    fn get(&self, location: &str, params: &Params) -> Result<Option<Value>, TransportError> {
        tracing::debug!(location, "memory get");
        self.authorize(params)?;
        let segments = Location::parse(location).segments().to_vec();
        let export = params.get(FORMAT_PARAM).map(String::as_str) == Some(FORMAT_EXPORT);
        let state = self.lock();
        Ok(read(&state.tree, &segments, export))
    }

    fn set(&self, location: &str, params: &Params, data: Value) -> Result<Value, TransportError> {
        tracing::debug!(location, "memory set");
        self.authorize(params)?;
        let segments = Location::parse(location).segments().to_vec();
        let mut state = self.lock();
        write(&mut state.tree, &segments, data)
    }

    fn push(
        &self,
        location: &str,
        params: &Params,
        data: Value,
    ) -> Result<PushResponse, TransportError> {
        tracing::debug!(location, "memory push");
        self.authorize(params)?;
        let mut segments = Location::parse(location).segments().to_vec();
        let mut state = self.lock();
        let name = state.ids.next_id();
        segments.push(name.clone());
        write(&mut state.tree, &segments, data)?;
        Ok(PushResponse { name })
    }

    fn update(
        &self,
        location: &str,
        params: &Params,
        data: Value,
    ) -> Result<Value, TransportError> {
        tracing::debug!(location, "memory update");
        self.authorize(params)?;
        let Value::Object(entries) = data else {
            return Err(TransportError::InvalidData(
                "update requires a mapping".to_string(),
            ));
        };
        let base = Location::parse(location);
        let mut state = self.lock();
        let mut staged = state.tree.clone();
        let mut echoed = Map::new();
        for (key, value) in entries {
            let target = base.join(&key);
            if target.segments().len() <= base.segments().len() {
                return Err(TransportError::InvalidData(format!(
                    "update key {key:?} does not name a child"
                )));
            }
            let accepted = write(&mut staged, target.segments(), value)?;
            echoed.insert(key, accepted);
        }
        state.tree = staged;
        Ok(Value::Object(echoed))
    }

    fn remove(&self, location: &str, params: &Params) -> Result<(), TransportError> {
        tracing::debug!(location, "memory remove");
        self.authorize(params)?;
        let segments = Location::parse(location).segments().to_vec();
        let mut state = self.lock();
        place(&mut state.tree, &segments, None);
        Ok(())
    }
}

fn read(tree: &Value, segments: &[String], export: bool) -> Option<Value> {
    if let Some((last, parent)) = segments.split_last() {
        if last == PRIORITY_KEY {
            return node_at(tree, parent).and_then(codec::priority_of).cloned();
        }
    }
    let node = node_at(tree, segments)?.clone();
    Some(if export {
        node
    } else {
        codec::unwrap_export(node)
    })
}

/// Write `data` at `segments`, returning the value as accepted.
fn write(tree: &mut Value, segments: &[String], data: Value) -> Result<Value, TransportError> {
    if let Some((last, parent)) = segments.split_last() {
        if last == PRIORITY_KEY {
            set_priority(tree, parent, &data)?;
            return Ok(data);
        }
    }
    let resolved = resolve_server_values(data, now_millis())?;
    let accepted = codec::unwrap_export(resolved.clone());
    place(tree, segments, prune(resolved));
    Ok(accepted)
}

fn node_at<'a>(tree: &'a Value, segments: &[String]) -> Option<&'a Value> {
    let mut current = tree;
    for segment in segments {
        current = match current {
            Value::Object(map) if !map.contains_key(VALUE_KEY) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    (!current.is_null()).then_some(current)
}

fn node_at_mut<'a>(tree: &'a mut Value, segments: &[String]) -> Option<&'a mut Value> {
    let mut current = tree;
    for segment in segments {
        current = match current {
            Value::Object(map) if !map.contains_key(VALUE_KEY) => map.get_mut(segment)?,
            Value::Array(items) => items.get_mut(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    (!current.is_null()).then_some(current)
}

fn is_container(node: &Value) -> bool {
    matches!(node, Value::Object(map) if !map.contains_key(VALUE_KEY))
}

/// Turn `node` into a mapping that can hold children, keeping its priority.
fn make_container(node: &mut Value) {
    if is_container(node) {
        return;
    }
    let mut map = Map::new();
    match node.take() {
        Value::Array(items) => {
            for (idx, item) in items.into_iter().enumerate() {
                map.insert(idx.to_string(), item);
            }
        }
        Value::Object(wrapped) => {
            if let Some(priority) = wrapped.get(PRIORITY_KEY) {
                map.insert(PRIORITY_KEY.to_string(), priority.clone());
            }
        }
        _ => {}
    }
    *node = Value::Object(map);
}

/// Replace the node at `segments` with `data`, deleting it for `None`, and
/// drop any ancestor left empty.
fn place(node: &mut Value, segments: &[String], data: Option<Value>) {
    let Some((head, rest)) = segments.split_first() else {
        *node = data.unwrap_or(Value::Null);
        return;
    };
    if data.is_none() && node_at(node, segments).is_none() {
        return;
    }
    make_container(node);
    let now_empty = {
        let Value::Object(map) = node else {
            return;
        };
        let child = map.entry(head.clone()).or_insert(Value::Null);
        place(child, rest, data);
        if child.is_null() {
            map.shift_remove(head);
        }
        map.keys().all(|key| key == PRIORITY_KEY)
    };
    if now_empty {
        *node = Value::Null;
    }
}

fn set_priority(
    tree: &mut Value,
    segments: &[String],
    priority: &Value,
) -> Result<(), TransportError> {
    if !matches!(priority, Value::Null | Value::Number(_) | Value::String(_)) {
        return Err(TransportError::InvalidData(format!(
            "priority must be a number, string or null, got {priority}"
        )));
    }
    let Some(node) = node_at_mut(tree, segments) else {
        return Ok(());
    };
    if is_container(node) {
        if let Value::Object(map) = node {
            if priority.is_null() {
                map.shift_remove(PRIORITY_KEY);
            } else {
                map.insert(PRIORITY_KEY.to_string(), priority.clone());
            }
        }
        return Ok(());
    }
    let inner = match node.take() {
        Value::Object(mut wrapped) => wrapped.remove(VALUE_KEY).unwrap_or(Value::Null),
        other => other,
    };
    *node = if priority.is_null() {
        inner
    } else {
        let mut map = codec::wrap(inner);
        map.insert(PRIORITY_KEY.to_string(), priority.clone());
        Value::Object(map)
    };
    Ok(())
}

/// Drop nulls and empty mappings. `None` when nothing is left.
fn prune(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Object(mut map) => {
            if map.contains_key(VALUE_KEY) {
                let inner = prune(map.remove(VALUE_KEY).unwrap_or(Value::Null))?;
                map.insert(VALUE_KEY.to_string(), inner);
                return Some(Value::Object(map));
            }
            let pruned: Map<String, Value> = map
                .into_iter()
                .filter_map(|(key, child)| {
                    if key == PRIORITY_KEY {
                        return (!child.is_null()).then_some((key, child));
                    }
                    prune(child).map(|child| (key, child))
                })
                .collect();
            if pruned.keys().all(|key| key == PRIORITY_KEY) {
                None
            } else {
                Some(Value::Object(pruned))
            }
        }
        other => Some(other),
    }
}

fn resolve_server_values(value: Value, now: u64) -> Result<Value, TransportError> {
    if let Some(server_value) = ServerValue::from_value(&value) {
        return match server_value {
            ServerValue::Timestamp => Ok(Value::from(now)),
            ServerValue::Custom(marker) => Err(TransportError::InvalidData(format!(
                "unsupported server value {marker:?}"
            ))),
        };
    }
    match value {
        Value::Object(map) => map
            .into_iter()
            .map(|(key, child)| Ok((key, resolve_server_values(child, now)?)))
            .collect::<Result<Map<_, _>, _>>()
            .map(Value::Object),
        Value::Array(items) => items
            .into_iter()
            .map(|item| resolve_server_values(item, now))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        other => Ok(other),
    }
}
