//! Wire encoding of values and priorities.
//!
//! The store attaches an ordering priority to a node through reserved keys.
//! A mapping carries it directly under `.priority`; any other value is first
//! wrapped as `{".value": value}` so the priority has somewhere to live:
//!
//! ```text
//! "foo"          + 1  ->  {".value": "foo", ".priority": 1.0}
//! [1, 2]         + 1  ->  {".value": [1, 2], ".priority": 1.0}
//! {"k": "v"}     + 1  ->  {"k": "v", ".priority": 1.0}
//! ```
//!
//! The same layout is what the store returns for `format=export` reads, so
//! [`unwrap_export`] and [`priority_of`] interpret it on the way back.

use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Key holding a wrapped non-mapping value.
pub const VALUE_KEY: &str = ".value";

/// Key holding a node's priority.
pub const PRIORITY_KEY: &str = ".priority";

/// Key marking a server value placeholder.
pub const SERVER_VALUE_KEY: &str = ".sv";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CodecError {
    #[error("priority is not numeric: {0}")]
    NonNumericPriority(String),
    #[error("priority {0} cannot be encoded as JSON")]
    NonFinitePriority(f64),
}

/// Returns `true` if `value` is a mapping.
///
/// Scalars and sequences are not structured and need wrapping before a
/// priority can be attached.
///
/// # Example
///
/// ```
/// use firebase_ref::codec::is_structured;
/// use serde_json::json;
///
/// assert!(is_structured(&json!({"foo": "bar"})));
/// assert!(!is_structured(&json!([1, 2, 3])));
/// assert!(!is_structured(&json!("foo")));
/// ```
pub fn is_structured(value: &Value) -> bool {
    matches!(value, Value::Object(_))
}

/// Return the mapping form of `value`.
///
/// Mappings are returned unchanged; anything else becomes
/// `{".value": value}`.
///
/// # Example
///
/// ```
/// use firebase_ref::codec::wrap;
/// use serde_json::json;
///
/// assert_eq!(wrap(json!(1))[".value"], json!(1));
/// assert!(!wrap(json!({"foo": "bar"})).contains_key(".value"));
/// ```
pub fn wrap(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert(VALUE_KEY.to_string(), other);
            map
        }
    }
}

/// Prepare `value` for sending, attaching `priority` when one is given.
///
/// Without a priority the value passes through untouched. With one, the
/// value is consumed: it is wrapped if needed and receives a `.priority`
/// float alongside its other keys.
///
/// # Errors
///
/// Returns [`CodecError::NonFinitePriority`] for NaN or infinite priorities.
///
/// # Example
///
/// ```
/// use firebase_ref::codec::prepare;
/// use serde_json::json;
///
/// assert_eq!(prepare(json!("foo"), None).unwrap(), json!("foo"));
/// assert_eq!(
///     prepare(json!("foo"), Some(1.0)).unwrap(),
///     json!({".value": "foo", ".priority": 1.0})
/// );
/// assert_eq!(
///     prepare(json!({"foo": "bar"}), Some(2.0)).unwrap(),
///     json!({"foo": "bar", ".priority": 2.0})
/// );
/// ```
pub fn prepare(value: Value, priority: Option<f64>) -> Result<Value, CodecError> {
    let Some(priority) = priority else {
        return Ok(value);
    };
    let priority = priority_value(priority)?;
    let mut map = wrap(value);
    map.insert(PRIORITY_KEY.to_string(), priority);
    Ok(Value::Object(map))
}

/// Encode a priority as a JSON float.
pub fn priority_value(priority: f64) -> Result<Value, CodecError> {
    Number::from_f64(priority)
        .map(Value::Number)
        .ok_or(CodecError::NonFinitePriority(priority))
}

/// Convert an untyped priority into a float.
///
/// `null` means "no priority". Numbers convert directly and numeric strings
/// are parsed; anything else is rejected.
///
/// # Example
///
/// ```
/// use firebase_ref::codec::priority_from_value;
/// use serde_json::json;
///
/// assert_eq!(priority_from_value(&json!(5)).unwrap(), Some(5.0));
/// assert_eq!(priority_from_value(&json!("2.5")).unwrap(), Some(2.5));
/// assert_eq!(priority_from_value(&json!(null)).unwrap(), None);
/// assert!(priority_from_value(&json!({"a": 1})).is_err());
/// ```
pub fn priority_from_value(value: &Value) -> Result<Option<f64>, CodecError> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| CodecError::NonNumericPriority(n.to_string())),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| CodecError::NonNumericPriority(s.clone())),
        other => Err(CodecError::NonNumericPriority(other.to_string())),
    }
}

/// Strip priority metadata from a value in export layout.
///
/// Wrapped values are unwrapped and `.priority` keys are dropped at every
/// level.
///
/// # Example
///
/// ```
/// use firebase_ref::codec::unwrap_export;
/// use serde_json::json;
///
/// let exported = json!({
///     "a": {".value": "x", ".priority": 1.0},
///     "b": {"c": true, ".priority": 2.0},
/// });
/// assert_eq!(unwrap_export(exported), json!({"a": "x", "b": {"c": true}}));
/// ```
pub fn unwrap_export(value: Value) -> Value {
    match value {
        Value::Object(mut map) => {
            if let Some(inner) = map.remove(VALUE_KEY) {
                return unwrap_export(inner);
            }
            map.into_iter()
                .filter(|(key, _)| key != PRIORITY_KEY)
                .map(|(key, child)| (key, unwrap_export(child)))
                .collect::<Map<_, _>>()
                .into()
        }
        Value::Array(items) => Value::Array(items.into_iter().map(unwrap_export).collect()),
        other => other,
    }
}

/// The priority attached to a value in export layout, if any.
pub fn priority_of(value: &Value) -> Option<&Value> {
    value.as_object()?.get(PRIORITY_KEY)
}

/// A placeholder the store replaces with a value it computes at write time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ServerValue {
    /// Milliseconds since the Unix epoch, as seen by the store.
    Timestamp,
    Custom(String),
}

impl ServerValue {
    pub const TIMESTAMP: &'static str = "timestamp";

    pub fn marker(&self) -> &str {
        match self {
            ServerValue::Timestamp => Self::TIMESTAMP,
            ServerValue::Custom(marker) => marker,
        }
    }

    /// The `{".sv": marker}` placeholder.
    pub fn to_value(&self) -> Value {
        server_value(self.marker())
    }

    /// Recognize a placeholder written as `{".sv": marker}`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        if map.len() != 1 {
            return None;
        }
        let marker = map.get(SERVER_VALUE_KEY)?.as_str()?;
        Some(Self::from(marker))
    }
}

impl From<&str> for ServerValue {
    fn from(marker: &str) -> Self {
        match marker {
            Self::TIMESTAMP => ServerValue::Timestamp,
            other => ServerValue::Custom(other.to_string()),
        }
    }
}

/// Build a `{".sv": marker}` placeholder.
pub fn server_value(marker: &str) -> Value {
    let mut map = Map::new();
    map.insert(SERVER_VALUE_KEY.to_string(), Value::String(marker.to_string()));
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wrap_scalar() {
        let wrapped = wrap(json!(1));
        assert_eq!(wrapped[VALUE_KEY], json!(1));
        assert_eq!(wrapped.len(), 1);
    }

    #[test]
    fn test_wrap_sequence() {
        let wrapped = wrap(json!([1, 2, 3]));
        assert_eq!(wrapped[VALUE_KEY], json!([1, 2, 3]));
    }

    #[test]
    fn test_wrap_mapping_is_identity() {
        let data = json!({"foo": "bar"});
        let wrapped = wrap(data.clone());
        assert!(!wrapped.contains_key(VALUE_KEY));
        assert_eq!(Value::Object(wrapped), data);
    }

    #[test]
    fn test_prepare_without_priority_is_identity() {
        for value in [
            json!("foo"),
            json!(1.5),
            json!(null),
            json!([1, 2]),
            json!({"foo": "bar"}),
        ] {
            assert_eq!(prepare(value.clone(), None).unwrap(), value);
        }
    }

    #[test]
    fn test_prepare_scalar_with_priority() {
        let prepared = prepare(json!("foo"), Some(1.0)).unwrap();
        assert_eq!(prepared[VALUE_KEY], json!("foo"));
        assert_eq!(prepared[PRIORITY_KEY], json!(1.0));
    }

    #[test]
    fn test_prepare_mapping_with_priority() {
        let prepared = prepare(json!({"foo": "bar"}), Some(2.0)).unwrap();
        assert!(prepared.get(VALUE_KEY).is_none());
        assert_eq!(prepared["foo"], json!("bar"));
        assert_eq!(prepared[PRIORITY_KEY], json!(2.0));
    }

    #[test]
    fn test_prepare_replaces_existing_priority() {
        let prepared = prepare(json!({"a": 1, ".priority": 1.0}), Some(3.0)).unwrap();
        assert_eq!(prepared, json!({"a": 1, ".priority": 3.0}));
    }

    #[test]
    fn test_prepare_rejects_non_finite_priority() {
        assert!(matches!(
            prepare(json!("foo"), Some(f64::NAN)),
            Err(CodecError::NonFinitePriority(_))
        ));
        assert!(prepare(json!("foo"), Some(f64::INFINITY)).is_err());
    }

    #[test]
    fn test_priority_encoded_as_float() {
        let encoded = priority_value(5.0).unwrap();
        assert!(encoded.is_f64());
        assert_eq!(encoded.to_string(), "5.0");
    }

    #[test]
    fn test_priority_from_value() {
        assert_eq!(priority_from_value(&json!(3)).unwrap(), Some(3.0));
        assert_eq!(priority_from_value(&json!(-0.5)).unwrap(), Some(-0.5));
        assert_eq!(priority_from_value(&json!(" 7 ")).unwrap(), Some(7.0));
        assert_eq!(priority_from_value(&Value::Null).unwrap(), None);
        assert!(matches!(
            priority_from_value(&json!("high")),
            Err(CodecError::NonNumericPriority(s)) if s == "high"
        ));
        assert!(priority_from_value(&json!(true)).is_err());
        assert!(priority_from_value(&json!([1])).is_err());
    }

    #[test]
    fn test_unwrap_export_nested() {
        let exported = json!({
            ".priority": 1.0,
            "list": {".value": [1, 2], ".priority": 2.0},
            "deep": {"x": {".value": null}},
        });
        assert_eq!(
            unwrap_export(exported),
            json!({"list": [1, 2], "deep": {"x": null}})
        );
    }

    #[test]
    fn test_priority_of() {
        assert_eq!(
            priority_of(&json!({".value": "a", ".priority": 4.0})),
            Some(&json!(4.0))
        );
        assert_eq!(priority_of(&json!({"a": 1})), None);
        assert_eq!(priority_of(&json!("a")), None);
    }

    #[test]
    fn test_server_value() {
        assert_eq!(ServerValue::Timestamp.to_value(), json!({".sv": "timestamp"}));
        assert_eq!(
            ServerValue::from_value(&json!({".sv": "timestamp"})),
            Some(ServerValue::Timestamp)
        );
        assert_eq!(
            ServerValue::from_value(&json!({".sv": "increment"})),
            Some(ServerValue::Custom("increment".to_string()))
        );
        assert_eq!(ServerValue::from_value(&json!({".sv": "t", "x": 1})), None);
        assert_eq!(ServerValue::from_value(&json!("timestamp")), None);
    }
}
