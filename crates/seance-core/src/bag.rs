//! Typed key/value bags exchanged between suppliers and extractors.
//!
//! A supplier turns a raw event (plus any platform calls it needs) into a
//! [`DataBag`]; the platform's extractors then read the bag back into model
//! entities. The closed [`Value`] kind set replaces ad-hoc per-platform
//! structures with one shape both sides agree on, and the `require_*`
//! accessors turn a disagreement into a typed [`FetchError`] instead of a
//! panic deep inside an extractor.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::{FetchError, FetchResult};
use crate::model::SceneType;

// ============================================================================
// Value
// ============================================================================

/// A single value a supplier may place in a bag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// UTF-8 text.
    Str(String),
    /// Signed integer (timestamps, durations in seconds, levels).
    Int(i64),
    /// Boolean flag.
    Bool(bool),
    /// A scene classification.
    Kind(SceneType),
    /// A nested bag, e.g. the `operator` sub-record of a notice event.
    Map(DataBag),
}

impl Value {
    /// Returns the text if this is a [`Value::Str`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer if this is a [`Value::Int`].
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the flag if this is a [`Value::Bool`].
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the scene classification if this is a [`Value::Kind`].
    pub fn as_kind(&self) -> Option<SceneType> {
        match self {
            Value::Kind(k) => Some(*k),
            _ => None,
        }
    }

    /// Returns the nested bag if this is a [`Value::Map`].
    pub fn as_map(&self) -> Option<&DataBag> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Human-readable name of this value's kind, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Int(_) => "integer",
            Value::Bool(_) => "boolean",
            Value::Kind(_) => "scene type",
            Value::Map(_) => "map",
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<SceneType> for Value {
    fn from(value: SceneType) -> Self {
        Value::Kind(value)
    }
}

impl From<DataBag> for Value {
    fn from(value: DataBag) -> Self {
        Value::Map(value)
    }
}

// ============================================================================
// DataBag
// ============================================================================

/// A flat string-keyed bag of [`Value`]s.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DataBag {
    entries: HashMap<String, Value>,
}

impl DataBag {
    /// Creates an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the raw value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Returns the text under `key`, if present and a string.
    pub fn str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Returns the integer under `key`, if present and an integer.
    pub fn int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_int)
    }

    /// Returns the flag under `key`, if present and a boolean.
    pub fn bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    /// Returns the scene classification under `key`, if present and one.
    pub fn kind(&self, key: &str) -> Option<SceneType> {
        self.get(key).and_then(Value::as_kind)
    }

    /// Returns the nested bag under `key`, if present and a map.
    pub fn map(&self, key: &str) -> Option<&DataBag> {
        self.get(key).and_then(Value::as_map)
    }

    /// Returns the text under `key`, or a typed error naming the problem.
    pub fn require_str(&self, key: &str) -> FetchResult<&str> {
        match self.get(key) {
            None => Err(FetchError::MissingKey(key.to_string())),
            Some(value) => value.as_str().ok_or_else(|| FetchError::WrongKind {
                key: key.to_string(),
                expected: "string",
            }),
        }
    }

    /// Returns the scene classification under `key`, or a typed error.
    pub fn require_kind(&self, key: &str) -> FetchResult<SceneType> {
        match self.get(key) {
            None => Err(FetchError::MissingKey(key.to_string())),
            Some(value) => value.as_kind().ok_or_else(|| FetchError::WrongKind {
                key: key.to_string(),
                expected: "scene type",
            }),
        }
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Stores `value` under `key` (builder form).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Stores `value` under `key` when present, skips the entry when `None`.
    pub fn with_opt(mut self, key: impl Into<String>, value: Option<impl Into<Value>>) -> Self {
        if let Some(value) = value {
            self.set(key, value);
        }
        self
    }

    /// Shallow-merges `overlay` into this bag; overlay entries win.
    pub fn merge(&mut self, overlay: DataBag) {
        self.entries.extend(overlay.entries);
    }

    /// Whether the bag holds a value under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries in the bag.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the bag is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_accessors_match_stored_kinds() {
        let bag = DataBag::new()
            .with("user_id", "42")
            .with("level", 100i64)
            .with("muted", true)
            .with("scene_type", SceneType::Group);

        assert_eq!(bag.str("user_id"), Some("42"));
        assert_eq!(bag.int("level"), Some(100));
        assert_eq!(bag.bool("muted"), Some(true));
        assert_eq!(bag.kind("scene_type"), Some(SceneType::Group));
        assert_eq!(bag.str("level"), None);
    }

    #[test]
    fn require_str_reports_missing_and_wrong_kind() {
        let bag = DataBag::new().with("level", 100i64);

        assert!(matches!(
            bag.require_str("user_id"),
            Err(FetchError::MissingKey(key)) if key == "user_id"
        ));
        assert!(matches!(
            bag.require_str("level"),
            Err(FetchError::WrongKind { key, expected: "string" }) if key == "level"
        ));
    }

    #[test]
    fn merge_overlay_wins() {
        let mut base = DataBag::new().with("self_id", "bot-1").with("name", "old");
        base.merge(DataBag::new().with("name", "new").with("extra", 1i64));

        assert_eq!(base.str("self_id"), Some("bot-1"));
        assert_eq!(base.str("name"), Some("new"));
        assert_eq!(base.int("extra"), Some(1));
    }

    #[test]
    fn nested_operator_map() {
        let bag = DataBag::new().with(
            "operator",
            DataBag::new().with("user_id", "9").with("role", "admin"),
        );

        let operator = bag.map("operator").unwrap();
        assert_eq!(operator.str("user_id"), Some("9"));
        assert_eq!(operator.str("role"), Some("admin"));
    }

    #[test]
    fn with_opt_skips_absent_values() {
        let bag = DataBag::new()
            .with_opt("name", Some("Ada"))
            .with_opt("avatar", None::<&str>);

        assert!(bag.contains("name"));
        assert!(!bag.contains("avatar"));
        assert_eq!(bag.len(), 1);
    }
}
