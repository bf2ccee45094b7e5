//! Field codec registry: validation and flat (de)serialization of record fields.

use crate::error::MemoryError;
use crate::field::RecordField;
use crate::value::{Attributes, FieldValue};
use amem_rs_vector::Metadata;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use log::{debug, warn};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Shape of a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Text,
    Integer,
    List,
    Timestamp,
    Mapping,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Text => "text",
            FieldKind::Integer => "integer",
            FieldKind::List => "list",
            FieldKind::Timestamp => "timestamp",
            FieldKind::Mapping => "mapping",
        };
        f.write_str(name)
    }
}

type Validator = Arc<dyn Fn(&FieldValue) -> bool + Send + Sync>;

/// Codec rule for one registered field.
#[derive(Clone)]
pub struct FieldRule {
    kind: FieldKind,
    validator: Option<Validator>,
}

impl FieldRule {
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            validator: None,
        }
    }

    /// Replace the kind check with a custom predicate.
    pub fn with_validator(
        mut self,
        validator: impl Fn(&FieldValue) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    fn accepts(&self, value: &FieldValue) -> bool {
        match &self.validator {
            Some(validator) => validator(value),
            None => value.kind() == self.kind,
        }
    }
}

impl fmt::Debug for FieldRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldRule")
            .field("kind", &self.kind)
            .field("custom_validator", &self.validator.is_some())
            .finish()
    }
}

/// A flat value that cannot be decoded.
#[derive(Debug)]
struct MalformedStoredData(String);

/// Per-field rules plus legacy name aliases.
#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    rules: HashMap<String, FieldRule>,
    aliases: HashMap<String, String>,
}

impl FieldRegistry {
    /// Empty registry; every field is treated as unregistered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry covering the memory record schema and its legacy names.
    pub fn for_memory_records() -> Self {
        let mut registry = Self::new();
        for field in RecordField::ALL {
            let rule = match field {
                RecordField::Id => FieldRule::new(field.kind())
                    .with_validator(|value| value.as_text().is_some_and(|id| !id.is_empty())),
                RecordField::RetrievalCount => FieldRule::new(field.kind())
                    .with_validator(|value| value.as_integer().is_some_and(|count| count >= 0)),
                _ => FieldRule::new(field.kind()),
            };
            registry.register(field.as_str(), rule);
        }
        registry.register_alias("timestamp", RecordField::CreatedAt.as_str());
        registry.register_alias("last_accessed", RecordField::LastAccessedAt.as_str());
        registry.register_alias("memory_update_history", RecordField::EditHistory.as_str());
        registry.register_alias("memory_update_context", RecordField::EditReasons.as_str());
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, rule: FieldRule) {
        self.rules.insert(name.into(), rule);
    }

    /// Accept `alias` as another name for `canonical` when decoding.
    pub fn register_alias(&mut self, alias: impl Into<String>, canonical: impl Into<String>) {
        self.aliases.insert(alias.into(), canonical.into());
    }

    /// Resolve a legacy alias to its canonical name.
    pub fn canonical_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.aliases.get(name).map(String::as_str).unwrap_or(name)
    }

    pub fn rule(&self, name: &str) -> Option<&FieldRule> {
        self.rules.get(self.canonical_name(name))
    }

    /// Whether `value` is acceptable for `name`. Unregistered fields accept anything.
    pub fn validate(&self, name: &str, value: &FieldValue) -> bool {
        self.rule(name).is_none_or(|rule| rule.accepts(value))
    }

    /// Strict form of [`validate`](Self::validate).
    pub fn check(&self, name: &str, value: &FieldValue) -> Result<(), MemoryError> {
        if self.validate(name, value) {
            return Ok(());
        }
        let expected = self
            .rule(name)
            .map(|rule| rule.kind().to_string())
            .unwrap_or_else(|| "any".to_string());
        Err(MemoryError::validation(
            name,
            format!("expected {expected}, got {} {value:?}", value.kind()),
        ))
    }

    /// Flatten a value for storage.
    pub fn serialize(&self, name: &str, value: &FieldValue) -> Value {
        if let Some(rule) = self.rule(name) {
            if rule.kind() != value.kind() {
                debug!(
                    "stringifying mismatched field value (field={}, expected={}, got={})",
                    name,
                    rule.kind(),
                    value.kind()
                );
            }
        }
        Value::String(value.to_string())
    }

    /// Decode a flat value. Only integer fields can fail; every other kind
    /// degrades to a default on malformed input.
    pub fn deserialize(&self, name: &str, raw: &Value) -> Result<FieldValue, MemoryError> {
        let Some(rule) = self.rule(name) else {
            return Ok(FieldValue::Text(decode_text(raw)));
        };
        let value = match rule.kind() {
            FieldKind::Text => FieldValue::Text(decode_text(raw)),
            FieldKind::Integer => FieldValue::Integer(decode_integer(name, raw)?),
            FieldKind::List => FieldValue::List(decode_list(raw).unwrap_or_else(|err| {
                warn!("malformed list, using empty (field={}, error={})", name, err.0);
                Vec::new()
            })),
            FieldKind::Timestamp => FieldValue::Timestamp(decode_timestamp(raw).unwrap_or_else(
                |err| {
                    warn!(
                        "malformed timestamp, using current time (field={}, error={})",
                        name, err.0
                    );
                    Utc::now()
                },
            )),
            FieldKind::Mapping => FieldValue::Mapping(decode_mapping(raw).unwrap_or_else(|err| {
                warn!("malformed mapping, using empty (field={}, error={})", name, err.0);
                BTreeMap::new()
            })),
        };
        Ok(value)
    }

    /// Decode a caller-supplied flat value. Malformed input is a
    /// [`MemoryError::Type`] instead of a default.
    pub fn deserialize_strict(&self, name: &str, raw: &Value) -> Result<FieldValue, MemoryError> {
        let Some(rule) = self.rule(name) else {
            return Ok(FieldValue::Text(decode_text(raw)));
        };
        let malformed = |err: MalformedStoredData| MemoryError::Type {
            field: name.to_string(),
            message: err.0,
        };
        let value = match rule.kind() {
            FieldKind::Text => FieldValue::Text(decode_text(raw)),
            FieldKind::Integer => FieldValue::Integer(decode_integer(name, raw)?),
            FieldKind::List => FieldValue::List(decode_list(raw).map_err(malformed)?),
            FieldKind::Timestamp => FieldValue::Timestamp(decode_timestamp(raw).map_err(malformed)?),
            FieldKind::Mapping => FieldValue::Mapping(decode_mapping(raw).map_err(malformed)?),
        };
        self.check(name, &value)?;
        Ok(value)
    }

    pub fn serialize_all(&self, attributes: &Attributes) -> Metadata {
        attributes
            .iter()
            .map(|(name, value)| (name.clone(), self.serialize(name, value)))
            .collect()
    }

    /// Decode a whole metadata map under canonical names.
    ///
    /// Fields that fail to decode are dropped. A canonical key wins over a
    /// legacy alias for the same field.
    pub fn deserialize_all(&self, metadata: &Metadata) -> Attributes {
        let mut attributes = Attributes::new();
        for (name, raw) in metadata {
            let canonical = self.canonical_name(name);
            if canonical != name.as_str() && metadata.contains_key(canonical) {
                continue;
            }
            match self.deserialize(canonical, raw) {
                Ok(value) => {
                    attributes.insert(canonical.to_string(), value);
                }
                Err(err) => warn!("dropping undecodable field (field={}, error={})", name, err),
            }
        }
        attributes
    }
}

fn decode_text(raw: &Value) -> String {
    match raw {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn decode_integer(name: &str, raw: &Value) -> Result<i64, MemoryError> {
    let parsed = match raw {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| MemoryError::Type {
        field: name.to_string(),
        message: format!("cannot convert {raw} to an integer"),
    })
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Structured values pass through; strings are decoded as JSON.
fn structured(raw: &Value) -> Result<Value, MalformedStoredData> {
    match raw {
        Value::String(text) => serde_json::from_str(text)
            .map_err(|err| MalformedStoredData(format!("invalid json {text:?}: {err}"))),
        other => Ok(other.clone()),
    }
}

fn decode_list(raw: &Value) -> Result<Vec<String>, MalformedStoredData> {
    match structured(raw)? {
        Value::Array(items) => Ok(items.iter().map(value_to_string).collect()),
        other => Err(MalformedStoredData(format!("expected array, got {other}"))),
    }
}

fn decode_mapping(raw: &Value) -> Result<BTreeMap<String, String>, MalformedStoredData> {
    match structured(raw)? {
        Value::Object(object) => Ok(object
            .iter()
            .map(|(key, value)| (key.clone(), value_to_string(value)))
            .collect()),
        other => Err(MalformedStoredData(format!("expected object, got {other}"))),
    }
}

fn decode_timestamp(raw: &Value) -> Result<DateTime<Utc>, MalformedStoredData> {
    let Value::String(text) = raw else {
        return Err(MalformedStoredData(format!("expected string, got {raw}")));
    };
    let text = text.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(text) {
        return Ok(at.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(naive.and_utc());
        }
    }
    parse_compact(text)
        .map(|naive| naive.and_utc())
        .ok_or_else(|| MalformedStoredData(format!("unrecognized timestamp {text:?}")))
}

/// Legacy `YYYYMMDDHHMM` form.
fn parse_compact(text: &str) -> Option<NaiveDateTime> {
    if text.len() != 12 || !text.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    let part = |range: std::ops::Range<usize>| text[range].parse::<u32>().ok();
    let year = text[0..4].parse::<i32>().ok()?;
    NaiveDate::from_ymd_opt(year, part(4..6)?, part(6..8)?)?
        .and_hms_opt(part(8..10)?, part(10..12)?, 0)
}
