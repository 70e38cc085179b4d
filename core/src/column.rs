//! Column values and their wire encoding.
//!
//! # Design
//! A mutation carries its column values as a JSON object serialized *inside*
//! a GraphQL string literal: `column_values: "{\"status\":{\"label\":\"Done\"}}"`.
//! Each entry of a `ColumnValueMap` is encoded independently into one
//! fragment (`"key":value` as compact JSON, then escaped for the string
//! literal) and the fragments are joined with `", "` in insertion order.
//!
//! Encoding never fails. An entry that cannot be encoded is reported as
//! `FieldOutcome::Skipped` and left out of the joined output, so one
//! malformed field never aborts the whole mutation.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};

/// Column types the encoder knows how to serialize.
///
/// Type names that are not recognised parse as `Text`, which is also the
/// encoder's fallback branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColumnType {
    #[default]
    Text,
    Status,
    Checkbox,
    People,
    Email,
    Hour,
    Timeline,
    BoardRelation,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Text => "text",
            ColumnType::Status => "status",
            ColumnType::Checkbox => "checkbox",
            ColumnType::People => "people",
            ColumnType::Email => "email",
            ColumnType::Hour => "hour",
            ColumnType::Timeline => "timeline",
            ColumnType::BoardRelation => "board_relation",
        }
    }

    pub fn parse(name: &str) -> Self {
        match name {
            "status" => ColumnType::Status,
            "checkbox" => ColumnType::Checkbox,
            "people" => ColumnType::People,
            "email" => ColumnType::Email,
            "hour" => ColumnType::Hour,
            "timeline" => ColumnType::Timeline,
            "board_relation" => ColumnType::BoardRelation,
            _ => ColumnType::Text,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ColumnType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ColumnType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(ColumnType::parse(&name))
    }
}

/// A typed value destined for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnValue {
    #[serde(rename = "type", default)]
    pub kind: ColumnType,
    #[serde(default)]
    pub value: Value,
}

impl ColumnValue {
    pub fn new(kind: ColumnType, value: impl Into<Value>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::new(ColumnType::Text, value.into())
    }

    pub fn status(label: impl Into<String>) -> Self {
        Self::new(ColumnType::Status, label.into())
    }

    pub fn checkbox(checked: bool) -> Self {
        Self::new(ColumnType::Checkbox, checked)
    }

    pub fn people(person_id: impl Into<String>) -> Self {
        Self::new(ColumnType::People, person_id.into())
    }

    pub fn email(address: impl Into<String>) -> Self {
        Self::new(ColumnType::Email, address.into())
    }

    /// `value` is expected as `"HH:MM"`.
    pub fn hour(value: impl Into<String>) -> Self {
        Self::new(ColumnType::Hour, value.into())
    }

    pub fn timeline(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::new(
            ColumnType::Timeline,
            json!({ "from": from.into(), "to": to.into() }),
        )
    }

    pub fn board_relation(item_id: u64) -> Self {
        Self::new(ColumnType::BoardRelation, item_id)
    }

    /// A value of the given type with no content; never encoded.
    pub fn null(kind: ColumnType) -> Self {
        Self::new(kind, Value::Null)
    }
}

/// Column id → value, iterated in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnValueMap {
    entries: Vec<(String, ColumnValue)>,
}

impl ColumnValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace. A replaced key keeps its original position.
    pub fn insert(&mut self, column_id: impl Into<String>, value: ColumnValue) -> Option<ColumnValue> {
        let column_id = column_id.into();
        match self.entries.iter_mut().find(|(id, _)| *id == column_id) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((column_id, value));
                None
            }
        }
    }

    pub fn get(&self, column_id: &str) -> Option<&ColumnValue> {
        self.entries
            .iter()
            .find(|(id, _)| id == column_id)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnValue)> {
        self.entries.iter().map(|(id, value)| (id.as_str(), value))
    }

    /// Wrap edited `{column id → text}` pairs as text column values.
    pub fn from_text_edits<I, K, V>(edits: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        edits
            .into_iter()
            .map(|(id, text)| (id, ColumnValue::text(text)))
            .collect()
    }
}

impl<K: Into<String>> FromIterator<(K, ColumnValue)> for ColumnValueMap {
    fn from_iter<T: IntoIterator<Item = (K, ColumnValue)>>(iter: T) -> Self {
        let mut map = ColumnValueMap::new();
        for (id, value) in iter {
            map.insert(id, value);
        }
        map
    }
}

impl Serialize for ColumnValueMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|(id, value)| (id, value)))
    }
}

impl<'de> Deserialize<'de> for ColumnValueMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MapVisitor;

        impl<'de> Visitor<'de> for MapVisitor {
            type Value = ColumnValueMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of column id to {type, value}")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = ColumnValueMap::new();
                while let Some((id, value)) = access.next_entry::<String, ColumnValue>()? {
                    map.insert(id, value);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(MapVisitor)
    }
}

/// Why an entry produced no fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The value was `null`; filtered before type handling.
    Null,
    /// The type treats a falsy value as "nothing to send".
    Empty,
    /// The value did not have the shape the column type needs.
    Malformed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Null => write!(f, "null value"),
            SkipReason::Empty => write!(f, "empty value"),
            SkipReason::Malformed(detail) => write!(f, "malformed value: {detail}"),
        }
    }
}

/// Result of encoding a single column entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldOutcome {
    Emitted(String),
    Skipped(SkipReason),
}

impl FieldOutcome {
    pub fn fragment(&self) -> Option<&str> {
        match self {
            FieldOutcome::Emitted(fragment) => Some(fragment),
            FieldOutcome::Skipped(_) => None,
        }
    }
}

/// Encode every entry, keeping skipped ones so callers can see why.
pub fn encode_fields(values: &ColumnValueMap) -> Vec<(String, FieldOutcome)> {
    values
        .iter()
        .map(|(id, value)| {
            let outcome = encode_field(id, value);
            if let FieldOutcome::Skipped(reason) = &outcome {
                tracing::debug!(column = id, kind = %value.kind, %reason, "column value skipped");
            }
            (id.to_string(), outcome)
        })
        .collect()
}

/// Encode a map into the fragment list placed between the braces of
/// `column_values: "{...}"`.
pub fn encode_column_values(values: &ColumnValueMap) -> String {
    encode_fields(values)
        .iter()
        .filter_map(|(_, outcome)| outcome.fragment())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Encode one entry into its escaped `"key":value` fragment.
pub fn encode_field(column_id: &str, column: &ColumnValue) -> FieldOutcome {
    if column.value.is_null() {
        return FieldOutcome::Skipped(SkipReason::Null);
    }
    match wire_value(column) {
        Ok(value) => FieldOutcome::Emitted(escape_for_string_literal(&format!(
            "{}:{}",
            Value::String(column_id.to_string()),
            value
        ))),
        Err(reason) => FieldOutcome::Skipped(reason),
    }
}

/// The JSON value sent for one column, by type.
fn wire_value(column: &ColumnValue) -> Result<Value, SkipReason> {
    let value = &column.value;
    match column.kind {
        ColumnType::BoardRelation => {
            let linked = linked_item_id(value)?;
            Ok(json!({ "linkedPulseIds": [{ "linkedPulseId": linked }] }))
        }
        ColumnType::Hour => {
            let (hour, minute) = parse_hour(value)?;
            Ok(json!({ "hour": hour, "minute": minute }))
        }
        ColumnType::Checkbox => {
            if is_truthy(value) {
                Ok(json!({ "checked": "true" }))
            } else {
                Ok(Value::Null)
            }
        }
        ColumnType::Status => {
            if !is_truthy(value) {
                return Err(SkipReason::Empty);
            }
            Ok(json!({ "label": scalar_text(value) }))
        }
        ColumnType::People => {
            if !is_truthy(value) {
                return Err(SkipReason::Empty);
            }
            Ok(json!({ "personsAndTeams": [{ "id": scalar_text(value), "kind": "person" }] }))
        }
        ColumnType::Email => {
            let address = scalar_text(value);
            Ok(json!({ "email": address, "text": address }))
        }
        ColumnType::Timeline => {
            let (from, to) = value
                .as_object()
                .and_then(|range| Some((range.get("from")?, range.get("to")?)))
                .ok_or_else(|| SkipReason::Malformed(format!("expected {{from, to}}, got {value}")))?;
            Ok(json!({ "from": from, "to": to }))
        }
        ColumnType::Text => Ok(Value::String(scalar_text(value))),
    }
}

/// Falsy values: `null`, `false`, zero, and the empty string.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Textual form of a scalar, as a form field would show it.
pub(crate) fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn linked_item_id(value: &Value) -> Result<Value, SkipReason> {
    match value {
        Value::Number(n) if n.is_u64() => Ok(value.clone()),
        Value::String(s) => s
            .trim()
            .parse::<u64>()
            .map(Value::from)
            .map_err(|_| SkipReason::Malformed(format!("linked item id {s:?} is not numeric"))),
        other => Err(SkipReason::Malformed(format!("linked item id {other} is not numeric"))),
    }
}

fn parse_hour(value: &Value) -> Result<(i64, i64), SkipReason> {
    let text = value
        .as_str()
        .ok_or_else(|| SkipReason::Malformed(format!("expected \"HH:MM\", got {value}")))?;
    let mut halves = text.split(':');
    let hour = halves.next().and_then(leading_int);
    let minute = halves.next().and_then(leading_int);
    match (hour, minute) {
        (Some(hour), Some(minute)) => Ok((hour, minute)),
        _ => Err(SkipReason::Malformed(format!("expected \"HH:MM\", got {text:?}"))),
    }
}

/// Parse the leading integer of `s` (after whitespace and an optional sign),
/// ignoring trailing characters. `"09"` → 9, `"30pm"` → 30, `"bad"` → None.
/// Digits that overflow `i64` also give None, so such an hour is skipped
/// rather than sent as an imprecise float.
fn leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (sign, rest) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = rest
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map_or(rest.len(), |(i, _)| i);
    rest[..end].parse::<i64>().ok().map(|n| sign * n)
}

/// Escape text for embedding in a double-quoted GraphQL string. Control
/// characters never appear raw in the literal.
pub(crate) fn escape_for_string_literal(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + text.len() / 4);
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            c if c.is_control() => escaped.push_str(&format!("\\u{:04x}", u32::from(c))),
            c => escaped.push(c),
        }
    }
    escaped
}
