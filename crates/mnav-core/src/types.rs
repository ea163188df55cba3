//! Core data types for captured fragments, extracted values, and run results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

/// Timestamp layout written alongside every published result set.
pub const TIMESTAMP_FORMAT: &str = "%b %d, %Y, %H:%M UTC";

/// Ordered visible-text fragments captured from one render of the page.
///
/// Entries are trimmed and never empty. Their order is the only way fields
/// are addressed, so it must be kept exactly as captured.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentSequence {
    fragments: Vec<String>,
}

impl FragmentSequence {
    /// Build a sequence from raw captures, trimming each and dropping blanks.
    pub fn from_raw<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let fragments = raw
            .into_iter()
            .map(|s| s.as_ref().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        Self { fragments }
    }

    /// Fragment at a 1-based position, if in bounds.
    pub fn at_position(&self, position: usize) -> Option<&str> {
        position
            .checked_sub(1)
            .and_then(|idx| self.fragments.get(idx))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Iterate fragments paired with their 1-based position.
    pub fn numbered(&self) -> impl Iterator<Item = (usize, &str)> {
        self.fragments
            .iter()
            .enumerate()
            .map(|(i, s)| (i + 1, s.as_str()))
    }
}

/// A named field bound to a fixed 1-based fragment position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub position: usize,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, position: usize) -> Self {
        Self {
            name: name.into(),
            position,
        }
    }
}

/// Numeric reading for one field.
///
/// `Unparsed` is the zero sentinel: it reads as `0` everywhere (value,
/// validity, published form) but stays distinguishable in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExtractedValue {
    Integer(i64),
    Decimal(f64),
    Unparsed,
}

impl ExtractedValue {
    /// Numeric value, with the sentinel reading as zero.
    pub fn as_f64(&self) -> f64 {
        match *self {
            ExtractedValue::Integer(v) => v as f64,
            ExtractedValue::Decimal(v) => v,
            ExtractedValue::Unparsed => 0.0,
        }
    }

    /// A value counts towards the quorum only when strictly positive.
    pub fn is_valid(&self) -> bool {
        self.as_f64() > 0.0
    }

    pub fn is_unparsed(&self) -> bool {
        matches!(self, ExtractedValue::Unparsed)
    }

    pub fn to_json(&self) -> serde_json::Value {
        match *self {
            ExtractedValue::Integer(v) => serde_json::Value::from(v),
            ExtractedValue::Decimal(v) => serde_json::Number::from_f64(v)
                .map(serde_json::Value::Number)
                .unwrap_or_else(|| serde_json::Value::from(0)),
            ExtractedValue::Unparsed => serde_json::Value::from(0),
        }
    }
}

impl Serialize for ExtractedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match *self {
            ExtractedValue::Integer(v) => serializer.serialize_i64(v),
            ExtractedValue::Decimal(v) => serializer.serialize_f64(v),
            ExtractedValue::Unparsed => serializer.serialize_i64(0),
        }
    }
}

impl std::fmt::Display for ExtractedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractedValue::Integer(v) => write!(f, "{v}"),
            ExtractedValue::Decimal(v) => write!(f, "{v}"),
            ExtractedValue::Unparsed => write!(f, "0 (unparsed)"),
        }
    }
}

/// Field name to value, in field-table order, before derivation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedFields {
    entries: Vec<(String, ExtractedValue)>,
}

impl ExtractedFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a field value, keeping first-insertion order.
    pub fn insert(&mut self, name: impl Into<String>, value: ExtractedValue) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<ExtractedValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ExtractedValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of strictly positive values.
    pub fn valid_count(&self) -> usize {
        self.entries.iter().filter(|(_, v)| v.is_valid()).count()
    }

    /// Names of fields that are zero or unparsed.
    pub fn invalid_names(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, v)| !v.is_valid())
            .map(|(n, _)| n.as_str())
            .collect()
    }

    /// Flat JSON object of the raw values, sentinel written as `0`.
    pub fn to_json_map(&self) -> serde_json::Map<String, serde_json::Value> {
        self.entries
            .iter()
            .map(|(n, v)| (n.clone(), v.to_json()))
            .collect()
    }
}

/// Finalized output of an accepted run. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    fields: ExtractedFields,
    ratio_key: String,
    ratio: f64,
    timestamp_key: String,
    timestamp: String,
}

impl ResultSet {
    pub(crate) fn new(
        fields: ExtractedFields,
        ratio_key: String,
        ratio: f64,
        timestamp_key: String,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            fields,
            ratio_key,
            ratio,
            timestamp_key,
            timestamp: generated_at.format(TIMESTAMP_FORMAT).to_string(),
        }
    }

    pub fn fields(&self) -> &ExtractedFields {
        &self.fields
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    pub fn ratio_key(&self) -> &str {
        &self.ratio_key
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// The flat scalar mapping written to the store.
    pub fn to_store_map(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut map = self.fields.to_json_map();
        map.insert(
            self.ratio_key.clone(),
            serde_json::Number::from_f64(self.ratio)
                .map(serde_json::Value::Number)
                .unwrap_or_else(|| serde_json::Value::from(0)),
        );
        map.insert(
            self.timestamp_key.clone(),
            serde_json::Value::String(self.timestamp.clone()),
        );
        map
    }
}

/// Why a run did not end in a publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Shortfall,
    RenderFault,
    PublishFault,
}

impl FailureKind {
    pub fn subject(&self) -> &'static str {
        match self {
            FailureKind::Shortfall => "data shortfall",
            FailureKind::RenderFault => "render fault",
            FailureKind::PublishFault => "publish fault",
        }
    }
}

/// Diagnostic produced whenever a run is rejected or faults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureReport {
    pub kind: FailureKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl FailureReport {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Fault raised while launching, navigating, or capturing the page.
    pub fn render_fault(description: impl std::fmt::Display) -> Self {
        Self::new(
            FailureKind::RenderFault,
            format!("error while rendering page: {description}"),
        )
    }

    /// Store write failed; the computed result set rides along for manual recovery.
    pub fn publish_fault(description: impl std::fmt::Display, result: &ResultSet) -> Self {
        Self::new(
            FailureKind::PublishFault,
            format!("store update failed: {description}"),
        )
        .with_payload(serde_json::Value::Object(result.to_store_map()))
    }

    /// Human-readable alert body: message plus pretty-printed payload.
    pub fn body(&self) -> String {
        match &self.payload {
            Some(payload) => {
                let pretty = serde_json::to_string_pretty(payload)
                    .unwrap_or_else(|_| payload.to_string());
                format!("{}\n\n{}", self.message, pretty)
            }
            None => self.message.clone(),
        }
    }
}

/// Errors that can occur while building core configuration.
#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    #[error("Field table is empty")]
    EmptyFieldTable,

    #[error("Field name must not be empty (position {0})")]
    EmptyFieldName(usize),

    #[error("Duplicate field name: {0}")]
    DuplicateField(String),

    #[error("Field {name} has position 0; positions are 1-based")]
    ZeroPosition { name: String },

    #[error("Ratio input {0} is not in the field table")]
    UnknownRatioInput(String),

    #[error("Invalid ratio spec: {0}")]
    InvalidRatio(String),
}

/// Convenience result type.
pub type CoreResult<T> = Result<T, CoreError>;
