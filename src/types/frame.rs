use serde::Deserialize;
use serde_json::Value;

/// Marker that ends the response to the open request. Matched by containment,
/// so it may sit anywhere inside the final frame.
pub const TERMINAL_SENTINEL: &str = "[END]";

/// Structured payloads the backend may send instead of a text delta.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StructuredRecord {
    Image {
        #[serde(default)]
        query: String,
        #[serde(default)]
        url: String,
    },
    Error {
        #[serde(default)]
        message: String,
    },
    #[serde(other)]
    Unknown,
}

/// One inbound text frame after classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame<'a> {
    Sentinel,
    Record(StructuredRecord),
    Text(&'a str),
}

impl<'a> InboundFrame<'a> {
    /// Classifies a raw payload: sentinel first, then a structured record,
    /// falling back to a plain text delta when the record decode fails.
    pub fn decode(payload: &'a str) -> Self {
        if payload.contains(TERMINAL_SENTINEL) {
            return Self::Sentinel;
        }
        match decode_record(payload) {
            Some(record) => Self::Record(record),
            None => Self::Text(payload),
        }
    }
}

fn decode_record(payload: &str) -> Option<StructuredRecord> {
    // Cheap reject for the common streaming case before handing text to serde.
    if !payload.trim_start().starts_with('{') {
        return None;
    }
    let value: Value = serde_json::from_str(payload).ok()?;
    let kind = value.get("type")?;
    if !kind.is_string() {
        return Some(StructuredRecord::Unknown);
    }
    Some(StructuredRecord::deserialize(value).unwrap_or(StructuredRecord::Unknown))
}
