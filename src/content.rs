//! Content-slot repair and synchronization.
//!
//! A descriptor's `content` field can arrive in a handful of malformed shapes
//! from hand editing. Classification names each shape; synchronization
//! normalizes malformed shapes to the canonical single-attachment form and
//! refreshes the base64 payload and date stamp.
use crate::resource::{timestamp_now, SCRIPT_CONTENT_TYPE};
use crate::validate::has_content_data;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};

/// Script body written when no source file can be paired with a descriptor.
pub const PLACEHOLDER_SCRIPT: &str = "function enhance(originalContent) {\n    console.log('Not Enhancing');\n    return originalContent;\n}";

/// Observed shape of a descriptor's `content` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentShape {
    /// Field absent entirely.
    Missing,
    /// Field present but JSON null.
    Null,
    /// Field is a string, number, or boolean.
    Scalar,
    /// Field is a bare object rather than a sequence.
    SingleObject,
    /// Field is an empty array.
    EmptySequence,
    /// Single-element array whose element is an empty object.
    SequenceOfEmptyObject,
    /// Array where no element carries base64 data.
    SequenceMissingData,
    /// Array with at least one data-bearing element.
    Valid,
}

/// Classify the `content` field of a descriptor record.
pub fn classify_content(record: &Value) -> ContentShape {
    match record.get("content") {
        None => ContentShape::Missing,
        Some(Value::Null) => ContentShape::Null,
        Some(Value::String(_)) | Some(Value::Number(_)) | Some(Value::Bool(_)) => {
            ContentShape::Scalar
        }
        Some(Value::Object(_)) => ContentShape::SingleObject,
        Some(Value::Array(items)) => {
            if items.is_empty() {
                ContentShape::EmptySequence
            } else if items.iter().any(has_content_data) {
                ContentShape::Valid
            } else if items.len() == 1
                && items[0].as_object().is_some_and(serde_json::Map::is_empty)
            {
                ContentShape::SequenceOfEmptyObject
            } else {
                ContentShape::SequenceMissingData
            }
        }
    }
}

/// Whether synchronization must rebuild the content sequence from scratch.
pub fn needs_repair(shape: ContentShape) -> bool {
    shape != ContentShape::Valid
}

/// Base64 payload for a decoded script body.
pub fn encode_payload(script: &str) -> String {
    STANDARD.encode(script.as_bytes())
}

/// Payload used when no source file exists for a descriptor.
pub fn placeholder_payload() -> String {
    encode_payload(PLACEHOLDER_SCRIPT)
}

/// Knobs for [`synchronize`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Leave the `date` field untouched.
    pub skip_date: bool,
}

/// Produce an updated copy of a descriptor with its content payload
/// synchronized to `payload`.
///
/// Malformed content shapes are replaced with the canonical single-attachment
/// sequence. A valid sequence keeps its structure; only the first element's
/// `data` is rewritten. Passing `None` leaves a valid sequence's payload in
/// place, which lets discovery repair shape without inventing data.
pub fn synchronize(record: &Value, payload: Option<&str>, options: &SyncOptions) -> Value {
    let mut updated = record.clone();
    let Some(fields) = updated.as_object_mut() else {
        return updated;
    };

    let shape = classify_content(record);
    if needs_repair(shape) {
        let data = payload.map_or_else(placeholder_payload, str::to_string);
        fields.insert(
            "content".to_string(),
            json!([{"contentType": SCRIPT_CONTENT_TYPE, "data": data}]),
        );
    } else if let Some(data) = payload {
        if let Some(items) = fields.get_mut("content").and_then(Value::as_array_mut) {
            match items[0].as_object_mut() {
                Some(first) => {
                    first.insert("data".to_string(), json!(data));
                }
                None => {
                    items[0] = json!({"contentType": SCRIPT_CONTENT_TYPE, "data": data});
                }
            }
        }
    }

    if !options.skip_date {
        fields.insert("date".to_string(), json!(timestamp_now()));
    }
    updated
}
