// src/correlation/response.rs

//! Response payload shaping.
//!
//! Responses may arrive wrapped in a one-element array, and may split their
//! fields between the top level and `headers` / `body` sub-sections. Shaping
//! flattens both conventions into a single value before it is decoded into
//! the caller's result type. Section population is best-effort: when the
//! flattened value does not fit, the top level is decoded as it arrived.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::{FrameId, Result, RpcError};

/// Sub-sections merged into the top level of a response, in merge order.
pub const RESPONSE_SECTIONS: [&str; 2] = ["headers", "body"];

/// Flatten a raw response payload.
///
/// - An array is reduced to its first element (`null` if empty).
/// - Object-valued `headers` and `body` members are removed and deep-merged
///   into the top level; their fields overwrite top-level fields.
/// - Sections that are absent or not objects are left alone.
pub fn shape_response(payload: Value) -> Value {
    // ---
    populate(unwrap_first(payload))
}

fn unwrap_first(payload: Value) -> Value {
    // ---
    match payload {
        Value::Array(items) => items.into_iter().next().unwrap_or(Value::Null),
        other => other,
    }
}

fn has_sections(root: &Value) -> bool {
    // ---
    let Value::Object(map) = root else {
        return false;
    };
    RESPONSE_SECTIONS
        .iter()
        .any(|section| matches!(map.get(*section), Some(Value::Object(_))))
}

fn populate(mut root: Value) -> Value {
    // ---
    if let Value::Object(map) = &mut root {
        for section in RESPONSE_SECTIONS {
            if !matches!(map.get(section), Some(Value::Object(_))) {
                continue;
            }
            if let Some(Value::Object(fields)) = map.remove(section) {
                merge_into(map, fields);
            }
        }
    }

    root
}

/// Deep-merge `source` into `target`.
///
/// Objects merge key by key; any other value replaces what was there.
pub fn merge_into(target: &mut Map<String, Value>, source: Map<String, Value>) {
    // ---
    for (key, incoming) in source {
        match incoming {
            Value::Object(nested) => match target.get_mut(&key) {
                Some(Value::Object(existing)) => merge_into(existing, nested),
                _ => {
                    target.insert(key, Value::Object(nested));
                }
            },
            other => {
                target.insert(key, other);
            }
        }
    }
}

/// Shape a raw response and decode it into `T`.
///
/// The populated value is tried first. If it does not decode, the unwrapped
/// payload is decoded with its sections left in place; the error from the
/// populated attempt is reported only when both fail.
pub(crate) fn decode<T: DeserializeOwned>(frame_id: FrameId, payload: Value) -> Result<T> {
    // ---
    let root = unwrap_first(payload);

    if !has_sections(&root) {
        return serde_json::from_value(root)
            .map_err(|source| RpcError::InvalidResponse { frame_id, source });
    }

    match serde_json::from_value(populate(root.clone())) {
        Ok(value) => Ok(value),
        Err(source) => serde_json::from_value(root)
            .map_err(|_| RpcError::InvalidResponse { frame_id, source }),
    }
}
