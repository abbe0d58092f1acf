//! Data file codec: a JSON array of JSON objects.

use crate::error::{CoreError, CoreResult};
use crate::query::Document;
use serde_json::Value;
use std::path::Path;

/// Decodes the contents of a collection data file.
///
/// # Errors
///
/// Returns `Corruption` if `data` is not a JSON array, or if any element is
/// not a JSON object.
pub fn decode_documents(data: &[u8], path: &Path) -> CoreResult<Vec<Document>> {
    let value: Value = serde_json::from_slice(data)
        .map_err(|e| CoreError::corruption(path, format!("invalid JSON: {e}")))?;

    let Value::Array(items) = value else {
        return Err(CoreError::corruption(path, "data file is not a JSON array"));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(map) => Ok(map),
            _ => Err(CoreError::corruption(
                path,
                format!("element {index} is not a JSON object"),
            )),
        })
        .collect()
}
