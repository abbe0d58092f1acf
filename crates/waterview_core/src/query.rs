//! Predicate matching over materialized documents.
//!
//! A [`Predicate`] is a flat conjunction of field equalities. A document
//! matches when every predicate field is present in the document with a
//! deep-equal value; a missing field never matches. The empty predicate
//! matches every document.

use crate::error::{CoreError, CoreResult};
use serde_json::{Map, Number, Value};

/// A stored document: a JSON object.
pub type Document = Map<String, Value>;

/// Field-equality conjunction used to select documents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    fields: Map<String, Value>,
}

impl Predicate {
    /// The empty predicate, matching every document.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Builds a predicate from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns a `Validation` error if `value` is not a JSON object.
    pub fn from_value(value: Value) -> CoreResult<Self> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(CoreError::validation(format!(
                "predicate must be a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Adds a field constraint.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, expected: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), expected.into());
        self
    }

    /// Returns true if this predicate has no constraints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the constrained fields.
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Returns true if `document` satisfies every constraint.
    #[must_use]
    pub fn matches(&self, document: &Document) -> bool {
        self.fields.iter().all(|(field, expected)| {
            document
                .get(field)
                .is_some_and(|actual| json_eq(actual, expected))
        })
    }
}

impl From<Document> for Predicate {
    fn from(fields: Document) -> Self {
        Self { fields }
    }
}

/// Returns true if `document` satisfies `predicate`.
#[must_use]
pub fn matches(document: &Document, predicate: &Predicate) -> bool {
    predicate.matches(document)
}

/// Deep JSON equality.
///
/// Objects compare by key set and values regardless of key order, arrays
/// element-wise in order, and numbers by numeric value, so `20` equals
/// `20.0`. An integer equals a float only when the float is that exact
/// integer.
#[must_use]
pub fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => number_eq(x, y),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| json_eq(x, y))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(key, xv)| y.get(key).is_some_and(|yv| json_eq(xv, yv)))
        }
        _ => a == b,
    }
}

fn number_eq(x: &Number, y: &Number) -> bool {
    match (integer(x), integer(y)) {
        (Some(x), Some(y)) => x == y,
        (Some(i), None) => y.as_f64().is_some_and(|f| float_is_integer(f, i)),
        (None, Some(i)) => x.as_f64().is_some_and(|f| float_is_integer(f, i)),
        (None, None) => matches!((x.as_f64(), y.as_f64()), (Some(x), Some(y)) if x == y),
    }
}

fn integer(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

// Integers from JSON fit in 65 bits, so any float of magnitude 2^65 or more
// is unequal and the cast below is exact.
fn float_is_integer(f: f64, i: i128) -> bool {
    f.fract() == 0.0 && f.abs() < 36_893_488_147_419_103_232.0 && f as i128 == i
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Lazy filter over a slice of documents.
///
/// A clone resumes from the same position as the original. A fresh call to
/// [`filter`] starts over from the first document.
#[derive(Debug, Clone)]
pub struct Filter<'a> {
    documents: std::slice::Iter<'a, Document>,
    predicate: &'a Predicate,
}

impl<'a> Iterator for Filter<'a> {
    type Item = &'a Document;

    fn next(&mut self) -> Option<Self::Item> {
        let predicate = self.predicate;
        self.documents.find(|doc| predicate.matches(doc))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.documents.size_hint().1)
    }
}

/// Returns the documents matching `predicate`, in order, lazily.
pub fn filter<'a>(documents: &'a [Document], predicate: &'a Predicate) -> Filter<'a> {
    Filter {
        documents: documents.iter(),
        predicate,
    }
}

/// Returns the first document matching `predicate`, if any.
#[must_use]
pub fn first_match<'a>(documents: &'a [Document], predicate: &Predicate) -> Option<&'a Document> {
    documents.iter().find(|doc| predicate.matches(doc))
}

/// Converts a JSON value into a document.
///
/// # Errors
///
/// Returns a `Validation` error if `value` is not a JSON object.
pub fn document_from_value(value: Value) -> CoreResult<Document> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(CoreError::validation(format!(
            "document must be a JSON object, got {}",
            json_type_name(&other)
        ))),
    }
}
