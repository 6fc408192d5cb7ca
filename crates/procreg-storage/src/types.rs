//! Storage types shared by the store traits.

use std::pin::Pin;

use futures_util::Stream;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::StorageError;

/// Identifier prefix of store-internal design documents.
pub const DESIGN_DOC_PREFIX: &str = "_design/";

/// Returns true for ids that denote store-internal metadata objects.
pub fn is_design_doc(id: &str) -> bool {
    id.starts_with(DESIGN_DOC_PREFIX)
}

/// One entry of a query or enumeration result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub id: String,
    /// Document body, present when the query returns bodies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<Value>,
}

impl Row {
    pub fn new(id: impl Into<String>, doc: Option<Value>) -> Self {
        Self {
            id: id.into(),
            doc,
        }
    }
}

/// Stream of rows produced by a store cursor.
///
/// Dropping the stream releases the cursor.
pub type RowStream = Pin<Box<dyn Stream<Item = Result<Row, StorageError>> + Send>>;

/// A server-side document predicate in Mango selector form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selector(Map<String, Value>);

impl Selector {
    /// A selector matching every document.
    pub fn all() -> Self {
        Self::default()
    }

    /// Equality on a single (possibly dotted) field.
    pub fn field_eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut map = Map::new();
        map.insert(field.into(), value.into());
        Self(map)
    }

    /// Conjunction with another equality condition.
    pub fn and(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Evaluates the selector against a document body.
    ///
    /// Supports implicit equality and the `$eq`, `$ne` and `$in` operators.
    pub fn matches(&self, doc: &Value) -> bool {
        self.0.iter().all(|(field, condition)| {
            let actual = lookup(doc, field);
            match condition {
                Value::Object(ops) if ops.keys().all(|k| k.starts_with('$')) => {
                    ops.iter().all(|(op, expected)| match op.as_str() {
                        "$eq" => actual == Some(expected),
                        "$ne" => actual != Some(expected),
                        "$in" => expected
                            .as_array()
                            .is_some_and(|candidates| actual.is_some_and(|a| candidates.contains(a))),
                        _ => false,
                    })
                }
                expected => actual == Some(expected),
            }
        })
    }
}

fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |value, key| value.get(key))
}
