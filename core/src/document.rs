//! Document model: paths, identifiers, fields, filters and patches.
//!
//! A document is a JSON object stored under a [`CollectionPath`] and a
//! [`DocumentId`]. Collections may nest under a parent document, e.g. the
//! comments of an event live in `events/{event_id}/comments`.
//!
//! Reads are expressed as a [`Query`] (a conjunction of [`Filter`]s), writes as
//! whole [`Fields`] maps or as a [`Patch`] of per-field operations. Filters and
//! patches are evaluated here, in plain Rust, so every store implementation
//! agrees on their semantics.
//!
//! # Example
//!
//! ```
//! use evently_core::document::{Filter, Patch, Query};
//! use serde_json::json;
//!
//! let mut fields = json!({ "title": "RustConf", "tags": ["rust"], "capacity": 2 })
//!     .as_object()
//!     .cloned()
//!     .unwrap();
//!
//! let query = Query::new().filter(Filter::starts_with("title", "Rust"));
//! assert!(query.matches(&fields));
//!
//! Patch::new()
//!     .increment("capacity", -1)
//!     .array_union("tags", vec![json!("conference")])
//!     .apply(&mut fields)
//!     .unwrap();
//! assert_eq!(fields["capacity"], json!(1));
//! ```

use crate::document_store::DocumentStoreError;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Field map of a stored document.
pub type Fields = Map<String, Value>;

/// Error type for path and identifier parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid document path: {0}")]
pub struct ParsePathError(String);

// ============================================================================
// Identifiers
// ============================================================================

/// Path of a collection, e.g. `"events"` or `"events/abc123/comments"`.
///
/// # Validation
///
/// - `FromStr::from_str()`: rejects empty segments and paths that point at a
///   document (an even number of segments)
/// - `new()` and [`nested`](Self::nested): no validation, for trusted input
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CollectionPath(String);

impl CollectionPath {
    /// Create a top-level collection path.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Path of a sub-collection under one document of this collection.
    ///
    /// ```
    /// use evently_core::document::{CollectionPath, DocumentId};
    ///
    /// let comments = CollectionPath::new("events").nested(&DocumentId::new("e1"), "comments");
    /// assert_eq!(comments.as_str(), "events/e1/comments");
    /// ```
    #[must_use]
    pub fn nested(&self, parent: &DocumentId, name: &str) -> Self {
        Self(format!("{}/{}/{name}", self.0, parent.as_str()))
    }

    /// Get the path as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CollectionPath {
    type Err = ParsePathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments: Vec<&str> = s.split('/').collect();
        if segments.iter().any(|segment| segment.trim().is_empty()) {
            return Err(ParsePathError(format!("empty segment in `{s}`")));
        }
        if segments.len() % 2 == 0 {
            return Err(ParsePathError(format!("`{s}` names a document, not a collection")));
        }
        Ok(Self(s.to_string()))
    }
}

/// Opaque identifier of a document within its collection.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(String);

impl DocumentId {
    /// Wrap an existing identifier (no validation).
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the identifier, returning the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DocumentId {
    type Err = ParsePathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(ParsePathError("document id cannot be empty".to_string()));
        }
        if s.contains('/') {
            return Err(ParsePathError(format!("document id `{s}` contains '/'")));
        }
        Ok(Self(s.to_string()))
    }
}

// ============================================================================
// Documents
// ============================================================================

/// A stored document: its identifier plus its fields.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    /// Identifier within the collection
    pub id: DocumentId,
    /// Field values
    pub fields: Fields,
}

impl Document {
    /// Creates a new `Document`
    #[must_use]
    pub const fn new(id: DocumentId, fields: Fields) -> Self {
        Self { id, fields }
    }

    /// Read a single field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Deserialize the fields into a typed record.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::SerializationError`] if the fields do not
    /// match the shape of `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, DocumentStoreError> {
        serde_json::from_value(Value::Object(self.fields.clone())).map_err(|e| {
            DocumentStoreError::SerializationError(format!("document {}: {e}", self.id))
        })
    }
}

/// Serialize a record into document fields.
///
/// # Errors
///
/// Returns [`DocumentStoreError::SerializationError`] if `value` fails to
/// serialize or does not serialize to a JSON object.
pub fn to_fields<T: Serialize>(value: &T) -> Result<Fields, DocumentStoreError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(other) => Err(DocumentStoreError::SerializationError(format!(
            "expected a JSON object, got {other}"
        ))),
        Err(e) => Err(DocumentStoreError::SerializationError(e.to_string())),
    }
}

// ============================================================================
// Queries
// ============================================================================

/// A single predicate over a top-level field.
#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    /// Field equals the value.
    Eq {
        /// Field name
        field: String,
        /// Expected value
        value: Value,
    },
    /// Field is an array containing the value.
    ArrayContains {
        /// Field name
        field: String,
        /// Element that must be present
        value: Value,
    },
    /// Field is an array containing at least one of the values.
    ///
    /// An empty `values` list matches nothing.
    ArrayContainsAny {
        /// Field name
        field: String,
        /// Candidate elements
        values: Vec<Value>,
    },
    /// Field is a string starting with the prefix (case-sensitive).
    StartsWith {
        /// Field name
        field: String,
        /// Required prefix
        prefix: String,
    },
}

impl Filter {
    /// `field == value`
    #[must_use]
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    /// `value ∈ field`
    #[must_use]
    pub fn array_contains(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::ArrayContains {
            field: field.into(),
            value: value.into(),
        }
    }

    /// `field ∩ values ≠ ∅`
    #[must_use]
    pub fn array_contains_any(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::ArrayContainsAny {
            field: field.into(),
            values,
        }
    }

    /// `field` starts with `prefix`
    #[must_use]
    pub fn starts_with(field: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self::StartsWith {
            field: field.into(),
            prefix: prefix.into(),
        }
    }

    /// Name of the field this filter inspects.
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::Eq { field, .. }
            | Self::ArrayContains { field, .. }
            | Self::ArrayContainsAny { field, .. }
            | Self::StartsWith { field, .. } => field,
        }
    }

    /// Evaluate the filter against a document's fields.
    #[must_use]
    pub fn matches(&self, fields: &Fields) -> bool {
        match self {
            Self::Eq { field, value } => fields.get(field) == Some(value),
            Self::ArrayContains { field, value } => {
                array(fields, field).is_some_and(|items| items.contains(value))
            }
            Self::ArrayContainsAny { field, values } => array(fields, field)
                .is_some_and(|items| values.iter().any(|value| items.contains(value))),
            Self::StartsWith { field, prefix } => fields
                .get(field)
                .and_then(Value::as_str)
                .is_some_and(|text| text.starts_with(prefix.as_str())),
        }
    }
}

fn array<'a>(fields: &'a Fields, field: &str) -> Option<&'a Vec<Value>> {
    fields.get(field).and_then(Value::as_array)
}

/// Conjunction of filters. An empty query matches every document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Query {
    filters: Vec<Filter>,
}

impl Query {
    /// Query matching every document of a collection.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// Add a filter.
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// The filters of this query.
    #[must_use]
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Whether every filter matches.
    #[must_use]
    pub fn matches(&self, fields: &Fields) -> bool {
        self.filters.iter().all(|filter| filter.matches(fields))
    }
}

// ============================================================================
// Patches
// ============================================================================

/// Operation applied to one field by a [`Patch`].
#[derive(Clone, Debug, PartialEq)]
pub enum FieldUpdate {
    /// Replace the value.
    Set(Value),
    /// Remove the field.
    Remove,
    /// Add to an integer field (missing counts as 0).
    Increment(i64),
    /// Add each value not already present, keeping existing order.
    ArrayUnion(Vec<Value>),
    /// Remove every occurrence of each value.
    ArrayRemove(Vec<Value>),
    /// Append the values unconditionally.
    ArrayAppend(Vec<Value>),
}

/// Ordered list of field operations applied as one partial update.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Patch {
    updates: Vec<(String, FieldUpdate)>,
}

impl Patch {
    /// Empty patch.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            updates: Vec::new(),
        }
    }

    /// Add an arbitrary field operation.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, update: FieldUpdate) -> Self {
        self.updates.push((field.into(), update));
        self
    }

    /// Set `field` to `value`.
    #[must_use]
    pub fn set(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, FieldUpdate::Set(value.into()))
    }

    /// Remove `field`.
    #[must_use]
    pub fn remove(self, field: impl Into<String>) -> Self {
        self.with(field, FieldUpdate::Remove)
    }

    /// Add `delta` to the integer `field`.
    #[must_use]
    pub fn increment(self, field: impl Into<String>, delta: i64) -> Self {
        self.with(field, FieldUpdate::Increment(delta))
    }

    /// Set-union `values` into the array `field`.
    #[must_use]
    pub fn array_union(self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.with(field, FieldUpdate::ArrayUnion(values))
    }

    /// Remove `values` from the array `field`.
    #[must_use]
    pub fn array_remove(self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.with(field, FieldUpdate::ArrayRemove(values))
    }

    /// Append `values` to the array `field`.
    #[must_use]
    pub fn array_append(self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.with(field, FieldUpdate::ArrayAppend(values))
    }

    /// Whether the patch has no operations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    /// The operations, in application order.
    #[must_use]
    pub fn updates(&self) -> &[(String, FieldUpdate)] {
        &self.updates
    }

    /// Apply every operation to `fields`, in order.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidUpdate`] when an operation does not
    /// fit the current value (incrementing a string, appending to an object,
    /// integer overflow). `fields` may be partially updated in that case; the
    /// stores apply patches to a copy and discard it on error.
    pub fn apply(&self, fields: &mut Fields) -> Result<(), DocumentStoreError> {
        for (field, update) in &self.updates {
            match update {
                FieldUpdate::Set(value) => {
                    fields.insert(field.clone(), value.clone());
                }
                FieldUpdate::Remove => {
                    fields.remove(field);
                }
                FieldUpdate::Increment(delta) => {
                    let current = match fields.get(field) {
                        None | Some(Value::Null) => 0,
                        Some(value) => value.as_i64().ok_or_else(|| {
                            DocumentStoreError::InvalidUpdate(format!(
                                "field `{field}` is not an integer"
                            ))
                        })?,
                    };
                    let next = current.checked_add(*delta).ok_or_else(|| {
                        DocumentStoreError::InvalidUpdate(format!(
                            "increment overflows field `{field}`"
                        ))
                    })?;
                    fields.insert(field.clone(), Value::from(next));
                }
                FieldUpdate::ArrayUnion(values) => {
                    let items = array_mut(fields, field)?;
                    for value in values {
                        if !items.contains(value) {
                            items.push(value.clone());
                        }
                    }
                }
                FieldUpdate::ArrayRemove(values) => {
                    array_mut(fields, field)?.retain(|item| !values.contains(item));
                }
                FieldUpdate::ArrayAppend(values) => {
                    array_mut(fields, field)?.extend(values.iter().cloned());
                }
            }
        }
        Ok(())
    }
}

fn array_mut<'a>(fields: &'a mut Fields, field: &str) -> Result<&'a mut Vec<Value>, DocumentStoreError> {
    let slot = fields
        .entry(field.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    if slot.is_null() {
        *slot = Value::Array(Vec::new());
    }
    slot.as_array_mut().ok_or_else(|| {
        DocumentStoreError::InvalidUpdate(format!("field `{field}` is not an array"))
    })
}

// ============================================================================
// Preconditions
// ============================================================================

/// Condition checked against the current document before a write applies.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Precondition {
    /// The document exists.
    Exists,
    /// The integer `field` is strictly greater than `value`.
    FieldGreaterThan {
        /// Field name
        field: String,
        /// Exclusive lower bound
        value: i64,
    },
}

impl Precondition {
    /// `field > value`
    #[must_use]
    pub fn field_greater_than(field: impl Into<String>, value: i64) -> Self {
        Self::FieldGreaterThan {
            field: field.into(),
            value,
        }
    }

    /// Whether the condition holds for the current document (`None` if absent).
    #[must_use]
    pub fn holds(&self, current: Option<&Fields>) -> bool {
        match self {
            Self::Exists => current.is_some(),
            Self::FieldGreaterThan { field, value } => current
                .and_then(|fields| fields.get(field))
                .and_then(Value::as_i64)
                .is_some_and(|actual| actual > *value),
        }
    }
}

impl fmt::Display for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exists => write!(f, "document exists"),
            Self::FieldGreaterThan { field, value } => write!(f, "`{field}` > {value}"),
        }
    }
}
