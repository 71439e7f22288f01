// Record trait and store schema

use crate::error::{Result, StoreError};
use crate::filter::Filter;
use serde::{Serialize, de::DeserializeOwned};
use std::collections::{BTreeMap, HashMap};

/// Core trait that any storable record must implement
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Unique identifier for this record, as stored
    fn id(&self) -> String;

    /// Timestamp when this record was last updated (milliseconds since epoch)
    fn updated_at(&self) -> i64;

    /// Collection name for this record type (e.g., "items")
    fn collection_name() -> &'static str
    where
        Self: Sized;

    /// Fields to index for filtering
    /// Return empty HashMap if no fields should be indexed
    fn indexed_fields(&self) -> HashMap<String, IndexValue> {
        HashMap::new()
    }

    /// Names and kinds of the fields `indexed_fields` produces
    /// Return empty Vec to leave filters on this type unchecked
    fn indexed_field_kinds() -> Vec<(&'static str, IndexKind)>
    where
        Self: Sized,
    {
        Vec::new()
    }
}

/// Kind of an indexed field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    String,
    Int,
    Bool,
}

impl std::fmt::Display for IndexKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexKind::String => write!(f, "string"),
            IndexKind::Int => write!(f, "int"),
            IndexKind::Bool => write!(f, "bool"),
        }
    }
}

/// Value types that can be indexed for filtering
#[derive(Debug, Clone, PartialEq)]
pub enum IndexValue {
    String(String),
    Int(i64),
    Bool(bool),
}

impl IndexValue {
    pub fn kind(&self) -> IndexKind {
        match self {
            IndexValue::String(_) => IndexKind::String,
            IndexValue::Int(_) => IndexKind::Int,
            IndexValue::Bool(_) => IndexKind::Bool,
        }
    }
}

impl std::fmt::Display for IndexValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexValue::String(s) => write!(f, "{}", s),
            IndexValue::Int(i) => write!(f, "{}", i),
            IndexValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for IndexValue {
    fn from(value: &str) -> Self {
        IndexValue::String(value.to_string())
    }
}

impl From<String> for IndexValue {
    fn from(value: String) -> Self {
        IndexValue::String(value)
    }
}

impl From<i64> for IndexValue {
    fn from(value: i64) -> Self {
        IndexValue::Int(value)
    }
}

impl From<bool> for IndexValue {
    fn from(value: bool) -> Self {
        IndexValue::Bool(value)
    }
}

/// The set of record types a store accepts
///
/// A store opened with a schema rejects reads and writes for any collection
/// that was not registered here, and filters on fields the record type does
/// not index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    collections: BTreeMap<&'static str, BTreeMap<&'static str, IndexKind>>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a record type
    pub fn with<T: Record>(mut self) -> Self {
        self.collections
            .insert(T::collection_name(), T::indexed_field_kinds().into_iter().collect());
        self
    }

    pub fn contains(&self, collection: &str) -> bool {
        self.collections.contains_key(collection)
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    pub fn collections(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.collections.keys().copied()
    }

    /// Check that every filter names an indexed field of the matching kind
    pub fn check_filters(&self, collection: &str, filters: &[Filter]) -> Result<()> {
        let Some(fields) = self.collections.get(collection) else {
            return Err(StoreError::UnknownCollection(collection.to_string()));
        };
        if fields.is_empty() {
            return Ok(());
        }

        for filter in filters {
            let Some(kind) = fields.get(filter.field.as_str()) else {
                return Err(StoreError::InvalidFilter(format!(
                    "'{}' is not an indexed field of {}",
                    filter.field, collection
                )));
            };
            if *kind != filter.value.kind() {
                return Err(StoreError::InvalidFilter(format!(
                    "'{}' on {} is a {} field, filter value is {}",
                    filter.field,
                    collection,
                    kind,
                    filter.value.kind()
                )));
            }
        }
        Ok(())
    }
}
