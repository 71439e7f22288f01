// The to-do item record

use crate::record::{IndexKind, IndexValue, Record};
use crate::store::now_ms;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Summaries the create trigger picks from when no text is given
pub const SUMMARIES: [&str; 5] = ["Go groceries store", "Do the laundry", "Study", "Cook ", "Wash the dishes"];

/// Opaque, time-ordered item identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(Uuid);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// 32 lowercase hex digits
    pub fn to_hex(&self) -> String {
        self.0.simple().to_string()
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub summary: String,
    pub is_complete: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Item {
    /// A new, incomplete item with a fresh id
    pub fn new(summary: impl Into<String>) -> Self {
        let now = now_ms();
        Self {
            id: ItemId::new(),
            summary: summary.into(),
            is_complete: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn random_summary() -> &'static str {
        let roll = Uuid::new_v4().as_u128() % SUMMARIES.len() as u128;
        SUMMARIES[roll as usize]
    }

    /// Mark complete, stamping the update time
    pub fn complete(&mut self) {
        self.is_complete = true;
        self.updated_at = now_ms();
    }
}

impl Record for Item {
    fn id(&self) -> String {
        self.id.to_hex()
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }

    fn collection_name() -> &'static str {
        "items"
    }

    fn indexed_fields(&self) -> HashMap<String, IndexValue> {
        let mut fields = HashMap::new();
        fields.insert("summary".to_string(), IndexValue::String(self.summary.clone()));
        fields.insert("is_complete".to_string(), IndexValue::Bool(self.is_complete));
        fields
    }

    fn indexed_field_kinds() -> Vec<(&'static str, IndexKind)> {
        vec![("summary", IndexKind::String), ("is_complete", IndexKind::Bool)]
    }
}
