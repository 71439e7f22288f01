// Query filtering for generic records

use crate::error::{Result, StoreError};
use crate::record::IndexValue;

/// Filter for querying records
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// Field name to filter on
    pub field: String,
    /// Comparison operator
    pub op: FilterOp,
    /// Value to compare against
    pub value: IndexValue,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<IndexValue>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Eq,
            value: value.into(),
        }
    }

    pub fn ne(field: impl Into<String>, value: impl Into<IndexValue>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Ne,
            value: value.into(),
        }
    }

    /// Case-sensitive prefix match on a string field
    pub fn starts_with(field: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::StartsWith,
            value: IndexValue::String(prefix.into()),
        }
    }

    /// SQL predicate over `column`, comparing against bound parameter `?{param}`
    pub(crate) fn to_sql(&self, column: &str, param: usize) -> Result<String> {
        match (self.op, &self.value) {
            (FilterOp::Eq, _) => Ok(format!("{} = ?{}", column, param)),
            (FilterOp::Ne, _) => Ok(format!("{} != ?{}", column, param)),
            // Case-sensitive, and '%' / '_' in the prefix match literally
            (FilterOp::StartsWith, IndexValue::String(_)) => Ok(format!("instr({}, ?{}) = 1", column, param)),
            (FilterOp::StartsWith, other) => Err(StoreError::InvalidFilter(format!(
                "{} on '{}' needs a string value, got {}",
                self.op, self.field, other
            ))),
        }
    }
}

/// Comparison operators for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,         // ==
    Ne,         // !=
    StartsWith, // BEGINSWITH, case-sensitive
}

impl std::fmt::Display for FilterOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterOp::Eq => write!(f, "="),
            FilterOp::Ne => write!(f, "!="),
            FilterOp::StartsWith => write!(f, "BEGINSWITH"),
        }
    }
}
