/// Index definitions
use super::{Expression, QualifiedName};
use crate::diagnostic::Location;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NullsOrder {
    First,
    Last,
}

/// One key element of an index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexElement {
    pub expression: Expression,
    /// Column name when the element is a bare column
    pub column: Option<String>,
    pub collation: Option<String>,
    /// Operator class (`text_pattern_ops`)
    pub opclass: Option<String>,
    pub order: Option<SortOrder>,
    pub nulls: Option<NullsOrder>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    /// Declared name, or the generated one
    pub name: String,
    pub explicit_name: bool,
    /// Owning table
    pub table: QualifiedName,
    pub unique: bool,
    /// Access method (`USING gin`)
    pub using: Option<String>,
    /// Key elements in order
    pub elements: Vec<IndexElement>,
    /// `INCLUDE (...)` columns
    pub include: Vec<String>,
    /// Partial index predicate
    pub predicate: Option<Expression>,
    pub nulls_not_distinct: bool,
    pub concurrently: bool,
    pub location: Location,
}

impl Index {
    /// Names of the key elements that are plain columns
    pub fn key_columns(&self) -> Vec<&str> {
        self.elements.iter().filter_map(|e| e.column.as_deref()).collect()
    }

    pub fn is_partial(&self) -> bool {
        self.predicate.is_some()
    }

    /// Whether any key element is an expression rather than a column
    pub fn has_expressions(&self) -> bool {
        self.elements.iter().any(|e| e.column.is_none())
    }
}
