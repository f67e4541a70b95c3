/// Tables, views and their columns
use super::{Constraint, ConstraintKind, Expression, Index, QualifiedName, TypeRef};
use crate::diagnostic::Location;
use serde::{Deserialize, Serialize};

/// Whether a `TableLike` is a base table or a view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableKind {
    Table,
    View { materialized: bool, recursive: bool },
}

/// `ON COMMIT` behaviour of a temporary table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OnCommit {
    PreserveRows,
    DeleteRows,
    Drop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeneratedStorage {
    Stored,
    Virtual,
}

/// `GENERATED ALWAYS AS (expr) STORED|VIRTUAL`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedColumn {
    pub expression: Expression,
    pub storage: GeneratedStorage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentityKind {
    Always,
    ByDefault,
}

/// `GENERATED ALWAYS|BY DEFAULT AS IDENTITY [(sequence options)]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub kind: IdentityKind,
    /// Sequence options as written, without the parentheses
    pub options: Option<String>,
}

/// Column definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Secondary access name (`name type AS alias`)
    pub alias: Option<String>,
    /// Declared type; view columns have none
    pub data_type: Option<TypeRef>,
    /// Enum the type resolved to, filled by the catalog builder
    pub enum_type: Option<QualifiedName>,
    pub nullable: bool,
    pub default: Option<Expression>,
    pub generated: Option<GeneratedColumn>,
    pub identity: Option<Identity>,
    pub collation: Option<String>,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: Option<TypeRef>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            data_type,
            enum_type: None,
            nullable: true,
            default: None,
            generated: None,
            identity: None,
            collation: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Whether the database computes the value (generated or identity)
    pub fn is_computed(&self) -> bool {
        self.generated.is_some() || self.identity.is_some()
    }

    /// Name clients should use to access the column
    pub fn access_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// A table or view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableLike {
    pub name: QualifiedName,
    pub kind: TableKind,
    /// Columns in declaration order
    pub columns: Vec<Column>,
    /// Constraints in declaration order, inline ones first per column
    pub constraints: Vec<Constraint>,
    /// Indexes in declaration order
    pub indexes: Vec<Index>,
    pub temporary: bool,
    pub unlogged: bool,
    pub on_commit: Option<OnCommit>,
    /// View query, verbatim
    pub definition: Option<String>,
    /// Full statement text, verbatim
    pub ddl: String,
    pub location: Location,
}

impl TableLike {
    pub fn is_view(&self) -> bool {
        matches!(self.kind, TableKind::View { .. })
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn constraint(&self, name: &str) -> Option<&Constraint> {
        self.constraints.iter().find(|c| c.name == name)
    }

    pub fn index(&self, name: &str) -> Option<&Index> {
        self.indexes.iter().find(|i| i.name == name)
    }

    pub fn primary_key(&self) -> Option<&Constraint> {
        self.constraints
            .iter()
            .find(|c| matches!(c.kind, ConstraintKind::PrimaryKey))
    }

    /// Primary key columns, empty when the table has none
    pub fn primary_key_columns(&self) -> &[String] {
        self.primary_key().map(|pk| pk.columns.as_slice()).unwrap_or(&[])
    }

    pub fn foreign_keys(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints
            .iter()
            .filter(|c| matches!(c.kind, ConstraintKind::ForeignKey(_)))
    }
}
