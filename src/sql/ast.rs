/// Statement nodes produced by the DDL parser
///
/// Names are kept as written (`ObjectName`); the catalog builder qualifies
/// them against the default schema.
use crate::diagnostic::Location;
use crate::types::{
    Column, EnumPragma, Exclusion, Expression, IndexElement, MatchType, OnCommit, Parameter, PreparedParameters,
    QualifiedName, ReferentialAction, Returns, RoutineBody, TypeRef, Volatility,
};
use std::fmt;

/// Possibly schema-qualified object name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectName {
    pub schema: Option<String>,
    pub name: String,
}

impl ObjectName {
    pub fn new(schema: Option<String>, name: impl Into<String>) -> Self {
        Self {
            schema,
            name: name.into(),
        }
    }

    pub fn bare(name: impl Into<String>) -> Self {
        Self::new(None, name)
    }

    /// Resolve against `default_schema` when unqualified
    pub fn qualify(&self, default_schema: &str) -> QualifiedName {
        QualifiedName::new(self.schema.as_deref().unwrap_or(default_schema), self.name.clone())
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Top-level DDL statement
#[derive(Debug, Clone)]
pub enum Statement {
    CreateSchema(CreateSchemaStmt),
    CreateEnum(CreateEnumStmt),
    CreateTable(CreateTableStmt),
    CreateView(CreateViewStmt),
    CreateIndex(CreateIndexStmt),
    CreateFunction(CreateFunctionStmt),
    CreateProcedure(CreateProcedureStmt),
    Prepare(PrepareStmt),
}

impl Statement {
    /// Short name of the statement kind, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Statement::CreateSchema(_) => "CREATE SCHEMA",
            Statement::CreateEnum(_) => "CREATE TYPE",
            Statement::CreateTable(_) => "CREATE TABLE",
            Statement::CreateView(_) => "CREATE VIEW",
            Statement::CreateIndex(_) => "CREATE INDEX",
            Statement::CreateFunction(_) => "CREATE FUNCTION",
            Statement::CreateProcedure(_) => "CREATE PROCEDURE",
            Statement::Prepare(_) => "PREPARE",
        }
    }
}

/// A statement together with where it came from
#[derive(Debug, Clone)]
pub struct ParsedStatement {
    pub statement: Statement,
    /// Statement text, verbatim
    pub text: String,
    pub location: Location,
}

/// CREATE SCHEMA statement
#[derive(Debug, Clone)]
pub struct CreateSchemaStmt {
    pub name: String,
    pub if_not_exists: bool,
}

/// CREATE TYPE ... AS ENUM statement
#[derive(Debug, Clone)]
pub struct CreateEnumStmt {
    pub name: ObjectName,
    pub labels: Vec<String>,
    pub pragma: Option<EnumPragma>,
}

/// CREATE TABLE statement
#[derive(Debug, Clone)]
pub struct CreateTableStmt {
    pub name: ObjectName,
    pub if_not_exists: bool,
    pub temporary: bool,
    pub unlogged: bool,
    pub on_commit: Option<OnCommit>,
    pub columns: Vec<ColumnDef>,
    /// Inline constraints (in column order) followed by table constraints
    pub constraints: Vec<TableConstraint>,
}

/// Column definition; inline constraints are hoisted into the table's list
#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub column: Column,
    pub location: Location,
}

/// Referenced side of a foreign key, as written
#[derive(Debug, Clone)]
pub struct ReferenceDef {
    pub table: ObjectName,
    pub columns: Vec<String>,
    pub on_update: Option<ReferentialAction>,
    pub on_delete: Option<ReferentialAction>,
    pub match_type: Option<MatchType>,
    pub deferrable: bool,
    pub initially_deferred: bool,
    /// `PRAGMA (use_alter)`
    pub use_alter: bool,
}

#[derive(Debug, Clone)]
pub enum ConstraintDef {
    PrimaryKey,
    Unique { nulls_not_distinct: bool },
    Check { expression: Expression },
    ForeignKey(ReferenceDef),
    Exclusion(Exclusion),
}

/// Inline or table-level constraint
#[derive(Debug, Clone)]
pub struct TableConstraint {
    pub name: Option<String>,
    pub columns: Vec<String>,
    pub kind: ConstraintDef,
    /// Whether the constraint was written as a column modifier
    pub inline: bool,
    pub location: Location,
}

/// CREATE VIEW statement
#[derive(Debug, Clone)]
pub struct CreateViewStmt {
    pub name: ObjectName,
    pub or_replace: bool,
    pub if_not_exists: bool,
    pub temporary: bool,
    pub materialized: bool,
    pub recursive: bool,
    pub columns: Vec<String>,
    /// Query after `AS`, verbatim
    pub query: String,
}

/// CREATE INDEX statement
#[derive(Debug, Clone)]
pub struct CreateIndexStmt {
    pub name: Option<String>,
    pub if_not_exists: bool,
    pub unique: bool,
    pub concurrently: bool,
    pub only: bool,
    pub table: ObjectName,
    pub using: Option<String>,
    pub elements: Vec<IndexElement>,
    pub include: Vec<String>,
    pub nulls_not_distinct: bool,
    pub predicate: Option<Expression>,
}

/// Routine attributes in any order after the signature
#[derive(Debug, Clone, Default)]
pub struct RoutineAttributes {
    pub language: Option<String>,
    pub volatility: Option<Volatility>,
    pub strict: bool,
    pub security_definer: bool,
    pub leakproof: bool,
    pub parallel: Option<String>,
    pub cost: Option<String>,
    pub rows: Option<String>,
}

/// CREATE FUNCTION statement
#[derive(Debug, Clone)]
pub struct CreateFunctionStmt {
    pub name: ObjectName,
    pub or_replace: bool,
    pub parameters: Vec<Parameter>,
    pub returns: Option<Returns>,
    pub attributes: RoutineAttributes,
    pub body: RoutineBody,
}

/// CREATE PROCEDURE statement
#[derive(Debug, Clone)]
pub struct CreateProcedureStmt {
    pub name: ObjectName,
    pub or_replace: bool,
    pub parameters: Vec<Parameter>,
    pub attributes: RoutineAttributes,
    pub body: RoutineBody,
}

/// PREPARE statement
#[derive(Debug, Clone)]
pub struct PrepareStmt {
    pub name: ObjectName,
    pub parameter_types: Vec<TypeRef>,
    pub parameters: PreparedParameters,
    pub body: String,
}
