//! Error types for the DDL parser and catalog builder

use crate::diagnostic::{Location, SourceMap};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DdlError>;

/// Kind of schema object named in duplicate-definition errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Schema,
    Type,
    Table,
    View,
    Column,
    Constraint,
    Index,
    Function,
    Procedure,
    PreparedStatement,
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ObjectKind::Schema => "schema",
            ObjectKind::Type => "type",
            ObjectKind::Table => "table",
            ObjectKind::View => "view",
            ObjectKind::Column => "column",
            ObjectKind::Constraint => "constraint",
            ObjectKind::Index => "index",
            ObjectKind::Function => "function",
            ObjectKind::Procedure => "procedure",
            ObjectKind::PreparedStatement => "prepared statement",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone)]
pub enum DdlError {
    #[error("{location}: lex error: {message}")]
    Lex { location: Location, message: String },

    #[error("{location}: unsupported statement: {construct}")]
    UnsupportedStatement { location: Location, construct: String },

    #[error("{location}: type syntax error: {message}")]
    TypeSyntax { location: Location, message: String },

    #[error("{location}: parse error: {message}")]
    Parse { location: Location, message: String },

    #[error("{location}: {kind} \"{name}\" already exists")]
    DuplicateDefinition {
        location: Location,
        kind: ObjectKind,
        name: String,
    },

    #[error("{location}: unresolved reference to {}", reference_display(.table, .column))]
    UnresolvedReference {
        location: Location,
        table: String,
        column: Option<String>,
    },

    #[error("{location}: unknown table \"{table}\"")]
    UnknownTable { location: Location, table: String },

    #[error("{location}: unknown type \"{type_name}\"")]
    UnknownType { location: Location, type_name: String },

    /// Every resolution issue collected by one catalog build
    #[error("catalog build failed with {} issue(s):\n{}", .issues.len(), issue_list(.issues))]
    Finalize { issues: Vec<DdlError> },

    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

fn reference_display(table: &str, column: &Option<String>) -> String {
    match column {
        Some(column) => format!("\"{}\".\"{}\"", table, column),
        None => format!("\"{}\"", table),
    }
}

fn issue_list(issues: &[DdlError]) -> String {
    issues
        .iter()
        .map(|issue| format!("  {}", issue))
        .collect::<Vec<_>>()
        .join("\n")
}

impl DdlError {
    /// Location of the offending token or construct, if the error has one
    pub fn location(&self) -> Option<&Location> {
        match self {
            DdlError::Lex { location, .. }
            | DdlError::UnsupportedStatement { location, .. }
            | DdlError::TypeSyntax { location, .. }
            | DdlError::Parse { location, .. }
            | DdlError::DuplicateDefinition { location, .. }
            | DdlError::UnresolvedReference { location, .. }
            | DdlError::UnknownTable { location, .. }
            | DdlError::UnknownType { location, .. } => Some(location),
            DdlError::Finalize { .. } | DdlError::Snapshot(_) => None,
        }
    }

    /// The individual issues behind this error.
    ///
    /// A `Finalize` error yields every collected issue; any other error
    /// yields itself.
    pub fn issues(&self) -> &[DdlError] {
        match self {
            DdlError::Finalize { issues } => issues,
            other => std::slice::from_ref(other),
        }
    }

    /// Render the error with the offending source line for each location
    pub fn render(&self, sources: &SourceMap) -> String {
        let mut out = String::new();
        for issue in self.issues() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&issue.to_string());
            if let Some(excerpt) = issue.location().and_then(|loc| sources.excerpt(loc)) {
                out.push('\n');
                out.push_str(&excerpt);
            }
        }
        out
    }
}

impl From<bincode::Error> for DdlError {
    fn from(err: bincode::Error) -> Self {
        DdlError::Snapshot(err.to_string())
    }
}

impl From<serde_json::Error> for DdlError {
    fn from(err: serde_json::Error) -> Self {
        DdlError::Snapshot(err.to_string())
    }
}
