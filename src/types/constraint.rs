/// Table constraints
use super::{Expression, QualifiedName};
use crate::diagnostic::Location;
use serde::{Deserialize, Serialize};
use std::fmt;

/// `ON UPDATE` / `ON DELETE` action of a foreign key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferentialAction {
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

impl fmt::Display for ReferentialAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ReferentialAction::NoAction => "NO ACTION",
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::SetDefault => "SET DEFAULT",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchType {
    Simple,
    Full,
    Partial,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub referenced_table: QualifiedName,
    /// Referenced columns; empty in the source means the target's primary
    /// key, filled in once the target is known
    pub referenced_columns: Vec<String>,
    pub on_update: Option<ReferentialAction>,
    pub on_delete: Option<ReferentialAction>,
    pub match_type: Option<MatchType>,
    pub deferrable: bool,
    pub initially_deferred: bool,
    /// Set when the referenced table was declared after this key, or forced
    /// with `PRAGMA (use_alter)`; such keys must be created with ALTER TABLE
    pub use_alter: bool,
    /// Whether the reference was checked against the catalog
    pub resolved: bool,
}

/// One `expression WITH operator` element of an exclusion constraint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExclusionElement {
    pub expression: Expression,
    /// Column name when the expression is a bare column
    pub column: Option<String>,
    pub operator: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exclusion {
    /// Access method (`USING gist`)
    pub using: Option<String>,
    pub elements: Vec<ExclusionElement>,
    pub predicate: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConstraintKind {
    PrimaryKey,
    Unique { nulls_not_distinct: bool },
    Check { expression: Expression },
    ForeignKey(ForeignKey),
    Exclusion(Exclusion),
}

impl ConstraintKind {
    pub fn label(&self) -> &'static str {
        match self {
            ConstraintKind::PrimaryKey => "primary key",
            ConstraintKind::Unique { .. } => "unique",
            ConstraintKind::Check { .. } => "check",
            ConstraintKind::ForeignKey(_) => "foreign key",
            ConstraintKind::Exclusion(_) => "exclusion",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    /// Declared name, or the generated one
    pub name: String,
    pub explicit_name: bool,
    /// Constrained columns; inline constraints name only their own column
    pub columns: Vec<String>,
    pub kind: ConstraintKind,
    pub location: Location,
}

impl Constraint {
    pub fn foreign_key(&self) -> Option<&ForeignKey> {
        match &self.kind {
            ConstraintKind::ForeignKey(fk) => Some(fk),
            _ => None,
        }
    }

    pub fn foreign_key_mut(&mut self) -> Option<&mut ForeignKey> {
        match &mut self.kind {
            ConstraintKind::ForeignKey(fk) => Some(fk),
            _ => None,
        }
    }

    pub fn exclusion(&self) -> Option<&Exclusion> {
        match &self.kind {
            ConstraintKind::Exclusion(ex) => Some(ex),
            _ => None,
        }
    }
}
