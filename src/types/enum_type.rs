/// Enumerated types
use super::{QualifiedName, TypeRef};
use crate::diagnostic::Location;
use serde::{Deserialize, Serialize};

/// Client binding metadata attached with `PRAGMA (...)`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EnumPragma {
    /// Client-side class the type maps to (`CLASS 'pkg.Mood'`)
    pub class_name: Option<String>,
    /// Storage type of the values (`DATA TYPE text`)
    pub data_type: Option<TypeRef>,
    /// Attribute of the class holding the values (`ATTRIBUTE 'moods'`)
    pub attribute: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumType {
    pub name: QualifiedName,
    /// Labels in declaration order; the order defines comparison order
    pub labels: Vec<String>,
    pub pragma: Option<EnumPragma>,
    pub location: Location,
}

impl EnumType {
    /// Position of `label` in the declared order
    pub fn ordinal(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.ordinal(label).is_some()
    }
}
