/// Functions, procedures and prepared statements
use super::{Expression, QualifiedName, TypeRef};
use crate::diagnostic::Location;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterMode {
    In,
    Out,
    InOut,
    Variadic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub mode: ParameterMode,
    pub name: Option<String>,
    pub data_type: TypeRef,
    pub default: Option<Expression>,
}

impl Parameter {
    /// Whether the caller passes this parameter
    pub fn is_input(&self) -> bool {
        !matches!(self.mode, ParameterMode::Out)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Returns {
    Scalar(TypeRef),
    SetOf(TypeRef),
    /// `RETURNS TABLE (name type, ...)`
    Table(Vec<(String, TypeRef)>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Volatility {
    Immutable,
    Stable,
    Volatile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyKind {
    /// `$tag$ ... $tag$`, tag empty for `$$`
    DollarQuoted { tag: String },
    /// `AS '...'`
    StringLiteral,
    /// `RETURN expr`
    SqlStandard,
}

/// Routine body, never re-parsed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutineBody {
    pub kind: BodyKind,
    /// Body content without delimiters
    pub text: String,
    /// Body exactly as written, delimiters included
    pub source: String,
}

/// Attributes shared by functions and procedures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Routine {
    pub name: QualifiedName,
    pub parameters: Vec<Parameter>,
    pub language: Option<String>,
    pub body: RoutineBody,
    pub security_definer: bool,
    pub or_replace: bool,
    /// Full statement text, verbatim
    pub ddl: String,
    pub location: Location,
}

impl Routine {
    /// Types of the input parameters, which identify an overload
    pub fn signature(&self) -> Vec<TypeRef> {
        self.parameters
            .iter()
            .filter(|p| p.is_input())
            .map(|p| p.data_type.clone())
            .collect()
    }

    pub fn parameter_types(&self) -> Vec<&TypeRef> {
        self.parameters.iter().map(|p| &p.data_type).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub routine: Routine,
    /// `None` when no `RETURNS` clause was written; results then come from
    /// OUT parameters, if any
    pub returns: Option<Returns>,
    pub volatility: Option<Volatility>,
    pub strict: bool,
    pub leakproof: bool,
    pub parallel: Option<String>,
    pub cost: Option<String>,
    pub rows: Option<String>,
}

impl Function {
    pub fn name(&self) -> &QualifiedName {
        &self.routine.name
    }

    pub fn returns_set(&self) -> bool {
        matches!(self.returns, Some(Returns::SetOf(_)) | Some(Returns::Table(_)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Procedure {
    pub routine: Routine,
}

impl Procedure {
    pub fn name(&self) -> &QualifiedName {
        &self.routine.name
    }

    /// `CALL` statement with one named placeholder per input parameter.
    ///
    /// The schema is written only when it differs from `default_schema`.
    pub fn call_statement(&self, default_schema: &str) -> String {
        let args = (0..self.routine.parameters.iter().filter(|p| p.is_input()).count())
            .map(|i| format!(":arg{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let name = &self.routine.name;
        if name.schema == default_schema {
            format!("CALL {}({})", name.name, args)
        } else {
            format!("CALL {}({})", name, args)
        }
    }
}

/// Placeholders used by a prepared statement; never a mix of both styles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreparedParameters {
    None,
    /// `:name` placeholders in first-appearance order, without repeats
    Named(Vec<String>),
    /// `$n` placeholder numbers in first-appearance order, without repeats
    Positional(Vec<u32>),
}

impl PreparedParameters {
    pub fn len(&self) -> usize {
        match self {
            PreparedParameters::None => 0,
            PreparedParameters::Named(names) => names.len(),
            PreparedParameters::Positional(numbers) => numbers.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedStatement {
    pub name: QualifiedName,
    /// Types declared in `PREPARE name (type, ...)`
    pub parameter_types: Vec<TypeRef>,
    pub parameters: PreparedParameters,
    /// Query text after `AS`, verbatim
    pub body: String,
    pub location: Location,
}

impl fmt::Display for PreparedStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.body)
    }
}
