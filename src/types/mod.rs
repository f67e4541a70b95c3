//! Catalog entities produced from parsed DDL

mod constraint;
mod data_type;
mod enum_type;
mod expression;
mod index;
mod name;
mod routine;
mod table;

pub use constraint::{
    Constraint, ConstraintKind, Exclusion, ExclusionElement, ForeignKey, MatchType, ReferentialAction,
};
pub use data_type::{is_builtin_type, TypeRef};
pub use enum_type::{EnumPragma, EnumType};
pub use expression::{Expression, Literal, Sentinel};
pub use index::{Index, IndexElement, NullsOrder, SortOrder};
pub use name::QualifiedName;
pub use routine::{
    BodyKind, Function, Parameter, ParameterMode, PreparedParameters, PreparedStatement, Procedure, Returns,
    Routine, RoutineBody, Volatility,
};
pub use table::{
    Column, GeneratedColumn, GeneratedStorage, Identity, IdentityKind, OnCommit, TableKind, TableLike,
};
