//! pgddl
//!
//! PostgreSQL DDL parser that builds a read-only schema catalog for ORM
//! mapping, code generation and prepared-statement tooling.
//!
//! ## Architecture
//! - sql: lexer, statement splitter, statement / type / expression parsers
//! - catalog: two-phase builder (accumulate, finalize) and the immutable
//!   `SchemaCatalog` it produces
//! - types: catalog entities (tables, columns, constraints, indexes,
//!   enums, routines, prepared statements)
//!
//! ## Example
//! ```
//! let catalog = pgddl::parse_sql(
//!     "CREATE TABLE b (id int PRIMARY KEY, a_id int REFERENCES a(id));
//!      CREATE TABLE a (id int PRIMARY KEY);",
//! )
//! .unwrap();
//! let b = catalog.find_table("b").unwrap();
//! assert_eq!(b.foreign_keys().count(), 1);
//! ```

pub mod catalog;
pub mod config;
pub mod diagnostic;
pub mod error;
pub mod sql;
pub mod types;

use rayon::prelude::*;

pub use catalog::{CatalogBuilder, PendingReference, Schema, SchemaCatalog};
pub use config::{CatalogConfig, NamingConvention};
pub use diagnostic::{Location, SourceMap};
pub use error::{DdlError, ObjectKind, Result};
pub use sql::{parse_source, parse_statement, ParsedStatement, Statement};

/// One named source text, typically the contents of a `.sql` file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub name: String,
    pub text: String,
}

impl Source {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// Build a catalog from one source text with the default configuration
pub fn parse_sql(text: &str) -> Result<SchemaCatalog> {
    let mut builder = CatalogBuilder::default();
    builder.add_source(diagnostic::ANONYMOUS_SOURCE, text)?;
    builder.finish()
}

/// Build one catalog from several source texts.
///
/// Sources are tokenized and parsed in parallel, then accumulated one after
/// another in the order given, so a foreign key in an early source may refer
/// to a table declared in a later one. The first source that fails to parse
/// or accumulate aborts the build.
pub fn parse_sources(sources: &[Source], config: CatalogConfig) -> Result<SchemaCatalog> {
    let parsed: Vec<Result<Vec<ParsedStatement>>> = sources
        .par_iter()
        .map(|source| parse_source(&source.text, &source.name))
        .collect();

    let mut builder = CatalogBuilder::new(config);
    for (source, statements) in sources.iter().zip(parsed) {
        builder.add_parsed(&source.name, &source.text, statements?)?;
    }
    builder.finish()
}
