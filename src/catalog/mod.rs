/// Schema catalog
///
/// - `registry`: the immutable `SchemaCatalog` and its `Schema` namespaces
/// - `builder`: two-phase (accumulate, finalize) construction from parsed DDL
/// - `naming`: generated constraint and index names

pub mod builder;
pub mod naming;
pub mod registry;

pub use builder::{CatalogBuilder, PendingReference};
pub use registry::{Schema, SchemaCatalog};
