/// Schema catalog for read-only traversal of parsed DDL
use crate::error::{ObjectKind, Result};
use crate::types::{Constraint, EnumType, Function, Index, PreparedStatement, Procedure, QualifiedName, TableLike};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One namespace of the catalog.
///
/// Tables, views and enum types share a namespace; functions and procedures
/// are grouped by name with one entry per overload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    name: String,
    /// Enum name -> EnumType
    enums: IndexMap<String, EnumType>,
    /// Table or view name -> TableLike
    tables: IndexMap<String, TableLike>,
    /// Function name -> overloads
    functions: IndexMap<String, Vec<Function>>,
    /// Procedure name -> overloads
    procedures: IndexMap<String, Vec<Procedure>>,
    /// Statement name -> PreparedStatement
    prepared: IndexMap<String, PreparedStatement>,
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn enum_type(&self, name: &str) -> Option<&EnumType> {
        self.enums.get(name)
    }

    pub fn enums(&self) -> impl Iterator<Item = &EnumType> {
        self.enums.values()
    }

    /// Table or view
    pub fn table(&self, name: &str) -> Option<&TableLike> {
        self.tables.get(name)
    }

    /// Tables and views in declaration order
    pub fn tables(&self) -> impl Iterator<Item = &TableLike> {
        self.tables.values()
    }

    pub fn views(&self) -> impl Iterator<Item = &TableLike> {
        self.tables.values().filter(|t| t.is_view())
    }

    /// All overloads of a function
    pub fn functions(&self, name: &str) -> &[Function] {
        self.functions.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn all_functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.values().flatten()
    }

    /// First declared overload of a procedure
    pub fn procedure(&self, name: &str) -> Option<&Procedure> {
        self.procedures.get(name).and_then(|p| p.first())
    }

    pub fn procedures(&self, name: &str) -> &[Procedure] {
        self.procedures.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn all_procedures(&self) -> impl Iterator<Item = &Procedure> {
        self.procedures.values().flatten()
    }

    pub fn prepared(&self, name: &str) -> Option<&PreparedStatement> {
        self.prepared.get(name)
    }

    pub fn prepared_statements(&self) -> impl Iterator<Item = &PreparedStatement> {
        self.prepared.values()
    }

    pub fn is_empty(&self) -> bool {
        self.enums.is_empty()
            && self.tables.is_empty()
            && self.functions.is_empty()
            && self.procedures.is_empty()
            && self.prepared.is_empty()
    }

    /// Kind of the table, view or enum type already using `name`
    pub(crate) fn relation_kind(&self, name: &str) -> Option<ObjectKind> {
        if self.enums.contains_key(name) {
            return Some(ObjectKind::Type);
        }
        self.tables.get(name).map(|t| if t.is_view() { ObjectKind::View } else { ObjectKind::Table })
    }

    pub(crate) fn insert_enum(&mut self, enum_type: EnumType) {
        self.enums.insert(enum_type.name.name.clone(), enum_type);
    }

    /// Insert or replace; a replaced entry keeps its position
    pub(crate) fn insert_table(&mut self, table: TableLike) {
        self.tables.insert(table.name.name.clone(), table);
    }

    pub(crate) fn table_mut(&mut self, name: &str) -> Option<&mut TableLike> {
        self.tables.get_mut(name)
    }

    pub(crate) fn functions_mut(&mut self, name: &str) -> &mut Vec<Function> {
        self.functions.entry(name.to_string()).or_default()
    }

    pub(crate) fn procedures_mut(&mut self, name: &str) -> &mut Vec<Procedure> {
        self.procedures.entry(name.to_string()).or_default()
    }

    pub(crate) fn insert_prepared(&mut self, statement: PreparedStatement) {
        self.prepared.insert(statement.name.name.clone(), statement);
    }
}

/// Immutable result of a catalog build
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaCatalog {
    default_schema: String,
    /// Schema name -> Schema, in first-seen order
    schemas: IndexMap<String, Schema>,
    /// Tables and views across all schemas, in declaration order
    table_order: Vec<QualifiedName>,
}

impl SchemaCatalog {
    pub fn new(default_schema: impl Into<String>) -> Self {
        Self {
            default_schema: default_schema.into(),
            ..Default::default()
        }
    }

    /// Schema that received unqualified names
    pub fn default_schema(&self) -> &str {
        &self.default_schema
    }

    pub fn schema(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(name)
    }

    pub fn schemas(&self) -> impl Iterator<Item = &Schema> {
        self.schemas.values()
    }

    pub fn table(&self, name: &QualifiedName) -> Option<&TableLike> {
        self.schema(&name.schema)?.table(&name.name)
    }

    /// Look a table up by `schema.name` or bare name (default schema)
    pub fn find_table(&self, name: &str) -> Option<&TableLike> {
        self.table(&QualifiedName::parse(name, &self.default_schema))
    }

    pub fn enum_type(&self, name: &QualifiedName) -> Option<&EnumType> {
        self.schema(&name.schema)?.enum_type(&name.name)
    }

    pub fn functions(&self, name: &QualifiedName) -> &[Function] {
        self.schema(&name.schema).map(|s| s.functions(&name.name)).unwrap_or(&[])
    }

    pub fn procedure(&self, name: &QualifiedName) -> Option<&Procedure> {
        self.schema(&name.schema)?.procedure(&name.name)
    }

    pub fn prepared(&self, name: &QualifiedName) -> Option<&PreparedStatement> {
        self.schema(&name.schema)?.prepared(&name.name)
    }

    /// Tables and views of every schema, in declaration order
    pub fn tables(&self) -> impl Iterator<Item = &TableLike> {
        self.table_order.iter().filter_map(|name| self.table(name))
    }

    /// Every constraint with its owning table, in declaration order
    pub fn constraints(&self) -> impl Iterator<Item = (&TableLike, &Constraint)> {
        self.tables().flat_map(|t| t.constraints.iter().map(move |c| (t, c)))
    }

    /// Every index with its owning table, in declaration order
    pub fn indexes(&self) -> impl Iterator<Item = (&TableLike, &Index)> {
        self.tables().flat_map(|t| t.indexes.iter().map(move |i| (t, i)))
    }

    pub fn enums(&self) -> impl Iterator<Item = &EnumType> {
        self.schemas.values().flat_map(|s| s.enums())
    }

    /// Encode the catalog with bincode
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub(crate) fn has_schema(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Get or create a schema
    pub(crate) fn ensure_schema(&mut self, name: &str) -> &mut Schema {
        self.schemas
            .entry(name.to_string())
            .or_insert_with(|| Schema::new(name))
    }

    pub(crate) fn schema_mut(&mut self, name: &str) -> Option<&mut Schema> {
        self.schemas.get_mut(name)
    }

    pub(crate) fn table_mut(&mut self, name: &QualifiedName) -> Option<&mut TableLike> {
        self.schema_mut(&name.schema)?.table_mut(&name.name)
    }

    /// Register a table or view, replacing one of the same name in place
    pub(crate) fn insert_table(&mut self, table: TableLike) {
        let name = table.name.clone();
        let replaced = self.table(&name).is_some();
        self.ensure_schema(&name.schema).insert_table(table);
        if !replaced {
            self.table_order.push(name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Location;
    use crate::types::TableKind;

    fn table(schema: &str, name: &str) -> TableLike {
        TableLike {
            name: QualifiedName::new(schema, name),
            kind: TableKind::Table,
            columns: Vec::new(),
            constraints: Vec::new(),
            indexes: Vec::new(),
            temporary: false,
            unlogged: false,
            on_commit: None,
            definition: None,
            ddl: format!("CREATE TABLE {}.{} ()", schema, name),
            location: Location::new("t.sql", 0, 1, 1),
        }
    }

    #[test]
    fn test_tables_in_declaration_order() {
        let mut catalog = SchemaCatalog::new("public");
        catalog.insert_table(table("b", "one"));
        catalog.insert_table(table("a", "two"));
        catalog.insert_table(table("b", "three"));

        let names: Vec<String> = catalog.tables().map(|t| t.name.to_string()).collect();
        assert_eq!(names, vec!["b.one", "a.two", "b.three"]);
        let schemas: Vec<&str> = catalog.schemas().map(|s| s.name()).collect();
        assert_eq!(schemas, vec!["b", "a"]);
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut catalog = SchemaCatalog::new("public");
        catalog.insert_table(table("public", "one"));
        catalog.insert_table(table("public", "two"));
        let mut replacement = table("public", "one");
        replacement.ddl = "replaced".into();
        catalog.insert_table(replacement);

        let tables: Vec<&TableLike> = catalog.tables().collect();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].ddl, "replaced");
        assert_eq!(catalog.find_table("one").unwrap().ddl, "replaced");
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut catalog = SchemaCatalog::new("public");
        catalog.insert_table(table("public", "users"));
        let bytes = catalog.to_bytes().unwrap();
        let decoded = SchemaCatalog::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, catalog);
        assert!(catalog.to_json().unwrap().contains("\"users\""));
    }

    #[test]
    fn test_corrupt_snapshot() {
        let err = SchemaCatalog::from_bytes(&[0xff, 0x01]).unwrap_err();
        assert!(matches!(err, crate::error::DdlError::Snapshot(_)));
    }
}
