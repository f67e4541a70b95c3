//! Catalog build configuration
//!
//! Controls how unqualified names are placed, how constraint and index names
//! are generated, and which extra base types a caller wants accepted.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Templates used to name constraints and indexes declared without a name.
///
/// `{table}` expands to the owning table name and `{columns}` to the column
/// list joined with `_`. The defaults match PostgreSQL's own choices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConvention {
    pub primary_key: String,
    pub unique: String,
    pub foreign_key: String,
    pub check: String,
    pub exclusion: String,
    pub index: String,
}

impl Default for NamingConvention {
    fn default() -> Self {
        Self {
            primary_key: "{table}_pkey".to_string(),
            unique: "{table}_{columns}_key".to_string(),
            foreign_key: "{table}_{columns}_fkey".to_string(),
            check: "{table}_{columns}_check".to_string(),
            exclusion: "{table}_{columns}_excl".to_string(),
            index: "{table}_{columns}_idx".to_string(),
        }
    }
}

/// Catalog builder configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Schema that receives objects declared without a schema qualifier
    pub default_schema: String,

    /// Generated-name templates
    pub naming: NamingConvention,

    /// Base type names accepted in addition to the built-in PostgreSQL types
    /// (for example `box`, `geometry` or `ltree`)
    pub extra_types: Vec<String>,

    /// Allow at most one `CREATE SCHEMA` per source text and require every
    /// schema-qualified object in that text to belong to it
    pub single_schema_per_source: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            default_schema: "public".to_string(),
            naming: NamingConvention::default(),
            extra_types: Vec::new(),
            single_schema_per_source: false,
        }
    }
}

impl CatalogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the schema used for unqualified names
    pub fn with_default_schema(mut self, schema: impl Into<String>) -> Self {
        self.default_schema = schema.into();
        self
    }

    /// Replace the generated-name templates
    pub fn with_naming(mut self, naming: NamingConvention) -> Self {
        self.naming = naming;
        self
    }

    /// Accept an additional base type name
    pub fn with_extra_type(mut self, name: impl Into<String>) -> Self {
        self.extra_types.push(name.into().to_lowercase());
        self
    }

    pub fn with_single_schema_per_source(mut self, enabled: bool) -> Self {
        self.single_schema_per_source = enabled;
        self
    }

    /// Load a configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CatalogConfig::default();
        assert_eq!(config.default_schema, "public");
        assert_eq!(config.naming.primary_key, "{table}_pkey");
        assert!(!config.single_schema_per_source);
    }

    #[test]
    fn test_builder_methods() {
        let config = CatalogConfig::new()
            .with_default_schema("app")
            .with_extra_type("BOX")
            .with_single_schema_per_source(true);
        assert_eq!(config.default_schema, "app");
        assert_eq!(config.extra_types, vec!["box".to_string()]);
        assert!(config.single_schema_per_source);
    }

    #[test]
    fn test_from_json_partial() {
        let config =
            CatalogConfig::from_json(r#"{"default_schema": "app", "naming": {"index": "ix_{table}_{columns}"}}"#)
                .unwrap();
        assert_eq!(config.default_schema, "app");
        assert_eq!(config.naming.index, "ix_{table}_{columns}");
        assert_eq!(config.naming.unique, "{table}_{columns}_key");
        assert!(config.extra_types.is_empty());
    }

    #[test]
    fn test_json_round_trip() {
        let config = CatalogConfig::new().with_extra_type("ltree");
        let json = config.to_json().unwrap();
        assert_eq!(CatalogConfig::from_json(&json).unwrap(), config);
    }
}
