use pgddl::types::QualifiedName;
use pgddl::{parse_sources, CatalogBuilder, CatalogConfig, DdlError, SchemaCatalog, Source};

fn sources() -> Vec<Source> {
    vec![
        Source::new(
            "01_orders.sql",
            "CREATE SCHEMA test;
             CREATE TABLE test.orders (
                 id serial PRIMARY KEY,
                 customer_id int NOT NULL REFERENCES test.customers(id)
             );",
        ),
        Source::new(
            "02_customers.sql",
            "CREATE SCHEMA test;
             CREATE TYPE test.tier AS ENUM ('free', 'paid');
             CREATE TABLE test.customers (id serial PRIMARY KEY, tier test.tier NOT NULL DEFAULT 'free');
             CREATE INDEX customers_tier ON test.customers (tier);",
        ),
    ]
}

#[test]
fn test_schema_reentry_merges() {
    let catalog = parse_sources(&sources(), CatalogConfig::default()).unwrap();

    assert_eq!(catalog.schemas().filter(|s| s.name() == "test").count(), 1);
    let test = catalog.schema("test").unwrap();
    assert!(test.table("orders").is_some());
    assert!(test.table("customers").is_some());
    assert!(test.enum_type("tier").is_some());

    let names: Vec<String> = catalog.tables().map(|t| t.name.to_string()).collect();
    assert_eq!(names, vec!["test.orders", "test.customers"]);
}

#[test]
fn test_cross_source_forward_reference() {
    let catalog = parse_sources(&sources(), CatalogConfig::default()).unwrap();
    let orders = catalog.table(&QualifiedName::new("test", "orders")).unwrap();
    let fk = orders.foreign_keys().next().unwrap().foreign_key().unwrap();
    assert_eq!(fk.referenced_table, QualifiedName::new("test", "customers"));
    assert!(fk.resolved);
    assert!(fk.use_alter);
}

#[test]
fn test_source_order_matters_only_for_use_alter() {
    let mut reversed = sources();
    reversed.reverse();
    let catalog = parse_sources(&reversed, CatalogConfig::default()).unwrap();
    let orders = catalog.table(&QualifiedName::new("test", "orders")).unwrap();
    let fk = orders.foreign_keys().next().unwrap().foreign_key().unwrap();
    assert!(fk.resolved);
    assert!(!fk.use_alter);
}

#[test]
fn test_failing_source_reports_its_location() {
    let mut all = sources();
    all.push(Source::new("03_broken.sql", "CREATE TABLE test.broken (\n  id int,\n  id text\n);"));
    let err = parse_sources(&all, CatalogConfig::default()).unwrap_err();
    match &err {
        DdlError::DuplicateDefinition { location, name, .. } => {
            assert_eq!(location.source, "03_broken.sql");
            assert_eq!(location.line, 3);
            assert_eq!(name, "test.broken.id");
        }
        _ => panic!("Expected DuplicateDefinition"),
    }
}

#[test]
fn test_render_includes_source_line() {
    let mut builder = CatalogBuilder::default();
    builder.add_source("types.sql", "CREATE TABLE t (\n  id int,\n  shape hexagon\n);").unwrap();
    let sources = builder.source_map().clone();
    let err = builder.finish().unwrap_err();

    let rendered = err.render(&sources);
    assert!(rendered.contains("types.sql:3:3: unknown type \"hexagon\""));
    assert!(rendered.contains("  shape hexagon"));
}

#[test]
fn test_single_schema_per_source_config() {
    let config = CatalogConfig::from_json(r#"{"single_schema_per_source": true}"#).unwrap();
    let ok = parse_sources(&sources(), config.clone());
    assert!(ok.is_ok());

    let mixed = vec![Source::new(
        "mixed.sql",
        "CREATE SCHEMA test; CREATE TABLE other.t (id int);",
    )];
    assert!(matches!(parse_sources(&mixed, config), Err(DdlError::Parse { .. })));
}

#[test]
fn test_default_schema_config() {
    let config = CatalogConfig::new().with_default_schema("app");
    let catalog = parse_sources(&[Source::new("a.sql", "CREATE TABLE t (id int);")], config).unwrap();
    assert_eq!(catalog.default_schema(), "app");
    assert!(catalog.find_table("t").is_some());
    assert!(catalog.find_table("app.t").is_some());
    assert!(catalog.schema("public").is_none());
}

#[test]
fn test_snapshot_round_trip() {
    let catalog = parse_sources(&sources(), CatalogConfig::default()).unwrap();
    let bytes = catalog.to_bytes().unwrap();
    let restored = SchemaCatalog::from_bytes(&bytes).unwrap();
    assert_eq!(restored, catalog);

    let json = catalog.to_json().unwrap();
    assert!(json.contains("\"customers\""));
    assert!(json.contains("\"paid\""));
}
