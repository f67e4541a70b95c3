use pgddl::sql::{split_sql, Lexer, TokenType};
use pgddl::types::{BodyKind, ConstraintKind, Literal, PreparedParameters, QualifiedName, Sentinel, TypeRef};
use pgddl::{parse_sql, DdlError};

const SUBSCRIPTIONS: &str = r#"
CREATE TYPE subscription_type AS ENUM ('trial', 'license', 'enterprise');

CREATE TABLE subscription (
    id bigserial PRIMARY KEY,
    account_id bigint NOT NULL,
    subscription_type subscription_type NOT NULL DEFAULT 'trial',
    active tstzrange NOT NULL,
    tags text[] NOT NULL DEFAULT '{}',
    allowed_tags text[],
    scores double precision[6],
    grid float[][],
    created_at timestamptz NOT NULL DEFAULT now(),
    CHECK (tags = ANY(allowed_tags)),
    EXCLUDE USING gist (account_id WITH =, active WITH &&) WHERE (subscription_type = 'license')
);
"#;

#[test]
fn test_routine_body_is_verbatim() {
    let sql = "CREATE FUNCTION add(a int, b int) RETURNS int LANGUAGE sql IMMUTABLE AS $fn$\n  SELECT a + b; -- sum\n$fn$;";
    let catalog = parse_sql(sql).unwrap();
    let function = &catalog.functions(&QualifiedName::new("public", "add"))[0];
    let body = &function.routine.body;

    assert_eq!(body.kind, BodyKind::DollarQuoted { tag: "fn".into() });
    assert_eq!(body.source, "$fn$\n  SELECT a + b; -- sum\n$fn$");
    assert!(function.routine.ddl.contains(&body.source));

    let tokens = Lexer::new(&body.source).tokenize().unwrap();
    assert_eq!(tokens.len(), 2);
    match &tokens[0].token_type {
        TokenType::DollarQuoted { tag, body: text } => {
            assert_eq!(tag, "fn");
            assert_eq!(text, &body.text);
        }
        _ => panic!("Expected DollarQuoted"),
    }
}

#[test]
fn test_enum_labels_keep_declared_order() {
    let catalog = parse_sql("CREATE TYPE t AS ENUM ('c', 'a', 'b', 'a');").unwrap();
    let t = catalog.enum_type(&QualifiedName::new("public", "t")).unwrap();
    assert_eq!(t.labels, vec!["c", "a", "b", "a"]);
}

#[test]
fn test_forward_reference_resolves_at_finalize() {
    let catalog = parse_sql(
        "CREATE TABLE b (id serial PRIMARY KEY, a_id int NOT NULL REFERENCES a(id) ON DELETE CASCADE);
         CREATE TABLE a (id serial PRIMARY KEY);",
    )
    .unwrap();

    let b = catalog.find_table("b").unwrap();
    let fk = b.foreign_keys().next().unwrap().foreign_key().unwrap();
    assert_eq!(fk.referenced_table, QualifiedName::new("public", "a"));
    assert_eq!(fk.referenced_columns, vec!["id".to_string()]);
    assert!(fk.resolved);
    assert!(fk.use_alter);
}

#[test]
fn test_unresolved_reference_names_target() {
    let err = parse_sql("CREATE TABLE b (a_id int REFERENCES a(id));").unwrap_err();
    match &err {
        DdlError::Finalize { issues } => {
            assert_eq!(issues.len(), 1);
            match &issues[0] {
                DdlError::UnresolvedReference { table, location, .. } => {
                    assert_eq!(table, "public.a");
                    assert_eq!(location.line, 1);
                }
                _ => panic!("Expected UnresolvedReference"),
            }
        }
        _ => panic!("Expected Finalize"),
    }
    assert!(err.to_string().contains("\"public.a\""));
}

#[test]
fn test_array_dimensions_on_columns() {
    let catalog = parse_sql(SUBSCRIPTIONS).unwrap();
    let table = catalog.find_table("subscription").unwrap();
    let type_of = |name: &str| table.column(name).unwrap().data_type.clone().unwrap();

    assert_eq!(type_of("tags"), TypeRef::new("text").with_array_dims(vec![None]));
    assert_eq!(type_of("scores"), TypeRef::new("double precision").with_array_dims(vec![Some(6)]));
    assert_eq!(type_of("grid").name, "float");
    assert_eq!(type_of("grid").dimensions(), 2);
}

#[test]
fn test_exclusion_constraint_with_predicate() {
    let catalog = parse_sql(SUBSCRIPTIONS).unwrap();
    let table = catalog.find_table("subscription").unwrap();
    let exclusions: Vec<_> = table.constraints.iter().filter_map(|c| c.exclusion()).collect();
    assert_eq!(exclusions.len(), 1);

    let exclusion = exclusions[0];
    assert_eq!(exclusion.using.as_deref(), Some("gist"));
    let pairs: Vec<(&str, &str)> = exclusion
        .elements
        .iter()
        .map(|e| (e.expression.text.as_str(), e.operator.as_str()))
        .collect();
    assert_eq!(pairs, vec![("account_id", "="), ("active", "&&")]);
    assert_eq!(exclusion.predicate.as_ref().unwrap().text, "subscription_type = 'license'");
    assert!(table.constraint("subscription_account_id_active_excl").is_some());
}

#[test]
fn test_check_and_defaults_are_recorded() {
    let catalog = parse_sql(SUBSCRIPTIONS).unwrap();
    let table = catalog.find_table("subscription").unwrap();

    let check = table
        .constraints
        .iter()
        .find(|c| matches!(c.kind, ConstraintKind::Check { .. }))
        .unwrap();
    assert_eq!(check.columns, vec!["tags", "allowed_tags"]);
    match &check.kind {
        ConstraintKind::Check { expression } => assert_eq!(expression.text, "tags = ANY(allowed_tags)"),
        _ => panic!("Expected Check"),
    }

    let kind = table.column("subscription_type").unwrap();
    assert_eq!(kind.enum_type, Some(QualifiedName::new("public", "subscription_type")));
    assert_eq!(kind.default.as_ref().unwrap().literal, Some(Literal::String("trial".into())));
    let created = table.column("created_at").unwrap();
    assert_eq!(created.default.as_ref().unwrap().literal, Some(Literal::Sentinel(Sentinel::CurrentTimestamp)));
    assert!(table.column("tags").unwrap().default.as_ref().unwrap().literal.is_some());
}

#[test]
fn test_dollar_quoted_body_is_one_statement() {
    let sql = "CREATE FUNCTION f() RETURNS void LANGUAGE plpgsql AS $$ BEGIN PERFORM 1; PERFORM 2; END $$;\nSELECT 1;";
    let statements = split_sql(sql, "f.sql").unwrap();
    assert_eq!(statements.len(), 2);
    assert!(statements[0].text(sql).ends_with("END $$"));
    assert_eq!(statements[1].text(sql), "SELECT 1");
}

#[test]
fn test_prepared_statement_parameters() {
    let catalog = parse_sql(
        "PREPARE by_owner AS SELECT * FROM pet WHERE owner = :owner AND kind = :kind OR owner = :owner;
         PREPARE by_id (int) AS SELECT * FROM pet WHERE id = $1;",
    )
    .unwrap();
    let by_owner = catalog.prepared(&QualifiedName::new("public", "by_owner")).unwrap();
    assert_eq!(by_owner.parameters, PreparedParameters::Named(vec!["owner".into(), "kind".into()]));
    assert_eq!(by_owner.body, "SELECT * FROM pet WHERE owner = :owner AND kind = :kind OR owner = :owner");

    let by_id = catalog.prepared(&QualifiedName::new("public", "by_id")).unwrap();
    assert_eq!(by_id.parameters, PreparedParameters::Positional(vec![1]));
    assert_eq!(by_id.parameter_types, vec![TypeRef::new("int")]);
}

#[test]
fn test_mixed_placeholders_rejected() {
    let err = parse_sql("PREPARE q AS SELECT * FROM t WHERE a = :a AND b = $1;").unwrap_err();
    assert!(matches!(err, DdlError::Parse { .. }));
}

#[test]
fn test_unsupported_statement_names_construct() {
    let err = parse_sql("CREATE TABLE t (id int);\nDROP TABLE t;").unwrap_err();
    match err {
        DdlError::UnsupportedStatement { construct, location } => {
            assert_eq!(construct, "DROP TABLE");
            assert_eq!(location.line, 2);
        }
        _ => panic!("Expected UnsupportedStatement"),
    }
}

#[test]
fn test_lex_error_aborts() {
    let err = parse_sql("CREATE TABLE t (name text DEFAULT 'open);").unwrap_err();
    assert!(matches!(err, DdlError::Lex { .. }));
}

#[test]
fn test_indexes_in_declaration_order() {
    let catalog = parse_sql(
        "CREATE TABLE users (id int PRIMARY KEY, email text, deleted timestamptz);
         CREATE UNIQUE INDEX users_email ON users (lower(email)) WHERE deleted IS NULL;
         CREATE INDEX ON users USING btree (email text_pattern_ops DESC NULLS LAST) INCLUDE (id);",
    )
    .unwrap();

    let indexes: Vec<_> = catalog.indexes().map(|(t, i)| (t.name.name.as_str(), i.name.as_str())).collect();
    assert_eq!(indexes, vec![("users", "users_email"), ("users", "users_email_idx")]);

    let users = catalog.find_table("users").unwrap();
    let partial = users.index("users_email").unwrap();
    assert!(partial.unique);
    assert!(partial.has_expressions());
    assert_eq!(partial.predicate.as_ref().unwrap().text, "deleted IS NULL");

    let covering = users.index("users_email_idx").unwrap();
    assert_eq!(covering.elements[0].opclass.as_deref(), Some("text_pattern_ops"));
    assert_eq!(covering.include, vec!["id"]);
}

#[test]
fn test_function_without_returns_clause() {
    let sql = "
    CREATE FUNCTION transmogrify() AS $$
        SELECT * FROM widgets
    $$ LANGUAGE SQL;
    ";
    let catalog = parse_sql(sql).unwrap();
    let functions = catalog.functions(&QualifiedName::new("public", "transmogrify"));
    assert_eq!(functions.len(), 1);
    assert!(functions[0].returns.is_none());
    assert_eq!(functions[0].routine.language.as_deref(), Some("sql"));
}

#[test]
fn test_call_statement_omits_default_schema() {
    let catalog = parse_sql(
        "CREATE PROCEDURE transmogrify(v_status text, v_until date) AS $$
         BEGIN
             DELETE FROM widgets WHERE status = v_status AND changed < v_until;
         END;
         $$ LANGUAGE plpgsql;
         CREATE PROCEDURE ops.purge() AS $$ DELETE FROM widgets $$ LANGUAGE sql;",
    )
    .unwrap();

    let transmogrify = catalog.procedure(&QualifiedName::new("public", "transmogrify")).unwrap();
    assert_eq!(transmogrify.call_statement(catalog.default_schema()), "CALL transmogrify(:arg0, :arg1)");
    let purge = catalog.procedure(&QualifiedName::new("ops", "purge")).unwrap();
    assert_eq!(purge.call_statement(catalog.default_schema()), "CALL ops.purge()");
}

#[test]
fn test_keyword_named_columns_in_constraints() {
    let catalog = parse_sql(
        "CREATE TABLE t (
             type text,
             key int,
             during tsrange,
             data jsonb,
             CHECK (type <> ''),
             CHECK (data IS NOT NULL),
             EXCLUDE USING gist (key WITH =, during WITH &&)
         );",
    )
    .unwrap();
    let table = catalog.find_table("t").unwrap();

    let check = table.constraint("t_type_check").unwrap();
    assert_eq!(check.columns, vec!["type"]);
    assert_eq!(table.constraint("t_data_check").unwrap().columns, vec!["data"]);

    let exclusion = table.constraint("t_key_during_excl").unwrap();
    assert_eq!(exclusion.columns, vec!["key", "during"]);
    let columns: Vec<_> = exclusion
        .exclusion()
        .unwrap()
        .elements
        .iter()
        .map(|e| e.column.as_deref())
        .collect();
    assert_eq!(columns, vec![Some("key"), Some("during")]);
}

#[test]
fn test_enum_data_type_rules() {
    assert!(parse_sql("CREATE TYPE t AS ENUM ('a', 'b') PRAGMA (DATA TYPE text);").is_ok());
    assert!(parse_sql("CREATE TYPE t AS ENUM PRAGMA (CLASS 'pkg.Level', DATA TYPE int);").is_ok());

    let rejected = [
        "CREATE TYPE t AS ENUM ('a') PRAGMA (DATA TYPE int);",
        "CREATE TYPE t AS ENUM ('a') PRAGMA (CLASS 'pkg.Level', DATA TYPE int);",
        "CREATE TYPE t AS ENUM PRAGMA (CLASS 'pkg.Level', ATTRIBUTE 'value');",
    ];
    for sql in rejected {
        match parse_sql(sql) {
            Err(DdlError::Parse { .. }) => {}
            other => panic!("Expected Parse error for {}, got {:?}", sql, other),
        }
    }
}
