//! Criterion benchmarks for the DDL front end and catalog build.
//!
//! - tokenize: lexing a generated schema file
//! - parse: tokenize + split + statement parsing
//! - build: full accumulate / finalize pass
//! - parallel: several sources through `parse_sources`

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use pgddl::sql::{parse_source, Lexer};
use pgddl::{parse_sources, parse_sql, CatalogConfig, Source};

fn criterion_config() -> Criterion {
    Criterion::default().configure_from_args()
}

/// A schema with `tables` tables, each referencing the next one so every
/// foreign key is a forward reference
fn generate_schema(prefix: &str, tables: usize) -> String {
    let mut sql = format!("CREATE TYPE {prefix}_status AS ENUM ('new', 'active', 'archived');\n");
    for i in 0..tables {
        let reference = if i + 1 < tables {
            format!(",\n    next_id bigint REFERENCES {}{}(id) ON DELETE SET NULL", prefix, i + 1)
        } else {
            String::new()
        };
        sql.push_str(&format!(
            "CREATE TABLE {prefix}{i} (
    id bigserial PRIMARY KEY,
    name varchar(120) NOT NULL,
    state {prefix}_status NOT NULL DEFAULT 'new',
    tags text[] NOT NULL DEFAULT '{{}}',
    created_at timestamptz NOT NULL DEFAULT now(),
    CHECK (char_length(name) > 0){reference}
);
CREATE INDEX ON {prefix}{i} (lower(name)) WHERE state <> 'archived';
CREATE FUNCTION {prefix}{i}_count() RETURNS bigint LANGUAGE sql STABLE AS $$ SELECT count(*) FROM {prefix}{i}; $$;
",
        ));
    }
    sql
}

fn bench_tokenize(c: &mut Criterion) {
    let mut group = c.benchmark_group("tokenize");
    for tables in [10usize, 100] {
        let sql = generate_schema("t", tables);
        group.throughput(Throughput::Bytes(sql.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(tables), &sql, |b, sql| {
            b.iter(|| black_box(Lexer::new(sql).tokenize().unwrap()));
        });
    }
    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for tables in [10usize, 100] {
        let sql = generate_schema("t", tables);
        group.throughput(Throughput::Bytes(sql.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(tables), &sql, |b, sql| {
            b.iter(|| black_box(parse_source(sql, "bench.sql").unwrap()));
        });
    }
    group.finish();
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    for tables in [10usize, 100] {
        let sql = generate_schema("t", tables);
        group.throughput(Throughput::Elements(tables as u64));
        group.bench_with_input(BenchmarkId::from_parameter(tables), &sql, |b, sql| {
            b.iter(|| black_box(parse_sql(sql).unwrap()));
        });
    }
    group.finish();
}

fn bench_parallel_sources(c: &mut Criterion) {
    let sources: Vec<Source> = (0..8)
        .map(|i| {
            let prefix = format!("s{}_t", i);
            Source::new(format!("{}.sql", prefix), generate_schema(&prefix, 25))
        })
        .collect();

    c.bench_function("parallel/8x25", |b| {
        b.iter(|| black_box(parse_sources(&sources, CatalogConfig::default()).unwrap()));
    });
}

criterion_group! {
    name = benches;
    config = criterion_config();
    targets = bench_tokenize, bench_parse, bench_build, bench_parallel_sources
}
criterion_main!(benches);
