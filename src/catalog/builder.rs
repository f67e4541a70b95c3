/// Catalog builder
///
/// Two phases:
/// - Accumulate: statements are registered strictly in source order. Foreign
///   keys whose target table is not known yet are parked as pending, keyed by
///   the referenced table.
/// - Finalize: only the pending records are walked. Every issue found along
///   the way (unknown types, unknown index tables, unresolved references) is
///   reported together.
///
/// Grammar, duplicate and placement errors abort the source being added; the
/// builder rolls back to its state before that source.
use super::naming;
use super::registry::SchemaCatalog;
use crate::config::CatalogConfig;
use crate::diagnostic::{Location, SourceMap};
use crate::error::{DdlError, ObjectKind, Result};
use crate::sql::ast::{
    ConstraintDef, CreateEnumStmt, CreateFunctionStmt, CreateIndexStmt, CreateProcedureStmt, CreateTableStmt,
    CreateViewStmt, ObjectName, PrepareStmt, RoutineAttributes, TableConstraint,
};
use crate::sql::{parse_source, ParsedStatement, Statement};
use crate::types::{
    is_builtin_type, Column, Constraint, ConstraintKind, EnumType, ForeignKey, Function, Index, Parameter,
    PreparedStatement, Procedure, QualifiedName, Returns, Routine, RoutineBody, TableKind, TableLike, TypeRef,
};
use indexmap::IndexMap;

const LOG_TARGET: &str = "pgddl";

/// A foreign key waiting for its referenced table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReference {
    /// Table owning the foreign key
    pub table: QualifiedName,
    /// Name of the foreign key constraint
    pub constraint: String,
    pub location: Location,
}

/// Builder state restored when a source fails
struct Checkpoint {
    catalog: SchemaCatalog,
    pending: IndexMap<QualifiedName, Vec<PendingReference>, ahash::RandomState>,
    issues: usize,
}

/// Accumulates parsed statements from one or more sources into a catalog
pub struct CatalogBuilder {
    config: CatalogConfig,
    catalog: SchemaCatalog,
    /// Referenced table -> foreign keys waiting for it, in declaration order
    pending: IndexMap<QualifiedName, Vec<PendingReference>, ahash::RandomState>,
    issues: Vec<DdlError>,
    sources: SourceMap,
}

impl CatalogBuilder {
    pub fn new(config: CatalogConfig) -> Self {
        let catalog = SchemaCatalog::new(config.default_schema.clone());
        Self {
            config,
            catalog,
            pending: IndexMap::with_hasher(ahash::RandomState::new()),
            issues: Vec::new(),
            sources: SourceMap::new(),
        }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Tokenize, parse and accumulate one source text
    pub fn add_source(&mut self, name: &str, text: &str) -> Result<()> {
        self.remember_source(name, text);
        let statements = parse_source(text, name)?;
        self.add_parsed(name, text, statements)
    }

    /// Accumulate statements already parsed from `text`.
    ///
    /// Either every statement is registered or, on error, none is.
    pub fn add_parsed(&mut self, name: &str, text: &str, statements: Vec<ParsedStatement>) -> Result<()> {
        let _span = tracing::debug_span!(target: LOG_TARGET, "accumulate", source = %name, statements = statements.len())
            .entered();
        self.remember_source(name, text);

        let checkpoint = self.checkpoint();
        let mut declared_schema: Option<String> = None;
        for parsed in statements {
            tracing::trace!(target: LOG_TARGET, kind = parsed.statement.kind(), location = %parsed.location, "statement");
            if let Err(err) = self.accumulate(parsed, &mut declared_schema) {
                tracing::debug!(target: LOG_TARGET, error = %err, "rolling back source");
                self.restore(checkpoint);
                return Err(err);
            }
        }
        Ok(())
    }

    /// Texts added so far, for rendering errors
    pub fn source_map(&self) -> &SourceMap {
        &self.sources
    }

    /// Catalog as accumulated so far; foreign keys may still be pending
    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    /// Foreign keys still waiting for their referenced table
    pub fn pending_references(&self) -> impl Iterator<Item = (&QualifiedName, &PendingReference)> {
        self.pending
            .iter()
            .flat_map(|(target, references)| references.iter().map(move |r| (target, r)))
    }

    /// Issues collected so far, reported by `finish`
    pub fn issues(&self) -> &[DdlError] {
        &self.issues
    }

    /// Resolve pending references and return the finished catalog
    pub fn finish(mut self) -> Result<SchemaCatalog> {
        let pending_count: usize = self.pending.values().map(Vec::len).sum();
        let _span = tracing::debug_span!(target: LOG_TARGET, "finalize", pending = pending_count).entered();

        let pending = std::mem::take(&mut self.pending);
        for (target, references) in pending {
            for reference in references {
                if self.catalog.table(&target).is_none() {
                    self.issues.push(DdlError::UnresolvedReference {
                        location: reference.location,
                        table: target.to_string(),
                        column: None,
                    });
                    continue;
                }
                self.link_foreign_key(&reference.table, &reference.constraint);
            }
        }

        if self.issues.is_empty() {
            return Ok(self.catalog);
        }
        for issue in &self.issues {
            tracing::error!(target: LOG_TARGET, issue = %issue, "catalog issue");
        }
        Err(DdlError::Finalize { issues: self.issues })
    }

    fn remember_source(&mut self, name: &str, text: &str) {
        if self.sources.get(name).is_none() {
            self.sources.add(name, text);
        }
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            catalog: self.catalog.clone(),
            pending: self.pending.clone(),
            issues: self.issues.len(),
        }
    }

    fn restore(&mut self, checkpoint: Checkpoint) {
        self.catalog = checkpoint.catalog;
        self.pending = checkpoint.pending;
        self.issues.truncate(checkpoint.issues);
    }

    fn accumulate(&mut self, parsed: ParsedStatement, declared_schema: &mut Option<String>) -> Result<()> {
        let ParsedStatement {
            statement,
            text,
            location,
        } = parsed;

        match statement {
            Statement::CreateSchema(stmt) => self.create_schema(stmt.name, &location, declared_schema),
            Statement::CreateEnum(stmt) => self.create_enum(stmt, location, declared_schema),
            Statement::CreateTable(stmt) => self.create_table(stmt, text, location, declared_schema),
            Statement::CreateView(stmt) => self.create_view(stmt, text, location, declared_schema),
            Statement::CreateIndex(stmt) => self.create_index(stmt, location),
            Statement::CreateFunction(stmt) => self.create_function(stmt, text, location, declared_schema),
            Statement::CreateProcedure(stmt) => self.create_procedure(stmt, text, location, declared_schema),
            Statement::Prepare(stmt) => self.prepare(stmt, location, declared_schema),
        }
    }

    /// Re-entering a known schema merges into it
    fn create_schema(&mut self, name: String, location: &Location, declared_schema: &mut Option<String>) -> Result<()> {
        if self.config.single_schema_per_source {
            match declared_schema.as_deref() {
                Some(declared) if declared != name => {
                    return Err(DdlError::Parse {
                        location: location.clone(),
                        message: format!("source already declares schema {}, cannot declare {}", declared, name),
                    })
                }
                _ => *declared_schema = Some(name.clone()),
            }
        }

        if self.catalog.has_schema(&name) {
            tracing::debug!(target: LOG_TARGET, schema = %name, "re-entering schema");
        }
        self.catalog.ensure_schema(&name);
        Ok(())
    }

    /// Qualify the name of an object being defined and make sure its schema exists
    fn place(&mut self, name: &ObjectName, location: &Location, declared_schema: &Option<String>) -> Result<QualifiedName> {
        if self.config.single_schema_per_source {
            if let Some(schema) = &name.schema {
                match declared_schema {
                    Some(declared) if declared == schema => {}
                    Some(declared) => {
                        return Err(DdlError::Parse {
                            location: location.clone(),
                            message: format!("{} is outside schema {} declared by this source", name, declared),
                        })
                    }
                    None => {
                        return Err(DdlError::Parse {
                            location: location.clone(),
                            message: format!("{} is schema-qualified but this source declares no schema", name),
                        })
                    }
                }
            }
        }

        let qualified = name.qualify(&self.config.default_schema);
        self.catalog.ensure_schema(&qualified.schema);
        Ok(qualified)
    }

    /// Kind of the table, view or type already registered under `name`
    fn relation_kind(&self, name: &QualifiedName) -> Option<ObjectKind> {
        self.catalog.schema(&name.schema)?.relation_kind(&name.name)
    }

    fn create_enum(&mut self, stmt: CreateEnumStmt, location: Location, declared_schema: &Option<String>) -> Result<()> {
        let name = self.place(&stmt.name, &location, declared_schema)?;
        if let Some(kind) = self.relation_kind(&name) {
            return Err(DdlError::DuplicateDefinition {
                location,
                kind,
                name: name.to_string(),
            });
        }

        if let Some(data_type) = stmt.pragma.as_ref().and_then(|p| p.data_type.as_ref()) {
            self.resolve_type(data_type, &name.schema, &location);
        }

        self.catalog.ensure_schema(&name.schema).insert_enum(EnumType {
            name,
            labels: stmt.labels,
            pragma: stmt.pragma,
            location,
        });
        Ok(())
    }

    fn create_table(
        &mut self,
        stmt: CreateTableStmt,
        ddl: String,
        location: Location,
        declared_schema: &Option<String>,
    ) -> Result<()> {
        let name = self.place(&stmt.name, &location, declared_schema)?;
        if let Some(kind) = self.relation_kind(&name) {
            if stmt.if_not_exists {
                tracing::warn!(target: LOG_TARGET, table = %name, "table already exists, skipping (IF NOT EXISTS)");
                return Ok(());
            }
            return Err(DdlError::DuplicateDefinition {
                location,
                kind,
                name: name.to_string(),
            });
        }

        let mut columns: Vec<Column> = Vec::with_capacity(stmt.columns.len());
        for def in stmt.columns {
            if columns.iter().any(|c| c.name == def.column.name) {
                return Err(DdlError::DuplicateDefinition {
                    location: def.location,
                    kind: ObjectKind::Column,
                    name: format!("{}.{}", name, def.column.name),
                });
            }
            let mut column = def.column;
            if let Some(data_type) = &column.data_type {
                column.enum_type = self.resolve_type(data_type, &name.schema, &def.location);
            }
            columns.push(column);
        }

        let constraints = self.build_constraints(&name, &columns, stmt.constraints)?;

        self.catalog.insert_table(TableLike {
            name: name.clone(),
            kind: TableKind::Table,
            columns,
            constraints,
            indexes: Vec::new(),
            temporary: stmt.temporary,
            unlogged: stmt.unlogged,
            on_commit: stmt.on_commit,
            definition: None,
            ddl,
            location,
        });

        self.register_foreign_keys(&name);
        Ok(())
    }

    fn build_constraints(
        &mut self,
        table: &QualifiedName,
        columns: &[Column],
        defs: Vec<TableConstraint>,
    ) -> Result<Vec<Constraint>> {
        let mut constraints: Vec<Constraint> = Vec::with_capacity(defs.len());

        for def in defs {
            if !matches!(def.kind, ConstraintDef::Check { .. }) {
                for column in &def.columns {
                    if !columns.iter().any(|c| c.name == *column) {
                        self.issues.push(DdlError::UnresolvedReference {
                            location: def.location.clone(),
                            table: table.to_string(),
                            column: Some(column.clone()),
                        });
                    }
                }
            }

            let kind = self.constraint_kind(table, &def)?;
            let (name, explicit_name) = match def.name {
                Some(name) => {
                    if constraints.iter().any(|c| c.name == name) {
                        return Err(DdlError::DuplicateDefinition {
                            location: def.location,
                            kind: ObjectKind::Constraint,
                            name: format!("{}.{}", table, name),
                        });
                    }
                    (name, true)
                }
                None => {
                    let base = naming::constraint_name(&self.config.naming, &table.name, &def.columns, &kind);
                    (naming::unique_name(base, |n| constraints.iter().any(|c| c.name == n)), false)
                }
            };

            constraints.push(Constraint {
                name,
                explicit_name,
                columns: def.columns,
                kind,
                location: def.location,
            });
        }

        Ok(constraints)
    }

    fn constraint_kind(&self, table: &QualifiedName, def: &TableConstraint) -> Result<ConstraintKind> {
        Ok(match &def.kind {
            ConstraintDef::PrimaryKey => ConstraintKind::PrimaryKey,
            ConstraintDef::Unique { nulls_not_distinct } => ConstraintKind::Unique {
                nulls_not_distinct: *nulls_not_distinct,
            },
            ConstraintDef::Check { expression } => ConstraintKind::Check {
                expression: expression.clone(),
            },
            ConstraintDef::Exclusion(exclusion) => ConstraintKind::Exclusion(exclusion.clone()),
            ConstraintDef::ForeignKey(reference) => {
                if !reference.columns.is_empty() && reference.columns.len() != def.columns.len() {
                    return Err(DdlError::Parse {
                        location: def.location.clone(),
                        message: format!(
                            "foreign key on {} has {} column(s) but references {}",
                            table,
                            def.columns.len(),
                            reference.columns.len()
                        ),
                    });
                }
                ConstraintKind::ForeignKey(ForeignKey {
                    referenced_table: reference.table.qualify(&self.config.default_schema),
                    referenced_columns: reference.columns.clone(),
                    on_update: reference.on_update,
                    on_delete: reference.on_delete,
                    match_type: reference.match_type,
                    deferrable: reference.deferrable,
                    initially_deferred: reference.initially_deferred,
                    use_alter: reference.use_alter,
                    resolved: false,
                })
            }
        })
    }

    /// Link the foreign keys of a just-registered table, or park them
    fn register_foreign_keys(&mut self, owner: &QualifiedName) {
        let keys: Vec<(String, QualifiedName, Location)> = match self.catalog.table(owner) {
            Some(table) => table
                .constraints
                .iter()
                .filter_map(|c| {
                    c.foreign_key()
                        .map(|fk| (c.name.clone(), fk.referenced_table.clone(), c.location.clone()))
                })
                .collect(),
            None => return,
        };

        for (constraint, target, location) in keys {
            if self.catalog.table(&target).is_some() {
                self.link_foreign_key(owner, &constraint);
                continue;
            }

            tracing::debug!(target: LOG_TARGET, table = %owner, constraint = %constraint, references = %target, "foreign key pending");
            if let Some(fk) = self.foreign_key_mut(owner, &constraint) {
                fk.use_alter = true;
            }
            self.pending.entry(target).or_default().push(PendingReference {
                table: owner.clone(),
                constraint,
                location,
            });
        }
    }

    fn foreign_key_mut(&mut self, owner: &QualifiedName, constraint: &str) -> Option<&mut ForeignKey> {
        self.catalog
            .table_mut(owner)?
            .constraints
            .iter_mut()
            .find(|c| c.name == constraint)?
            .foreign_key_mut()
    }

    /// Check a foreign key against its (existing) target and fill in the
    /// referenced columns
    fn link_foreign_key(&mut self, owner: &QualifiedName, constraint: &str) {
        let (fk, columns, location) = match self
            .catalog
            .table(owner)
            .and_then(|t| t.constraint(constraint))
            .and_then(|c| c.foreign_key().map(|fk| (fk.clone(), c.columns.clone(), c.location.clone())))
        {
            Some(found) => found,
            None => return,
        };

        match self.check_reference(&fk, &columns, &location) {
            Ok(referenced) => {
                if let Some(fk) = self.foreign_key_mut(owner, constraint) {
                    fk.referenced_columns = referenced;
                    fk.resolved = true;
                }
            }
            Err(issues) => self.issues.extend(issues),
        }
    }

    fn check_reference(
        &self,
        fk: &ForeignKey,
        columns: &[String],
        location: &Location,
    ) -> std::result::Result<Vec<String>, Vec<DdlError>> {
        let target_name = fk.referenced_table.to_string();
        let target = match self.catalog.table(&fk.referenced_table) {
            Some(target) if !target.is_view() => target,
            Some(_) => {
                return Err(vec![DdlError::Parse {
                    location: location.clone(),
                    message: format!("foreign key references view {}", target_name),
                }])
            }
            None => {
                return Err(vec![DdlError::UnresolvedReference {
                    location: location.clone(),
                    table: target_name,
                    column: None,
                }])
            }
        };

        let referenced = if fk.referenced_columns.is_empty() {
            let key = target.primary_key_columns();
            if key.is_empty() {
                return Err(vec![DdlError::Parse {
                    location: location.clone(),
                    message: format!("{} has no primary key to reference", target_name),
                }]);
            }
            if key.len() != columns.len() {
                return Err(vec![DdlError::Parse {
                    location: location.clone(),
                    message: format!(
                        "foreign key has {} column(s) but the primary key of {} has {}",
                        columns.len(),
                        target_name,
                        key.len()
                    ),
                }]);
            }
            key.to_vec()
        } else {
            fk.referenced_columns.clone()
        };

        let missing: Vec<DdlError> = referenced
            .iter()
            .filter(|column| !target.has_column(column))
            .map(|column| DdlError::UnresolvedReference {
                location: location.clone(),
                table: target_name.clone(),
                column: Some(column.clone()),
            })
            .collect();
        if missing.is_empty() {
            Ok(referenced)
        } else {
            Err(missing)
        }
    }

    fn create_view(
        &mut self,
        stmt: CreateViewStmt,
        ddl: String,
        location: Location,
        declared_schema: &Option<String>,
    ) -> Result<()> {
        let name = self.place(&stmt.name, &location, declared_schema)?;
        match self.relation_kind(&name) {
            Some(ObjectKind::View) if stmt.or_replace => {
                tracing::debug!(target: LOG_TARGET, view = %name, "replacing view");
            }
            Some(_) if stmt.if_not_exists => {
                tracing::warn!(target: LOG_TARGET, view = %name, "view already exists, skipping (IF NOT EXISTS)");
                return Ok(());
            }
            Some(kind) => {
                return Err(DdlError::DuplicateDefinition {
                    location,
                    kind,
                    name: name.to_string(),
                })
            }
            None => {}
        }

        let mut columns: Vec<Column> = Vec::with_capacity(stmt.columns.len());
        for column in stmt.columns {
            if columns.iter().any(|c| c.name == column) {
                return Err(DdlError::DuplicateDefinition {
                    location,
                    kind: ObjectKind::Column,
                    name: format!("{}.{}", name, column),
                });
            }
            columns.push(Column::new(column, None));
        }

        self.catalog.insert_table(TableLike {
            name,
            kind: TableKind::View {
                materialized: stmt.materialized,
                recursive: stmt.recursive,
            },
            columns,
            constraints: Vec::new(),
            indexes: Vec::new(),
            temporary: stmt.temporary,
            unlogged: false,
            on_commit: None,
            definition: Some(stmt.query),
            ddl,
            location,
        });
        Ok(())
    }

    fn create_index(&mut self, stmt: CreateIndexStmt, location: Location) -> Result<()> {
        let table_name = stmt.table.qualify(&self.config.default_schema);
        let table = match self.catalog.table(&table_name) {
            Some(table) => table,
            None => {
                self.issues.push(DdlError::UnknownTable {
                    location,
                    table: table_name.to_string(),
                });
                return Ok(());
            }
        };
        if matches!(table.kind, TableKind::View { materialized: false, .. }) {
            return Err(DdlError::Parse {
                location,
                message: format!("cannot index view {}", table_name),
            });
        }

        let taken = |name: &str| table.index(name).is_some() || table.constraint(name).is_some();
        let (name, explicit_name) = match stmt.name {
            Some(name) if taken(name.as_str()) => {
                if stmt.if_not_exists {
                    tracing::warn!(target: LOG_TARGET, index = %name, table = %table_name, "index already exists, skipping (IF NOT EXISTS)");
                    return Ok(());
                }
                return Err(DdlError::DuplicateDefinition {
                    location,
                    kind: ObjectKind::Index,
                    name: format!("{}.{}", table_name, name),
                });
            }
            Some(name) => (name, true),
            None => {
                let key_columns: Vec<&str> = stmt.elements.iter().filter_map(|e| e.column.as_deref()).collect();
                let base = naming::index_name(&self.config.naming, &table_name.name, &key_columns);
                (naming::unique_name(base, taken), false)
            }
        };

        let missing: Vec<DdlError> = stmt
            .elements
            .iter()
            .filter_map(|e| e.column.as_ref())
            .chain(stmt.include.iter())
            .filter(|column| !table.has_column(column))
            .map(|column| DdlError::UnresolvedReference {
                location: location.clone(),
                table: table_name.to_string(),
                column: Some(column.clone()),
            })
            .collect();
        self.issues.extend(missing);

        let index = Index {
            name,
            explicit_name,
            table: table_name.clone(),
            unique: stmt.unique,
            using: stmt.using,
            elements: stmt.elements,
            include: stmt.include,
            predicate: stmt.predicate,
            nulls_not_distinct: stmt.nulls_not_distinct,
            concurrently: stmt.concurrently,
            location,
        };
        if let Some(table) = self.catalog.table_mut(&table_name) {
            table.indexes.push(index);
        }
        Ok(())
    }

    fn build_routine(
        &mut self,
        name: QualifiedName,
        parameters: Vec<Parameter>,
        attributes: &RoutineAttributes,
        body: RoutineBody,
        or_replace: bool,
        ddl: String,
        location: Location,
    ) -> Routine {
        for parameter in &parameters {
            self.resolve_type(&parameter.data_type, &name.schema, &location);
        }
        Routine {
            name,
            parameters,
            language: attributes.language.clone(),
            body,
            security_definer: attributes.security_definer,
            or_replace,
            ddl,
            location,
        }
    }

    fn create_function(
        &mut self,
        stmt: CreateFunctionStmt,
        ddl: String,
        location: Location,
        declared_schema: &Option<String>,
    ) -> Result<()> {
        let name = self.place(&stmt.name, &location, declared_schema)?;
        match &stmt.returns {
            Some(Returns::Scalar(t)) | Some(Returns::SetOf(t)) => {
                self.resolve_type(t, &name.schema, &location);
            }
            Some(Returns::Table(columns)) => {
                for (_, t) in columns {
                    self.resolve_type(t, &name.schema, &location);
                }
            }
            None => {}
        }

        let routine = self.build_routine(
            name.clone(),
            stmt.parameters,
            &stmt.attributes,
            stmt.body,
            stmt.or_replace,
            ddl,
            location,
        );
        self.check_routine_clash(&routine, ObjectKind::Function)?;

        let function = Function {
            routine,
            returns: stmt.returns,
            volatility: stmt.attributes.volatility,
            strict: stmt.attributes.strict,
            leakproof: stmt.attributes.leakproof,
            parallel: stmt.attributes.parallel,
            cost: stmt.attributes.cost,
            rows: stmt.attributes.rows,
        };
        let overloads = self.catalog.ensure_schema(&name.schema).functions_mut(&name.name);
        match overloads.iter().position(|f| same_signature(&f.routine, &function.routine)) {
            Some(existing) => overloads[existing] = function,
            None => overloads.push(function),
        }
        Ok(())
    }

    fn create_procedure(
        &mut self,
        stmt: CreateProcedureStmt,
        ddl: String,
        location: Location,
        declared_schema: &Option<String>,
    ) -> Result<()> {
        let name = self.place(&stmt.name, &location, declared_schema)?;
        let routine = self.build_routine(
            name.clone(),
            stmt.parameters,
            &stmt.attributes,
            stmt.body,
            stmt.or_replace,
            ddl,
            location,
        );
        self.check_routine_clash(&routine, ObjectKind::Procedure)?;

        let procedure = Procedure { routine };
        let overloads = self.catalog.ensure_schema(&name.schema).procedures_mut(&name.name);
        match overloads.iter().position(|p| same_signature(&p.routine, &procedure.routine)) {
            Some(existing) => overloads[existing] = procedure,
            None => overloads.push(procedure),
        }
        Ok(())
    }

    /// Functions and procedures share one signature space. A clash is only
    /// allowed for `OR REPLACE` of a routine of the same kind.
    fn check_routine_clash(&self, routine: &Routine, kind: ObjectKind) -> Result<()> {
        let schema = match self.catalog.schema(&routine.name.schema) {
            Some(schema) => schema,
            None => return Ok(()),
        };
        let function_clash = schema
            .functions(&routine.name.name)
            .iter()
            .any(|f| same_signature(&f.routine, routine));
        let procedure_clash = schema
            .procedures(&routine.name.name)
            .iter()
            .any(|p| same_signature(&p.routine, routine));

        let existing = match (function_clash, procedure_clash) {
            (true, _) => ObjectKind::Function,
            (_, true) => ObjectKind::Procedure,
            _ => return Ok(()),
        };
        if existing == kind && routine.or_replace {
            tracing::debug!(target: LOG_TARGET, routine = %routine.name, "replacing {}", kind);
            return Ok(());
        }

        let types: Vec<String> = routine.signature().iter().map(|t| t.to_string()).collect();
        Err(DdlError::DuplicateDefinition {
            location: routine.location.clone(),
            kind: existing,
            name: format!("{}({})", routine.name, types.join(", ")),
        })
    }

    fn prepare(&mut self, stmt: PrepareStmt, location: Location, declared_schema: &Option<String>) -> Result<()> {
        let name = self.place(&stmt.name, &location, declared_schema)?;
        if self
            .catalog
            .schema(&name.schema)
            .and_then(|s| s.prepared(&name.name))
            .is_some()
        {
            return Err(DdlError::DuplicateDefinition {
                location,
                kind: ObjectKind::PreparedStatement,
                name: name.to_string(),
            });
        }

        for parameter_type in &stmt.parameter_types {
            self.resolve_type(parameter_type, &name.schema, &location);
        }

        self.catalog.ensure_schema(&name.schema).insert_prepared(PreparedStatement {
            name,
            parameter_types: stmt.parameter_types,
            parameters: stmt.parameters,
            body: stmt.body,
            location,
        });
        Ok(())
    }

    /// Check that a type is known. Returns the enum it names, if any;
    /// unknown types are recorded as issues.
    ///
    /// Unqualified names are looked up as built-ins, configured extra types,
    /// then enums and tables of `schema` and of the default schema.
    fn resolve_type(&mut self, type_ref: &TypeRef, schema: &str, location: &Location) -> Option<QualifiedName> {
        let written = match &type_ref.schema {
            Some(qualifier) => format!("{}.{}", qualifier, type_ref.name),
            None => type_ref.name.clone(),
        };

        let builtin_scope = matches!(type_ref.schema.as_deref(), None | Some("pg_catalog"));
        if builtin_scope && is_builtin_type(&type_ref.name) {
            return None;
        }
        if self.config.extra_types.iter().any(|t| *t == type_ref.name || *t == written) {
            return None;
        }

        let candidates = match &type_ref.schema {
            Some(qualifier) => vec![QualifiedName::new(qualifier.clone(), type_ref.name.clone())],
            None => vec![
                QualifiedName::new(schema, type_ref.name.clone()),
                QualifiedName::new(self.config.default_schema.clone(), type_ref.name.clone()),
            ],
        };
        for candidate in candidates {
            if self.catalog.enum_type(&candidate).is_some() {
                return Some(candidate);
            }
            // Tables double as row types
            if self.catalog.table(&candidate).is_some() {
                return None;
            }
        }

        self.issues.push(DdlError::UnknownType {
            location: location.clone(),
            type_name: written,
        });
        None
    }
}

impl Default for CatalogBuilder {
    fn default() -> Self {
        Self::new(CatalogConfig::default())
    }
}

/// Overload identity: input parameter base types and array depth
fn same_signature(a: &Routine, b: &Routine) -> bool {
    let key = |r: &Routine| -> Vec<(Option<String>, String, usize)> {
        r.signature()
            .into_iter()
            .map(|t| (t.schema.clone(), t.name.clone(), t.dimensions()))
            .collect()
    };
    key(a) == key(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NamingConvention;

    fn build(sql: &str) -> Result<SchemaCatalog> {
        let mut builder = CatalogBuilder::default();
        builder.add_source("test.sql", sql)?;
        builder.finish()
    }

    #[test]
    fn test_forward_reference_resolves() {
        let catalog = build(
            "CREATE TABLE b (id int PRIMARY KEY, a_id int REFERENCES a(id));
             CREATE TABLE a (id int PRIMARY KEY);",
        )
        .unwrap();

        let b = catalog.find_table("b").unwrap();
        let fk = b.foreign_keys().next().unwrap();
        assert_eq!(fk.name, "b_a_id_fkey");
        let key = fk.foreign_key().unwrap();
        assert_eq!(key.referenced_table, QualifiedName::new("public", "a"));
        assert_eq!(key.referenced_columns, vec!["id".to_string()]);
        assert!(key.resolved);
        assert!(key.use_alter);
    }

    #[test]
    fn test_backward_reference_uses_primary_key() {
        let catalog = build(
            "CREATE TABLE a (id int PRIMARY KEY);
             CREATE TABLE b (a_id int REFERENCES a);",
        )
        .unwrap();
        let key = catalog.find_table("b").unwrap().constraints[0].foreign_key().unwrap().clone();
        assert_eq!(key.referenced_columns, vec!["id".to_string()]);
        assert!(!key.use_alter);
    }

    #[test]
    fn test_self_reference() {
        let catalog = build("CREATE TABLE node (id int PRIMARY KEY, parent int REFERENCES node(id));").unwrap();
        let key = catalog.find_table("node").unwrap().foreign_keys().next().unwrap().foreign_key().unwrap().clone();
        assert!(key.resolved);
        assert!(!key.use_alter);
    }

    #[test]
    fn test_unresolved_reference_collects_all() {
        let err = build(
            "CREATE TABLE b (a_id int REFERENCES a(id), c_id int REFERENCES c(id));
             CREATE TABLE d (x mystery);",
        )
        .unwrap_err();
        let issues = err.issues();
        assert_eq!(issues.len(), 3);
        assert!(issues.iter().any(|i| matches!(i, DdlError::UnknownType { type_name, .. } if type_name == "mystery")));
        match &issues[1] {
            DdlError::UnresolvedReference { table, column, .. } => {
                assert_eq!(table, "public.a");
                assert!(column.is_none());
            }
            _ => panic!("Expected UnresolvedReference"),
        }
        assert!(matches!(&issues[2], DdlError::UnresolvedReference { table, .. } if table == "public.c"));
    }

    #[test]
    fn test_missing_referenced_column() {
        let err = build(
            "CREATE TABLE a (id int PRIMARY KEY);
             CREATE TABLE b (a_id int REFERENCES a(uid));",
        )
        .unwrap_err();
        match &err.issues()[0] {
            DdlError::UnresolvedReference { table, column, .. } => {
                assert_eq!(table, "public.a");
                assert_eq!(column.as_deref(), Some("uid"));
            }
            _ => panic!("Expected UnresolvedReference"),
        }
    }

    #[test]
    fn test_duplicate_table() {
        let err = build("CREATE TABLE t (id int); CREATE TABLE t (id int);").unwrap_err();
        match err {
            DdlError::DuplicateDefinition { kind, name, .. } => {
                assert_eq!(kind, ObjectKind::Table);
                assert_eq!(name, "public.t");
            }
            _ => panic!("Expected DuplicateDefinition"),
        }
    }

    #[test]
    fn test_if_not_exists_keeps_first() {
        let catalog = build("CREATE TABLE t (id int); CREATE TABLE IF NOT EXISTS t (other text);").unwrap();
        assert!(catalog.find_table("t").unwrap().has_column("id"));
        assert_eq!(catalog.tables().count(), 1);
    }

    #[test]
    fn test_enum_and_table_share_namespace() {
        let err = build("CREATE TYPE mood AS ENUM ('sad'); CREATE TABLE mood (id int);").unwrap_err();
        assert!(matches!(err, DdlError::DuplicateDefinition { kind: ObjectKind::Type, .. }));

        let err = build("CREATE TYPE mood AS ENUM ('sad'); CREATE TYPE mood AS ENUM ('ok');").unwrap_err();
        assert!(matches!(err, DdlError::DuplicateDefinition { kind: ObjectKind::Type, .. }));
    }

    #[test]
    fn test_enum_columns_resolve() {
        let catalog = build(
            "CREATE SCHEMA app;
             CREATE TYPE app.mood AS ENUM ('sad', 'ok', 'happy');
             CREATE TABLE app.person (name text, current app.mood, history app.mood[]);",
        )
        .unwrap();
        let person = catalog.find_table("app.person").unwrap();
        let mood = QualifiedName::new("app", "mood");
        assert_eq!(person.column("current").unwrap().enum_type.as_ref(), Some(&mood));
        assert_eq!(person.column("history").unwrap().enum_type.as_ref(), Some(&mood));
        assert!(person.column("name").unwrap().enum_type.is_none());
        assert_eq!(catalog.enum_type(&mood).unwrap().labels, vec!["sad", "ok", "happy"]);
    }

    #[test]
    fn test_unqualified_enum_in_same_schema() {
        let catalog = build(
            "CREATE TYPE app.mood AS ENUM ('sad');
             CREATE TABLE app.person (current mood);",
        )
        .unwrap();
        let column = catalog.find_table("app.person").unwrap().column("current").unwrap().clone();
        assert_eq!(column.enum_type, Some(QualifiedName::new("app", "mood")));
    }

    #[test]
    fn test_extra_types() {
        assert!(matches!(build("CREATE TABLE t (tree_path ltree);"), Err(DdlError::Finalize { .. })));

        let mut builder = CatalogBuilder::new(CatalogConfig::new().with_extra_type("ltree"));
        builder.add_source("t.sql", "CREATE TABLE t (tree_path ltree);").unwrap();
        assert!(builder.finish().is_ok());
    }

    #[test]
    fn test_generated_names_avoid_collisions() {
        let catalog = build(
            "CREATE TABLE t (email text UNIQUE, UNIQUE (email), CONSTRAINT t_pkey CHECK (email <> ''));",
        )
        .unwrap();
        let names: Vec<&str> = catalog.find_table("t").unwrap().constraints.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["t_email_key", "t_email_key1", "t_pkey"]);
    }

    #[test]
    fn test_duplicate_explicit_constraint_name() {
        let err = build("CREATE TABLE t (a int CONSTRAINT c UNIQUE, b int CONSTRAINT c UNIQUE);").unwrap_err();
        assert!(matches!(err, DdlError::DuplicateDefinition { kind: ObjectKind::Constraint, .. }));
    }

    #[test]
    fn test_duplicate_column() {
        let err = build("CREATE TABLE t (a int, a text);").unwrap_err();
        match err {
            DdlError::DuplicateDefinition { kind, name, .. } => {
                assert_eq!(kind, ObjectKind::Column);
                assert_eq!(name, "public.t.a");
            }
            _ => panic!("Expected DuplicateDefinition"),
        }
    }

    #[test]
    fn test_custom_naming_convention() {
        let naming = NamingConvention {
            index: "ix_{table}_{columns}".into(),
            ..Default::default()
        };
        let mut builder = CatalogBuilder::new(CatalogConfig::new().with_naming(naming));
        builder
            .add_source("t.sql", "CREATE TABLE t (a int, b int); CREATE INDEX ON t (a, b);")
            .unwrap();
        let catalog = builder.finish().unwrap();
        assert_eq!(catalog.find_table("t").unwrap().indexes[0].name, "ix_t_a_b");
    }

    #[test]
    fn test_index_on_unknown_table() {
        let err = build("CREATE INDEX idx ON nowhere (a);").unwrap_err();
        match &err.issues()[0] {
            DdlError::UnknownTable { table, .. } => assert_eq!(table, "public.nowhere"),
            _ => panic!("Expected UnknownTable"),
        }
    }

    #[test]
    fn test_index_columns_checked() {
        let err = build("CREATE TABLE t (a int); CREATE INDEX ON t (b) INCLUDE (c);").unwrap_err();
        assert_eq!(err.issues().len(), 2);
    }

    #[test]
    fn test_duplicate_index_name() {
        let err = build("CREATE TABLE t (a int); CREATE INDEX i ON t (a); CREATE INDEX i ON t (a);").unwrap_err();
        assert!(matches!(err, DdlError::DuplicateDefinition { kind: ObjectKind::Index, .. }));

        let catalog =
            build("CREATE TABLE t (a int); CREATE INDEX i ON t (a); CREATE INDEX IF NOT EXISTS i ON t (a);").unwrap();
        assert_eq!(catalog.find_table("t").unwrap().indexes.len(), 1);
    }

    #[test]
    fn test_view_or_replace() {
        let catalog = build(
            "CREATE VIEW v AS SELECT 1 AS one;
             CREATE TABLE t (id int);
             CREATE OR REPLACE VIEW v AS SELECT 2 AS two;",
        )
        .unwrap();
        let tables: Vec<&TableLike> = catalog.tables().collect();
        assert_eq!(tables[0].name.name, "v");
        assert_eq!(tables[0].columns[0].name, "two");
        assert!(tables[0].is_view());

        let err = build("CREATE TABLE t (id int); CREATE OR REPLACE VIEW t AS SELECT 1 AS id;").unwrap_err();
        assert!(matches!(err, DdlError::DuplicateDefinition { kind: ObjectKind::Table, .. }));
    }

    #[test]
    fn test_function_overloads() {
        let catalog = build(
            "CREATE FUNCTION f(a int) RETURNS int LANGUAGE sql AS $$ SELECT a $$;
             CREATE FUNCTION f(a text) RETURNS text LANGUAGE sql AS $$ SELECT a $$;
             CREATE OR REPLACE FUNCTION f(b int) RETURNS int LANGUAGE sql AS $$ SELECT b + 1 $$;",
        )
        .unwrap();
        let overloads = catalog.functions(&QualifiedName::new("public", "f"));
        assert_eq!(overloads.len(), 2);
        assert_eq!(overloads[0].routine.body.text, " SELECT b + 1 ");

        let err = build(
            "CREATE FUNCTION f(a int) RETURNS int LANGUAGE sql AS $$ SELECT a $$;
             CREATE FUNCTION f(b int) RETURNS int LANGUAGE sql AS $$ SELECT b $$;",
        )
        .unwrap_err();
        match err {
            DdlError::DuplicateDefinition { kind, name, .. } => {
                assert_eq!(kind, ObjectKind::Function);
                assert_eq!(name, "public.f(int)");
            }
            _ => panic!("Expected DuplicateDefinition"),
        }
    }

    #[test]
    fn test_function_returning_table_row() {
        let catalog = build(
            "CREATE TABLE users (id int);
             CREATE FUNCTION all_users() RETURNS SETOF users LANGUAGE sql AS $$ SELECT * FROM users $$;",
        )
        .unwrap();
        assert!(catalog.functions(&QualifiedName::new("public", "all_users"))[0].returns_set());
    }

    #[test]
    fn test_procedure_and_prepared() {
        let catalog = build(
            "CREATE PROCEDURE touch(id int) LANGUAGE sql AS $$ UPDATE t SET x = 1 WHERE t.id = id $$;
             PREPARE find_user (int) AS SELECT * FROM users WHERE id = $1;",
        )
        .unwrap();
        let procedure = catalog.procedure(&QualifiedName::new("public", "touch")).unwrap();
        assert_eq!(procedure.call_statement(catalog.default_schema()), "CALL touch(:arg0)");
        let prepared = catalog.prepared(&QualifiedName::new("public", "find_user")).unwrap();
        assert_eq!(prepared.parameters.len(), 1);

        let err = build("PREPARE p AS SELECT 1; PREPARE p AS SELECT 2;").unwrap_err();
        assert!(matches!(err, DdlError::DuplicateDefinition { kind: ObjectKind::PreparedStatement, .. }));
    }

    #[test]
    fn test_failed_source_rolls_back() {
        let mut builder = CatalogBuilder::default();
        builder.add_source("a.sql", "CREATE TABLE a (id int PRIMARY KEY);").unwrap();
        let err = builder
            .add_source("b.sql", "CREATE TABLE b (c_id int REFERENCES c(id)); CREATE TABLE a (id int);")
            .unwrap_err();
        assert!(matches!(err, DdlError::DuplicateDefinition { .. }));
        assert!(builder.catalog().find_table("b").is_none());
        assert_eq!(builder.pending_references().count(), 0);
        assert!(builder.finish().is_ok());
    }

    #[test]
    fn test_single_schema_per_source() {
        let config = CatalogConfig::new().with_single_schema_per_source(true);

        let mut builder = CatalogBuilder::new(config.clone());
        builder
            .add_source("app.sql", "CREATE SCHEMA app; CREATE TABLE app.t (id int); CREATE TABLE u (id int);")
            .unwrap();
        assert!(builder.catalog().find_table("app.t").is_some());

        let mut builder = CatalogBuilder::new(config.clone());
        let err = builder.add_source("x.sql", "CREATE SCHEMA app; CREATE SCHEMA other;").unwrap_err();
        assert!(matches!(err, DdlError::Parse { .. }));

        let mut builder = CatalogBuilder::new(config);
        let err = builder.add_source("x.sql", "CREATE SCHEMA app; CREATE TABLE other.t (id int);").unwrap_err();
        assert!(matches!(err, DdlError::Parse { .. }));
    }

    #[test]
    fn test_pending_references_visible_before_finish() {
        let mut builder = CatalogBuilder::default();
        builder.add_source("b.sql", "CREATE TABLE b (a_id int REFERENCES a(id));").unwrap();
        let pending: Vec<_> = builder.pending_references().collect();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].0, &QualifiedName::new("public", "a"));
        assert_eq!(pending[0].1.constraint, "b_a_id_fkey");

        builder.add_source("a.sql", "CREATE TABLE a (id int PRIMARY KEY);").unwrap();
        assert!(builder.finish().is_ok());
    }
}
