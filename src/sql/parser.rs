/// DDL Parser - converts one statement's tokens into an AST node
///
/// Every statement kind has its own `parse_*` method; `parse` dispatches on
/// the leading keywords. Anything outside the supported grammar is rejected
/// with `UnsupportedStatement` instead of being skipped.
use super::ast::*;
use super::expr_parser::names_column;
use super::splitter::{split_sql, RawStatement};
use super::token::{Keyword, Span, Token, TokenType};
use crate::diagnostic::Location;
use crate::error::{DdlError, Result};
use crate::types::{
    BodyKind, Column, EnumPragma, Exclusion, ExclusionElement, GeneratedColumn, GeneratedStorage, Identity,
    IdentityKind, IndexElement, MatchType, NullsOrder, OnCommit, Parameter, ParameterMode, PreparedParameters,
    ReferentialAction, Returns, RoutineBody, SortOrder, TypeRef, Volatility,
};

pub struct Parser<'a> {
    tokens: Vec<Token>,
    position: usize,
    text: &'a str,
    source: &'a str,
}

impl<'a> Parser<'a> {
    /// Parser over one split statement of `text`
    pub fn new(statement: RawStatement, text: &'a str, source: &'a str) -> Self {
        Self::from_tokens(statement.tokens, text, source)
    }

    /// Parser over arbitrary tokens of `text`; an `Eof` token is appended if missing
    pub fn from_tokens(mut tokens: Vec<Token>, text: &'a str, source: &'a str) -> Self {
        if !matches!(tokens.last().map(|t| &t.token_type), Some(TokenType::Eof)) {
            let (end, line, column) = tokens
                .last()
                .map(|t| (t.span.end, t.line, t.column))
                .unwrap_or((0, 1, 1));
            tokens.push(Token::new(TokenType::Eof, Span::new(end, end), line, column));
        }
        Self {
            tokens,
            position: 0,
            text,
            source,
        }
    }

    /// Parse the statement; trailing tokens are an error
    pub fn parse(&mut self) -> Result<Statement> {
        let stmt = match &self.current().token_type {
            TokenType::Keyword(Keyword::Create) => self.parse_create()?,
            TokenType::Keyword(Keyword::Prepare) => Statement::Prepare(self.parse_prepare()?),
            _ => return Err(self.unsupported(self.construct_at(0, 2))),
        };

        if !self.is_at_end() {
            return Err(self.error(format!("unexpected {} after {}", self.current().describe(), stmt.kind())));
        }

        Ok(stmt)
    }

    fn parse_create(&mut self) -> Result<Statement> {
        self.expect_keyword(Keyword::Create)?;

        let or_replace = if self.match_keyword(Keyword::Or) {
            self.expect_keyword(Keyword::Replace)?;
            true
        } else {
            false
        };
        let temporary = self.match_keyword(Keyword::Temporary) || self.match_keyword(Keyword::Temp);
        let unlogged = self.match_keyword(Keyword::Unlogged);
        let unique = self.match_keyword(Keyword::Unique);

        let object = self.current().clone();
        let modifier_error = |parser: &Self, modifier: &str| {
            parser.error(format!("{} is not valid for CREATE {}", modifier, object.describe()))
        };

        let stmt = match object.token_type {
            TokenType::Keyword(Keyword::Schema) => {
                if or_replace || temporary || unlogged || unique {
                    return Err(modifier_error(self, "modifier"));
                }
                Statement::CreateSchema(self.parse_create_schema()?)
            }
            TokenType::Keyword(Keyword::Type) => {
                if or_replace || temporary || unlogged || unique {
                    return Err(modifier_error(self, "modifier"));
                }
                Statement::CreateEnum(self.parse_create_type()?)
            }
            TokenType::Keyword(Keyword::Table) => {
                if or_replace {
                    return Err(modifier_error(self, "OR REPLACE"));
                }
                if unique {
                    return Err(modifier_error(self, "UNIQUE"));
                }
                Statement::CreateTable(self.parse_create_table(temporary, unlogged)?)
            }
            TokenType::Keyword(Keyword::View | Keyword::Materialized | Keyword::Recursive) => {
                if unlogged || unique {
                    return Err(modifier_error(self, "modifier"));
                }
                Statement::CreateView(self.parse_create_view(or_replace, temporary)?)
            }
            TokenType::Keyword(Keyword::Index) => {
                if or_replace || temporary || unlogged {
                    return Err(modifier_error(self, "modifier"));
                }
                Statement::CreateIndex(self.parse_create_index(unique)?)
            }
            TokenType::Keyword(Keyword::Function) => {
                if temporary || unlogged || unique {
                    return Err(modifier_error(self, "modifier"));
                }
                Statement::CreateFunction(self.parse_create_function(or_replace)?)
            }
            TokenType::Keyword(Keyword::Procedure) => {
                if temporary || unlogged || unique {
                    return Err(modifier_error(self, "modifier"));
                }
                Statement::CreateProcedure(self.parse_create_procedure(or_replace)?)
            }
            _ => return Err(self.unsupported(self.construct_at(0, self.position + 1))),
        };

        Ok(stmt)
    }

    /// CREATE SCHEMA [IF NOT EXISTS] name
    fn parse_create_schema(&mut self) -> Result<CreateSchemaStmt> {
        self.expect_keyword(Keyword::Schema)?;
        let if_not_exists = self.parse_if_not_exists()?;
        let name = self.parse_name()?;
        Ok(CreateSchemaStmt { name, if_not_exists })
    }

    /// CREATE TYPE name AS ENUM [(labels)] [PRAGMA (...)]
    fn parse_create_type(&mut self) -> Result<CreateEnumStmt> {
        self.expect_keyword(Keyword::Type)?;
        let name = self.parse_object_name()?;
        self.expect_keyword(Keyword::As)?;

        if !self.match_keyword(Keyword::Enum) {
            let what = match &self.current().token_type {
                TokenType::LParen => "composite".to_string(),
                _ => self.current().describe(),
            };
            return Err(self.unsupported(format!("CREATE TYPE ... AS {}", what)));
        }

        let mut labels = Vec::new();
        if self.match_token(TokenType::LParen) {
            if !self.match_token(TokenType::RParen) {
                loop {
                    match &self.current().token_type {
                        TokenType::String(label) => {
                            labels.push(label.clone());
                            self.advance();
                        }
                        _ => return Err(self.error(format!("expected enum label, found {}", self.current().describe()))),
                    }
                    if !self.match_token(TokenType::Comma) {
                        break;
                    }
                }
                self.expect(TokenType::RParen)?;
            }
        }

        let pragma_location = self.location();
        let pragma = if self.check_keyword(Keyword::Pragma) {
            Some(self.parse_enum_pragma()?)
        } else {
            None
        };

        let class_name = pragma.as_ref().and_then(|p| p.class_name.as_ref());
        let attribute = pragma.as_ref().and_then(|p| p.attribute.as_ref());
        if labels.is_empty() && class_name.is_none() {
            return Err(self.error_at(pragma_location, format!("enum {} needs labels or a PRAGMA CLASS", name)));
        }
        if attribute.is_some() && class_name.is_none() {
            return Err(self.error_at(pragma_location, "PRAGMA ATTRIBUTE requires CLASS"));
        }
        if attribute.is_some() && !labels.is_empty() {
            return Err(self.error_at(pragma_location, "PRAGMA ATTRIBUTE cannot be combined with enum labels"));
        }
        let data_type = pragma.as_ref().and_then(|p| p.data_type.as_ref());
        if attribute.is_some() && data_type.is_none() {
            return Err(self.error_at(pragma_location, "PRAGMA ATTRIBUTE requires a DATA TYPE"));
        }
        if let Some(data_type) = data_type.filter(|t| !is_text(t)) {
            if class_name.is_none() {
                return Err(self.error_at(
                    pragma_location,
                    format!("invalid enum data type {}: labelled enums are stored as text", data_type),
                ));
            }
            if !labels.is_empty() {
                return Err(self.error_at(
                    pragma_location,
                    format!("enum labels cannot be combined with DATA TYPE {}", data_type),
                ));
            }
        }

        Ok(CreateEnumStmt { name, labels, pragma })
    }

    fn parse_enum_pragma(&mut self) -> Result<EnumPragma> {
        self.expect_keyword(Keyword::Pragma)?;
        self.expect(TokenType::LParen)?;
        let mut pragma = EnumPragma::default();

        loop {
            if self.match_keyword(Keyword::Class) {
                pragma.class_name = Some(self.parse_string()?);
            } else if self.match_keyword(Keyword::Data) {
                self.expect_keyword(Keyword::Type)?;
                pragma.data_type = Some(self.parse_type_ref()?);
            } else if self.match_keyword(Keyword::Attribute) {
                pragma.attribute = Some(self.parse_string()?);
            } else {
                return Err(self.error(format!("unknown enum PRAGMA option {}", self.current().describe())));
            }
            if !self.match_token(TokenType::Comma) {
                break;
            }
        }

        self.expect(TokenType::RParen)?;
        Ok(pragma)
    }

    /// CREATE [TEMP] [UNLOGGED] TABLE [IF NOT EXISTS] name (elements) [ON COMMIT ...]
    fn parse_create_table(&mut self, temporary: bool, unlogged: bool) -> Result<CreateTableStmt> {
        self.expect_keyword(Keyword::Table)?;
        let if_not_exists = self.parse_if_not_exists()?;
        let name = self.parse_object_name()?;

        let mut columns: Vec<ColumnDef> = Vec::new();
        let mut constraints = Vec::new();

        self.expect(TokenType::LParen)?;
        if !self.check(&TokenType::RParen) {
            loop {
                if self.is_table_constraint_start() {
                    constraints.push(self.parse_table_constraint()?);
                } else {
                    let (column, inline) = self.parse_column_def()?;
                    columns.push(column);
                    constraints.extend(inline);
                }
                if !self.match_token(TokenType::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenType::RParen)?;

        let on_commit = if self.check_keyword(Keyword::On) {
            let location = self.location();
            let on_commit = self.parse_on_commit()?;
            if !temporary {
                return Err(self.error_at(location, "ON COMMIT is only valid for temporary tables"));
            }
            Some(on_commit)
        } else {
            None
        };

        // Only one primary key per table
        let mut primary_keys = constraints.iter().filter(|c| matches!(c.kind, ConstraintDef::PrimaryKey));
        if let (Some(_), Some(second)) = (primary_keys.next(), primary_keys.next()) {
            return Err(self.error_at(second.location.clone(), format!("multiple primary keys for table {}", name)));
        }

        for constraint in &mut constraints {
            match &constraint.kind {
                ConstraintDef::PrimaryKey => {
                    for key in &constraint.columns {
                        if let Some(def) = columns.iter_mut().find(|c| &c.column.name == key) {
                            def.column.nullable = false;
                        }
                    }
                }
                // Table-level checks constrain the columns they mention
                ConstraintDef::Check { expression } if !constraint.inline => {
                    constraint.columns = expression
                        .references
                        .iter()
                        .filter(|r| columns.iter().any(|c| &&c.column.name == r))
                        .cloned()
                        .collect();
                }
                _ => {}
            }
        }

        Ok(CreateTableStmt {
            name,
            if_not_exists,
            temporary,
            unlogged,
            on_commit,
            columns,
            constraints,
        })
    }

    fn parse_on_commit(&mut self) -> Result<OnCommit> {
        self.expect_keyword(Keyword::On)?;
        self.expect_keyword(Keyword::Commit)?;
        if self.match_keyword(Keyword::Drop) {
            Ok(OnCommit::Drop)
        } else if self.match_keyword(Keyword::Preserve) {
            self.expect_keyword(Keyword::Rows)?;
            Ok(OnCommit::PreserveRows)
        } else if self.match_keyword(Keyword::Delete) {
            self.expect_keyword(Keyword::Rows)?;
            Ok(OnCommit::DeleteRows)
        } else {
            Err(self.error(format!(
                "expected DROP, PRESERVE ROWS or DELETE ROWS, found {}",
                self.current().describe()
            )))
        }
    }

    fn is_table_constraint_start(&self) -> bool {
        matches!(
            self.current().token_type,
            TokenType::Keyword(
                Keyword::Constraint
                    | Keyword::Primary
                    | Keyword::Unique
                    | Keyword::Check
                    | Keyword::Foreign
                    | Keyword::Exclude
            )
        )
    }

    /// Column definition plus its inline constraints
    fn parse_column_def(&mut self) -> Result<(ColumnDef, Vec<TableConstraint>)> {
        let location = self.location();
        let name = self.parse_name()?;
        let data_type = self.parse_type_ref()?;
        let mut column = Column::new(name.clone(), Some(data_type));
        let mut constraints = Vec::new();
        let mut constraint_name: Option<String> = None;

        loop {
            let clause_location = self.location();
            let inline = |kind: ConstraintDef, constraint_name: &mut Option<String>| TableConstraint {
                name: constraint_name.take(),
                columns: vec![name.clone()],
                kind,
                inline: true,
                location: clause_location.clone(),
            };

            match &self.current().token_type {
                TokenType::Comma | TokenType::RParen | TokenType::Eof => break,
                TokenType::Keyword(Keyword::Constraint) => {
                    self.advance();
                    constraint_name = Some(self.parse_name()?);
                }
                TokenType::Keyword(Keyword::Not) => {
                    self.advance();
                    self.expect_keyword(Keyword::Null)?;
                    column.nullable = false;
                    constraint_name = None;
                }
                TokenType::Keyword(Keyword::Null) => {
                    self.advance();
                    column.nullable = true;
                    constraint_name = None;
                }
                TokenType::Keyword(Keyword::Default) => {
                    self.advance();
                    column.default = Some(self.parse_default_expression()?);
                }
                TokenType::Keyword(Keyword::Primary) => {
                    self.advance();
                    self.expect_keyword(Keyword::Key)?;
                    column.nullable = false; // PRIMARY KEY implies NOT NULL
                    constraints.push(inline(ConstraintDef::PrimaryKey, &mut constraint_name));
                }
                TokenType::Keyword(Keyword::Unique) => {
                    self.advance();
                    let nulls_not_distinct = self.parse_nulls_distinct()?;
                    constraints.push(inline(ConstraintDef::Unique { nulls_not_distinct }, &mut constraint_name));
                }
                TokenType::Keyword(Keyword::Check) => {
                    self.advance();
                    let expression = self.parse_parenthesized_expression()?;
                    constraints.push(inline(ConstraintDef::Check { expression }, &mut constraint_name));
                }
                TokenType::Keyword(Keyword::References) => {
                    let reference = self.parse_reference()?;
                    constraints.push(inline(ConstraintDef::ForeignKey(reference), &mut constraint_name));
                }
                TokenType::Keyword(Keyword::Generated) => {
                    self.advance();
                    self.parse_generated(&mut column)?;
                }
                TokenType::Keyword(Keyword::Collate) => {
                    self.advance();
                    column.collation = Some(self.parse_name()?);
                }
                TokenType::Keyword(Keyword::As) => {
                    self.advance();
                    column.alias = Some(self.parse_name()?);
                }
                _ => {
                    return Err(self.error(format!(
                        "unexpected {} in definition of column {}",
                        self.current().describe(),
                        name
                    )))
                }
            }
        }

        Ok((ColumnDef { column, location }, constraints))
    }

    /// After GENERATED: ALWAYS AS (expr) [STORED|VIRTUAL] or
    /// ALWAYS|BY DEFAULT AS IDENTITY [(options)]
    fn parse_generated(&mut self, column: &mut Column) -> Result<()> {
        let kind = if self.match_keyword(Keyword::Always) {
            IdentityKind::Always
        } else if self.match_keyword(Keyword::By) {
            self.expect_keyword(Keyword::Default)?;
            IdentityKind::ByDefault
        } else {
            return Err(self.error(format!("expected ALWAYS or BY DEFAULT, found {}", self.current().describe())));
        };
        self.expect_keyword(Keyword::As)?;

        if self.match_keyword(Keyword::Identity) {
            let options = if self.check(&TokenType::LParen) {
                Some(self.parse_parenthesized_expression()?.text)
            } else {
                None
            };
            column.identity = Some(Identity { kind, options });
            column.nullable = false;
            return Ok(());
        }

        if kind != IdentityKind::Always {
            return Err(self.error("generated columns must be GENERATED ALWAYS"));
        }
        let expression = self.parse_parenthesized_expression()?;
        let storage = if self.match_keyword(Keyword::Virtual) {
            GeneratedStorage::Virtual
        } else {
            // PostgreSQL before 18 only has STORED; treat an omitted keyword the same way
            self.match_keyword(Keyword::Stored);
            GeneratedStorage::Stored
        };
        column.generated = Some(GeneratedColumn { expression, storage });
        Ok(())
    }

    /// [NULLS [NOT] DISTINCT]; true for NOT DISTINCT
    fn parse_nulls_distinct(&mut self) -> Result<bool> {
        if !self.match_keyword(Keyword::Nulls) {
            return Ok(false);
        }
        let not = self.match_keyword(Keyword::Not);
        self.expect_keyword(Keyword::Distinct)?;
        Ok(not)
    }

    /// REFERENCES table [(columns)] [MATCH ...] [ON UPDATE|DELETE action]
    /// [[NOT] DEFERRABLE] [INITIALLY DEFERRED|IMMEDIATE] [PRAGMA (use_alter)]
    fn parse_reference(&mut self) -> Result<ReferenceDef> {
        self.expect_keyword(Keyword::References)?;
        let table = self.parse_object_name()?;
        let columns = if self.check(&TokenType::LParen) {
            self.parse_name_list()?
        } else {
            Vec::new()
        };

        let mut reference = ReferenceDef {
            table,
            columns,
            on_update: None,
            on_delete: None,
            match_type: None,
            deferrable: false,
            initially_deferred: false,
            use_alter: false,
        };

        loop {
            if self.match_keyword(Keyword::Match) {
                reference.match_type = Some(if self.match_keyword(Keyword::Full) {
                    MatchType::Full
                } else if self.match_keyword(Keyword::Partial) {
                    MatchType::Partial
                } else if self.match_keyword(Keyword::Simple) {
                    MatchType::Simple
                } else {
                    return Err(self.error(format!("expected FULL, PARTIAL or SIMPLE, found {}", self.current().describe())));
                });
            } else if self.check_keyword(Keyword::On) {
                self.advance();
                if self.match_keyword(Keyword::Update) {
                    reference.on_update = Some(self.parse_referential_action()?);
                } else if self.match_keyword(Keyword::Delete) {
                    reference.on_delete = Some(self.parse_referential_action()?);
                } else {
                    return Err(self.error(format!("expected UPDATE or DELETE, found {}", self.current().describe())));
                }
            } else if self.match_keyword(Keyword::Deferrable) {
                reference.deferrable = true;
            } else if self.check_keyword(Keyword::Not) && self.peek(1).is_keyword(Keyword::Deferrable) {
                self.advance();
                self.advance();
                reference.deferrable = false;
            } else if self.match_keyword(Keyword::Initially) {
                if self.match_keyword(Keyword::Deferred) {
                    reference.initially_deferred = true;
                } else if self.match_keyword(Keyword::Immediate) {
                    reference.initially_deferred = false;
                } else {
                    return Err(self.error(format!("expected DEFERRED or IMMEDIATE, found {}", self.current().describe())));
                }
            } else if self.match_keyword(Keyword::Pragma) {
                self.expect(TokenType::LParen)?;
                loop {
                    if self.match_word("use_alter") {
                        reference.use_alter = true;
                    } else {
                        return Err(self.error(format!(
                            "unknown foreign key PRAGMA option {}",
                            self.current().describe()
                        )));
                    }
                    if !self.match_token(TokenType::Comma) {
                        break;
                    }
                }
                self.expect(TokenType::RParen)?;
            } else {
                break;
            }
        }

        Ok(reference)
    }

    fn parse_referential_action(&mut self) -> Result<ReferentialAction> {
        if self.match_keyword(Keyword::Cascade) {
            Ok(ReferentialAction::Cascade)
        } else if self.match_keyword(Keyword::Restrict) {
            Ok(ReferentialAction::Restrict)
        } else if self.match_keyword(Keyword::No) {
            self.expect_keyword(Keyword::Action)?;
            Ok(ReferentialAction::NoAction)
        } else if self.match_keyword(Keyword::Set) {
            if self.match_keyword(Keyword::Null) {
                Ok(ReferentialAction::SetNull)
            } else if self.match_keyword(Keyword::Default) {
                Ok(ReferentialAction::SetDefault)
            } else {
                Err(self.error(format!("expected NULL or DEFAULT, found {}", self.current().describe())))
            }
        } else {
            Err(self.error(format!("expected referential action, found {}", self.current().describe())))
        }
    }

    /// Table-level constraint, optionally named
    fn parse_table_constraint(&mut self) -> Result<TableConstraint> {
        let location = self.location();
        let name = if self.match_keyword(Keyword::Constraint) {
            Some(self.parse_name()?)
        } else {
            None
        };

        let (columns, kind) = match &self.current().token_type {
            TokenType::Keyword(Keyword::Primary) => {
                self.advance();
                self.expect_keyword(Keyword::Key)?;
                (self.parse_name_list()?, ConstraintDef::PrimaryKey)
            }
            TokenType::Keyword(Keyword::Unique) => {
                self.advance();
                let nulls_not_distinct = self.parse_nulls_distinct()?;
                (self.parse_name_list()?, ConstraintDef::Unique { nulls_not_distinct })
            }
            TokenType::Keyword(Keyword::Check) => {
                self.advance();
                let expression = self.parse_parenthesized_expression()?;
                (Vec::new(), ConstraintDef::Check { expression })
            }
            TokenType::Keyword(Keyword::Foreign) => {
                self.advance();
                self.expect_keyword(Keyword::Key)?;
                let columns = self.parse_name_list()?;
                (columns, ConstraintDef::ForeignKey(self.parse_reference()?))
            }
            TokenType::Keyword(Keyword::Exclude) => {
                self.advance();
                let exclusion = self.parse_exclusion()?;
                let columns = exclusion.elements.iter().filter_map(|e| e.column.clone()).collect();
                (columns, ConstraintDef::Exclusion(exclusion))
            }
            _ => {
                return Err(self.error(format!(
                    "expected PRIMARY KEY, UNIQUE, CHECK, FOREIGN KEY or EXCLUDE, found {}",
                    self.current().describe()
                )))
            }
        };

        Ok(TableConstraint {
            name,
            columns,
            kind,
            inline: false,
            location,
        })
    }

    /// After EXCLUDE: [USING method] (element WITH operator, ...) [WHERE (predicate)]
    fn parse_exclusion(&mut self) -> Result<Exclusion> {
        let using = if self.match_keyword(Keyword::Using) {
            Some(self.parse_name()?)
        } else {
            None
        };

        self.expect(TokenType::LParen)?;
        let mut elements = Vec::new();
        loop {
            let start = self.position;
            let expression = self.parse_expression_until(|token, _, _| token.is_keyword(Keyword::With))?;
            let column = self.single_name_between(start, self.position);
            self.expect_keyword(Keyword::With)?;
            let operator = match &self.current().token_type {
                TokenType::Operator(op) => op.clone(),
                _ => return Err(self.error(format!("expected operator, found {}", self.current().describe()))),
            };
            self.advance();
            elements.push(ExclusionElement {
                expression,
                column,
                operator,
            });
            if !self.match_token(TokenType::Comma) {
                break;
            }
        }
        self.expect(TokenType::RParen)?;

        let predicate = if self.match_keyword(Keyword::Where) {
            Some(self.parse_parenthesized_expression()?)
        } else {
            None
        };

        Ok(Exclusion {
            using,
            elements,
            predicate,
        })
    }

    /// CREATE [OR REPLACE] [TEMP] [MATERIALIZED|RECURSIVE] VIEW name [(columns)] AS query
    fn parse_create_view(&mut self, or_replace: bool, temporary: bool) -> Result<CreateViewStmt> {
        let materialized = self.match_keyword(Keyword::Materialized);
        let recursive = !materialized && self.match_keyword(Keyword::Recursive);
        self.expect_keyword(Keyword::View)?;
        let if_not_exists = self.parse_if_not_exists()?;
        let name = self.parse_object_name()?;
        let explicit_columns = if self.check(&TokenType::LParen) {
            self.parse_name_list()?
        } else {
            Vec::new()
        };
        if recursive && explicit_columns.is_empty() {
            return Err(self.error("recursive views need a column list"));
        }

        self.expect_keyword(Keyword::As)?;
        let start = self.position;
        if self.is_at_end() {
            return Err(self.error("expected view query"));
        }
        while !self.is_at_end() {
            self.advance();
        }
        let query = self.text_between(start, self.position).to_string();
        let columns = if explicit_columns.is_empty() {
            self.infer_select_columns(start)
        } else {
            explicit_columns
        };

        Ok(CreateViewStmt {
            name,
            or_replace,
            if_not_exists,
            temporary,
            materialized,
            recursive,
            columns,
            query,
        })
    }

    /// Output column names of a plain `SELECT` list starting at token `start`.
    ///
    /// Items without a recognisable name (`*`, unaliased expressions) are
    /// skipped.
    fn infer_select_columns(&self, start: usize) -> Vec<String> {
        let tokens = &self.tokens[start..];
        let mut i = match tokens.first().and_then(|t| t.as_word()) {
            Some("select") => 1,
            _ => return Vec::new(),
        };
        if tokens.get(i).is_some_and(|t| t.is_keyword(Keyword::Distinct)) {
            i += 1;
        }

        let mut columns = Vec::new();
        let mut item: Vec<&Token> = Vec::new();
        let mut depth = 0usize;
        for token in &tokens[i..] {
            let at_end = depth == 0
                && (matches!(token.token_type, TokenType::Comma | TokenType::Eof)
                    || token.as_word() == Some("from"));
            if at_end {
                if let Some(name) = select_item_name(&item) {
                    columns.push(name);
                }
                item.clear();
                if !matches!(token.token_type, TokenType::Comma) {
                    break;
                }
                continue;
            }
            match token.token_type {
                TokenType::LParen => depth += 1,
                TokenType::RParen => depth = depth.saturating_sub(1),
                _ => {}
            }
            item.push(token);
        }
        columns
    }

    /// CREATE [UNIQUE] INDEX [CONCURRENTLY] [[IF NOT EXISTS] name] ON [ONLY] table
    /// [USING method] (elements) [INCLUDE (columns)] [NULLS [NOT] DISTINCT] [WHERE predicate]
    fn parse_create_index(&mut self, unique: bool) -> Result<CreateIndexStmt> {
        self.expect_keyword(Keyword::Index)?;
        let concurrently = self.match_keyword(Keyword::Concurrently);
        let if_not_exists = self.parse_if_not_exists()?;
        let name = if self.check_keyword(Keyword::On) {
            if if_not_exists {
                return Err(self.error("IF NOT EXISTS requires an index name"));
            }
            None
        } else {
            Some(self.parse_name()?)
        };

        self.expect_keyword(Keyword::On)?;
        let only = self.match_keyword(Keyword::Only);
        let table = self.parse_object_name()?;
        let using = if self.match_keyword(Keyword::Using) {
            Some(self.parse_name()?)
        } else {
            None
        };

        self.expect(TokenType::LParen)?;
        let mut elements = Vec::new();
        loop {
            elements.push(self.parse_index_element()?);
            if !self.match_token(TokenType::Comma) {
                break;
            }
        }
        self.expect(TokenType::RParen)?;

        let include = if self.match_keyword(Keyword::Include) {
            self.parse_name_list()?
        } else {
            Vec::new()
        };
        let nulls_not_distinct = self.parse_nulls_distinct()?;
        let predicate = if self.match_keyword(Keyword::Where) {
            Some(self.parse_predicate()?)
        } else {
            None
        };

        Ok(CreateIndexStmt {
            name,
            if_not_exists,
            unique,
            concurrently,
            only,
            table,
            using,
            elements,
            include,
            nulls_not_distinct,
            predicate,
        })
    }

    /// column | function(...) | (expression), then [COLLATE c] [opclass] [ASC|DESC] [NULLS FIRST|LAST]
    fn parse_index_element(&mut self) -> Result<IndexElement> {
        let start = self.position;
        let (expression, column) = if self.check(&TokenType::LParen) {
            (self.parse_parenthesized_expression()?, None)
        } else if matches!(self.peek(1).token_type, TokenType::LParen)
            || matches!(self.peek(1).token_type, TokenType::Dot)
        {
            // function call, possibly schema-qualified
            self.parse_name()?;
            if self.match_token(TokenType::Dot) {
                self.parse_name()?;
            }
            self.skip_parenthesized()?;
            (self.expression_between(start, self.position), None)
        } else {
            let name = self.parse_name()?;
            (self.expression_between(start, self.position), Some(name))
        };

        let collation = if self.match_keyword(Keyword::Collate) {
            Some(self.parse_name()?)
        } else {
            None
        };

        let opclass = match &self.current().token_type {
            TokenType::Identifier(_) | TokenType::QuotedIdentifier(_) => Some(self.parse_name()?),
            _ => None,
        };

        let order = if self.match_keyword(Keyword::Asc) {
            Some(SortOrder::Asc)
        } else if self.match_keyword(Keyword::Desc) {
            Some(SortOrder::Desc)
        } else {
            None
        };

        let nulls = if self.match_keyword(Keyword::Nulls) {
            if self.match_keyword(Keyword::First) {
                Some(NullsOrder::First)
            } else if self.match_keyword(Keyword::Last) {
                Some(NullsOrder::Last)
            } else {
                return Err(self.error(format!("expected FIRST or LAST, found {}", self.current().describe())));
            }
        } else {
            None
        };

        Ok(IndexElement {
            expression,
            column,
            collation,
            opclass,
            order,
            nulls,
        })
    }

    /// CREATE [OR REPLACE] FUNCTION name (params) [RETURNS ...] attributes body
    fn parse_create_function(&mut self, or_replace: bool) -> Result<CreateFunctionStmt> {
        self.expect_keyword(Keyword::Function)?;
        let name = self.parse_object_name()?;
        let parameters = self.parse_parameters()?;

        let mut returns = None;
        let mut attributes = RoutineAttributes::default();
        let mut body = None;

        while !self.is_at_end() {
            if self.check_keyword(Keyword::Returns) && !self.peek(1).is_keyword(Keyword::Null) {
                if returns.is_some() {
                    return Err(self.error("duplicate RETURNS clause"));
                }
                self.advance();
                returns = Some(self.parse_returns()?);
            } else {
                self.parse_routine_clause(&mut attributes, &mut body)?;
            }
        }

        let body = body.ok_or_else(|| self.error(format!("function {} has no body", name)))?;

        Ok(CreateFunctionStmt {
            name,
            or_replace,
            parameters,
            returns,
            attributes,
            body,
        })
    }

    /// CREATE [OR REPLACE] PROCEDURE name (params) attributes body
    fn parse_create_procedure(&mut self, or_replace: bool) -> Result<CreateProcedureStmt> {
        self.expect_keyword(Keyword::Procedure)?;
        let name = self.parse_object_name()?;
        let parameters = self.parse_parameters()?;

        let mut attributes = RoutineAttributes::default();
        let mut body = None;
        while !self.is_at_end() {
            if self.check_keyword(Keyword::Returns) {
                return Err(self.error("procedures cannot have a RETURNS clause"));
            }
            self.parse_routine_clause(&mut attributes, &mut body)?;
        }
        let body = body.ok_or_else(|| self.error(format!("procedure {} has no body", name)))?;

        Ok(CreateProcedureStmt {
            name,
            or_replace,
            parameters,
            attributes,
            body,
        })
    }

    fn parse_returns(&mut self) -> Result<Returns> {
        if self.match_keyword(Keyword::Setof) {
            return Ok(Returns::SetOf(self.parse_type_ref()?));
        }
        if self.match_keyword(Keyword::Table) {
            self.expect(TokenType::LParen)?;
            let mut columns = Vec::new();
            loop {
                let name = self.parse_name()?;
                columns.push((name, self.parse_type_ref()?));
                if !self.match_token(TokenType::Comma) {
                    break;
                }
            }
            self.expect(TokenType::RParen)?;
            return Ok(Returns::Table(columns));
        }
        Ok(Returns::Scalar(self.parse_type_ref()?))
    }

    /// One attribute or the body of a routine
    fn parse_routine_clause(&mut self, attributes: &mut RoutineAttributes, body: &mut Option<RoutineBody>) -> Result<()> {
        let token = self.current().clone();
        match &token.token_type {
            TokenType::Keyword(Keyword::Language) => {
                self.advance();
                let language = match &self.current().token_type {
                    TokenType::String(s) => {
                        let s = s.to_lowercase();
                        self.advance();
                        s
                    }
                    _ => self.parse_name()?,
                };
                attributes.language = Some(language);
            }
            TokenType::Keyword(Keyword::Immutable) => {
                self.advance();
                attributes.volatility = Some(Volatility::Immutable);
            }
            TokenType::Keyword(Keyword::Stable) => {
                self.advance();
                attributes.volatility = Some(Volatility::Stable);
            }
            TokenType::Keyword(Keyword::Volatile) => {
                self.advance();
                attributes.volatility = Some(Volatility::Volatile);
            }
            TokenType::Keyword(Keyword::Strict) => {
                self.advance();
                attributes.strict = true;
            }
            TokenType::Keyword(Keyword::Called) => {
                self.advance();
                self.expect_null_input()?;
                attributes.strict = false;
            }
            TokenType::Keyword(Keyword::Returns) => {
                // RETURNS NULL ON NULL INPUT
                self.advance();
                self.expect_keyword(Keyword::Null)?;
                self.expect_null_input()?;
                attributes.strict = true;
            }
            TokenType::Keyword(Keyword::Security) => {
                self.advance();
                if self.match_keyword(Keyword::Definer) {
                    attributes.security_definer = true;
                } else {
                    self.expect_keyword(Keyword::Invoker)?;
                    attributes.security_definer = false;
                }
            }
            TokenType::Keyword(Keyword::Leakproof) => {
                self.advance();
                attributes.leakproof = true;
            }
            TokenType::Keyword(Keyword::Not) => {
                self.advance();
                self.expect_keyword(Keyword::Leakproof)?;
                attributes.leakproof = false;
            }
            TokenType::Keyword(Keyword::Parallel) => {
                self.advance();
                attributes.parallel = Some(self.parse_name()?);
            }
            TokenType::Keyword(Keyword::Cost) => {
                self.advance();
                attributes.cost = Some(self.parse_number()?);
            }
            TokenType::Keyword(Keyword::Rows) => {
                self.advance();
                attributes.rows = Some(self.parse_number()?);
            }
            TokenType::Keyword(Keyword::As) => {
                self.ensure_no_body(body)?;
                self.advance();
                let start = self.position;
                let (kind, text) = match &self.current().token_type {
                    TokenType::DollarQuoted { tag, body } => (BodyKind::DollarQuoted { tag: tag.clone() }, body.clone()),
                    TokenType::String(s) => (BodyKind::StringLiteral, s.clone()),
                    _ => return Err(self.error(format!("expected routine body, found {}", self.current().describe()))),
                };
                self.advance();
                if self.check(&TokenType::Comma) {
                    return Err(self.unsupported("AS 'object file', 'link symbol'"));
                }
                *body = Some(RoutineBody {
                    kind,
                    text,
                    source: self.text_between(start, self.position).to_string(),
                });
            }
            TokenType::Keyword(Keyword::Return) => {
                self.ensure_no_body(body)?;
                let start = self.position;
                self.advance();
                let expression = self.parse_expression_until(|_, _, _| false)?;
                *body = Some(RoutineBody {
                    kind: BodyKind::SqlStandard,
                    text: expression.text,
                    source: self.text_between(start, self.position).to_string(),
                });
            }
            TokenType::Keyword(Keyword::Begin) if self.peek(1).is_keyword(Keyword::Atomic) => {
                return Err(self.unsupported("BEGIN ATOMIC routine body"));
            }
            TokenType::Keyword(Keyword::Set) => {
                return Err(self.unsupported("SET configuration_parameter in routine definition"));
            }
            _ => {
                return Err(self.error(format!("unexpected {} in routine definition", token.describe())));
            }
        }
        Ok(())
    }

    fn ensure_no_body(&self, body: &Option<RoutineBody>) -> Result<()> {
        if body.is_some() {
            return Err(self.error("duplicate routine body"));
        }
        Ok(())
    }

    /// ON NULL INPUT
    fn expect_null_input(&mut self) -> Result<()> {
        self.expect_keyword(Keyword::On)?;
        self.expect_keyword(Keyword::Null)?;
        self.expect_keyword(Keyword::Input)
    }

    /// (param, ...) with param = [mode] [name] type [DEFAULT expr | = expr]
    fn parse_parameters(&mut self) -> Result<Vec<Parameter>> {
        self.expect(TokenType::LParen)?;
        let mut parameters = Vec::new();
        if self.match_token(TokenType::RParen) {
            return Ok(parameters);
        }

        loop {
            let mode = if self.match_keyword(Keyword::In) {
                ParameterMode::In
            } else if self.match_keyword(Keyword::Out) {
                ParameterMode::Out
            } else if self.match_keyword(Keyword::Inout) {
                ParameterMode::InOut
            } else if self.match_keyword(Keyword::Variadic) {
                ParameterMode::Variadic
            } else {
                ParameterMode::In
            };

            // A parameter is unnamed when a type alone spans the whole of it
            let start = self.position;
            let unnamed = match self.parse_type_ref() {
                Ok(data_type) if self.at_parameter_end() => Some(data_type),
                _ => None,
            };
            let (name, data_type) = match unnamed {
                Some(data_type) => (None, data_type),
                None => {
                    self.position = start;
                    let name = self.parse_name()?;
                    (Some(name), self.parse_type_ref()?)
                }
            };

            let default = if self.match_keyword(Keyword::Default) || self.match_operator("=") {
                Some(self.parse_expression_until(|_, _, _| false)?)
            } else {
                None
            };

            parameters.push(Parameter {
                mode,
                name,
                data_type,
                default,
            });

            if !self.match_token(TokenType::Comma) {
                break;
            }
        }

        self.expect(TokenType::RParen)?;
        Ok(parameters)
    }

    fn at_parameter_end(&self) -> bool {
        let token = self.current();
        matches!(token.token_type, TokenType::Comma | TokenType::RParen)
            || token.is_keyword(Keyword::Default)
            || matches!(&token.token_type, TokenType::Operator(op) if op == "=")
    }

    /// PREPARE name [(types)] AS query
    fn parse_prepare(&mut self) -> Result<PrepareStmt> {
        self.expect_keyword(Keyword::Prepare)?;
        let name = self.parse_object_name()?;

        let mut parameter_types = Vec::new();
        if self.match_token(TokenType::LParen) {
            loop {
                parameter_types.push(self.parse_type_ref()?);
                if !self.match_token(TokenType::Comma) {
                    break;
                }
            }
            self.expect(TokenType::RParen)?;
        }

        self.expect_keyword(Keyword::As)?;
        if self.is_at_end() {
            return Err(self.error(format!("prepared statement {} has an empty body", name)));
        }

        let start = self.position;
        let mut named: Vec<String> = Vec::new();
        let mut positional: Vec<u32> = Vec::new();
        let mut first_of_other_kind: Option<Location> = None;

        while !self.is_at_end() {
            match &self.current().token_type {
                TokenType::Named(param) => {
                    if !positional.is_empty() && first_of_other_kind.is_none() {
                        first_of_other_kind = Some(self.location());
                    }
                    if !named.contains(param) {
                        named.push(param.clone());
                    }
                }
                TokenType::Positional(n) => {
                    if !named.is_empty() && first_of_other_kind.is_none() {
                        first_of_other_kind = Some(self.location());
                    }
                    if !positional.contains(n) {
                        positional.push(*n);
                    }
                }
                _ => {}
            }
            self.advance();
        }

        if let Some(location) = first_of_other_kind {
            return Err(self.error_at(
                location,
                format!("prepared statement {} mixes :name and $n placeholders", name),
            ));
        }

        let parameters = if !named.is_empty() {
            PreparedParameters::Named(named)
        } else if !positional.is_empty() {
            PreparedParameters::Positional(positional)
        } else {
            PreparedParameters::None
        };

        Ok(PrepareStmt {
            name,
            parameter_types,
            parameters,
            body: self.text_between(start, self.position).to_string(),
        })
    }

    // Helper methods

    fn parse_if_not_exists(&mut self) -> Result<bool> {
        if self.match_keyword(Keyword::If) {
            self.expect_keyword(Keyword::Not)?;
            self.expect_keyword(Keyword::Exists)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Identifier, quoted identifier or keyword used as a name
    pub(crate) fn parse_name(&mut self) -> Result<String> {
        match self.current().as_name() {
            Some(name) => {
                let name = name.to_string();
                self.advance();
                Ok(name)
            }
            None => Err(self.error(format!("expected name, found {}", self.current().describe()))),
        }
    }

    /// name or schema.name
    pub(crate) fn parse_object_name(&mut self) -> Result<ObjectName> {
        let first = self.parse_name()?;
        if self.match_token(TokenType::Dot) {
            let name = self.parse_name()?;
            Ok(ObjectName::new(Some(first), name))
        } else {
            Ok(ObjectName::bare(first))
        }
    }

    /// (name, ...)
    fn parse_name_list(&mut self) -> Result<Vec<String>> {
        self.expect(TokenType::LParen)?;
        let mut names = Vec::new();
        loop {
            names.push(self.parse_name()?);
            if !self.match_token(TokenType::Comma) {
                break;
            }
        }
        self.expect(TokenType::RParen)?;
        Ok(names)
    }

    fn parse_string(&mut self) -> Result<String> {
        match &self.current().token_type {
            TokenType::String(s) => {
                let s = s.clone();
                self.advance();
                Ok(s)
            }
            _ => Err(self.error(format!("expected string literal, found {}", self.current().describe()))),
        }
    }

    fn parse_number(&mut self) -> Result<String> {
        match &self.current().token_type {
            TokenType::Number(n) => {
                let n = n.clone();
                self.advance();
                Ok(n)
            }
            _ => Err(self.error(format!("expected number, found {}", self.current().describe()))),
        }
    }

    /// Advance past a balanced `( ... )` group
    pub(crate) fn skip_parenthesized(&mut self) -> Result<()> {
        self.expect(TokenType::LParen)?;
        let mut depth = 1usize;
        while depth > 0 {
            match self.current().token_type {
                TokenType::LParen => depth += 1,
                TokenType::RParen => depth -= 1,
                TokenType::Eof => return Err(self.error("unbalanced parentheses")),
                _ => {}
            }
            self.advance();
        }
        Ok(())
    }

    /// Name when the tokens in `start..end` are exactly one name
    pub(crate) fn single_name_between(&self, start: usize, end: usize) -> Option<String> {
        if end != start + 1 {
            return None;
        }
        let token = &self.tokens[start];
        match &token.token_type {
            TokenType::Identifier(name) | TokenType::QuotedIdentifier(name) => Some(name.clone()),
            TokenType::Keyword(keyword) if names_column(*keyword, &[token], 0) => Some(keyword.as_str().to_string()),
            _ => None,
        }
    }

    /// Source text covered by tokens `start..end`
    pub(crate) fn text_between(&self, start: usize, end: usize) -> &'a str {
        if end <= start || end > self.tokens.len() {
            return "";
        }
        let from = self.tokens[start].span.start;
        let to = self.tokens[end - 1].span.end;
        self.text.get(from..to).unwrap_or("")
    }

    /// Up to `count` leading words of the statement, for unsupported-statement errors
    fn construct_at(&self, start: usize, count: usize) -> String {
        let words: Vec<String> = self.tokens[start..]
            .iter()
            .take_while(|t| t.as_word().is_some())
            .take(count)
            .map(|t| t.describe().to_uppercase())
            .collect();
        if words.is_empty() {
            self.tokens[start].describe()
        } else {
            words.join(" ")
        }
    }

    pub(crate) fn current(&self) -> &Token {
        &self.tokens[self.position]
    }

    pub(crate) fn peek(&self, offset: usize) -> &Token {
        let index = (self.position + offset).min(self.tokens.len() - 1);
        &self.tokens[index]
    }

    pub(crate) fn token_at(&self, index: usize) -> &Token {
        &self.tokens[index.min(self.tokens.len() - 1)]
    }

    pub(crate) fn position(&self) -> usize {
        self.position
    }

    pub(crate) fn set_position(&mut self, position: usize) {
        self.position = position.min(self.tokens.len() - 1);
    }

    pub(crate) fn advance(&mut self) {
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
    }

    pub(crate) fn is_at_end(&self) -> bool {
        matches!(self.current().token_type, TokenType::Eof)
    }

    pub(crate) fn check(&self, token_type: &TokenType) -> bool {
        std::mem::discriminant(&self.current().token_type) == std::mem::discriminant(token_type)
    }

    pub(crate) fn match_token(&mut self, token_type: TokenType) -> bool {
        if self.check(&token_type) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, token_type: TokenType) -> Result<()> {
        if self.check(&token_type) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!(
                "expected {}, found {}",
                token_type.describe(),
                self.current().describe()
            )))
        }
    }

    pub(crate) fn check_keyword(&self, keyword: Keyword) -> bool {
        self.current().is_keyword(keyword)
    }

    pub(crate) fn match_keyword(&mut self, keyword: Keyword) -> bool {
        if self.check_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect_keyword(&mut self, keyword: Keyword) -> Result<()> {
        if self.match_keyword(keyword) {
            Ok(())
        } else {
            Err(self.error(format!("expected {}, found {}", keyword, self.current().describe())))
        }
    }

    /// Unquoted non-keyword word
    fn match_word(&mut self, word: &str) -> bool {
        if matches!(&self.current().token_type, TokenType::Identifier(w) if w == word) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_operator(&mut self, op: &str) -> bool {
        if matches!(&self.current().token_type, TokenType::Operator(o) if o == op) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn location(&self) -> Location {
        self.location_of(self.current())
    }

    pub(crate) fn location_of(&self, token: &Token) -> Location {
        Location::new(self.source, token.span.start, token.line, token.column)
    }

    pub(crate) fn error(&self, message: impl Into<String>) -> DdlError {
        self.error_at(self.location(), message)
    }

    pub(crate) fn error_at(&self, location: Location, message: impl Into<String>) -> DdlError {
        DdlError::Parse {
            location,
            message: message.into(),
        }
    }

    pub(crate) fn type_error(&self, message: impl Into<String>) -> DdlError {
        DdlError::TypeSyntax {
            location: self.location(),
            message: message.into(),
        }
    }

    fn unsupported(&self, construct: impl Into<String>) -> DdlError {
        DdlError::UnsupportedStatement {
            location: self.location_of(&self.tokens[0]),
            construct: construct.into(),
        }
    }
}

/// Output name of one select-list item
/// Plain `text`, optionally written as `pg_catalog.text`
fn is_text(data_type: &TypeRef) -> bool {
    data_type.name == "text"
        && data_type.array_dims.is_empty()
        && data_type.schema.as_deref().map_or(true, |s| s == "pg_catalog")
}

fn select_item_name(item: &[&Token]) -> Option<String> {
    let name_of = |token: &Token| match &token.token_type {
        TokenType::Identifier(name) | TokenType::QuotedIdentifier(name) => Some(name.clone()),
        _ => None,
    };
    match item {
        [] => None,
        [single] => name_of(single),
        [.., before, last] => {
            if before.is_keyword(Keyword::As) || matches!(before.token_type, TokenType::Dot) {
                last.as_name().map(str::to_string)
            } else {
                None
            }
        }
    }
}

/// Parse one statement's source text.
///
/// Convenience for callers holding a single statement; the text may end with
/// a semicolon.
pub fn parse_statement(text: &str, source: &str) -> Result<ParsedStatement> {
    let mut statements = parse_source(text, source)?;
    match statements.len() {
        1 => Ok(statements.remove(0)),
        0 => Err(DdlError::Parse {
            location: Location::new(source, 0, 1, 1),
            message: "no statement found".to_string(),
        }),
        _ => Err(DdlError::Parse {
            location: statements[1].location.clone(),
            message: "expected a single statement".to_string(),
        }),
    }
}

/// Tokenize, split and parse a whole source text
pub fn parse_source(text: &str, source: &str) -> Result<Vec<ParsedStatement>> {
    let raw = split_sql(text, source)?;
    let mut statements = Vec::with_capacity(raw.len());

    for statement in raw {
        let statement_text = statement.text(text).to_string();
        let location = match statement.tokens.first() {
            Some(first) => Location::new(source, first.span.start, first.line, first.column),
            None => Location::new(source, statement.span.start, 1, 1),
        };
        let mut parser = Parser::new(statement, text, source);
        statements.push(ParsedStatement {
            statement: parser.parse()?,
            text: statement_text,
            location,
        });
    }

    Ok(statements)
}
