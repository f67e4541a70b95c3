/// PostgreSQL DDL front end
///
/// Architecture:
/// - Lexer: lazily tokenizes source text
/// - Splitter: cuts the token stream into top-level statements
/// - Parser: builds one AST node per statement, with the type and
///   expression sub-parsers as extensions of the same `Parser`

pub mod ast;
pub mod expr_parser;
pub mod lexer;
pub mod parser;
pub mod splitter;
pub mod token;
pub mod type_parser;

pub use ast::{ObjectName, ParsedStatement, Statement};
pub use expr_parser::parse_expression;
pub use lexer::Lexer;
pub use parser::{parse_source, parse_statement, Parser};
pub use splitter::{split_sql, split_statements, RawStatement};
pub use token::{Keyword, Span, Token, TokenType};
pub use type_parser::parse_type;
