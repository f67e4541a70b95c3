/// Statement splitter - cuts a token stream into top-level statements
///
/// Only semicolons outside parentheses end a statement. String literals,
/// quoted identifiers and dollar-quoted bodies are single tokens by the time
/// they reach the splitter, so semicolons inside them never split.
use super::lexer::Lexer;
use super::token::{Span, Token, TokenType};
use crate::error::Result;

/// Tokens of one statement, terminated by an `Eof` token
#[derive(Debug, Clone)]
pub struct RawStatement {
    pub tokens: Vec<Token>,
    /// Bytes covered by the statement, excluding the terminating semicolon
    pub span: Span,
}

impl RawStatement {
    /// Source text of the statement
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.span.start..self.span.end]
    }

    /// Number of tokens, not counting the trailing `Eof`
    pub fn len(&self) -> usize {
        self.tokens.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Split a lazily produced token stream into statements.
///
/// Empty statements (stray semicolons, trailing comments) are dropped.
/// A lexer failure aborts the split.
pub fn split_statements<I>(tokens: I) -> Result<Vec<RawStatement>>
where
    I: IntoIterator<Item = Result<Token>>,
{
    let mut statements = Vec::new();
    let mut current: Vec<Token> = Vec::new();
    let mut depth: usize = 0;

    for token in tokens {
        let token = token?;
        match token.token_type {
            TokenType::LParen => depth += 1,
            TokenType::RParen => depth = depth.saturating_sub(1),
            TokenType::Semicolon if depth == 0 => {
                finish(&mut statements, std::mem::take(&mut current), token.span.start, &token);
                continue;
            }
            TokenType::Eof => break,
            _ => {}
        }
        current.push(token);
    }

    if let Some(last) = current.last().cloned() {
        finish(&mut statements, current, last.span.end, &last);
    }

    Ok(statements)
}

/// Tokenize and split a source text in one step
pub fn split_sql(text: &str, source: &str) -> Result<Vec<RawStatement>> {
    split_statements(Lexer::with_source(text, source))
}

fn finish(statements: &mut Vec<RawStatement>, mut tokens: Vec<Token>, end: usize, anchor: &Token) {
    let (first, last) = match (tokens.first(), tokens.last()) {
        (Some(first), Some(last)) => (first.span, last.span),
        _ => return,
    };
    let span = Span::new(first.start, last.end);
    tokens.push(Token::new(TokenType::Eof, Span::new(end, end), anchor.line, anchor.column));
    statements.push(RawStatement { tokens, span });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_simple() {
        let sql = "CREATE SCHEMA a; CREATE SCHEMA b;";
        let statements = split_sql(sql, "t.sql").unwrap();
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0].text(sql), "CREATE SCHEMA a");
        assert_eq!(statements[1].text(sql), "CREATE SCHEMA b");
        assert!(matches!(statements[0].tokens.last().unwrap().token_type, TokenType::Eof));
    }

    #[test]
    fn test_split_drops_empty_statements() {
        let sql = ";; CREATE SCHEMA a ;\n -- trailing comment\n ; /* done */";
        let statements = split_sql(sql, "t.sql").unwrap();
        assert_eq!(statements.len(), 1);
        assert_eq!(statements[0].len(), 3);
    }

    #[test]
    fn test_split_keeps_dollar_quoted_body_whole() {
        let sql = "CREATE FUNCTION f() RETURNS int AS $$ SELECT 1; SELECT 2; $$ LANGUAGE sql; PREPARE p AS SELECT 1";
        let statements = split_sql(sql, "t.sql").unwrap();
        assert_eq!(statements.len(), 2);
        assert!(statements[0].text(sql).ends_with("LANGUAGE sql"));
        assert_eq!(statements[1].text(sql), "PREPARE p AS SELECT 1");
    }

    #[test]
    fn test_split_ignores_semicolons_in_strings_and_parens() {
        let sql = "CREATE TABLE t (a text DEFAULT ';', b text CHECK (b <> ';')); CREATE SCHEMA s";
        let statements = split_sql(sql, "t.sql").unwrap();
        assert_eq!(statements.len(), 2);
    }

    #[test]
    fn test_split_propagates_lex_error() {
        assert!(split_sql("CREATE SCHEMA a; 'open", "t.sql").is_err());
    }
}
