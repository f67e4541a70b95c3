/// SQL Lexer - converts DDL source text into tokens
///
/// The lexer is lazy: it implements `Iterator<Item = Result<Token>>` and only
/// scans as far as the consumer pulls. Comments and whitespace are skipped.
/// Restarting means building a new lexer over the same text (or `reset`).
use super::token::{Keyword, Span, Token, TokenType};
use crate::diagnostic::{Location, ANONYMOUS_SOURCE};
use crate::error::{DdlError, Result};

/// Characters PostgreSQL allows inside operators
const OPERATOR_CHARS: &str = "+-*/<>=~!@#%^&|`?";

pub struct Lexer<'a> {
    input: &'a str,
    source: String,
    position: usize,
    line: usize,
    column: usize,
    finished: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self::with_source(input, ANONYMOUS_SOURCE)
    }

    /// Lexer whose error locations name `source`
    pub fn with_source(input: &'a str, source: impl Into<String>) -> Self {
        Self {
            input,
            source: source.into(),
            position: 0,
            line: 1,
            column: 1,
            finished: false,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Rewind to the start of the text
    pub fn reset(&mut self) {
        self.position = 0;
        self.line = 1;
        self.column = 1;
        self.finished = false;
    }

    /// Tokenize the whole text; the last token is always `Eof`
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token()?;
            let is_eof = matches!(token.token_type, TokenType::Eof);
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        Ok(tokens)
    }

    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_trivia()?;

        let start = self.position;
        let line = self.line;
        let column = self.column;

        let ch = match self.current_char() {
            Some(ch) => ch,
            None => return Ok(Token::new(TokenType::Eof, Span::new(start, start), line, column)),
        };

        let token_type = match ch {
            '\'' => self.read_string(false)?,
            '"' => self.read_quoted_identifier()?,
            '$' => self.read_dollar()?,
            ':' => self.read_colon(),
            '0'..='9' => self.read_number()?,
            '.' if self.peek_char().is_some_and(|c| c.is_ascii_digit()) => self.read_number()?,
            c if c == '_' || c.is_alphabetic() => {
                if (c == 'e' || c == 'E') && self.peek_char() == Some('\'') {
                    self.advance();
                    self.read_string(true)?
                } else {
                    self.read_identifier()
                }
            }
            '(' => self.single(TokenType::LParen),
            ')' => self.single(TokenType::RParen),
            '[' => self.single(TokenType::LBracket),
            ']' => self.single(TokenType::RBracket),
            ',' => self.single(TokenType::Comma),
            ';' => self.single(TokenType::Semicolon),
            '.' => self.single(TokenType::Dot),
            c if OPERATOR_CHARS.contains(c) => self.read_operator(),
            _ => {
                return Err(self.error_at(start, line, column, format!("unexpected character '{}'", ch)));
            }
        };

        Ok(Token::new(token_type, Span::new(start, self.position), line, column))
    }

    fn single(&mut self, token_type: TokenType) -> TokenType {
        self.advance();
        token_type
    }

    fn current_char(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn peek_char(&self) -> Option<char> {
        let mut chars = self.input[self.position..].chars();
        chars.next();
        chars.next()
    }

    fn rest(&self) -> &'a str {
        &self.input[self.position..]
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current_char() {
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            self.position += ch.len_utf8();
        }
    }

    fn advance_by(&mut self, bytes: usize) {
        let target = self.position + bytes;
        while self.position < target && self.current_char().is_some() {
            self.advance();
        }
    }

    fn is_eof(&self) -> bool {
        self.position >= self.input.len()
    }

    fn error_at(&self, offset: usize, line: usize, column: usize, message: String) -> DdlError {
        DdlError::Lex {
            location: Location::new(self.source.clone(), offset, line, column),
            message,
        }
    }

    /// Skip whitespace and comments
    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            match self.current_char() {
                Some(c) if c.is_whitespace() => self.advance(),
                Some('-') if self.peek_char() == Some('-') => self.skip_line_comment(),
                Some('/') if self.peek_char() == Some('*') => self.skip_block_comment()?,
                _ => return Ok(()),
            }
        }
    }

    fn skip_line_comment(&mut self) {
        while !self.is_eof() && self.current_char() != Some('\n') {
            self.advance();
        }
    }

    /// Block comments nest in PostgreSQL
    fn skip_block_comment(&mut self) -> Result<()> {
        let (start, line, column) = (self.position, self.line, self.column);
        self.advance_by(2);
        let mut depth = 1;

        while !self.is_eof() {
            let rest = self.rest();
            if rest.starts_with("*/") {
                self.advance_by(2);
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            } else if rest.starts_with("/*") {
                self.advance_by(2);
                depth += 1;
            } else {
                self.advance();
            }
        }

        Err(self.error_at(start, line, column, "unterminated block comment".to_string()))
    }

    /// `'...'` with `''` escapes; `E'...'` additionally honours backslash escapes
    fn read_string(&mut self, escapes: bool) -> Result<TokenType> {
        let (start, line, column) = (self.position, self.line, self.column);
        self.advance(); // skip opening quote
        let mut value = String::new();

        loop {
            let ch = match self.current_char() {
                Some(ch) => ch,
                None => {
                    return Err(self.error_at(start, line, column, "unterminated string literal".to_string()))
                }
            };

            if ch == '\'' {
                self.advance();
                if self.current_char() == Some('\'') {
                    value.push('\'');
                    self.advance();
                    continue;
                }
                return Ok(TokenType::String(value));
            }

            if escapes && ch == '\\' {
                self.advance();
                let escaped = match self.current_char() {
                    Some('n') => '\n',
                    Some('t') => '\t',
                    Some('r') => '\r',
                    Some('b') => '\u{8}',
                    Some('f') => '\u{c}',
                    Some(c) => c,
                    None => {
                        return Err(self.error_at(start, line, column, "unterminated string literal".to_string()))
                    }
                };
                value.push(escaped);
                self.advance();
                continue;
            }

            value.push(ch);
            self.advance();
        }
    }

    fn read_quoted_identifier(&mut self) -> Result<TokenType> {
        let (start, line, column) = (self.position, self.line, self.column);
        self.advance(); // skip opening quote
        let mut value = String::new();

        loop {
            match self.current_char() {
                None => {
                    return Err(self.error_at(start, line, column, "unterminated quoted identifier".to_string()))
                }
                Some('"') => {
                    self.advance();
                    if self.current_char() == Some('"') {
                        value.push('"');
                        self.advance();
                        continue;
                    }
                    if value.is_empty() {
                        return Err(self.error_at(start, line, column, "zero-length quoted identifier".to_string()));
                    }
                    return Ok(TokenType::QuotedIdentifier(value));
                }
                Some(ch) => {
                    value.push(ch);
                    self.advance();
                }
            }
        }
    }

    /// `$1` placeholder or `$tag$ ... $tag$` dollar-quoted string
    fn read_dollar(&mut self) -> Result<TokenType> {
        let (start, line, column) = (self.position, self.line, self.column);
        let rest = self.rest();

        if self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            let digits: String = rest[1..].chars().take_while(|c| c.is_ascii_digit()).collect();
            self.advance_by(1 + digits.len());
            return digits
                .parse::<u32>()
                .map(TokenType::Positional)
                .map_err(|_| self.error_at(start, line, column, format!("invalid parameter ${}", digits)));
        }

        let tag_end = match find_dollar_tag_end(rest) {
            Some(end) => end,
            None => return Err(self.error_at(start, line, column, "unexpected character '$'".to_string())),
        };
        let delimiter = &rest[..=tag_end];
        let tag = delimiter[1..delimiter.len() - 1].to_string();
        let body_start = tag_end + 1;

        match rest[body_start..].find(delimiter) {
            Some(close) => {
                let body = rest[body_start..body_start + close].to_string();
                self.advance_by(body_start + close + delimiter.len());
                Ok(TokenType::DollarQuoted { tag, body })
            }
            None => Err(self.error_at(
                start,
                line,
                column,
                format!("unterminated dollar-quoted string {}", delimiter),
            )),
        }
    }

    fn read_colon(&mut self) -> TokenType {
        self.advance();
        match self.current_char() {
            Some(':') => {
                self.advance();
                TokenType::DoubleColon
            }
            Some(c) if c == '_' || c.is_alphabetic() => {
                let mut name = String::new();
                while let Some(c) = self.current_char() {
                    if c == '_' || c.is_alphanumeric() {
                        name.push(c);
                        self.advance();
                    } else {
                        break;
                    }
                }
                TokenType::Named(name)
            }
            _ => TokenType::Colon,
        }
    }

    fn read_number(&mut self) -> Result<TokenType> {
        let (start, line, column) = (self.position, self.line, self.column);
        let mut seen_dot = false;

        while let Some(c) = self.current_char() {
            if c.is_ascii_digit() || c == '_' {
                self.advance();
            } else if c == '.' && !seen_dot && !self.rest().starts_with("..") {
                seen_dot = true;
                self.advance();
            } else {
                break;
            }
        }

        // Scientific notation (e.g., 1.5e10)
        if matches!(self.current_char(), Some('e') | Some('E')) {
            let mut lookahead = self.rest()[1..].chars();
            let next = lookahead.next();
            let exponent = match next {
                Some('+') | Some('-') => lookahead.next().is_some_and(|c| c.is_ascii_digit()),
                Some(c) => c.is_ascii_digit(),
                None => false,
            };
            if exponent {
                self.advance();
                if matches!(self.current_char(), Some('+') | Some('-')) {
                    self.advance();
                }
                while self.current_char().is_some_and(|c| c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }

        if self.current_char().is_some_and(|c| c == '_' || c.is_alphabetic()) {
            return Err(self.error_at(start, line, column, "trailing junk after numeric literal".to_string()));
        }

        Ok(TokenType::Number(self.input[start..self.position].to_string()))
    }

    fn read_identifier(&mut self) -> TokenType {
        let start = self.position;

        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' || ch == '$' {
                self.advance();
            } else {
                break;
            }
        }

        let word = self.input[start..self.position].to_lowercase();
        match Keyword::lookup(&word) {
            Some(keyword) => TokenType::Keyword(keyword),
            None => TokenType::Identifier(word),
        }
    }

    /// Longest run of operator characters, cut before comment starts.
    ///
    /// A multi-character operator may only end in `+` or `-` if it also
    /// contains one of `~ ! @ # % ^ & | \` ?`, so `=-1` lexes as `=` `-` `1`.
    fn read_operator(&mut self) -> TokenType {
        let rest = self.rest();
        let mut len = 0;
        for (i, c) in rest.char_indices() {
            if !OPERATOR_CHARS.contains(c) {
                break;
            }
            if i > 0 && (rest[i..].starts_with("--") || rest[i..].starts_with("/*")) {
                break;
            }
            len = i + c.len_utf8();
        }

        let mut op = &rest[..len];
        if op.len() > 1 && !op.chars().any(|c| "~!@#%^&|`?".contains(c)) {
            while op.len() > 1 && (op.ends_with('+') || op.ends_with('-')) {
                op = &op[..op.len() - 1];
            }
        }

        let op = op.to_string();
        self.advance_by(op.len());
        TokenType::Operator(op)
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_token() {
            Ok(token) if matches!(token.token_type, TokenType::Eof) => {
                self.finished = true;
                None
            }
            Ok(token) => Some(Ok(token)),
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}

/// Find the closing `$` of a dollar-quote opener at the start of `text`.
///
/// Accepts `$$` and `$ident$`; the tag may not start with a digit.
fn find_dollar_tag_end(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    if bytes.len() < 2 || bytes[0] != b'$' {
        return None;
    }
    if bytes[1] == b'$' {
        return Some(1);
    }
    if !(bytes[1].is_ascii_alphabetic() || bytes[1] == b'_') {
        return None;
    }
    let mut i = 2;
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
        i += 1;
    }
    if i < bytes.len() && bytes[i] == b'$' {
        Some(i)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(sql: &str) -> Vec<TokenType> {
        Lexer::new(sql)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.token_type)
            .collect()
    }

    #[test]
    fn test_lexer_simple_create() {
        let tokens = types("CREATE TABLE Widgets (id int)");
        assert_eq!(tokens.len(), 8); // CREATE, TABLE, widgets, (, id, int, ), EOF
        assert_eq!(tokens[0], TokenType::Keyword(Keyword::Create));
        assert_eq!(tokens[2], TokenType::Identifier("widgets".into()));
        assert!(matches!(tokens[7], TokenType::Eof));
    }

    #[test]
    fn test_lexer_quoted_identifier_preserves_case() {
        let tokens = types(r#""MixedCase" "with ""quote""""#);
        assert_eq!(tokens[0], TokenType::QuotedIdentifier("MixedCase".into()));
        assert_eq!(tokens[1], TokenType::QuotedIdentifier("with \"quote\"".into()));
    }

    #[test]
    fn test_lexer_string_literals() {
        let tokens = types(r"'it''s' E'a\nb'");
        assert_eq!(tokens[0], TokenType::String("it's".into()));
        assert_eq!(tokens[1], TokenType::String("a\nb".into()));
    }

    #[test]
    fn test_lexer_numbers() {
        let tokens = types("42 1.25 .5 1e10 2.5E-3");
        assert_eq!(tokens[0], TokenType::Number("42".into()));
        assert_eq!(tokens[1], TokenType::Number("1.25".into()));
        assert_eq!(tokens[2], TokenType::Number(".5".into()));
        assert_eq!(tokens[3], TokenType::Number("1e10".into()));
        assert_eq!(tokens[4], TokenType::Number("2.5E-3".into()));
    }

    #[test]
    fn test_lexer_operators() {
        let tokens = types("= <> && @> || =-1 ::");
        assert_eq!(tokens[0], TokenType::Operator("=".into()));
        assert_eq!(tokens[1], TokenType::Operator("<>".into()));
        assert_eq!(tokens[2], TokenType::Operator("&&".into()));
        assert_eq!(tokens[3], TokenType::Operator("@>".into()));
        assert_eq!(tokens[4], TokenType::Operator("||".into()));
        assert_eq!(tokens[5], TokenType::Operator("=".into()));
        assert_eq!(tokens[6], TokenType::Operator("-".into()));
        assert_eq!(tokens[7], TokenType::Number("1".into()));
        assert_eq!(tokens[8], TokenType::DoubleColon);
    }

    #[test]
    fn test_lexer_comments() {
        let tokens = types("a -- line comment\n/* block /* nested */ still */ b");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1], TokenType::Identifier("b".into()));
    }

    #[test]
    fn test_lexer_dollar_quote() {
        let sql = "AS $body$ SELECT 1; $$ inner $$ $body$ LANGUAGE sql";
        let tokens = types(sql);
        assert_eq!(
            tokens[1],
            TokenType::DollarQuoted {
                tag: "body".into(),
                body: " SELECT 1; $$ inner $$ ".into()
            }
        );
        assert_eq!(tokens[2], TokenType::Keyword(Keyword::Language));
    }

    #[test]
    fn test_lexer_placeholders() {
        let tokens = types("$1 :name x::int a[1:2]");
        assert_eq!(tokens[0], TokenType::Positional(1));
        assert_eq!(tokens[1], TokenType::Named("name".into()));
        assert_eq!(tokens[3], TokenType::DoubleColon);
        assert!(tokens.contains(&TokenType::Colon));
    }

    #[test]
    fn test_lexer_spans_and_lines() {
        let sql = "CREATE\n  TABLE t";
        let tokens = Lexer::new(sql).tokenize().unwrap();
        assert_eq!(tokens[1].line, 2);
        assert_eq!(tokens[1].column, 3);
        assert_eq!(&sql[tokens[1].span.start..tokens[1].span.end], "TABLE");
    }

    #[test]
    fn test_lexer_unterminated_string() {
        let err = Lexer::with_source("SELECT 'oops", "bad.sql").tokenize().unwrap_err();
        match err {
            DdlError::Lex { location, .. } => {
                assert_eq!(location.source, "bad.sql");
                assert_eq!(location.offset, 7);
            }
            other => panic!("Expected lex error, got {:?}", other),
        }
    }

    #[test]
    fn test_lexer_unterminated_dollar_quote() {
        let err = Lexer::new("AS $$ SELECT 1;").tokenize().unwrap_err();
        assert!(matches!(err, DdlError::Lex { .. }));
    }

    #[test]
    fn test_lexer_is_lazy_and_restartable() {
        let mut lexer = Lexer::new("a b 'unterminated");
        assert!(matches!(lexer.next(), Some(Ok(_))));
        assert!(matches!(lexer.next(), Some(Ok(_))));
        assert!(matches!(lexer.next(), Some(Err(_))));
        assert!(lexer.next().is_none());

        lexer.reset();
        let first = lexer.next().unwrap().unwrap();
        assert_eq!(first.token_type, TokenType::Identifier("a".into()));
    }
}
