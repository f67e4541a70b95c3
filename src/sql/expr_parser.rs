/// Expression capture for defaults, checks, generated columns and predicates
///
/// Expressions are never evaluated. The parser finds where an expression
/// ends (balanced brackets, stop keywords), keeps its source text verbatim
/// and recognises a handful of literal forms.
use super::lexer::Lexer;
use super::parser::Parser;
use super::token::{Keyword, Token, TokenType};
use crate::diagnostic::ANONYMOUS_SOURCE;
use crate::error::Result;
use crate::types::{Expression, Literal, Sentinel};

// Words that read like names inside expressions but never name a column
const EXPRESSION_WORDS: &[&str] = &[
    "and", "or", "is", "at", "like", "ilike", "similar", "between", "any", "all", "some", "case", "when", "then", "else",
    "end", "cast", "coalesce", "nullif", "greatest", "least", "exists", "interval",
];

impl<'a> Parser<'a> {
    /// Capture tokens up to a depth-0 `,` or `)`, the end of the statement,
    /// or a depth-0 token accepted by `stop(token, previous, next)`.
    pub(crate) fn parse_expression_until<F>(&mut self, stop: F) -> Result<Expression>
    where
        F: Fn(&Token, Option<&Token>, &Token) -> bool,
    {
        let start = self.position();
        let mut depth = 0usize;

        loop {
            let token = self.current();
            match token.token_type {
                TokenType::Eof if depth > 0 => return Err(self.error("unbalanced brackets in expression")),
                TokenType::Eof => break,
                TokenType::LParen | TokenType::LBracket => depth += 1,
                TokenType::RParen | TokenType::RBracket if depth == 0 => break,
                TokenType::RParen | TokenType::RBracket => depth -= 1,
                TokenType::Comma if depth == 0 => break,
                _ if depth == 0 => {
                    let previous = (self.position() > start).then(|| self.token_at(self.position() - 1));
                    if stop(token, previous, self.peek(1)) {
                        break;
                    }
                }
                _ => {}
            }
            self.advance();
        }

        let end = self.position();
        if end == start {
            return Err(self.error(format!("expected expression, found {}", self.current().describe())));
        }
        Ok(self.expression_between(start, end))
    }

    /// Column default, ending where the next column constraint begins
    pub(crate) fn parse_default_expression(&mut self) -> Result<Expression> {
        self.parse_expression_until(ends_default)
    }

    /// `( expression )`, returning the inner expression
    pub(crate) fn parse_parenthesized_expression(&mut self) -> Result<Expression> {
        self.expect(TokenType::LParen)?;
        let expression = self.parse_expression_until(|_, _, _| false)?;
        self.expect(TokenType::RParen)?;
        Ok(expression)
    }

    /// Predicate running to the end of the statement; one pair of
    /// parentheses around the whole predicate is dropped
    pub(crate) fn parse_predicate(&mut self) -> Result<Expression> {
        let start = self.position();
        self.parse_expression_until(|_, _, _| false)?;
        let end = self.position();

        let wrapped = matches!(self.token_at(start).token_type, TokenType::LParen)
            && self.matching_paren(start) == Some(end - 1);
        if wrapped && end - start > 2 {
            Ok(self.expression_between(start + 1, end - 1))
        } else {
            Ok(self.expression_between(start, end))
        }
    }

    /// Index of the `)` closing the `(` at `open`
    fn matching_paren(&self, open: usize) -> Option<usize> {
        let mut depth = 0usize;
        let mut index = open;
        loop {
            match self.token_at(index).token_type {
                TokenType::LParen => depth += 1,
                TokenType::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(index);
                    }
                }
                TokenType::Eof => return None,
                _ => {}
            }
            index += 1;
        }
    }

    /// Expression over tokens `start..end`
    pub(crate) fn expression_between(&self, start: usize, end: usize) -> Expression {
        let tokens: Vec<&Token> = (start..end).map(|i| self.token_at(i)).collect();
        Expression {
            text: self.text_between(start, end).to_string(),
            literal: classify_literal(&tokens),
            references: collect_references(&tokens),
        }
    }
}

/// Stop rule for column defaults
fn ends_default(token: &Token, previous: Option<&Token>, next: &Token) -> bool {
    let after_is = previous.and_then(|p| p.as_word()).is_some_and(|w| w == "is" || w == "not");
    match token.token_type {
        TokenType::Keyword(
            Keyword::Constraint
            | Keyword::Primary
            | Keyword::Unique
            | Keyword::References
            | Keyword::Check
            | Keyword::Generated
            | Keyword::Default
            | Keyword::Collate
            | Keyword::As,
        ) => true,
        TokenType::Keyword(Keyword::Not) => next.is_keyword(Keyword::Null) && previous.is_some() && !after_is,
        TokenType::Keyword(Keyword::Null) => previous.is_some() && !after_is,
        _ => false,
    }
}

/// Typed value of a bare literal or sentinel, if the tokens are exactly one
fn classify_literal(tokens: &[&Token]) -> Option<Literal> {
    match tokens {
        [token] => match &token.token_type {
            TokenType::Number(n) => number_literal(n, false),
            TokenType::String(s) => Some(Literal::String(s.clone())),
            TokenType::Keyword(Keyword::True) => Some(Literal::Boolean(true)),
            TokenType::Keyword(Keyword::False) => Some(Literal::Boolean(false)),
            TokenType::Keyword(Keyword::Null) => Some(Literal::Null),
            TokenType::Identifier(word) => Sentinel::from_keyword(word).map(Literal::Sentinel),
            _ => None,
        },
        [sign, number] => match (&sign.token_type, &number.token_type) {
            (TokenType::Operator(op), TokenType::Number(n)) if op == "-" => number_literal(n, true),
            (TokenType::Operator(op), TokenType::Number(n)) if op == "+" => number_literal(n, false),
            _ => None,
        },
        [function, open, close] => match (&function.token_type, &open.token_type, &close.token_type) {
            (TokenType::Identifier(name), TokenType::LParen, TokenType::RParen) => {
                Sentinel::from_call(name).map(Literal::Sentinel)
            }
            _ => None,
        },
        _ => None,
    }
}

fn number_literal(text: &str, negative: bool) -> Option<Literal> {
    let digits: String = text.chars().filter(|c| *c != '_').collect();
    let signed = if negative { format!("-{}", digits) } else { digits };

    if !signed.contains(|c: char| matches!(c, '.' | 'e' | 'E')) {
        if let Ok(value) = signed.parse::<i64>() {
            return Some(Literal::Integer(value));
        }
    }
    signed.parse::<f64>().ok().map(Literal::Float)
}

/// Names used as values: not function names, cast targets or qualifiers
fn collect_references(tokens: &[&Token]) -> Vec<String> {
    let mut references: Vec<String> = Vec::new();

    for (i, token) in tokens.iter().enumerate() {
        let next = tokens.get(i + 1).map(|t| &t.token_type);
        let name = match &token.token_type {
            TokenType::Identifier(name) if !EXPRESSION_WORDS.contains(&name.as_str()) => name.as_str(),
            TokenType::QuotedIdentifier(name) => name.as_str(),
            TokenType::Keyword(keyword) if names_column(*keyword, tokens, i) => keyword.as_str(),
            _ => continue,
        };
        if matches!(next, Some(TokenType::LParen) | Some(TokenType::Dot)) {
            continue;
        }
        let previous = i.checked_sub(1).map(|p| &tokens[p].token_type);
        if matches!(previous, Some(TokenType::DoubleColon)) {
            continue;
        }
        if Sentinel::from_keyword(name).is_some() && matches!(token.token_type, TokenType::Identifier(_)) {
            continue;
        }
        if !references.iter().any(|r| r == name) {
            references.push(name.to_string());
        }
    }

    references
}

/// Whether a keyword at `i` is used as a column name rather than as
/// expression syntax (`NOT NULL`, `IN (...)`, `AT TIME ZONE`, casts)
pub(super) fn names_column(keyword: Keyword, tokens: &[&Token], i: usize) -> bool {
    match keyword {
        Keyword::Not
        | Keyword::Null
        | Keyword::True
        | Keyword::False
        | Keyword::In
        | Keyword::Or
        | Keyword::Distinct
        | Keyword::Exists
        | Keyword::Array
        | Keyword::With
        | Keyword::Without
        | Keyword::Zone
        | Keyword::Precision
        | Keyword::Varying
        | Keyword::Collate
        | Keyword::Setof => false,
        Keyword::Time | Keyword::Timestamp => {
            let next = tokens.get(i + 1);
            let previous = i.checked_sub(1).map(|p| tokens[p]);
            let typed = next.is_some_and(|t| {
                t.is_keyword(Keyword::Zone)
                    || t.is_keyword(Keyword::With)
                    || t.is_keyword(Keyword::Without)
                    || matches!(t.token_type, TokenType::String(_))
            });
            let after_at = previous.and_then(|t| t.as_word()).is_some_and(|w| w == "at");
            !typed && !after_at
        }
        _ => true,
    }
}

/// Parse a standalone expression such as a default value
pub fn parse_expression(text: &str) -> Result<Expression> {
    let tokens = Lexer::new(text).tokenize()?;
    let mut parser = Parser::from_tokens(tokens, text, ANONYMOUS_SOURCE);
    let expression = parser.parse_expression_until(|_, _, _| false)?;
    if !parser.is_at_end() {
        return Err(parser.error(format!("unexpected {} after expression", parser.current().describe())));
    }
    Ok(expression)
}
