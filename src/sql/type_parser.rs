/// Type reference parser
///
/// Grammar accepted after a column or parameter name:
///
/// ```text
/// [schema.]name [(precision [, scale])] [WITH|WITHOUT TIME ZONE]
///     { [ [size] ] } | ARRAY [ [size] ]
/// ```
///
/// Multi-word built-in names (`double precision`, `character varying`,
/// `timestamp with time zone`) are folded into one space-separated name.
use super::lexer::Lexer;
use super::parser::Parser;
use super::token::{Keyword, TokenType};
use crate::diagnostic::ANONYMOUS_SOURCE;
use crate::error::Result;
use crate::types::TypeRef;

impl<'a> Parser<'a> {
    pub(crate) fn parse_type_ref(&mut self) -> Result<TypeRef> {
        let quoted = matches!(self.current().token_type, TokenType::QuotedIdentifier(_));
        let first = match self.current().as_name() {
            Some(name) => name.to_string(),
            None => return Err(self.type_error(format!("expected type name, found {}", self.current().describe()))),
        };
        self.advance();

        let mut type_ref = if matches!(self.current().token_type, TokenType::Dot) {
            self.advance();
            let name = match self.current().as_name() {
                Some(name) => name.to_string(),
                None => {
                    return Err(self.type_error(format!("expected type name after {}., found {}", first, self.current().describe())))
                }
            };
            self.advance();
            TypeRef::new(name).with_schema(first)
        } else if quoted {
            TypeRef::new(first)
        } else {
            TypeRef::new(self.parse_multiword_type(first))
        };

        if matches!(self.current().token_type, TokenType::LParen) {
            let (precision, scale) = self.parse_type_modifiers()?;
            type_ref.precision = Some(precision);
            type_ref.scale = scale;
        }

        if type_ref.schema.is_none() && matches!(type_ref.name.as_str(), "time" | "timestamp") {
            if let Some(zone) = self.parse_time_zone()? {
                type_ref.name = format!("{} {}", type_ref.name, zone);
            }
        }

        type_ref.array_dims = self.parse_array_dims()?;
        Ok(type_ref)
    }

    /// Extend a leading word into a multi-word built-in name
    fn parse_multiword_type(&mut self, first: String) -> String {
        match first.as_str() {
            "double" if self.current().is_keyword(Keyword::Precision) => {
                self.advance();
                "double precision".to_string()
            }
            "character" | "char" | "bit" if self.current().is_keyword(Keyword::Varying) => {
                self.advance();
                let base = if first == "bit" { "bit" } else { "character" };
                format!("{} varying", base)
            }
            _ => first,
        }
    }

    /// `with time zone` / `without time zone`
    fn parse_time_zone(&mut self) -> Result<Option<&'static str>> {
        let zone = if self.current().is_keyword(Keyword::With) {
            "with time zone"
        } else if self.current().is_keyword(Keyword::Without) {
            "without time zone"
        } else {
            return Ok(None);
        };
        if !(self.peek(1).is_keyword(Keyword::Time) && self.peek(2).is_keyword(Keyword::Zone)) {
            return Ok(None);
        }
        self.advance();
        self.advance();
        self.advance();
        Ok(Some(zone))
    }

    /// `(p)` or `(p, s)`
    fn parse_type_modifiers(&mut self) -> Result<(u32, Option<u32>)> {
        self.advance(); // (
        let precision = self.parse_type_number("type modifier")?;
        let scale = if matches!(self.current().token_type, TokenType::Comma) {
            self.advance();
            Some(self.parse_type_number("type modifier")?)
        } else {
            None
        };
        if !matches!(self.current().token_type, TokenType::RParen) {
            return Err(self.type_error(format!(
                "expected ) after type modifiers, found {}",
                self.current().describe()
            )));
        }
        self.advance();
        Ok((precision, scale))
    }

    /// `[]`, `[n]` repeated, or a single `ARRAY` / `ARRAY[n]`
    fn parse_array_dims(&mut self) -> Result<Vec<Option<u32>>> {
        let mut dims = Vec::new();

        if self.current().is_keyword(Keyword::Array) {
            self.advance();
            let size = if matches!(self.current().token_type, TokenType::LBracket) {
                self.parse_array_bound()?
            } else {
                None
            };
            dims.push(size);
            return Ok(dims);
        }

        while matches!(self.current().token_type, TokenType::LBracket) {
            dims.push(self.parse_array_bound()?);
        }
        Ok(dims)
    }

    fn parse_array_bound(&mut self) -> Result<Option<u32>> {
        self.advance(); // [
        let size = if matches!(self.current().token_type, TokenType::RBracket) {
            None
        } else {
            Some(self.parse_type_number("array dimension")?)
        };
        if !matches!(self.current().token_type, TokenType::RBracket) {
            return Err(self.type_error(format!("expected ] in array dimension, found {}", self.current().describe())));
        }
        self.advance();
        Ok(size)
    }

    fn parse_type_number(&mut self, what: &str) -> Result<u32> {
        let value = match &self.current().token_type {
            TokenType::Number(n) => n.parse::<u32>().ok(),
            _ => None,
        };
        match value {
            Some(value) => {
                self.advance();
                Ok(value)
            }
            None => Err(self.type_error(format!("invalid {} {}", what, self.current().describe()))),
        }
    }
}

/// Parse a type reference from the start of `text`.
///
/// Returns the type and the number of tokens it spans; anything after the
/// type is left alone.
pub fn parse_type(text: &str) -> Result<(TypeRef, usize)> {
    let tokens = Lexer::new(text).tokenize()?;
    let mut parser = Parser::from_tokens(tokens, text, ANONYMOUS_SOURCE);
    let type_ref = parser.parse_type_ref()?;
    Ok((type_ref, parser.position()))
}
