/// Verbatim expressions with an optional typed literal value
use serde::{Deserialize, Serialize};
use std::fmt;

/// Well-known zero-argument defaults a client can map to its own clock or
/// session functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sentinel {
    CurrentTimestamp,
    CurrentDate,
    CurrentTime,
    LocalTimestamp,
    LocalTime,
    CurrentUser,
    SessionUser,
    RandomUuid,
}

impl Sentinel {
    /// Sentinel spelled by a bare keyword such as `CURRENT_DATE`
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "current_timestamp" => Some(Sentinel::CurrentTimestamp),
            "current_date" => Some(Sentinel::CurrentDate),
            "current_time" => Some(Sentinel::CurrentTime),
            "localtimestamp" => Some(Sentinel::LocalTimestamp),
            "localtime" => Some(Sentinel::LocalTime),
            "current_user" | "user" => Some(Sentinel::CurrentUser),
            "session_user" => Some(Sentinel::SessionUser),
            _ => None,
        }
    }

    /// Sentinel produced by a zero-argument call such as `now()`
    pub fn from_call(function: &str) -> Option<Self> {
        match function {
            "now" | "transaction_timestamp" | "statement_timestamp" => Some(Sentinel::CurrentTimestamp),
            "gen_random_uuid" | "uuid_generate_v4" => Some(Sentinel::RandomUuid),
            _ => None,
        }
    }
}

/// Literal value recovered from a simple expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Null,
    Sentinel(Sentinel),
}

/// An expression kept as source text.
///
/// `literal` is only filled when the whole text is a bare literal or a known
/// sentinel call; casts and operators leave it empty. `references` lists the
/// unquoted and quoted names that appear in the text, in order and without
/// duplicates, so constraints can find the columns they mention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    pub text: String,
    pub literal: Option<Literal>,
    pub references: Vec<String>,
}

impl Expression {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            literal: None,
            references: Vec::new(),
        }
    }

    pub fn with_literal(mut self, literal: Literal) -> Self {
        self.literal = Some(literal);
        self
    }

    pub fn with_references(mut self, references: Vec<String>) -> Self {
        self.references = references;
        self
    }

    pub fn is_literal(&self) -> bool {
        self.literal.is_some()
    }

    /// Whether the expression mentions `name`
    pub fn references_name(&self, name: &str) -> bool {
        self.references.iter().any(|r| r == name)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
