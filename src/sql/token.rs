/// Token types for the DDL lexer
use phf::phf_map;

macro_rules! define_keywords {
    ($($variant:ident => $text:tt),* $(,)?) => {
        /// Reserved and non-reserved words the statement parsers dispatch on.
        ///
        /// Keywords are still accepted wherever a name is expected, so a
        /// column called `key` or `type` parses fine.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Keyword {
            $($variant),*
        }

        // Perfect hash map for O(1) keyword lookup
        static KEYWORDS: phf::Map<&'static str, Keyword> = phf_map! {
            $($text => Keyword::$variant),*
        };

        impl Keyword {
            /// Lower-case spelling of the keyword
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Keyword::$variant => $text),*
                }
            }
        }
    };
}

define_keywords! {
    Action => "action",
    Always => "always",
    Array => "array",
    As => "as",
    Asc => "asc",
    Atomic => "atomic",
    Attribute => "attribute",
    Begin => "begin",
    By => "by",
    Called => "called",
    Cascade => "cascade",
    Check => "check",
    Class => "class",
    Collate => "collate",
    Commit => "commit",
    Concurrently => "concurrently",
    Constraint => "constraint",
    Cost => "cost",
    Create => "create",
    Data => "data",
    Default => "default",
    Deferrable => "deferrable",
    Deferred => "deferred",
    Definer => "definer",
    Delete => "delete",
    Desc => "desc",
    Distinct => "distinct",
    Drop => "drop",
    Enum => "enum",
    Exclude => "exclude",
    Exists => "exists",
    False => "false",
    First => "first",
    Foreign => "foreign",
    Full => "full",
    Function => "function",
    Generated => "generated",
    Identity => "identity",
    If => "if",
    Immediate => "immediate",
    Immutable => "immutable",
    In => "in",
    Include => "include",
    Index => "index",
    Initially => "initially",
    Inout => "inout",
    Input => "input",
    Invoker => "invoker",
    Key => "key",
    Language => "language",
    Last => "last",
    Leakproof => "leakproof",
    Match => "match",
    Materialized => "materialized",
    No => "no",
    Not => "not",
    Null => "null",
    Nulls => "nulls",
    On => "on",
    Only => "only",
    Or => "or",
    Out => "out",
    Parallel => "parallel",
    Partial => "partial",
    Pragma => "pragma",
    Precision => "precision",
    Prepare => "prepare",
    Preserve => "preserve",
    Primary => "primary",
    Procedure => "procedure",
    Recursive => "recursive",
    References => "references",
    Replace => "replace",
    Restrict => "restrict",
    Return => "return",
    Returns => "returns",
    Rows => "rows",
    Schema => "schema",
    Security => "security",
    Set => "set",
    Setof => "setof",
    Simple => "simple",
    Stable => "stable",
    Stored => "stored",
    Strict => "strict",
    Table => "table",
    Temp => "temp",
    Temporary => "temporary",
    Time => "time",
    Timestamp => "timestamp",
    True => "true",
    Type => "type",
    Unique => "unique",
    Unlogged => "unlogged",
    Update => "update",
    Using => "using",
    Variadic => "variadic",
    Varying => "varying",
    View => "view",
    Virtual => "virtual",
    Volatile => "volatile",
    Where => "where",
    With => "with",
    Without => "without",
    Zone => "zone",
}

impl Keyword {
    /// Look up an (already lower-cased) word
    pub fn lookup(word: &str) -> Option<Self> {
        KEYWORDS.get(word).copied()
    }
}

impl std::fmt::Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_str().to_uppercase())
    }
}

/// Byte range of a token in its source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Smallest span covering both
    pub fn to(&self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenType {
    Keyword(Keyword),
    /// Unquoted name, folded to lower case
    Identifier(String),
    /// `"Name"`, case and spelling preserved
    QuotedIdentifier(String),

    // Literals
    String(String),
    /// Numeric literal, kept in its source spelling
    Number(String),
    /// `$tag$ ... $tag$` (tag is empty for `$$`)
    DollarQuoted { tag: String, body: String },

    // Placeholders
    Positional(u32), // $1
    Named(String),   // :name

    /// Any PostgreSQL operator (`=`, `&&`, `<>`, `||`, ...)
    Operator(String),

    // Delimiters
    LParen,      // (
    RParen,      // )
    LBracket,    // [
    RBracket,    // ]
    Comma,       // ,
    Semicolon,   // ;
    Dot,         // .
    Colon,       // :
    DoubleColon, // ::

    Eof,
}

impl TokenType {
    /// Short human-readable description for error messages
    pub fn describe(&self) -> String {
        match self {
            TokenType::Keyword(k) => k.to_string(),
            TokenType::Identifier(s) => s.clone(),
            TokenType::QuotedIdentifier(s) => format!("\"{}\"", s),
            TokenType::String(s) => format!("'{}'", s),
            TokenType::Number(n) => n.clone(),
            TokenType::DollarQuoted { tag, .. } => format!("${}$ body", tag),
            TokenType::Positional(n) => format!("${}", n),
            TokenType::Named(name) => format!(":{}", name),
            TokenType::Operator(op) => op.clone(),
            TokenType::LParen => "(".to_string(),
            TokenType::RParen => ")".to_string(),
            TokenType::LBracket => "[".to_string(),
            TokenType::RBracket => "]".to_string(),
            TokenType::Comma => ",".to_string(),
            TokenType::Semicolon => ";".to_string(),
            TokenType::Dot => ".".to_string(),
            TokenType::Colon => ":".to_string(),
            TokenType::DoubleColon => "::".to_string(),
            TokenType::Eof => "end of statement".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Token {
    pub token_type: TokenType,
    pub span: Span,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(token_type: TokenType, span: Span, line: usize, column: usize) -> Self {
        Self {
            token_type,
            span,
            line,
            column,
        }
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        matches!(self.token_type, TokenType::Keyword(k) if k == keyword)
    }

    /// The name this token spells when used as an identifier.
    ///
    /// Keywords count as names; quoted identifiers keep their case.
    pub fn as_name(&self) -> Option<&str> {
        match &self.token_type {
            TokenType::Identifier(name) | TokenType::QuotedIdentifier(name) => Some(name),
            TokenType::Keyword(k) => Some(k.as_str()),
            _ => None,
        }
    }

    /// Unquoted word (identifier or keyword), lower case
    pub fn as_word(&self) -> Option<&str> {
        match &self.token_type {
            TokenType::Identifier(name) => Some(name),
            TokenType::Keyword(k) => Some(k.as_str()),
            _ => None,
        }
    }

    /// Short human-readable description for error messages
    pub fn describe(&self) -> String {
        self.token_type.describe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_lookup() {
        assert_eq!(Keyword::lookup("create"), Some(Keyword::Create));
        assert_eq!(Keyword::lookup("widgets"), None);
        assert_eq!(Keyword::Primary.as_str(), "primary");
        assert_eq!(Keyword::Primary.to_string(), "PRIMARY");
    }

    #[test]
    fn test_keyword_is_a_name() {
        let token = Token::new(TokenType::Keyword(Keyword::Key), Span::new(0, 3), 1, 1);
        assert_eq!(token.as_name(), Some("key"));
        assert!(token.is_keyword(Keyword::Key));
    }
}
