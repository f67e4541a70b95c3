//! Source locations and error context
//!
//! Every error raised by the lexer, parser and catalog builder carries a
//! [`Location`]. A [`SourceMap`] keeps the original texts around so a
//! location can be rendered together with the offending line.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default name given to anonymous source texts
pub const ANONYMOUS_SOURCE: &str = "<input>";

/// A position inside one source text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// Name of the source text (file name or caller supplied label)
    pub source: String,
    /// Byte offset from the start of the text
    pub offset: usize,
    /// 1-based line
    pub line: usize,
    /// 1-based column (in characters)
    pub column: usize,
}

impl Location {
    pub fn new(source: impl Into<String>, offset: usize, line: usize, column: usize) -> Self {
        Self {
            source: source.into(),
            offset,
            line,
            column,
        }
    }

    /// Compute line and column for a byte offset by scanning the text
    pub fn from_offset(source: impl Into<String>, text: &str, offset: usize) -> Self {
        let offset = offset.min(text.len());
        let mut line = 1;
        let mut column = 1;
        for (i, ch) in text.char_indices() {
            if i >= offset {
                break;
            }
            if ch == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        Self::new(source, offset, line, column)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.source, self.line, self.column)
    }
}

/// Source texts indexed by name, used to render error context
#[derive(Debug, Default, Clone)]
pub struct SourceMap {
    sources: Vec<(String, String)>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.sources.push((name.into(), text.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.sources
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, text)| text.as_str())
    }

    /// The source line containing `location` followed by a caret marker.
    ///
    /// Returns `None` when the source is unknown to this map.
    pub fn excerpt(&self, location: &Location) -> Option<String> {
        let text = self.get(&location.source)?;
        Some(excerpt(text, location))
    }
}

/// Render the line of `text` that contains `location` plus a caret under the column
pub fn excerpt(text: &str, location: &Location) -> String {
    let offset = location.offset.min(text.len());
    let start = text[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let end = text[offset..]
        .find('\n')
        .map(|i| offset + i)
        .unwrap_or(text.len());
    let line = text[start..end].trim_end_matches('\r');
    let pad = location.column.saturating_sub(1);
    format!("{:>5} | {}\n      | {}^", location.line, line, " ".repeat(pad))
}
