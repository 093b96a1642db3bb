//! Error types for splitting and completion.
//!
//! [`ParseError`] carries what the lexer or the fallback parser reported,
//! with the source position when one can be recovered. [`SplitError`] and
//! [`CompletionError`] are the terminal errors of the two public entry points.
//! Problems confined to a single `FROM` fragment or a single metadata lookup
//! never surface here; the completer skips them and keeps going.

use crate::types::Dialect;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;
#[cfg(feature = "tracing")]
use tracing::trace;

/// Source position reported by the lexer or parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// Line number (1-indexed).
    pub line: usize,
    /// Column number (1-indexed).
    pub column: usize,
}

/// Category of a grammar error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseErrorKind {
    #[default]
    SyntaxError,
    MissingClause,
    UnexpectedEof,
    UnsupportedFeature,
    /// The input could not be tokenized.
    LexerError,
}

/// A lexer or parser failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub position: Option<Position>,
    pub dialect: Option<Dialect>,
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            position: None,
            dialect: None,
            kind: ParseErrorKind::SyntaxError,
        }
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = Some(dialect);
        self
    }

    pub fn with_kind(mut self, kind: ParseErrorKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_position(mut self, line: usize, column: usize) -> Self {
        self.position = Some(Position { line, column });
        self
    }

    pub fn is_lexer_error(&self) -> bool {
        self.kind == ParseErrorKind::LexerError
    }

    /// Reads the "Line: X, Column: Y" suffix sqlparser appends to its messages.
    fn position_from_message(message: &str) -> Option<Position> {
        static POSITION_REGEX: OnceLock<Regex> = OnceLock::new();
        let re = POSITION_REGEX.get_or_init(|| {
            Regex::new(r"Line:\s*(\d+)\s*,\s*Column:\s*(\d+)").expect("Invalid regex pattern")
        });

        let result = re.captures(message).and_then(|caps| {
            let line: usize = caps.get(1)?.as_str().parse().ok()?;
            let column: usize = caps.get(2)?.as_str().parse().ok()?;
            Some(Position { line, column })
        });

        #[cfg(feature = "tracing")]
        if result.is_none() && message.contains("Line") {
            trace!("no position in parser message: {}", message);
        }

        result
    }

    fn kind_from_message(message: &str) -> ParseErrorKind {
        let lower = message.to_lowercase();
        if lower.contains("unexpected end") || lower.contains("eof") {
            ParseErrorKind::UnexpectedEof
        } else if lower.contains("expected") {
            ParseErrorKind::MissingClause
        } else if lower.contains("not supported") || lower.contains("unsupported") {
            ParseErrorKind::UnsupportedFeature
        } else {
            ParseErrorKind::SyntaxError
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ParseErrorKind::LexerError => write!(f, "Lexer error")?,
            _ => write!(f, "Parse error")?,
        }
        if let Some(dialect) = self.dialect {
            write!(f, " ({dialect:?})")?;
        }
        if let Some(pos) = self.position {
            write!(f, " at line {}, column {}", pos.line, pos.column)?;
        }
        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for ParseError {}

impl From<sqlparser::parser::ParserError> for ParseError {
    fn from(err: sqlparser::parser::ParserError) -> Self {
        let message = err.to_string();
        let kind = match &err {
            sqlparser::parser::ParserError::TokenizerError(_) => ParseErrorKind::LexerError,
            _ => Self::kind_from_message(&message),
        };
        Self {
            position: Self::position_from_message(&message),
            message,
            dialect: None,
            kind,
        }
    }
}

impl From<sqlparser::tokenizer::TokenizerError> for ParseError {
    fn from(err: sqlparser::tokenizer::TokenizerError) -> Self {
        let message = err.to_string();
        Self {
            position: Self::position_from_message(&message),
            message,
            dialect: None,
            kind: ParseErrorKind::LexerError,
        }
    }
}

/// Failure to split a script. No partial statement list accompanies it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SplitError {
    /// A block closer with no matching opener, or an opener left unclosed at
    /// the end of input. Lines are 1-based, columns 0-based.
    #[error("malformed block nesting: unexpected {keyword} at line {line}, column {column}")]
    MalformedBlockNesting {
        keyword: String,
        line: usize,
        column: usize,
    },

    #[error(transparent)]
    Grammar(#[from] ParseError),
}

/// Failure reported by a [`crate::MetadataProvider`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("metadata lookup for database `{database}` failed: {message}")]
pub struct MetadataError {
    pub database: String,
    pub message: String,
}

impl MetadataError {
    pub fn new(database: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            message: message.into(),
        }
    }
}

/// Failure of a whole completion request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompletionError {
    #[error("SQL input too large: {len} bytes exceeds {max} byte limit")]
    InputTooLarge { len: usize, max: usize },

    #[error(transparent)]
    Grammar(#[from] ParseError),

    #[error(transparent)]
    Split(#[from] SplitError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),
}
