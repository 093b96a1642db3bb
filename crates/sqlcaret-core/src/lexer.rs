//! Token stream for the splitter and the completer.
//!
//! Tokenization is delegated to sqlparser. Its tokens are re-typed against
//! the grammar vocabulary and re-anchored onto the source text, so every
//! token owns the exact bytes it came from and whitespace and comments stay
//! in the stream on the hidden channel.

use sqlparser::tokenizer::{Token as SqlToken, TokenWithSpan, Tokenizer, Whitespace};

#[cfg(feature = "tracing")]
use tracing::debug;

use crate::grammar::Kw;
use crate::types::Dialect;

/// Grammar terminal a token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TokenType {
    Keyword(Kw),
    Identifier,
    QuotedIdentifier,
    Number,
    String,
    Placeholder,
    /// Any operator other than `*` and `=`.
    Operator,
    Star,
    Eq,
    Comma,
    Period,
    LParen,
    RParen,
    LBracket,
    RBracket,
    SemiColon,
    Colon,
    DoubleColon,
    Whitespace,
    Comment,
    Other,
    Eof,
}

impl TokenType {
    /// Word tokens that may name a column or a relation.
    pub fn is_identifier(self) -> bool {
        match self {
            TokenType::Identifier | TokenType::QuotedIdentifier => true,
            TokenType::Keyword(kw) => !kw.is_reserved(),
            _ => false,
        }
    }

    pub fn is_keyword(self, kw: Kw) -> bool {
        self == TokenType::Keyword(kw)
    }

    /// Punctuation and operators, after which the caret needs no separator.
    pub fn is_separator(self) -> bool {
        matches!(
            self,
            TokenType::Operator
                | TokenType::Star
                | TokenType::Eq
                | TokenType::Comma
                | TokenType::Period
                | TokenType::LParen
                | TokenType::RParen
                | TokenType::LBracket
                | TokenType::RBracket
                | TokenType::SemiColon
                | TokenType::Colon
                | TokenType::DoubleColon
                | TokenType::Placeholder
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Default,
    /// Whitespace and comments.
    Hidden,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub token_type: TokenType,
    pub text: String,
    /// 1-based line of the first character.
    pub line: usize,
    /// 0-based character column of the first character.
    pub column: usize,
    pub channel: Channel,
    /// Position in the stream, hidden tokens included.
    pub index: usize,
    /// Byte offset of the first character.
    pub start: usize,
}

impl Token {
    pub fn end(&self) -> usize {
        self.start + self.text.len()
    }

    pub fn is_hidden(&self) -> bool {
        self.channel == Channel::Hidden
    }

    /// Line and column just past the last character.
    pub fn end_position(&self) -> (usize, usize) {
        match self.text.rfind('\n') {
            Some(newline) => (
                self.line + self.text.matches('\n').count(),
                self.text[newline + 1..].chars().count(),
            ),
            None => (self.line, self.column + self.text.chars().count()),
        }
    }
}

/// Tokenizes `sql`, returning every token including hidden ones, followed by
/// a zero-width end-of-file token.
///
/// Lexing never fails. When sqlparser's tokenizer stops on malformed input
/// (an unclosed quote, dollar string or comment), everything from that point
/// on becomes one `Other` token on the default channel.
pub fn tokenize(sql: &str, dialect: Dialect) -> Vec<Token> {
    let sqlparser_dialect = dialect.to_sqlparser_dialect();
    let mut raw: Vec<TokenWithSpan> = Vec::new();
    let failed = Tokenizer::new(sqlparser_dialect.as_ref(), sql)
        .tokenize_with_location_into_buf(&mut raw)
        .err();

    let lines = LineIndex::new(sql);

    // Anchor each token on a byte offset. Offsets are forced monotonic and the
    // first token starts at zero so the slices tile the input.
    let mut anchored: Vec<(usize, TokenType)> = Vec::with_capacity(raw.len() + 1);
    let mut previous = 0;
    for (i, item) in raw.iter().enumerate() {
        let start = if i == 0 {
            0
        } else {
            lines
                .offset(item.span.start.line as usize, item.span.start.column as usize)
                .unwrap_or(previous)
                .max(previous)
        };
        anchored.push((start, classify(&item.token)));
        previous = start;
    }

    if let Some(_err) = failed {
        let rest = match raw.last() {
            Some(last) => lines
                .offset(last.span.end.line as usize, last.span.end.column as usize)
                .unwrap_or(previous)
                .max(previous),
            None => 0,
        };
        #[cfg(feature = "tracing")]
        debug!(
            error = %_err,
            offset = rest,
            ?dialect,
            "tokenizer stopped, keeping the rest as one token"
        );
        anchored.push((rest, TokenType::Other));
    }

    let mut tokens = Vec::with_capacity(anchored.len() + 1);
    for (index, &(start, token_type)) in anchored.iter().enumerate() {
        let end = anchored
            .get(index + 1)
            .map(|&(next, _)| next)
            .unwrap_or(sql.len());
        if start == end {
            continue;
        }
        let (line, column) = lines.position(start);
        tokens.push(Token {
            token_type,
            text: sql[start..end].to_string(),
            line,
            column,
            channel: match token_type {
                TokenType::Whitespace | TokenType::Comment => Channel::Hidden,
                _ => Channel::Default,
            },
            index: tokens.len(),
            start,
        });
    }

    let (line, column) = lines.position(sql.len());
    tokens.push(Token {
        token_type: TokenType::Eof,
        text: String::new(),
        line,
        column,
        channel: Channel::Default,
        index: tokens.len(),
        start: sql.len(),
    });

    tokens
}

fn classify(token: &SqlToken) -> TokenType {
    match token {
        SqlToken::Word(word) => {
            if word.quote_style.is_some() {
                TokenType::QuotedIdentifier
            } else {
                Kw::from_word(&word.value)
                    .map(TokenType::Keyword)
                    .unwrap_or(TokenType::Identifier)
            }
        }
        SqlToken::Number(_, _) => TokenType::Number,
        SqlToken::SingleQuotedString(_)
        | SqlToken::DoubleQuotedString(_)
        | SqlToken::NationalStringLiteral(_)
        | SqlToken::EscapedStringLiteral(_)
        | SqlToken::HexStringLiteral(_)
        | SqlToken::DollarQuotedString(_) => TokenType::String,
        SqlToken::Placeholder(_) => TokenType::Placeholder,
        SqlToken::Mul => TokenType::Star,
        SqlToken::Eq => TokenType::Eq,
        SqlToken::Neq
        | SqlToken::DoubleEq
        | SqlToken::Lt
        | SqlToken::Gt
        | SqlToken::LtEq
        | SqlToken::GtEq
        | SqlToken::Plus
        | SqlToken::Minus
        | SqlToken::Div
        | SqlToken::Mod
        | SqlToken::StringConcat
        | SqlToken::Caret
        | SqlToken::Ampersand
        | SqlToken::Pipe
        | SqlToken::Tilde
        | SqlToken::ShiftLeft
        | SqlToken::ShiftRight
        | SqlToken::Arrow
        | SqlToken::LongArrow => TokenType::Operator,
        SqlToken::Comma => TokenType::Comma,
        SqlToken::Period => TokenType::Period,
        SqlToken::LParen => TokenType::LParen,
        SqlToken::RParen => TokenType::RParen,
        SqlToken::LBracket => TokenType::LBracket,
        SqlToken::RBracket => TokenType::RBracket,
        SqlToken::SemiColon => TokenType::SemiColon,
        SqlToken::Colon => TokenType::Colon,
        SqlToken::DoubleColon => TokenType::DoubleColon,
        SqlToken::Whitespace(Whitespace::SingleLineComment { .. })
        | SqlToken::Whitespace(Whitespace::MultiLineComment(_)) => TokenType::Comment,
        SqlToken::Whitespace(_) => TokenType::Whitespace,
        SqlToken::EOF => TokenType::Eof,
        _ => TokenType::Other,
    }
}

/// Converts between byte offsets and sqlparser's 1-based line/column
/// locations. Columns are counted in characters.
pub(crate) struct LineIndex<'a> {
    sql: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub(crate) fn new(sql: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(sql.match_indices('\n').map(|(i, _)| i + 1));
        Self { sql, line_starts }
    }

    /// Byte offset of a 1-based line and 1-based column.
    pub(crate) fn offset(&self, line: usize, column: usize) -> Option<usize> {
        if line == 0 || column == 0 {
            return None;
        }
        let line_start = *self.line_starts.get(line - 1)?;
        let line_end = self
            .line_starts
            .get(line)
            .map(|next| next - 1)
            .unwrap_or(self.sql.len());
        let line_text = &self.sql[line_start..line_end];
        let wanted = column - 1;
        match line_text.char_indices().nth(wanted) {
            Some((rel, _)) => Some(line_start + rel),
            None if line_text.chars().count() == wanted => Some(line_end),
            None => None,
        }
    }

    /// 1-based line and 0-based character column of a byte offset.
    pub(crate) fn position(&self, offset: usize) -> (usize, usize) {
        let line = self.line_starts.partition_point(|start| *start <= offset);
        let line_start = self.line_starts[line.saturating_sub(1)];
        let column = self
            .sql
            .get(line_start..offset)
            .map(|text| text.chars().count())
            .unwrap_or(0);
        (line.max(1), column)
    }
}
