//! Statement splitting.
//!
//! A single token pass tracks `BEGIN`/`CASE`/`IF`/`LOOP` nesting and keeps
//! the `;` tokens that end statements. When that pass cannot make sense of
//! the nesting, the script is parsed statement by statement instead and the
//! parser's own separators are used.

mod blocks;
mod statements;

pub(crate) use blocks::scan_boundaries;

#[cfg(feature = "tracing")]
use tracing::{debug, info_span};

use crate::error::SplitError;
use crate::lexer::{tokenize, Token, TokenType};
use crate::types::{Dialect, SingleSql, Span};

/// Splits `sql` into statements.
///
/// The texts of the returned statements concatenate back to `sql`. An error
/// means no statement list could be produced at all.
pub fn split(sql: &str, dialect: Dialect) -> Result<Vec<SingleSql>, SplitError> {
    #[cfg(feature = "tracing")]
    let _span = info_span!("split_sql", len = sql.len(), ?dialect).entered();

    let tokens = tokenize(sql, dialect);
    let boundaries = match scan_boundaries(&tokens) {
        Ok(boundaries) => boundaries,
        Err(_err) => {
            #[cfg(feature = "tracing")]
            debug!(error = %_err, "block scan failed, parsing statements");
            statements::parse_boundaries(sql, &tokens, dialect)?
        }
    };

    Ok(build_statements(&tokens, &boundaries))
}

/// Cuts the stream after each boundary token.
pub(crate) fn build_statements(tokens: &[Token], boundaries: &[usize]) -> Vec<SingleSql> {
    let mut statements: Vec<SingleSql> = Vec::new();
    let mut start = 0;

    for &boundary in boundaries {
        if boundary < start || boundary >= tokens.len() {
            continue;
        }
        statements.push(single_sql(&tokens[start..=boundary]));
        start = boundary + 1;
    }

    let rest = tokens[start.min(tokens.len())..]
        .iter()
        .filter(|t| t.token_type != TokenType::Eof)
        .collect::<Vec<_>>();
    if rest.is_empty() {
        return statements;
    }

    let significant = rest.iter().any(|t| !t.is_hidden());
    match statements.last_mut() {
        // Trailing whitespace and comments stay with the last statement.
        Some(last) if !significant => {
            for token in &rest {
                last.text.push_str(&token.text);
            }
            last.span.end = rest[rest.len() - 1].end();
        }
        _ => {
            let owned: Vec<Token> = rest.into_iter().cloned().collect();
            statements.push(single_sql(&owned));
        }
    }

    statements
}

fn single_sql(tokens: &[Token]) -> SingleSql {
    let text: String = tokens.iter().map(|t| t.text.as_str()).collect();
    let start = tokens.first().map_or(0, |t| t.start);
    let end = tokens.last().map_or(start, |t| t.end());
    let base_line = tokens.first().map_or(0, |t| t.line - 1);

    let significant: Vec<&Token> = tokens
        .iter()
        .filter(|t| !t.is_hidden() && t.token_type != TokenType::Eof)
        .collect();
    let empty = significant
        .iter()
        .all(|t| t.token_type == TokenType::SemiColon);

    let (first_statement_line, first_statement_column) = significant
        .first()
        .map_or((base_line, 0), |t| (t.line - 1, t.column));

    let (last_line, last_column) = match significant.last() {
        Some(t) if t.token_type == TokenType::SemiColon => (t.line - 1, t.column),
        Some(t) => {
            let (line, column) = t.end_position();
            (line - 1, column)
        }
        None => tokens.last().map_or((0, 0), |t| {
            let (line, column) = t.end_position();
            (line - 1, column)
        }),
    };

    SingleSql {
        text,
        base_line,
        last_line,
        last_column,
        first_statement_line,
        first_statement_column,
        empty,
        span: Span::new(start, end),
    }
}
