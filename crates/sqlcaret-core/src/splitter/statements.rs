//! Parser-driven statement boundaries, used when the block scan fails.

use std::collections::HashMap;

use sqlparser::parser::Parser;
use sqlparser::tokenizer::Token as SqlToken;

use crate::error::{ParseError, ParseErrorKind};
use crate::lexer::{Token, TokenType};
use crate::types::Dialect;

/// Parses `sql` statement by statement and returns the stream indices of
/// the `;` tokens separating them.
///
/// Any lexer or parser error fails the whole input.
pub(crate) fn parse_boundaries(
    sql: &str,
    tokens: &[Token],
    dialect: Dialect,
) -> Result<Vec<usize>, ParseError> {
    let sqlparser_dialect = dialect.to_sqlparser_dialect();
    let mut parser = Parser::new(sqlparser_dialect.as_ref())
        .try_with_sql(sql)
        .map_err(|err| ParseError::from(err).with_dialect(dialect))?;

    // sqlparser locations are 1-based in both coordinates.
    let semicolons: HashMap<(u64, u64), usize> = tokens
        .iter()
        .filter(|t| t.token_type == TokenType::SemiColon)
        .map(|t| ((t.line as u64, t.column as u64 + 1), t.index))
        .collect();

    let mut boundaries = Vec::new();
    loop {
        let next = parser.peek_token();
        match next.token {
            SqlToken::EOF => break,
            SqlToken::SemiColon => {
                let location = (next.span.start.line, next.span.start.column);
                if let Some(index) = semicolons.get(&location) {
                    boundaries.push(*index);
                }
                parser.next_token();
                continue;
            }
            _ => {}
        }

        parser
            .parse_statement()
            .map_err(|err| ParseError::from(err).with_dialect(dialect))?;

        let after = parser.peek_token();
        if !matches!(after.token, SqlToken::SemiColon | SqlToken::EOF) {
            let line = after.span.start.line as usize;
            let column = after.span.start.column as usize;
            return Err(ParseError::new(format!(
                "Expected: end of statement, found: {} at Line: {line}, Column: {column}",
                after.token
            ))
            .with_kind(ParseErrorKind::MissingClause)
            .with_position(line, column)
            .with_dialect(dialect));
        }
    }

    Ok(boundaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn boundaries(sql: &str) -> Result<Vec<usize>, ParseError> {
        let tokens = tokenize(sql, Dialect::Postgres);
        parse_boundaries(sql, &tokens, Dialect::Postgres)
    }

    #[test]
    fn test_boundaries_follow_statements() {
        let sql = "SELECT 1;\nSELECT 2 ;";
        let tokens = tokenize(sql, Dialect::Postgres);
        let found = boundaries(sql).unwrap();
        assert_eq!(found.len(), 2);
        for index in found {
            assert_eq!(tokens[index].token_type, TokenType::SemiColon);
        }
    }

    #[test]
    fn test_stray_semicolons_are_boundaries() {
        assert_eq!(boundaries(";; SELECT 1").unwrap().len(), 2);
    }

    #[test]
    fn test_syntax_error_fails() {
        let err = boundaries("SELECT 1; SELEC 2;").unwrap_err();
        assert!(!err.is_lexer_error());
        assert_eq!(err.dialect, Some(Dialect::Postgres));
    }

    #[test]
    fn test_trailing_garbage_fails() {
        let err = boundaries("SELECT 1 2;").unwrap_err();
        assert!(err.position.is_some());
    }
}
