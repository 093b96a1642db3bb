//! Single-pass statement boundary scan with block nesting.

use crate::error::SplitError;
use crate::grammar::Kw;
use crate::lexer::{Token, TokenType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Begin,
    Case,
    If,
    Loop,
}

impl BlockKind {
    fn keyword(self) -> &'static str {
        match self {
            BlockKind::Begin => "BEGIN",
            BlockKind::Case => "CASE",
            BlockKind::If => "IF",
            BlockKind::Loop => "LOOP",
        }
    }
}

/// An open block and the stream index of its opening keyword.
#[derive(Debug, Clone, Copy)]
struct BlockFrame {
    kind: BlockKind,
    opened_at: usize,
}

#[derive(Debug, Default)]
struct BlockScanner {
    /// `BEGIN` and `CASE` share a stack, both are closed by a bare `END`.
    begin_case: Vec<BlockFrame>,
    ifs: Vec<BlockFrame>,
    loops: Vec<BlockFrame>,
    /// Stream indices of `;` tokens that still count as boundaries.
    terminators: Vec<usize>,
    transaction_open: bool,
}

/// Returns the stream indices of every `;` that ends a statement.
///
/// Fails when a block closer has no opener or a block is still open at the
/// end of input.
pub(crate) fn scan_boundaries(tokens: &[Token]) -> Result<Vec<usize>, SplitError> {
    let significant: Vec<&Token> = tokens.iter().filter(|t| !t.is_hidden()).collect();
    let mut scanner = BlockScanner::default();

    let mut i = 0;
    while i < significant.len() {
        let token = significant[i];
        let next = significant.get(i + 1).map(|t| t.token_type);
        let prev = i.checked_sub(1).map(|p| significant[p].token_type);

        match token.token_type {
            TokenType::SemiColon => scanner.terminators.push(token.index),
            TokenType::Keyword(Kw::Begin) => {
                if begins_transaction(&significant, i) {
                    scanner.transaction_open = true;
                } else {
                    scanner.begin_case.push(BlockFrame {
                        kind: BlockKind::Begin,
                        opened_at: token.index,
                    });
                }
            }
            TokenType::Keyword(Kw::Start) if next == Some(TokenType::Keyword(Kw::Transaction)) => {
                scanner.transaction_open = true;
            }
            TokenType::Keyword(Kw::Case) => scanner.begin_case.push(BlockFrame {
                kind: BlockKind::Case,
                opened_at: token.index,
            }),
            TokenType::Keyword(Kw::If) if at_statement_start(prev) => {
                scanner.ifs.push(BlockFrame {
                    kind: BlockKind::If,
                    opened_at: token.index,
                });
            }
            TokenType::Keyword(Kw::Loop) => scanner.loops.push(BlockFrame {
                kind: BlockKind::Loop,
                opened_at: token.index,
            }),
            TokenType::Keyword(Kw::Commit | Kw::Rollback | Kw::Abort) => {
                scanner.transaction_open = false;
            }
            TokenType::Keyword(Kw::End) => {
                // `END IF`, `END LOOP` and `END CASE` consume their keyword.
                let chained = next == Some(TokenType::Keyword(Kw::And))
                    && chain_follows(&significant, i + 2);
                if scanner.close_end(token, next, chained)? {
                    i += 1;
                }
            }
            _ => {}
        }
        i += 1;
    }

    if let Some(frame) = scanner.innermost_open() {
        let token = &tokens[frame.opened_at];
        return Err(malformed(frame.kind.keyword(), token));
    }

    Ok(scanner.terminators)
}

impl BlockScanner {
    /// Handles one `END`. Returns true when the keyword after it belongs to
    /// the closer. `chained` is set for `END AND [NO] CHAIN`.
    fn close_end(
        &mut self,
        token: &Token,
        next: Option<TokenType>,
        chained: bool,
    ) -> Result<bool, SplitError> {
        if chained {
            self.transaction_open = false;
            return Ok(false);
        }
        match next {
            Some(TokenType::Keyword(Kw::If)) => {
                let frame = self.ifs.pop().ok_or_else(|| malformed("END IF", token))?;
                self.retract(frame);
                Ok(true)
            }
            Some(TokenType::Keyword(Kw::Loop)) => {
                let frame = self
                    .loops
                    .pop()
                    .ok_or_else(|| malformed("END LOOP", token))?;
                self.retract(frame);
                Ok(true)
            }
            Some(TokenType::Keyword(Kw::Case)) => {
                let frame = self
                    .begin_case
                    .pop()
                    .ok_or_else(|| malformed("END CASE", token))?;
                self.retract(frame);
                Ok(true)
            }
            Some(TokenType::Keyword(Kw::Transaction | Kw::Work)) => {
                self.transaction_open = false;
                Ok(false)
            }
            Some(TokenType::SemiColon | TokenType::Eof) | None => {
                if let Some(frame) = self.begin_case.pop() {
                    self.retract(frame);
                } else if self.transaction_open {
                    self.transaction_open = false;
                } else {
                    return Err(malformed("END", token));
                }
                Ok(false)
            }
            Some(_) => {
                let frame = self.begin_case.pop().ok_or_else(|| malformed("END", token))?;
                self.retract(frame);
                Ok(false)
            }
        }
    }

    /// Drops the terminators inside a block that just closed.
    fn retract(&mut self, frame: BlockFrame) {
        self.terminators.retain(|&index| index < frame.opened_at);
    }

    fn innermost_open(&self) -> Option<BlockFrame> {
        self.begin_case
            .iter()
            .chain(&self.ifs)
            .chain(&self.loops)
            .max_by_key(|frame| frame.opened_at)
            .copied()
    }
}

/// `BEGIN` opening a transaction rather than a block.
fn begins_transaction(significant: &[&Token], i: usize) -> bool {
    let next = significant.get(i + 1).map(|t| t.token_type);
    let after = significant.get(i + 2).map(|t| t.token_type);
    match next {
        None | Some(TokenType::SemiColon | TokenType::Eof) => true,
        Some(TokenType::Keyword(
            Kw::Transaction | Kw::Work | Kw::Isolation | Kw::Read | Kw::Deferrable,
        )) => true,
        Some(TokenType::Keyword(Kw::Not)) => after == Some(TokenType::Keyword(Kw::Deferrable)),
        _ => false,
    }
}

/// `CHAIN` or `NO CHAIN` starting at `i`.
fn chain_follows(significant: &[&Token], i: usize) -> bool {
    let kind = |offset: usize| significant.get(i + offset).map(|t| t.token_type);
    match kind(0) {
        Some(TokenType::Keyword(Kw::Chain)) => true,
        Some(TokenType::Keyword(Kw::No)) => kind(1) == Some(TokenType::Keyword(Kw::Chain)),
        _ => false,
    }
}

/// `IF` opens a block only as a statement of its own; elsewhere it is part of
/// an expression or an `IF EXISTS` clause.
fn at_statement_start(prev: Option<TokenType>) -> bool {
    matches!(
        prev,
        None | Some(
            TokenType::SemiColon
                | TokenType::Keyword(Kw::Begin | Kw::Then | Kw::Else | Kw::Loop)
        )
    )
}

fn malformed(keyword: &str, token: &Token) -> SplitError {
    SplitError::MalformedBlockNesting {
        keyword: keyword.to_string(),
        line: token.line,
        column: token.column,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::types::Dialect;

    /// Number of boundaries found in `sql`.
    fn boundaries(sql: &str) -> Result<usize, SplitError> {
        let tokens = tokenize(sql, Dialect::Postgres);
        scan_boundaries(&tokens).map(|b| b.len())
    }

    #[test]
    fn test_plain_statements() {
        assert_eq!(boundaries("SELECT 1; SELECT 2;").unwrap(), 2);
        assert_eq!(boundaries("SELECT 1; SELECT 2").unwrap(), 1);
    }

    #[test]
    fn test_block_hides_inner_terminators() {
        assert_eq!(boundaries("BEGIN SELECT 1; SELECT 2; END; SELECT 3;").unwrap(), 2);
    }

    #[test]
    fn test_transaction_begin_is_not_a_block() {
        assert_eq!(boundaries("BEGIN; SELECT 1; END;").unwrap(), 3);
        assert_eq!(boundaries("BEGIN TRANSACTION; SELECT 1; COMMIT;").unwrap(), 3);
        assert_eq!(
            boundaries("BEGIN ISOLATION LEVEL SERIALIZABLE; SELECT 1; END TRANSACTION;").unwrap(),
            3
        );
        assert_eq!(boundaries("BEGIN NOT DEFERRABLE; END;").unwrap(), 2);
    }

    #[test]
    fn test_end_and_chain_is_transaction_control() {
        assert_eq!(boundaries("BEGIN; SELECT 1; END AND CHAIN; SELECT 2;").unwrap(), 4);
        assert_eq!(boundaries("BEGIN; SELECT 1; END AND NO CHAIN;").unwrap(), 3);
        assert_eq!(boundaries("BEGIN; SELECT 1; COMMIT AND CHAIN; SELECT 2;").unwrap(), 4);
    }

    #[test]
    fn test_case_end_and_inside_block() {
        let sql = "BEGIN SELECT CASE WHEN a THEN 1 END AND b; END; SELECT 2;";
        assert_eq!(boundaries(sql).unwrap(), 2);
    }

    #[test]
    fn test_case_closed_by_end() {
        assert_eq!(
            boundaries("SELECT CASE WHEN a THEN 1 ELSE 2 END AS x FROM t; SELECT 2;").unwrap(),
            2
        );
    }

    #[test]
    fn test_if_and_loop_blocks() {
        let sql = "BEGIN IF x THEN SELECT 1; END IF; LOOP SELECT 2; END LOOP; END; SELECT 3;";
        assert_eq!(boundaries(sql).unwrap(), 2);
    }

    #[test]
    fn test_if_exists_is_not_a_block() {
        assert_eq!(boundaries("DROP TABLE IF EXISTS t; SELECT 1;").unwrap(), 2);
    }

    #[test]
    fn test_unmatched_end_fails() {
        let err = boundaries("END; SELECT 1;").unwrap_err();
        assert!(matches!(
            err,
            SplitError::MalformedBlockNesting { ref keyword, line: 1, column: 0 } if keyword == "END"
        ));
        assert!(boundaries("END IF; SELECT 1;").is_err());
        assert!(boundaries("SELECT 1; END LOOP;").is_err());
    }

    #[test]
    fn test_unclosed_block_fails() {
        let err = boundaries("SELECT 1; BEGIN SELECT 2;").unwrap_err();
        assert!(matches!(
            err,
            SplitError::MalformedBlockNesting { ref keyword, .. } if keyword == "BEGIN"
        ));
    }
}
