//! Cursor over a materialized token stream.

use crate::lexer::{Channel, Token, TokenType};

/// A cursor over every token of one input, hidden tokens included.
///
/// The stream always ends with an `Eof` token and the cursor never leaves
/// the stream: seeks past the end land on `Eof`.
#[derive(Debug, Clone)]
pub struct Scanner {
    tokens: Vec<Token>,
    index: usize,
    saved: Vec<usize>,
}

impl Scanner {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|t| t.token_type) != Some(TokenType::Eof) {
            let (start, line, column) = tokens.last().map_or((0, 1, 0), |last| {
                let (line, column) = last.end_position();
                (last.end(), line, column)
            });
            tokens.push(Token {
                token_type: TokenType::Eof,
                text: String::new(),
                line,
                column,
                channel: Channel::Default,
                index: tokens.len(),
                start,
            });
        }
        Self {
            tokens,
            index: 0,
            saved: Vec::new(),
        }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn index(&self) -> usize {
        self.index
    }

    fn last_index(&self) -> usize {
        self.tokens.len() - 1
    }

    /// Moves to the token containing `(line, column)`, or to the first token
    /// starting at or after it. `line` is 1-based, `column` 0-based. A caret
    /// sitting exactly at the end of a token belongs to the next one.
    pub fn seek_position(&mut self, line: usize, column: usize) {
        let caret = (line, column);
        self.index = self
            .tokens
            .iter()
            .position(|token| {
                let start = (token.line, token.column);
                start >= caret || caret < token.end_position()
            })
            .unwrap_or_else(|| self.last_index());
    }

    pub fn seek_index(&mut self, index: usize) {
        self.index = index.min(self.last_index());
    }

    /// Steps one token forward, over hidden tokens when `skip_hidden` is set.
    /// Returns false when already at the end of the stream.
    pub fn forward(&mut self, skip_hidden: bool) -> bool {
        let mut next = self.index;
        loop {
            if next >= self.last_index() {
                return false;
            }
            next += 1;
            if !skip_hidden || !self.tokens[next].is_hidden() {
                self.index = next;
                return true;
            }
        }
    }

    /// Steps one token back, over hidden tokens when `skip_hidden` is set.
    pub fn backward(&mut self, skip_hidden: bool) -> bool {
        let mut prev = self.index;
        loop {
            if prev == 0 {
                return false;
            }
            prev -= 1;
            if !skip_hidden || !self.tokens[prev].is_hidden() {
                self.index = prev;
                return true;
            }
        }
    }

    pub fn push(&mut self) {
        self.saved.push(self.index);
    }

    /// Restores the position saved by the matching [`Scanner::push`].
    pub fn pop_and_restore(&mut self) {
        if let Some(index) = self.saved.pop() {
            self.index = index;
        }
    }

    /// Runs `scan` and puts the cursor back where it was, whatever `scan`
    /// did with it.
    pub fn speculate<T>(&mut self, scan: impl FnOnce(&mut Self) -> T) -> T {
        self.push();
        let result = scan(self);
        self.pop_and_restore();
        result
    }

    pub fn token(&self) -> &Token {
        &self.tokens[self.index]
    }

    pub fn token_type(&self) -> TokenType {
        self.token().token_type
    }

    pub fn token_text(&self) -> &str {
        &self.token().text
    }

    pub fn token_channel(&self) -> Channel {
        self.token().channel
    }

    pub fn is_identifier(&self) -> bool {
        self.token_type().is_identifier()
    }

    pub fn previous_token_type(&self, skip_hidden: bool) -> Option<TokenType> {
        self.tokens[..self.index]
            .iter()
            .rev()
            .find(|token| !skip_hidden || !token.is_hidden())
            .map(|token| token.token_type)
    }

    /// Source text from the current token to the end of the input.
    pub fn following_text(&self) -> String {
        self.text_between(self.index, self.last_index())
    }

    /// Source text of the tokens `from..=to`.
    pub fn text_between(&self, from: usize, to: usize) -> String {
        let to = to.min(self.last_index());
        if from > to {
            return String::new();
        }
        self.tokens[from..=to].iter().map(|t| t.text.as_str()).collect()
    }
}
