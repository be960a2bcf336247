//! Query lexer
//!
//! Single left-to-right pass over the source characters. Keywords are matched
//! case-insensitively; whitespace and `--` line comments are skipped. The
//! returned stream always ends with an `Eof` token.

use crate::query::error::{LexError, LexResult};
use crate::query::token::{Token, TokenKind};

/// Tokenize `source`
pub fn tokenize(source: &str) -> LexResult<Vec<Token>> {
    Lexer::new(source).tokenize()
}

/// Character cursor with line/column tracking
pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    /// Consume the whole source
    pub fn tokenize(mut self) -> LexResult<Vec<Token>> {
        let mut tokens = Vec::new();

        loop {
            self.skip_trivia();
            if self.is_at_end() {
                break;
            }
            tokens.push(self.scan_token()?);
        }

        tokens.push(Token::new(TokenKind::Eof, "", self.line, self.column));
        Ok(tokens)
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    /// Advance while `pred` holds, appending to `buf`
    fn take_while(&mut self, buf: &mut String, pred: impl Fn(char) -> bool) {
        while let Some(ch) = self.peek() {
            if !pred(ch) {
                break;
            }
            buf.push(ch);
            self.advance();
        }
    }

    fn skip_trivia(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else if ch == '-' && self.peek_next() == Some('-') {
                while self.peek().is_some_and(|c| c != '\n') {
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn scan_token(&mut self) -> LexResult<Token> {
        let (line, column) = (self.line, self.column);
        let Some(ch) = self.advance() else {
            return Ok(Token::new(TokenKind::Eof, "", line, column));
        };
        let simple = |kind: TokenKind, text: &str| Ok(Token::new(kind, text, line, column));

        match ch {
            '(' => simple(TokenKind::LeftParen, "("),
            ')' => simple(TokenKind::RightParen, ")"),
            ',' => simple(TokenKind::Comma, ","),
            '.' => simple(TokenKind::Dot, "."),
            '*' => simple(TokenKind::Star, "*"),
            '+' => simple(TokenKind::Plus, "+"),
            '-' => simple(TokenKind::Minus, "-"),
            '/' => simple(TokenKind::Slash, "/"),
            '=' => simple(TokenKind::Equal, "="),
            '!' if self.peek() == Some('=') => {
                self.advance();
                simple(TokenKind::NotEqual, "!=")
            }
            '<' => match self.peek() {
                Some('=') => {
                    self.advance();
                    simple(TokenKind::LessThanOrEqual, "<=")
                }
                Some('>') => {
                    self.advance();
                    simple(TokenKind::NotEqual, "<>")
                }
                _ => simple(TokenKind::LessThan, "<"),
            },
            '>' => {
                if self.peek() == Some('=') {
                    self.advance();
                    simple(TokenKind::GreaterThanOrEqual, ">=")
                } else {
                    simple(TokenKind::GreaterThan, ">")
                }
            }
            '\'' => self.scan_string(line, column),
            c if c.is_ascii_digit() => Ok(self.scan_number(c, line, column)),
            c if c.is_alphabetic() || c == '_' => Ok(self.scan_word(c, line, column)),
            c => Err(LexError::UnexpectedCharacter { ch: c, line, column }),
        }
    }

    fn scan_string(&mut self, line: usize, column: usize) -> LexResult<Token> {
        let mut text = String::new();
        self.take_while(&mut text, |c| c != '\'');

        if self.advance() != Some('\'') {
            return Err(LexError::UnterminatedString { line, column });
        }
        Ok(Token::new(TokenKind::String, text, line, column))
    }

    /// Digits and dots, optionally followed by a letter run making it a duration
    fn scan_number(&mut self, first: char, line: usize, column: usize) -> Token {
        let mut text = String::from(first);
        self.take_while(&mut text, |c| c.is_ascii_digit() || c == '.');

        if self.peek().is_some_and(char::is_alphabetic) {
            self.take_while(&mut text, char::is_alphabetic);
            return Token::new(TokenKind::Duration, text, line, column);
        }
        Token::new(TokenKind::Number, text, line, column)
    }

    fn scan_word(&mut self, first: char, line: usize, column: usize) -> Token {
        let mut text = String::from(first);
        self.take_while(&mut text, |c| c.is_alphanumeric() || c == '_');

        let kind = TokenKind::keyword(&text.to_lowercase()).unwrap_or(TokenKind::Identifier);
        Token::new(kind, text, line, column)
    }
}
