//! Tokens produced by the lexer

use serde::Serialize;

/// Kinds of token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    // Keywords
    Select,
    From,
    Where,
    Group,
    By,
    Having,
    Order,
    Limit,
    Asc,
    Desc,
    And,
    Or,
    Not,
    Is,
    Null,
    Between,

    // Aggregates
    Sum,
    Avg,
    Min,
    Max,
    Count,

    // Date functions
    Today,
    StartOfWeek,
    StartOfMonth,
    StartOfYear,

    // Literals
    Identifier,
    Number,
    String,
    Duration,

    // Operators
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Plus,
    Minus,
    Star,
    Slash,

    // Punctuation
    LeftParen,
    RightParen,
    Comma,
    Dot,

    Eof,
}

impl TokenKind {
    /// Keyword lookup on an already lowercased word
    pub fn keyword(word: &str) -> Option<Self> {
        Some(match word {
            "select" => Self::Select,
            "from" => Self::From,
            "where" => Self::Where,
            "group" => Self::Group,
            "by" => Self::By,
            "having" => Self::Having,
            "order" => Self::Order,
            "limit" => Self::Limit,
            "asc" => Self::Asc,
            "desc" => Self::Desc,
            "and" => Self::And,
            "or" => Self::Or,
            "not" => Self::Not,
            "is" => Self::Is,
            "null" => Self::Null,
            "between" => Self::Between,
            "sum" => Self::Sum,
            "avg" => Self::Avg,
            "min" => Self::Min,
            "max" => Self::Max,
            "count" => Self::Count,
            "today" => Self::Today,
            "start_of_week" => Self::StartOfWeek,
            "start_of_month" => Self::StartOfMonth,
            "start_of_year" => Self::StartOfYear,
            _ => return None,
        })
    }

    /// Whether this is one of the aggregate keywords
    pub fn is_aggregate(&self) -> bool {
        matches!(
            self,
            Self::Sum | Self::Avg | Self::Min | Self::Max | Self::Count
        )
    }
}

/// A lexed token with its source position (1-based)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    /// Source text; string literals exclude their quotes
    pub text: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
            column,
        }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.kind == TokenKind::Eof {
            write!(f, "end of input at {}:{}", self.line, self.column)
        } else {
            write!(f, "'{}' at {}:{}", self.text, self.line, self.column)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_lookup() {
        assert_eq!(TokenKind::keyword("select"), Some(TokenKind::Select));
        assert_eq!(TokenKind::keyword("start_of_week"), Some(TokenKind::StartOfWeek));
        assert_eq!(TokenKind::keyword("steps"), None);
        // lookup expects lowercase input
        assert_eq!(TokenKind::keyword("SELECT"), None);
    }

    #[test]
    fn test_token_display() {
        let token = Token::new(TokenKind::Identifier, "steps", 1, 15);
        assert_eq!(token.to_string(), "'steps' at 1:15");
        let eof = Token::new(TokenKind::Eof, "", 2, 1);
        assert_eq!(eof.to_string(), "end of input at 2:1");
    }
}
