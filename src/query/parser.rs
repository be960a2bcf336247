//! Query parser
//!
//! Recursive descent over the lexer's token stream, producing a
//! `SelectStatement`.
//!
//! # Supported Syntax
//!
//! ```text
//! SELECT selection [, selection ...] FROM table
//! [WHERE expr]
//! [GROUP BY hour|day|week|month|year]
//! [HAVING expr]
//! [ORDER BY expr [ASC|DESC] [, ...]]
//! [LIMIT n]
//! ```
//!
//! Precedence, loosest first: OR, AND, comparison (=, !=, <, <=, >, >=,
//! IS [NOT] NULL, BETWEEN), additive, multiplicative, unary. Comparisons do
//! not chain.

use crate::ir::GroupBy;
use crate::query::ast::*;
use crate::query::error::{ParseError, ParseResult};
use crate::query::token::{Token, TokenKind};

/// Parse a token stream into a statement
pub fn parse(tokens: Vec<Token>) -> ParseResult<SelectStatement> {
    Parser::new(tokens).parse()
}

/// Token cursor
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    /// Wrap a token stream. A missing trailing `Eof` is added.
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let (line, column) = tokens
                .last()
                .map(|t| (t.line, t.column + t.text.chars().count()))
                .unwrap_or((1, 1));
            tokens.push(Token::new(TokenKind::Eof, "", line, column));
        }
        Self { tokens, pos: 0 }
    }

    /// Parse one statement; any tokens left over are an error
    pub fn parse(mut self) -> ParseResult<SelectStatement> {
        let statement = self.parse_select_statement()?;
        if !self.is_at_end() {
            return Err(self.unexpected("end of query"));
        }
        Ok(statement)
    }

    // Token navigation

    fn peek(&self) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[self.pos.min(last)]
    }

    fn peek_next_kind(&self) -> TokenKind {
        let last = self.tokens.len() - 1;
        self.tokens[(self.pos + 1).min(last)].kind
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !self.is_at_end() {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: TokenKind) -> bool {
        !self.is_at_end() && self.peek().kind == kind
    }

    /// Consume the next token if it is `kind`
    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn consume(&mut self, kind: TokenKind, expected: &str) -> ParseResult<Token> {
        if self.check(kind) {
            return Ok(self.advance());
        }
        Err(self.unexpected(expected))
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        if self.is_at_end() {
            ParseError::UnexpectedEndOfInput
        } else {
            ParseError::UnexpectedToken {
                expected: expected.to_string(),
                got: self.peek().clone(),
            }
        }
    }

    // Statement

    fn parse_select_statement(&mut self) -> ParseResult<SelectStatement> {
        self.consume(TokenKind::Select, "SELECT")?;
        let selections = self.parse_selections()?;

        self.consume(TokenKind::From, "FROM")?;
        let from = self.consume(TokenKind::Identifier, "table name")?.text;

        let mut statement = SelectStatement::new(selections, from);

        if self.matches(TokenKind::Where) {
            statement.where_clause = Some(self.parse_expression()?);
        }

        if self.matches(TokenKind::Group) {
            self.consume(TokenKind::By, "BY after GROUP")?;
            statement.group_by = Some(self.parse_group_by()?);
        }

        if self.matches(TokenKind::Having) {
            statement.having = Some(self.parse_expression()?);
        }

        if self.matches(TokenKind::Order) {
            self.consume(TokenKind::By, "BY after ORDER")?;
            statement.order_by = Some(self.parse_order_by()?);
        }

        if self.matches(TokenKind::Limit) {
            let token = self.consume(TokenKind::Number, "number")?;
            let limit = token
                .text
                .parse::<usize>()
                .map_err(|_| ParseError::InvalidExpression(format!("Invalid LIMIT: {}", token.text)))?;
            statement.limit = Some(limit);
        }

        Ok(statement)
    }

    fn parse_selections(&mut self) -> ParseResult<Vec<Expr>> {
        let mut selections = vec![self.parse_selection()?];
        while self.matches(TokenKind::Comma) {
            selections.push(self.parse_selection()?);
        }
        Ok(selections)
    }

    fn parse_selection(&mut self) -> ParseResult<Expr> {
        if self.matches(TokenKind::Star) {
            return Ok(Expr::Star);
        }

        self.parse_expression()
    }

    fn parse_aggregate_call(&mut self, kind: TokenKind) -> ParseResult<Expr> {
        self.advance();
        let function = match kind {
            TokenKind::Sum => AggregateFunction::Sum,
            TokenKind::Avg => AggregateFunction::Avg,
            TokenKind::Min => AggregateFunction::Min,
            TokenKind::Max => AggregateFunction::Max,
            _ => AggregateFunction::Count,
        };
        self.consume(TokenKind::LeftParen, "(")?;
        let inner = self.parse_expression()?;
        self.consume(TokenKind::RightParen, ")")?;
        Ok(Expr::Aggregate {
            function,
            inner: Box::new(inner),
        })
    }

    fn parse_group_by(&mut self) -> ParseResult<GroupByClause> {
        let token = self.consume(TokenKind::Identifier, "GROUP BY column or period")?;
        Ok(match GroupBy::from_name(&token.text) {
            Some(period) => GroupByClause::Period(period),
            None => GroupByClause::Expression(Expr::Identifier(token.text)),
        })
    }

    fn parse_order_by(&mut self) -> ParseResult<Vec<OrderByItem>> {
        let mut items = Vec::new();
        loop {
            let expr = self.parse_expression()?;
            let direction = if self.matches(TokenKind::Desc) {
                SortDirection::Desc
            } else {
                self.matches(TokenKind::Asc);
                SortDirection::Asc
            };
            items.push(OrderByItem { expr, direction });

            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        Ok(items)
    }

    // Expressions

    fn parse_expression(&mut self) -> ParseResult<Expr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_and()?;
        while self.matches(TokenKind::Or) {
            let right = self.parse_and()?;
            left = Expr::binary(left, BinaryOperator::Or, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_comparison()?;
        while self.matches(TokenKind::And) {
            let right = self.parse_comparison()?;
            left = Expr::binary(left, BinaryOperator::And, right);
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> ParseResult<Expr> {
        let left = self.parse_additive()?;

        let op = match self.peek().kind {
            TokenKind::Equal => Some(BinaryOperator::Equal),
            TokenKind::NotEqual => Some(BinaryOperator::NotEqual),
            TokenKind::GreaterThan => Some(BinaryOperator::GreaterThan),
            TokenKind::GreaterThanOrEqual => Some(BinaryOperator::GreaterThanOrEqual),
            TokenKind::LessThan => Some(BinaryOperator::LessThan),
            TokenKind::LessThanOrEqual => Some(BinaryOperator::LessThanOrEqual),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let right = self.parse_additive()?;
            return Ok(Expr::binary(left, op, right));
        }

        if self.matches(TokenKind::Is) {
            let negated = self.matches(TokenKind::Not);
            self.consume(TokenKind::Null, "NULL")?;
            return Ok(Expr::IsNull {
                operand: Box::new(left),
                negated,
            });
        }

        if self.matches(TokenKind::Between) {
            let low = self.parse_additive()?;
            self.consume(TokenKind::And, "AND after BETWEEN")?;
            let high = self.parse_additive()?;
            return Ok(Expr::Between {
                operand: Box::new(left),
                low: Box::new(low),
                high: Box::new(high),
            });
        }

        Ok(left)
    }

    fn parse_additive(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOperator::Plus,
                TokenKind::Minus => BinaryOperator::Minus,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOperator::Multiply,
                TokenKind::Slash => BinaryOperator::Divide,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let op = if self.matches(TokenKind::Not) {
            UnaryOperator::Not
        } else if self.matches(TokenKind::Minus) {
            UnaryOperator::Negate
        } else {
            return self.parse_primary();
        };
        let operand = self.parse_unary()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let token = self.peek().clone();

        let function = match token.kind {
            TokenKind::Today => Some(DateFunction::Today),
            TokenKind::StartOfWeek => Some(DateFunction::StartOfWeek),
            TokenKind::StartOfMonth => Some(DateFunction::StartOfMonth),
            TokenKind::StartOfYear => Some(DateFunction::StartOfYear),
            _ => None,
        };
        if let Some(function) = function {
            self.advance();
            self.consume(TokenKind::LeftParen, "(")?;
            self.consume(TokenKind::RightParen, ")")?;
            return Ok(Expr::Function(function));
        }

        // An aggregate keyword not followed by '(' is a column name
        if token.kind.is_aggregate() && self.peek_next_kind() == TokenKind::LeftParen {
            return self.parse_aggregate_call(token.kind);
        }

        match token.kind {
            TokenKind::Number => {
                self.advance();
                let value = token.text.parse::<f64>().map_err(|_| {
                    ParseError::InvalidExpression(format!("Invalid number: {}", token.text))
                })?;
                Ok(Expr::Number(value))
            }
            TokenKind::Duration => {
                self.advance();
                parse_duration(&token.text)
            }
            TokenKind::String => {
                self.advance();
                Ok(Expr::String(token.text))
            }
            TokenKind::Star => {
                self.advance();
                Ok(Expr::Star)
            }
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.consume(TokenKind::RightParen, ")")?;
                Ok(expr)
            }
            kind if kind == TokenKind::Identifier || kind.is_aggregate() => {
                self.advance();
                if self.matches(TokenKind::Dot) {
                    let column = self.consume(TokenKind::Identifier, "column name")?;
                    return Ok(Expr::QualifiedIdentifier {
                        table: token.text,
                        column: column.text,
                    });
                }
                Ok(Expr::Identifier(token.text))
            }
            _ => Err(self.unexpected("expression")),
        }
    }
}

/// Split `7d` / `3mo` into amount and unit
fn parse_duration(text: &str) -> ParseResult<Expr> {
    let split = text
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(text.len());
    let (digits, suffix) = text.split_at(split);

    let amount = digits
        .parse::<i64>()
        .map_err(|_| ParseError::InvalidExpression(format!("Invalid duration number: {text}")))?;
    let unit = DurationUnit::from_suffix(suffix)
        .ok_or_else(|| ParseError::InvalidExpression(format!("Invalid duration unit: {suffix}")))?;

    Ok(Expr::Duration { amount, unit })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::lexer::tokenize;

    fn parse_str(source: &str) -> ParseResult<SelectStatement> {
        parse(tokenize(source).unwrap())
    }

    #[test]
    fn test_parse_select_star() {
        let stmt = parse_str("SELECT * FROM steps").unwrap();
        assert_eq!(stmt.selections, vec![Expr::Star]);
        assert_eq!(stmt.from, "steps");
        assert!(stmt.where_clause.is_none());
        assert!(stmt.limit.is_none());
    }

    #[test]
    fn test_parse_aggregate_with_keyword_column() {
        let stmt = parse_str("SELECT sum(count) FROM steps").unwrap();
        assert_eq!(
            stmt.selections,
            vec![Expr::Aggregate {
                function: AggregateFunction::Sum,
                inner: Box::new(Expr::identifier("count")),
            }]
        );
    }

    #[test]
    fn test_parse_keyword_as_plain_column() {
        let stmt = parse_str("SELECT count, date FROM steps").unwrap();
        assert_eq!(
            stmt.selections,
            vec![Expr::identifier("count"), Expr::identifier("date")]
        );
    }

    #[test]
    fn test_parse_date_arithmetic_is_not_evaluated() {
        let stmt = parse_str("SELECT value FROM steps WHERE date > today() - 7d").unwrap();
        let expected = Expr::binary(
            Expr::identifier("date"),
            BinaryOperator::GreaterThan,
            Expr::binary(
                Expr::Function(DateFunction::Today),
                BinaryOperator::Minus,
                Expr::Duration {
                    amount: 7,
                    unit: DurationUnit::Days,
                },
            ),
        );
        assert_eq!(stmt.where_clause, Some(expected));
    }

    #[test]
    fn test_parse_and_binds_tighter_than_or() {
        let stmt =
            parse_str("SELECT value FROM steps WHERE value > 1 OR value < 2 AND date > today()")
                .unwrap();
        match stmt.where_clause {
            Some(Expr::Binary { op, right, .. }) => {
                assert_eq!(op, BinaryOperator::Or);
                assert!(matches!(
                    *right,
                    Expr::Binary {
                        op: BinaryOperator::And,
                        ..
                    }
                ));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_between_and_is_null() {
        let stmt = parse_str(
            "SELECT value FROM steps WHERE date BETWEEN '2026-02-05 16:00' AND '2026-02-05 17:00' AND device IS NOT NULL",
        )
        .unwrap();
        let Some(Expr::Binary { left, op, right }) = stmt.where_clause else {
            panic!("expected AND");
        };
        assert_eq!(op, BinaryOperator::And);
        assert_eq!(
            *left,
            Expr::Between {
                operand: Box::new(Expr::identifier("date")),
                low: Box::new(Expr::String("2026-02-05 16:00".into())),
                high: Box::new(Expr::String("2026-02-05 17:00".into())),
            }
        );
        assert_eq!(
            *right,
            Expr::IsNull {
                operand: Box::new(Expr::identifier("device")),
                negated: true,
            }
        );
    }

    #[test]
    fn test_parse_full_statement() {
        let stmt = parse_str(
            "SELECT avg(value), max(value) FROM heart_rate WHERE date > start_of_month() \
             GROUP BY Week HAVING avg(value) > 60 ORDER BY date DESC, value LIMIT 10",
        )
        .unwrap();
        assert_eq!(stmt.selections.len(), 2);
        assert_eq!(stmt.group_by, Some(GroupByClause::Period(GroupBy::Week)));
        assert!(stmt.having.is_some());
        let order = stmt.order_by.unwrap();
        assert_eq!(order.len(), 2);
        assert_eq!(order[0].direction, SortDirection::Desc);
        assert_eq!(order[1].direction, SortDirection::Asc);
        assert_eq!(stmt.limit, Some(10));
    }

    #[test]
    fn test_parse_group_by_expression() {
        let stmt = parse_str("SELECT sum(value) FROM steps GROUP BY source").unwrap();
        assert_eq!(
            stmt.group_by,
            Some(GroupByClause::Expression(Expr::identifier("source")))
        );
    }

    #[test]
    fn test_parse_qualified_identifier_and_unary() {
        let stmt = parse_str("SELECT steps.value FROM steps WHERE NOT value = -1").unwrap();
        assert_eq!(
            stmt.selections[0],
            Expr::QualifiedIdentifier {
                table: "steps".into(),
                column: "value".into()
            }
        );
        assert!(matches!(
            stmt.where_clause,
            Some(Expr::Unary {
                op: UnaryOperator::Not,
                ..
            })
        ));
    }

    #[test]
    fn test_parse_parenthesized() {
        let stmt = parse_str("SELECT value FROM steps WHERE (value > 1)").unwrap();
        assert!(matches!(
            stmt.where_clause,
            Some(Expr::Binary {
                op: BinaryOperator::GreaterThan,
                ..
            })
        ));
    }

    #[test]
    fn test_parse_missing_from() {
        let err = parse_str("SELECT value steps").unwrap_err();
        match err {
            ParseError::UnexpectedToken { expected, got } => {
                assert_eq!(expected, "FROM");
                assert_eq!(got.text, "steps");
                assert_eq!(got.column, 14);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_end_of_input() {
        assert_eq!(parse_str("SELECT"), Err(ParseError::UnexpectedEndOfInput));
        assert_eq!(
            parse_str("SELECT value FROM"),
            Err(ParseError::UnexpectedEndOfInput)
        );
        assert_eq!(
            parse_str("SELECT value FROM steps WHERE date >"),
            Err(ParseError::UnexpectedEndOfInput)
        );
    }

    #[test]
    fn test_parse_invalid_duration_unit() {
        let err = parse_str("SELECT value FROM steps WHERE date > today() - 7x").unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidExpression("Invalid duration unit: x".into())
        );
    }

    #[test]
    fn test_parse_trailing_tokens() {
        let err = parse_str("SELECT value FROM steps steps").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedToken { .. }));
    }

    #[test]
    fn test_parse_invalid_limit() {
        let err = parse_str("SELECT value FROM steps LIMIT 2.5").unwrap_err();
        assert!(matches!(err, ParseError::InvalidExpression(_)));
    }
}
