//! Query abstract syntax tree
//!
//! Pure data produced by the parser and consumed by the compiler. Nothing is
//! evaluated here: `today() - 7d` stays a binary expression until compiled.
//!
//! # Example Queries
//!
//! ```text
//! SELECT * FROM steps
//! SELECT sum(count) FROM steps WHERE date > today() - 7d GROUP BY day
//! SELECT avg(value), max(value) FROM heart_rate ORDER BY date DESC LIMIT 10
//! ```

use crate::ir::GroupBy;
use serde::Serialize;

/// Aggregate function names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateFunction {
    Sum,
    Avg,
    Min,
    Max,
    Count,
}

/// Zero-argument date functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFunction {
    Today,
    StartOfWeek,
    StartOfMonth,
    StartOfYear,
}

/// Units of a duration literal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    Hours,
    Days,
    Weeks,
    Months,
    Years,
}

impl DurationUnit {
    /// Parse a unit suffix: `h`, `d`, `w`, `mo` or `y`
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "h" => Some(Self::Hours),
            "d" => Some(Self::Days),
            "w" => Some(Self::Weeks),
            "mo" => Some(Self::Months),
            "y" => Some(Self::Years),
            _ => None,
        }
    }

    /// Calendar period one unit spans
    pub fn period(&self) -> GroupBy {
        match self {
            Self::Hours => GroupBy::Hour,
            Self::Days => GroupBy::Day,
            Self::Weeks => GroupBy::Week,
            Self::Months => GroupBy::Month,
            Self::Years => GroupBy::Year,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOperator {
    Plus,
    Minus,
    Multiply,
    Divide,
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    And,
    Or,
}

impl std::fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::And => "AND",
            Self::Or => "OR",
        };
        f.write_str(symbol)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOperator {
    Not,
    Negate,
}

/// Expression node
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Identifier(String),
    QualifiedIdentifier { table: String, column: String },
    Number(f64),
    String(String),
    Duration { amount: i64, unit: DurationUnit },
    Aggregate { function: AggregateFunction, inner: Box<Expr> },
    Function(DateFunction),
    Binary { left: Box<Expr>, op: BinaryOperator, right: Box<Expr> },
    Unary { op: UnaryOperator, operand: Box<Expr> },
    IsNull { operand: Box<Expr>, negated: bool },
    Between { operand: Box<Expr>, low: Box<Expr>, high: Box<Expr> },
    /// `*`
    Star,
}

impl Expr {
    pub fn binary(left: Expr, op: BinaryOperator, right: Expr) -> Self {
        Self::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn identifier(name: impl Into<String>) -> Self {
        Self::Identifier(name.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderByItem {
    pub expr: Expr,
    pub direction: SortDirection,
}

/// GROUP BY target: a known period keyword or anything else
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupByClause {
    Period(GroupBy),
    Expression(Expr),
}

/// A complete `SELECT` statement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectStatement {
    pub selections: Vec<Expr>,
    pub from: String,
    pub where_clause: Option<Expr>,
    pub group_by: Option<GroupByClause>,
    pub having: Option<Expr>,
    pub order_by: Option<Vec<OrderByItem>>,
    pub limit: Option<usize>,
}

impl SelectStatement {
    /// A bare `SELECT <selections> FROM <from>`
    pub fn new(selections: Vec<Expr>, from: impl Into<String>) -> Self {
        Self {
            selections,
            from: from.into(),
            where_clause: None,
            group_by: None,
            having: None,
            order_by: None,
            limit: None,
        }
    }
}
