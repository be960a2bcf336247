//! AST → IR compiler
//!
//! Resolves table and field names, evaluates date functions and duration
//! arithmetic against the compiler's clock, and flattens the WHERE clause into
//! a list of AND-ed predicates.

use crate::ir::calendar::{self, Clock, Timestamp};
use crate::ir::{
    Aggregate, Field, GroupBy, HealthQuery, HealthSource, OrderBy, OrderDirection, Operator,
    Predicate, PredicateValue, Selection,
};
use crate::query::ast::*;
use crate::query::error::{CompileError, CompileResult};

/// Lowers `SelectStatement`s to `HealthQuery`
#[derive(Debug, Clone, Copy, Default)]
pub struct Compiler {
    clock: Clock,
}

impl Compiler {
    /// A compiler reading the system clock
    pub fn new() -> Self {
        Self::default()
    }

    /// A compiler resolving dates against `clock`
    pub fn with_clock(clock: Clock) -> Self {
        Self { clock }
    }

    /// Compile one statement
    pub fn compile(&self, stmt: &SelectStatement) -> CompileResult<HealthQuery> {
        let source = HealthSource::from_table_name(&stmt.from)
            .ok_or_else(|| CompileError::UnknownTable(stmt.from.clone()))?;

        let selections = stmt
            .selections
            .iter()
            .map(|expr| self.compile_selection(expr))
            .collect::<CompileResult<Vec<_>>>()?;

        let mut predicates = Vec::new();
        if let Some(expr) = &stmt.where_clause {
            self.compile_where(expr, &mut predicates)?;
        }

        let grouping = stmt.group_by.as_ref().map(compile_group_by).transpose()?;

        if stmt.having.is_some() {
            return Err(CompileError::UnsupportedFeature("HAVING".to_string()));
        }

        let ordering = stmt
            .order_by
            .as_ref()
            .map(|items| {
                items
                    .iter()
                    .map(|item| {
                        let direction = match item.direction {
                            SortDirection::Asc => OrderDirection::Ascending,
                            SortDirection::Desc => OrderDirection::Descending,
                        };
                        Ok(OrderBy::new(resolve_field_expr(&item.expr)?, direction))
                    })
                    .collect::<CompileResult<Vec<_>>>()
            })
            .transpose()?;

        Ok(HealthQuery {
            source,
            selections,
            predicates,
            grouping,
            ordering,
            limit: stmt.limit,
        })
    }

    fn compile_selection(&self, expr: &Expr) -> CompileResult<Selection> {
        match expr {
            Expr::Star => Ok(Selection::Field(Field::Value)),
            Expr::Identifier(_) | Expr::QualifiedIdentifier { .. } => {
                Ok(Selection::Field(resolve_field_expr(expr)?))
            }
            Expr::Aggregate { function, inner } => {
                let aggregate = match function {
                    AggregateFunction::Sum => Aggregate::Sum,
                    AggregateFunction::Avg => Aggregate::Avg,
                    AggregateFunction::Min => Aggregate::Min,
                    AggregateFunction::Max => Aggregate::Max,
                    AggregateFunction::Count => Aggregate::Count,
                };
                Ok(Selection::Aggregate(aggregate, resolve_field_expr(inner)?))
            }
            _ => Err(CompileError::InvalidExpression(
                "Cannot use complex expression in SELECT".to_string(),
            )),
        }
    }

    /// Append the predicates of one WHERE sub-expression
    fn compile_where(&self, expr: &Expr, out: &mut Vec<Predicate>) -> CompileResult<()> {
        match expr {
            Expr::Binary {
                left,
                op: BinaryOperator::And,
                right,
            } => {
                self.compile_where(left, out)?;
                self.compile_where(right, out)
            }
            Expr::Binary { left, op, right } => {
                let operator = compile_operator(*op)?;
                let field = resolve_field_expr(left)?;
                let value = self.compile_value(right)?;
                out.push(Predicate::new(field, operator, value));
                Ok(())
            }
            Expr::IsNull { operand, negated } => {
                let field = resolve_field_expr(operand)?;
                let operator = if *negated {
                    Operator::IsNotNull
                } else {
                    Operator::IsNull
                };
                out.push(Predicate::new(field, operator, PredicateValue::Null));
                Ok(())
            }
            Expr::Between { operand, low, high } => {
                let field = resolve_field_expr(operand)?;
                let low = self.compile_value(low)?;
                let high = self.compile_value(high)?;

                // Two dates collapse to one range; anything else expands
                if let (PredicateValue::Date(start), PredicateValue::Date(end)) = (&low, &high) {
                    out.push(Predicate::new(
                        field,
                        Operator::Between,
                        PredicateValue::DateRange {
                            start: *start,
                            end: *end,
                        },
                    ));
                } else {
                    out.push(Predicate::new(field, Operator::GreaterThanOrEqual, low));
                    out.push(Predicate::new(field, Operator::LessThanOrEqual, high));
                }
                Ok(())
            }
            _ => Err(CompileError::InvalidExpression(
                "Unsupported WHERE expression".to_string(),
            )),
        }
    }

    fn compile_value(&self, expr: &Expr) -> CompileResult<PredicateValue> {
        match expr {
            Expr::Number(n) => Ok(PredicateValue::Double(*n)),
            Expr::Unary {
                op: UnaryOperator::Negate,
                operand,
            } => match operand.as_ref() {
                Expr::Number(n) => Ok(PredicateValue::Double(-n)),
                _ => Err(CompileError::InvalidExpression(
                    "Unsupported negation in value".to_string(),
                )),
            },
            Expr::String(text) => Ok(calendar::parse_local_datetime(text)
                .map(PredicateValue::Date)
                .unwrap_or_else(|| PredicateValue::String(text.clone()))),
            Expr::Function(function) => Ok(PredicateValue::Date(self.resolve_function(*function))),
            Expr::Binary {
                left,
                op: BinaryOperator::Minus,
                right,
            } => match (left.as_ref(), right.as_ref()) {
                (Expr::Function(function), Expr::Duration { amount, unit }) => {
                    let base = self.resolve_function(*function);
                    Ok(PredicateValue::Date(subtract(base, *amount, *unit)))
                }
                _ => Err(CompileError::InvalidExpression(
                    "Unsupported arithmetic in value".to_string(),
                )),
            },
            // No anchor: relative to the current instant, not midnight
            Expr::Duration { amount, unit } => {
                Ok(PredicateValue::Date(subtract(self.clock.now(), *amount, *unit)))
            }
            _ => Err(CompileError::InvalidExpression(
                "Cannot use expression as predicate value".to_string(),
            )),
        }
    }

    fn resolve_function(&self, function: DateFunction) -> Timestamp {
        let today = self.clock.today();
        match function {
            DateFunction::Today => today,
            DateFunction::StartOfWeek => calendar::start_of_week(today),
            DateFunction::StartOfMonth => calendar::start_of_month(today),
            DateFunction::StartOfYear => calendar::start_of_year(today),
        }
    }
}

fn subtract(base: Timestamp, amount: i64, unit: DurationUnit) -> Timestamp {
    calendar::shift(base, unit.period(), amount.saturating_neg())
}

/// Resolve a column name through the fixed field table
pub fn resolve_field(name: &str) -> CompileResult<Field> {
    Field::from_name(name).ok_or_else(|| CompileError::UnknownField(name.to_string()))
}

fn resolve_field_expr(expr: &Expr) -> CompileResult<Field> {
    match expr {
        Expr::Identifier(name) => resolve_field(name),
        Expr::QualifiedIdentifier { column, .. } => resolve_field(column),
        Expr::Star => Ok(Field::Value),
        _ => Err(CompileError::InvalidExpression(
            "Expected field name".to_string(),
        )),
    }
}

fn compile_operator(op: BinaryOperator) -> CompileResult<Operator> {
    match op {
        BinaryOperator::Equal => Ok(Operator::Equal),
        BinaryOperator::NotEqual => Ok(Operator::NotEqual),
        BinaryOperator::GreaterThan => Ok(Operator::GreaterThan),
        BinaryOperator::GreaterThanOrEqual => Ok(Operator::GreaterThanOrEqual),
        BinaryOperator::LessThan => Ok(Operator::LessThan),
        BinaryOperator::LessThanOrEqual => Ok(Operator::LessThanOrEqual),
        other => Err(CompileError::UnsupportedFeature(format!(
            "Operator {other} not supported in WHERE"
        ))),
    }
}

fn compile_group_by(clause: &GroupByClause) -> CompileResult<GroupBy> {
    match clause {
        GroupByClause::Period(period) => Ok(*period),
        GroupByClause::Expression(_) => Err(CompileError::UnsupportedFeature(
            "GROUP BY expression".to_string(),
        )),
    }
}
