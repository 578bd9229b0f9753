//! Boolean predicate trees.

use std::fmt;
use std::ops::Not;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::dialect::Dialect;
use crate::generator;
use crate::query::QueryBuilder;
use crate::relation::Relation;
use crate::schema::TableRef;
use crate::{Result, SqlWeaveError, Value};

use super::{ColumnRef, Operator, ParamSink};

/// Scopes a nested (correlated or eager) query.
///
/// Receives the query the generator prepared and returns it with extra
/// clauses. Whatever it adds stays inside the nested query.
#[derive(Clone)]
pub struct Constraint(Arc<dyn Fn(QueryBuilder) -> Result<QueryBuilder> + Send + Sync>);

impl Constraint {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(QueryBuilder) -> Result<QueryBuilder> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn apply(&self, query: QueryBuilder) -> Result<QueryBuilder> {
        (self.0)(query)
    }
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Constraint(..)")
    }
}

/// Right-hand side of a simple predicate.
#[derive(Debug, Clone)]
pub enum Operand {
    /// Unary operators (IS NULL)
    None,
    Value(Value),
    List(Vec<Value>),
    Range(Value, Value),
    Column(ColumnRef),
    Subquery(Box<QueryBuilder>),
}

/// A boolean condition, rendered only once a dialect is known.
#[derive(Debug, Clone)]
pub enum Predicate {
    Simple {
        column: ColumnRef,
        operator: Operator,
        operand: Operand,
    },
    /// Unparameterized SQL; the caller vouches for its safety. A grouped
    /// fragment is parenthesized whenever it is combined with another
    /// predicate.
    Raw { sql: String, grouped: bool },
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Not(Box<Predicate>),
    /// `[NOT] EXISTS (subquery)`
    Exists {
        query: Box<QueryBuilder>,
        negate: bool,
    },
    /// Correlated existence of related rows.
    RelationExists {
        relation: Arc<Relation>,
        constraint: Option<Constraint>,
        negate: bool,
        owner_alias: String,
    },
    /// Correlated related-row count compared against a number.
    RelationCount {
        relation: Arc<Relation>,
        operator: Operator,
        count: i64,
        constraint: Option<Constraint>,
        owner_alias: String,
    },
    /// Existence across the candidate target tables of a `MorphTo` relation.
    MorphExists {
        relation: Arc<Relation>,
        types: Vec<TableRef>,
        constraint: Option<Constraint>,
        negate: bool,
        owner_alias: String,
    },
}

impl Predicate {
    fn simple(column: impl Into<ColumnRef>, operator: Operator, operand: Operand) -> Self {
        Predicate::Simple {
            column: column.into(),
            operator,
            operand,
        }
    }

    /// `column <operator> value`
    pub fn compare(column: impl Into<ColumnRef>, operator: Operator, value: impl Into<Value>) -> Self {
        let operand = match operator {
            Operator::IsNull | Operator::IsNotNull => Operand::None,
            _ => match value.into() {
                Value::Array(values) if matches!(operator, Operator::In | Operator::NotIn) => {
                    Operand::List(values)
                }
                value => Operand::Value(value),
            },
        };
        Self::simple(column, operator, operand)
    }

    pub fn eq(column: impl Into<ColumnRef>, value: impl Into<Value>) -> Self {
        Self::compare(column, Operator::Eq, value)
    }

    pub fn ne(column: impl Into<ColumnRef>, value: impl Into<Value>) -> Self {
        Self::compare(column, Operator::Ne, value)
    }

    pub fn gt(column: impl Into<ColumnRef>, value: impl Into<Value>) -> Self {
        Self::compare(column, Operator::Gt, value)
    }

    pub fn gte(column: impl Into<ColumnRef>, value: impl Into<Value>) -> Self {
        Self::compare(column, Operator::Gte, value)
    }

    pub fn lt(column: impl Into<ColumnRef>, value: impl Into<Value>) -> Self {
        Self::compare(column, Operator::Lt, value)
    }

    pub fn lte(column: impl Into<ColumnRef>, value: impl Into<Value>) -> Self {
        Self::compare(column, Operator::Lte, value)
    }

    pub fn like(column: impl Into<ColumnRef>, pattern: impl Into<String>) -> Self {
        Self::compare(column, Operator::Like, pattern.into())
    }

    pub fn not_like(column: impl Into<ColumnRef>, pattern: impl Into<String>) -> Self {
        Self::compare(column, Operator::NotLike, pattern.into())
    }

    pub fn ilike(column: impl Into<ColumnRef>, pattern: impl Into<String>) -> Self {
        Self::compare(column, Operator::ILike, pattern.into())
    }

    pub fn not_ilike(column: impl Into<ColumnRef>, pattern: impl Into<String>) -> Self {
        Self::compare(column, Operator::NotILike, pattern.into())
    }

    pub fn in_list<V: Into<Value>>(column: impl Into<ColumnRef>, values: impl IntoIterator<Item = V>) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        Self::simple(column, Operator::In, Operand::List(values))
    }

    pub fn not_in_list<V: Into<Value>>(
        column: impl Into<ColumnRef>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        Self::simple(column, Operator::NotIn, Operand::List(values))
    }

    pub fn in_subquery(column: impl Into<ColumnRef>, query: QueryBuilder) -> Self {
        Self::simple(column, Operator::In, Operand::Subquery(Box::new(query)))
    }

    pub fn not_in_subquery(column: impl Into<ColumnRef>, query: QueryBuilder) -> Self {
        Self::simple(column, Operator::NotIn, Operand::Subquery(Box::new(query)))
    }

    /// `column <operator> (scalar subquery)`
    pub fn compare_subquery(column: impl Into<ColumnRef>, operator: Operator, query: QueryBuilder) -> Self {
        Self::simple(column, operator, Operand::Subquery(Box::new(query)))
    }

    pub fn is_null(column: impl Into<ColumnRef>) -> Self {
        Self::simple(column, Operator::IsNull, Operand::None)
    }

    pub fn is_not_null(column: impl Into<ColumnRef>) -> Self {
        Self::simple(column, Operator::IsNotNull, Operand::None)
    }

    pub fn between(column: impl Into<ColumnRef>, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        Self::simple(column, Operator::Between, Operand::Range(low.into(), high.into()))
    }

    pub fn not_between(column: impl Into<ColumnRef>, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        Self::simple(column, Operator::NotBetween, Operand::Range(low.into(), high.into()))
    }

    /// `left = right` between two columns.
    pub fn columns_eq(left: impl Into<ColumnRef>, right: impl Into<ColumnRef>) -> Self {
        Self::column_compare(left, Operator::Eq, right)
    }

    pub fn column_compare(
        left: impl Into<ColumnRef>,
        operator: Operator,
        right: impl Into<ColumnRef>,
    ) -> Self {
        Self::simple(left, operator, Operand::Column(right.into()))
    }

    pub fn json_contains(column: impl Into<ColumnRef>, document: JsonValue) -> Self {
        Self::simple(
            column,
            Operator::JsonContains,
            Operand::Value(Value::String(document.to_string())),
        )
    }

    pub fn array_contains<V: Into<Value>>(
        column: impl Into<ColumnRef>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        Self::simple(column, Operator::ArrayContains, Operand::Value(Value::Array(values)))
    }

    pub fn array_any(column: impl Into<ColumnRef>, value: impl Into<Value>) -> Self {
        Self::simple(column, Operator::ArrayAny, Operand::Value(value.into()))
    }

    pub fn raw(sql: impl Into<String>) -> Self {
        Predicate::Raw {
            sql: sql.into(),
            grouped: true,
        }
    }

    /// Raw fragment the caller guarantees is a single term (`a = b`,
    /// `f(x)`), emitted without protective parentheses.
    pub fn raw_term(sql: impl Into<String>) -> Self {
        Predicate::Raw {
            sql: sql.into(),
            grouped: false,
        }
    }

    pub fn exists(query: QueryBuilder) -> Self {
        Predicate::Exists {
            query: Box::new(query),
            negate: false,
        }
    }

    pub fn not_exists(query: QueryBuilder) -> Self {
        Predicate::Exists {
            query: Box::new(query),
            negate: true,
        }
    }

    pub fn relation_exists(
        relation: Arc<Relation>,
        constraint: Option<Constraint>,
        negate: bool,
        owner_alias: &str,
    ) -> Self {
        Predicate::RelationExists {
            relation,
            constraint,
            negate,
            owner_alias: owner_alias.to_string(),
        }
    }

    pub fn relation_count(
        relation: Arc<Relation>,
        operator: Operator,
        count: i64,
        constraint: Option<Constraint>,
        owner_alias: &str,
    ) -> Self {
        Predicate::RelationCount {
            relation,
            operator,
            count,
            constraint,
            owner_alias: owner_alias.to_string(),
        }
    }

    pub fn and(self, other: Predicate) -> Self {
        Predicate::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Predicate) -> Self {
        Predicate::Or(Box::new(self), Box::new(other))
    }

    pub fn negate(self) -> Self {
        Predicate::Not(Box::new(self))
    }

    /// Left-nested AND of every predicate, or `None` when there are none.
    pub fn all(predicates: impl IntoIterator<Item = Predicate>) -> Option<Predicate> {
        predicates.into_iter().reduce(Predicate::and)
    }

    fn precedence(&self) -> u8 {
        match self {
            Predicate::Raw { grouped: true, .. } => 0,
            Predicate::Or(..) => 1,
            Predicate::And(..) => 2,
            _ => 3,
        }
    }

    fn render_operand(
        child: &Predicate,
        min_precedence: u8,
        dialect: &Dialect,
        sink: &mut ParamSink,
    ) -> Result<String> {
        let sql = child.render(dialect, sink)?;
        if child.precedence() < min_precedence {
            Ok(format!("({})", sql))
        } else {
            Ok(sql)
        }
    }

    /// Renders the predicate, registering every literal with `sink`.
    pub fn render(&self, dialect: &Dialect, sink: &mut ParamSink) -> Result<String> {
        match self {
            Predicate::Simple {
                column,
                operator,
                operand,
            } => render_simple(column, *operator, operand, dialect, sink),
            Predicate::Raw { sql, .. } => Ok(sql.clone()),
            Predicate::And(left, right) => {
                let l = Self::render_operand(left, 2, dialect, sink)?;
                let r = Self::render_operand(right, 2, dialect, sink)?;
                Ok(format!("{} AND {}", l, r))
            }
            Predicate::Or(left, right) => {
                let l = Self::render_operand(left, 1, dialect, sink)?;
                let r = Self::render_operand(right, 1, dialect, sink)?;
                Ok(format!("{} OR {}", l, r))
            }
            Predicate::Not(inner) => Ok(format!("NOT ({})", inner.render(dialect, sink)?)),
            Predicate::Exists { query, negate } => {
                let sql = query.render_into(dialect, sink)?;
                let keyword = if *negate { "NOT EXISTS" } else { "EXISTS" };
                Ok(format!("{} ({})", keyword, sql))
            }
            Predicate::RelationExists {
                relation,
                constraint,
                negate,
                owner_alias,
            } => generator::render_exists(
                relation,
                constraint.as_ref(),
                *negate,
                owner_alias,
                dialect,
                sink,
            ),
            Predicate::RelationCount {
                relation,
                operator,
                count,
                constraint,
                owner_alias,
            } => generator::render_count(
                relation,
                *operator,
                *count,
                constraint.as_ref(),
                owner_alias,
                dialect,
                sink,
            ),
            Predicate::MorphExists {
                relation,
                types,
                constraint,
                negate,
                owner_alias,
            } => generator::render_morph_exists(
                relation,
                types,
                constraint.as_ref(),
                *negate,
                owner_alias,
                dialect,
                sink,
            ),
        }
    }
}

impl Not for Predicate {
    type Output = Predicate;

    fn not(self) -> Predicate {
        self.negate()
    }
}

fn render_simple(
    column: &ColumnRef,
    operator: Operator,
    operand: &Operand,
    dialect: &Dialect,
    sink: &mut ParamSink,
) -> Result<String> {
    let lhs = column.render(dialect, sink)?;

    match operator {
        Operator::IsNull | Operator::IsNotNull => {
            Ok(format!("{} {}", lhs, operator.to_sql()))
        }
        Operator::In | Operator::NotIn => match operand {
            Operand::List(values) => {
                if values.is_empty() {
                    let always = if operator == Operator::In { "1 = 0" } else { "1 = 1" };
                    return Ok(always.to_string());
                }
                let placeholders = sink.bind_all(dialect, values);
                Ok(format!("{} {} ({})", lhs, operator.to_sql(), placeholders))
            }
            Operand::Subquery(query) => {
                let sql = query.render_into(dialect, sink)?;
                Ok(format!("{} {} ({})", lhs, operator.to_sql(), sql))
            }
            Operand::Value(_) | Operand::Column(_) => {
                let rhs = render_rhs(operator, operand, dialect, sink)?;
                Ok(format!("{} {} ({})", lhs, operator.to_sql(), rhs))
            }
            _ => Err(mismatched(operator, operand)),
        },
        Operator::Between | Operator::NotBetween => match operand {
            Operand::Range(low, high) => {
                let low = sink.bind(dialect, low.clone());
                let high = sink.bind(dialect, high.clone());
                Ok(format!("{} {} {} AND {}", lhs, operator.to_sql(), low, high))
            }
            _ => Err(mismatched(operator, operand)),
        },
        // A NULL literal never compares equal; use the IS form instead.
        Operator::Eq if matches!(operand, Operand::Value(Value::Null)) => {
            Ok(format!("{} IS NULL", lhs))
        }
        Operator::Ne if matches!(operand, Operand::Value(Value::Null)) => {
            Ok(format!("{} IS NOT NULL", lhs))
        }
        _ => {
            let rhs = render_rhs(operator, operand, dialect, sink)?;
            match operator {
                Operator::ILike | Operator::NotILike => {
                    Ok(dialect.ilike(&lhs, &rhs, operator == Operator::NotILike))
                }
                Operator::JsonContains => dialect.json_contains(&lhs, &rhs),
                Operator::ArrayContains => dialect.array_contains(&lhs, &rhs),
                Operator::ArrayAny => dialect.array_any(&rhs, &lhs),
                _ => Ok(format!("{} {} {}", lhs, operator.to_sql(), rhs)),
            }
        }
    }
}

/// Right-hand side of a binary comparison: a placeholder, a column or a
/// parenthesized subquery.
fn render_rhs(
    operator: Operator,
    operand: &Operand,
    dialect: &Dialect,
    sink: &mut ParamSink,
) -> Result<String> {
    match operand {
        Operand::Value(value) => Ok(sink.bind(dialect, value.clone())),
        Operand::Column(other) => other.render(dialect, sink),
        Operand::Subquery(query) => Ok(format!("({})", query.render_into(dialect, sink)?)),
        _ => Err(mismatched(operator, operand)),
    }
}

fn mismatched(operator: Operator, operand: &Operand) -> SqlWeaveError {
    SqlWeaveError::InvalidArgument(format!(
        "Operator {} cannot take operand {:?}",
        operator, operand
    ))
}
