//! JOIN clause types and utilities.

use super::helpers::validate_identifier;
use crate::dialect::Dialect;
use crate::expr::{ColumnRef, JoinType, ParamSink, Predicate};
use crate::Result;

/// Structured `left = right` JOIN condition over validated identifiers.
#[derive(Debug, Clone)]
pub struct JoinCondition {
    /// Column on the joined side, e.g. `posts.user_id`
    pub left_column: ColumnRef,
    /// Column on the existing side, e.g. `users.id`
    pub right_column: ColumnRef,
}

impl JoinCondition {
    /// Create a new JOIN condition with validated identifiers
    pub fn new(left_column: &str, right_column: &str) -> Result<Self> {
        let left_column = ColumnRef::new(left_column);
        let right_column = ColumnRef::new(right_column);
        left_column.validate()?;
        right_column.validate()?;
        Ok(Self {
            left_column,
            right_column,
        })
    }
}

impl From<JoinCondition> for Predicate {
    fn from(condition: JoinCondition) -> Self {
        Predicate::columns_eq(condition.left_column, condition.right_column)
    }
}

/// Represents a JOIN clause
#[derive(Debug, Clone)]
pub struct JoinClause {
    /// Type of JOIN (INNER, LEFT, RIGHT, FULL)
    pub join_type: JoinType,
    /// Table to join
    pub table: String,
    /// Optional alias for the joined table
    pub alias: Option<String>,
    /// ON condition for the join
    pub on: Predicate,
}

impl JoinClause {
    pub fn new(join_type: JoinType, table: &str, alias: Option<&str>, on: impl Into<Predicate>) -> Result<Self> {
        validate_identifier(table)?;
        if let Some(alias) = alias {
            validate_identifier(alias)?;
        }
        Ok(Self {
            join_type,
            table: table.to_string(),
            alias: alias.map(str::to_string),
            on: on.into(),
        })
    }

    pub(crate) fn render(&self, dialect: &Dialect, sink: &mut ParamSink) -> Result<String> {
        let mut sql = format!(
            " {} {}",
            self.join_type.to_sql(),
            dialect.table_reference(&self.table, self.alias.as_deref())
        );
        sql.push_str(" ON ");
        sql.push_str(&self.on.render(dialect, sink)?);
        Ok(sql)
    }
}
