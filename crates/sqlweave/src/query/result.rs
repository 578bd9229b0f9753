//! Rendered statements.

use super::types::SoftDeleteScope;
use crate::eager::EagerLoadSpec;
use crate::schema::TableRef;
use crate::{Result, SqlWeaveError, Value};

/// Placeholder syntax expected by an execution driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `:p1` (as rendered)
    Named,
    /// `$1` (PostgreSQL drivers)
    Dollar,
    /// `?` (MySQL/SQLite drivers)
    Question,
}

/// Immutable output of [`QueryBuilder::build`](super::QueryBuilder::build).
#[derive(Debug, Clone)]
pub struct QueryResult {
    sql: String,
    params: Vec<(String, Value)>,
    eager: Vec<EagerLoadSpec>,
    soft_delete: SoftDeleteScope,
    table: TableRef,
}

impl QueryResult {
    pub(crate) fn new(
        sql: String,
        params: Vec<(String, Value)>,
        eager: Vec<EagerLoadSpec>,
        soft_delete: SoftDeleteScope,
        table: TableRef,
    ) -> Self {
        Self {
            sql,
            params,
            eager,
            soft_delete,
            table,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Named parameters in first-use order.
    pub fn parameters(&self) -> &[(String, Value)] {
        &self.params
    }

    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.params
            .iter()
            .find(|(param, _)| param == name)
            .map(|(_, value)| value)
    }

    /// Parameter values in bind order.
    pub fn parameter_values(&self) -> Vec<Value> {
        self.params.iter().map(|(_, value)| value.clone()).collect()
    }

    pub fn eager_loads(&self) -> &[EagerLoadSpec] {
        &self.eager
    }

    pub fn soft_delete_scope(&self) -> SoftDeleteScope {
        self.soft_delete
    }

    /// Table the root query selects from.
    pub fn table(&self) -> &TableRef {
        &self.table
    }

    /// Rewrites named placeholders for drivers that bind positionally.
    ///
    /// Quoted literals and identifiers are copied untouched, as are
    /// PostgreSQL `::type` casts.
    pub fn to_positional(&self, style: PlaceholderStyle) -> Result<(String, Vec<Value>)> {
        if style == PlaceholderStyle::Named {
            return Ok((self.sql.clone(), self.parameter_values()));
        }

        let mut sql = String::with_capacity(self.sql.len());
        let mut values = Vec::with_capacity(self.params.len());
        let mut chars = self.sql.chars().peekable();
        let mut quote: Option<char> = None;

        while let Some(ch) = chars.next() {
            if let Some(open) = quote {
                sql.push(ch);
                if ch == open {
                    quote = None;
                }
                continue;
            }
            match ch {
                '\'' | '"' | '`' => {
                    quote = Some(ch);
                    sql.push(ch);
                }
                ':' if chars.peek() == Some(&':') => {
                    sql.push_str("::");
                    chars.next();
                }
                ':' if chars.peek().is_some_and(|c| c.is_ascii_alphabetic() || *c == '_') => {
                    let mut name = String::new();
                    while let Some(&next) = chars.peek() {
                        if next.is_ascii_alphanumeric() || next == '_' {
                            name.push(next);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    let value = self.parameter(&name).ok_or_else(|| {
                        SqlWeaveError::Internal(format!("Placeholder :{} has no bound value", name))
                    })?;
                    values.push(value.clone());
                    match style {
                        PlaceholderStyle::Dollar => {
                            sql.push('$');
                            sql.push_str(&values.len().to_string());
                        }
                        PlaceholderStyle::Question | PlaceholderStyle::Named => sql.push('?'),
                    }
                }
                _ => sql.push(ch),
            }
        }

        Ok((sql, values))
    }
}
