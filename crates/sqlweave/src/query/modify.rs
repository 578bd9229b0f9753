//! INSERT, UPDATE, DELETE query building methods for QueryBuilder.
//!
//! Write statements share the builder's WHERE tree and soft-delete scope,
//! so `update` and `delete` never touch rows the equivalent SELECT would
//! not see.

use super::builder::QueryBuilder;
use super::helpers::validate_identifier_part;
use super::result::QueryResult;
use super::types::SoftDeleteScope;
use crate::dialect::Dialect;
use crate::expr::ParamSink;
use crate::{Result, SqlWeaveError, Value};

impl QueryBuilder {
    /// Add columns to the RETURNING clause of write statements.
    pub fn returning(mut self, columns: &[&str]) -> Result<Self> {
        for col in columns {
            if *col != "*" {
                validate_identifier_part(col)?;
            }
            self.returning.push(col.to_string());
        }
        Ok(self)
    }

    /// Return all columns from write statements.
    pub fn returning_all(mut self) -> Self {
        self.returning.push("*".to_string());
        self
    }

    pub fn clear_returning(mut self) -> Self {
        self.returning.clear();
        self
    }

    fn render_target(&self, dialect: &Dialect) -> String {
        dialect.table_reference(self.table.name(), self.alias.as_deref())
    }

    fn render_where(&self, dialect: &Dialect, sink: &mut ParamSink) -> Result<String> {
        match self.combined_where() {
            Some(predicate) => Ok(format!(" WHERE {}", predicate.render(dialect, sink)?)),
            None => Ok(String::new()),
        }
    }

    fn render_returning(&self, dialect: &Dialect) -> Result<String> {
        if self.returning.is_empty() {
            return Ok(String::new());
        }
        let columns: Vec<String> = if self.returning.iter().any(|c| c == "*") {
            vec!["*".to_string()]
        } else {
            self.returning.iter().map(|c| dialect.quote_identifier(c)).collect()
        };
        dialect.returning(&columns)
    }

    fn render_assignments(
        &self,
        values: &[(String, Value)],
        dialect: &Dialect,
        sink: &mut ParamSink,
    ) -> Result<String> {
        let mut parts = Vec::with_capacity(values.len());
        for (col, val) in values {
            validate_identifier_part(col)?;
            let placeholder = sink.bind(dialect, val.clone());
            parts.push(format!("{} = {}", dialect.quote_identifier(col), placeholder));
        }
        Ok(parts.join(", "))
    }

    /// Builds an INSERT for one row.
    pub fn build_insert(&self, dialect: &Dialect, values: &[(String, Value)]) -> Result<QueryResult> {
        if values.is_empty() {
            return Err(SqlWeaveError::InvalidArgument("Cannot insert with no values".to_string()));
        }

        let mut sink = ParamSink::new();
        let mut columns = Vec::with_capacity(values.len());
        let mut placeholders = Vec::with_capacity(values.len());
        for (col, val) in values {
            validate_identifier_part(col)?;
            columns.push(dialect.quote_identifier(col));
            placeholders.push(sink.bind(dialect, val.clone()));
        }

        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            dialect.quote_identifier(self.table.name()),
            columns.join(", "),
            placeholders.join(", ")
        );
        sql.push_str(&self.render_returning(dialect)?);

        Ok(self.finish(dialect, sql, sink))
    }

    /// Builds an UPDATE limited by the WHERE tree and soft-delete scope.
    pub fn build_update(&self, dialect: &Dialect, values: &[(String, Value)]) -> Result<QueryResult> {
        if values.is_empty() {
            return Err(SqlWeaveError::InvalidArgument("Cannot update with no values".to_string()));
        }

        let mut sink = ParamSink::new();
        let mut sql = format!("UPDATE {} SET ", self.render_target(dialect));
        sql.push_str(&self.render_assignments(values, dialect, &mut sink)?);
        sql.push_str(&self.render_where(dialect, &mut sink)?);
        sql.push_str(&self.render_returning(dialect)?);

        Ok(self.finish(dialect, sql, sink))
    }

    /// Builds a DELETE limited by the WHERE tree and soft-delete scope.
    pub fn build_delete(&self, dialect: &Dialect) -> Result<QueryResult> {
        let mut sink = ParamSink::new();
        let mut sql = format!("DELETE FROM {}", self.render_target(dialect));
        sql.push_str(&self.render_where(dialect, &mut sink)?);
        sql.push_str(&self.render_returning(dialect)?);

        Ok(self.finish(dialect, sql, sink))
    }

    fn require_soft_delete_column(&self) -> Result<String> {
        self.table
            .soft_delete_column()
            .map(str::to_string)
            .ok_or_else(|| {
                SqlWeaveError::InvalidArgument(format!(
                    "Table '{}' has no soft-delete column",
                    self.table.name()
                ))
            })
    }

    /// Marks matching rows deleted by setting the soft-delete column to `at`.
    pub fn build_soft_delete(&self, dialect: &Dialect, at: impl Into<Value>) -> Result<QueryResult> {
        let column = self.require_soft_delete_column()?;
        self.build_update(dialect, &[(column, at.into())])
    }

    /// Clears the soft-delete column of matching trashed rows.
    pub fn build_restore(&self, dialect: &Dialect) -> Result<QueryResult> {
        let column = self.require_soft_delete_column()?;
        let mut scoped = self.clone();
        scoped.soft_delete = SoftDeleteScope::OnlyTrashed;
        scoped.build_update(dialect, &[(column, Value::Null)])
    }
}
