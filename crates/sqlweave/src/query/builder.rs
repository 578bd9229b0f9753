//! QueryBuilder struct and core implementation.

use std::sync::Arc;

use tracing::debug;

use super::helpers::{validate_identifier, validate_identifier_part};
use super::join::JoinClause;
use super::result::QueryResult;
use super::types::{CommonTableExpression, SetQuery, SoftDeleteScope};
use crate::dialect::{Dialect, Lock};
use crate::eager::EagerLoadSpec;
use crate::expr::{ColumnRef, OrderSpec, ParamSink, Predicate, SelectItem};
use crate::relation::Relation;
use crate::schema::TableRef;
use crate::Result;

/// Dialect-agnostic SELECT accumulator.
///
/// Clause methods consume and return the builder. Nothing is rendered
/// until [`build`](Self::build), which may be called any number of times
/// and with different dialects.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    pub(crate) table: TableRef,
    pub(crate) alias: Option<String>,
    /// Set on the nested builders handed to relation constraints
    pub(crate) relation: Option<Arc<Relation>>,
    /// SELECT list (empty means `*`)
    pub(crate) select_items: Vec<SelectItem>,
    pub(crate) distinct: bool,
    pub(crate) distinct_on: Vec<ColumnRef>,
    pub(crate) joins: Vec<JoinClause>,
    /// Implicit predicates (correlation, key batches, discriminators),
    /// rendered ahead of the caller's WHERE tree
    pub(crate) scope: Vec<Predicate>,
    pub(crate) where_predicate: Option<Predicate>,
    pub(crate) group_by: Vec<ColumnRef>,
    pub(crate) having: Option<Predicate>,
    pub(crate) set_operations: Vec<SetQuery>,
    pub(crate) order_by: Vec<OrderSpec>,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
    pub(crate) ctes: Vec<CommonTableExpression>,
    pub(crate) lock: Option<Lock>,
    pub(crate) soft_delete: SoftDeleteScope,
    pub(crate) eager: Vec<EagerLoadSpec>,
    /// Columns to return from write statements (RETURNING clause)
    pub(crate) returning: Vec<String>,
}

impl QueryBuilder {
    /// Creates a new query builder for a table.
    ///
    /// # Errors
    ///
    /// Returns error if the table name is not a valid identifier.
    pub fn new(table: &TableRef) -> Result<Self> {
        validate_identifier(table.name())?;
        Ok(Self {
            table: table.clone(),
            alias: None,
            relation: None,
            select_items: Vec::new(),
            distinct: false,
            distinct_on: Vec::new(),
            joins: Vec::new(),
            scope: Vec::new(),
            where_predicate: None,
            group_by: Vec::new(),
            having: None,
            set_operations: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            ctes: Vec::new(),
            lock: None,
            soft_delete: SoftDeleteScope::Default,
            eager: Vec::new(),
            returning: Vec::new(),
        })
    }

    /// Aliases the FROM table (`FROM "users" AS "u"`).
    pub fn alias(mut self, alias: &str) -> Result<Self> {
        validate_identifier_part(alias)?;
        self.alias = Some(alias.to_string());
        Ok(self)
    }

    pub fn table(&self) -> &TableRef {
        &self.table
    }

    /// Name other clauses use to refer to the FROM table: its alias, or
    /// the table name.
    pub fn reference_name(&self) -> &str {
        self.alias.as_deref().unwrap_or_else(|| self.table.name())
    }

    /// Relation this builder is scoped to, for builders handed to constraints.
    pub fn relation(&self) -> Option<&Arc<Relation>> {
        self.relation.as_ref()
    }

    pub fn soft_delete_scope(&self) -> SoftDeleteScope {
        self.soft_delete
    }

    pub fn eager_loads(&self) -> &[EagerLoadSpec] {
        &self.eager
    }

    /// Renders the accumulated state for `dialect`.
    ///
    /// Parameter names restart at `p1` on every call.
    pub fn build(&self, dialect: &Dialect) -> Result<QueryResult> {
        let mut sink = ParamSink::new();
        let sql = self.render_into(dialect, &mut sink)?;
        Ok(self.finish(dialect, sql, sink))
    }

    pub(crate) fn finish(&self, dialect: &Dialect, sql: String, sink: ParamSink) -> QueryResult {
        let params = sink.into_params();
        debug!(
            dialect = dialect.name(),
            sql = %sql.chars().take(100).collect::<String>(),
            param_count = params.len(),
            "Rendered query"
        );
        QueryResult::new(
            sql,
            params,
            self.eager.clone(),
            self.soft_delete,
            self.table.clone(),
        )
    }

    /// The implicit soft-delete predicate for the current scope, if any.
    pub(crate) fn soft_delete_predicate(&self) -> Option<Predicate> {
        let column = self.table.soft_delete_column()?;
        let column = ColumnRef::qualified(self.reference_name(), column);
        match self.soft_delete {
            SoftDeleteScope::Default => Some(Predicate::is_null(column)),
            SoftDeleteScope::OnlyTrashed => Some(Predicate::is_not_null(column)),
            SoftDeleteScope::WithTrashed => None,
        }
    }

    /// Scope predicates, the caller's WHERE tree and the soft-delete
    /// predicate, AND-ed in that order.
    pub(crate) fn combined_where(&self) -> Option<Predicate> {
        Predicate::all(
            self.scope
                .iter()
                .cloned()
                .chain(self.where_predicate.clone())
                .chain(self.soft_delete_predicate()),
        )
    }
}
