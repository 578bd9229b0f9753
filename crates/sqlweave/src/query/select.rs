//! SELECT clause methods and rendering.

use serde_json::Value as JsonValue;

use super::builder::QueryBuilder;
use super::helpers::validate_identifier;
use super::join::JoinClause;
use super::types::{CommonTableExpression, SetQuery, SoftDeleteScope};
use crate::dialect::{Dialect, Lock, LockStrength, LockWait};
use crate::expr::{
    AggregateFunction, ColumnRef, JoinType, Operator, OrderDirection, OrderSpec, ParamSink,
    Predicate, SelectItem, SetOperation,
};
use crate::{Result, Value};

fn column(field: &str) -> Result<ColumnRef> {
    let column = ColumnRef::new(field);
    column.validate()?;
    Ok(column)
}

impl QueryBuilder {
    // ----- projection -----

    /// Replaces the SELECT list with plain columns.
    pub fn select(mut self, columns: &[&str]) -> Result<Self> {
        self.select_items = columns
            .iter()
            .map(|c| column(c).map(SelectItem::column))
            .collect::<Result<_>>()?;
        Ok(self)
    }

    /// Appends an item to the SELECT list.
    pub fn add_select(mut self, item: SelectItem) -> Self {
        self.select_items.push(item);
        self
    }

    pub fn select_raw(self, sql: &str) -> Self {
        self.add_select(SelectItem::raw(sql))
    }

    /// Adds `FUNC(column)` (or `FUNC(*)`) to the SELECT list.
    pub fn aggregate(self, function: AggregateFunction, field: Option<&str>, alias: Option<&str>) -> Result<Self> {
        let target = field.map(column).transpose()?;
        if let Some(alias) = alias {
            validate_identifier(alias)?;
        }
        Ok(self.add_select(SelectItem::aggregate(function, target, alias)))
    }

    /// Adds `COUNT(column) FILTER (WHERE filter)`; fails at render time on
    /// dialects without aggregate FILTER.
    pub fn count_filter(self, field: Option<&str>, filter: Option<Predicate>, alias: &str) -> Result<Self> {
        let target = field.map(column).transpose()?;
        validate_identifier(alias)?;
        Ok(self.add_select(SelectItem::count_filter(target, filter, alias)))
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// `DISTINCT ON (...)`; fails at render time on dialects without it.
    pub fn distinct_on(mut self, columns: &[&str]) -> Result<Self> {
        for c in columns {
            self.distinct_on.push(column(c)?);
        }
        Ok(self)
    }

    // ----- WHERE -----

    /// Replaces the WHERE tree.
    pub fn where_predicate(mut self, predicate: Predicate) -> Self {
        self.where_predicate = Some(predicate);
        self
    }

    /// ANDs `predicate` onto the WHERE tree (or sets it when empty).
    pub fn and_where(mut self, predicate: Predicate) -> Self {
        self.where_predicate = Some(match self.where_predicate.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    /// ORs `predicate` onto the WHERE tree (or sets it when empty).
    pub fn or_where(mut self, predicate: Predicate) -> Self {
        self.where_predicate = Some(match self.where_predicate.take() {
            Some(existing) => existing.or(predicate),
            None => predicate,
        });
        self
    }

    /// Adds `field <operator> value`, ANDed with existing conditions.
    pub fn where_clause(self, field: &str, operator: Operator, value: impl Into<Value>) -> Result<Self> {
        let predicate = Predicate::compare(column(field)?, operator, value);
        Ok(self.and_where(predicate))
    }

    /// Adds `field <operator> value`, ORed with existing conditions.
    pub fn or_where_clause(self, field: &str, operator: Operator, value: impl Into<Value>) -> Result<Self> {
        let predicate = Predicate::compare(column(field)?, operator, value);
        Ok(self.or_where(predicate))
    }

    pub fn where_null(self, field: &str) -> Result<Self> {
        Ok(self.and_where(Predicate::is_null(column(field)?)))
    }

    pub fn where_not_null(self, field: &str) -> Result<Self> {
        Ok(self.and_where(Predicate::is_not_null(column(field)?)))
    }

    pub fn where_in<V: Into<Value>>(self, field: &str, values: impl IntoIterator<Item = V>) -> Result<Self> {
        Ok(self.and_where(Predicate::in_list(column(field)?, values)))
    }

    pub fn where_not_in<V: Into<Value>>(self, field: &str, values: impl IntoIterator<Item = V>) -> Result<Self> {
        Ok(self.and_where(Predicate::not_in_list(column(field)?, values)))
    }

    pub fn where_between(self, field: &str, low: impl Into<Value>, high: impl Into<Value>) -> Result<Self> {
        Ok(self.and_where(Predicate::between(column(field)?, low, high)))
    }

    pub fn where_not_between(self, field: &str, low: impl Into<Value>, high: impl Into<Value>) -> Result<Self> {
        Ok(self.and_where(Predicate::not_between(column(field)?, low, high)))
    }

    pub fn where_like(self, field: &str, pattern: &str) -> Result<Self> {
        Ok(self.and_where(Predicate::like(column(field)?, pattern)))
    }

    /// Case-insensitive LIKE; lowercases both sides where ILIKE is missing.
    pub fn where_ilike(self, field: &str, pattern: &str) -> Result<Self> {
        Ok(self.and_where(Predicate::ilike(column(field)?, pattern)))
    }

    /// Compares two columns.
    pub fn where_column(self, left: &str, operator: Operator, right: &str) -> Result<Self> {
        Ok(self.and_where(Predicate::column_compare(column(left)?, operator, column(right)?)))
    }

    /// Unparameterized condition; never interpolate untrusted input.
    pub fn where_raw(self, sql: &str) -> Self {
        self.and_where(Predicate::raw(sql))
    }

    pub fn where_exists(self, subquery: QueryBuilder) -> Self {
        self.and_where(Predicate::exists(subquery))
    }

    pub fn where_not_exists(self, subquery: QueryBuilder) -> Self {
        self.and_where(Predicate::not_exists(subquery))
    }

    pub fn where_in_subquery(self, field: &str, subquery: QueryBuilder) -> Result<Self> {
        Ok(self.and_where(Predicate::in_subquery(column(field)?, subquery)))
    }

    pub fn where_not_in_subquery(self, field: &str, subquery: QueryBuilder) -> Result<Self> {
        Ok(self.and_where(Predicate::not_in_subquery(column(field)?, subquery)))
    }

    /// Compares the text at a dotted JSON path: `where_json_path("meta", "address.city", "Oslo")`.
    pub fn where_json_path(self, field: &str, path: &str, value: impl Into<Value>) -> Result<Self> {
        Ok(self.and_where(Predicate::eq(column(field)?.json(path), value)))
    }

    pub fn where_json_contains(self, field: &str, document: JsonValue) -> Result<Self> {
        Ok(self.and_where(Predicate::json_contains(column(field)?, document)))
    }

    /// Native array column contains every value.
    pub fn where_array_contains<V: Into<Value>>(self, field: &str, values: impl IntoIterator<Item = V>) -> Result<Self> {
        Ok(self.and_where(Predicate::array_contains(column(field)?, values)))
    }

    /// Value equals any element of a native array column.
    pub fn where_any(self, field: &str, value: impl Into<Value>) -> Result<Self> {
        Ok(self.and_where(Predicate::array_any(column(field)?, value)))
    }

    // ----- joins -----

    pub fn join(
        mut self,
        join_type: JoinType,
        table: &str,
        alias: Option<&str>,
        on: impl Into<Predicate>,
    ) -> Result<Self> {
        self.joins.push(JoinClause::new(join_type, table, alias, on)?);
        Ok(self)
    }

    pub fn inner_join(self, table: &str, alias: Option<&str>, on: impl Into<Predicate>) -> Result<Self> {
        self.join(JoinType::Inner, table, alias, on)
    }

    pub fn left_join(self, table: &str, alias: Option<&str>, on: impl Into<Predicate>) -> Result<Self> {
        self.join(JoinType::Left, table, alias, on)
    }

    pub fn right_join(self, table: &str, alias: Option<&str>, on: impl Into<Predicate>) -> Result<Self> {
        self.join(JoinType::Right, table, alias, on)
    }

    pub fn full_join(self, table: &str, alias: Option<&str>, on: impl Into<Predicate>) -> Result<Self> {
        self.join(JoinType::Full, table, alias, on)
    }

    // ----- grouping -----

    pub fn group_by(mut self, columns: &[&str]) -> Result<Self> {
        for c in columns {
            self.group_by.push(column(c)?);
        }
        Ok(self)
    }

    /// Replaces the HAVING tree.
    pub fn having(mut self, predicate: Predicate) -> Self {
        self.having = Some(predicate);
        self
    }

    pub fn and_having(mut self, predicate: Predicate) -> Self {
        self.having = Some(match self.having.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    pub fn or_having(mut self, predicate: Predicate) -> Self {
        self.having = Some(match self.having.take() {
            Some(existing) => existing.or(predicate),
            None => predicate,
        });
        self
    }

    // ----- ordering and paging -----

    pub fn order_by(self, field: &str, direction: OrderDirection) -> Result<Self> {
        Ok(self.order_by_spec(OrderSpec::new(column(field)?, direction)))
    }

    pub fn order_by_spec(mut self, spec: OrderSpec) -> Self {
        self.order_by.push(spec);
        self
    }

    pub fn order_by_raw(self, sql: &str) -> Self {
        self.order_by_spec(OrderSpec::raw(sql))
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets OFFSET; zero renders nothing.
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    // ----- CTEs and set operations -----

    pub fn with_cte(mut self, name: &str, query: QueryBuilder) -> Result<Self> {
        validate_identifier(name)?;
        self.ctes.push(CommonTableExpression {
            name: name.to_string(),
            columns: Vec::new(),
            query: Box::new(query),
            recursive: false,
        });
        Ok(self)
    }

    /// `WITH RECURSIVE name(columns) AS (query)`; `query` is usually an
    /// anchor combined with a recursive step through `union_all`.
    pub fn with_recursive_cte(mut self, name: &str, columns: &[&str], query: QueryBuilder) -> Result<Self> {
        validate_identifier(name)?;
        for c in columns {
            validate_identifier(c)?;
        }
        self.ctes.push(CommonTableExpression {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            query: Box::new(query),
            recursive: true,
        });
        Ok(self)
    }

    fn set_operation(mut self, operation: SetOperation, other: QueryBuilder) -> Self {
        self.set_operations.push(SetQuery {
            operation,
            query: Box::new(other),
        });
        self
    }

    pub fn union(self, other: QueryBuilder) -> Self {
        self.set_operation(SetOperation::Union, other)
    }

    pub fn union_all(self, other: QueryBuilder) -> Self {
        self.set_operation(SetOperation::UnionAll, other)
    }

    pub fn intersect(self, other: QueryBuilder) -> Self {
        self.set_operation(SetOperation::Intersect, other)
    }

    pub fn except(self, other: QueryBuilder) -> Self {
        self.set_operation(SetOperation::Except, other)
    }

    // ----- locking -----

    pub fn lock_for_update(mut self) -> Self {
        self.lock = Some(Lock {
            strength: LockStrength::Update,
            wait: self.lock.map(|l| l.wait).unwrap_or_default(),
        });
        self
    }

    pub fn lock_for_share(mut self) -> Self {
        self.lock = Some(Lock {
            strength: LockStrength::Share,
            wait: self.lock.map(|l| l.wait).unwrap_or_default(),
        });
        self
    }

    /// Fail instead of waiting on locked rows. Implies FOR UPDATE when no
    /// lock was requested.
    pub fn nowait(self) -> Self {
        self.lock_wait(LockWait::NoWait)
    }

    /// Skip locked rows. Implies FOR UPDATE when no lock was requested.
    pub fn skip_locked(self) -> Self {
        self.lock_wait(LockWait::SkipLocked)
    }

    fn lock_wait(mut self, wait: LockWait) -> Self {
        let strength = self.lock.map(|l| l.strength).unwrap_or(LockStrength::Update);
        self.lock = Some(Lock { strength, wait });
        self
    }

    // ----- soft deletes -----

    pub fn with_trashed(mut self) -> Self {
        self.soft_delete = SoftDeleteScope::WithTrashed;
        self
    }

    pub fn only_trashed(mut self) -> Self {
        self.soft_delete = SoftDeleteScope::OnlyTrashed;
        self
    }

    pub fn without_trashed(mut self) -> Self {
        self.soft_delete = SoftDeleteScope::Default;
        self
    }

    // ----- rendering -----

    fn render_projection(&self, dialect: &Dialect, sink: &mut ParamSink) -> Result<String> {
        if self.select_items.is_empty() {
            return Ok(if self.joins.is_empty() {
                "*".to_string()
            } else {
                format!("{}.*", dialect.quote_identifier(self.reference_name()))
            });
        }
        let mut items = Vec::with_capacity(self.select_items.len() + 1);
        // relation aggregates alone keep the full row, as with_count callers expect
        if self
            .select_items
            .iter()
            .all(|item| matches!(item, SelectItem::Subquery { .. }))
        {
            items.push(format!("{}.*", dialect.quote_identifier(self.reference_name())));
        }
        for item in &self.select_items {
            items.push(item.render(dialect, sink)?);
        }
        Ok(items.join(", "))
    }

    fn render_ctes(&self, dialect: &Dialect, sink: &mut ParamSink) -> Result<String> {
        if self.ctes.is_empty() {
            return Ok(String::new());
        }
        let recursive = self.ctes.iter().any(|cte| cte.recursive);
        let mut parts = Vec::with_capacity(self.ctes.len());
        for cte in &self.ctes {
            let mut name = dialect.quote_identifier(&cte.name);
            if !cte.columns.is_empty() {
                let columns: Vec<String> =
                    cte.columns.iter().map(|c| dialect.quote_identifier(c)).collect();
                name = format!("{}({})", name, columns.join(", "));
            }
            parts.push(format!("{} AS ({})", name, cte.query.render_into(dialect, sink)?));
        }
        Ok(format!(
            "WITH {}{} ",
            if recursive { "RECURSIVE " } else { "" },
            parts.join(", ")
        ))
    }

    /// Renders into a shared sink, so nested queries continue the
    /// enclosing statement's parameter numbering.
    pub(crate) fn render_into(&self, dialect: &Dialect, sink: &mut ParamSink) -> Result<String> {
        let mut sql = self.render_ctes(dialect, sink)?;

        sql.push_str("SELECT ");
        if !self.distinct_on.is_empty() {
            let columns = self
                .distinct_on
                .iter()
                .map(|c| c.render(dialect, sink))
                .collect::<Result<Vec<_>>>()?;
            sql.push_str(&dialect.distinct_on(&columns)?);
        } else if self.distinct {
            sql.push_str("DISTINCT ");
        }
        sql.push_str(&self.render_projection(dialect, sink)?);

        sql.push_str(" FROM ");
        sql.push_str(&dialect.table_reference(self.table.name(), self.alias.as_deref()));

        for join in &self.joins {
            sql.push_str(&join.render(dialect, sink)?);
        }

        if let Some(predicate) = self.combined_where() {
            sql.push_str(" WHERE ");
            sql.push_str(&predicate.render(dialect, sink)?);
        }

        if !self.group_by.is_empty() {
            let columns = self
                .group_by
                .iter()
                .map(|c| c.render(dialect, sink))
                .collect::<Result<Vec<_>>>()?;
            sql.push_str(" GROUP BY ");
            sql.push_str(&columns.join(", "));
        }

        if let Some(having) = &self.having {
            sql.push_str(" HAVING ");
            sql.push_str(&having.render(dialect, sink)?);
        }

        for set in &self.set_operations {
            sql.push_str(set.operation.to_sql());
            sql.push_str(&set.query.render_into(dialect, sink)?);
        }

        if !self.order_by.is_empty() {
            let specs = self
                .order_by
                .iter()
                .map(|spec| spec.render(dialect, sink))
                .collect::<Result<Vec<_>>>()?;
            sql.push_str(" ORDER BY ");
            sql.push_str(&specs.join(", "));
        }

        sql.push_str(&dialect.limit_offset(self.limit, self.offset));

        if let Some(lock) = &self.lock {
            sql.push_str(&dialect.lock_clause(lock)?);
        }

        Ok(sql)
    }
}
