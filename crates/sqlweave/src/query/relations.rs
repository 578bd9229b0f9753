//! Relation-aware builder methods: `where_has` and friends, relation
//! aggregates in the projection, eager-load specs, pivot helpers.

use std::sync::Arc;

use super::builder::QueryBuilder;
use crate::eager::EagerLoadSpec;
use crate::expr::{
    ColumnRef, Constraint, Operator, OrderDirection, OrderSpec, Predicate, SelectItem, SubqueryKind,
};
use crate::relation::{PivotKeys, Relation};
use crate::schema::{naming, Schema, TableRef};
use crate::{Result, SqlWeaveError, Value};

impl QueryBuilder {
    /// The relation must hang off this builder's table and have a static
    /// related table.
    fn check_relation(&self, relation: &Relation, operation: &str) -> Result<()> {
        if relation.owner().name() != self.table.name() {
            return Err(SqlWeaveError::InvalidArgument(format!(
                "Relation '{}' belongs to '{}', not '{}'",
                relation.attribute(),
                relation.owner().name(),
                self.table.name()
            )));
        }
        relation.related_table(operation)?;
        Ok(())
    }

    fn exists_predicate(
        &self,
        relation: &Arc<Relation>,
        constraint: Option<Constraint>,
        negate: bool,
        operation: &str,
    ) -> Result<Predicate> {
        self.check_relation(relation, operation)?;
        Ok(Predicate::relation_exists(
            relation.clone(),
            constraint,
            negate,
            self.reference_name(),
        ))
    }

    /// Keeps rows with at least one related row matching `constraint`.
    pub fn where_has(self, relation: &Arc<Relation>, constraint: Option<Constraint>) -> Result<Self> {
        let predicate = self.exists_predicate(relation, constraint, false, "whereHas")?;
        Ok(self.and_where(predicate))
    }

    pub fn or_where_has(self, relation: &Arc<Relation>, constraint: Option<Constraint>) -> Result<Self> {
        let predicate = self.exists_predicate(relation, constraint, false, "orWhereHas")?;
        Ok(self.or_where(predicate))
    }

    /// Keeps rows with no related row matching `constraint`.
    pub fn where_doesnt_have(self, relation: &Arc<Relation>, constraint: Option<Constraint>) -> Result<Self> {
        let predicate = self.exists_predicate(relation, constraint, true, "whereDoesntHave")?;
        Ok(self.and_where(predicate))
    }

    pub fn or_where_doesnt_have(
        self,
        relation: &Arc<Relation>,
        constraint: Option<Constraint>,
    ) -> Result<Self> {
        let predicate = self.exists_predicate(relation, constraint, true, "orWhereDoesntHave")?;
        Ok(self.or_where(predicate))
    }

    /// Compares the number of related rows: `has(&posts, Operator::Gte, 3, None)`.
    ///
    /// `>= 1` is rendered as EXISTS.
    pub fn has(
        self,
        relation: &Arc<Relation>,
        operator: Operator,
        count: i64,
        constraint: Option<Constraint>,
    ) -> Result<Self> {
        if !operator.is_comparison() {
            return Err(SqlWeaveError::InvalidArgument(format!(
                "has() needs a comparison operator, got {}",
                operator
            )));
        }
        if operator == Operator::Gte && count == 1 {
            return self.where_has(relation, constraint);
        }
        self.check_relation(relation, "has")?;
        let predicate = Predicate::relation_count(
            relation.clone(),
            operator,
            count,
            constraint,
            self.reference_name(),
        );
        Ok(self.and_where(predicate))
    }

    fn morph_predicate(
        &self,
        relation: &Arc<Relation>,
        types: &[TableRef],
        constraint: Option<Constraint>,
        negate: bool,
    ) -> Result<Predicate> {
        if relation.morph_to_keys().is_none() {
            return Err(SqlWeaveError::UnsupportedRelation {
                kind: relation.relation_type().name().to_string(),
                operation: "whereHasMorph".to_string(),
            });
        }
        if relation.owner().name() != self.table.name() {
            return Err(SqlWeaveError::InvalidArgument(format!(
                "Relation '{}' belongs to '{}', not '{}'",
                relation.attribute(),
                relation.owner().name(),
                self.table.name()
            )));
        }
        if types.is_empty() {
            return Err(SqlWeaveError::InvalidArgument(
                "whereHasMorph needs at least one candidate type".to_string(),
            ));
        }
        Ok(Predicate::MorphExists {
            relation: relation.clone(),
            types: types.to_vec(),
            constraint,
            negate,
            owner_alias: self.reference_name().to_string(),
        })
    }

    /// Existence across the candidate target tables of a `MorphTo` relation.
    pub fn where_has_morph(
        self,
        relation: &Arc<Relation>,
        types: &[TableRef],
        constraint: Option<Constraint>,
    ) -> Result<Self> {
        let predicate = self.morph_predicate(relation, types, constraint, false)?;
        Ok(self.and_where(predicate))
    }

    pub fn where_doesnt_have_morph(
        self,
        relation: &Arc<Relation>,
        types: &[TableRef],
        constraint: Option<Constraint>,
    ) -> Result<Self> {
        let predicate = self.morph_predicate(relation, types, constraint, true)?;
        Ok(self.and_where(predicate))
    }

    // ----- relation aggregates -----

    fn with_relation_subquery(
        self,
        kind: SubqueryKind,
        relation: &Arc<Relation>,
        column: Option<&str>,
        alias: Option<&str>,
        constraint: Option<Constraint>,
    ) -> Result<Self> {
        self.check_relation(relation, "withAggregate")?;
        if let Some(column) = column {
            ColumnRef::new(column).validate()?;
        } else if !matches!(kind, SubqueryKind::Count | SubqueryKind::Exists) {
            return Err(SqlWeaveError::InvalidArgument(format!(
                "{:?} relation aggregate needs a column",
                kind
            )));
        }
        let alias = match alias {
            Some(alias) => {
                super::helpers::validate_identifier_part(alias)?;
                alias.to_string()
            }
            None => kind.default_alias(relation.attribute(), column),
        };
        let owner_alias = self.reference_name().to_string();
        Ok(self.add_select(SelectItem::Subquery {
            kind,
            relation: relation.clone(),
            column: column.map(str::to_string),
            constraint,
            alias,
            owner_alias,
        }))
    }

    /// Adds `(SELECT COUNT(*) ...) AS "{attribute}_count"`.
    pub fn with_count(
        self,
        relation: &Arc<Relation>,
        alias: Option<&str>,
        constraint: Option<Constraint>,
    ) -> Result<Self> {
        self.with_relation_subquery(SubqueryKind::Count, relation, None, alias, constraint)
    }

    /// Adds `(SELECT SUM(col) ...) AS "{attribute}_sum_{col}"`.
    pub fn with_sum(
        self,
        relation: &Arc<Relation>,
        column: &str,
        alias: Option<&str>,
        constraint: Option<Constraint>,
    ) -> Result<Self> {
        self.with_relation_subquery(SubqueryKind::Sum, relation, Some(column), alias, constraint)
    }

    pub fn with_avg(
        self,
        relation: &Arc<Relation>,
        column: &str,
        alias: Option<&str>,
        constraint: Option<Constraint>,
    ) -> Result<Self> {
        self.with_relation_subquery(SubqueryKind::Avg, relation, Some(column), alias, constraint)
    }

    pub fn with_min(
        self,
        relation: &Arc<Relation>,
        column: &str,
        alias: Option<&str>,
        constraint: Option<Constraint>,
    ) -> Result<Self> {
        self.with_relation_subquery(SubqueryKind::Min, relation, Some(column), alias, constraint)
    }

    pub fn with_max(
        self,
        relation: &Arc<Relation>,
        column: &str,
        alias: Option<&str>,
        constraint: Option<Constraint>,
    ) -> Result<Self> {
        self.with_relation_subquery(SubqueryKind::Max, relation, Some(column), alias, constraint)
    }

    /// Adds `EXISTS (...) AS "{attribute}_exists"`.
    pub fn with_exists(
        self,
        relation: &Arc<Relation>,
        alias: Option<&str>,
        constraint: Option<Constraint>,
    ) -> Result<Self> {
        self.with_relation_subquery(SubqueryKind::Exists, relation, None, alias, constraint)
    }

    // ----- eager loading -----

    /// Requests eager loading; specs for the same attribute are merged.
    pub fn with(mut self, spec: EagerLoadSpec) -> Self {
        match self
            .eager
            .iter_mut()
            .find(|existing| existing.attribute() == spec.attribute())
        {
            Some(existing) => existing.merge(spec),
            None => self.eager.push(spec),
        }
        self
    }

    /// Requests eager loading of a dotted relation path, e.g. `"posts.comments"`.
    pub fn with_path(self, schema: &Schema, path: &str) -> Result<Self> {
        let spec = EagerLoadSpec::parse(schema, self.table.name(), path)?;
        Ok(self.with(spec))
    }

    // ----- pivot helpers -----

    fn pivot_keys(&self, operation: &str) -> Result<PivotKeys> {
        self.relation
            .as_ref()
            .and_then(|relation| relation.pivot())
            .cloned()
            .ok_or_else(|| {
                SqlWeaveError::InvalidArgument(format!(
                    "{} is only available on pivot (many-to-many) relation queries",
                    operation
                ))
            })
    }

    fn pivot_column(&self, column: &str, operation: &str) -> Result<ColumnRef> {
        let pivot = self.pivot_keys(operation)?;
        let column = ColumnRef::qualified(&pivot.table, column);
        column.validate()?;
        Ok(column)
    }

    /// Filters on a pivot table column.
    pub fn where_pivot(self, column: &str, operator: Operator, value: impl Into<Value>) -> Result<Self> {
        let column = self.pivot_column(column, "wherePivot")?;
        Ok(self.and_where(Predicate::compare(column, operator, value)))
    }

    pub fn where_pivot_in<V: Into<Value>>(
        self,
        column: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Result<Self> {
        let column = self.pivot_column(column, "wherePivotIn")?;
        Ok(self.and_where(Predicate::in_list(column, values)))
    }

    pub fn where_pivot_null(self, column: &str) -> Result<Self> {
        let column = self.pivot_column(column, "wherePivotNull")?;
        Ok(self.and_where(Predicate::is_null(column)))
    }

    pub fn where_pivot_not_null(self, column: &str) -> Result<Self> {
        let column = self.pivot_column(column, "wherePivotNotNull")?;
        Ok(self.and_where(Predicate::is_not_null(column)))
    }

    pub fn where_pivot_between(
        self,
        column: &str,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Result<Self> {
        let column = self.pivot_column(column, "wherePivotBetween")?;
        Ok(self.and_where(Predicate::between(column, low, high)))
    }

    pub fn order_by_pivot(self, column: &str, direction: OrderDirection) -> Result<Self> {
        let column = self.pivot_column(column, "orderByPivot")?;
        Ok(self.order_by_spec(OrderSpec::new(column, direction)))
    }

    /// Selects pivot columns aliased `pivot_{column}`.
    pub fn select_pivot(mut self, columns: &[&str]) -> Result<Self> {
        for column in columns {
            let reference = self.pivot_column(column, "selectPivot")?;
            let alias = naming::pivot_alias(column);
            if !self.select_items.iter().any(|item| item.alias() == Some(alias.as_str())) {
                self.select_items.push(SelectItem::column_as(reference, &alias));
            }
        }
        Ok(self)
    }

    pub fn with_pivot(self, columns: &[&str]) -> Result<Self> {
        self.select_pivot(columns)
    }
}
