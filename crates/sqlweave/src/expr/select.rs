//! Projection items.

use std::sync::Arc;

use crate::dialect::Dialect;
use crate::generator;
use crate::relation::Relation;
use crate::Result;

use super::{AggregateFunction, ColumnRef, Constraint, ParamSink, Predicate};

/// What a relation subquery in the projection computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubqueryKind {
    Count,
    Sum,
    Avg,
    Min,
    Max,
    Exists,
}

impl SubqueryKind {
    /// Aggregate applied inside the subquery, `None` for EXISTS.
    pub fn aggregate(&self) -> Option<AggregateFunction> {
        match self {
            SubqueryKind::Count => Some(AggregateFunction::Count),
            SubqueryKind::Sum => Some(AggregateFunction::Sum),
            SubqueryKind::Avg => Some(AggregateFunction::Avg),
            SubqueryKind::Min => Some(AggregateFunction::Min),
            SubqueryKind::Max => Some(AggregateFunction::Max),
            SubqueryKind::Exists => None,
        }
    }

    /// `{attribute}_count`, `{attribute}_exists`, `{attribute}_sum_{column}`, ...
    pub fn default_alias(&self, attribute: &str, column: Option<&str>) -> String {
        match (self.aggregate(), column) {
            (None, _) => format!("{}_exists", attribute),
            (Some(AggregateFunction::Count), _) | (Some(_), None) => {
                format!("{}_{}", attribute, self.word())
            }
            (Some(_), Some(column)) => format!("{}_{}_{}", attribute, self.word(), column),
        }
    }

    fn word(&self) -> &'static str {
        match self.aggregate() {
            Some(function) => function.alias_word(),
            None => "exists",
        }
    }
}

/// One entry of the SELECT list.
#[derive(Debug, Clone)]
pub enum SelectItem {
    Column {
        column: ColumnRef,
        alias: Option<String>,
    },
    /// Unparameterized SQL; the caller vouches for its safety.
    Raw(String),
    Aggregate {
        function: AggregateFunction,
        column: Option<ColumnRef>,
        distinct: bool,
        alias: Option<String>,
    },
    /// Correlated aggregate or EXISTS over a relation (`withCount` and friends).
    Subquery {
        kind: SubqueryKind,
        relation: Arc<Relation>,
        column: Option<String>,
        constraint: Option<Constraint>,
        alias: String,
        owner_alias: String,
    },
    /// `COUNT(col) FILTER (WHERE ...)`
    CountFilter {
        column: Option<ColumnRef>,
        filter: Option<Predicate>,
        alias: String,
    },
}

impl SelectItem {
    pub fn column(column: impl Into<ColumnRef>) -> Self {
        SelectItem::Column {
            column: column.into(),
            alias: None,
        }
    }

    pub fn column_as(column: impl Into<ColumnRef>, alias: &str) -> Self {
        SelectItem::Column {
            column: column.into(),
            alias: Some(alias.to_string()),
        }
    }

    pub fn raw(sql: impl Into<String>) -> Self {
        SelectItem::Raw(sql.into())
    }

    /// Aggregate over a column, or over `*` when `column` is `None`.
    pub fn aggregate(function: AggregateFunction, column: Option<ColumnRef>, alias: Option<&str>) -> Self {
        SelectItem::Aggregate {
            function,
            column,
            distinct: false,
            alias: alias.map(str::to_string),
        }
    }

    pub fn count_distinct(column: impl Into<ColumnRef>, alias: Option<&str>) -> Self {
        SelectItem::Aggregate {
            function: AggregateFunction::Count,
            column: Some(column.into()),
            distinct: true,
            alias: alias.map(str::to_string),
        }
    }

    pub fn count_filter(column: Option<ColumnRef>, filter: Option<Predicate>, alias: &str) -> Self {
        SelectItem::CountFilter {
            column,
            filter,
            alias: alias.to_string(),
        }
    }

    /// Output column name, when the item has one.
    pub fn alias(&self) -> Option<&str> {
        match self {
            SelectItem::Column { alias, .. } | SelectItem::Aggregate { alias, .. } => alias.as_deref(),
            SelectItem::Subquery { alias, .. } | SelectItem::CountFilter { alias, .. } => Some(alias),
            SelectItem::Raw(_) => None,
        }
    }

    pub fn render(&self, dialect: &Dialect, sink: &mut ParamSink) -> Result<String> {
        let (sql, alias) = match self {
            SelectItem::Column { column, alias } => (column.render(dialect, sink)?, alias.as_deref()),
            SelectItem::Raw(sql) => (sql.clone(), None),
            SelectItem::Aggregate {
                function,
                column,
                distinct,
                alias,
            } => {
                let argument = match column {
                    Some(column) => column.render(dialect, sink)?,
                    None => "*".to_string(),
                };
                let distinct = if *distinct { "DISTINCT " } else { "" };
                (
                    format!("{}({}{})", function.to_sql(), distinct, argument),
                    alias.as_deref(),
                )
            }
            SelectItem::Subquery {
                kind,
                relation,
                column,
                constraint,
                alias,
                owner_alias,
            } => (
                generator::render_aggregate(
                    *kind,
                    relation,
                    column.as_deref(),
                    constraint.as_ref(),
                    owner_alias,
                    dialect,
                    sink,
                )?,
                Some(alias.as_str()),
            ),
            SelectItem::CountFilter {
                column,
                filter,
                alias,
            } => {
                let argument = match column {
                    Some(column) => column.render(dialect, sink)?,
                    None => "*".to_string(),
                };
                let aggregate = format!("COUNT({})", argument);
                let sql = match filter {
                    Some(filter) => {
                        dialect.require(crate::dialect::Feature::AggregateFilter)?;
                        let predicate = filter.render(dialect, sink)?;
                        dialect.aggregate_filter(&aggregate, &predicate)?
                    }
                    None => aggregate,
                };
                (sql, Some(alias.as_str()))
            }
        };

        Ok(match alias {
            Some(alias) => format!("{} AS {}", sql, dialect.quote_identifier(alias)),
            None => sql,
        })
    }
}
