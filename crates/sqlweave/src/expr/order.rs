use crate::dialect::Dialect;
use crate::Result;

use super::{ColumnRef, OrderDirection, ParamSink};

/// Placement of NULLs in an ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullsOrder {
    First,
    Last,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderTarget {
    Column(ColumnRef),
    /// Unparameterized SQL; the caller vouches for its safety.
    Raw(String),
}

/// One ORDER BY entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSpec {
    pub target: OrderTarget,
    pub direction: OrderDirection,
    pub nulls: Option<NullsOrder>,
}

impl OrderSpec {
    pub fn new(column: impl Into<ColumnRef>, direction: OrderDirection) -> Self {
        Self {
            target: OrderTarget::Column(column.into()),
            direction,
            nulls: None,
        }
    }

    pub fn asc(column: impl Into<ColumnRef>) -> Self {
        Self::new(column, OrderDirection::Asc)
    }

    pub fn desc(column: impl Into<ColumnRef>) -> Self {
        Self::new(column, OrderDirection::Desc)
    }

    pub fn raw(sql: impl Into<String>) -> Self {
        Self {
            target: OrderTarget::Raw(sql.into()),
            direction: OrderDirection::Asc,
            nulls: None,
        }
    }

    pub fn nulls_first(mut self) -> Self {
        self.nulls = Some(NullsOrder::First);
        self
    }

    pub fn nulls_last(mut self) -> Self {
        self.nulls = Some(NullsOrder::Last);
        self
    }

    pub fn render(&self, dialect: &Dialect, sink: &mut ParamSink) -> Result<String> {
        let column = match &self.target {
            OrderTarget::Raw(sql) => return Ok(sql.clone()),
            OrderTarget::Column(column) => column.render(dialect, sink)?,
        };
        let ordered = format!("{} {}", column, self.direction.to_sql());

        let Some(nulls) = self.nulls else {
            return Ok(ordered);
        };
        let nulls_first = nulls == NullsOrder::First;
        match dialect.nulls_suffix(nulls_first) {
            Some(suffix) => Ok(format!("{}{}", ordered, suffix)),
            None => match dialect.nulls_sort_key(&column, nulls_first) {
                Some(key) => Ok(format!("{}, {}", key, ordered)),
                None => Ok(ordered),
            },
        }
    }
}
