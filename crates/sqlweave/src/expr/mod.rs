//! Expression algebra: predicates, projection items and order specs.
//!
//! Nodes are plain values. Nothing is rendered until a dialect is supplied,
//! and every literal goes through a [`ParamSink`] instead of the SQL text.

mod column_ref;
mod operator;
mod order;
mod params;
mod predicate;
mod select;

pub use column_ref::ColumnRef;
pub use operator::{AggregateFunction, JoinType, Operator, OrderDirection, SetOperation};
pub use order::{NullsOrder, OrderSpec, OrderTarget};
pub use params::ParamSink;
pub use predicate::{Constraint, Operand, Predicate};
pub use select::{SelectItem, SubqueryKind};
