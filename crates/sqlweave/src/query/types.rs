//! Query builder types and enums.

use super::builder::QueryBuilder;
use crate::expr::SetOperation;

/// Which soft-deleted rows a query sees.
///
/// Resolved only at render time, so the order of scope calls and `where`
/// calls never matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SoftDeleteScope {
    /// Exclude soft-deleted rows.
    #[default]
    Default,
    /// Include soft-deleted rows.
    WithTrashed,
    /// Only soft-deleted rows.
    OnlyTrashed,
}

/// Represents a Common Table Expression (CTE) for WITH clause
#[derive(Debug, Clone)]
pub struct CommonTableExpression {
    /// The name of the CTE (used to reference it in the main query)
    pub name: String,
    /// Optional column list, `name(a, b)`
    pub columns: Vec<String>,
    pub query: Box<QueryBuilder>,
    /// Makes the whole WITH clause `WITH RECURSIVE`
    pub recursive: bool,
}

/// A combined query with set operation
#[derive(Debug, Clone)]
pub struct SetQuery {
    /// The operation to perform
    pub operation: SetOperation,
    pub query: Box<QueryBuilder>,
}
