//! Column descriptors and their predicate helpers.

use std::ops::Deref;

use serde_json::Value as JsonValue;

use crate::expr::{ColumnRef, OrderSpec, Predicate, SelectItem};
use crate::query::QueryBuilder;
use crate::Value;

/// Semantic type of a column's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Bool,
    Integer,
    Float,
    Decimal,
    Text,
    Bytes,
    Uuid,
    Date,
    Time,
    Timestamp,
    Json,
    Array,
}

/// A column of a mapped table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    table: String,
    name: String,
    value_type: ValueType,
    sql_type: String,
}

impl Column {
    pub fn new(table: &str, name: &str, value_type: ValueType, sql_type: &str) -> Self {
        Self {
            table: table.to_string(),
            name: name.to_string(),
            value_type,
            sql_type: sql_type.to_string(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn sql_type(&self) -> &str {
        &self.sql_type
    }

    /// Table-qualified reference to this column.
    pub fn reference(&self) -> ColumnRef {
        ColumnRef::qualified(&self.table, &self.name)
    }

    pub fn eq(&self, value: impl Into<Value>) -> Predicate {
        Predicate::eq(self.reference(), value)
    }

    pub fn ne(&self, value: impl Into<Value>) -> Predicate {
        Predicate::ne(self.reference(), value)
    }

    pub fn is_null(&self) -> Predicate {
        Predicate::is_null(self.reference())
    }

    pub fn is_not_null(&self) -> Predicate {
        Predicate::is_not_null(self.reference())
    }

    pub fn in_list<V: Into<Value>>(&self, values: impl IntoIterator<Item = V>) -> Predicate {
        Predicate::in_list(self.reference(), values)
    }

    pub fn not_in_list<V: Into<Value>>(&self, values: impl IntoIterator<Item = V>) -> Predicate {
        Predicate::not_in_list(self.reference(), values)
    }

    pub fn in_subquery(&self, query: QueryBuilder) -> Predicate {
        Predicate::in_subquery(self.reference(), query)
    }

    /// Compares the text at a dotted JSON path (`"address.city"`).
    pub fn json_path_eq(&self, path: &str, value: impl Into<Value>) -> Predicate {
        Predicate::eq(self.reference().json(path), value)
    }

    pub fn json_contains(&self, document: JsonValue) -> Predicate {
        Predicate::json_contains(self.reference(), document)
    }

    pub fn array_contains<V: Into<Value>>(&self, values: impl IntoIterator<Item = V>) -> Predicate {
        Predicate::array_contains(self.reference(), values)
    }

    pub fn asc(&self) -> OrderSpec {
        OrderSpec::asc(self.reference())
    }

    pub fn desc(&self) -> OrderSpec {
        OrderSpec::desc(self.reference())
    }

    pub fn select(&self) -> SelectItem {
        SelectItem::column(self.reference())
    }

    pub fn select_as(&self, alias: &str) -> SelectItem {
        SelectItem::column_as(self.reference(), alias)
    }
}

/// A column whose values are ordered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparableColumn(Column);

impl ComparableColumn {
    pub fn new(column: Column) -> Self {
        Self(column)
    }

    pub fn column(&self) -> &Column {
        &self.0
    }

    pub fn gt(&self, value: impl Into<Value>) -> Predicate {
        Predicate::gt(self.reference(), value)
    }

    pub fn gte(&self, value: impl Into<Value>) -> Predicate {
        Predicate::gte(self.reference(), value)
    }

    pub fn lt(&self, value: impl Into<Value>) -> Predicate {
        Predicate::lt(self.reference(), value)
    }

    pub fn lte(&self, value: impl Into<Value>) -> Predicate {
        Predicate::lte(self.reference(), value)
    }

    pub fn between(&self, low: impl Into<Value>, high: impl Into<Value>) -> Predicate {
        Predicate::between(self.reference(), low, high)
    }

    pub fn not_between(&self, low: impl Into<Value>, high: impl Into<Value>) -> Predicate {
        Predicate::not_between(self.reference(), low, high)
    }
}

impl Deref for ComparableColumn {
    type Target = Column;

    fn deref(&self) -> &Column {
        &self.0
    }
}

/// A text column with pattern-matching helpers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringColumn(Column);

impl StringColumn {
    pub fn new(column: Column) -> Self {
        Self(column)
    }

    pub fn column(&self) -> &Column {
        &self.0
    }

    pub fn like(&self, pattern: &str) -> Predicate {
        Predicate::like(self.reference(), pattern)
    }

    pub fn not_like(&self, pattern: &str) -> Predicate {
        Predicate::not_like(self.reference(), pattern)
    }

    /// Case-insensitive LIKE; dialects without ILIKE compare lowercased sides.
    pub fn ilike(&self, pattern: &str) -> Predicate {
        Predicate::ilike(self.reference(), pattern)
    }

    pub fn contains(&self, needle: &str) -> Predicate {
        Predicate::like(self.reference(), format!("%{}%", needle))
    }

    pub fn starts_with(&self, prefix: &str) -> Predicate {
        Predicate::like(self.reference(), format!("{}%", prefix))
    }

    pub fn ends_with(&self, suffix: &str) -> Predicate {
        Predicate::like(self.reference(), format!("%{}", suffix))
    }
}

impl Deref for StringColumn {
    type Target = Column;

    fn deref(&self) -> &Column {
        &self.0
    }
}
