//! Table descriptors.

use std::sync::Arc;

use super::column::{Column, ComparableColumn, StringColumn, ValueType};

/// Shared handle to an immutable table descriptor.
pub type TableRef = Arc<Table>;

/// A mapped table.
///
/// Created once by the metadata stage and shared by every descriptor and
/// builder that refers to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    name: String,
    entity: String,
    primary_key: String,
    soft_delete_column: Option<String>,
}

impl Table {
    /// Creates a table descriptor.
    ///
    /// `entity` is the simple entity type name (`"User"`); it drives key
    /// derivation and is the default morph discriminator value.
    pub fn new(name: impl Into<String>, entity: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entity: entity.into(),
            primary_key: "id".to_string(),
            soft_delete_column: None,
        }
    }

    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = column.into();
        self
    }

    /// Marks the table soft-delete aware using the given timestamp column.
    pub fn soft_deletes(mut self, column: impl Into<String>) -> Self {
        self.soft_delete_column = Some(column.into());
        self
    }

    pub fn shared(self) -> TableRef {
        Arc::new(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn primary_key_column(&self) -> &str {
        &self.primary_key
    }

    pub fn soft_delete_column(&self) -> Option<&str> {
        self.soft_delete_column.as_deref()
    }

    pub fn is_soft_delete(&self) -> bool {
        self.soft_delete_column.is_some()
    }

    /// Descriptor for a column of this table.
    pub fn column(&self, name: &str, value_type: ValueType, sql_type: &str) -> Column {
        Column::new(&self.name, name, value_type, sql_type)
    }

    pub fn comparable(&self, name: &str, value_type: ValueType, sql_type: &str) -> ComparableColumn {
        ComparableColumn::new(self.column(name, value_type, sql_type))
    }

    pub fn string(&self, name: &str, sql_type: &str) -> StringColumn {
        StringColumn::new(self.column(name, ValueType::Text, sql_type))
    }
}
