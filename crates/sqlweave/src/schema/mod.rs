//! Immutable descriptors for tables, columns and the relations between them.

mod column;
pub mod naming;
mod table;

pub use column::{Column, ComparableColumn, StringColumn, ValueType};
pub use table::{Table, TableRef};

use std::collections::HashMap;
use std::sync::Arc;

use crate::relation::Relation;
use crate::{Result, SqlWeaveError};

/// Registry of the descriptors produced by the metadata stage.
///
/// Resolves relations by `(table, attribute)` for dotted eager-load paths and
/// maps morph discriminator values back to tables.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    tables: HashMap<String, TableRef>,
    relations: HashMap<(String, String), Arc<Relation>>,
    morph_map: HashMap<String, TableRef>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a table; its entity name becomes a morph discriminator.
    pub fn add_table(mut self, table: TableRef) -> Self {
        self.morph_map
            .entry(table.entity().to_string())
            .or_insert_with(|| table.clone());
        self.tables.insert(table.name().to_string(), table);
        self
    }

    /// Registers a relation under its owner table and attribute.
    pub fn add_relation(mut self, relation: Arc<Relation>) -> Self {
        let key = (
            relation.owner().name().to_string(),
            relation.attribute().to_string(),
        );
        self.relations.insert(key, relation);
        self
    }

    /// Maps an extra discriminator value to a table.
    pub fn morph_alias(mut self, type_value: impl Into<String>, table: TableRef) -> Self {
        self.morph_map.insert(type_value.into(), table);
        self
    }

    pub fn table(&self, name: &str) -> Option<&TableRef> {
        self.tables.get(name)
    }

    pub fn relation(&self, table: &str, attribute: &str) -> Result<&Arc<Relation>> {
        self.relations
            .get(&(table.to_string(), attribute.to_string()))
            .ok_or_else(|| {
                SqlWeaveError::InvalidArgument(format!(
                    "No relation '{}' declared on table '{}'",
                    attribute, table
                ))
            })
    }

    /// Table stored under a morph discriminator value.
    pub fn resolve_morph(&self, type_value: &str) -> Result<&TableRef> {
        self.morph_map
            .get(type_value)
            .ok_or_else(|| SqlWeaveError::MorphTypeUnresolved(type_value.to_string()))
    }
}
