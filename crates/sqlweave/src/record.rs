//! Dynamic entity instances.

use serde_json::Value as JsonValue;

use crate::eager::{AttributeAccess, FromRow, Loaded};
use crate::schema::TableRef;
use crate::{Result, Row, SqlWeaveError, Value};

/// A row of some table plus whatever relations were loaded onto it.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    table: TableRef,
    attributes: Row,
    relations: Vec<(String, Loaded<Record>)>,
}

impl Record {
    pub fn new(table: &TableRef, attributes: Row) -> Self {
        Self {
            table: table.clone(),
            attributes,
            relations: Vec::new(),
        }
    }

    pub fn table(&self) -> &TableRef {
        &self.table
    }

    pub fn attributes(&self) -> &Row {
        &self.attributes
    }

    /// Column value, `None` when the column was not selected.
    pub fn value(&self, column: &str) -> Option<&Value> {
        self.attributes.get(column)
    }

    pub fn relation(&self, attribute: &str) -> Option<&Loaded<Record>> {
        self.relations
            .iter()
            .find(|(name, _)| name == attribute)
            .map(|(_, loaded)| loaded)
    }

    /// Related records of a loaded relation, empty when nothing is loaded.
    pub fn related(&self, attribute: &str) -> Vec<&Record> {
        self.relation(attribute)
            .map(|loaded| loaded.iter().collect())
            .unwrap_or_default()
    }

    /// Converts attributes and loaded relations to a JSON object.
    pub fn to_json(&self) -> Result<JsonValue> {
        let mut map = serde_json::Map::new();
        for (key, value) in self.attributes.iter() {
            map.insert(key.to_string(), value.to_json()?);
        }
        for (name, loaded) in &self.relations {
            let json = match loaded {
                Loaded::One(None) => JsonValue::Null,
                Loaded::One(Some(record)) => record.to_json()?,
                Loaded::Many(records) | Loaded::Set(records) => JsonValue::Array(
                    records.iter().map(Record::to_json).collect::<Result<Vec<_>>>()?,
                ),
            };
            map.insert(name.clone(), json);
        }
        Ok(JsonValue::Object(map))
    }
}

impl AttributeAccess for Record {
    fn get(&self, attribute: &str) -> Result<Value> {
        self.attributes
            .get(attribute)
            .cloned()
            .ok_or_else(|| SqlWeaveError::AttributeMapping {
                attribute: attribute.to_string(),
                reason: format!("no column '{}' on {}", attribute, self.table.name()),
            })
    }

    fn set_relation(&mut self, attribute: &str, value: Loaded<Self>) -> Result<()> {
        match self.relations.iter_mut().find(|(name, _)| name == attribute) {
            Some(slot) => slot.1 = value,
            None => self.relations.push((attribute.to_string(), value)),
        }
        Ok(())
    }
}

impl FromRow for Record {
    fn from_row(table: &TableRef, row: Row) -> Result<Self> {
        Ok(Record::new(table, row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Table;

    #[test]
    fn test_get_unknown_attribute_fails() {
        let users = Table::new("users", "User").shared();
        let record = Record::new(&users, Row::from_pairs([("id", 1)]));
        assert_eq!(record.get("id").unwrap(), Value::Int(1));
        assert!(matches!(
            record.get("email"),
            Err(SqlWeaveError::AttributeMapping { .. })
        ));
    }

    #[test]
    fn test_to_json_includes_relations() {
        let users = Table::new("users", "User").shared();
        let posts = Table::new("posts", "Post").shared();
        let mut user = Record::new(&users, Row::from_pairs([("id", 1)]));
        let post = Record::new(&posts, Row::from_pairs([("id", Value::Int(7)), ("title", Value::from("Hi"))]));
        user.set_relation("posts", Loaded::Many(vec![post])).unwrap();
        user.set_relation("profile", Loaded::One(None)).unwrap();

        let json = user.to_json().unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": 1, "posts": [{"id": 7, "title": "Hi"}], "profile": null})
        );
    }

    #[test]
    fn test_set_relation_replaces() {
        let users = Table::new("users", "User").shared();
        let mut user = Record::new(&users, Row::from_pairs([("id", 1)]));
        user.set_relation("posts", Loaded::Many(vec![])).unwrap();
        user.set_relation("posts", Loaded::Set(vec![])).unwrap();
        assert!(matches!(user.relation("posts"), Some(Loaded::Set(_))));
        assert!(user.related("missing").is_empty());
    }
}
