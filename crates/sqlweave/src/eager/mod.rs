//! Eager loading.
//!
//! After the root query runs, every [`EagerLoadSpec`] costs exactly one
//! batched query per nesting level (one per discriminator value for
//! `MorphTo`), however many parent rows there are. Results are grouped by
//! the correlating key and written back through [`AttributeAccess`].

mod loader;
mod spec;

pub use loader::EagerLoader;
pub use spec::EagerLoadSpec;

use crate::schema::TableRef;
use crate::{Result, Row, Value};

/// Related rows written onto one parent attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum Loaded<T> {
    /// Singular relation: the match, the default instance, or nothing.
    One(Option<T>),
    /// To-many relation with list semantics.
    Many(Vec<T>),
    /// To-many relation deduplicated by the related primary key.
    Set(Vec<T>),
}

impl<T> Loaded<T> {
    pub fn len(&self) -> usize {
        match self {
            Loaded::One(item) => usize::from(item.is_some()),
            Loaded::Many(items) | Loaded::Set(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            Loaded::One(item) => item.as_slice().iter(),
            Loaded::Many(items) | Loaded::Set(items) => items.iter(),
        }
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            Loaded::One(item) => item.into_iter().collect(),
            Loaded::Many(items) | Loaded::Set(items) => items,
        }
    }
}

/// Attribute read/write on mapped instances.
///
/// Unknown attribute names must be reported as errors, never ignored.
pub trait AttributeAccess {
    /// Reads a column value (keys, discriminators, pivot aliases).
    fn get(&self, attribute: &str) -> Result<Value>;

    /// Stores loaded related instances on a relation attribute.
    fn set_relation(&mut self, attribute: &str, value: Loaded<Self>) -> Result<()>
    where
        Self: Sized;
}

/// Materializes an instance of `table` from a fetched row.
pub trait FromRow: Sized {
    fn from_row(table: &TableRef, row: Row) -> Result<Self>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loaded_len() {
        assert_eq!(Loaded::<i32>::One(None).len(), 0);
        assert_eq!(Loaded::One(Some(1)).len(), 1);
        assert!(Loaded::<i32>::Many(vec![]).is_empty());
        assert_eq!(Loaded::Set(vec![1, 2]).into_vec(), vec![1, 2]);
    }
}
