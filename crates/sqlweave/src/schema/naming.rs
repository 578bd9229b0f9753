//! Default key and table names derived from entity names.
//!
//! Every function here is pure: the same pair of names always derives the
//! same keys, regardless of which side of a relation they appear on.

use heck::ToSnakeCase;

/// Snake-cased singular form of an entity name (`BlogPost` -> `blog_post`).
pub fn snake(entity: &str) -> String {
    entity.to_snake_case()
}

/// `{entity}_id`
pub fn foreign_key(entity: &str) -> String {
    format!("{}_id", snake(entity))
}

/// Pivot table for a many-to-many pair: both snake-cased names, sorted.
pub fn pivot_table(a: &str, b: &str) -> String {
    let mut parts = [snake(a), snake(b)];
    parts.sort();
    parts.join("_")
}

pub fn morph_type_column(morph_name: &str) -> String {
    format!("{}_type", morph_name)
}

pub fn morph_id_column(morph_name: &str) -> String {
    format!("{}_id", morph_name)
}

/// Shared pivot table of a polymorphic many-to-many relation.
pub fn morph_pivot_table(morph_name: &str) -> String {
    format!("{}s", morph_name)
}

/// Alias for a pivot column selected alongside related rows.
pub fn pivot_alias(column: &str) -> String {
    format!("pivot_{}", column)
}
