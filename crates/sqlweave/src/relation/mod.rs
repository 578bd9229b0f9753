//! Relation descriptors.
//!
//! A [`Relation`] is built once through [`RelationBuilder`], which derives
//! every key the caller did not name, and is shared behind an `Arc` by
//! predicates, projections and eager-load specs.

mod builder;
mod kind;

pub use builder::RelationBuilder;
pub use kind::{
    BelongsToKeys, ForeignKeys, MorphKeys, MorphPivotKeys, MorphToKeys, OfManyKeys, PivotKeys,
    RelationKind, RelationType, ThroughKeys,
};

use crate::schema::{naming, TableRef};
use crate::{Result, SqlWeaveError, Value};

/// When the relation is loaded if nobody asks for it explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchStrategy {
    #[default]
    Lazy,
    Eager,
}

/// Operations propagated from owner to related rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cascade {
    pub save: bool,
    pub delete: bool,
}

/// Collection type of a to-many attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContainerKind {
    #[default]
    List,
    /// Deduplicated by the related primary key, first occurrence wins.
    Set,
}

/// How the related table is reached from the owner.
#[derive(Debug, Clone, Copy)]
pub enum JoinPath<'a> {
    /// The related table carries (or is referenced by) the key directly.
    Direct,
    /// related JOIN pivot
    Pivot(&'a PivotKeys),
    /// related JOIN through
    Through(&'a ThroughKeys),
}

/// Alias of the through-table key selected with eager-loaded rows.
pub const THROUGH_KEY_ALIAS: &str = "through_key";

#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    pub(crate) attribute: String,
    pub(crate) owner: TableRef,
    pub(crate) related: Option<TableRef>,
    pub(crate) kind: RelationKind,
    pub(crate) fetch: FetchStrategy,
    pub(crate) cascade: Cascade,
    pub(crate) container: ContainerKind,
    pub(crate) default: Option<Vec<(String, Value)>>,
}

impl Relation {
    pub fn has_one(owner: &TableRef, related: &TableRef, attribute: &str) -> RelationBuilder {
        RelationBuilder::new(RelationType::HasOne, owner, Some(related), attribute)
    }

    pub fn has_many(owner: &TableRef, related: &TableRef, attribute: &str) -> RelationBuilder {
        RelationBuilder::new(RelationType::HasMany, owner, Some(related), attribute)
    }

    pub fn belongs_to(owner: &TableRef, related: &TableRef, attribute: &str) -> RelationBuilder {
        RelationBuilder::new(RelationType::BelongsTo, owner, Some(related), attribute)
    }

    pub fn belongs_to_many(owner: &TableRef, related: &TableRef, attribute: &str) -> RelationBuilder {
        RelationBuilder::new(RelationType::BelongsToMany, owner, Some(related), attribute)
    }

    pub fn has_one_through(
        owner: &TableRef,
        through: &TableRef,
        related: &TableRef,
        attribute: &str,
    ) -> RelationBuilder {
        RelationBuilder::new(RelationType::HasOneThrough, owner, Some(related), attribute)
            .through(through)
    }

    pub fn has_many_through(
        owner: &TableRef,
        through: &TableRef,
        related: &TableRef,
        attribute: &str,
    ) -> RelationBuilder {
        RelationBuilder::new(RelationType::HasManyThrough, owner, Some(related), attribute)
            .through(through)
    }

    pub fn morph_one(owner: &TableRef, related: &TableRef, attribute: &str, morph_name: &str) -> RelationBuilder {
        RelationBuilder::new(RelationType::MorphOne, owner, Some(related), attribute).morph_name(morph_name)
    }

    pub fn morph_many(owner: &TableRef, related: &TableRef, attribute: &str, morph_name: &str) -> RelationBuilder {
        RelationBuilder::new(RelationType::MorphMany, owner, Some(related), attribute).morph_name(morph_name)
    }

    /// Inverse polymorphic relation; the target table is read per row.
    pub fn morph_to(owner: &TableRef, attribute: &str, morph_name: &str) -> RelationBuilder {
        RelationBuilder::new(RelationType::MorphTo, owner, None, attribute).morph_name(morph_name)
    }

    pub fn morph_to_many(owner: &TableRef, related: &TableRef, attribute: &str, morph_name: &str) -> RelationBuilder {
        RelationBuilder::new(RelationType::MorphToMany, owner, Some(related), attribute).morph_name(morph_name)
    }

    pub fn morphed_by_many(
        owner: &TableRef,
        related: &TableRef,
        attribute: &str,
        morph_name: &str,
    ) -> RelationBuilder {
        RelationBuilder::new(RelationType::MorphedByMany, owner, Some(related), attribute)
            .morph_name(morph_name)
    }

    /// The related row with the greatest `column` (the related primary key
    /// unless set with [`RelationBuilder::of_many_column`]).
    pub fn latest_of_many(owner: &TableRef, related: &TableRef, attribute: &str) -> RelationBuilder {
        RelationBuilder::new(RelationType::LatestOfMany, owner, Some(related), attribute)
    }

    pub fn oldest_of_many(owner: &TableRef, related: &TableRef, attribute: &str) -> RelationBuilder {
        RelationBuilder::new(RelationType::OldestOfMany, owner, Some(related), attribute)
    }

    /// The related row selected by `aggregate(column)`.
    pub fn of_many(
        owner: &TableRef,
        related: &TableRef,
        attribute: &str,
        column: &str,
        aggregate: crate::expr::AggregateFunction,
    ) -> RelationBuilder {
        RelationBuilder::new(RelationType::OfMany, owner, Some(related), attribute)
            .of_many_column(column)
            .of_many_aggregate(aggregate)
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn owner(&self) -> &TableRef {
        &self.owner
    }

    pub fn kind(&self) -> &RelationKind {
        &self.kind
    }

    pub fn relation_type(&self) -> RelationType {
        self.kind.relation_type()
    }

    pub fn fetch_strategy(&self) -> FetchStrategy {
        self.fetch
    }

    pub fn cascade(&self) -> Cascade {
        self.cascade
    }

    pub fn container(&self) -> ContainerKind {
        self.container
    }

    /// Attribute assignments for the default instance, if one is declared.
    pub fn default_attributes(&self) -> Option<&[(String, Value)]> {
        self.default.as_deref()
    }

    pub fn is_singular(&self) -> bool {
        self.relation_type().is_singular()
    }

    /// Statically known related table.
    ///
    /// `MorphTo` has none; `operation` names the caller for the error.
    pub fn related_table(&self, operation: &str) -> Result<&TableRef> {
        self.related.as_ref().ok_or_else(|| SqlWeaveError::UnsupportedRelation {
            kind: self.relation_type().name().to_string(),
            operation: operation.to_string(),
        })
    }

    pub fn pivot(&self) -> Option<&PivotKeys> {
        match &self.kind {
            RelationKind::BelongsToMany(pivot) => Some(pivot),
            RelationKind::MorphToMany(morph) | RelationKind::MorphedByMany(morph) => Some(&morph.pivot),
            _ => None,
        }
    }

    pub fn is_pivot(&self) -> bool {
        self.pivot().is_some()
    }

    pub fn join_path(&self) -> JoinPath<'_> {
        match &self.kind {
            RelationKind::BelongsToMany(pivot) => JoinPath::Pivot(pivot),
            RelationKind::MorphToMany(morph) | RelationKind::MorphedByMany(morph) => {
                JoinPath::Pivot(&morph.pivot)
            }
            RelationKind::HasOneThrough(through) | RelationKind::HasManyThrough(through) => {
                JoinPath::Through(through)
            }
            RelationKind::HasOne(_)
            | RelationKind::HasMany(_)
            | RelationKind::BelongsTo(_)
            | RelationKind::MorphOne(_)
            | RelationKind::MorphMany(_)
            | RelationKind::MorphTo(_)
            | RelationKind::LatestOfMany(_)
            | RelationKind::OldestOfMany(_)
            | RelationKind::OfMany(_) => JoinPath::Direct,
        }
    }

    /// Column on owner rows whose value correlates with related rows.
    pub fn parent_key(&self) -> &str {
        match &self.kind {
            RelationKind::HasOne(keys) | RelationKind::HasMany(keys) => &keys.local_key,
            RelationKind::BelongsTo(keys) => &keys.foreign_key,
            RelationKind::BelongsToMany(pivot) => &pivot.parent_key,
            RelationKind::HasOneThrough(keys) | RelationKind::HasManyThrough(keys) => &keys.local_key,
            RelationKind::MorphOne(keys) | RelationKind::MorphMany(keys) => &keys.local_key,
            RelationKind::MorphTo(keys) => &keys.id_column,
            RelationKind::MorphToMany(morph) | RelationKind::MorphedByMany(morph) => &morph.pivot.parent_key,
            RelationKind::LatestOfMany(keys)
            | RelationKind::OldestOfMany(keys)
            | RelationKind::OfMany(keys) => &keys.local_key,
        }
    }

    /// Column of fetched related rows to group by.
    ///
    /// For pivot and through relations this is the alias under which the
    /// generator selects the intermediate key.
    pub fn group_key(&self) -> String {
        match &self.kind {
            RelationKind::HasOne(keys) | RelationKind::HasMany(keys) => keys.foreign_key.clone(),
            RelationKind::BelongsTo(keys) => keys.owner_key.clone(),
            RelationKind::BelongsToMany(pivot) => naming::pivot_alias(&pivot.foreign_pivot_key),
            RelationKind::HasOneThrough(_) | RelationKind::HasManyThrough(_) => {
                THROUGH_KEY_ALIAS.to_string()
            }
            RelationKind::MorphOne(keys) | RelationKind::MorphMany(keys) => keys.id_column.clone(),
            // Empty unless overridden; the loader falls back to each target's primary key.
            RelationKind::MorphTo(keys) => keys.owner_key.clone().unwrap_or_default(),
            RelationKind::MorphToMany(morph) | RelationKind::MorphedByMany(morph) => {
                naming::pivot_alias(&morph.pivot.foreign_pivot_key)
            }
            RelationKind::LatestOfMany(keys)
            | RelationKind::OldestOfMany(keys)
            | RelationKind::OfMany(keys) => keys.foreign_key.clone(),
        }
    }

    /// Discriminator filter `(column, value)` applied to the related table
    /// (MorphOne/MorphMany) or the pivot table (MorphToMany/MorphedByMany).
    pub fn morph_filter(&self) -> Option<(&str, &str)> {
        match &self.kind {
            RelationKind::MorphOne(keys) | RelationKind::MorphMany(keys) => {
                Some((&keys.type_column, &keys.type_value))
            }
            RelationKind::MorphToMany(morph) | RelationKind::MorphedByMany(morph) => {
                Some((&morph.type_column, &morph.type_value))
            }
            _ => None,
        }
    }

    pub fn of_many_keys(&self) -> Option<&OfManyKeys> {
        match &self.kind {
            RelationKind::LatestOfMany(keys)
            | RelationKind::OldestOfMany(keys)
            | RelationKind::OfMany(keys) => Some(keys),
            _ => None,
        }
    }

    pub fn morph_to_keys(&self) -> Option<&MorphToKeys> {
        match &self.kind {
            RelationKind::MorphTo(keys) => Some(keys),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests;
