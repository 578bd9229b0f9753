//! Relation kinds and the key names each one carries.

use std::fmt;

use crate::expr::AggregateFunction;
use crate::schema::TableRef;

/// Plain tag naming a relation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationType {
    HasOne,
    HasMany,
    BelongsTo,
    BelongsToMany,
    HasOneThrough,
    HasManyThrough,
    MorphOne,
    MorphMany,
    MorphTo,
    MorphToMany,
    MorphedByMany,
    LatestOfMany,
    OldestOfMany,
    OfMany,
}

impl RelationType {
    pub fn name(&self) -> &'static str {
        match self {
            RelationType::HasOne => "HasOne",
            RelationType::HasMany => "HasMany",
            RelationType::BelongsTo => "BelongsTo",
            RelationType::BelongsToMany => "BelongsToMany",
            RelationType::HasOneThrough => "HasOneThrough",
            RelationType::HasManyThrough => "HasManyThrough",
            RelationType::MorphOne => "MorphOne",
            RelationType::MorphMany => "MorphMany",
            RelationType::MorphTo => "MorphTo",
            RelationType::MorphToMany => "MorphToMany",
            RelationType::MorphedByMany => "MorphedByMany",
            RelationType::LatestOfMany => "LatestOfMany",
            RelationType::OldestOfMany => "OldestOfMany",
            RelationType::OfMany => "OfMany",
        }
    }

    /// True when the target attribute holds at most one instance.
    pub fn is_singular(&self) -> bool {
        matches!(
            self,
            RelationType::HasOne
                | RelationType::BelongsTo
                | RelationType::HasOneThrough
                | RelationType::MorphOne
                | RelationType::MorphTo
                | RelationType::LatestOfMany
                | RelationType::OldestOfMany
                | RelationType::OfMany
        )
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Foreign key on the related table pointing at a key of the owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeys {
    /// Column on the related table.
    pub foreign_key: String,
    /// Column on the owner table.
    pub local_key: String,
}

/// Foreign key on the owner table pointing at a key of the related table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BelongsToKeys {
    /// Column on the owner table.
    pub foreign_key: String,
    /// Column on the related table.
    pub owner_key: String,
}

/// Many-to-many through a pivot table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PivotKeys {
    pub table: String,
    /// Pivot column referencing the owner.
    pub foreign_pivot_key: String,
    /// Pivot column referencing the related row.
    pub related_pivot_key: String,
    /// Owner column referenced by `foreign_pivot_key`.
    pub parent_key: String,
    /// Related column referenced by `related_pivot_key`.
    pub related_key: String,
    /// Extra pivot columns selected with eager-loaded rows.
    pub columns: Vec<String>,
    pub timestamps: bool,
}

impl PivotKeys {
    /// Every extra pivot column, timestamps included.
    pub fn extra_columns(&self) -> Vec<String> {
        let mut columns = self.columns.clone();
        if self.timestamps {
            for column in ["created_at", "updated_at"] {
                if !columns.iter().any(|c| c == column) {
                    columns.push(column.to_string());
                }
            }
        }
        columns
    }
}

/// Two hops: owner -> through -> related.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThroughKeys {
    pub through: TableRef,
    /// Column on the through table referencing the owner.
    pub first_key: String,
    /// Column on the related table referencing the through table.
    pub second_key: String,
    /// Owner column referenced by `first_key`.
    pub local_key: String,
    /// Through column referenced by `second_key`.
    pub second_local_key: String,
}

/// Polymorphic one/many: the related table stores owner id and type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MorphKeys {
    pub name: String,
    pub type_column: String,
    pub id_column: String,
    pub local_key: String,
    /// Discriminator identifying the owner type.
    pub type_value: String,
}

/// Inverse polymorphic relation: the owner stores target id and type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MorphToKeys {
    pub name: String,
    pub type_column: String,
    pub id_column: String,
    /// Key on every target table; each target's primary key when `None`.
    pub owner_key: Option<String>,
}

/// Polymorphic many-to-many through a shared pivot table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MorphPivotKeys {
    pub pivot: PivotKeys,
    pub name: String,
    /// Pivot column holding the discriminator.
    pub type_column: String,
    pub type_value: String,
}

/// One row picked out of a has-many by an aggregate over `column`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfManyKeys {
    pub foreign_key: String,
    pub local_key: String,
    pub column: String,
    pub aggregate: AggregateFunction,
}

/// Closed set of relation shapes with their resolved keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationKind {
    HasOne(ForeignKeys),
    HasMany(ForeignKeys),
    BelongsTo(BelongsToKeys),
    BelongsToMany(PivotKeys),
    HasOneThrough(ThroughKeys),
    HasManyThrough(ThroughKeys),
    MorphOne(MorphKeys),
    MorphMany(MorphKeys),
    MorphTo(MorphToKeys),
    MorphToMany(MorphPivotKeys),
    MorphedByMany(MorphPivotKeys),
    LatestOfMany(OfManyKeys),
    OldestOfMany(OfManyKeys),
    OfMany(OfManyKeys),
}

impl RelationKind {
    pub fn relation_type(&self) -> RelationType {
        match self {
            RelationKind::HasOne(_) => RelationType::HasOne,
            RelationKind::HasMany(_) => RelationType::HasMany,
            RelationKind::BelongsTo(_) => RelationType::BelongsTo,
            RelationKind::BelongsToMany(_) => RelationType::BelongsToMany,
            RelationKind::HasOneThrough(_) => RelationType::HasOneThrough,
            RelationKind::HasManyThrough(_) => RelationType::HasManyThrough,
            RelationKind::MorphOne(_) => RelationType::MorphOne,
            RelationKind::MorphMany(_) => RelationType::MorphMany,
            RelationKind::MorphTo(_) => RelationType::MorphTo,
            RelationKind::MorphToMany(_) => RelationType::MorphToMany,
            RelationKind::MorphedByMany(_) => RelationType::MorphedByMany,
            RelationKind::LatestOfMany(_) => RelationType::LatestOfMany,
            RelationKind::OldestOfMany(_) => RelationType::OldestOfMany,
            RelationKind::OfMany(_) => RelationType::OfMany,
        }
    }
}
