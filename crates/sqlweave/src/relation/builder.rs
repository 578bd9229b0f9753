//! Relation construction and default key derivation.

use std::sync::Arc;

use crate::expr::AggregateFunction;
use crate::query::helpers::{validate_identifier, validate_identifier_part};
use crate::schema::{naming, TableRef};
use crate::{Result, SqlWeaveError, Value};

use super::kind::{
    BelongsToKeys, ForeignKeys, MorphKeys, MorphPivotKeys, MorphToKeys, OfManyKeys, PivotKeys,
    RelationKind, RelationType, ThroughKeys,
};
use super::{Cascade, ContainerKind, FetchStrategy, Relation};

/// Accumulates explicit overrides; [`build`](Self::build) derives the rest.
#[derive(Debug, Clone)]
pub struct RelationBuilder {
    relation_type: RelationType,
    owner: TableRef,
    related: Option<TableRef>,
    through: Option<TableRef>,
    attribute: String,
    morph_name: Option<String>,
    foreign_key: Option<String>,
    local_key: Option<String>,
    owner_key: Option<String>,
    pivot_table: Option<String>,
    foreign_pivot_key: Option<String>,
    related_pivot_key: Option<String>,
    related_key: Option<String>,
    first_key: Option<String>,
    second_key: Option<String>,
    second_local_key: Option<String>,
    morph_type: Option<String>,
    pivot_columns: Vec<String>,
    pivot_timestamps: bool,
    of_many_column: Option<String>,
    of_many_aggregate: Option<AggregateFunction>,
    fetch: FetchStrategy,
    cascade: Cascade,
    container: ContainerKind,
    default: Option<Vec<(String, Value)>>,
}

impl RelationBuilder {
    pub(crate) fn new(
        relation_type: RelationType,
        owner: &TableRef,
        related: Option<&TableRef>,
        attribute: &str,
    ) -> Self {
        Self {
            relation_type,
            owner: owner.clone(),
            related: related.cloned(),
            through: None,
            attribute: attribute.to_string(),
            morph_name: None,
            foreign_key: None,
            local_key: None,
            owner_key: None,
            pivot_table: None,
            foreign_pivot_key: None,
            related_pivot_key: None,
            related_key: None,
            first_key: None,
            second_key: None,
            second_local_key: None,
            morph_type: None,
            pivot_columns: Vec::new(),
            pivot_timestamps: false,
            of_many_column: None,
            of_many_aggregate: None,
            fetch: FetchStrategy::Lazy,
            cascade: Cascade::default(),
            container: ContainerKind::List,
            default: None,
        }
    }

    pub(crate) fn through(mut self, table: &TableRef) -> Self {
        self.through = Some(table.clone());
        self
    }

    pub(crate) fn morph_name(mut self, name: &str) -> Self {
        self.morph_name = Some(name.to_string());
        self
    }

    /// Foreign key column (on the related table, or on the owner for BelongsTo).
    pub fn foreign_key(mut self, column: &str) -> Self {
        self.foreign_key = Some(column.to_string());
        self
    }

    /// Owner column the foreign key points at.
    pub fn local_key(mut self, column: &str) -> Self {
        self.local_key = Some(column.to_string());
        self
    }

    /// Related column a BelongsTo foreign key (or MorphTo id) points at.
    pub fn owner_key(mut self, column: &str) -> Self {
        self.owner_key = Some(column.to_string());
        self
    }

    pub fn pivot_table(mut self, table: &str) -> Self {
        self.pivot_table = Some(table.to_string());
        self
    }

    /// Pivot columns referencing the owner and the related row.
    pub fn pivot_keys(mut self, foreign_pivot_key: &str, related_pivot_key: &str) -> Self {
        self.foreign_pivot_key = Some(foreign_pivot_key.to_string());
        self.related_pivot_key = Some(related_pivot_key.to_string());
        self
    }

    /// Related column referenced by the pivot.
    pub fn related_key(mut self, column: &str) -> Self {
        self.related_key = Some(column.to_string());
        self
    }

    /// Extra pivot columns carried along with eager-loaded rows.
    pub fn with_pivot(mut self, columns: &[&str]) -> Self {
        self.pivot_columns
            .extend(columns.iter().map(|c| c.to_string()));
        self
    }

    pub fn with_timestamps(mut self) -> Self {
        self.pivot_timestamps = true;
        self
    }

    /// Through-table column referencing the owner.
    pub fn first_key(mut self, column: &str) -> Self {
        self.first_key = Some(column.to_string());
        self
    }

    /// Related column referencing the through table.
    pub fn second_key(mut self, column: &str) -> Self {
        self.second_key = Some(column.to_string());
        self
    }

    /// Through-table column referenced by the second key.
    pub fn second_local_key(mut self, column: &str) -> Self {
        self.second_local_key = Some(column.to_string());
        self
    }

    /// Overrides the stored discriminator value (defaults to the entity name).
    pub fn morph_type(mut self, type_value: &str) -> Self {
        self.morph_type = Some(type_value.to_string());
        self
    }

    pub fn of_many_column(mut self, column: &str) -> Self {
        self.of_many_column = Some(column.to_string());
        self
    }

    pub fn of_many_aggregate(mut self, aggregate: AggregateFunction) -> Self {
        self.of_many_aggregate = Some(aggregate);
        self
    }

    pub fn eager(mut self) -> Self {
        self.fetch = FetchStrategy::Eager;
        self
    }

    pub fn cascade(mut self, cascade: Cascade) -> Self {
        self.cascade = cascade;
        self
    }

    /// Collect to-many results into a set keyed by the related primary key.
    pub fn as_set(mut self) -> Self {
        self.container = ContainerKind::Set;
        self
    }

    /// Populate singular attributes with a default instance when nothing matches.
    pub fn with_default<I, K, V>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.default = Some(
            attributes
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    fn related(&self) -> Result<&TableRef> {
        self.related.as_ref().ok_or_else(|| {
            SqlWeaveError::InvalidArgument(format!(
                "{} relation '{}' needs a related table",
                self.relation_type, self.attribute
            ))
        })
    }

    fn required_morph_name(&self) -> Result<String> {
        self.morph_name.clone().ok_or_else(|| {
            SqlWeaveError::InvalidArgument(format!(
                "{} relation '{}' needs a morph name",
                self.relation_type, self.attribute
            ))
        })
    }

    fn pivot_keys_for(&self, table: String, foreign_pivot_key: String, related_pivot_key: String) -> Result<PivotKeys> {
        let related = self.related()?;
        Ok(PivotKeys {
            table: self.pivot_table.clone().unwrap_or(table),
            foreign_pivot_key: self.foreign_pivot_key.clone().unwrap_or(foreign_pivot_key),
            related_pivot_key: self.related_pivot_key.clone().unwrap_or(related_pivot_key),
            parent_key: self
                .local_key
                .clone()
                .unwrap_or_else(|| self.owner.primary_key_column().to_string()),
            related_key: self
                .related_key
                .clone()
                .unwrap_or_else(|| related.primary_key_column().to_string()),
            columns: self.pivot_columns.clone(),
            timestamps: self.pivot_timestamps,
        })
    }

    fn direct_keys(&self) -> ForeignKeys {
        ForeignKeys {
            foreign_key: self
                .foreign_key
                .clone()
                .unwrap_or_else(|| naming::foreign_key(self.owner.entity())),
            local_key: self
                .local_key
                .clone()
                .unwrap_or_else(|| self.owner.primary_key_column().to_string()),
        }
    }

    fn of_many_keys(&self, default_aggregate: AggregateFunction) -> Result<OfManyKeys> {
        let related = self.related()?;
        let keys = self.direct_keys();
        Ok(OfManyKeys {
            foreign_key: keys.foreign_key,
            local_key: keys.local_key,
            column: self
                .of_many_column
                .clone()
                .unwrap_or_else(|| related.primary_key_column().to_string()),
            aggregate: self.of_many_aggregate.unwrap_or(default_aggregate),
        })
    }

    fn resolve_kind(&self) -> Result<RelationKind> {
        let kind = match self.relation_type {
            RelationType::HasOne => RelationKind::HasOne(self.direct_keys()),
            RelationType::HasMany => RelationKind::HasMany(self.direct_keys()),
            RelationType::BelongsTo => {
                let related = self.related()?;
                RelationKind::BelongsTo(BelongsToKeys {
                    foreign_key: self
                        .foreign_key
                        .clone()
                        .unwrap_or_else(|| naming::foreign_key(related.entity())),
                    owner_key: self
                        .owner_key
                        .clone()
                        .unwrap_or_else(|| related.primary_key_column().to_string()),
                })
            }
            RelationType::BelongsToMany => {
                let related = self.related()?;
                RelationKind::BelongsToMany(self.pivot_keys_for(
                    naming::pivot_table(self.owner.entity(), related.entity()),
                    naming::foreign_key(self.owner.entity()),
                    naming::foreign_key(related.entity()),
                )?)
            }
            RelationType::HasOneThrough | RelationType::HasManyThrough => {
                let through = self.through.clone().ok_or_else(|| {
                    SqlWeaveError::InvalidArgument(format!(
                        "{} relation '{}' needs a through table",
                        self.relation_type, self.attribute
                    ))
                })?;
                let keys = ThroughKeys {
                    first_key: self
                        .first_key
                        .clone()
                        .unwrap_or_else(|| naming::foreign_key(self.owner.entity())),
                    second_key: self
                        .second_key
                        .clone()
                        .unwrap_or_else(|| naming::foreign_key(through.entity())),
                    local_key: self
                        .local_key
                        .clone()
                        .unwrap_or_else(|| self.owner.primary_key_column().to_string()),
                    second_local_key: self
                        .second_local_key
                        .clone()
                        .unwrap_or_else(|| through.primary_key_column().to_string()),
                    through,
                };
                if self.relation_type == RelationType::HasOneThrough {
                    RelationKind::HasOneThrough(keys)
                } else {
                    RelationKind::HasManyThrough(keys)
                }
            }
            RelationType::MorphOne | RelationType::MorphMany => {
                let name = self.required_morph_name()?;
                let keys = MorphKeys {
                    type_column: naming::morph_type_column(&name),
                    id_column: self
                        .foreign_key
                        .clone()
                        .unwrap_or_else(|| naming::morph_id_column(&name)),
                    local_key: self
                        .local_key
                        .clone()
                        .unwrap_or_else(|| self.owner.primary_key_column().to_string()),
                    type_value: self
                        .morph_type
                        .clone()
                        .unwrap_or_else(|| self.owner.entity().to_string()),
                    name,
                };
                if self.relation_type == RelationType::MorphOne {
                    RelationKind::MorphOne(keys)
                } else {
                    RelationKind::MorphMany(keys)
                }
            }
            RelationType::MorphTo => {
                let name = self.required_morph_name()?;
                RelationKind::MorphTo(MorphToKeys {
                    type_column: naming::morph_type_column(&name),
                    id_column: self
                        .foreign_key
                        .clone()
                        .unwrap_or_else(|| naming::morph_id_column(&name)),
                    owner_key: self.owner_key.clone(),
                    name,
                })
            }
            RelationType::MorphToMany => {
                let name = self.required_morph_name()?;
                let related = self.related()?;
                let pivot = self.pivot_keys_for(
                    naming::morph_pivot_table(&name),
                    naming::morph_id_column(&name),
                    naming::foreign_key(related.entity()),
                )?;
                RelationKind::MorphToMany(MorphPivotKeys {
                    pivot,
                    type_column: naming::morph_type_column(&name),
                    type_value: self
                        .morph_type
                        .clone()
                        .unwrap_or_else(|| self.owner.entity().to_string()),
                    name,
                })
            }
            RelationType::MorphedByMany => {
                let name = self.required_morph_name()?;
                let related = self.related()?;
                let pivot = self.pivot_keys_for(
                    naming::morph_pivot_table(&name),
                    naming::foreign_key(self.owner.entity()),
                    naming::morph_id_column(&name),
                )?;
                RelationKind::MorphedByMany(MorphPivotKeys {
                    pivot,
                    type_column: naming::morph_type_column(&name),
                    type_value: self
                        .morph_type
                        .clone()
                        .unwrap_or_else(|| related.entity().to_string()),
                    name,
                })
            }
            RelationType::LatestOfMany => {
                RelationKind::LatestOfMany(self.of_many_keys(AggregateFunction::Max)?)
            }
            RelationType::OldestOfMany => {
                RelationKind::OldestOfMany(self.of_many_keys(AggregateFunction::Min)?)
            }
            RelationType::OfMany => {
                if self.of_many_column.is_none() {
                    return Err(SqlWeaveError::InvalidArgument(format!(
                        "OfMany relation '{}' needs an aggregate column",
                        self.attribute
                    )));
                }
                RelationKind::OfMany(self.of_many_keys(AggregateFunction::Max)?)
            }
        };
        Ok(kind)
    }

    /// Resolves every key and validates the resulting identifiers.
    pub fn build(self) -> Result<Arc<Relation>> {
        let kind = self.resolve_kind()?;
        validate_kind(&kind)?;
        for (column, _) in self.default.iter().flatten() {
            validate_identifier_part(column)?;
        }
        if self.attribute.is_empty() {
            return Err(SqlWeaveError::InvalidArgument(
                "Relation attribute name cannot be empty".to_string(),
            ));
        }

        Ok(Arc::new(Relation {
            attribute: self.attribute,
            owner: self.owner,
            related: self.related,
            kind,
            fetch: self.fetch,
            cascade: self.cascade,
            container: self.container,
            default: self.default,
        }))
    }
}

fn validate_kind(kind: &RelationKind) -> Result<()> {
    let mut columns: Vec<&str> = Vec::new();
    match kind {
        RelationKind::HasOne(keys) | RelationKind::HasMany(keys) => {
            columns.extend([keys.foreign_key.as_str(), keys.local_key.as_str()]);
        }
        RelationKind::BelongsTo(keys) => {
            columns.extend([keys.foreign_key.as_str(), keys.owner_key.as_str()]);
        }
        RelationKind::BelongsToMany(pivot) => {
            validate_pivot(pivot, &mut columns)?;
        }
        RelationKind::HasOneThrough(keys) | RelationKind::HasManyThrough(keys) => {
            columns.extend([
                keys.first_key.as_str(),
                keys.second_key.as_str(),
                keys.local_key.as_str(),
                keys.second_local_key.as_str(),
            ]);
        }
        RelationKind::MorphOne(keys) | RelationKind::MorphMany(keys) => {
            columns.extend([
                keys.type_column.as_str(),
                keys.id_column.as_str(),
                keys.local_key.as_str(),
            ]);
        }
        RelationKind::MorphTo(keys) => {
            columns.extend([keys.type_column.as_str(), keys.id_column.as_str()]);
            columns.extend(keys.owner_key.as_deref());
        }
        RelationKind::MorphToMany(morph) | RelationKind::MorphedByMany(morph) => {
            validate_pivot(&morph.pivot, &mut columns)?;
            columns.push(morph.type_column.as_str());
        }
        RelationKind::LatestOfMany(keys)
        | RelationKind::OldestOfMany(keys)
        | RelationKind::OfMany(keys) => {
            columns.extend([
                keys.foreign_key.as_str(),
                keys.local_key.as_str(),
                keys.column.as_str(),
            ]);
        }
    }
    columns.into_iter().try_for_each(validate_identifier_part)
}

fn validate_pivot<'a>(pivot: &'a PivotKeys, columns: &mut Vec<&'a str>) -> Result<()> {
    validate_identifier(&pivot.table)?;
    columns.extend([
        pivot.foreign_pivot_key.as_str(),
        pivot.related_pivot_key.as_str(),
        pivot.parent_key.as_str(),
        pivot.related_key.as_str(),
    ]);
    columns.extend(pivot.columns.iter().map(String::as_str));
    Ok(())
}
