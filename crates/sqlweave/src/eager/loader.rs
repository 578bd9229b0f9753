//! Batched population of relation attributes.

use std::collections::{HashMap, HashSet};

use futures::future::{BoxFuture, FutureExt};
use tracing::{debug, instrument};

use super::{AttributeAccess, EagerLoadSpec, FromRow, Loaded};
use crate::config::EagerLoadConfig;
use crate::dialect::Dialect;
use crate::executor::{fetch_logged, QueryExecutor};
use crate::generator;
use crate::query::QueryResult;
use crate::relation::{ContainerKind, Relation};
use crate::schema::{Schema, TableRef};
use crate::value::GroupKey;
use crate::{Result, Row, SqlWeaveError, Value};

/// Wraps a collaborator failure so the attribute name travels with it.
fn mapping_error(attribute: &str, err: SqlWeaveError) -> SqlWeaveError {
    match err {
        SqlWeaveError::AttributeMapping { .. } => err,
        other => SqlWeaveError::AttributeMapping {
            attribute: attribute.to_string(),
            reason: other.to_string(),
        },
    }
}

fn read<T: AttributeAccess>(item: &T, attribute: &str) -> Result<Value> {
    item.get(attribute).map_err(|e| mapping_error(attribute, e))
}

/// Runs eager-load specs against a [`QueryExecutor`].
///
/// ```ignore
/// let loader = EagerLoader::new(&executor, Dialect::POSTGRES).with_schema(&schema);
/// let users: Vec<Record> = loader.get(&query.build(&Dialect::POSTGRES)?).await?;
/// ```
pub struct EagerLoader<'a> {
    executor: &'a dyn QueryExecutor,
    dialect: Dialect,
    config: EagerLoadConfig,
    schema: Option<&'a Schema>,
}

impl<'a> EagerLoader<'a> {
    pub fn new(executor: &'a dyn QueryExecutor, dialect: Dialect) -> Self {
        Self {
            executor,
            dialect,
            config: EagerLoadConfig::default(),
            schema: None,
        }
    }

    pub fn with_config(mut self, config: EagerLoadConfig) -> Self {
        self.config = config;
        self
    }

    /// Schema whose morph map resolves `MorphTo` discriminators.
    pub fn with_schema(mut self, schema: &'a Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn config(&self) -> &EagerLoadConfig {
        &self.config
    }

    /// Runs the root query, materializes its rows and loads every spec the
    /// query carries.
    #[instrument(skip(self, query), fields(table = %query.table().name(), specs = query.eager_loads().len()))]
    pub async fn get<T>(&self, query: &QueryResult) -> Result<Vec<T>>
    where
        T: AttributeAccess + FromRow + Clone + Send,
    {
        let rows = fetch_logged(self.executor, query, self.config.slow_query_threshold_ms).await?;
        let mut items = rows
            .into_iter()
            .map(|row| T::from_row(query.table(), row))
            .collect::<Result<Vec<T>>>()?;
        self.load(&mut items, query.eager_loads()).await?;
        Ok(items)
    }

    /// Loads `specs` onto caller-supplied instances.
    #[instrument(skip(self, parents, specs), fields(parents = parents.len(), specs = specs.len()))]
    pub async fn load<T>(&self, parents: &mut [T], specs: &[EagerLoadSpec]) -> Result<()>
    where
        T: AttributeAccess + FromRow + Clone + Send,
    {
        self.load_level(parents, specs, 1).await
    }

    fn load_level<'b, T>(
        &'b self,
        parents: &'b mut [T],
        specs: &'b [EagerLoadSpec],
        depth: usize,
    ) -> BoxFuture<'b, Result<()>>
    where
        T: AttributeAccess + FromRow + Clone + Send + 'b,
    {
        async move {
            if specs.is_empty() {
                return Ok(());
            }
            if depth > self.config.max_depth {
                return Err(SqlWeaveError::InvalidArgument(format!(
                    "Eager-load nesting exceeds max_depth {} at '{}'",
                    self.config.max_depth,
                    specs[0].attribute()
                )));
            }
            for spec in specs {
                if spec.relation().morph_to_keys().is_some() {
                    self.load_morph_to(parents, spec, depth).await?;
                } else {
                    self.load_spec(parents, spec, depth).await?;
                }
            }
            Ok(())
        }
        .boxed()
    }

    /// Distinct non-null parent key values, in first-seen order.
    fn parent_keys<T: AttributeAccess>(&self, parents: &[T], column: &str) -> Result<Vec<Value>> {
        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        for parent in parents {
            let value = read(parent, column)?;
            if let Some(key) = value.group_key() {
                if !self.config.dedupe_keys || seen.insert(key) {
                    keys.push(value);
                }
            }
        }
        Ok(keys)
    }

    async fn fetch<T: FromRow>(&self, query: &QueryResult, table: &TableRef) -> Result<Vec<T>> {
        let rows = fetch_logged(self.executor, query, self.config.slow_query_threshold_ms).await?;
        rows.into_iter().map(|row| T::from_row(table, row)).collect()
    }

    async fn load_spec<T>(&self, parents: &mut [T], spec: &EagerLoadSpec, depth: usize) -> Result<()>
    where
        T: AttributeAccess + FromRow + Clone + Send,
    {
        let relation = spec.relation();
        let attribute = relation.attribute();
        let related_table = relation.related_table("eager load")?;
        let parent_key = relation.parent_key();
        let keys = self.parent_keys(parents, parent_key)?;

        if keys.is_empty() {
            debug!(relation = attribute, "No parent keys, skipping query");
            for parent in parents.iter_mut() {
                let loaded = package(relation, Some(related_table), Vec::new())?;
                parent
                    .set_relation(attribute, loaded)
                    .map_err(|e| mapping_error(attribute, e))?;
            }
            return Ok(());
        }

        let key_count = keys.len();
        let query = generator::eager_query(relation, keys, spec.constraint())?.build(&self.dialect)?;
        let mut related: Vec<T> = self.fetch(&query, related_table).await?;
        debug!(
            relation = attribute,
            keys = key_count,
            rows = related.len(),
            "Eager-loaded relation"
        );

        self.load_level(&mut related, spec.nested(), depth + 1).await?;

        let group_key = relation.group_key();
        let mut groups: HashMap<GroupKey, Vec<T>> = HashMap::new();
        for item in related {
            if let Some(key) = read(&item, &group_key)?.group_key() {
                groups.entry(key).or_default().push(item);
            }
        }

        for parent in parents.iter_mut() {
            let matched = read(parent, parent_key)?
                .group_key()
                .and_then(|key| groups.get(&key))
                .cloned()
                .unwrap_or_default();
            let loaded = package(relation, Some(related_table), matched)?;
            parent
                .set_relation(attribute, loaded)
                .map_err(|e| mapping_error(attribute, e))?;
        }
        Ok(())
    }

    /// One query per distinct discriminator among the parents.
    async fn load_morph_to<T>(&self, parents: &mut [T], spec: &EagerLoadSpec, depth: usize) -> Result<()>
    where
        T: AttributeAccess + FromRow + Clone + Send,
    {
        let relation = spec.relation();
        let attribute = relation.attribute();
        let keys = relation.morph_to_keys().ok_or_else(|| SqlWeaveError::UnsupportedRelation {
            kind: relation.relation_type().name().to_string(),
            operation: "morphTo eager load".to_string(),
        })?;

        // discriminator -> owner ids, both in first-seen order
        let mut by_type: Vec<(String, Vec<Value>, HashSet<GroupKey>)> = Vec::new();
        for parent in parents.iter() {
            let Some(type_value) = discriminator(parent, &keys.type_column)? else {
                continue;
            };
            let id = read(parent, &keys.id_column)?;
            let Some(id_key) = id.group_key() else {
                continue;
            };
            let slot = match by_type.iter().position(|(t, _, _)| *t == type_value) {
                Some(i) => i,
                None => {
                    by_type.push((type_value, Vec::new(), HashSet::new()));
                    by_type.len() - 1
                }
            };
            let (_, ids, seen) = &mut by_type[slot];
            if seen.insert(id_key) {
                ids.push(id);
            }
        }

        let mut resolved: HashMap<String, HashMap<GroupKey, T>> = HashMap::new();
        for (type_value, ids, _) in by_type {
            let schema = self
                .schema
                .ok_or_else(|| SqlWeaveError::MorphTypeUnresolved(type_value.clone()))?;
            let table = schema.resolve_morph(&type_value)?;
            let (query, key_column) = generator::morph_to_query(relation, table, ids, spec.constraint())?;
            let query = query.build(&self.dialect)?;
            let mut items: Vec<T> = self.fetch(&query, table).await?;
            debug!(
                relation = attribute,
                morph_type = %type_value,
                rows = items.len(),
                "Eager-loaded morph target"
            );

            let nested: Vec<EagerLoadSpec> = spec
                .nested()
                .iter()
                .filter(|nested| nested.relation().owner().name() == table.name())
                .cloned()
                .collect();
            self.load_level(&mut items, &nested, depth + 1).await?;

            let mut by_key = HashMap::new();
            for item in items {
                if let Some(key) = read(&item, &key_column)?.group_key() {
                    by_key.entry(key).or_insert(item);
                }
            }
            resolved.insert(type_value, by_key);
        }

        for parent in parents.iter_mut() {
            let found = match discriminator(parent, &keys.type_column)? {
                Some(type_value) => read(parent, &keys.id_column)?
                    .group_key()
                    .and_then(|key| resolved.get(&type_value).and_then(|items| items.get(&key)))
                    .cloned(),
                None => None,
            };
            parent
                .set_relation(attribute, Loaded::One(found))
                .map_err(|e| mapping_error(attribute, e))?;
        }
        Ok(())
    }
}

/// Reads a morph discriminator; NULL means "no target".
fn discriminator<T: AttributeAccess>(parent: &T, column: &str) -> Result<Option<String>> {
    match read(parent, column)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        other => Err(SqlWeaveError::AttributeMapping {
            attribute: column.to_string(),
            reason: format!("discriminator must be text, got {}", other.sql_type_name()),
        }),
    }
}

/// Shapes the matched rows for the relation's attribute.
fn package<T>(relation: &Relation, related: Option<&TableRef>, matched: Vec<T>) -> Result<Loaded<T>>
where
    T: AttributeAccess + FromRow,
{
    if relation.is_singular() {
        if let Some(first) = matched.into_iter().next() {
            return Ok(Loaded::One(Some(first)));
        }
        let default = match (relation.default_attributes(), related) {
            (Some(attributes), Some(table)) => {
                Some(T::from_row(table, Row::from_pairs(attributes.iter().cloned()))?)
            }
            _ => None,
        };
        return Ok(Loaded::One(default));
    }

    match (relation.container(), related) {
        (ContainerKind::Set, Some(table)) => {
            let pk = table.primary_key_column();
            let mut seen = HashSet::new();
            let mut items = Vec::with_capacity(matched.len());
            for item in matched {
                let key = read(&item, pk)?.group_key();
                if key.map_or(true, |key| seen.insert(key)) {
                    items.push(item);
                }
            }
            Ok(Loaded::Set(items))
        }
        _ => Ok(Loaded::Many(matched)),
    }
}
