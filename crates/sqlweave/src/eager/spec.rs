//! Eager-load specification trees.

use std::sync::Arc;

use crate::expr::Constraint;
use crate::relation::Relation;
use crate::schema::Schema;
use crate::{Result, SqlWeaveError};

/// One relation to load, an optional constraint on its query, and the
/// relations to load on the rows it returns.
#[derive(Debug, Clone)]
pub struct EagerLoadSpec {
    relation: Arc<Relation>,
    constraint: Option<Constraint>,
    nested: Vec<EagerLoadSpec>,
}

impl EagerLoadSpec {
    pub fn new(relation: &Arc<Relation>) -> Self {
        Self {
            relation: relation.clone(),
            constraint: None,
            nested: Vec::new(),
        }
    }

    /// Scopes the batched query for this relation.
    pub fn constrain(mut self, constraint: Constraint) -> Self {
        self.constraint = Some(constraint);
        self
    }

    /// Loads `spec` on the rows this spec produces.
    pub fn with(mut self, spec: EagerLoadSpec) -> Self {
        self.push_nested(spec);
        self
    }

    fn push_nested(&mut self, spec: EagerLoadSpec) {
        match self
            .nested
            .iter_mut()
            .find(|existing| existing.attribute() == spec.attribute())
        {
            Some(existing) => existing.merge(spec),
            None => self.nested.push(spec),
        }
    }

    /// Folds another spec for the same attribute into this one. A constraint
    /// on `other` replaces this spec's; nested specs are merged recursively.
    pub fn merge(&mut self, other: EagerLoadSpec) {
        if other.constraint.is_some() {
            self.constraint = other.constraint;
        }
        for nested in other.nested {
            self.push_nested(nested);
        }
    }

    /// Resolves a dotted path such as `"posts.comments.author"` against the
    /// relations registered in `schema`, starting at `table`.
    pub fn parse(schema: &Schema, table: &str, path: &str) -> Result<Self> {
        let segments: Vec<&str> = path.split('.').collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(SqlWeaveError::InvalidArgument(format!(
                "Invalid eager-load path '{}'",
                path
            )));
        }

        let mut relations = Vec::with_capacity(segments.len());
        let mut current = table.to_string();
        for (i, segment) in segments.iter().enumerate() {
            let relation = schema.relation(&current, segment)?;
            if i + 1 < segments.len() {
                current = relation.related_table("nested eager-load path")?.name().to_string();
            }
            relations.push(relation.clone());
        }

        let mut spec: Option<EagerLoadSpec> = None;
        for relation in relations.iter().rev() {
            let mut parent = EagerLoadSpec::new(relation);
            if let Some(child) = spec.take() {
                parent.nested.push(child);
            }
            spec = Some(parent);
        }
        spec.ok_or_else(|| SqlWeaveError::InvalidArgument("Empty eager-load path".to_string()))
    }

    pub fn relation(&self) -> &Arc<Relation> {
        &self.relation
    }

    pub fn attribute(&self) -> &str {
        self.relation.attribute()
    }

    pub fn constraint(&self) -> Option<&Constraint> {
        self.constraint.as_ref()
    }

    pub fn nested(&self) -> &[EagerLoadSpec] {
        &self.nested
    }

    /// Levels in this tree, counting itself.
    pub fn depth(&self) -> usize {
        1 + self.nested.iter().map(EagerLoadSpec::depth).max().unwrap_or(0)
    }
}
