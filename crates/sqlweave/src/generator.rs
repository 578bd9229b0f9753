//! Relation-aware subquery generation.
//!
//! Turns a [`Relation`] into the nested query it stands for: the related
//! table, the pivot or through join its kind requires, and the implicit
//! predicates (correlation or key batch, morph discriminator, one-of-many
//! pick, through-table soft delete). Correlated forms back `where_has`,
//! `has` and `with_count`; batched forms back eager loading.
//!
//! Implicit predicates live in the builder's scope list, so a caller's
//! constraint can add to the nested query but never drop the correlation.

use std::sync::Arc;

use crate::dialect::Dialect;
use crate::expr::{
    AggregateFunction, ColumnRef, Constraint, JoinType, Operator, ParamSink, Predicate, SelectItem,
    SubqueryKind,
};
use crate::query::{JoinClause, QueryBuilder};
use crate::relation::{JoinPath, Relation, RelationKind, THROUGH_KEY_ALIAS};
use crate::schema::{naming, TableRef};
use crate::{Result, SqlWeaveError, Value};

/// Builder over the related table with the relation's join in place.
///
/// The related table gets an alias when it would otherwise collide with
/// the correlated owner (self relations).
fn base_query(relation: &Arc<Relation>, related: &TableRef, owner_alias: Option<&str>) -> Result<QueryBuilder> {
    let mut query = QueryBuilder::new(related)?;
    if owner_alias == Some(related.name()) {
        query = query.alias(&format!("{}_related", related.name()))?;
    }
    query.relation = Some(relation.clone());

    let reference = query.reference_name().to_string();
    match relation.join_path() {
        JoinPath::Direct => {}
        JoinPath::Pivot(pivot) => {
            let on = Predicate::columns_eq(
                ColumnRef::qualified(&pivot.table, &pivot.related_pivot_key),
                ColumnRef::qualified(&reference, &pivot.related_key),
            );
            query.joins.push(JoinClause::new(JoinType::Inner, &pivot.table, None, on)?);
        }
        JoinPath::Through(through) => {
            let on = Predicate::columns_eq(
                ColumnRef::qualified(through.through.name(), &through.second_local_key),
                ColumnRef::qualified(&reference, &through.second_key),
            );
            query
                .joins
                .push(JoinClause::new(JoinType::Inner, through.through.name(), None, on)?);
        }
    }
    Ok(query)
}

/// Column on the nested query that holds the owner-side key value.
fn related_side_key(relation: &Relation, reference: &str) -> Result<ColumnRef> {
    Ok(match relation.kind() {
        RelationKind::HasOne(keys) | RelationKind::HasMany(keys) => {
            ColumnRef::qualified(reference, &keys.foreign_key)
        }
        RelationKind::BelongsTo(keys) => ColumnRef::qualified(reference, &keys.owner_key),
        RelationKind::BelongsToMany(pivot) => ColumnRef::qualified(&pivot.table, &pivot.foreign_pivot_key),
        RelationKind::MorphToMany(morph) | RelationKind::MorphedByMany(morph) => {
            ColumnRef::qualified(&morph.pivot.table, &morph.pivot.foreign_pivot_key)
        }
        RelationKind::HasOneThrough(keys) | RelationKind::HasManyThrough(keys) => {
            ColumnRef::qualified(keys.through.name(), &keys.first_key)
        }
        RelationKind::MorphOne(keys) | RelationKind::MorphMany(keys) => {
            ColumnRef::qualified(reference, &keys.id_column)
        }
        RelationKind::LatestOfMany(keys)
        | RelationKind::OldestOfMany(keys)
        | RelationKind::OfMany(keys) => ColumnRef::qualified(reference, &keys.foreign_key),
        RelationKind::MorphTo(_) => {
            return Err(SqlWeaveError::UnsupportedRelation {
                kind: relation.relation_type().name().to_string(),
                operation: "correlate".to_string(),
            })
        }
    })
}

/// Discriminator, one-of-many pick and through-table soft delete.
fn add_relation_filters(relation: &Arc<Relation>, related: &TableRef, query: &mut QueryBuilder) -> Result<()> {
    let reference = query.reference_name().to_string();

    if let Some((column, value)) = relation.morph_filter() {
        let qualifier = match relation.pivot() {
            Some(pivot) => pivot.table.as_str(),
            None => reference.as_str(),
        };
        query
            .scope
            .push(Predicate::eq(ColumnRef::qualified(qualifier, column), value));
    }

    if let Some(keys) = relation.of_many_keys() {
        let inner_alias = format!("{}_of_many", relation.attribute());
        let mut pick = QueryBuilder::new(related)?.alias(&inner_alias)?;
        pick.select_items.push(SelectItem::aggregate(
            keys.aggregate,
            Some(ColumnRef::qualified(&inner_alias, &keys.column)),
            None,
        ));
        pick.scope.push(Predicate::columns_eq(
            ColumnRef::qualified(&inner_alias, &keys.foreign_key),
            ColumnRef::qualified(&reference, &keys.foreign_key),
        ));
        query.scope.push(Predicate::compare_subquery(
            ColumnRef::qualified(&reference, &keys.column),
            Operator::Eq,
            pick,
        ));
    }

    if let JoinPath::Through(through) = relation.join_path() {
        if let Some(column) = through.through.soft_delete_column() {
            query
                .scope
                .push(Predicate::is_null(ColumnRef::qualified(through.through.name(), column)));
        }
    }

    Ok(())
}

fn apply_constraint(query: QueryBuilder, constraint: Option<&Constraint>) -> Result<QueryBuilder> {
    match constraint {
        Some(constraint) => constraint.apply(query),
        None => Ok(query),
    }
}

/// Related rows correlated with `owner_alias`, constraint applied.
fn correlated_query(
    relation: &Arc<Relation>,
    constraint: Option<&Constraint>,
    owner_alias: &str,
    operation: &str,
) -> Result<QueryBuilder> {
    let related = relation.related_table(operation)?;
    let mut query = base_query(relation, related, Some(owner_alias))?;
    let side = related_side_key(relation, query.reference_name())?;
    query.scope.push(Predicate::columns_eq(
        side,
        ColumnRef::qualified(owner_alias, relation.parent_key()),
    ));
    add_relation_filters(relation, related, &mut query)?;
    apply_constraint(query, constraint)
}

/// `[NOT] EXISTS (SELECT 1 FROM related ... WHERE correlation AND constraint)`
pub(crate) fn render_exists(
    relation: &Arc<Relation>,
    constraint: Option<&Constraint>,
    negate: bool,
    owner_alias: &str,
    dialect: &Dialect,
    sink: &mut ParamSink,
) -> Result<String> {
    let mut query = correlated_query(relation, constraint, owner_alias, "whereHas")?;
    query.select_items = vec![SelectItem::raw("1")];
    let sql = query.render_into(dialect, sink)?;
    let keyword = if negate { "NOT EXISTS" } else { "EXISTS" };
    Ok(format!("{} ({})", keyword, sql))
}

/// `(SELECT COUNT(*) FROM related ...) <op> :pN`
pub(crate) fn render_count(
    relation: &Arc<Relation>,
    operator: Operator,
    count: i64,
    constraint: Option<&Constraint>,
    owner_alias: &str,
    dialect: &Dialect,
    sink: &mut ParamSink,
) -> Result<String> {
    if !operator.is_comparison() {
        return Err(SqlWeaveError::InvalidArgument(format!(
            "Relation count needs a comparison operator, got {}",
            operator
        )));
    }
    let mut query = correlated_query(relation, constraint, owner_alias, "has")?;
    query.select_items = vec![SelectItem::aggregate(AggregateFunction::Count, None, None)];
    query.order_by.clear();
    let sql = query.render_into(dialect, sink)?;
    let placeholder = sink.bind(dialect, count);
    Ok(format!("({}) {} {}", sql, operator.to_sql(), placeholder))
}

/// Scalar subquery for `with_count`/`with_sum`/... or EXISTS for `with_exists`.
pub(crate) fn render_aggregate(
    kind: SubqueryKind,
    relation: &Arc<Relation>,
    column: Option<&str>,
    constraint: Option<&Constraint>,
    owner_alias: &str,
    dialect: &Dialect,
    sink: &mut ParamSink,
) -> Result<String> {
    let mut query = correlated_query(relation, constraint, owner_alias, "withAggregate")?;
    let function = match kind.aggregate() {
        Some(function) => function,
        None => {
            query.select_items = vec![SelectItem::raw("1")];
            let exists = format!("EXISTS ({})", query.render_into(dialect, sink)?);
            return Ok(dialect.exists_flag(&exists));
        }
    };
    let target = match (function, column) {
        (AggregateFunction::Count, None) => None,
        (_, Some(column)) => {
            let column = ColumnRef::new(column);
            Some(match column.qualifier() {
                Some(_) => column,
                None => ColumnRef::qualified(query.reference_name(), column.name()),
            })
        }
        (_, None) => {
            return Err(SqlWeaveError::InvalidArgument(format!(
                "{} over relation '{}' needs a column",
                function.to_sql(),
                relation.attribute()
            )))
        }
    };
    query.select_items = vec![SelectItem::aggregate(function, target, None)];
    query.order_by.clear();
    Ok(format!("({})", query.render_into(dialect, sink)?))
}

/// OR over the candidate `MorphTo` targets:
/// `owner.type = :p AND EXISTS (SELECT 1 FROM target WHERE target.key = owner.id ...)`.
pub(crate) fn render_morph_exists(
    relation: &Arc<Relation>,
    types: &[TableRef],
    constraint: Option<&Constraint>,
    negate: bool,
    owner_alias: &str,
    dialect: &Dialect,
    sink: &mut ParamSink,
) -> Result<String> {
    let keys = relation.morph_to_keys().ok_or_else(|| SqlWeaveError::UnsupportedRelation {
        kind: relation.relation_type().name().to_string(),
        operation: "whereHasMorph".to_string(),
    })?;

    let mut branches = Vec::with_capacity(types.len());
    for table in types {
        let mut query = QueryBuilder::new(table)?;
        if owner_alias == table.name() {
            query = query.alias(&format!("{}_related", table.name()))?;
        }
        query.relation = Some(relation.clone());
        let target_key = keys
            .owner_key
            .as_deref()
            .unwrap_or_else(|| table.primary_key_column());
        query.scope.push(Predicate::columns_eq(
            ColumnRef::qualified(query.reference_name(), target_key),
            ColumnRef::qualified(owner_alias, &keys.id_column),
        ));
        let mut query = apply_constraint(query, constraint)?;
        query.select_items = vec![SelectItem::raw("1")];

        branches.push(
            Predicate::eq(ColumnRef::qualified(owner_alias, &keys.type_column), table.entity())
                .and(Predicate::exists(query)),
        );
    }

    let tree = branches.into_iter().reduce(Predicate::or).ok_or_else(|| {
        SqlWeaveError::InvalidArgument("whereHasMorph needs at least one candidate type".to_string())
    })?;
    let sql = tree.render(dialect, sink)?;
    Ok(if negate {
        format!("NOT ({})", sql)
    } else {
        format!("({})", sql)
    })
}

fn selects_column(items: &[SelectItem], name: &str) -> bool {
    items.iter().any(|item| match item {
        SelectItem::Column { column, alias } => {
            column.name() == "*" || alias.as_deref().unwrap_or_else(|| column.name()) == name
        }
        other => other.alias() == Some(name),
    })
}

/// Batched query for eager loading: related rows whose owner-side key is in
/// `keys`, with the key alias the loader groups by.
pub(crate) fn eager_query(
    relation: &Arc<Relation>,
    keys: Vec<Value>,
    constraint: Option<&Constraint>,
) -> Result<QueryBuilder> {
    let related = relation.related_table("eager load")?;
    let mut query = base_query(relation, related, None)?;
    let reference = query.reference_name().to_string();
    let side = related_side_key(relation, &reference)?;
    query.scope.push(Predicate::in_list(side, keys));
    add_relation_filters(relation, related, &mut query)?;
    let mut query = apply_constraint(query, constraint)?;

    let mut items = if query.select_items.is_empty() {
        vec![SelectItem::column(ColumnRef::qualified(&reference, "*"))]
    } else {
        std::mem::take(&mut query.select_items)
    };

    match relation.join_path() {
        JoinPath::Direct => {
            let group_key = relation.group_key();
            if !selects_column(&items, &group_key) {
                items.push(SelectItem::column(ColumnRef::qualified(&reference, &group_key)));
            }
        }
        JoinPath::Pivot(pivot) => {
            let mut pivot_columns = vec![pivot.foreign_pivot_key.clone()];
            pivot_columns.extend(pivot.extra_columns());
            for column in pivot_columns {
                let alias = naming::pivot_alias(&column);
                if !items.iter().any(|item| item.alias() == Some(alias.as_str())) {
                    items.push(SelectItem::column_as(
                        ColumnRef::qualified(&pivot.table, &column),
                        &alias,
                    ));
                }
            }
        }
        JoinPath::Through(through) => {
            if !items.iter().any(|item| item.alias() == Some(THROUGH_KEY_ALIAS)) {
                items.push(SelectItem::column_as(
                    ColumnRef::qualified(through.through.name(), &through.first_key),
                    THROUGH_KEY_ALIAS,
                ));
            }
        }
    }

    query.select_items = items;
    Ok(query)
}

/// Batched query for one `MorphTo` target table. Returns the query and the
/// target column the loader matches owner ids against.
pub(crate) fn morph_to_query(
    relation: &Arc<Relation>,
    table: &TableRef,
    keys: Vec<Value>,
    constraint: Option<&Constraint>,
) -> Result<(QueryBuilder, String)> {
    let morph = relation.morph_to_keys().ok_or_else(|| SqlWeaveError::UnsupportedRelation {
        kind: relation.relation_type().name().to_string(),
        operation: "morphTo eager load".to_string(),
    })?;
    let key_column = morph
        .owner_key
        .clone()
        .unwrap_or_else(|| table.primary_key_column().to_string());

    let mut query = QueryBuilder::new(table)?;
    query.relation = Some(relation.clone());
    query
        .scope
        .push(Predicate::in_list(ColumnRef::qualified(table.name(), &key_column), keys));
    let mut query = apply_constraint(query, constraint)?;

    if !query.select_items.is_empty() && !selects_column(&query.select_items, &key_column) {
        let reference = query.reference_name().to_string();
        query
            .select_items
            .push(SelectItem::column(ColumnRef::qualified(&reference, &key_column)));
    }

    Ok((query, key_column))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation::Relation;
    use crate::schema::Table;

    fn tables() -> (TableRef, TableRef, TableRef) {
        (
            Table::new("users", "User").shared(),
            Table::new("posts", "Post").soft_deletes("deleted_at").shared(),
            Table::new("roles", "Role").shared(),
        )
    }

    #[test]
    fn exists_correlates_on_foreign_key() {
        let (users, posts, _) = tables();
        let relation = Relation::has_many(&users, &posts, "posts").build().unwrap();
        let mut sink = ParamSink::new();
        let sql = render_exists(&relation, None, false, "users", &Dialect::POSTGRES, &mut sink).unwrap();
        assert_eq!(
            sql,
            "EXISTS (SELECT 1 FROM \"posts\" WHERE \"posts\".\"user_id\" = \"users\".\"id\" AND \"posts\".\"deleted_at\" IS NULL)"
        );
        assert!(sink.is_empty());
    }

    #[test]
    fn pivot_exists_joins_pivot_table() {
        let (users, _, roles) = tables();
        let relation = Relation::belongs_to_many(&users, &roles, "roles").build().unwrap();
        for dialect in Dialect::BUILT_IN {
            let mut sink = ParamSink::new();
            let sql = render_exists(&relation, None, false, "users", &dialect, &mut sink).unwrap();
            let q = |s: &str| dialect.quote_identifier(s);
            assert!(sql.contains(&format!(
                "INNER JOIN {} ON {}.{} = {}.{}",
                q("role_user"),
                q("role_user"),
                q("role_id"),
                q("roles"),
                q("id")
            )));
            assert!(sql.contains(&format!(
                "{}.{} = {}.{}",
                q("role_user"),
                q("user_id"),
                q("users"),
                q("id")
            )));
        }
    }

    #[test]
    fn constraint_stays_inside_subquery() {
        let (users, posts, _) = tables();
        let relation = Relation::has_many(&users, &posts, "posts").build().unwrap();
        let constraint = Constraint::new(|q| Ok(q.where_predicate(Predicate::eq("posts.published", true))));
        let mut sink = ParamSink::new();
        let sql = render_exists(&relation, Some(&constraint), true, "u", &Dialect::POSTGRES, &mut sink).unwrap();
        assert_eq!(
            sql,
            "NOT EXISTS (SELECT 1 FROM \"posts\" WHERE \"posts\".\"user_id\" = \"u\".\"id\" AND \"posts\".\"published\" = :p1 AND \"posts\".\"deleted_at\" IS NULL)"
        );
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn count_binds_after_subquery_params() {
        let (users, posts, _) = tables();
        let relation = Relation::has_many(&users, &posts, "posts").build().unwrap();
        let constraint = Constraint::new(|q| q.where_clause("posts.votes", Operator::Gt, 10));
        let mut sink = ParamSink::new();
        let sql = render_count(
            &relation,
            Operator::Gte,
            3,
            Some(&constraint),
            "users",
            &Dialect::POSTGRES,
            &mut sink,
        )
        .unwrap();
        assert!(sql.starts_with("(SELECT COUNT(*) FROM \"posts\""));
        assert!(sql.ends_with(") >= :p2"));
        let params = sink.into_params();
        assert_eq!(params[0].1, Value::Int(10));
        assert_eq!(params[1].1, Value::BigInt(3));
    }

    #[test]
    fn count_rejects_non_comparison() {
        let (users, posts, _) = tables();
        let relation = Relation::has_many(&users, &posts, "posts").build().unwrap();
        let mut sink = ParamSink::new();
        let err = render_count(&relation, Operator::Like, 1, None, "users", &Dialect::POSTGRES, &mut sink);
        assert!(matches!(err, Err(SqlWeaveError::InvalidArgument(_))));
    }

    #[test]
    fn self_relation_aliases_related_table() {
        let users = Table::new("users", "User").shared();
        let relation = Relation::has_many(&users, &users, "children")
            .foreign_key("parent_id")
            .build()
            .unwrap();
        let mut sink = ParamSink::new();
        let sql = render_exists(&relation, None, false, "users", &Dialect::POSTGRES, &mut sink).unwrap();
        assert_eq!(
            sql,
            "EXISTS (SELECT 1 FROM \"users\" AS \"users_related\" WHERE \"users_related\".\"parent_id\" = \"users\".\"id\")"
        );

        let mut sink = ParamSink::new();
        let sql = render_exists(&relation, None, false, "users", &Dialect::ORACLE, &mut sink).unwrap();
        assert!(sql.starts_with("EXISTS (SELECT 1 FROM \"users\" \"users_related\" WHERE"));
    }

    #[test]
    fn sum_requires_column() {
        let (users, posts, _) = tables();
        let relation = Relation::has_many(&users, &posts, "posts").build().unwrap();
        let mut sink = ParamSink::new();
        let err = render_aggregate(SubqueryKind::Sum, &relation, None, None, "users", &Dialect::POSTGRES, &mut sink);
        assert!(matches!(err, Err(SqlWeaveError::InvalidArgument(_))));

        let sql = render_aggregate(
            SubqueryKind::Sum,
            &relation,
            Some("votes"),
            None,
            "users",
            &Dialect::POSTGRES,
            &mut sink,
        )
        .unwrap();
        assert!(sql.starts_with("(SELECT SUM(\"posts\".\"votes\") FROM \"posts\""));
    }

    #[test]
    fn latest_of_many_picks_max() {
        let (users, posts, _) = tables();
        let relation = Relation::latest_of_many(&users, &posts, "latest_post")
            .of_many_column("created_at")
            .build()
            .unwrap();
        let query = eager_query(&relation, vec![Value::Int(1)], None).unwrap();
        let sql = query.build(&Dialect::POSTGRES).unwrap();
        assert_eq!(
            sql.sql(),
            "SELECT \"posts\".* FROM \"posts\" WHERE \"posts\".\"user_id\" IN (:p1) AND \"posts\".\"created_at\" = (SELECT MAX(\"latest_post_of_many\".\"created_at\") FROM \"posts\" AS \"latest_post_of_many\" WHERE \"latest_post_of_many\".\"user_id\" = \"posts\".\"user_id\" AND \"latest_post_of_many\".\"deleted_at\" IS NULL) AND \"posts\".\"deleted_at\" IS NULL"
        );
    }

    #[test]
    fn eager_pivot_query_selects_pivot_key() {
        let (users, _, roles) = tables();
        let relation = Relation::belongs_to_many(&users, &roles, "roles")
            .with_pivot(&["level"])
            .build()
            .unwrap();
        let query = eager_query(&relation, vec![Value::Int(1), Value::Int(2)], None).unwrap();
        let sql = query.build(&Dialect::POSTGRES).unwrap();
        assert_eq!(
            sql.sql(),
            "SELECT \"roles\".*, \"role_user\".\"user_id\" AS \"pivot_user_id\", \"role_user\".\"level\" AS \"pivot_level\" FROM \"roles\" INNER JOIN \"role_user\" ON \"role_user\".\"role_id\" = \"roles\".\"id\" WHERE \"role_user\".\"user_id\" IN (:p1, :p2)"
        );
    }
}
