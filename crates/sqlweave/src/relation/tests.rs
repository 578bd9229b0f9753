use super::*;
use crate::expr::AggregateFunction;
use crate::schema::Table;

fn users() -> TableRef {
    Table::new("users", "User").shared()
}

fn roles() -> TableRef {
    Table::new("roles", "Role").shared()
}

fn posts() -> TableRef {
    Table::new("posts", "Post").shared()
}

#[test]
fn test_has_many_derives_owner_foreign_key() {
    let relation = Relation::has_many(&users(), &posts(), "posts").build().unwrap();
    assert_eq!(
        relation.kind(),
        &RelationKind::HasMany(ForeignKeys {
            foreign_key: "user_id".to_string(),
            local_key: "id".to_string(),
        })
    );
    assert_eq!(relation.parent_key(), "id");
    assert_eq!(relation.group_key(), "user_id");
    assert!(!relation.is_singular());
}

#[test]
fn test_belongs_to_derives_related_foreign_key() {
    let relation = Relation::belongs_to(&posts(), &users(), "author").build().unwrap();
    assert_eq!(
        relation.kind(),
        &RelationKind::BelongsTo(BelongsToKeys {
            foreign_key: "user_id".to_string(),
            owner_key: "id".to_string(),
        })
    );
    assert_eq!(relation.parent_key(), "user_id");
    assert_eq!(relation.group_key(), "id");
    assert!(relation.is_singular());
}

#[test]
fn test_explicit_keys_win() {
    let relation = Relation::has_many(&users(), &posts(), "posts")
        .foreign_key("author_id")
        .local_key("uuid")
        .build()
        .unwrap();
    assert_eq!(relation.parent_key(), "uuid");
    assert_eq!(relation.group_key(), "author_id");
}

#[test]
fn test_pivot_table_is_alphabetical_either_way() {
    let forward = Relation::belongs_to_many(&users(), &roles(), "roles").build().unwrap();
    let reverse = Relation::belongs_to_many(&roles(), &users(), "users").build().unwrap();

    assert_eq!(forward.pivot().unwrap().table, "role_user");
    assert_eq!(reverse.pivot().unwrap().table, "role_user");

    let pivot = forward.pivot().unwrap();
    assert_eq!(pivot.foreign_pivot_key, "user_id");
    assert_eq!(pivot.related_pivot_key, "role_id");
    assert_eq!(forward.group_key(), "pivot_user_id");
}

#[test]
fn test_pivot_timestamps_extend_columns() {
    let relation = Relation::belongs_to_many(&users(), &roles(), "roles")
        .with_pivot(&["granted_by"])
        .with_timestamps()
        .build()
        .unwrap();
    assert_eq!(
        relation.pivot().unwrap().extra_columns(),
        vec!["granted_by", "created_at", "updated_at"]
    );
}

#[test]
fn test_through_keys() {
    let countries = Table::new("countries", "Country").shared();
    let relation = Relation::has_many_through(&countries, &users(), &posts(), "posts")
        .build()
        .unwrap();
    match relation.kind() {
        RelationKind::HasManyThrough(keys) => {
            assert_eq!(keys.through.name(), "users");
            assert_eq!(keys.first_key, "country_id");
            assert_eq!(keys.second_key, "user_id");
            assert_eq!(keys.second_local_key, "id");
        }
        other => panic!("unexpected kind {other:?}"),
    }
    assert_eq!(relation.group_key(), THROUGH_KEY_ALIAS);
}

#[test]
fn test_morph_many_keys() {
    let images = Table::new("images", "Image").shared();
    let relation = Relation::morph_many(&posts(), &images, "images", "imageable")
        .build()
        .unwrap();
    assert_eq!(relation.morph_filter(), Some(("imageable_type", "Post")));
    assert_eq!(relation.group_key(), "imageable_id");
}

#[test]
fn test_morph_to_many_and_inverse_share_pivot() {
    let tags = Table::new("tags", "Tag").shared();
    let forward = Relation::morph_to_many(&posts(), &tags, "tags", "taggable")
        .build()
        .unwrap();
    let inverse = Relation::morphed_by_many(&tags, &posts(), "posts", "taggable")
        .build()
        .unwrap();

    let forward_pivot = forward.pivot().unwrap();
    assert_eq!(forward_pivot.table, "taggables");
    assert_eq!(forward_pivot.foreign_pivot_key, "taggable_id");
    assert_eq!(forward_pivot.related_pivot_key, "tag_id");
    assert_eq!(forward.morph_filter(), Some(("taggable_type", "Post")));

    let inverse_pivot = inverse.pivot().unwrap();
    assert_eq!(inverse_pivot.table, "taggables");
    assert_eq!(inverse_pivot.foreign_pivot_key, "tag_id");
    assert_eq!(inverse_pivot.related_pivot_key, "taggable_id");
    assert_eq!(inverse.morph_filter(), Some(("taggable_type", "Post")));
}

#[test]
fn test_morph_to_has_no_static_related_table() {
    let comments = Table::new("comments", "Comment").shared();
    let relation = Relation::morph_to(&comments, "commentable", "commentable")
        .build()
        .unwrap();
    assert_eq!(relation.parent_key(), "commentable_id");
    assert!(matches!(
        relation.related_table("where_has"),
        Err(SqlWeaveError::UnsupportedRelation { .. })
    ));
}

#[test]
fn test_of_many_defaults() {
    let latest = Relation::latest_of_many(&users(), &posts(), "latest_post")
        .build()
        .unwrap();
    let keys = latest.of_many_keys().unwrap();
    assert_eq!(keys.column, "id");
    assert_eq!(keys.aggregate, AggregateFunction::Max);
    assert!(latest.is_singular());

    let oldest = Relation::oldest_of_many(&users(), &posts(), "first_post")
        .of_many_column("created_at")
        .build()
        .unwrap();
    assert_eq!(oldest.of_many_keys().unwrap().aggregate, AggregateFunction::Min);
    assert_eq!(oldest.of_many_keys().unwrap().column, "created_at");
}

#[test]
fn test_invalid_key_rejected() {
    let result = Relation::has_many(&users(), &posts(), "posts")
        .foreign_key("user_id; DROP TABLE posts")
        .build();
    assert!(result.is_err());
}

#[test]
fn test_container_and_default() {
    let relation = Relation::has_many(&users(), &roles(), "roles")
        .as_set()
        .build()
        .unwrap();
    assert_eq!(relation.container(), ContainerKind::Set);

    let relation = Relation::has_one(&users(), &posts(), "profile")
        .with_default([("title", "Untitled")])
        .build()
        .unwrap();
    assert_eq!(
        relation.default_attributes(),
        Some(&[("title".to_string(), Value::String("Untitled".to_string()))][..])
    );
}
