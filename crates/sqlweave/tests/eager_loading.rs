//! Integration tests for the eager loader.
//!
//! A recording executor stands in for the database: it returns canned rows
//! per table and logs every statement, so the tests can assert exactly how
//! many queries a load costs.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use sqlweave::{
    AggregateFunction, AttributeAccess, Dialect, EagerLoadConfig, EagerLoadSpec, EagerLoader, FromRow, Loaded,
    QueryBuilder, QueryExecutor, QueryResult, Record, Relation, Result, Row, Schema,
    SqlWeaveError, Table, TableRef, Value,
};

#[derive(Default)]
struct RecordingExecutor {
    tables: HashMap<String, Vec<Row>>,
    log: Mutex<Vec<String>>,
}

impl RecordingExecutor {
    fn with_rows(mut self, table: &str, rows: Vec<Row>) -> Self {
        self.tables.insert(table.to_string(), rows);
        self
    }

    fn statements(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryExecutor for RecordingExecutor {
    async fn fetch_all(&self, query: &QueryResult) -> Result<Vec<Row>> {
        self.log.lock().unwrap().push(query.sql().to_string());
        Ok(self
            .tables
            .get(query.table().name())
            .cloned()
            .unwrap_or_default())
    }
}

fn row(pairs: &[(&str, Value)]) -> Row {
    Row::from_pairs(pairs.iter().cloned())
}

fn text(s: &str) -> Value {
    Value::String(s.to_string())
}

fn users() -> TableRef {
    Table::new("users", "User").shared()
}

fn posts() -> TableRef {
    Table::new("posts", "Post").soft_deletes("deleted_at").shared()
}

fn ids(records: &[&Record]) -> Vec<Value> {
    records
        .iter()
        .map(|r| r.value("id").cloned().unwrap_or(Value::Null))
        .collect()
}

// ============================================================================
// Query count
// ============================================================================

#[tokio::test]
async fn test_no_parents_issues_no_relation_query() {
    let user_posts = Relation::has_many(&users(), &posts(), "posts").build().unwrap();
    let db = RecordingExecutor::default();

    let query = QueryBuilder::new(&users())
        .unwrap()
        .with(EagerLoadSpec::new(&user_posts))
        .build(&Dialect::POSTGRES)
        .unwrap();
    let loaded: Vec<Record> = EagerLoader::new(&db, Dialect::POSTGRES).get(&query).await.unwrap();

    assert!(loaded.is_empty());
    assert_eq!(db.statements().len(), 1);
}

#[tokio::test]
async fn test_one_query_per_relation_regardless_of_parent_count() {
    let user_posts = Relation::has_many(&users(), &posts(), "posts").build().unwrap();

    for count in [1_i64, 1000] {
        let parents = (1..=count).map(|id| row(&[("id", Value::BigInt(id))])).collect();
        let db = RecordingExecutor::default()
            .with_rows("users", parents)
            .with_rows(
                "posts",
                vec![row(&[("id", Value::Int(10)), ("user_id", Value::BigInt(1))])],
            );

        let query = QueryBuilder::new(&users())
            .unwrap()
            .with(EagerLoadSpec::new(&user_posts))
            .build(&Dialect::POSTGRES)
            .unwrap();
        let loaded: Vec<Record> = EagerLoader::new(&db, Dialect::POSTGRES).get(&query).await.unwrap();

        assert_eq!(loaded.len() as i64, count);
        let statements = db.statements();
        assert_eq!(statements.len(), 2);
        assert!(statements[1].starts_with(
            "SELECT \"posts\".* FROM \"posts\" WHERE \"posts\".\"user_id\" IN (:p1"
        ));
        assert_eq!(loaded[0].related("posts").len(), 1);
    }
}

#[tokio::test]
async fn test_nested_specs_cost_one_query_per_level() {
    let comments = Table::new("comments", "Comment").shared();
    let user_posts = Relation::has_many(&users(), &posts(), "posts").build().unwrap();
    let post_comments = Relation::has_many(&posts(), &comments, "comments").build().unwrap();

    let db = RecordingExecutor::default()
        .with_rows(
            "users",
            vec![row(&[("id", Value::Int(1))]), row(&[("id", Value::Int(2))])],
        )
        .with_rows(
            "posts",
            vec![
                row(&[("id", Value::Int(10)), ("user_id", Value::Int(1))]),
                row(&[("id", Value::Int(11)), ("user_id", Value::Int(2))]),
            ],
        )
        .with_rows(
            "comments",
            vec![
                row(&[("id", Value::Int(100)), ("post_id", Value::Int(10))]),
                row(&[("id", Value::Int(101)), ("post_id", Value::Int(10))]),
            ],
        );

    let query = QueryBuilder::new(&users())
        .unwrap()
        .with(EagerLoadSpec::new(&user_posts).with(EagerLoadSpec::new(&post_comments)))
        .build(&Dialect::POSTGRES)
        .unwrap();
    let loaded: Vec<Record> = EagerLoader::new(&db, Dialect::POSTGRES).get(&query).await.unwrap();

    assert_eq!(db.statements().len(), 3);
    let first_post = loaded[0].related("posts")[0];
    assert_eq!(ids(&first_post.related("comments")), vec![Value::Int(100), Value::Int(101)]);
    let second_post = loaded[1].related("posts")[0];
    assert!(second_post.related("comments").is_empty());
}

#[tokio::test]
async fn test_with_path_loads_through_schema() {
    let comments = Table::new("comments", "Comment").shared();
    let user_posts = Relation::has_many(&users(), &posts(), "posts").build().unwrap();
    let post_comments = Relation::has_many(&posts(), &comments, "comments").build().unwrap();
    let schema = Schema::new()
        .add_table(users())
        .add_table(posts())
        .add_table(comments)
        .add_relation(user_posts)
        .add_relation(post_comments);

    let db = RecordingExecutor::default()
        .with_rows("users", vec![row(&[("id", Value::Int(1))])])
        .with_rows("posts", vec![row(&[("id", Value::Int(10)), ("user_id", Value::Int(1))])]);

    let query = QueryBuilder::new(&users())
        .unwrap()
        .with_path(&schema, "posts.comments")
        .unwrap()
        .build(&Dialect::POSTGRES)
        .unwrap();
    let loaded: Vec<Record> = EagerLoader::new(&db, Dialect::POSTGRES).get(&query).await.unwrap();

    assert_eq!(db.statements().len(), 3);
    let post = loaded[0].related("posts")[0];
    assert!(matches!(post.relation("comments"), Some(Loaded::Many(items)) if items.is_empty()));
}

// ============================================================================
// Relation kinds
// ============================================================================

#[tokio::test]
async fn test_belongs_to_many_groups_by_pivot_key() {
    let roles = Table::new("roles", "Role").shared();
    let user_roles = Relation::belongs_to_many(&users(), &roles, "roles").build().unwrap();

    let db = RecordingExecutor::default()
        .with_rows(
            "users",
            vec![row(&[("id", Value::Int(1))]), row(&[("id", Value::Int(2))])],
        )
        .with_rows(
            "roles",
            vec![
                row(&[("id", Value::Int(7)), ("name", text("admin")), ("pivot_user_id", Value::Int(1))]),
                row(&[("id", Value::Int(8)), ("name", text("editor")), ("pivot_user_id", Value::Int(1))]),
                row(&[("id", Value::Int(7)), ("name", text("admin")), ("pivot_user_id", Value::Int(2))]),
            ],
        );

    let query = QueryBuilder::new(&users())
        .unwrap()
        .with(EagerLoadSpec::new(&user_roles))
        .build(&Dialect::POSTGRES)
        .unwrap();
    let loaded: Vec<Record> = EagerLoader::new(&db, Dialect::POSTGRES).get(&query).await.unwrap();

    let statements = db.statements();
    assert_eq!(statements.len(), 2);
    assert!(statements[1].contains("INNER JOIN \"role_user\" ON \"role_user\".\"role_id\" = \"roles\".\"id\""));
    assert!(statements[1].contains("\"role_user\".\"user_id\" AS \"pivot_user_id\""));

    assert_eq!(ids(&loaded[0].related("roles")), vec![Value::Int(7), Value::Int(8)]);
    assert_eq!(ids(&loaded[1].related("roles")), vec![Value::Int(7)]);
}

#[tokio::test]
async fn test_set_container_dedupes_by_primary_key() {
    let roles = Table::new("roles", "Role").shared();
    let user_roles = Relation::belongs_to_many(&users(), &roles, "roles")
        .as_set()
        .build()
        .unwrap();

    let db = RecordingExecutor::default()
        .with_rows("users", vec![row(&[("id", Value::Int(1))])])
        .with_rows(
            "roles",
            vec![
                row(&[("id", Value::Int(7)), ("pivot_user_id", Value::Int(1))]),
                row(&[("id", Value::Int(7)), ("pivot_user_id", Value::Int(1))]),
            ],
        );

    let query = QueryBuilder::new(&users())
        .unwrap()
        .with(EagerLoadSpec::new(&user_roles))
        .build(&Dialect::POSTGRES)
        .unwrap();
    let loaded: Vec<Record> = EagerLoader::new(&db, Dialect::POSTGRES).get(&query).await.unwrap();

    match loaded[0].relation("roles") {
        Some(Loaded::Set(items)) => assert_eq!(items.len(), 1),
        other => panic!("expected a set, got {other:?}"),
    }
}

#[tokio::test]
async fn test_has_many_through_groups_by_through_key() {
    let countries = Table::new("countries", "Country").shared();
    let country_posts = Relation::has_many_through(&countries, &users(), &posts(), "posts")
        .build()
        .unwrap();

    let db = RecordingExecutor::default()
        .with_rows(
            "countries",
            vec![row(&[("id", Value::Int(1))]), row(&[("id", Value::Int(2))])],
        )
        .with_rows(
            "posts",
            vec![
                row(&[("id", Value::Int(10)), ("through_key", Value::Int(2))]),
                row(&[("id", Value::Int(11)), ("through_key", Value::Int(2))]),
            ],
        );

    let query = QueryBuilder::new(&countries)
        .unwrap()
        .with(EagerLoadSpec::new(&country_posts))
        .build(&Dialect::POSTGRES)
        .unwrap();
    let loaded: Vec<Record> = EagerLoader::new(&db, Dialect::POSTGRES).get(&query).await.unwrap();

    let statements = db.statements();
    assert!(statements[1].contains("INNER JOIN \"users\" ON \"users\".\"id\" = \"posts\".\"user_id\""));
    assert!(statements[1].contains("\"users\".\"country_id\" AS \"through_key\""));
    assert!(loaded[0].related("posts").is_empty());
    assert_eq!(ids(&loaded[1].related("posts")), vec![Value::Int(10), Value::Int(11)]);
}

#[tokio::test]
async fn test_has_one_through_takes_first_match() {
    let mechanics = Table::new("mechanics", "Mechanic").shared();
    let cars = Table::new("cars", "Car").shared();
    let owners = Table::new("owners", "Owner").shared();
    let car_owner = Relation::has_one_through(&mechanics, &cars, &owners, "car_owner")
        .build()
        .unwrap();

    let db = RecordingExecutor::default()
        .with_rows(
            "mechanics",
            vec![row(&[("id", Value::Int(1))]), row(&[("id", Value::Int(2))])],
        )
        .with_rows(
            "owners",
            vec![row(&[("id", Value::Int(30)), ("name", text("Lin")), ("through_key", Value::Int(1))])],
        );

    let query = QueryBuilder::new(&mechanics)
        .unwrap()
        .with(EagerLoadSpec::new(&car_owner))
        .build(&Dialect::POSTGRES)
        .unwrap();
    let loaded: Vec<Record> = EagerLoader::new(&db, Dialect::POSTGRES).get(&query).await.unwrap();

    let statements = db.statements();
    assert_eq!(statements.len(), 2);
    assert_eq!(
        statements[1],
        "SELECT \"owners\".*, \"cars\".\"mechanic_id\" AS \"through_key\" FROM \"owners\" \
         INNER JOIN \"cars\" ON \"cars\".\"id\" = \"owners\".\"car_id\" \
         WHERE \"cars\".\"mechanic_id\" IN (:p1, :p2)"
    );
    match loaded[0].relation("car_owner") {
        Some(Loaded::One(Some(owner))) => assert_eq!(owner.value("name"), Some(&text("Lin"))),
        other => panic!("expected one owner, got {other:?}"),
    }
    assert!(matches!(loaded[1].relation("car_owner"), Some(Loaded::One(None))));
}

#[tokio::test]
async fn test_morph_to_many_groups_by_pivot_key() {
    let tags = Table::new("tags", "Tag").shared();
    let post_tags = Relation::morph_to_many(&posts(), &tags, "tags", "taggable")
        .build()
        .unwrap();

    let db = RecordingExecutor::default()
        .with_rows(
            "posts",
            vec![row(&[("id", Value::Int(10))]), row(&[("id", Value::Int(11))])],
        )
        .with_rows(
            "tags",
            vec![
                row(&[("id", Value::Int(3)), ("pivot_taggable_id", Value::Int(11))]),
                row(&[("id", Value::Int(4)), ("pivot_taggable_id", Value::Int(11))]),
            ],
        );

    let query = QueryBuilder::new(&posts())
        .unwrap()
        .with(EagerLoadSpec::new(&post_tags))
        .build(&Dialect::POSTGRES)
        .unwrap();
    let loaded: Vec<Record> = EagerLoader::new(&db, Dialect::POSTGRES).get(&query).await.unwrap();

    let statements = db.statements();
    assert_eq!(statements.len(), 2);
    assert_eq!(
        statements[1],
        "SELECT \"tags\".*, \"taggables\".\"taggable_id\" AS \"pivot_taggable_id\" FROM \"tags\" \
         INNER JOIN \"taggables\" ON \"taggables\".\"tag_id\" = \"tags\".\"id\" \
         WHERE \"taggables\".\"taggable_id\" IN (:p1, :p2) AND \"taggables\".\"taggable_type\" = :p3"
    );
    assert!(loaded[0].related("tags").is_empty());
    assert_eq!(ids(&loaded[1].related("tags")), vec![Value::Int(3), Value::Int(4)]);
}

#[tokio::test]
async fn test_morphed_by_many_filters_related_type() {
    let tags = Table::new("tags", "Tag").shared();
    let tagged_posts = Relation::morphed_by_many(&tags, &posts(), "posts", "taggable")
        .build()
        .unwrap();

    let db = RecordingExecutor::default()
        .with_rows("tags", vec![row(&[("id", Value::Int(3))])])
        .with_rows(
            "posts",
            vec![row(&[("id", Value::Int(10)), ("pivot_tag_id", Value::Int(3))])],
        );

    let query = QueryBuilder::new(&tags)
        .unwrap()
        .with(EagerLoadSpec::new(&tagged_posts))
        .build(&Dialect::POSTGRES)
        .unwrap();
    let loaded: Vec<Record> = EagerLoader::new(&db, Dialect::POSTGRES).get(&query).await.unwrap();

    let statements = db.statements();
    assert!(statements[1].contains("INNER JOIN \"taggables\" ON \"taggables\".\"taggable_id\" = \"posts\".\"id\""));
    assert!(statements[1].contains("\"taggables\".\"tag_id\" AS \"pivot_tag_id\""));
    assert!(statements[1].contains("\"taggables\".\"taggable_type\" = :p2"));
    assert_eq!(ids(&loaded[0].related("posts")), vec![Value::Int(10)]);
}

#[tokio::test]
async fn test_morph_many_filters_discriminator() {
    let comments = Table::new("comments", "Comment").shared();
    let post_comments = Relation::morph_many(&posts(), &comments, "comments", "commentable")
        .build()
        .unwrap();

    let db = RecordingExecutor::default()
        .with_rows("posts", vec![row(&[("id", Value::Int(10))])])
        .with_rows(
            "comments",
            vec![row(&[
                ("id", Value::Int(1)),
                ("commentable_id", Value::Int(10)),
                ("commentable_type", text("Post")),
            ])],
        );

    let query = QueryBuilder::new(&posts())
        .unwrap()
        .with(EagerLoadSpec::new(&post_comments))
        .build(&Dialect::POSTGRES)
        .unwrap();
    let loaded: Vec<Record> = EagerLoader::new(&db, Dialect::POSTGRES).get(&query).await.unwrap();

    let statements = db.statements();
    assert!(statements[1].contains("\"comments\".\"commentable_type\" = :p2"));
    assert_eq!(ids(&loaded[0].related("comments")), vec![Value::Int(1)]);
}

#[tokio::test]
async fn test_morph_to_issues_one_query_per_type() {
    let comments = Table::new("comments", "Comment").shared();
    let videos = Table::new("videos", "Video").shared();
    let commentable = Relation::morph_to(&comments, "commentable", "commentable").build().unwrap();
    let schema = Schema::new()
        .add_table(posts())
        .add_table(videos)
        .add_table(comments.clone());

    let db = RecordingExecutor::default()
        .with_rows(
            "comments",
            vec![
                row(&[("id", Value::Int(1)), ("commentable_type", text("Post")), ("commentable_id", Value::Int(10))]),
                row(&[("id", Value::Int(2)), ("commentable_type", text("Video")), ("commentable_id", Value::Int(20))]),
                row(&[("id", Value::Int(3)), ("commentable_type", text("Post")), ("commentable_id", Value::Int(11))]),
                row(&[("id", Value::Int(4)), ("commentable_type", Value::Null), ("commentable_id", Value::Null)]),
            ],
        )
        .with_rows(
            "posts",
            vec![row(&[("id", Value::Int(10))]), row(&[("id", Value::Int(11))])],
        )
        .with_rows("videos", vec![row(&[("id", Value::Int(20))])]);

    let query = QueryBuilder::new(&comments)
        .unwrap()
        .with(EagerLoadSpec::new(&commentable))
        .build(&Dialect::POSTGRES)
        .unwrap();
    let loaded: Vec<Record> = EagerLoader::new(&db, Dialect::POSTGRES)
        .with_schema(&schema)
        .get(&query)
        .await
        .unwrap();

    let statements = db.statements();
    assert_eq!(statements.len(), 3);
    assert!(statements[1].contains("FROM \"posts\" WHERE \"posts\".\"id\" IN (:p1, :p2)"));
    assert!(statements[2].contains("FROM \"videos\" WHERE \"videos\".\"id\" IN (:p1)"));

    let target = |i: usize| loaded[i].related("commentable").first().map(|r| r.table().name().to_string());
    assert_eq!(target(0).as_deref(), Some("posts"));
    assert_eq!(target(1).as_deref(), Some("videos"));
    assert_eq!(target(2).as_deref(), Some("posts"));
    assert_eq!(target(3), None);
}

#[tokio::test]
async fn test_morph_to_unknown_type_fails() {
    let comments = Table::new("comments", "Comment").shared();
    let commentable = Relation::morph_to(&comments, "commentable", "commentable").build().unwrap();
    let schema = Schema::new().add_table(posts());

    let db = RecordingExecutor::default().with_rows(
        "comments",
        vec![row(&[("id", Value::Int(1)), ("commentable_type", text("Photo")), ("commentable_id", Value::Int(5))])],
    );

    let query = QueryBuilder::new(&comments)
        .unwrap()
        .with(EagerLoadSpec::new(&commentable))
        .build(&Dialect::POSTGRES)
        .unwrap();
    let err = EagerLoader::new(&db, Dialect::POSTGRES)
        .with_schema(&schema)
        .get::<Record>(&query)
        .await
        .unwrap_err();

    assert_eq!(err, SqlWeaveError::MorphTypeUnresolved("Photo".to_string()));
}

// ============================================================================
// Singular relations
// ============================================================================

#[tokio::test]
async fn test_belongs_to_default_instance() {
    let author = Relation::belongs_to(&posts(), &users(), "author")
        .with_default([("name", "Guest")])
        .build()
        .unwrap();

    let db = RecordingExecutor::default()
        .with_rows(
            "posts",
            vec![
                row(&[("id", Value::Int(10)), ("user_id", Value::Int(1))]),
                row(&[("id", Value::Int(11)), ("user_id", Value::Int(99))]),
            ],
        )
        .with_rows("users", vec![row(&[("id", Value::Int(1)), ("name", text("Ada"))])]);

    let query = QueryBuilder::new(&posts())
        .unwrap()
        .with(EagerLoadSpec::new(&author))
        .build(&Dialect::POSTGRES)
        .unwrap();
    let loaded: Vec<Record> = EagerLoader::new(&db, Dialect::POSTGRES).get(&query).await.unwrap();

    let name = |i: usize| loaded[i].related("author")[0].value("name").cloned();
    assert_eq!(name(0), Some(text("Ada")));
    assert_eq!(name(1), Some(text("Guest")));
}

#[tokio::test]
async fn test_oldest_of_many_picks_minimum() {
    let first_post = Relation::oldest_of_many(&users(), &posts(), "first_post")
        .of_many_column("created_at")
        .build()
        .unwrap();

    let db = RecordingExecutor::default()
        .with_rows("users", vec![row(&[("id", Value::Int(1))])])
        .with_rows(
            "posts",
            vec![row(&[("id", Value::Int(10)), ("user_id", Value::Int(1))])],
        );

    let query = QueryBuilder::new(&users())
        .unwrap()
        .with(EagerLoadSpec::new(&first_post))
        .build(&Dialect::POSTGRES)
        .unwrap();
    let loaded: Vec<Record> = EagerLoader::new(&db, Dialect::POSTGRES).get(&query).await.unwrap();

    let statements = db.statements();
    assert_eq!(statements.len(), 2);
    assert!(statements[1].contains(
        "\"posts\".\"created_at\" = (SELECT MIN(\"first_post_of_many\".\"created_at\") \
         FROM \"posts\" AS \"first_post_of_many\""
    ));
    assert_eq!(ids(&loaded[0].related("first_post")), vec![Value::Int(10)]);
}

#[tokio::test]
async fn test_of_many_with_custom_aggregate() {
    let offers = Table::new("offers", "Offer").shared();
    let cheapest = Relation::of_many(&users(), &offers, "cheapest_offer", "price", AggregateFunction::Min)
        .build()
        .unwrap();

    let db = RecordingExecutor::default()
        .with_rows(
            "users",
            vec![row(&[("id", Value::Int(1))]), row(&[("id", Value::Int(2))])],
        )
        .with_rows(
            "offers",
            vec![row(&[("id", Value::Int(5)), ("user_id", Value::Int(2)), ("price", Value::Int(9))])],
        );

    let query = QueryBuilder::new(&users())
        .unwrap()
        .with(EagerLoadSpec::new(&cheapest))
        .build(&Dialect::POSTGRES)
        .unwrap();
    let loaded: Vec<Record> = EagerLoader::new(&db, Dialect::POSTGRES).get(&query).await.unwrap();

    assert_eq!(
        db.statements()[1],
        "SELECT \"offers\".* FROM \"offers\" WHERE \"offers\".\"user_id\" IN (:p1, :p2) \
         AND \"offers\".\"price\" = (SELECT MIN(\"cheapest_offer_of_many\".\"price\") \
         FROM \"offers\" AS \"cheapest_offer_of_many\" \
         WHERE \"cheapest_offer_of_many\".\"user_id\" = \"offers\".\"user_id\")"
    );
    assert!(matches!(loaded[0].relation("cheapest_offer"), Some(Loaded::One(None))));
    assert_eq!(ids(&loaded[1].related("cheapest_offer")), vec![Value::Int(5)]);
}

#[tokio::test]
async fn test_null_foreign_keys_skip_query() {
    let author = Relation::belongs_to(&posts(), &users(), "author").build().unwrap();

    let db = RecordingExecutor::default().with_rows(
        "posts",
        vec![row(&[("id", Value::Int(10)), ("user_id", Value::Null)])],
    );

    let query = QueryBuilder::new(&posts())
        .unwrap()
        .with(EagerLoadSpec::new(&author))
        .build(&Dialect::POSTGRES)
        .unwrap();
    let loaded: Vec<Record> = EagerLoader::new(&db, Dialect::POSTGRES).get(&query).await.unwrap();

    assert_eq!(db.statements().len(), 1);
    assert_eq!(loaded[0].relation("author"), Some(&Loaded::One(None)));
}

// ============================================================================
// Failures
// ============================================================================

/// An instance type that refuses relation writes.
#[derive(Debug, Clone)]
struct ReadOnly(Row);

impl AttributeAccess for ReadOnly {
    fn get(&self, attribute: &str) -> Result<Value> {
        self.0.get(attribute).cloned().ok_or_else(|| SqlWeaveError::AttributeMapping {
            attribute: attribute.to_string(),
            reason: "unknown column".to_string(),
        })
    }

    fn set_relation(&mut self, _attribute: &str, _value: Loaded<Self>) -> Result<()> {
        Err(SqlWeaveError::InvalidArgument("instance is read-only".to_string()))
    }
}

impl FromRow for ReadOnly {
    fn from_row(_table: &TableRef, row: Row) -> Result<Self> {
        Ok(ReadOnly(row))
    }
}

#[tokio::test]
async fn test_write_failure_names_attribute() {
    let user_posts = Relation::has_many(&users(), &posts(), "posts").build().unwrap();
    let db = RecordingExecutor::default();
    let mut parents = vec![ReadOnly(row(&[("id", Value::Int(1))]))];

    let err = EagerLoader::new(&db, Dialect::POSTGRES)
        .load(&mut parents, &[EagerLoadSpec::new(&user_posts)])
        .await
        .unwrap_err();

    match err {
        SqlWeaveError::AttributeMapping { attribute, .. } => assert_eq!(attribute, "posts"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_key_attribute_fails() {
    let user_posts = Relation::has_many(&users(), &posts(), "posts").build().unwrap();
    let db = RecordingExecutor::default();
    let mut parents = vec![Record::new(&users(), row(&[("name", text("Ada"))]))];

    let err = EagerLoader::new(&db, Dialect::POSTGRES)
        .load(&mut parents, &[EagerLoadSpec::new(&user_posts)])
        .await
        .unwrap_err();

    assert!(matches!(err, SqlWeaveError::AttributeMapping { ref attribute, .. } if attribute == "id"));
    assert!(db.statements().is_empty());
}

#[tokio::test]
async fn test_max_depth_enforced() {
    let comments = Table::new("comments", "Comment").shared();
    let user_posts = Relation::has_many(&users(), &posts(), "posts").build().unwrap();
    let post_comments = Relation::has_many(&posts(), &comments, "comments").build().unwrap();

    let db = RecordingExecutor::default()
        .with_rows("posts", vec![row(&[("id", Value::Int(10)), ("user_id", Value::Int(1))])]);
    let mut parents = vec![Record::new(&users(), row(&[("id", Value::Int(1))]))];
    let spec = EagerLoadSpec::new(&user_posts).with(EagerLoadSpec::new(&post_comments));

    let err = EagerLoader::new(&db, Dialect::POSTGRES)
        .with_config(EagerLoadConfig::new().max_depth(1))
        .load(&mut parents, &[spec])
        .await
        .unwrap_err();

    assert!(matches!(err, SqlWeaveError::InvalidArgument(_)));
}
