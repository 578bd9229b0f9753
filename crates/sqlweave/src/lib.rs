//! Dialect-aware relational query compiler with N+1-free eager loading.
//!
//! sqlweave turns a dialect-agnostic description of a statement, together
//! with declared relations between tables, into dialect-correct SQL text, a
//! named-parameter set, and an eager-loading plan.
//!
//! # Architecture
//!
//! ```text
//! Dialects (capability flags + formatting)
//!           |
//!   Expression algebra (Predicate, SelectItem, OrderSpec)
//!           |
//!   Relation descriptors (14 kinds, derived keys)
//!           |
//!   QueryBuilder  <-->  relation-aware generator
//!           |
//!   EagerLoader (one batched query per relation per level)
//!           |
//!   QueryExecutor (supplied by the embedder)
//! ```
//!
//! # Usage Examples
//!
//! ## Relation filters and counts
//!
//! ```
//! use sqlweave::{Constraint, Dialect, Operator, QueryBuilder, Relation, Table};
//!
//! let users = Table::new("users", "User").shared();
//! let posts = Table::new("posts", "Post").shared();
//! let user_posts = Relation::has_many(&users, &posts, "posts").build()?;
//!
//! let query = QueryBuilder::new(&users)?
//!     .where_has(
//!         &user_posts,
//!         Some(Constraint::new(|q| q.where_clause("posts.published", Operator::Eq, true))),
//!     )?
//!     .with_count(&user_posts, None, None)?
//!     .build(&Dialect::POSTGRES)?;
//!
//! assert!(query.sql().contains("AS \"posts_count\""));
//! assert_eq!(query.parameters().len(), 1);
//! # Ok::<(), sqlweave::SqlWeaveError>(())
//! ```
//!
//! ## Eager loading
//!
//! ```rust,ignore
//! let query = QueryBuilder::new(&users)?
//!     .with(EagerLoadSpec::new(&user_posts).with(EagerLoadSpec::new(&post_comments)))
//!     .build(&Dialect::POSTGRES)?;
//!
//! // one root query + one query for posts + one for comments
//! let users: Vec<Record> = EagerLoader::new(&executor, Dialect::POSTGRES).get(&query).await?;
//! ```
//!
//! # Safety
//!
//! Every literal is bound as a named parameter; identifiers are validated and
//! quoted per dialect. `*_raw` methods are the only way to inject SQL text and
//! are never fed literal values by the library itself.
//!
//! # Thread Safety
//!
//! Builders are short-lived per-request values. `QueryResult`, `Dialect`,
//! `Relation` and `Table` are immutable and `Send + Sync`.

pub mod config;
pub mod dialect;
pub mod eager;
pub mod executor;
pub mod expr;
mod generator;
pub mod query;
pub mod record;
pub mod relation;
pub mod schema;
pub mod value;

pub use sqlweave_common::{Result, SqlWeaveError};

pub use config::EagerLoadConfig;
pub use dialect::{Capabilities, Dialect, DialectFamily, DialectRegistry, Feature, Lock, LockStrength, LockWait};
pub use eager::{AttributeAccess, EagerLoadSpec, EagerLoader, FromRow, Loaded};
pub use executor::QueryExecutor;
pub use expr::{
    AggregateFunction, ColumnRef, Constraint, JoinType, NullsOrder, Operator, OrderDirection, OrderSpec,
    ParamSink, Predicate, SelectItem, SetOperation, SubqueryKind,
};
pub use query::{PlaceholderStyle, QueryBuilder, QueryResult, SoftDeleteScope};
pub use record::Record;
pub use relation::{Cascade, ContainerKind, FetchStrategy, Relation, RelationKind, RelationType};
pub use schema::{Column, ComparableColumn, Schema, StringColumn, Table, TableRef, ValueType};
pub use value::{GroupKey, Row, Value};
