//! Dialect-agnostic query builder.
//!
//! Clause methods accumulate state; nothing is rendered until
//! [`QueryBuilder::build`] receives a dialect. Every literal becomes a named
//! parameter (`:p1`, `:p2`, ...) numbered in textual order.
//!
//! # Examples
//!
//! ## SELECT Query
//!
//! ```
//! use sqlweave::{Dialect, Operator, OrderDirection, QueryBuilder, Table};
//!
//! let users = Table::new("users", "User").shared();
//! let qb = QueryBuilder::new(&users)?
//!     .select(&["id", "name"])?
//!     .where_clause("age", Operator::Gte, 18)?
//!     .order_by("name", OrderDirection::Asc)?
//!     .limit(10)
//!     .offset(20);
//!
//! let result = qb.build(&Dialect::POSTGRES)?;
//! assert_eq!(
//!     result.sql(),
//!     "SELECT \"id\", \"name\" FROM \"users\" WHERE \"age\" >= :p1 ORDER BY \"name\" ASC LIMIT 10 OFFSET 20"
//! );
//! # Ok::<(), sqlweave::SqlWeaveError>(())
//! ```
//!
//! ## UPDATE Query
//!
//! ```
//! use sqlweave::{Dialect, Operator, QueryBuilder, Table, Value};
//!
//! let users = Table::new("users", "User").shared();
//! let qb = QueryBuilder::new(&users)?.where_clause("id", Operator::Eq, 42)?;
//! let result = qb.build_update(&Dialect::POSTGRES, &[("name".to_string(), Value::from("Bob"))])?;
//! assert_eq!(result.sql(), "UPDATE \"users\" SET \"name\" = :p1 WHERE \"id\" = :p2");
//! # Ok::<(), sqlweave::SqlWeaveError>(())
//! ```

mod builder;
pub(crate) mod helpers;
mod join;
mod modify;
mod relations;
mod result;
mod select;
mod types;


pub use builder::QueryBuilder;
pub use join::{JoinClause, JoinCondition};
pub use result::{PlaceholderStyle, QueryResult};
pub use types::{CommonTableExpression, SetQuery, SoftDeleteScope};
