//! SQL dialects.
//!
//! A [`Dialect`] is a stateless, `Copy` strategy value: formatting rules plus
//! a [`Capabilities`] flag set. Every feature-specific fragment checks the
//! flags first and fails with [`SqlWeaveError::UnsupportedFeature`] instead
//! of emitting SQL the target cannot run.
//!
//! ```
//! use sqlweave::Dialect;
//!
//! assert_eq!(Dialect::POSTGRES.quote_identifier("users"), "\"users\"");
//! assert_eq!(Dialect::MYSQL.quote_identifier("users"), "`users`");
//! assert_eq!(Dialect::MYSQL.placeholder("p1"), ":p1");
//! ```

mod capabilities;
mod registry;

pub use capabilities::{Capabilities, Feature, Pagination};
pub use registry::{DialectRegistry, LicenseGate};

use crate::{Result, SqlWeaveError};

/// Database family; decides which spelling a fragment uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialectFamily {
    Postgres,
    MySql,
    Sqlite,
    Oracle,
}

/// Row lock strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockStrength {
    Update,
    Share,
}

/// Behaviour when a row is already locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockWait {
    #[default]
    Wait,
    NoWait,
    SkipLocked,
}

/// A locking clause request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lock {
    pub strength: LockStrength,
    pub wait: LockWait,
}

/// A target SQL dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    name: &'static str,
    display_name: &'static str,
    family: DialectFamily,
    capabilities: Capabilities,
    commercial: bool,
    schemes: &'static [&'static str],
}

impl Dialect {
    pub const POSTGRES: Dialect = Dialect {
        name: "postgres",
        display_name: "PostgreSQL",
        family: DialectFamily::Postgres,
        capabilities: Capabilities {
            returning: true,
            ilike: true,
            native_arrays: true,
            json: true,
            jsonb: true,
            row_locking: true,
            skip_locked: true,
            nowait: true,
            aggregate_filter: true,
            distinct_on: true,
            nulls_ordering: true,
            pagination: Pagination::LimitOffset,
        },
        commercial: false,
        schemes: &["postgres", "postgresql"],
    };

    pub const MYSQL: Dialect = Dialect {
        name: "mysql",
        display_name: "MySQL",
        family: DialectFamily::MySql,
        capabilities: Capabilities {
            returning: false,
            ilike: false,
            native_arrays: false,
            json: true,
            jsonb: false,
            row_locking: true,
            skip_locked: true,
            nowait: true,
            aggregate_filter: false,
            distinct_on: false,
            nulls_ordering: false,
            pagination: Pagination::LimitOffset,
        },
        commercial: false,
        schemes: &["mysql"],
    };

    pub const MARIADB: Dialect = Dialect {
        name: "mariadb",
        display_name: "MariaDB",
        family: DialectFamily::MySql,
        capabilities: Capabilities {
            returning: true,
            ilike: false,
            native_arrays: false,
            json: true,
            jsonb: false,
            row_locking: true,
            skip_locked: true,
            nowait: true,
            aggregate_filter: false,
            distinct_on: false,
            nulls_ordering: false,
            pagination: Pagination::LimitOffset,
        },
        commercial: false,
        schemes: &["mariadb"],
    };

    pub const SQLITE: Dialect = Dialect {
        name: "sqlite",
        display_name: "SQLite",
        family: DialectFamily::Sqlite,
        capabilities: Capabilities {
            returning: true,
            ilike: false,
            native_arrays: false,
            json: true,
            jsonb: false,
            row_locking: false,
            skip_locked: false,
            nowait: false,
            aggregate_filter: true,
            distinct_on: false,
            nulls_ordering: true,
            pagination: Pagination::LimitOffset,
        },
        commercial: false,
        schemes: &["sqlite"],
    };

    pub const ORACLE: Dialect = Dialect {
        name: "oracle",
        display_name: "Oracle",
        family: DialectFamily::Oracle,
        capabilities: Capabilities {
            returning: false,
            ilike: false,
            native_arrays: false,
            json: false,
            jsonb: false,
            row_locking: true,
            skip_locked: true,
            nowait: true,
            aggregate_filter: false,
            distinct_on: false,
            nulls_ordering: true,
            pagination: Pagination::OffsetFetch,
        },
        commercial: true,
        schemes: &["oracle"],
    };

    /// All built-in dialects.
    pub const BUILT_IN: [Dialect; 5] = [
        Dialect::POSTGRES,
        Dialect::MYSQL,
        Dialect::MARIADB,
        Dialect::SQLITE,
        Dialect::ORACLE,
    ];

    /// Defines a new dialect that shares a family's formatting rules.
    pub const fn new(
        name: &'static str,
        display_name: &'static str,
        family: DialectFamily,
        capabilities: Capabilities,
    ) -> Self {
        Self {
            name,
            display_name,
            family,
            capabilities,
            commercial: false,
            schemes: &[],
        }
    }

    /// Same formatting rules, different capability set (e.g. an older server).
    pub const fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub const fn with_schemes(mut self, schemes: &'static [&'static str]) -> Self {
        self.schemes = schemes;
        self
    }

    pub const fn commercial(mut self, commercial: bool) -> Self {
        self.commercial = commercial;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn display_name(&self) -> &'static str {
        self.display_name
    }

    pub fn family(&self) -> DialectFamily {
        self.family
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn is_commercial(&self) -> bool {
        self.commercial
    }

    pub fn schemes(&self) -> &'static [&'static str] {
        self.schemes
    }

    pub fn supports(&self, feature: Feature) -> bool {
        self.capabilities.supports(feature)
    }

    pub fn supports_nowait(&self) -> bool {
        self.supports(Feature::Nowait)
    }

    pub fn supports_skip_locked(&self) -> bool {
        self.supports(Feature::SkipLocked)
    }

    pub fn supports_returning(&self) -> bool {
        self.supports(Feature::Returning)
    }

    /// Fails with a typed error unless `feature` is supported.
    pub fn require(&self, feature: Feature) -> Result<()> {
        if self.supports(feature) {
            Ok(())
        } else {
            Err(SqlWeaveError::unsupported(
                feature.name(),
                self.display_name,
                feature.hint(),
            ))
        }
    }

    fn quote_char(&self) -> char {
        match self.family {
            DialectFamily::MySql => '`',
            DialectFamily::Postgres | DialectFamily::Sqlite | DialectFamily::Oracle => '"',
        }
    }

    /// Quotes an identifier, doubling embedded quote characters.
    ///
    /// Dotted names are quoted part by part; a bare `*` part is left as is.
    pub fn quote_identifier(&self, name: &str) -> String {
        let q = self.quote_char();
        name.split('.')
            .map(|part| {
                if part == "*" {
                    part.to_string()
                } else {
                    let escaped = part.replace(q, &format!("{q}{q}"));
                    format!("{q}{escaped}{q}")
                }
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Quoted table reference with an optional alias. Oracle takes no `AS`
    /// between a table and its alias.
    pub fn table_reference(&self, table: &str, alias: Option<&str>) -> String {
        let table = self.quote_identifier(table);
        match (alias, self.family) {
            (None, _) => table,
            (Some(alias), DialectFamily::Oracle) => {
                format!("{} {}", table, self.quote_identifier(alias))
            }
            (Some(alias), _) => format!("{} AS {}", table, self.quote_identifier(alias)),
        }
    }

    /// An EXISTS test usable as a projected column.
    pub fn exists_flag(&self, exists: &str) -> String {
        match self.family {
            DialectFamily::Oracle => format!("CASE WHEN {} THEN 1 ELSE 0 END", exists),
            _ => exists.to_string(),
        }
    }

    /// Quotes a string literal. Only for the raw escape hatch; bound values
    /// never pass through here.
    pub fn quote_string(&self, value: &str) -> String {
        let escaped = value.replace('\'', "''");
        match self.family {
            DialectFamily::MySql => format!("'{}'", escaped.replace('\\', "\\\\")),
            _ => format!("'{}'", escaped),
        }
    }

    pub fn boolean_literal(&self, value: bool) -> &'static str {
        if value {
            "TRUE"
        } else {
            "FALSE"
        }
    }

    pub fn null_literal(&self) -> &'static str {
        "NULL"
    }

    /// Named placeholder for a bound parameter.
    pub fn placeholder(&self, name: &str) -> String {
        format!(":{}", name)
    }

    /// Case-insensitive LIKE. Without native ILIKE both sides are lowered.
    pub fn ilike(&self, lhs: &str, rhs: &str, negate: bool) -> String {
        let not = if negate { "NOT " } else { "" };
        if self.capabilities.ilike {
            format!("{} {}ILIKE {}", lhs, not, rhs)
        } else {
            format!("LOWER({}) {}LIKE LOWER({})", lhs, not, rhs)
        }
    }

    /// Values to bind for a JSON path, in placeholder order.
    ///
    /// PostgreSQL binds each key separately; the other families take a
    /// single `$.a.b` path string.
    pub fn json_path_values(&self, path: &[&str]) -> Vec<String> {
        match self.family {
            DialectFamily::Postgres => path.iter().map(|s| s.to_string()).collect(),
            _ => {
                let mut joined = String::from("$");
                for key in path {
                    joined.push('.');
                    joined.push_str(key);
                }
                vec![joined]
            }
        }
    }

    /// Extracts a JSON path as text.
    pub fn json_extract_text(&self, column: &str, placeholders: &[String]) -> Result<String> {
        self.require(Feature::JsonPath)?;
        Ok(match self.family {
            DialectFamily::Postgres => {
                format!("jsonb_extract_path_text({}, {})", column, placeholders.join(", "))
            }
            DialectFamily::MySql => format!(
                "JSON_UNQUOTE(JSON_EXTRACT({}, {}))",
                column,
                placeholders.join(", ")
            ),
            DialectFamily::Sqlite | DialectFamily::Oracle => {
                format!("json_extract({}, {})", column, placeholders.join(", "))
            }
        })
    }

    /// JSON document containment (`column` contains the bound document).
    pub fn json_contains(&self, column: &str, placeholder: &str) -> Result<String> {
        self.require(Feature::JsonContains)?;
        match self.family {
            DialectFamily::Postgres => Ok(format!("{} @> CAST({} AS jsonb)", column, placeholder)),
            DialectFamily::MySql => Ok(format!("JSON_CONTAINS({}, {})", column, placeholder)),
            DialectFamily::Sqlite | DialectFamily::Oracle => Err(SqlWeaveError::unsupported(
                Feature::JsonContains.name(),
                self.display_name,
                Feature::JsonContains.hint(),
            )),
        }
    }

    /// Native array containment (`column` contains every bound element).
    pub fn array_contains(&self, column: &str, placeholder: &str) -> Result<String> {
        self.require(Feature::NativeArrays)?;
        Ok(format!("{} @> {}", column, placeholder))
    }

    /// Native array membership (bound value equals any element).
    pub fn array_any(&self, placeholder: &str, column: &str) -> Result<String> {
        self.require(Feature::NativeArrays)?;
        Ok(format!("{} = ANY({})", placeholder, column))
    }

    /// `COUNT(col) FILTER (WHERE …)`.
    pub fn aggregate_filter(&self, aggregate: &str, predicate: &str) -> Result<String> {
        self.require(Feature::AggregateFilter)?;
        Ok(format!("{} FILTER (WHERE {})", aggregate, predicate))
    }

    /// `DISTINCT ON (…)` prefix for the projection list.
    pub fn distinct_on(&self, columns: &[String]) -> Result<String> {
        self.require(Feature::DistinctOn)?;
        Ok(format!("DISTINCT ON ({}) ", columns.join(", ")))
    }

    /// Sort key emulating NULLS FIRST/LAST where the dialect has no syntax for it.
    pub fn nulls_sort_key(&self, column: &str, nulls_first: bool) -> Option<String> {
        if self.capabilities.nulls_ordering {
            None
        } else if nulls_first {
            Some(format!("{} IS NULL DESC", column))
        } else {
            Some(format!("{} IS NULL ASC", column))
        }
    }

    /// Native `NULLS FIRST`/`NULLS LAST` suffix, if the dialect has one.
    pub fn nulls_suffix(&self, nulls_first: bool) -> Option<&'static str> {
        if !self.capabilities.nulls_ordering {
            None
        } else if nulls_first {
            Some(" NULLS FIRST")
        } else {
            Some(" NULLS LAST")
        }
    }

    /// Pagination suffix (with leading space). An offset of zero is omitted.
    pub fn limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> String {
        let offset = offset.filter(|o| *o > 0);
        match self.capabilities.pagination {
            Pagination::LimitOffset => match (limit, offset) {
                (Some(l), Some(o)) => format!(" LIMIT {} OFFSET {}", l, o),
                (Some(l), None) => format!(" LIMIT {}", l),
                (None, Some(o)) => match self.family {
                    DialectFamily::MySql => format!(" LIMIT 18446744073709551615 OFFSET {}", o),
                    DialectFamily::Sqlite => format!(" LIMIT -1 OFFSET {}", o),
                    DialectFamily::Postgres | DialectFamily::Oracle => format!(" OFFSET {}", o),
                },
                (None, None) => String::new(),
            },
            Pagination::OffsetFetch => match (limit, offset) {
                (Some(l), Some(o)) => format!(" OFFSET {} ROWS FETCH NEXT {} ROWS ONLY", o, l),
                (Some(l), None) => format!(" FETCH FIRST {} ROWS ONLY", l),
                (None, Some(o)) => format!(" OFFSET {} ROWS", o),
                (None, None) => String::new(),
            },
        }
    }

    /// Locking suffix (with leading space).
    pub fn lock_clause(&self, lock: &Lock) -> Result<String> {
        self.require(Feature::RowLocking)?;
        let mut clause = match lock.strength {
            LockStrength::Update => " FOR UPDATE".to_string(),
            LockStrength::Share => match self.family {
                DialectFamily::Oracle => {
                    return Err(SqlWeaveError::unsupported(
                        "FOR SHARE",
                        self.display_name,
                        "use FOR UPDATE or LOCK TABLE … IN SHARE MODE",
                    ))
                }
                _ => " FOR SHARE".to_string(),
            },
        };
        match lock.wait {
            LockWait::Wait => {}
            LockWait::NoWait => {
                self.require(Feature::Nowait)?;
                clause.push_str(" NOWAIT");
            }
            LockWait::SkipLocked => {
                self.require(Feature::SkipLocked)?;
                clause.push_str(" SKIP LOCKED");
            }
        }
        Ok(clause)
    }

    /// ` RETURNING …` suffix for write statements.
    pub fn returning(&self, columns: &[String]) -> Result<String> {
        self.require(Feature::Returning)?;
        Ok(format!(" RETURNING {}", columns.join(", ")))
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier_doubles_embedded_quotes() {
        assert_eq!(Dialect::POSTGRES.quote_identifier("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(Dialect::MYSQL.quote_identifier("we`ird"), "`we``ird`");
    }

    #[test]
    fn test_quote_identifier_qualified() {
        assert_eq!(Dialect::POSTGRES.quote_identifier("users.id"), "\"users\".\"id\"");
        assert_eq!(Dialect::MYSQL.quote_identifier("users.*"), "`users`.*");
    }

    #[test]
    fn test_quote_string() {
        assert_eq!(Dialect::POSTGRES.quote_string("it's"), "'it''s'");
        assert_eq!(Dialect::MYSQL.quote_string("a\\b"), "'a\\\\b'");
    }

    #[test]
    fn test_literals_and_placeholder() {
        assert_eq!(Dialect::SQLITE.boolean_literal(true), "TRUE");
        assert_eq!(Dialect::SQLITE.boolean_literal(false), "FALSE");
        assert_eq!(Dialect::ORACLE.null_literal(), "NULL");
        assert_eq!(Dialect::POSTGRES.placeholder("p3"), ":p3");
    }

    #[test]
    fn test_ilike_fallback() {
        assert_eq!(Dialect::POSTGRES.ilike("\"name\"", ":p1", false), "\"name\" ILIKE :p1");
        assert_eq!(Dialect::MYSQL.ilike("`name`", ":p1", false), "LOWER(`name`) LIKE LOWER(:p1)");
        assert_eq!(
            Dialect::MARIADB.ilike("`name`", ":p1", true),
            "LOWER(`name`) NOT LIKE LOWER(:p1)"
        );
    }

    #[test]
    fn test_lock_clause() {
        let lock = Lock { strength: LockStrength::Update, wait: LockWait::NoWait };
        assert_eq!(Dialect::POSTGRES.lock_clause(&lock).unwrap(), " FOR UPDATE NOWAIT");

        let skip = Lock { strength: LockStrength::Share, wait: LockWait::SkipLocked };
        assert_eq!(Dialect::MYSQL.lock_clause(&skip).unwrap(), " FOR SHARE SKIP LOCKED");
    }

    #[test]
    fn test_nowait_unsupported_names_feature_and_dialect() {
        let old_mysql = Dialect::new(
            "mysql57",
            "MySQL 5.7",
            DialectFamily::MySql,
            Capabilities { row_locking: true, ..Capabilities::minimal() },
        );
        assert!(!old_mysql.supports_nowait());

        let lock = Lock { strength: LockStrength::Update, wait: LockWait::NoWait };
        let err = old_mysql.lock_clause(&lock).unwrap_err();
        match err {
            SqlWeaveError::UnsupportedFeature { feature, dialect, .. } => {
                assert_eq!(feature, "NOWAIT");
                assert_eq!(dialect, "MySQL 5.7");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_sqlite_has_no_row_locking() {
        let lock = Lock { strength: LockStrength::Update, wait: LockWait::Wait };
        let err = Dialect::SQLITE.lock_clause(&lock).unwrap_err();
        assert_eq!(err.feature(), Some("FOR UPDATE"));
    }

    #[test]
    fn test_limit_offset() {
        assert_eq!(Dialect::POSTGRES.limit_offset(Some(10), Some(0)), " LIMIT 10");
        assert_eq!(Dialect::POSTGRES.limit_offset(Some(10), Some(20)), " LIMIT 10 OFFSET 20");
        assert_eq!(Dialect::POSTGRES.limit_offset(Some(0), None), " LIMIT 0");
        assert_eq!(Dialect::SQLITE.limit_offset(None, Some(5)), " LIMIT -1 OFFSET 5");
        assert_eq!(
            Dialect::ORACLE.limit_offset(Some(10), Some(20)),
            " OFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY"
        );
        assert_eq!(Dialect::ORACLE.limit_offset(Some(10), Some(0)), " FETCH FIRST 10 ROWS ONLY");
    }

    #[test]
    fn test_json_fragments() {
        assert_eq!(
            Dialect::POSTGRES.json_path_values(&["address", "city"]),
            vec!["address".to_string(), "city".to_string()]
        );
        assert_eq!(Dialect::MYSQL.json_path_values(&["address", "city"]), vec!["$.address.city"]);
        assert_eq!(
            Dialect::MYSQL.json_extract_text("`meta`", &[":p1".to_string()]).unwrap(),
            "JSON_UNQUOTE(JSON_EXTRACT(`meta`, :p1))"
        );
        assert!(Dialect::SQLITE.json_contains("\"meta\"", ":p1").is_err());
        assert!(Dialect::ORACLE.json_extract_text("\"meta\"", &[]).is_err());
    }

    #[test]
    fn test_array_requires_native_arrays() {
        assert_eq!(
            Dialect::POSTGRES.array_contains("\"tags\"", ":p1").unwrap(),
            "\"tags\" @> :p1"
        );
        let err = Dialect::MYSQL.array_contains("`tags`", ":p1").unwrap_err();
        assert_eq!(err.feature(), Some("native arrays"));
    }

    #[test]
    fn test_nulls_ordering_emulation() {
        assert_eq!(Dialect::POSTGRES.nulls_sort_key("\"a\"", true), None);
        assert_eq!(Dialect::POSTGRES.nulls_suffix(false), Some(" NULLS LAST"));
        assert_eq!(
            Dialect::MYSQL.nulls_sort_key("`a`", true),
            Some("`a` IS NULL DESC".to_string())
        );
        assert_eq!(Dialect::MYSQL.nulls_suffix(true), None);
    }

    #[test]
    fn test_table_reference_alias_keyword() {
        assert_eq!(Dialect::POSTGRES.table_reference("users", None), "\"users\"");
        assert_eq!(Dialect::POSTGRES.table_reference("users", Some("u")), "\"users\" AS \"u\"");
        assert_eq!(Dialect::MYSQL.table_reference("users", Some("u")), "`users` AS `u`");
        assert_eq!(Dialect::ORACLE.table_reference("users", Some("u")), "\"users\" \"u\"");
    }

    #[test]
    fn test_exists_flag() {
        assert_eq!(Dialect::SQLITE.exists_flag("EXISTS (SELECT 1)"), "EXISTS (SELECT 1)");
        assert_eq!(
            Dialect::ORACLE.exists_flag("EXISTS (SELECT 1)"),
            "CASE WHEN EXISTS (SELECT 1) THEN 1 ELSE 0 END"
        );
    }
}
