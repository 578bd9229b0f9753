//! Dialect lookup by symbolic name or connection-string scheme.
//!
//! The registry is an explicit value handed to whoever needs it, never
//! process-wide state. A pluggable licensing gate decides whether commercial
//! dialects may be handed out.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::Dialect;
use crate::{Result, SqlWeaveError};

/// Predicate deciding whether a commercial dialect may be used.
pub type LicenseGate = Arc<dyn Fn(&Dialect) -> bool + Send + Sync>;

/// A set of dialects available to an application.
#[derive(Clone)]
pub struct DialectRegistry {
    entries: Vec<(String, Dialect)>,
    gate: LicenseGate,
}

impl fmt::Debug for DialectRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialectRegistry")
            .field("names", &self.names())
            .finish()
    }
}

impl Default for DialectRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        for dialect in Dialect::BUILT_IN {
            registry = registry.register(dialect);
        }
        registry
            .alias("postgresql", Dialect::POSTGRES)
            .alias("pg", Dialect::POSTGRES)
            .alias("sqlite3", Dialect::SQLITE)
    }
}

impl DialectRegistry {
    /// Registry holding every built-in dialect; commercial ones are gated off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with no dialects.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            gate: Arc::new(|_| false),
        }
    }

    /// Adds (or replaces) a dialect under its own name.
    pub fn register(self, dialect: Dialect) -> Self {
        self.alias(dialect.name(), dialect)
    }

    /// Adds (or replaces) a dialect under an extra name.
    pub fn alias(mut self, name: &str, dialect: Dialect) -> Self {
        let key = name.to_ascii_lowercase();
        self.entries.retain(|(existing, _)| *existing != key);
        self.entries.push((key, dialect));
        self
    }

    /// Replaces the licensing gate consulted for commercial dialects.
    pub fn with_license_gate<F>(mut self, gate: F) -> Self
    where
        F: Fn(&Dialect) -> bool + Send + Sync + 'static,
    {
        self.gate = Arc::new(gate);
        self
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Looks up a dialect by symbolic name (case-insensitive).
    pub fn lookup(&self, name: &str) -> Result<Dialect> {
        let key = name.trim().to_ascii_lowercase();
        let dialect = self
            .entries
            .iter()
            .find(|(registered, _)| *registered == key)
            .map(|(_, dialect)| *dialect)
            .ok_or_else(|| SqlWeaveError::UnknownDialect(name.to_string()))?;
        self.admit(dialect)
    }

    /// Looks up a dialect from a connection string such as
    /// `postgresql://user@host/db` or `sqlite::memory:`.
    pub fn for_url(&self, url: &str) -> Result<Dialect> {
        let scheme = url
            .split_once(':')
            .map(|(scheme, _)| scheme)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| SqlWeaveError::UnknownDialect(url.to_string()))?;
        // "mysql+async" style driver suffixes select the same dialect.
        let scheme = scheme.split('+').next().unwrap_or(scheme).to_ascii_lowercase();

        let dialect = self
            .entries
            .iter()
            .map(|(_, dialect)| *dialect)
            .find(|dialect| dialect.schemes().contains(&scheme.as_str()))
            .ok_or(SqlWeaveError::UnknownDialect(scheme))?;
        self.admit(dialect)
    }

    fn admit(&self, dialect: Dialect) -> Result<Dialect> {
        if dialect.is_commercial() && !(self.gate)(&dialect) {
            debug!(dialect = dialect.name(), "Commercial dialect rejected by license gate");
            return Err(SqlWeaveError::UnlicensedDialect(dialect.name().to_string()));
        }
        Ok(dialect)
    }
}
