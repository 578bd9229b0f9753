//! Capability flags describing what a target SQL dialect supports.

use serde::{Deserialize, Serialize};

/// How LIMIT/OFFSET is spelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pagination {
    /// `LIMIT n OFFSET m`
    LimitOffset,
    /// `OFFSET m ROWS FETCH NEXT n ROWS ONLY`
    OffsetFetch,
}

/// Feature flags checked before any feature-specific rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub returning: bool,
    pub ilike: bool,
    pub native_arrays: bool,
    pub json: bool,
    pub jsonb: bool,
    pub row_locking: bool,
    pub skip_locked: bool,
    pub nowait: bool,
    pub aggregate_filter: bool,
    pub distinct_on: bool,
    pub nulls_ordering: bool,
    pub pagination: Pagination,
}

impl Capabilities {
    /// Nothing beyond core SQL.
    pub const fn minimal() -> Self {
        Self {
            returning: false,
            ilike: false,
            native_arrays: false,
            json: false,
            jsonb: false,
            row_locking: false,
            skip_locked: false,
            nowait: false,
            aggregate_filter: false,
            distinct_on: false,
            nulls_ordering: false,
            pagination: Pagination::LimitOffset,
        }
    }

    pub fn supports(&self, feature: Feature) -> bool {
        match feature {
            Feature::Returning => self.returning,
            Feature::ILike => self.ilike,
            Feature::NativeArrays => self.native_arrays,
            Feature::JsonPath => self.json,
            Feature::JsonContains => self.json,
            Feature::RowLocking => self.row_locking,
            Feature::SkipLocked => self.row_locking && self.skip_locked,
            Feature::Nowait => self.row_locking && self.nowait,
            Feature::AggregateFilter => self.aggregate_filter,
            Feature::DistinctOn => self.distinct_on,
        }
    }
}

/// Gated features, named the way errors report them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    Returning,
    ILike,
    NativeArrays,
    JsonPath,
    JsonContains,
    RowLocking,
    SkipLocked,
    Nowait,
    AggregateFilter,
    DistinctOn,
}

impl Feature {
    pub fn name(&self) -> &'static str {
        match self {
            Feature::Returning => "RETURNING",
            Feature::ILike => "ILIKE",
            Feature::NativeArrays => "native arrays",
            Feature::JsonPath => "JSON path extraction",
            Feature::JsonContains => "JSON containment",
            Feature::RowLocking => "FOR UPDATE",
            Feature::SkipLocked => "SKIP LOCKED",
            Feature::Nowait => "NOWAIT",
            Feature::AggregateFilter => "FILTER",
            Feature::DistinctOn => "DISTINCT ON",
        }
    }

    /// Remediation attached to the unsupported-feature error.
    pub fn hint(&self) -> &'static str {
        match self {
            Feature::Returning => "re-select the affected rows after the write",
            Feature::ILike => "compare LOWER() of both sides with LIKE",
            Feature::NativeArrays => "store the values in a join table or a JSON column",
            Feature::JsonPath => "select the JSON column and extract the path in the application",
            Feature::JsonContains => "match individual JSON paths instead of containment",
            Feature::RowLocking => "use a transaction with a stricter isolation level",
            Feature::SkipLocked => "drop SKIP LOCKED or partition the work explicitly",
            Feature::Nowait => "drop NOWAIT and rely on the lock timeout",
            Feature::AggregateFilter => "use CASE WHEN instead of FILTER",
            Feature::DistinctOn => "use a window function with ROW_NUMBER() instead of DISTINCT ON",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_supports_nothing() {
        let caps = Capabilities::minimal();
        for feature in [
            Feature::Returning,
            Feature::NativeArrays,
            Feature::Nowait,
            Feature::SkipLocked,
            Feature::AggregateFilter,
            Feature::DistinctOn,
        ] {
            assert!(!caps.supports(feature), "{} should be unsupported", feature.name());
        }
    }

    #[test]
    fn test_lock_modifiers_need_row_locking() {
        let caps = Capabilities {
            nowait: true,
            skip_locked: true,
            ..Capabilities::minimal()
        };
        assert!(!caps.supports(Feature::Nowait));
        assert!(!caps.supports(Feature::SkipLocked));
    }

    #[test]
    fn test_filter_hint() {
        assert_eq!(Feature::AggregateFilter.name(), "FILTER");
        assert_eq!(Feature::AggregateFilter.hint(), "use CASE WHEN instead of FILTER");
    }
}
