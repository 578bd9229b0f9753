//! Named parameter collection shared by every node rendered into one
//! statement.

use crate::dialect::Dialect;
use crate::Value;

/// Collects bind values under generated names `p1`, `p2`, ... in first-use
/// order.
///
/// One sink is threaded through a whole statement, nested subqueries
/// included, so names never collide and bind order equals textual order.
#[derive(Debug, Clone, Default)]
pub struct ParamSink {
    params: Vec<(String, Value)>,
}

impl ParamSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a value and returns the placeholder that refers to it.
    pub fn bind(&mut self, dialect: &Dialect, value: impl Into<Value>) -> String {
        let name = format!("p{}", self.params.len() + 1);
        let placeholder = dialect.placeholder(&name);
        self.params.push((name, value.into()));
        placeholder
    }

    /// Registers each value, returning the placeholders comma-joined.
    pub fn bind_all(&mut self, dialect: &Dialect, values: &[Value]) -> String {
        values
            .iter()
            .map(|value| self.bind(dialect, value.clone()))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn into_params(self) -> Vec<(String, Value)> {
        self.params
    }
}
