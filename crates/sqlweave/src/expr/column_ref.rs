use crate::dialect::Dialect;
use crate::query::helpers::validate_identifier_part;
use crate::Result;

use super::ParamSink;

/// Reference to a column, optionally table-qualified and optionally
/// drilling into a JSON document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    qualifier: Option<String>,
    name: String,
    json_path: Vec<String>,
}

impl ColumnRef {
    /// Parses `"column"` or `"table.column"`.
    pub fn new(name: &str) -> Self {
        match name.rsplit_once('.') {
            Some((qualifier, column)) => Self::qualified(qualifier, column),
            None => Self {
                qualifier: None,
                name: name.to_string(),
                json_path: Vec::new(),
            },
        }
    }

    pub fn qualified(qualifier: &str, name: &str) -> Self {
        Self {
            qualifier: Some(qualifier.to_string()),
            name: name.to_string(),
            json_path: Vec::new(),
        }
    }

    /// Targets the text at a dotted path inside a JSON column.
    pub fn json(mut self, path: &str) -> Self {
        self.json_path = path
            .split('.')
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    pub fn json_path(&self) -> &[String] {
        &self.json_path
    }

    /// Checks every identifier part; `*` is accepted as a column name.
    pub fn validate(&self) -> Result<()> {
        if let Some(qualifier) = &self.qualifier {
            for part in qualifier.split('.') {
                validate_identifier_part(part)?;
            }
        }
        if self.name != "*" {
            validate_identifier_part(&self.name)?;
        }
        Ok(())
    }

    /// Quoted column text, ignoring any JSON path.
    pub fn quoted(&self, dialect: &Dialect) -> String {
        let name = if self.name == "*" {
            "*".to_string()
        } else {
            dialect.quote_identifier(&self.name)
        };
        match &self.qualifier {
            Some(qualifier) => format!("{}.{}", dialect.quote_identifier(qualifier), name),
            None => name,
        }
    }

    pub fn render(&self, dialect: &Dialect, sink: &mut ParamSink) -> Result<String> {
        let column = self.quoted(dialect);
        if self.json_path.is_empty() {
            return Ok(column);
        }
        let segments: Vec<&str> = self.json_path.iter().map(String::as_str).collect();
        let placeholders: Vec<String> = dialect
            .json_path_values(&segments)
            .into_iter()
            .map(|value| sink.bind(dialect, value))
            .collect();
        dialect.json_extract_text(&column, &placeholders)
    }
}

impl From<&str> for ColumnRef {
    fn from(name: &str) -> Self {
        ColumnRef::new(name)
    }
}

impl From<String> for ColumnRef {
    fn from(name: String) -> Self {
        ColumnRef::new(&name)
    }
}

impl From<&String> for ColumnRef {
    fn from(name: &String) -> Self {
        ColumnRef::new(name)
    }
}
