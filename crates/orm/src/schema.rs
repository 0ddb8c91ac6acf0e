//! Column metadata sources.

use std::collections::HashMap;

use anyhow::{Context, Result};

use crate::field::{DbField, unquote};
use crate::setting::split_parts;

/// Supplies the ordered columns of a table, usually by querying the
/// database catalog. Results must be stable for a given table within one
/// schema snapshot.
pub trait SchemaProvider: Send + Sync {
    /// The columns of `table`, in table order.
    ///
    /// # Errors
    ///
    /// Returns an error if the table's columns cannot be read.
    fn columns(&self, table: &str) -> Result<Vec<DbField>>;
}

/// A fixed, in-memory schema snapshot.
///
/// Table names are matched ignoring identifier quotes and case.
#[derive(Debug, Clone, Default)]
pub struct StaticSchemaProvider {
    tables: HashMap<String, Vec<DbField>>,
}

impl StaticSchemaProvider {
    /// An empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a table.
    #[must_use]
    pub fn with_table(mut self, table: &str, columns: Vec<DbField>) -> Self {
        self.tables.insert(table_key(table), columns);
        self
    }

    /// Loads a snapshot from a JSON object of table name to column list.
    ///
    /// ```json
    /// { "[dbo].[Person]": [ { "name": "Id", "is_primary": true, "is_identity": true } ] }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is not a valid snapshot.
    pub fn from_json(json: &str) -> Result<Self> {
        let tables: HashMap<String, Vec<DbField>> =
            serde_json::from_str(json).context("issue parsing schema snapshot")?;
        Ok(tables.into_iter().fold(Self::new(), |provider, (table, columns)| {
            provider.with_table(&table, columns)
        }))
    }
}

impl SchemaProvider for StaticSchemaProvider {
    fn columns(&self, table: &str) -> Result<Vec<DbField>> {
        self.tables
            .get(&table_key(table))
            .cloned()
            .with_context(|| format!("table '{table}' is not in the schema snapshot"))
    }
}

fn table_key(table: &str) -> String {
    split_parts(table.trim(), ".")
        .into_iter()
        .map(|part| unquote(part).to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join(".")
}
