//! Dialect settings: identifier quoting, parameter naming and feature flags.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::field::unquote;
use crate::types::DbType;

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Dialect {
    /// Microsoft SQL Server.
    #[default]
    SqlServer,
    /// PostgreSQL.
    PostgreSql,
    /// MySQL and MariaDB.
    MySql,
    /// SQLite.
    Sqlite,
}

impl Dialect {
    /// The default settings of the dialect.
    #[must_use]
    pub const fn setting(self) -> DbSetting {
        match self {
            Self::SqlServer => DbSetting::SQL_SERVER,
            Self::PostgreSql => DbSetting::POSTGRES,
            Self::MySql => DbSetting::MYSQL,
            Self::Sqlite => DbSetting::SQLITE,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.setting().name)
    }
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlserver" | "mssql" => Ok(Self::SqlServer),
            "postgres" | "postgresql" | "pg" => Ok(Self::PostgreSql),
            "mysql" | "mariadb" => Ok(Self::MySql),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(Error::invalid(format!("unknown dialect '{other}'"))),
        }
    }
}

/// Per-dialect text conventions used by the statement builders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbSetting {
    /// Dialect name used in diagnostics.
    pub name: &'static str,
    /// Identifier opening quote.
    pub opening_quote: &'static str,
    /// Identifier closing quote.
    pub closing_quote: &'static str,
    /// Prefix of bound parameter names.
    pub parameter_prefix: &'static str,
    /// Separator between schema and table.
    pub schema_separator: &'static str,
    /// Schema assumed for unqualified tables.
    pub default_schema: Option<&'static str>,
    /// Whether table hints may be passed through.
    pub supports_table_hints: bool,
    /// Parameter type used for enum members without a type mapping.
    pub enum_db_type: DbType,
}

impl DbSetting {
    /// SQL Server.
    pub const SQL_SERVER: Self = Self {
        name: "SqlServer",
        opening_quote: "[",
        closing_quote: "]",
        parameter_prefix: "@",
        schema_separator: ".",
        default_schema: Some("dbo"),
        supports_table_hints: true,
        enum_db_type: DbType::String,
    };

    /// PostgreSQL.
    pub const POSTGRES: Self = Self {
        name: "PostgreSql",
        opening_quote: "\"",
        closing_quote: "\"",
        parameter_prefix: "@",
        schema_separator: ".",
        default_schema: Some("public"),
        supports_table_hints: false,
        enum_db_type: DbType::Int32,
    };

    /// MySQL.
    pub const MYSQL: Self = Self {
        name: "MySql",
        opening_quote: "`",
        closing_quote: "`",
        parameter_prefix: "@",
        schema_separator: ".",
        default_schema: None,
        supports_table_hints: false,
        enum_db_type: DbType::String,
    };

    /// SQLite.
    pub const SQLITE: Self = Self {
        name: "Sqlite",
        opening_quote: "[",
        closing_quote: "]",
        parameter_prefix: "@",
        schema_separator: ".",
        default_schema: None,
        supports_table_hints: false,
        enum_db_type: DbType::String,
    };

    /// Quotes an identifier. Multi-part names (`schema.table`) are split and
    /// every part is quoted; parts that are already quoted are re-quoted in
    /// this dialect's style.
    #[must_use]
    pub fn quote(&self, name: &str) -> String {
        split_parts(name.trim(), self.schema_separator)
            .iter()
            .map(|part| format!("{}{}{}", self.opening_quote, unquote(part), self.closing_quote))
            .collect::<Vec<_>>()
            .join(self.schema_separator)
    }

    /// The bound parameter name of a field, prefixed.
    #[must_use]
    pub fn parameter(&self, name: &str) -> String {
        format!("{}{}", self.parameter_prefix, parameter_name(name))
    }
}

impl Default for DbSetting {
    fn default() -> Self {
        Self::SQL_SERVER
    }
}

/// A field name usable as a parameter name: quotes stripped and spaces
/// replaced with underscores.
#[must_use]
pub fn parameter_name(name: &str) -> String {
    unquote(name).replace(' ', "_")
}

/// Splits a multi-part identifier on `separator`, ignoring separators inside
/// quoted parts.
pub(crate) fn split_parts<'a>(name: &'a str, separator: &str) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut closing: Option<char> = None;
    let mut start = 0;

    for (index, ch) in name.char_indices() {
        match closing {
            Some(close) if ch == close => closing = None,
            Some(_) => {}
            None => match ch {
                '[' => closing = Some(']'),
                '"' | '`' => closing = Some(ch),
                _ if name[index..].starts_with(separator) => {
                    parts.push(name[start..index].trim());
                    start = index + separator.len();
                }
                _ => {}
            },
        }
    }
    parts.push(name[start..].trim());
    parts.retain(|part| !part.is_empty());
    parts
}
