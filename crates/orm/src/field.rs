//! Field, ordering and column descriptors.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{DbType, TypeKey, ValueKind};

/// An unqualified identifier naming one mapped member or column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Field {
    name: String,
}

impl Field {
    /// Creates a field, trimming surrounding whitespace.
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            name: name.as_ref().trim().to_string(),
        }
    }

    /// Creates one field per name, in order.
    #[must_use]
    pub fn from_names<I, S>(names: I) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names.into_iter().map(Self::new).collect()
    }

    /// The field name as given.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The field name without identifier quotes.
    #[must_use]
    pub fn unquoted(&self) -> &str {
        unquote(&self.name)
    }

    /// Case-insensitive, quote-stripped name comparison.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        same_name(&self.name, name)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<&str> for Field {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Field {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl AsRef<str> for Field {
    fn as_ref(&self) -> &str {
        &self.name
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    /// Ascending.
    #[default]
    Ascending,
    /// Descending.
    Descending,
}

impl Direction {
    /// The SQL keyword for the direction.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

/// A field with its sort direction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderField {
    /// The ordered field.
    pub field: Field,
    /// Sort direction.
    pub direction: Direction,
}

impl OrderField {
    /// Creates an order field.
    #[must_use]
    pub fn new(field: impl Into<Field>, direction: Direction) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    /// Ascending order on `field`.
    #[must_use]
    pub fn ascending(field: impl Into<Field>) -> Self {
        Self::new(field, Direction::Ascending)
    }

    /// Descending order on `field`.
    #[must_use]
    pub fn descending(field: impl Into<Field>) -> Self {
        Self::new(field, Direction::Descending)
    }
}

/// A database column as reported by a schema provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DbField {
    /// Column name.
    pub name: String,
    /// Part of the primary key.
    pub is_primary: bool,
    /// Generated by the database on insert.
    pub is_identity: bool,
    /// Accepts NULL.
    pub is_nullable: bool,
    /// Parameter type, when known.
    pub db_type: Option<DbType>,
    /// Maximum length.
    pub size: Option<u32>,
    /// Numeric precision.
    pub precision: Option<u8>,
    /// Numeric scale.
    pub scale: Option<u8>,
    /// Native database type name.
    pub database_type: Option<String>,
}

impl DbField {
    /// A nullable-false, non-key column.
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            name: name.as_ref().trim().to_string(),
            ..Self::default()
        }
    }

    /// Marks the column as primary.
    #[must_use]
    pub const fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }

    /// Marks the column as identity.
    #[must_use]
    pub const fn identity(mut self) -> Self {
        self.is_identity = true;
        self
    }

    /// Marks the column as nullable.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.is_nullable = true;
        self
    }

    /// Sets the parameter type.
    #[must_use]
    pub const fn with_db_type(mut self, db_type: DbType) -> Self {
        self.db_type = Some(db_type);
        self
    }

    /// The column as a [`Field`].
    #[must_use]
    pub fn as_field(&self) -> Field {
        Field::new(&self.name)
    }
}

/// A resolved entity member: its declared name, mapped column name and key
/// flags. Created once per member by the metadata cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassProperty {
    pub(crate) entity: TypeKey,
    pub(crate) name: &'static str,
    pub(crate) mapped_name: String,
    pub(crate) kind: ValueKind,
    pub(crate) value_type: TypeKey,
    pub(crate) nullable: bool,
    pub(crate) is_primary: bool,
    pub(crate) is_identity: bool,
}

impl ClassProperty {
    /// The owning entity type.
    #[must_use]
    pub const fn entity(&self) -> TypeKey {
        self.entity
    }

    /// The member name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The resolved column name.
    #[must_use]
    pub fn mapped_name(&self) -> &str {
        &self.mapped_name
    }

    /// The member kind.
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        self.kind
    }

    /// The registry key of the member value type.
    #[must_use]
    pub const fn value_type(&self) -> TypeKey {
        self.value_type
    }

    /// Whether the member accepts NULL.
    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Whether the member is the primary key.
    #[must_use]
    pub const fn is_primary(&self) -> bool {
        self.is_primary
    }

    /// Whether the member is generated by the database.
    #[must_use]
    pub const fn is_identity(&self) -> bool {
        self.is_identity
    }

    /// The mapped column as a [`Field`].
    #[must_use]
    pub fn as_field(&self) -> Field {
        Field::new(&self.mapped_name)
    }

    /// The mapped column as a [`DbField`] carrying the key flags.
    #[must_use]
    pub fn as_db_field(&self) -> DbField {
        DbField {
            name: self.mapped_name.clone(),
            is_primary: self.is_primary,
            is_identity: self.is_identity,
            is_nullable: self.nullable,
            db_type: self.kind.default_db_type(),
            ..DbField::default()
        }
    }
}

/// Strips one level of `[..]`, `".."` or `` `..` `` quoting.
#[must_use]
pub fn unquote(name: &str) -> &str {
    let name = name.trim();
    for (open, close) in [('[', ']'), ('"', '"'), ('`', '`')] {
        if let Some(inner) = name.strip_prefix(open).and_then(|n| n.strip_suffix(close)) {
            return inner;
        }
    }
    name
}

/// Case-insensitive, quote-stripped identifier comparison.
#[must_use]
pub fn same_name(left: &str, right: &str) -> bool {
    unquote(left).eq_ignore_ascii_case(unquote(right))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_normalized() {
        assert_eq!(unquote("[Name]"), "Name");
        assert_eq!(unquote("\"Name\""), "Name");
        assert_eq!(unquote(" `Name` "), "Name");
        assert_eq!(unquote("Name"), "Name");
        assert!(Field::new("[FirstName]").matches("firstname"));
        assert!(!Field::new("FirstName").matches("LastName"));
    }

    #[test]
    fn db_field_from_json() {
        let field: DbField =
            serde_json::from_str(r#"{"name":"Id","is_primary":true,"is_identity":true}"#)
                .unwrap();
        assert_eq!(field, DbField::new("Id").primary().identity());
    }
}
