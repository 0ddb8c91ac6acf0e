//! Database and member type descriptors.

use std::any::{TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Database parameter type of a column or member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum DbType {
    AnsiString,
    AnsiStringFixedLength,
    Binary,
    Boolean,
    Byte,
    Currency,
    Date,
    DateTime,
    DateTime2,
    DateTimeOffset,
    Decimal,
    Double,
    Guid,
    Int16,
    Int32,
    Int64,
    Object,
    SByte,
    Single,
    String,
    StringFixedLength,
    Time,
    UInt16,
    UInt32,
    UInt64,
    Xml,
}

impl DbType {
    /// Whether values of this type are written as text.
    #[must_use]
    pub const fn is_textual(self) -> bool {
        matches!(
            self,
            Self::AnsiString
                | Self::AnsiStringFixedLength
                | Self::String
                | Self::StringFixedLength
                | Self::Xml
        )
    }
}

/// The Rust-side kind of an entity member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ValueKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Char,
    String,
    Bytes,
    Date,
    Time,
    DateTime,
    DateTimeUtc,
    Json,
    /// A fieldless enum, named by its type.
    Enum(&'static str),
}

impl ValueKind {
    /// Default database type for the kind. Enums have no primitive default;
    /// their encoding is a dialect setting.
    #[must_use]
    pub const fn default_db_type(self) -> Option<DbType> {
        let db_type = match self {
            Self::Bool => DbType::Boolean,
            Self::I8 => DbType::SByte,
            Self::I16 => DbType::Int16,
            Self::I32 => DbType::Int32,
            Self::I64 => DbType::Int64,
            Self::U8 => DbType::Byte,
            Self::U16 => DbType::UInt16,
            Self::U32 => DbType::UInt32,
            Self::U64 => DbType::UInt64,
            Self::F32 => DbType::Single,
            Self::F64 => DbType::Double,
            Self::Char => DbType::StringFixedLength,
            Self::String | Self::Json => DbType::String,
            Self::Bytes => DbType::Binary,
            Self::Date => DbType::Date,
            Self::Time => DbType::Time,
            Self::DateTime => DbType::DateTime2,
            Self::DateTimeUtc => DbType::DateTimeOffset,
            Self::Enum(_) => return None,
        };
        Some(db_type)
    }

    /// Whether the kind is an enum.
    #[must_use]
    pub const fn is_enum(self) -> bool {
        matches!(self, Self::Enum(_))
    }
}

/// Direction of a command parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum ParameterDirection {
    #[default]
    Input,
    Output,
    InputOutput,
    ReturnValue,
}

/// Extra per-parameter settings attached to a member, applied in order when
/// the member is bound as a command parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterAttribute {
    /// Parameter name override.
    Name(String),
    /// Maximum size in bytes or characters.
    Size(u32),
    /// Numeric precision.
    Precision(u8),
    /// Numeric scale.
    Scale(u8),
    /// Parameter direction.
    Direction(ParameterDirection),
    /// Explicit nullability.
    IsNullable(bool),
    /// Explicit parameter type.
    DbType(DbType),
}

/// Identity of a Rust type used as a registry key.
///
/// Equality and hashing use the [`TypeId`] only; the name is kept for
/// diagnostics.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Key for the type `T`.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// Fully qualified type name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The last path segment of the type name, without generic arguments.
    #[must_use]
    pub fn simple_name(&self) -> &'static str {
        let name = self.name.split('<').next().unwrap_or(self.name);
        name.rsplit("::").next().unwrap_or(name)
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.simple_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Person;

    #[test]
    fn type_key_names() {
        let key = TypeKey::of::<Person>();
        assert_eq!(key.simple_name(), "Person");
        assert_eq!(key, TypeKey::of::<Person>());
        assert_ne!(key, TypeKey::of::<String>());
        assert_eq!(TypeKey::of::<Vec<u8>>().simple_name(), "Vec");
    }

    #[test]
    fn primitive_defaults() {
        assert_eq!(ValueKind::I64.default_db_type(), Some(DbType::Int64));
        assert_eq!(ValueKind::DateTimeUtc.default_db_type(), Some(DbType::DateTimeOffset));
        assert_eq!(ValueKind::Enum("Gender").default_db_type(), None);
    }
}
