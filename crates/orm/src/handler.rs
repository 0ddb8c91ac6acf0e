use std::fmt::Debug;

use anyhow::Result;
use sea_query::Value;

use crate::field::ClassProperty;
use crate::types::DbType;
use crate::value::MemberValue;

/// Custom conversion attached to a member or to a member value type.
///
/// A handler owns the conversion in both directions: `set` turns a member
/// value into the value written to the database and `get` converts a
/// database value back before it is assigned to the member.
pub trait ValueHandler: Debug + Send + Sync {
    /// The database type of the converted value. When present it takes
    /// precedence over every other type mapping for the member.
    fn db_type(&self) -> Option<DbType> {
        None
    }

    /// Convert an outbound member value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be converted.
    fn set(&self, value: MemberValue, property: &ClassProperty) -> Result<Value>;

    /// Convert an inbound database value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be converted.
    fn get(&self, value: Value, property: &ClassProperty) -> Result<Value> {
        let _ = property;
        Ok(value)
    }
}
