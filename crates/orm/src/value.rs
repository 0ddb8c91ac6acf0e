//! Member values and conversions between entity members and ``SeaQuery``
//! values.

use anyhow::{Result, anyhow, bail};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sea_query::Value;

use crate::types::{TypeKey, ValueKind};

/// A value read from an entity member.
///
/// Enum members keep both their name and ordinal so the writer can pick the
/// wire encoding required by the destination column.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberValue {
    /// A plain value, possibly a typed NULL.
    Scalar(Value),
    /// An enum member; `None` is NULL.
    Enum(Option<EnumValue>),
}

/// Name and ordinal of an enum variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnumValue {
    /// Variant name.
    pub name: &'static str,
    /// Variant discriminant.
    pub ordinal: i64,
}

impl MemberValue {
    /// Whether the value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        match self {
            Self::Scalar(value) => is_null(value),
            Self::Enum(value) => value.is_none(),
        }
    }

    /// Converts into a plain value, encoding enums by name.
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::Scalar(value) => value,
            Self::Enum(value) => Value::String(value.map(|e| Box::new(e.name.to_string()))),
        }
    }
}

/// Types that can be declared as entity members.
pub trait MemberType: Clone + 'static {
    /// The member kind.
    fn kind() -> ValueKind;

    /// Whether the member accepts NULL.
    #[must_use]
    fn nullable() -> bool {
        false
    }

    /// The registry key for the underlying value type. `Option<T>` reports `T`.
    #[must_use]
    fn type_key() -> TypeKey {
        TypeKey::of::<Self>()
    }

    /// Reads the member value.
    fn into_member_value(self) -> MemberValue;

    /// The typed NULL for this member.
    fn null_value() -> MemberValue;
}

macro_rules! member_type {
    ($($ty:ty => $kind:ident, $variant:ident);* $(;)?) => {
        $(
            impl MemberType for $ty {
                fn kind() -> ValueKind {
                    ValueKind::$kind
                }

                fn into_member_value(self) -> MemberValue {
                    MemberValue::Scalar(Value::from(self))
                }

                fn null_value() -> MemberValue {
                    MemberValue::Scalar(Value::$variant(None))
                }
            }
        )*
    };
}

member_type! {
    bool => Bool, Bool;
    i8 => I8, TinyInt;
    i16 => I16, SmallInt;
    i32 => I32, Int;
    i64 => I64, BigInt;
    u8 => U8, TinyUnsigned;
    u16 => U16, SmallUnsigned;
    u32 => U32, Unsigned;
    u64 => U64, BigUnsigned;
    f32 => F32, Float;
    f64 => F64, Double;
    char => Char, Char;
    String => String, String;
    Vec<u8> => Bytes, Bytes;
    NaiveDate => Date, ChronoDate;
    NaiveTime => Time, ChronoTime;
    NaiveDateTime => DateTime, ChronoDateTime;
    DateTime<Utc> => DateTimeUtc, ChronoDateTimeUtc;
    serde_json::Value => Json, Json;
}

impl<T: MemberType> MemberType for Option<T> {
    fn kind() -> ValueKind {
        T::kind()
    }

    fn nullable() -> bool {
        true
    }

    fn type_key() -> TypeKey {
        T::type_key()
    }

    fn into_member_value(self) -> MemberValue {
        self.map_or_else(T::null_value, T::into_member_value)
    }

    fn null_value() -> MemberValue {
        T::null_value()
    }
}

/// Trait for types that can be assigned from a database value.
pub trait FromValue: Sized {
    /// Convert a value into the member type.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is NULL or cannot be converted.
    fn from_value(value: Value) -> Result<Self>;
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bool(Some(v)) => Ok(v),
            other => as_i64(&other).map(|v| v != 0).ok_or_else(|| anyhow!("expected boolean value")),
        }
    }
}

macro_rules! from_integer {
    ($($ty:ty),*) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: Value) -> Result<Self> {
                    let Some(v) = as_i128(&value) else {
                        bail!("expected integer value for {}", stringify!($ty));
                    };
                    <$ty>::try_from(v)
                        .map_err(|_e| anyhow!("value {v} is out of range for {}", stringify!($ty)))
                }
            }
        )*
    };
}

from_integer!(i8, i16, i32, i64, u8, u16, u32, u64);

impl FromValue for f32 {
    #[allow(clippy::cast_possible_truncation)]
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Float(Some(v)) => Ok(v),
            Value::Double(Some(v)) => Ok(v as Self),
            _ => bail!("expected float value"),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Double(Some(v)) => Ok(v),
            Value::Float(Some(v)) => Ok(Self::from(v)),
            _ => bail!("expected double value"),
        }
    }
}

impl FromValue for char {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Char(Some(v)) => Ok(v),
            Value::String(Some(raw)) => {
                let mut chars = raw.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) => Ok(ch),
                    _ => bail!("expected a single character, got '{raw}'"),
                }
            }
            _ => bail!("expected char value"),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::String(Some(raw)) => Ok(*raw),
            Value::Char(Some(ch)) => Ok(ch.to_string()),
            _ => bail!("expected string value"),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bytes(Some(bytes)) => Ok(*bytes),
            _ => bail!("expected binary value"),
        }
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::ChronoDate(Some(date)) => Ok(*date),
            Value::String(Some(raw)) => Self::parse_from_str(&raw, "%Y-%m-%d")
                .map_err(|_e| anyhow!("unsupported date: {raw}; expected \"%Y-%m-%d\" format")),
            _ => bail!("expected date value"),
        }
    }
}

impl FromValue for NaiveTime {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::ChronoTime(Some(time)) => Ok(*time),
            Value::String(Some(raw)) => Self::parse_from_str(&raw, "%H:%M:%S%.f")
                .map_err(|_e| anyhow!("unsupported time: {raw}; expected \"%H:%M:%S%.f\" format")),
            _ => bail!("expected time value"),
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::ChronoDateTime(Some(dt)) => Ok(*dt),
            Value::ChronoDateTimeUtc(Some(dt)) => Ok(dt.naive_utc()),
            Value::String(Some(raw)) => Self::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S%.f")
                .map_err(|_e| {
                    anyhow!("unsupported timestamp: {raw}; expected \"%Y-%m-%d %H:%M:%S%.f\" format")
                }),
            _ => bail!("expected timestamp value"),
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::ChronoDateTimeUtc(Some(dt)) => Ok(*dt),
            Value::ChronoDateTime(Some(dt)) => Ok(Self::from_naive_utc_and_offset(*dt, Utc)),
            Value::String(Some(raw)) => {
                if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
                    return Ok(parsed.with_timezone(&Utc));
                }
                if let Ok(parsed) = NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S%.f") {
                    return Ok(Self::from_naive_utc_and_offset(parsed, Utc));
                }
                bail!(
                    "unsupported timestamp: {raw}; expected RFC3339 or \"%Y-%m-%d %H:%M:%S%.f\" format"
                )
            }
            _ => bail!("expected timestamp value"),
        }
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Json(Some(json)) => Ok(*json),
            Value::String(Some(raw)) => Ok(serde_json::from_str(&raw)?),
            Value::Bytes(Some(bytes)) => Ok(serde_json::from_slice(&bytes)?),
            _ => bail!("expected json compatible value"),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self> {
        if is_null(&value) {
            return Ok(None);
        }
        T::from_value(value).map(Some)
    }
}

/// Whether a value is a typed NULL.
#[must_use]
pub const fn is_null(value: &Value) -> bool {
    matches!(
        value,
        Value::Bool(None)
            | Value::TinyInt(None)
            | Value::SmallInt(None)
            | Value::Int(None)
            | Value::BigInt(None)
            | Value::TinyUnsigned(None)
            | Value::SmallUnsigned(None)
            | Value::Unsigned(None)
            | Value::BigUnsigned(None)
            | Value::Float(None)
            | Value::Double(None)
            | Value::String(None)
            | Value::Char(None)
            | Value::Bytes(None)
            | Value::Json(None)
            | Value::ChronoDate(None)
            | Value::ChronoTime(None)
            | Value::ChronoDateTime(None)
            | Value::ChronoDateTimeUtc(None)
    )
}

/// Reads any integer value widened to `i64`.
#[must_use]
pub fn as_i64(value: &Value) -> Option<i64> {
    as_i128(value).and_then(|v| i64::try_from(v).ok())
}

fn as_i128(value: &Value) -> Option<i128> {
    match value {
        Value::TinyInt(Some(v)) => Some(i128::from(*v)),
        Value::SmallInt(Some(v)) => Some(i128::from(*v)),
        Value::Int(Some(v)) => Some(i128::from(*v)),
        Value::BigInt(Some(v)) => Some(i128::from(*v)),
        Value::TinyUnsigned(Some(v)) => Some(i128::from(*v)),
        Value::SmallUnsigned(Some(v)) => Some(i128::from(*v)),
        Value::Unsigned(Some(v)) => Some(i128::from(*v)),
        Value::BigUnsigned(Some(v)) => Some(i128::from(*v)),
        Value::Bool(Some(v)) => Some(i128::from(*v)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_values() {
        assert_eq!(42_i32.into_member_value(), MemberValue::Scalar(Value::Int(Some(42))));
        assert_eq!(
            Option::<String>::None.into_member_value(),
            MemberValue::Scalar(Value::String(None))
        );
        assert!(Option::<i64>::None.into_member_value().is_null());
        assert!(<Option<i64> as MemberType>::nullable());
        assert_eq!(<Option<i64> as MemberType>::type_key(), TypeKey::of::<i64>());
    }

    #[test]
    fn integer_widening() {
        assert_eq!(i64::from_value(Value::Int(Some(7))).unwrap(), 7);
        assert_eq!(u8::from_value(Value::BigInt(Some(255))).unwrap(), 255);
        assert!(u8::from_value(Value::BigInt(Some(256))).is_err());
        assert!(i32::from_value(Value::String(Some(Box::new("1".to_string())))).is_err());
    }

    #[test]
    fn optional_values() {
        assert_eq!(Option::<i32>::from_value(Value::Int(None)).unwrap(), None);
        assert_eq!(Option::<i32>::from_value(Value::Int(Some(3))).unwrap(), Some(3));
        assert!(i32::from_value(Value::Int(None)).is_err());
    }

    #[test]
    fn timestamps() {
        let parsed = DateTime::<Utc>::from_value(Value::String(Some(Box::new(
            "2024-01-15T10:30:45Z".to_string(),
        ))))
        .unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-01-15T10:30:45+00:00");

        let result = DateTime::<Utc>::from_value(Value::String(Some(Box::new(
            "invalid date".to_string(),
        ))));
        assert!(result.unwrap_err().to_string().contains("unsupported timestamp"));
    }

    #[test]
    fn enum_as_value() {
        let value = MemberValue::Enum(Some(EnumValue {
            name: "Male",
            ordinal: 1,
        }));
        assert_eq!(value.into_value(), Value::String(Some(Box::new("Male".to_string()))));
        assert!(MemberValue::Enum(None).is_null());
    }
}
