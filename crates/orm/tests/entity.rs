//! Integration tests for the ``entity!`` and ``entity_enum!`` macros.
//!
//! Tests the public API as users would interact with it.

#![allow(
    missing_docs,
    clippy::struct_field_names,
    clippy::approx_constant,
    clippy::float_cmp
)]

mod common;

use chrono::{DateTime, NaiveDate, Utc};
use common::{Customer, Gender, Person, person};
use tabula_orm::{
    AttributeResolver, DbType, Entity, Error, FromValue, MemberType, MemberValue, Registry, Value, ValueKind,
    entity,
};

entity! {
    table = "test_records",
    pub struct TestRecords {
        pub bool_field: bool,
        pub i32_field: i32,
        pub i64_field: i64,
        pub u32_field: u32,
        pub f64_field: f64,
        pub string_field: String,
        pub bytes_field: Vec<u8>,
        pub date_field: NaiveDate,
        pub dt_field: DateTime<Utc>,
        pub optional_field: Option<String>,
    }
}

entity! {
    declare = |definition| definition.primary("code").db_type("code", DbType::AnsiString),
    pub struct Currency {
        pub code: String,
        pub name: String,
    }
}

entity! {
    declare = |definition| definition.primary("missing"),
    pub struct Broken {
        pub id: i64,
    }
}

#[test]
fn entity_basic() {
    let declared = AttributeResolver::resolve::<Person>().unwrap();
    assert_eq!(declared.table(), Some("[dbo].[Person]"));
    assert_eq!(declared.members().iter().map(|m| m.name()).collect::<Vec<_>>(), ["id", "name", "gender", "age"]);
    assert_eq!(declared.primary().map(|m| m.name()), Some("id"));
    assert_eq!(declared.identity().map(|m| m.name()), Some("id"));
    assert_eq!(declared.find("FullName").map(|m| m.name()), Some("name"));

    let declared = AttributeResolver::resolve::<Customer>().unwrap();
    assert_eq!(declared.table(), None);
    assert!(declared.primary().is_none());
}

#[test]
fn entity_declarations() {
    let registry = Registry::new();
    let metadata = registry.metadata();
    assert_eq!(metadata.primary::<Currency>().unwrap().map(|p| p.name()), Some("code"));
    assert_eq!(metadata.db_type::<Currency>("code").unwrap(), Some(DbType::AnsiString));
    assert_eq!(metadata.db_type::<Currency>("name").unwrap(), Some(DbType::String));
    assert_eq!(&*metadata.table_name::<Currency>().unwrap(), "Currency");
}

#[test]
fn entity_invalid_declarations() {
    let err = AttributeResolver::resolve::<Broken>().unwrap_err();
    assert_eq!(err, Error::PropertyNotFound { entity: "Broken".to_string(), member: "missing".to_string() });

    let registry = Registry::new();
    assert!(registry.metadata().table_name::<Broken>().is_err());
    assert!(registry.tables().add::<Broken>("Broken", false).is_ok());
}

#[test]
fn entity_values() {
    let alice = person(7, "Alice", Gender::Male, None);
    assert_eq!(alice.value("id"), Some(MemberValue::Scalar(Value::BigInt(Some(7)))));
    assert_eq!(alice.value("age"), Some(MemberValue::Scalar(Value::Int(None))));
    assert!(alice.value("FullName").is_none());

    let Some(MemberValue::Enum(Some(gender))) = alice.value("gender") else {
        panic!("expected an enum value");
    };
    assert_eq!((gender.name, gender.ordinal), ("Male", 2));
}

#[test]
fn entity_set_values() {
    let mut alice = person(7, "Alice", Gender::Male, None);
    alice.set_value("id", Value::Int(Some(8))).unwrap();
    alice.set_value("age", Value::BigInt(Some(41))).unwrap();
    alice.set_value("gender", Value::from("FEMALE")).unwrap();
    assert_eq!(alice, person(8, "Alice", Gender::Female, Some(41)));

    assert!(alice.set_value("id", Value::from("seven")).is_err());
    assert!(alice.set_value("id", Value::BigInt(None)).is_err());
    let err = alice.set_value("nickname", Value::from("Al")).unwrap_err();
    assert!(err.to_string().contains("nickname"));
}

#[test]
fn entity_with_multiple_fields() {
    let mut record = TestRecords {
        bool_field: false,
        i32_field: 0,
        i64_field: 0,
        u32_field: 0,
        f64_field: 0.0,
        string_field: String::new(),
        bytes_field: Vec::new(),
        date_field: NaiveDate::default(),
        dt_field: DateTime::<Utc>::default(),
        optional_field: None,
    };

    record.set_value("bool_field", Value::TinyInt(Some(1))).unwrap();
    record.set_value("i32_field", Value::BigInt(Some(42))).unwrap();
    record.set_value("i64_field", Value::Int(Some(-5))).unwrap();
    record.set_value("u32_field", Value::BigInt(Some(7))).unwrap();
    record.set_value("f64_field", Value::Float(Some(1.5))).unwrap();
    record.set_value("string_field", Value::from("text")).unwrap();
    record.set_value("bytes_field", Value::Bytes(Some(Box::new(vec![1, 2, 3])))).unwrap();
    record.set_value("date_field", Value::from("2024-01-15")).unwrap();
    record.set_value("dt_field", Value::from("2024-01-15 10:30:45.123")).unwrap();
    record.set_value("optional_field", Value::from("present")).unwrap();

    assert!(record.bool_field);
    assert_eq!(record.i32_field, 42);
    assert_eq!(record.i64_field, -5);
    assert_eq!(record.u32_field, 7);
    assert_eq!(record.f64_field, 1.5);
    assert_eq!(record.string_field, "text");
    assert_eq!(record.bytes_field, vec![1, 2, 3]);
    assert_eq!(record.date_field.to_string(), "2024-01-15");
    assert_eq!(record.dt_field.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-01-15 10:30:45");
    assert_eq!(record.optional_field.as_deref(), Some("present"));

    assert!(record.set_value("u32_field", Value::BigInt(Some(-1))).is_err());
    assert!(record.set_value("dt_field", Value::from("not a valid date")).is_err());
}

#[test]
fn member_kinds() {
    assert_eq!(<Option<i32> as MemberType>::kind(), ValueKind::I32);
    assert!(<Option<i32> as MemberType>::nullable());
    assert!(!<i32 as MemberType>::nullable());
    assert_eq!(<Gender as MemberType>::kind(), ValueKind::Enum("Gender"));
    assert_eq!(<Option<Gender> as MemberType>::null_value(), MemberValue::Enum(None));

    assert_eq!(<Gender as FromValue>::from_value(Value::BigUnsigned(Some(2))).unwrap(), Gender::Male);
    assert!(<Gender as FromValue>::from_value(Value::Int(Some(3))).is_err());
    assert_eq!(<Option<Gender> as FromValue>::from_value(Value::String(None)).unwrap(), None);
}
