//! Common test helpers shared across integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use tabula_orm::{ClassProperty, DbType, MemberValue, RowSink, Value, ValueHandler, entity, entity_enum};

// Common test entities used across multiple test files

entity_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Gender {
        Female = 1,
        Male = 2,
    }
}

entity! {
    table = "[dbo].[Person]",
    declare = |definition| definition.primary("id").identity("id").column("name", "FullName"),
    #[derive(Debug, Clone, PartialEq)]
    pub struct Person {
        pub id: i64,
        pub name: String,
        pub gender: Gender,
        pub age: Option<i32>,
    }
}

entity! {
    #[derive(Debug, Clone)]
    pub struct Customer {
        pub customer_id: i64,
        pub name: String,
    }
}

entity! {
    table = "sales.Orders",
    #[derive(Debug, Clone)]
    pub struct Order {
        pub number: String,
        pub total: f64,
    }
}

pub fn person(id: i64, name: &str, gender: Gender, age: Option<i32>) -> Person {
    Person {
        id,
        name: name.to_string(),
        gender,
        age,
    }
}

/// Upper-cases text on the way out.
#[derive(Debug)]
pub struct Upper;

impl ValueHandler for Upper {
    fn db_type(&self) -> Option<DbType> {
        Some(DbType::AnsiString)
    }

    fn set(&self, value: MemberValue, _property: &ClassProperty) -> anyhow::Result<Value> {
        match value.into_value() {
            Value::String(Some(text)) => Ok(Value::from(text.to_uppercase())),
            other => Ok(other),
        }
    }
}

pub fn upper() -> Arc<dyn ValueHandler> {
    Arc::new(Upper)
}

/// Records every written row.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub rows: Vec<Vec<(String, Value, Option<DbType>)>>,
}

impl RowSink for RecordingSink {
    fn start_row(&mut self) -> anyhow::Result<()> {
        self.rows.push(Vec::new());
        Ok(())
    }

    fn write(&mut self, column: &str, value: Value, db_type: Option<DbType>) -> anyhow::Result<()> {
        let row = self.rows.last_mut().ok_or_else(|| anyhow::anyhow!("no row started"))?;
        row.push((column.to_string(), value, db_type));
        Ok(())
    }
}

/// Normalize SQL by collapsing whitespace.
fn normalize_sql(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonicalize SQL for comparison by removing identifier quotes and normalizing whitespace.
/// Preserves quotes inside string literals.
fn canonicalize_sql(sql: &str) -> String {
    let mut cleaned = String::with_capacity(sql.len());
    let mut in_single_quote = false;

    for ch in sql.chars() {
        match ch {
            '\'' => {
                in_single_quote = !in_single_quote;
                cleaned.push(ch);
            }
            '"' | '[' | ']' | '`' if !in_single_quote => {
                // Strip identifier quoting to compare across dialects.
            }
            _ => cleaned.push(ch),
        }
    }

    normalize_sql(&cleaned)
}

/// Assert that SQL contains all expected fragments in order.
///
/// Identifier quotes are stripped and whitespace is normalized before the
/// fragments are matched sequentially.
#[allow(clippy::missing_panics_doc)]
pub fn assert_sql_contains(actual: &str, fragments: &[&str]) {
    let actual_canonical = canonicalize_sql(actual);
    let mut search_start = 0usize;

    for fragment in fragments {
        let fragment_canonical = canonicalize_sql(fragment);
        if fragment_canonical.is_empty() {
            continue;
        }

        if let Some(pos) = actual_canonical[search_start..].find(&fragment_canonical) {
            search_start += pos + fragment_canonical.len();
        } else {
            panic!(
                "expected SQL fragment `{fragment_canonical}` not found in `{actual_canonical}`"
            );
        }
    }
}

/// Routes `tracing` output to the test harness. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
