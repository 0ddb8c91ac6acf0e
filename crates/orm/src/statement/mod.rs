//! Dialect-aware SQL statement synthesis.
//!
//! Every `create_*` method validates its arguments, appends one statement to
//! the supplied [`QueryBuilder`] and returns the appended text. Invalid
//! arguments fail before anything is written.
//!
//! The provided method bodies emit the common ANSI forms; dialects override
//! the operations and hooks where their syntax differs.

mod mysql;
mod postgres;
mod sqlite;
mod sqlserver;
pub(crate) mod validate;

use serde::{Deserialize, Serialize};

pub use self::mysql::MySqlStatementBuilder;
pub use self::postgres::PostgresStatementBuilder;
pub use self::sqlite::SqliteStatementBuilder;
pub use self::sqlserver::SqlServerStatementBuilder;
use crate::error::{Error, Result};
use crate::field::{DbField, Field, OrderField, same_name};
use crate::filter::QueryGroup;
use crate::query::QueryBuilder;
use crate::setting::{DbSetting, Dialect, parameter_name};

/// Aggregate function of an aggregate statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum Aggregate {
    Max,
    Min,
    Sum,
    Average,
}

impl Aggregate {
    /// SQL function name.
    #[must_use]
    pub const fn function(self) -> &'static str {
        match self {
            Self::Max => "MAX",
            Self::Min => "MIN",
            Self::Sum => "SUM",
            Self::Average => "AVG",
        }
    }

    /// Result column alias.
    #[must_use]
    pub const fn alias(self) -> &'static str {
        match self {
            Self::Max => "MaxValue",
            Self::Min => "MinValue",
            Self::Sum => "SumValue",
            Self::Average => "AverageValue",
        }
    }
}

/// What an insert or merge selects back as its `Result` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultColumn<'a> {
    /// The value generated for this identity column.
    Identity(&'a DbField),
    /// The bound value of this non-generated primary column.
    Primary(&'a DbField),
    /// No key; selects NULL.
    Nothing,
}

impl<'a> ResultColumn<'a> {
    fn resolve(primary: Option<&'a DbField>, identity: Option<&'a DbField>) -> Self {
        match (primary, identity) {
            (_, Some(identity)) => Self::Identity(identity),
            (Some(primary), None) if primary.is_identity => Self::Identity(primary),
            (Some(primary), None) => Self::Primary(primary),
            (None, None) => Self::Nothing,
        }
    }
}

/// Creates the statement builder for a dialect.
#[must_use]
pub fn builder_for(dialect: Dialect, setting: DbSetting) -> Box<dyn StatementBuilder> {
    match dialect {
        Dialect::SqlServer => Box::new(SqlServerStatementBuilder::with_setting(setting)),
        Dialect::PostgreSql => Box::new(PostgresStatementBuilder::with_setting(setting)),
        Dialect::MySql => Box::new(MySqlStatementBuilder::with_setting(setting)),
        Dialect::Sqlite => Box::new(SqliteStatementBuilder::with_setting(setting)),
    }
}

/// One SQL dialect's statement synthesis.
#[allow(clippy::too_many_arguments)]
pub trait StatementBuilder: Send + Sync {
    /// The dialect conventions.
    fn setting(&self) -> &DbSetting;

    /// Expression selecting the last generated identity value.
    fn identity_expression(&self) -> &'static str;

    /// Row count expression.
    fn count_expression(&self) -> &'static str {
        "COUNT (*)"
    }

    /// Writes the row window of a paged query.
    fn write_paging(&self, builder: &mut QueryBuilder, skip: u64, take: u64) {
        builder.write(format!("LIMIT {take}"));
        if skip > 0 {
            builder.write(format!("OFFSET {skip}"));
        }
    }

    /// Writes the result selection of an insert.
    fn write_insert_result(&self, builder: &mut QueryBuilder, result: ResultColumn<'_>, index: usize) {
        let expression = match result {
            ResultColumn::Identity(_) => self.identity_expression().to_string(),
            ResultColumn::Primary(primary) => parameter(self.setting(), &primary.name, index),
            ResultColumn::Nothing => "NULL".to_string(),
        };
        builder
            .end()
            .write("SELECT")
            .write(expression)
            .write("AS")
            .write(self.setting().quote("Result"));
    }

    /// Writes the result selection of a merge. Nothing is selected when
    /// there is no key.
    fn write_merge_result(&self, builder: &mut QueryBuilder, result: ResultColumn<'_>, index: usize) {
        let setting = self.setting();
        let expression = match result {
            ResultColumn::Identity(identity) => format!(
                "COALESCE({}, {})",
                parameter(setting, &identity.name, index),
                self.identity_expression()
            ),
            ResultColumn::Primary(primary) => parameter(setting, &primary.name, index),
            ResultColumn::Nothing => return,
        };
        builder.end().write("SELECT").write(expression).write("AS").write(setting.quote("Result"));
    }

    /// The inserted value of a generated key column that a merge matches on.
    /// A NULL parameter lets the database generate the value.
    fn generated_key(&self, table: &str, field: &Field, index: usize) -> String {
        let _ = table;
        parameter(self.setting(), field.name(), index)
    }

    /// `SELECT <fields> FROM <table> [WHERE ..] [ORDER BY ..] [LIMIT top] ;`
    ///
    /// # Errors
    ///
    /// Fails for a blank table, empty fields, ordering on fields outside the
    /// projection and unsupported hints.
    fn create_query(
        &self, builder: &mut QueryBuilder, table: &str, fields: &[Field], r#where: Option<&QueryGroup>,
        order_by: &[OrderField], top: Option<u64>, hints: Option<&str>,
    ) -> Result<String> {
        let setting = self.setting();
        let table = validate::table(table)?;
        validate::fields(fields)?;
        validate::ordering(fields, order_by)?;
        let hints = validate::hints(setting, hints)?;

        let start = builder.len();
        builder
            .write("SELECT")
            .list(quote_all(setting, fields))
            .write("FROM")
            .write(setting.quote(table))
            .write(hints.unwrap_or_default());
        write_where(builder, setting, r#where, "");
        write_order(builder, setting, order_by);
        if let Some(top) = top.filter(|t| *t > 0) {
            self.write_paging(builder, 0, top);
        }
        builder.end();
        Ok(finish(builder, start, "query", table))
    }

    /// `SELECT <fields> FROM <table> [ORDER BY ..] ;`
    ///
    /// # Errors
    ///
    /// See [`StatementBuilder::create_query`].
    fn create_query_all(
        &self, builder: &mut QueryBuilder, table: &str, fields: &[Field], order_by: &[OrderField],
        hints: Option<&str>,
    ) -> Result<String> {
        let setting = self.setting();
        let table = validate::table(table)?;
        validate::fields(fields)?;
        validate::ordering(fields, order_by)?;
        let hints = validate::hints(setting, hints)?;

        let start = builder.len();
        builder
            .write("SELECT")
            .list(quote_all(setting, fields))
            .write("FROM")
            .write(setting.quote(table))
            .write(hints.unwrap_or_default());
        write_order(builder, setting, order_by);
        builder.end();
        Ok(finish(builder, start, "query_all", table))
    }

    /// Rows `page * rows_per_batch + 1` to `(page + 1) * rows_per_batch`
    /// (1-based, inclusive) in `order_by` order. `page` is 0-based.
    ///
    /// # Errors
    ///
    /// Fails when `order_by` is empty or `rows_per_batch` is zero, and as
    /// [`StatementBuilder::create_query`] otherwise.
    fn create_batch_query(
        &self, builder: &mut QueryBuilder, table: &str, fields: &[Field], r#where: Option<&QueryGroup>,
        order_by: &[OrderField], page: u64, rows_per_batch: u64, hints: Option<&str>,
    ) -> Result<String> {
        let rows = validate::positive("rows per batch", rows_per_batch)?;
        self.create_skip_query(
            builder,
            table,
            fields,
            r#where,
            order_by,
            page.saturating_mul(rows),
            rows,
            hints,
        )
    }

    /// Skips `skip` rows and returns the next `take` in `order_by` order.
    ///
    /// # Errors
    ///
    /// Fails when `order_by` is empty or `take` is zero, and as
    /// [`StatementBuilder::create_query`] otherwise.
    fn create_skip_query(
        &self, builder: &mut QueryBuilder, table: &str, fields: &[Field], r#where: Option<&QueryGroup>,
        order_by: &[OrderField], skip: u64, take: u64, hints: Option<&str>,
    ) -> Result<String> {
        let setting = self.setting();
        let table = validate::table(table)?;
        validate::fields(fields)?;
        if order_by.is_empty() {
            return Err(Error::missing("order by fields"));
        }
        validate::ordering(fields, order_by)?;
        let take = validate::positive("rows to take", take)?;
        let hints = validate::hints(setting, hints)?;

        let start = builder.len();
        builder
            .write("SELECT")
            .list(quote_all(setting, fields))
            .write("FROM")
            .write(setting.quote(table))
            .write(hints.unwrap_or_default());
        write_where(builder, setting, r#where, "");
        write_order(builder, setting, order_by);
        self.write_paging(builder, skip, take);
        builder.end();
        Ok(finish(builder, start, "skip_query", table))
    }

    /// `SELECT COUNT (*) AS [CountValue] FROM <table> [WHERE ..] ;`
    ///
    /// # Errors
    ///
    /// Fails for a blank table and unsupported hints.
    fn create_count(
        &self, builder: &mut QueryBuilder, table: &str, r#where: Option<&QueryGroup>, hints: Option<&str>,
    ) -> Result<String> {
        let setting = self.setting();
        let table = validate::table(table)?;
        let hints = validate::hints(setting, hints)?;

        let start = builder.len();
        builder
            .write("SELECT")
            .write(self.count_expression())
            .write("AS")
            .write(setting.quote("CountValue"))
            .write("FROM")
            .write(setting.quote(table))
            .write(hints.unwrap_or_default());
        write_where(builder, setting, r#where, "");
        builder.end();
        Ok(finish(builder, start, "count", table))
    }

    /// Counts every row of the table.
    ///
    /// # Errors
    ///
    /// See [`StatementBuilder::create_count`].
    fn create_count_all(
        &self, builder: &mut QueryBuilder, table: &str, hints: Option<&str>,
    ) -> Result<String> {
        self.create_count(builder, table, None, hints)
    }

    /// Selects `1 AS [ExistsValue]` when a matching row exists.
    ///
    /// # Errors
    ///
    /// See [`StatementBuilder::create_count`].
    fn create_exists(
        &self, builder: &mut QueryBuilder, table: &str, r#where: Option<&QueryGroup>, hints: Option<&str>,
    ) -> Result<String> {
        let setting = self.setting();
        let table = validate::table(table)?;
        let hints = validate::hints(setting, hints)?;

        let start = builder.len();
        builder
            .write("SELECT 1 AS")
            .write(setting.quote("ExistsValue"))
            .write("FROM")
            .write(setting.quote(table))
            .write(hints.unwrap_or_default());
        write_where(builder, setting, r#where, "");
        self.write_paging(builder, 0, 1);
        builder.end();
        Ok(finish(builder, start, "exists", table))
    }

    /// `SELECT MAX ([F]) AS [MaxValue] FROM <table> [WHERE ..] ;` and the
    /// other aggregates.
    ///
    /// # Errors
    ///
    /// Fails for a blank table or field and unsupported hints.
    fn create_aggregate(
        &self, builder: &mut QueryBuilder, aggregate: Aggregate, table: &str, field: &Field,
        r#where: Option<&QueryGroup>, hints: Option<&str>,
    ) -> Result<String> {
        let setting = self.setting();
        let table = validate::table(table)?;
        validate::field(field)?;
        let hints = validate::hints(setting, hints)?;

        let start = builder.len();
        builder
            .write("SELECT")
            .write(aggregate.function())
            .write(format!("({})", setting.quote(field.name())))
            .write("AS")
            .write(setting.quote(aggregate.alias()))
            .write("FROM")
            .write(setting.quote(table))
            .write(hints.unwrap_or_default());
        write_where(builder, setting, r#where, "");
        builder.end();
        Ok(finish(builder, start, aggregate.function(), table))
    }

    /// Inserts one row of every field except the identity and selects the
    /// row's key back as `[Result]`.
    ///
    /// # Errors
    ///
    /// Fails for a blank table, empty fields, a `primary` without the primary
    /// flag, an `identity` without the identity flag and unsupported hints.
    fn create_insert(
        &self, builder: &mut QueryBuilder, table: &str, fields: &[Field], primary: Option<&DbField>,
        identity: Option<&DbField>, hints: Option<&str>,
    ) -> Result<String> {
        self.create_insert_all(builder, table, fields, 1, primary, identity, hints)
    }

    /// [`StatementBuilder::create_insert`] repeated for `batch_size` rows.
    /// Parameters of row `i > 0` are suffixed with `_i`.
    ///
    /// # Errors
    ///
    /// Fails when `batch_size` is zero, and as
    /// [`StatementBuilder::create_insert`] otherwise.
    fn create_insert_all(
        &self, builder: &mut QueryBuilder, table: &str, fields: &[Field], batch_size: usize,
        primary: Option<&DbField>, identity: Option<&DbField>, hints: Option<&str>,
    ) -> Result<String> {
        let setting = self.setting();
        let table = validate::table(table)?;
        validate::fields(fields)?;
        validate::primary(primary)?;
        validate::identity(identity)?;
        validate::positive("batch size", batch_size as u64)?;
        let hints = validate::hints(setting, hints)?;

        let insertable = insertable(fields, primary, identity);
        let result = ResultColumn::resolve(primary, identity);

        let start = builder.len();
        for index in 0..batch_size {
            builder.write("INSERT INTO").write(setting.quote(table)).write(hints.unwrap_or_default());
            if insertable.is_empty() {
                builder.write("DEFAULT VALUES");
            } else {
                builder
                    .group(quote_all(setting, insertable.iter().copied()))
                    .write("VALUES")
                    .group(insertable.iter().map(|f| parameter(setting, f.name(), index)));
            }
            self.write_insert_result(builder, result, index);
            builder.end();
        }
        let operation = if batch_size > 1 { "insert_all" } else { "insert" };
        Ok(finish(builder, start, operation, table))
    }

    /// Updates every field except the primary and identity. WHERE parameters
    /// are prefixed with `_` so a field can be both set and filtered on.
    ///
    /// # Errors
    ///
    /// Fails for a blank table, no updatable fields, a `primary` without the
    /// primary flag, an `identity` without the identity flag and unsupported
    /// hints.
    fn create_update(
        &self, builder: &mut QueryBuilder, table: &str, fields: &[Field], r#where: Option<&QueryGroup>,
        primary: Option<&DbField>, identity: Option<&DbField>, hints: Option<&str>,
    ) -> Result<String> {
        let setting = self.setting();
        let table = validate::table(table)?;
        validate::fields(fields)?;
        validate::primary(primary)?;
        validate::identity(identity)?;
        let hints = validate::hints(setting, hints)?;

        let updatable = updatable(fields, &[], primary, identity);
        if updatable.is_empty() {
            return Err(Error::missing("fields to update"));
        }

        let start = builder.len();
        builder
            .write("UPDATE")
            .write(setting.quote(table))
            .write(hints.unwrap_or_default())
            .write("SET")
            .list(updatable.iter().map(|f| assignment(setting, f, 0)));
        write_where(builder, setting, r#where, "_");
        builder.end();
        Ok(finish(builder, start, "update", table))
    }

    /// Updates `batch_size` rows matched by their qualifiers (the primary
    /// field by default). Parameters of row `i > 0` are suffixed with `_i`.
    ///
    /// # Errors
    ///
    /// Fails when no qualifier resolves or a qualifier is not among `fields`,
    /// and as [`StatementBuilder::create_update`] otherwise.
    fn create_update_all(
        &self, builder: &mut QueryBuilder, table: &str, fields: &[Field], qualifiers: &[Field],
        batch_size: usize, primary: Option<&DbField>, identity: Option<&DbField>, hints: Option<&str>,
    ) -> Result<String> {
        let setting = self.setting();
        let table = validate::table(table)?;
        validate::fields(fields)?;
        validate::primary(primary)?;
        validate::identity(identity)?;
        let qualifiers = validate::qualifiers(fields, qualifiers, primary)?;
        validate::positive("batch size", batch_size as u64)?;
        let hints = validate::hints(setting, hints)?;

        let updatable = updatable(fields, &qualifiers, primary, identity);
        if updatable.is_empty() {
            return Err(Error::missing("fields to update"));
        }

        let start = builder.len();
        for index in 0..batch_size {
            let condition = qualifiers
                .iter()
                .map(|q| assignment(setting, q, index))
                .collect::<Vec<_>>()
                .join(" AND ");
            builder
                .write("UPDATE")
                .write(setting.quote(table))
                .write(hints.unwrap_or_default())
                .write("SET")
                .list(updatable.iter().map(|f| assignment(setting, f, index)))
                .write("WHERE")
                .write(format!("({condition})"))
                .end();
        }
        Ok(finish(builder, start, "update_all", table))
    }

    /// Inserts the row or, when a row with equal qualifiers exists, updates
    /// it. Uses `INSERT .. ON CONFLICT (..) DO UPDATE`. A generated key used
    /// as a qualifier is inserted through [`StatementBuilder::generated_key`]
    /// so the conflict target can match.
    ///
    /// # Errors
    ///
    /// Fails when no qualifier resolves, a qualifier is not among `fields` or
    /// the identity field is not the primary field, and as
    /// [`StatementBuilder::create_insert`] otherwise.
    fn create_merge(
        &self, builder: &mut QueryBuilder, table: &str, fields: &[Field], qualifiers: &[Field],
        primary: Option<&DbField>, identity: Option<&DbField>, hints: Option<&str>,
    ) -> Result<String> {
        self.create_merge_all(builder, table, fields, qualifiers, 1, primary, identity, hints)
    }

    /// [`StatementBuilder::create_merge`] repeated for `batch_size` rows.
    ///
    /// # Errors
    ///
    /// Fails when `batch_size` is zero, and as
    /// [`StatementBuilder::create_merge`] otherwise.
    fn create_merge_all(
        &self, builder: &mut QueryBuilder, table: &str, fields: &[Field], qualifiers: &[Field],
        batch_size: usize, primary: Option<&DbField>, identity: Option<&DbField>, hints: Option<&str>,
    ) -> Result<String> {
        let setting = self.setting();
        let table = validate::table(table)?;
        let plan = MergePlan::new(fields, qualifiers, primary, identity)?;
        validate::positive("batch size", batch_size as u64)?;
        let hints = validate::hints(setting, hints)?;

        let start = builder.len();
        for index in 0..batch_size {
            builder.write("INSERT INTO").write(setting.quote(table)).write(hints.unwrap_or_default());
            if plan.upserted.is_empty() {
                builder.write("DEFAULT VALUES");
            } else {
                builder
                    .group(quote_all(setting, plan.upserted.iter().copied()))
                    .write("VALUES")
                    .group(plan.upsert_values(self, table, index));
            }
            builder.write("ON CONFLICT").group(quote_all(setting, &plan.qualifiers));
            if plan.updatable.is_empty() {
                builder.write("DO NOTHING");
            } else {
                builder.write("DO UPDATE SET").list(plan.updatable.iter().map(|f| {
                    let column = setting.quote(f.name());
                    format!("{column} = EXCLUDED.{column}")
                }));
            }
            self.write_merge_result(builder, plan.result, index);
            builder.end();
        }
        let operation = if batch_size > 1 { "merge_all" } else { "merge" };
        Ok(finish(builder, start, operation, table))
    }

    /// `DELETE FROM <table> [WHERE ..] ;`
    ///
    /// # Errors
    ///
    /// Fails for a blank table and unsupported hints.
    fn create_delete(
        &self, builder: &mut QueryBuilder, table: &str, r#where: Option<&QueryGroup>, hints: Option<&str>,
    ) -> Result<String> {
        let setting = self.setting();
        let table = validate::table(table)?;
        let hints = validate::hints(setting, hints)?;

        let start = builder.len();
        builder.write("DELETE FROM").write(setting.quote(table)).write(hints.unwrap_or_default());
        write_where(builder, setting, r#where, "");
        builder.end();
        Ok(finish(builder, start, "delete", table))
    }

    /// `DELETE FROM <table> ;`
    ///
    /// # Errors
    ///
    /// See [`StatementBuilder::create_delete`].
    fn create_delete_all(
        &self, builder: &mut QueryBuilder, table: &str, hints: Option<&str>,
    ) -> Result<String> {
        self.create_delete(builder, table, None, hints)
    }

    /// `TRUNCATE TABLE <table> ;`
    ///
    /// # Errors
    ///
    /// Fails for a blank table.
    fn create_truncate(&self, builder: &mut QueryBuilder, table: &str) -> Result<String> {
        let setting = self.setting();
        let table = validate::table(table)?;

        let start = builder.len();
        builder.write("TRUNCATE TABLE").write(setting.quote(table)).end();
        Ok(finish(builder, start, "truncate", table))
    }
}

/// Validated column sets of a merge.
pub(crate) struct MergePlan<'a> {
    pub(crate) qualifiers: Vec<Field>,
    /// Columns of a `MERGE .. WHEN NOT MATCHED` insert; generated keys are left out.
    pub(crate) insertable: Vec<&'a Field>,
    /// Columns of an `INSERT .. ON CONFLICT` upsert: the insertable columns
    /// plus generated keys that are qualifiers, in field order.
    pub(crate) upserted: Vec<&'a Field>,
    generated: Vec<&'a Field>,
    pub(crate) updatable: Vec<&'a Field>,
    pub(crate) result: ResultColumn<'a>,
}

impl<'a> MergePlan<'a> {
    pub(crate) fn new(
        fields: &'a [Field], qualifiers: &[Field], primary: Option<&'a DbField>,
        identity: Option<&'a DbField>,
    ) -> Result<Self> {
        validate::fields(fields)?;
        validate::primary(primary)?;
        validate::identity(identity)?;
        validate::identity_is_primary(primary, identity)?;
        let qualifiers = validate::qualifiers(fields, qualifiers, primary)?;
        let insertable = insertable(fields, primary, identity);
        let updatable = updatable(fields, &qualifiers, primary, identity);
        let generated = fields
            .iter()
            .filter(|f| !insertable.iter().any(|i| std::ptr::eq(*i, *f)))
            .filter(|f| qualifiers.iter().any(|q| same_name(f.name(), q.name())))
            .collect::<Vec<_>>();
        let upserted = fields
            .iter()
            .filter(|f| {
                insertable.iter().chain(&generated).any(|c| std::ptr::eq(*c, *f))
            })
            .collect();
        Ok(Self {
            qualifiers,
            insertable,
            upserted,
            generated,
            updatable,
            result: ResultColumn::resolve(primary, identity),
        })
    }

    /// Values of the upserted columns for row `index`.
    pub(crate) fn upsert_values<S: StatementBuilder + ?Sized>(
        &self, statements: &S, table: &str, index: usize,
    ) -> Vec<String> {
        self.upserted
            .iter()
            .map(|f| {
                if self.generated.iter().any(|g| std::ptr::eq(*g, *f)) {
                    statements.generated_key(table, f, index)
                } else {
                    parameter(statements.setting(), f.name(), index)
                }
            })
            .collect()
    }
}

/// `@Name` for row 0, `@Name_i` for row `i`.
pub(crate) fn parameter(setting: &DbSetting, name: &str, index: usize) -> String {
    if index == 0 {
        setting.parameter(name)
    } else {
        format!("{}{}_{index}", setting.parameter_prefix, parameter_name(name))
    }
}

/// `[Name] = @Name` for row `index`.
pub(crate) fn assignment(setting: &DbSetting, field: &Field, index: usize) -> String {
    format!("{} = {}", setting.quote(field.name()), parameter(setting, field.name(), index))
}

pub(crate) fn quote_all<'f>(
    setting: &DbSetting, fields: impl IntoIterator<Item = &'f Field>,
) -> Vec<String> {
    fields.into_iter().map(|f| setting.quote(f.name())).collect()
}

pub(crate) fn write_where(
    builder: &mut QueryBuilder, setting: &DbSetting, r#where: Option<&QueryGroup>, prefix: &str,
) {
    if let Some(condition) = r#where.and_then(|w| w.render(setting, prefix)) {
        builder.write("WHERE").write(condition);
    }
}

pub(crate) fn order_list(setting: &DbSetting, order_by: &[OrderField]) -> String {
    order_by
        .iter()
        .map(|o| format!("{} {}", setting.quote(o.field.name()), o.direction.keyword()))
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn write_order(builder: &mut QueryBuilder, setting: &DbSetting, order_by: &[OrderField]) {
    if !order_by.is_empty() {
        builder.write("ORDER BY").write(order_list(setting, order_by));
    }
}

/// Fields written by an insert: everything except generated columns.
pub(crate) fn insertable<'a>(
    fields: &'a [Field], primary: Option<&DbField>, identity: Option<&DbField>,
) -> Vec<&'a Field> {
    fields
        .iter()
        .filter(|f| !identity.is_some_and(|i| same_name(f.name(), &i.name)))
        .filter(|f| !primary.is_some_and(|p| p.is_identity && same_name(f.name(), &p.name)))
        .collect()
}

/// Fields written by an update: everything except keys and qualifiers.
pub(crate) fn updatable<'a>(
    fields: &'a [Field], qualifiers: &[Field], primary: Option<&DbField>, identity: Option<&DbField>,
) -> Vec<&'a Field> {
    fields
        .iter()
        .filter(|f| !primary.is_some_and(|p| same_name(f.name(), &p.name)))
        .filter(|f| !identity.is_some_and(|i| same_name(f.name(), &i.name)))
        .filter(|f| !qualifiers.iter().any(|q| same_name(f.name(), q.name())))
        .collect()
}

/// Logs and returns the statement appended since `start`.
pub(crate) fn finish(builder: &QueryBuilder, start: usize, operation: &str, table: &str) -> String {
    let sql = builder.since(start).to_string();
    tracing::debug!(table, operation, sql = %sql, "statement generated");
    sql
}
