use super::{ResultColumn, StatementBuilder, parameter};
use crate::field::{Field, unquote};
use crate::query::QueryBuilder;
use crate::setting::DbSetting;

/// PostgreSQL statements: `LIMIT`/`OFFSET` paging, `ON CONFLICT` merges and
/// `RETURNING` result columns.
#[derive(Debug, Clone)]
pub struct PostgresStatementBuilder {
    setting: DbSetting,
}

impl Default for PostgresStatementBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PostgresStatementBuilder {
    /// A builder with the default PostgreSQL settings.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_setting(DbSetting::POSTGRES)
    }

    /// A builder with custom settings.
    #[must_use]
    pub const fn with_setting(setting: DbSetting) -> Self {
        Self { setting }
    }

    fn write_returning(&self, builder: &mut QueryBuilder, column: &str) {
        builder.write("RETURNING").write(column).write("AS").write(self.setting.quote("Result"));
    }
}

impl StatementBuilder for PostgresStatementBuilder {
    fn setting(&self) -> &DbSetting {
        &self.setting
    }

    fn identity_expression(&self) -> &'static str {
        "lastval()"
    }

    // An explicit NULL is not replaced by the column default, so the next
    // sequence value is drawn only when no key is bound.
    fn generated_key(&self, table: &str, field: &Field, index: usize) -> String {
        let table = self.setting.quote(table).replace('\'', "''");
        let column = unquote(field.name()).replace('\'', "''");
        format!(
            "COALESCE({}, nextval(pg_get_serial_sequence('{table}', '{column}')))",
            parameter(&self.setting, field.name(), index)
        )
    }

    fn write_insert_result(&self, builder: &mut QueryBuilder, result: ResultColumn<'_>, _index: usize) {
        match result {
            ResultColumn::Identity(key) | ResultColumn::Primary(key) => {
                self.write_returning(builder, &self.setting.quote(&key.name));
            }
            ResultColumn::Nothing => self.write_returning(builder, "NULL"),
        }
    }

    fn write_merge_result(&self, builder: &mut QueryBuilder, result: ResultColumn<'_>, _index: usize) {
        if let ResultColumn::Identity(key) | ResultColumn::Primary(key) = result {
            self.write_returning(builder, &self.setting.quote(&key.name));
        }
    }
}
