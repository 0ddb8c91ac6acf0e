use super::{StatementBuilder, finish, validate};
use crate::error::Result;
use crate::query::QueryBuilder;
use crate::setting::DbSetting;

/// SQLite statements. SQLite has no `TRUNCATE`; truncation deletes every row.
#[derive(Debug, Clone)]
pub struct SqliteStatementBuilder {
    setting: DbSetting,
}

impl Default for SqliteStatementBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SqliteStatementBuilder {
    /// A builder with the default SQLite settings.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_setting(DbSetting::SQLITE)
    }

    /// A builder with custom settings.
    #[must_use]
    pub const fn with_setting(setting: DbSetting) -> Self {
        Self { setting }
    }
}

impl StatementBuilder for SqliteStatementBuilder {
    fn setting(&self) -> &DbSetting {
        &self.setting
    }

    fn identity_expression(&self) -> &'static str {
        "last_insert_rowid()"
    }

    fn create_truncate(&self, builder: &mut QueryBuilder, table: &str) -> Result<String> {
        let table = validate::table(table)?;

        let start = builder.len();
        builder.write("DELETE FROM").write(self.setting.quote(table)).end();
        Ok(finish(builder, start, "truncate", table))
    }
}
