use super::{MergePlan, StatementBuilder, finish, quote_all, validate};
use crate::error::Result;
use crate::field::{DbField, Field};
use crate::query::QueryBuilder;
use crate::setting::DbSetting;

/// MySQL statements: backtick quoting, `LAST_INSERT_ID()` and
/// `ON DUPLICATE KEY UPDATE` merges.
#[derive(Debug, Clone)]
pub struct MySqlStatementBuilder {
    setting: DbSetting,
}

impl Default for MySqlStatementBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MySqlStatementBuilder {
    /// A builder with the default MySQL settings.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_setting(DbSetting::MYSQL)
    }

    /// A builder with custom settings.
    #[must_use]
    pub const fn with_setting(setting: DbSetting) -> Self {
        Self { setting }
    }
}

impl StatementBuilder for MySqlStatementBuilder {
    fn setting(&self) -> &DbSetting {
        &self.setting
    }

    fn identity_expression(&self) -> &'static str {
        "LAST_INSERT_ID()"
    }

    // MySQL matches on every unique key of the table, so qualifiers only
    // select the columns left out of the update list.
    fn create_merge_all(
        &self, builder: &mut QueryBuilder, table: &str, fields: &[Field], qualifiers: &[Field],
        batch_size: usize, primary: Option<&DbField>, identity: Option<&DbField>, hints: Option<&str>,
    ) -> Result<String> {
        let setting = &self.setting;
        let table = validate::table(table)?;
        let plan = MergePlan::new(fields, qualifiers, primary, identity)?;
        validate::positive("batch size", batch_size as u64)?;
        validate::hints(setting, hints)?;

        let assign = |f: &Field| {
            let column = setting.quote(f.name());
            format!("{column} = VALUES({column})")
        };

        let start = builder.len();
        for index in 0..batch_size {
            builder
                .write("INSERT INTO")
                .write(setting.quote(table))
                .group(quote_all(setting, plan.upserted.iter().copied()))
                .write("VALUES")
                .group(plan.upsert_values(self, table, index))
                .write("ON DUPLICATE KEY UPDATE");
            if plan.updatable.is_empty() {
                builder.list(plan.qualifiers.iter().map(assign));
            } else {
                builder.list(plan.updatable.iter().map(|f| assign(f)));
            }
            self.write_merge_result(builder, plan.result, index);
            builder.end();
        }
        let operation = if batch_size > 1 { "merge_all" } else { "merge" };
        Ok(finish(builder, start, operation, table))
    }
}
