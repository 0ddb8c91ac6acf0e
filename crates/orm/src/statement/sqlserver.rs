use super::{
    MergePlan, ResultColumn, StatementBuilder, finish, order_list, parameter, quote_all, validate,
    write_order, write_where,
};
use crate::error::{Error, Result};
use crate::field::{DbField, Field, OrderField};
use crate::filter::QueryGroup;
use crate::query::QueryBuilder;
use crate::setting::DbSetting;

/// SQL Server statements: `TOP`, `ROW_NUMBER()` paging, `MERGE` and table
/// hints.
#[derive(Debug, Clone)]
pub struct SqlServerStatementBuilder {
    setting: DbSetting,
}

impl Default for SqlServerStatementBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlServerStatementBuilder {
    /// A builder with the default SQL Server settings.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_setting(DbSetting::SQL_SERVER)
    }

    /// A builder with custom settings, e.g. with table hints disabled.
    #[must_use]
    pub const fn with_setting(setting: DbSetting) -> Self {
        Self { setting }
    }
}

impl StatementBuilder for SqlServerStatementBuilder {
    fn setting(&self) -> &DbSetting {
        &self.setting
    }

    fn identity_expression(&self) -> &'static str {
        "CONVERT(BIGINT, SCOPE_IDENTITY())"
    }

    fn count_expression(&self) -> &'static str {
        "COUNT_BIG (1)"
    }

    fn write_paging(&self, builder: &mut QueryBuilder, skip: u64, take: u64) {
        builder.write(format!("OFFSET {skip} ROWS FETCH NEXT {take} ROWS ONLY"));
    }

    fn create_query(
        &self, builder: &mut QueryBuilder, table: &str, fields: &[Field], r#where: Option<&QueryGroup>,
        order_by: &[OrderField], top: Option<u64>, hints: Option<&str>,
    ) -> Result<String> {
        let setting = &self.setting;
        let table = validate::table(table)?;
        validate::fields(fields)?;
        validate::ordering(fields, order_by)?;
        let hints = validate::hints(setting, hints)?;

        let start = builder.len();
        builder.write("SELECT");
        if let Some(top) = top.filter(|t| *t > 0) {
            builder.write(format!("TOP ({top})"));
        }
        builder
            .list(quote_all(setting, fields))
            .write("FROM")
            .write(setting.quote(table))
            .write(hints.unwrap_or_default());
        write_where(builder, setting, r#where, "");
        write_order(builder, setting, order_by);
        builder.end();
        Ok(finish(builder, start, "query", table))
    }

    fn create_skip_query(
        &self, builder: &mut QueryBuilder, table: &str, fields: &[Field], r#where: Option<&QueryGroup>,
        order_by: &[OrderField], skip: u64, take: u64, hints: Option<&str>,
    ) -> Result<String> {
        let setting = &self.setting;
        let table = validate::table(table)?;
        validate::fields(fields)?;
        if order_by.is_empty() {
            return Err(Error::missing("order by fields"));
        }
        validate::ordering(fields, order_by)?;
        let take = validate::positive("rows to take", take)?;
        let hints = validate::hints(setting, hints)?;

        let columns = quote_all(setting, fields);
        let first = skip.saturating_add(1);
        let last = skip.saturating_add(take);

        let start = builder.len();
        builder
            .write("WITH CTE AS ( SELECT ROW_NUMBER() OVER ( ORDER BY")
            .write(order_list(setting, order_by))
            .write(") AS")
            .write(format!("{},", setting.quote("RowNumber")))
            .list(&columns)
            .write("FROM")
            .write(setting.quote(table))
            .write(hints.unwrap_or_default());
        write_where(builder, setting, r#where, "");
        builder
            .write(") SELECT")
            .list(&columns)
            .write("FROM CTE WHERE")
            .write(format!("({} BETWEEN {first} AND {last})", setting.quote("RowNumber")));
        write_order(builder, setting, order_by);
        builder.end();
        Ok(finish(builder, start, "skip_query", table))
    }

    fn create_exists(
        &self, builder: &mut QueryBuilder, table: &str, r#where: Option<&QueryGroup>, hints: Option<&str>,
    ) -> Result<String> {
        let setting = &self.setting;
        let table = validate::table(table)?;
        let hints = validate::hints(setting, hints)?;

        let start = builder.len();
        builder
            .write("SELECT TOP (1) 1 AS")
            .write(setting.quote("ExistsValue"))
            .write("FROM")
            .write(setting.quote(table))
            .write(hints.unwrap_or_default());
        write_where(builder, setting, r#where, "");
        builder.end();
        Ok(finish(builder, start, "exists", table))
    }

    fn create_merge_all(
        &self, builder: &mut QueryBuilder, table: &str, fields: &[Field], qualifiers: &[Field],
        batch_size: usize, primary: Option<&DbField>, identity: Option<&DbField>, hints: Option<&str>,
    ) -> Result<String> {
        let setting = &self.setting;
        let table = validate::table(table)?;
        let plan = MergePlan::new(fields, qualifiers, primary, identity)?;
        validate::positive("batch size", batch_size as u64)?;
        let hints = validate::hints(setting, hints)?;

        let source = |f: &Field| format!("S.{}", setting.quote(f.name()));
        let on = plan
            .qualifiers
            .iter()
            .map(|q| format!("{} = T.{}", source(q), setting.quote(q.name())))
            .collect::<Vec<_>>()
            .join(" AND ");

        let start = builder.len();
        for index in 0..batch_size {
            builder
                .write("MERGE")
                .write(setting.quote(table))
                .write(hints.unwrap_or_default())
                .write("AS T USING ( SELECT")
                .list(fields.iter().map(|f| {
                    format!("{} AS {}", parameter(setting, f.name(), index), setting.quote(f.name()))
                }))
                .write(") AS S ON")
                .write(format!("( {on} )"))
                .write("WHEN NOT MATCHED THEN INSERT");
            if plan.insertable.is_empty() {
                builder.write("DEFAULT VALUES");
            } else {
                builder
                    .group(quote_all(setting, plan.insertable.iter().copied()))
                    .write("VALUES")
                    .group(plan.insertable.iter().map(|f| source(f)));
            }
            if !plan.updatable.is_empty() {
                builder.write("WHEN MATCHED THEN UPDATE SET").list(
                    plan.updatable
                        .iter()
                        .map(|f| format!("T.{} = {}", setting.quote(f.name()), source(f))),
                );
            }
            if let ResultColumn::Identity(key) | ResultColumn::Primary(key) = plan.result {
                builder
                    .write(format!("OUTPUT INSERTED.{}", setting.quote(&key.name)))
                    .write("AS")
                    .write(setting.quote("Result"));
            }
            builder.end();
        }
        let operation = if batch_size > 1 { "merge_all" } else { "merge" };
        Ok(finish(builder, start, operation, table))
    }
}
