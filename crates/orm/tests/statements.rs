//! Integration tests for SQL Server statement synthesis.
//!
//! Tests the public API as users would interact with it.

#![allow(missing_docs)]

use tabula_orm::{
    Aggregate, DbField, DbSetting, Error, Field, OrderField, QueryBuilder, QueryField, QueryGroup,
    SqlServerStatementBuilder, StatementBuilder,
};

fn fields(names: &[&str]) -> Vec<Field> {
    Field::from_names(names.iter().copied())
}

fn by_field1() -> QueryGroup {
    QueryGroup::from(QueryField::eq("Field1", 1))
}

// SELECT tests

#[test]
fn query_all() {
    let statements = SqlServerStatementBuilder::new();
    let mut builder = QueryBuilder::new();
    let sql = statements
        .create_query_all(&mut builder, "Table", &fields(&["Field1", "Field2", "Field3"]), &[], None)
        .unwrap();
    assert_eq!(sql, "SELECT [Field1], [Field2], [Field3] FROM [Table] ;");
    assert_eq!(builder.as_str(), sql);
}

#[test]
fn query_with_where_order_and_top() {
    let statements = SqlServerStatementBuilder::new();
    let mut builder = QueryBuilder::new();
    let sql = statements
        .create_query(
            &mut builder,
            "Table",
            &fields(&["Field1", "Field2"]),
            Some(&by_field1()),
            &[OrderField::descending("Field2")],
            Some(5),
            None,
        )
        .unwrap();
    assert_eq!(
        sql,
        "SELECT TOP (5) [Field1], [Field2] FROM [Table] WHERE ([Field1] = @Field1) ORDER BY [Field2] DESC ;"
    );
}

#[test]
fn query_with_hints() {
    let statements = SqlServerStatementBuilder::new();
    let mut builder = QueryBuilder::new();
    let sql = statements
        .create_query_all(&mut builder, "dbo.Table", &fields(&["Field1"]), &[], Some(" WITH (NOLOCK) "))
        .unwrap();
    assert_eq!(sql, "SELECT [Field1] FROM [dbo].[Table] WITH (NOLOCK) ;");
}

#[test]
fn batch_query_selects_row_window() {
    let statements = SqlServerStatementBuilder::new();
    let mut builder = QueryBuilder::new();
    let sql = statements
        .create_batch_query(
            &mut builder,
            "Table",
            &fields(&["Field1", "Field2"]),
            None,
            &[OrderField::ascending("Field1")],
            1,
            10,
            None,
        )
        .unwrap();
    assert_eq!(
        sql,
        "WITH CTE AS ( SELECT ROW_NUMBER() OVER ( ORDER BY [Field1] ASC ) AS [RowNumber], [Field1], [Field2] \
         FROM [Table] ) SELECT [Field1], [Field2] FROM CTE WHERE ([RowNumber] BETWEEN 11 AND 20) \
         ORDER BY [Field1] ASC ;"
    );
}

#[test]
fn skip_query_requires_ordering() {
    let statements = SqlServerStatementBuilder::new();
    let mut builder = QueryBuilder::new();
    let err = statements
        .create_skip_query(&mut builder, "Table", &fields(&["Field1"]), None, &[], 0, 10, None)
        .unwrap_err();
    assert!(matches!(err, Error::MissingArgument(_)));
    assert!(builder.is_empty());
}

#[test]
fn ordering_outside_projection() {
    let statements = SqlServerStatementBuilder::new();
    let mut builder = QueryBuilder::new();
    let err = statements
        .create_query_all(
            &mut builder,
            "Table",
            &fields(&["Field1", "Field2"]),
            &[OrderField::ascending("Field3")],
            None,
        )
        .unwrap_err();
    assert_eq!(err, Error::MissingFields("Field3".to_string()));
    assert!(builder.is_empty());
}

#[test]
fn count_exists_and_aggregates() {
    let statements = SqlServerStatementBuilder::new();
    let mut builder = QueryBuilder::new();
    let filter = by_field1();

    let count = statements.create_count(&mut builder, "Table", Some(&filter), None).unwrap();
    assert_eq!(count, "SELECT COUNT_BIG (1) AS [CountValue] FROM [Table] WHERE ([Field1] = @Field1) ;");

    let exists = statements.create_exists(&mut builder, "Table", Some(&filter), None).unwrap();
    assert_eq!(exists, "SELECT TOP (1) 1 AS [ExistsValue] FROM [Table] WHERE ([Field1] = @Field1) ;");

    let max = statements
        .create_aggregate(&mut builder, Aggregate::Max, "Table", &Field::new("Field1"), None, None)
        .unwrap();
    assert_eq!(max, "SELECT MAX ([Field1]) AS [MaxValue] FROM [Table] ;");

    let average = statements
        .create_aggregate(&mut builder, Aggregate::Average, "Table", &Field::new("Field2"), Some(&filter), None)
        .unwrap();
    assert_eq!(average, "SELECT AVG ([Field2]) AS [AverageValue] FROM [Table] WHERE ([Field1] = @Field1) ;");

    // statements accumulate in the one builder
    assert_eq!(builder.as_str(), [count, exists, max, average].join(" "));
}

// INSERT tests

#[test]
fn insert_with_identity_primary() {
    let statements = SqlServerStatementBuilder::new();
    let mut builder = QueryBuilder::new();
    let primary = DbField::new("Field1").primary().identity();
    let sql = statements
        .create_insert(&mut builder, "Table", &fields(&["Field1", "Field2", "Field3"]), Some(&primary), None, None)
        .unwrap();
    assert_eq!(
        sql,
        "INSERT INTO [Table] ( [Field2], [Field3] ) VALUES ( @Field2, @Field3 ) ; \
         SELECT CONVERT(BIGINT, SCOPE_IDENTITY()) AS [Result] ;"
    );
}

#[test]
fn insert_with_plain_primary() {
    let statements = SqlServerStatementBuilder::new();
    let mut builder = QueryBuilder::new();
    let primary = DbField::new("Field1").primary();
    let sql = statements
        .create_insert(&mut builder, "Table", &fields(&["Field1", "Field2"]), Some(&primary), None, None)
        .unwrap();
    assert_eq!(
        sql,
        "INSERT INTO [Table] ( [Field1], [Field2] ) VALUES ( @Field1, @Field2 ) ; SELECT @Field1 AS [Result] ;"
    );
}

#[test]
fn insert_without_primary() {
    let statements = SqlServerStatementBuilder::new();
    let mut builder = QueryBuilder::new();
    let sql = statements
        .create_insert(&mut builder, "Table", &fields(&["Field1", "Field2"]), None, None, None)
        .unwrap();
    assert_eq!(
        sql,
        "INSERT INTO [Table] ( [Field1], [Field2] ) VALUES ( @Field1, @Field2 ) ; SELECT NULL AS [Result] ;"
    );
}

#[test]
fn insert_all_suffixes_parameters() {
    let statements = SqlServerStatementBuilder::new();
    let mut builder = QueryBuilder::new();
    let primary = DbField::new("Field1").primary().identity();
    let sql = statements
        .create_insert_all(&mut builder, "Table", &fields(&["Field1", "Field2"]), 2, Some(&primary), None, None)
        .unwrap();
    assert_eq!(
        sql,
        "INSERT INTO [Table] ( [Field2] ) VALUES ( @Field2 ) ; SELECT CONVERT(BIGINT, SCOPE_IDENTITY()) AS [Result] ; \
         INSERT INTO [Table] ( [Field2] ) VALUES ( @Field2_1 ) ; SELECT CONVERT(BIGINT, SCOPE_IDENTITY()) AS [Result] ;"
    );
}

#[test]
fn insert_only_identity() {
    let statements = SqlServerStatementBuilder::new();
    let mut builder = QueryBuilder::new();
    let primary = DbField::new("Id").primary().identity();
    let sql = statements
        .create_insert(&mut builder, "Table", &fields(&["Id"]), Some(&primary), Some(&primary), None)
        .unwrap();
    assert_eq!(
        sql,
        "INSERT INTO [Table] DEFAULT VALUES ; SELECT CONVERT(BIGINT, SCOPE_IDENTITY()) AS [Result] ;"
    );
}

#[test]
fn primary_without_flag() {
    let statements = SqlServerStatementBuilder::new();
    let mut builder = QueryBuilder::new();
    let not_primary = DbField::new("Field1");
    let err = statements
        .create_insert(&mut builder, "Table", &fields(&["Field1"]), Some(&not_primary), None, None)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidConfiguration(_)));

    let err = statements
        .create_update(&mut builder, "Table", &fields(&["Field1", "Field2"]), None, None, Some(&not_primary), None)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidConfiguration(_)));
    assert!(builder.is_empty());
}

// UPDATE tests

#[test]
fn update_excludes_identity_primary() {
    let statements = SqlServerStatementBuilder::new();
    let mut builder = QueryBuilder::new();
    let primary = DbField::new("Field1").primary().identity();
    let sql = statements
        .create_update(&mut builder, "Table", &fields(&["Field1", "Field2", "Field3"]), None, Some(&primary), None, None)
        .unwrap();
    assert_eq!(sql, "UPDATE [Table] SET [Field2] = @Field2, [Field3] = @Field3 ;");
}

#[test]
fn update_where_parameters_are_prefixed() {
    let statements = SqlServerStatementBuilder::new();
    let mut builder = QueryBuilder::new();
    let sql = statements
        .create_update(&mut builder, "Table", &fields(&["Field1", "Field2"]), Some(&by_field1()), None, None, None)
        .unwrap();
    assert_eq!(sql, "UPDATE [Table] SET [Field1] = @Field1, [Field2] = @Field2 WHERE ([Field1] = @_Field1) ;");
}

#[test]
fn update_all_by_primary() {
    let statements = SqlServerStatementBuilder::new();
    let mut builder = QueryBuilder::new();
    let primary = DbField::new("Field1").primary();
    let sql = statements
        .create_update_all(
            &mut builder,
            "Table",
            &fields(&["Field1", "Field2", "Field3"]),
            &[],
            2,
            Some(&primary),
            None,
            None,
        )
        .unwrap();
    assert_eq!(
        sql,
        "UPDATE [Table] SET [Field2] = @Field2, [Field3] = @Field3 WHERE ([Field1] = @Field1) ; \
         UPDATE [Table] SET [Field2] = @Field2_1, [Field3] = @Field3_1 WHERE ([Field1] = @Field1_1) ;"
    );
}

#[test]
fn update_all_without_qualifiers() {
    let statements = SqlServerStatementBuilder::new();
    let mut builder = QueryBuilder::new();
    let err = statements
        .create_update_all(&mut builder, "Table", &fields(&["Field1", "Field2"]), &[], 1, None, None, None)
        .unwrap_err();
    assert_eq!(err, Error::MissingArgument("qualifiers".to_string()));
}

// MERGE tests

#[test]
fn merge_by_identity_primary() {
    let statements = SqlServerStatementBuilder::new();
    let mut builder = QueryBuilder::new();
    let primary = DbField::new("Field1").primary().identity();
    let sql = statements
        .create_merge(&mut builder, "Table", &fields(&["Field1", "Field2"]), &[], Some(&primary), None, None)
        .unwrap();
    assert_eq!(
        sql,
        "MERGE [Table] AS T USING ( SELECT @Field1 AS [Field1], @Field2 AS [Field2] ) AS S \
         ON ( S.[Field1] = T.[Field1] ) WHEN NOT MATCHED THEN INSERT ( [Field2] ) VALUES ( S.[Field2] ) \
         WHEN MATCHED THEN UPDATE SET T.[Field2] = S.[Field2] OUTPUT INSERTED.[Field1] AS [Result] ;"
    );
}

#[test]
fn merge_qualifier_outside_fields() {
    let statements = SqlServerStatementBuilder::new();
    let mut builder = QueryBuilder::new();
    let err = statements
        .create_merge(&mut builder, "Table", &fields(&["Field1", "Field2"]), &fields(&["Field3"]), None, None, None)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidConfiguration(_)));
}

#[test]
fn merge_identity_must_be_primary() {
    let statements = SqlServerStatementBuilder::new();
    let mut builder = QueryBuilder::new();
    let primary = DbField::new("Field1").primary();
    let identity = DbField::new("Field2").identity();
    let err = statements
        .create_merge(&mut builder, "Table", &fields(&["Field1", "Field2"]), &[], Some(&primary), Some(&identity), None)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidConfiguration(_)));
}

// DELETE tests

#[test]
fn delete_and_truncate() {
    let statements = SqlServerStatementBuilder::new();
    let mut builder = QueryBuilder::new();

    let sql = statements.create_delete(&mut builder, "Table", Some(&by_field1()), None).unwrap();
    assert_eq!(sql, "DELETE FROM [Table] WHERE ([Field1] = @Field1) ;");

    let sql = statements.create_delete_all(&mut builder, "Table", None).unwrap();
    assert_eq!(sql, "DELETE FROM [Table] ;");

    let sql = statements.create_truncate(&mut builder, "dbo.Table").unwrap();
    assert_eq!(sql, "TRUNCATE TABLE [dbo].[Table] ;");
    let sql = statements.create_truncate(&mut builder, "[dbo].[Table]").unwrap();
    assert_eq!(sql, "TRUNCATE TABLE [dbo].[Table] ;");
}

#[test]
fn blank_table() {
    let statements = SqlServerStatementBuilder::new();
    let mut builder = QueryBuilder::new();
    let err = statements.create_delete_all(&mut builder, "  ", None).unwrap_err();
    assert_eq!(err, Error::MissingArgument("table name".to_string()));
    let err = statements.create_query_all(&mut builder, "Table", &[], &[], None).unwrap_err();
    assert_eq!(err, Error::MissingArgument("fields".to_string()));
}

#[test]
fn hints_disabled() {
    let setting = DbSetting {
        supports_table_hints: false,
        ..DbSetting::SQL_SERVER
    };
    let statements = SqlServerStatementBuilder::with_setting(setting);
    let mut builder = QueryBuilder::new();
    let hints = Some("WITH (NOLOCK)");

    let results = [
        statements.create_query_all(&mut builder, "Table", &fields(&["Field1"]), &[], hints),
        statements.create_count_all(&mut builder, "Table", hints),
        statements.create_delete_all(&mut builder, "Table", hints),
        statements.create_insert(&mut builder, "Table", &fields(&["Field1"]), None, None, hints),
    ];
    for result in results {
        assert!(matches!(result, Err(Error::Unsupported { .. })));
    }
    assert!(builder.is_empty());
}
