//! Integration tests for the statement engine: metadata-driven requests and
//! statement memoization.

#![allow(missing_docs)]

mod common;

use std::sync::Arc;

use common::{Customer, Person, init_tracing};
use tabula_orm::{
    Aggregate, DbField, Dialect, Engine, EngineOptions, Error, Field, OrderField, QueryField, QueryGroup, Registry,
    Request, RequestKind,
};

#[test]
fn query_from_metadata() {
    init_tracing();
    let engine = Engine::new(Dialect::SqlServer);
    let request = engine
        .request::<Person>(RequestKind::Query)
        .unwrap()
        .with_where(QueryField::eq("id", 10))
        .with_top(1);

    let sql = engine.statement(&request).unwrap();
    assert_eq!(
        &*sql,
        "SELECT TOP (1) [id], [FullName], [gender], [age] FROM [dbo].[Person] WHERE ([id] = @id) ;"
    );
}

#[test]
fn insert_and_update_from_metadata() {
    let engine = Engine::new(Dialect::SqlServer);

    let insert = engine.request::<Person>(RequestKind::Insert).unwrap();
    assert_eq!(
        &*engine.statement(&insert).unwrap(),
        "INSERT INTO [dbo].[Person] ( [FullName], [gender], [age] ) VALUES ( @FullName, @gender, @age ) ; \
         SELECT CONVERT(BIGINT, SCOPE_IDENTITY()) AS [Result] ;"
    );

    let update = engine
        .request::<Person>(RequestKind::Update)
        .unwrap()
        .with_where(QueryField::eq("id", 10));
    assert_eq!(
        &*engine.statement(&update).unwrap(),
        "UPDATE [dbo].[Person] SET [FullName] = @FullName, [gender] = @gender, [age] = @age WHERE ([id] = @_id) ;"
    );

    let count = engine.request::<Person>(RequestKind::CountAll).unwrap();
    assert_eq!(&*engine.statement(&count).unwrap(), "SELECT COUNT_BIG (1) AS [CountValue] FROM [dbo].[Person] ;");
}

#[test]
fn registry_mappings_flow_into_requests() {
    let engine = Engine::new(Dialect::PostgreSql);
    engine.registry().tables().add::<Customer>("crm.Customers", false).unwrap();
    engine.registry().columns().add::<Customer, _>("name", "CustomerName", false).unwrap();

    let merge = engine.request::<Customer>(RequestKind::Merge).unwrap();
    assert_eq!(
        &*engine.statement(&merge).unwrap(),
        r#"INSERT INTO "crm"."Customers" ( "customer_id", "CustomerName" ) VALUES ( @customer_id, @CustomerName ) ON CONFLICT ( "customer_id" ) DO UPDATE SET "CustomerName" = EXCLUDED."CustomerName" RETURNING "customer_id" AS "Result" ;"#
    );
}

#[test]
fn aggregates_and_paging() {
    let engine = Engine::new(Dialect::Sqlite);

    let request = Request::aggregate(Aggregate::Sum, true, "Orders", "Total")
        .with_where(QueryField::gt("Total", 100));
    assert_eq!(&*engine.statement(&request).unwrap(), "SELECT SUM ([Total]) AS [SumValue] FROM [Orders] ;");

    let request = Request::aggregate(Aggregate::Min, false, "Orders", "Total")
        .with_where(QueryField::gt("Total", 100));
    assert_eq!(
        &*engine.statement(&request).unwrap(),
        "SELECT MIN ([Total]) AS [MinValue] FROM [Orders] WHERE ([Total] > @Total) ;"
    );

    let request = Request::batch_query("Orders", Field::from_names(["Number", "Total"]), 2, 10)
        .with_order_by(vec![OrderField::ascending("Number")]);
    assert_eq!(
        &*engine.statement(&request).unwrap(),
        "SELECT [Number], [Total] FROM [Orders] ORDER BY [Number] ASC LIMIT 10 OFFSET 20 ;"
    );
}

#[test]
fn statements_are_memoized_by_structure() {
    let engine = Engine::new(Dialect::SqlServer);
    let fields = Field::from_names(["Id", "Name"]);

    let first = Request::query("Person", fields.clone()).with_where(QueryField::eq("Id", 1));
    let second = Request::query("Person", fields.clone()).with_where(QueryField::eq("Id", 2));
    assert_eq!(first, second);

    let a = engine.statement(&first).unwrap();
    let b = engine.statement(&second).unwrap();
    assert!(Arc::ptr_eq(&a, &b));

    let other = Request::query("Person", fields).with_where(QueryGroup::from(QueryField::is_null("Id")));
    assert_ne!(first, other);
    assert_eq!(&*engine.statement(&other).unwrap(), "SELECT [Id], [Name] FROM [Person] WHERE ([Id] IS NULL) ;");
}

#[test]
fn failed_requests_are_not_memoized() {
    let engine = Engine::new(Dialect::SqlServer);
    let request = Request::skip_query("Person", Field::from_names(["Id"]), 0, 10);
    assert!(matches!(engine.statement(&request), Err(Error::MissingArgument(_))));
    assert!(matches!(engine.statement(&request), Err(Error::MissingArgument(_))));

    let request = Request::update("Person", Field::from_names(["Id"]))
        .with_primary(Some(DbField::new("Id").primary().identity()));
    assert_eq!(engine.statement(&request), Err(Error::MissingArgument("fields to update".to_string())));
}

#[test]
fn flush_resets_mappings() {
    let engine = Engine::new(Dialect::SqlServer);
    engine.registry().tables().add::<Customer>("Customers", false).unwrap();
    let before = engine.request::<Customer>(RequestKind::DeleteAll).unwrap();
    assert_eq!(&*engine.statement(&before).unwrap(), "DELETE FROM [Customers] ;");

    engine.flush();
    let after = engine.request::<Customer>(RequestKind::DeleteAll).unwrap();
    assert_eq!(&*engine.statement(&after).unwrap(), "DELETE FROM [Customer] ;");
}

#[test]
fn options_configure_the_engine() {
    let options = EngineOptions {
        dialect: "postgres".to_string(),
        table_hints: "true".to_string(),
        statement_cache: "16".to_string(),
    };
    let engine = Engine::with_options(Registry::new(), &options).unwrap();
    assert_eq!(engine.setting().name, "PostgreSql");
    assert!(!engine.setting().supports_table_hints);

    let options = EngineOptions {
        table_hints: "false".to_string(),
        ..EngineOptions::default()
    };
    let engine = Engine::with_options(Registry::new(), &options).unwrap();
    assert_eq!(engine.setting().name, "SqlServer");
    let request = Request::count_all("Person").with_hints("WITH (NOLOCK)");
    assert!(matches!(engine.statement(&request), Err(Error::Unsupported { .. })));

    let options = EngineOptions {
        dialect: "oracle".to_string(),
        ..EngineOptions::default()
    };
    assert!(matches!(Engine::with_options(Registry::new(), &options), Err(Error::InvalidConfiguration(_))));
}

#[test]
fn options_load_from_the_environment() {
    let options = EngineOptions::load().unwrap();
    assert!(options.resolve().is_ok());

    let engine = Engine::from_env().unwrap();
    let request = Request::count_all("Person");
    assert!(engine.statement(&request).unwrap().contains("COUNT"));
}

#[test]
fn shared_registry() {
    let registry = Registry::new();
    let sqlserver = Engine::with_registry(registry.clone(), Dialect::SqlServer);
    let mysql = Engine::with_registry(registry, Dialect::MySql);

    sqlserver.registry().tables().add::<Customer>("Customers", false).unwrap();
    let request = mysql.request::<Customer>(RequestKind::Truncate).unwrap();
    assert_eq!(&*mysql.statement(&request).unwrap(), "TRUNCATE TABLE `Customers` ;");
}
