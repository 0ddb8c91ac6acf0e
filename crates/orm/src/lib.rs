//! Mapping registry and dialect-aware SQL statement synthesis.
//!
//! Maps entity types to tables and members to columns, resolves the
//! effective metadata of each entity (declarations first, then registry
//! mappings, then naming conventions) and synthesizes parameterized SQL text
//! for SQL Server, PostgreSQL, MySQL and SQLite. Statements and compiled row
//! writers are memoized per structurally distinct request.
//!
//! # Quick Start
//!
//! ## Define an Entity
//!
//! ```ignore
//! use tabula_orm::{entity, entity_enum};
//!
//! entity_enum! {
//!     #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//!     pub enum Gender {
//!         Female = 1,
//!         Male = 2,
//!     }
//! }
//!
//! entity! {
//!     table = "[dbo].[Person]",
//!     declare = |definition| definition.primary("id").identity("id"),
//!     #[derive(Debug, Clone)]
//!     pub struct Person {
//!         pub id: i64,
//!         pub name: String,
//!         pub gender: Gender,
//!     }
//! }
//! ```
//!
//! ## Register Mappings
//!
//! ```ignore
//! let engine = Engine::new(Dialect::SqlServer);
//!
//! engine.registry().columns().add::<Person, _>("name", "FullName", false)?;
//! engine.registry().types().add::<Person, _>("gender", DbType::Int16, false)?;
//! ```
//!
//! ## Synthesize Statements
//!
//! ```ignore
//! let request = engine
//!     .request::<Person>(RequestKind::Query)?
//!     .with_where(QueryField::eq("id", 10))
//!     .with_top(1);
//!
//! // SELECT TOP (1) [id], [FullName], [gender] FROM [dbo].[Person] WHERE ([id] = @id) ;
//! let sql = engine.statement(&request)?;
//! ```
//!
//! ## Write Rows
//!
//! ```ignore
//! let writer = engine.row_writer::<Person>("[dbo].[Person]", None, &provider, false)?;
//! writer.write_all(&mut sink, &people)?;
//! ```

mod cache;
mod engine;
mod entity;
mod error;
mod field;
mod filter;
mod handler;
mod mappers;
mod query;
mod registry;
mod request;
mod resolver;
mod schema;
mod setting;
pub mod statement;
mod types;
mod value;
mod writer;

pub use cache::{Metadata, MetadataCache};
pub use engine::{Engine, EngineOptions};
pub use entity::{Entity, EntityDefinition, MemberDefinition};
pub use error::{Error, Result};
pub use field::{ClassProperty, DbField, Direction, Field, OrderField, same_name, unquote};
pub use filter::{Conjunction, FieldSignature, GroupSignature, Operation, QueryField, QueryGroup, Shape};
pub use handler::ValueHandler;
pub use mappers::{
    AttributeMapper, ColumnMapper, HandlerMapper, IdentityMapper, PrimaryMapper, TableMapper, TypeMapper,
};
pub use query::QueryBuilder;
pub use registry::{IntoMember, MappingKey, Registry};
pub use request::{Request, RequestKey, RequestKind};
pub use resolver::{AttributeResolver, DeclaredEntity};
pub use schema::{SchemaProvider, StaticSchemaProvider};
pub use setting::{DbSetting, Dialect, parameter_name};
pub use statement::{
    Aggregate, MySqlStatementBuilder, PostgresStatementBuilder, ResultColumn, SqlServerStatementBuilder,
    SqliteStatementBuilder, StatementBuilder, builder_for,
};
pub use types::{DbType, ParameterAttribute, ParameterDirection, TypeKey, ValueKind};
pub use value::{EnumValue, FromValue, MemberType, MemberValue};
pub use writer::{Accessor, BulkMapping, MappingSignature, MappingSource, RowSink, RowWriter, WriterCompiler};
// Re-export the value type used for parameters and handler conversions.
pub use sea_query::Value;

// Re-exports for ``entity`` and ``entity_enum`` macro use only.
#[doc(hidden)]
pub mod __private {
    pub use anyhow;
    pub use sea_query::Value;

    pub use crate::entity::declare;
    pub use crate::value::as_i64;
}
