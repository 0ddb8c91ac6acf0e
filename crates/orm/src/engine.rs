//! The engine ties a registry, a dialect's statement builder and the
//! statement and writer caches together.

use std::fmt;
use std::sync::Arc;

use anyhow::Context;
use fromenv::FromEnv;
use moka::sync::Cache;

use crate::entity::Entity;
use crate::error::Error;
use crate::query::QueryBuilder;
use crate::registry::Registry;
use crate::request::{Request, RequestKey, RequestKind};
use crate::schema::SchemaProvider;
use crate::setting::{DbSetting, Dialect};
use crate::statement::{StatementBuilder, builder_for};
use crate::writer::{Accessor, BulkMapping, MappingSource, RowWriter, WriterCompiler};

const DEFAULT_STATEMENT_CACHE: u64 = 1024;

/// Engine options loaded from the environment.
#[derive(Debug, Clone, FromEnv)]
pub struct EngineOptions {
    /// Target dialect: `sqlserver`, `postgres`, `mysql` or `sqlite`.
    #[env(from = "TABULA_DIALECT", default = "sqlserver")]
    pub dialect: String,

    /// Whether table hints are passed through on dialects that accept them.
    #[env(from = "TABULA_TABLE_HINTS", default = "true")]
    pub table_hints: String,

    /// Maximum number of memoized statements.
    #[env(from = "TABULA_STATEMENT_CACHE", default = "1024")]
    pub statement_cache: String,
}

impl EngineOptions {
    /// Loads options from `TABULA_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be read.
    pub fn load() -> anyhow::Result<Self> {
        Self::from_env().finalize().context("issue loading engine options")
    }

    /// The configured dialect and its settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] for an unknown dialect or an
    /// unparseable flag.
    pub fn resolve(&self) -> crate::Result<(Dialect, DbSetting, u64)> {
        let dialect: Dialect = self.dialect.parse()?;
        let mut setting = dialect.setting();

        let hints: bool = self.table_hints.trim().parse().map_err(|_err| {
            Error::invalid(format!("TABULA_TABLE_HINTS must be true or false, got '{}'", self.table_hints))
        })?;
        setting.supports_table_hints &= hints;

        let capacity = self.statement_cache.trim().parse().map_err(|_err| {
            Error::invalid(format!(
                "TABULA_STATEMENT_CACHE must be a number, got '{}'",
                self.statement_cache
            ))
        })?;
        Ok((dialect, setting, capacity))
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            dialect: Dialect::SqlServer.to_string(),
            table_hints: "true".to_string(),
            statement_cache: DEFAULT_STATEMENT_CACHE.to_string(),
        }
    }
}

/// Statement synthesis for one dialect over a shared [`Registry`].
///
/// The engine is `Send + Sync`; share it behind an `Arc` and call it from any
/// thread.
pub struct Engine {
    registry: Registry,
    statements: Box<dyn StatementBuilder>,
    memo: Cache<RequestKey, Arc<str>>,
    writers: WriterCompiler,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("dialect", &self.setting().name)
            .field("registry", &self.registry)
            .field("statements", &self.memo.entry_count())
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// An engine for `dialect` with its default settings and a new registry.
    #[must_use]
    pub fn new(dialect: Dialect) -> Self {
        Self::with_setting(Registry::new(), dialect, dialect.setting(), DEFAULT_STATEMENT_CACHE)
    }

    /// An engine over an existing registry.
    #[must_use]
    pub fn with_registry(registry: Registry, dialect: Dialect) -> Self {
        Self::with_setting(registry, dialect, dialect.setting(), DEFAULT_STATEMENT_CACHE)
    }

    /// An engine configured from `options`.
    ///
    /// # Errors
    ///
    /// See [`EngineOptions::resolve`].
    pub fn with_options(registry: Registry, options: &EngineOptions) -> crate::Result<Self> {
        let (dialect, setting, capacity) = options.resolve()?;
        Ok(Self::with_setting(registry, dialect, setting, capacity))
    }

    /// An engine configured from `TABULA_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the options cannot be loaded or are invalid.
    pub fn from_env() -> anyhow::Result<Self> {
        let options = EngineOptions::load()?;
        Ok(Self::with_options(Registry::new(), &options)?)
    }

    fn with_setting(registry: Registry, dialect: Dialect, setting: DbSetting, capacity: u64) -> Self {
        tracing::debug!(dialect = %dialect, capacity, "statement engine created");
        Self {
            writers: WriterCompiler::new(registry.clone(), setting.clone()),
            statements: builder_for(dialect, setting),
            memo: Cache::new(capacity),
            registry,
        }
    }

    /// The mapping registry.
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The dialect's statement builder.
    #[must_use]
    pub fn builder(&self) -> &dyn StatementBuilder {
        self.statements.as_ref()
    }

    /// The dialect conventions.
    #[must_use]
    pub fn setting(&self) -> &DbSetting {
        self.statements.setting()
    }

    /// The SQL text of `request`, synthesized once per structurally distinct
    /// request. Failed requests are not memoized.
    ///
    /// # Errors
    ///
    /// Returns the statement builder's validation errors.
    pub fn statement(&self, request: &Request) -> crate::Result<Arc<str>> {
        if let Some(sql) = self.memo.get(request.key()) {
            tracing::trace!(table = %request.table(), "statement cache hit");
            return Ok(sql);
        }

        let mut builder = QueryBuilder::new();
        let sql: Arc<str> = request.build(self.builder(), &mut builder)?.into();
        self.memo.insert(request.key().clone(), Arc::clone(&sql));
        Ok(sql)
    }

    /// A request of `kind` for entity `E`, with the table, fields, primary
    /// and identity resolved from the registry and declarations.
    ///
    /// # Errors
    ///
    /// Returns metadata resolution errors.
    pub fn request<E: Entity>(&self, kind: RequestKind) -> crate::Result<Request> {
        let metadata = self.registry.metadata();
        let table = metadata.table_name::<E>()?;
        let primary = metadata.primary::<E>()?.map(|p| p.as_db_field());
        let identity = metadata.identity::<E>()?.map(|p| p.as_db_field());

        let request = Request::new(kind, &*table).with_primary(primary).with_identity(identity);
        Ok(match kind {
            RequestKind::Count
            | RequestKind::CountAll
            | RequestKind::Exists
            | RequestKind::Delete
            | RequestKind::DeleteAll
            | RequestKind::Truncate => request,
            _ if kind.aggregate().is_some() => request,
            _ => request.with_fields(metadata.fields::<E>()?),
        })
    }

    /// The row writer of `E` for `table`.
    ///
    /// # Errors
    ///
    /// See [`WriterCompiler::signature`].
    pub fn row_writer<E: Entity>(
        &self, table: &str, mappings: Option<&[BulkMapping]>, provider: &dyn SchemaProvider,
        keep_identity: bool,
    ) -> anyhow::Result<Arc<RowWriter<E>>> {
        let source = match mappings {
            Some(mappings) => MappingSource::Explicit(mappings),
            None => MappingSource::Schema {
                provider,
                keep_identity,
            },
        };
        self.writers.row_writer::<E>(table, source)
    }

    /// The accessor of one member of `E`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PropertyNotFound`] for an unknown member.
    pub fn accessor<E: Entity>(&self, member: &str) -> crate::Result<Arc<Accessor<E>>> {
        self.writers.accessor::<E>(member)
    }

    /// Clears every mapping and every derived cache.
    pub fn flush(&self) {
        self.registry.flush();
        self.memo.invalidate_all();
        self.writers.clear();
        tracing::debug!("engine flushed");
    }
}
