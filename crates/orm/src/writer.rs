//! Compiled row writers and member accessors.
//!
//! A [`RowWriter`] writes entity instances into a driver-side row sink, one
//! destination column at a time, with enum and value-handler conversions
//! resolved once at compile time. Writers are cached by the
//! [`MappingSignature`] they were compiled from and recompiled when the
//! registry has changed since.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use dashmap::DashMap;
use sea_query::Value;

use crate::entity::Entity;
use crate::error::Error;
use crate::field::{ClassProperty, same_name};
use crate::handler::ValueHandler;
use crate::registry::Registry;
use crate::schema::SchemaProvider;
use crate::setting::DbSetting;
use crate::types::{DbType, TypeKey};
use crate::value::MemberValue;

/// Driver-side row writing context, e.g. a bulk-copy buffer.
pub trait RowSink {
    /// Begins a new row.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink rejects the row.
    fn start_row(&mut self) -> anyhow::Result<()>;

    /// Writes one column of the current row.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink rejects the value.
    fn write(&mut self, column: &str, value: Value, db_type: Option<DbType>) -> anyhow::Result<()>;
}

/// An explicit member to column mapping.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BulkMapping {
    /// Member name (or mapped column name) on the entity.
    pub source: String,
    /// Destination column.
    pub destination: String,
    /// Destination type, when known.
    pub db_type: Option<DbType>,
}

impl BulkMapping {
    /// Maps `source` to `destination`.
    #[must_use]
    pub fn new(source: impl AsRef<str>, destination: impl AsRef<str>) -> Self {
        Self {
            source: source.as_ref().trim().to_string(),
            destination: destination.as_ref().trim().to_string(),
            db_type: None,
        }
    }

    /// Sets the destination type.
    #[must_use]
    pub const fn with_db_type(mut self, db_type: DbType) -> Self {
        self.db_type = Some(db_type);
        self
    }
}

/// Identity of a compiled writer: entity type, destination table and the
/// resolved (member, column, type) triples in column order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MappingSignature {
    entity: TypeKey,
    table: String,
    mappings: Vec<BulkMapping>,
}

impl MappingSignature {
    /// The resolved mappings, sources given as member names.
    #[must_use]
    pub fn mappings(&self) -> &[BulkMapping] {
        &self.mappings
    }
}

/// Where the mappings of a writer come from.
#[derive(Clone, Copy)]
pub enum MappingSource<'a> {
    /// Caller supplied mappings.
    Explicit(&'a [BulkMapping]),
    /// Intersect entity members with the table's columns.
    Schema {
        /// Column source.
        provider: &'a dyn SchemaProvider,
        /// Keep identity columns instead of leaving them to the database.
        keep_identity: bool,
    },
}

struct ColumnWriter {
    property: ClassProperty,
    destination: String,
    db_type: Option<DbType>,
    handler: Option<Arc<dyn ValueHandler>>,
}

impl ColumnWriter {
    fn convert(&self, value: MemberValue) -> anyhow::Result<Value> {
        if let Some(handler) = &self.handler {
            return handler
                .set(value, &self.property)
                .with_context(|| format!("issue converting '{}'", self.property.name()));
        }
        match value {
            MemberValue::Scalar(value) => Ok(value),
            MemberValue::Enum(value) => enum_value(value.map(|e| (e.name, e.ordinal)), self.db_type)
                .with_context(|| format!("issue converting '{}'", self.property.name())),
        }
    }
}

/// Encodes an enum for the destination type: integer columns get the
/// ordinal, everything else the variant name.
fn enum_value(value: Option<(&'static str, i64)>, db_type: Option<DbType>) -> anyhow::Result<Value> {
    let value = match db_type {
        Some(DbType::Byte) => Value::TinyUnsigned(value.map(|(_, o)| u8::try_from(o)).transpose()?),
        Some(DbType::SByte) => Value::TinyInt(value.map(|(_, o)| i8::try_from(o)).transpose()?),
        Some(DbType::Int16) => Value::SmallInt(value.map(|(_, o)| i16::try_from(o)).transpose()?),
        Some(DbType::Int32) => Value::Int(value.map(|(_, o)| i32::try_from(o)).transpose()?),
        Some(DbType::Int64) => Value::BigInt(value.map(|(_, o)| o)),
        Some(DbType::UInt16) => Value::SmallUnsigned(value.map(|(_, o)| u16::try_from(o)).transpose()?),
        Some(DbType::UInt32) => Value::Unsigned(value.map(|(_, o)| u32::try_from(o)).transpose()?),
        Some(DbType::UInt64) => Value::BigUnsigned(value.map(|(_, o)| u64::try_from(o)).transpose()?),
        Some(other) if !other.is_textual() => {
            return Err(anyhow!("enum values cannot be written as {other:?}"));
        }
        _ => Value::String(value.map(|(name, _)| Box::new(name.to_string()))),
    };
    Ok(value)
}

/// Writes instances of `E` into a [`RowSink`].
pub struct RowWriter<E> {
    signature: MappingSignature,
    columns: Vec<ColumnWriter>,
    _marker: PhantomData<fn(&E)>,
}

impl<E> fmt::Debug for RowWriter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowWriter").field("signature", &self.signature).finish_non_exhaustive()
    }
}

impl<E: Entity> RowWriter<E> {
    /// The signature the writer was compiled from.
    #[must_use]
    pub const fn signature(&self) -> &MappingSignature {
        &self.signature
    }

    /// Destination columns in write order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.destination.as_str())
    }

    /// Writes one entity as one row.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be converted or the sink rejects it.
    pub fn write(&self, sink: &mut dyn RowSink, entity: &E) -> anyhow::Result<()> {
        sink.start_row()?;
        for column in &self.columns {
            let value = entity.value(column.property.name()).ok_or_else(|| {
                anyhow!("member '{}' has no value accessor", column.property.name())
            })?;
            let value = column.convert(value)?;
            sink.write(&column.destination, value, column.db_type)?;
        }
        Ok(())
    }

    /// Writes every entity, one row each.
    ///
    /// # Errors
    ///
    /// See [`RowWriter::write`].
    pub fn write_all<'a>(
        &self, sink: &mut dyn RowSink, entities: impl IntoIterator<Item = &'a E>,
    ) -> anyhow::Result<usize> {
        let mut rows = 0;
        for entity in entities {
            self.write(sink, entity)?;
            rows += 1;
        }
        Ok(rows)
    }
}

/// Reads and assigns one member of `E`, applying its value handler.
pub struct Accessor<E> {
    property: ClassProperty,
    handler: Option<Arc<dyn ValueHandler>>,
    db_type: Option<DbType>,
    _marker: PhantomData<fn(&E)>,
}

impl<E> fmt::Debug for Accessor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accessor").field("property", &self.property).finish_non_exhaustive()
    }
}

impl<E: Entity> Accessor<E> {
    /// The accessed member.
    #[must_use]
    pub const fn property(&self) -> &ClassProperty {
        &self.property
    }

    /// Reads the member as a parameter value.
    ///
    /// # Errors
    ///
    /// Returns an error if the handler or enum conversion fails.
    pub fn get(&self, entity: &E) -> anyhow::Result<Value> {
        let value = entity
            .value(self.property.name())
            .ok_or_else(|| anyhow!("member '{}' has no value accessor", self.property.name()))?;
        if let Some(handler) = &self.handler {
            return handler.set(value, &self.property);
        }
        match value {
            MemberValue::Scalar(value) => Ok(value),
            MemberValue::Enum(value) => enum_value(value.map(|e| (e.name, e.ordinal)), self.db_type),
        }
    }

    /// Assigns a database value to the member.
    ///
    /// # Errors
    ///
    /// Returns an error if the handler fails or the value does not convert to
    /// the member type.
    pub fn set(&self, entity: &mut E, value: Value) -> anyhow::Result<()> {
        let value = match &self.handler {
            Some(handler) => handler.get(value, &self.property)?,
            None => value,
        };
        entity
            .set_value(self.property.name(), value)
            .with_context(|| format!("issue assigning '{}'", self.property.name()))
    }
}

type Compiled = (u64, Arc<dyn Any + Send + Sync>);

/// Compiles and caches row writers and accessors.
///
/// Concurrent first use of a signature may compile twice; both results are
/// identical and the last insert wins.
pub struct WriterCompiler {
    registry: Registry,
    setting: DbSetting,
    writers: DashMap<MappingSignature, Compiled>,
    accessors: DashMap<(TypeKey, &'static str), Compiled>,
}

impl fmt::Debug for WriterCompiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriterCompiler")
            .field("writers", &self.writers.len())
            .field("accessors", &self.accessors.len())
            .finish_non_exhaustive()
    }
}

impl WriterCompiler {
    /// A compiler resolving metadata from `registry`; `setting` supplies the
    /// enum encoding of unmapped enum members.
    #[must_use]
    pub fn new(registry: Registry, setting: DbSetting) -> Self {
        Self {
            registry,
            setting,
            writers: DashMap::new(),
            accessors: DashMap::new(),
        }
    }

    /// Resolves the mapping signature of `E` against `table`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PropertyNotFound`] for explicit mappings naming an
    /// unknown member, [`Error::InvalidConfiguration`] when no mapping
    /// resolves, and schema provider errors.
    pub fn signature<E: Entity>(
        &self, table: &str, source: MappingSource<'_>,
    ) -> anyhow::Result<MappingSignature> {
        let table = table.trim();
        if table.is_empty() {
            return Err(Error::missing("table name").into());
        }
        let metadata = self.registry.metadata();

        let mappings = match source {
            MappingSource::Explicit(mappings) => mappings
                .iter()
                .map(|mapping| {
                    if mapping.destination.is_empty() {
                        return Err(Error::missing("destination column"));
                    }
                    let property = metadata.property::<E>(&mapping.source)?;
                    let db_type = match mapping.db_type {
                        Some(db_type) => Some(db_type),
                        None => metadata.db_type_for::<E>(property.name(), &self.setting)?,
                    };
                    Ok(BulkMapping {
                        source: property.name().to_string(),
                        destination: mapping.destination.clone(),
                        db_type,
                    })
                })
                .collect::<Result<Vec<_>, Error>>()?,
            MappingSource::Schema {
                provider,
                keep_identity,
            } => {
                let properties = metadata.properties::<E>()?;
                let columns = provider
                    .columns(table)
                    .with_context(|| format!("issue reading columns of '{table}'"))?;
                let mut mappings = Vec::new();
                for column in columns.iter().filter(|c| keep_identity || !c.is_identity) {
                    let Some(property) =
                        properties.iter().find(|p| same_name(p.mapped_name(), &column.name))
                    else {
                        continue;
                    };
                    let db_type = match column.db_type {
                        Some(db_type) => Some(db_type),
                        None => metadata.db_type_for::<E>(property.name(), &self.setting)?,
                    };
                    mappings.push(BulkMapping {
                        source: property.name().to_string(),
                        destination: column.name.clone(),
                        db_type,
                    });
                }
                mappings
            }
        };

        if mappings.is_empty() {
            return Err(Error::invalid(format!(
                "no member of '{}' maps to a column of '{table}'",
                TypeKey::of::<E>()
            ))
            .into());
        }
        Ok(MappingSignature {
            entity: TypeKey::of::<E>(),
            table: table.to_string(),
            mappings,
        })
    }

    /// The writer of `E` for `table`, compiled on first use.
    ///
    /// # Errors
    ///
    /// See [`WriterCompiler::signature`].
    pub fn row_writer<E: Entity>(
        &self, table: &str, source: MappingSource<'_>,
    ) -> anyhow::Result<Arc<RowWriter<E>>> {
        let signature = self.signature::<E>(table, source)?;
        let generation = self.registry.generation();

        if let Some(writer) = self.cached(&self.writers, &signature, generation) {
            tracing::trace!(table = %signature.table, "row writer cache hit");
            return Ok(writer);
        }

        let metadata = self.registry.metadata();
        let columns = signature
            .mappings
            .iter()
            .map(|mapping| {
                Ok(ColumnWriter {
                    property: metadata.property::<E>(&mapping.source)?,
                    destination: mapping.destination.clone(),
                    db_type: mapping.db_type,
                    handler: metadata.handler::<E>(&mapping.source)?,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        tracing::debug!(table = %signature.table, mappings = columns.len(), "row writer compiled");
        let writer = Arc::new(RowWriter {
            signature: signature.clone(),
            columns,
            _marker: PhantomData,
        });
        self.writers.insert(signature, (generation, Arc::clone(&writer) as Arc<dyn Any + Send + Sync>));
        Ok(writer)
    }

    /// The accessor of one member of `E`, compiled on first use.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PropertyNotFound`] for an unknown member.
    pub fn accessor<E: Entity>(&self, member: &str) -> crate::Result<Arc<Accessor<E>>> {
        let generation = self.registry.generation();
        let metadata = self.registry.metadata();
        let property = metadata.property::<E>(member)?;
        let key = (TypeKey::of::<E>(), property.name());

        if let Some(accessor) = self.cached(&self.accessors, &key, generation) {
            return Ok(accessor);
        }

        let accessor = Arc::new(Accessor {
            handler: metadata.handler::<E>(property.name())?,
            db_type: metadata.db_type_for::<E>(property.name(), &self.setting)?,
            property,
            _marker: PhantomData,
        });
        self.accessors.insert(key, (generation, Arc::clone(&accessor) as Arc<dyn Any + Send + Sync>));
        Ok(accessor)
    }

    /// Drops every compiled writer and accessor.
    pub fn clear(&self) {
        self.writers.clear();
        self.accessors.clear();
    }

    fn cached<K, T>(&self, cache: &DashMap<K, Compiled>, key: &K, generation: u64) -> Option<Arc<T>>
    where
        K: Eq + std::hash::Hash,
        T: Send + Sync + 'static,
    {
        let (compiled_at, compiled) = cache.get(key).map(|entry| entry.value().clone())?;
        if compiled_at != generation {
            return None;
        }
        compiled.downcast::<T>().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_encoding_follows_destination() {
        let value = Some(("Male", 1));
        assert_eq!(enum_value(value, Some(DbType::String)).unwrap(), Value::from("Male"));
        assert_eq!(enum_value(value, None).unwrap(), Value::from("Male"));
        assert_eq!(enum_value(value, Some(DbType::Int16)).unwrap(), Value::SmallInt(Some(1)));
        assert_eq!(enum_value(value, Some(DbType::Int64)).unwrap(), Value::BigInt(Some(1)));
        assert_eq!(enum_value(None, Some(DbType::Int32)).unwrap(), Value::Int(None));
        assert!(enum_value(Some(("Big", 300)), Some(DbType::Byte)).is_err());
        assert!(enum_value(value, Some(DbType::DateTime)).is_err());
    }
}
