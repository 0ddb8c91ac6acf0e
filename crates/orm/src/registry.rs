//! Mapping registries.
//!
//! Each registry kind is an independent concurrent key-value store keyed by
//! entity type and, where applicable, member name. Writes are "register once
//! unless forced": a non-forced `add` on an occupied key fails with
//! [`Error::MappingExists`] and the check-and-insert is a single atomic step on
//! the key's map entry.
//!
//! A [`Registry`] owns every store together with the derived
//! [`MetadataCache`]. Any mutation flushes the derived entries so no resolved
//! value outlives the mapping it was computed from.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::cache::{Metadata, MetadataCache};
use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::field::{ClassProperty, Field};
use crate::handler::ValueHandler;
use crate::mappers::{
    AttributeMapper, ColumnMapper, HandlerMapper, IdentityMapper, PrimaryMapper, TableMapper,
    TypeMapper,
};
use crate::types::{DbType, ParameterAttribute, TypeKey};

/// Key of one mapping entry: a type, optionally narrowed to one member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MappingKey {
    /// Entity type, or member value type for type-level mappings.
    pub ty: TypeKey,
    /// Canonical member name.
    pub member: Option<&'static str>,
}

impl MappingKey {
    /// A type-level key.
    #[must_use]
    pub const fn of_type(ty: TypeKey) -> Self {
        Self { ty, member: None }
    }

    /// A member-level key.
    #[must_use]
    pub const fn of_member(ty: TypeKey, member: &'static str) -> Self {
        Self {
            ty,
            member: Some(member),
        }
    }
}

impl fmt::Display for MappingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.member {
            Some(member) => write!(f, "{}.{member}", self.ty),
            None => write!(f, "{}", self.ty),
        }
    }
}

/// One registry kind.
pub(crate) struct MappingRegistry<V> {
    kind: &'static str,
    entries: DashMap<MappingKey, V>,
}

impl<V: Clone> MappingRegistry<V> {
    fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: DashMap::new(),
        }
    }

    pub(crate) fn add(&self, key: MappingKey, value: V, force: bool) -> Result<()> {
        match self.entries.entry(key) {
            Entry::Occupied(mut entry) => {
                if !force {
                    tracing::warn!(registry = self.kind, %key, "mapping already exists");
                    return Err(Error::MappingExists {
                        registry: self.kind,
                        key: key.to_string(),
                    });
                }
                entry.insert(value);
            }
            Entry::Vacant(entry) => {
                entry.insert(value);
            }
        }
        tracing::debug!(registry = self.kind, %key, force, "mapping added");
        Ok(())
    }

    pub(crate) fn get(&self, key: &MappingKey) -> Option<V> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    pub(crate) fn remove(&self, key: &MappingKey) -> bool {
        let removed = self.entries.remove(key).is_some();
        tracing::debug!(registry = self.kind, %key, removed, "mapping removed");
        removed
    }

    pub(crate) fn clear(&self) {
        self.entries.clear();
        tracing::debug!(registry = self.kind, "mappings cleared");
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// All registry kinds.
pub(crate) struct Mappings {
    pub(crate) tables: MappingRegistry<String>,
    pub(crate) columns: MappingRegistry<String>,
    pub(crate) primaries: MappingRegistry<&'static str>,
    pub(crate) identities: MappingRegistry<&'static str>,
    pub(crate) types: MappingRegistry<DbType>,
    pub(crate) handlers: MappingRegistry<Arc<dyn ValueHandler>>,
    pub(crate) attributes: MappingRegistry<Vec<ParameterAttribute>>,
}

impl Mappings {
    fn new() -> Self {
        Self {
            tables: MappingRegistry::new("table"),
            columns: MappingRegistry::new("column"),
            primaries: MappingRegistry::new("primary"),
            identities: MappingRegistry::new("identity"),
            types: MappingRegistry::new("type"),
            handlers: MappingRegistry::new("handler"),
            attributes: MappingRegistry::new("attribute"),
        }
    }

    fn clear(&self) {
        self.tables.clear();
        self.columns.clear();
        self.primaries.clear();
        self.identities.clear();
        self.types.clear();
        self.handlers.clear();
        self.attributes.clear();
    }
}

/// The mapping registry service.
///
/// Construct one per process (or per test) and share it by cloning; clones
/// refer to the same stores.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<Inner>,
}

struct Inner {
    mappings: Mappings,
    cache: MetadataCache,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("tables", &self.inner.mappings.tables.len())
            .field("columns", &self.inner.mappings.columns.len())
            .field("generation", &self.generation())
            .finish_non_exhaustive()
    }
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                mappings: Mappings::new(),
                cache: MetadataCache::default(),
            }),
        }
    }

    /// Table-name mappings.
    #[must_use]
    pub const fn tables(&self) -> TableMapper<'_> {
        TableMapper::new(self)
    }

    /// Column-name mappings.
    #[must_use]
    pub const fn columns(&self) -> ColumnMapper<'_> {
        ColumnMapper::new(self)
    }

    /// Primary-member mappings.
    #[must_use]
    pub const fn primaries(&self) -> PrimaryMapper<'_> {
        PrimaryMapper::new(self)
    }

    /// Identity-member mappings.
    #[must_use]
    pub const fn identities(&self) -> IdentityMapper<'_> {
        IdentityMapper::new(self)
    }

    /// Database-type mappings.
    #[must_use]
    pub const fn types(&self) -> TypeMapper<'_> {
        TypeMapper::new(self)
    }

    /// Value-handler mappings.
    #[must_use]
    pub const fn handlers(&self) -> HandlerMapper<'_> {
        HandlerMapper::new(self)
    }

    /// Parameter-attribute mappings.
    #[must_use]
    pub const fn attributes(&self) -> AttributeMapper<'_> {
        AttributeMapper::new(self)
    }

    /// The resolved metadata view.
    #[must_use]
    pub fn metadata(&self) -> Metadata<'_> {
        Metadata::new(&self.inner.mappings, &self.inner.cache)
    }

    /// Clears every registry and every derived cache entry.
    pub fn flush(&self) {
        self.mutate(Mappings::clear);
    }

    /// Counter bumped by every mutation. Compiled artifacts derived from
    /// mappings compare it to detect staleness.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.inner.cache.generation()
    }

    pub(crate) fn mappings(&self) -> &Mappings {
        &self.inner.mappings
    }

    /// Runs a registry mutation and flushes derived entries.
    pub(crate) fn mutate<T>(&self, mutation: impl FnOnce(&Mappings) -> T) -> T {
        self.inner.cache.mutate(|| mutation(&self.inner.mappings))
    }

    /// Runs a fallible registry mutation; derived entries are flushed only
    /// when it succeeds.
    pub(crate) fn try_mutate<T>(&self, mutation: impl FnOnce(&Mappings) -> Result<T>) -> Result<T> {
        self.inner.cache.try_mutate(|| mutation(&self.inner.mappings))
    }

    /// Resolves a member reference on `E` to its registry key.
    pub(crate) fn member_key<E: Entity, M: IntoMember + ?Sized>(
        &self, member: &M,
    ) -> Result<MappingKey> {
        let name = member.member_name().trim();
        if name.is_empty() {
            return Err(Error::missing("member name"));
        }
        let declared = self.metadata().declared::<E>()?;
        let definition = declared
            .find(name)
            .ok_or_else(|| Error::not_found(declared.entity().simple_name(), name))?;
        Ok(MappingKey::of_member(TypeKey::of::<E>(), definition.name()))
    }
}

/// A reference to an entity member: a raw member name, a [`Field`] or a
/// resolved [`ClassProperty`].
pub trait IntoMember {
    /// The referenced member or column name.
    fn member_name(&self) -> &str;
}

impl IntoMember for str {
    fn member_name(&self) -> &str {
        self
    }
}

impl IntoMember for String {
    fn member_name(&self) -> &str {
        self
    }
}

impl IntoMember for Field {
    fn member_name(&self) -> &str {
        self.name()
    }
}

impl IntoMember for ClassProperty {
    fn member_name(&self) -> &str {
        self.name()
    }
}
