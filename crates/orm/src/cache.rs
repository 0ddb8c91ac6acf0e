//! Resolved mapping metadata.
//!
//! Resolution combines declared metadata with the registries and memoizes
//! the result per entity type (and member). Entries are computed without any
//! lock held and are only stored when no registry mutation happened in the
//! meantime, so a concurrent `add` can never be shadowed by a stale result.

use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;

use crate::entity::{Entity, MemberDefinition};
use crate::error::{Error, Result};
use crate::field::{ClassProperty, Field, unquote};
use crate::handler::ValueHandler;
use crate::registry::{MappingKey, Mappings};
use crate::resolver::{AttributeResolver, DeclaredEntity};
use crate::setting::DbSetting;
use crate::types::{DbType, ParameterAttribute, TypeKey};

type MemberKey = (TypeKey, &'static str);

/// Memoized resolution results.
#[derive(Default)]
pub struct MetadataCache {
    generation: RwLock<u64>,
    declared: DashMap<TypeKey, Arc<DeclaredEntity>>,
    tables: DashMap<TypeKey, Arc<str>>,
    properties: DashMap<TypeKey, Arc<[ClassProperty]>>,
    db_types: DashMap<MemberKey, Option<DbType>>,
    handlers: DashMap<MemberKey, Option<Arc<dyn ValueHandler>>>,
    attributes: DashMap<MemberKey, Arc<[ParameterAttribute]>>,
}

impl MetadataCache {
    pub(crate) fn generation(&self) -> u64 {
        *self.generation.read()
    }

    /// Applies a registry mutation under the write gate, then drops every
    /// derived entry.
    pub(crate) fn mutate<T>(&self, mutation: impl FnOnce() -> T) -> T {
        let mut generation = self.generation.write();
        let result = mutation();
        self.flush(&mut generation);
        result
    }

    /// Like [`MetadataCache::mutate`], but a rejected mutation leaves the
    /// generation and every derived entry untouched.
    pub(crate) fn try_mutate<T>(&self, mutation: impl FnOnce() -> Result<T>) -> Result<T> {
        let mut generation = self.generation.write();
        let result = mutation()?;
        self.flush(&mut generation);
        Ok(result)
    }

    fn flush(&self, generation: &mut u64) {
        *generation += 1;
        self.declared.clear();
        self.tables.clear();
        self.properties.clear();
        self.db_types.clear();
        self.handlers.clear();
        self.attributes.clear();
        tracing::debug!(generation = *generation, "metadata cache flushed");
    }

    fn memoize<K, V>(
        &self, entries: &DashMap<K, V>, key: K, compute: impl FnOnce() -> Result<V>,
    ) -> Result<V>
    where
        K: Eq + Hash,
        V: Clone,
    {
        if let Some(entry) = entries.get(&key) {
            return Ok(entry.value().clone());
        }
        let observed = self.generation();
        let value = compute()?;

        let current = self.generation.read();
        if *current == observed {
            entries.insert(key, value.clone());
        }
        Ok(value)
    }
}

/// Resolved metadata for entity types, backed by a [`MetadataCache`].
///
/// Declared metadata takes precedence for table, column, primary and identity
/// resolution; registry mappings take precedence for database types and
/// handlers.
#[derive(Clone, Copy)]
pub struct Metadata<'a> {
    mappings: &'a Mappings,
    cache: &'a MetadataCache,
}

impl<'a> Metadata<'a> {
    pub(crate) const fn new(mappings: &'a Mappings, cache: &'a MetadataCache) -> Self {
        Self { mappings, cache }
    }

    /// The validated declared metadata of `E`.
    ///
    /// # Errors
    ///
    /// Returns an error when the declarations of `E` are invalid.
    pub fn declared<E: Entity>(&self) -> Result<Arc<DeclaredEntity>> {
        self.cache.memoize(&self.cache.declared, TypeKey::of::<E>(), AttributeResolver::resolve::<E>)
    }

    /// The mapped table name: declared, then registered, then the type name.
    ///
    /// # Errors
    ///
    /// Returns an error when the declarations of `E` are invalid.
    pub fn table_name<E: Entity>(&self) -> Result<Arc<str>> {
        let entity = TypeKey::of::<E>();
        self.cache.memoize(&self.cache.tables, entity, || {
            let declared = self.declared::<E>()?;
            let name = declared
                .table()
                .map(str::to_string)
                .or_else(|| self.mappings.tables.get(&MappingKey::of_type(entity)))
                .unwrap_or_else(|| entity.simple_name().to_string());
            Ok(Arc::from(name))
        })
    }

    /// Every mapped member of `E`, in declaration order.
    ///
    /// # Errors
    ///
    /// Returns an error when the declarations of `E` are invalid.
    pub fn properties<E: Entity>(&self) -> Result<Arc<[ClassProperty]>> {
        let entity = TypeKey::of::<E>();
        self.cache.memoize(&self.cache.properties, entity, || {
            let declared = self.declared::<E>()?;
            let table = self.table_name::<E>()?;
            let primary = self.primary_member(&declared, &table);
            let identity = declared
                .identity()
                .map(MemberDefinition::name)
                .or_else(|| self.mappings.identities.get(&MappingKey::of_type(entity)));

            let properties = declared
                .members()
                .iter()
                .map(|member| {
                    let mapped_name = member
                        .declared_name()
                        .map(str::to_string)
                        .or_else(|| {
                            self.mappings.columns.get(&MappingKey::of_member(entity, member.name))
                        })
                        .unwrap_or_else(|| member.name.to_string());
                    ClassProperty {
                        entity,
                        name: member.name,
                        mapped_name,
                        kind: member.kind,
                        value_type: member.value_type,
                        nullable: member.nullable,
                        is_primary: primary == Some(member.name),
                        is_identity: identity == Some(member.name),
                    }
                })
                .collect::<Vec<_>>();
            Ok(Arc::from(properties))
        })
    }

    /// A single member of `E`, by member name or mapped column name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PropertyNotFound`] when `E` has no such member.
    pub fn property<E: Entity>(&self, name: &str) -> Result<ClassProperty> {
        let properties = self.properties::<E>()?;
        properties
            .iter()
            .find(|p| Field::new(p.name).matches(name))
            .or_else(|| properties.iter().find(|p| Field::new(&p.mapped_name).matches(name)))
            .cloned()
            .ok_or_else(|| Error::not_found(TypeKey::of::<E>().simple_name(), name.trim()))
    }

    /// The primary member of `E`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error when the declarations of `E` are invalid.
    pub fn primary<E: Entity>(&self) -> Result<Option<ClassProperty>> {
        Ok(self.properties::<E>()?.iter().find(|p| p.is_primary).cloned())
    }

    /// The identity member of `E`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error when the declarations of `E` are invalid.
    pub fn identity<E: Entity>(&self) -> Result<Option<ClassProperty>> {
        Ok(self.properties::<E>()?.iter().find(|p| p.is_identity).cloned())
    }

    /// The mapped columns of `E` as fields.
    ///
    /// # Errors
    ///
    /// Returns an error when the declarations of `E` are invalid.
    pub fn fields<E: Entity>(&self) -> Result<Vec<Field>> {
        Ok(self.properties::<E>()?.iter().map(ClassProperty::as_field).collect())
    }

    /// The database type of a member, or `None` when nothing maps it.
    ///
    /// Resolution order: the member's handler, the member mapping, the value
    /// type mapping, the declared type, then the primitive default.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PropertyNotFound`] when `E` has no such member.
    pub fn db_type<E: Entity>(&self, member: &str) -> Result<Option<DbType>> {
        let (property, definition) = self.member::<E>(member)?;
        let entity = TypeKey::of::<E>();
        self.cache.memoize(&self.cache.db_types, (entity, property.name), || {
            if let Some(db_type) = self.handler::<E>(property.name)?.and_then(|h| h.db_type()) {
                return Ok(Some(db_type));
            }
            let db_type = self
                .mappings
                .types
                .get(&MappingKey::of_member(entity, property.name))
                .or_else(|| self.mappings.types.get(&MappingKey::of_type(property.value_type)))
                .or(definition.db_type)
                .or_else(|| property.kind.default_db_type());
            Ok(db_type)
        })
    }

    /// Like [`Metadata::db_type`], falling back to the dialect's enum
    /// encoding for enum members.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PropertyNotFound`] when `E` has no such member.
    pub fn db_type_for<E: Entity>(&self, member: &str, setting: &DbSetting) -> Result<Option<DbType>> {
        let db_type = self.db_type::<E>(member)?;
        if db_type.is_some() {
            return Ok(db_type);
        }
        let property = self.property::<E>(member)?;
        Ok(property.kind.is_enum().then_some(setting.enum_db_type))
    }

    /// The value handler of a member: member mapping, then value type
    /// mapping, then the declared handler.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PropertyNotFound`] when `E` has no such member.
    pub fn handler<E: Entity>(&self, member: &str) -> Result<Option<Arc<dyn ValueHandler>>> {
        let (property, definition) = self.member::<E>(member)?;
        let entity = TypeKey::of::<E>();
        self.cache.memoize(&self.cache.handlers, (entity, property.name), || {
            Ok(self
                .mappings
                .handlers
                .get(&MappingKey::of_member(entity, property.name))
                .or_else(|| self.mappings.handlers.get(&MappingKey::of_type(property.value_type)))
                .or(definition.handler))
        })
    }

    /// Parameter attributes of a member: member mapping, then value type
    /// mapping, then declared attributes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PropertyNotFound`] when `E` has no such member.
    pub fn attributes<E: Entity>(&self, member: &str) -> Result<Arc<[ParameterAttribute]>> {
        let (property, definition) = self.member::<E>(member)?;
        let entity = TypeKey::of::<E>();
        self.cache.memoize(&self.cache.attributes, (entity, property.name), || {
            let attributes = self
                .mappings
                .attributes
                .get(&MappingKey::of_member(entity, property.name))
                .or_else(|| self.mappings.attributes.get(&MappingKey::of_type(property.value_type)))
                .unwrap_or(definition.attributes);
            Ok(Arc::from(attributes))
        })
    }

    fn member<E: Entity>(&self, name: &str) -> Result<(ClassProperty, MemberDefinition)> {
        let property = self.property::<E>(name)?;
        let declared = self.declared::<E>()?;
        let definition = declared
            .members()
            .iter()
            .find(|m| m.name == property.name)
            .cloned()
            .ok_or_else(|| Error::not_found(TypeKey::of::<E>().simple_name(), name.trim()))?;
        Ok((property, definition))
    }

    /// Declared, then registered, then by naming convention: `Id`,
    /// `{Type}Id` or `{Table}Id`, ignoring case and underscores.
    fn primary_member(&self, declared: &DeclaredEntity, table: &str) -> Option<&'static str> {
        if let Some(member) = declared.primary() {
            return Some(member.name);
        }
        if let Some(member) = self.mappings.primaries.get(&MappingKey::of_type(declared.entity())) {
            return Some(member);
        }

        let table = table.rsplit('.').next().map_or(table, unquote);
        let candidates = [
            "id".to_string(),
            format!("{}id", conventional(declared.entity().simple_name())),
            format!("{}id", conventional(table)),
        ];
        declared
            .members()
            .iter()
            .find(|m| {
                let name = conventional(m.name);
                let mapped = m.declared_name().map(conventional);
                candidates.iter().any(|c| *c == name || mapped.as_ref() == Some(c))
            })
            .map(MemberDefinition::name)
    }
}

fn conventional(name: &str) -> String {
    unquote(name).chars().filter(|c| *c != '_').collect::<String>().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::conventional;

    #[test]
    fn convention_names() {
        assert_eq!(conventional("[Customer_Id]"), "customerid");
        assert_eq!(conventional("id"), "id");
    }
}
