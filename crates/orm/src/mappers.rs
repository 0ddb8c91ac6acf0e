//! Typed views over the individual registries of a [`Registry`].

use std::sync::Arc;

use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::handler::ValueHandler;
use crate::registry::{IntoMember, MappingKey, Registry};
use crate::types::{DbType, ParameterAttribute, TypeKey};

/// Table-name mappings per entity type.
#[derive(Debug, Clone, Copy)]
pub struct TableMapper<'a> {
    registry: &'a Registry,
}

impl<'a> TableMapper<'a> {
    pub(crate) const fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    /// Maps `E` to a table name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingArgument`] for a blank name and
    /// [`Error::MappingExists`] when `E` is already mapped and `force` is false.
    pub fn add<E: Entity>(&self, table: impl AsRef<str>, force: bool) -> Result<()> {
        let table = table.as_ref().trim();
        if table.is_empty() {
            return Err(Error::missing("table name"));
        }
        let key = MappingKey::of_type(TypeKey::of::<E>());
        self.registry.try_mutate(|m| m.tables.add(key, table.to_string(), force))
    }

    /// The registered table name of `E`.
    #[must_use]
    pub fn get<E: Entity>(&self) -> Option<String> {
        self.registry.mappings().tables.get(&MappingKey::of_type(TypeKey::of::<E>()))
    }

    /// Removes the mapping of `E`. Returns whether one existed.
    pub fn remove<E: Entity>(&self) -> bool {
        let key = MappingKey::of_type(TypeKey::of::<E>());
        self.registry.mutate(|m| m.tables.remove(&key))
    }

    /// Removes every table mapping.
    pub fn clear(&self) {
        self.registry.mutate(|m| m.tables.clear());
    }
}

/// Column-name mappings per entity member.
#[derive(Debug, Clone, Copy)]
pub struct ColumnMapper<'a> {
    registry: &'a Registry,
}

impl<'a> ColumnMapper<'a> {
    pub(crate) const fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    /// Maps a member of `E` to a column name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingArgument`] for a blank member or column name,
    /// [`Error::PropertyNotFound`] for an unknown member and
    /// [`Error::MappingExists`] when the member is already mapped and `force`
    /// is false.
    pub fn add<E: Entity, M: IntoMember + ?Sized>(
        &self, member: &M, column: impl AsRef<str>, force: bool,
    ) -> Result<()> {
        let column = column.as_ref().trim();
        if column.is_empty() {
            return Err(Error::missing("column name"));
        }
        let key = self.registry.member_key::<E, M>(member)?;
        self.registry.try_mutate(|m| m.columns.add(key, column.to_string(), force))
    }

    /// The registered column name of a member of `E`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PropertyNotFound`] for an unknown member.
    pub fn get<E: Entity, M: IntoMember + ?Sized>(&self, member: &M) -> Result<Option<String>> {
        let key = self.registry.member_key::<E, M>(member)?;
        Ok(self.registry.mappings().columns.get(&key))
    }

    /// Removes the mapping of a member of `E`. Returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PropertyNotFound`] for an unknown member.
    pub fn remove<E: Entity, M: IntoMember + ?Sized>(&self, member: &M) -> Result<bool> {
        let key = self.registry.member_key::<E, M>(member)?;
        Ok(self.registry.mutate(|m| m.columns.remove(&key)))
    }

    /// Removes every column mapping.
    pub fn clear(&self) {
        self.registry.mutate(|m| m.columns.clear());
    }
}

/// Primary-member mappings per entity type.
#[derive(Debug, Clone, Copy)]
pub struct PrimaryMapper<'a> {
    registry: &'a Registry,
}

impl<'a> PrimaryMapper<'a> {
    pub(crate) const fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    /// Marks a member of `E` as the primary key.
    ///
    /// # Errors
    ///
    /// See [`ColumnMapper::add`].
    pub fn add<E: Entity, M: IntoMember + ?Sized>(&self, member: &M, force: bool) -> Result<()> {
        let key = self.registry.member_key::<E, M>(member)?;
        let entity = MappingKey::of_type(key.ty);
        let member = key.member.ok_or_else(|| Error::missing("member name"))?;
        self.registry.try_mutate(|m| m.primaries.add(entity, member, force))
    }

    /// The registered primary member name of `E`.
    #[must_use]
    pub fn get<E: Entity>(&self) -> Option<&'static str> {
        self.registry.mappings().primaries.get(&MappingKey::of_type(TypeKey::of::<E>()))
    }

    /// Removes the mapping of `E`. Returns whether one existed.
    pub fn remove<E: Entity>(&self) -> bool {
        let key = MappingKey::of_type(TypeKey::of::<E>());
        self.registry.mutate(|m| m.primaries.remove(&key))
    }

    /// Removes every primary mapping.
    pub fn clear(&self) {
        self.registry.mutate(|m| m.primaries.clear());
    }
}

/// Identity-member mappings per entity type.
#[derive(Debug, Clone, Copy)]
pub struct IdentityMapper<'a> {
    registry: &'a Registry,
}

impl<'a> IdentityMapper<'a> {
    pub(crate) const fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    /// Marks a member of `E` as database generated.
    ///
    /// # Errors
    ///
    /// See [`ColumnMapper::add`].
    pub fn add<E: Entity, M: IntoMember + ?Sized>(&self, member: &M, force: bool) -> Result<()> {
        let key = self.registry.member_key::<E, M>(member)?;
        let entity = MappingKey::of_type(key.ty);
        let member = key.member.ok_or_else(|| Error::missing("member name"))?;
        self.registry.try_mutate(|m| m.identities.add(entity, member, force))
    }

    /// The registered identity member name of `E`.
    #[must_use]
    pub fn get<E: Entity>(&self) -> Option<&'static str> {
        self.registry.mappings().identities.get(&MappingKey::of_type(TypeKey::of::<E>()))
    }

    /// Removes the mapping of `E`. Returns whether one existed.
    pub fn remove<E: Entity>(&self) -> bool {
        let key = MappingKey::of_type(TypeKey::of::<E>());
        self.registry.mutate(|m| m.identities.remove(&key))
    }

    /// Removes every identity mapping.
    pub fn clear(&self) {
        self.registry.mutate(|m| m.identities.clear());
    }
}

/// Database-type mappings per member value type or per entity member.
#[derive(Debug, Clone, Copy)]
pub struct TypeMapper<'a> {
    registry: &'a Registry,
}

impl<'a> TypeMapper<'a> {
    pub(crate) const fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    /// Maps every member whose value type is `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MappingExists`] when `T` is already mapped and `force`
    /// is false.
    pub fn add_type<T: ?Sized + 'static>(&self, db_type: DbType, force: bool) -> Result<()> {
        let key = MappingKey::of_type(TypeKey::of::<T>());
        self.registry.try_mutate(|m| m.types.add(key, db_type, force))
    }

    /// The registered database type of the value type `T`.
    #[must_use]
    pub fn get_type<T: ?Sized + 'static>(&self) -> Option<DbType> {
        self.registry.mappings().types.get(&MappingKey::of_type(TypeKey::of::<T>()))
    }

    /// Removes the mapping of the value type `T`.
    pub fn remove_type<T: ?Sized + 'static>(&self) -> bool {
        let key = MappingKey::of_type(TypeKey::of::<T>());
        self.registry.mutate(|m| m.types.remove(&key))
    }

    /// Maps one member of `E`.
    ///
    /// # Errors
    ///
    /// See [`ColumnMapper::add`].
    pub fn add<E: Entity, M: IntoMember + ?Sized>(
        &self, member: &M, db_type: DbType, force: bool,
    ) -> Result<()> {
        let key = self.registry.member_key::<E, M>(member)?;
        self.registry.try_mutate(|m| m.types.add(key, db_type, force))
    }

    /// The registered database type of a member of `E`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PropertyNotFound`] for an unknown member.
    pub fn get<E: Entity, M: IntoMember + ?Sized>(&self, member: &M) -> Result<Option<DbType>> {
        let key = self.registry.member_key::<E, M>(member)?;
        Ok(self.registry.mappings().types.get(&key))
    }

    /// Removes the mapping of a member of `E`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PropertyNotFound`] for an unknown member.
    pub fn remove<E: Entity, M: IntoMember + ?Sized>(&self, member: &M) -> Result<bool> {
        let key = self.registry.member_key::<E, M>(member)?;
        Ok(self.registry.mutate(|m| m.types.remove(&key)))
    }

    /// Removes every type mapping.
    pub fn clear(&self) {
        self.registry.mutate(|m| m.types.clear());
    }
}

/// Value-handler mappings per member value type or per entity member.
#[derive(Debug, Clone, Copy)]
pub struct HandlerMapper<'a> {
    registry: &'a Registry,
}

impl<'a> HandlerMapper<'a> {
    pub(crate) const fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    /// Attaches a handler to every member whose value type is `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MappingExists`] when `T` is already mapped and `force`
    /// is false.
    pub fn add_type<T: ?Sized + 'static>(
        &self, handler: Arc<dyn ValueHandler>, force: bool,
    ) -> Result<()> {
        let key = MappingKey::of_type(TypeKey::of::<T>());
        self.registry.try_mutate(|m| m.handlers.add(key, handler, force))
    }

    /// The handler registered for the value type `T`.
    #[must_use]
    pub fn get_type<T: ?Sized + 'static>(&self) -> Option<Arc<dyn ValueHandler>> {
        self.registry.mappings().handlers.get(&MappingKey::of_type(TypeKey::of::<T>()))
    }

    /// Removes the handler of the value type `T`.
    pub fn remove_type<T: ?Sized + 'static>(&self) -> bool {
        let key = MappingKey::of_type(TypeKey::of::<T>());
        self.registry.mutate(|m| m.handlers.remove(&key))
    }

    /// Attaches a handler to one member of `E`.
    ///
    /// # Errors
    ///
    /// See [`ColumnMapper::add`].
    pub fn add<E: Entity, M: IntoMember + ?Sized>(
        &self, member: &M, handler: Arc<dyn ValueHandler>, force: bool,
    ) -> Result<()> {
        let key = self.registry.member_key::<E, M>(member)?;
        self.registry.try_mutate(|m| m.handlers.add(key, handler, force))
    }

    /// The handler registered for a member of `E`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PropertyNotFound`] for an unknown member.
    pub fn get<E: Entity, M: IntoMember + ?Sized>(
        &self, member: &M,
    ) -> Result<Option<Arc<dyn ValueHandler>>> {
        let key = self.registry.member_key::<E, M>(member)?;
        Ok(self.registry.mappings().handlers.get(&key))
    }

    /// Removes the handler of a member of `E`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PropertyNotFound`] for an unknown member.
    pub fn remove<E: Entity, M: IntoMember + ?Sized>(&self, member: &M) -> Result<bool> {
        let key = self.registry.member_key::<E, M>(member)?;
        Ok(self.registry.mutate(|m| m.handlers.remove(&key)))
    }

    /// Removes every handler mapping.
    pub fn clear(&self) {
        self.registry.mutate(|m| m.handlers.clear());
    }
}

/// Parameter-attribute mappings per member value type or per entity member.
#[derive(Debug, Clone, Copy)]
pub struct AttributeMapper<'a> {
    registry: &'a Registry,
}

impl<'a> AttributeMapper<'a> {
    pub(crate) const fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    /// Attaches attributes to every member whose value type is `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingArgument`] for an empty attribute list and
    /// [`Error::MappingExists`] when `T` is already mapped and `force` is
    /// false.
    pub fn add_type<T: ?Sized + 'static>(
        &self, attributes: Vec<ParameterAttribute>, force: bool,
    ) -> Result<()> {
        if attributes.is_empty() {
            return Err(Error::missing("parameter attributes"));
        }
        let key = MappingKey::of_type(TypeKey::of::<T>());
        self.registry.try_mutate(|m| m.attributes.add(key, attributes, force))
    }

    /// Attributes registered for the value type `T`.
    #[must_use]
    pub fn get_type<T: ?Sized + 'static>(&self) -> Option<Vec<ParameterAttribute>> {
        self.registry.mappings().attributes.get(&MappingKey::of_type(TypeKey::of::<T>()))
    }

    /// Removes the attributes of the value type `T`.
    pub fn remove_type<T: ?Sized + 'static>(&self) -> bool {
        let key = MappingKey::of_type(TypeKey::of::<T>());
        self.registry.mutate(|m| m.attributes.remove(&key))
    }

    /// Attaches attributes to one member of `E`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingArgument`] for an empty attribute list, and
    /// otherwise see [`ColumnMapper::add`].
    pub fn add<E: Entity, M: IntoMember + ?Sized>(
        &self, member: &M, attributes: Vec<ParameterAttribute>, force: bool,
    ) -> Result<()> {
        if attributes.is_empty() {
            return Err(Error::missing("parameter attributes"));
        }
        let key = self.registry.member_key::<E, M>(member)?;
        self.registry.try_mutate(|m| m.attributes.add(key, attributes, force))
    }

    /// Attributes registered for a member of `E`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PropertyNotFound`] for an unknown member.
    pub fn get<E: Entity, M: IntoMember + ?Sized>(
        &self, member: &M,
    ) -> Result<Option<Vec<ParameterAttribute>>> {
        let key = self.registry.member_key::<E, M>(member)?;
        Ok(self.registry.mappings().attributes.get(&key))
    }

    /// Removes the attributes of a member of `E`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PropertyNotFound`] for an unknown member.
    pub fn remove<E: Entity, M: IntoMember + ?Sized>(&self, member: &M) -> Result<bool> {
        let key = self.registry.member_key::<E, M>(member)?;
        Ok(self.registry.mutate(|m| m.attributes.remove(&key)))
    }

    /// Removes every attribute mapping.
    pub fn clear(&self) {
        self.registry.mutate(|m| m.attributes.clear());
    }
}
