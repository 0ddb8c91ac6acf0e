//! Reads declared mapping metadata off an entity type.

use std::collections::HashSet;
use std::sync::Arc;

use crate::entity::{Entity, EntityDefinition, MemberDefinition};
use crate::error::{Error, Result};
use crate::field::same_name;
use crate::types::TypeKey;

/// Validated declared metadata of one entity type.
#[derive(Debug, Clone)]
pub struct DeclaredEntity {
    entity: TypeKey,
    table: Option<String>,
    members: Vec<MemberDefinition>,
}

impl DeclaredEntity {
    /// The entity type.
    #[must_use]
    pub const fn entity(&self) -> TypeKey {
        self.entity
    }

    /// The declared table name.
    #[must_use]
    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    /// Declared members in declaration order.
    #[must_use]
    pub fn members(&self) -> &[MemberDefinition] {
        &self.members
    }

    /// Looks up a member by member name, then by declared column name.
    /// Names are compared case-insensitively with quotes stripped.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&MemberDefinition> {
        self.members.iter().find(|m| same_name(m.name, name)).or_else(|| {
            self.members.iter().find(|m| m.declared_name().is_some_and(|d| same_name(d, name)))
        })
    }

    /// The declared primary member.
    #[must_use]
    pub fn primary(&self) -> Option<&MemberDefinition> {
        self.members.iter().find(|m| m.primary)
    }

    /// The declared identity member.
    #[must_use]
    pub fn identity(&self) -> Option<&MemberDefinition> {
        self.members.iter().find(|m| m.identity)
    }
}

/// Stateless reader of declared entity metadata. Results are not cached
/// here; see [`MetadataCache`](crate::MetadataCache).
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributeResolver;

impl AttributeResolver {
    /// Resolves the declared metadata of `E`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PropertyNotFound`] when a declaration names a member
    /// the type does not have, and [`Error::InvalidConfiguration`] when members
    /// are duplicated or more than one primary or identity member is declared.
    pub fn resolve<E: Entity>() -> Result<Arc<DeclaredEntity>> {
        Self::resolve_definition(E::definition())
    }

    /// Validates an explicit definition.
    ///
    /// # Errors
    ///
    /// See [`AttributeResolver::resolve`].
    pub fn resolve_definition(definition: EntityDefinition) -> Result<Arc<DeclaredEntity>> {
        let EntityDefinition {
            entity,
            table,
            members,
            unknown,
        } = definition;

        if let Some(member) = unknown.into_iter().next() {
            return Err(Error::not_found(entity.simple_name(), member));
        }

        let mut seen = HashSet::new();
        for member in &members {
            if !seen.insert(member.name.to_ascii_lowercase()) {
                return Err(Error::invalid(format!(
                    "member '{}' is declared more than once on '{entity}'",
                    member.name
                )));
            }
        }
        if members.iter().filter(|m| m.primary).count() > 1 {
            return Err(Error::invalid(format!("more than one primary member on '{entity}'")));
        }
        if members.iter().filter(|m| m.identity).count() > 1 {
            return Err(Error::invalid(format!("more than one identity member on '{entity}'")));
        }

        let table = table.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
        Ok(Arc::new(DeclaredEntity {
            entity,
            table,
            members,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::MemberDefinition;

    struct Customer;

    fn customer() -> EntityDefinition {
        EntityDefinition::new::<Customer>()
            .member(MemberDefinition::of::<i64>("id"))
            .member(MemberDefinition::of::<String>("name"))
    }

    #[test]
    fn resolves_declarations() {
        let declared = AttributeResolver::resolve_definition(
            customer().table("[sales].[Customer]").primary("id").column("name", "FullName"),
        )
        .unwrap();

        assert_eq!(declared.table(), Some("[sales].[Customer]"));
        assert_eq!(declared.primary().map(MemberDefinition::name), Some("id"));
        assert!(declared.identity().is_none());
        assert_eq!(declared.find("FULLNAME").map(MemberDefinition::name), Some("name"));
        assert_eq!(declared.find("[Name]").map(MemberDefinition::name), Some("name"));
    }

    #[test]
    fn unknown_member() {
        let err = AttributeResolver::resolve_definition(customer().primary("code")).unwrap_err();
        assert_eq!(err, Error::not_found("Customer", "code"));
    }

    #[test]
    fn duplicate_member() {
        let definition = customer().member(MemberDefinition::of::<i32>("Name"));
        let err = AttributeResolver::resolve_definition(definition).unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration(_)));
    }
}
