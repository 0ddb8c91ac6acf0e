use std::sync::Arc;

use anyhow::Result;
use sea_query::Value;

use crate::handler::ValueHandler;
use crate::types::{DbType, ParameterAttribute, TypeKey, ValueKind};
use crate::value::{MemberType, MemberValue};

/// Trait for mapped entity types.
///
/// Typically implemented via the `entity!` macro rather than manually.
pub trait Entity: Send + Sync + 'static {
    /// Declared mapping metadata for the type.
    fn definition() -> EntityDefinition;

    /// Reads a member value by member name.
    fn value(&self, member: &str) -> Option<MemberValue>;

    /// Assigns a member value by member name.
    ///
    /// # Errors
    ///
    /// Returns an error if the member does not exist or the value cannot be
    /// converted to the member type.
    fn set_value(&mut self, member: &str, value: Value) -> Result<()>;
}

/// Declares an entity struct with an automatic `Entity` implementation.
///
/// Mapping metadata is declared with the optional `table` and `declare`
/// arguments.
///
/// # Examples
///
/// ```ignore
/// entity! {
///     table = "[dbo].[Person]",
///     declare = |definition| definition
///         .primary("id")
///         .identity("id")
///         .column("name", "FullName"),
///     #[derive(Debug, Clone)]
///     pub struct Person {
///         pub id: i64,
///         pub name: String,
///     }
/// }
/// ```
#[macro_export]
macro_rules! entity {
    // Full form (single code-generation arm)
    (
        @impl table = $table:expr,
        declare = $declare:expr,
        $(#[$meta:meta])*
        pub struct $struct_name:ident {
            $(
                $(#[$field_meta:meta])*
                pub $field_name:ident : $field_type:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        pub struct $struct_name {
            $(
                $(#[$field_meta])*
                pub $field_name : $field_type
            ),*
        }

        impl $crate::Entity for $struct_name {
            fn definition() -> $crate::EntityDefinition {
                let definition = $crate::EntityDefinition::new::<Self>()
                    .with_table($table)
                    $(
                        .member($crate::MemberDefinition::of::<$field_type>(stringify!($field_name)))
                    )*;
                $crate::__private::declare(definition, $declare)
            }

            fn value(&self, member: &str) -> Option<$crate::MemberValue> {
                match member {
                    $(
                        stringify!($field_name) => Some(
                            <$field_type as $crate::MemberType>::into_member_value(
                                self.$field_name.clone(),
                            ),
                        ),
                    )*
                    _ => None,
                }
            }

            fn set_value(
                &mut self, member: &str, value: $crate::__private::Value,
            ) -> $crate::__private::anyhow::Result<()> {
                match member {
                    $(
                        stringify!($field_name) => {
                            self.$field_name = <$field_type as $crate::FromValue>::from_value(value)?;
                            Ok(())
                        }
                    )*
                    _ => Err($crate::__private::anyhow::anyhow!(
                        "member '{member}' is not found on '{}'",
                        stringify!($struct_name)
                    )),
                }
            }
        }
    };

    // Table and declarations
    (
        table = $table:literal,
        declare = $declare:expr,
        $($rest:tt)*
    ) => {
        $crate::entity! {
            @impl table = Some($table),
            declare = $declare,
            $($rest)*
        }
    };

    // Table only
    (
        table = $table:literal,
        $($rest:tt)*
    ) => {
        $crate::entity! {
            @impl table = Some($table),
            declare = |definition| definition,
            $($rest)*
        }
    };

    // Declarations only, table defaults to the type name
    (
        declare = $declare:expr,
        $($rest:tt)*
    ) => {
        $crate::entity! {
            @impl table = None::<&str>,
            declare = $declare,
            $($rest)*
        }
    };

    // Bare struct
    (
        $($rest:tt)*
    ) => {
        $crate::entity! {
            @impl table = None::<&str>,
            declare = |definition| definition,
            $($rest)*
        }
    };
}

/// Declares a fieldless enum usable as an entity member.
///
/// The enum is written by name to text columns and by discriminant to integer
/// columns, and can be read back from either.
#[macro_export]
macro_rules! entity_enum {
    (
        $(#[$meta:meta])*
        pub enum $enum_name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $(= $discriminant:expr)?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        pub enum $enum_name {
            $(
                $(#[$variant_meta])*
                $variant $(= $discriminant)?
            ),*
        }

        impl $crate::MemberType for $enum_name {
            fn kind() -> $crate::ValueKind {
                $crate::ValueKind::Enum(stringify!($enum_name))
            }

            fn into_member_value(self) -> $crate::MemberValue {
                let name = match self {
                    $(Self::$variant => stringify!($variant),)*
                };
                $crate::MemberValue::Enum(Some($crate::EnumValue {
                    name,
                    ordinal: self as i64,
                }))
            }

            fn null_value() -> $crate::MemberValue {
                $crate::MemberValue::Enum(None)
            }
        }

        impl $crate::FromValue for $enum_name {
            fn from_value(
                value: $crate::__private::Value,
            ) -> $crate::__private::anyhow::Result<Self> {
                if let $crate::__private::Value::String(Some(raw)) = &value {
                    $(
                        if raw.eq_ignore_ascii_case(stringify!($variant)) {
                            return Ok(Self::$variant);
                        }
                    )*
                    return Err($crate::__private::anyhow::anyhow!(
                        "'{raw}' is not a variant of {}",
                        stringify!($enum_name)
                    ));
                }
                let Some(ordinal) = $crate::__private::as_i64(&value) else {
                    return Err($crate::__private::anyhow::anyhow!(
                        "expected name or ordinal for {}",
                        stringify!($enum_name)
                    ));
                };
                $(
                    if ordinal == Self::$variant as i64 {
                        return Ok(Self::$variant);
                    }
                )*
                Err($crate::__private::anyhow::anyhow!(
                    "{ordinal} is not a variant of {}",
                    stringify!($enum_name)
                ))
            }
        }
    };
}

/// Applies entity declarations to a definition.
#[doc(hidden)]
pub fn declare(
    definition: EntityDefinition, declare: impl FnOnce(EntityDefinition) -> EntityDefinition,
) -> EntityDefinition {
    declare(definition)
}

/// Declared mapping metadata for an entity type: the attribute-equivalent
/// configuration evaluated once when the type is first resolved.
#[derive(Debug, Clone)]
pub struct EntityDefinition {
    pub(crate) entity: TypeKey,
    pub(crate) table: Option<String>,
    pub(crate) members: Vec<MemberDefinition>,
    pub(crate) unknown: Vec<String>,
}

impl EntityDefinition {
    /// An empty definition for the entity type `E`.
    #[must_use]
    pub fn new<E: ?Sized + 'static>() -> Self {
        Self {
            entity: TypeKey::of::<E>(),
            table: None,
            members: Vec::new(),
            unknown: Vec::new(),
        }
    }

    /// The entity type.
    #[must_use]
    pub const fn entity(&self) -> TypeKey {
        self.entity
    }

    /// Declared members in declaration order.
    #[must_use]
    pub fn members(&self) -> &[MemberDefinition] {
        &self.members
    }

    /// Adds a member.
    #[must_use]
    pub fn member(mut self, member: MemberDefinition) -> Self {
        self.members.push(member);
        self
    }

    /// Declares the mapped table name.
    #[must_use]
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Declares the mapped table name when one is given.
    #[must_use]
    pub fn with_table(self, table: Option<&str>) -> Self {
        match table {
            Some(table) => self.table(table),
            None => self,
        }
    }

    /// Declares an explicit column name for a member.
    #[must_use]
    pub fn column(self, member: &str, column: impl Into<String>) -> Self {
        let column = column.into();
        self.update(member, |m| m.column = Some(column))
    }

    /// Declares a generic mapped name for a member. An explicit column name
    /// takes precedence.
    #[must_use]
    pub fn map(self, member: &str, name: impl Into<String>) -> Self {
        let name = name.into();
        self.update(member, |m| m.map = Some(name))
    }

    /// Declares the primary member.
    #[must_use]
    pub fn primary(self, member: &str) -> Self {
        self.update(member, |m| m.primary = true)
    }

    /// Declares the identity member.
    #[must_use]
    pub fn identity(self, member: &str) -> Self {
        self.update(member, |m| m.identity = true)
    }

    /// Declares the database type of a member.
    #[must_use]
    pub fn db_type(self, member: &str, db_type: DbType) -> Self {
        self.update(member, |m| m.db_type = Some(db_type))
    }

    /// Declares a value handler for a member.
    #[must_use]
    pub fn handler(self, member: &str, handler: Arc<dyn ValueHandler>) -> Self {
        self.update(member, |m| m.handler = Some(handler))
    }

    /// Appends a parameter attribute to a member.
    #[must_use]
    pub fn attribute(self, member: &str, attribute: ParameterAttribute) -> Self {
        self.update(member, |m| m.attributes.push(attribute))
    }

    fn update(mut self, member: &str, apply: impl FnOnce(&mut MemberDefinition)) -> Self {
        match self.members.iter_mut().find(|m| m.name == member) {
            Some(definition) => apply(definition),
            None => self.unknown.push(member.to_string()),
        }
        self
    }
}

/// Declared metadata for one member.
#[derive(Debug, Clone)]
pub struct MemberDefinition {
    pub(crate) name: &'static str,
    pub(crate) kind: ValueKind,
    pub(crate) value_type: TypeKey,
    pub(crate) nullable: bool,
    pub(crate) column: Option<String>,
    pub(crate) map: Option<String>,
    pub(crate) primary: bool,
    pub(crate) identity: bool,
    pub(crate) db_type: Option<DbType>,
    pub(crate) handler: Option<Arc<dyn ValueHandler>>,
    pub(crate) attributes: Vec<ParameterAttribute>,
}

impl MemberDefinition {
    /// A member of type `T`.
    #[must_use]
    pub fn of<T: MemberType>(name: &'static str) -> Self {
        Self {
            name,
            kind: T::kind(),
            value_type: T::type_key(),
            nullable: T::nullable(),
            column: None,
            map: None,
            primary: false,
            identity: false,
            db_type: None,
            handler: None,
            attributes: Vec::new(),
        }
    }

    /// The member name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The member kind.
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        self.kind
    }

    /// The declared column name: explicit column first, then the generic
    /// mapped name.
    #[must_use]
    pub fn declared_name(&self) -> Option<&str> {
        self.column.as_deref().or(self.map.as_deref())
    }
}
