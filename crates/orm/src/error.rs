//! Errors

use thiserror::Error;

/// Result type used across the crate.
pub type Result<T> = anyhow::Result<T, Error>;

/// Configuration and programming errors raised by the mapping registries,
/// the metadata cache and the statement builders.
///
/// Every variant is raised before any SQL text is produced or any cache entry
/// is written.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A non-forced `add` targeted a key that already holds a mapping.
    #[error("a {registry} mapping already exists for {key}")]
    MappingExists {
        /// Registry kind: `table`, `column`, `primary` and so on.
        registry: &'static str,
        /// The occupied key.
        key: String,
    },

    /// A member name or field does not exist on the entity type.
    #[error("property '{member}' is not found on '{entity}'")]
    PropertyNotFound {
        /// Entity type name.
        entity: String,
        /// The member or column name looked up.
        member: String,
    },

    /// A required argument is null, blank or empty.
    #[error("missing required argument: {0}")]
    MissingArgument(String),

    /// Ordering or qualifier fields are not covered by the projected fields.
    #[error("fields not present in the projection: {0}")]
    MissingFields(String),

    /// The supplied mapping configuration is contradictory or unusable.
    #[error("invalid mapping configuration: {0}")]
    InvalidConfiguration(String),

    /// The dialect does not support the requested feature.
    #[error("{feature} is not supported by the {dialect} dialect")]
    Unsupported {
        /// Dialect name.
        dialect: &'static str,
        /// The rejected feature.
        feature: String,
    },
}

impl Error {
    pub(crate) fn missing(argument: impl Into<String>) -> Self {
        Self::MissingArgument(argument.into())
    }

    pub(crate) fn invalid(description: impl Into<String>) -> Self {
        Self::InvalidConfiguration(description.into())
    }

    pub(crate) fn not_found(entity: impl Into<String>, member: impl Into<String>) -> Self {
        Self::PropertyNotFound {
            entity: entity.into(),
            member: member.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn error_display() {
        let err = Error::MappingExists {
            registry: "table",
            key: "Person".to_string(),
        };
        assert_eq!(err.to_string(), "a table mapping already exists for Person");

        let err = Error::not_found("Person", "Age");
        assert_eq!(err.to_string(), "property 'Age' is not found on 'Person'");

        let err = Error::Unsupported {
            dialect: "PostgreSql",
            feature: "table hints".to_string(),
        };
        assert_eq!(err.to_string(), "table hints is not supported by the PostgreSql dialect");
    }

    #[test]
    fn into_anyhow() {
        let result: anyhow::Result<()> = Err(Error::missing("table name").into());
        let err = result.unwrap_err();
        assert_eq!(err.downcast_ref::<Error>(), Some(&Error::missing("table name")));
    }
}
