//! Argument checks shared by every statement builder. Each check runs before
//! any SQL text is written.

use crate::error::{Error, Result};
use crate::field::{DbField, Field, OrderField, same_name, unquote};
use crate::setting::{DbSetting, split_parts};

/// The trimmed table name. Every part of a multi-part name must be non-blank
/// once unquoted.
pub(crate) fn table(table: &str) -> Result<&str> {
    let table = table.trim();
    let parts = split_parts(table, ".");
    if parts.is_empty() || parts.iter().any(|part| unquote(part).trim().is_empty()) {
        return Err(Error::missing("table name"));
    }
    Ok(table)
}

pub(crate) fn fields(fields: &[Field]) -> Result<()> {
    if fields.is_empty() {
        return Err(Error::missing("fields"));
    }
    if fields.iter().any(|f| f.name().is_empty()) {
        return Err(Error::missing("field name"));
    }
    unique("field", fields)
}

/// Names must be distinct under case-insensitive, quote-stripped comparison.
fn unique(role: &str, fields: &[Field]) -> Result<()> {
    for (index, field) in fields.iter().enumerate() {
        if fields[..index].iter().any(|f| same_name(f.name(), field.name())) {
            return Err(Error::invalid(format!("{role} '{field}' is given more than once")));
        }
    }
    Ok(())
}

pub(crate) fn field(field: &Field) -> Result<()> {
    if field.name().is_empty() {
        return Err(Error::missing("field name"));
    }
    Ok(())
}

/// Trimmed hints; blank hints are dropped.
pub(crate) fn hints<'a>(setting: &DbSetting, hints: Option<&'a str>) -> Result<Option<&'a str>> {
    let hints = hints.map(str::trim).filter(|h| !h.is_empty());
    if hints.is_some() && !setting.supports_table_hints {
        return Err(Error::Unsupported {
            dialect: setting.name,
            feature: "table hints".to_string(),
        });
    }
    Ok(hints)
}

pub(crate) fn ordering(fields: &[Field], order_by: &[OrderField]) -> Result<()> {
    let missing = order_by
        .iter()
        .filter(|o| !fields.iter().any(|f| same_name(f.name(), o.field.name())))
        .map(|o| o.field.name())
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        return Err(Error::MissingFields(missing.join(", ")));
    }
    Ok(())
}

pub(crate) fn positive(argument: &str, value: u64) -> Result<u64> {
    if value == 0 {
        return Err(Error::missing(argument));
    }
    Ok(value)
}

pub(crate) fn primary(field: Option<&DbField>) -> Result<()> {
    match field {
        Some(field) if !field.is_primary => Err(Error::invalid(format!(
            "field '{}' is passed as the primary field but is not a primary key",
            field.name
        ))),
        _ => Ok(()),
    }
}

pub(crate) fn identity(field: Option<&DbField>) -> Result<()> {
    match field {
        Some(field) if !field.is_identity => Err(Error::invalid(format!(
            "field '{}' is passed as the identity field but is not an identity",
            field.name
        ))),
        _ => Ok(()),
    }
}

/// An identity field must also be the primary field.
pub(crate) fn identity_is_primary(primary: Option<&DbField>, identity: Option<&DbField>) -> Result<()> {
    let Some(identity) = identity else {
        return Ok(());
    };
    match primary {
        Some(primary) if same_name(&primary.name, &identity.name) => Ok(()),
        _ => Err(Error::invalid(format!(
            "identity field '{}' is not the primary field",
            identity.name
        ))),
    }
}

/// Explicit qualifiers, else the primary field. Every qualifier must be one
/// of `fields`.
pub(crate) fn qualifiers(
    fields: &[Field], qualifiers: &[Field], primary: Option<&DbField>,
) -> Result<Vec<Field>> {
    let qualifiers = if qualifiers.is_empty() {
        primary.map(|p| vec![p.as_field()]).unwrap_or_default()
    } else {
        qualifiers.to_vec()
    };
    if qualifiers.is_empty() {
        return Err(Error::missing("qualifiers"));
    }
    if let Some(unknown) =
        qualifiers.iter().find(|q| !fields.iter().any(|f| same_name(f.name(), q.name())))
    {
        return Err(Error::invalid(format!("qualifier field '{unknown}' is not among the fields")));
    }
    unique("qualifier", &qualifiers)?;
    Ok(qualifiers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_table() {
        assert_eq!(table("  "), Err(Error::missing("table name")));
        assert_eq!(table(" [T] "), Ok("[T]"));
        assert_eq!(table("."), Err(Error::missing("table name")));
        assert_eq!(table("[]"), Err(Error::missing("table name")));
        assert_eq!(table("dbo.[ ]"), Err(Error::missing("table name")));
        assert_eq!(table("[my.schema].T"), Ok("[my.schema].T"));
    }

    #[test]
    fn duplicate_fields() {
        assert!(fields(&Field::from_names(["Id", "Name"])).is_ok());
        assert!(matches!(fields(&Field::from_names(["Name", "[name]"])), Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn hints_gating() {
        assert_eq!(hints(&DbSetting::POSTGRES, Some("  ")), Ok(None));
        assert!(matches!(
            hints(&DbSetting::POSTGRES, Some("WITH (NOLOCK)")),
            Err(Error::Unsupported { dialect: "PostgreSql", .. })
        ));
        assert_eq!(hints(&DbSetting::SQL_SERVER, Some(" WITH (NOLOCK) ")), Ok(Some("WITH (NOLOCK)")));
    }

    #[test]
    fn qualifier_defaults() {
        let fields = Field::from_names(["Id", "Name"]);
        let id = DbField::new("Id").primary();
        assert_eq!(qualifiers(&fields, &[], Some(&id)).unwrap(), vec![Field::new("Id")]);
        assert_eq!(qualifiers(&fields, &[], None), Err(Error::missing("qualifiers")));
        assert!(matches!(
            qualifiers(&fields, &[Field::new("Code")], Some(&id)),
            Err(Error::InvalidConfiguration(_))
        ));
        assert!(matches!(
            qualifiers(&fields, &Field::from_names(["Id", "[id]"]), Some(&id)),
            Err(Error::InvalidConfiguration(_))
        ));
    }
}
