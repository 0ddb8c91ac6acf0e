//! Predicate trees rendered into parameterized WHERE clauses.

use std::collections::{HashMap, HashSet};

use sea_query::Value;
use serde::{Deserialize, Serialize};

use crate::field::Field;
use crate::setting::{DbSetting, parameter_name};
use crate::value::is_null;

/// Comparison operator of a [`QueryField`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum Operation {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Like,
    NotLike,
    Between,
    NotBetween,
    In,
    NotIn,
}

impl Operation {
    /// The SQL operator text.
    #[must_use]
    pub const fn text(self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::NotEqual => "<>",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
            Self::Like => "LIKE",
            Self::NotLike => "NOT LIKE",
            Self::Between => "BETWEEN",
            Self::NotBetween => "NOT BETWEEN",
            Self::In => "IN",
            Self::NotIn => "NOT IN",
        }
    }
}

/// How predicates of a group are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Conjunction {
    /// All predicates hold.
    #[default]
    And,
    /// Any predicate holds.
    Or,
}

impl Conjunction {
    const fn text(self) -> &'static str {
        match self {
            Self::And => " AND ",
            Self::Or => " OR ",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Single(Value),
    Range(Value, Value),
    List(Vec<Value>),
}

/// Shape of a predicate operand. Two predicates with the same field,
/// operation and shape render the same SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// A NULL comparison.
    Null,
    /// One bound value.
    Single,
    /// A lower and upper bound.
    Range,
    /// A value list of the given length.
    List(usize),
}

/// A single predicate: `field <operation> value`.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryField {
    field: Field,
    operation: Operation,
    operand: Operand,
}

impl QueryField {
    fn single(field: impl Into<Field>, operation: Operation, value: Value) -> Self {
        Self {
            field: field.into(),
            operation,
            operand: Operand::Single(value),
        }
    }

    /// `field = value`; a NULL value renders `IS NULL`.
    #[must_use]
    pub fn eq(field: impl Into<Field>, value: impl Into<Value>) -> Self {
        Self::single(field, Operation::Equal, value.into())
    }

    /// `field <> value`; a NULL value renders `IS NOT NULL`.
    #[must_use]
    pub fn ne(field: impl Into<Field>, value: impl Into<Value>) -> Self {
        Self::single(field, Operation::NotEqual, value.into())
    }

    /// `field < value`
    #[must_use]
    pub fn lt(field: impl Into<Field>, value: impl Into<Value>) -> Self {
        Self::single(field, Operation::LessThan, value.into())
    }

    /// `field <= value`
    #[must_use]
    pub fn lte(field: impl Into<Field>, value: impl Into<Value>) -> Self {
        Self::single(field, Operation::LessThanOrEqual, value.into())
    }

    /// `field > value`
    #[must_use]
    pub fn gt(field: impl Into<Field>, value: impl Into<Value>) -> Self {
        Self::single(field, Operation::GreaterThan, value.into())
    }

    /// `field >= value`
    #[must_use]
    pub fn gte(field: impl Into<Field>, value: impl Into<Value>) -> Self {
        Self::single(field, Operation::GreaterThanOrEqual, value.into())
    }

    /// `field LIKE pattern`
    #[must_use]
    pub fn like(field: impl Into<Field>, pattern: impl Into<String>) -> Self {
        Self::single(field, Operation::Like, Value::from(pattern.into()))
    }

    /// `field NOT LIKE pattern`
    #[must_use]
    pub fn not_like(field: impl Into<Field>, pattern: impl Into<String>) -> Self {
        Self::single(field, Operation::NotLike, Value::from(pattern.into()))
    }

    /// `field IS NULL`
    #[must_use]
    pub fn is_null(field: impl Into<Field>) -> Self {
        Self::single(field, Operation::Equal, Value::String(None))
    }

    /// `field IS NOT NULL`
    #[must_use]
    pub fn is_not_null(field: impl Into<Field>) -> Self {
        Self::single(field, Operation::NotEqual, Value::String(None))
    }

    /// `field BETWEEN low AND high`
    #[must_use]
    pub fn between(field: impl Into<Field>, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operation: Operation::Between,
            operand: Operand::Range(low.into(), high.into()),
        }
    }

    /// `field NOT BETWEEN low AND high`
    #[must_use]
    pub fn not_between(
        field: impl Into<Field>, low: impl Into<Value>, high: impl Into<Value>,
    ) -> Self {
        Self {
            field: field.into(),
            operation: Operation::NotBetween,
            operand: Operand::Range(low.into(), high.into()),
        }
    }

    /// `field IN (values)`; an empty list never matches.
    #[must_use]
    pub fn r#in(field: impl Into<Field>, values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        Self {
            field: field.into(),
            operation: Operation::In,
            operand: Operand::List(values.into_iter().map(Into::into).collect()),
        }
    }

    /// `field NOT IN (values)`; an empty list always matches.
    #[must_use]
    pub fn not_in(
        field: impl Into<Field>, values: impl IntoIterator<Item = impl Into<Value>>,
    ) -> Self {
        Self {
            field: field.into(),
            operation: Operation::NotIn,
            operand: Operand::List(values.into_iter().map(Into::into).collect()),
        }
    }

    /// The filtered field.
    #[must_use]
    pub const fn field(&self) -> &Field {
        &self.field
    }

    /// The comparison operator.
    #[must_use]
    pub const fn operation(&self) -> Operation {
        self.operation
    }

    /// The operand shape.
    #[must_use]
    pub fn shape(&self) -> Shape {
        match &self.operand {
            Operand::Single(value) if is_null(value) => Shape::Null,
            Operand::Single(_) => Shape::Single,
            Operand::Range(..) => Shape::Range,
            Operand::List(values) => Shape::List(values.len()),
        }
    }

    /// Structural signature, excluding bound values.
    #[must_use]
    pub fn signature(&self) -> FieldSignature {
        FieldSignature {
            field: self.field.name().to_string(),
            operation: self.operation,
            shape: self.shape(),
        }
    }

    fn suffixes(&self) -> Vec<String> {
        match &self.operand {
            Operand::Single(_) => vec![String::new()],
            Operand::Range(..) => vec!["_Left".to_string(), "_Right".to_string()],
            Operand::List(values) => (0..values.len()).map(|index| format!("_In_{index}")).collect(),
        }
    }

    fn render(&self, setting: &DbSetting, prefix: &str, naming: &mut Naming) -> String {
        let column = setting.quote(self.field.name());
        let parameter = |name: String| format!("{}{prefix}{name}", setting.parameter_prefix);

        match (&self.operand, self.shape()) {
            (_, Shape::Null) => match self.operation {
                Operation::NotEqual | Operation::NotLike => format!("{column} IS NOT NULL"),
                _ => format!("{column} IS NULL"),
            },
            (Operand::Range(..), _) => {
                let name = naming.next(&self.field, &self.suffixes());
                format!(
                    "{column} {} {} AND {}",
                    self.operation.text(),
                    parameter(format!("{name}_Left")),
                    parameter(format!("{name}_Right"))
                )
            }
            (Operand::List(values), _) => {
                if values.is_empty() {
                    return match self.operation {
                        Operation::NotIn => "(1 = 1)".to_string(),
                        _ => "(1 = 0)".to_string(),
                    };
                }
                let name = naming.next(&self.field, &self.suffixes());
                let parameters = (0..values.len())
                    .map(|index| parameter(format!("{name}_In_{index}")))
                    .collect::<Vec<_>>();
                format!("{column} {} ({})", self.operation.text(), parameters.join(", "))
            }
            (Operand::Single(_), _) => {
                let name = naming.next(&self.field, &self.suffixes());
                format!("{column} {} {}", self.operation.text(), parameter(name))
            }
        }
    }

    fn collect(&self, prefix: &str, naming: &mut Naming, out: &mut Vec<(String, Value)>) {
        if self.shape() == Shape::Null {
            return;
        }
        match &self.operand {
            Operand::Single(value) => {
                let name = naming.next(&self.field, &self.suffixes());
                out.push((format!("{prefix}{name}"), value.clone()));
            }
            Operand::Range(low, high) => {
                let name = naming.next(&self.field, &self.suffixes());
                out.push((format!("{prefix}{name}_Left"), low.clone()));
                out.push((format!("{prefix}{name}_Right"), high.clone()));
            }
            Operand::List(values) => {
                if values.is_empty() {
                    return;
                }
                let name = naming.next(&self.field, &self.suffixes());
                for (index, value) in values.iter().enumerate() {
                    out.push((format!("{prefix}{name}_In_{index}"), value.clone()));
                }
            }
        }
    }
}

/// A group of predicates and nested groups joined by one conjunction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryGroup {
    fields: Vec<QueryField>,
    groups: Vec<Self>,
    conjunction: Conjunction,
    is_not: bool,
}

impl QueryGroup {
    /// Predicates that must all hold.
    #[must_use]
    pub fn and(fields: impl IntoIterator<Item = QueryField>) -> Self {
        Self {
            fields: fields.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Predicates of which any must hold.
    #[must_use]
    pub fn or(fields: impl IntoIterator<Item = QueryField>) -> Self {
        Self {
            fields: fields.into_iter().collect(),
            conjunction: Conjunction::Or,
            ..Self::default()
        }
    }

    /// Adds a predicate.
    #[must_use]
    pub fn with_field(mut self, field: QueryField) -> Self {
        self.fields.push(field);
        self
    }

    /// Adds a nested group.
    #[must_use]
    pub fn with_group(mut self, group: Self) -> Self {
        self.groups.push(group);
        self
    }

    /// Negates the group.
    #[must_use]
    pub const fn negate(mut self) -> Self {
        self.is_not = !self.is_not;
        self
    }

    /// Direct predicates of the group.
    #[must_use]
    pub fn fields(&self) -> &[QueryField] {
        &self.fields
    }

    /// Nested groups.
    #[must_use]
    pub fn groups(&self) -> &[Self] {
        &self.groups
    }

    /// Whether the group and all nested groups have no predicates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.groups.iter().all(Self::is_empty)
    }

    /// Renders the group as a parenthesized condition. Parameter names are
    /// derived from field names; later occurrences of the same field get a
    /// `_1`, `_2`, ... suffix, skipping names already bound, and every name is
    /// preceded by `prefix`.
    /// Returns `None` for an empty group.
    #[must_use]
    pub fn render(&self, setting: &DbSetting, prefix: &str) -> Option<String> {
        self.render_with(setting, prefix, &mut Naming::default())
    }

    fn render_with(&self, setting: &DbSetting, prefix: &str, naming: &mut Naming) -> Option<String> {
        let mut parts = self.fields.iter().map(|f| f.render(setting, prefix, naming)).collect::<Vec<_>>();
        parts.extend(self.groups.iter().filter_map(|g| g.render_with(setting, prefix, naming)));
        if parts.is_empty() {
            return None;
        }
        let condition = format!("({})", parts.join(self.conjunction.text()));
        Some(if self.is_not { format!("NOT {condition}") } else { condition })
    }

    /// Bound values by parameter name (without the dialect prefix), in the
    /// order they appear in the rendered condition.
    #[must_use]
    pub fn parameters(&self, prefix: &str) -> Vec<(String, Value)> {
        let mut parameters = Vec::new();
        self.collect(prefix, &mut Naming::default(), &mut parameters);
        parameters
    }

    fn collect(&self, prefix: &str, naming: &mut Naming, out: &mut Vec<(String, Value)>) {
        for field in &self.fields {
            field.collect(prefix, naming, out);
        }
        for group in &self.groups {
            group.collect(prefix, naming, out);
        }
    }

    /// Structural signature, excluding bound values.
    #[must_use]
    pub fn signature(&self) -> GroupSignature {
        GroupSignature {
            fields: self.fields.iter().map(QueryField::signature).collect(),
            groups: self.groups.iter().map(Self::signature).collect(),
            conjunction: self.conjunction,
            is_not: self.is_not,
        }
    }
}

impl From<QueryField> for QueryGroup {
    fn from(field: QueryField) -> Self {
        Self::and([field])
    }
}

impl From<Vec<QueryField>> for QueryGroup {
    fn from(fields: Vec<QueryField>) -> Self {
        Self::and(fields)
    }
}

/// Signature of one predicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldSignature {
    field: String,
    operation: Operation,
    shape: Shape,
}

/// Signature of a predicate tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupSignature {
    fields: Vec<FieldSignature>,
    groups: Vec<Self>,
    conjunction: Conjunction,
    is_not: bool,
}

/// Allocates parameter names for repeated fields.
#[derive(Default)]
struct Naming {
    counts: HashMap<String, usize>,
    taken: HashSet<String>,
}

impl Naming {
    /// The base name of the next occurrence of `field`. Every name bound from
    /// it (base plus one of `suffixes`) is unused so far, ignoring case.
    fn next(&mut self, field: &Field, suffixes: &[String]) -> String {
        let base = parameter_name(field.name());
        let count = self.counts.entry(base.to_ascii_lowercase()).or_default();
        loop {
            let name = if *count == 0 { base.clone() } else { format!("{base}_{count}") };
            *count += 1;
            let bound = suffixes.iter().map(|s| format!("{name}{s}").to_ascii_lowercase()).collect::<Vec<_>>();
            if !bound.iter().any(|b| self.taken.contains(b)) {
                self.taken.extend(bound);
                return name;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQL: DbSetting = DbSetting::SQL_SERVER;

    #[test]
    fn single_predicate() {
        let group = QueryGroup::from(QueryField::eq("Id", 10));
        assert_eq!(group.render(&SQL, "").as_deref(), Some("([Id] = @Id)"));
        assert_eq!(group.render(&SQL, "_").as_deref(), Some("([Id] = @_Id)"));
    }

    #[test]
    fn nulls_and_lists() {
        let group = QueryGroup::and([
            QueryField::is_null("DeletedAt"),
            QueryField::r#in("Id", [1, 2]),
            QueryField::not_in("Code", Vec::<i32>::new()),
        ]);
        assert_eq!(
            group.render(&SQL, "").as_deref(),
            Some("([DeletedAt] IS NULL AND [Id] IN (@Id_In_0, @Id_In_1) AND (1 = 1))")
        );
        let names = group.parameters("").into_iter().map(|(n, _)| n).collect::<Vec<_>>();
        assert_eq!(names, ["Id_In_0", "Id_In_1"]);
    }

    #[test]
    fn repeated_fields_and_nested_groups() {
        let group = QueryGroup::and([QueryField::gte("Age", 18)])
            .with_group(QueryGroup::or([QueryField::lt("Age", 65), QueryField::between("Age", 1, 2)]).negate());
        assert_eq!(
            group.render(&SQL, "").as_deref(),
            Some("([Age] >= @Age AND NOT ([Age] < @Age_1 OR [Age] BETWEEN @Age_2_Left AND @Age_2_Right))")
        );
        let names = group.parameters("").into_iter().map(|(n, _)| n).collect::<Vec<_>>();
        assert_eq!(names, ["Age", "Age_1", "Age_2_Left", "Age_2_Right"]);
    }

    #[test]
    fn repeated_names_skip_literal_fields() {
        let group = QueryGroup::and([
            QueryField::eq("Age", 1),
            QueryField::eq("Age", 2),
            QueryField::eq("Age_1", 3),
            QueryField::between("Score", 1, 2),
            QueryField::eq("score_left", 4),
        ]);
        assert_eq!(
            group.render(&SQL, "").as_deref(),
            Some(
                "([Age] = @Age AND [Age] = @Age_1 AND [Age_1] = @Age_1_1 \
                 AND [Score] BETWEEN @Score_Left AND @Score_Right AND [score_left] = @score_left_1)"
            )
        );
        let names = group.parameters("").into_iter().map(|(n, _)| n).collect::<Vec<_>>();
        assert_eq!(names, ["Age", "Age_1", "Age_1_1", "Score_Left", "Score_Right", "score_left_1"]);

        let reversed = QueryGroup::and([QueryField::eq("Age_1", 3), QueryField::eq("Age", 1), QueryField::eq("Age", 2)]);
        let names = reversed.parameters("").into_iter().map(|(n, _)| n).collect::<Vec<_>>();
        assert_eq!(names, ["Age_1", "Age", "Age_2"]);
    }

    #[test]
    fn signature_ignores_values() {
        let left = QueryGroup::and([QueryField::eq("Name", "a"), QueryField::r#in("Id", [1, 2])]);
        let right = QueryGroup::and([QueryField::eq("Name", "b"), QueryField::r#in("Id", [3, 4])]);
        assert_eq!(left.signature(), right.signature());

        let null = QueryGroup::from(QueryField::eq("Name", Value::String(None)));
        assert_ne!(left.signature(), null.signature());
        assert!(QueryGroup::default().is_empty());
        assert_eq!(QueryGroup::default().render(&SQL, ""), None);
    }
}
