//! Statement requests and their structural cache keys.

use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::field::{DbField, Field, OrderField};
use crate::filter::{GroupSignature, QueryGroup};
use crate::query::QueryBuilder;
use crate::statement::{Aggregate, StatementBuilder};

/// The statement a [`Request`] asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum RequestKind {
    Query,
    QueryAll,
    BatchQuery,
    SkipQuery,
    Count,
    CountAll,
    Exists,
    Insert,
    InsertAll,
    Update,
    UpdateAll,
    Delete,
    DeleteAll,
    Merge,
    MergeAll,
    Max,
    MaxAll,
    Min,
    MinAll,
    Sum,
    SumAll,
    Average,
    AverageAll,
    Truncate,
}

impl RequestKind {
    /// The aggregate function of an aggregate kind.
    #[must_use]
    pub const fn aggregate(self) -> Option<Aggregate> {
        match self {
            Self::Max | Self::MaxAll => Some(Aggregate::Max),
            Self::Min | Self::MinAll => Some(Aggregate::Min),
            Self::Sum | Self::SumAll => Some(Aggregate::Sum),
            Self::Average | Self::AverageAll => Some(Aggregate::Average),
            _ => None,
        }
    }

    /// Whether the kind applies to every row, ignoring any predicate.
    #[must_use]
    pub const fn is_all(self) -> bool {
        matches!(
            self,
            Self::QueryAll
                | Self::CountAll
                | Self::DeleteAll
                | Self::MaxAll
                | Self::MinAll
                | Self::SumAll
                | Self::AverageAll
                | Self::Truncate
        )
    }
}

/// Everything needed to synthesize one statement.
///
/// Two requests are equal when their [`RequestKey`]s are equal. The key is
/// computed on first use and kept for the life of the request.
#[derive(Debug, Clone)]
pub struct Request {
    kind: RequestKind,
    table: String,
    fields: Vec<Field>,
    field: Option<Field>,
    r#where: Option<QueryGroup>,
    order_by: Vec<OrderField>,
    qualifiers: Vec<Field>,
    primary: Option<DbField>,
    identity: Option<DbField>,
    hints: Option<String>,
    top: Option<u64>,
    skip: u64,
    take: u64,
    batch_size: usize,
    key: OnceLock<RequestKey>,
}

impl Request {
    /// A request of `kind` against `table`.
    #[must_use]
    pub fn new(kind: RequestKind, table: impl AsRef<str>) -> Self {
        Self {
            kind,
            table: table.as_ref().trim().to_string(),
            fields: Vec::new(),
            field: None,
            r#where: None,
            order_by: Vec::new(),
            qualifiers: Vec::new(),
            primary: None,
            identity: None,
            hints: None,
            top: None,
            skip: 0,
            take: 0,
            batch_size: 1,
            key: OnceLock::new(),
        }
    }

    /// Selects `fields` from rows matching an optional predicate.
    #[must_use]
    pub fn query(table: impl AsRef<str>, fields: Vec<Field>) -> Self {
        Self::new(RequestKind::Query, table).with_fields(fields)
    }

    /// Selects `fields` from every row.
    #[must_use]
    pub fn query_all(table: impl AsRef<str>, fields: Vec<Field>) -> Self {
        Self::new(RequestKind::QueryAll, table).with_fields(fields)
    }

    /// Selects one page of rows. `page` is 0-based.
    #[must_use]
    pub fn batch_query(table: impl AsRef<str>, fields: Vec<Field>, page: u64, rows_per_batch: u64) -> Self {
        let mut request = Self::new(RequestKind::BatchQuery, table).with_fields(fields);
        request.skip = page;
        request.take = rows_per_batch;
        request
    }

    /// Skips `skip` rows and selects the next `take`.
    #[must_use]
    pub fn skip_query(table: impl AsRef<str>, fields: Vec<Field>, skip: u64, take: u64) -> Self {
        let mut request = Self::new(RequestKind::SkipQuery, table).with_fields(fields);
        request.skip = skip;
        request.take = take;
        request
    }

    /// Counts rows matching an optional predicate.
    #[must_use]
    pub fn count(table: impl AsRef<str>) -> Self {
        Self::new(RequestKind::Count, table)
    }

    /// Counts every row.
    #[must_use]
    pub fn count_all(table: impl AsRef<str>) -> Self {
        Self::new(RequestKind::CountAll, table)
    }

    /// Checks whether a matching row exists.
    #[must_use]
    pub fn exists(table: impl AsRef<str>) -> Self {
        Self::new(RequestKind::Exists, table)
    }

    /// Inserts one row.
    #[must_use]
    pub fn insert(table: impl AsRef<str>, fields: Vec<Field>) -> Self {
        Self::new(RequestKind::Insert, table).with_fields(fields)
    }

    /// Inserts `batch_size` rows in one statement batch.
    #[must_use]
    pub fn insert_all(table: impl AsRef<str>, fields: Vec<Field>, batch_size: usize) -> Self {
        Self::new(RequestKind::InsertAll, table).with_fields(fields).with_batch_size(batch_size)
    }

    /// Updates rows matching an optional predicate.
    #[must_use]
    pub fn update(table: impl AsRef<str>, fields: Vec<Field>) -> Self {
        Self::new(RequestKind::Update, table).with_fields(fields)
    }

    /// Updates `batch_size` rows matched by their qualifiers.
    #[must_use]
    pub fn update_all(table: impl AsRef<str>, fields: Vec<Field>, batch_size: usize) -> Self {
        Self::new(RequestKind::UpdateAll, table).with_fields(fields).with_batch_size(batch_size)
    }

    /// Deletes rows matching an optional predicate.
    #[must_use]
    pub fn delete(table: impl AsRef<str>) -> Self {
        Self::new(RequestKind::Delete, table)
    }

    /// Deletes every row.
    #[must_use]
    pub fn delete_all(table: impl AsRef<str>) -> Self {
        Self::new(RequestKind::DeleteAll, table)
    }

    /// Inserts or updates one row.
    #[must_use]
    pub fn merge(table: impl AsRef<str>, fields: Vec<Field>) -> Self {
        Self::new(RequestKind::Merge, table).with_fields(fields)
    }

    /// Inserts or updates `batch_size` rows.
    #[must_use]
    pub fn merge_all(table: impl AsRef<str>, fields: Vec<Field>, batch_size: usize) -> Self {
        Self::new(RequestKind::MergeAll, table).with_fields(fields).with_batch_size(batch_size)
    }

    /// Aggregates `field` over matching rows, or over every row when `all`
    /// is set.
    #[must_use]
    pub fn aggregate(aggregate: Aggregate, all: bool, table: impl AsRef<str>, field: impl Into<Field>) -> Self {
        let kind = match (aggregate, all) {
            (Aggregate::Max, false) => RequestKind::Max,
            (Aggregate::Max, true) => RequestKind::MaxAll,
            (Aggregate::Min, false) => RequestKind::Min,
            (Aggregate::Min, true) => RequestKind::MinAll,
            (Aggregate::Sum, false) => RequestKind::Sum,
            (Aggregate::Sum, true) => RequestKind::SumAll,
            (Aggregate::Average, false) => RequestKind::Average,
            (Aggregate::Average, true) => RequestKind::AverageAll,
        };
        Self::new(kind, table).with_field(field)
    }

    /// Removes every row.
    #[must_use]
    pub fn truncate(table: impl AsRef<str>) -> Self {
        Self::new(RequestKind::Truncate, table)
    }

    /// Sets the projected or written fields.
    #[must_use]
    pub fn with_fields(mut self, fields: Vec<Field>) -> Self {
        self.fields = fields;
        self.reset()
    }

    /// Sets the aggregate target field.
    #[must_use]
    pub fn with_field(mut self, field: impl Into<Field>) -> Self {
        self.field = Some(field.into());
        self.reset()
    }

    /// Sets the predicate.
    #[must_use]
    pub fn with_where(mut self, r#where: impl Into<QueryGroup>) -> Self {
        self.r#where = Some(r#where.into());
        self.reset()
    }

    /// Sets the ordering.
    #[must_use]
    pub fn with_order_by(mut self, order_by: Vec<OrderField>) -> Self {
        self.order_by = order_by;
        self.reset()
    }

    /// Sets the table hints. Blank hints are dropped.
    #[must_use]
    pub fn with_hints(mut self, hints: impl AsRef<str>) -> Self {
        let hints = hints.as_ref().trim();
        self.hints = (!hints.is_empty()).then(|| hints.to_string());
        self.reset()
    }

    /// Limits a query to the first `top` rows. Zero means no limit.
    #[must_use]
    pub fn with_top(mut self, top: u64) -> Self {
        self.top = (top > 0).then_some(top);
        self.reset()
    }

    /// Sets the qualifier fields used to match rows of updates and merges.
    #[must_use]
    pub fn with_qualifiers(mut self, qualifiers: Vec<Field>) -> Self {
        self.qualifiers = qualifiers;
        self.reset()
    }

    /// Sets the primary field.
    #[must_use]
    pub fn with_primary(mut self, primary: Option<DbField>) -> Self {
        self.primary = primary;
        self.reset()
    }

    /// Sets the identity field.
    #[must_use]
    pub fn with_identity(mut self, identity: Option<DbField>) -> Self {
        self.identity = identity;
        self.reset()
    }

    /// Sets the number of rows of a batched statement.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self.reset()
    }

    fn reset(mut self) -> Self {
        self.key = OnceLock::new();
        self
    }

    /// The requested statement kind.
    #[must_use]
    pub const fn kind(&self) -> RequestKind {
        self.kind
    }

    /// The target table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Projected or written fields.
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// The predicate.
    #[must_use]
    pub const fn r#where(&self) -> Option<&QueryGroup> {
        self.r#where.as_ref()
    }

    /// Normalized hints.
    #[must_use]
    pub fn hints(&self) -> Option<&str> {
        self.hints.as_deref()
    }

    /// The structural cache key.
    pub fn key(&self) -> &RequestKey {
        self.key.get_or_init(|| RequestKey {
            kind: self.kind,
            table: self.table.clone(),
            fields: self.fields.clone(),
            field: self.field.clone(),
            r#where: self.r#where.as_ref().map(QueryGroup::signature),
            order_by: self.order_by.clone(),
            qualifiers: self.qualifiers.clone(),
            primary: self.primary.clone(),
            identity: self.identity.clone(),
            hints: self.hints.clone(),
            top: self.top,
            skip: self.skip,
            take: self.take,
            batch_size: self.batch_size,
        })
    }

    /// Synthesizes the statement with `statements`, appending it to
    /// `builder`.
    ///
    /// # Errors
    ///
    /// Returns the statement builder's validation errors.
    pub fn build(&self, statements: &dyn StatementBuilder, builder: &mut QueryBuilder) -> Result<String> {
        let table = self.table.as_str();
        let fields = self.fields.as_slice();
        let r#where = self.r#where.as_ref();
        let hints = self.hints.as_deref();
        let primary = self.primary.as_ref();
        let identity = self.identity.as_ref();

        match self.kind {
            RequestKind::Query => {
                statements.create_query(builder, table, fields, r#where, &self.order_by, self.top, hints)
            }
            RequestKind::QueryAll => {
                statements.create_query_all(builder, table, fields, &self.order_by, hints)
            }
            RequestKind::BatchQuery => statements.create_batch_query(
                builder,
                table,
                fields,
                r#where,
                &self.order_by,
                self.skip,
                self.take,
                hints,
            ),
            RequestKind::SkipQuery => statements.create_skip_query(
                builder,
                table,
                fields,
                r#where,
                &self.order_by,
                self.skip,
                self.take,
                hints,
            ),
            RequestKind::Count => statements.create_count(builder, table, r#where, hints),
            RequestKind::CountAll => statements.create_count_all(builder, table, hints),
            RequestKind::Exists => statements.create_exists(builder, table, r#where, hints),
            RequestKind::Insert => {
                statements.create_insert(builder, table, fields, primary, identity, hints)
            }
            RequestKind::InsertAll => statements.create_insert_all(
                builder,
                table,
                fields,
                self.batch_size,
                primary,
                identity,
                hints,
            ),
            RequestKind::Update => {
                statements.create_update(builder, table, fields, r#where, primary, identity, hints)
            }
            RequestKind::UpdateAll => statements.create_update_all(
                builder,
                table,
                fields,
                &self.qualifiers,
                self.batch_size,
                primary,
                identity,
                hints,
            ),
            RequestKind::Delete => statements.create_delete(builder, table, r#where, hints),
            RequestKind::DeleteAll => statements.create_delete_all(builder, table, hints),
            RequestKind::Merge => statements.create_merge(
                builder,
                table,
                fields,
                &self.qualifiers,
                primary,
                identity,
                hints,
            ),
            RequestKind::MergeAll => statements.create_merge_all(
                builder,
                table,
                fields,
                &self.qualifiers,
                self.batch_size,
                primary,
                identity,
                hints,
            ),
            RequestKind::Truncate => statements.create_truncate(builder, table),
            kind => {
                let Some(aggregate) = kind.aggregate() else {
                    return Err(Error::invalid(format!("{kind:?} is not an aggregate")));
                };
                let field = self.field.as_ref().ok_or_else(|| Error::missing("aggregate field"))?;
                let r#where = if kind.is_all() { None } else { r#where };
                statements.create_aggregate(builder, aggregate, table, field, r#where, hints)
            }
        }
    }
}

impl PartialEq for Request {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Request {}

impl Hash for Request {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

/// Structural identity of a [`Request`]: every input that changes the
/// generated SQL, with predicates reduced to their signatures. Field,
/// qualifier and ordering lists are order-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    kind: RequestKind,
    table: String,
    fields: Vec<Field>,
    field: Option<Field>,
    r#where: Option<GroupSignature>,
    order_by: Vec<OrderField>,
    qualifiers: Vec<Field>,
    primary: Option<DbField>,
    identity: Option<DbField>,
    hints: Option<String>,
    top: Option<u64>,
    skip: u64,
    take: u64,
    batch_size: usize,
}

impl RequestKey {
    /// The requested statement kind.
    #[must_use]
    pub const fn kind(&self) -> RequestKind {
        self.kind
    }

    /// The target table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }
}

#[cfg(test)]
mod tests {
    use std::collections::hash_map::DefaultHasher;

    use super::*;
    use crate::filter::QueryField;

    fn hash(request: &Request) -> u64 {
        let mut hasher = DefaultHasher::new();
        request.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn structurally_equal_requests() {
        let left = Request::query("Person", Field::from_names(["Id", "Name"]))
            .with_where(QueryField::eq("Id", 1));
        let right = Request::query("Person", Field::from_names(["Id", "Name"]))
            .with_where(QueryField::eq("Id", 2));
        assert_eq!(left, right);
        assert_eq!(hash(&left), hash(&right));
    }

    #[test]
    fn blank_hints_are_dropped() {
        let plain = Request::query_all("Person", Field::from_names(["Id"]));
        let blank = Request::query_all("Person", Field::from_names(["Id"])).with_hints("   ");
        assert_eq!(plain, blank);
        assert_eq!(blank.hints(), None);

        let hinted = Request::query_all("Person", Field::from_names(["Id"])).with_hints("WITH (NOLOCK)");
        assert_ne!(plain, hinted);
    }

    #[test]
    fn field_order_matters() {
        let left = Request::query_all("Person", Field::from_names(["Id", "Name"]));
        let right = Request::query_all("Person", Field::from_names(["Name", "Id"]));
        assert_ne!(left, right);
    }

    #[test]
    fn setters_reset_the_key() {
        let request = Request::count("Person");
        let before = request.key().clone();
        let request = request.with_where(QueryField::gt("Age", 18));
        assert_ne!(&before, request.key());
    }
}
