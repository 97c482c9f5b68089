use crate::firestore::error::{invalid_argument, FirestoreResult};
use crate::firestore::model::{DocumentKey, FieldPath, IntoFieldPath, ResourcePath};
use crate::firestore::value::{FirestoreValue, ValueKind};

use super::reference::CollectionReference;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterOperator {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    ArrayContains,
    In,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OrderDirection {
    #[default]
    Ascending,
    Descending,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldFilter {
    field: FieldPath,
    operator: FilterOperator,
    value: FirestoreValue,
}

impl FieldFilter {
    pub fn new(field: FieldPath, operator: FilterOperator, value: FirestoreValue) -> FirestoreResult<Self> {
        if operator == FilterOperator::In && !matches!(value.kind(), ValueKind::Array(_)) {
            return Err(invalid_argument(format!(
                "Filter on '{field}' with 'in' requires an array value"
            )));
        }
        Ok(Self {
            field,
            operator,
            value,
        })
    }

    pub fn field(&self) -> &FieldPath {
        &self.field
    }

    pub fn operator(&self) -> FilterOperator {
        self.operator
    }

    pub fn value(&self) -> &FirestoreValue {
        &self.value
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrderBy {
    field: FieldPath,
    direction: OrderDirection,
}

impl OrderBy {
    pub fn new(field: FieldPath, direction: OrderDirection) -> Self {
        Self { field, direction }
    }

    pub fn field(&self) -> &FieldPath {
        &self.field
    }

    pub fn direction(&self) -> OrderDirection {
        self.direction
    }
}

/// A single query clause that can be stored ahead of time (for example on a
/// [`QueryNode`](crate::extended::QueryNode)) and applied to any collection.
#[derive(Clone, Debug, PartialEq)]
pub enum QueryConstraint {
    Where(FieldFilter),
    OrderBy(OrderBy),
    Limit(u32),
}

impl QueryConstraint {
    pub fn where_field(
        field: impl IntoFieldPath,
        operator: FilterOperator,
        value: impl Into<FirestoreValue>,
    ) -> FirestoreResult<Self> {
        let filter = FieldFilter::new(field.into_field_path()?, operator, value.into())?;
        Ok(Self::Where(filter))
    }

    pub fn order_by(field: impl IntoFieldPath, direction: OrderDirection) -> FirestoreResult<Self> {
        Ok(Self::OrderBy(OrderBy::new(field.into_field_path()?, direction)))
    }

    pub fn limit(limit: u32) -> Self {
        Self::Limit(limit)
    }
}

/// A query targeting one collection.
#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    collection: CollectionReference,
    filters: Vec<FieldFilter>,
    order_by: Vec<OrderBy>,
    limit: Option<u32>,
}

impl Query {
    pub(crate) fn new(collection: CollectionReference) -> Self {
        Self {
            collection,
            filters: Vec::new(),
            order_by: Vec::new(),
            limit: None,
        }
    }

    pub fn collection(&self) -> &CollectionReference {
        &self.collection
    }

    pub fn collection_path(&self) -> &ResourcePath {
        self.collection.path()
    }

    pub fn where_field(
        self,
        field: impl IntoFieldPath,
        operator: FilterOperator,
        value: impl Into<FirestoreValue>,
    ) -> FirestoreResult<Self> {
        self.with_constraint(QueryConstraint::where_field(field, operator, value)?)
    }

    pub fn order_by(self, field: impl IntoFieldPath, direction: OrderDirection) -> FirestoreResult<Self> {
        self.with_constraint(QueryConstraint::order_by(field, direction)?)
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_constraint(mut self, constraint: QueryConstraint) -> FirestoreResult<Self> {
        match constraint {
            QueryConstraint::Where(filter) => self.filters.push(filter),
            QueryConstraint::OrderBy(order) => {
                if self
                    .order_by
                    .iter()
                    .any(|existing| existing.field() == order.field())
                {
                    return Err(invalid_argument(format!(
                        "Query already orders by '{}'",
                        order.field()
                    )));
                }
                self.order_by.push(order);
            }
            QueryConstraint::Limit(limit) => self.limit = Some(limit),
        }
        Ok(self)
    }

    pub fn with_constraints<'a, I>(self, constraints: I) -> FirestoreResult<Self>
    where
        I: IntoIterator<Item = &'a QueryConstraint>,
    {
        constraints
            .into_iter()
            .try_fold(self, |query, constraint| query.with_constraint(constraint.clone()))
    }

    pub(crate) fn definition(&self) -> QueryDefinition {
        QueryDefinition {
            collection_path: self.collection.path().clone(),
            filters: self.filters.clone(),
            order_by: self.order_by.clone(),
            limit: self.limit,
        }
    }
}

/// Store-facing representation of a query.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryDefinition {
    pub(crate) collection_path: ResourcePath,
    pub(crate) filters: Vec<FieldFilter>,
    pub(crate) order_by: Vec<OrderBy>,
    pub(crate) limit: Option<u32>,
}

impl QueryDefinition {
    pub fn collection_path(&self) -> &ResourcePath {
        &self.collection_path
    }

    pub fn matches_collection(&self, key: &DocumentKey) -> bool {
        key.collection_path() == self.collection_path
    }

    pub fn filters(&self) -> &[FieldFilter] {
        &self.filters
    }

    pub fn order_by(&self) -> &[OrderBy] {
        &self.order_by
    }

    pub fn limit(&self) -> Option<u32> {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dishes() -> CollectionReference {
        CollectionReference::from_string("restaurants/r1/dishes").unwrap()
    }

    #[test]
    fn builds_definition_from_constraints() {
        let constraints = vec![
            QueryConstraint::where_field("groupName", FilterOperator::Equal, "A").unwrap(),
            QueryConstraint::order_by("index", OrderDirection::Ascending).unwrap(),
            QueryConstraint::limit(10),
        ];
        let query = dishes().query().with_constraints(&constraints).unwrap();
        let definition = query.definition();
        assert_eq!(definition.filters().len(), 1);
        assert_eq!(definition.order_by()[0].field().canonical_string(), "index");
        assert_eq!(definition.limit(), Some(10));
        assert_eq!(definition.collection_path().canonical_string(), "restaurants/r1/dishes");
    }

    #[test]
    fn in_filter_requires_array() {
        let err = QueryConstraint::where_field("tag", FilterOperator::In, "spicy").unwrap_err();
        assert_eq!(err.code_str(), "firestore/invalid-argument");
    }

    #[test]
    fn rejects_duplicate_order_by() {
        let err = dishes()
            .query()
            .order_by("index", OrderDirection::Ascending)
            .unwrap()
            .order_by("index", OrderDirection::Descending)
            .unwrap_err();
        assert_eq!(err.code_str(), "firestore/invalid-argument");
    }
}
