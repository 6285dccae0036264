//! Fluent composition of query expressions.
//!
//! Each call wraps the current expression in one more operator, so the last
//! call made ends up outermost in the tree.
use std::sync::Arc;

use super::types::*;
use crate::sql::SortDirection;

/// A composable query over items of [`Queryable::item_type`].
#[derive(Debug, Clone, PartialEq)]
pub struct Queryable {
    expr: QueryExpr,
    item_type: ItemType,
}

impl Queryable {
    /// Untyped records of the named source.
    pub fn records(source: impl Into<String>) -> Self {
        Self::from_source(QuerySource::Records(source.into()))
    }

    /// Records of `mapping.source`, read as the mapped data type.
    pub fn typed_records(mapping: Arc<DataTypeMapping>) -> Self {
        Self::from_source(QuerySource::TypedRecords(mapping))
    }

    fn from_source(source: QuerySource) -> Self {
        Self {
            item_type: source.item_type(),
            expr: QueryExpr::Source(source),
        }
    }

    pub fn item_type(&self) -> &ItemType {
        &self.item_type
    }

    pub fn filter(self, predicate: ValueExpr) -> Self {
        let predicate = Lambda::new(self.item_type.clone(), predicate);
        Self {
            expr: QueryExpr::Filter {
                predicate,
                inner: Box::new(self.expr),
            },
            item_type: self.item_type,
        }
    }

    /// Project every item. Projections whose output type cannot be
    /// inferred keep the current item type; compilation rejects them.
    pub fn select(self, projection: ValueExpr) -> Self {
        let projection = Lambda::new(self.item_type.clone(), projection);
        let item_type = projection
            .output_type()
            .unwrap_or_else(|| self.item_type.clone());
        Self {
            expr: QueryExpr::Select {
                projection,
                inner: Box::new(self.expr),
            },
            item_type,
        }
    }

    pub fn order_by(self, key: ValueExpr) -> OrderedQueryable {
        OrderedQueryable(self.order(key, SortDirection::Ascending, true))
    }

    pub fn order_by_descending(self, key: ValueExpr) -> OrderedQueryable {
        OrderedQueryable(self.order(key, SortDirection::Descending, true))
    }

    /// Apply an operator this crate does not translate.
    pub fn call(self, method: &str, args: impl IntoIterator<Item = ValueExpr>) -> Self {
        Self {
            expr: QueryExpr::Call {
                method: method.to_string(),
                args: args.into_iter().collect(),
                inner: Box::new(self.expr),
            },
            item_type: self.item_type,
        }
    }

    fn order(self, key: ValueExpr, direction: SortDirection, primary: bool) -> Self {
        let key = Lambda::new(self.item_type.clone(), key);
        Self {
            expr: QueryExpr::Order {
                key,
                direction,
                primary,
                inner: Box::new(self.expr),
            },
            item_type: self.item_type,
        }
    }

    /// The composed query wrapped in its enumeration root.
    pub fn expression(&self) -> QueryExpr {
        QueryExpr::Enumerate {
            item_type: self.item_type.clone(),
            inner: Box::new(self.expr.clone()),
        }
    }
}

/// A query with a primary sort key; secondary keys may follow.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedQueryable(Queryable);

impl OrderedQueryable {
    pub fn then_by(self, key: ValueExpr) -> Self {
        Self(self.0.order(key, SortDirection::Ascending, false))
    }

    pub fn then_by_descending(self, key: ValueExpr) -> Self {
        Self(self.0.order(key, SortDirection::Descending, false))
    }

    pub fn filter(self, predicate: ValueExpr) -> Queryable {
        self.0.filter(predicate)
    }

    pub fn select(self, projection: ValueExpr) -> Queryable {
        self.0.select(projection)
    }

    pub fn item_type(&self) -> &ItemType {
        self.0.item_type()
    }

    pub fn expression(&self) -> QueryExpr {
        self.0.expression()
    }

    pub fn into_queryable(self) -> Queryable {
        self.0
    }
}

impl From<OrderedQueryable> for Queryable {
    fn from(ordered: OrderedQueryable) -> Self {
        ordered.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::record::*;
    use crate::value::ValueKind;

    #[test]
    fn test_last_call_is_outermost() {
        let expr = Queryable::records("Goods")
            .filter(get_string("Name").equals("Tea"))
            .order_by(get_string("Name"))
            .expression();
        let QueryExpr::Enumerate { item_type, inner } = expr else {
            panic!("expected enumeration root");
        };
        assert_eq!(item_type, ItemType::Record);
        let QueryExpr::Order { primary, inner, .. } = *inner else {
            panic!("expected order");
        };
        assert!(primary);
        assert!(matches!(*inner, QueryExpr::Filter { .. }));
    }

    #[test]
    fn test_select_changes_item_type() {
        let query = Queryable::records("Goods")
            .select(new_object("Good", [("Name", get_string("Name"))]));
        match query.item_type() {
            ItemType::Shape(shape) => {
                assert_eq!(shape.name, "Good");
                assert_eq!(shape.fields, vec![("Name".to_string(), ValueKind::String)]);
            }
            other => panic!("unexpected item type {other:?}"),
        }
    }

    #[test]
    fn test_typed_records_item_type() {
        let mapping = Arc::new(
            DataTypeMapping::new("Good", "Catalog.Goods").member("Title", "Name", ValueKind::String),
        );
        let query = Queryable::typed_records(mapping.clone());
        assert_eq!(query.item_type(), &ItemType::Data(mapping));
    }

    #[test]
    fn test_then_by_is_secondary() {
        let expr = Queryable::records("Goods")
            .order_by(get_string("Name"))
            .then_by_descending(get_int32("Qty"))
            .expression();
        let QueryExpr::Enumerate { inner, .. } = expr else {
            panic!("expected enumeration root");
        };
        match *inner {
            QueryExpr::Order {
                primary, direction, ..
            } => {
                assert!(!primary);
                assert_eq!(direction, SortDirection::Descending);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
