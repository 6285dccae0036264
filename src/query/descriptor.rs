use std::sync::Arc;

use crate::expr::{DataTypeMapping, ItemType, Lambda, QuerySource};
use crate::sql::SortDirection;

#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub key: Lambda,
    pub direction: SortDirection,
}

/// Untyped records of a named source.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordsQuery {
    pub source: String,
    pub filter: Option<Lambda>,
    /// Primary key first.
    pub sorters: Vec<SortKey>,
}

/// How the items of a typed query are built from a row.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    /// An explicit projection.
    Projection(Lambda),
    /// Every mapped member of the data type.
    Mapping(Arc<DataTypeMapping>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypedQuery {
    pub source: QuerySource,
    pub filter: Option<Lambda>,
    pub sorters: Vec<SortKey>,
    pub selector: Selector,
    pub item_type: ItemType,
}

/// Everything the builder learned about a query, ready for translation.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryDescriptor {
    Records(RecordsQuery),
    Typed(TypedQuery),
}

impl QueryDescriptor {
    pub fn source_name(&self) -> &str {
        match self {
            QueryDescriptor::Records(q) => &q.source,
            QueryDescriptor::Typed(q) => q.source.name(),
        }
    }

    pub fn filter(&self) -> Option<&Lambda> {
        match self {
            QueryDescriptor::Records(q) => q.filter.as_ref(),
            QueryDescriptor::Typed(q) => q.filter.as_ref(),
        }
    }

    pub fn sorters(&self) -> &[SortKey] {
        match self {
            QueryDescriptor::Records(q) => &q.sorters,
            QueryDescriptor::Typed(q) => &q.sorters,
        }
    }

    /// Type of the items the query yields.
    pub fn item_type(&self) -> ItemType {
        match self {
            QueryDescriptor::Records(_) => ItemType::Record,
            QueryDescriptor::Typed(q) => q.item_type.clone(),
        }
    }
}
