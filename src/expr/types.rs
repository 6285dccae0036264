//! Query expression tree.
//!
//! A composed query is an immutable tree of operator calls wrapped around a
//! record source. Lambda bodies (filter predicates, projections, sort keys)
//! use a small closed set of value expressions. Both trees are consumed
//! read-only by the compiler.

use std::sync::Arc;

use crate::sql::SortDirection;
use crate::value::{Value, ValueKind};

/// Type of the items flowing through a query.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemType {
    /// Untyped data record of a named source.
    Record,
    /// Records mapped onto a declared data type.
    Data(Arc<DataTypeMapping>),
    /// Fixed-shape output of a projection.
    Shape(Arc<ShapeType>),
    Scalar(ValueKind),
}

impl ItemType {
    /// Whether items of this type come straight from a source.
    pub fn is_source_record(&self) -> bool {
        matches!(self, ItemType::Record | ItemType::Data(_))
    }
}

/// Named output shape of a projection: ordered members with their kinds.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeType {
    pub name: String,
    pub fields: Vec<(String, ValueKind)>,
}

impl ShapeType {
    pub fn new<N: Into<String>>(
        name: impl Into<String>,
        fields: impl IntoIterator<Item = (N, ValueKind)>,
    ) -> Self {
        Self {
            name: name.into(),
            fields: fields.into_iter().map(|(n, k)| (n.into(), k)).collect(),
        }
    }
}

/// Declares how a data type is read from a source: one column per member.
#[derive(Debug, Clone, PartialEq)]
pub struct DataTypeMapping {
    pub type_name: String,
    pub source: String,
    pub members: Vec<MemberMapping>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberMapping {
    pub member: String,
    pub column: String,
    pub kind: ValueKind,
}

impl DataTypeMapping {
    pub fn new(type_name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            source: source.into(),
            members: Vec::new(),
        }
    }

    /// Add a member read from `column`.
    pub fn member(
        mut self,
        member: impl Into<String>,
        column: impl Into<String>,
        kind: ValueKind,
    ) -> Self {
        self.members.push(MemberMapping {
            member: member.into(),
            column: column.into(),
            kind,
        });
        self
    }

    pub fn find(&self, member: &str) -> Option<&MemberMapping> {
        self.members.iter().find(|m| m.member == member)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

/// Body of a lambda.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueExpr {
    /// The lambda parameter itself.
    Item,
    /// Typed field getter on a data record, e.g. `r.get_string("Name")`.
    /// The name is an expression; only string constants are compilable.
    Field {
        kind: ValueKind,
        name: Box<ValueExpr>,
    },
    /// Member access on a typed item.
    Member(String),
    Constant(Value),
    /// A value captured from the caller's environment.
    Captured { name: String, value: Value },
    Binary {
        op: BinaryOperator,
        left: Box<ValueExpr>,
        right: Box<ValueExpr>,
    },
    Not(Box<ValueExpr>),
    /// Construction of a fixed-shape value.
    New {
        type_name: String,
        members: Vec<(String, ValueExpr)>,
    },
    /// Any other method call.
    Call { method: String, args: Vec<ValueExpr> },
}

impl ValueExpr {
    pub fn equals(self, rhs: impl Into<ValueExpr>) -> ValueExpr {
        self.binary(BinaryOperator::Eq, rhs)
    }

    pub fn not_equals(self, rhs: impl Into<ValueExpr>) -> ValueExpr {
        self.binary(BinaryOperator::NotEq, rhs)
    }

    pub fn greater_than(self, rhs: impl Into<ValueExpr>) -> ValueExpr {
        self.binary(BinaryOperator::Gt, rhs)
    }

    pub fn and(self, rhs: impl Into<ValueExpr>) -> ValueExpr {
        self.binary(BinaryOperator::And, rhs)
    }

    pub fn or(self, rhs: impl Into<ValueExpr>) -> ValueExpr {
        self.binary(BinaryOperator::Or, rhs)
    }

    pub fn negate(self) -> ValueExpr {
        ValueExpr::Not(Box::new(self))
    }

    fn binary(self, op: BinaryOperator, rhs: impl Into<ValueExpr>) -> ValueExpr {
        ValueExpr::Binary {
            op,
            left: Box::new(self),
            right: Box::new(rhs.into()),
        }
    }

    /// Static kind of this expression when evaluated against `param`.
    pub fn value_kind(&self, param: &ItemType) -> Option<ValueKind> {
        match self {
            ValueExpr::Field { kind, .. } => Some(*kind),
            ValueExpr::Member(name) => match param {
                ItemType::Data(mapping) => mapping.find(name).map(|m| m.kind),
                ItemType::Shape(shape) => shape
                    .fields
                    .iter()
                    .find(|(n, _)| n == name)
                    .map(|(_, k)| *k),
                _ => None,
            },
            ValueExpr::Constant(v) | ValueExpr::Captured { value: v, .. } => v.kind(),
            ValueExpr::Binary { .. } | ValueExpr::Not(_) => Some(ValueKind::Bool),
            ValueExpr::Item => match param {
                ItemType::Scalar(kind) => Some(*kind),
                _ => None,
            },
            ValueExpr::New { .. } | ValueExpr::Call { .. } => None,
        }
    }
}

impl From<Value> for ValueExpr {
    fn from(value: Value) -> Self {
        ValueExpr::Constant(value)
    }
}

macro_rules! constant_from {
    ($($t:ty),*) => {
        $(impl From<$t> for ValueExpr {
            fn from(value: $t) -> Self {
                ValueExpr::Constant(Value::from(value))
            }
        })*
    };
}

constant_from!(&str, String, i32, i64, bool, rust_decimal::Decimal, chrono::NaiveDateTime);

/// A single-parameter lambda over query items.
#[derive(Debug, Clone, PartialEq)]
pub struct Lambda {
    pub param: ItemType,
    pub body: ValueExpr,
}

impl Lambda {
    pub fn new(param: ItemType, body: ValueExpr) -> Self {
        Self { param, body }
    }

    /// `|r| r`
    pub fn is_identity(&self) -> bool {
        matches!(self.body, ValueExpr::Item)
    }

    /// Item type produced by evaluating the body.
    pub fn output_type(&self) -> Option<ItemType> {
        match &self.body {
            ValueExpr::Item => Some(self.param.clone()),
            ValueExpr::New { type_name, members } => {
                let fields = members
                    .iter()
                    .map(|(name, expr)| Some((name.clone(), expr.value_kind(&self.param)?)))
                    .collect::<Option<Vec<_>>>()?;
                Some(ItemType::Shape(Arc::new(ShapeType {
                    name: type_name.clone(),
                    fields,
                })))
            }
            other => other.value_kind(&self.param).map(ItemType::Scalar),
        }
    }
}

/// Where the records of a query come from.
#[derive(Debug, Clone, PartialEq)]
pub enum QuerySource {
    /// Untyped records of a named source.
    Records(String),
    /// Records of the mapping's source, read as the mapped data type.
    TypedRecords(Arc<DataTypeMapping>),
}

impl QuerySource {
    pub fn name(&self) -> &str {
        match self {
            QuerySource::Records(name) => name,
            QuerySource::TypedRecords(mapping) => &mapping.source,
        }
    }

    pub fn item_type(&self) -> ItemType {
        match self {
            QuerySource::Records(_) => ItemType::Record,
            QuerySource::TypedRecords(mapping) => ItemType::Data(mapping.clone()),
        }
    }
}

/// A composed query, outermost call at the root.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryExpr {
    Source(QuerySource),
    /// Root enumeration of the composed query.
    Enumerate {
        item_type: ItemType,
        inner: Box<QueryExpr>,
    },
    Select {
        projection: Lambda,
        inner: Box<QueryExpr>,
    },
    Filter {
        predicate: Lambda,
        inner: Box<QueryExpr>,
    },
    /// `order_by` when `primary`, `then_by` otherwise.
    Order {
        key: Lambda,
        direction: SortDirection,
        primary: bool,
        inner: Box<QueryExpr>,
    },
    /// Any other query operator.
    Call {
        method: String,
        args: Vec<ValueExpr>,
        inner: Box<QueryExpr>,
    },
}
