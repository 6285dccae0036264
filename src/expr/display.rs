//! Text rendering of query expressions, used in diagnostics.
use std::fmt;

use super::types::*;
use crate::value::Value;

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemType::Record => write!(f, "DataRecord"),
            ItemType::Data(mapping) => write!(f, "{}", mapping.type_name),
            ItemType::Shape(shape) => write!(f, "{}", shape.name),
            ItemType::Scalar(kind) => write!(f, "{}", kind),
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            BinaryOperator::Eq => "==",
            BinaryOperator::NotEq => "!=",
            BinaryOperator::Lt => "<",
            BinaryOperator::LtEq => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::GtEq => ">=",
            BinaryOperator::And => "&&",
            BinaryOperator::Or => "||",
        };
        f.write_str(op)
    }
}

fn write_literal(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::Null => write!(f, "null"),
        Value::String(s) => write!(f, "{:?}", s),
        Value::Char(c) => write!(f, "{:?}", c),
        Value::DateTime(dt) => write!(f, "datetime(\"{}\")", dt),
        Value::Guid(g) => write!(f, "guid(\"{}\")", g),
        other => write!(f, "{}", other.display()),
    }
}

impl fmt::Display for ValueExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueExpr::Item => write!(f, "r"),
            ValueExpr::Field { kind, name } => write!(f, "r.get_{}({})", kind, name),
            ValueExpr::Member(name) => write!(f, "r.{}", name),
            ValueExpr::Constant(value) => write_literal(f, value),
            ValueExpr::Captured { name, .. } => write!(f, "{}", name),
            ValueExpr::Binary { op, left, right } => write!(f, "{} {} {}", left, op, right),
            ValueExpr::Not(inner) => write!(f, "!({})", inner),
            ValueExpr::New { type_name, members } => {
                let items: Vec<String> = members
                    .iter()
                    .map(|(name, expr)| format!("{}: {}", name, expr))
                    .collect();
                write!(f, "{} {{ {} }}", type_name, items.join(", "))
            }
            ValueExpr::Call { method, args } => {
                let items: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                write!(f, "{}({})", method, items.join(", "))
            }
        }
    }
}

impl fmt::Display for Lambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "|r: {}| {}", self.param, self.body)
    }
}

impl fmt::Display for QuerySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuerySource::Records(name) => write!(f, "records({:?})", name),
            QuerySource::TypedRecords(mapping) => {
                write!(f, "typed_records::<{}>()", mapping.type_name)
            }
        }
    }
}

impl fmt::Display for QueryExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryExpr::Source(source) => write!(f, "{}", source),
            QueryExpr::Enumerate { item_type, inner } => {
                write!(f, "{}.into_iter::<{}>()", inner, item_type)
            }
            QueryExpr::Select { projection, inner } => {
                write!(f, "{}.select({})", inner, projection)
            }
            QueryExpr::Filter { predicate, inner } => {
                write!(f, "{}.filter({})", inner, predicate)
            }
            QueryExpr::Order {
                key,
                direction,
                primary,
                inner,
            } => {
                let method = match (primary, direction.is_descending()) {
                    (true, false) => "order_by",
                    (true, true) => "order_by_descending",
                    (false, false) => "then_by",
                    (false, true) => "then_by_descending",
                };
                write!(f, "{}.{}({})", inner, method, key)
            }
            QueryExpr::Call {
                method,
                args,
                inner,
            } => {
                let items: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                write!(f, "{}.{}({})", inner, method, items.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::record::*;
    use crate::sql::SortDirection;

    #[test]
    fn test_predicate_text() {
        let body = get_string("Name").equals("Tea");
        assert_eq!(body.to_string(), r#"r.get_string("Name") == "Tea""#);
    }

    #[test]
    fn test_captured_renders_its_name() {
        let body = get_int32("Qty").equals(captured("min_qty", 3));
        assert_eq!(body.to_string(), r#"r.get_int32("Qty") == min_qty"#);
    }

    #[test]
    fn test_projection_text() {
        let body = new_object("Good", [("Name", get_string("Name"))]);
        assert_eq!(body.to_string(), r#"Good { Name: r.get_string("Name") }"#);
    }

    #[test]
    fn test_query_text() {
        let expr = QueryExpr::Enumerate {
            item_type: ItemType::Record,
            inner: Box::new(QueryExpr::Order {
                key: Lambda::new(ItemType::Record, get_string("Name")),
                direction: SortDirection::Descending,
                primary: true,
                inner: Box::new(QueryExpr::Source(QuerySource::Records("Goods".into()))),
            }),
        };
        assert_eq!(
            expr.to_string(),
            r#"records("Goods").order_by_descending(|r: DataRecord| r.get_string("Name")).into_iter::<DataRecord>()"#
        );
    }
}
