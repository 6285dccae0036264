//! Clause transformers: lambdas in, SQL AST fragments out.
//!
//! Each transformer accepts exactly one expression shape and reports the
//! full lambda text when it sees anything else.
use crate::data::convert::{convert_value, ValueConverter};
use crate::data::source::RawValue;
use crate::error::{Error, Result};
use crate::expr::{BinaryOperator, DataTypeMapping, ItemType, Lambda, ValueExpr};
use crate::sql::{Condition, ParameterContext, SortItem, SqlExpr};
use crate::value::{StructValue, Value, ValueKind};

use super::descriptor::SortKey;

/// Column read by a field getter or a mapped member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub name: String,
    pub kind: ValueKind,
}

fn resolve_field(expr: &ValueExpr, lambda: &Lambda) -> Result<ColumnRef> {
    match (expr, &lambda.param) {
        (ValueExpr::Field { kind, name }, ItemType::Record) => match name.as_ref() {
            ValueExpr::Constant(Value::String(name)) => Ok(ColumnRef {
                name: name.clone(),
                kind: *kind,
            }),
            _ => Err(Error::unsupported(
                lambda,
                format!("field name `{}` must be a string constant", name),
            )),
        },
        (ValueExpr::Member(member), ItemType::Data(mapping)) => mapping
            .find(member)
            .map(|m| ColumnRef {
                name: m.column.clone(),
                kind: m.kind,
            })
            .ok_or_else(|| {
                Error::unsupported(
                    lambda,
                    format!("{} has no mapped member {}", mapping.type_name, member),
                )
            }),
        _ => Err(Error::unsupported(
            lambda,
            format!("`{}` is not a record field getter", expr),
        )),
    }
}

/// `r.get_x("F") == value` → `F = &pN`, binding `value` as `pN`.
pub fn transform_where(predicate: &Lambda, params: &mut ParameterContext) -> Result<Condition> {
    let (left, right) = match &predicate.body {
        ValueExpr::Binary {
            op: BinaryOperator::Eq,
            left,
            right,
        } => (left, right),
        _ => {
            return Err(Error::unsupported(
                predicate,
                "only `field == value` predicates are supported",
            ))
        }
    };
    let field = resolve_field(left, predicate)?;
    let value = match right.as_ref() {
        ValueExpr::Constant(value) | ValueExpr::Captured { value, .. } => value.clone(),
        other => {
            return Err(Error::unsupported(
                predicate,
                format!("`{}` is not a constant or captured value", other),
            ))
        }
    };
    let name = params.add(value);
    Ok(Condition::Equals {
        left: SqlExpr::Field(field.name),
        right: SqlExpr::Parameter(name),
    })
}

/// `r.get_x("F")` → `F` with the requested direction.
pub fn transform_order_by(sorter: &SortKey) -> Result<SortItem> {
    let field = resolve_field(&sorter.key.body, &sorter.key)?;
    Ok(SortItem {
        expr: SqlExpr::Field(field.name),
        direction: sorter.direction,
    })
}

/// Select-list of a typed query plus the row materializer that goes with it.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub columns: Vec<SqlExpr>,
    pub materializer: Materializer,
}

/// `Shape { a: r.get_x("A"), ... }` → `A, ...`
pub fn transform_select(projection: &Lambda) -> Result<Projection> {
    let (type_name, members) = match &projection.body {
        ValueExpr::New { type_name, members } if !members.is_empty() => (type_name, members),
        _ => {
            return Err(Error::unsupported(
                projection,
                "a projection must construct a value from field getters",
            ))
        }
    };
    let mut columns = Vec::with_capacity(members.len());
    let mut fields = Vec::with_capacity(members.len());
    for (name, expr) in members {
        let column = resolve_field(expr, projection)?;
        columns.push(SqlExpr::Field(column.name));
        fields.push((name.clone(), column.kind));
    }
    Ok(Projection {
        columns,
        materializer: Materializer {
            type_name: type_name.clone(),
            members: fields,
        },
    })
}

/// Every mapped member, in declaration order.
pub fn transform_mapping(mapping: &DataTypeMapping) -> Result<Projection> {
    if mapping.members.is_empty() {
        return Err(Error::InvalidQuery(format!(
            "{} declares no mapped members",
            mapping.type_name
        )));
    }
    Ok(Projection {
        columns: mapping
            .members
            .iter()
            .map(|m| SqlExpr::Field(m.column.clone()))
            .collect(),
        materializer: Materializer {
            type_name: mapping.type_name.clone(),
            members: mapping
                .members
                .iter()
                .map(|m| (m.member.clone(), m.kind))
                .collect(),
        },
    })
}

/// Builds one output value from the positional values of a row.
#[derive(Debug, Clone, PartialEq)]
pub struct Materializer {
    pub type_name: String,
    /// Output member names and kinds, in select-list order.
    pub members: Vec<(String, ValueKind)>,
}

impl Materializer {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn materialize(&self, converter: &dyn ValueConverter, row: &[RawValue]) -> Result<Value> {
        if row.len() != self.members.len() {
            return Err(Error::Source(format!(
                "{} expects {} values per row, got {}",
                self.type_name,
                self.members.len(),
                row.len()
            )));
        }
        let fields = self
            .members
            .iter()
            .zip(row)
            .map(|((name, kind), raw)| Ok((name.clone(), convert_value(converter, *kind, raw)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Value::Struct(StructValue {
            type_name: self.type_name.clone(),
            fields,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::convert::DefaultValueConverter;
    use crate::error::ErrorKind;
    use crate::expr::record::*;
    use crate::sql::SortDirection;
    use rust_decimal::Decimal;
    use std::sync::Arc;

    fn record(body: ValueExpr) -> Lambda {
        Lambda::new(ItemType::Record, body)
    }

    fn goods_mapping() -> Arc<DataTypeMapping> {
        Arc::new(
            DataTypeMapping::new("Good", "Catalog.Goods")
                .member("Title", "Description", ValueKind::String)
                .member("Price", "Price", ValueKind::Decimal),
        )
    }

    #[test]
    fn test_where_binds_constant() {
        let mut params = ParameterContext::default();
        let condition =
            transform_where(&record(get_string("Name").equals("Tea")), &mut params).unwrap();
        assert_eq!(
            condition,
            Condition::Equals {
                left: SqlExpr::Field("Name".into()),
                right: SqlExpr::Parameter("p1".into()),
            }
        );
        let parameters = params.into_parameters();
        assert_eq!(parameters.len(), 1);
        assert_eq!(parameters[0].value, Value::from("Tea"));
    }

    #[test]
    fn test_where_binds_captured_value() {
        let mut params = ParameterContext::default();
        params.add(Value::Null);
        let predicate = record(get_int32("Qty").equals(captured("wanted", 7)));
        let condition = transform_where(&predicate, &mut params).unwrap();
        assert!(matches!(
            condition,
            Condition::Equals { right: SqlExpr::Parameter(ref p), .. } if p == "p2"
        ));
    }

    #[test]
    fn test_where_rejects_other_shapes() {
        let shapes = [
            get_int32("Qty").greater_than(3),
            get_string("A").equals("x").and(get_string("B").equals("y")),
            get_string("A").equals(get_string("B")),
            constant("x").equals(get_string("A")),
            get_string("A").equals("x").negate(),
        ];
        for body in shapes {
            let predicate = record(body);
            let err = transform_where(&predicate, &mut ParameterContext::default()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::UnsupportedExpressionShape);
            assert!(err.to_string().contains(&predicate.to_string()));
        }
    }

    #[test]
    fn test_where_rejects_computed_field_name() {
        let body = ValueExpr::Field {
            kind: ValueKind::String,
            name: Box::new(call("concat", [constant("Na"), constant("me")])),
        };
        let err = transform_where(&record(body.equals("x")), &mut ParameterContext::default())
            .unwrap_err();
        assert!(err.to_string().contains("string constant"));
    }

    #[test]
    fn test_select_columns_in_declared_order() {
        let projection = record(new_object(
            "Good",
            [
                ("Title", get_string("Name")),
                ("Code", get_string("Code")),
                ("Price", get_decimal("Price")),
            ],
        ));
        let out = transform_select(&projection).unwrap();
        assert_eq!(
            out.columns,
            vec![
                SqlExpr::Field("Name".into()),
                SqlExpr::Field("Code".into()),
                SqlExpr::Field("Price".into()),
            ]
        );
        assert_eq!(out.materializer.members[0], ("Title".to_string(), ValueKind::String));
        assert_eq!(out.materializer.len(), 3);
    }

    #[test]
    fn test_select_rejects_non_getter_member() {
        let projection = record(new_object("Good", [("Name", constant("x"))]));
        let err = transform_select(&projection).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedExpressionShape);
        assert!(transform_select(&record(get_string("Name"))).is_err());
        assert!(transform_select(&record(new_object("Empty", Vec::new()))).is_err());
    }

    #[test]
    fn test_member_access_resolves_through_mapping() {
        let mapping = goods_mapping();
        let param = ItemType::Data(mapping.clone());
        let mut params = ParameterContext::default();
        let condition = transform_where(
            &Lambda::new(param.clone(), member("Title").equals("Tea")),
            &mut params,
        )
        .unwrap();
        assert!(matches!(
            condition,
            Condition::Equals { left: SqlExpr::Field(ref f), .. } if f == "Description"
        ));
        let sorter = SortKey {
            key: Lambda::new(param.clone(), member("Price")),
            direction: SortDirection::Descending,
        };
        assert_eq!(
            transform_order_by(&sorter).unwrap(),
            SortItem {
                expr: SqlExpr::Field("Price".into()),
                direction: SortDirection::Descending,
            }
        );
        let unknown = Lambda::new(param, member("Weight"));
        assert!(transform_select(&Lambda::new(
            unknown.param.clone(),
            new_object("X", [("W", member("Weight"))])
        ))
        .is_err());
    }

    #[test]
    fn test_order_by_requires_getter() {
        let sorter = SortKey {
            key: record(constant(1)),
            direction: SortDirection::Ascending,
        };
        assert_eq!(
            transform_order_by(&sorter).unwrap_err().kind(),
            ErrorKind::UnsupportedExpressionShape
        );
    }

    #[test]
    fn test_mapping_projection() {
        let out = transform_mapping(&goods_mapping()).unwrap();
        assert_eq!(
            out.columns,
            vec![
                SqlExpr::Field("Description".into()),
                SqlExpr::Field("Price".into())
            ]
        );
        assert_eq!(out.materializer.type_name, "Good");
        assert!(transform_mapping(&DataTypeMapping::new("Empty", "X")).is_err());
    }

    #[test]
    fn test_materialize_converts_by_declared_kind() {
        let materializer = Materializer {
            type_name: "Good".into(),
            members: vec![
                ("Name".into(), ValueKind::String),
                ("Qty".into(), ValueKind::Int32),
                ("Price".into(), ValueKind::Double),
            ],
        };
        let row = vec![
            RawValue::String("Tea".into()),
            RawValue::Number(Decimal::from(4)),
            RawValue::Null,
        ];
        let value = materializer.materialize(&DefaultValueConverter, &row).unwrap();
        let item = value.as_struct().unwrap();
        assert_eq!(item.type_name, "Good");
        assert_eq!(item.get("Qty"), Some(&Value::Int32(4)));
        assert_eq!(item.get("Price"), Some(&Value::Null));
        assert!(materializer
            .materialize(&DefaultValueConverter, &row[..2])
            .is_err());
    }
}
