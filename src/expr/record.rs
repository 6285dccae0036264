//! Constructors for lambda bodies.
//!
//! ```ignore
//! use typedquery::expr::record::*;
//!
//! let predicate = get_string("Name").equals("Tea");
//! let projection = new_object("Good", [("Name", get_string("Name")), ("Qty", get_int32("Qty"))]);
//! ```
use super::types::ValueExpr;
use crate::value::{Value, ValueKind};

/// Typed field getter on the current record.
pub fn get(kind: ValueKind, name: &str) -> ValueExpr {
    ValueExpr::Field {
        kind,
        name: Box::new(ValueExpr::Constant(Value::from(name))),
    }
}

pub fn get_string(name: &str) -> ValueExpr {
    get(ValueKind::String, name)
}

pub fn get_int16(name: &str) -> ValueExpr {
    get(ValueKind::Int16, name)
}

pub fn get_int32(name: &str) -> ValueExpr {
    get(ValueKind::Int32, name)
}

pub fn get_int64(name: &str) -> ValueExpr {
    get(ValueKind::Int64, name)
}

pub fn get_byte(name: &str) -> ValueExpr {
    get(ValueKind::Byte, name)
}

pub fn get_double(name: &str) -> ValueExpr {
    get(ValueKind::Double, name)
}

pub fn get_float(name: &str) -> ValueExpr {
    get(ValueKind::Float, name)
}

pub fn get_decimal(name: &str) -> ValueExpr {
    get(ValueKind::Decimal, name)
}

pub fn get_bool(name: &str) -> ValueExpr {
    get(ValueKind::Bool, name)
}

pub fn get_datetime(name: &str) -> ValueExpr {
    get(ValueKind::DateTime, name)
}

pub fn get_char(name: &str) -> ValueExpr {
    get(ValueKind::Char, name)
}

pub fn get_guid(name: &str) -> ValueExpr {
    get(ValueKind::Guid, name)
}

/// Member access on a typed item.
pub fn member(name: &str) -> ValueExpr {
    ValueExpr::Member(name.to_string())
}

pub fn item() -> ValueExpr {
    ValueExpr::Item
}

pub fn constant(value: impl Into<Value>) -> ValueExpr {
    ValueExpr::Constant(value.into())
}

pub fn captured(name: &str, value: impl Into<Value>) -> ValueExpr {
    ValueExpr::Captured {
        name: name.to_string(),
        value: value.into(),
    }
}

pub fn call(method: &str, args: impl IntoIterator<Item = ValueExpr>) -> ValueExpr {
    ValueExpr::Call {
        method: method.to_string(),
        args: args.into_iter().collect(),
    }
}

/// Construction of a fixed-shape value; member order is preserved.
pub fn new_object<'a>(
    type_name: &str,
    members: impl IntoIterator<Item = (&'a str, ValueExpr)>,
) -> ValueExpr {
    ValueExpr::New {
        type_name: type_name.to_string(),
        members: members
            .into_iter()
            .map(|(name, expr)| (name.to_string(), expr))
            .collect(),
    }
}
