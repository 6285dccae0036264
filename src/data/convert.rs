//! Raw value conversion.
//!
//! A [`ValueConverter`] turns raw source values into target primitives; a
//! [`FieldTypeResolver`] maps external type descriptors to [`FieldKind`]
//! tags. [`converter_for`] is the lookup table from tag to conversion
//! function, resolved once per field rather than per cell.
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::source::RawValue;
use crate::error::{Error, Result};
use crate::value::{Value, ValueKind};

/// Conversions from raw source values, one per target primitive.
pub trait ValueConverter: Send + Sync {
    fn to_text(&self, raw: &RawValue) -> Result<String>;
    fn to_int16(&self, raw: &RawValue) -> Result<i16>;
    fn to_int32(&self, raw: &RawValue) -> Result<i32>;
    fn to_int64(&self, raw: &RawValue) -> Result<i64>;
    fn to_byte(&self, raw: &RawValue) -> Result<u8>;
    fn to_double(&self, raw: &RawValue) -> Result<f64>;
    fn to_float(&self, raw: &RawValue) -> Result<f32>;
    fn to_decimal(&self, raw: &RawValue) -> Result<Decimal>;
    fn to_bool(&self, raw: &RawValue) -> Result<bool>;
    fn to_datetime(&self, raw: &RawValue) -> Result<NaiveDateTime>;
    fn to_char(&self, raw: &RawValue) -> Result<char>;
    fn to_guid(&self, raw: &RawValue) -> Result<Uuid>;
}

/// Semantic type tag of a result column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Scalar(ValueKind),
    /// Nested tabular value; read through a nested reader.
    Table,
    /// Unknown descriptor; values pass through by their raw shape.
    Any,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Scalar(kind) => write!(f, "{}", kind),
            FieldKind::Table => write!(f, "table"),
            FieldKind::Any => write!(f, "any"),
        }
    }
}

/// Maps external type descriptors to semantic type tags.
pub trait FieldTypeResolver: Send + Sync {
    fn resolve(&self, type_name: &str) -> FieldKind;
}

/// Resolves the scalar kind names understood by [`ValueKind::parse`], plus
/// the usual spellings of a nested table.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFieldTypeResolver;

impl FieldTypeResolver for DefaultFieldTypeResolver {
    fn resolve(&self, type_name: &str) -> FieldKind {
        let lower = type_name.trim().to_ascii_lowercase();
        match lower.as_str() {
            "table" | "tablepart" | "valuetable" | "queryresult" => FieldKind::Table,
            _ => ValueKind::parse(&lower)
                .map(FieldKind::Scalar)
                .unwrap_or(FieldKind::Any),
        }
    }
}

pub type ConvertFn = fn(&dyn ValueConverter, &RawValue) -> Result<Value>;

/// Conversion function for a field tag. Nested tables have none.
pub fn converter_for(kind: FieldKind) -> Option<ConvertFn> {
    let convert: ConvertFn = match kind {
        FieldKind::Table => return None,
        FieldKind::Any => convert_any,
        FieldKind::Scalar(kind) => match kind {
            ValueKind::String => convert_string,
            ValueKind::Int16 => convert_int16,
            ValueKind::Int32 => convert_int32,
            ValueKind::Int64 => convert_int64,
            ValueKind::Byte => convert_byte,
            ValueKind::Double => convert_double,
            ValueKind::Float => convert_float,
            ValueKind::Decimal => convert_decimal,
            ValueKind::Bool => convert_bool,
            ValueKind::DateTime => convert_datetime,
            ValueKind::Char => convert_char,
            ValueKind::Guid => convert_guid,
        },
    };
    Some(convert)
}

/// Convert to `kind`, mapping raw nulls to [`Value::Null`].
pub fn convert_value(
    converter: &dyn ValueConverter,
    kind: ValueKind,
    raw: &RawValue,
) -> Result<Value> {
    match converter_for(FieldKind::Scalar(kind)) {
        Some(convert) => convert(converter, raw),
        None => Err(Error::conversion(kind, raw)),
    }
}

macro_rules! scalar_converters {
    ($($name:ident => $method:ident, $variant:ident;)*) => {
        $(fn $name(converter: &dyn ValueConverter, raw: &RawValue) -> Result<Value> {
            if raw.is_null() {
                return Ok(Value::Null);
            }
            converter.$method(raw).map(Value::$variant)
        })*
    };
}

scalar_converters! {
    convert_string => to_text, String;
    convert_int16 => to_int16, Int16;
    convert_int32 => to_int32, Int32;
    convert_int64 => to_int64, Int64;
    convert_byte => to_byte, Byte;
    convert_double => to_double, Double;
    convert_float => to_float, Float;
    convert_decimal => to_decimal, Decimal;
    convert_bool => to_bool, Bool;
    convert_datetime => to_datetime, DateTime;
    convert_char => to_char, Char;
    convert_guid => to_guid, Guid;
}

fn convert_any(_converter: &dyn ValueConverter, raw: &RawValue) -> Result<Value> {
    match raw {
        RawValue::Null => Ok(Value::Null),
        RawValue::Bool(b) => Ok(Value::Bool(*b)),
        RawValue::Number(n) => Ok(Value::Decimal(*n)),
        RawValue::String(s) => Ok(Value::String(s.clone())),
        RawValue::Date(d) => Ok(Value::DateTime(*d)),
        RawValue::Table(_) => Err(Error::conversion("scalar", raw)),
    }
}

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y%m%d%H%M%S"];

/// Parse the date formats the default converter and the in-memory
/// backend accept.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Lenient conversions: numbers narrow with range checks, strings are
/// parsed, a one-character string is a char.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultValueConverter;

impl DefaultValueConverter {
    fn integral(&self, target: ValueKind, raw: &RawValue) -> Result<Decimal> {
        let number = match raw {
            RawValue::Number(n) => *n,
            RawValue::String(s) => {
                Decimal::from_str(s.trim()).map_err(|_| Error::conversion(target, raw))?
            }
            _ => return Err(Error::conversion(target, raw)),
        };
        if number.fract().is_zero() {
            Ok(number)
        } else {
            Err(Error::conversion(target, raw))
        }
    }
}

impl ValueConverter for DefaultValueConverter {
    fn to_text(&self, raw: &RawValue) -> Result<String> {
        match raw {
            RawValue::String(s) => Ok(s.clone()),
            RawValue::Number(n) => Ok(n.to_string()),
            RawValue::Bool(b) => Ok(b.to_string()),
            RawValue::Date(d) => Ok(d.format("%Y-%m-%dT%H:%M:%S").to_string()),
            _ => Err(Error::conversion(ValueKind::String, raw)),
        }
    }

    fn to_int16(&self, raw: &RawValue) -> Result<i16> {
        self.integral(ValueKind::Int16, raw)?
            .to_i16()
            .ok_or_else(|| Error::conversion(ValueKind::Int16, raw))
    }

    fn to_int32(&self, raw: &RawValue) -> Result<i32> {
        self.integral(ValueKind::Int32, raw)?
            .to_i32()
            .ok_or_else(|| Error::conversion(ValueKind::Int32, raw))
    }

    fn to_int64(&self, raw: &RawValue) -> Result<i64> {
        self.integral(ValueKind::Int64, raw)?
            .to_i64()
            .ok_or_else(|| Error::conversion(ValueKind::Int64, raw))
    }

    fn to_byte(&self, raw: &RawValue) -> Result<u8> {
        self.integral(ValueKind::Byte, raw)?
            .to_u8()
            .ok_or_else(|| Error::conversion(ValueKind::Byte, raw))
    }

    fn to_double(&self, raw: &RawValue) -> Result<f64> {
        let converted = match raw {
            RawValue::Number(n) => n.to_f64(),
            RawValue::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        converted.ok_or_else(|| Error::conversion(ValueKind::Double, raw))
    }

    fn to_float(&self, raw: &RawValue) -> Result<f32> {
        let converted = match raw {
            RawValue::Number(n) => n.to_f32(),
            RawValue::String(s) => s.trim().parse::<f32>().ok(),
            _ => None,
        };
        converted.ok_or_else(|| Error::conversion(ValueKind::Float, raw))
    }

    fn to_decimal(&self, raw: &RawValue) -> Result<Decimal> {
        let converted = match raw {
            RawValue::Number(n) => Some(*n),
            RawValue::String(s) => Decimal::from_str(s.trim())
                .ok()
                .or_else(|| s.trim().parse::<f64>().ok().and_then(Decimal::from_f64)),
            _ => None,
        };
        converted.ok_or_else(|| Error::conversion(ValueKind::Decimal, raw))
    }

    fn to_bool(&self, raw: &RawValue) -> Result<bool> {
        let converted = match raw {
            RawValue::Bool(b) => Some(*b),
            RawValue::Number(n) => Some(!n.is_zero()),
            RawValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            _ => None,
        };
        converted.ok_or_else(|| Error::conversion(ValueKind::Bool, raw))
    }

    fn to_datetime(&self, raw: &RawValue) -> Result<NaiveDateTime> {
        let converted = match raw {
            RawValue::Date(d) => Some(*d),
            RawValue::String(s) => parse_datetime(s),
            _ => None,
        };
        converted.ok_or_else(|| Error::conversion(ValueKind::DateTime, raw))
    }

    fn to_char(&self, raw: &RawValue) -> Result<char> {
        if let RawValue::String(s) = raw {
            let mut chars = s.chars();
            if let (Some(c), None) = (chars.next(), chars.next()) {
                return Ok(c);
            }
        }
        Err(Error::conversion(ValueKind::Char, raw))
    }

    fn to_guid(&self, raw: &RawValue) -> Result<Uuid> {
        let converted = match raw {
            RawValue::String(s) => Uuid::parse_str(s.trim()).ok(),
            _ => None,
        };
        converted.ok_or_else(|| Error::conversion(ValueKind::Guid, raw))
    }
}
