use std::fmt;
use std::sync::Arc;

use chrono::NaiveDateTime;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Scalar type of a record field getter, projection member or converter target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    String,
    Int16,
    Int32,
    Int64,
    Byte,
    Double,
    Float,
    Decimal,
    Bool,
    DateTime,
    Char,
    Guid,
}

impl ValueKind {
    pub const ALL: [ValueKind; 12] = [
        ValueKind::String,
        ValueKind::Int16,
        ValueKind::Int32,
        ValueKind::Int64,
        ValueKind::Byte,
        ValueKind::Double,
        ValueKind::Float,
        ValueKind::Decimal,
        ValueKind::Bool,
        ValueKind::DateTime,
        ValueKind::Char,
        ValueKind::Guid,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::Int16 => "int16",
            ValueKind::Int32 => "int32",
            ValueKind::Int64 => "int64",
            ValueKind::Byte => "byte",
            ValueKind::Double => "double",
            ValueKind::Float => "float",
            ValueKind::Decimal => "decimal",
            ValueKind::Bool => "bool",
            ValueKind::DateTime => "datetime",
            ValueKind::Char => "char",
            ValueKind::Guid => "guid",
        }
    }

    /// Parse a kind name, case-insensitively. Accepts a few common aliases.
    pub fn parse(name: &str) -> Option<ValueKind> {
        let lower = name.trim().to_ascii_lowercase();
        let kind = match lower.as_str() {
            "string" | "str" | "text" => ValueKind::String,
            "int16" | "i16" | "short" => ValueKind::Int16,
            "int32" | "i32" | "int" => ValueKind::Int32,
            "int64" | "i64" | "long" => ValueKind::Int64,
            "byte" | "u8" => ValueKind::Byte,
            "double" | "f64" => ValueKind::Double,
            "float" | "f32" | "single" => ValueKind::Float,
            "decimal" | "number" | "numeric" => ValueKind::Decimal,
            "bool" | "boolean" => ValueKind::Bool,
            "datetime" | "date" | "timestamp" => ValueKind::DateTime,
            "char" => ValueKind::Char,
            "guid" | "uuid" => ValueKind::Guid,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Typed value produced by conversion, bound as a parameter, or built by
/// an item reader.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    String(String),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Byte(u8),
    Double(f64),
    Float(f32),
    Decimal(Decimal),
    Bool(bool),
    DateTime(NaiveDateTime),
    Char(char),
    Guid(Uuid),
    /// A full untyped row.
    Record(DataRecord),
    /// Rows of a nested table-part column.
    Table(Vec<DataRecord>),
    /// Output of a projection or a typed mapping.
    Struct(StructValue),
}

impl Value {
    pub fn kind(&self) -> Option<ValueKind> {
        let kind = match self {
            Value::String(_) => ValueKind::String,
            Value::Int16(_) => ValueKind::Int16,
            Value::Int32(_) => ValueKind::Int32,
            Value::Int64(_) => ValueKind::Int64,
            Value::Byte(_) => ValueKind::Byte,
            Value::Double(_) => ValueKind::Double,
            Value::Float(_) => ValueKind::Float,
            Value::Decimal(_) => ValueKind::Decimal,
            Value::Bool(_) => ValueKind::Bool,
            Value::DateTime(_) => ValueKind::DateTime,
            Value::Char(_) => ValueKind::Char,
            Value::Guid(_) => ValueKind::Guid,
            Value::Null | Value::Record(_) | Value::Table(_) | Value::Struct(_) => return None,
        };
        Some(kind)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Any integer variant widened to i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int16(i) => Some(*i as i64),
            Value::Int32(i) => Some(*i as i64),
            Value::Int64(i) => Some(*i),
            Value::Byte(b) => Some(*b as i64),
            Value::Decimal(d) if d.fract().is_zero() => d.to_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(f) => Some(*f),
            Value::Float(f) => Some(*f as f64),
            Value::Decimal(d) => d.to_f64(),
            other => other.as_i64().map(|i| i as f64),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&DataRecord> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructValue> {
        match self {
            Value::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&[DataRecord]> {
        match self {
            Value::Table(rows) => Some(rows),
            _ => None,
        }
    }

    pub fn display(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::String(s) => s.clone(),
            Value::Int16(i) => i.to_string(),
            Value::Int32(i) => i.to_string(),
            Value::Int64(i) => i.to_string(),
            Value::Byte(b) => b.to_string(),
            Value::Double(f) => f.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Decimal(d) => d.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::DateTime(dt) => dt.to_string(),
            Value::Char(c) => c.to_string(),
            Value::Guid(g) => g.to_string(),
            Value::Record(r) => r.display(),
            Value::Table(rows) => format!("[{} rows]", rows.len()),
            Value::Struct(s) => s.display(),
        }
    }

    pub fn display_width(&self) -> usize {
        unicode_width::UnicodeWidthStr::width(self.display().as_str())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int32(i)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int64(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::DateTime(dt)
    }
}

/// A row of an untyped records query. Field names are shared by every row
/// read from the same result.
#[derive(Debug, Clone, PartialEq)]
pub struct DataRecord {
    names: Arc<[String]>,
    values: Vec<Value>,
}

impl DataRecord {
    pub fn new(names: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { names, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn value(&self, ordinal: usize) -> Option<&Value> {
        self.values.get(ordinal)
    }

    /// Field names compare case-insensitively.
    pub fn get(&self, name: &str) -> Option<&Value> {
        let wanted = name.to_lowercase();
        self.names
            .iter()
            .position(|n| n.to_lowercase() == wanted)
            .and_then(|i| self.values.get(i))
    }

    pub fn display(&self) -> String {
        let parts: Vec<String> = self
            .names
            .iter()
            .zip(&self.values)
            .map(|(n, v)| format!("{}: {}", n, v.display()))
            .collect();
        format!("{{{}}}", parts.join(", "))
    }
}

/// A value with a fixed, named shape.
#[derive(Debug, Clone, PartialEq)]
pub struct StructValue {
    pub type_name: String,
    pub fields: Vec<(String, Value)>,
}

impl StructValue {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn display(&self) -> String {
        let parts: Vec<String> = self
            .fields
            .iter()
            .map(|(n, v)| format!("{}: {}", n, v.display()))
            .collect();
        format!("{} {{{}}}", self.type_name, parts.join(", "))
    }
}
