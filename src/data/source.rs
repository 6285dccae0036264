//! Contracts of the external data source.
//!
//! The compiler and the reader only ever talk to a source through these
//! traits: an executor that runs a command, the tabular result it returns,
//! and the forward-only row cursor chosen from that result.
use std::fmt;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::sql::SqlCommand;

/// A value as the external source hands it out, before conversion.
pub enum RawValue {
    Null,
    Bool(bool),
    Number(Decimal),
    String(String),
    Date(NaiveDateTime),
    /// A nested tabular value (table-part column).
    Table(Box<dyn TabularResult>),
}

impl RawValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            RawValue::Null => "null",
            RawValue::Bool(_) => "bool",
            RawValue::Number(_) => "number",
            RawValue::String(_) => "string",
            RawValue::Date(_) => "date",
            RawValue::Table(_) => "table",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }
}

impl fmt::Debug for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Null => write!(f, "Null"),
            RawValue::Bool(b) => write!(f, "Bool({})", b),
            RawValue::Number(n) => write!(f, "Number({})", n),
            RawValue::String(s) => write!(f, "String({:?})", s),
            RawValue::Date(d) => write!(f, "Date({})", d),
            RawValue::Table(_) => write!(f, "Table(..)"),
        }
    }
}

/// Column metadata of a tabular result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    /// External type descriptor, resolved by a [`FieldTypeResolver`].
    ///
    /// [`FieldTypeResolver`]: super::FieldTypeResolver
    #[serde(rename = "type")]
    pub type_name: String,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// Result of an executed command. Dropping it releases the native handle.
pub trait TabularResult: Send {
    fn columns(&self) -> Result<Vec<ColumnInfo>>;

    fn is_empty(&self) -> bool;

    /// Open a forward-only cursor over the rows.
    fn choose(&self) -> Result<Box<dyn RowCursor>>;
}

/// Forward-only row cursor: `next` advances, `get` reads the current row.
pub trait RowCursor: Send {
    fn next(&mut self) -> Result<bool>;

    fn get(&self, ordinal: usize) -> Result<RawValue>;

    /// Grouping level of the current row in a hierarchical result.
    fn level(&self) -> Option<usize> {
        None
    }
}

/// Runs compiled commands against the external source.
pub trait CommandExecutor {
    fn execute(&self, command: &SqlCommand) -> Result<Box<dyn TabularResult>>;
}

impl<E: CommandExecutor + ?Sized> CommandExecutor for &E {
    fn execute(&self, command: &SqlCommand) -> Result<Box<dyn TabularResult>> {
        (**self).execute(command)
    }
}
