//! In-memory command executor over named tables.
//!
//! Tables are built in code or loaded from a JSON fixture:
//!
//! ```json
//! {
//!   "Goods": {
//!     "columns": [{ "name": "Name", "type": "string" }],
//!     "rows": [["Tea"], ["Coffee"]]
//!   }
//! }
//! ```
//!
//! A column whose type resolves to a table takes a nested table object
//! (same shape) in every cell.
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Context};
use chrono::NaiveDateTime;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use super::convert::{parse_datetime, DefaultFieldTypeResolver, FieldKind, FieldTypeResolver};
use super::source::{ColumnInfo, CommandExecutor, RawValue, RowCursor, TabularResult};
use super::statement::{read_command, SelectPlan};
use crate::error::{Error, Result};
use crate::sql::SqlCommand;
use crate::value::{Value, ValueKind};

#[derive(Debug, Clone, PartialEq)]
pub enum MemoryValue {
    Null,
    Bool(bool),
    Number(Decimal),
    String(String),
    Date(NaiveDateTime),
    Table(Arc<MemoryTable>),
}

static NULL: MemoryValue = MemoryValue::Null;

impl MemoryValue {
    fn to_raw(&self) -> RawValue {
        match self {
            MemoryValue::Null => RawValue::Null,
            MemoryValue::Bool(b) => RawValue::Bool(*b),
            MemoryValue::Number(n) => RawValue::Number(*n),
            MemoryValue::String(s) => RawValue::String(s.clone()),
            MemoryValue::Date(d) => RawValue::Date(*d),
            MemoryValue::Table(t) => RawValue::Table(Box::new(MemoryResult::new(t.clone()))),
        }
    }

    /// Equality against a bound parameter value.
    fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (MemoryValue::Null, Value::Null) => true,
            (MemoryValue::Bool(a), Value::Bool(b)) => a == b,
            (MemoryValue::String(a), Value::String(b)) => a == b,
            (MemoryValue::String(a), Value::Char(c)) => {
                let mut chars = a.chars();
                chars.next() == Some(*c) && chars.next().is_none()
            }
            (MemoryValue::Date(a), Value::DateTime(b)) => a == b,
            (MemoryValue::Date(a), Value::String(s)) => parse_datetime(s) == Some(*a),
            (MemoryValue::Number(a), Value::String(s)) => {
                Decimal::from_str(s.trim()).map_or(false, |b| *a == b)
            }
            (MemoryValue::Number(a), other) => as_decimal(other).map_or(false, |b| *a == b),
            _ => false,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            MemoryValue::Null => 0,
            MemoryValue::Bool(_) => 1,
            MemoryValue::Number(_) => 2,
            MemoryValue::Date(_) => 3,
            MemoryValue::String(_) => 4,
            MemoryValue::Table(_) => 5,
        }
    }

    /// Sort order: nulls first, then by value within a variant.
    fn compare(&self, other: &MemoryValue) -> Ordering {
        match (self, other) {
            (MemoryValue::Bool(a), MemoryValue::Bool(b)) => a.cmp(b),
            (MemoryValue::Number(a), MemoryValue::Number(b)) => a.cmp(b),
            (MemoryValue::Date(a), MemoryValue::Date(b)) => a.cmp(b),
            (MemoryValue::String(a), MemoryValue::String(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

fn as_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Int16(v) => Some(Decimal::from(*v)),
        Value::Int32(v) => Some(Decimal::from(*v)),
        Value::Int64(v) => Some(Decimal::from(*v)),
        Value::Byte(v) => Some(Decimal::from(*v)),
        Value::Decimal(v) => Some(*v),
        Value::Double(v) => Decimal::from_f64(*v),
        Value::Float(v) => Decimal::from_f32(*v),
        _ => None,
    }
}

impl From<&str> for MemoryValue {
    fn from(s: &str) -> Self {
        MemoryValue::String(s.to_string())
    }
}

impl From<i64> for MemoryValue {
    fn from(n: i64) -> Self {
        MemoryValue::Number(Decimal::from(n))
    }
}

impl From<Decimal> for MemoryValue {
    fn from(n: Decimal) -> Self {
        MemoryValue::Number(n)
    }
}

impl From<bool> for MemoryValue {
    fn from(b: bool) -> Self {
        MemoryValue::Bool(b)
    }
}

impl From<NaiveDateTime> for MemoryValue {
    fn from(d: NaiveDateTime) -> Self {
        MemoryValue::Date(d)
    }
}

impl From<MemoryTable> for MemoryValue {
    fn from(t: MemoryTable) -> Self {
        MemoryValue::Table(Arc::new(t))
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MemoryTable {
    pub columns: Vec<ColumnInfo>,
    pub rows: Vec<Vec<MemoryValue>>,
}

impl MemoryTable {
    /// Empty table with `(name, type)` columns.
    pub fn new<N: Into<String>, T: Into<String>>(
        columns: impl IntoIterator<Item = (N, T)>,
    ) -> Self {
        Self {
            columns: columns
                .into_iter()
                .map(|(n, t)| ColumnInfo::new(n, t))
                .collect(),
            rows: Vec::new(),
        }
    }

    pub fn with_row(mut self, row: Vec<MemoryValue>) -> Self {
        self.push_row(row);
        self
    }

    /// Rows shorter than the column list read as null in the missing cells.
    pub fn push_row(&mut self, row: Vec<MemoryValue>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_result(self) -> Box<dyn TabularResult> {
        Box::new(MemoryResult::new(Arc::new(self)))
    }

    fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::Source(format!("unknown column {}", name)))
    }

    /// Apply the equals filter, the stable sort and the projection.
    pub fn query(&self, plan: &SelectPlan) -> Result<MemoryTable> {
        let mut rows: Vec<&Vec<MemoryValue>> = self.rows.iter().collect();

        if let Some(filter) = &plan.filter {
            let i = self.column_index(&filter.column)?;
            rows.retain(|row| cell(row, i).matches(&filter.value));
        }

        if !plan.order_by.is_empty() {
            let keys = plan
                .order_by
                .iter()
                .map(|k| Ok((self.column_index(&k.column)?, k.direction)))
                .collect::<Result<Vec<_>>>()?;
            rows.sort_by(|a, b| {
                keys.iter()
                    .map(|(i, direction)| {
                        let ordering = cell(a, *i).compare(cell(b, *i));
                        if direction.is_descending() {
                            ordering.reverse()
                        } else {
                            ordering
                        }
                    })
                    .find(|o| o.is_ne())
                    .unwrap_or(Ordering::Equal)
            });
        }

        let projection: Vec<usize> = match &plan.columns {
            None => (0..self.columns.len()).collect(),
            Some(names) => names
                .iter()
                .map(|n| self.column_index(n))
                .collect::<Result<_>>()?,
        };

        Ok(MemoryTable {
            columns: projection.iter().map(|&i| self.columns[i].clone()).collect(),
            rows: rows
                .into_iter()
                .map(|row| projection.iter().map(|&i| cell(row, i).clone()).collect())
                .collect(),
        })
    }
}

fn cell(row: &[MemoryValue], ordinal: usize) -> &MemoryValue {
    row.get(ordinal).unwrap_or(&NULL)
}

#[derive(Debug, Clone)]
pub struct MemoryResult {
    table: Arc<MemoryTable>,
}

impl MemoryResult {
    pub fn new(table: Arc<MemoryTable>) -> Self {
        Self { table }
    }
}

impl TabularResult for MemoryResult {
    fn columns(&self) -> Result<Vec<ColumnInfo>> {
        Ok(self.table.columns.clone())
    }

    fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    fn choose(&self) -> Result<Box<dyn RowCursor>> {
        Ok(Box::new(MemoryCursor {
            table: self.table.clone(),
            position: None,
        }))
    }
}

#[derive(Debug)]
pub struct MemoryCursor {
    table: Arc<MemoryTable>,
    position: Option<usize>,
}

impl RowCursor for MemoryCursor {
    fn next(&mut self) -> Result<bool> {
        let next = self.position.map_or(0, |p| p + 1);
        if next < self.table.rows.len() {
            self.position = Some(next);
            Ok(true)
        } else {
            self.position = Some(self.table.rows.len());
            Ok(false)
        }
    }

    fn get(&self, ordinal: usize) -> Result<RawValue> {
        let row = self
            .position
            .and_then(|p| self.table.rows.get(p))
            .ok_or_else(|| Error::Source("cursor is not positioned on a row".into()))?;
        let count = self.table.columns.len();
        if ordinal >= count {
            return Err(Error::FieldOutOfRange { ordinal, count });
        }
        Ok(cell(row, ordinal).to_raw())
    }
}

/// Named tables queried through compiled command text.
#[derive(Debug, Default)]
pub struct MemoryExecutor {
    tables: HashMap<String, Arc<MemoryTable>>,
    executed: Mutex<Vec<SqlCommand>>,
}

impl MemoryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, name: &str, table: MemoryTable) -> Self {
        self.insert(name, table);
        self
    }

    /// Source names are matched case-insensitively.
    pub fn insert(&mut self, name: &str, table: MemoryTable) {
        self.tables.insert(name.to_lowercase(), Arc::new(table));
    }

    pub fn table(&self, name: &str) -> Option<&MemoryTable> {
        self.tables.get(&name.to_lowercase()).map(|t| t.as_ref())
    }

    /// Commands executed so far, oldest first.
    pub fn executed(&self) -> Vec<SqlCommand> {
        self.executed
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let fixtures: HashMap<String, TableFixture> =
            serde_json::from_str(json).context("Invalid fixture JSON")?;
        let resolver = DefaultFieldTypeResolver;
        let mut executor = Self::new();
        for (name, fixture) in fixtures {
            let table = fixture
                .into_table(&resolver)
                .with_context(|| format!("Invalid table {}", name))?;
            executor.insert(&name, table);
        }
        Ok(executor)
    }

    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_json_str(&content)
    }
}

impl CommandExecutor for MemoryExecutor {
    fn execute(&self, command: &SqlCommand) -> Result<Box<dyn TabularResult>> {
        debug!(
            text = %command.text,
            parameters = command.parameters.len(),
            "executing in-memory command"
        );
        if let Ok(mut log) = self.executed.lock() {
            log.push(command.clone());
        }
        let plan = read_command(command)?;
        let table = self
            .tables
            .get(&plan.source.to_lowercase())
            .ok_or_else(|| Error::Source(format!("unknown source {}", plan.source)))?;
        Ok(table.query(&plan)?.into_result())
    }
}

#[derive(Debug, Deserialize)]
struct TableFixture {
    columns: Vec<ColumnInfo>,
    #[serde(default)]
    rows: Vec<Vec<serde_json::Value>>,
}

impl TableFixture {
    fn into_table(self, resolver: &dyn FieldTypeResolver) -> anyhow::Result<MemoryTable> {
        let kinds: Vec<FieldKind> = self
            .columns
            .iter()
            .map(|c| resolver.resolve(&c.type_name))
            .collect();
        let mut rows = Vec::with_capacity(self.rows.len());
        for (index, row) in self.rows.into_iter().enumerate() {
            if row.len() != self.columns.len() {
                bail!(
                    "row {} has {} cells, expected {}",
                    index,
                    row.len(),
                    self.columns.len()
                );
            }
            let cells = row
                .into_iter()
                .zip(&self.columns)
                .zip(&kinds)
                .map(|((value, column), kind)| {
                    fixture_cell(value, *kind, resolver)
                        .with_context(|| format!("row {}, column {}", index, column.name))
                })
                .collect::<anyhow::Result<Vec<_>>>()?;
            rows.push(cells);
        }
        Ok(MemoryTable {
            columns: self.columns,
            rows,
        })
    }
}

fn fixture_cell(
    value: serde_json::Value,
    kind: FieldKind,
    resolver: &dyn FieldTypeResolver,
) -> anyhow::Result<MemoryValue> {
    use serde_json::Value as Json;
    Ok(match (value, kind) {
        (Json::Null, _) => MemoryValue::Null,
        (value @ Json::Object(_), FieldKind::Table) => {
            let fixture: TableFixture = serde_json::from_value(value)?;
            MemoryValue::from(fixture.into_table(resolver)?)
        }
        (_, FieldKind::Table) => bail!("expected a nested table object"),
        (Json::String(s), FieldKind::Scalar(ValueKind::DateTime)) => MemoryValue::Date(
            parse_datetime(&s).ok_or_else(|| anyhow!("invalid date {:?}", s))?,
        ),
        (Json::Bool(b), _) => MemoryValue::Bool(b),
        (Json::Number(n), _) => {
            let text = n.to_string();
            MemoryValue::Number(
                Decimal::from_str(&text)
                    .or_else(|_| Decimal::from_scientific(&text))
                    .with_context(|| format!("invalid number {}", text))?,
            )
        }
        (Json::String(s), _) => MemoryValue::String(s),
        (Json::Array(_) | Json::Object(_), _) => bail!("nested values need a table column"),
    })
}
