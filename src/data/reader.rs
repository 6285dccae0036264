//! Forward-only reader over an executed tabular result.
//!
//! ```text
//!   Bof ──read()──► Row ──read()──► Row ... ──read()──► Eof
//!    │               │                                   │
//!    └───────────────┴──────────── close() ──────────────┴──► Closed
//! ```
//!
//! Row access is only legal in `Row`; metadata access is legal until the
//! reader is closed. Table-part columns come back as nested readers one
//! level deeper, scoped to the parent row that produced them.
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use tracing::{debug, trace};
use uuid::Uuid;

use super::convert::{
    DefaultFieldTypeResolver, DefaultValueConverter, FieldKind, FieldTypeResolver, ValueConverter,
};
use super::field::{FieldSet, LazyFields};
use super::source::{ColumnInfo, RawValue, RowCursor, TabularResult};
use crate::config::NestedReaderPolicy;
use crate::error::{Error, Result};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    Bof,
    Row,
    Eof,
    Closed,
}

impl fmt::Display for ReaderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReaderState::Bof => write!(f, "Bof"),
            ReaderState::Row => write!(f, "Row"),
            ReaderState::Eof => write!(f, "Eof"),
            ReaderState::Closed => write!(f, "Closed"),
        }
    }
}

/// Collaborators shared by a reader and every nested reader it opens.
#[derive(Clone)]
pub struct ReaderContext {
    pub converter: Arc<dyn ValueConverter>,
    pub resolver: Arc<dyn FieldTypeResolver>,
    pub policy: NestedReaderPolicy,
}

impl ReaderContext {
    pub fn new(
        converter: Arc<dyn ValueConverter>,
        resolver: Arc<dyn FieldTypeResolver>,
        policy: NestedReaderPolicy,
    ) -> Self {
        Self {
            converter,
            resolver,
            policy,
        }
    }

    pub fn with_policy(mut self, policy: NestedReaderPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl Default for ReaderContext {
    fn default() -> Self {
        Self::new(
            Arc::new(DefaultValueConverter),
            Arc::new(DefaultFieldTypeResolver),
            NestedReaderPolicy::default(),
        )
    }
}

impl fmt::Debug for ReaderContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderContext")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Marks one parent row. Expired when the parent moves off the row.
#[derive(Debug, Clone)]
struct RowToken(Arc<AtomicBool>);

impl RowToken {
    fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    fn is_current(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn expire(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Value of one field of the current row.
#[derive(Debug)]
pub enum FieldValue {
    Value(Value),
    /// Table-part column.
    Reader(DataReader),
}

impl FieldValue {
    pub fn into_value(self) -> Option<Value> {
        match self {
            FieldValue::Value(v) => Some(v),
            FieldValue::Reader(_) => None,
        }
    }

    pub fn into_reader(self) -> Option<DataReader> {
        match self {
            FieldValue::Reader(r) => Some(r),
            FieldValue::Value(_) => None,
        }
    }
}

type CloseCallback = Box<dyn FnOnce() + Send>;

pub struct DataReader {
    result: Option<Box<dyn TabularResult>>,
    cursor: Option<Box<dyn RowCursor>>,
    state: ReaderState,
    depth: usize,
    fields: LazyFields,
    context: ReaderContext,
    row: Option<RowToken>,
    parent_row: Option<RowToken>,
    on_close: Option<CloseCallback>,
    closed: bool,
}

impl fmt::Debug for DataReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataReader")
            .field("state", &self.state)
            .field("depth", &self.depth)
            .field("fields_loaded", &self.fields.is_loaded())
            .finish()
    }
}

impl DataReader {
    /// Top-level reader; takes ownership of the result until closed.
    pub fn new(result: Box<dyn TabularResult>, context: ReaderContext) -> Self {
        Self::with_depth(result, context, 0, None)
    }

    /// Reader over a table-part value already taken out of its row; it is
    /// not tied to the parent row's lifetime.
    pub(crate) fn detached(
        result: Box<dyn TabularResult>,
        context: ReaderContext,
        depth: usize,
    ) -> Self {
        Self::with_depth(result, context, depth, None)
    }

    fn with_depth(
        result: Box<dyn TabularResult>,
        context: ReaderContext,
        depth: usize,
        parent_row: Option<RowToken>,
    ) -> Self {
        Self {
            result: Some(result),
            cursor: None,
            state: ReaderState::Bof,
            depth,
            fields: LazyFields::default(),
            context,
            row: None,
            parent_row,
            on_close: None,
            closed: false,
        }
    }

    /// Run `callback` once when the reader is closed or dropped.
    pub fn on_close(mut self, callback: impl FnOnce() + Send + 'static) -> Self {
        self.on_close = Some(Box::new(callback));
        self
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    /// Nesting depth; 0 for a top-level reader.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn context(&self) -> &ReaderContext {
        &self.context
    }

    pub fn has_rows(&self) -> Result<bool> {
        self.ensure_open("has_rows")?;
        Ok(!self.result("has_rows")?.is_empty())
    }

    /// Field metadata, loaded from the result on first access.
    pub fn fields(&mut self) -> Result<Arc<FieldSet>> {
        self.ensure_open("fields")?;
        let result = self.result.as_deref().ok_or(Error::InvalidCursorState {
            operation: "fields",
            state: self.state.to_string(),
        })?;
        let resolver = self.context.resolver.clone();
        self.fields
            .get_or_load(|| Ok(FieldSet::new(result.columns()?, resolver.as_ref())))
    }

    pub fn field_count(&mut self) -> Result<usize> {
        Ok(self.fields()?.len())
    }

    pub fn name(&mut self, ordinal: usize) -> Result<String> {
        Ok(self.fields()?.get(ordinal)?.name.clone())
    }

    pub fn ordinal(&mut self, name: &str) -> Result<usize> {
        self.fields()?.ordinal(name)
    }

    pub fn field_kind(&mut self, ordinal: usize) -> Result<FieldKind> {
        Ok(self.fields()?.get(ordinal)?.kind)
    }

    /// External type descriptor of a field.
    pub fn data_type_name(&mut self, ordinal: usize) -> Result<String> {
        Ok(self.fields()?.get(ordinal)?.type_name.clone())
    }

    /// Advance to the next row. Returns false once the rows are exhausted;
    /// reading again after that is an error.
    pub fn read(&mut self) -> Result<bool> {
        self.ensure_open("read")?;
        let has_row = match self.state {
            ReaderState::Bof => {
                let result = self.result("read")?;
                if result.is_empty() {
                    false
                } else {
                    let mut cursor = result.choose()?;
                    let has_row = cursor.next()?;
                    self.cursor = Some(cursor);
                    has_row
                }
            }
            ReaderState::Row => self.cursor_mut("read")?.next()?,
            ReaderState::Eof | ReaderState::Closed => {
                return Err(self.invalid_state("read"));
            }
        };
        self.advance(has_row);
        Ok(has_row)
    }

    fn advance(&mut self, has_row: bool) {
        if let Some(row) = self.row.take() {
            row.expire();
        }
        let from = self.state;
        if has_row {
            self.state = ReaderState::Row;
            self.row = Some(RowToken::new());
        } else {
            self.state = ReaderState::Eof;
        }
        trace!(depth = self.depth, %from, to = %self.state, "reader advanced");
    }

    /// Grouping level of the current row, when the source reports one.
    pub fn level(&self) -> Result<Option<usize>> {
        self.ensure_row("level")?;
        Ok(self.cursor("level")?.level())
    }

    /// Converted value of a field; table-part fields yield a nested reader.
    pub fn value(&mut self, ordinal: usize) -> Result<FieldValue> {
        self.ensure_row("value")?;
        let fields = self.fields()?;
        let field = fields.get(ordinal)?;
        let raw = self.cursor("value")?.get(ordinal)?;
        match field.converter() {
            Some(convert) => convert(self.context.converter.as_ref(), &raw).map(FieldValue::Value),
            None => self.nested(raw),
        }
    }

    pub fn value_by_name(&mut self, name: &str) -> Result<FieldValue> {
        self.ensure_row("value_by_name")?;
        let ordinal = self.ordinal(name)?;
        self.value(ordinal)
    }

    fn nested(&self, raw: RawValue) -> Result<FieldValue> {
        match raw {
            RawValue::Table(result) => {
                trace!(depth = self.depth + 1, "opening nested reader");
                Ok(FieldValue::Reader(DataReader::with_depth(
                    result,
                    self.context.clone(),
                    self.depth + 1,
                    self.row.clone(),
                )))
            }
            RawValue::Null => Ok(FieldValue::Value(Value::Null)),
            other => Err(Error::conversion(FieldKind::Table, &other)),
        }
    }

    /// Unconverted value of a field.
    pub fn raw_value(&mut self, ordinal: usize) -> Result<RawValue> {
        self.ensure_row("raw_value")?;
        let count = self.field_count()?;
        if ordinal >= count {
            return Err(Error::FieldOutOfRange { ordinal, count });
        }
        self.cursor("raw_value")?.get(ordinal)
    }

    /// All unconverted values of the current row, in field order.
    pub fn raw_values(&mut self) -> Result<Vec<RawValue>> {
        self.ensure_row("raw_values")?;
        let count = self.field_count()?;
        let cursor = self.cursor("raw_values")?;
        (0..count).map(|i| cursor.get(i)).collect()
    }

    pub fn is_null(&mut self, ordinal: usize) -> Result<bool> {
        Ok(self.raw_value(ordinal)?.is_null())
    }

    fn typed<T>(
        &mut self,
        ordinal: usize,
        operation: &'static str,
        convert: impl FnOnce(&dyn ValueConverter, &RawValue) -> Result<T>,
    ) -> Result<T> {
        self.ensure_row(operation)?;
        let raw = self.raw_value(ordinal)?;
        convert(self.context.converter.as_ref(), &raw)
    }

    pub fn get_string(&mut self, ordinal: usize) -> Result<String> {
        self.typed(ordinal, "get_string", |c, raw| c.to_text(raw))
    }

    pub fn get_int16(&mut self, ordinal: usize) -> Result<i16> {
        self.typed(ordinal, "get_int16", |c, raw| c.to_int16(raw))
    }

    pub fn get_int32(&mut self, ordinal: usize) -> Result<i32> {
        self.typed(ordinal, "get_int32", |c, raw| c.to_int32(raw))
    }

    pub fn get_int64(&mut self, ordinal: usize) -> Result<i64> {
        self.typed(ordinal, "get_int64", |c, raw| c.to_int64(raw))
    }

    pub fn get_byte(&mut self, ordinal: usize) -> Result<u8> {
        self.typed(ordinal, "get_byte", |c, raw| c.to_byte(raw))
    }

    pub fn get_double(&mut self, ordinal: usize) -> Result<f64> {
        self.typed(ordinal, "get_double", |c, raw| c.to_double(raw))
    }

    pub fn get_float(&mut self, ordinal: usize) -> Result<f32> {
        self.typed(ordinal, "get_float", |c, raw| c.to_float(raw))
    }

    pub fn get_decimal(&mut self, ordinal: usize) -> Result<Decimal> {
        self.typed(ordinal, "get_decimal", |c, raw| c.to_decimal(raw))
    }

    pub fn get_bool(&mut self, ordinal: usize) -> Result<bool> {
        self.typed(ordinal, "get_bool", |c, raw| c.to_bool(raw))
    }

    pub fn get_datetime(&mut self, ordinal: usize) -> Result<NaiveDateTime> {
        self.typed(ordinal, "get_datetime", |c, raw| c.to_datetime(raw))
    }

    pub fn get_char(&mut self, ordinal: usize) -> Result<char> {
        self.typed(ordinal, "get_char", |c, raw| c.to_char(raw))
    }

    pub fn get_guid(&mut self, _ordinal: usize) -> Result<Uuid> {
        Err(Error::NotImplementedFeature("get_guid"))
    }

    pub fn get_bytes(&mut self, _ordinal: usize, _offset: usize, _buf: &mut [u8]) -> Result<usize> {
        Err(Error::NotImplementedFeature("get_bytes"))
    }

    pub fn get_chars(
        &mut self,
        _ordinal: usize,
        _offset: usize,
        _buf: &mut [char],
    ) -> Result<usize> {
        Err(Error::NotImplementedFeature("get_chars"))
    }

    pub fn schema_table(&self) -> Result<Vec<ColumnInfo>> {
        Err(Error::NotImplementedFeature("schema_table"))
    }

    /// Release the cursor and the result. Safe to call more than once; the
    /// close callback fires on the first call only.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let from = self.state;
        self.state = ReaderState::Closed;
        if let Some(row) = self.row.take() {
            row.expire();
        }
        self.cursor = None;
        self.result = None;
        debug!(depth = self.depth, %from, "reader closed");
        if let Some(callback) = self.on_close.take() {
            callback();
        }
    }

    fn ensure_open(&self, operation: &'static str) -> Result<()> {
        if self.closed {
            return Err(self.invalid_state(operation));
        }
        if let (NestedReaderPolicy::Invalidate, Some(parent)) =
            (self.context.policy, &self.parent_row)
        {
            if !parent.is_current() {
                return Err(Error::InvalidCursorState {
                    operation,
                    state: format!("{} (parent row is no longer current)", self.state),
                });
            }
        }
        Ok(())
    }

    fn ensure_row(&self, operation: &'static str) -> Result<()> {
        self.ensure_open(operation)?;
        if self.state != ReaderState::Row {
            return Err(self.invalid_state(operation));
        }
        Ok(())
    }

    fn invalid_state(&self, operation: &'static str) -> Error {
        Error::InvalidCursorState {
            operation,
            state: self.state.to_string(),
        }
    }

    fn result(&self, operation: &'static str) -> Result<&dyn TabularResult> {
        self.result
            .as_deref()
            .ok_or_else(|| self.invalid_state(operation))
    }

    fn cursor(&self, operation: &'static str) -> Result<&dyn RowCursor> {
        self.cursor
            .as_deref()
            .ok_or_else(|| self.invalid_state(operation))
    }

    fn cursor_mut(&mut self, operation: &'static str) -> Result<&mut Box<dyn RowCursor>> {
        let state = self.state;
        self.cursor.as_mut().ok_or(Error::InvalidCursorState {
            operation,
            state: state.to_string(),
        })
    }
}

impl Drop for DataReader {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::memory::{MemoryTable, MemoryValue};
    use crate::error::ErrorKind;
    use crate::value::ValueKind;
    use std::sync::atomic::AtomicUsize;

    struct CountingResult {
        inner: Box<dyn TabularResult>,
        drops: Arc<AtomicUsize>,
    }

    impl TabularResult for CountingResult {
        fn columns(&self) -> Result<Vec<ColumnInfo>> {
            self.inner.columns()
        }

        fn is_empty(&self) -> bool {
            self.inner.is_empty()
        }

        fn choose(&self) -> Result<Box<dyn RowCursor>> {
            self.inner.choose()
        }
    }

    impl Drop for CountingResult {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn goods(rows: usize) -> MemoryTable {
        let mut table = MemoryTable::new([("Name", "string"), ("Qty", "int32")]);
        for i in 0..rows {
            table.push_row(vec![
                MemoryValue::from(format!("item{}", i).as_str()),
                MemoryValue::from(i as i64),
            ]);
        }
        table
    }

    fn orders() -> MemoryTable {
        let lines = |n: i64| {
            let mut t = MemoryTable::new([("Line", "int32")]);
            for i in 0..n {
                t.push_row(vec![MemoryValue::from(i + 1)]);
            }
            MemoryValue::from(t)
        };
        MemoryTable::new([("Number", "string"), ("Total", "decimal"), ("Lines", "table")])
            .with_row(vec!["A-1".into(), MemoryValue::from(10i64), lines(2)])
            .with_row(vec!["A-2".into(), MemoryValue::from(20i64), lines(3)])
    }

    fn reader(table: MemoryTable) -> DataReader {
        DataReader::new(table.into_result(), ReaderContext::default())
    }

    fn counting(table: MemoryTable) -> (DataReader, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let drops = Arc::new(AtomicUsize::new(0));
        let closes = Arc::new(AtomicUsize::new(0));
        let result = CountingResult {
            inner: table.into_result(),
            drops: drops.clone(),
        };
        let counter = closes.clone();
        let reader = DataReader::new(Box::new(result), ReaderContext::default()).on_close(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (reader, drops, closes)
    }

    #[test]
    fn test_read_returns_true_n_times() {
        for n in [0, 1, 3] {
            let mut r = reader(goods(n));
            let mut count = 0;
            while r.read().unwrap() {
                count += 1;
            }
            assert_eq!(count, n);
            assert_eq!(r.state(), ReaderState::Eof);
            assert_eq!(r.read().unwrap_err().kind(), ErrorKind::InvalidCursorState);
            assert_eq!(r.value(0).unwrap_err().kind(), ErrorKind::InvalidCursorState);
        }
    }

    #[test]
    fn test_empty_result_goes_straight_to_eof() {
        let mut r = reader(goods(0));
        assert!(!r.has_rows().unwrap());
        assert!(!r.read().unwrap());
        assert_eq!(r.state(), ReaderState::Eof);
        // Metadata stays available after the rows run out.
        assert_eq!(r.field_count().unwrap(), 2);
    }

    #[test]
    fn test_row_access_requires_row_state() {
        let mut r = reader(goods(1));
        assert_eq!(r.state(), ReaderState::Bof);
        assert_eq!(r.value(0).unwrap_err().kind(), ErrorKind::InvalidCursorState);
        assert_eq!(r.get_string(0).unwrap_err().kind(), ErrorKind::InvalidCursorState);
        assert_eq!(r.name(1).unwrap(), "Qty");
    }

    #[test]
    fn test_values_are_converted_per_field() {
        let mut r = reader(goods(2));
        assert!(r.read().unwrap());
        assert!(r.read().unwrap());
        assert_eq!(
            r.value(0).unwrap().into_value(),
            Some(Value::String("item1".into()))
        );
        assert_eq!(r.value_by_name("qty").unwrap().into_value(), Some(Value::Int32(1)));
        assert_eq!(r.get_int64(1).unwrap(), 1);
        assert_eq!(r.get_string(1).unwrap(), "1");
        assert_eq!(r.field_kind(1).unwrap(), FieldKind::Scalar(ValueKind::Int32));
        assert_eq!(r.data_type_name(0).unwrap(), "string");
        assert!(!r.is_null(0).unwrap());
    }

    #[test]
    fn test_bad_ordinal_and_name() {
        let mut r = reader(goods(1));
        r.read().unwrap();
        assert_eq!(r.value(5).unwrap_err().kind(), ErrorKind::OutOfRange);
        assert_eq!(r.value_by_name("Price").unwrap_err().kind(), ErrorKind::OutOfRange);
        assert_eq!(r.raw_value(2).unwrap_err().kind(), ErrorKind::OutOfRange);
    }

    #[test]
    fn test_not_implemented_stubs() {
        let mut r = reader(goods(1));
        r.read().unwrap();
        let mut bytes = [0u8; 4];
        let mut chars = ['\0'; 4];
        assert_eq!(r.get_guid(0).unwrap_err().kind(), ErrorKind::NotImplementedFeature);
        assert_eq!(
            r.get_bytes(0, 0, &mut bytes).unwrap_err().kind(),
            ErrorKind::NotImplementedFeature
        );
        assert_eq!(
            r.get_chars(0, 0, &mut chars).unwrap_err().kind(),
            ErrorKind::NotImplementedFeature
        );
        assert_eq!(r.schema_table().unwrap_err().kind(), ErrorKind::NotImplementedFeature);
    }

    #[test]
    fn test_close_from_every_state_disposes_once() {
        // 0 reads: Bof, 1 read: Row, 3 reads: Eof.
        for reads in [0, 1, 3] {
            let (mut r, drops, closes) = counting(goods(2));
            for _ in 0..reads {
                r.read().unwrap();
            }
            r.close();
            r.close();
            assert_eq!(r.state(), ReaderState::Closed);
            drop(r);
            assert_eq!(drops.load(Ordering::SeqCst), 1);
            assert_eq!(closes.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn test_drop_closes() {
        let (r, drops, closes) = counting(goods(1));
        drop(r);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_access_after_close_fails() {
        let mut r = reader(goods(2));
        r.read().unwrap();
        r.close();
        assert!(r.is_closed());
        assert_eq!(r.read().unwrap_err().kind(), ErrorKind::InvalidCursorState);
        assert_eq!(r.field_count().unwrap_err().kind(), ErrorKind::InvalidCursorState);
        assert_eq!(r.get_int32(1).unwrap_err().kind(), ErrorKind::InvalidCursorState);
    }

    #[test]
    fn test_nested_table_part_reader() {
        let mut parent = reader(orders());
        assert_eq!(parent.field_count().unwrap(), 3);
        assert!(parent.read().unwrap());

        let mut lines = parent.value(2).unwrap().into_reader().unwrap();
        assert_eq!(lines.depth(), parent.depth() + 1);
        assert_eq!(lines.field_count().unwrap(), 1);
        assert!(lines.read().unwrap());
        assert_eq!(lines.get_int32(0).unwrap(), 1);
        assert!(lines.read().unwrap());
        assert!(!lines.read().unwrap());
        lines.close();

        // The parent is unaffected by the nested reader's lifecycle.
        assert_eq!(parent.state(), ReaderState::Row);
        assert_eq!(parent.get_string(0).unwrap(), "A-1");
        assert!(parent.read().unwrap());

        let mut lines = parent.value_by_name("Lines").unwrap().into_reader().unwrap();
        let mut count = 0;
        while lines.read().unwrap() {
            count += 1;
        }
        assert_eq!(count, 3);
        assert!(!parent.read().unwrap());
    }

    #[test]
    fn test_nested_reader_invalidated_when_parent_advances() {
        let mut parent = reader(orders());
        parent.read().unwrap();
        let mut lines = parent.value(2).unwrap().into_reader().unwrap();
        parent.read().unwrap();
        assert_eq!(lines.read().unwrap_err().kind(), ErrorKind::InvalidCursorState);
        assert_eq!(lines.field_count().unwrap_err().kind(), ErrorKind::InvalidCursorState);
        // Closing a stale reader is still fine.
        lines.close();
    }

    #[test]
    fn test_nested_reader_invalidated_when_parent_closes() {
        let mut parent = reader(orders());
        parent.read().unwrap();
        let mut lines = parent.value(2).unwrap().into_reader().unwrap();
        parent.close();
        assert_eq!(lines.read().unwrap_err().kind(), ErrorKind::InvalidCursorState);
    }

    #[test]
    fn test_caller_managed_nested_reader_survives() {
        let context = ReaderContext::default().with_policy(NestedReaderPolicy::CallerManaged);
        let mut parent = DataReader::new(orders().into_result(), context);
        parent.read().unwrap();
        let mut lines = parent.value(2).unwrap().into_reader().unwrap();
        parent.read().unwrap();
        assert!(lines.read().unwrap());
        assert_eq!(lines.get_int32(0).unwrap(), 1);
    }

    #[test]
    fn test_fields_loaded_lazily() {
        let mut r = reader(goods(1));
        assert!(!format!("{:?}", r).contains("fields_loaded: true"));
        r.field_count().unwrap();
        assert!(format!("{:?}", r).contains("fields_loaded: true"));
    }

    #[test]
    fn test_raw_values_in_field_order() {
        let mut r = reader(goods(1));
        r.read().unwrap();
        let raw = r.raw_values().unwrap();
        assert_eq!(raw.len(), 2);
        assert!(matches!(&raw[0], RawValue::String(s) if s == "item0"));
        assert_eq!(r.level().unwrap(), None);
    }
}
