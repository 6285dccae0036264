//! Turns positional row values into query items.
use std::sync::Arc;

use crate::data::field::FieldSet;
use crate::data::reader::{DataReader, ReaderContext};
use crate::data::source::RawValue;
use crate::error::{Error, Result};
use crate::value::{DataRecord, Value};

use super::transform::Materializer;

/// Produced by compilation; bound to an executed result by [`create`].
///
/// [`create`]: ItemReaderFactory::create
#[derive(Debug, Clone, PartialEq)]
pub enum ItemReaderFactory {
    /// Every column of the result, as a [`DataRecord`].
    Records,
    /// The compiled select-list, materialized positionally.
    Projection(Arc<Materializer>),
}

impl ItemReaderFactory {
    /// Number of columns the compiled command selects, if fixed.
    pub fn expected_columns(&self) -> Option<usize> {
        match self {
            ItemReaderFactory::Records => None,
            ItemReaderFactory::Projection(m) => Some(m.len()),
        }
    }

    pub fn create(&self, reader: &mut DataReader) -> Result<ItemReader> {
        let fields = reader.fields()?;
        match self {
            ItemReaderFactory::Records => Ok(ItemReader::Records {
                fields,
                context: reader.context().clone(),
                depth: reader.depth(),
            }),
            ItemReaderFactory::Projection(materializer) => {
                if fields.len() != materializer.len() {
                    return Err(Error::InvalidQuery(format!(
                        "{} selects {} columns, but the result has {}",
                        materializer.type_name,
                        materializer.len(),
                        fields.len()
                    )));
                }
                Ok(ItemReader::Projection {
                    materializer: materializer.clone(),
                    context: reader.context().clone(),
                })
            }
        }
    }
}

/// Reads one item from the raw values of a row.
#[derive(Debug, Clone)]
pub enum ItemReader {
    Records {
        fields: Arc<FieldSet>,
        context: ReaderContext,
        depth: usize,
    },
    Projection {
        materializer: Arc<Materializer>,
        context: ReaderContext,
    },
}

impl ItemReader {
    /// Item at the current row of `reader`.
    pub fn read(&self, reader: &mut DataReader) -> Result<Value> {
        self.read_row(reader.raw_values()?)
    }

    pub fn read_row(&self, row: Vec<RawValue>) -> Result<Value> {
        match self {
            ItemReader::Records {
                fields,
                context,
                depth,
            } => read_record(fields, context, *depth, row).map(Value::Record),
            ItemReader::Projection {
                materializer,
                context,
            } => materializer.materialize(context.converter.as_ref(), &row),
        }
    }
}

fn read_record(
    fields: &FieldSet,
    context: &ReaderContext,
    depth: usize,
    row: Vec<RawValue>,
) -> Result<DataRecord> {
    if row.len() != fields.len() {
        return Err(Error::Source(format!(
            "expected {} values per row, got {}",
            fields.len(),
            row.len()
        )));
    }
    let values = fields
        .iter()
        .zip(row)
        .map(|(field, raw)| match field.converter() {
            Some(convert) => convert(context.converter.as_ref(), &raw),
            None => match raw {
                RawValue::Table(result) => {
                    let nested = DataReader::detached(result, context.clone(), depth + 1);
                    read_table(nested).map(Value::Table)
                }
                RawValue::Null => Ok(Value::Null),
                other => Err(Error::conversion(&field.kind, &other)),
            },
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(DataRecord::new(fields.names(), values))
}

/// Drain a nested reader into records, closing it afterwards.
fn read_table(mut reader: DataReader) -> Result<Vec<DataRecord>> {
    let fields = reader.fields()?;
    let context = reader.context().clone();
    let depth = reader.depth();
    let mut records = Vec::new();
    while reader.read()? {
        records.push(read_record(&fields, &context, depth, reader.raw_values()?)?);
    }
    reader.close();
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::memory::{MemoryTable, MemoryValue};
    use crate::error::ErrorKind;
    use crate::value::ValueKind;

    fn orders() -> MemoryTable {
        let lines = MemoryTable::new([("Qty", "int32")])
            .with_row(vec![MemoryValue::from(1i64)])
            .with_row(vec![MemoryValue::from(2i64)]);
        MemoryTable::new([("Code", "string"), ("Lines", "table")])
            .with_row(vec!["A-1".into(), lines.into()])
            .with_row(vec!["A-2".into(), MemoryValue::Null])
    }

    fn reader(table: MemoryTable) -> DataReader {
        DataReader::new(table.into_result(), ReaderContext::default())
    }

    #[test]
    fn test_records_with_nested_table() {
        let mut reader = reader(orders());
        let items = ItemReaderFactory::Records.create(&mut reader).unwrap();
        assert!(reader.read().unwrap());
        let first = items.read(&mut reader).unwrap();
        let record = first.as_record().unwrap();
        assert_eq!(record.get("code"), Some(&Value::from("A-1")));
        let lines = record.get("Lines").and_then(|v| v.as_table()).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].get("Qty"), Some(&Value::Int32(2)));

        assert!(reader.read().unwrap());
        let second = items.read(&mut reader).unwrap();
        assert_eq!(second.as_record().unwrap().get("Lines"), Some(&Value::Null));
    }

    #[test]
    fn test_projection_column_count_checked() {
        let materializer = Arc::new(Materializer {
            type_name: "Order".into(),
            members: vec![("Code".into(), ValueKind::String)],
        });
        let factory = ItemReaderFactory::Projection(materializer);
        assert_eq!(factory.expected_columns(), Some(1));
        let err = factory.create(&mut reader(orders())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidQuery);

        let codes = MemoryTable::new([("Code", "string")]).with_row(vec!["A-1".into()]);
        let mut reader = reader(codes);
        let items = factory.create(&mut reader).unwrap();
        reader.read().unwrap();
        let item = items.read(&mut reader).unwrap();
        assert_eq!(item.as_struct().unwrap().get("Code"), Some(&Value::from("A-1")));
    }

    #[test]
    fn test_read_requires_current_row() {
        let mut reader = reader(orders());
        let items = ItemReaderFactory::Records.create(&mut reader).unwrap();
        assert_eq!(
            items.read(&mut reader).unwrap_err().kind(),
            ErrorKind::InvalidCursorState
        );
    }
}
