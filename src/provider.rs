use tracing::debug;

use crate::config::EngineConfig;
use crate::data::reader::{DataReader, ReaderContext};
use crate::data::source::CommandExecutor;
use crate::error::Result;
use crate::expr::QueryExpr;
use crate::query::{ItemReader, ParseProduct, QueryCompiler};
use crate::sql::SqlCommand;
use crate::value::Value;

/// Compiles query expressions and runs them through an executor.
pub struct QueryProvider<E: CommandExecutor> {
    executor: E,
    compiler: QueryCompiler,
    context: ReaderContext,
}

impl<E: CommandExecutor> QueryProvider<E> {
    pub fn new(executor: E) -> Self {
        Self {
            executor,
            compiler: QueryCompiler::default(),
            context: ReaderContext::default(),
        }
    }

    pub fn with_config(executor: E, config: &EngineConfig) -> Self {
        Self {
            executor,
            compiler: QueryCompiler::from_config(config),
            context: ReaderContext::default().with_policy(config.nested_reader_policy),
        }
    }

    /// Use other value conversion collaborators.
    pub fn with_context(mut self, context: ReaderContext) -> Self {
        self.context = context;
        self
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn compile(&self, expr: &QueryExpr) -> Result<ParseProduct> {
        self.compiler.compile(expr)
    }

    /// Compile and execute; items are read lazily as the enumerator advances.
    pub fn execute(&self, expr: &QueryExpr) -> Result<ItemEnumerator> {
        let product = self.compile(expr)?;
        self.execute_compiled(&product)
    }

    pub fn execute_compiled(&self, product: &ParseProduct) -> Result<ItemEnumerator> {
        let mut reader = self.execute_reader(&product.command)?;
        let items = product.item_reader_factory.create(&mut reader)?;
        Ok(ItemEnumerator {
            reader,
            items,
            finished: false,
        })
    }

    /// Execute and collect every item.
    pub fn to_vec(&self, expr: &QueryExpr) -> Result<Vec<Value>> {
        self.execute(expr)?.collect()
    }

    /// Run a prepared command and hand back the raw reader.
    pub fn execute_reader(&self, command: &SqlCommand) -> Result<DataReader> {
        debug!(sql = %command.text, parameters = command.parameters.len(), "executing command");
        let result = self.executor.execute(command)?;
        Ok(DataReader::new(result, self.context.clone()))
    }
}

/// Items of an executed query. The underlying reader is closed once the
/// rows run out, on the first error, or when the enumerator is dropped.
#[derive(Debug)]
pub struct ItemEnumerator {
    reader: DataReader,
    items: ItemReader,
    finished: bool,
}

impl ItemEnumerator {
    pub fn reader(&self) -> &DataReader {
        &self.reader
    }

    pub fn close(&mut self) {
        self.finished = true;
        self.reader.close();
    }
}

impl Iterator for ItemEnumerator {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let item = match self.reader.read() {
            Ok(true) => self.items.read(&mut self.reader),
            Ok(false) => {
                self.close();
                return None;
            }
            Err(e) => Err(e),
        };
        if item.is_err() {
            self.close();
        }
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NestedReaderPolicy;
    use crate::data::memory::{MemoryExecutor, MemoryTable, MemoryValue};
    use crate::data::source::{ColumnInfo, RowCursor, TabularResult};
    use crate::error::ErrorKind;
    use crate::expr::record::*;
    use crate::expr::{DataTypeMapping, Queryable};
    use crate::value::ValueKind;
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn goods() -> MemoryTable {
        MemoryTable::new([
            ("Name", "string"),
            ("Kind", "string"),
            ("Price", "decimal"),
        ])
        .with_row(vec!["Green".into(), "Tea".into(), Decimal::new(350, 2).into()])
        .with_row(vec!["Arabica".into(), "Coffee".into(), Decimal::new(900, 2).into()])
        .with_row(vec!["Black".into(), "Tea".into(), Decimal::new(275, 2).into()])
        .with_row(vec!["Oolong".into(), "Tea".into(), Decimal::new(350, 2).into()])
    }

    fn orders() -> MemoryTable {
        let lines = |qty: &[i64]| {
            let mut table = MemoryTable::new([("Qty", "int32")]);
            for q in qty {
                table.push_row(vec![MemoryValue::from(*q)]);
            }
            MemoryValue::from(table)
        };
        MemoryTable::new([("Code", "string"), ("Total", "decimal"), ("Items", "table")])
            .with_row(vec!["A-1".into(), 10i64.into(), lines(&[1, 2])])
            .with_row(vec!["A-2".into(), 20i64.into(), lines(&[3, 4, 5])])
    }

    fn provider() -> QueryProvider<MemoryExecutor> {
        QueryProvider::new(
            MemoryExecutor::new()
                .with_table("Goods", goods())
                .with_table("Orders", orders()),
        )
    }

    fn strings(items: &[Value], member: &str) -> Vec<String> {
        items
            .iter()
            .map(|item| {
                let value = match item {
                    Value::Struct(s) => s.get(member),
                    Value::Record(r) => r.get(member),
                    _ => None,
                };
                value.map(|v| v.display()).unwrap_or_default()
            })
            .collect()
    }

    #[test]
    fn test_filter_sort_project_end_to_end() {
        let query = Queryable::records("Goods")
            .filter(get_string("Kind").equals("Tea"))
            .order_by(get_decimal("Price"))
            .then_by_descending(get_string("Name"))
            .select(new_object(
                "Good",
                [("Title", get_string("Name")), ("Price", get_decimal("Price"))],
            ));
        let provider = provider();
        let items = provider.to_vec(&query.expression()).unwrap();
        assert_eq!(strings(&items, "Title"), vec!["Black", "Oolong", "Green"]);
        assert_eq!(
            items[0].as_struct().unwrap().get("Price"),
            Some(&Value::Decimal(Decimal::new(275, 2)))
        );

        let executed = provider.executor().executed();
        assert_eq!(executed.len(), 1);
        assert_eq!(
            executed[0].text,
            "SELECT Name, Price FROM Goods WHERE Kind = &p1 ORDER BY Price, Name DESC"
        );
    }

    #[test]
    fn test_records_include_nested_tables() {
        let query = Queryable::records("Orders").order_by_descending(get_string("Code"));
        let items = provider().to_vec(&query.expression()).unwrap();
        assert_eq!(strings(&items, "Code"), vec!["A-2", "A-1"]);
        let lines = items[0]
            .as_record()
            .and_then(|r| r.get("Items"))
            .and_then(|v| v.as_table())
            .unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2].get("Qty"), Some(&Value::Int32(5)));
    }

    #[test]
    fn test_typed_records_through_mapping() {
        let mapping = Arc::new(
            DataTypeMapping::new("Good", "Goods")
                .member("Title", "Name", ValueKind::String)
                .member("Cost", "Price", ValueKind::Double),
        );
        let query = Queryable::typed_records(mapping).filter(member("Title").equals("Arabica"));
        let items = provider().to_vec(&query.expression()).unwrap();
        assert_eq!(items.len(), 1);
        let good = items[0].as_struct().unwrap();
        assert_eq!(good.type_name, "Good");
        assert_eq!(good.get("Cost"), Some(&Value::Double(9.0)));
    }

    #[test]
    fn test_enumerator_closes_reader_when_exhausted() {
        let query = Queryable::records("Goods").filter(get_string("Kind").equals("Coffee"));
        let provider = provider();
        let mut items = provider.execute(&query.expression()).unwrap();
        assert!(items.next().unwrap().is_ok());
        assert!(!items.reader().is_closed());
        assert!(items.next().is_none());
        assert!(items.reader().is_closed());
        assert!(items.next().is_none());
    }

    #[test]
    fn test_compile_errors_surface_before_execution() {
        let query = Queryable::records("Goods").filter(get_decimal("Price").greater_than(3));
        let provider = provider();
        let err = provider.execute(&query.expression()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedExpressionShape);
        assert!(provider.executor().executed().is_empty());
    }

    #[test]
    fn test_source_errors_propagate() {
        let query = Queryable::records("Stock");
        let err = provider().execute(&query.expression()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Source);
    }

    #[test]
    fn test_execute_reader_with_prepared_command() {
        let provider = provider();
        let command = SqlCommand::new("SELECT Code, Items FROM Orders ORDER BY Code", vec![]);
        let mut reader = provider.execute_reader(&command).unwrap();
        assert_eq!(reader.field_count().unwrap(), 2);
        assert!(reader.read().unwrap());
        let mut lines = reader.value(1).unwrap().into_reader().unwrap();
        assert_eq!(lines.depth(), 1);
        assert!(lines.read().unwrap());
    }

    #[test]
    fn test_config_sets_prefix_and_policy() {
        let config = EngineConfig {
            parameter_prefix: "arg".into(),
            nested_reader_policy: NestedReaderPolicy::CallerManaged,
            trace_sql: true,
        };
        let provider = QueryProvider::with_config(
            MemoryExecutor::new().with_table("Orders", orders()),
            &config,
        );
        let query = Queryable::records("Orders").filter(get_string("Code").equals("A-1"));
        let product = provider.compile(&query.expression()).unwrap();
        assert_eq!(product.command.text, "SELECT * FROM Orders WHERE Code = &arg1");

        let mut reader = provider.execute_reader(&product.command).unwrap();
        reader.read().unwrap();
        let mut items = reader.value(2).unwrap().into_reader().unwrap();
        assert!(!reader.read().unwrap());
        assert!(items.read().unwrap());
    }

    struct CountingExecutor {
        inner: MemoryExecutor,
        drops: Arc<AtomicUsize>,
    }

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

    impl CommandExecutor for CountingExecutor {
        fn execute(&self, command: &SqlCommand) -> Result<Box<dyn TabularResult>> {
            Ok(Box::new(CountingResult {
                inner: self.inner.execute(command)?,
                drops: self.drops.clone(),
            }))
        }
    }

    #[test]
    fn test_dropping_enumerator_early_releases_result() {
        let drops = Arc::new(AtomicUsize::new(0));
        let provider = QueryProvider::new(CountingExecutor {
            inner: MemoryExecutor::new().with_table("Goods", goods()),
            drops: drops.clone(),
        });
        let mut items = provider
            .execute(&Queryable::records("Goods").expression())
            .unwrap();
        assert!(items.next().is_some());
        assert_eq!(drops.load(Ordering::SeqCst), 0);
        drop(items);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }
}
