pub mod config;
pub mod data;
pub mod error;
pub mod expr;
pub mod provider;
pub mod query;
pub mod sql;
pub mod value;

pub use config::{EngineConfig, NestedReaderPolicy};
pub use data::{CommandExecutor, DataReader, MemoryExecutor, ReaderContext, ReaderState};
pub use error::{Error, ErrorKind, Result};
pub use expr::{DataTypeMapping, OrderedQueryable, QueryExpr, Queryable};
pub use provider::{ItemEnumerator, QueryProvider};
pub use query::{compile, ParseProduct, QueryCompiler};
pub use sql::SqlCommand;
pub use value::{DataRecord, Value, ValueKind};
