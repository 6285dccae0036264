/// Reading side: collaborator contracts, value conversion, field metadata,
/// the row reader state machine and an in-memory backend.
pub mod convert;
pub mod field;
pub mod memory;
pub mod reader;
pub mod source;
pub mod statement;

pub use convert::*;
pub use field::{FieldDescriptor, FieldSet, LazyFields};
pub use memory::{MemoryExecutor, MemoryResult, MemoryTable, MemoryValue};
pub use reader::{DataReader, FieldValue, ReaderContext, ReaderState};
pub use source::*;
