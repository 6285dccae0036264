/// Expression-to-query compiler.
///
/// ```text
/// visitor.rs    walks the query expression, one handler event per shape
/// builder.rs    handler as a state machine, accumulates a descriptor
/// transform.rs  where/select/order-by clause transformers
/// compiler.rs   entry point: descriptor → SqlCommand + item reader factory
/// ```
pub mod builder;
pub mod compiler;
pub mod descriptor;
pub mod item_reader;
pub mod transform;
pub mod visitor;

pub use builder::{transition, Accumulator, BuilderEvent, BuilderState, QueryBuilder};
pub use compiler::{compile, ParseProduct, QueryCompiler};
pub use descriptor::{QueryDescriptor, RecordsQuery, Selector, SortKey, TypedQuery};
pub use item_reader::{ItemReader, ItemReaderFactory};
pub use transform::{Materializer, Projection};
pub use visitor::{QueryHandler, QueryShapeVisitor};
