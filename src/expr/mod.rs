/// Query expressions: the input side of the compiler.
///
/// ```text
/// Queryable (fluent composition)
///       ↓
/// QueryExpr / Lambda / ValueExpr   (types.rs)
///       ↓
/// query::compile
/// ```
pub mod display;
pub mod queryable;
pub mod record;
pub mod types;

pub use queryable::{OrderedQueryable, Queryable};
pub use types::*;
