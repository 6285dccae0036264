/// Output side of the compiler: a minimal SQL AST, parameter binding and
/// text rendering.
pub mod compiler;
pub mod params;
pub mod types;

pub use compiler::render;
pub use params::{ParameterContext, DEFAULT_PARAMETER_PREFIX};
pub use types::*;
