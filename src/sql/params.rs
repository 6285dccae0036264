use super::types::SqlParameter;
use crate::value::Value;

pub const DEFAULT_PARAMETER_PREFIX: &str = "p";

/// Allocates placeholder names for one compilation and records their values.
///
/// Names are `<prefix>1`, `<prefix>2`, ... in allocation order and never
/// repeat within a context.
#[derive(Debug, Clone)]
pub struct ParameterContext {
    prefix: String,
    counter: usize,
    parameters: Vec<SqlParameter>,
}

impl Default for ParameterContext {
    fn default() -> Self {
        Self::new(DEFAULT_PARAMETER_PREFIX)
    }
}

impl ParameterContext {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: 0,
            parameters: Vec::new(),
        }
    }

    /// Bind `value` under a fresh name and return the name.
    pub fn add(&mut self, value: Value) -> String {
        self.counter += 1;
        let name = format!("{}{}", self.prefix, self.counter);
        self.parameters.push(SqlParameter {
            name: name.clone(),
            value,
        });
        name
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn into_parameters(self) -> Vec<SqlParameter> {
        self.parameters
    }
}
