/// Compiler entry point.
///
/// ```text
/// QueryExpr ─► QueryShapeVisitor ─► QueryBuilder ─► QueryDescriptor
///                                                        │
///                        clause transformers ◄───────────┘
///                                │
///            SelectStatement ─► render ─► SqlCommand + ItemReaderFactory
/// ```
use std::sync::Arc;

use tracing::{debug, info};

use super::builder::QueryBuilder;
use super::descriptor::{QueryDescriptor, Selector};
use super::item_reader::ItemReaderFactory;
use super::transform::{transform_mapping, transform_order_by, transform_select, transform_where};
use super::visitor::QueryShapeVisitor;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::expr::{ItemType, QueryExpr};
use crate::sql::{render, ParameterContext, SelectStatement, SqlCommand, DEFAULT_PARAMETER_PREFIX};

/// Result of compiling one query. The select-list of `statement` lines up
/// positionally with what `item_reader_factory` expects.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseProduct {
    pub command: SqlCommand,
    pub statement: SelectStatement,
    pub item_reader_factory: ItemReaderFactory,
    pub item_type: ItemType,
}

#[derive(Debug, Clone)]
pub struct QueryCompiler {
    parameter_prefix: String,
    trace_sql: bool,
}

impl Default for QueryCompiler {
    fn default() -> Self {
        Self {
            parameter_prefix: DEFAULT_PARAMETER_PREFIX.to_string(),
            trace_sql: false,
        }
    }
}

impl QueryCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            parameter_prefix: config.parameter_prefix.clone(),
            trace_sql: config.trace_sql,
        }
    }

    pub fn with_parameter_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.parameter_prefix = prefix.into();
        self
    }

    /// Compile `expr`. Any failure is wrapped with the text of `expr`.
    pub fn compile(&self, expr: &QueryExpr) -> Result<ParseProduct> {
        self.describe(expr)
            .and_then(|descriptor| self.translate(&descriptor))
            .map_err(|e| e.in_compilation(expr))
    }

    /// Run the visitor and the builder state machine only.
    pub fn describe(&self, expr: &QueryExpr) -> Result<QueryDescriptor> {
        let mut builder = QueryBuilder::new();
        QueryShapeVisitor::new(&mut builder).visit(expr)?;
        builder.into_descriptor()
    }

    /// Apply the clause transformers to a descriptor and render the command.
    pub fn translate(&self, descriptor: &QueryDescriptor) -> Result<ParseProduct> {
        let mut params = ParameterContext::new(self.parameter_prefix.as_str());

        let (columns, item_reader_factory) = match descriptor {
            QueryDescriptor::Records(_) => (Vec::new(), ItemReaderFactory::Records),
            QueryDescriptor::Typed(query) => {
                let projection = match &query.selector {
                    Selector::Projection(lambda) => transform_select(lambda)?,
                    Selector::Mapping(mapping) => transform_mapping(mapping)?,
                };
                (
                    projection.columns,
                    ItemReaderFactory::Projection(Arc::new(projection.materializer)),
                )
            }
        };

        let filter = descriptor
            .filter()
            .map(|predicate| transform_where(predicate, &mut params))
            .transpose()?;

        let order_by = descriptor
            .sorters()
            .iter()
            .map(transform_order_by)
            .collect::<Result<Vec<_>>>()?;

        let statement = SelectStatement {
            columns,
            source: descriptor.source_name().to_string(),
            filter,
            order_by,
        };
        let command = SqlCommand::new(render(&statement), params.into_parameters());

        if self.trace_sql {
            info!(sql = %command.text, parameters = command.parameters.len(), "compiled query");
        } else {
            debug!(sql = %command.text, parameters = command.parameters.len(), "compiled query");
        }

        Ok(ParseProduct {
            command,
            statement,
            item_reader_factory,
            item_type: descriptor.item_type(),
        })
    }
}

/// Compile with default settings.
pub fn compile(expr: &QueryExpr) -> Result<ParseProduct> {
    QueryCompiler::default().compile(expr)
}
