//! Recognizes the shape of a composed query and reports it as handler
//! events.
//!
//! The walk starts at the enumeration root and descends through each
//! operator call, so events arrive outermost call first and the source
//! (`handle_getting_records`) last.
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::expr::{DataTypeMapping, ItemType, Lambda, QueryExpr, QuerySource};
use crate::sql::SortDirection;

/// Receives one event per recognized query shape.
pub trait QueryHandler {
    fn handle_start(&mut self) -> Result<()>;
    fn handle_getting_enumerator(&mut self, item_type: &ItemType) -> Result<()>;
    fn handle_select(&mut self, projection: &Lambda) -> Result<()>;
    fn handle_filter(&mut self, predicate: &Lambda) -> Result<()>;
    fn handle_order_by(&mut self, key: &Lambda) -> Result<()>;
    fn handle_order_by_descending(&mut self, key: &Lambda) -> Result<()>;
    fn handle_then_by(&mut self, key: &Lambda) -> Result<()>;
    fn handle_then_by_descending(&mut self, key: &Lambda) -> Result<()>;
    fn handle_getting_records(&mut self, source: &str) -> Result<()>;
    fn handle_getting_typed_records(&mut self, mapping: &Arc<DataTypeMapping>) -> Result<()>;
    fn handle_end(&mut self) -> Result<()>;
}

pub struct QueryShapeVisitor<'h> {
    handler: &'h mut dyn QueryHandler,
}

impl<'h> QueryShapeVisitor<'h> {
    pub fn new(handler: &'h mut dyn QueryHandler) -> Self {
        Self { handler }
    }

    /// Walk `expr`, emitting `handle_start` first and `handle_end` last.
    pub fn visit(&mut self, expr: &QueryExpr) -> Result<()> {
        self.handler.handle_start()?;
        match expr {
            QueryExpr::Enumerate { item_type, inner } => {
                self.handler.handle_getting_enumerator(item_type)?;
                self.visit_calls(inner)?;
            }
            other => {
                return Err(Error::unsupported(
                    other,
                    "a query must be rooted at its enumeration",
                ))
            }
        }
        self.handler.handle_end()
    }

    fn visit_calls(&mut self, expr: &QueryExpr) -> Result<()> {
        let mut current = expr;
        loop {
            current = match current {
                QueryExpr::Select { projection, inner } => {
                    self.handler.handle_select(projection)?;
                    inner.as_ref()
                }
                QueryExpr::Filter { predicate, inner } => {
                    if !predicate.param.is_source_record() {
                        return Err(Error::unsupported(
                            predicate,
                            format!(
                                "filter must target the source record type, not {}",
                                predicate.param
                            ),
                        ));
                    }
                    self.handler.handle_filter(predicate)?;
                    inner.as_ref()
                }
                QueryExpr::Order {
                    key,
                    direction,
                    primary,
                    inner,
                } => {
                    match (*primary, *direction) {
                        (true, SortDirection::Ascending) => self.handler.handle_order_by(key)?,
                        (true, SortDirection::Descending) => {
                            self.handler.handle_order_by_descending(key)?
                        }
                        (false, SortDirection::Ascending) => self.handler.handle_then_by(key)?,
                        (false, SortDirection::Descending) => {
                            self.handler.handle_then_by_descending(key)?
                        }
                    }
                    inner.as_ref()
                }
                QueryExpr::Source(QuerySource::Records(name)) => {
                    return self.handler.handle_getting_records(name);
                }
                QueryExpr::Source(QuerySource::TypedRecords(mapping)) => {
                    return self.handler.handle_getting_typed_records(mapping);
                }
                QueryExpr::Call { method, .. } => {
                    return Err(Error::unsupported(
                        current,
                        format!("`{}` is not a recognized query operator", method),
                    ));
                }
                QueryExpr::Enumerate { .. } => {
                    return Err(Error::unsupported(current, "nested enumeration"));
                }
            };
        }
    }
}
