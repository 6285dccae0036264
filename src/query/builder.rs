//! Query builder state machine.
//!
//! ```text
//! Starting ─► Started ─► Enumerable ─┬─► Selected ─┐
//!                                    ├─► Sorting ──┼─► Sorted ─► Records ─► Ended
//!                                    └─────────────┘
//! ```
//!
//! Each event is applied by [`transition`], a pure function of the current
//! state and accumulator. Sort keys are pushed in traversal order (outermost
//! call first) and reversed when the records clause is reached, so the
//! `order_by` call becomes the primary key and `then_by` calls follow in
//! composition order.
use std::fmt;
use std::sync::Arc;

use tracing::trace;

use super::descriptor::{QueryDescriptor, RecordsQuery, Selector, SortKey, TypedQuery};
use super::visitor::QueryHandler;
use crate::error::{Error, Result};
use crate::expr::{DataTypeMapping, ItemType, Lambda, QuerySource};
use crate::sql::SortDirection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderState {
    Starting,
    Started,
    Enumerable,
    Selected,
    Sorting,
    Sorted,
    Records,
    Ended,
}

impl fmt::Display for BuilderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuilderState::Starting => "Starting",
            BuilderState::Started => "Started",
            BuilderState::Enumerable => "Enumerable",
            BuilderState::Selected => "Selected",
            BuilderState::Sorting => "Sorting",
            BuilderState::Sorted => "Sorted",
            BuilderState::Records => "Records",
            BuilderState::Ended => "Ended",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BuilderEvent {
    Start,
    GettingEnumerator(ItemType),
    Select(Lambda),
    Filter(Lambda),
    OrderBy(Lambda, SortDirection),
    ThenBy(Lambda, SortDirection),
    GettingRecords(QuerySource),
    End,
}

impl BuilderEvent {
    /// Handler method that raised the event.
    pub fn method(&self) -> &'static str {
        match self {
            BuilderEvent::Start => "handle_start",
            BuilderEvent::GettingEnumerator(_) => "handle_getting_enumerator",
            BuilderEvent::Select(_) => "handle_select",
            BuilderEvent::Filter(_) => "handle_filter",
            BuilderEvent::OrderBy(_, SortDirection::Ascending) => "handle_order_by",
            BuilderEvent::OrderBy(_, SortDirection::Descending) => "handle_order_by_descending",
            BuilderEvent::ThenBy(_, SortDirection::Ascending) => "handle_then_by",
            BuilderEvent::ThenBy(_, SortDirection::Descending) => "handle_then_by_descending",
            BuilderEvent::GettingRecords(QuerySource::Records(_)) => "handle_getting_records",
            BuilderEvent::GettingRecords(QuerySource::TypedRecords(_)) => {
                "handle_getting_typed_records"
            }
            BuilderEvent::End => "handle_end",
        }
    }
}

/// Data collected between events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Accumulator {
    pub item_type: Option<ItemType>,
    pub select: Option<Lambda>,
    pub filter: Option<Lambda>,
    /// Traversal order; reversed on finalization.
    pub sort_stack: Vec<SortKey>,
    pub descriptor: Option<QueryDescriptor>,
}

pub fn transition(
    state: BuilderState,
    mut acc: Accumulator,
    event: BuilderEvent,
) -> Result<(BuilderState, Accumulator)> {
    use BuilderState::*;

    let method = event.method();
    let out_of_sequence = || Error::InvalidSequencing {
        method,
        state: state.to_string(),
    };

    match (state, event) {
        (Starting, BuilderEvent::Start) => Ok((Started, acc)),

        (Started, BuilderEvent::GettingEnumerator(item_type)) => {
            acc.item_type = Some(item_type);
            Ok((Enumerable, acc))
        }

        (Enumerable, BuilderEvent::Select(projection)) => {
            if projection.is_identity() {
                return Ok((Enumerable, acc));
            }
            let target = acc.item_type.as_ref().ok_or_else(out_of_sequence)?;
            match projection.output_type() {
                Some(output) if &output == target => {
                    acc.select = Some(projection);
                    Ok((Selected, acc))
                }
                Some(output) => Err(Error::InvalidQuery(format!(
                    "projection `{}` produces {}, expected {}",
                    projection, output, target
                ))),
                None => Err(Error::unsupported(
                    &projection,
                    "cannot infer the output type of the projection",
                )),
            }
        }

        // One filter per query, whatever the state.
        (_, BuilderEvent::Filter(_)) if acc.filter.is_some() => Err(out_of_sequence()),
        (Enumerable | Selected | Sorted, BuilderEvent::Filter(predicate)) => {
            acc.filter = Some(predicate);
            Ok((state, acc))
        }

        // The outermost order_by defines the sort.
        (Sorted, BuilderEvent::OrderBy(key, _) | BuilderEvent::ThenBy(key, _)) => {
            trace!(%key, "sort key below order_by ignored");
            Ok((Sorted, acc))
        }
        (Enumerable | Selected | Sorting, BuilderEvent::OrderBy(key, direction)) => {
            acc.sort_stack.push(SortKey { key, direction });
            Ok((Sorted, acc))
        }
        (Enumerable | Selected | Sorting, BuilderEvent::ThenBy(key, direction)) => {
            acc.sort_stack.push(SortKey { key, direction });
            Ok((Sorting, acc))
        }

        (Enumerable | Selected | Sorted, BuilderEvent::GettingRecords(source)) => {
            let descriptor = finalize(&mut acc, source)?;
            acc.descriptor = Some(descriptor);
            Ok((Records, acc))
        }

        (Records, BuilderEvent::End) => Ok((Ended, acc)),

        _ => Err(out_of_sequence()),
    }
}

fn finalize(acc: &mut Accumulator, source: QuerySource) -> Result<QueryDescriptor> {
    let source_type = source.item_type();
    let item_type = acc
        .item_type
        .clone()
        .ok_or_else(|| Error::InvalidQuery("no item type was recorded".into()))?;

    let sorters: Vec<SortKey> = acc.sort_stack.drain(..).rev().collect();
    let lambdas = acc
        .select
        .iter()
        .chain(acc.filter.iter())
        .chain(sorters.iter().map(|s| &s.key));
    for lambda in lambdas {
        if lambda.param != source_type {
            return Err(Error::InvalidQuery(format!(
                "`{}` takes {}, but the source yields {}",
                lambda, lambda.param, source_type
            )));
        }
    }

    let filter = acc.filter.clone();
    let descriptor = match (acc.select.clone(), source) {
        (None, QuerySource::Records(name)) => {
            if item_type != ItemType::Record {
                return Err(Error::InvalidQuery(format!(
                    "records of {} cannot be enumerated as {}",
                    name, item_type
                )));
            }
            QueryDescriptor::Records(RecordsQuery {
                source: name,
                filter,
                sorters,
            })
        }
        (None, QuerySource::TypedRecords(mapping)) => {
            if item_type != source_type {
                return Err(Error::InvalidQuery(format!(
                    "{} cannot be enumerated as {}",
                    mapping.type_name, item_type
                )));
            }
            QueryDescriptor::Typed(TypedQuery {
                selector: Selector::Mapping(mapping.clone()),
                source: QuerySource::TypedRecords(mapping),
                filter,
                sorters,
                item_type,
            })
        }
        (Some(projection), source) => QueryDescriptor::Typed(TypedQuery {
            source,
            filter,
            sorters,
            selector: Selector::Projection(projection),
            item_type,
        }),
    };
    Ok(descriptor)
}

/// [`QueryHandler`] that drives [`transition`] and yields the descriptor.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    state: BuilderState,
    acc: Accumulator,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self {
            state: BuilderState::Starting,
            acc: Accumulator::default(),
        }
    }

    pub fn state(&self) -> BuilderState {
        self.state
    }

    /// Apply one event. On failure the builder keeps its previous state.
    pub fn apply(&mut self, event: BuilderEvent) -> Result<()> {
        let from = self.state;
        let (state, acc) = transition(self.state, self.acc.clone(), event)?;
        trace!(%from, to = %state, "query builder transition");
        self.state = state;
        self.acc = acc;
        Ok(())
    }

    /// The built descriptor, available once the builder has ended.
    pub fn descriptor(&self) -> Option<&QueryDescriptor> {
        match self.state {
            BuilderState::Ended => self.acc.descriptor.as_ref(),
            _ => None,
        }
    }

    pub fn into_descriptor(self) -> Result<QueryDescriptor> {
        match (self.state, self.acc.descriptor) {
            (BuilderState::Ended, Some(descriptor)) => Ok(descriptor),
            (state, _) => Err(Error::InvalidSequencing {
                method: "into_descriptor",
                state: state.to_string(),
            }),
        }
    }
}

impl QueryHandler for QueryBuilder {
    fn handle_start(&mut self) -> Result<()> {
        self.apply(BuilderEvent::Start)
    }

    fn handle_getting_enumerator(&mut self, item_type: &ItemType) -> Result<()> {
        self.apply(BuilderEvent::GettingEnumerator(item_type.clone()))
    }

    fn handle_select(&mut self, projection: &Lambda) -> Result<()> {
        self.apply(BuilderEvent::Select(projection.clone()))
    }

    fn handle_filter(&mut self, predicate: &Lambda) -> Result<()> {
        self.apply(BuilderEvent::Filter(predicate.clone()))
    }

    fn handle_order_by(&mut self, key: &Lambda) -> Result<()> {
        self.apply(BuilderEvent::OrderBy(key.clone(), SortDirection::Ascending))
    }

    fn handle_order_by_descending(&mut self, key: &Lambda) -> Result<()> {
        self.apply(BuilderEvent::OrderBy(key.clone(), SortDirection::Descending))
    }

    fn handle_then_by(&mut self, key: &Lambda) -> Result<()> {
        self.apply(BuilderEvent::ThenBy(key.clone(), SortDirection::Ascending))
    }

    fn handle_then_by_descending(&mut self, key: &Lambda) -> Result<()> {
        self.apply(BuilderEvent::ThenBy(key.clone(), SortDirection::Descending))
    }

    fn handle_getting_records(&mut self, source: &str) -> Result<()> {
        self.apply(BuilderEvent::GettingRecords(QuerySource::Records(
            source.to_string(),
        )))
    }

    fn handle_getting_typed_records(&mut self, mapping: &Arc<DataTypeMapping>) -> Result<()> {
        self.apply(BuilderEvent::GettingRecords(QuerySource::TypedRecords(
            mapping.clone(),
        )))
    }

    fn handle_end(&mut self) -> Result<()> {
        self.apply(BuilderEvent::End)
    }
}
