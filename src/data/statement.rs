//! Reads compiled command text back into a plan the in-memory backend can
//! evaluate.
//!
//! `&name` placeholders are rewritten to positional `$n` before handing the
//! text to sqlparser, so the PostgreSQL dialect can tokenize them.
use std::str::FromStr;

use rust_decimal::Decimal;
use sqlparser::ast as sp;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser as SqlParser;

use crate::error::{Error, Result};
use crate::sql::{SortDirection, SqlCommand};
use crate::value::Value;

/// `WHERE column = value`
#[derive(Debug, Clone, PartialEq)]
pub struct EqualsFilter {
    pub column: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderKey {
    pub column: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectPlan {
    pub source: String,
    /// `None` for `SELECT *`.
    pub columns: Option<Vec<String>>,
    pub filter: Option<EqualsFilter>,
    pub order_by: Vec<OrderKey>,
}

pub fn read_command(command: &SqlCommand) -> Result<SelectPlan> {
    let text = rewrite_placeholders(command)?;
    let dialect = PostgreSqlDialect {};
    let mut statements = SqlParser::parse_sql(&dialect, &text)
        .map_err(|e| Error::Source(format!("SQL parse error: {}", e)))?;
    if statements.len() != 1 {
        return Err(Error::Source(format!(
            "expected 1 statement, found {}",
            statements.len()
        )));
    }
    match statements.remove(0) {
        sp::Statement::Query(query) => read_query(*query, command),
        other => Err(unsupported(other)),
    }
}

/// Replace each `&name` with `$n`, n being the 1-based parameter position.
fn rewrite_placeholders(command: &SqlCommand) -> Result<String> {
    let mut out = String::with_capacity(command.text.len());
    let mut chars = command.text.chars().peekable();
    let mut quoted = false;
    while let Some(c) = chars.next() {
        if c == '\'' {
            quoted = !quoted;
        }
        if c != '&' || quoted {
            out.push(c);
            continue;
        }
        let mut name = String::new();
        while let Some(&next) = chars.peek() {
            if next.is_ascii_alphanumeric() || next == '_' {
                name.push(next);
                chars.next();
            } else {
                break;
            }
        }
        let position = command
            .parameters
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| Error::Source(format!("unbound parameter &{}", name)))?;
        out.push('$');
        out.push_str(&(position + 1).to_string());
    }
    Ok(out)
}

fn read_query(query: sp::Query, command: &SqlCommand) -> Result<SelectPlan> {
    let order_by_exprs: Vec<sp::OrderByExpr> =
        query.order_by.map(|ob| ob.exprs).unwrap_or_default();

    let select = match *query.body {
        sp::SetExpr::Select(select) => *select,
        other => return Err(unsupported(other)),
    };

    let columns = read_projection(select.projection)?;

    if select.from.len() != 1 || !select.from[0].joins.is_empty() {
        return Err(Error::Source("expected exactly one source".into()));
    }
    let source = match select.from.into_iter().next().map(|twj| twj.relation) {
        Some(sp::TableFactor::Table { name, .. }) => name
            .0
            .iter()
            .map(|p| p.value.as_str())
            .collect::<Vec<_>>()
            .join("."),
        Some(other) => return Err(unsupported(other)),
        None => return Err(Error::Source("missing FROM".into())),
    };

    let filter = select
        .selection
        .map(|expr| read_filter(expr, command))
        .transpose()?;

    let order_by = order_by_exprs
        .into_iter()
        .map(|order| {
            Ok(OrderKey {
                column: column_name(order.expr)?,
                direction: match order.asc {
                    Some(false) => SortDirection::Descending,
                    _ => SortDirection::Ascending,
                },
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(SelectPlan {
        source,
        columns,
        filter,
        order_by,
    })
}

fn read_projection(items: Vec<sp::SelectItem>) -> Result<Option<Vec<String>>> {
    if let [sp::SelectItem::Wildcard(_)] = items.as_slice() {
        return Ok(None);
    }
    items
        .into_iter()
        .map(|item| match item {
            sp::SelectItem::UnnamedExpr(expr) => column_name(expr),
            other => Err(unsupported(other)),
        })
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

fn read_filter(expr: sp::Expr, command: &SqlCommand) -> Result<EqualsFilter> {
    match expr {
        sp::Expr::BinaryOp {
            left,
            op: sp::BinaryOperator::Eq,
            right,
        } => Ok(EqualsFilter {
            column: column_name(*left)?,
            value: read_value(*right, command)?,
        }),
        sp::Expr::Nested(inner) => read_filter(*inner, command),
        other => Err(unsupported(other)),
    }
}

fn column_name(expr: sp::Expr) -> Result<String> {
    match expr {
        sp::Expr::Identifier(ident) => Ok(ident.value),
        sp::Expr::CompoundIdentifier(parts) => Ok(parts
            .into_iter()
            .map(|p| p.value)
            .collect::<Vec<_>>()
            .join(".")),
        other => Err(unsupported(other)),
    }
}

fn read_value(expr: sp::Expr, command: &SqlCommand) -> Result<Value> {
    let value = match expr {
        sp::Expr::Value(value) => value,
        other => return Err(unsupported(other)),
    };
    match value {
        sp::Value::Placeholder(p) => {
            let position = p
                .strip_prefix('$')
                .and_then(|n| n.parse::<usize>().ok())
                .filter(|n| *n >= 1)
                .ok_or_else(|| Error::Source(format!("bad placeholder {}", p)))?;
            command
                .parameters
                .get(position - 1)
                .map(|p| p.value.clone())
                .ok_or_else(|| Error::Source(format!("unbound placeholder {}", p)))
        }
        sp::Value::Null => Ok(Value::Null),
        sp::Value::Boolean(b) => Ok(Value::Bool(b)),
        sp::Value::Number(n, _) => Decimal::from_str(&n)
            .map(Value::Decimal)
            .map_err(|_| Error::Source(format!("bad number {}", n))),
        sp::Value::SingleQuotedString(s) => Ok(Value::String(s)),
        other => Err(unsupported(other)),
    }
}

fn unsupported(node: impl std::fmt::Display) -> Error {
    Error::Source(format!("unsupported statement part: {}", node))
}
