use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::debug;
use typedquery::expr::record::{get, get_string, new_object};
use typedquery::{
    EngineConfig, MemoryExecutor, QueryProvider, Queryable, Value, ValueKind,
};
use unicode_width::UnicodeWidthStr;

/// Run a typed query against JSON table fixtures
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// JSON file with the tables to query
    #[arg(long)]
    data: PathBuf,

    /// Source table name
    #[arg(long)]
    source: String,

    /// Equality filter, COLUMN=VALUE
    #[arg(long)]
    filter: Option<String>,

    /// Primary sort column
    #[arg(long = "order-by")]
    order_by: Option<String>,

    /// Sort the primary column descending
    #[arg(long, requires = "order_by")]
    descending: bool,

    /// Secondary sort columns, applied in order; prefix with '-' for descending
    #[arg(long = "then-by", requires = "order_by", allow_hyphen_values = true)]
    then_by: Vec<String>,

    /// Projected columns, NAME:KIND separated by commas
    #[arg(long, value_delimiter = ',')]
    select: Vec<String>,

    /// Print the compiled command before the results
    #[arg(long)]
    show_sql: bool,

    /// Config file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::load_from(path)?,
        None => EngineConfig::load()?,
    };
    debug!(?config, "loaded config");

    let executor = MemoryExecutor::from_json_file(&cli.data)?;
    let provider = QueryProvider::with_config(executor, &config);

    let expr = build_query(&cli)?.expression();
    let product = provider.compile(&expr)?;
    if cli.show_sql {
        println!("{}", product.command.text);
        for param in &product.command.parameters {
            println!("  {} = {}", param.name, param.value.display());
        }
        println!();
    }

    let items = provider
        .execute_compiled(&product)?
        .collect::<typedquery::Result<Vec<_>>>()
        .context("Failed to read query results")?;
    print_table(&items);
    Ok(())
}

fn build_query(cli: &Cli) -> Result<Queryable> {
    let mut query = Queryable::records(cli.source.as_str());

    if let Some(filter) = &cli.filter {
        let (column, value) = filter
            .split_once('=')
            .ok_or_else(|| anyhow!("Filter must look like COLUMN=VALUE, got {filter:?}"))?;
        query = query.filter(get_string(column.trim()).equals(parse_literal(value.trim())));
    }

    if let Some(column) = &cli.order_by {
        let mut ordered = if cli.descending {
            query.order_by_descending(get_string(column))
        } else {
            query.order_by(get_string(column))
        };
        for key in &cli.then_by {
            ordered = match key.strip_prefix('-') {
                Some(column) => ordered.then_by_descending(get_string(column)),
                None => ordered.then_by(get_string(key)),
            };
        }
        query = ordered.into_queryable();
    }

    if !cli.select.is_empty() {
        let mut members = Vec::with_capacity(cli.select.len());
        for column in &cli.select {
            let (name, kind) = match column.split_once(':') {
                Some((name, kind)) => {
                    let kind = ValueKind::parse(kind)
                        .ok_or_else(|| anyhow!("Unknown value kind {kind:?} for {name}"))?;
                    (name.trim(), kind)
                }
                None => (column.trim(), ValueKind::String),
            };
            if name.is_empty() {
                bail!("Empty column name in --select");
            }
            members.push((name, get(kind, name)));
        }
        query = query.select(new_object("Row", members));
    }

    Ok(query)
}

/// Integers, decimals and booleans are bound as such; anything else is a string.
fn parse_literal(text: &str) -> Value {
    if let Ok(i) = text.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(d) = Decimal::from_str(text) {
        return Value::from(d);
    }
    match text {
        "true" => Value::from(true),
        "false" => Value::from(false),
        _ => Value::from(text.trim_matches('\'')),
    }
}

fn row_cells(item: &Value) -> (Vec<String>, Vec<String>) {
    match item {
        Value::Record(record) => (
            record.names().to_vec(),
            record.values().iter().map(Value::display).collect(),
        ),
        Value::Struct(s) => (
            s.fields.iter().map(|(n, _)| n.clone()).collect(),
            s.fields.iter().map(|(_, v)| v.display()).collect(),
        ),
        other => (vec!["value".to_string()], vec![other.display()]),
    }
}

fn pad(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(text.width());
    format!("{}{}", text, " ".repeat(fill))
}

fn print_table(items: &[Value]) {
    let Some(first) = items.first() else {
        println!("(0 rows)");
        return;
    };
    let (headers, _) = row_cells(first);
    let rows: Vec<Vec<String>> = items.iter().map(|item| row_cells(item).1).collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.width()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.width());
        }
    }

    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| pad(cell, *width))
            .collect::<Vec<_>>()
            .join(" | ")
    };
    println!("{}", line(&headers));
    println!(
        "{}",
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-")
    );
    for row in &rows {
        println!("{}", line(row));
    }
    println!("({} rows)", rows.len());
}
