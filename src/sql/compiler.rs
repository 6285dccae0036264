/// SQL AST → query text.
///
/// Renders `SELECT <cols|*> FROM <source> [WHERE ..] [ORDER BY ..]`.
/// Parameters render as `&name`.
use super::types::*;

pub fn render(select: &SelectStatement) -> String {
    let mut parts = Vec::new();

    // SELECT
    let mut select_clause = String::from("SELECT ");
    if select.columns.is_empty() {
        select_clause.push('*');
    } else {
        let items: Vec<String> = select.columns.iter().map(render_expr).collect();
        select_clause.push_str(&items.join(", "));
    }
    parts.push(select_clause);

    // FROM
    parts.push(format!("FROM {}", select.source));

    // WHERE
    if let Some(ref filter) = select.filter {
        parts.push(format!("WHERE {}", render_condition(filter)));
    }

    // ORDER BY
    if !select.order_by.is_empty() {
        let orders: Vec<String> = select.order_by.iter().map(render_sort_item).collect();
        parts.push(format!("ORDER BY {}", orders.join(", ")));
    }

    parts.join(" ")
}

pub fn render_expr(expr: &SqlExpr) -> String {
    match expr {
        SqlExpr::Field(name) => name.clone(),
        SqlExpr::Parameter(name) => format!("&{}", name),
    }
}

fn render_condition(condition: &Condition) -> String {
    match condition {
        Condition::Equals { left, right } => {
            format!("{} = {}", render_expr(left), render_expr(right))
        }
    }
}

fn render_sort_item(item: &SortItem) -> String {
    let mut s = render_expr(&item.expr);
    if item.direction.is_descending() {
        s.push_str(" DESC");
    }
    s
}
