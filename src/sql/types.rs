//! SQL AST emitted by the clause transformers.
//!
//! Deliberately small: field and parameter references, a single equality
//! condition, and one SELECT statement shape.
use crate::value::Value;

/// Scalar expression inside a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlExpr {
    /// Column reference by name.
    Field(String),
    /// Bound parameter placeholder, rendered `&name`.
    Parameter(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Equals { left: SqlExpr, right: SqlExpr },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn is_descending(&self) -> bool {
        matches!(self, SortDirection::Descending)
    }
}

/// ORDER BY entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortItem {
    pub expr: SqlExpr,
    pub direction: SortDirection,
}

/// `SELECT <columns|*> FROM <source> [WHERE ..] [ORDER BY ..]`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectStatement {
    /// Empty means `*`.
    pub columns: Vec<SqlExpr>,
    pub source: String,
    pub filter: Option<Condition>,
    pub order_by: Vec<SortItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqlParameter {
    pub name: String,
    pub value: Value,
}

/// Query text plus its bound parameters, in allocation order.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlCommand {
    pub text: String,
    pub parameters: Vec<SqlParameter>,
}

impl SqlCommand {
    pub fn new(text: impl Into<String>, parameters: Vec<SqlParameter>) -> Self {
        Self {
            text: text.into(),
            parameters,
        }
    }

    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_statement() {
        let s = SelectStatement::default();
        assert!(s.columns.is_empty());
        assert!(s.filter.is_none());
        assert!(s.order_by.is_empty());
    }

    #[test]
    fn test_command_parameter_lookup() {
        let cmd = SqlCommand::new(
            "SELECT * FROM Goods WHERE Name = &p1",
            vec![SqlParameter {
                name: "p1".into(),
                value: Value::from("Tea"),
            }],
        );
        assert_eq!(cmd.parameter("p1"), Some(&Value::from("Tea")));
        assert!(cmd.parameter("p2").is_none());
    }

    #[test]
    fn test_sort_direction_default() {
        assert_eq!(SortDirection::default(), SortDirection::Ascending);
        assert!(SortDirection::Descending.is_descending());
    }
}
