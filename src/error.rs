use std::fmt;

use thiserror::Error;

/// Errors raised while compiling query expressions or reading results.
///
/// None of these are retried internally. Each variant carries enough context
/// (expression text, method name, state name) to diagnose the failure
/// without additional logging.
#[derive(Error, Debug)]
pub enum Error {
    /// An expression does not match any recognized clause pattern.
    #[error("unsupported expression shape `{expression}`: {reason}")]
    UnsupportedExpressionShape { expression: String, reason: String },

    /// A builder event arrived in a state that does not permit it.
    #[error("{method} is not allowed in state {state}")]
    InvalidSequencing { method: &'static str, state: String },

    /// Row access outside of a current row, or any access after close.
    #[error("{operation} is not allowed while the reader is in state {state}")]
    InvalidCursorState { operation: &'static str, state: String },

    /// Reader capability that is deliberately not provided.
    #[error("{0} is not implemented")]
    NotImplementedFeature(&'static str),

    #[error("field ordinal {ordinal} is out of range (field count {count})")]
    FieldOutOfRange { ordinal: usize, count: usize },

    #[error("field `{0}` is out of range: no such field")]
    UnknownField(String),

    /// A raw value could not be converted to the requested target.
    #[error("cannot convert {value} to {target}")]
    Conversion { target: String, value: String },

    /// Item types of the composed query do not line up.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Failure reported by an external collaborator (executor, cursor).
    #[error("data source error: {0}")]
    Source(String),

    /// Any compilation failure, wrapped with the whole query expression.
    #[error("failed to compile `{expression}`: {source}")]
    Compilation {
        expression: String,
        #[source]
        source: Box<Error>,
    },
}

/// Flat classification of [`Error`], looking through compilation context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnsupportedExpressionShape,
    InvalidSequencing,
    InvalidCursorState,
    NotImplementedFeature,
    OutOfRange,
    Conversion,
    InvalidQuery,
    Source,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::UnsupportedExpressionShape => write!(f, "Unsupported Expression"),
            ErrorKind::InvalidSequencing => write!(f, "Invalid Sequencing"),
            ErrorKind::InvalidCursorState => write!(f, "Invalid Cursor State"),
            ErrorKind::NotImplementedFeature => write!(f, "Not Implemented"),
            ErrorKind::OutOfRange => write!(f, "Out Of Range"),
            ErrorKind::Conversion => write!(f, "Conversion Error"),
            ErrorKind::InvalidQuery => write!(f, "Invalid Query"),
            ErrorKind::Source => write!(f, "Data Source Error"),
        }
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnsupportedExpressionShape { .. } => ErrorKind::UnsupportedExpressionShape,
            Error::InvalidSequencing { .. } => ErrorKind::InvalidSequencing,
            Error::InvalidCursorState { .. } => ErrorKind::InvalidCursorState,
            Error::NotImplementedFeature(_) => ErrorKind::NotImplementedFeature,
            Error::FieldOutOfRange { .. } | Error::UnknownField(_) => ErrorKind::OutOfRange,
            Error::Conversion { .. } => ErrorKind::Conversion,
            Error::InvalidQuery(_) => ErrorKind::InvalidQuery,
            Error::Source(_) => ErrorKind::Source,
            Error::Compilation { source, .. } => source.kind(),
        }
    }

    pub(crate) fn unsupported(expression: impl fmt::Display, reason: impl Into<String>) -> Self {
        Error::UnsupportedExpressionShape {
            expression: expression.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn conversion(target: impl fmt::Display, value: impl fmt::Debug) -> Self {
        Error::Conversion {
            target: target.to_string(),
            value: format!("{:?}", value),
        }
    }

    /// Attach the text of the query being compiled. Already wrapped errors
    /// are returned unchanged.
    pub(crate) fn in_compilation(self, expression: impl fmt::Display) -> Self {
        match self {
            wrapped @ Error::Compilation { .. } => wrapped,
            other => Error::Compilation {
                expression: expression.to_string(),
                source: Box::new(other),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_looks_through_compilation() {
        let err = Error::InvalidSequencing {
            method: "handle_filter",
            state: "Sorting".into(),
        }
        .in_compilation("records(Goods)");
        assert_eq!(err.kind(), ErrorKind::InvalidSequencing);
        assert!(err.to_string().contains("records(Goods)"));
        assert!(err.to_string().contains("handle_filter"));
    }

    #[test]
    fn test_compilation_context_not_doubled() {
        let err = Error::InvalidQuery("x".into())
            .in_compilation("outer")
            .in_compilation("again");
        match err {
            Error::Compilation { expression, .. } => assert_eq!(expression, "outer"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_out_of_range_kinds() {
        assert_eq!(
            Error::FieldOutOfRange { ordinal: 4, count: 3 }.kind(),
            ErrorKind::OutOfRange
        );
        assert_eq!(
            Error::UnknownField("Missing".into()).kind(),
            ErrorKind::OutOfRange
        );
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ErrorKind::InvalidCursorState.to_string(), "Invalid Cursor State");
        assert_eq!(ErrorKind::Source.to_string(), "Data Source Error");
    }
}
