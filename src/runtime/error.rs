use std::fmt;

use thiserror::Error;

pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Script-visible error category, printed before the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    TypeError,
    ReferenceError,
    RangeError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::TypeError => "TypeError",
            Self::ReferenceError => "ReferenceError",
            Self::RangeError => "RangeError",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    Delete,
}

impl Access {
    const fn verb(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "set",
            Self::Delete => "delete",
        }
    }

    const fn gerund(self) -> &'static str {
        match self {
            Self::Read => "reading",
            Self::Write => "setting",
            Self::Delete => "deleting",
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("{callee} is not a function")]
    NotCallable { callee: String },

    #[error("{callee} is not a constructor")]
    NotConstructor { callee: String },

    #[error("prototype chain longer than {limit} links while looking up '{key}'")]
    ChainDepthExceeded { key: String, limit: usize },

    #[error("Cyclic __proto__ value")]
    CyclicParent,

    #[error(
        "Cannot {verb} properties of {base} ({gerund} '{key}')",
        verb = .access.verb(),
        gerund = .access.gerund()
    )]
    PropertyOfNullish {
        base: &'static str,
        key: String,
        access: Access,
    },

    #[error("{name} is not defined")]
    UnboundIdentifier { name: String },

    #[error("Assignment to constant variable '{name}'.")]
    AssignToConst { name: String },

    #[error("Identifier '{name}' has already been declared")]
    Redeclared { name: String },

    #[error("Maximum call stack size exceeded (limit {limit})")]
    CallStackExceeded { limit: usize },

    /// Argument or operand errors raised by operators and built-ins.
    #[error("{0}")]
    Type(String),
}

impl RuntimeError {
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::Type(message.into())
    }

    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UnboundIdentifier { .. } => ErrorKind::ReferenceError,
            Self::ChainDepthExceeded { .. } | Self::CallStackExceeded { .. } => {
                ErrorKind::RangeError
            }
            Self::NotCallable { .. }
            | Self::NotConstructor { .. }
            | Self::CyclicParent
            | Self::PropertyOfNullish { .. }
            | Self::AssignToConst { .. }
            | Self::Redeclared { .. }
            | Self::Type(_) => ErrorKind::TypeError,
        }
    }

    /// The line a REPL prints for an error that escaped to the top level.
    pub fn uncaught(&self) -> String {
        format!("Uncaught {}: {self}", self.kind())
    }
}
