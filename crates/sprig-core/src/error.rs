use std::fmt;

use thiserror::Error;

pub const ERROR_TAG: &str = "\x1b[31m[ERROR]\x1b[0m";

pub type Result<T, E = SprigError> = std::result::Result<T, E>;

/// Location of the first character of a form in its source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Position {
    pub file: String,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

#[derive(Error, Clone, Debug, PartialEq)]
pub enum ReadErrorKind {
    #[error("unexpected EOF while reading {0}")]
    UnexpectedEof(String),

    #[error("unmatched delimiter '{0}'")]
    UnmatchedDelimiter(char),

    #[error("illegal number format '{0}'")]
    NumberFormat(String),

    #[error("illegal escape sequence '\\{0}'")]
    IllegalEscape(char),

    #[error("unsupported character '\\{0}'")]
    UnsupportedChar(String),

    #[error("invalid unicode character '\\{0}'")]
    InvalidUnicode(String),

    #[error("cannot quote a no-op form")]
    NoOpQuote,

    #[error("{0}")]
    Custom(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReadErrorData {
    pub kind: ReadErrorKind,
    pub position: Option<Position>,
}

impl ReadErrorData {
    pub fn new(kind: ReadErrorKind) -> Self {
        Self {
            kind,
            position: None,
        }
    }
}

impl fmt::Display for ReadErrorData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.position {
            Some(pos) => write!(
                f,
                "syntax error in '{}' (line {}, col {}): {}",
                pos.file, pos.line, pos.column, self.kind
            ),
            None => write!(f, "syntax error: {}", self.kind),
        }
    }
}

#[derive(Error, Clone, Debug, PartialEq)]
pub enum SprigError {
    #[error("{0}")]
    Read(ReadErrorData),

    #[error("unable to resolve symbol '{name}': not found")]
    NotFound { name: String },

    #[error("invalid {form} form: expected {expected}, got {actual}")]
    InvalidSpecialForm {
        form: String,
        expected: String,
        actual: String,
    },

    #[error("value of type '{type_name}' is not invokable")]
    NotInvokable { type_name: String },

    #[error("invalid argument type: expected={expected}, actual={actual}")]
    InvalidArgumentType { expected: String, actual: String },

    #[error("invalid number of arguments: expected {expected}, got {actual}")]
    InvalidNumberOfArguments { expected: String, actual: usize },

    #[error("stack-limit exceeded (max-depth={max_depth})")]
    StackOverflow { max_depth: usize },

    #[error("cannot compare values of type '{left}' and '{right}'")]
    IncomparableTypes { left: String, right: String },

    #[error("invalid name for def: '{0}'")]
    InvalidBindName(String),

    #[error("pop from empty stack")]
    EmptyStack,

    #[error("execution interrupted")]
    Interrupted,

    #[error("runtime error: {0}")]
    Runtime(String),
}

impl SprigError {
    pub fn read(kind: ReadErrorKind) -> Self {
        SprigError::Read(ReadErrorData::new(kind))
    }

    pub fn not_found(name: impl Into<String>) -> Self {
        SprigError::NotFound { name: name.into() }
    }

    pub fn special_form(
        form: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        SprigError::InvalidSpecialForm {
            form: form.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn arg_type(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        SprigError::InvalidArgumentType {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn arg_count(expected: impl Into<String>, actual: usize) -> Self {
        SprigError::InvalidNumberOfArguments {
            expected: expected.into(),
            actual,
        }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        SprigError::Runtime(message.into())
    }

    /// Attach the start position of the form being read. Errors that already
    /// carry a position keep it, so the innermost form wins.
    pub fn at(self, position: Position) -> Self {
        match self {
            SprigError::Read(mut data) => {
                if data.position.is_none() {
                    data.position = Some(position);
                }
                SprigError::Read(data)
            }
            other => SprigError::Read(ReadErrorData {
                kind: ReadErrorKind::Custom(other.to_string()),
                position: Some(position),
            }),
        }
    }

    pub fn position(&self) -> Option<&Position> {
        match self {
            SprigError::Read(data) => data.position.as_ref(),
            _ => None,
        }
    }

    pub fn read_kind(&self) -> Option<&ReadErrorKind> {
        match self {
            SprigError::Read(data) => Some(&data.kind),
            _ => None,
        }
    }
}

pub fn format_error(err: &SprigError) -> Vec<String> {
    let mut lines = Vec::new();
    match err {
        SprigError::Read(data) => {
            lines.push(format!("{} {}", ERROR_TAG, data.kind));
            if let Some(pos) = &data.position {
                lines.push(format!("  at {}", pos));
            }
        }
        other => lines.push(format!("{} {}", ERROR_TAG, other)),
    }
    lines
}

impl From<String> for SprigError {
    fn from(s: String) -> Self {
        SprigError::runtime(s)
    }
}

impl From<&str> for SprigError {
    fn from(s: &str) -> Self {
        SprigError::runtime(s.to_string())
    }
}
