//! Error types for binding.

use std::borrow::Cow;
use std::fmt;

use kvconf_tokenizer::Span;

/// A conversion failure while applying a pair.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfError {
    pub kind: ConfErrorKind,
    /// The key of the pair being applied, as written.
    pub key: Option<String>,
    /// Location of the offending value in the source text.
    pub span: Option<Span>,
}

impl ConfError {
    pub fn new(kind: ConfErrorKind) -> Self {
        Self {
            kind,
            key: None,
            span: None,
        }
    }

    pub fn custom(message: impl Into<String>) -> Self {
        Self::new(ConfErrorKind::Custom(message.into()))
    }

    /// Attach the pair that failed. The innermost pair is kept.
    pub fn at(mut self, key: &str, span: Span) -> Self {
        if self.key.is_none() {
            self.key = Some(key.to_string());
            self.span = Some(span);
        }
        self
    }
}

impl fmt::Display for ConfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(key) = &self.key {
            write!(f, " for key '{}'", key)?;
        }
        if let Some(span) = &self.span {
            write!(f, " at offset {}", span.start)?;
        }
        Ok(())
    }
}

impl std::error::Error for ConfError {}

impl From<ConfErrorKind> for ConfError {
    fn from(kind: ConfErrorKind) -> Self {
        ConfError::new(kind)
    }
}

/// Kind of conversion failure.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfErrorKind {
    /// Text is not a valid value of the target type.
    InvalidValue {
        value: String,
        expected: Cow<'static, str>,
    },
    /// The type has no structural conversion from text and no converter,
    /// type name or factory matched.
    NoConversion {
        value: String,
        type_name: &'static str,
    },
    /// A type reference named a type that is not registered.
    UnknownType { name: String },
    /// A value had to be default-constructed but the type has no default.
    MissingDefault { type_name: &'static str },
    /// A converter produced a value of the wrong type.
    TypeMismatch { expected: &'static str },
    /// A sequence index at or past the member's length limit.
    IndexOutOfRange { index: usize, max: usize },
    /// Failure reported by a custom converter.
    Custom(String),
}

impl ConfErrorKind {
    pub fn invalid(value: &str, expected: impl Into<Cow<'static, str>>) -> Self {
        ConfErrorKind::InvalidValue {
            value: value.to_string(),
            expected: expected.into(),
        }
    }
}

impl fmt::Display for ConfErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfErrorKind::InvalidValue { value, expected } => {
                write!(f, "invalid value '{}', expected {}", value, expected)
            }
            ConfErrorKind::NoConversion { value, type_name } => {
                write!(f, "cannot convert '{}' to {}", value, type_name)
            }
            ConfErrorKind::UnknownType { name } => {
                write!(f, "unknown type '{}'", name)
            }
            ConfErrorKind::MissingDefault { type_name } => {
                write!(f, "{} has no default value", type_name)
            }
            ConfErrorKind::TypeMismatch { expected } => {
                write!(f, "converter did not produce a {}", expected)
            }
            ConfErrorKind::IndexOutOfRange { index, max } => {
                write!(f, "index {} is past the limit of {} elements", index, max)
            }
            ConfErrorKind::Custom(message) => f.write_str(message),
        }
    }
}
