//! Command-line errors.

use std::fmt;

use kvconf::ConfError;

#[derive(Debug, Clone, PartialEq)]
pub enum CliError {
    /// Required members no token named, by display name.
    RequiredNotFound { names: Vec<String> },
    /// A bare token with no positional member left to take it.
    PositionalExhausted { value: String },
    /// Applying the lines failed.
    Conf(ConfError),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::RequiredNotFound { names } => {
                write!(f, "missing required argument(s): {}", names.join(", "))
            }
            CliError::PositionalExhausted { value } => {
                write!(f, "unexpected argument '{}'", value)
            }
            CliError::Conf(error) => write!(f, "{error}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Conf(error) => Some(error),
            _ => None,
        }
    }
}

impl From<ConfError> for CliError {
    fn from(error: ConfError) -> Self {
        CliError::Conf(error)
    }
}
