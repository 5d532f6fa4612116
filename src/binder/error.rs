use super::types::ParamSource;
use http::StatusCode;
use std::fmt;

/// Binding failure. Always a client error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingError {
    /// A required parameter was absent (or empty) and had no default
    Missing {
        /// Argument name
        name: String,
        /// Where it was looked up
        source: ParamSource,
    },
    /// The raw value could not be converted to the declared type
    Conversion {
        /// Argument name
        name: String,
        /// Offending raw value
        value: String,
        /// Declared target type, e.g. `i32` or `list<bool>`
        target: String,
        /// Parser diagnostic
        reason: String,
    },
}

impl BindingError {
    /// HTTP status for this error (always 400).
    #[must_use]
    pub fn status(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    /// Name of the parameter that failed.
    #[must_use]
    pub fn param(&self) -> &str {
        match self {
            BindingError::Missing { name, .. } | BindingError::Conversion { name, .. } => name,
        }
    }
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingError::Missing { name, source } => {
                write!(f, "missing required {source} parameter '{name}'")
            }
            BindingError::Conversion {
                name,
                value,
                target,
                reason,
            } => write!(
                f,
                "parameter '{name}': cannot convert '{value}' to {target}: {reason}"
            ),
        }
    }
}

impl std::error::Error for BindingError {}
