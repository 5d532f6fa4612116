use crate::pattern::PatternError;
use std::fmt;

/// Route registration error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterError {
    /// The path pattern failed to compile
    Pattern(PatternError),
    /// The route name is already used by a different pattern
    DuplicateName {
        /// The contested name
        name: String,
        /// Pattern that already owns the name
        existing: String,
    },
}

impl fmt::Display for RegisterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterError::Pattern(err) => write!(f, "{err}"),
            RegisterError::DuplicateName { name, existing } => write!(
                f,
                "route name '{name}' is already registered for pattern '{existing}'"
            ),
        }
    }
}

impl std::error::Error for RegisterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RegisterError::Pattern(err) => Some(err),
            RegisterError::DuplicateName { .. } => None,
        }
    }
}

impl From<PatternError> for RegisterError {
    fn from(err: PatternError) -> Self {
        RegisterError::Pattern(err)
    }
}
