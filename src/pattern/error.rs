use std::fmt;

/// Route pattern compilation error
///
/// Returned by [`RoutePattern::compile`](super::RoutePattern::compile) when a
/// path specification is malformed. Patterns are compiled at registration
/// time, so every variant surfaces during application setup and never while
/// serving a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    /// The pattern does not start with `/`
    MissingLeadingSlash {
        /// The offending pattern
        pattern: String,
    },
    /// A `:` or `{}` parameter has no name
    EmptyParamName {
        /// The offending pattern
        pattern: String,
        /// The segment containing the empty parameter
        segment: String,
    },
    /// A `?` optional marker on a segment that is not a single parameter
    OptionalNotSimple {
        /// The offending pattern
        pattern: String,
        /// The segment carrying the marker
        segment: String,
    },
    /// A parameter name contains characters outside `[A-Za-z0-9_]`
    InvalidParamName {
        /// The offending pattern
        pattern: String,
        /// The rejected name
        name: String,
    },
    /// An opening `{` or `(` is never closed, or a closing one is never opened
    Unbalanced {
        /// The offending pattern
        pattern: String,
        /// The segment containing the unbalanced delimiter
        segment: String,
        /// The delimiter that failed to balance
        delimiter: char,
    },
    /// The same parameter name appears twice in one pattern
    DuplicateParam {
        /// The offending pattern
        pattern: String,
        /// The repeated name
        name: String,
    },
    /// A custom parameter regex failed to compile
    InvalidRegex {
        /// The offending pattern
        pattern: String,
        /// Regex compiler diagnostic
        message: String,
    },
    /// An optional `?:name` parameter appears before the final segment
    OptionalNotLast {
        /// The offending pattern
        pattern: String,
        /// Name of the misplaced optional parameter
        name: String,
    },
    /// More than one `*` wildcard in a single pattern
    MultipleWildcards {
        /// The offending pattern
        pattern: String,
    },
    /// The `*.*` path/extension wildcard appears before the final segment
    PathExtNotLast {
        /// The offending pattern
        pattern: String,
    },
}

impl PatternError {
    /// The raw pattern string that failed to compile.
    #[must_use]
    pub fn pattern(&self) -> &str {
        match self {
            PatternError::MissingLeadingSlash { pattern }
            | PatternError::EmptyParamName { pattern, .. }
            | PatternError::OptionalNotSimple { pattern, .. }
            | PatternError::InvalidParamName { pattern, .. }
            | PatternError::Unbalanced { pattern, .. }
            | PatternError::DuplicateParam { pattern, .. }
            | PatternError::InvalidRegex { pattern, .. }
            | PatternError::OptionalNotLast { pattern, .. }
            | PatternError::MultipleWildcards { pattern }
            | PatternError::PathExtNotLast { pattern } => pattern,
        }
    }
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternError::MissingLeadingSlash { pattern } => {
                write!(f, "route pattern '{pattern}' must start with '/'")
            }
            PatternError::EmptyParamName { pattern, segment } => write!(
                f,
                "route pattern '{pattern}': segment '{segment}' declares a parameter without a name"
            ),
            PatternError::OptionalNotSimple { pattern, segment } => write!(
                f,
                "route pattern '{pattern}': optional segment '{segment}' must be a single parameter"
            ),
            PatternError::InvalidParamName { pattern, name } => write!(
                f,
                "route pattern '{pattern}': parameter name '{name}' may only contain letters, digits and '_'"
            ),
            PatternError::Unbalanced {
                pattern,
                segment,
                delimiter,
            } => write!(
                f,
                "route pattern '{pattern}': unbalanced '{delimiter}' in segment '{segment}'"
            ),
            PatternError::DuplicateParam { pattern, name } => write!(
                f,
                "route pattern '{pattern}': parameter '{name}' is declared more than once"
            ),
            PatternError::InvalidRegex { pattern, message } => {
                write!(f, "route pattern '{pattern}': invalid regex: {message}")
            }
            PatternError::OptionalNotLast { pattern, name } => write!(
                f,
                "route pattern '{pattern}': optional parameter '{name}' must be in the last segment"
            ),
            PatternError::MultipleWildcards { pattern } => write!(
                f,
                "route pattern '{pattern}': only one '*' wildcard is allowed"
            ),
            PatternError::PathExtNotLast { pattern } => write!(
                f,
                "route pattern '{pattern}': '*.*' must be the last segment"
            ),
        }
    }
}

impl std::error::Error for PatternError {}
