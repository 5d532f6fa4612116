//! Handler invocation contract.
//!
//! A handler receives the [`RequestContext`] and the bound [`Args`] and
//! returns anything that implements [`IntoOutcome`]. The render step
//! normalises the resulting [`Outcome`] into a response.
//!
//! ```rust
//! use hiverouter::binder::Args;
//! use hiverouter::context::RequestContext;
//! use hiverouter::handler::{HandlerError, Json};
//! use serde_json::json;
//!
//! fn get_user(_ctx: &mut RequestContext, args: &Args) -> Result<Json<serde_json::Value>, HandlerError> {
//!     let id: i64 = args.get("id").ok_or_else(|| HandlerError::new("id not bound"))?;
//!     Ok(Json(json!({ "id": id })))
//! }
//! ```

use crate::binder::Args;
use crate::context::RequestContext;
use http::StatusCode;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Error value returned by a handler.
///
/// Renders as a JSON error body with `status`, or 500 when unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerError {
    pub status: Option<StatusCode>,
    pub message: String,
}

impl HandlerError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn with_status(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Status used when rendering.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HandlerError {}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<anyhow::Error> for HandlerError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(format!("{err:#}"))
    }
}

impl From<std::io::Error> for HandlerError {
    fn from(err: std::io::Error) -> Self {
        Self::new(err.to_string())
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// Normalised handler result.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Nothing returned; whatever the handler wrote stands
    Void,
    /// The handler wrote the response itself
    Rendered,
    /// JSON body with status 200 unless the handler set another
    Json(Value),
    /// Plain-text body
    Text(String),
    /// Bare status code, empty body
    Status(StatusCode),
    Redirect {
        status: StatusCode,
        location: String,
    },
    Error(HandlerError),
    /// A value that failed to serialize; rendering reports it
    Unserializable(String),
}

/// Conversion of handler return values into an [`Outcome`].
pub trait IntoOutcome {
    fn into_outcome(self) -> Outcome;
}

impl IntoOutcome for Outcome {
    fn into_outcome(self) -> Outcome {
        self
    }
}

impl IntoOutcome for () {
    fn into_outcome(self) -> Outcome {
        Outcome::Void
    }
}

impl IntoOutcome for Value {
    fn into_outcome(self) -> Outcome {
        Outcome::Json(self)
    }
}

impl IntoOutcome for String {
    fn into_outcome(self) -> Outcome {
        Outcome::Text(self)
    }
}

impl IntoOutcome for &'static str {
    fn into_outcome(self) -> Outcome {
        Outcome::Text(self.to_string())
    }
}

impl IntoOutcome for StatusCode {
    fn into_outcome(self) -> Outcome {
        Outcome::Status(self)
    }
}

impl IntoOutcome for HandlerError {
    fn into_outcome(self) -> Outcome {
        Outcome::Error(self)
    }
}

/// Serialize any value as a JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoOutcome for Json<T> {
    fn into_outcome(self) -> Outcome {
        match serde_json::to_value(&self.0) {
            Ok(v) => Outcome::Json(v),
            Err(e) => Outcome::Unserializable(e.to_string()),
        }
    }
}

/// Redirect result; defaults to 302 Found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub status: StatusCode,
    pub location: String,
}

impl Redirect {
    #[must_use]
    pub fn to(location: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FOUND,
            location: location.into(),
        }
    }

    #[must_use]
    pub fn permanent(location: impl Into<String>) -> Self {
        Self {
            status: StatusCode::MOVED_PERMANENTLY,
            location: location.into(),
        }
    }
}

impl IntoOutcome for Redirect {
    fn into_outcome(self) -> Outcome {
        Outcome::Redirect {
            status: self.status,
            location: self.location,
        }
    }
}

impl<T: IntoOutcome, E: Into<HandlerError>> IntoOutcome for Result<T, E> {
    fn into_outcome(self) -> Outcome {
        match self {
            Ok(v) => v.into_outcome(),
            Err(e) => Outcome::Error(e.into()),
        }
    }
}

/// A request handler.
///
/// Implemented for every `Fn(&mut RequestContext, &Args) -> impl IntoOutcome`
/// that is `Send + Sync + 'static`.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, ctx: &mut RequestContext, args: &Args) -> Outcome;
}

impl<F, R> Handler for F
where
    F: Fn(&mut RequestContext, &Args) -> R + Send + Sync + 'static,
    R: IntoOutcome,
{
    fn call(&self, ctx: &mut RequestContext, args: &Args) -> Outcome {
        self(ctx, args).into_outcome()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_result_conversion() {
        let ok: Result<Value, HandlerError> = Ok(json!({"a": 1}));
        assert_eq!(ok.into_outcome(), Outcome::Json(json!({"a": 1})));

        let err: Result<(), &str> = Err("boom");
        assert_eq!(
            err.into_outcome(),
            Outcome::Error(HandlerError::new("boom"))
        );
    }

    #[test]
    fn test_handler_error_default_status() {
        assert_eq!(HandlerError::new("x").status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            HandlerError::with_status(StatusCode::CONFLICT, "x").status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_json_serialization_failure() {
        let mut map = HashMap::new();
        map.insert((1, 2), "tuple keys are not JSON");
        assert!(matches!(Json(map).into_outcome(), Outcome::Unserializable(_)));
    }

    #[test]
    fn test_closure_is_handler() {
        let handler = |ctx: &mut RequestContext, _args: &Args| format!("hello {}", ctx.path());
        let mut ctx = RequestContext::new(http::Method::GET, "/world");
        assert_eq!(
            Handler::call(&handler, &mut ctx, &Args::new()),
            Outcome::Text("hello /world".into())
        );
    }
}
