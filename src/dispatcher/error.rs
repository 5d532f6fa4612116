use crate::binder::BindingError;
use crate::context::Response;
use http::{Method, StatusCode};
use serde_json::{json, Value};
use std::fmt;

/// Why a request did not complete normally.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchError {
    /// No route matched the path
    NotFound { method: Method, path: String },
    /// The path matched but no route bound the method
    MethodNotAllowed {
        method: Method,
        path: String,
        allowed: Vec<Method>,
    },
    /// A filter or handler aborted the request, or a filter wrote the
    /// response itself
    FilterAborted { status: StatusCode, message: String },
    /// A declared parameter was missing or failed to convert
    Binding(BindingError),
    /// The handler (or a before/after filter) panicked
    HandlerFault { message: String },
    /// The handler's result could not be written
    RenderError { message: String },
}

impl DispatchError {
    /// HTTP status this error renders with.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::NotFound { .. } => StatusCode::NOT_FOUND,
            DispatchError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            DispatchError::FilterAborted { status, .. } => *status,
            DispatchError::Binding(err) => err.status(),
            DispatchError::HandlerFault { .. } | DispatchError::RenderError { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Short machine-readable kind, used in logs and stats.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::NotFound { .. } => "not_found",
            DispatchError::MethodNotAllowed { .. } => "method_not_allowed",
            DispatchError::FilterAborted { .. } => "filter_aborted",
            DispatchError::Binding(_) => "binding",
            DispatchError::HandlerFault { .. } => "handler_fault",
            DispatchError::RenderError { .. } => "render_error",
        }
    }

    /// JSON error body.
    ///
    /// Panic messages only appear when `expose_fault_details` is set;
    /// otherwise faults render as a generic message.
    #[must_use]
    pub fn to_json(&self, expose_fault_details: bool) -> Value {
        match self {
            DispatchError::NotFound { method, path } => json!({
                "error": "Not Found",
                "method": method.as_str(),
                "path": path,
            }),
            DispatchError::MethodNotAllowed {
                method,
                path,
                allowed,
            } => json!({
                "error": "Method Not Allowed",
                "method": method.as_str(),
                "path": path,
                "allowed": allowed.iter().map(Method::as_str).collect::<Vec<_>>(),
            }),
            DispatchError::FilterAborted { message, .. } => json!({ "error": message }),
            DispatchError::Binding(err) => json!({
                "error": "Bad Request",
                "param": err.param(),
                "message": err.to_string(),
            }),
            DispatchError::HandlerFault { message } if expose_fault_details => json!({
                "error": "Internal Server Error",
                "details": message,
            }),
            DispatchError::RenderError { message } if expose_fault_details => json!({
                "error": "Internal Server Error",
                "details": message,
            }),
            DispatchError::HandlerFault { .. } | DispatchError::RenderError { .. } => {
                json!({ "error": "Internal Server Error" })
            }
        }
    }

    /// Replace the body of `response` with this error's status and JSON
    /// body. Headers already set (by filters, say) are kept.
    ///
    /// A 405 also gets an `Allow` header listing the bound methods.
    pub fn write_to(&self, response: &mut Response, expose_fault_details: bool) {
        response.clear_body();
        if let DispatchError::MethodNotAllowed { allowed, .. } = self {
            let allow = allowed
                .iter()
                .map(Method::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            response.set_header("Allow", allow);
        }
        // A `Value` always serializes.
        let _ = response.write_json(self.status(), &self.to_json(expose_fault_details));
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::NotFound { method, path } => {
                write!(f, "no route for {method} {path}")
            }
            DispatchError::MethodNotAllowed {
                method,
                path,
                allowed,
            } => write!(
                f,
                "method {method} not allowed for {path} (allowed: {})",
                allowed
                    .iter()
                    .map(Method::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            DispatchError::FilterAborted { status, message } => {
                write!(f, "aborted by filter with {status}: {message}")
            }
            DispatchError::Binding(err) => write!(f, "{err}"),
            DispatchError::HandlerFault { message } => write!(f, "handler panicked: {message}"),
            DispatchError::RenderError { message } => {
                write!(f, "failed to render response: {message}")
            }
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::Binding(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BindingError> for DispatchError {
    fn from(err: BindingError) -> Self {
        DispatchError::Binding(err)
    }
}
