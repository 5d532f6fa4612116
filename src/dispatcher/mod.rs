//! # Dispatcher Module
//!
//! Drives each request through the pipeline: route matching, the filter
//! positions, parameter binding, handler invocation, rendering and the
//! finish filters.
//!
//! ## Request Flow
//!
//! 1. POST requests carrying `_method=PUT|DELETE|PATCH` are re-labelled
//!    (when enabled)
//! 2. `before_static` filters run, then static directories are checked
//! 3. `before_router` filters run; they see every path, matched or not
//! 4. The [`Router`](crate::router::Router) resolves the route; 404 and 405
//!    end the request here
//! 5. `before_exec` filters run; an abort or a written response at any
//!    before position stops the pipeline
//! 6. Declared parameters are bound; the first failure is a 400
//! 7. The handler runs inside a panic boundary
//! 8. `after_exec` filters run, then the handler's result is rendered
//! 9. `finish` filters always run, each inside its own panic boundary
//!
//! Around filters wrap steps 1 to 8.
//!
//! ## Error Handling
//!
//! Every failure is a [`DispatchError`] rendered as a JSON body:
//! - Unmatched paths return 404, unbound methods 405 with an `Allow` header
//! - Binding failures return 400 naming the parameter
//! - Handler and filter panics return 500; the panic message is only
//!   included with [`DispatchConfig::expose_fault_details`]
//!
//! [`Dispatcher::with_error_handler`] replaces the body for one status
//! with a custom renderer.
//!
//! The outcome of each request is also returned as a [`DispatchReport`].

mod core;
mod error;

pub use core::{DispatchConfig, DispatchReport, DispatchState, Dispatcher, ErrorHandler};
pub use error::DispatchError;
