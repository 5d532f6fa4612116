//! # Binder Module
//!
//! Converts raw request values into typed handler arguments.
//!
//! A route declares its arguments as [`MethodParam`]s (name, source, kind,
//! required flag, default). [`bind`] resolves each against the
//! [`RequestContext`](crate::context::RequestContext) and converts it with
//! the parser for its [`ParamKind`]. Failures are [`BindingError`]s, which
//! the dispatcher turns into 400 responses without invoking the handler.

mod core;
mod error;
mod parsers;
#[cfg(test)]
mod tests;
mod types;

pub use core::bind;
pub use error::BindingError;
pub use types::{
    Args, FloatWidth, FromParamValue, IntWidth, MethodParam, ParamKind, ParamSource, ParamValue,
};
