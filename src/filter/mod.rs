//! # Filter Module
//!
//! Filters are functions that run at fixed points of the dispatch pipeline
//! for every request whose path matches the filter's pattern.
//!
//! ## Positions
//!
//! | Position | Runs |
//! |----------|------|
//! | [`FilterPosition::BeforeStatic`] | before static files are served |
//! | [`FilterPosition::BeforeRouter`] | before the route lookup, for matched and unmatched paths |
//! | [`FilterPosition::BeforeExec`] | after routing, right before binding and invocation |
//! | [`FilterPosition::AfterExec`] | after the handler returned |
//! | [`FilterPosition::Finish`] | always, once the response is settled |
//!
//! A filter stops the pipeline by calling
//! [`RequestContext::abort`](crate::context::RequestContext::abort) or, when
//! `return_on_output` is set (the default), by writing the response.
//!
//! Around filters registered with [`FilterChain::insert_chain`] wrap the
//! whole pipeline and decide whether it runs by calling [`Next::run`].
//!
//! ```rust
//! use hiverouter::context::RequestContext;
//! use hiverouter::filter::{FilterChain, FilterPosition, Next};
//! use http::StatusCode;
//!
//! let filters = FilterChain::new();
//! filters
//!     .insert("/admin/*", FilterPosition::BeforeRouter, |ctx: &mut RequestContext| {
//!         if ctx.header("authorization").is_none() {
//!             ctx.abort(StatusCode::UNAUTHORIZED, "login required");
//!         }
//!     })
//!     .unwrap();
//! filters
//!     .insert_chain("/*", |ctx: &mut RequestContext, next: Next<'_>| next.run(ctx))
//!     .unwrap();
//! ```

mod core;

pub use core::FilterChain;
pub(crate) use core::panic_message;

use crate::context::RequestContext;
use std::fmt;

/// Point in the pipeline at which a filter runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterPosition {
    BeforeStatic,
    BeforeRouter,
    BeforeExec,
    AfterExec,
    Finish,
}

impl FilterPosition {
    pub(crate) const COUNT: usize = 5;

    /// All positions in pipeline order.
    pub const ALL: [FilterPosition; Self::COUNT] = [
        FilterPosition::BeforeStatic,
        FilterPosition::BeforeRouter,
        FilterPosition::BeforeExec,
        FilterPosition::AfterExec,
        FilterPosition::Finish,
    ];

    pub(crate) fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FilterPosition::BeforeStatic => "before_static",
            FilterPosition::BeforeRouter => "before_router",
            FilterPosition::BeforeExec => "before_exec",
            FilterPosition::AfterExec => "after_exec",
            FilterPosition::Finish => "finish",
        }
    }
}

impl fmt::Display for FilterPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-filter behaviour switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterOptions {
    /// Stop the pipeline once the response has been written (default true)
    pub return_on_output: bool,
    /// Restore route parameters after the filter ran (default false)
    pub reset_params: bool,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            return_on_output: true,
            reset_params: false,
        }
    }
}

impl FilterOptions {
    #[must_use]
    pub fn return_on_output(mut self, enabled: bool) -> Self {
        self.return_on_output = enabled;
        self
    }

    #[must_use]
    pub fn reset_params(mut self, enabled: bool) -> Self {
        self.reset_params = enabled;
        self
    }
}

/// A positional filter.
pub trait Filter: Send + Sync + 'static {
    fn call(&self, ctx: &mut RequestContext);
}

impl<F> Filter for F
where
    F: Fn(&mut RequestContext) + Send + Sync + 'static,
{
    fn call(&self, ctx: &mut RequestContext) {
        self(ctx);
    }
}

/// Continuation handed to an around filter.
pub struct Next<'a> {
    inner: &'a mut dyn FnMut(&mut RequestContext),
}

impl<'a> Next<'a> {
    pub(crate) fn new(inner: &'a mut dyn FnMut(&mut RequestContext)) -> Self {
        Self { inner }
    }

    /// Run the rest of the pipeline.
    pub fn run(self, ctx: &mut RequestContext) {
        (self.inner)(ctx);
    }
}

/// A filter wrapping the pipeline.
pub trait AroundFilter: Send + Sync + 'static {
    fn call(&self, ctx: &mut RequestContext, next: Next<'_>);
}

impl<F> AroundFilter for F
where
    F: Fn(&mut RequestContext, Next<'_>) + Send + Sync + 'static,
{
    fn call(&self, ctx: &mut RequestContext, next: Next<'_>) {
        self(ctx, next);
    }
}
