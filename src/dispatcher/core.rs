use super::error::DispatchError;
use crate::binder::bind;
use crate::context::RequestContext;
use crate::filter::{panic_message, FilterChain, FilterPosition};
use crate::render::render;
use crate::router::{Lookup, RouteMatch, Router};
use crate::static_files::StaticDirs;
use crate::stats::RouteStats;
use http::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn};

/// Dispatcher behaviour switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Include panic and render messages in 500 bodies
    pub expose_fault_details: bool,
    /// Honour `_method=PUT|DELETE|PATCH` on POST requests
    pub method_override: bool,
    /// Record per-route statistics
    pub collect_stats: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            expose_fault_details: false,
            method_override: true,
            collect_stats: true,
        }
    }
}

/// Pipeline stage of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchState {
    Idle,
    Matching,
    FilteringBefore,
    Binding,
    Invoking,
    FilteringAfter,
    Rendering,
    Finishing,
    /// Terminal: the request completed normally
    Done,
    /// Terminal: the request ended with a [`DispatchError`]
    Aborted,
}

impl DispatchState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, DispatchState::Done | DispatchState::Aborted)
    }
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What happened to one request.
#[derive(Debug, Clone)]
pub struct DispatchReport {
    /// Terminal state reached
    pub state: DispatchState,
    pub error: Option<DispatchError>,
    /// Final response status
    pub status: StatusCode,
    /// Pattern of the matched route, if any
    pub route: Option<String>,
    /// Every state entered, in order
    pub trace: Vec<DispatchState>,
}

impl DispatchReport {
    /// Whether the pipeline passed through `state`.
    #[must_use]
    pub fn visited(&self, state: DispatchState) -> bool {
        self.trace.contains(&state)
    }
}

/// Writes the body for a failed request in place of the default JSON.
///
/// Called with the response status already set to the error's status and
/// an empty body.
pub type ErrorHandler = Arc<dyn Fn(&mut RequestContext, &DispatchError) + Send + Sync>;

/// Drives a [`RequestContext`] through the request pipeline.
///
/// ```text
/// Idle → FilteringBefore → Matching → FilteringBefore → Binding → Invoking
///      → FilteringAfter → Rendering → Finishing → Done | Aborted
/// ```
///
/// `before_static` and `before_router` filters run before the route lookup,
/// so they see unmatched paths too. Routing failures (404/405) go straight
/// to `Finishing`. Filters can stop the pipeline at any before/after
/// position; panics in filters or handlers become a 500. Finish filters
/// always run.
pub struct Dispatcher {
    router: Arc<Router>,
    filters: Arc<FilterChain>,
    static_dirs: StaticDirs,
    stats: Arc<RouteStats>,
    config: DispatchConfig,
    error_handlers: HashMap<StatusCode, ErrorHandler>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("router", &self.router)
            .field("filters", &self.filters)
            .field("static_dirs", &self.static_dirs)
            .field("config", &self.config)
            .field("error_handlers", &self.error_handlers.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    #[must_use]
    pub fn new(router: Arc<Router>) -> Self {
        Self {
            router,
            filters: Arc::new(FilterChain::new()),
            static_dirs: StaticDirs::new(),
            stats: Arc::new(RouteStats::new()),
            config: DispatchConfig::default(),
            error_handlers: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_filters(mut self, filters: Arc<FilterChain>) -> Self {
        self.filters = filters;
        self
    }

    #[must_use]
    pub fn with_static_dirs(mut self, static_dirs: StaticDirs) -> Self {
        self.static_dirs = static_dirs;
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    /// Render every error with `status` through `handler` instead of the
    /// default JSON body. A panicking handler falls back to the default.
    #[must_use]
    pub fn with_error_handler<F>(mut self, status: StatusCode, handler: F) -> Self
    where
        F: Fn(&mut RequestContext, &DispatchError) + Send + Sync + 'static,
    {
        self.error_handlers.insert(status, Arc::new(handler));
        self
    }

    #[must_use]
    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    #[must_use]
    pub fn filters(&self) -> &Arc<FilterChain> {
        &self.filters
    }

    #[must_use]
    pub fn stats(&self) -> &Arc<RouteStats> {
        &self.stats
    }

    #[must_use]
    pub fn config(&self) -> DispatchConfig {
        self.config
    }

    /// Run the full pipeline for `ctx`, leaving the response in
    /// `ctx.response()`.
    pub fn dispatch(&self, ctx: &mut RequestContext) -> DispatchReport {
        let span = info_span!(
            "request",
            request_id = %ctx.request_id(),
            method = %ctx.method(),
            path = %ctx.path()
        );
        let _entered = span.enter();

        let mut run = Pipeline {
            dispatcher: self,
            trace: vec![DispatchState::Idle],
            error: None,
            core_ran: false,
        };

        let mut core = |c: &mut RequestContext| run.execute(c);
        let outcome = catch_unwind(AssertUnwindSafe(|| self.filters.run_chain(ctx, &mut core)));
        if let Err(panic) = outcome {
            run.fault(ctx, panic.as_ref(), "Filter panicked");
        } else if !run.core_ran && run.error.is_none() {
            // An around filter did not call `next`.
            run.stopped_by_filter(ctx, "filter chain");
        }

        run.enter(DispatchState::Finishing);
        let _ = self.filters.run(FilterPosition::Finish, ctx);

        let state = if run.error.is_some() {
            DispatchState::Aborted
        } else {
            DispatchState::Done
        };
        run.trace.push(state);

        let status = ctx.response().status();
        let elapsed = ctx.elapsed();
        if self.config.collect_stats {
            if let Some(pattern) = ctx.route_pattern_arc() {
                self.stats
                    .record(pattern, ctx.method().as_str(), elapsed, status.as_u16() >= 400);
            }
        }

        info!(
            status = status.as_u16(),
            state = %state,
            route_pattern = ctx.route_pattern().unwrap_or("-"),
            error_kind = run.error.as_ref().map_or("-", DispatchError::kind),
            duration_us = elapsed.as_micros(),
            "Request completed"
        );

        DispatchReport {
            state,
            error: run.error,
            status,
            route: ctx.route_pattern().map(str::to_string),
            trace: run.trace,
        }
    }

    fn apply_method_override(&self, ctx: &mut RequestContext) {
        if !self.config.method_override || *ctx.method() != Method::POST {
            return;
        }
        let Some(requested) = ctx.query("_method") else {
            return;
        };
        let method = match requested.to_ascii_uppercase().as_str() {
            "PUT" => Method::PUT,
            "DELETE" => Method::DELETE,
            "PATCH" => Method::PATCH,
            _ => return,
        };
        debug!(method = %method, "Method overridden by _method");
        ctx.set_method(method);
    }
}

struct Pipeline<'d> {
    dispatcher: &'d Dispatcher,
    trace: Vec<DispatchState>,
    error: Option<DispatchError>,
    core_ran: bool,
}

impl Pipeline<'_> {
    fn enter(&mut self, state: DispatchState) {
        debug!(state = %state, "Dispatch state");
        self.trace.push(state);
    }

    fn fail(&mut self, ctx: &mut RequestContext, err: DispatchError) {
        self.write_error(ctx, &err);
        self.error = Some(err);
    }

    /// Default JSON body, replaced by the registered handler for the status.
    fn write_error(&self, ctx: &mut RequestContext, err: &DispatchError) {
        let expose = self.dispatcher.config.expose_fault_details;
        err.write_to(ctx.response_mut(), expose);
        let Some(handler) = self.dispatcher.error_handlers.get(&err.status()) else {
            return;
        };

        let response = ctx.response_mut();
        response.clear_body();
        response.remove_header("Content-Type");
        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| handler(ctx, err))) {
            error!(
                status = err.status().as_u16(),
                panic_message = %panic_message(panic.as_ref()),
                "Error handler panicked"
            );
            err.write_to(ctx.response_mut(), expose);
        }
    }

    fn fault(&mut self, ctx: &mut RequestContext, panic: &(dyn Any + Send), what: &str) {
        let message = panic_message(panic);
        let backtrace = std::backtrace::Backtrace::capture();
        error!(
            request_id = %ctx.request_id(),
            route_pattern = ctx.route_pattern().unwrap_or("-"),
            panic_message = %message,
            backtrace = %backtrace,
            "{what} - CRITICAL"
        );
        self.fail(ctx, DispatchError::HandlerFault { message });
    }

    /// Record the stop caused by a filter (or handler) abort or output.
    fn stopped_by_filter(&mut self, ctx: &mut RequestContext, stage: &str) {
        let err = match ctx.abort_signal() {
            Some(signal) => DispatchError::FilterAborted {
                status: signal.status,
                message: signal.message.clone(),
            },
            None => DispatchError::FilterAborted {
                status: ctx.response().status(),
                message: format!("response written by {stage}"),
            },
        };
        if let DispatchError::FilterAborted { status, message } = &err {
            if ctx.is_aborted() {
                if ctx.response().is_started() {
                    ctx.set_status(*status);
                } else {
                    self.write_error(ctx, &err);
                }
            }
            warn!(
                stage = %stage,
                status = status.as_u16(),
                message = %message,
                "Pipeline stopped by filter"
            );
        }
        self.error = Some(err);
    }

    fn run_filters(&mut self, position: FilterPosition, ctx: &mut RequestContext) -> bool {
        self.dispatcher.filters.run(position, ctx).is_continue()
    }

    /// Before filters through Rendering; runs inside the around filters.
    fn execute(&mut self, ctx: &mut RequestContext) {
        self.core_ran = true;
        self.dispatcher.apply_method_override(ctx);

        self.enter(DispatchState::FilteringBefore);
        if !self.run_filters(FilterPosition::BeforeStatic, ctx) {
            return self.stopped_by_filter(ctx, "before_static filter");
        }
        if self.serve_static(ctx) {
            return;
        }
        if !self.run_filters(FilterPosition::BeforeRouter, ctx) {
            return self.stopped_by_filter(ctx, "before_router filter");
        }

        self.enter(DispatchState::Matching);
        let Some(matched) = self.resolve(ctx) else {
            return;
        };

        self.enter(DispatchState::FilteringBefore);
        if !self.run_filters(FilterPosition::BeforeExec, ctx) {
            return self.stopped_by_filter(ctx, "before_exec filter");
        }

        self.enter(DispatchState::Binding);
        let endpoint = &matched.endpoint;
        let args = match bind(endpoint.params(), ctx) {
            Ok(args) => args,
            Err(err) => {
                warn!(
                    param = %err.param(),
                    error = %err,
                    "Parameter binding failed"
                );
                return self.fail(ctx, DispatchError::Binding(err));
            }
        };

        self.enter(DispatchState::Invoking);
        let handler = endpoint.handler();
        let invoked = catch_unwind(AssertUnwindSafe(|| handler.call(ctx, &args)));
        let outcome = match invoked {
            Ok(outcome) => outcome,
            Err(panic) => return self.fault(ctx, panic.as_ref(), "Handler panicked"),
        };
        if ctx.is_aborted() {
            return self.stopped_by_filter(ctx, "handler");
        }

        self.enter(DispatchState::FilteringAfter);
        if !self.run_filters(FilterPosition::AfterExec, ctx) {
            if ctx.is_aborted() {
                return self.stopped_by_filter(ctx, "after_exec filter");
            }
            // Output already written; it stands as is.
            return;
        }

        self.enter(DispatchState::Rendering);
        if let Err(err) = render(outcome, ctx) {
            error!(error = %err, "Render failed");
            self.fail(ctx, err);
        }
    }

    fn serve_static(&mut self, ctx: &mut RequestContext) -> bool {
        let Some((body, content_type)) = self.dispatcher.static_dirs.resolve(ctx.path()) else {
            return false;
        };
        let response = ctx.response_mut();
        response.set_header("Content-Type", content_type);
        response.write(&body);
        debug!(bytes = body.len(), "Static file served");
        true
    }

    fn resolve(&mut self, ctx: &mut RequestContext) -> Option<RouteMatch> {
        match self.dispatcher.router.lookup(ctx.method(), ctx.path()) {
            Lookup::Matched(matched) => {
                ctx.set_route_pattern(matched.route.pattern().raw_arc());
                ctx.params_mut().extend_from(&matched.params);
                Some(matched)
            }
            Lookup::MethodNotAllowed(allowed) => {
                let err = DispatchError::MethodNotAllowed {
                    method: ctx.method().clone(),
                    path: ctx.path().to_string(),
                    allowed,
                };
                warn!(error = %err, "Method not allowed");
                self.fail(ctx, err);
                None
            }
            Lookup::NotFound => {
                let err = DispatchError::NotFound {
                    method: ctx.method().clone(),
                    path: ctx.path().to_string(),
                };
                warn!(error = %err, "No route matched");
                self.fail(ctx, err);
                None
            }
        }
    }
}
