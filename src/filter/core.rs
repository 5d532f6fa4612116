use super::{AroundFilter, Filter, FilterOptions, FilterPosition, Next};
use crate::context::RequestContext;
use crate::pattern::{CompileOptions, PatternError, RoutePattern};
use arc_swap::ArcSwap;
use std::ops::ControlFlow;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error, info};

struct FilterEntry {
    pattern: RoutePattern,
    filter: Arc<dyn Filter>,
    options: FilterOptions,
}

struct ChainEntry {
    pattern: RoutePattern,
    filter: Arc<dyn AroundFilter>,
}

#[derive(Default, Clone)]
struct FilterTable {
    positions: [Vec<Arc<FilterEntry>>; FilterPosition::COUNT],
    chains: Vec<Arc<ChainEntry>>,
}

/// Registered filters, grouped by position.
///
/// Like the route table, registration publishes a new snapshot; a request
/// runs every position against the snapshot it loaded.
pub struct FilterChain {
    table: ArcSwap<FilterTable>,
    writer: Mutex<()>,
    options: CompileOptions,
}

impl Default for FilterChain {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let table = self.table.load();
        f.debug_struct("FilterChain")
            .field("filters", &table.positions.iter().map(Vec::len).sum::<usize>())
            .field("chains", &table.chains.len())
            .finish()
    }
}

impl FilterChain {
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(CompileOptions::default())
    }

    #[must_use]
    pub fn with_options(options: CompileOptions) -> Self {
        Self {
            table: ArcSwap::from_pointee(FilterTable::default()),
            writer: Mutex::new(()),
            options,
        }
    }

    fn update(&self, apply: impl FnOnce(&mut FilterTable)) {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = FilterTable::clone(&self.table.load());
        apply(&mut next);
        self.table.store(Arc::new(next));
    }

    /// Register `filter` at `position` with default options.
    ///
    /// # Errors
    ///
    /// Returns a [`PatternError`] if `pattern` does not compile.
    pub fn insert(
        &self,
        pattern: &str,
        position: FilterPosition,
        filter: impl Filter,
    ) -> Result<(), PatternError> {
        self.insert_with(pattern, position, filter, FilterOptions::default())
    }

    /// Register `filter` at `position`.
    ///
    /// Filters at one position run in registration order.
    ///
    /// # Errors
    ///
    /// Returns a [`PatternError`] if `pattern` does not compile.
    pub fn insert_with(
        &self,
        pattern: &str,
        position: FilterPosition,
        filter: impl Filter,
        options: FilterOptions,
    ) -> Result<(), PatternError> {
        let entry = Arc::new(FilterEntry {
            pattern: RoutePattern::compile_with(pattern, self.options)?,
            filter: Arc::new(filter),
            options,
        });
        self.update(|table| table.positions[position.index()].push(entry));
        info!(
            pattern = %pattern,
            position = %position,
            return_on_output = options.return_on_output,
            reset_params = options.reset_params,
            "Filter registered"
        );
        Ok(())
    }

    /// Register an around filter wrapping the pipeline of matching requests.
    ///
    /// The first registered chain is the outermost.
    ///
    /// # Errors
    ///
    /// Returns a [`PatternError`] if `pattern` does not compile.
    pub fn insert_chain(&self, pattern: &str, filter: impl AroundFilter) -> Result<(), PatternError> {
        let entry = Arc::new(ChainEntry {
            pattern: RoutePattern::compile_with(pattern, self.options)?,
            filter: Arc::new(filter),
        });
        self.update(|table| table.chains.push(entry));
        info!(pattern = %pattern, "Filter chain registered");
        Ok(())
    }

    /// Whether any filter is registered at `position`.
    #[must_use]
    pub fn has_filters(&self, position: FilterPosition) -> bool {
        !self.table.load().positions[position.index()].is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        let table = self.table.load();
        table.positions.iter().map(Vec::len).sum::<usize>() + table.chains.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run the filters registered at `position` whose pattern matches the
    /// request path.
    ///
    /// Parameters captured by a filter's pattern are merged into the
    /// context before it runs (and restored afterwards with
    /// `reset_params`). Returns [`ControlFlow::Break`] when the pipeline
    /// must stop: a filter aborted the request, or a filter with
    /// `return_on_output` found or left the response started.
    ///
    /// At [`FilterPosition::Finish`] every matching filter runs, each one
    /// inside its own panic boundary, and the result is always `Continue`.
    pub fn run(&self, position: FilterPosition, ctx: &mut RequestContext) -> ControlFlow<()> {
        let table = self.table.load_full();
        let filters = &table.positions[position.index()];
        if filters.is_empty() {
            return ControlFlow::Continue(());
        }

        for entry in filters {
            let finishing = position == FilterPosition::Finish;
            if !finishing && entry.options.return_on_output && ctx.response().is_started() {
                debug!(position = %position, "Response already written, skipping filters");
                return ControlFlow::Break(());
            }

            let Some(captured) = entry.pattern.matches(ctx.path()) else {
                continue;
            };
            let saved = entry.options.reset_params.then(|| ctx.params().clone());
            ctx.params_mut().extend_from(&captured);

            if finishing {
                run_contained(entry, ctx);
            } else {
                entry.filter.call(ctx);
            }

            if let Some(saved) = saved {
                *ctx.params_mut() = saved;
            }
            if finishing {
                continue;
            }

            if ctx.is_aborted() {
                debug!(
                    position = %position,
                    filter_pattern = %entry.pattern.raw(),
                    "Filter aborted request"
                );
                return ControlFlow::Break(());
            }
            if entry.options.return_on_output && ctx.response().is_started() {
                debug!(
                    position = %position,
                    filter_pattern = %entry.pattern.raw(),
                    "Filter wrote response"
                );
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    /// Run `core` wrapped by every around filter matching the request path.
    ///
    /// `core` runs at most once, and only if each chain calls
    /// [`Next::run`].
    pub fn run_chain(&self, ctx: &mut RequestContext, core: &mut dyn FnMut(&mut RequestContext)) {
        let table = self.table.load_full();
        if table.chains.is_empty() {
            core(ctx);
            return;
        }
        let matching: Vec<&ChainEntry> = table
            .chains
            .iter()
            .filter(|c| c.pattern.is_match(ctx.path()))
            .map(Arc::as_ref)
            .collect();
        call_chain(&matching, ctx, core);
    }
}

fn call_chain(
    chains: &[&ChainEntry],
    ctx: &mut RequestContext,
    core: &mut dyn FnMut(&mut RequestContext),
) {
    match chains.split_first() {
        None => core(ctx),
        Some((first, rest)) => {
            let mut inner = |c: &mut RequestContext| call_chain(rest, c, &mut *core);
            first.filter.call(ctx, Next::new(&mut inner));
        }
    }
}

fn run_contained(entry: &FilterEntry, ctx: &mut RequestContext) {
    let result = catch_unwind(AssertUnwindSafe(|| entry.filter.call(ctx)));
    if let Err(panic) = result {
        let backtrace = std::backtrace::Backtrace::capture();
        error!(
            request_id = %ctx.request_id(),
            filter_pattern = %entry.pattern.raw(),
            panic = %panic_message(panic.as_ref()),
            backtrace = %backtrace,
            "Finish filter panicked"
        );
    }
}

/// Extract the message carried by a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
