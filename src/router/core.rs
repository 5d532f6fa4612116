//! Route table - hot path for request routing.
//!
//! Readers load an immutable [`RouteTable`] snapshot from an [`ArcSwap`];
//! registration builds a new table off to the side and publishes it with a
//! single store, so lookups never block and never see a half-built table.

use super::error::RegisterError;
use super::route::{Endpoint, Lookup, MethodSpec, Route, RouteMatch};
use crate::pattern::{normalize_path, CompileOptions, Params, RoutePattern, EXT};
use arc_swap::ArcSwap;
use http::Method;
use serde::Serialize;
use std::borrow::Cow;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Immutable snapshot of all registered routes.
#[derive(Debug, Clone, Default)]
struct RouteTable {
    routes: Vec<Arc<Route>>,
    /// Static patterns keyed by their normalized (and, when matching is
    /// case-insensitive, lowercased) path
    statics: HashMap<String, usize>,
    /// Non-static route indices in evaluation order
    ranked: Vec<usize>,
    names: HashMap<Arc<str>, usize>,
}

impl RouteTable {
    fn position(&self, raw: &str) -> Option<usize> {
        self.routes.iter().position(|r| r.pattern().raw() == raw)
    }

    fn rebuild_index(&mut self) {
        self.statics.clear();
        self.names.clear();
        self.ranked.clear();

        for (idx, route) in self.routes.iter().enumerate() {
            match route.pattern().static_path() {
                Some(path) => {
                    let key = if route.pattern().options().case_sensitive {
                        path.to_string()
                    } else {
                        path.to_ascii_lowercase()
                    };
                    self.statics.insert(key, idx);
                }
                None => self.ranked.push(idx),
            }
            for (_, endpoint) in route.bindings() {
                if let Some(name) = endpoint.name() {
                    self.names.insert(Arc::from(name), idx);
                }
            }
        }

        // Longer literal prefix first, then Prefix before Dynamic, then
        // registration order.
        let routes = &self.routes;
        self.ranked.sort_by_key(|&idx| {
            let p = routes[idx].pattern();
            (Reverse(p.literal_prefix_len()), p.kind(), routes[idx].order())
        });
    }

    fn static_route(&self, path: &str, case_sensitive: bool) -> Option<&Arc<Route>> {
        let key: Cow<'_, str> = if case_sensitive {
            Cow::Borrowed(path)
        } else {
            Cow::Owned(path.to_ascii_lowercase())
        };
        self.statics.get(key.as_ref()).map(|&idx| &self.routes[idx])
    }
}

/// Split the final segment of `path` into `(stem, ext)` at its last dot.
fn split_extension(path: &str) -> Option<(&str, &str)> {
    let last_slash = path.rfind('/')?;
    let dot = path.rfind('.')?;
    if dot <= last_slash + 1 || dot + 1 == path.len() {
        return None;
    }
    Some((&path[..dot], &path[dot + 1..]))
}

fn merge_allowed(allowed: &mut Vec<Method>, route: &Route) {
    for method in route.allowed_methods() {
        if !allowed.contains(&method) {
            allowed.push(method);
        }
    }
}

/// Summary of one registered binding, used for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteInfo {
    pub method: String,
    pub pattern: String,
    pub name: Option<String>,
}

/// Thread-safe route table with lock-free lookups.
///
/// ```rust
/// use hiverouter::binder::Args;
/// use hiverouter::context::RequestContext;
/// use hiverouter::router::{Endpoint, Router};
/// use http::Method;
///
/// let router = Router::new();
/// router
///     .get("/user/:id:int", Endpoint::new(|_: &mut RequestContext, _: &Args| "user"))
///     .unwrap();
/// let m = router.route(&Method::GET, "/user/42").unwrap();
/// assert_eq!(m.param("id"), Some("42"));
/// ```
pub struct Router {
    table: ArcSwap<RouteTable>,
    /// Serializes writers; readers never take it
    writer: Mutex<()>,
    options: CompileOptions,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.table.load().routes.len())
            .field("options", &self.options)
            .finish()
    }
}

impl Router {
    /// Create an empty, case-sensitive router.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(CompileOptions::default())
    }

    /// Create an empty router whose patterns compile with `options`.
    #[must_use]
    pub fn with_options(options: CompileOptions) -> Self {
        Self {
            table: ArcSwap::from_pointee(RouteTable::default()),
            writer: Mutex::new(()),
            options,
        }
    }

    #[must_use]
    pub fn options(&self) -> CompileOptions {
        self.options
    }

    /// Register `endpoint` for `method` on `pattern`.
    ///
    /// Registering the same pattern again adds a method binding to the
    /// existing route; the same pattern and method replaces the previous
    /// endpoint. Lookups running concurrently keep using the snapshot they
    /// loaded.
    ///
    /// # Errors
    ///
    /// * [`RegisterError::Pattern`] - the pattern is malformed
    /// * [`RegisterError::DuplicateName`] - the endpoint's name is taken by a
    ///   different pattern
    pub fn register(
        &self,
        method: impl Into<MethodSpec>,
        pattern: &str,
        endpoint: Endpoint,
    ) -> Result<(), RegisterError> {
        let method = method.into();
        let compiled = RoutePattern::compile_with(pattern, self.options)?;

        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = RouteTable::clone(&self.table.load());

        if let Some(name) = endpoint.name() {
            if let Some(&owner) = next.names.get(name) {
                let existing = next.routes[owner].pattern().raw();
                if existing != compiled.raw() {
                    warn!(
                        name = %name,
                        existing = %existing,
                        pattern = %pattern,
                        "Route name already registered"
                    );
                    return Err(RegisterError::DuplicateName {
                        name: name.to_string(),
                        existing: existing.to_string(),
                    });
                }
            }
        }

        let endpoint = Arc::new(endpoint);
        let replaced = match next.position(compiled.raw()) {
            Some(idx) => {
                let mut route = Route::clone(&next.routes[idx]);
                let replaced = route.bind(method.clone(), endpoint);
                next.routes[idx] = Arc::new(route);
                replaced
            }
            None => {
                let mut route = Route::new(compiled, next.routes.len());
                route.bind(method.clone(), endpoint);
                next.routes.push(Arc::new(route));
                false
            }
        };
        next.rebuild_index();

        if replaced {
            warn!(method = %method, pattern = %pattern, "Route binding replaced");
        } else {
            info!(
                method = %method,
                pattern = %pattern,
                routes_count = next.routes.len(),
                "Route registered"
            );
        }
        self.table.store(Arc::new(next));
        Ok(())
    }

    /// Register a GET endpoint.
    ///
    /// # Errors
    ///
    /// See [`Router::register`].
    pub fn get(&self, pattern: &str, endpoint: Endpoint) -> Result<(), RegisterError> {
        self.register(Method::GET, pattern, endpoint)
    }

    /// Register a POST endpoint.
    ///
    /// # Errors
    ///
    /// See [`Router::register`].
    pub fn post(&self, pattern: &str, endpoint: Endpoint) -> Result<(), RegisterError> {
        self.register(Method::POST, pattern, endpoint)
    }

    /// Register a PUT endpoint.
    ///
    /// # Errors
    ///
    /// See [`Router::register`].
    pub fn put(&self, pattern: &str, endpoint: Endpoint) -> Result<(), RegisterError> {
        self.register(Method::PUT, pattern, endpoint)
    }

    /// Register a DELETE endpoint.
    ///
    /// # Errors
    ///
    /// See [`Router::register`].
    pub fn delete(&self, pattern: &str, endpoint: Endpoint) -> Result<(), RegisterError> {
        self.register(Method::DELETE, pattern, endpoint)
    }

    /// Register a PATCH endpoint.
    ///
    /// # Errors
    ///
    /// See [`Router::register`].
    pub fn patch(&self, pattern: &str, endpoint: Endpoint) -> Result<(), RegisterError> {
        self.register(Method::PATCH, pattern, endpoint)
    }

    /// Register an endpoint answering every method.
    ///
    /// # Errors
    ///
    /// See [`Router::register`].
    pub fn any(&self, pattern: &str, endpoint: Endpoint) -> Result<(), RegisterError> {
        self.register(MethodSpec::Any, pattern, endpoint)
    }

    /// Resolve `method` and `path` against the current table.
    ///
    /// Precedence:
    ///
    /// 1. an exact static pattern
    /// 2. parameterized patterns ordered by literal prefix length (longest
    ///    first), then prefix patterns before fully dynamic ones, then
    ///    registration order; the first pattern that matches *and* binds the
    ///    method wins
    /// 3. a static pattern equal to the path minus its extension, with the
    ///    extension captured as `ext`
    ///
    /// When patterns matched the path but none bound the method the result
    /// is [`Lookup::MethodNotAllowed`] with every method bound on them.
    #[must_use]
    pub fn lookup(&self, method: &Method, path: &str) -> Lookup {
        debug!(method = %method, path = %path, "Route match attempt");
        let start = Instant::now();

        let table = self.table.load();
        let path = normalize_path(path);
        let case_sensitive = self.options.case_sensitive;
        let mut allowed = Vec::new();

        let found = 'search: {
            if let Some(route) = table.static_route(path, case_sensitive) {
                match route.endpoint_for(method) {
                    Some(ep) => break 'search Some((route, ep, Params::new())),
                    None => merge_allowed(&mut allowed, route),
                }
            }

            for &idx in &table.ranked {
                let route = &table.routes[idx];
                let Some(params) = route.pattern().matches(path) else {
                    continue;
                };
                match route.endpoint_for(method) {
                    Some(ep) => break 'search Some((route, ep, params)),
                    None => merge_allowed(&mut allowed, route),
                }
            }

            if let Some((stem, ext)) = split_extension(path) {
                if let Some(route) = table.static_route(stem, case_sensitive) {
                    match route.endpoint_for(method) {
                        Some(ep) => {
                            let mut params = Params::new();
                            params.insert(EXT, ext);
                            break 'search Some((route, ep, params));
                        }
                        None => merge_allowed(&mut allowed, route),
                    }
                }
            }
            None
        };

        let elapsed = start.elapsed();
        match found {
            Some((route, endpoint, params)) => {
                if elapsed > Duration::from_millis(1) {
                    warn!(
                        method = %method,
                        path = %path,
                        route_pattern = %route.pattern().raw(),
                        duration_us = elapsed.as_micros(),
                        "Slow route matching detected"
                    );
                } else {
                    debug!(
                        method = %method,
                        path = %path,
                        route_pattern = %route.pattern().raw(),
                        path_params = ?params,
                        duration_us = elapsed.as_micros(),
                        "Route matched"
                    );
                }
                Lookup::Matched(RouteMatch {
                    route: Arc::clone(route),
                    endpoint: Arc::clone(endpoint),
                    params,
                })
            }
            None if allowed.is_empty() => {
                debug!(
                    method = %method,
                    path = %path,
                    duration_us = elapsed.as_micros(),
                    "No route matched"
                );
                Lookup::NotFound
            }
            None => {
                debug!(
                    method = %method,
                    path = %path,
                    allowed = ?allowed,
                    "Path matched but method not bound"
                );
                Lookup::MethodNotAllowed(allowed)
            }
        }
    }

    /// Like [`Router::lookup`] but only returns a successful match.
    #[must_use]
    pub fn route(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        self.lookup(method, path).into_match()
    }

    /// Build a concrete URL for the route registered under `name`.
    ///
    /// Pairs whose key is not a parameter of the pattern become the query
    /// string. Returns `None` for unknown names, missing parameters, or
    /// values the pattern's constraints reject.
    #[must_use]
    pub fn url_for(&self, name: &str, values: &[(&str, &str)]) -> Option<String> {
        let table = self.table.load();
        let idx = *table.names.get(name)?;
        let url = table.routes[idx].pattern().build(values);
        if url.is_none() {
            debug!(name = %name, "Reverse routing failed");
        }
        url
    }

    /// Number of distinct patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.load().routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every binding in registration order.
    #[must_use]
    pub fn routes(&self) -> Vec<RouteInfo> {
        let table = self.table.load();
        table
            .routes
            .iter()
            .flat_map(|route| {
                route.bindings().map(move |(method, ep)| RouteInfo {
                    method: method.to_string(),
                    pattern: route.pattern().raw().to_string(),
                    name: ep.name().map(str::to_string),
                })
            })
            .collect()
    }

    /// All registered raw patterns.
    #[must_use]
    pub fn patterns(&self) -> Vec<String> {
        self.table
            .load()
            .routes
            .iter()
            .map(|r| r.pattern().raw().to_string())
            .collect()
    }
}

#[cfg(test)]
mod split_tests {
    use super::split_extension;

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("/about.html"), Some(("/about", "html")));
        assert_eq!(split_extension("/a.b/c"), None);
        assert_eq!(split_extension("/.hidden"), None);
        assert_eq!(split_extension("/trailing."), None);
        assert_eq!(split_extension("/"), None);
    }
}
