//! Route groups sharing a path prefix, entry conditions and filters.

use super::core::Router;
use super::error::RegisterError;
use super::route::{Endpoint, MethodSpec};
use crate::context::RequestContext;
use crate::filter::{Filter, FilterChain, FilterOptions, FilterPosition};
use crate::pattern::RoutePattern;
use http::{Method, StatusCode};
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Predicate a request must satisfy to enter a [`Namespace`].
pub type Condition = Arc<dyn Fn(&RequestContext) -> bool + Send + Sync>;

/// A group of routes under a common prefix.
///
/// Conditions and `before` filters run at
/// [`FilterPosition::BeforeRouter`] for every path under the prefix;
/// `after` filters run at [`FilterPosition::Finish`]. A request failing a
/// condition is aborted with `405 Method Not Allowed`. Nested namespaces
/// append their prefix to the parent's and inherit its conditions and
/// filters.
///
/// ```rust
/// use hiverouter::binder::Args;
/// use hiverouter::context::RequestContext;
/// use hiverouter::filter::FilterChain;
/// use hiverouter::router::{Endpoint, Namespace, Router};
///
/// let router = Router::new();
/// let filters = FilterChain::new();
/// Namespace::new("/v1")
///     .cond(|ctx: &RequestContext| ctx.header("x-api-key").is_some())
///     .namespace(
///         Namespace::new("/shop")
///             .get("/:id", Endpoint::new(|_: &mut RequestContext, _: &Args| "shopinfo")),
///     )
///     .register(&router, &filters)
///     .unwrap();
///
/// assert_eq!(router.patterns(), vec!["/v1/shop/:id"]);
/// ```
#[derive(Clone)]
pub struct Namespace {
    prefix: String,
    conditions: Vec<Condition>,
    before: Vec<Arc<dyn Filter>>,
    after: Vec<Arc<dyn Filter>>,
    routes: Vec<(MethodSpec, String, Endpoint)>,
    children: Vec<Namespace>,
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace")
            .field("prefix", &self.prefix)
            .field("conditions", &self.conditions.len())
            .field("before", &self.before.len())
            .field("after", &self.after.len())
            .field("routes", &self.routes.len())
            .field("children", &self.children)
            .finish()
    }
}

/// `/` prefixed, no trailing `/`; the root is empty.
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

fn join(prefix: &str, path: &str) -> String {
    let path = path.trim_start_matches('/');
    match (prefix.is_empty(), path.is_empty()) {
        (true, _) => format!("/{path}"),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{prefix}/{path}"),
    }
}

impl Namespace {
    #[must_use]
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: normalize_prefix(prefix),
            conditions: Vec::new(),
            before: Vec::new(),
            after: Vec::new(),
            routes: Vec::new(),
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Require `cond` for every request under the prefix. Conditions run
    /// before the namespace's filters.
    #[must_use]
    pub fn cond<F>(mut self, cond: F) -> Self
    where
        F: Fn(&RequestContext) -> bool + Send + Sync + 'static,
    {
        self.conditions.push(Arc::new(cond));
        self
    }

    /// Filter run before routing for every path under the prefix.
    #[must_use]
    pub fn before(mut self, filter: impl Filter) -> Self {
        self.before.push(Arc::new(filter));
        self
    }

    /// Filter run once the response is settled.
    #[must_use]
    pub fn after(mut self, filter: impl Filter) -> Self {
        self.after.push(Arc::new(filter));
        self
    }

    #[must_use]
    pub fn route(mut self, method: impl Into<MethodSpec>, path: &str, endpoint: Endpoint) -> Self {
        self.routes.push((method.into(), path.to_string(), endpoint));
        self
    }

    #[must_use]
    pub fn get(self, path: &str, endpoint: Endpoint) -> Self {
        self.route(Method::GET, path, endpoint)
    }

    #[must_use]
    pub fn post(self, path: &str, endpoint: Endpoint) -> Self {
        self.route(Method::POST, path, endpoint)
    }

    #[must_use]
    pub fn put(self, path: &str, endpoint: Endpoint) -> Self {
        self.route(Method::PUT, path, endpoint)
    }

    #[must_use]
    pub fn delete(self, path: &str, endpoint: Endpoint) -> Self {
        self.route(Method::DELETE, path, endpoint)
    }

    #[must_use]
    pub fn patch(self, path: &str, endpoint: Endpoint) -> Self {
        self.route(Method::PATCH, path, endpoint)
    }

    #[must_use]
    pub fn any(self, path: &str, endpoint: Endpoint) -> Self {
        self.route(MethodSpec::Any, path, endpoint)
    }

    /// Nest `child` under this prefix.
    #[must_use]
    pub fn namespace(mut self, child: Namespace) -> Self {
        self.children.push(child);
        self
    }

    /// Add every route and filter of this namespace (and its children) to
    /// `router` and `filters`.
    ///
    /// All patterns are compiled before anything is registered, so a
    /// malformed pattern leaves both tables untouched.
    ///
    /// # Errors
    ///
    /// * [`RegisterError::Pattern`] - a joined route pattern is malformed
    /// * [`RegisterError::DuplicateName`] - see [`Router::register`]
    pub fn register(&self, router: &Router, filters: &FilterChain) -> Result<(), RegisterError> {
        self.validate("", router)?;
        self.register_under("", router, filters)
    }

    fn validate(&self, parent: &str, router: &Router) -> Result<(), RegisterError> {
        let prefix = format!("{parent}{}", self.prefix);
        RoutePattern::compile_with(&join(&prefix, "*"), router.options())?;
        for (_, path, _) in &self.routes {
            RoutePattern::compile_with(&join(&prefix, path), router.options())?;
        }
        self.children
            .iter()
            .try_for_each(|child| child.validate(&prefix, router))
    }

    fn register_under(
        &self,
        parent: &str,
        router: &Router,
        filters: &FilterChain,
    ) -> Result<(), RegisterError> {
        let prefix = format!("{parent}{}", self.prefix);
        let scope = join(&prefix, "*");
        // Parameters captured by the scope pattern stay out of the route's.
        let options = FilterOptions::default().reset_params(true);

        for cond in &self.conditions {
            let cond = Arc::clone(cond);
            let prefix = prefix.clone();
            let check = move |ctx: &mut RequestContext| {
                if !cond(&*ctx) {
                    ctx.abort(
                        StatusCode::METHOD_NOT_ALLOWED,
                        format!("namespace condition failed for {prefix}"),
                    );
                }
            };
            filters.insert_with(&scope, FilterPosition::BeforeRouter, check, options)?;
        }
        for filter in &self.before {
            let filter = Arc::clone(filter);
            let run = move |ctx: &mut RequestContext| filter.call(ctx);
            filters.insert_with(&scope, FilterPosition::BeforeRouter, run, options)?;
        }
        for filter in &self.after {
            let filter = Arc::clone(filter);
            let run = move |ctx: &mut RequestContext| filter.call(ctx);
            filters.insert_with(&scope, FilterPosition::Finish, run, options)?;
        }

        for (method, path, endpoint) in &self.routes {
            router.register(method.clone(), &join(&prefix, path), endpoint.clone())?;
        }
        for child in &self.children {
            child.register_under(&prefix, router, filters)?;
        }

        let shown = if prefix.is_empty() { "/" } else { prefix.as_str() };
        info!(
            prefix = %shown,
            routes_count = self.routes.len(),
            namespaces_count = self.children.len(),
            "Namespace registered"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{join, normalize_prefix};

    #[test]
    fn test_prefix_normalization() {
        assert_eq!(normalize_prefix("v1"), "/v1");
        assert_eq!(normalize_prefix("/v1/"), "/v1");
        assert_eq!(normalize_prefix("/"), "");
        assert_eq!(normalize_prefix(""), "");
    }

    #[test]
    fn test_join() {
        assert_eq!(join("/v1", "/users"), "/v1/users");
        assert_eq!(join("/v1", "users/:id"), "/v1/users/:id");
        assert_eq!(join("/v1", "/"), "/v1");
        assert_eq!(join("", "/users"), "/users");
        assert_eq!(join("", ""), "/");
    }
}
