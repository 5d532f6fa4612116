use crate::binder::MethodParam;
use crate::handler::Handler;
use crate::pattern::{Params, RoutePattern};
use http::Method;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// HTTP method a binding answers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MethodSpec {
    /// Every method (`*`)
    Any,
    Only(Method),
}

impl From<Method> for MethodSpec {
    fn from(method: Method) -> Self {
        MethodSpec::Only(method)
    }
}

impl FromStr for MethodSpec {
    type Err = http::method::InvalidMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "*" {
            return Ok(MethodSpec::Any);
        }
        Method::from_bytes(s.to_ascii_uppercase().as_bytes()).map(MethodSpec::Only)
    }
}

impl fmt::Display for MethodSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodSpec::Any => f.write_str("*"),
            MethodSpec::Only(m) => f.write_str(m.as_str()),
        }
    }
}

/// A handler together with its argument declarations.
#[derive(Clone)]
pub struct Endpoint {
    handler: Arc<dyn Handler>,
    params: Arc<[MethodParam]>,
    name: Option<Arc<str>>,
}

impl Endpoint {
    pub fn new(handler: impl Handler) -> Self {
        Self {
            handler: Arc::new(handler),
            params: Arc::from(Vec::new()),
            name: None,
        }
    }

    #[must_use]
    pub fn with_params(mut self, params: Vec<MethodParam>) -> Self {
        self.params = Arc::from(params);
        self
    }

    /// Name used for reverse routing with [`Router::url_for`](super::Router::url_for).
    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(Arc::from(name));
        self
    }

    #[must_use]
    pub fn handler(&self) -> &dyn Handler {
        self.handler.as_ref()
    }

    #[must_use]
    pub fn params(&self) -> &[MethodParam] {
        &self.params
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("params", &self.params)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// One compiled pattern and its per-method endpoints.
#[derive(Debug, Clone)]
pub struct Route {
    pattern: RoutePattern,
    bindings: Vec<(MethodSpec, Arc<Endpoint>)>,
    order: usize,
}

impl Route {
    pub(crate) fn new(pattern: RoutePattern, order: usize) -> Self {
        Self {
            pattern,
            bindings: Vec::new(),
            order,
        }
    }

    /// Bind `endpoint` to `method`; returns true when it replaced a binding.
    pub(crate) fn bind(&mut self, method: MethodSpec, endpoint: Arc<Endpoint>) -> bool {
        match self.bindings.iter_mut().find(|(m, _)| *m == method) {
            Some((_, existing)) => {
                *existing = endpoint;
                true
            }
            None => {
                self.bindings.push((method, endpoint));
                false
            }
        }
    }

    #[must_use]
    pub fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }

    /// Registration order of the pattern.
    #[must_use]
    pub fn order(&self) -> usize {
        self.order
    }

    /// Endpoint for `method`: an exact binding wins over `*`.
    #[must_use]
    pub fn endpoint_for(&self, method: &Method) -> Option<&Arc<Endpoint>> {
        self.bindings
            .iter()
            .find(|(m, _)| matches!(m, MethodSpec::Only(only) if only == method))
            .or_else(|| self.bindings.iter().find(|(m, _)| *m == MethodSpec::Any))
            .map(|(_, ep)| ep)
    }

    /// Concrete methods bound on this pattern.
    #[must_use]
    pub fn allowed_methods(&self) -> Vec<Method> {
        self.bindings
            .iter()
            .filter_map(|(m, _)| match m {
                MethodSpec::Only(method) => Some(method.clone()),
                MethodSpec::Any => None,
            })
            .collect()
    }

    pub fn bindings(&self) -> impl Iterator<Item = (&MethodSpec, &Endpoint)> {
        self.bindings.iter().map(|(m, ep)| (m, ep.as_ref()))
    }
}

/// Result of successfully matching a request to a route.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub route: Arc<Route>,
    pub endpoint: Arc<Endpoint>,
    /// Parameters captured from the path
    pub params: Params,
}

impl RouteMatch {
    /// The raw pattern of the matched route.
    #[must_use]
    pub fn pattern(&self) -> &str {
        self.route.pattern().raw()
    }

    #[inline]
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }
}

/// Outcome of a route lookup.
#[derive(Debug, Clone)]
pub enum Lookup {
    Matched(RouteMatch),
    /// The path matched at least one pattern but none bound the method
    MethodNotAllowed(Vec<Method>),
    NotFound,
}

impl Lookup {
    #[must_use]
    pub fn is_matched(&self) -> bool {
        matches!(self, Lookup::Matched(_))
    }

    #[must_use]
    pub fn into_match(self) -> Option<RouteMatch> {
        match self {
            Lookup::Matched(m) => Some(m),
            _ => None,
        }
    }
}
