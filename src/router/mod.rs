//! # Router Module
//!
//! Maps `(method, path)` pairs to endpoints.
//!
//! ## Overview
//!
//! The router is responsible for:
//! - Compiling path patterns at registration time
//! - Binding endpoints per HTTP method on each pattern
//! - Resolving requests with a fixed precedence (static, then
//!   parameterized by specificity, then the static extension fallback)
//! - Distinguishing "no such path" from "path exists, method not bound"
//! - Reverse routing by endpoint name
//! - Grouping routes under a prefix with shared conditions and filters
//!   ([`Namespace`])
//!
//! ## Concurrency
//!
//! Lookups load an immutable snapshot and never block. Registration clones
//! the table, applies the change and swaps the new snapshot in, so routes
//! can be added while requests are in flight.
//!
//! ## Example
//!
//! ```rust
//! use hiverouter::router::{Endpoint, Lookup, Router};
//! use hiverouter::binder::Args;
//! use hiverouter::context::RequestContext;
//! use http::Method;
//!
//! let router = Router::new();
//! let show = |_: &mut RequestContext, _: &Args| "show";
//! router.get("/pets/:id", Endpoint::new(show).with_name("pet")).unwrap();
//!
//! assert!(router.lookup(&Method::GET, "/pets/7").is_matched());
//! assert!(matches!(
//!     router.lookup(&Method::DELETE, "/pets/7"),
//!     Lookup::MethodNotAllowed(_)
//! ));
//! assert_eq!(router.url_for("pet", &[("id", "7")]).as_deref(), Some("/pets/7"));
//! ```

mod core;
mod error;
mod namespace;
mod route;

pub use core::{RouteInfo, Router};
pub use error::RegisterError;
pub use namespace::{Condition, Namespace};
pub use route::{Endpoint, Lookup, MethodSpec, Route, RouteMatch};
