//! # HiveRouter
//!
//! **HiveRouter** is a coroutine-powered HTTP routing and dispatch engine.
//! Requests are matched against compiled path patterns, passed through
//! position-tagged filter chains, bound to typed handler arguments and
//! rendered into responses by a deterministic dispatch state machine.
//!
//! ## Architecture
//!
//! - **[`pattern`]** - Compiles path specs (`/users/:id:int`, `{slug}`,
//!   `*`, `*.*`, regex segments) into matchers with ordered parameter keys
//! - **[`router`]** - Route table with static, prefix and dynamic tiers,
//!   per-method bindings, `405` detection and reverse routing
//! - **[`filter`]** - Before/after/finish filters and around-style chains
//! - **[`binder`]** - Typed argument binding from path, query, header,
//!   cookie and body
//! - **[`dispatcher`]** - The request pipeline and its error taxonomy
//! - **[`handler`]** / **[`render`]** - Handler contract and result rendering
//! - **[`server`]** - HTTP adapter built on `may_minihttp`
//! - **[`config`]**, **[`logging`]**, **[`runtime_config`]** - Ambient setup
//!
//! ### Request Pipeline
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Server as AppService
//!     participant Dispatcher
//!     participant Router
//!     participant Filters as FilterChain
//!     participant Binder
//!     participant Handler
//!
//!     Client->>Server: GET /users/42?verbose=true
//!     Server->>Dispatcher: dispatch(RequestContext)
//!     Dispatcher->>Filters: before_static / before_router
//!     alt Filter aborts or writes output
//!         Filters-->>Client: filter response
//!     end
//!     Dispatcher->>Router: lookup(GET, /users/42)
//!     alt No pattern matches
//!         Router-->>Client: 404 Not Found
//!     else Pattern matches, method unbound
//!         Router-->>Client: 405 + Allow
//!     end
//!     Router-->>Dispatcher: RouteMatch {id: 42}
//!     Dispatcher->>Filters: before_exec
//!     Dispatcher->>Binder: bind(MethodParams)
//!     alt Conversion fails
//!         Binder-->>Client: 400 Bad Request
//!     end
//!     Dispatcher->>Handler: call(ctx, args)
//!     alt Handler panics
//!         Handler-->>Client: 500 Internal Server Error
//!     end
//!     Dispatcher->>Filters: after_exec
//!     Dispatcher->>Dispatcher: render(Outcome)
//!     Dispatcher->>Filters: finish (always)
//!     Dispatcher-->>Server: DispatchReport
//!     Server-->>Client: HTTP response
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use hiverouter::binder::{Args, IntWidth, MethodParam, ParamKind};
//! use hiverouter::context::RequestContext;
//! use hiverouter::dispatcher::Dispatcher;
//! use hiverouter::router::{Endpoint, Router};
//! use http::{Method, StatusCode};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let router = Arc::new(Router::new());
//! router
//!     .get(
//!         "/users/:id",
//!         Endpoint::new(|_: &mut RequestContext, args: &Args| {
//!             json!({ "id": args.get::<u64>("id") })
//!         })
//!         .with_params(vec![
//!             MethodParam::path("id", ParamKind::Int(IntWidth::U64)).required(),
//!         ]),
//!     )
//!     .unwrap();
//!
//! let dispatcher = Dispatcher::new(router);
//! let mut ctx = RequestContext::new(Method::GET, "/users/42");
//! let report = dispatcher.dispatch(&mut ctx);
//! assert_eq!(report.status, StatusCode::OK);
//! assert_eq!(ctx.response().body(), br#"{"id":42}"#);
//! ```
//!
//! ## Runtime Considerations
//!
//! HiveRouter uses the `may` coroutine runtime, not tokio or async-std:
//!
//! - Each connection is served by a coroutine; handlers run synchronously
//!   inside it
//! - Stack size is configurable via the `HIVE_STACK_SIZE` environment variable
//! - Route and filter tables are immutable snapshots swapped atomically, so
//!   routes can be registered while requests are in flight

pub mod binder;
pub mod cli;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod filter;
pub mod handler;
pub mod ids;
pub mod logging;
pub mod pattern;
pub mod render;
pub mod router;
pub mod runtime_config;
pub mod server;
pub mod static_files;
pub mod stats;

pub use context::RequestContext;
pub use dispatcher::{DispatchError, DispatchReport, Dispatcher, ErrorHandler};
pub use filter::{FilterChain, FilterPosition};
pub use handler::{Handler, HandlerError, Outcome};
pub use pattern::{PatternError, RoutePattern};
pub use router::{Endpoint, Namespace, Router};
