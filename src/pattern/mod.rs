//! # Pattern Module
//!
//! Compiles route path specifications into matchers.
//!
//! ## Overview
//!
//! A pattern such as `/users/:id/posts/{post_id:[0-9]+}` is split on `/` and
//! each segment is parsed (see [`segment`] for the grammar). The compiled
//! [`RoutePattern`] holds:
//!
//! - the ordered segment descriptors
//! - a [`ParameterKeyMap`] from parameter name to ordinal position
//! - a regex matcher with one capture group per parameter
//! - its [`PatternKind`] and literal-prefix length, used for lookup ranking
//!
//! Malformed patterns fail in [`RoutePattern::compile`] with a
//! [`PatternError`], never at request time.
//!
//! ## Example
//!
//! ```rust
//! use hiverouter::pattern::RoutePattern;
//!
//! let pattern = RoutePattern::compile("/api/:id.json").unwrap();
//! let params = pattern.matches("/api/7.json").unwrap();
//! assert_eq!(params.get("id"), Some("7"));
//! assert!(pattern.matches("/api/7.xml").is_none());
//! ```

mod core;
mod error;
mod params;
pub mod segment;

pub use core::{normalize_path, CompileOptions, ParameterKeyMap, PatternKind, RoutePattern};
pub use error::PatternError;
pub use params::{ParamVec, Params, MAX_INLINE_PARAMS};

/// Parameter name bound by a `*` wildcard.
pub const SPLAT: &str = "splat";
/// Parameter name bound to the path part of `*.*`.
pub const PATH: &str = "path";
/// Parameter name bound to the extension part of `*.*` and to the static
/// extension fallback.
pub const EXT: &str = "ext";
