//! # CLI Module
//!
//! The `hiverouter` binary.
//!
//! ## Commands
//!
//! ```bash
//! # Try a pattern against a path
//! hiverouter match '/users/:id:int/posts/*' /users/42/posts/2024/intro
//!
//! # List the routes declared in a config file
//! hiverouter routes --config hive.yaml
//!
//! # Run one request through the configured dispatcher
//! hiverouter request --config hive.yaml -X POST '/items?_method=DELETE'
//!
//! # Serve the configured routes over HTTP
//! hiverouter serve --config hive.yaml --addr 0.0.0.0:8080
//! ```
//!
//! `match` exits non-zero when the path does not match; `request` exits
//! non-zero when dispatch ended in an error.

mod commands;

#[cfg(test)]
mod tests;

pub use commands::{run, run_cli, Cli, Commands};
