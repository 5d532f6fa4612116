use crate::config::RouterConfig;
use crate::context::RequestContext;
use crate::logging::init_logging_with_config;
use crate::pattern::{CompileOptions, RoutePattern};
use crate::runtime_config::RuntimeConfig;
use crate::server::{AppService, HttpServer};
use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use http::Method;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

/// Command-line interface for HiveRouter
#[derive(Parser, Debug)]
#[command(name = "hiverouter")]
#[command(about = "HiveRouter CLI", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Test a route pattern against a request path
    Match {
        /// Route pattern, e.g. `/users/:id:int`
        pattern: String,
        /// Request path, e.g. `/users/42`
        path: String,
        /// Match literal segments regardless of case
        #[arg(long, default_value_t = false)]
        case_insensitive: bool,
    },
    /// List the routes declared in a config file
    Routes {
        /// Path to the config file (YAML, TOML or JSON)
        #[arg(short, long, env = "HIVE_CONFIG")]
        config: PathBuf,
        /// Print the listing as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Run one request through the configured dispatcher and print the response
    Request {
        #[arg(short, long, env = "HIVE_CONFIG")]
        config: PathBuf,
        /// Request method
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,
        /// Request target, path plus optional query string
        target: String,
        /// Request body
        #[arg(short, long)]
        data: Option<String>,
    },
    /// Serve the routes declared in a config file
    Serve {
        #[arg(short, long, env = "HIVE_CONFIG")]
        config: PathBuf,
        /// Listen address, overriding the config file
        #[arg(long)]
        addr: Option<String>,
    },
}

/// Parse the process arguments and run the selected command.
///
/// Returns `Ok(false)` when the command ran but reported a negative result
/// (no match, or an error status for `request`).
///
/// # Errors
///
/// Returns an error if a pattern or config file is invalid, or the server
/// fails to start.
pub fn run_cli() -> anyhow::Result<bool> {
    let cli = Cli::parse();
    run(&cli, &mut io::stdout().lock())
}

/// Run `cli`, writing command output to `out`.
///
/// # Errors
///
/// See [`run_cli`].
pub fn run(cli: &Cli, out: &mut dyn Write) -> anyhow::Result<bool> {
    match &cli.command {
        Commands::Match {
            pattern,
            path,
            case_insensitive,
        } => match_pattern(pattern, path, *case_insensitive, out),
        Commands::Routes { config, json } => {
            let config = RouterConfig::load(config)?;
            let router = config.build_router()?;
            let routes = router.routes();
            if *json {
                writeln!(out, "{}", serde_json::to_string_pretty(&routes)?)?;
            } else {
                for route in &routes {
                    writeln!(
                        out,
                        "{:<8} {:<40} {}",
                        route.method,
                        route.pattern,
                        route.name.as_deref().unwrap_or("-")
                    )?;
                }
            }
            Ok(true)
        }
        Commands::Request {
            config,
            method,
            target,
            data,
        } => {
            let config = RouterConfig::load(config)?;
            let dispatcher = config.build_dispatcher()?;
            let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                .map_err(|_| anyhow!("invalid method '{method}'"))?;
            let mut ctx = RequestContext::new(method, target);
            if let Some(data) = data {
                ctx = ctx.with_body(data.clone().into_bytes());
            }
            let report = dispatcher.dispatch(&mut ctx);
            writeln!(out, "{}", report.status)?;
            for (name, value) in ctx.response().headers() {
                writeln!(out, "{name}: {value}")?;
            }
            writeln!(out)?;
            out.write_all(ctx.response().body())?;
            writeln!(out)?;
            Ok(report.error.is_none())
        }
        Commands::Serve { config, addr } => {
            let mut config = RouterConfig::load(config)?;
            if let Some(addr) = addr {
                config.addr.clone_from(addr);
            }
            init_logging_with_config(&config.logging)?;
            RuntimeConfig::from_env().apply();

            let dispatcher = Arc::new(config.build_dispatcher()?);
            let handle = HttpServer(AppService::new(dispatcher))
                .start(config.addr.as_str())
                .with_context(|| format!("Failed to bind {}", config.addr))?;
            writeln!(out, "Listening on {}", handle.addr())?;
            out.flush()?;
            handle
                .join()
                .map_err(|_| anyhow!("server coroutine panicked"))?;
            Ok(true)
        }
    }
}

fn match_pattern(
    pattern: &str,
    path: &str,
    case_insensitive: bool,
    out: &mut dyn Write,
) -> anyhow::Result<bool> {
    let options = CompileOptions {
        case_sensitive: !case_insensitive,
    };
    let compiled = RoutePattern::compile_with(pattern, options)?;
    match compiled.matches(path) {
        Some(params) => {
            writeln!(out, "match ({:?})", compiled.kind())?;
            for (name, value) in params.iter() {
                writeln!(out, "  {name} = {value}")?;
            }
            Ok(true)
        }
        None => {
            writeln!(out, "no match")?;
            Ok(false)
        }
    }
}
