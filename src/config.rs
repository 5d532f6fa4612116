//! # Configuration
//!
//! [`RouterConfig`] describes a complete service: listen address, routing
//! options, dispatcher switches, static directories, logging and a list of
//! declarative routes. It is loaded from YAML or TOML (chosen by file
//! extension) and then overridden from `HIVE_*` environment variables.
//!
//! ```yaml
//! addr: 127.0.0.1:8080
//! case_sensitive: false
//! stats_path: /_stats
//! static_dirs:
//!   /static: ./public
//! routes:
//!   - method: GET
//!     pattern: /users/:id:int
//!     name: user
//!     params:
//!       - { name: id, source: path, kind: u64, required: true }
//!     reply: { type: echo }
//!   - method: "*"
//!     pattern: /health
//!     reply: { type: json, body: { status: ok } }
//! ```
//!
//! ## Environment Overrides
//!
//! | Variable | Field |
//! |----------|-------|
//! | `HIVE_ADDR` | `addr` |
//! | `HIVE_CASE_SENSITIVE` | `case_sensitive` |
//! | `HIVE_EXPOSE_FAULT_DETAILS` | `dispatch.expose_fault_details` |
//! | `HIVE_METHOD_OVERRIDE` | `dispatch.method_override` |
//! | `HIVE_COLLECT_STATS` | `dispatch.collect_stats` |
//! | `HIVE_STATIC_DIRS` | `static_dirs`, as `prefix=dir,prefix=dir` |
//! | `HIVE_LOG_*` | `logging`, see [`crate::logging`] |

use crate::binder::{Args, MethodParam, ParamKind, ParamSource};
use crate::context::RequestContext;
use crate::dispatcher::{DispatchConfig, Dispatcher};
use crate::handler::{Handler, Outcome};
use crate::logging::LogConfig;
use crate::pattern::CompileOptions;
use crate::router::{Endpoint, MethodSpec, Router};
use crate::static_files::StaticDirs;
use anyhow::{anyhow, bail, Context};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn default_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_true() -> bool {
    true
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_source() -> String {
    "query".to_string()
}

fn default_kind() -> String {
    "string".to_string()
}

fn default_status() -> u16 {
    200
}

/// Top-level service configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
    /// Literal segments match exactly when true
    #[serde(default = "default_true")]
    pub case_sensitive: bool,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    /// URL prefix → directory
    #[serde(default)]
    pub static_dirs: BTreeMap<String, PathBuf>,
    /// Serve the per-route statistics table as JSON at this path
    #[serde(default)]
    pub stats_path: Option<String>,
    #[serde(default)]
    pub logging: LogConfig,
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            case_sensitive: true,
            dispatch: DispatchConfig::default(),
            static_dirs: BTreeMap::new(),
            stats_path: None,
            logging: LogConfig::default(),
            routes: Vec::new(),
        }
    }
}

/// One declarative route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteConfig {
    /// HTTP method or `*`
    #[serde(default = "default_method")]
    pub method: String,
    pub pattern: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub params: Vec<ParamConfig>,
    #[serde(default)]
    pub reply: ReplyConfig,
}

/// Declaration of one bound argument; `source` and `kind` use the names
/// accepted by [`ParamSource`] and [`ParamKind`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamConfig {
    pub name: String,
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default: Option<String>,
    /// Lookup key when it differs from `name`
    #[serde(default)]
    pub key: Option<String>,
}

impl ParamConfig {
    /// # Errors
    ///
    /// Fails on an unknown source or kind name.
    pub fn to_method_param(&self) -> anyhow::Result<MethodParam> {
        let source: ParamSource = self.source.parse().map_err(|e: String| anyhow!(e))?;
        let kind: ParamKind = self.kind.parse().map_err(|e: String| anyhow!(e))?;
        let mut param = MethodParam::new(&self.name, source, kind);
        if self.required {
            param = param.required();
        }
        if let Some(default) = &self.default {
            param = param.default_value(default.clone());
        }
        if let Some(key) = &self.key {
            param = param.lookup_key(key.clone());
        }
        Ok(param)
    }
}

/// What a declarative route answers with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplyConfig {
    /// JSON description of the matched request and its bound arguments
    #[default]
    Echo,
    Text {
        #[serde(default = "default_status")]
        status: u16,
        body: String,
    },
    Json {
        #[serde(default = "default_status")]
        status: u16,
        body: Value,
    },
    Redirect {
        location: String,
        #[serde(default)]
        permanent: bool,
    },
    Status {
        status: u16,
    },
}

fn status_code(code: u16) -> anyhow::Result<StatusCode> {
    StatusCode::from_u16(code).with_context(|| format!("invalid status code {code}"))
}

impl ReplyConfig {
    /// # Errors
    ///
    /// Fails when a status code is outside 100..=999.
    pub fn to_reply(&self) -> anyhow::Result<Reply> {
        Ok(match self {
            ReplyConfig::Echo => Reply::Echo,
            ReplyConfig::Text { status, body } => Reply::Text(status_code(*status)?, body.clone()),
            ReplyConfig::Json { status, body } => Reply::Json(status_code(*status)?, body.clone()),
            ReplyConfig::Redirect {
                location,
                permanent,
            } => Reply::Redirect(
                if *permanent {
                    StatusCode::MOVED_PERMANENTLY
                } else {
                    StatusCode::FOUND
                },
                location.clone(),
            ),
            ReplyConfig::Status { status } => Reply::Status(status_code(*status)?),
        })
    }
}

/// Handler behind a declarative route.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Echo,
    Text(StatusCode, String),
    Json(StatusCode, Value),
    Redirect(StatusCode, String),
    Status(StatusCode),
}

impl Handler for Reply {
    fn call(&self, ctx: &mut RequestContext, args: &Args) -> Outcome {
        match self {
            Reply::Echo => Outcome::Json(json!({
                "request_id": ctx.request_id().to_string(),
                "method": ctx.method().as_str(),
                "path": ctx.path(),
                "route": ctx.route_pattern(),
                "params": ctx.params().to_map(),
                "query": ctx.query_params(),
                "args": args.to_json(),
            })),
            Reply::Text(status, body) => {
                ctx.set_status(*status);
                Outcome::Text(body.clone())
            }
            Reply::Json(status, body) => {
                ctx.set_status(*status);
                Outcome::Json(body.clone())
            }
            Reply::Redirect(status, location) => Outcome::Redirect {
                status: *status,
                location: location.clone(),
            },
            Reply::Status(status) => Outcome::Status(*status),
        }
    }
}

impl RouterConfig {
    /// Load a configuration file and apply environment overrides.
    ///
    /// `.yaml`/`.yml` files are parsed as YAML, `.toml` as TOML and
    /// `.json` as JSON.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read, has an unknown extension or does
    /// not parse.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        let mut config = match ext.as_str() {
            "yaml" | "yml" => Self::from_yaml_str(&contents),
            "toml" => Self::from_toml_str(&contents),
            "json" => serde_json::from_str(&contents).context("invalid JSON config"),
            other => bail!("unsupported config extension '{other}' for {}", path.display()),
        }
        .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns the YAML parse error.
    pub fn from_yaml_str(contents: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(contents).context("invalid YAML config")
    }

    /// # Errors
    ///
    /// Returns the TOML parse error.
    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        toml::from_str(contents).context("invalid TOML config")
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Override fields from `HIVE_*` values returned by `lookup`.
    /// Unparseable values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = lookup("HIVE_ADDR") {
            self.addr = addr;
        }
        let flag = |key: &str| lookup(key).as_deref().and_then(parse_bool);
        if let Some(v) = flag("HIVE_CASE_SENSITIVE") {
            self.case_sensitive = v;
        }
        if let Some(v) = flag("HIVE_EXPOSE_FAULT_DETAILS") {
            self.dispatch.expose_fault_details = v;
        }
        if let Some(v) = flag("HIVE_METHOD_OVERRIDE") {
            self.dispatch.method_override = v;
        }
        if let Some(v) = flag("HIVE_COLLECT_STATS") {
            self.dispatch.collect_stats = v;
        }
        if let Some(dirs) = lookup("HIVE_STATIC_DIRS") {
            for (prefix, dir) in dirs.split(',').filter_map(|pair| pair.split_once('=')) {
                self.static_dirs
                    .insert(prefix.trim().to_string(), PathBuf::from(dir.trim()));
            }
        }
        self.logging.apply_overrides(&lookup);
    }

    #[must_use]
    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            case_sensitive: self.case_sensitive,
        }
    }

    #[must_use]
    pub fn static_dirs(&self) -> StaticDirs {
        let mut dirs = StaticDirs::new();
        for (prefix, dir) in &self.static_dirs {
            dirs.mount(prefix, dir.clone());
        }
        dirs
    }

    /// Compile every declared route into a new [`Router`].
    ///
    /// # Errors
    ///
    /// Fails on the first route with an invalid method, pattern, parameter
    /// or reply, naming the route.
    pub fn build_router(&self) -> anyhow::Result<Router> {
        let router = Router::with_options(self.compile_options());
        for route in &self.routes {
            register_route(&router, route)
                .with_context(|| format!("route {} {}", route.method, route.pattern))?;
        }
        Ok(router)
    }

    /// Build the router and a dispatcher configured from this file. When
    /// `stats_path` is set, a GET route serving the statistics table is
    /// added.
    ///
    /// # Errors
    ///
    /// See [`RouterConfig::build_router`].
    pub fn build_dispatcher(&self) -> anyhow::Result<Dispatcher> {
        let router = Arc::new(self.build_router()?);
        let dispatcher = Dispatcher::new(Arc::clone(&router))
            .with_static_dirs(self.static_dirs())
            .with_config(self.dispatch);

        if let Some(path) = &self.stats_path {
            let stats = Arc::clone(dispatcher.stats());
            router
                .get(
                    path,
                    Endpoint::new(move |_: &mut RequestContext, _: &Args| stats.to_json())
                        .with_name("stats"),
                )
                .with_context(|| format!("stats route {path}"))?;
        }

        info!(
            routes = router.len(),
            static_dirs = self.static_dirs.len(),
            case_sensitive = self.case_sensitive,
            "Dispatcher built from config"
        );
        Ok(dispatcher)
    }
}

fn register_route(router: &Router, route: &RouteConfig) -> anyhow::Result<()> {
    let method: MethodSpec = route
        .method
        .parse()
        .map_err(|_| anyhow!("invalid method '{}'", route.method))?;
    let params = route
        .params
        .iter()
        .map(ParamConfig::to_method_param)
        .collect::<anyhow::Result<Vec<_>>>()?;
    let mut endpoint = Endpoint::new(route.reply.to_reply()?).with_params(params);
    if let Some(name) = &route.name {
        endpoint = endpoint.with_name(name);
    }
    router.register(method, &route.pattern, endpoint)?;
    Ok(())
}
