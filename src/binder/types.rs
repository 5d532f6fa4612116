use chrono::{DateTime, FixedOffset};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Where a bound argument's raw value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamSource {
    /// Route parameter captured by the pattern
    Path,
    /// Query string, then a form-encoded body field
    Query,
    /// Request header (case-insensitive)
    Header,
    /// Cookie
    Cookie,
    /// Whole request body
    Body,
}

impl fmt::Display for ParamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ParamSource::Path => "path",
            ParamSource::Query => "query",
            ParamSource::Header => "header",
            ParamSource::Cookie => "cookie",
            ParamSource::Body => "body",
        })
    }
}

impl FromStr for ParamSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "path" => Ok(ParamSource::Path),
            "query" | "form" => Ok(ParamSource::Query),
            "header" => Ok(ParamSource::Header),
            "cookie" => Ok(ParamSource::Cookie),
            "body" => Ok(ParamSource::Body),
            other => Err(format!("unknown parameter source '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntWidth {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
}

impl IntWidth {
    #[must_use]
    pub fn is_signed(self) -> bool {
        matches!(self, IntWidth::I8 | IntWidth::I16 | IntWidth::I32 | IntWidth::I64)
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            IntWidth::I8 => "i8",
            IntWidth::I16 => "i16",
            IntWidth::I32 => "i32",
            IntWidth::I64 => "i64",
            IntWidth::U8 => "u8",
            IntWidth::U16 => "u16",
            IntWidth::U32 => "u32",
            IntWidth::U64 => "u64",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatWidth {
    F32,
    F64,
}

/// Target type of a bound argument.
///
/// The set is closed: each kind has exactly one parser, chosen when the
/// route is registered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamKind {
    Bool,
    Int(IntWidth),
    Float(FloatWidth),
    Str,
    /// RFC 3339 timestamp, or a `YYYY-MM-DD` date at midnight UTC
    Time,
    /// Any JSON document
    Json,
    /// Comma-separated list (a JSON array when bound from the body)
    List(Box<ParamKind>),
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamKind::Bool => f.write_str("bool"),
            ParamKind::Int(w) => f.write_str(w.name()),
            ParamKind::Float(FloatWidth::F32) => f.write_str("f32"),
            ParamKind::Float(FloatWidth::F64) => f.write_str("f64"),
            ParamKind::Str => f.write_str("string"),
            ParamKind::Time => f.write_str("time"),
            ParamKind::Json => f.write_str("json"),
            ParamKind::List(inner) => write!(f, "list<{inner}>"),
        }
    }
}

/// Parses the names printed by `Display` plus the aliases `int` (i64),
/// `uint` (u64), `float` (f64), `str` and `[kind]` for lists.
impl FromStr for ParamKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let lower = s.to_ascii_lowercase();
        if let Some(inner) = lower
            .strip_prefix("list<")
            .and_then(|r| r.strip_suffix('>'))
            .or_else(|| lower.strip_prefix('[').and_then(|r| r.strip_suffix(']')))
        {
            return Ok(ParamKind::List(Box::new(inner.parse()?)));
        }
        Ok(match lower.as_str() {
            "bool" => ParamKind::Bool,
            "i8" => ParamKind::Int(IntWidth::I8),
            "i16" => ParamKind::Int(IntWidth::I16),
            "i32" => ParamKind::Int(IntWidth::I32),
            "i64" | "int" => ParamKind::Int(IntWidth::I64),
            "u8" => ParamKind::Int(IntWidth::U8),
            "u16" => ParamKind::Int(IntWidth::U16),
            "u32" => ParamKind::Int(IntWidth::U32),
            "u64" | "uint" => ParamKind::Int(IntWidth::U64),
            "f32" => ParamKind::Float(FloatWidth::F32),
            "f64" | "float" => ParamKind::Float(FloatWidth::F64),
            "string" | "str" => ParamKind::Str,
            "time" => ParamKind::Time,
            "json" => ParamKind::Json,
            _ => return Err(format!("unknown parameter kind '{s}'")),
        })
    }
}

/// Declaration of one handler argument.
///
/// ```rust
/// use hiverouter::binder::{IntWidth, MethodParam, ParamKind};
///
/// let page = MethodParam::query("page", ParamKind::Int(IntWidth::U32)).default_value("1");
/// let id = MethodParam::path("id", ParamKind::Int(IntWidth::I64)).required();
/// assert!(id.is_required());
/// assert_eq!(page.default(), Some("1"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodParam {
    name: Arc<str>,
    key: Option<String>,
    source: ParamSource,
    kind: ParamKind,
    required: bool,
    default: Option<String>,
}

impl MethodParam {
    #[must_use]
    pub fn new(name: &str, source: ParamSource, kind: ParamKind) -> Self {
        Self {
            name: Arc::from(name),
            key: None,
            source,
            kind,
            required: false,
            default: None,
        }
    }

    #[must_use]
    pub fn path(name: &str, kind: ParamKind) -> Self {
        Self::new(name, ParamSource::Path, kind)
    }

    #[must_use]
    pub fn query(name: &str, kind: ParamKind) -> Self {
        Self::new(name, ParamSource::Query, kind)
    }

    #[must_use]
    pub fn header(name: &str, kind: ParamKind) -> Self {
        Self::new(name, ParamSource::Header, kind)
    }

    #[must_use]
    pub fn cookie(name: &str, kind: ParamKind) -> Self {
        Self::new(name, ParamSource::Cookie, kind)
    }

    #[must_use]
    pub fn body(name: &str, kind: ParamKind) -> Self {
        Self::new(name, ParamSource::Body, kind)
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Look the raw value up under `key` instead of the argument name,
    /// e.g. argument `token` read from header `X-Auth-Token`.
    #[must_use]
    pub fn lookup_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn name_arc(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    /// Name used to look the raw value up in its source.
    #[must_use]
    pub fn key(&self) -> &str {
        self.key.as_deref().unwrap_or(&self.name)
    }

    #[must_use]
    pub fn source(&self) -> ParamSource {
        self.source
    }

    #[must_use]
    pub fn kind(&self) -> &ParamKind {
        &self.kind
    }

    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    #[must_use]
    pub fn default(&self) -> Option<&str> {
        self.default.as_deref()
    }
}

/// A converted argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    UInt(u64),
    F32(f32),
    F64(f64),
    Str(String),
    Time(DateTime<FixedOffset>),
    Json(Value),
    List(Vec<ParamValue>),
}

impl ParamValue {
    /// JSON form of the value; times render as RFC 3339 strings and
    /// non-finite floats as `null`.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            ParamValue::Bool(b) => Value::Bool(*b),
            ParamValue::Int(v) => Value::from(*v),
            ParamValue::UInt(v) => Value::from(*v),
            ParamValue::F32(v) => Value::from(f64::from(*v)),
            ParamValue::F64(v) => Value::from(*v),
            ParamValue::Str(s) => Value::String(s.clone()),
            ParamValue::Time(t) => Value::String(t.to_rfc3339()),
            ParamValue::Json(v) => v.clone(),
            ParamValue::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
        }
    }
}

/// Extraction of a Rust value from a [`ParamValue`].
pub trait FromParamValue: Sized {
    fn from_param_value(value: &ParamValue) -> Option<Self>;
}

macro_rules! from_integer {
    ($($t:ty),*) => {$(
        impl FromParamValue for $t {
            fn from_param_value(value: &ParamValue) -> Option<Self> {
                match value {
                    ParamValue::Int(v) => <$t>::try_from(*v).ok(),
                    ParamValue::UInt(v) => <$t>::try_from(*v).ok(),
                    _ => None,
                }
            }
        }
    )*};
}

from_integer!(i8, i16, i32, i64, u8, u16, u32, u64);

impl FromParamValue for bool {
    fn from_param_value(value: &ParamValue) -> Option<Self> {
        match value {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromParamValue for f32 {
    fn from_param_value(value: &ParamValue) -> Option<Self> {
        match value {
            ParamValue::F32(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromParamValue for f64 {
    fn from_param_value(value: &ParamValue) -> Option<Self> {
        match value {
            ParamValue::F64(v) => Some(*v),
            ParamValue::F32(v) => Some(f64::from(*v)),
            _ => None,
        }
    }
}

impl FromParamValue for String {
    fn from_param_value(value: &ParamValue) -> Option<Self> {
        match value {
            ParamValue::Str(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl FromParamValue for DateTime<FixedOffset> {
    fn from_param_value(value: &ParamValue) -> Option<Self> {
        match value {
            ParamValue::Time(t) => Some(*t),
            _ => None,
        }
    }
}

impl FromParamValue for Value {
    fn from_param_value(value: &ParamValue) -> Option<Self> {
        match value {
            ParamValue::Json(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl<T: FromParamValue> FromParamValue for Vec<T> {
    fn from_param_value(value: &ParamValue) -> Option<Self> {
        match value {
            ParamValue::List(items) => items.iter().map(T::from_param_value).collect(),
            _ => None,
        }
    }
}

/// Bound arguments, in declaration order.
///
/// An optional parameter that was absent and had no default maps to `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    values: Vec<(Arc<str>, Option<ParamValue>)>,
}

impl Args {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, name: Arc<str>, value: Option<ParamValue>) {
        self.values.push((name, value));
    }

    /// Raw converted value, `None` when absent or undeclared.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&ParamValue> {
        self.values
            .iter()
            .find(|(n, _)| n.as_ref() == name)
            .and_then(|(_, v)| v.as_ref())
    }

    /// Typed value; `None` when absent or of a different type.
    #[must_use]
    pub fn get<T: FromParamValue>(&self, name: &str) -> Option<T> {
        self.value(name).and_then(T::from_param_value)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&ParamValue>)> {
        self.values.iter().map(|(n, v)| (n.as_ref(), v.as_ref()))
    }

    /// Object of name → value, absent arguments as `null`.
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.iter()
                .map(|(n, v)| (n.to_string(), v.map_or(Value::Null, ParamValue::to_json)))
                .collect(),
        )
    }
}
