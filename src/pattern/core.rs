use super::error::PatternError;
use super::params::Params;
use super::segment::{parse_segment, Piece, Segment};
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Compilation switches shared by routes and filters of one router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// When false, literal text matches regardless of ASCII case.
    pub case_sensitive: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            case_sensitive: true,
        }
    }
}

/// Lookup tier of a compiled pattern.
///
/// Ordered from most to least specific; the route table ranks candidates
/// with this ordering after literal-prefix length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PatternKind {
    /// Only literal segments, e.g. `/users/list`
    Static,
    /// Literal prefix followed by a trailing `*`, e.g. `/files/*`
    Prefix,
    /// Anything with named parameters, regexes or mixed segments
    Dynamic,
}

/// Mapping from parameter name to its ordinal position in a pattern.
///
/// Insertion order equals path-segment order. Built once per pattern and
/// shared (via `Arc<str>` names) with every [`Params`] the pattern produces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterKeyMap {
    names: Vec<Arc<str>>,
}

impl ParameterKeyMap {
    /// Position of `name`, if the pattern declares it.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n.as_ref() == name)
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(|n| n.as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(|n| n.as_ref())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// A compiled, immutable route pattern.
///
/// Created at registration time via [`RoutePattern::compile`]; every
/// malformed-pattern error surfaces there. Matching never fails with an
/// error, it only reports whether the path has the pattern's shape.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    raw: Arc<str>,
    segments: Vec<Segment>,
    keys: ParameterKeyMap,
    matcher: Regex,
    /// Capture group index for each entry of `keys`
    groups: Vec<usize>,
    kind: PatternKind,
    literal_prefix: usize,
    /// Normalised literal path, set for [`PatternKind::Static`] only
    static_path: Option<String>,
    options: CompileOptions,
}

/// Strip trailing slashes, keeping the root.
#[must_use]
pub fn normalize_path(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}

fn capture(index: usize, fragment: &str) -> String {
    format!("(?P<p{index}>{fragment})")
}

impl RoutePattern {
    /// Compile a case-sensitive pattern.
    ///
    /// # Errors
    ///
    /// Returns a [`PatternError`] describing the first malformed construct.
    pub fn compile(raw: &str) -> Result<Self, PatternError> {
        Self::compile_with(raw, CompileOptions::default())
    }

    /// Compile a pattern with explicit options.
    ///
    /// # Errors
    ///
    /// Returns a [`PatternError`] describing the first malformed construct.
    pub fn compile_with(raw: &str, options: CompileOptions) -> Result<Self, PatternError> {
        if !raw.starts_with('/') {
            return Err(PatternError::MissingLeadingSlash {
                pattern: raw.to_string(),
            });
        }

        let segments = raw
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| parse_segment(raw, s))
            .collect::<Result<Vec<_>, _>>()?;

        Self::validate(raw, &segments)?;

        let mut names: Vec<Arc<str>> = Vec::new();
        for seg in &segments {
            names.extend(seg.param_names().into_iter().map(Arc::from));
        }

        let literal_prefix = segments.iter().take_while(|s| s.is_literal()).count();
        let kind = if literal_prefix == segments.len() {
            PatternKind::Static
        } else if literal_prefix + 1 == segments.len()
            && matches!(segments.last(), Some(Segment::Wildcard))
        {
            PatternKind::Prefix
        } else {
            PatternKind::Dynamic
        };

        let static_path = (kind == PatternKind::Static).then(|| {
            let path = Self::literal_path(&segments);
            if options.case_sensitive {
                path
            } else {
                path.to_ascii_lowercase()
            }
        });

        let source = Self::regex_source(&segments, options);
        let matcher = Regex::new(&source).map_err(|e| PatternError::InvalidRegex {
            pattern: raw.to_string(),
            message: e.to_string(),
        })?;

        let groups = (0..names.len())
            .map(|i| {
                let group = format!("p{i}");
                matcher
                    .capture_names()
                    .position(|n| n == Some(group.as_str()))
                    .unwrap_or(0)
            })
            .collect();

        debug!(
            pattern = %raw,
            regex = %source,
            kind = ?kind,
            params = ?names,
            "Route pattern compiled"
        );

        Ok(Self {
            raw: Arc::from(raw),
            segments,
            keys: ParameterKeyMap { names },
            matcher,
            groups,
            kind,
            literal_prefix,
            static_path,
            options,
        })
    }

    fn validate(raw: &str, segments: &[Segment]) -> Result<(), PatternError> {
        let mut seen = HashSet::new();
        let mut wildcards = 0usize;
        let last = segments.len().saturating_sub(1);
        for (i, seg) in segments.iter().enumerate() {
            match seg {
                Segment::Param {
                    name,
                    optional: true,
                    ..
                } if i != last => {
                    return Err(PatternError::OptionalNotLast {
                        pattern: raw.to_string(),
                        name: name.clone(),
                    });
                }
                Segment::PathExt if i != last => {
                    return Err(PatternError::PathExtNotLast {
                        pattern: raw.to_string(),
                    });
                }
                Segment::Wildcard | Segment::PathExt => {
                    wildcards += 1;
                    if wildcards > 1 {
                        return Err(PatternError::MultipleWildcards {
                            pattern: raw.to_string(),
                        });
                    }
                }
                _ => {}
            }
            for name in seg.param_names() {
                if !seen.insert(name) {
                    return Err(PatternError::DuplicateParam {
                        pattern: raw.to_string(),
                        name: name.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    fn literal_path(segments: &[Segment]) -> String {
        let mut path = String::new();
        for seg in segments {
            if let Segment::Literal(text) = seg {
                path.push('/');
                path.push_str(text);
            }
        }
        if path.is_empty() {
            path.push('/');
        }
        path
    }

    fn regex_source(segments: &[Segment], options: CompileOptions) -> String {
        let mut re = String::from(if options.case_sensitive { "^" } else { "(?i)^" });
        if segments.is_empty() {
            re.push('/');
        }
        let last = segments.len().saturating_sub(1);
        let mut index = 0usize;
        for (i, seg) in segments.iter().enumerate() {
            match seg {
                Segment::Literal(text) => {
                    re.push('/');
                    re.push_str(&regex::escape(text));
                }
                Segment::Param {
                    constraint,
                    optional,
                    ..
                } => {
                    let group = capture(index, &constraint.fragment(false));
                    index += 1;
                    if *optional && i == 0 {
                        // Only segment: the bare root still matches.
                        re.push_str(&format!("/(?:{group})?"));
                    } else if *optional {
                        re.push_str(&format!("(?:/{group})?"));
                    } else {
                        re.push('/');
                        re.push_str(&group);
                    }
                }
                Segment::Wildcard => {
                    if i == last {
                        re.push_str(&format!("(?:/{})?", capture(index, ".*")));
                    } else {
                        re.push('/');
                        re.push_str(&capture(index, ".+"));
                    }
                    index += 1;
                }
                Segment::PathExt => {
                    re.push('/');
                    re.push_str(&capture(index, ".+"));
                    re.push_str(r"\.");
                    re.push_str(&capture(index + 1, "[^/.]+"));
                    index += 2;
                }
                Segment::Mixed(pieces) => {
                    re.push('/');
                    let last_piece = pieces.len().saturating_sub(1);
                    for (j, piece) in pieces.iter().enumerate() {
                        match piece {
                            Piece::Text(text) if j == last_piece && text.starts_with('.') => {
                                re.push_str(&format!("(?i:{})", regex::escape(text)));
                            }
                            Piece::Text(text) => re.push_str(&regex::escape(text)),
                            Piece::Param { constraint, .. } => {
                                re.push_str(&capture(index, &constraint.fragment(true)));
                                index += 1;
                            }
                        }
                    }
                }
            }
        }
        re.push('$');
        re
    }

    /// The pattern exactly as registered.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Shared handle to the raw pattern, for logging and statistics keys.
    #[must_use]
    pub fn raw_arc(&self) -> Arc<str> {
        Arc::clone(&self.raw)
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    #[must_use]
    pub fn keys(&self) -> &ParameterKeyMap {
        &self.keys
    }

    #[must_use]
    pub fn kind(&self) -> PatternKind {
        self.kind
    }

    #[must_use]
    pub fn is_static(&self) -> bool {
        self.kind == PatternKind::Static
    }

    /// Number of leading literal segments.
    #[must_use]
    pub fn literal_prefix_len(&self) -> usize {
        self.literal_prefix
    }

    /// Key used by the route table's exact-path index.
    #[must_use]
    pub fn static_path(&self) -> Option<&str> {
        self.static_path.as_deref()
    }

    #[must_use]
    pub fn options(&self) -> CompileOptions {
        self.options
    }

    #[must_use]
    pub fn is_match(&self, path: &str) -> bool {
        self.matches(path).is_some()
    }

    /// Match a request path and extract parameters.
    ///
    /// Trailing slashes are ignored. Returns `None` when the path does not
    /// have this pattern's shape. On success the parameter map contains
    /// every declared name, an absent optional parameter mapping to `""`.
    #[must_use]
    pub fn matches(&self, path: &str) -> Option<Params> {
        let path = normalize_path(path);
        if let Some(expected) = &self.static_path {
            let hit = if self.options.case_sensitive {
                path == expected
            } else {
                path.eq_ignore_ascii_case(expected)
            };
            return hit.then(Params::new);
        }

        let caps = self.matcher.captures(path)?;
        let mut params = Params::new();
        for (name, group) in self.keys.names.iter().zip(&self.groups) {
            let value = caps.get(*group).map(|m| m.as_str()).unwrap_or("");
            params.push(Arc::clone(name), value.to_string());
        }
        Some(params)
    }

    /// Build a concrete path from parameter values (reverse routing).
    ///
    /// Values are percent-encoded; the wildcard value keeps its `/`
    /// separators. Entries that are not pattern parameters are appended as
    /// a query string. Returns `None` when a required parameter is missing
    /// or the built path would not match this pattern.
    #[must_use]
    pub fn build(&self, values: &[(&str, &str)]) -> Option<String> {
        let lookup = |name: &str| {
            values
                .iter()
                .rfind(|(k, _)| *k == name)
                .map(|(_, v)| *v)
                .filter(|v| !v.is_empty())
        };

        let mut path = String::new();
        for seg in &self.segments {
            match seg {
                Segment::Literal(text) => {
                    path.push('/');
                    path.push_str(text);
                }
                Segment::Param { name, optional, .. } => match lookup(name) {
                    Some(v) => {
                        path.push('/');
                        path.push_str(&urlencoding::encode(v));
                    }
                    None if *optional => {}
                    None => return None,
                },
                Segment::Wildcard => {
                    if let Some(v) = lookup(super::SPLAT) {
                        path.push('/');
                        let encoded: Vec<_> = v.split('/').map(urlencoding::encode).collect();
                        path.push_str(&encoded.join("/"));
                    }
                }
                Segment::PathExt => {
                    let p = lookup(super::PATH)?;
                    let ext = lookup(super::EXT)?;
                    let encoded: Vec<_> = p.split('/').map(urlencoding::encode).collect();
                    path.push('/');
                    path.push_str(&encoded.join("/"));
                    path.push('.');
                    path.push_str(&urlencoding::encode(ext));
                }
                Segment::Mixed(pieces) => {
                    path.push('/');
                    for piece in pieces {
                        match piece {
                            Piece::Text(text) => path.push_str(text),
                            Piece::Param { name, .. } => {
                                path.push_str(&urlencoding::encode(lookup(name)?));
                            }
                        }
                    }
                }
            }
        }
        if path.is_empty() {
            path.push('/');
        }

        let decoded = urlencoding::decode(&path).ok()?;
        if !self.is_match(&decoded) {
            return None;
        }

        let mut query = url::form_urlencoded::Serializer::new(String::new());
        let mut has_query = false;
        for (k, v) in values {
            if self.keys.position(k).is_none() {
                query.append_pair(k, v);
                has_query = true;
            }
        }
        if has_query {
            path.push('?');
            path.push_str(&query.finish());
        }
        Some(path)
    }
}

impl PartialEq for RoutePattern {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw && self.options == other.options
    }
}

impl Eq for RoutePattern {}
