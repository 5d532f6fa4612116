//! Segment grammar for route patterns.
//!
//! A pattern is split on `/` and every non-empty piece is parsed into a
//! [`Segment`]. Supported forms:
//!
//! | Form | Meaning |
//! |------|---------|
//! | `users` | literal |
//! | `:id`, `{id}` | named parameter, one path segment |
//! | `:id:int`, `:name:string` | typed shorthand (`[0-9]+`, `[\w]+`) |
//! | `:id([0-9]+)`, `{id:[0-9]+}` | parameter with a custom regex |
//! | `?:id` | optional parameter, last segment only |
//! | `*` | wildcard, captured as `splat` |
//! | `*.*` | path and extension, captured as `path` and `ext` |
//! | `post-:id.html` | literal text mixed with parameters |

use super::error::PatternError;

/// What a single named parameter is allowed to match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// Anything except `/`
    Any,
    /// ASCII digits (`:id:int`)
    Int,
    /// Word characters (`:name:string`)
    Word,
    /// User-supplied regex
    Regex(String),
}

impl Constraint {
    /// Regex fragment (without capture group) for this constraint.
    ///
    /// `lazy` is used inside mixed segments so literal suffixes such as
    /// `.json` are left for the text that follows.
    pub(crate) fn fragment(&self, lazy: bool) -> String {
        match self {
            Constraint::Any if lazy => "[^/]+?".to_string(),
            Constraint::Any => "[^/]+".to_string(),
            Constraint::Int => "[0-9]+".to_string(),
            Constraint::Word => r"[\w]+".to_string(),
            Constraint::Regex(re) => format!("(?:{re})"),
        }
    }
}

/// A piece of a mixed segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Piece {
    Text(String),
    Param { name: String, constraint: Constraint },
}

/// One `/`-delimited part of a route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Param {
        name: String,
        constraint: Constraint,
        optional: bool,
    },
    /// `*`: captures the remainder of the path, `/` included
    Wildcard,
    /// `*.*`: captures `path` and `ext` from the remainder
    PathExt,
    /// Literal text and parameters sharing a segment
    Mixed(Vec<Piece>),
}

impl Segment {
    /// Parameter names declared by this segment, in order.
    pub(crate) fn param_names(&self) -> Vec<&str> {
        match self {
            Segment::Literal(_) => Vec::new(),
            Segment::Param { name, .. } => vec![name.as_str()],
            Segment::Wildcard => vec![super::SPLAT],
            Segment::PathExt => vec![super::PATH, super::EXT],
            Segment::Mixed(pieces) => pieces
                .iter()
                .filter_map(|p| match p {
                    Piece::Param { name, .. } => Some(name.as_str()),
                    Piece::Text(_) => None,
                })
                .collect(),
        }
    }

    #[must_use]
    pub fn is_literal(&self) -> bool {
        matches!(self, Segment::Literal(_))
    }
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn name_len(s: &str) -> usize {
    s.bytes().take_while(|b| is_name_byte(*b)).count()
}

/// Offset of the delimiter closing the one at `s[0]`, honouring nesting and
/// backslash escapes.
fn find_closing(s: &str, open: u8, close: u8) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'\\' {
            i += 2;
            continue;
        }
        if b == open {
            depth += 1;
        } else if b == close {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}

/// `:int` / `:string` directly after a parameter name.
fn typed_suffix(s: &str) -> Option<(Constraint, usize)> {
    for (suffix, constraint) in [(":int", Constraint::Int), (":string", Constraint::Word)] {
        if let Some(rest) = s.strip_prefix(suffix) {
            if !matches!(rest.bytes().next(), Some(b) if is_name_byte(b)) {
                return Some((constraint, suffix.len()));
            }
        }
    }
    None
}

fn parse_pieces(pattern: &str, segment: &str, s: &str) -> Result<Vec<Piece>, PatternError> {
    let unbalanced = |delimiter| PatternError::Unbalanced {
        pattern: pattern.to_string(),
        segment: segment.to_string(),
        delimiter,
    };
    let empty_name = || PatternError::EmptyParamName {
        pattern: pattern.to_string(),
        segment: segment.to_string(),
    };

    let mut pieces = Vec::new();
    let mut text = String::new();
    let mut i = 0;
    while i < s.len() {
        let rest = &s[i..];
        let (name, constraint, consumed) = match rest.as_bytes()[0] {
            b':' => {
                let len = name_len(&rest[1..]);
                if len == 0 {
                    return Err(empty_name());
                }
                let name = &rest[1..=len];
                let after = &rest[1 + len..];
                if after.starts_with('(') {
                    let close = find_closing(after, b'(', b')').ok_or_else(|| unbalanced('('))?;
                    let re = &after[1..close];
                    (name, Constraint::Regex(re.to_string()), 1 + len + close + 1)
                } else if let Some((constraint, extra)) = typed_suffix(after) {
                    (name, constraint, 1 + len + extra)
                } else {
                    (name, Constraint::Any, 1 + len)
                }
            }
            b'{' => {
                let close = find_closing(rest, b'{', b'}').ok_or_else(|| unbalanced('{'))?;
                let inner = &rest[1..close];
                let (name, constraint) = match inner.split_once(':') {
                    Some((name, "")) => (name, Constraint::Any),
                    Some((name, re)) => (name, Constraint::Regex(re.to_string())),
                    None => (inner, Constraint::Any),
                };
                if name.is_empty() {
                    return Err(empty_name());
                }
                if name_len(name) != name.len() {
                    return Err(PatternError::InvalidParamName {
                        pattern: pattern.to_string(),
                        name: name.to_string(),
                    });
                }
                (name, constraint, close + 1)
            }
            b'}' => return Err(unbalanced('}')),
            _ => {
                let ch = rest.chars().next().unwrap_or_default();
                text.push(ch);
                i += ch.len_utf8();
                continue;
            }
        };
        if !text.is_empty() {
            pieces.push(Piece::Text(std::mem::take(&mut text)));
        }
        pieces.push(Piece::Param {
            name: name.to_string(),
            constraint,
        });
        i += consumed;
    }
    if !text.is_empty() {
        pieces.push(Piece::Text(text));
    }
    Ok(pieces)
}

/// Parse one path segment.
pub(crate) fn parse_segment(pattern: &str, segment: &str) -> Result<Segment, PatternError> {
    match segment {
        "*" => return Ok(Segment::Wildcard),
        "*.*" => return Ok(Segment::PathExt),
        _ => {}
    }

    let (optional, body) = match segment.strip_prefix('?') {
        Some(rest) if rest.starts_with(':') || rest.starts_with('{') => (true, rest),
        _ => (false, segment),
    };

    let mut pieces = parse_pieces(pattern, segment, body)?;
    let single_param = matches!(pieces.as_slice(), [Piece::Param { .. }]);
    if optional && !single_param {
        return Err(PatternError::OptionalNotSimple {
            pattern: pattern.to_string(),
            segment: segment.to_string(),
        });
    }

    if pieces.len() == 1 {
        return Ok(match pieces.remove(0) {
            Piece::Param { name, constraint } => Segment::Param {
                name,
                constraint,
                optional,
            },
            Piece::Text(text) => Segment::Literal(text),
        });
    }
    Ok(Segment::Mixed(pieces))
}
