use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;

/// Maximum number of route parameters before heap allocation.
/// Most routes carry ≤4 parameters (e.g. `/users/:id/posts/:post_id`).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated parameter storage for the lookup path.
///
/// Names are `Arc<str>` shared with the compiled pattern's
/// [`ParameterKeyMap`](super::ParameterKeyMap), so a match only allocates
/// the per-request values.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Ordered name → value map of parameters captured from a path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(ParamVec);

impl Params {
    #[must_use]
    pub fn new() -> Self {
        Self(ParamVec::new())
    }

    /// Get a parameter by name.
    ///
    /// Uses "last write wins" semantics so a value set by a filter or by the
    /// extension fallback overrides one captured earlier. Numeric names
    /// (`"0"`, `"1"`, ...) fall back to [`Params::positional`].
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
            .or_else(|| self.positional(name.parse().ok()?))
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|(k, _)| k.as_ref() == name)
    }

    /// Append a captured value. Does not check for an existing name.
    #[inline]
    pub fn push(&mut self, name: Arc<str>, value: String) {
        self.0.push((name, value));
    }

    /// Set a parameter, replacing an existing value of the same name.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| k.as_ref() == name) {
            Some((_, v)) => *v = value,
            None => self.0.push((Arc::from(name), value)),
        }
    }

    /// Merge every entry of `other` into `self`, `other` winning on conflicts.
    pub fn extend_from(&mut self, other: &Params) {
        for (k, v) in other.iter() {
            self.insert(k, v);
        }
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_ref(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Positional access into the `splat` capture: `/files/*` matched
    /// against `/files/a/b` yields `a` at 0 and `b` at 1.
    #[must_use]
    pub fn positional(&self, index: usize) -> Option<&str> {
        self.get(super::SPLAT)?
            .split('/')
            .filter(|s| !s.is_empty())
            .nth(index)
    }

    /// Convert to a HashMap for callers that want owned lookups.
    /// Note: This allocates - use `get()` on the dispatch path instead.
    #[must_use]
    pub fn to_map(&self) -> HashMap<String, String> {
        self.0
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for Params {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_write_wins() {
        let mut p = Params::new();
        p.push(Arc::from("id"), "1".into());
        p.push(Arc::from("id"), "2".into());
        assert_eq!(p.get("id"), Some("2"));
    }

    #[test]
    fn test_insert_replaces() {
        let mut p: Params = [("a", "1")].into_iter().collect();
        p.insert("a", "2");
        p.insert("b", "3");
        assert_eq!(p.len(), 2);
        assert_eq!(p.get("a"), Some("2"));
        assert_eq!(p.to_map().get("b").map(String::as_str), Some("3"));
    }

    #[test]
    fn test_positional_from_splat() {
        let p: Params = [("splat", "a/b/c.txt")].into_iter().collect();
        assert_eq!(p.positional(0), Some("a"));
        assert_eq!(p.positional(2), Some("c.txt"));
        assert_eq!(p.positional(3), None);
        assert_eq!(p.get("1"), Some("b"));
        assert_eq!(p.get("9"), None);
    }
}
