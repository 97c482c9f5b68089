use std::fmt::{Display, Formatter};
use std::ops::Deref;

use crate::firestore::error::{invalid_argument, FirestoreResult};

/// Slash separated path of alternating collection and document segments.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourcePath {
    segments: Vec<String>,
}

impl ResourcePath {
    pub fn new(segments: Vec<String>) -> Self {
        Self { segments }
    }

    pub fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(segments.into_iter().map(Into::into).collect())
    }

    /// Parses `a/b/c`; a single leading or trailing slash is tolerated.
    pub fn from_string(path: &str) -> FirestoreResult<Self> {
        let trimmed = path.trim().trim_matches('/');
        if trimmed.is_empty() {
            return Ok(Self::root());
        }
        if trimmed.contains("//") {
            return Err(invalid_argument(format!(
                "Found empty segment in resource path '{path}'"
            )));
        }
        Ok(Self::from_segments(trimmed.split('/')))
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.segments.get(index).map(|s| s.as_str())
    }

    /// Odd segment count.
    pub fn is_collection(&self) -> bool {
        self.segments.len() % 2 == 1
    }

    /// Even, non-zero segment count.
    pub fn is_document(&self) -> bool {
        !self.segments.is_empty() && self.segments.len() % 2 == 0
    }

    pub fn child<I, S>(&self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut joined = self.segments.clone();
        joined.extend(segments.into_iter().map(Into::into));
        Self::new(joined)
    }

    pub fn pop_last(&self) -> Option<Self> {
        let (_, rest) = self.segments.split_last()?;
        Some(Self::new(rest.to_vec()))
    }

    pub fn without_last(&self) -> Self {
        self.pop_last().unwrap_or_else(Self::root)
    }

    pub fn last_segment(&self) -> Option<&str> {
        self.segments.last().map(|s| s.as_str())
    }

    pub fn canonical_string(&self) -> String {
        self.segments.join("/")
    }

    pub fn is_prefix_of(&self, other: &Self) -> bool {
        self.len() <= other.len()
            && self
                .segments
                .iter()
                .zip(other.segments.iter())
                .all(|(l, r)| l == r)
    }
}

impl Display for ResourcePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.canonical_string())
    }
}

impl Deref for ResourcePath {
    type Target = [String];

    fn deref(&self) -> &Self::Target {
        &self.segments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_render_path() {
        let path = ResourcePath::from_string("restaurants/r1/dishes/d1").unwrap();
        assert_eq!(path.len(), 4);
        assert_eq!(path.last_segment(), Some("d1"));
        assert!(path.is_document());
        assert_eq!(path.canonical_string(), "restaurants/r1/dishes/d1");
    }

    #[test]
    fn tolerates_outer_slashes() {
        let path = ResourcePath::from_string("/restaurants/").unwrap();
        assert_eq!(path.canonical_string(), "restaurants");
        assert!(path.is_collection());
    }

    #[test]
    fn handles_root_path() {
        let path = ResourcePath::from_string("").unwrap();
        assert!(path.is_empty());
        assert!(!path.is_document());
        assert!(!path.is_collection());
    }

    #[test]
    fn rejects_empty_segments() {
        let err = ResourcePath::from_string("restaurants//r1").unwrap_err();
        assert_eq!(err.code_str(), "firestore/invalid-argument");
    }

    #[test]
    fn prefix_and_parent() {
        let parent = ResourcePath::from_string("restaurants/r1").unwrap();
        let child = parent.child(["dishes", "d1"]);
        assert!(parent.is_prefix_of(&child));
        assert!(!child.is_prefix_of(&parent));
        assert_eq!(child.without_last().canonical_string(), "restaurants/r1/dishes");
        assert_eq!(ResourcePath::root().pop_last(), None);
    }
}
