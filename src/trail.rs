//! Diagnostic trail threaded through nested checks
//!
//! A [`Trail`] is a persistent list: [`Trail::push`] returns a new trail that
//! shares its prefix with the receiver, so sibling checks never see each
//! other's segments.

use std::fmt;
use std::sync::Arc;

#[derive(Debug)]
struct Segment {
    text: String,
    parent: Option<Arc<Segment>>,
    depth: usize,
}

/// Ordered, append-only path of check descriptions
#[derive(Debug, Clone, Default)]
pub struct Trail {
    head: Option<Arc<Segment>>,
}

impl Trail {
    /// An empty trail
    pub fn new() -> Self {
        Self::default()
    }

    /// Extend with one segment, leaving `self` untouched
    pub fn push(&self, segment: impl Into<String>) -> Self {
        Self {
            head: Some(Arc::new(Segment {
                text: segment.into(),
                parent: self.head.clone(),
                depth: self.len() + 1,
            })),
        }
    }

    pub fn len(&self) -> usize {
        self.head.as_ref().map_or(0, |s| s.depth)
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Segments from the outermost check to the innermost
    pub fn segments(&self) -> Vec<&str> {
        let mut out = Vec::with_capacity(self.len());
        let mut current = self.head.as_deref();
        while let Some(segment) = current {
            out.push(segment.text.as_str());
            current = segment.parent.as_deref();
        }
        out.reverse();
        out
    }

    /// Rendering appended to diagnostics: a newline before each segment
    pub(crate) fn suffix(&self) -> String {
        self.segments()
            .into_iter()
            .map(|s| format!("\n{}", s))
            .collect()
    }
}

impl fmt::Display for Trail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments().join("\n"))
    }
}

impl PartialEq for Trail {
    fn eq(&self, other: &Self) -> bool {
        self.segments() == other.segments()
    }
}

impl<S: Into<String>> FromIterator<S> for Trail {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        iter.into_iter().fold(Trail::new(), |trail, s| trail.push(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_does_not_mutate() {
        let root = Trail::new().push("list[0] check: int");
        let left = root.push("left");
        let right = root.push("right");

        assert_eq!(root.len(), 1);
        assert_eq!(left.segments(), vec!["list[0] check: int", "left"]);
        assert_eq!(right.segments(), vec!["list[0] check: int", "right"]);
    }

    #[test]
    fn test_display() {
        let trail: Trail = ["a", "b"].into_iter().collect();
        assert_eq!(trail.to_string(), "a\nb");
        assert_eq!(trail.suffix(), "\na\nb");
        assert_eq!(Trail::new().suffix(), "");
    }
}
