//! Drill path: the root-first account path a chart is scoped to

use serde::{Deserialize, Serialize};

/// Ordered account path, never empty.
///
/// The root is permanent; only `reset` replaces it. Serialized as the
/// plain segment list; an empty list is rejected on the way in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "Vec<String>", try_from = "Vec<String>")]
pub struct DrillPath {
    segments: Vec<String>,
}

impl DrillPath {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            segments: vec![root.into()],
        }
    }

    /// Current leaf account
    pub fn current(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    pub fn root(&self) -> &str {
        self.segments.first().map(String::as_str).unwrap_or_default()
    }

    /// Account one level up, if any
    pub fn parent(&self) -> Option<&str> {
        if self.segments.len() > 1 {
            self.segments.get(self.segments.len() - 2).map(String::as_str)
        } else {
            None
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn is_at_root(&self) -> bool {
        self.segments.len() == 1
    }

    /// Depth sent to the API: one level below the current leaf
    pub fn depth(&self) -> u32 {
        self.segments.len() as u32 + 1
    }

    /// Append `child` unless it is already the leaf.
    /// Returns whether the path changed.
    pub fn push(&mut self, child: impl Into<String>) -> bool {
        let child = child.into();
        if child.is_empty() || child == self.current() {
            return false;
        }
        self.segments.push(child);
        true
    }

    /// Drop the leaf unless at root. Returns whether the path changed.
    pub fn pop(&mut self) -> bool {
        if self.segments.len() > 1 {
            self.segments.pop();
            true
        } else {
            false
        }
    }

    /// Replace the whole path with `[new_root]`.
    /// Ignored for a missing or empty root.
    pub fn reset(&mut self, new_root: Option<&str>) -> bool {
        match new_root {
            Some(root) if !root.is_empty() => {
                let unchanged = self.segments.len() == 1 && self.segments[0] == root;
                self.segments = vec![root.to_string()];
                !unchanged
            }
            _ => false,
        }
    }
}

impl TryFrom<Vec<String>> for DrillPath {
    type Error = String;

    fn try_from(segments: Vec<String>) -> Result<Self, Self::Error> {
        if segments.is_empty() || segments.iter().any(String::is_empty) {
            return Err("drill path needs a non-empty root".to_string());
        }
        Ok(Self { segments })
    }
}

impl From<DrillPath> for Vec<String> {
    fn from(path: DrillPath) -> Self {
        path.segments
    }
}

impl std::fmt::Display for DrillPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.segments.join(" > "))
    }
}
