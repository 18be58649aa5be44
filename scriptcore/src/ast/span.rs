//! Source location tracking

use serde::{Deserialize, Serialize};

/// A node tagged with the script line it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spanned<T> {
    pub node: T,
    #[serde(default)]
    pub line: usize,
}

impl<T> Spanned<T> {
    pub fn new(node: T, line: usize) -> Self {
        Self { node, line }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Spanned<U> {
        Spanned {
            node: f(self.node),
            line: self.line,
        }
    }

    pub fn as_ref(&self) -> Spanned<&T> {
        Spanned {
            node: &self.node,
            line: self.line,
        }
    }
}
