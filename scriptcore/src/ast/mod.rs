//! Abstract Syntax Tree definitions
//!
//! The tree is produced by an external parser and handed over either as
//! Rust values or as JSON (every node is serde-serializable).

pub mod build;
mod expr;
mod span;
mod stmt;
mod types;

pub use expr::*;
pub use span::*;
pub use stmt::*;
pub use types::*;

use serde::{Deserialize, Serialize};

/// A program is a sequence of top-level statements
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub statements: Vec<Spanned<Stmt>>,
}

impl Program {
    pub fn new(statements: Vec<Spanned<Stmt>>) -> Self {
        Program { statements }
    }

    /// Top-level function declarations, in source order
    pub fn functions(&self) -> impl Iterator<Item = &FnDef> {
        self.statements.iter().filter_map(|s| match &s.node {
            Stmt::Function(def) => Some(def),
            _ => None,
        })
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
