//! Interpreter limits loaded from TOML
//!
//! ```toml
//! max_recursion_depth = 5000
//! max_loop_iterations = 1000000   # 0 = unlimited
//! echo_imports = true
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default recursion limit for script function calls
pub const DEFAULT_MAX_RECURSION_DEPTH: usize = 10_000;

/// Default loop guard: the largest positive 32-bit count
pub const DEFAULT_MAX_LOOP_ITERATIONS: u64 = i32::MAX as u64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    /// Nested script function calls allowed before `stack overflow`
    pub max_recursion_depth: usize,
    /// Iterations a single loop may run before `Infinite loop detected!`; 0 disables the guard
    pub max_loop_iterations: u64,
    /// Log each imported file at info level
    pub echo_imports: bool,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        InterpreterConfig {
            max_recursion_depth: DEFAULT_MAX_RECURSION_DEPTH,
            max_loop_iterations: DEFAULT_MAX_LOOP_ITERATIONS,
            echo_imports: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl InterpreterConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}
