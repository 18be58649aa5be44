//! scriptcore: tree-walking evaluator for an embeddable scripting language
//!
//! Programs arrive as already parsed statement trees ([`ast::Program`],
//! serializable as JSON). The [`interp::Interpreter`] runs them against a
//! dynamically typed value model with records, bitmaps, fixed and dynamic
//! arrays, queues and database cursors.

pub mod arrays;
pub mod ast;
pub mod builtins;
pub mod config;
pub mod db;
pub mod interp;
pub mod types;

pub use ast::{Program, Spanned};
pub use config::{ConfigError, InterpreterConfig};
pub use interp::{ErrorKind, InterpResult, Interpreter, RuntimeError, Value};

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing output.
///
/// Safe to call more than once. Only active when `RUST_LOG` is set, e.g.
/// `RUST_LOG=scriptcore=debug`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true).with_writer(std::io::stderr))
                .with(filter)
                .init();
        }
    });
}
