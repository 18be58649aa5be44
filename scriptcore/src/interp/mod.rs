//! Tree-walking interpreter
//!
//! All mutable state of a running script lives in [`InterpreterContext`]:
//! variable scopes, the diagnostic call stack, declared functions, typedef
//! aliases, screen slots and database handles. Host collaborators (output
//! sink, database adapter, screen host, extra builtin modules) are injected
//! through the builder methods on [`Interpreter`].

mod arrays;
mod callstack;
mod calls;
mod db_stmt;
mod env;
mod error;
mod eval;
mod exceptions;
mod expr;
mod flow;
mod import;
mod map;
mod ops;
mod output;
mod props;
mod screen;
mod typedefs;
mod typeinfo;
mod value;

pub use callstack::{CallStack, FrameKind, StackFrame};
pub use env::{Binding, Environment, Layout, TypeMeta};
pub use error::{ErrorKind, InterpResult, RuntimeError};
pub use flow::{CallId, Flow};
pub use map::MapData;
pub use output::{CaptureOutput, Output, StdOutput};
pub use screen::{ScreenHost, ScreenRegistry, ScreenSlot};
pub use typedefs::{Resolved, ResolvedType, TypeRegistry};
pub use value::{shared, CursorRef, Shared, Value};

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::ast::{Expr, FnDef, Literal, Program, Spanned, Stmt};
use crate::builtins::{BuiltinModule, BuiltinRegistry};
use crate::config::InterpreterConfig;
use crate::db::{DbAdapter, DbConnection, NoDbAdapter};
use crate::types::parse_date;

/// Stack growth parameters for deep recursion
const STACK_RED_ZONE: usize = 128 * 1024; // 128KB remaining triggers growth
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024; // Grow by 4MB each time

/// Name of the program run directly (not imported)
const MAIN_SOURCE: &str = "<script>";

/// Cursor declared by `cursor name = select ...` inside a `use` block
#[derive(Debug, Clone)]
pub(crate) struct CursorSpec {
    pub connection: String,
    pub sql: String,
}

/// Connections, the `use` stack and declared cursors
pub(crate) struct DbState {
    pub adapter: Box<dyn DbAdapter>,
    pub connections: HashMap<String, Box<dyn DbConnection>>,
    pub use_stack: Vec<String>,
    pub cursors: HashMap<String, CursorSpec>,
}

impl DbState {
    fn new(adapter: Box<dyn DbAdapter>) -> Self {
        DbState {
            adapter,
            connections: HashMap::new(),
            use_stack: Vec::new(),
            cursors: HashMap::new(),
        }
    }

    /// Connection of the innermost `use` block
    pub fn current(&self) -> Option<&str> {
        self.use_stack.last().map(String::as_str)
    }
}

/// Mutable state of one interpreter instance
pub struct InterpreterContext {
    pub env: Environment,
    pub call_stack: CallStack,
    /// Declared functions by lowercase name
    pub(crate) functions: HashMap<String, Arc<FnDef>>,
    /// Program each function was declared in
    pub(crate) function_origins: HashMap<String, String>,
    /// Ids of the script function calls in progress, innermost last
    pub(crate) function_stack: Vec<CallId>,
    pub(crate) next_call_id: CallId,
    pub(crate) recursion_depth: usize,
    pub typedefs: TypeRegistry,
    pub screens: ScreenRegistry,
    pub(crate) db: DbState,
    /// Layout recorded by the last record / bitmap / intmap cast
    pub(crate) pending_meta: Option<TypeMeta>,
    /// Canonical paths of programs already imported
    pub(crate) imported: HashSet<PathBuf>,
    /// Directory imports are resolved against
    pub(crate) base_dir: Option<PathBuf>,
    /// Name of the program currently running
    pub(crate) source: String,
}

impl InterpreterContext {
    fn new() -> Self {
        InterpreterContext {
            env: Environment::new(),
            call_stack: CallStack::new(),
            functions: HashMap::new(),
            function_origins: HashMap::new(),
            function_stack: Vec::new(),
            next_call_id: 0,
            recursion_depth: 0,
            typedefs: TypeRegistry::new(),
            screens: ScreenRegistry::new(),
            db: DbState::new(Box::new(NoDbAdapter)),
            pending_meta: None,
            imported: HashSet::new(),
            base_dir: None,
            source: MAIN_SOURCE.to_string(),
        }
    }
}

/// The interpreter
pub struct Interpreter {
    pub(crate) ctx: InterpreterContext,
    pub(crate) config: InterpreterConfig,
    pub(crate) builtins: BuiltinRegistry,
    pub(crate) output: Box<dyn Output>,
}

impl Interpreter {
    /// Create a new interpreter writing to stdout, without database adapter
    pub fn new() -> Self {
        Interpreter {
            ctx: InterpreterContext::new(),
            config: InterpreterConfig::default(),
            builtins: BuiltinRegistry::with_defaults(),
            output: Box::new(StdOutput),
        }
    }

    pub fn with_config(mut self, config: InterpreterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_output(mut self, output: Box<dyn Output>) -> Self {
        self.output = output;
        self
    }

    pub fn with_db_adapter(mut self, adapter: Box<dyn DbAdapter>) -> Self {
        self.ctx.db.adapter = adapter;
        self
    }

    pub fn with_screen_host(mut self, host: Arc<dyn ScreenHost>) -> Self {
        self.ctx.screens.set_host(Some(host));
        self
    }

    /// Directory `import` paths are resolved against
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.ctx.base_dir = Some(dir.into());
        self
    }

    /// Plug in (or replace) a builtin namespace
    pub fn register_module(&mut self, module: Box<dyn BuiltinModule>) {
        self.builtins.register(module);
    }

    pub fn screens(&self) -> &ScreenRegistry {
        &self.ctx.screens
    }

    pub fn screens_mut(&mut self) -> &mut ScreenRegistry {
        &mut self.ctx.screens
    }

    pub fn context(&self) -> &InterpreterContext {
        &self.ctx
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    /// Run a program's top-level statements.
    ///
    /// Functions are hoisted first so calls may precede declarations. A
    /// top-level `return` ends the script with its value.
    pub fn run(&mut self, program: &Program) -> InterpResult<Value> {
        debug!(
            statements = program.statements.len(),
            source = %self.ctx.source,
            "running program"
        );
        self.hoist_functions(program, None)?;
        let source = self.ctx.source.clone();
        let flow = self.with_frame(1, FrameKind::Script, source, |this| {
            this.exec_stmts(&program.statements)
        });
        self.ctx.pending_meta = None;
        match flow? {
            Flow::Return { value, .. } => Ok(value),
            _ => Ok(Value::Null),
        }
    }

    /// Load a serialized program and run it; imports resolve next to it
    pub fn run_file(&mut self, path: &Path) -> InterpResult<Value> {
        let program = load_program(path)?;
        if self.ctx.base_dir.is_none() {
            self.ctx.base_dir = path.parent().map(Path::to_path_buf);
        }
        if let Ok(canonical) = path.canonicalize() {
            self.ctx.imported.insert(canonical);
        }
        self.ctx.source = path.display().to_string();
        self.run(&program)
    }

    /// Current value of a variable (case-insensitive)
    pub fn get_var(&self, name: &str) -> Option<Value> {
        self.ctx
            .env
            .lookup(&fold(name))
            .map(|binding| binding.value.clone())
    }

    /// Call a declared script function with already evaluated arguments
    pub fn call_function(&mut self, name: &str, args: Vec<Value>) -> InterpResult<Value> {
        let lower = fold(name);
        let def = self
            .ctx
            .functions
            .get(&lower)
            .cloned()
            .ok_or_else(|| RuntimeError::unknown(format!("Call cannot find '{name}'")))?;
        let bound = args.into_iter().map(|v| (None, v)).collect();
        self.invoke(&def, bound, 0)
    }

    /// Evaluate a single expression in the current scope
    pub fn eval_expr(&mut self, expr: &Spanned<Expr>) -> InterpResult<Value> {
        self.eval(expr)
    }

    /// Register every top-level function of `program`.
    /// `import_from` names the imported file; redefinitions across programs fail.
    pub(crate) fn hoist_functions(
        &mut self,
        program: &Program,
        import_from: Option<&str>,
    ) -> InterpResult<()> {
        for stmt in &program.statements {
            if let Stmt::Function(def) = &stmt.node {
                self.declare_function(def, import_from)
                    .map_err(|e| e.at_line(stmt.line))?;
            }
        }
        Ok(())
    }

    pub(crate) fn declare_function(
        &mut self,
        def: &FnDef,
        import_from: Option<&str>,
    ) -> InterpResult<()> {
        let name = fold(&def.name);
        let origin = import_from.unwrap_or(&self.ctx.source).to_string();
        if let Some(file) = import_from {
            if let Some(existing) = self.ctx.function_origins.get(&name) {
                if *existing != origin {
                    return Err(RuntimeError::invalid(format!(
                        "Function '{}' is already declared in {existing} and cannot be overwritten by import from {file}",
                        def.name
                    )));
                }
            }
        }
        self.ctx.functions.insert(name.clone(), Arc::new(def.clone()));
        self.ctx.function_origins.insert(name, origin);
        Ok(())
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifiers are case-insensitive; every name is folded on entry
pub(crate) fn fold(name: &str) -> String {
    name.to_ascii_lowercase()
}

/// Runtime value of a literal. Strings in a date layout become dates.
pub fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::Null => Value::Null,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Byte(b) => Value::Byte(*b),
        Literal::Int(n) => Value::Int(*n),
        Literal::Long(n) => Value::Long(*n),
        Literal::Float(x) => Value::Float(*x),
        Literal::Double(x) => Value::Double(*x),
        Literal::Str(s) => looks_like_date(s)
            .then(|| parse_date(s))
            .flatten()
            .unwrap_or_else(|| Value::Str(s.clone())),
    }
}

/// `YYYY-MM-DD` prefix, optionally followed by a time
fn looks_like_date(s: &str) -> bool {
    let b = s.as_bytes();
    (b.len() == 10 || b.len() >= 19)
        && b[..10]
            .iter()
            .enumerate()
            .all(|(i, c)| if i == 4 || i == 7 { *c == b'-' } else { c.is_ascii_digit() })
}

pub(crate) fn load_program(path: &Path) -> InterpResult<Program> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| RuntimeError::io(format!("Cannot read '{}': {e}", path.display())))?;
    Program::from_json(&text)
        .map_err(|e| RuntimeError::io(format!("Invalid program '{}': {e}", path.display())))
}
