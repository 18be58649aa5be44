//! Statement execution
//!
//! Every statement yields a [`Flow`]; `break`, `continue` and `return`
//! travel through `Ok`, errors through `Err`. Loops consume `Break` and
//! `Continue`, function calls consume the `Return` they own.

use tracing::{debug, trace};

use super::{
    fold, Binding, FrameKind, Flow, InterpResult, Interpreter, MapData, Resolved, ResolvedType,
    RuntimeError, Value, STACK_GROW_SIZE, STACK_RED_ZONE,
};
use super::flow::LoopStep;
use crate::ast::{Expr, Spanned, Stmt, TypeRef};
use crate::types::DataType;

/// Iteration cap shared by the loop forms; a limit of 0 disables it
struct LoopGuard {
    limit: u64,
    count: u64,
}

impl LoopGuard {
    fn new(limit: u64) -> Self {
        LoopGuard { limit, count: 0 }
    }

    fn tick(&mut self) -> InterpResult<()> {
        self.count += 1;
        if self.limit != 0 && self.count > self.limit {
            return Err(RuntimeError::invalid("Infinite loop detected!"));
        }
        Ok(())
    }
}

impl Interpreter {
    /// Run statements in order until one leaves the sequence
    pub(crate) fn exec_stmts(&mut self, stmts: &[Spanned<Stmt>]) -> InterpResult<Flow> {
        for stmt in stmts {
            let flow = self.exec(stmt)?;
            if !flow.is_next() {
                return Ok(flow);
            }
        }
        Ok(Flow::Next)
    }

    pub(crate) fn exec(&mut self, stmt: &Spanned<Stmt>) -> InterpResult<Flow> {
        let result = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.exec_inner(stmt));
        // a cast's layout only reaches the statement that produced it
        self.ctx.pending_meta = None;
        result
    }

    fn exec_inner(&mut self, stmt: &Spanned<Stmt>) -> InterpResult<Flow> {
        let line = stmt.line;
        trace!(line, "exec");
        let flow = match &stmt.node {
            Stmt::Var {
                name,
                ty,
                init,
                is_const,
            } => {
                let desc = if *is_const { "Const" } else { "Var" };
                self.with_frame(line, FrameKind::Statement, format!("{desc} {name}"), |this| {
                    this.exec_var(name, ty.as_ref(), init.as_ref(), *is_const)
                })?;
                Flow::Next
            }
            Stmt::Assign { target, value } => {
                self.with_frame(line, FrameKind::Statement, "Assign", |this| {
                    this.exec_assign(target, value)
                })?;
                Flow::Next
            }
            Stmt::Expr(expr) => {
                self.with_frame(line, FrameKind::Expression, "Expression", |this| {
                    this.eval(expr)
                })?;
                Flow::Next
            }
            Stmt::Print(expr) => {
                let value = self.with_frame(line, FrameKind::Statement, "Print", |this| {
                    this.eval(expr)
                })?;
                self.output.write_line(&value.to_string());
                Flow::Next
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                if self.condition(cond, "\"If\" condition expression")? {
                    self.exec(then_branch)?
                } else if let Some(else_branch) = else_branch {
                    self.exec(else_branch)?
                } else {
                    Flow::Next
                }
            }
            Stmt::While { cond, body } => {
                self.with_frame(line, FrameKind::Loop, "While", |this| this.exec_while(cond, body))?
            }
            Stmt::DoWhile { body, cond } => self.with_frame(line, FrameKind::Loop, "Do", |this| {
                this.exec_do_while(body, cond)
            })?,
            Stmt::For {
                init,
                cond,
                step,
                body,
            } => self.with_frame(line, FrameKind::Loop, "For", |this| {
                this.with_scope(|this| {
                    this.exec_for(init.as_deref(), cond.as_ref(), step.as_deref(), body)
                })
            })?,
            Stmt::ForEach {
                var,
                iterable,
                body,
            } => self.with_frame(line, FrameKind::Loop, format!("Foreach {var}"), |this| {
                this.exec_foreach(var, iterable, body)
            })?,
            Stmt::Break => Flow::Break,
            Stmt::Continue => Flow::Continue,
            Stmt::Return(expr) => {
                let value = match expr {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Null,
                };
                Flow::Return {
                    value,
                    owner: self.ctx.function_stack.last().copied(),
                }
            }
            Stmt::Block(stmts) => self.with_frame(line, FrameKind::Block, "Block", |this| {
                this.with_scope(|this| this.exec_stmts(stmts))
            })?,
            Stmt::Function(def) => {
                self.declare_function(def, None).map_err(|e| e.at_line(line))?;
                Flow::Next
            }
            Stmt::Try { body, handlers } => self.exec_try(body, handlers, line)?,
            Stmt::Raise { exception, args } => {
                self.with_frame(line, FrameKind::Statement, format!("Raise {exception}"), |this| {
                    this.exec_raise(exception, args)
                })?;
                Flow::Next
            }
            Stmt::Typedef { name, ty } => {
                let resolved = self.ctx.typedefs.resolve(ty).map_err(|e| e.at_line(line))?;
                debug!(typedef = %name, "type alias defined");
                self.ctx.typedefs.define(name, resolved.ty);
                Flow::Next
            }
            Stmt::Import(path) => {
                self.exec_import(path, line)?;
                Flow::Next
            }
            Stmt::Connect { name, spec } => {
                self.exec_connect(name, spec, line)?;
                Flow::Next
            }
            Stmt::Use { connection, body } => self.exec_use(connection, body, line)?,
            Stmt::Cursor { name, sql } => {
                self.exec_cursor(name, sql).map_err(|e| e.at_line(line))?;
                Flow::Next
            }
            Stmt::OpenCursor { name, args } => {
                self.exec_open_cursor(name, args, line)?;
                Flow::Next
            }
            Stmt::CloseCursor(name) => {
                self.exec_close_cursor(name, line)?;
                Flow::Next
            }
            Stmt::CloseConnection(name) => {
                self.exec_close_connection(name, line)?;
                Flow::Next
            }
        };
        Ok(flow)
    }

    /// Evaluate a condition that must produce a boolean
    fn condition(&mut self, cond: &Spanned<Expr>, what: &str) -> InterpResult<bool> {
        self.with_frame(cond.line, FrameKind::Condition, "Condition", |this| {
            match this.eval(cond)? {
                Value::Bool(b) => Ok(b),
                other => Err(RuntimeError::type_mismatch(format!(
                    "{what} must be boolean, but is = {other}"
                ))),
            }
        })
    }

    fn loop_condition(&mut self, cond: &Spanned<Expr>) -> InterpResult<bool> {
        self.condition(cond, "Loop condition")
    }

    /// Loop bodies run in their own scope per iteration
    fn loop_body(&mut self, body: &Spanned<Stmt>) -> InterpResult<LoopStep> {
        let flow = self.with_scope(|this| this.exec(body))?;
        Ok(LoopStep::from_body(flow))
    }

    fn exec_while(&mut self, cond: &Spanned<Expr>, body: &Spanned<Stmt>) -> InterpResult<Flow> {
        let mut guard = LoopGuard::new(self.config.max_loop_iterations);
        while self.loop_condition(cond)? {
            guard.tick()?;
            if let LoopStep::Exit(flow) = self.loop_body(body)? {
                return Ok(flow);
            }
        }
        Ok(Flow::Next)
    }

    fn exec_do_while(&mut self, body: &Spanned<Stmt>, cond: &Spanned<Expr>) -> InterpResult<Flow> {
        let mut guard = LoopGuard::new(self.config.max_loop_iterations);
        loop {
            guard.tick()?;
            if let LoopStep::Exit(flow) = self.loop_body(body)? {
                return Ok(flow);
            }
            if !self.loop_condition(cond)? {
                return Ok(Flow::Next);
            }
        }
    }

    /// Runs inside the scope holding the init variable
    fn exec_for(
        &mut self,
        init: Option<&Spanned<Stmt>>,
        cond: Option<&Spanned<Expr>>,
        step: Option<&Spanned<Stmt>>,
        body: &Spanned<Stmt>,
    ) -> InterpResult<Flow> {
        if let Some(init) = init {
            self.exec(init)?;
        }
        let mut guard = LoopGuard::new(self.config.max_loop_iterations);
        loop {
            if let Some(cond) = cond {
                if !self.loop_condition(cond)? {
                    return Ok(Flow::Next);
                }
            }
            guard.tick()?;
            if let LoopStep::Exit(flow) = self.loop_body(body)? {
                return Ok(flow);
            }
            if let Some(step) = step {
                self.exec(step)?;
            }
        }
    }

    fn exec_foreach(
        &mut self,
        var: &str,
        iterable: &Spanned<Expr>,
        body: &Spanned<Stmt>,
    ) -> InterpResult<Flow> {
        let items: Vec<Value> = match self.eval(iterable)? {
            Value::Null => return Err(RuntimeError::null_access("foreach target is null")),
            Value::Array(a) => a.read().to_vec(),
            Value::Queue(q) => q.read().to_vec(),
            Value::Map(m) => m.read().keys().map(|k| Value::Str(k.clone())).collect(),
            other => {
                return Err(RuntimeError::type_mismatch(format!(
                    "Value is not iterable: {other}"
                )))
            }
        };
        let name = fold(var);
        let mut guard = LoopGuard::new(self.config.max_loop_iterations);
        for item in items {
            guard.tick()?;
            let step = self.with_scope(|this| {
                this.ctx.env.define(name.clone(), Binding::new(item));
                this.exec(body)
            })?;
            if let LoopStep::Exit(flow) = LoopStep::from_body(step) {
                return Ok(flow);
            }
        }
        Ok(Flow::Next)
    }

    /// `var` / `const` declaration. A declared type converts the initial
    /// value; otherwise a pending cast layout attaches to the binding.
    fn exec_var(
        &mut self,
        name: &str,
        ty: Option<&TypeRef>,
        init: Option<&Spanned<Expr>>,
        is_const: bool,
    ) -> InterpResult<()> {
        let lower = fold(name);
        let value = match init {
            Some(expr) => self.eval(expr)?,
            None => Value::Null,
        };
        let pending = self.ctx.pending_meta.take();
        let (value, meta) = match ty {
            Some(ty) => {
                let resolved = self.ctx.typedefs.resolve(ty)?;
                let value = declared_value(&lower, &resolved, value)?;
                (value, resolved.meta().or(pending))
            }
            None => (value, pending),
        };
        debug!(var = %lower, is_const, value = %value, "define");
        self.ctx.env.define(
            lower,
            Binding {
                value,
                is_const,
                meta,
            },
        );
        Ok(())
    }

    fn exec_assign(&mut self, target: &Spanned<Expr>, value: &Spanned<Expr>) -> InterpResult<()> {
        match &target.node {
            Expr::Var(name) => self.assign_name(name, value),
            Expr::Property { object, name } => match property_path(target) {
                Some(path) => self.assign_name(&path, value),
                None => {
                    let v = self.eval(value)?;
                    self.assign_property_of(object, name, v)
                }
            },
            Expr::Index { target, indices } => self.assign_index(target, indices, value),
            _ => Err(RuntimeError::invalid("Invalid assignment target.")),
        }
    }
}

/// `a.b.c` for a property chain rooted at a variable
pub(crate) fn property_path(expr: &Spanned<Expr>) -> Option<String> {
    match &expr.node {
        Expr::Var(name) => Some(name.clone()),
        Expr::Property { object, name } => property_path(object).map(|p| format!("{p}.{name}")),
        _ => None,
    }
}

/// Value stored by a typed declaration
pub(crate) fn declared_value(name: &str, resolved: &Resolved, value: Value) -> InterpResult<Value> {
    let mismatch = |dt: DataType| {
        RuntimeError::type_mismatch(format!(
            "Type mismatch: expected {dt} for variable '{name}'"
        ))
    };
    match &resolved.ty {
        ResolvedType::Record(rt) => {
            if value.is_null() {
                return Ok(value);
            }
            let converted = rt.convert_value(&value).map_err(|e| {
                RuntimeError::structural(format!(
                    "Record type mismatch for variable '{name}': {e}"
                ))
            })?;
            rt.validate_value(&converted).map_err(|e| {
                RuntimeError::structural(format!(
                    "Record type mismatch for variable '{name}': {e}"
                ))
            })?;
            Ok(converted)
        }
        ResolvedType::Bitmap(_) => Ok(DataType::Bitmap.convert(value)?),
        ResolvedType::Intmap(_) => Ok(DataType::Intmap.convert(value)?),
        ResolvedType::SortedMap => {
            let value = match value {
                Value::Null => return Ok(Value::map(MapData::sorted())),
                other => DataType::Map.convert(other)?,
            };
            match value {
                Value::Map(m) => {
                    let mut sorted = MapData::sorted();
                    for (k, v) in m.read().iter() {
                        sorted.insert(k.clone(), v.clone());
                    }
                    Ok(Value::map(sorted))
                }
                _ => Err(mismatch(DataType::Map)),
            }
        }
        ResolvedType::Simple(DataType::Map | DataType::Record) if value.is_null() => {
            Ok(Value::map(MapData::new()))
        }
        ResolvedType::Array(elem) => {
            let value = DataType::Array.convert(value)?;
            match value {
                Value::Null => Ok(value),
                Value::Array(a) => super::arrays::retype_array(name, a, elem),
                _ => Err(mismatch(DataType::Array)),
            }
        }
        other => {
            let dt = other.data_type();
            let converted = dt.convert(value)?;
            if dt.is_data_type(&converted) {
                Ok(converted)
            } else {
                Err(mismatch(dt))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::*;
    use crate::ast::BinOp;
    use crate::config::InterpreterConfig;
    use crate::interp::{CaptureOutput, ErrorKind};

    fn run(stmts: Vec<Spanned<Stmt>>) -> (Interpreter, CaptureOutput) {
        let out = CaptureOutput::new();
        let mut interp = Interpreter::new().with_output(Box::new(out.clone()));
        interp.run(&program(stmts)).unwrap();
        (interp, out)
    }

    fn run_err(stmts: Vec<Spanned<Stmt>>) -> RuntimeError {
        Interpreter::new().run(&program(stmts)).unwrap_err()
    }

    // ====================================================================
    // Declarations
    // ====================================================================

    #[test]
    fn test_typed_var_converts() {
        let (interp, _) = run(vec![
            var_decl("a", Some(ty(DataType::Long)), Some(int(3))),
            var_decl("s", Some(ty(DataType::String)), Some(boolean(true))),
            var_decl("m", Some(ty(DataType::Map)), None),
        ]);
        assert_eq!(interp.get_var("A"), Some(Value::Long(3)));
        assert_eq!(interp.get_var("s"), Some(Value::from("Y")));
        assert!(matches!(interp.get_var("m"), Some(Value::Map(_))));
    }

    #[test]
    fn test_typed_var_mismatch() {
        let err = run_err(vec![var_decl("n", Some(ty(DataType::Int)), Some(string("abc")))]);
        assert_eq!(err.kind, ErrorKind::ConversionFailure);
        assert_eq!(err.line, Some(1));
    }

    #[test]
    fn test_const_cannot_be_reassigned() {
        let err = run_err(vec![const_decl("k", int(1)), set("k", int(2))]);
        assert_eq!(err.message, "Cannot reassign constant variable 'k'.");
        assert_eq!(err.stack[0].to_string(), "line 1 STATEMENT : Assign");
    }

    // ====================================================================
    // Control flow
    // ====================================================================

    #[test]
    fn test_if_requires_boolean() {
        let err = run_err(vec![if_(int(1), vec![print(int(1))], None)]);
        assert_eq!(err.message, "\"If\" condition expression must be boolean, but is = 1");
    }

    #[test]
    fn test_while_with_break_and_continue() {
        let (_, out) = run(vec![
            let_("i", int(0)),
            while_(
                boolean(true),
                vec![
                    set("i", binary(var("i"), BinOp::Add, int(1))),
                    if_(binary(var("i"), BinOp::Eq, int(2)), vec![continue_()], None),
                    if_(binary(var("i"), BinOp::Gt, int(3)), vec![break_()], None),
                    print(var("i")),
                ],
            ),
        ]);
        assert_eq!(out.lines(), vec!["1", "3"]);
    }

    #[test]
    fn test_for_step_runs_after_continue() {
        let (interp, out) = run(vec![
            for_(
                Some(let_("i", int(0))),
                Some(binary(var("i"), BinOp::Lt, int(3))),
                Some(set("i", binary(var("i"), BinOp::Add, int(1)))),
                vec![continue_()],
            ),
            print(int(9)),
        ]);
        assert_eq!(out.lines(), vec!["9"]);
        // loop variable is scoped to the loop
        assert_eq!(interp.get_var("i"), None);
    }

    #[test]
    fn test_do_while_runs_once() {
        let (_, out) = run(vec![do_while(vec![print(string("x"))], boolean(false))]);
        assert_eq!(out.lines(), vec!["x"]);
    }

    #[test]
    fn test_loop_cap() {
        let config = InterpreterConfig {
            max_loop_iterations: 5,
            ..InterpreterConfig::default()
        };
        let mut interp = Interpreter::new()
            .with_config(config)
            .with_output(Box::new(CaptureOutput::new()));
        let err = interp
            .run(&program(vec![while_(boolean(true), vec![])]))
            .unwrap_err();
        assert_eq!(err.message, "Infinite loop detected!");
        assert_eq!(err.stack.last().map(|f| f.kind), Some(FrameKind::Script));
    }

    #[test]
    fn test_foreach_targets() {
        let (_, out) = run(vec![
            foreach("x", array(vec![int(1), int(2)]), vec![print(var("x"))]),
            foreach("k", map(vec![("b", int(1)), ("a", int(2))]), vec![print(var("k"))]),
        ]);
        assert_eq!(out.lines(), vec!["1", "2", "b", "a"]);

        let err = run_err(vec![foreach("x", null(), vec![])]);
        assert_eq!(err.message, "foreach target is null");
        let err = run_err(vec![foreach("x", int(3), vec![])]);
        assert_eq!(err.message, "Value is not iterable: 3");
    }

    #[test]
    fn test_block_scope() {
        let (interp, _) = run(vec![
            let_("x", int(1)),
            block(vec![let_("y", int(2)), set("x", int(5))]),
        ]);
        assert_eq!(interp.get_var("x"), Some(Value::Int(5)));
        assert_eq!(interp.get_var("y"), None);
    }

    #[test]
    fn test_top_level_return_ends_script() {
        let mut interp = Interpreter::new().with_output(Box::new(CaptureOutput::new()));
        let value = interp
            .run(&program(vec![ret(Some(int(7))), print(int(1))]))
            .unwrap();
        assert_eq!(value, Value::Int(7));
    }
}
