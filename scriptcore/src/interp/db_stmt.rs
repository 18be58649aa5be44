//! Database statements and cursor expressions
//!
//! Connections are named and kept for the interpreter's lifetime. A `use`
//! block pushes its connection; cursor declarations and inline selects run
//! against the innermost one.

use tracing::{debug, trace};

use super::{
    fold, Binding, CursorRef, CursorSpec, Flow, FrameKind, InterpResult, Interpreter, RuntimeError,
    Value,
};
use crate::arrays::ArrayDef;
use crate::ast::{Arg, Expr, Spanned, Stmt};
use crate::types::DataType;

impl Interpreter {
    pub(crate) fn exec_connect(&mut self, name: &str, spec: &Spanned<Expr>, line: usize) -> InterpResult<()> {
        let key = fold(name);
        self.with_frame(line, FrameKind::Sql, format!("Connect {key}"), |this| {
            if this.ctx.db.connections.contains_key(&key) {
                return Err(RuntimeError::database(format!("Connection '{key}' already exists.")));
            }
            let spec = this.eval(spec)?;
            let conn = this
                .ctx
                .db
                .adapter
                .connect(&spec)
                .map_err(|e| RuntimeError::database(format!("Connect failed: {e}")))?;
            debug!(connection = %key, "connected");
            this.ctx.db.connections.insert(key, conn);
            Ok(())
        })
    }

    /// `use name { ... }`; the connection stays current for the body only
    pub(crate) fn exec_use(
        &mut self,
        connection: &str,
        body: &[Spanned<Stmt>],
        line: usize,
    ) -> InterpResult<Flow> {
        let key = fold(connection);
        self.with_frame(line, FrameKind::Sql, format!("Use {key}"), |this| {
            if !this.ctx.db.connections.contains_key(&key) {
                return Err(RuntimeError::unknown(format!(
                    "Unknown connection '{key}'. Did you connect first?"
                )));
            }
            this.ctx.db.use_stack.push(key);
            let result = this.with_scope(|this| this.exec_stmts(body));
            this.ctx.db.use_stack.pop();
            result
        })
    }

    pub(crate) fn exec_cursor(&mut self, name: &str, sql: &str) -> InterpResult<()> {
        let Some(connection) = self.ctx.db.current().map(str::to_string) else {
            return Err(RuntimeError::invalid(
                "cursor declaration requires an active 'use <connection> { ... }' block",
            ));
        };
        trace!(cursor = name, %connection, "cursor declared");
        self.ctx.db.cursors.insert(
            fold(name),
            CursorSpec {
                connection,
                sql: sql.to_string(),
            },
        );
        Ok(())
    }

    /// `open name(args)` binds a variable of the cursor's name to an open cursor
    pub(crate) fn exec_open_cursor(&mut self, name: &str, args: &[Arg], line: usize) -> InterpResult<()> {
        let key = fold(name);
        self.with_frame(line, FrameKind::Sql, format!("Open {key}"), |this| {
            let spec = this.ctx.db.cursors.get(&key).cloned().ok_or_else(|| {
                RuntimeError::unknown(format!(
                    "Unknown cursor '{key}'. Did you declare with 'cursor {key} = select ...;'?"
                ))
            })?;
            let mut named = Vec::new();
            let mut positional = Vec::new();
            for arg in args {
                let value = this.eval(&arg.value)?;
                match &arg.name {
                    Some(n) => named.push((fold(n), value)),
                    None => positional.push(value),
                }
            }
            let conn = this.ctx.db.connections.get_mut(&spec.connection).ok_or_else(|| {
                RuntimeError::database(format!("Connection '{}' is not open", spec.connection))
            })?;
            let cursor = conn
                .open_cursor(&spec.sql, &named, &positional)
                .map_err(|e| RuntimeError::database(format!("Open cursor failed: {e}")))?;
            debug!(cursor = %key, connection = %spec.connection, "cursor opened");
            this.ctx
                .env
                .define(key, Binding::new(Value::Cursor(CursorRef::new(cursor))));
            Ok(())
        })
    }

    pub(crate) fn exec_close_cursor(&mut self, name: &str, line: usize) -> InterpResult<()> {
        let key = fold(name);
        self.with_frame(line, FrameKind::Sql, format!("Close {key}"), |this| {
            match this.ctx.env.lookup(&key).map(|b| b.value.clone()) {
                Some(Value::Cursor(cursor)) => {
                    cursor
                        .0
                        .lock()
                        .close()
                        .map_err(|e| RuntimeError::database(format!("Close cursor failed: {e}")))?;
                    this.ctx.env.assign(&key, Value::Null)
                }
                Some(Value::Null) => Ok(()),
                _ => Err(RuntimeError::unknown(format!("Unknown cursor '{key}'"))),
            }
        })
    }

    pub(crate) fn exec_close_connection(&mut self, name: &str, line: usize) -> InterpResult<()> {
        let key = fold(name);
        self.with_frame(line, FrameKind::Sql, format!("Close connection {key}"), |this| {
            let mut conn = this
                .ctx
                .db
                .connections
                .remove(&key)
                .ok_or_else(|| RuntimeError::unknown(format!("Unknown connection '{key}'")))?;
            this.ctx.db.cursors.retain(|_, spec| spec.connection != key);
            debug!(connection = %key, "connection closed");
            conn.close()
                .map_err(|e| RuntimeError::database(format!("Close connection failed: {e}")))
        })
    }

    pub(crate) fn cursor_has_next(&mut self, target: &Spanned<Expr>, line: usize) -> InterpResult<Value> {
        let Value::Cursor(cursor) = self.eval(target)? else {
            return Err(RuntimeError::type_mismatch("hasNext() target is not a cursor"));
        };
        self.with_frame(line, FrameKind::Sql, "HasNext", |_| {
            let more = cursor
                .0
                .lock()
                .has_next()
                .map_err(|e| RuntimeError::database(format!("hasNext() failed: {e}")))?;
            Ok(Value::Bool(more))
        })
    }

    pub(crate) fn cursor_next(&mut self, target: &Spanned<Expr>, line: usize) -> InterpResult<Value> {
        let Value::Cursor(cursor) = self.eval(target)? else {
            return Err(RuntimeError::type_mismatch("next() target is not a cursor"));
        };
        self.with_frame(line, FrameKind::Sql, "Next", |_| {
            let row = cursor
                .0
                .lock()
                .next()
                .map_err(|e| RuntimeError::database(format!("next() failed: {e}")))?;
            Ok(Value::map(row))
        })
    }

    /// Inline `select` on the current connection; rows come back as an array of records
    pub(crate) fn eval_select(&mut self, sql: &str, line: usize) -> InterpResult<Value> {
        self.with_frame(line, FrameKind::Sql, "Select", |this| {
            let Some(connection) = this.ctx.db.current().map(str::to_string) else {
                return Err(RuntimeError::invalid(
                    "SELECT requires an active 'use <connection> { ... }' block",
                ));
            };
            let conn = this.ctx.db.connections.get_mut(&connection).ok_or_else(|| {
                RuntimeError::database(format!("Connection '{connection}' is not open"))
            })?;
            let rows = conn
                .execute_select(sql, &[], &[])
                .map_err(|e| RuntimeError::database(format!("SELECT failed: {e}")))?;
            debug!(%connection, rows = rows.len(), "select");
            let rows = rows.into_iter().map(Value::map).collect();
            Ok(Value::array(ArrayDef::from_values(DataType::Record, rows)))
        })
    }
}
