//! Diagnostic call stack
//!
//! Frames are pushed and popped in lock-step with statement, block and
//! builtin evaluation. They only feed error messages and introspection;
//! variable scoping lives in [`super::env`].

use std::fmt;

use super::{InterpResult, Interpreter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Script,
    Statement,
    Expression,
    Condition,
    Block,
    Loop,
    Try,
    Builtin,
    Sql,
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FrameKind::Script => "SCRIPT",
            FrameKind::Statement => "STATEMENT",
            FrameKind::Expression => "EXPRESSION",
            FrameKind::Condition => "CONDITION",
            FrameKind::Block => "BLOCK",
            FrameKind::Loop => "LOOP",
            FrameKind::Try => "TRY",
            FrameKind::Builtin => "BUILTIN",
            FrameKind::Sql => "SQL",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StackFrame {
    pub line: usize,
    pub kind: FrameKind,
    pub description: String,
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {} {} : {}", self.line, self.kind, self.description)
    }
}

#[derive(Debug, Default)]
pub struct CallStack {
    frames: Vec<StackFrame>,
}

impl CallStack {
    pub fn new() -> Self {
        CallStack::default()
    }

    pub fn push(&mut self, line: usize, kind: FrameKind, description: impl Into<String>) {
        self.frames.push(StackFrame {
            line,
            kind,
            description: description.into(),
        });
    }

    pub fn pop(&mut self) -> Option<StackFrame> {
        self.frames.pop()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Innermost frame first
    pub fn snapshot(&self) -> Vec<StackFrame> {
        self.frames.iter().rev().cloned().collect()
    }

    /// Line of the innermost frame
    pub fn current_line(&self) -> Option<usize> {
        self.frames.last().map(|f| f.line)
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

impl Interpreter {
    /// Run `body` inside a diagnostic frame. The frame is popped on every
    /// exit path; errors leaving it get the frame's line and a stack snapshot
    /// unless an inner frame already attached them.
    pub(crate) fn with_frame<T>(
        &mut self,
        line: usize,
        kind: FrameKind,
        description: impl Into<String>,
        body: impl FnOnce(&mut Self) -> InterpResult<T>,
    ) -> InterpResult<T> {
        self.ctx.call_stack.push(line, kind, description);
        let result = body(self).map_err(|mut e| {
            if e.line.is_none() {
                e.line = Some(line);
            }
            if e.stack.is_empty() {
                e.stack = self.ctx.call_stack.snapshot();
            }
            e
        });
        self.ctx.call_stack.pop();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_rendering() {
        let mut stack = CallStack::new();
        stack.push(3, FrameKind::Statement, "var x");
        stack.push(4, FrameKind::Builtin, "str.trim");
        let snap = stack.snapshot();
        assert_eq!(snap[0].to_string(), "line 4 BUILTIN : str.trim");
        assert_eq!(snap[1].to_string(), "line 3 STATEMENT : var x");
        assert_eq!(stack.current_line(), Some(4));
    }

    #[test]
    fn test_push_pop_is_lifo() {
        let mut stack = CallStack::new();
        stack.push(1, FrameKind::Block, "a");
        stack.push(2, FrameKind::Loop, "b");
        assert_eq!(stack.pop().map(|f| f.kind), Some(FrameKind::Loop));
        assert_eq!(stack.depth(), 1);
    }
}
