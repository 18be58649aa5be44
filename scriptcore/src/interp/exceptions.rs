//! `try` / `when` handlers and `raise`

use tracing::debug;

use super::{fold, Binding, FrameKind, Flow, InterpResult, Interpreter, RuntimeError, Value};
use crate::ast::{Expr, Handler, Raised, Spanned, Stmt};

impl Interpreter {
    /// Run `body`; the first handler matching an error runs in a fresh scope
    /// with its variable bound to the error message. Unmatched errors
    /// propagate unchanged. Control flow never reaches the handlers.
    pub(crate) fn exec_try(
        &mut self,
        body: &[Spanned<Stmt>],
        handlers: &[Handler],
        line: usize,
    ) -> InterpResult<Flow> {
        let err = match self.with_frame(line, FrameKind::Try, "Try", |this| {
            this.with_scope(|this| this.exec_stmts(body))
        }) {
            Ok(flow) => return Ok(flow),
            Err(err) => err,
        };
        let Some(handler) = handlers.iter().find(|h| err.matches(&h.matches)) else {
            debug!(error = %err.message, "no handler matched");
            return Err(err);
        };
        debug!(handler = %handler.matches, error = %err.message, "exception handled");
        self.with_frame(line, FrameKind::Try, format!("When {}", handler.matches), |this| {
            this.with_scope(|this| {
                if let Some(var) = &handler.var {
                    this.ctx
                        .env
                        .define(fold(var), Binding::new(Value::Str(err.message.clone())));
                }
                this.exec_stmts(&handler.body)
            })
        })
    }

    /// `raise NAME(args)`. Custom exceptions render `Name: a, b`; standard
    /// ones take their first argument as the message.
    pub(crate) fn exec_raise(&mut self, exception: &Raised, args: &[Spanned<Expr>]) -> InterpResult<()> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval(arg)?);
        }
        let message = match exception {
            Raised::Custom(name) if values.is_empty() => name.clone(),
            Raised::Custom(name) => {
                let rendered: Vec<String> = values.iter().map(ToString::to_string).collect();
                format!("{name}: {}", rendered.join(", "))
            }
            Raised::Standard(kind) => match values.first() {
                Some(v) => v.to_string(),
                None => format!("{kind} raised with no message"),
            },
        };
        debug!(exception = %exception, %message, "raise");
        Err(RuntimeError::raised(exception.clone(), message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::*;
    use crate::ast::BinOp;
    use crate::interp::{CaptureOutput, ErrorKind};
    use crate::types::ErrorType;

    fn run(stmts: Vec<Spanned<Stmt>>) -> InterpResult<Vec<String>> {
        let out = CaptureOutput::new();
        let mut interp = Interpreter::new().with_output(Box::new(out.clone()));
        interp.run(&program(stmts))?;
        Ok(out.lines())
    }

    #[test]
    fn test_math_error_caught() {
        let lines = run(vec![try_(
            vec![print(binary(int(1), BinOp::Div, int(0)))],
            vec![when(
                Raised::Standard(ErrorType::MathError),
                Some("e"),
                vec![print(binary(string("caught: "), BinOp::Add, var("e")))],
            )],
        )])
        .unwrap();
        assert_eq!(lines, vec!["caught: Division by zero"]);
    }

    #[test]
    fn test_first_matching_handler_wins() {
        let lines = run(vec![try_(
            vec![raise(Raised::Standard(ErrorType::IoError), vec![string("disk")])],
            vec![
                when(Raised::Standard(ErrorType::DbError), None, vec![print(string("db"))]),
                when(Raised::Standard(ErrorType::AnyError), Some("m"), vec![print(var("m"))]),
                when(Raised::Standard(ErrorType::IoError), None, vec![print(string("io"))]),
            ],
        )])
        .unwrap();
        assert_eq!(lines, vec!["disk"]);
    }

    #[test]
    fn test_custom_exception_message() {
        let lines = run(vec![try_(
            vec![raise(Raised::Custom("Overdrawn".into()), vec![string("acct"), int(5)])],
            vec![when(Raised::Custom("OVERDRAWN".into()), Some("e"), vec![print(var("e"))])],
        )])
        .unwrap();
        assert_eq!(lines, vec!["Overdrawn: acct, 5"]);
    }

    #[test]
    fn test_unmatched_error_propagates_unchanged() {
        let err = run(vec![try_(
            vec![raise(Raised::Standard(ErrorType::NullError), vec![])],
            vec![when(Raised::Standard(ErrorType::IndexError), None, vec![])],
        )])
        .unwrap_err();
        assert_eq!(err.message, "NULL_ERROR raised with no message");
        assert_eq!(err.kind, ErrorKind::ScriptRaised(Raised::Standard(ErrorType::NullError)));
        assert_eq!(err.stack[0].to_string(), "line 1 STATEMENT : Raise NULL_ERROR");
    }

    #[test]
    fn test_break_passes_through_try() {
        let lines = run(vec![
            while_(
                boolean(true),
                vec![try_(
                    vec![break_()],
                    vec![when(Raised::Standard(ErrorType::AnyError), None, vec![print(string("no"))])],
                )],
            ),
            print(string("after")),
        ])
        .unwrap();
        assert_eq!(lines, vec!["after"]);
    }

    #[test]
    fn test_continue_passes_through_try() {
        let lines = run(vec![for_(
            Some(let_("i", int(0))),
            Some(binary(var("i"), BinOp::Lt, int(3))),
            Some(set("i", binary(var("i"), BinOp::Add, int(1)))),
            vec![try_(
                vec![
                    if_(binary(var("i"), BinOp::Eq, int(1)), vec![continue_()], None),
                    print(var("i")),
                ],
                vec![when(Raised::Standard(ErrorType::AnyError), None, vec![print(string("handler"))])],
            )],
        )])
        .unwrap();
        assert_eq!(lines, vec!["0", "2"]);
    }

    #[test]
    fn test_handler_scope_is_popped() {
        let mut interp = Interpreter::new().with_output(Box::new(CaptureOutput::new()));
        interp
            .run(&program(vec![try_(
                vec![raise(Raised::Custom("X".into()), vec![])],
                vec![when(Raised::Custom("x".into()), Some("err"), vec![])],
            )]))
            .unwrap();
        assert_eq!(interp.get_var("err"), None);
        assert_eq!(interp.ctx.env.depth(), 1);
    }
}
