//! Constructors for building trees by hand (hosts without a parser, tests)
//!
//! Every node built here is placed on line 1 unless wrapped with [`at`].

use super::*;
use crate::types::DataType;

pub fn at<T>(line: usize, node: Spanned<T>) -> Spanned<T> {
    Spanned::new(node.node, line)
}

fn sp<T>(node: T) -> Spanned<T> {
    Spanned::new(node, 1)
}

// ---- expressions ----

pub fn null() -> Spanned<Expr> {
    sp(Expr::Literal(Literal::Null))
}

pub fn int(n: i32) -> Spanned<Expr> {
    sp(Expr::Literal(Literal::Int(n)))
}

pub fn long(n: i64) -> Spanned<Expr> {
    sp(Expr::Literal(Literal::Long(n)))
}

pub fn float(n: f32) -> Spanned<Expr> {
    sp(Expr::Literal(Literal::Float(n)))
}

pub fn double(n: f64) -> Spanned<Expr> {
    sp(Expr::Literal(Literal::Double(n)))
}

pub fn boolean(b: bool) -> Spanned<Expr> {
    sp(Expr::Literal(Literal::Bool(b)))
}

pub fn string(s: &str) -> Spanned<Expr> {
    sp(Expr::Literal(Literal::Str(s.to_string())))
}

pub fn var(name: &str) -> Spanned<Expr> {
    sp(Expr::Var(name.to_string()))
}

pub fn binary(left: Spanned<Expr>, op: BinOp, right: Spanned<Expr>) -> Spanned<Expr> {
    sp(Expr::Binary {
        left: Box::new(left),
        op,
        right: Box::new(right),
    })
}

pub fn unary(op: UnOp, expr: Spanned<Expr>) -> Spanned<Expr> {
    sp(Expr::Unary {
        op,
        expr: Box::new(expr),
    })
}

pub fn type_of(expr: Spanned<Expr>) -> Spanned<Expr> {
    sp(Expr::TypeOf(Box::new(expr)))
}

pub fn chain(operands: Vec<Spanned<Expr>>, ops: Vec<BinOp>) -> Spanned<Expr> {
    sp(Expr::Chain { operands, ops })
}

pub fn call(name: &str, args: Vec<Spanned<Expr>>) -> Spanned<Expr> {
    sp(Expr::Call {
        name: name.to_string(),
        args: args.into_iter().map(Arg::positional).collect(),
    })
}

pub fn call_with(name: &str, args: Vec<Arg>) -> Spanned<Expr> {
    sp(Expr::Call {
        name: name.to_string(),
        args,
    })
}

pub fn index(target: Spanned<Expr>, indices: Vec<Spanned<Expr>>) -> Spanned<Expr> {
    sp(Expr::Index {
        target: Box::new(target),
        indices,
    })
}

pub fn prop(object: Spanned<Expr>, name: &str) -> Spanned<Expr> {
    sp(Expr::Property {
        object: Box::new(object),
        name: name.to_string(),
    })
}

pub fn array(elements: Vec<Spanned<Expr>>) -> Spanned<Expr> {
    sp(Expr::ArrayLiteral(elements))
}

pub fn array_init(elem: TypeRef, dims: Vec<Option<Spanned<Expr>>>) -> Spanned<Expr> {
    sp(Expr::ArrayInit {
        elem,
        dims,
        init: None,
    })
}

pub fn array_init_with(
    elem: TypeRef,
    dims: Vec<Option<Spanned<Expr>>>,
    init: Vec<Spanned<Expr>>,
) -> Spanned<Expr> {
    sp(Expr::ArrayInit {
        elem,
        dims,
        init: Some(init),
    })
}

pub fn queue(elem: TypeRef) -> Spanned<Expr> {
    sp(Expr::QueueInit { elem })
}

pub fn map(entries: Vec<(&str, Spanned<Expr>)>) -> Spanned<Expr> {
    sp(Expr::MapLiteral(
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
    ))
}

pub fn cast(target: TypeRef, value: Spanned<Expr>) -> Spanned<Expr> {
    sp(Expr::Cast {
        target,
        value: Box::new(value),
    })
}

pub fn length(expr: Spanned<Expr>) -> Spanned<Expr> {
    sp(Expr::Length(Box::new(expr)))
}

pub fn has_next(cursor: Spanned<Expr>) -> Spanned<Expr> {
    sp(Expr::CursorHasNext(Box::new(cursor)))
}

pub fn next(cursor: Spanned<Expr>) -> Spanned<Expr> {
    sp(Expr::CursorNext(Box::new(cursor)))
}

pub fn select(sql: &str) -> Spanned<Expr> {
    sp(Expr::Select {
        sql: sql.to_string(),
    })
}

// ---- types ----

pub fn ty(dt: DataType) -> TypeRef {
    TypeRef::Simple(dt)
}

pub fn record_ty(fields: Vec<(&str, TypeRef)>) -> TypeRef {
    TypeRef::Record(
        fields
            .into_iter()
            .map(|(name, ty)| FieldDecl::new(name, ty))
            .collect(),
    )
}

pub fn bits(fields: Vec<(&str, u8, u8)>) -> Vec<BitFieldDecl> {
    fields
        .into_iter()
        .map(|(name, start, end)| BitFieldDecl {
            name: name.to_string(),
            start,
            end,
        })
        .collect()
}

// ---- statements ----

pub fn var_decl(name: &str, ty: Option<TypeRef>, init: Option<Spanned<Expr>>) -> Spanned<Stmt> {
    sp(Stmt::Var {
        name: name.to_string(),
        ty,
        init,
        is_const: false,
    })
}

pub fn let_(name: &str, init: Spanned<Expr>) -> Spanned<Stmt> {
    var_decl(name, None, Some(init))
}

pub fn const_decl(name: &str, init: Spanned<Expr>) -> Spanned<Stmt> {
    sp(Stmt::Var {
        name: name.to_string(),
        ty: None,
        init: Some(init),
        is_const: true,
    })
}

pub fn assign(target: Spanned<Expr>, value: Spanned<Expr>) -> Spanned<Stmt> {
    sp(Stmt::Assign { target, value })
}

pub fn set(name: &str, value: Spanned<Expr>) -> Spanned<Stmt> {
    assign(var(name), value)
}

pub fn expr_stmt(expr: Spanned<Expr>) -> Spanned<Stmt> {
    sp(Stmt::Expr(expr))
}

pub fn print(expr: Spanned<Expr>) -> Spanned<Stmt> {
    sp(Stmt::Print(expr))
}

pub fn block(stmts: Vec<Spanned<Stmt>>) -> Spanned<Stmt> {
    sp(Stmt::Block(stmts))
}

pub fn if_(cond: Spanned<Expr>, then: Vec<Spanned<Stmt>>, otherwise: Option<Vec<Spanned<Stmt>>>) -> Spanned<Stmt> {
    sp(Stmt::If {
        cond,
        then_branch: Box::new(block(then)),
        else_branch: otherwise.map(|b| Box::new(block(b))),
    })
}

pub fn while_(cond: Spanned<Expr>, body: Vec<Spanned<Stmt>>) -> Spanned<Stmt> {
    sp(Stmt::While {
        cond,
        body: Box::new(block(body)),
    })
}

pub fn do_while(body: Vec<Spanned<Stmt>>, cond: Spanned<Expr>) -> Spanned<Stmt> {
    sp(Stmt::DoWhile {
        body: Box::new(block(body)),
        cond,
    })
}

pub fn for_(
    init: Option<Spanned<Stmt>>,
    cond: Option<Spanned<Expr>>,
    step: Option<Spanned<Stmt>>,
    body: Vec<Spanned<Stmt>>,
) -> Spanned<Stmt> {
    sp(Stmt::For {
        init: init.map(Box::new),
        cond,
        step: step.map(Box::new),
        body: Box::new(block(body)),
    })
}

pub fn foreach(var: &str, iterable: Spanned<Expr>, body: Vec<Spanned<Stmt>>) -> Spanned<Stmt> {
    sp(Stmt::ForEach {
        var: var.to_string(),
        iterable,
        body: Box::new(block(body)),
    })
}

pub fn break_() -> Spanned<Stmt> {
    sp(Stmt::Break)
}

pub fn continue_() -> Spanned<Stmt> {
    sp(Stmt::Continue)
}

pub fn ret(value: Option<Spanned<Expr>>) -> Spanned<Stmt> {
    sp(Stmt::Return(value))
}

pub fn function(
    name: &str,
    params: Vec<(&str, Option<TypeRef>)>,
    return_type: Option<TypeRef>,
    body: Vec<Spanned<Stmt>>,
) -> Spanned<Stmt> {
    sp(Stmt::Function(FnDef {
        name: name.to_string(),
        params: params
            .into_iter()
            .map(|(name, ty)| Param {
                name: name.to_string(),
                ty,
                default: None,
            })
            .collect(),
        return_type,
        body,
    }))
}

pub fn try_(body: Vec<Spanned<Stmt>>, handlers: Vec<Handler>) -> Spanned<Stmt> {
    sp(Stmt::Try { body, handlers })
}

pub fn when(matches: Raised, var: Option<&str>, body: Vec<Spanned<Stmt>>) -> Handler {
    Handler {
        matches,
        var: var.map(str::to_string),
        body,
    }
}

pub fn raise(exception: Raised, args: Vec<Spanned<Expr>>) -> Spanned<Stmt> {
    sp(Stmt::Raise { exception, args })
}

pub fn typedef(name: &str, ty: TypeRef) -> Spanned<Stmt> {
    sp(Stmt::Typedef {
        name: name.to_string(),
        ty,
    })
}

pub fn import(path: &str) -> Spanned<Stmt> {
    sp(Stmt::Import(path.to_string()))
}

pub fn connect(name: &str, spec: Spanned<Expr>) -> Spanned<Stmt> {
    sp(Stmt::Connect {
        name: name.to_string(),
        spec,
    })
}

pub fn use_(connection: &str, body: Vec<Spanned<Stmt>>) -> Spanned<Stmt> {
    sp(Stmt::Use {
        connection: connection.to_string(),
        body,
    })
}

pub fn cursor(name: &str, sql: &str) -> Spanned<Stmt> {
    sp(Stmt::Cursor {
        name: name.to_string(),
        sql: sql.to_string(),
    })
}

pub fn open(name: &str, args: Vec<Arg>) -> Spanned<Stmt> {
    sp(Stmt::OpenCursor {
        name: name.to_string(),
        args,
    })
}

pub fn close_cursor(name: &str) -> Spanned<Stmt> {
    sp(Stmt::CloseCursor(name.to_string()))
}

pub fn close_connection(name: &str) -> Spanned<Stmt> {
    sp(Stmt::CloseConnection(name.to_string()))
}

pub fn program(statements: Vec<Spanned<Stmt>>) -> Program {
    Program::new(statements)
}
