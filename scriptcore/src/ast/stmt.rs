//! Statement AST nodes

use super::{Arg, Expr, Spanned, TypeRef};
use crate::types::ErrorType;
use serde::{Deserialize, Serialize};

/// Statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    /// `var x: T = init;` / `const x = init;`
    Var {
        name: String,
        #[serde(default)]
        ty: Option<TypeRef>,
        #[serde(default)]
        init: Option<Spanned<Expr>>,
        #[serde(default)]
        is_const: bool,
    },

    /// Assignment to a variable, record field (`r.f`) or indexed slot (`a[i]`)
    Assign {
        target: Spanned<Expr>,
        value: Spanned<Expr>,
    },

    /// Expression evaluated for its side effects (usually a call)
    Expr(Spanned<Expr>),

    Print(Spanned<Expr>),

    If {
        cond: Spanned<Expr>,
        then_branch: Box<Spanned<Stmt>>,
        #[serde(default)]
        else_branch: Option<Box<Spanned<Stmt>>>,
    },

    While {
        cond: Spanned<Expr>,
        body: Box<Spanned<Stmt>>,
    },

    DoWhile {
        body: Box<Spanned<Stmt>>,
        cond: Spanned<Expr>,
    },

    For {
        #[serde(default)]
        init: Option<Box<Spanned<Stmt>>>,
        #[serde(default)]
        cond: Option<Spanned<Expr>>,
        #[serde(default)]
        step: Option<Box<Spanned<Stmt>>>,
        body: Box<Spanned<Stmt>>,
    },

    ForEach {
        var: String,
        iterable: Spanned<Expr>,
        body: Box<Spanned<Stmt>>,
    },

    Break,
    Continue,
    Return(Option<Spanned<Expr>>),

    Block(Vec<Spanned<Stmt>>),

    /// Named function declaration
    Function(FnDef),

    /// `try { ... } exceptions { when TYPE(msg) { ... } }`
    Try {
        body: Vec<Spanned<Stmt>>,
        handlers: Vec<Handler>,
    },

    /// `raise exception TYPE("message")` or `raise exception MyError(a, b)`
    Raise {
        exception: Raised,
        #[serde(default)]
        args: Vec<Spanned<Expr>>,
    },

    /// `typedef name = T;`
    Typedef { name: String, ty: TypeRef },

    /// Load and run another serialized program once
    Import(String),

    /// `connect name = spec;`
    Connect { name: String, spec: Spanned<Expr> },

    /// `use name { ... }`
    Use {
        connection: String,
        body: Vec<Spanned<Stmt>>,
    },

    /// `cursor name = select ...;`
    Cursor { name: String, sql: String },

    /// `open name(params);`
    OpenCursor {
        name: String,
        #[serde(default)]
        args: Vec<Arg>,
    },

    /// `close name;`
    CloseCursor(String),

    /// `close connection name;`
    CloseConnection(String),
}

/// Function declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FnDef {
    pub name: String,
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default)]
    pub return_type: Option<TypeRef>,
    pub body: Vec<Spanned<Stmt>>,
}

/// Function parameter with optional declared type and default value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(default)]
    pub ty: Option<TypeRef>,
    #[serde(default)]
    pub default: Option<Spanned<Expr>>,
}

/// `when` clause of a try statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Handler {
    pub matches: Raised,
    /// Variable bound to the error message inside the handler
    #[serde(default)]
    pub var: Option<String>,
    pub body: Vec<Spanned<Stmt>>,
}

/// Exception identity used by `raise` and `when`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Raised {
    Standard(ErrorType),
    Custom(String),
}

impl std::fmt::Display for Raised {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Raised::Standard(t) => write!(f, "{t}"),
            Raised::Custom(name) => write!(f, "{name}"),
        }
    }
}
