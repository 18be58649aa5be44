//! Expression AST nodes

use super::{Spanned, TypeRef};
use serde::{Deserialize, Serialize};

/// Literal value as produced by the parser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Null,
    Bool(bool),
    Byte(i8),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(String),
}

/// Call argument, optionally named (`f(limit = 3)`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arg {
    #[serde(default)]
    pub name: Option<String>,
    pub value: Spanned<Expr>,
}

impl Arg {
    pub fn positional(value: Spanned<Expr>) -> Self {
        Arg { name: None, value }
    }

    pub fn named(name: impl Into<String>, value: Spanned<Expr>) -> Self {
        Arg {
            name: Some(name.into()),
            value,
        }
    }
}

/// Expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Literal(Literal),

    /// Variable reference; dotted names address screen variables and record fields
    Var(String),

    Binary {
        left: Box<Spanned<Expr>>,
        op: BinOp,
        right: Box<Spanned<Expr>>,
    },

    Unary {
        op: UnOp,
        expr: Box<Spanned<Expr>>,
    },

    /// `typeof x`
    TypeOf(Box<Spanned<Expr>>),

    /// `a < b <= c`
    Chain {
        operands: Vec<Spanned<Expr>>,
        ops: Vec<BinOp>,
    },

    /// Builtin (`namespace.function`) or script function call
    Call { name: String, args: Vec<Arg> },

    /// `target[i, j]`
    Index {
        target: Box<Spanned<Expr>>,
        indices: Vec<Spanned<Expr>>,
    },

    /// `object.name`
    Property {
        object: Box<Spanned<Expr>>,
        name: String,
    },

    /// `{1, 2, {3, 4}}`
    ArrayLiteral(Vec<Spanned<Expr>>),

    /// `int[3, *]` with optional initializer; `None` dimensions are dynamic
    ArrayInit {
        elem: TypeRef,
        dims: Vec<Option<Spanned<Expr>>>,
        #[serde(default)]
        init: Option<Vec<Spanned<Expr>>>,
    },

    /// `queue.int`
    QueueInit { elem: TypeRef },

    /// `{"a": 1, "b": "x"}`
    MapLiteral(Vec<(String, Spanned<Expr>)>),

    /// `int(x)`, `record(json)`, `bitmap alias(x)`
    Cast {
        target: TypeRef,
        value: Box<Spanned<Expr>>,
    },

    /// `x.length` / `x.size`
    Length(Box<Spanned<Expr>>),

    /// `cursor.hasNext()`
    CursorHasNext(Box<Spanned<Expr>>),

    /// `cursor.next()`
    CursorNext(Box<Spanned<Expr>>),

    /// Inline `select ...` run on the active connection
    Select { sql: String },
}

/// Binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    /// Exponent (`^`), always produces a double
    Pow,

    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,

    And,
    Or,
}

impl BinOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge
        )
    }
}

impl std::fmt::Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinOp::Add => write!(f, "+"),
            BinOp::Sub => write!(f, "-"),
            BinOp::Mul => write!(f, "*"),
            BinOp::Div => write!(f, "/"),
            BinOp::Mod => write!(f, "%"),
            BinOp::Pow => write!(f, "^"),
            BinOp::Eq => write!(f, "=="),
            BinOp::Ne => write!(f, "!="),
            BinOp::Lt => write!(f, "<"),
            BinOp::Gt => write!(f, ">"),
            BinOp::Le => write!(f, "<="),
            BinOp::Ge => write!(f, ">="),
            BinOp::And => write!(f, "and"),
            BinOp::Or => write!(f, "or"),
        }
    }
}

/// Unary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnOp {
    /// Negation (-)
    Neg,
    /// Identity (+), still requires a number
    Plus,
    /// Logical not (!)
    Not,
}

impl std::fmt::Display for UnOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnOp::Neg => write!(f, "-"),
            UnOp::Plus => write!(f, "+"),
            UnOp::Not => write!(f, "!"),
        }
    }
}
