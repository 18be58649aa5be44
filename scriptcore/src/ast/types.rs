//! Declared type references

use crate::types::DataType;
use serde::{Deserialize, Serialize};

/// A type as written in a declaration, cast or typedef
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeRef {
    /// Primitive or container kind (`int`, `string`, `json`, `map`, ...)
    Simple(DataType),
    /// Inline record layout: `record { a: int, b: string }`
    Record(Vec<FieldDecl>),
    /// Packed byte layout: `bitmap { flag: 0, mode: 1-3 }`
    Bitmap(Vec<BitFieldDecl>),
    /// Packed 32-bit layout
    Intmap(Vec<BitFieldDecl>),
    /// Array of the element type
    Array(Box<TypeRef>),
    /// FIFO queue of the element type
    Queue(Box<TypeRef>),
    /// Map kept in key order
    SortedMap,
    /// Name registered by `typedef`
    Alias(String),
}

/// Record field declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    pub ty: TypeRef,
    #[serde(default)]
    pub mandatory: bool,
    #[serde(default)]
    pub max_length: Option<usize>,
    #[serde(default)]
    pub default: Option<super::Literal>,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        FieldDecl {
            name: name.into(),
            ty,
            mandatory: false,
            max_length: None,
            default: None,
        }
    }
}

/// Named bit range inside a bitmap or intmap (inclusive bounds)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitFieldDecl {
    pub name: String,
    pub start: u8,
    pub end: u8,
}

impl std::fmt::Display for TypeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeRef::Simple(dt) => write!(f, "{dt}"),
            TypeRef::Record(_) => write!(f, "RECORD"),
            TypeRef::Bitmap(_) => write!(f, "BITMAP"),
            TypeRef::Intmap(_) => write!(f, "INTMAP"),
            TypeRef::Array(elem) => write!(f, "ARRAY.{elem}"),
            TypeRef::Queue(elem) => write!(f, "QUEUE.{elem}"),
            TypeRef::SortedMap => write!(f, "SORTED MAP"),
            TypeRef::Alias(name) => write!(f, "{name}"),
        }
    }
}
