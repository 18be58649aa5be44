//! Ordered containers: fixed / fixed-byte / dynamic arrays and the FIFO queue
//!
//! Arrays are 0-indexed and homogeneously typed. Nested arrays model
//! multi-dimensional shapes; a child created through [`ArrayDef::child`]
//! keeps the parent's capacity discipline.

mod dynamic;
mod fixed;
mod queue;

pub use dynamic::ArrayDynamic;
pub use fixed::{ArrayFixed, ArrayFixedByte};
pub use queue::QueueDef;

use thiserror::Error;

use crate::interp::Value;
use crate::types::{DataType, TypeError};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArrayError {
    #[error("Index out of bounds: {index} (size {size}).")]
    IndexOutOfBounds { index: usize, size: usize },

    #[error("{message}")]
    Capacity { message: String },

    #[error("{message}")]
    Unsupported { message: String },

    #[error("Queue is empty")]
    Empty,

    #[error(transparent)]
    Conversion(#[from] TypeError),
}

impl ArrayError {
    pub fn capacity(message: impl Into<String>) -> Self {
        Self::Capacity {
            message: message.into(),
        }
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported {
            message: message.into(),
        }
    }
}

pub type ArrayResult<T> = Result<T, ArrayError>;

/// Convert a value to the element type before storing it.
/// Nested arrays and untyped containers are stored as-is.
pub(crate) fn coerce_element(elem: DataType, value: Value) -> ArrayResult<Value> {
    match (elem, &value) {
        (_, Value::Array(_)) => Ok(value),
        (
            DataType::Any
            | DataType::Array
            | DataType::Json
            | DataType::Record
            | DataType::Map
            | DataType::Queue,
            _,
        ) => Ok(value),
        (_, Value::Null) => Ok(Value::Null),
        _ => Ok(elem.convert(value)?),
    }
}

/// Array with fixed or dynamic capacity
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayDef {
    Fixed(ArrayFixed),
    FixedByte(ArrayFixedByte),
    Dynamic(ArrayDynamic),
}

impl ArrayDef {
    /// Fixed array; byte elements get the dense representation
    pub fn fixed(elem: DataType, len: usize) -> Self {
        if elem == DataType::Byte {
            ArrayDef::FixedByte(ArrayFixedByte::new(len))
        } else {
            ArrayDef::Fixed(ArrayFixed::new(elem, len))
        }
    }

    pub fn dynamic(elem: DataType, len: usize) -> Self {
        ArrayDef::Dynamic(ArrayDynamic::new(elem, len))
    }

    /// Dynamic array holding `items` without conversion
    pub fn from_values(elem: DataType, items: Vec<Value>) -> Self {
        ArrayDef::Dynamic(ArrayDynamic::from_values(elem, items))
    }

    /// Empty child array of `len` slots with the same capacity discipline
    pub fn child(&self, len: usize) -> ArrayDef {
        match self {
            ArrayDef::Fixed(a) => ArrayDef::Fixed(ArrayFixed::new(a.elem_type(), len)),
            ArrayDef::FixedByte(_) => ArrayDef::FixedByte(ArrayFixedByte::new(len)),
            ArrayDef::Dynamic(a) => ArrayDef::Dynamic(ArrayDynamic::new(a.elem_type(), len)),
        }
    }

    pub fn elem_type(&self) -> DataType {
        match self {
            ArrayDef::Fixed(a) => a.elem_type(),
            ArrayDef::FixedByte(_) => DataType::Byte,
            ArrayDef::Dynamic(a) => a.elem_type(),
        }
    }

    pub fn is_fixed(&self) -> bool {
        !matches!(self, ArrayDef::Dynamic(_))
    }

    pub fn len(&self) -> usize {
        match self {
            ArrayDef::Fixed(a) => a.len(),
            ArrayDef::FixedByte(a) => a.len(),
            ArrayDef::Dynamic(a) => a.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> ArrayResult<Value> {
        match self {
            ArrayDef::Fixed(a) => a.get(index),
            ArrayDef::FixedByte(a) => a.get(index),
            ArrayDef::Dynamic(a) => a.get(index),
        }
    }

    pub fn set(&mut self, index: usize, value: Value) -> ArrayResult<()> {
        match self {
            ArrayDef::Fixed(a) => a.set(index, value),
            ArrayDef::FixedByte(a) => a.set(index, value),
            ArrayDef::Dynamic(a) => a.set(index, value),
        }
    }

    /// Grow a dynamic array to at least `len` slots
    pub fn expand(&mut self, len: usize) -> ArrayResult<()> {
        match self {
            ArrayDef::Dynamic(a) => {
                a.expand(len);
                Ok(())
            }
            _ => Err(ArrayError::unsupported("Cannot expand a fixed array")),
        }
    }

    pub fn add(&mut self, value: Value) -> ArrayResult<()> {
        match self {
            ArrayDef::Dynamic(a) => a.add(value),
            _ => Err(ArrayError::unsupported("Cannot add to a fixed array")),
        }
    }

    pub fn insert(&mut self, index: usize, value: Value) -> ArrayResult<()> {
        match self {
            ArrayDef::Dynamic(a) => a.insert(index, value),
            _ => Err(ArrayError::unsupported("Cannot insert into a fixed array")),
        }
    }

    pub fn remove(&mut self, index: usize) -> ArrayResult<Value> {
        match self {
            ArrayDef::Dynamic(a) => a.remove(index),
            _ => Err(ArrayError::unsupported("Cannot remove from a fixed array")),
        }
    }

    /// Set the first `len` slots to `value`, growing a dynamic array as needed
    pub fn fill(&mut self, len: usize, value: Value) -> ArrayResult<()> {
        if self.is_fixed() && len > self.len() {
            return Err(ArrayError::capacity(format!(
                "Fill length ({len}) exceeds fixed array length ({}).",
                self.len()
            )));
        }
        if let ArrayDef::Dynamic(a) = self {
            a.expand(len);
        }
        for i in 0..len {
            self.set(i, value.clone())?;
        }
        Ok(())
    }

    pub fn sort(&mut self, ascending: bool) -> ArrayResult<()> {
        let mut items = self.to_vec();
        items.sort_by(|a, b| {
            let ord = a.sort_cmp(b);
            if ascending { ord } else { ord.reverse() }
        });
        for (i, v) in items.into_iter().enumerate() {
            self.set(i, v)?;
        }
        Ok(())
    }

    pub fn to_vec(&self) -> Vec<Value> {
        (0..self.len())
            .map(|i| self.get(i).unwrap_or(Value::Null))
            .collect()
    }
}
