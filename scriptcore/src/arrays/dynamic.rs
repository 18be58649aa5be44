//! Growable arrays

use super::{coerce_element, ArrayError, ArrayResult};
use crate::interp::Value;
use crate::types::DataType;

/// Capacity grows on demand and never shrinks on its own
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayDynamic {
    elem: DataType,
    items: Vec<Value>,
}

impl ArrayDynamic {
    pub fn new(elem: DataType, len: usize) -> Self {
        ArrayDynamic {
            elem,
            items: vec![Value::Null; len],
        }
    }

    pub fn from_values(elem: DataType, items: Vec<Value>) -> Self {
        ArrayDynamic { elem, items }
    }

    pub fn elem_type(&self) -> DataType {
        self.elem
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn get(&self, index: usize) -> ArrayResult<Value> {
        self.items
            .get(index)
            .cloned()
            .ok_or(ArrayError::IndexOutOfBounds {
                index,
                size: self.items.len(),
            })
    }

    /// Writing at `len()` appends
    pub fn set(&mut self, index: usize, value: Value) -> ArrayResult<()> {
        let value = coerce_element(self.elem, value)?;
        match index.cmp(&self.items.len()) {
            std::cmp::Ordering::Less => self.items[index] = value,
            std::cmp::Ordering::Equal => self.items.push(value),
            std::cmp::Ordering::Greater => {
                return Err(ArrayError::IndexOutOfBounds {
                    index,
                    size: self.items.len(),
                });
            }
        }
        Ok(())
    }

    pub fn expand(&mut self, len: usize) {
        if len > self.items.len() {
            self.items.resize(len, Value::Null);
        }
    }

    pub fn add(&mut self, value: Value) -> ArrayResult<()> {
        let value = coerce_element(self.elem, value)?;
        self.items.push(value);
        Ok(())
    }

    pub fn insert(&mut self, index: usize, value: Value) -> ArrayResult<()> {
        if index > self.items.len() {
            return Err(ArrayError::IndexOutOfBounds {
                index,
                size: self.items.len(),
            });
        }
        let value = coerce_element(self.elem, value)?;
        self.items.insert(index, value);
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> ArrayResult<Value> {
        if index >= self.items.len() {
            return Err(ArrayError::IndexOutOfBounds {
                index,
                size: self.items.len(),
            });
        }
        Ok(self.items.remove(index))
    }
}
