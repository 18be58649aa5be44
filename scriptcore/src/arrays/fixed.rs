//! Fixed-capacity arrays

use super::{coerce_element, ArrayError, ArrayResult};
use crate::interp::Value;
use crate::types::DataType;

/// Capacity set at creation; slots start as null
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayFixed {
    elem: DataType,
    slots: Vec<Value>,
}

impl ArrayFixed {
    pub fn new(elem: DataType, len: usize) -> Self {
        ArrayFixed {
            elem,
            slots: vec![Value::Null; len],
        }
    }

    pub fn elem_type(&self) -> DataType {
        self.elem
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn get(&self, index: usize) -> ArrayResult<Value> {
        self.slots
            .get(index)
            .cloned()
            .ok_or(ArrayError::IndexOutOfBounds {
                index,
                size: self.slots.len(),
            })
    }

    pub fn set(&mut self, index: usize, value: Value) -> ArrayResult<()> {
        let size = self.slots.len();
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(ArrayError::IndexOutOfBounds { index, size })?;
        *slot = coerce_element(self.elem, value)?;
        Ok(())
    }
}

/// Byte elements stored densely as `i8`
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayFixedByte {
    slots: Vec<i8>,
}

impl ArrayFixedByte {
    pub fn new(len: usize) -> Self {
        ArrayFixedByte {
            slots: vec![0; len],
        }
    }

    pub fn from_bytes(slots: Vec<i8>) -> Self {
        ArrayFixedByte { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn bytes(&self) -> &[i8] {
        &self.slots
    }

    pub fn get(&self, index: usize) -> ArrayResult<Value> {
        self.slots
            .get(index)
            .map(|b| Value::Byte(*b))
            .ok_or(ArrayError::IndexOutOfBounds {
                index,
                size: self.slots.len(),
            })
    }

    pub fn set(&mut self, index: usize, value: Value) -> ArrayResult<()> {
        let size = self.slots.len();
        let byte = match DataType::Byte.convert(value)? {
            Value::Byte(b) => b,
            _ => 0,
        };
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(ArrayError::IndexOutOfBounds { index, size })?;
        *slot = byte;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_slots_start_null() {
        let a = ArrayFixed::new(DataType::String, 2);
        assert_eq!(a.get(1).unwrap(), Value::Null);
        assert!(a.get(2).is_err());
    }

    #[test]
    fn test_byte_slots() {
        let mut a = ArrayFixedByte::new(2);
        assert_eq!(a.get(0).unwrap(), Value::Byte(0));
        a.set(1, Value::Int(255)).unwrap();
        assert_eq!(a.get(1).unwrap(), Value::Byte(-1));
        assert_eq!(a.bytes(), &[0, -1]);
    }
}
