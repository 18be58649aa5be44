//! FIFO queue

use std::collections::VecDeque;

use super::{coerce_element, ArrayError, ArrayResult};
use crate::interp::Value;
use crate::types::DataType;

#[derive(Debug, Clone, PartialEq)]
pub struct QueueDef {
    elem: DataType,
    items: VecDeque<Value>,
}

impl QueueDef {
    pub fn new(elem: DataType) -> Self {
        QueueDef {
            elem,
            items: VecDeque::new(),
        }
    }

    pub fn elem_type(&self) -> DataType {
        self.elem
    }

    pub fn enqueue(&mut self, value: Value) -> ArrayResult<()> {
        let value = coerce_element(self.elem, value)?;
        self.items.push_back(value);
        Ok(())
    }

    pub fn dequeue(&mut self) -> ArrayResult<Value> {
        self.items.pop_front().ok_or(ArrayError::Empty)
    }

    pub fn peek(&self) -> ArrayResult<Value> {
        self.items.front().cloned().ok_or(ArrayError::Empty)
    }

    pub fn size(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.items.iter().any(|v| v == value)
    }

    /// Snapshot in dequeue order
    pub fn to_vec(&self) -> Vec<Value> {
        self.items.iter().cloned().collect()
    }
}
