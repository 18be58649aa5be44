//! Variable storage: a stack of scopes
//!
//! Index 0 is the global scope. Blocks, loop bodies, handlers and function
//! calls push a scope and pop it on every exit path. Lookups walk from the
//! innermost scope outwards, so a function body also sees its caller's
//! variables.

use std::collections::HashMap;

use super::{InterpResult, Interpreter, RuntimeError, Value};
use crate::types::{BitmapType, IntmapType, RecordType};

/// Structural layout attached to a binding
#[derive(Debug, Clone, PartialEq)]
pub enum Layout {
    Record(RecordType),
    Bitmap(BitmapType),
    Intmap(IntmapType),
}

/// Layout plus the typedef name it came from, if any
#[derive(Debug, Clone, PartialEq)]
pub struct TypeMeta {
    pub layout: Layout,
    pub alias: Option<String>,
}

impl TypeMeta {
    pub fn new(layout: Layout) -> Self {
        TypeMeta {
            layout,
            alias: None,
        }
    }

    pub fn record(&self) -> Option<&RecordType> {
        match &self.layout {
            Layout::Record(rt) => Some(rt),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Binding {
    pub value: Value,
    pub is_const: bool,
    pub meta: Option<TypeMeta>,
}

impl Binding {
    pub fn new(value: Value) -> Self {
        Binding {
            value,
            is_const: false,
            meta: None,
        }
    }
}

#[derive(Debug)]
pub struct Environment {
    scopes: Vec<HashMap<String, Binding>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            scopes: vec![HashMap::new()],
        }
    }

    pub fn push_scope(&mut self) -> usize {
        self.scopes.push(HashMap::new());
        self.scopes.len() - 1
    }

    /// The global scope is never popped
    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Define (or redefine) in the innermost scope
    pub fn define(&mut self, name: String, binding: Binding) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, binding);
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    fn lookup_mut(&mut self, name: &str) -> Option<&mut Binding> {
        self.scopes.iter_mut().rev().find_map(|scope| scope.get_mut(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    pub fn get(&self, name: &str) -> InterpResult<Value> {
        self.lookup(name)
            .map(|b| b.value.clone())
            .ok_or_else(|| RuntimeError::undefined_variable(name))
    }

    pub fn meta(&self, name: &str) -> Option<&TypeMeta> {
        self.lookup(name).and_then(|b| b.meta.as_ref())
    }

    /// Update an existing binding wherever it lives
    pub fn assign(&mut self, name: &str, value: Value) -> InterpResult<()> {
        let binding = self
            .lookup_mut(name)
            .ok_or_else(|| RuntimeError::undefined_variable(name))?;
        if binding.is_const {
            return Err(RuntimeError::constant_reassign(name));
        }
        binding.value = value;
        Ok(())
    }

    pub fn set_meta(&mut self, name: &str, meta: Option<TypeMeta>) {
        if let Some(binding) = self.lookup_mut(name) {
            binding.meta = meta;
        }
    }

    /// Bindings of the innermost scope (debugging aid)
    pub fn current_bindings(&self) -> Option<&HashMap<String, Binding>> {
        self.scopes.last()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Run `body` in a fresh scope that is popped on every exit path
    pub(crate) fn with_scope<T>(
        &mut self,
        body: impl FnOnce(&mut Self) -> InterpResult<T>,
    ) -> InterpResult<T> {
        self.ctx.env.push_scope();
        let result = body(self);
        self.ctx.env.pop_scope();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_and_get() {
        let mut env = Environment::new();
        env.define("x".to_string(), Binding::new(Value::Int(42)));
        assert_eq!(env.get("x").unwrap(), Value::Int(42));
        assert_eq!(
            env.get("y").unwrap_err().message,
            "Undefined variable 'y'."
        );
    }

    #[test]
    fn test_scope_push_pop() {
        let mut env = Environment::new();
        env.define("x".to_string(), Binding::new(Value::Int(1)));
        env.push_scope();
        env.define("y".to_string(), Binding::new(Value::Int(2)));
        env.assign("x", Value::Int(10)).unwrap();
        assert!(env.contains("y"));
        env.pop_scope();
        assert!(!env.contains("y"));
        assert_eq!(env.get("x").unwrap(), Value::Int(10));
    }

    #[test]
    fn test_global_scope_survives_pop() {
        let mut env = Environment::new();
        env.pop_scope();
        assert_eq!(env.depth(), 1);
    }

    #[test]
    fn test_shadowing() {
        let mut env = Environment::new();
        env.define("x".to_string(), Binding::new(Value::Int(1)));
        env.push_scope();
        env.define("x".to_string(), Binding::new(Value::from("inner")));
        assert_eq!(env.get("x").unwrap(), Value::from("inner"));
        env.pop_scope();
        assert_eq!(env.get("x").unwrap(), Value::Int(1));
    }

    #[test]
    fn test_constants() {
        let mut env = Environment::new();
        let mut b = Binding::new(Value::Int(1));
        b.is_const = true;
        env.define("k".to_string(), b);
        let err = env.assign("k", Value::Int(2)).unwrap_err();
        assert_eq!(err.message, "Cannot reassign constant variable 'k'.");
    }
}
