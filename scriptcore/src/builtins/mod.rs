//! Builtin dispatch
//!
//! Builtins are namespaced (`str.trim`, `queue.enqueue`) and grouped into
//! modules. Every module publishes the signatures of its functions; the
//! registry uses them to coerce arguments before the call. Hosts plug their
//! own collaborators in by registering another [`BuiltinModule`].

mod array;
mod json;
mod math;
mod queue;
mod string;

use std::collections::HashMap;

use tracing::trace;

use crate::interp::{InterpResult, RuntimeError, Value};
use crate::types::DataType;

/// Native function backing a builtin
pub type BuiltinFn = fn(&[Value]) -> InterpResult<Value>;

#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    pub ty: DataType,
    pub mandatory: bool,
}

/// Published signature of a builtin
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltinInfo {
    pub name: String,
    /// `None` for builtins used as statements
    pub return_type: Option<DataType>,
    pub params: Vec<ParamSpec>,
}

impl BuiltinInfo {
    pub fn new(name: &str, return_type: Option<DataType>) -> Self {
        BuiltinInfo {
            name: name.to_string(),
            return_type,
            params: Vec::new(),
        }
    }

    /// Add a mandatory parameter
    pub fn param(mut self, name: &str, ty: DataType) -> Self {
        self.params.push(ParamSpec {
            name: name.to_string(),
            ty,
            mandatory: true,
        });
        self
    }

    pub fn optional(mut self, name: &str, ty: DataType) -> Self {
        self.params.push(ParamSpec {
            name: name.to_string(),
            ty,
            mandatory: false,
        });
        self
    }

    /// Position of a parameter by (case-insensitive) name
    pub fn param_index(&self, name: &str) -> Option<usize> {
        self.params
            .iter()
            .position(|p| p.name.eq_ignore_ascii_case(name))
    }
}

/// A group of builtins sharing a namespace
pub trait BuiltinModule: Send {
    /// Lowercase namespace, e.g. `str`
    fn namespace(&self) -> &str;

    fn signatures(&self) -> Vec<BuiltinInfo>;

    /// `name` is the full lowercase name; arguments are already coerced
    fn call(&self, name: &str, args: &[Value]) -> InterpResult<Value>;
}

/// Module backed by plain Rust functions
pub struct NativeModule {
    namespace: String,
    functions: HashMap<String, (BuiltinInfo, BuiltinFn)>,
}

impl NativeModule {
    pub fn new(namespace: &str) -> Self {
        NativeModule {
            namespace: namespace.to_ascii_lowercase(),
            functions: HashMap::new(),
        }
    }

    pub fn function(mut self, info: BuiltinInfo, f: BuiltinFn) -> Self {
        self.functions
            .insert(info.name.to_ascii_lowercase(), (info, f));
        self
    }
}

impl BuiltinModule for NativeModule {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn signatures(&self) -> Vec<BuiltinInfo> {
        let mut infos: Vec<BuiltinInfo> =
            self.functions.values().map(|(info, _)| info.clone()).collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    fn call(&self, name: &str, args: &[Value]) -> InterpResult<Value> {
        match self.functions.get(name) {
            Some((_, f)) => f(args),
            None => Err(RuntimeError::unknown(format!("Unknown builtin: {name}"))),
        }
    }
}

/// All known builtins, keyed by lowercase name
pub struct BuiltinRegistry {
    infos: HashMap<String, BuiltinInfo>,
    modules: HashMap<String, Box<dyn BuiltinModule>>,
}

impl Default for BuiltinRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl BuiltinRegistry {
    /// Registry without any module
    pub fn new() -> Self {
        BuiltinRegistry {
            infos: HashMap::new(),
            modules: HashMap::new(),
        }
    }

    /// Registry with the bundled queue, array, str, json and math modules
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(queue::module()));
        registry.register(Box::new(array::module()));
        registry.register(Box::new(string::module()));
        registry.register(Box::new(json::module()));
        registry.register(Box::new(math::module()));
        registry
    }

    /// Add (or replace) a module and its signatures
    pub fn register(&mut self, module: Box<dyn BuiltinModule>) {
        let namespace = module.namespace().to_ascii_lowercase();
        self.infos
            .retain(|name, _| namespace_of(name) != Some(namespace.as_str()));
        for info in module.signatures() {
            self.infos.insert(info.name.to_ascii_lowercase(), info);
        }
        self.modules.insert(namespace, module);
    }

    /// Does `name` address a builtin (a known function or a known namespace)?
    pub fn is_builtin(&self, name: &str) -> bool {
        let lower = name.to_ascii_lowercase();
        self.infos.contains_key(&lower)
            || namespace_of(&lower).is_some_and(|ns| self.modules.contains_key(ns))
    }

    pub fn info(&self, name: &str) -> Option<&BuiltinInfo> {
        self.infos.get(&name.to_ascii_lowercase())
    }

    /// Check and convert arguments against the published signature.
    ///
    /// Missing optional arguments become null; JSON and ANY parameters are
    /// passed through untouched.
    pub fn coerce(&self, name: &str, mut args: Vec<Value>) -> InterpResult<Vec<Value>> {
        let Some(info) = self.info(name) else {
            return Ok(args);
        };
        for (idx, param) in info.params.iter().enumerate() {
            if idx >= args.len() {
                if param.mandatory {
                    return Err(RuntimeError::type_mismatch(format!(
                        "Call to [{}] missing mandatory parameter [{}:{}]",
                        info.name, param.name, param.ty
                    )));
                }
                args.push(Value::Null);
                continue;
            }
            if matches!(param.ty, DataType::Json | DataType::Any) || param.ty.is_data_type(&args[idx]) {
                continue;
            }
            let found = args[idx].type_name();
            let wrong_type = || {
                RuntimeError::type_mismatch(format!(
                    "Call to [{}] parameter [{}:{}] wrong type, expected {} but found {}",
                    info.name, param.name, param.ty, param.ty, found
                ))
            };
            let converted = param
                .ty
                .convert(std::mem::take(&mut args[idx]))
                .map_err(|_| wrong_type())?;
            if !param.ty.is_data_type(&converted) {
                return Err(wrong_type());
            }
            args[idx] = converted;
        }
        Ok(args)
    }

    /// Dispatch to the module owning the namespace
    pub fn call(&self, name: &str, args: &[Value]) -> InterpResult<Value> {
        let lower = name.to_ascii_lowercase();
        let module = namespace_of(&lower)
            .and_then(|ns| self.modules.get(ns))
            .ok_or_else(|| RuntimeError::unknown(format!("Unknown builtin: {name}")))?;
        trace!(builtin = %lower, argc = args.len(), "builtin dispatch");
        module.call(&lower, args)
    }
}

fn namespace_of(name: &str) -> Option<&str> {
    name.split_once('.').map(|(ns, _)| ns)
}

static NULL: Value = Value::Null;

/// Argument `i`, or null when absent
pub(crate) fn arg(args: &[Value], i: usize) -> &Value {
    args.get(i).unwrap_or(&NULL)
}

/// Optional integer argument
pub(crate) fn int_arg(args: &[Value], i: usize) -> Option<i64> {
    arg(args, i).as_i64()
}

pub(crate) fn str_arg(args: &[Value], i: usize) -> Option<&str> {
    arg(args, i).as_str()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::ErrorKind;

    fn echo(args: &[Value]) -> InterpResult<Value> {
        Ok(arg(args, 0).clone())
    }

    fn host_module() -> NativeModule {
        NativeModule::new("host").function(
            BuiltinInfo::new("host.echo", Some(DataType::Int))
                .param("n", DataType::Int)
                .optional("note", DataType::String),
            echo,
        )
    }

    // ====================================================================
    // Registry
    // ====================================================================

    #[test]
    fn test_defaults_are_registered() {
        let reg = BuiltinRegistry::with_defaults();
        for name in ["queue.enqueue", "array.fill", "str.toUpper", "json.get", "math.sqrt"] {
            assert!(reg.is_builtin(name), "{name} should be known");
        }
        assert!(reg.is_builtin("STR.TRIM"));
        assert!(!reg.is_builtin("nosuch.fn"));
        assert!(!reg.is_builtin("trim"));
    }

    #[test]
    fn test_known_namespace_unknown_function() {
        let reg = BuiltinRegistry::with_defaults();
        assert!(reg.is_builtin("str.nosuch"));
        let err = reg.call("str.nosuch", &[]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownBinding);
        assert_eq!(err.message, "Unknown builtin: str.nosuch");
    }

    #[test]
    fn test_unknown_namespace() {
        let reg = BuiltinRegistry::new();
        let err = reg.call("ftp.open", &[]).unwrap_err();
        assert_eq!(err.message, "Unknown builtin: ftp.open");
    }

    #[test]
    fn test_host_module_plugs_in() {
        let mut reg = BuiltinRegistry::new();
        reg.register(Box::new(host_module()));
        let args = reg.coerce("host.echo", vec![Value::from("41")]).unwrap();
        assert_eq!(args, vec![Value::Int(41), Value::Null]);
        assert_eq!(reg.call("HOST.ECHO", &args).unwrap(), Value::Int(41));
    }

    // ====================================================================
    // Coercion
    // ====================================================================

    #[test]
    fn test_coerce_wrong_type() {
        let mut reg = BuiltinRegistry::new();
        reg.register(Box::new(host_module()));
        let err = reg.coerce("host.echo", vec![Value::from("abc")]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeMismatch);
        assert_eq!(
            err.message,
            "Call to [host.echo] parameter [n:INTEGER] wrong type, expected INTEGER but found string"
        );
    }

    #[test]
    fn test_coerce_missing_mandatory() {
        let mut reg = BuiltinRegistry::new();
        reg.register(Box::new(host_module()));
        let err = reg.coerce("host.echo", vec![]).unwrap_err();
        assert_eq!(
            err.message,
            "Call to [host.echo] missing mandatory parameter [n:INTEGER]"
        );
    }

    #[test]
    fn test_coerce_skips_json_and_any() {
        let reg = BuiltinRegistry::with_defaults();
        let args = reg
            .coerce("json.isEmpty", vec![Value::Int(3)])
            .unwrap();
        assert_eq!(args, vec![Value::Int(3)]);
    }

    #[test]
    fn test_coerce_keeps_null() {
        let reg = BuiltinRegistry::with_defaults();
        let args = reg.coerce("str.toUpper", vec![Value::Null]).unwrap();
        assert_eq!(args, vec![Value::Null]);
    }
}
