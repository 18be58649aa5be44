//! Runtime errors for the interpreter

use std::fmt;

use super::StackFrame;
use crate::arrays::ArrayError;
use crate::ast::Raised;
use crate::db::DbError;
use crate::types::{ErrorType, TypeError};

/// Runtime error during interpretation
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub message: String,
    /// Line of the innermost frame that saw the error
    pub line: Option<usize>,
    /// Call-stack snapshot taken where the error surfaced, innermost first
    pub stack: Vec<StackFrame>,
}

/// Kinds of runtime errors
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    /// Declared vs actual value type
    TypeMismatch,
    /// Cast or convert could not produce the target type
    ConversionFailure,
    IndexOutOfBounds,
    /// Fixed array literal exceeds capacity
    CapacityOverflow,
    /// Division / modulo by zero
    Arithmetic,
    /// Undefined variable, function, cursor, connection or builtin
    UnknownBinding,
    /// Record field set mismatch
    StructuralMismatch,
    /// User `raise`
    ScriptRaised(Raised),
    /// Internal fault surfaced to script level
    WrappedFault,
    /// Operation not valid in the current state
    InvalidOperation,
    StackOverflow,
    Database,
    Io,
    NullAccess,
}

impl RuntimeError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        RuntimeError {
            kind,
            message: message.into(),
            line: None,
            stack: Vec::new(),
        }
    }

    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeMismatch, message)
    }

    pub fn conversion(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConversionFailure, message)
    }

    pub fn index_out_of_bounds(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::IndexOutOfBounds, message)
    }

    pub fn capacity(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CapacityOverflow, message)
    }

    pub fn division_by_zero() -> Self {
        Self::new(ErrorKind::Arithmetic, "Division by zero")
    }

    pub fn modulo_by_zero() -> Self {
        Self::new(ErrorKind::Arithmetic, "Modulo by zero")
    }

    pub fn undefined_variable(name: &str) -> Self {
        Self::new(
            ErrorKind::UnknownBinding,
            format!("Undefined variable '{name}'."),
        )
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownBinding, message)
    }

    pub fn constant_reassign(name: &str) -> Self {
        Self::new(
            ErrorKind::InvalidOperation,
            format!("Cannot reassign constant variable '{name}'."),
        )
    }

    pub fn structural(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::StructuralMismatch, message)
    }

    pub fn raised(exception: Raised, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ScriptRaised(exception), message)
    }

    pub fn wrapped(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::WrappedFault, message)
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidOperation, message)
    }

    pub fn stack_overflow() -> Self {
        Self::new(ErrorKind::StackOverflow, "stack overflow")
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, message)
    }

    pub fn null_access(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NullAccess, message)
    }

    pub fn at_line(mut self, line: usize) -> Self {
        if self.line.is_none() {
            self.line = Some(line);
        }
        self
    }

    /// Replace the message, keeping kind, line and stack
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Standard exception kind a `when` clause sees for this error
    pub fn error_type(&self) -> ErrorType {
        match &self.kind {
            ErrorKind::TypeMismatch | ErrorKind::ConversionFailure => ErrorType::TypeError,
            ErrorKind::IndexOutOfBounds | ErrorKind::CapacityOverflow => ErrorType::IndexError,
            ErrorKind::Arithmetic => ErrorType::MathError,
            ErrorKind::UnknownBinding => ErrorType::NotFoundError,
            ErrorKind::StructuralMismatch => ErrorType::ValidationError,
            ErrorKind::Database => ErrorType::DbError,
            ErrorKind::Io => ErrorType::IoError,
            ErrorKind::NullAccess => ErrorType::NullError,
            ErrorKind::ScriptRaised(Raised::Standard(t)) => *t,
            ErrorKind::ScriptRaised(Raised::Custom(_))
            | ErrorKind::WrappedFault
            | ErrorKind::InvalidOperation
            | ErrorKind::StackOverflow => ErrorType::AnyError,
        }
    }

    /// Does a `when <handler>` clause catch this error?
    pub fn matches(&self, handler: &Raised) -> bool {
        match handler {
            Raised::Standard(ErrorType::AnyError) => true,
            Raised::Standard(t) => self.error_type() == *t,
            Raised::Custom(name) => matches!(
                &self.kind,
                ErrorKind::ScriptRaised(Raised::Custom(raised)) if raised.eq_ignore_ascii_case(name)
            ),
        }
    }

    /// Call-stack snapshot, one frame per line
    pub fn stack_trace(&self) -> String {
        self.stack
            .iter()
            .map(|f| format!("  at {f}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "Runtime error on line {line}: {}", self.message),
            None => write!(f, "Runtime error: {}", self.message),
        }
    }
}

impl std::error::Error for RuntimeError {}

impl From<TypeError> for RuntimeError {
    fn from(e: TypeError) -> Self {
        let kind = match &e {
            TypeError::Conversion { .. } => ErrorKind::ConversionFailure,
            TypeError::Structure { .. } | TypeError::UnknownField { .. } => {
                ErrorKind::StructuralMismatch
            }
            TypeError::Layout { .. } | TypeError::Range { .. } => ErrorKind::TypeMismatch,
        };
        RuntimeError::new(kind, e.to_string())
    }
}

impl From<ArrayError> for RuntimeError {
    fn from(e: ArrayError) -> Self {
        match e {
            ArrayError::IndexOutOfBounds { .. } => RuntimeError::index_out_of_bounds(e.to_string()),
            ArrayError::Capacity { .. } => RuntimeError::capacity(e.to_string()),
            ArrayError::Unsupported { .. } | ArrayError::Empty => RuntimeError::invalid(e.to_string()),
            ArrayError::Conversion(inner) => inner.into(),
        }
    }
}

impl From<DbError> for RuntimeError {
    fn from(e: DbError) -> Self {
        RuntimeError::database(e.to_string())
    }
}

/// Result type for interpreter operations
pub type InterpResult<T> = Result<T, RuntimeError>;
