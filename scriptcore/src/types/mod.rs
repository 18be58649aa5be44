//! Value type system
//!
//! Type tags and their conversion rules, structural record schemas and
//! packed bitmap / intmap layouts.

mod data_type;
mod error_type;
mod packed;
mod record;

pub use data_type::{parse_date, DataType};
pub use error_type::ErrorType;
pub use packed::{BitField, BitmapType, IntmapType, PackedLayout};
pub use record::{FieldType, RecordField, RecordType};

use thiserror::Error;

/// Failure inside the type system
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TypeError {
    /// A value cannot be coerced to the target type
    #[error("{message}")]
    Conversion { message: String },

    /// Record shape does not match its schema
    #[error("{message}")]
    Structure { message: String },

    /// Invalid bitmap / intmap declaration
    #[error("{message}")]
    Layout { message: String },

    /// Packed field value does not fit its bit width
    #[error("{message}")]
    Range { message: String },

    #[error("{message}")]
    UnknownField { message: String },
}

impl TypeError {
    pub fn conversion(message: impl Into<String>) -> Self {
        Self::Conversion {
            message: message.into(),
        }
    }

    pub fn structure(message: impl Into<String>) -> Self {
        Self::Structure {
            message: message.into(),
        }
    }

    pub fn layout(message: impl Into<String>) -> Self {
        Self::Layout {
            message: message.into(),
        }
    }

    pub fn range(message: impl Into<String>) -> Self {
        Self::Range {
            message: message.into(),
        }
    }

    pub fn unknown_field(message: impl Into<String>) -> Self {
        Self::UnknownField {
            message: message.into(),
        }
    }
}
