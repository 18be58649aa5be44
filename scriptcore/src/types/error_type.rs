//! Standard exception kinds usable in `raise` and `when`

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorType {
    /// Matches every error
    AnyError,
    IoError,
    DbError,
    TypeError,
    NullError,
    IndexError,
    MathError,
    ParseError,
    NetworkError,
    NotFoundError,
    AccessError,
    ValidationError,
}

impl ErrorType {
    pub const ALL: [ErrorType; 12] = [
        ErrorType::AnyError,
        ErrorType::IoError,
        ErrorType::DbError,
        ErrorType::TypeError,
        ErrorType::NullError,
        ErrorType::IndexError,
        ErrorType::MathError,
        ErrorType::ParseError,
        ErrorType::NetworkError,
        ErrorType::NotFoundError,
        ErrorType::AccessError,
        ErrorType::ValidationError,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ErrorType::AnyError => "ANY_ERROR",
            ErrorType::IoError => "IO_ERROR",
            ErrorType::DbError => "DB_ERROR",
            ErrorType::TypeError => "TYPE_ERROR",
            ErrorType::NullError => "NULL_ERROR",
            ErrorType::IndexError => "INDEX_ERROR",
            ErrorType::MathError => "MATH_ERROR",
            ErrorType::ParseError => "PARSE_ERROR",
            ErrorType::NetworkError => "NETWORK_ERROR",
            ErrorType::NotFoundError => "NOT_FOUND_ERROR",
            ErrorType::AccessError => "ACCESS_ERROR",
            ErrorType::ValidationError => "VALIDATION_ERROR",
        }
    }

    pub fn from_name(name: &str) -> Option<ErrorType> {
        Self::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
