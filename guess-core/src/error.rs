use guess_types::{ErrorCode, ErrorResponse};
use thiserror::Error;

use crate::store::StoreError;
use crate::validation::ValidationError;

/// How a failure should be treated by callers and by the retry boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Caller error, never retried
    Validation,
    /// Transient store failure, retried with backoff
    Connection,
    /// Corrupt or unexpected payload, never retried
    Data,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(ValidationError),

    #[error("invalid guess payload: {0}")]
    InvalidGuessPayload(ValidationError),

    #[error("store unavailable during {operation} after {attempts} attempts: {source}")]
    Unavailable {
        operation: &'static str,
        attempts: u32,
        #[source]
        source: StoreError,
    },

    #[error("data error during {operation}: {message}")]
    Data {
        operation: &'static str,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, LedgerError>;

impl LedgerError {
    pub fn data(operation: &'static str, message: impl Into<String>) -> Self {
        LedgerError::Data {
            operation,
            message: message.into(),
        }
    }

    pub fn class(&self) -> FailureClass {
        match self {
            LedgerError::InvalidIdentifier(_) | LedgerError::InvalidGuessPayload(_) => {
                FailureClass::Validation
            }
            LedgerError::Unavailable { .. } => FailureClass::Connection,
            LedgerError::Data { .. } => FailureClass::Data,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            LedgerError::InvalidIdentifier(_) => ErrorCode::InvalidIdentifier,
            LedgerError::InvalidGuessPayload(_) => ErrorCode::InvalidGuessPayload,
            LedgerError::Unavailable { .. } => ErrorCode::ServiceUnavailable,
            LedgerError::Data { .. } => ErrorCode::DataError,
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.code(),
            message: self.to_string(),
        }
    }
}

impl From<ValidationError> for LedgerError {
    fn from(err: ValidationError) -> Self {
        if err.is_identifier_error() {
            LedgerError::InvalidIdentifier(err)
        } else {
            LedgerError::InvalidGuessPayload(err)
        }
    }
}
