// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error handling for accl operations
//!
//! All fatal conditions in the transfer protocol are local, synchronous and
//! non-retriable. `Code::Unsupported` is a distinct code so callers can
//! branch on configurations this engine refuses (multi-node transfers).

use std::fmt;

/// Error codes for classifying failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Code {
    Ok = 0,
    Invalid = 1,
    Unsupported = 2,
    Precondition = 3,
    Timeout = 4,
    Communication = 5,
    IndexError = 6,
    ExecutionError = 7,
    UnknownError = 9,
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Code::Ok => write!(f, "OK"),
            Code::Invalid => write!(f, "Invalid"),
            Code::Unsupported => write!(f, "Unsupported"),
            Code::Precondition => write!(f, "Precondition violation"),
            Code::Timeout => write!(f, "Timeout"),
            Code::Communication => write!(f, "Communication error"),
            Code::IndexError => write!(f, "Index error"),
            Code::ExecutionError => write!(f, "Execution error"),
            Code::UnknownError => write!(f, "Unknown error"),
        }
    }
}

/// Main error type for accl operations
#[derive(thiserror::Error, Debug)]
pub enum AcclError {
    #[error("Invalid operation: {0}")]
    Invalid(String),

    /// Configuration this engine refuses before any protocol step begins,
    /// e.g. a transfer spanning more than one node.
    #[error("Not supported: {0}")]
    Unsupported(String),

    /// Fatal precondition violation, e.g. a null exchanged handle or a
    /// registry slot that was never filled. Never retried.
    #[error("Precondition violation: {0}")]
    Precondition(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Communication error: {0}")]
    Communication(String),

    #[error("Index out of bounds: {0}")]
    IndexError(String),

    #[error("Generic error with code {code}: {message}")]
    Generic { code: Code, message: String },
}

impl AcclError {
    /// Create a new error with a specific code and message
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        AcclError::Generic {
            code,
            message: message.into(),
        }
    }

    /// Get the error code
    pub fn code(&self) -> Code {
        match self {
            AcclError::Invalid(_) => Code::Invalid,
            AcclError::Unsupported(_) => Code::Unsupported,
            AcclError::Precondition(_) => Code::Precondition,
            AcclError::Timeout(_) => Code::Timeout,
            AcclError::Communication(_) => Code::Communication,
            AcclError::IndexError(_) => Code::IndexError,
            AcclError::Generic { code, .. } => *code,
        }
    }
}

/// Type alias for Results using AcclError
pub type AcclResult<T> = Result<T, AcclError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_mapping() {
        let err = AcclError::Unsupported("multi-node".to_string());
        assert_eq!(err.code(), Code::Unsupported);

        let err = AcclError::new(Code::Timeout, "peer never acknowledged");
        assert_eq!(err.code(), Code::Timeout);
    }

    #[test]
    fn test_display() {
        let err = AcclError::Precondition("no pointer from peer".to_string());
        assert!(err.to_string().contains("no pointer from peer"));
    }
}
