//! Runtime failures and the coded error surface handed to embedders.

use serde::Serialize;
use thiserror::Error;

/// A failure raised while executing a program. All variants are terminal for
/// the current run; the evaluator never retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("variable '{0}' is not defined")]
    VariableNotFound(String),
    #[error("attribute '{0}' is not defined")]
    AttributeNotFound(String),
    #[error("class '{class}' has no method '{name}' taking {arity} argument(s)")]
    MethodNotFound {
        class: String,
        name: String,
        arity: usize,
    },
    #[error("type error: {0}")]
    TypeError(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("maximum call depth of {0} exceeded")]
    StackOverflow(usize),
    #[error("output error: {0}")]
    Io(String),
}

/// Stable error category, one per code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NameResolution,
    TypeMismatch,
    InvalidOperation,
    RuntimePanic,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::NameResolution => "E001",
            ErrorCode::TypeMismatch => "E002",
            ErrorCode::InvalidOperation => "E003",
            ErrorCode::RuntimePanic => "E004",
        }
    }
}

/// The single structured failure an embedder receives: a stable code plus a
/// human-readable message. Serializable so hosts can emit machine-readable
/// failure reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("[{}] {message}", .code.as_str())]
pub struct ScriptError {
    pub code: ErrorCode,
    pub message: String,
}

impl ScriptError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }
}

impl From<RuntimeError> for ScriptError {
    fn from(value: RuntimeError) -> Self {
        ScriptError::new(runtime_error_code(&value), value.to_string())
    }
}

pub fn runtime_error_code(error: &RuntimeError) -> ErrorCode {
    match error {
        RuntimeError::VariableNotFound(_)
        | RuntimeError::AttributeNotFound(_)
        | RuntimeError::MethodNotFound { .. } => ErrorCode::NameResolution,
        RuntimeError::TypeError(_) => ErrorCode::TypeMismatch,
        RuntimeError::DivisionByZero => ErrorCode::InvalidOperation,
        RuntimeError::StackOverflow(_) | RuntimeError::Io(_) => ErrorCode::RuntimePanic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(ErrorCode::NameResolution.as_str(), "E001");
        assert_eq!(ErrorCode::TypeMismatch.as_str(), "E002");
        assert_eq!(ErrorCode::InvalidOperation.as_str(), "E003");
        assert_eq!(ErrorCode::RuntimePanic.as_str(), "E004");
    }

    #[test]
    fn runtime_errors_map_to_codes() {
        let err = ScriptError::from(RuntimeError::VariableNotFound("x".into()));
        assert_eq!(err.code, ErrorCode::NameResolution);
        assert_eq!(err.message, "variable 'x' is not defined");
        assert_eq!(err.to_string(), "[E001] variable 'x' is not defined");

        assert_eq!(
            ScriptError::from(RuntimeError::DivisionByZero).code_str(),
            "E003"
        );
        assert_eq!(
            ScriptError::from(RuntimeError::TypeError("bad".into())).code,
            ErrorCode::TypeMismatch
        );
        assert_eq!(
            ScriptError::from(RuntimeError::StackOverflow(8)).code,
            ErrorCode::RuntimePanic
        );
    }
}
