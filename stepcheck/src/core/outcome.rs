//! Validation outcomes and step-level errors.

use std::fmt;

use serde::Serialize;

use crate::core::model::{Step, StepId};

/// Message recorded when the runner answers with the wrong message type.
pub const INVALID_RESPONSE_MESSAGE: &str = "Invalid response from runner for Validation request";

/// Reason a step failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    StepImplementationNotFound,
    DuplicateStepImplementation,
    /// Any other reason reported by the runner, in its wire spelling.
    Other(String),
    /// The runner replied with an unexpected message type.
    InvalidResponse,
}

impl ErrorKind {
    /// Parse the runner's error type. Empty input means "not found".
    pub fn from_wire(raw: &str) -> Self {
        match raw {
            "" | "STEP_IMPLEMENTATION_NOT_FOUND" => Self::StepImplementationNotFound,
            "DUPLICATE_STEP_IMPLEMENTATION" => Self::DuplicateStepImplementation,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::StepImplementationNotFound => "STEP_IMPLEMENTATION_NOT_FOUND",
            Self::DuplicateStepImplementation => "DUPLICATE_STEP_IMPLEMENTATION",
            Self::Other(raw) => raw,
            Self::InvalidResponse => "INVALID_RESPONSE",
        }
    }

    /// Human-readable message, e.g. `Step implementation not found`.
    pub fn message(&self) -> String {
        humanize(self.as_str())
    }
}

impl Serialize for ErrorKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Underscores to spaces, lower-case, first letter upper-cased.
pub fn humanize(raw: &str) -> String {
    let lower = raw.replace('_', " ").to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Result of checking one step text against the runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Valid,
    Invalid {
        message: String,
        kind: Option<ErrorKind>,
    },
}

impl Outcome {
    pub fn invalid(kind: ErrorKind) -> Self {
        Self::Invalid {
            message: kind.message(),
            kind: Some(kind),
        }
    }

    pub fn invalid_response() -> Self {
        Self::Invalid {
            message: INVALID_RESPONSE_MESSAGE.to_string(),
            kind: Some(ErrorKind::InvalidResponse),
        }
    }

    /// Failure without a runner-supplied kind (transport errors).
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
            kind: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// A step that cannot be executed, attributed to the file to fix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepValidationError {
    #[serde(skip)]
    pub step: StepId,
    pub file_name: String,
    pub line_no: usize,
    pub line_text: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
}

impl StepValidationError {
    pub fn new(
        step: &Step,
        message: impl Into<String>,
        file_name: impl Into<String>,
        kind: Option<ErrorKind>,
    ) -> Self {
        Self {
            step: step.id,
            file_name: file_name.into(),
            line_no: step.line_no,
            line_text: step.line_text.clone(),
            message: message.into(),
            kind,
        }
    }
}

impl fmt::Display for StepValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {} => '{}'",
            self.file_name, self.line_no, self.message, self.line_text
        )
    }
}

impl std::error::Error for StepValidationError {}
