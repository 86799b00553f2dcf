use std::fmt;

use causal_core::{CompileError, Rule};

/// Error type for code generation operations.
#[derive(Debug, Clone)]
pub enum CodegenError {
    /// A backend rejected the program.
    Compile(CompileError),
    /// A template does not contain a required insertion marker.
    MissingMarker { template: String, marker: String },
    /// An I/O error occurred while reading a template or writing an artifact.
    IoError(String),
}

impl fmt::Display for CodegenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodegenError::Compile(e) => write!(f, "{}: {}", e.kind(), e),
            CodegenError::MissingMarker { template, marker } => {
                write!(f, "template {} has no '{}' marker", template, marker)
            }
            CodegenError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for CodegenError {}

impl From<CompileError> for CodegenError {
    fn from(e: CompileError) -> Self {
        CodegenError::Compile(e)
    }
}

impl CodegenError {
    pub fn to_json_value(&self) -> serde_json::Value {
        match self {
            CodegenError::Compile(e) => e.to_json_value(),
            other => serde_json::json!({
                "kind": "CodegenError",
                "message": other.to_string(),
            }),
        }
    }
}

// ── Rule-scoped compile errors ───────────────────────────────────────

pub(crate) fn binding(rule: &Rule, names: Vec<String>, message: impl Into<String>) -> CompileError {
    CompileError::Binding {
        rule: rule.index,
        intention: rule.intention().name.clone(),
        names,
        message: message.into(),
    }
}

pub(crate) fn unsupported(
    rule: &Rule,
    operator: impl ToString,
    context: impl Into<String>,
) -> CompileError {
    CompileError::UnsupportedOperator {
        rule: rule.index,
        intention: rule.intention().name.clone(),
        operator: operator.to_string(),
        context: context.into(),
    }
}

pub(crate) fn malformed_cont(rule: &Rule, k: u32, message: impl Into<String>) -> CompileError {
    CompileError::MalformedCont {
        rule: rule.index,
        intention: rule.intention().name.clone(),
        marker: format!("CONT{}", k),
        message: message.into(),
    }
}
