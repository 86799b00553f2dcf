use serde::Serialize;

/// A fatal compile error. One error aborts the compilation unit it was
/// raised in; there is no recovery and no partial artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind")]
pub enum CompileError {
    /// A character (or character sequence) the lexer does not recognize.
    #[error("line {line}: {message}")]
    Lex { line: u32, message: String },

    /// The token stream does not match the grammar at the current position.
    #[error("line {line}: expected {expected}, found {found}")]
    Parse {
        line: u32,
        expected: String,
        found: String,
    },

    /// A guard or action references placeholders that resolve to nothing.
    #[error("rule {rule} ({intention}): cannot resolve {}: {message}", .names.join(", "))]
    Binding {
        rule: usize,
        intention: String,
        names: Vec<String>,
        message: String,
    },

    /// Two rules for the same intention disagree on the formal parameter shape.
    #[error("rule {rule} ({intention}): parameter shape {found} conflicts with {expected}")]
    ShapeConflict {
        rule: usize,
        intention: String,
        expected: String,
        found: String,
    },

    /// A comparison the backend cannot express.
    #[error("rule {rule} ({intention}): unsupported comparison '{operator}' in {context}")]
    UnsupportedOperator {
        rule: usize,
        intention: String,
        operator: String,
        context: String,
    },

    /// A CONT marker with a bad offset or in a position it cannot continue from.
    #[error("rule {rule} ({intention}): malformed {marker}: {message}")]
    MalformedCont {
        rule: usize,
        intention: String,
        marker: String,
        message: String,
    },
}

impl CompileError {
    pub fn lex(line: u32, message: impl Into<String>) -> Self {
        CompileError::Lex {
            line,
            message: message.into(),
        }
    }

    pub fn parse(line: u32, expected: impl Into<String>, found: impl Into<String>) -> Self {
        CompileError::Parse {
            line,
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Short machine-friendly name of the error class.
    pub fn kind(&self) -> &'static str {
        match self {
            CompileError::Lex { .. } => "LexError",
            CompileError::Parse { .. } => "ParseError",
            CompileError::Binding { .. } => "BindingError",
            CompileError::ShapeConflict { .. } => "ShapeConflictError",
            CompileError::UnsupportedOperator { .. } => "UnsupportedOperatorError",
            CompileError::MalformedCont { .. } => "MalformedContError",
        }
    }

    /// Rule index the error belongs to, when it was raised by a backend.
    pub fn rule(&self) -> Option<usize> {
        match self {
            CompileError::Lex { .. } | CompileError::Parse { .. } => None,
            CompileError::Binding { rule, .. }
            | CompileError::ShapeConflict { rule, .. }
            | CompileError::UnsupportedOperator { rule, .. }
            | CompileError::MalformedCont { rule, .. } => Some(*rule),
        }
    }

    /// Serialize for `--output json` diagnostics.
    pub fn to_json_value(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or(serde_json::Value::Null);
        if let Some(obj) = value.as_object_mut() {
            obj.insert("kind".into(), self.kind().into());
            obj.insert("message".into(), self.to_string().into());
        }
        value
    }
}
