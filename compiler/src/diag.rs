// diag.rs — Error kinds and diagnostics model
//
// `GraphError` is the single error type of the validate and schedule
// phases. Each variant carries a stable diagnostic code so the CLI (and any
// other caller) can report it uniformly alongside non-fatal warnings.
//
// Preconditions: none (types only).
// Postconditions: none (types only).
// Failure modes: none.
// Side effects: none.

use std::fmt;

use thiserror::Error;

// ── Diagnostic code ──────────────────────────────────────────────────────

/// A stable diagnostic code (e.g., `E0101`, `W0201`).
///
/// Once assigned, a code must never be reassigned to a different meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiagCode(pub &'static str);

impl fmt::Display for DiagCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Code registry. `E01xx` validation, `E02xx` scheduling, `W02xx` lints.
pub mod codes {
    use super::DiagCode;

    pub const E0101: DiagCode = DiagCode("E0101"); // duplicate input identifier
    pub const E0102: DiagCode = DiagCode("E0102"); // duplicate output identifier
    pub const E0103: DiagCode = DiagCode("E0103"); // invalid GLSL identifier
    pub const E0104: DiagCode = DiagCode("E0104"); // dangling edge
    pub const E0105: DiagCode = DiagCode("E0105"); // port count mismatch
    pub const E0201: DiagCode = DiagCode("E0201"); // undefined reference
    pub const E0202: DiagCode = DiagCode("E0202"); // cycle detected
    pub const W0201: DiagCode = DiagCode("W0201"); // node unreachable from sinks
}

// ── Errors ───────────────────────────────────────────────────────────────

/// Structural defect in a graph. Deterministic for a given graph; callers
/// never retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("duplicate input identifier '{0}'")]
    DuplicateInputIdentifier(String),
    #[error("duplicate output identifier '{0}'")]
    DuplicateOutputIdentifier(String),
    #[error("output identifier '{0}' is not a valid GLSL variable name")]
    InvalidIdentifier(String),
    #[error("bad edge {producer} -> {consumer}")]
    DanglingEdge { consumer: String, producer: String },
    #[error("node {node} has {found} {side} ports, its operator takes {expected}")]
    PortCountMismatch {
        node: String,
        side: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("'{0}' has no value and no producing node")]
    UndefinedReference(String),
    #[error("cycle detected at '{0}'")]
    CycleDetected(String),
}

impl GraphError {
    pub fn code(&self) -> DiagCode {
        match self {
            GraphError::DuplicateInputIdentifier(_) => codes::E0101,
            GraphError::DuplicateOutputIdentifier(_) => codes::E0102,
            GraphError::InvalidIdentifier(_) => codes::E0103,
            GraphError::DanglingEdge { .. } => codes::E0104,
            GraphError::PortCountMismatch { .. } => codes::E0105,
            GraphError::UndefinedReference(_) => codes::E0201,
            GraphError::CycleDetected(_) => codes::E0202,
        }
    }

    fn hint(&self) -> &'static str {
        match self {
            GraphError::DuplicateInputIdentifier(_) => {
                "input identifiers must be unique and may not be 'r', 'g' or 'b'"
            }
            GraphError::DuplicateOutputIdentifier(_) => {
                "output identifiers must be unique and may not be 'x', 'y' or 't'"
            }
            GraphError::InvalidIdentifier(_) => {
                "use [A-Za-z_][A-Za-z0-9_]* and avoid GLSL keywords and built-ins"
            }
            GraphError::DanglingEdge { .. } => {
                "edges must lead from a declared output (or x, y, t) to a declared input (or r, g, b)"
            }
            GraphError::PortCountMismatch { .. } => {
                "build nodes with the Node constructors so every port is named"
            }
            GraphError::UndefinedReference(_) => "bind the identifier to a node output",
            GraphError::CycleDetected(_) => "break the loop; values cannot depend on themselves",
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.to_string())
            .with_code(self.code())
            .with_hint(self.hint())
    }
}

// ── Severity level ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagLevel {
    Error,
    Warning,
}

// ── Diagnostic ───────────────────────────────────────────────────────────

/// A reportable message: a converted `GraphError` or a compile warning.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub code: Option<DiagCode>,
    pub level: DiagLevel,
    pub message: String,
    pub hint: Option<String>,
}

impl Diagnostic {
    pub fn new(level: DiagLevel, message: impl Into<String>) -> Self {
        Self {
            code: None,
            level,
            message: message.into(),
            hint: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(DiagLevel::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(DiagLevel::Warning, message)
    }

    /// Attach a stable diagnostic code.
    pub fn with_code(mut self, code: DiagCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Attach a remediation hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<&GraphError> for Diagnostic {
    fn from(err: &GraphError) -> Self {
        err.to_diagnostic()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            DiagLevel::Error => "error",
            DiagLevel::Warning => "warning",
        };
        if let Some(code) = &self.code {
            write!(f, "{}[{}]: {}", level, code, self.message)?;
        } else {
            write!(f, "{}: {}", level, self.message)?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "\n  hint: {}", hint)?;
        }
        Ok(())
    }
}
