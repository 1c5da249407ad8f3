use serde::{Deserialize, Serialize};

/// Errors returned for invalid arguments to the markup pipeline.
///
/// Problems with the manuscript itself never surface here; they are reported
/// as [`Diagnostic`]s and rendering continues.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarkupError {
    #[error("Batch size must be at least 1")]
    ZeroBatchSize,
}

/// A diagnostic message produced while rendering the manuscript.
///
/// Diagnostics are non-fatal: the renderer downgrades the offending construct
/// (e.g. falls back to escaped text) and keeps going.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// 1-based line in the preprocessed manuscript.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl Diagnostic {
    pub fn warning(code: &str, message: impl Into<String>, line: Option<usize>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            line,
            code: Some(code.to_string()),
        }
    }

    pub fn info(code: &str, message: impl Into<String>, line: Option<usize>) -> Self {
        Self {
            severity: Severity::Info,
            message: message.into(),
            line,
            code: Some(code.to_string()),
        }
    }
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warning => f.write_str("warning"),
            Severity::Info => f.write_str("info"),
        }
    }
}
