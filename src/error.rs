//! Error types for pagelayout library.

use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for pagelayout operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during layout analysis.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error (de)serializing page primitives or layout output.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A primitive has degenerate or non-finite geometry.
    #[error("Malformed input: {0}")]
    InputMalformed(String),

    /// A detector produced no usable candidate.
    #[error("Ambiguous detection: {0}")]
    DetectionAmbiguous(String),

    /// Candidate counts exceeded a configured ceiling.
    #[error("Resource limit exceeded: {0}")]
    ResourceExhausted(String),

    /// The page geometry reported by the collaborator is unusable.
    #[error("Invalid page {0}: {1}")]
    InvalidPage(usize, String),

    /// The collaborator could not supply primitives for a page.
    #[error("Missing primitives for page {0}: {1}")]
    MissingPrimitives(usize, String),

    /// Page index is out of range.
    #[error("Page {0} is out of range (source has {1} pages)")]
    PageOutOfRange(usize, usize),

    /// Configuration values are inconsistent.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Page processing was abandoned between stages.
    #[error("Processing of page {0} was cancelled")]
    Cancelled(usize),

    /// Error during rendering (Markdown, CSV, SVG, JSON).
    #[error("Rendering error: {0}")]
    Render(String),
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::Render(format!("CSV error: {}", err))
    }
}

impl Error {
    /// Diagnostic category for errors that can be recorded on a page.
    pub fn diagnostic_kind(&self) -> DiagnosticKind {
        match self {
            Error::InputMalformed(_) => DiagnosticKind::InputMalformed,
            Error::DetectionAmbiguous(_) => DiagnosticKind::DetectionAmbiguous,
            Error::ResourceExhausted(_) => DiagnosticKind::ResourceExhausted,
            _ => DiagnosticKind::Internal,
        }
    }
}

/// Category of a recorded, non-fatal problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// An element was skipped because of degenerate geometry.
    InputMalformed,
    /// A stage fell back to its default result.
    DetectionAmbiguous,
    /// A stage hit an iteration or size ceiling and returned a partial result.
    ResourceExhausted,
    /// Any other isolated failure.
    Internal,
}

/// Pipeline stage a diagnostic was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Ingest,
    Columns,
    TextBlocks,
    Tables,
    Figures,
    Captions,
    ReadingOrder,
}

/// A non-fatal problem recorded while analyzing a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Problem category
    pub kind: DiagnosticKind,
    /// Stage that raised it
    pub stage: Stage,
    /// Human-readable description
    pub message: String,
}

impl Diagnostic {
    /// Create a new diagnostic.
    pub fn new(kind: DiagnosticKind, stage: Stage, message: impl Into<String>) -> Self {
        Self {
            kind,
            stage,
            message: message.into(),
        }
    }

    /// Record an error raised by a stage.
    pub fn from_error(stage: Stage, err: &Error) -> Self {
        Self::new(err.diagnostic_kind(), stage, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Cancelled(3);
        assert_eq!(err.to_string(), "Processing of page 3 was cancelled");

        let err = Error::PageOutOfRange(10, 5);
        assert_eq!(
            err.to_string(),
            "Page 10 is out of range (source has 5 pages)"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_diagnostic_from_error() {
        let err = Error::ResourceExhausted("too many paths".to_string());
        let diag = Diagnostic::from_error(Stage::Figures, &err);
        assert_eq!(diag.kind, DiagnosticKind::ResourceExhausted);
        assert_eq!(diag.stage, Stage::Figures);
        assert!(diag.message.contains("too many paths"));
    }
}
