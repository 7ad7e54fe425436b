//! Error types for report generation
//!
//! Fatal conditions that stop a run are [`ReportError`] variants. Recoverable
//! problems (partial fetches, malformed records) never surface here; they are
//! accumulated into the report's diagnostics instead.

use crate::model::Collection;
use thiserror::Error;

/// The main error type for a report run
#[derive(Error, Debug)]
pub enum ReportError {
    /// No usable AWS credentials could be resolved
    #[error("Credential error: {0}")]
    Credentials(String),

    /// The service rejected our credentials or denied access
    #[error("Authorization failed while fetching {collection}: {message}")]
    Unauthorized {
        collection: Collection,
        message: String,
    },

    /// Region identifier is malformed
    #[error("Invalid AWS region: {0}")]
    InvalidRegion(String),

    /// Configuration is incomplete (e.g. no region anywhere)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A mandatory collection was absent, as opposed to empty
    #[error("Missing required data: {collection} collection was not available")]
    MissingRequiredData { collection: Collection },

    /// Job summary failed its post-condition check
    #[error("Job summary counted {counted} jobs but {ingested} were ingested")]
    SummaryMismatch { counted: usize, ingested: usize },

    /// Writing an output file failed
    #[error("Output error: {0}")]
    Output(String),
}

impl ReportError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Credentials(_) | Self::Unauthorized { .. } => 2,
            Self::MissingRequiredData { .. } => 3,
            _ => 1,
        }
    }

    /// Check if this is a credential or authorization failure
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Credentials(_) | Self::Unauthorized { .. })
    }
}

impl From<std::io::Error> for ReportError {
    fn from(err: std::io::Error) -> Self {
        Self::Output(err.to_string())
    }
}

impl From<serde_json::Error> for ReportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Output(err.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for ReportError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        Self::Output(err.to_string())
    }
}

/// Result type alias for report operations
pub type ReportResult<T> = Result<T, ReportError>;
