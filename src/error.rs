//! Error types for fetching, decoding and combining rasters.

use chrono::NaiveDate;
use thiserror::Error;

/// Main error type for the pipeline.
#[derive(Error, Debug)]
pub enum LwfError {
    /// HTTP request failed before a response was received
    #[error("HTTP request to {url} failed: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Server answered with an unexpected status
    #[error("HTTP request to {url} returned status {status}")]
    HttpStatus { url: String, status: u16 },

    /// The source file for a date does not exist
    #[error("Source not found: {0}")]
    NotFound(String),

    /// The archive was fetched but does not hold the expected member
    #[error("No member matching `{pattern}` in archive {archive}")]
    MissingMember { archive: String, pattern: String },

    /// Malformed grid file
    #[error("Failed to parse grid: {0}")]
    GridParse(String),

    /// Two rasters that should be aligned are not
    #[error("Grid mismatch: expected {expected}, found {found}")]
    GridMismatch { expected: String, found: String },

    /// The area of interest does not overlap a grid, or is malformed
    #[error("Invalid bounding box: {0}")]
    InvalidBoundingBox(String),

    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LwfError {
    /// True when the error means "no data published for this date" rather
    /// than a failure to talk to the source.
    pub fn is_missing(&self) -> bool {
        matches!(self, LwfError::NotFound(_) | LwfError::MissingMember { .. })
    }
}

/// Type alias for Results using LwfError
pub type Result<T> = std::result::Result<T, LwfError>;
