//! Unified error types for quince.
//!
//! Package-layer and presentation-layer errors funnel into this type at the
//! crate boundary so callers match on one set of kinds.
use thiserror::Error;

/// Main error type for quince operations.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// XML parsing error
    #[error("XML error: {0}")]
    XmlError(String),

    /// ZIP archive error
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// No default or override rule resolves the part's content type
    #[error("Content type unresolved for part: {0}")]
    ContentTypeUnresolved(String),

    /// A referenced part is missing from the package
    #[error("Part not found: {0}")]
    PartNotFound(String),

    /// Selector or placement input is missing required fields or malformed
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    /// Invalid file format
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Chart plot-area tag not present in the chart family table
    #[error("Unknown chart type: {0}")]
    UnknownChartType(String),

    /// Source/target extension pair is outside the supported conversion set
    #[error("Unsupported format conversion: {from} -> {to}")]
    UnsupportedFormatConversion { from: String, to: String },

    /// External renderer exited unsuccessfully
    #[error("Conversion failed: {status}")]
    ConversionFailed { status: String },

    /// Option or selector document could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Result type for quince operations.
pub type Result<T> = std::result::Result<T, Error>;
