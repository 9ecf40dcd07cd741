/// Error types for presentation-level operations.
use crate::common::xml::XmlError;
use thiserror::Error;

/// Result type for OOXML operations.
pub type Result<T> = std::result::Result<T, OoxmlError>;

/// Error types for OOXML operations.
#[derive(Error, Debug)]
pub enum OoxmlError {
    /// OPC package error
    #[error("OPC error: {0}")]
    Opc(#[from] crate::ooxml::opc::error::OpcError),

    /// XML parsing or tree error
    #[error("XML error: {0}")]
    Xml(#[from] XmlError),

    /// Part not found
    #[error("Part not found: {0}")]
    PartNotFound(String),

    /// Selector or placement input is malformed or incomplete
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    /// Invalid content type
    #[error("Invalid content type: expected {expected}, got {got}")]
    InvalidContentType { expected: String, got: String },

    /// Invalid relationship
    #[error("Invalid relationship: {0}")]
    InvalidRelationship(String),

    /// Invalid format
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Chart plot-area tag missing from the family table
    #[error("Unknown chart type: {0}")]
    UnknownChartType(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
