/// Error types for OPC package operations
use crate::common::xml::XmlError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpcError {
    #[error("Package not found: {0}")]
    PackageNotFound(String),

    #[error("Invalid pack URI: {0}")]
    InvalidPackUri(String),

    #[error("Part not found: {0}")]
    PartNotFound(String),

    #[error("Relationship not found: {0}")]
    RelationshipNotFound(String),

    #[error("Content type unresolved for partname: {0}")]
    ContentTypeUnresolved(String),

    #[error("Invalid relationship: {0}")]
    InvalidRelationship(String),

    #[error("No free identifier left in {floor}..={ceiling}")]
    IdSpaceExhausted { floor: u32, ceiling: u32 },

    #[error("Invalid content types manifest: {0}")]
    InvalidContentTypes(String),

    #[error(transparent)]
    Xml(#[from] XmlError),

    #[error("ZIP error: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, OpcError>;
