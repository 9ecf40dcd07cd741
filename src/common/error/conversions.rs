//! Error conversion implementations.
//!
//! From trait implementations mapping the layered internal errors onto the
//! unified [`Error`] kinds.

use super::types::Error;
use crate::common::xml::XmlError;
use crate::ooxml::error::OoxmlError;
use crate::ooxml::opc::error::OpcError;

impl From<OpcError> for Error {
    fn from(err: OpcError) -> Self {
        match err {
            OpcError::IoError(e) => Error::Io(e),
            OpcError::ZipError(e) => Error::ZipError(e.to_string()),
            OpcError::Xml(e) => Error::XmlError(e.to_string()),
            OpcError::PartNotFound(s) => Error::PartNotFound(s),
            OpcError::ContentTypeUnresolved(s) => Error::ContentTypeUnresolved(s),
            other => Error::Other(other.to_string()),
        }
    }
}

impl From<OoxmlError> for Error {
    fn from(err: OoxmlError) -> Self {
        match err {
            OoxmlError::Opc(e) => Error::from(e),
            OoxmlError::Xml(e) => Error::XmlError(e.to_string()),
            OoxmlError::PartNotFound(s) => Error::PartNotFound(s),
            OoxmlError::InvalidSelector(s) => Error::InvalidSelector(s),
            OoxmlError::InvalidFormat(s) => Error::InvalidFormat(s),
            OoxmlError::UnknownChartType(s) => Error::UnknownChartType(s),
            OoxmlError::Io(e) => Error::Io(e),
            other => Error::Other(other.to_string()),
        }
    }
}

impl From<XmlError> for Error {
    fn from(err: XmlError) -> Self {
        Error::XmlError(err.to_string())
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error::ZipError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opc_kinds_survive_conversion() {
        let err: Error = OpcError::ContentTypeUnresolved("/ppt/x.bin".to_string()).into();
        assert!(matches!(err, Error::ContentTypeUnresolved(ref p) if p == "/ppt/x.bin"));

        let err: Error = OoxmlError::Opc(OpcError::PartNotFound("/a.xml".into())).into();
        assert!(matches!(err, Error::PartNotFound(_)));
    }

    #[test]
    fn test_selector_kind_survives_conversion() {
        let err: Error = OoxmlError::InvalidSelector("missing sizeX".into()).into();
        assert_eq!(err.to_string(), "Invalid selector: missing sizeX");
    }
}
