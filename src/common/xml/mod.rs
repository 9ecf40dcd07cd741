//! XML helpers: escaping and the arena tree that every part edit goes through.

pub mod dom;
pub mod escape;

pub use dom::{Attribute, NodeId, XmlDocument};
pub use escape::{escape_xml, unescape_xml};

use thiserror::Error;

/// Errors raised while reading or building an XML tree.
#[derive(Error, Debug)]
pub enum XmlError {
    #[error("XML syntax error: {0}")]
    Syntax(String),

    #[error("XML structure error: {0}")]
    Structure(String),

    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

impl From<quick_xml::Error> for XmlError {
    fn from(err: quick_xml::Error) -> Self {
        XmlError::Syntax(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for XmlError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        XmlError::Syntax(err.to_string())
    }
}
