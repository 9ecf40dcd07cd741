/// Open Packaging Conventions (OPC) layer.
///
/// Named parts, the content-type manifest, per-part relationship sets and
/// the ZIP container underneath them:
///
/// - [`OpcPackage`] stores parts and resolves content types
/// - [`Relationships`] is the typed reference set owned by one part
/// - [`PackURI`] handles part-name arithmetic (relative targets, `.rels` locations)
pub mod constants;
pub mod content_types;
pub mod error;
pub mod package;
pub mod packuri;
pub mod phys_pkg;
pub mod rel;

// Re-export commonly used types
pub use content_types::ContentTypes;
pub use package::{OpcPackage, Part};
pub use packuri::PackURI;
pub use rel::{Relationship, Relationships};
