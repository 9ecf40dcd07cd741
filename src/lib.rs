//! Quince - composition and consistency for OOXML presentation packages
//!
//! Quince edits `.pptx` files structurally: it selects slides, shapes and
//! other nodes through typed selectors, clones, moves or removes them
//! together with the parts they depend on, and merges whole presentations
//! while keeping identifiers, relationships and content types consistent.
//!
//! # Features
//!
//! - **OPC layer**: parts, content types, relationships and the ZIP container
//! - **Selectors**: node kinds, attribute filters and occurrence rules compiled to path queries
//! - **Element mutation**: clone, move and remove with dependency tracking
//! - **Merge**: append presentations with masters, layouts, comments, sections and charts
//! - **Conversion**: drive an external LibreOffice to produce PDF, ODP or PPT
//!
//! # Example - Merging presentations
//!
//! ```no_run
//! use quince::ooxml::pptx::{MergeOptions, Package, merge_packages};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let target = Package::open("intro.pptx")?;
//! let appendix = Package::open("appendix.pptx")?;
//! let (merged, report) = merge_packages(target, &[appendix], &MergeOptions::default())?;
//! for diagnostic in &report.diagnostics {
//!     eprintln!("{diagnostic}");
//! }
//! merged.save("combined.pptx")?;
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Removing shapes
//!
//! ```no_run
//! use quince::ooxml::pptx::{ElementMutator, NodeKind, Package, Selector};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut pkg = Package::open("deck.pptx")?;
//! let images = Selector::new(NodeKind::Image);
//! let removed = ElementMutator::new(&mut pkg).remove_nodes(&images)?;
//! println!("removed {removed} images");
//! pkg.save("deck.pptx")?;
//! # Ok(())
//! # }
//! ```

/// Shared error types, the XML tree and identifier helpers
pub mod common;

/// Format conversion through an external renderer
pub mod convert;

/// OOXML packages and PresentationML operations
pub mod ooxml;

pub use common::{Error, Result};
pub use ooxml::pptx::{ElementMutator, MergeOptions, MergeReport, Package, Selector, merge_packages};
