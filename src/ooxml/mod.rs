//! Office Open XML (OOXML) presentation packages.
//!
//! Two layers:
//!
//! 1. **OPC Layer** (`opc`): parts, content types, relationships, ZIP container
//! 2. **PresentationML** (`pptx`): selectors, element mutation and package merge
//!
//! # Example: merging decks
//!
//! ```rust,no_run
//! use quince::ooxml::pptx::{MergeOptions, Package, merge_packages};
//!
//! let target = Package::open("intro.pptx")?;
//! let extra = Package::open("appendix.pptx")?;
//! let (merged, report) = merge_packages(target, &[extra], &MergeOptions::default())?;
//! merged.save("combined.pptx")?;
//! println!("{} slides added", report.slides_added);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
pub mod error;
pub mod opc;
pub mod pptx;

// Re-export commonly used types from OPC layer
pub use error::{OoxmlError, Result};
pub use opc::{OpcPackage, PackURI};
