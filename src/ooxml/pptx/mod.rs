//! PresentationML packages: structural queries, element mutation and merge.
//!
//! - [`Package`] wraps an [`OpcPackage`](crate::ooxml::opc::OpcPackage) with
//!   the presentation-level views (slide list, masters, sections).
//! - [`query`] compiles [`Selector`]s over a static node-kind registry into
//!   path queries and evaluates them against one part.
//! - [`ElementMutator`] clones, moves and removes selected nodes. Slide-level
//!   operations also carry the parts a slide depends on.
//! - [`merge_packages`] appends whole presentations, producing a
//!   [`MergeReport`] with diagnostics for references that could not be kept.
//!
//! # Example
//!
//! ```rust,no_run
//! use quince::ooxml::pptx::{ElementMutator, NodeKind, Occurrence, Package, Selector};
//!
//! let mut pkg = Package::open("deck.pptx")?;
//! let last = Selector::new(NodeKind::Slide).occurrence(Occurrence::Last);
//! ElementMutator::new(&mut pkg).clone_nodes(&last)?;
//! pkg.save("deck-copy.pptx")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
pub mod chart;
pub mod comments;
pub mod connector;
pub mod ids;
pub mod merge;
pub mod mutate;
pub mod package;
pub mod presentation;
pub mod query;
pub mod sections;
pub mod utilities;

#[cfg(test)]
pub(crate) mod testutil;

pub use chart::{ChartFamily, ChartKind};
pub use connector::{ConnectorSpec, Side, add_connector};
pub use merge::{DiagnosticKind, MergeDiagnostic, MergeOptions, MergeReport, merge_packages};
pub use mutate::ElementMutator;
pub use package::Package;
pub use presentation::Presentation;
pub use query::{NodeKind, Occurrence, QueryInfo, QueryOptions, Selection, Selector, query_info, select, select_in};
pub use sections::Section;
pub use utilities::{remove_slides, search_and_replace, split};
