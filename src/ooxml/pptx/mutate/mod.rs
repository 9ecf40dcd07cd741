//! Clone, move and remove driven by selector matches.
//!
//! Every operation resolves its selector with the query compiler, edits the
//! matched part through the XML tree and writes it back in one go. A
//! selector that matches nothing leaves the package untouched and reports
//! `0`.
//!
//! ```rust,no_run
//! use quince::ooxml::pptx::{ElementMutator, NodeKind, Package, Selector};
//!
//! let mut pkg = Package::open("deck.pptx")?;
//! let mut mutator = ElementMutator::new(&mut pkg);
//! mutator.clone_nodes(&Selector::new(NodeKind::Slide).nth(2))?;
//! mutator.remove_nodes(&Selector::new(NodeKind::Image).contains("draft"))?;
//! pkg.save("edited.pptx")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod clone;
pub mod deps;
pub mod relocate;
pub mod remove;

use crate::common::xml::{NodeId, XmlDocument};
use crate::ooxml::error::Result;
use crate::ooxml::pptx::Package;
use crate::ooxml::pptx::ids::IdAllocator;
use crate::ooxml::pptx::presentation::Presentation;
use crate::ooxml::pptx::query::{QueryOptions, Selection, Selector, select, select_in};
use std::collections::HashSet;

/// Selector-driven editor over one package.
///
/// The mutator borrows the package exclusively for its lifetime. Its
/// [`IdAllocator`] lives as long as the mutator, so part names minted by
/// successive calls never collide.
pub struct ElementMutator<'a> {
    pkg: &'a mut Package,
    alloc: IdAllocator,
    options: QueryOptions,
}

impl<'a> ElementMutator<'a> {
    pub fn new(pkg: &'a mut Package) -> Self {
        Self::with_options(pkg, QueryOptions::default())
    }

    pub fn with_options(pkg: &'a mut Package, options: QueryOptions) -> Self {
        Self {
            pkg,
            alloc: IdAllocator::new(),
            options,
        }
    }

    /// Replace the allocator, e.g. with one over a fixed entropy source.
    pub fn with_allocator(mut self, alloc: IdAllocator) -> Self {
        self.alloc = alloc;
        self
    }

    #[inline]
    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    /// Point slide-scoped selectors at another slide (0-based).
    pub fn set_active_slide(&mut self, position: usize) {
        self.options.active_slide = position;
    }

    #[inline]
    pub fn package(&self) -> &Package {
        self.pkg
    }

    /// Evaluate a presentation-scoped selector against the presentation
    /// model, so the returned nodes index into `Presentation::doc`.
    fn query_presentation(&self, selector: &Selector) -> Result<(Presentation, Vec<NodeId>)> {
        let pres = self.pkg.presentation()?;
        let nodes = select_in(pres.doc(), selector)?;
        Ok((pres, nodes))
    }

    fn query_part(&self, selector: &Selector) -> Result<Option<Selection>> {
        select(self.pkg, selector, &self.options)
    }

    /// Give every `cNvPr` in the subtree at `node` a fresh id outside `used`.
    fn reassign_shape_ids(&mut self, doc: &mut XmlDocument, node: NodeId, used: &mut HashSet<u32>) {
        for target in shape_props(doc, node) {
            let id = self.alloc.new_shape_id(used);
            used.insert(id);
            doc.set_attr(target, "id", &id.to_string());
        }
    }

    /// Like [`reassign_shape_ids`](Self::reassign_shape_ids), but only for
    /// ids already present in `used`.
    fn reassign_colliding_ids(&mut self, doc: &mut XmlDocument, node: NodeId, used: &mut HashSet<u32>) {
        for target in shape_props(doc, node) {
            match doc.attr_u32(target, "id") {
                Some(id) if !used.contains(&id) => {
                    used.insert(id);
                },
                _ => {
                    let id = self.alloc.new_shape_id(used);
                    used.insert(id);
                    doc.set_attr(target, "id", &id.to_string());
                },
            }
        }
    }
}

/// `cNvPr` elements at or below `node` that carry an id.
fn shape_props(doc: &XmlDocument, node: NodeId) -> Vec<NodeId> {
    std::iter::once(node)
        .chain(doc.descendants(node))
        .filter(|&n| doc.local_name(n) == "cNvPr" && doc.attr_raw(n, "id").is_some())
        .collect()
}
