//! Merging presentation packages.
//!
//! The first package is the target. Each source is applied in order:
//!
//! 1. content-type defaults the target lacks
//! 2. slide layouts and themes, copied under fresh names
//! 3. slide masters, with fresh entry and layout ids
//! 4. notes and handout masters, only where the target has none
//! 5. comment authors, matched by name
//! 6. slides and everything they depend on
//! 7. sections, when [`MergeOptions::merge_sections`] is set
//!
//! Merging is best-effort per reference. A reference that cannot be carried
//! over is dropped and recorded in the [`MergeReport`].
//!
//! # Example
//!
//! ```rust,no_run
//! use quince::ooxml::pptx::{MergeOptions, Package, merge_packages};
//!
//! let target = Package::open("a.pptx")?;
//! let source = Package::open("b.pptx")?;
//! let (merged, report) = merge_packages(target, &[source], &MergeOptions::default())?;
//! for diagnostic in &report.diagnostics {
//!     eprintln!("{diagnostic}");
//! }
//! merged.save("a+b.pptx")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
mod authors;
pub mod copier;
pub mod diagnostics;
mod masters;
pub mod reltable;
mod sections;
mod slides;

pub use diagnostics::{DiagnosticKind, MergeDiagnostic, MergeReport};

use crate::ooxml::error::Result;
use crate::ooxml::opc::OpcPackage;
use crate::ooxml::pptx::Package;
use crate::ooxml::pptx::comments::CommentAuthors;
use crate::ooxml::pptx::ids::{IdAllocator, IdSequence};
use crate::ooxml::pptx::presentation::Presentation;
use copier::PartCopier;
use serde::Deserialize;

/// Merge settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MergeOptions {
    /// Carry the sources' sections over, remapped to the merged slides
    pub merge_sections: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self { merge_sections: true }
    }
}

/// Merge `sources` into `target`, in order.
///
/// Returns the merged package together with a report of what was added and
/// which references were skipped.
pub fn merge_packages(
    target: Package,
    sources: &[Package],
    options: &MergeOptions,
) -> Result<(Package, MergeReport)> {
    let mut merge = MergeContext::new(target)?;
    for (index, source) in sources.iter().enumerate() {
        merge.absorb(index, source, options)?;
    }
    merge.finish()
}

/// State of one merge: the target, its parsed presentation part, and the
/// id spaces seeded from it.
struct MergeContext {
    pkg: Package,
    pres: Presentation,
    alloc: IdAllocator,
    slide_ids: IdSequence,
    master_ids: IdSequence,
    authors: Option<CommentAuthors>,
    report: MergeReport,
}

impl MergeContext {
    fn new(pkg: Package) -> Result<Self> {
        let pres = pkg.presentation()?;
        let slide_ids = IdSequence::slides(pres.slide_ids());
        let master_ids = IdSequence::masters(pres.master_layout_ids(pkg.opc())?);
        let authors = CommentAuthors::load(pkg.opc(), &pres)?;
        Ok(Self {
            pkg,
            pres,
            alloc: IdAllocator::new(),
            slide_ids,
            master_ids,
            authors,
            report: MergeReport::default(),
        })
    }

    fn absorb(&mut self, index: usize, source: &Package, options: &MergeOptions) -> Result<()> {
        let src_pres = source.presentation()?;
        let mut copier = PartCopier::new(source.opc(), index);

        self.copy_defaults(source.opc());
        self.copy_masters(&mut copier, &src_pres)?;
        self.copy_singletons(&mut copier, &src_pres)?;
        let mut authors = self.merge_authors(source.opc(), &src_pres)?;
        let slide_map = self.copy_slides(&mut copier, &src_pres, &mut authors)?;
        copier.resolve_slide_links(self.pkg.opc_mut())?;
        if options.merge_sections {
            self.merge_sections(&mut copier, &src_pres, &slide_map)?;
        }

        tracing::debug!(
            source = index,
            slides = slide_map.len(),
            skipped = copier.diagnostics.len(),
            "merged source package"
        );
        self.report.chart_families.append(&mut copier.chart_families);
        self.report.diagnostics.append(&mut copier.diagnostics);
        Ok(())
    }

    fn copy_defaults(&mut self, source: &OpcPackage) {
        let types = self.pkg.opc_mut().content_types_mut();
        for (ext, content_type) in source.content_types().defaults() {
            if types.add_default(ext, content_type) {
                tracing::trace!(ext, content_type, "added content-type default");
            }
        }
    }

    fn finish(mut self) -> Result<(Package, MergeReport)> {
        if let Some(authors) = &self.authors {
            authors.store(self.pkg.opc_mut(), &mut self.pres);
        }
        self.pkg.store_presentation(&self.pres);
        Ok((self.pkg, self.report))
    }
}
