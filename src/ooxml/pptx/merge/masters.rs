//! Layouts, themes, masters and the notes/handout singletons.
use super::MergeContext;
use super::copier::{Naming, PartCopier};
use super::diagnostics::DiagnosticKind;
use crate::ooxml::error::Result;
use crate::ooxml::opc::PackURI;
use crate::ooxml::opc::constants::content_type as ct;
use crate::ooxml::pptx::presentation::Presentation;

impl MergeContext {
    /// Copy every layout and theme of the source, then its masters.
    ///
    /// Each master copy gets a new presentation entry and fresh
    /// `p:sldLayoutId` values from the shared master/layout id space.
    /// Relationships are rewritten once all three kinds have copies, since
    /// layouts and masters point at each other.
    pub(super) fn copy_masters(&mut self, copier: &mut PartCopier<'_>, src_pres: &Presentation) -> Result<()> {
        let source = copier.source();
        let mut copied: Vec<(PackURI, PackURI)> = Vec::new();

        for content_type in [ct::PML_SLIDE_LAYOUT, ct::OFC_THEME] {
            for part in source.parts_of_type(content_type) {
                if let Some(copy) = copier.copy_blob(self.pkg.opc_mut(), &mut self.alloc, &part, Naming::Beside)? {
                    copied.push((part, copy));
                }
            }
        }

        for master in src_pres.master_partnames() {
            let Some(copy) = copier.copy_blob(self.pkg.opc_mut(), &mut self.alloc, &master, Naming::Beside)? else {
                copier.report(src_pres.partname(), None, DiagnosticKind::MissingPart);
                continue;
            };
            let id = self.master_ids.take()?;
            self.renumber_layouts(&copy)?;
            self.pres.append_master(&copy, id)?;
            tracing::debug!(source = %master, %copy, id, "merged slide master");
            copied.push((master, copy));
        }

        for (part, copy) in &copied {
            copier.copy_rels(self.pkg.opc_mut(), &mut self.alloc, part, copy)?;
        }
        Ok(())
    }

    fn renumber_layouts(&mut self, master: &PackURI) -> Result<()> {
        let opc = self.pkg.opc_mut();
        let mut doc = opc.xml(master)?;
        let Some(lst) = doc.child(doc.root(), "p:sldLayoutIdLst") else {
            return Ok(());
        };
        let entries: Vec<_> = doc.children_named(lst, "p:sldLayoutId").collect();
        for node in entries {
            let id = self.master_ids.take()?.to_string();
            doc.set_attr(node, "id", &id);
        }
        opc.put_xml(master, &doc);
        Ok(())
    }

    /// The target keeps its own notes and handout masters. A source master
    /// is copied only when the target has none.
    pub(super) fn copy_singletons(&mut self, copier: &mut PartCopier<'_>, src_pres: &Presentation) -> Result<()> {
        if let Some(theirs) = src_pres.notes_master() {
            match self.pres.notes_master() {
                Some(ours) => copier.map(theirs, ours),
                None => {
                    if let Some(copy) = copier.copy_part(self.pkg.opc_mut(), &mut self.alloc, &theirs, Naming::Beside)? {
                        self.pres.append_notes_master(&copy)?;
                    }
                },
            }
        }
        if let Some(theirs) = src_pres.handout_master() {
            match self.pres.handout_master() {
                Some(ours) => copier.map(theirs, ours),
                None => {
                    if let Some(copy) = copier.copy_part(self.pkg.opc_mut(), &mut self.alloc, &theirs, Naming::Beside)? {
                        self.pres.append_handout_master(&copy)?;
                    }
                },
            }
        }
        Ok(())
    }
}
