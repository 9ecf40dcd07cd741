//! Sections of a merged source.
use super::MergeContext;
use super::copier::PartCopier;
use super::diagnostics::DiagnosticKind;
use crate::common::id::generate_guid_braced;
use crate::ooxml::error::Result;
use crate::ooxml::pptx::presentation::Presentation;
use crate::ooxml::pptx::sections;
use std::collections::HashMap;

impl MergeContext {
    /// Append the source's sections after the target's, with slide ids
    /// remapped and fresh section ids. References to slides that were not
    /// merged are dropped.
    pub(super) fn merge_sections(
        &mut self,
        copier: &mut PartCopier<'_>,
        src_pres: &Presentation,
        slide_map: &HashMap<u32, u32>,
    ) -> Result<()> {
        for mut section in sections::sections(src_pres.doc()) {
            let unmapped = sections::remap(&mut section, slide_map);
            for slide_id in unmapped {
                tracing::debug!(section = %section.name, slide_id, "section names an unmerged slide");
                copier.report(src_pres.partname(), None, DiagnosticKind::UnmappedSlide);
            }
            section.id = generate_guid_braced();
            sections::append_section(self.pres.doc_mut(), &section)?;
            self.report.sections_merged += 1;
        }
        Ok(())
    }
}
