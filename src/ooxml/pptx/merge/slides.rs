//! Slides, in the source's declared order.
use super::MergeContext;
use super::authors::AuthorMap;
use super::copier::{Naming, PartCopier};
use super::diagnostics::DiagnosticKind;
use crate::ooxml::error::Result;
use crate::ooxml::pptx::presentation::Presentation;
use std::collections::HashMap;

impl MergeContext {
    /// Copy every listed slide with its dependencies and append it to the
    /// target's slide list. Returns source slide id to merged slide id.
    pub(super) fn copy_slides(
        &mut self,
        copier: &mut PartCopier<'_>,
        src_pres: &Presentation,
        authors: &mut AuthorMap,
    ) -> Result<HashMap<u32, u32>> {
        let mut slide_map = HashMap::new();
        for entry in src_pres.slide_entries() {
            let copied = copier.copy_part(self.pkg.opc_mut(), &mut self.alloc, &entry.partname, Naming::Beside)?;
            let Some(copy) = copied else {
                copier.report(src_pres.partname(), Some(entry.r_id.as_str()), DiagnosticKind::MissingPart);
                continue;
            };
            let id = self.slide_ids.take()?;
            self.pres.append_slide(&copy, id)?;
            slide_map.insert(entry.id, id);
            self.remap_comments(copier, authors, &entry.partname)?;
            self.report.slides_added += 1;
            tracing::debug!(source = %entry.partname, %copy, id, "merged slide");
        }
        Ok(slide_map)
    }
}
