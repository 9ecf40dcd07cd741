//! Comment authors and the comments of merged slides.
use super::MergeContext;
use super::copier::PartCopier;
use super::diagnostics::DiagnosticKind;
use crate::ooxml::error::Result;
use crate::ooxml::opc::constants::relationship_type as rt;
use crate::ooxml::opc::{OpcPackage, PackURI};
use crate::ooxml::pptx::comments::{COMMENT_AUTHORS_PARTNAME, CommentAuthors, comment_nodes};
use crate::ooxml::pptx::presentation::Presentation;
use std::collections::HashMap;

/// Translation of one source's author ids into the target registry.
#[derive(Debug, Default)]
pub(super) struct AuthorMap {
    ids: HashMap<u32, u32>,
    /// Next comment `idx`, shared by every comment of the source
    next_idx: u32,
}

impl AuthorMap {
    pub(super) fn get(&self, source_id: u32) -> Option<u32> {
        self.ids.get(&source_id).copied()
    }
}

impl MergeContext {
    /// Match source authors to target authors by exact name. Authors the
    /// target lacks are appended with a fresh id and color index and start
    /// with no issued comment indices.
    pub(super) fn merge_authors(&mut self, source: &OpcPackage, src_pres: &Presentation) -> Result<AuthorMap> {
        let Some(theirs) = CommentAuthors::load(source, src_pres)? else {
            return Ok(AuthorMap::default());
        };
        let mut ours = match self.authors.take() {
            Some(existing) => existing,
            None => CommentAuthors::empty(self.registry_partname()?),
        };

        let mut ids = HashMap::new();
        for author in theirs.authors() {
            if let Some(existing) = ours.find_by_name(&author.name) {
                ids.insert(author.id, existing.id);
                continue;
            }
            let id = ours.next_author_id()?;
            let clr_idx = ours.next_color_index()?;
            if ours.import(&theirs, author.id, id, clr_idx)?.is_some() {
                ours.set_last_idx(id, 0);
                ids.insert(author.id, id);
                self.report.authors_added += 1;
                tracing::debug!(name = %author.name, id, "added comment author");
            }
        }

        let next_idx = ours.max_last_idx() + 1;
        self.authors = Some(ours);
        Ok(AuthorMap { ids, next_idx })
    }

    fn registry_partname(&mut self) -> Result<PackURI> {
        let opc = self.pkg.opc();
        if !opc.contains(COMMENT_AUTHORS_PARTNAME) {
            return Ok(PackURI::new(COMMENT_AUTHORS_PARTNAME)?);
        }
        Ok(self.alloc.new_partname(opc, "/ppt", "commentAuthors", "xml")?)
    }

    /// Rewrite the comments copied along with `src_slide`: author ids go
    /// through `map`, and each comment takes the next index of the shared
    /// watermark, which also becomes its author's `lastIdx`.
    ///
    /// A comment whose author has no match is dropped from the copy, since
    /// its id would name some other author of the target.
    pub(super) fn remap_comments(
        &mut self,
        copier: &mut PartCopier<'_>,
        map: &mut AuthorMap,
        src_slide: &PackURI,
    ) -> Result<()> {
        let src_rels = copier.source().relationships_of(src_slide)?;
        let Some(src_part) = src_rels
            .of_type(rt::COMMENTS)
            .next()
            .and_then(|rel| src_rels.target_partname(rel).ok())
        else {
            return Ok(());
        };
        let Some(copy) = copier.copy_of(&src_part).cloned() else {
            return Ok(());
        };

        let opc = self.pkg.opc_mut();
        let mut doc = opc.xml(&copy)?;
        for node in comment_nodes(&doc) {
            let resolved = doc.attr_u32(node, "authorId").and_then(|id| map.get(id));
            let (Some(author_id), Some(authors)) = (resolved, self.authors.as_mut()) else {
                copier.report(&src_part, None, DiagnosticKind::UnresolvedReference);
                doc.detach(node);
                continue;
            };
            let idx = map.next_idx;
            map.next_idx += 1;
            doc.set_attr(node, "authorId", &author_id.to_string());
            doc.set_attr(node, "idx", &idx.to_string());
            authors.set_last_idx(author_id, idx);
        }
        opc.put_xml(&copy, &doc);
        Ok(())
    }
}
