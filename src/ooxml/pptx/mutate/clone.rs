//! Duplicating matched nodes.
use super::ElementMutator;
use super::deps::duplicate_part;
use crate::common::id::generate_guid_braced;
use crate::common::xml::XmlDocument;
use crate::ooxml::error::Result;
use crate::ooxml::opc::PackURI;
use crate::ooxml::opc::constants::{content_type as ct, relationship_type as rt};
use crate::ooxml::pptx::comments::{CommentAuthors, comment_nodes};
use crate::ooxml::pptx::ids::{IdSequence, shape_ids};
use crate::ooxml::pptx::query::{NodeKind, Selector};
use crate::ooxml::pptx::sections;

impl ElementMutator<'_> {
    /// Duplicate every match as its next sibling. Returns how many nodes
    /// were cloned.
    pub fn clone_nodes(&mut self, selector: &Selector) -> Result<usize> {
        let cloned = match selector.kind {
            NodeKind::Slide => self.clone_slides(selector)?,
            NodeKind::Section => self.clone_sections(selector)?,
            NodeKind::Comment => self.clone_comments(selector)?,
            _ => self.clone_content(selector)?,
        };
        tracing::debug!(kind = %selector.kind, cloned, "cloned nodes");
        Ok(cloned)
    }

    fn clone_content(&mut self, selector: &Selector) -> Result<usize> {
        let Some(mut selection) = self.query_part(selector)? else {
            return Ok(0);
        };
        if selection.is_empty() {
            return Ok(0);
        }
        let doc = &mut selection.doc;
        let mut used = shape_ids(doc);
        for &node in &selection.nodes {
            let copy = doc.deep_clone(node);
            self.reassign_shape_ids(doc, copy, &mut used);
            doc.insert_after(node, copy)?;
        }
        self.pkg.opc_mut().put_xml(&selection.partname, doc);
        Ok(selection.nodes.len())
    }

    /// Copies get a fresh `idx` from their author's counter.
    fn clone_comments(&mut self, selector: &Selector) -> Result<usize> {
        let Some(mut selection) = self.query_part(selector)? else {
            return Ok(0);
        };
        if selection.is_empty() {
            return Ok(0);
        }
        let mut pres = self.pkg.presentation()?;
        let mut authors = CommentAuthors::load(self.pkg.opc(), &pres)?;
        let doc = &mut selection.doc;
        for &node in &selection.nodes {
            let copy = doc.deep_clone(node);
            let idx = next_comment_idx(doc, authors.as_mut(), doc.attr_u32(copy, "authorId"));
            doc.set_attr(copy, "idx", &idx.to_string());
            doc.insert_after(node, copy)?;
        }
        self.pkg.opc_mut().put_xml(&selection.partname, doc);
        if let Some(authors) = &authors {
            authors.store(self.pkg.opc_mut(), &mut pres);
            self.pkg.store_presentation(&pres);
        }
        Ok(selection.nodes.len())
    }

    /// Copies get a new GUID and start out without slides, since a slide
    /// belongs to exactly one section.
    fn clone_sections(&mut self, selector: &Selector) -> Result<usize> {
        let (mut pres, nodes) = self.query_presentation(selector)?;
        if nodes.is_empty() {
            return Ok(0);
        }
        let doc = pres.doc_mut();
        for &node in &nodes {
            let copy = doc.deep_clone(node);
            doc.set_attr(copy, "id", &generate_guid_braced());
            if let Some(lst) = doc.child(copy, "p14:sldIdLst") {
                for entry in doc.element_children(lst).collect::<Vec<_>>() {
                    doc.detach(entry);
                }
            }
            doc.insert_after(node, copy)?;
        }
        self.pkg.store_presentation(&pres);
        Ok(nodes.len())
    }

    /// Duplicate slide parts together with the notes, comments, charts and
    /// media only they reference. Each copy is listed right after its
    /// original, in the presentation and in its section.
    fn clone_slides(&mut self, selector: &Selector) -> Result<usize> {
        let (mut pres, nodes) = self.query_presentation(selector)?;
        if nodes.is_empty() {
            return Ok(0);
        }
        let entries = pres.slide_entries();
        let mut slide_ids = IdSequence::slides(pres.slide_ids());
        let mut authors = CommentAuthors::load(self.pkg.opc(), &pres)?;

        let mut cloned = 0;
        for node in nodes {
            let Some(entry) = entries.iter().find(|e| e.node == node) else {
                continue;
            };
            let dup = duplicate_part(self.pkg.opc_mut(), &mut self.alloc, &entry.partname)?;
            for (_, copy) in &dup.copies {
                let content_type = self.pkg.opc().content_type_of(copy)?.to_string();
                match content_type.as_str() {
                    ct::PML_NOTES_SLIDE => self.retarget_notes(copy, &dup.partname)?,
                    ct::PML_COMMENTS => self.reissue_comment_indices(copy, authors.as_mut())?,
                    _ => {},
                }
            }

            let id = slide_ids.take()?;
            let new_entry = pres.append_slide(&dup.partname, id)?;
            pres.doc_mut().insert_after(entry.node, new_entry)?;
            sections::insert_slide_ref_after(pres.doc_mut(), entry.id, id)?;
            tracing::debug!(source = %entry.partname, copy = %dup.partname, id, "cloned slide");
            cloned += 1;
        }

        if let Some(authors) = &authors {
            authors.store(self.pkg.opc_mut(), &mut pres);
        }
        self.pkg.store_presentation(&pres);
        Ok(cloned)
    }

    /// Point a copied notes slide back at the slide copy it belongs to.
    fn retarget_notes(&mut self, notes: &PackURI, slide: &PackURI) -> Result<()> {
        let opc = self.pkg.opc_mut();
        let mut rels = opc.relationships_of(notes)?;
        let back_refs: Vec<String> = rels.of_type(rt::SLIDE).map(|r| r.r_id().to_string()).collect();
        for r_id in back_refs {
            rels.retarget(&r_id, slide)?;
        }
        opc.set_relationships(notes, &rels);
        Ok(())
    }

    fn reissue_comment_indices(
        &mut self,
        partname: &PackURI,
        mut authors: Option<&mut CommentAuthors>,
    ) -> Result<()> {
        let opc = self.pkg.opc_mut();
        let mut doc = opc.xml(partname)?;
        for node in comment_nodes(&doc) {
            let idx = next_comment_idx(&doc, authors.as_deref_mut(), doc.attr_u32(node, "authorId"));
            doc.set_attr(node, "idx", &idx.to_string());
        }
        opc.put_xml(partname, &doc);
        Ok(())
    }
}

/// Next index for a comment by `author_id`, from the author registry when
/// the author is known there, else one past the largest index in `doc`.
fn next_comment_idx(doc: &XmlDocument, authors: Option<&mut CommentAuthors>, author_id: Option<u32>) -> u32 {
    if let (Some(authors), Some(author_id)) = (authors, author_id)
        && let Some(idx) = authors.issue_idx(author_id)
    {
        return idx;
    }
    comment_nodes(doc)
        .into_iter()
        .filter_map(|n| doc.attr_u32(n, "idx"))
        .max()
        .map_or(1, |max| max + 1)
}
