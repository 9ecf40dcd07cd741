//! Deleting matched nodes and the parts only they kept alive.
use super::ElementMutator;
use super::deps::{owned_targets, prune, r_refs, release_unreferenced, users_of};
use crate::common::xml::{NodeId, XmlDocument};
use crate::ooxml::error::Result;
use crate::ooxml::opc::PackURI;
use crate::ooxml::opc::package::is_xml_content_type;
use crate::ooxml::pptx::query::{NodeKind, Selector};
use crate::ooxml::pptx::sections;

impl ElementMutator<'_> {
    /// Delete every match. Returns how many nodes were removed.
    pub fn remove_nodes(&mut self, selector: &Selector) -> Result<usize> {
        let removed = match selector.kind {
            NodeKind::Slide => self.remove_slides(selector)?,
            NodeKind::Section => self.remove_sections(selector)?,
            _ => self.remove_content(selector)?,
        };
        tracing::debug!(kind = %selector.kind, removed, "removed nodes");
        Ok(removed)
    }

    /// Detach the matches, then drop relationships the part no longer uses
    /// and prune media, charts and diagrams nothing else references.
    fn remove_content(&mut self, selector: &Selector) -> Result<usize> {
        let Some(mut selection) = self.query_part(selector)? else {
            return Ok(0);
        };
        if selection.is_empty() {
            return Ok(0);
        }
        let doc = &mut selection.doc;
        let mut candidates = Vec::new();
        for &node in &selection.nodes {
            candidates.extend(r_refs(doc, node).into_iter().map(|r| r.r_id));
            doc.detach(node);
        }
        let opc = self.pkg.opc_mut();
        opc.put_xml(&selection.partname, doc);
        let pruned = release_unreferenced(opc, &selection.partname, doc, &candidates)?;
        if pruned > 0 {
            tracing::debug!(partname = %selection.partname, pruned, "pruned parts after removal");
        }
        Ok(selection.nodes.len())
    }

    /// A removed section hands its slides to the previous section, or to
    /// the next one when it was first. Removing the last section drops the
    /// section list altogether.
    fn remove_sections(&mut self, selector: &Selector) -> Result<usize> {
        let (mut pres, nodes) = self.query_presentation(selector)?;
        if nodes.is_empty() {
            return Ok(0);
        }
        let doc = pres.doc_mut();
        for &node in &nodes {
            let slides = slide_list(doc, node)
                .map(|lst| doc.element_children(lst).collect::<Vec<_>>())
                .unwrap_or_default();
            let siblings = sections::section_nodes(doc);
            let pos = siblings.iter().position(|&s| s == node);
            let previous = pos.and_then(|p| p.checked_sub(1)).map(|p| siblings[p]);
            let next = pos.and_then(|p| siblings.get(p + 1).copied());

            match (previous, next) {
                (Some(heir), _) => {
                    let lst = ensure_slide_list(doc, heir)?;
                    for entry in slides {
                        doc.append_child(lst, entry)?;
                    }
                },
                (None, Some(heir)) => {
                    let lst = ensure_slide_list(doc, heir)?;
                    for entry in slides.into_iter().rev() {
                        doc.prepend_child(lst, entry)?;
                    }
                },
                (None, None) => {},
            }
            doc.detach(node);
        }
        if sections::section_nodes(doc).is_empty() {
            drop_section_list(doc);
        }
        self.pkg.store_presentation(&pres);
        Ok(nodes.len())
    }

    /// Remove slides with everything that belongs to them: list entry,
    /// presentation relationship, section references, links from other
    /// slides, and the slide part plus its exclusively owned parts.
    fn remove_slides(&mut self, selector: &Selector) -> Result<usize> {
        let (mut pres, nodes) = self.query_presentation(selector)?;
        if nodes.is_empty() {
            return Ok(0);
        }
        let entries = pres.slide_entries();
        let mut doomed = Vec::new();
        for node in nodes {
            let Some(entry) = entries.iter().find(|e| e.node == node) else {
                continue;
            };
            pres.remove_slide_entry(node);
            sections::remove_slide_refs(pres.doc_mut(), entry.id);
            doomed.push(entry.partname.clone());
        }
        self.pkg.store_presentation(&pres);

        for partname in &doomed {
            self.unlink_slide(partname)?;
            let pruned = prune(self.pkg.opc_mut(), partname)?;
            tracing::debug!(%partname, pruned, "removed slide");
        }
        Ok(doomed.len())
    }

    /// Cut relationships from other parts into `slide`, along with the
    /// markup that uses them.
    fn unlink_slide(&mut self, slide: &PackURI) -> Result<()> {
        let opc = self.pkg.opc_mut();
        let owned = owned_targets(opc, slide)?;
        for (source, r_id) in opc.referrers(slide) {
            if &source == slide || owned.contains(&source) {
                continue;
            }
            let mut rels = opc.relationships_of(&source)?;
            rels.remove(&r_id);
            opc.set_relationships(&source, &rels);

            let is_xml = opc
                .content_type_of(&source)
                .is_ok_and(is_xml_content_type);
            if !is_xml {
                continue;
            }
            let mut doc = opc.xml(&source)?;
            let users = users_of(&doc, &r_id);
            if users.is_empty() {
                continue;
            }
            for node in users {
                doc.detach(node);
            }
            opc.put_xml(&source, &doc);
            tracing::trace!(%source, r_id, "dropped link to removed slide");
        }
        Ok(())
    }
}

fn slide_list(doc: &XmlDocument, section: NodeId) -> Option<NodeId> {
    doc.child(section, "p14:sldIdLst")
}

fn ensure_slide_list(doc: &mut XmlDocument, section: NodeId) -> Result<NodeId> {
    if let Some(lst) = slide_list(doc, section) {
        return Ok(lst);
    }
    let lst = doc.create_element("p14:sldIdLst");
    doc.append_child(section, lst)?;
    Ok(lst)
}

/// Detach the `p:ext` holding the section list, and `p:extLst` if that
/// leaves it empty.
fn drop_section_list(doc: &mut XmlDocument) {
    let Some(lst) = sections::section_list(doc) else {
        return;
    };
    let Some(ext) = doc.parent(lst) else {
        return;
    };
    let ext_lst = doc.parent(ext);
    doc.detach(ext);
    if let Some(ext_lst) = ext_lst
        && doc.element_children(ext_lst).next().is_none()
    {
        doc.detach(ext_lst);
    }
}
