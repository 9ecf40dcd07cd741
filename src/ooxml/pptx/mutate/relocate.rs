//! Moving matched nodes.
//!
//! Slides and sections are reordered within their lists. Content moved onto
//! a slide is appended to that slide's shape tree and brings its
//! relationships along; content moved onto other content of the same part
//! is placed right after the first destination match.
use super::ElementMutator;
use super::deps::{r_refs, release_unreferenced};
use crate::common::xml::{NodeId, XmlDocument};
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::{PackURI, Relationships};
use crate::ooxml::pptx::ids::shape_ids;
use crate::ooxml::pptx::presentation::Presentation;
use crate::ooxml::pptx::query::{NodeKind, Scope, Selector, select_in};
use crate::ooxml::pptx::sections;
use std::collections::HashMap;

/// Where one reordered node ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    After(NodeId),
    Before(NodeId),
}

impl ElementMutator<'_> {
    /// Move every match of `selector` to the first match of `destination`.
    /// Returns how many nodes were moved.
    pub fn move_nodes(&mut self, selector: &Selector, destination: &Selector) -> Result<usize> {
        let moved = match (selector.kind, destination.kind) {
            (NodeKind::Slide, NodeKind::Slide) => self.move_slides(selector, destination)?,
            (NodeKind::Section, NodeKind::Section) => self.move_sections(selector, destination)?,
            (kind, NodeKind::Slide) if kind.scope() == Scope::Slide => {
                self.move_into_slide(selector, destination)?
            },
            (kind, dest) if kind.scope() == dest.scope() && kind.scope() != Scope::Presentation => {
                self.move_beside(selector, destination)?
            },
            (kind, dest) => {
                return Err(OoxmlError::InvalidSelector(format!(
                    "cannot move {kind} nodes onto {dest}"
                )));
            },
        };
        tracing::debug!(kind = %selector.kind, destination = %destination.kind, moved, "moved nodes");
        Ok(moved)
    }

    /// Reorder slide entries; section membership follows the destination.
    fn move_slides(&mut self, selector: &Selector, destination: &Selector) -> Result<usize> {
        let (mut pres, nodes) = self.query_presentation(selector)?;
        let Some(dest) = select_first(&pres, destination)? else {
            return Ok(0);
        };
        let placements = reorder(pres.doc_mut(), &nodes, dest)?;

        let doc = pres.doc_mut();
        for &(node, placement) in &placements {
            let Some(id) = doc.attr_u32(node, "id") else {
                continue;
            };
            let (anchor, after) = match placement {
                Placement::After(anchor) => (anchor, true),
                Placement::Before(anchor) => (anchor, false),
            };
            let Some(anchor_id) = doc.attr_u32(anchor, "id") else {
                continue;
            };
            if sections::section_of(doc, anchor_id).is_none() {
                continue;
            }
            sections::remove_slide_refs(doc, id);
            if after {
                sections::insert_slide_ref_after(doc, anchor_id, id)?;
            } else {
                sections::insert_slide_ref_before(doc, anchor_id, id)?;
            }
        }
        self.pkg.store_presentation(&pres);
        Ok(placements.len())
    }

    fn move_sections(&mut self, selector: &Selector, destination: &Selector) -> Result<usize> {
        let (mut pres, nodes) = self.query_presentation(selector)?;
        let Some(dest) = select_first(&pres, destination)? else {
            return Ok(0);
        };
        let placements = reorder(pres.doc_mut(), &nodes, dest)?;
        self.pkg.store_presentation(&pres);
        Ok(placements.len())
    }

    /// Relocate markup into another slide's shape tree.
    fn move_into_slide(&mut self, selector: &Selector, destination: &Selector) -> Result<usize> {
        let (pres, dest_nodes) = self.query_presentation(destination)?;
        let Some(dest_part) = dest_nodes.first().and_then(|&node| {
            pres.slide_entries()
                .into_iter()
                .find(|e| e.node == node)
                .map(|e| e.partname)
        }) else {
            return Ok(0);
        };
        let Some(mut selection) = self.query_part(selector)? else {
            return Ok(0);
        };
        if selection.is_empty() {
            return Ok(0);
        }

        if selection.partname == dest_part {
            let doc = &mut selection.doc;
            let tree = shape_tree(doc, &dest_part)?;
            for &node in &selection.nodes {
                if node != tree && !doc.is_ancestor(node, tree) {
                    doc.append_child(tree, node)?;
                }
            }
            self.pkg.opc_mut().put_xml(&dest_part, doc);
            return Ok(selection.nodes.len());
        }

        let opc = self.pkg.opc_mut();
        let src_rels = opc.relationships_of(&selection.partname)?;
        let mut dest_doc = opc.xml(&dest_part)?;
        let mut dest_rels = opc.relationships_of(&dest_part)?;
        let tree = shape_tree(&dest_doc, &dest_part)?;
        let mut used = shape_ids(&dest_doc);

        let mut r_ids: HashMap<String, String> = HashMap::new();
        let mut candidates = Vec::new();
        for &node in &selection.nodes {
            let copy = dest_doc.import(&selection.doc, node);
            for rel_ref in r_refs(&dest_doc, copy) {
                let new_id = match r_ids.get(&rel_ref.r_id) {
                    Some(id) => Some(id.clone()),
                    None => {
                        let id = carry_relationship(&src_rels, &mut dest_rels, &rel_ref.r_id);
                        if let Some(id) = &id {
                            r_ids.insert(rel_ref.r_id.clone(), id.clone());
                        }
                        id
                    },
                };
                match new_id {
                    Some(id) => dest_doc.set_attr(rel_ref.node, &rel_ref.attr, &id),
                    None => {
                        // Nothing to point at in the destination
                        dest_doc.remove_attr(rel_ref.node, &rel_ref.attr);
                        tracing::warn!(source = %selection.partname, r_id = rel_ref.r_id.as_str(), "dropped reference to a missing relationship");
                    },
                }
                candidates.push(rel_ref.r_id);
            }
            self.reassign_colliding_ids(&mut dest_doc, copy, &mut used);
            dest_doc.append_child(tree, copy)?;
        }

        let opc = self.pkg.opc_mut();
        opc.put_xml(&dest_part, &dest_doc);
        opc.set_relationships(&dest_part, &dest_rels);

        let doc = &mut selection.doc;
        for &node in &selection.nodes {
            doc.detach(node);
        }
        opc.put_xml(&selection.partname, doc);
        release_unreferenced(opc, &selection.partname, doc, &candidates)?;
        tracing::debug!(source = %selection.partname, destination = %dest_part, "moved markup between slides");
        Ok(selection.nodes.len())
    }

    /// Place matches after the first destination match in the same part,
    /// keeping their relative order.
    fn move_beside(&mut self, selector: &Selector, destination: &Selector) -> Result<usize> {
        let Some(mut selection) = self.query_part(selector)? else {
            return Ok(0);
        };
        let doc = &mut selection.doc;
        let Some(&dest) = select_in(doc, destination)?.first() else {
            return Ok(0);
        };
        let mut anchor = dest;
        let mut moved = 0;
        for &node in &selection.nodes {
            if node == anchor || doc.is_ancestor(node, anchor) {
                continue;
            }
            doc.insert_after(anchor, node)?;
            anchor = node;
            moved += 1;
        }
        if moved > 0 {
            self.pkg.opc_mut().put_xml(&selection.partname, doc);
        }
        Ok(moved)
    }
}

fn select_first(pres: &Presentation, destination: &Selector) -> Result<Option<NodeId>> {
    Ok(select_in(pres.doc(), destination)?.first().copied())
}

/// Move each node to the destination's position among its siblings:
/// after it when coming from earlier in the list, before it otherwise.
fn reorder(doc: &mut XmlDocument, nodes: &[NodeId], dest: NodeId) -> Result<Vec<(NodeId, Placement)>> {
    let mut anchor = dest;
    let mut placements = Vec::new();
    for &node in nodes {
        if node == dest || doc.parent(node) != doc.parent(dest) {
            continue;
        }
        let Some(parent) = doc.parent(dest) else {
            continue;
        };
        let order = doc.children(parent);
        let from = order.iter().position(|&c| c == node);
        let to = order.iter().position(|&c| c == dest);
        let placement = match (from, to) {
            (Some(from), Some(to)) if from < to => Placement::After(anchor),
            _ => Placement::Before(dest),
        };
        match placement {
            Placement::After(a) => {
                doc.insert_after(a, node)?;
                anchor = node;
            },
            Placement::Before(d) => doc.insert_before(d, node)?,
        }
        placements.push((node, placement));
    }
    Ok(placements)
}

fn shape_tree(doc: &XmlDocument, partname: &PackURI) -> Result<NodeId> {
    doc.find(doc.root(), "p:spTree")
        .ok_or_else(|| OoxmlError::InvalidFormat(format!("{partname} has no shape tree")))
}

/// Re-create relationship `r_id` of `src` in `dest`, returning its id there.
fn carry_relationship(src: &Relationships, dest: &mut Relationships, r_id: &str) -> Option<String> {
    let rel = src.get(r_id)?;
    if rel.is_external() {
        return Some(dest.get_or_add_ext_rel(rel.reltype(), rel.target_ref()));
    }
    let target = src.target_partname(rel).ok()?;
    let target_ref = target.relative_ref(dest.base_uri());
    Some(dest.get_or_add(rel.reltype(), &target_ref))
}
