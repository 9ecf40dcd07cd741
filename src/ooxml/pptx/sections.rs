//! Presentation sections.
//!
//! Sections group slides under a name. They live in the presentation part's
//! extension list:
//!
//! ```xml
//! <p:extLst>
//!   <p:ext uri="{521415D9-36F7-43E2-AB2F-B90AF26B5E84}">
//!     <p14:sectionLst xmlns:p14="...">
//!       <p14:section name="Intro" id="{GUID}">
//!         <p14:sldIdLst><p14:sldId id="256"/></p14:sldIdLst>
//!       </p14:section>
//!     </p14:sectionLst>
//!   </p:ext>
//! </p:extLst>
//! ```
//!
//! Slides are referenced by their presentation-level `p:sldId/@id`, so any
//! operation that renumbers or removes slides has to come through here.

use crate::common::xml::{NodeId, XmlDocument};
use crate::ooxml::error::Result;
use crate::ooxml::opc::constants::{ext_uri, namespace as ns};
use std::collections::HashMap;

/// A section in a presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Section name
    pub name: String,
    /// Section ID (GUID format)
    pub id: String,
    /// Slide IDs in this section
    pub slide_ids: Vec<u32>,
}

impl Section {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            slide_ids: Vec::new(),
        }
    }

    pub fn add_slide(&mut self, slide_id: u32) {
        self.slide_ids.push(slide_id);
    }

    pub fn with_slides(mut self, slide_ids: impl IntoIterator<Item = u32>) -> Self {
        self.slide_ids.extend(slide_ids);
        self
    }

    /// Read one `p14:section` element.
    pub fn from_node(doc: &XmlDocument, node: NodeId) -> Self {
        let slide_ids = doc
            .child(node, "p14:sldIdLst")
            .map(|lst| {
                doc.children_named(lst, "p14:sldId")
                    .filter_map(|s| doc.attr_u32(s, "id"))
                    .collect()
            })
            .unwrap_or_default();
        Self {
            name: doc.attr(node, "name").unwrap_or_default(),
            id: doc.attr(node, "id").unwrap_or_default(),
            slide_ids,
        }
    }

    /// Build a detached `p14:section` element in `doc`.
    pub fn to_node(&self, doc: &mut XmlDocument) -> Result<NodeId> {
        let section = doc.create_element_with(
            "p14:section",
            &[("name", self.name.as_str()), ("id", self.id.as_str())],
        );
        let lst = doc.create_element("p14:sldIdLst");
        for slide_id in &self.slide_ids {
            let id = slide_id.to_string();
            let entry = doc.create_element_with("p14:sldId", &[("id", id.as_str())]);
            doc.append_child(lst, entry)?;
        }
        doc.append_child(section, lst)?;
        Ok(section)
    }
}

/// The `p14:sectionLst` element of a presentation, if any.
pub fn section_list(doc: &XmlDocument) -> Option<NodeId> {
    let ext_lst = doc.child(doc.root(), "p:extLst")?;
    doc.children_named(ext_lst, "p:ext")
        .filter(|&ext| doc.attr_raw(ext, "uri") == Some(ext_uri::SECTION_LIST))
        .find_map(|ext| doc.child(ext, "p14:sectionLst"))
}

/// Existing section list, or a new one wrapped in `p:extLst/p:ext`.
///
/// `p:extLst` is always the last child of `p:presentation`.
pub fn ensure_section_list(doc: &mut XmlDocument) -> Result<NodeId> {
    if let Some(lst) = section_list(doc) {
        return Ok(lst);
    }
    let root = doc.root();
    let ext_lst = match doc.child(root, "p:extLst") {
        Some(existing) => existing,
        None => {
            let node = doc.create_element("p:extLst");
            doc.append_child(root, node)?;
            node
        },
    };
    let ext = doc.create_element_with("p:ext", &[("uri", ext_uri::SECTION_LIST)]);
    let lst = doc.create_element("p14:sectionLst");
    doc.declare_namespace(lst, "p14", ns::PML_2010);
    doc.append_child(ext, lst)?;
    doc.append_child(ext_lst, ext)?;
    Ok(lst)
}

/// `p14:section` nodes in document order.
pub fn section_nodes(doc: &XmlDocument) -> Vec<NodeId> {
    section_list(doc)
        .map(|lst| doc.children_named(lst, "p14:section").collect())
        .unwrap_or_default()
}

pub fn sections(doc: &XmlDocument) -> Vec<Section> {
    section_nodes(doc)
        .into_iter()
        .map(|node| Section::from_node(doc, node))
        .collect()
}

/// Append a section at the end of the list, creating the list if needed.
pub fn append_section(doc: &mut XmlDocument, section: &Section) -> Result<NodeId> {
    let lst = ensure_section_list(doc)?;
    let node = section.to_node(doc)?;
    doc.append_child(lst, node)?;
    Ok(node)
}

/// Section node that lists `slide_id`.
pub fn section_of(doc: &XmlDocument, slide_id: u32) -> Option<NodeId> {
    section_nodes(doc)
        .into_iter()
        .find(|&s| slide_refs(doc, s).any(|(_, id)| id == slide_id))
}

fn slide_refs(doc: &XmlDocument, section: NodeId) -> impl Iterator<Item = (NodeId, u32)> + '_ {
    doc.child(section, "p14:sldIdLst")
        .into_iter()
        .flat_map(move |lst| doc.children_named(lst, "p14:sldId"))
        .filter_map(move |s| Some((s, doc.attr_u32(s, "id")?)))
}

/// Drop every reference to `slide_id`. Returns how many were removed.
pub fn remove_slide_refs(doc: &mut XmlDocument, slide_id: u32) -> usize {
    let refs: Vec<NodeId> = section_nodes(doc)
        .into_iter()
        .flat_map(|s| slide_refs(doc, s).collect::<Vec<_>>())
        .filter(|&(_, id)| id == slide_id)
        .map(|(node, _)| node)
        .collect();
    for &node in &refs {
        doc.detach(node);
    }
    refs.len()
}

/// Insert `new_id` right after the reference to `anchor_id` in whichever
/// section holds it. Returns `false` when no section lists `anchor_id`.
pub fn insert_slide_ref_after(doc: &mut XmlDocument, anchor_id: u32, new_id: u32) -> Result<bool> {
    insert_slide_ref(doc, anchor_id, new_id, true)
}

pub fn insert_slide_ref_before(doc: &mut XmlDocument, anchor_id: u32, new_id: u32) -> Result<bool> {
    insert_slide_ref(doc, anchor_id, new_id, false)
}

fn insert_slide_ref(doc: &mut XmlDocument, anchor_id: u32, new_id: u32, after: bool) -> Result<bool> {
    let anchor = section_nodes(doc)
        .into_iter()
        .flat_map(|s| slide_refs(doc, s).collect::<Vec<_>>())
        .find(|&(_, id)| id == anchor_id)
        .map(|(node, _)| node);
    let Some(anchor) = anchor else {
        return Ok(false);
    };
    let id = new_id.to_string();
    let entry = doc.create_element_with("p14:sldId", &[("id", id.as_str())]);
    if after {
        doc.insert_after(anchor, entry)?;
    } else {
        doc.insert_before(anchor, entry)?;
    }
    Ok(true)
}

/// Rewrite slide ids through `map`. Returns the ids that had no mapping;
/// their references are dropped.
pub fn remap(section: &mut Section, map: &HashMap<u32, u32>) -> Vec<u32> {
    let mut unmapped = Vec::new();
    section.slide_ids.retain_mut(|id| match map.get(id) {
        Some(&new) => {
            *id = new;
            true
        },
        None => {
            unmapped.push(*id);
            false
        },
    });
    unmapped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::pptx::testutil::DeckBuilder;

    #[test]
    fn test_read_sections() {
        let pkg = DeckBuilder::new()
            .slide("a")
            .slide("b")
            .slide("c")
            .section("Intro", &[0])
            .section("Body", &[1, 2])
            .build();
        let pres = pkg.presentation().unwrap();
        let all = sections(pres.doc());
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "Intro");
        assert_eq!(all[1].slide_ids, [257, 258]);
        assert_eq!(all[0].id, "{00000000-0000-0000-0000-000000000001}");
    }

    #[test]
    fn test_append_creates_wrapper() {
        let mut doc = DeckBuilder::new().slide("a").build().presentation().unwrap().doc().clone();
        assert!(section_list(&doc).is_none());
        let section = Section::new("New", "{ABC}").with_slides([256]);
        append_section(&mut doc, &section).unwrap();

        let root = doc.root();
        let last = doc.element_children(root).last().unwrap();
        assert_eq!(doc.name(last), "p:extLst");
        assert_eq!(sections(&doc), vec![section]);
        let lst = section_list(&doc).unwrap();
        assert_eq!(doc.attr(lst, "xmlns:p14").as_deref(), Some(ns::PML_2010));
    }

    #[test]
    fn test_remove_and_insert_refs() {
        let pkg = DeckBuilder::new()
            .slide("a")
            .slide("b")
            .section("All", &[0, 1])
            .build();
        let mut doc = pkg.presentation().unwrap().doc().clone();
        assert_eq!(remove_slide_refs(&mut doc, 256), 1);
        assert!(insert_slide_ref_after(&mut doc, 257, 900).unwrap());
        assert!(!insert_slide_ref_after(&mut doc, 12, 901).unwrap());
        assert!(insert_slide_ref_before(&mut doc, 257, 902).unwrap());
        assert_eq!(sections(&doc)[0].slide_ids, [902, 257, 900]);
        assert!(section_of(&doc, 900).is_some());
    }

    #[test]
    fn test_remap_reports_unmapped() {
        let mut section = Section::new("S", "{X}").with_slides([256, 257, 258]);
        let map: HashMap<u32, u32> = [(256, 300), (258, 301)].into_iter().collect();
        assert_eq!(remap(&mut section, &map), [257]);
        assert_eq!(section.slide_ids, [300, 301]);
    }
}
