//! The `p:presentation` part and its id lists.
//!
//! [`Presentation`] owns the parsed part and its relationship set so that a
//! multi-step edit (append a slide, register a master, add a section) can be
//! done against one model and written back once with [`Presentation::store`].
use crate::common::xml::{NodeId, XmlDocument};
use crate::ooxml::error::Result;
use crate::ooxml::opc::constants::{namespace as ns, relationship_type as rt};
use crate::ooxml::opc::{OpcPackage, PackURI, Relationships};

/// Presentation-level id lists, in schema order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdList {
    SlideMasters,
    NotesMasters,
    HandoutMasters,
    Slides,
}

impl IdList {
    const ORDER: [IdList; 4] = [
        IdList::SlideMasters,
        IdList::NotesMasters,
        IdList::HandoutMasters,
        IdList::Slides,
    ];

    pub fn list_name(self) -> &'static str {
        match self {
            IdList::SlideMasters => "p:sldMasterIdLst",
            IdList::NotesMasters => "p:notesMasterIdLst",
            IdList::HandoutMasters => "p:handoutMasterIdLst",
            IdList::Slides => "p:sldIdLst",
        }
    }

    pub fn entry_name(self) -> &'static str {
        match self {
            IdList::SlideMasters => "p:sldMasterId",
            IdList::NotesMasters => "p:notesMasterId",
            IdList::HandoutMasters => "p:handoutMasterId",
            IdList::Slides => "p:sldId",
        }
    }

    fn position(self) -> usize {
        Self::ORDER.iter().position(|&l| l == self).unwrap_or(0)
    }
}

/// One resolved `p:sldId` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideEntry {
    pub id: u32,
    pub r_id: String,
    pub partname: PackURI,
    pub node: NodeId,
}

#[derive(Debug, Clone)]
pub struct Presentation {
    partname: PackURI,
    doc: XmlDocument,
    rels: Relationships,
}

impl Presentation {
    pub fn load(opc: &OpcPackage, partname: &PackURI) -> Result<Self> {
        Ok(Self {
            partname: partname.clone(),
            doc: opc.xml(partname)?,
            rels: opc.relationships_of(partname)?,
        })
    }

    /// Write the part and its relationships back.
    pub fn store(&self, opc: &mut OpcPackage) {
        opc.put_xml(&self.partname, &self.doc);
        opc.set_relationships(&self.partname, &self.rels);
    }

    #[inline]
    pub fn partname(&self) -> &PackURI {
        &self.partname
    }

    #[inline]
    pub fn doc(&self) -> &XmlDocument {
        &self.doc
    }

    #[inline]
    pub fn doc_mut(&mut self) -> &mut XmlDocument {
        &mut self.doc
    }

    #[inline]
    pub fn rels(&self) -> &Relationships {
        &self.rels
    }

    #[inline]
    pub fn rels_mut(&mut self) -> &mut Relationships {
        &mut self.rels
    }

    pub fn list(&self, list: IdList) -> Option<NodeId> {
        self.doc.child(self.doc.root(), list.list_name())
    }

    /// Existing list node, or a new one inserted at its schema position.
    pub fn ensure_list(&mut self, list: IdList) -> Result<NodeId> {
        if let Some(node) = self.list(list) {
            return Ok(node);
        }
        let root = self.doc.root();
        let node = self.doc.create_element(list.list_name());

        let preceding = IdList::ORDER[..list.position()]
            .iter()
            .rev()
            .find_map(|&l| self.list(l));
        match preceding {
            Some(anchor) => self.doc.insert_after(anchor, node)?,
            None => self.doc.prepend_child(root, node)?,
        }
        Ok(node)
    }

    /// Entries of one list, each with its `r:id` resolved.
    ///
    /// Entries whose relationship is missing are left out.
    pub fn entries(&self, list: IdList) -> Vec<(NodeId, PackURI)> {
        let Some(lst) = self.list(list) else {
            return Vec::new();
        };
        self.doc
            .children_named(lst, list.entry_name())
            .filter_map(|node| {
                let r_id = self.doc.attr(node, "r:id")?;
                let partname = self.rels.resolve(&r_id).ok()?;
                Some((node, partname))
            })
            .collect()
    }

    pub fn slide_entries(&self) -> Vec<SlideEntry> {
        self.entries(IdList::Slides)
            .into_iter()
            .filter_map(|(node, partname)| {
                Some(SlideEntry {
                    id: self.doc.attr_u32(node, "id")?,
                    r_id: self.doc.attr(node, "r:id")?,
                    partname,
                    node,
                })
            })
            .collect()
    }

    /// Every `p:sldId/@id`, including entries with dangling relationships.
    pub fn slide_ids(&self) -> Vec<u32> {
        self.ids_of(IdList::Slides)
    }

    pub fn master_ids(&self) -> Vec<u32> {
        self.ids_of(IdList::SlideMasters)
    }

    fn ids_of(&self, list: IdList) -> Vec<u32> {
        self.list(list)
            .map(|lst| {
                self.doc
                    .children_named(lst, list.entry_name())
                    .filter_map(|n| self.doc.attr_u32(n, "id"))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The shared master/layout id space: master entries plus every
    /// `p:sldLayoutId` inside the listed masters.
    pub fn master_layout_ids(&self, opc: &OpcPackage) -> Result<Vec<u32>> {
        let mut ids = self.master_ids();
        for (_, master) in self.entries(IdList::SlideMasters) {
            let Ok(doc) = opc.xml(&master) else {
                continue;
            };
            ids.extend(layout_ids(&doc));
        }
        Ok(ids)
    }

    pub fn master_partnames(&self) -> Vec<PackURI> {
        self.entries(IdList::SlideMasters)
            .into_iter()
            .map(|(_, p)| p)
            .collect()
    }

    pub fn notes_master(&self) -> Option<PackURI> {
        self.entries(IdList::NotesMasters)
            .into_iter()
            .next()
            .map(|(_, p)| p)
    }

    pub fn handout_master(&self) -> Option<PackURI> {
        self.entries(IdList::HandoutMasters)
            .into_iter()
            .next()
            .map(|(_, p)| p)
    }

    /// Append `p:sldId` for a slide part, returning the new entry node.
    pub fn append_slide(&mut self, partname: &PackURI, id: u32) -> Result<NodeId> {
        self.append_entry(IdList::Slides, rt::SLIDE, partname, Some(id))
    }

    pub fn append_master(&mut self, partname: &PackURI, id: u32) -> Result<NodeId> {
        self.append_entry(IdList::SlideMasters, rt::SLIDE_MASTER, partname, Some(id))
    }

    pub fn append_notes_master(&mut self, partname: &PackURI) -> Result<NodeId> {
        self.append_entry(IdList::NotesMasters, rt::NOTES_MASTER, partname, None)
    }

    pub fn append_handout_master(&mut self, partname: &PackURI) -> Result<NodeId> {
        self.append_entry(IdList::HandoutMasters, rt::HANDOUT_MASTER, partname, None)
    }

    fn append_entry(
        &mut self,
        list: IdList,
        reltype: &str,
        partname: &PackURI,
        id: Option<u32>,
    ) -> Result<NodeId> {
        let target = partname.relative_ref(self.partname.base_uri());
        let r_id = self.rels.add(reltype, &target, false);
        let lst = self.ensure_list(list)?;
        let root = self.doc.root();
        self.doc.declare_namespace(root, "r", ns::OFC_RELATIONSHIPS);

        let entry = match id {
            Some(id) => {
                let id = id.to_string();
                self.doc
                    .create_element_with(list.entry_name(), &[("id", id.as_str()), ("r:id", r_id.as_str())])
            },
            None => self
                .doc
                .create_element_with(list.entry_name(), &[("r:id", r_id.as_str())]),
        };
        self.doc.append_child(lst, entry)?;
        tracing::trace!(list = list.list_name(), %partname, r_id, "appended presentation entry");
        Ok(entry)
    }

    /// Drop a slide entry and its relationship. Returns the slide part name.
    pub fn remove_slide_entry(&mut self, node: NodeId) -> Option<PackURI> {
        let r_id = self.doc.attr(node, "r:id")?;
        let partname = self.rels.resolve(&r_id).ok();
        self.doc.detach(node);
        self.rels.remove(&r_id);
        partname
    }
}

/// `p:sldLayoutId/@id` values of a slide master part.
pub fn layout_ids(master: &XmlDocument) -> Vec<u32> {
    master
        .child(master.root(), "p:sldLayoutIdLst")
        .map(|lst| {
            master
                .children_named(lst, "p:sldLayoutId")
                .filter_map(|n| master.attr_u32(n, "id"))
                .collect()
        })
        .unwrap_or_default()
}
