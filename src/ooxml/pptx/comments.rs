//! Slide comments and the comment-author registry.
//!
//! Every comment (`p:cm`) in a slide's comments part names its author by
//! `authorId` and carries an `idx` unique per author. The registry part
//! (`p:cmAuthorLst`) is shared by the whole presentation and tracks, per
//! author, the highest `idx` handed out so far in `lastIdx`.

use crate::common::xml::{NodeId, XmlDocument};
use crate::ooxml::error::Result;
use crate::ooxml::opc::constants::{content_type as ct, namespace as ns, relationship_type as rt};
use crate::ooxml::opc::{OpcPackage, PackURI};
use crate::ooxml::pptx::ids::next_sequential;
use crate::ooxml::pptx::presentation::Presentation;

/// Conventional location of the registry when a package has none yet.
pub const COMMENT_AUTHORS_PARTNAME: &str = "/ppt/commentAuthors.xml";

/// A comment author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentAuthor {
    pub id: u32,
    pub name: String,
    pub initials: String,
    /// Highest comment index issued to this author
    pub last_idx: u32,
    /// Color index used when rendering the author's comments
    pub clr_idx: u32,
}

impl CommentAuthor {
    pub fn new(id: u32, name: impl Into<String>, initials: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            initials: initials.into(),
            last_idx: 0,
            clr_idx: id,
        }
    }

    pub fn from_node(doc: &XmlDocument, node: NodeId) -> Option<Self> {
        Some(Self {
            id: doc.attr_u32(node, "id")?,
            name: doc.attr(node, "name").unwrap_or_default(),
            initials: doc.attr(node, "initials").unwrap_or_default(),
            last_idx: doc.attr_u32(node, "lastIdx").unwrap_or(0),
            clr_idx: doc.attr_u32(node, "clrIdx").unwrap_or(0),
        })
    }
}

/// A comment in a slide's comments part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub author_id: u32,
    pub idx: u32,
    pub text: String,
}

impl Comment {
    pub fn from_node(doc: &XmlDocument, node: NodeId) -> Option<Self> {
        Some(Self {
            author_id: doc.attr_u32(node, "authorId")?,
            idx: doc.attr_u32(node, "idx").unwrap_or(0),
            text: doc
                .child(node, "p:text")
                .map(|t| doc.text_content(t))
                .unwrap_or_default(),
        })
    }
}

/// `p:cm` elements of a comments part, in document order.
pub fn comment_nodes(doc: &XmlDocument) -> Vec<NodeId> {
    doc.children_named(doc.root(), "p:cm").collect()
}

pub fn comments(doc: &XmlDocument) -> Vec<Comment> {
    comment_nodes(doc)
        .into_iter()
        .filter_map(|node| Comment::from_node(doc, node))
        .collect()
}

/// Parsed `p:cmAuthorLst` part.
#[derive(Debug, Clone)]
pub struct CommentAuthors {
    partname: PackURI,
    doc: XmlDocument,
}

impl CommentAuthors {
    pub fn parse(partname: PackURI, xml: &[u8]) -> Result<Self> {
        Ok(Self {
            partname,
            doc: XmlDocument::parse(xml)?,
        })
    }

    /// A registry without authors, to be stored at `partname`.
    pub fn empty(partname: PackURI) -> Self {
        let mut doc = XmlDocument::new("p:cmAuthorLst");
        let root = doc.root();
        doc.declare_namespace(root, "p", ns::PML_MAIN);
        Self { partname, doc }
    }

    /// The registry related from the presentation part, if it has one.
    pub fn load(opc: &OpcPackage, pres: &Presentation) -> Result<Option<Self>> {
        let Some(rel) = pres.rels().of_type(rt::COMMENT_AUTHORS).next() else {
            return Ok(None);
        };
        let partname = pres.rels().target_partname(rel)?;
        match opc.get_opt(&partname) {
            Some(xml) => Ok(Some(Self::parse(partname, xml)?)),
            None => Ok(None),
        }
    }

    #[inline]
    pub fn partname(&self) -> &PackURI {
        &self.partname
    }

    #[inline]
    pub fn doc(&self) -> &XmlDocument {
        &self.doc
    }

    fn nodes(&self) -> Vec<NodeId> {
        self.doc.children_named(self.doc.root(), "p:cmAuthor").collect()
    }

    fn node_of(&self, id: u32) -> Option<NodeId> {
        self.nodes()
            .into_iter()
            .find(|&n| self.doc.attr_u32(n, "id") == Some(id))
    }

    pub fn authors(&self) -> Vec<CommentAuthor> {
        self.nodes()
            .into_iter()
            .filter_map(|n| CommentAuthor::from_node(&self.doc, n))
            .collect()
    }

    pub fn find_by_id(&self, id: u32) -> Option<CommentAuthor> {
        self.node_of(id)
            .and_then(|n| CommentAuthor::from_node(&self.doc, n))
    }

    /// Exact, case-sensitive match on `name`.
    pub fn find_by_name(&self, name: &str) -> Option<CommentAuthor> {
        self.authors().into_iter().find(|a| a.name == name)
    }

    /// Current maximum id plus one; `0` for an empty registry.
    pub fn next_author_id(&self) -> Result<u32> {
        Ok(next_sequential(self.authors().iter().map(|a| a.id), 0)?)
    }

    pub fn next_color_index(&self) -> Result<u32> {
        Ok(next_sequential(self.authors().iter().map(|a| a.clr_idx), 0)?)
    }

    pub fn max_last_idx(&self) -> u32 {
        self.authors().iter().map(|a| a.last_idx).max().unwrap_or(0)
    }

    /// Copy an author element from another registry under a new id and color.
    pub fn import(
        &mut self,
        other: &CommentAuthors,
        source_id: u32,
        id: u32,
        clr_idx: u32,
    ) -> Result<Option<NodeId>> {
        let Some(src) = other.node_of(source_id) else {
            return Ok(None);
        };
        let node = self.doc.import(&other.doc, src);
        self.doc.set_attr(node, "id", &id.to_string());
        self.doc.set_attr(node, "clrIdx", &clr_idx.to_string());
        let root = self.doc.root();
        self.doc.append_child(root, node)?;
        Ok(Some(node))
    }

    pub fn set_last_idx(&mut self, id: u32, last_idx: u32) -> bool {
        match self.node_of(id) {
            Some(node) => {
                self.doc.set_attr(node, "lastIdx", &last_idx.to_string());
                true
            },
            None => false,
        }
    }

    /// Next comment index for `author_id`, recorded as its new `lastIdx`.
    pub fn issue_idx(&mut self, author_id: u32) -> Option<u32> {
        let author = self.find_by_id(author_id)?;
        let idx = author.last_idx + 1;
        self.set_last_idx(author_id, idx);
        Some(idx)
    }

    /// Write the part, making sure the registry is related and typed.
    pub fn store(&self, opc: &mut OpcPackage, pres: &mut Presentation) {
        opc.put_xml(&self.partname, &self.doc);
        opc.content_types_mut()
            .ensure(&self.partname, ct::PML_COMMENT_AUTHORS);
        let target = self.partname.relative_ref(pres.partname().base_uri());
        pres.rels_mut().get_or_add(rt::COMMENT_AUTHORS, &target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::pptx::testutil::DeckBuilder;

    fn registry(pkg: &crate::ooxml::pptx::Package) -> CommentAuthors {
        let pres = pkg.presentation().unwrap();
        CommentAuthors::load(pkg.opc(), &pres).unwrap().unwrap()
    }

    #[test]
    fn test_load_registry_and_comments() {
        let pkg = DeckBuilder::new()
            .slide("a")
            .comment(0, "Alice", "first")
            .comment(0, "Bob", "second")
            .comment(0, "Alice", "third")
            .build();
        let authors = registry(&pkg);
        assert_eq!(authors.partname().as_str(), COMMENT_AUTHORS_PARTNAME);
        let alice = authors.find_by_name("Alice").unwrap();
        assert_eq!((alice.id, alice.last_idx), (0, 2));
        assert_eq!(authors.next_author_id().unwrap(), 2);
        assert_eq!(authors.next_color_index().unwrap(), 2);
        assert_eq!(authors.max_last_idx(), 2);

        let doc = pkg.opc().xml("/ppt/comments/comment1.xml").unwrap();
        let all = comments(&doc);
        assert_eq!(all.len(), 3);
        assert_eq!(all[2], Comment { author_id: 0, idx: 2, text: "third".into() });
    }

    #[test]
    fn test_no_registry() {
        let pkg = DeckBuilder::new().slide("a").build();
        let pres = pkg.presentation().unwrap();
        assert!(CommentAuthors::load(pkg.opc(), &pres).unwrap().is_none());
    }

    #[test]
    fn test_import_and_issue_idx() {
        let ours = DeckBuilder::new().slide("a").comment(0, "Alice", "x").build();
        let theirs = DeckBuilder::new().slide("b").comment(0, "Carol", "y").build();
        let mut authors = registry(&ours);
        let other = registry(&theirs);

        let id = authors.next_author_id().unwrap();
        let clr = authors.next_color_index().unwrap();
        assert!(authors.import(&other, 0, id, clr).unwrap().is_some());
        assert!(authors.import(&other, 42, 9, 9).unwrap().is_none());

        let carol = authors.find_by_name("Carol").unwrap();
        assert_eq!((carol.id, carol.clr_idx), (1, 1));
        assert_eq!(authors.issue_idx(1), Some(2));
        assert_eq!(authors.find_by_id(1).unwrap().last_idx, 2);
        assert_eq!(authors.issue_idx(7), None);
    }

    #[test]
    fn test_empty_registry_round_trip() {
        let mut pkg = DeckBuilder::new().slide("a").build();
        let mut pres = pkg.presentation().unwrap();
        let authors = CommentAuthors::empty(PackURI::new(COMMENT_AUTHORS_PARTNAME).unwrap());
        assert!(authors.authors().is_empty());
        assert_eq!(authors.next_author_id().unwrap(), 0);
        authors.store(pkg.opc_mut(), &mut pres);
        pkg.store_presentation(&pres);

        let pres = pkg.presentation().unwrap();
        let loaded = CommentAuthors::load(pkg.opc(), &pres).unwrap().unwrap();
        assert_eq!(loaded.partname().as_str(), COMMENT_AUTHORS_PARTNAME);
        assert!(loaded.authors().is_empty());
    }
}
