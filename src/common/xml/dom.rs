//! Arena-backed mutable XML tree.
//!
//! Nodes live in one flat `Vec` and refer to each other through [`NodeId`]
//! indices. Text and attribute values are stored in their escaped source
//! form, so markup nobody touched serializes back byte-for-byte; accessors
//! unescape on read and setters escape on write.
//!
//! Detaching a node only unlinks it. The slot stays in the arena and the
//! node can be reattached elsewhere (that is how moves work).

use super::XmlError;
use super::escape::{escape_xml, unescape_xml};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::str::from_utf8;

type Result<T> = std::result::Result<T, XmlError>;

const DEFAULT_PROLOG: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// Index of a node inside its owning [`XmlDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// An attribute with its value kept in escaped form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    name: String,
    raw: String,
}

impl Attribute {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value as it appears in the markup (still escaped).
    #[inline]
    pub fn raw_value(&self) -> &str {
        &self.raw
    }

    /// Unescaped value.
    pub fn value(&self) -> String {
        unescape_xml(&self.raw)
    }
}

#[derive(Debug, Clone)]
enum NodeData {
    Element { name: String, attrs: Vec<Attribute> },
    Text(String),
    CData(String),
    Comment(String),
    Pi(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A parsed XML part.
#[derive(Debug, Clone)]
pub struct XmlDocument {
    nodes: Vec<Node>,
    root: NodeId,
    prolog: Option<String>,
}

impl XmlDocument {
    /// Create a document holding a single empty root element.
    pub fn new(root_name: &str) -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            prolog: Some(DEFAULT_PROLOG.to_string()),
        };
        doc.root = doc.create_element(root_name);
        doc
    }

    /// Parse XML bytes into a tree.
    ///
    /// Whitespace-only text is preserved. Comments and processing
    /// instructions outside the root element are dropped.
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let (prolog, body) = split_prolog(xml)?;
        let mut reader = Reader::from_reader(body);
        let mut buf = Vec::new();
        let mut doc = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            prolog,
        };
        let mut stack: Vec<NodeId> = Vec::new();
        let mut root = None;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => {
                    let id = doc.push_start(&e)?;
                    doc.attach_parsed(&stack, &mut root, id)?;
                    stack.push(id);
                },
                Event::Empty(e) => {
                    let id = doc.push_start(&e)?;
                    doc.attach_parsed(&stack, &mut root, id)?;
                },
                Event::End(_) => {
                    stack.pop();
                },
                Event::Text(t) => {
                    if let Some(&parent) = stack.last() {
                        doc.append_raw_text(parent, from_utf8(&t)?);
                    }
                },
                Event::GeneralRef(r) => {
                    if let Some(&parent) = stack.last() {
                        let reference = format!("&{};", from_utf8(&r)?);
                        doc.append_raw_text(parent, &reference);
                    }
                },
                Event::CData(c) => {
                    if let Some(&parent) = stack.last() {
                        let id = doc.push(NodeData::CData(from_utf8(&c)?.to_string()));
                        doc.link(parent, id);
                    }
                },
                Event::Comment(c) => {
                    if let Some(&parent) = stack.last() {
                        let id = doc.push(NodeData::Comment(from_utf8(&c)?.to_string()));
                        doc.link(parent, id);
                    }
                },
                Event::PI(p) => {
                    if let Some(&parent) = stack.last() {
                        let id = doc.push(NodeData::Pi(from_utf8(&p)?.to_string()));
                        doc.link(parent, id);
                    }
                },
                Event::Eof => break,
                _ => {},
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(XmlError::Structure("unclosed element at end of input".into()));
        }
        doc.root = root.ok_or_else(|| XmlError::Structure("document has no root element".into()))?;
        Ok(doc)
    }

    fn push_start(&mut self, e: &BytesStart<'_>) -> Result<NodeId> {
        let name = from_utf8(e.name().as_ref())?.to_string();
        let mut attrs = Vec::new();
        for attr in e.attributes() {
            let attr = attr?;
            attrs.push(Attribute {
                name: from_utf8(attr.key.as_ref())?.to_string(),
                raw: from_utf8(&attr.value)?.to_string(),
            });
        }
        Ok(self.push(NodeData::Element { name, attrs }))
    }

    fn attach_parsed(
        &mut self,
        stack: &[NodeId],
        root: &mut Option<NodeId>,
        id: NodeId,
    ) -> Result<()> {
        match stack.last() {
            Some(&parent) => self.link(parent, id),
            None if root.is_none() => *root = Some(id),
            None => return Err(XmlError::Structure("multiple root elements".into())),
        }
        Ok(())
    }

    fn append_raw_text(&mut self, parent: NodeId, raw: &str) {
        if let Some(&last) = self.nodes[parent.0].children.last()
            && let NodeData::Text(existing) = &mut self.nodes[last.0].data
        {
            existing.push_str(raw);
            return;
        }
        let id = self.push(NodeData::Text(raw.to_string()));
        self.link(parent, id);
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            data,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    fn link(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    // ----- inspection -----

    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Qualified element name, or an empty string for non-element nodes.
    pub fn name(&self, id: NodeId) -> &str {
        match &self.nodes[id.0].data {
            NodeData::Element { name, .. } => name,
            _ => "",
        }
    }

    /// Element name without its namespace prefix.
    pub fn local_name(&self, id: NodeId) -> &str {
        let name = self.name(id);
        name.rsplit_once(':').map_or(name, |(_, local)| local)
    }

    #[inline]
    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].data, NodeData::Element { .. })
    }

    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        match &self.nodes[id.0].data {
            NodeData::Element { attrs, .. } => attrs,
            _ => &[],
        }
    }

    /// Unescaped attribute value.
    pub fn attr(&self, id: NodeId, name: &str) -> Option<String> {
        self.attr_raw(id, name).map(unescape_xml)
    }

    pub fn attr_raw(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.raw.as_str())
    }

    /// Parse an attribute as an unsigned integer.
    pub fn attr_u32(&self, id: NodeId, name: &str) -> Option<u32> {
        self.attr_raw(id, name)
            .and_then(|v| atoi_simd::parse::<u32, false, false>(v.trim().as_bytes()).ok())
    }

    #[inline]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// All child nodes, including text.
    #[inline]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes[id.0]
            .children
            .iter()
            .copied()
            .filter(|&c| self.is_element(c))
    }

    /// First element child with the given qualified name.
    pub fn child(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.element_children(id).find(|&c| self.name(c) == name)
    }

    pub fn children_named<'a>(
        &'a self,
        id: NodeId,
        name: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.element_children(id).filter(move |&c| self.name(c) == name)
    }

    /// Descendant elements of `id` in document order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            stack: self.nodes[id.0].children.iter().rev().copied().collect(),
        }
    }

    /// First descendant element with the given qualified name.
    pub fn find(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.descendants(id).find(|&d| self.name(d) == name)
    }

    pub fn find_all(&self, id: NodeId, name: &str) -> Vec<NodeId> {
        self.descendants(id).filter(|&d| self.name(d) == name).collect()
    }

    /// Parents of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&p| self.parent(p))
    }

    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors(node).any(|a| a == ancestor)
    }

    /// Whether `id` is reachable from the document root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        id == self.root || self.is_ancestor(self.root, id)
    }

    /// Concatenated, unescaped text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match &self.nodes[id.0].data {
            NodeData::Text(raw) => out.push_str(&unescape_xml(raw)),
            NodeData::CData(text) => out.push_str(text),
            NodeData::Element { .. } => {
                for &child in &self.nodes[id.0].children {
                    self.collect_text(child, out);
                }
            },
            _ => {},
        }
    }

    // ----- mutation -----

    /// Create a detached element.
    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push(NodeData::Element {
            name: name.to_string(),
            attrs: Vec::new(),
        })
    }

    /// Create a detached element with attributes (values are escaped).
    pub fn create_element_with(&mut self, name: &str, attrs: &[(&str, &str)]) -> NodeId {
        let attrs = attrs
            .iter()
            .map(|(k, v)| Attribute {
                name: (*k).to_string(),
                raw: escape_xml(v),
            })
            .collect();
        self.push(NodeData::Element {
            name: name.to_string(),
            attrs,
        })
    }

    /// Parse a markup fragment with a single root element into a detached node.
    pub fn parse_fragment(&mut self, xml: &str) -> Result<NodeId> {
        let fragment = XmlDocument::parse(xml.as_bytes())?;
        Ok(self.import(&fragment, fragment.root()))
    }

    /// Set an attribute, escaping the value.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let NodeData::Element { attrs, .. } = &mut self.nodes[id.0].data {
            let raw = escape_xml(value);
            match attrs.iter_mut().find(|a| a.name == name) {
                Some(existing) => existing.raw = raw,
                None => attrs.push(Attribute {
                    name: name.to_string(),
                    raw,
                }),
            }
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> bool {
        if let NodeData::Element { attrs, .. } = &mut self.nodes[id.0].data {
            let before = attrs.len();
            attrs.retain(|a| a.name != name);
            return attrs.len() != before;
        }
        false
    }

    /// Declare `xmlns:prefix` on `id` unless already present.
    pub fn declare_namespace(&mut self, id: NodeId, prefix: &str, uri: &str) {
        let key = format!("xmlns:{prefix}");
        if self.attr_raw(id, &key).is_none() {
            self.set_attr(id, &key, uri);
        }
    }

    /// Replace every child of `id` with a single text node.
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        let old = std::mem::take(&mut self.nodes[id.0].children);
        for child in old {
            self.nodes[child.0].parent = None;
        }
        if !text.is_empty() {
            let t = self.push(NodeData::Text(escape_xml(text)));
            self.link(id, t);
        }
    }

    /// Unlink `id` from its parent. The node stays usable.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != id);
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.check_insertable(parent, child)?;
        self.detach(child);
        self.link(parent, child);
        Ok(())
    }

    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.check_insertable(parent, child)?;
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.insert(0, child);
        Ok(())
    }

    /// Insert `node` as the next sibling of `anchor`.
    pub fn insert_after(&mut self, anchor: NodeId, node: NodeId) -> Result<()> {
        self.insert_sibling(anchor, node, 1)
    }

    /// Insert `node` as the previous sibling of `anchor`.
    pub fn insert_before(&mut self, anchor: NodeId, node: NodeId) -> Result<()> {
        self.insert_sibling(anchor, node, 0)
    }

    fn insert_sibling(&mut self, anchor: NodeId, node: NodeId, offset: usize) -> Result<()> {
        if anchor == node {
            return Ok(());
        }
        let parent = self
            .parent(anchor)
            .ok_or_else(|| XmlError::Structure("anchor node has no parent".into()))?;
        self.check_insertable(parent, node)?;
        self.detach(node);
        let pos = self.nodes[parent.0]
            .children
            .iter()
            .position(|&c| c == anchor)
            .map_or(self.nodes[parent.0].children.len(), |p| p + offset);
        self.nodes[node.0].parent = Some(parent);
        self.nodes[parent.0].children.insert(pos, node);
        Ok(())
    }

    fn check_insertable(&self, parent: NodeId, child: NodeId) -> Result<()> {
        if parent == child || self.is_ancestor(child, parent) {
            return Err(XmlError::Structure("cannot insert a node into itself".into()));
        }
        Ok(())
    }

    /// Deep-copy a subtree of this document into a new detached node.
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let data = self.nodes[id.0].data.clone();
        let children = self.nodes[id.0].children.clone();
        let copy = self.push(data);
        for child in children {
            let c = self.deep_clone(child);
            self.link(copy, c);
        }
        copy
    }

    /// Deep-copy a subtree of another document into a new detached node.
    pub fn import(&mut self, other: &XmlDocument, id: NodeId) -> NodeId {
        let node = &other.nodes[id.0];
        let copy = self.push(node.data.clone());
        for &child in &node.children {
            let c = self.import(other, child);
            self.link(copy, c);
        }
        copy
    }

    // ----- serialization -----

    /// Serialize one subtree without a prolog.
    pub fn serialize(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    pub fn to_xml(&self) -> String {
        let mut out = String::with_capacity(self.nodes.len() * 32);
        if let Some(prolog) = &self.prolog {
            out.push_str(prolog);
            out.push_str("\r\n");
        }
        self.write_node(self.root, &mut out);
        out
    }

    #[inline]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_xml().into_bytes()
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        let node = &self.nodes[id.0];
        match &node.data {
            NodeData::Element { name, attrs } => {
                out.push('<');
                out.push_str(name);
                for attr in attrs {
                    out.push(' ');
                    out.push_str(&attr.name);
                    out.push_str("=\"");
                    if attr.raw.contains('"') {
                        out.push_str(&attr.raw.replace('"', "&quot;"));
                    } else {
                        out.push_str(&attr.raw);
                    }
                    out.push('"');
                }
                if node.children.is_empty() {
                    out.push_str("/>");
                } else {
                    out.push('>');
                    for &child in &node.children {
                        self.write_node(child, out);
                    }
                    out.push_str("</");
                    out.push_str(name);
                    out.push('>');
                }
            },
            NodeData::Text(raw) => out.push_str(raw),
            NodeData::CData(text) => {
                out.push_str("<![CDATA[");
                out.push_str(text);
                out.push_str("]]>");
            },
            NodeData::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            },
            NodeData::Pi(text) => {
                out.push_str("<?");
                out.push_str(text);
                out.push_str("?>");
            },
        }
    }
}

/// Preorder walk over descendant elements.
pub struct Descendants<'a> {
    doc: &'a XmlDocument,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        while let Some(id) = self.stack.pop() {
            let node = &self.doc.nodes[id.0];
            self.stack.extend(node.children.iter().rev().copied());
            if matches!(node.data, NodeData::Element { .. }) {
                return Some(id);
            }
        }
        None
    }
}

/// Split off the XML declaration (and a UTF-8 BOM) from the body.
fn split_prolog(xml: &[u8]) -> Result<(Option<String>, &[u8])> {
    let xml = xml.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(xml);
    let start = xml
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(xml.len());
    let trimmed = &xml[start..];
    if !trimmed.starts_with(b"<?xml") {
        return Ok((None, xml));
    }
    match memchr::memmem::find(trimmed, b"?>") {
        Some(end) => {
            let prolog = from_utf8(&trimmed[..end + 2])?.to_string();
            Ok((Some(prolog), &trimmed[end + 2..]))
        },
        None => Err(XmlError::Syntax("unterminated XML declaration".into())),
    }
}
