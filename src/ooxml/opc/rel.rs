//! Relationship sets owned by a single source part.
//!
//! A set is parsed from the source's companion `.rels` part and written back
//! in lockstep with every cross-part reference added or removed.

use crate::common::xml::{XmlDocument, escape_xml};
use crate::ooxml::opc::constants::{namespace, target_mode};
use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::opc::packuri::PackURI;

/// A single relationship from a source part to a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    r_id: String,
    reltype: String,
    target_ref: String,
    is_external: bool,
}

impl Relationship {
    pub fn new(
        r_id: impl Into<String>,
        reltype: impl Into<String>,
        target_ref: impl Into<String>,
        is_external: bool,
    ) -> Self {
        Self {
            r_id: r_id.into(),
            reltype: reltype.into(),
            target_ref: target_ref.into(),
            is_external,
        }
    }

    #[inline]
    pub fn r_id(&self) -> &str {
        &self.r_id
    }

    #[inline]
    pub fn reltype(&self) -> &str {
        &self.reltype
    }

    /// Target as written: a relative part reference or an external URL.
    #[inline]
    pub fn target_ref(&self) -> &str {
        &self.target_ref
    }

    #[inline]
    pub fn is_external(&self) -> bool {
        self.is_external
    }

    pub fn set_target_ref(&mut self, target_ref: impl Into<String>) {
        self.target_ref = target_ref.into();
    }
}

/// Ordered relationship collection keyed by rId.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationships {
    /// Directory of the owning part, used to resolve relative targets
    base_uri: String,
    rels: Vec<Relationship>,
}

impl Relationships {
    pub fn new(base_uri: impl Into<String>) -> Self {
        Self {
            base_uri: base_uri.into(),
            rels: Vec::new(),
        }
    }

    /// Parse a `.rels` part belonging to a source in `base_uri`.
    pub fn from_xml(base_uri: impl Into<String>, xml: &[u8]) -> Result<Self> {
        let doc = XmlDocument::parse(xml)?;
        let mut rels = Self::new(base_uri);
        for node in doc.element_children(doc.root()) {
            if doc.local_name(node) != "Relationship" {
                continue;
            }
            let (Some(r_id), Some(reltype), Some(target)) = (
                doc.attr(node, "Id"),
                doc.attr(node, "Type"),
                doc.attr(node, "Target"),
            ) else {
                return Err(OpcError::InvalidRelationship(format!(
                    "incomplete relationship in {}",
                    rels.base_uri
                )));
            };
            let external = doc
                .attr_raw(node, "TargetMode")
                .is_some_and(|m| m == target_mode::EXTERNAL);
            rels.insert(Relationship::new(r_id, reltype, target, external));
        }
        Ok(rels)
    }

    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(160 + 192 * self.rels.len());
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push_str("\r\n");
        xml.push_str(&format!(r#"<Relationships xmlns="{}">"#, namespace::OPC_RELATIONSHIPS));
        for rel in &self.rels {
            let mode = if rel.is_external {
                r#" TargetMode="External""#
            } else {
                ""
            };
            xml.push_str(&format!(
                r#"<Relationship Id="{}" Type="{}" Target="{}"{}/>"#,
                escape_xml(&rel.r_id),
                escape_xml(&rel.reltype),
                escape_xml(&rel.target_ref),
                mode
            ));
        }
        xml.push_str("</Relationships>");
        xml
    }

    #[inline]
    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    #[inline]
    pub fn get(&self, r_id: &str) -> Option<&Relationship> {
        self.rels.iter().find(|r| r.r_id == r_id)
    }

    pub fn get_mut(&mut self, r_id: &str) -> Option<&mut Relationship> {
        self.rels.iter_mut().find(|r| r.r_id == r_id)
    }

    #[inline]
    pub fn contains(&self, r_id: &str) -> bool {
        self.get(r_id).is_some()
    }

    /// Insert a relationship, replacing any existing entry with the same rId.
    pub fn insert(&mut self, rel: Relationship) {
        match self.rels.iter_mut().find(|r| r.r_id == rel.r_id) {
            Some(existing) => *existing = rel,
            None => self.rels.push(rel),
        }
    }

    /// Add a relationship under the next free rId and return that rId.
    pub fn add(&mut self, reltype: &str, target_ref: &str, is_external: bool) -> String {
        let r_id = self.next_r_id();
        self.rels
            .push(Relationship::new(r_id.clone(), reltype, target_ref, is_external));
        r_id
    }

    /// Reuse an internal relationship of this type and target, or add one.
    pub fn get_or_add(&mut self, reltype: &str, target_ref: &str) -> String {
        self.find(reltype, target_ref, false)
            .unwrap_or_else(|| self.add(reltype, target_ref, false))
    }

    /// Reuse an external relationship of this type and target, or add one.
    pub fn get_or_add_ext_rel(&mut self, reltype: &str, target_ref: &str) -> String {
        self.find(reltype, target_ref, true)
            .unwrap_or_else(|| self.add(reltype, target_ref, true))
    }

    fn find(&self, reltype: &str, target_ref: &str, external: bool) -> Option<String> {
        self.rels
            .iter()
            .find(|r| r.reltype == reltype && r.target_ref == target_ref && r.is_external == external)
            .map(|r| r.r_id.clone())
    }

    /// Next available id of the form `rIdN`, filling gaps from `rId1`.
    pub fn next_r_id(&self) -> String {
        let mut used: Vec<u32> = self
            .rels
            .iter()
            .filter_map(|r| r.r_id.strip_prefix("rId"))
            .filter_map(|n| atoi_simd::parse::<u32, false, false>(n.as_bytes()).ok())
            .collect();
        used.sort_unstable();
        used.dedup();

        let mut next = 1u32;
        for n in used {
            if n == next {
                next += 1;
            } else if n > next {
                break;
            }
        }
        format!("rId{next}")
    }

    pub fn remove(&mut self, r_id: &str) -> Option<Relationship> {
        let pos = self.rels.iter().position(|r| r.r_id == r_id)?;
        Some(self.rels.remove(pos))
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.rels.iter()
    }

    pub fn of_type<'a>(&'a self, reltype: &'a str) -> impl Iterator<Item = &'a Relationship> + 'a {
        self.rels.iter().filter(move |r| r.reltype == reltype)
    }

    /// The single relationship of a type. Errors when absent or ambiguous.
    pub fn part_with_reltype(&self, reltype: &str) -> Result<&Relationship> {
        let mut matching = self.rels.iter().filter(|r| r.reltype == reltype);
        match (matching.next(), matching.next()) {
            (Some(rel), None) => Ok(rel),
            (None, _) => Err(OpcError::RelationshipNotFound(format!(
                "no relationship of type '{reltype}'"
            ))),
            (Some(_), Some(_)) => Err(OpcError::InvalidRelationship(format!(
                "multiple relationships of type '{reltype}'"
            ))),
        }
    }

    /// Absolute part name a relationship points at.
    pub fn target_partname(&self, rel: &Relationship) -> Result<PackURI> {
        if rel.is_external {
            return Err(OpcError::InvalidRelationship(format!(
                "{} is external and has no target part",
                rel.r_id
            )));
        }
        PackURI::from_rel_ref(&self.base_uri, &rel.target_ref)
    }

    /// Follow an rId to an absolute part name.
    pub fn resolve(&self, r_id: &str) -> Result<PackURI> {
        let rel = self
            .get(r_id)
            .ok_or_else(|| OpcError::RelationshipNotFound(r_id.to_string()))?;
        self.target_partname(rel)
    }

    /// Internal relationships whose target resolves to `partname`.
    pub fn targeting<'a>(&'a self, partname: &'a str) -> impl Iterator<Item = &'a Relationship> + 'a {
        self.rels.iter().filter(move |r| {
            !r.is_external
                && self
                    .target_partname(r)
                    .is_ok_and(|uri| uri.as_str() == partname)
        })
    }

    /// Point a relationship at a new part, written relative to the owner.
    pub fn retarget(&mut self, r_id: &str, partname: &PackURI) -> Result<()> {
        let target = partname.relative_ref(&self.base_uri);
        let rel = self
            .get_mut(r_id)
            .ok_or_else(|| OpcError::RelationshipNotFound(r_id.to_string()))?;
        rel.set_target_ref(target);
        Ok(())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rels.is_empty()
    }
}

impl Default for Relationships {
    fn default() -> Self {
        Self::new("/")
    }
}
