//! In-memory OPC package: named parts plus the content-type registry.
//!
//! Parts are plain byte blobs keyed by part name. Relationship parts are
//! stored like any other part and parsed on demand through
//! [`OpcPackage::relationships_of`]; writers put them back with
//! [`OpcPackage::set_relationships`].

use crate::common::xml::XmlDocument;
use crate::ooxml::opc::constants::{content_type as ct, relationship_type as rt};
use crate::ooxml::opc::content_types::ContentTypes;
use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::opc::packuri::{CONTENT_TYPES_URI, PackURI};
use crate::ooxml::opc::phys_pkg::{PhysPkgReader, PhysPkgWriter};
use crate::ooxml::opc::rel::Relationships;
use std::collections::BTreeMap;
use std::io::{Read, Seek};
use std::path::Path;

/// Borrowed view of a stored part with its resolved content type.
#[derive(Debug, Clone, Copy)]
pub struct Part<'a> {
    pub partname: &'a str,
    pub content_type: &'a str,
    pub blob: &'a [u8],
}

impl Part<'_> {
    /// Whether the content type names an XML payload.
    pub fn is_xml(&self) -> bool {
        is_xml_content_type(self.content_type)
    }
}

#[inline]
pub fn is_xml_content_type(content_type: &str) -> bool {
    content_type.ends_with("+xml") || content_type.ends_with("/xml")
}

#[derive(Debug, Clone, Default)]
pub struct OpcPackage {
    parts: BTreeMap<String, Vec<u8>>,
    content_types: ContentTypes,
}

impl OpcPackage {
    /// An empty package with the two ubiquitous default rules.
    pub fn new() -> Self {
        let mut content_types = ContentTypes::new();
        content_types.add_default("rels", ct::OPC_RELATIONSHIPS);
        content_types.add_default("xml", ct::XML);
        Self {
            parts: BTreeMap::new(),
            content_types,
        }
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_phys(PhysPkgReader::open(path)?)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_phys(PhysPkgReader::from_bytes(data)?)
    }

    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        Self::from_phys(PhysPkgReader::from_reader(reader)?)
    }

    fn from_phys(reader: PhysPkgReader) -> Result<Self> {
        let content_types = ContentTypes::from_xml(reader.content_types_xml()?)?;
        let mut parts = reader.into_members();
        parts.remove(CONTENT_TYPES_URI);
        tracing::debug!(parts = parts.len(), "opened package");
        Ok(Self {
            parts,
            content_types,
        })
    }

    /// Serialize to ZIP bytes, manifest first.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = PhysPkgWriter::new();
        writer.write(
            &PackURI::new(CONTENT_TYPES_URI)?,
            self.content_types.to_xml().as_bytes(),
        )?;
        for (name, blob) in &self.parts {
            writer.write(&PackURI::new(name.as_str())?, blob)?;
        }
        writer.finish()
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    // ----- parts -----

    pub fn get(&self, partname: &str) -> Result<&[u8]> {
        self.parts
            .get(partname)
            .map(Vec::as_slice)
            .ok_or_else(|| OpcError::PartNotFound(partname.to_string()))
    }

    #[inline]
    pub fn get_opt(&self, partname: &str) -> Option<&[u8]> {
        self.parts.get(partname).map(Vec::as_slice)
    }

    #[inline]
    pub fn contains(&self, partname: &str) -> bool {
        self.parts.contains_key(partname)
    }

    /// Store a part, replacing any existing content.
    pub fn add(&mut self, partname: &str, blob: Vec<u8>) {
        self.parts.insert(partname.to_string(), blob);
    }

    /// Remove a part along with its override and companion relationship part.
    pub fn delete(&mut self, partname: &str) -> Option<Vec<u8>> {
        let removed = self.parts.remove(partname)?;
        self.content_types.remove_override(partname);
        if let Ok(uri) = PackURI::new(partname) {
            self.parts.remove(uri.rels_uri().as_str());
        }
        tracing::trace!(partname, "deleted part");
        Some(removed)
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.keys().map(String::as_str)
    }

    pub fn part(&self, partname: &str) -> Result<Part<'_>> {
        let (name, blob) = self
            .parts
            .get_key_value(partname)
            .ok_or_else(|| OpcError::PartNotFound(partname.to_string()))?;
        Ok(Part {
            partname: name,
            content_type: self.content_types.resolve(name)?,
            blob,
        })
    }

    /// Part names whose resolved content type equals `content_type`.
    pub fn parts_of_type(&self, content_type: &str) -> Vec<PackURI> {
        self.parts
            .keys()
            .filter(|name| self.content_types.resolve(name).ok() == Some(content_type))
            .filter_map(|name| PackURI::new(name.as_str()).ok())
            .collect()
    }

    // ----- content types -----

    #[inline]
    pub fn content_types(&self) -> &ContentTypes {
        &self.content_types
    }

    #[inline]
    pub fn content_types_mut(&mut self) -> &mut ContentTypes {
        &mut self.content_types
    }

    /// Override first, else extension default, else `ContentTypeUnresolved`.
    pub fn content_type_of(&self, partname: &str) -> Result<&str> {
        self.content_types.resolve(partname)
    }

    // ----- XML -----

    pub fn xml(&self, partname: &str) -> Result<XmlDocument> {
        Ok(XmlDocument::parse(self.get(partname)?)?)
    }

    pub fn put_xml(&mut self, partname: &str, doc: &XmlDocument) {
        self.add(partname, doc.to_bytes());
    }

    // ----- relationships -----

    /// Parse the companion relationship part of `source`.
    ///
    /// A source without one has an empty set.
    pub fn relationships_of(&self, source: &PackURI) -> Result<Relationships> {
        let rels_uri = source.rels_uri();
        match self.parts.get(rels_uri.as_str()) {
            Some(xml) => Relationships::from_xml(source.base_uri(), xml),
            None => Ok(Relationships::new(source.base_uri())),
        }
    }

    /// Write a relationship set back next to its source.
    pub fn set_relationships(&mut self, source: &PackURI, rels: &Relationships) {
        let rels_uri = source.rels_uri();
        if rels.is_empty() && !self.parts.contains_key(rels_uri.as_str()) {
            return;
        }
        self.parts
            .insert(rels_uri.as_str().to_string(), rels.to_xml().into_bytes());
    }

    /// Follow `r_id` from `source` to an absolute part name.
    pub fn resolve(&self, source: &PackURI, r_id: &str) -> Result<PackURI> {
        self.relationships_of(source)?.resolve(r_id)
    }

    /// The main document part named by the package-level `officeDocument` relationship.
    pub fn main_document(&self) -> Result<PackURI> {
        let package = PackURI::package();
        let rels = self.relationships_of(&package)?;
        let rel = rels.part_with_reltype(rt::OFFICE_DOCUMENT)?;
        rels.target_partname(rel)
    }

    /// Every (source, rId) pair whose internal relationship targets `target`.
    pub fn referrers(&self, target: &str) -> Vec<(PackURI, String)> {
        let mut found = Vec::new();
        for name in self.parts.keys() {
            let Ok(rels_uri) = PackURI::new(name.as_str()) else {
                continue;
            };
            let Some(source) = rels_uri.rels_source() else {
                continue;
            };
            let Ok(rels) = self.relationships_of(&source) else {
                continue;
            };
            for rel in rels.targeting(target) {
                found.push((source.clone(), rel.r_id().to_string()));
            }
        }
        found
    }
}
