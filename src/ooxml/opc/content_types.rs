//! The `[Content_Types].xml` manifest.
//!
//! Holds `Default` rules keyed by extension and `Override` rules keyed by
//! part name. Every part must resolve to exactly one type: an override wins,
//! otherwise the extension default applies (extensions match
//! case-insensitively), otherwise resolution fails.

use crate::common::xml::{XmlDocument, escape_xml};
use crate::ooxml::opc::constants::namespace;
use crate::ooxml::opc::error::{OpcError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentTypes {
    defaults: Vec<(String, String)>,
    overrides: Vec<(String, String)>,
}

impl ContentTypes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the manifest XML.
    pub fn from_xml(xml: &[u8]) -> Result<Self> {
        let doc = XmlDocument::parse(xml)?;
        let root = doc.root();
        if doc.local_name(root) != "Types" {
            return Err(OpcError::InvalidContentTypes(format!(
                "unexpected root element '{}'",
                doc.name(root)
            )));
        }

        let mut types = Self::new();
        for child in doc.element_children(root) {
            match doc.local_name(child) {
                "Default" => {
                    if let (Some(ext), Some(ct)) =
                        (doc.attr(child, "Extension"), doc.attr(child, "ContentType"))
                    {
                        types.add_default(&ext, &ct);
                    }
                },
                "Override" => {
                    if let (Some(name), Some(ct)) =
                        (doc.attr(child, "PartName"), doc.attr(child, "ContentType"))
                    {
                        types.set_override(&name, &ct);
                    }
                },
                _ => {},
            }
        }
        Ok(types)
    }

    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(256 + 160 * (self.defaults.len() + self.overrides.len()));
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push_str("\r\n");
        xml.push_str(&format!(r#"<Types xmlns="{}">"#, namespace::OPC_CONTENT_TYPES));
        for (ext, ct) in &self.defaults {
            xml.push_str(&format!(
                r#"<Default Extension="{}" ContentType="{}"/>"#,
                escape_xml(ext),
                escape_xml(ct)
            ));
        }
        for (name, ct) in &self.overrides {
            xml.push_str(&format!(
                r#"<Override PartName="{}" ContentType="{}"/>"#,
                escape_xml(name),
                escape_xml(ct)
            ));
        }
        xml.push_str("</Types>");
        xml
    }

    /// Resolve the content type of a part: override first, then extension default.
    pub fn resolve(&self, partname: &str) -> Result<&str> {
        if let Some(ct) = self.override_for(partname) {
            return Ok(ct);
        }
        let filename = partname.rsplit('/').next().unwrap_or("");
        filename
            .rfind('.')
            .and_then(|pos| self.default_for(&filename[pos + 1..]))
            .ok_or_else(|| OpcError::ContentTypeUnresolved(partname.to_string()))
    }

    pub fn default_for(&self, ext: &str) -> Option<&str> {
        self.defaults
            .iter()
            .find(|(e, _)| e.eq_ignore_ascii_case(ext))
            .map(|(_, ct)| ct.as_str())
    }

    #[inline]
    pub fn has_default(&self, ext: &str) -> bool {
        self.default_for(ext).is_some()
    }

    /// Add a default rule unless one for the extension already exists.
    ///
    /// Returns whether the rule was added.
    pub fn add_default(&mut self, ext: &str, content_type: &str) -> bool {
        if self.has_default(ext) {
            return false;
        }
        self.defaults.push((ext.to_string(), content_type.to_string()));
        true
    }

    pub fn override_for(&self, partname: &str) -> Option<&str> {
        self.overrides
            .iter()
            .find(|(name, _)| name == partname)
            .map(|(_, ct)| ct.as_str())
    }

    /// Insert or replace the override for a part.
    pub fn set_override(&mut self, partname: &str, content_type: &str) {
        match self.overrides.iter_mut().find(|(name, _)| name == partname) {
            Some(entry) => entry.1 = content_type.to_string(),
            None => self
                .overrides
                .push((partname.to_string(), content_type.to_string())),
        }
    }

    pub fn remove_override(&mut self, partname: &str) -> Option<String> {
        let pos = self.overrides.iter().position(|(name, _)| name == partname)?;
        Some(self.overrides.remove(pos).1)
    }

    /// Make `partname` resolve to `content_type`, adding an override only
    /// when the extension default does not already produce it.
    pub fn ensure(&mut self, partname: &str, content_type: &str) {
        if self.resolve(partname).ok() != Some(content_type) {
            self.set_override(partname, content_type);
        }
    }

    pub fn defaults(&self) -> impl Iterator<Item = (&str, &str)> {
        self.defaults.iter().map(|(e, c)| (e.as_str(), c.as_str()))
    }

    pub fn overrides(&self) -> impl Iterator<Item = (&str, &str)> {
        self.overrides.iter().map(|(n, c)| (n.as_str(), c.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::opc::constants::content_type as ct;

    const MANIFEST: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="PNG" ContentType="image/png"/><Override PartName="/ppt/slides/slide1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/></Types>"#;

    #[test]
    fn test_override_wins_over_default() {
        let types = ContentTypes::from_xml(MANIFEST.as_bytes()).unwrap();
        assert_eq!(types.resolve("/ppt/slides/slide1.xml").unwrap(), ct::PML_SLIDE);
        assert_eq!(types.resolve("/ppt/slides/slide2.xml").unwrap(), ct::XML);
    }

    #[test]
    fn test_extension_matches_case_insensitively() {
        let types = ContentTypes::from_xml(MANIFEST.as_bytes()).unwrap();
        assert_eq!(types.resolve("/ppt/media/image1.png").unwrap(), "image/png");
        assert!(!types.clone().add_default("png", "image/png"));
    }

    #[test]
    fn test_unresolved_content_type() {
        let types = ContentTypes::from_xml(MANIFEST.as_bytes()).unwrap();
        let err = types.resolve("/ppt/media/clip.mp4").unwrap_err();
        assert!(matches!(err, OpcError::ContentTypeUnresolved(ref p) if p == "/ppt/media/clip.mp4"));
        assert!(types.resolve("/ppt/noext").is_err());
    }

    #[test]
    fn test_ensure_skips_redundant_override() {
        let mut types = ContentTypes::from_xml(MANIFEST.as_bytes()).unwrap();
        types.ensure("/ppt/media/image9.png", "image/png");
        assert!(types.override_for("/ppt/media/image9.png").is_none());

        types.ensure("/ppt/ink/ink1.xml", ct::INKML);
        assert_eq!(types.override_for("/ppt/ink/ink1.xml"), Some(ct::INKML));
    }

    #[test]
    fn test_serialized_manifest_reparses_equal() {
        let mut types = ContentTypes::from_xml(MANIFEST.as_bytes()).unwrap();
        types.set_override("/ppt/charts/chart1.xml", ct::DML_CHART);
        let reparsed = ContentTypes::from_xml(types.to_xml().as_bytes()).unwrap();
        assert_eq!(reparsed, types);
    }
}
