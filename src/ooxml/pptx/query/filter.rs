//! Selector input.
//!
//! A [`Selector`] is plain data describing which nodes to address. It can be
//! built in code or loaded from YAML:
//!
//! ```yaml
//! type: table-cell-paragraph
//! contains: Total
//! occurrence: "2..4"
//! attributes:
//!   a:pPr:
//!     algn: ctr
//! ```
use crate::common::error::{Error, Result};
use crate::ooxml::pptx::query::kind::NodeKind;
use crate::ooxml::pptx::query::occurrence::Occurrence;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Attribute condition on the matched node or one of its descendants.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum AttributeFilter {
    /// Substring match on the node's own attribute
    Value(String),
    Number(i64),
    /// `{attribute: value}` substring matches on a descendant named by the key
    Descendant(BTreeMap<String, String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selector {
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Substring of the node's full text content
    #[serde(default)]
    pub contains: Option<String>,
    #[serde(default)]
    pub occurrence: Option<Occurrence>,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeFilter>,
    /// Containment prefix between the root parent and the pattern, e.g. `p:grpSp/`
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub root_parent: Option<String>,
}

impl Selector {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            contains: None,
            occurrence: None,
            attributes: BTreeMap::new(),
            parent: None,
            root_parent: None,
        }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_saphyr::from_str(yaml).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn contains(mut self, text: impl Into<String>) -> Self {
        self.contains = Some(text.into());
        self
    }

    pub fn occurrence(mut self, occurrence: Occurrence) -> Self {
        self.occurrence = Some(occurrence);
        self
    }

    /// Shorthand for `occurrence(Occurrence::Nth(n))`.
    pub fn nth(self, n: usize) -> Self {
        self.occurrence(Occurrence::Nth(n))
    }

    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes
            .insert(name.into(), AttributeFilter::Value(value.into()));
        self
    }

    pub fn descendant_attribute(
        mut self,
        descendant: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        let entry = self
            .attributes
            .entry(descendant.into())
            .or_insert_with(|| AttributeFilter::Descendant(BTreeMap::new()));
        match entry {
            AttributeFilter::Descendant(map) => {
                map.insert(name.into(), value.into());
            },
            other => {
                *other = AttributeFilter::Descendant([(name.into(), value.into())].into_iter().collect());
            },
        }
        self
    }

    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn root_parent(mut self, root_parent: impl Into<String>) -> Self {
        self.root_parent = Some(root_parent.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_yaml() {
        let selector = Selector::from_yaml(
            r#"
type: table-cell-paragraph
contains: Total
occurrence: "2..4"
rootParent: p:graphicFrame
attributes:
  lang: en
  a:pPr:
    algn: ctr
"#,
        )
        .unwrap();
        assert_eq!(selector.kind, NodeKind::TableCellParagraph);
        assert_eq!(selector.contains.as_deref(), Some("Total"));
        assert_eq!(
            selector.occurrence,
            Some(Occurrence::Range { from: Some(2), to: Some(4) })
        );
        assert_eq!(selector.root_parent.as_deref(), Some("p:graphicFrame"));
        assert_eq!(selector.attributes["lang"], AttributeFilter::Value("en".into()));
        assert!(matches!(selector.attributes["a:pPr"], AttributeFilter::Descendant(ref m) if m["algn"] == "ctr"));
    }

    #[test]
    fn test_from_yaml_rejects_unknown_type() {
        assert!(matches!(
            Selector::from_yaml("type: math"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_builder() {
        let selector = Selector::new(NodeKind::Image)
            .nth(2)
            .descendant_attribute("p:cNvPr", "descr", "logo")
            .descendant_attribute("p:cNvPr", "name", "Picture");
        match &selector.attributes["p:cNvPr"] {
            AttributeFilter::Descendant(map) => assert_eq!(map.len(), 2),
            other => panic!("unexpected filter {other:?}"),
        }
        assert_eq!(selector.occurrence, Some(Occurrence::Nth(2)));
    }
}
