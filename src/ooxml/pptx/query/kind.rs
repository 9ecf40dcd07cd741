/// Selector kinds and their structural patterns.
///
/// Each [`NodeKind`] maps to one [`KindSpec`] in a static registry: the
/// element path to match, an extra test on the matched element, and the part
/// the query runs against by default.
use crate::common::xml::{NodeId, XmlDocument};
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::constants::namespace as ns;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Addressable node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Audio,
    Chart,
    Comment,
    Connector,
    Diagram,
    Image,
    Paragraph,
    Run,
    Section,
    Shape,
    Slide,
    Table,
    TableRow,
    TableCell,
    TableCellParagraph,
    Video,
}

/// Part a kind's query runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// The active slide
    Slide,
    /// The presentation part
    Presentation,
    /// The comments part of the active slide
    Comments,
}

/// Extra structural test applied to the last element of a kind's pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    Always,
    /// Some descendant has this name
    HasDescendant(&'static str),
    /// Some descendant has this name and an exact attribute value
    HasDescendantWith {
        name: &'static str,
        attr: &'static str,
        value: &'static str,
    },
    /// A descendant named `name` exists and none of `excluded` do
    HasDescendantWithout {
        name: &'static str,
        excluded: &'static [&'static str],
    },
    /// A child named `child` has a descendant named `descendant`
    ChildHasDescendant {
        child: &'static str,
        descendant: &'static str,
    },
}

impl Predicate {
    pub fn test(&self, doc: &XmlDocument, node: NodeId) -> bool {
        let has = |name: &str| doc.find(node, name).is_some();
        match *self {
            Predicate::Always => true,
            Predicate::HasDescendant(name) => has(name),
            Predicate::HasDescendantWith { name, attr, value } => doc
                .descendants(node)
                .any(|d| doc.name(d) == name && doc.attr(d, attr).as_deref() == Some(value)),
            Predicate::HasDescendantWithout { name, excluded } => {
                has(name) && !excluded.iter().any(|&e| has(e))
            },
            Predicate::ChildHasDescendant { child, descendant } => doc
                .children_named(node, child)
                .any(|c| doc.find(c, descendant).is_some()),
        }
    }
}

#[derive(Debug)]
pub struct KindSpec {
    pub kind: NodeKind,
    /// Serialized name
    pub name: &'static str,
    /// Element path below the parent prefix, `/`-separated
    pub pattern: &'static str,
    pub predicate: Predicate,
    pub scope: Scope,
    /// Default top-level element the pattern is searched under
    pub root_parent: &'static str,
}

const fn on_slide(
    kind: NodeKind,
    name: &'static str,
    pattern: &'static str,
    predicate: Predicate,
) -> KindSpec {
    KindSpec {
        kind,
        name,
        pattern,
        predicate,
        scope: Scope::Slide,
        root_parent: "p:spTree",
    }
}

/// Indexed by `NodeKind as usize`.
static REGISTRY: [KindSpec; 16] = [
    on_slide(NodeKind::Audio, "audio", "p:pic", Predicate::HasDescendant("a:audioFile")),
    on_slide(NodeKind::Chart, "chart", "p:graphicFrame", Predicate::HasDescendant("c:chart")),
    KindSpec {
        kind: NodeKind::Comment,
        name: "comment",
        pattern: "p:cm",
        predicate: Predicate::Always,
        scope: Scope::Comments,
        root_parent: "p:cmLst",
    },
    on_slide(NodeKind::Connector, "connector", "p:cxnSp", Predicate::Always),
    on_slide(
        NodeKind::Diagram,
        "diagram",
        "p:graphicFrame",
        Predicate::HasDescendantWith {
            name: "a:graphicData",
            attr: "uri",
            value: ns::DML_DIAGRAM,
        },
    ),
    on_slide(
        NodeKind::Image,
        "image",
        "p:pic",
        Predicate::HasDescendantWithout {
            name: "a:blip",
            excluded: &["a:videoFile", "a:audioFile"],
        },
    ),
    on_slide(NodeKind::Paragraph, "paragraph", "p:txBody/a:p", Predicate::Always),
    on_slide(NodeKind::Run, "run", "a:r", Predicate::Always),
    KindSpec {
        kind: NodeKind::Section,
        name: "section",
        pattern: "p14:sectionLst/p14:section",
        predicate: Predicate::Always,
        scope: Scope::Presentation,
        root_parent: "p:presentation",
    },
    on_slide(NodeKind::Shape, "shape", "p:sp", Predicate::Always),
    KindSpec {
        kind: NodeKind::Slide,
        name: "slide",
        pattern: "p:sldIdLst/p:sldId",
        predicate: Predicate::Always,
        scope: Scope::Presentation,
        root_parent: "p:presentation",
    },
    on_slide(
        NodeKind::Table,
        "table",
        "p:graphicFrame",
        Predicate::ChildHasDescendant {
            child: "a:graphic",
            descendant: "a:tbl",
        },
    ),
    on_slide(NodeKind::TableRow, "table-row", "a:tr", Predicate::Always),
    on_slide(NodeKind::TableCell, "table-cell", "a:tc", Predicate::Always),
    on_slide(
        NodeKind::TableCellParagraph,
        "table-cell-paragraph",
        "a:tc//a:p",
        Predicate::Always,
    ),
    on_slide(NodeKind::Video, "video", "p:pic", Predicate::HasDescendant("a:videoFile")),
];

impl NodeKind {
    pub const ALL: [NodeKind; 16] = [
        NodeKind::Audio,
        NodeKind::Chart,
        NodeKind::Comment,
        NodeKind::Connector,
        NodeKind::Diagram,
        NodeKind::Image,
        NodeKind::Paragraph,
        NodeKind::Run,
        NodeKind::Section,
        NodeKind::Shape,
        NodeKind::Slide,
        NodeKind::Table,
        NodeKind::TableRow,
        NodeKind::TableCell,
        NodeKind::TableCellParagraph,
        NodeKind::Video,
    ];

    #[inline]
    pub fn spec(self) -> &'static KindSpec {
        &REGISTRY[self as usize]
    }

    #[inline]
    pub fn scope(self) -> Scope {
        self.spec().scope
    }

    #[inline]
    pub fn as_str(self) -> &'static str {
        self.spec().name
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = OoxmlError;

    fn from_str(s: &str) -> Result<Self> {
        REGISTRY
            .iter()
            .find(|spec| spec.name == s)
            .map(|spec| spec.kind)
            .ok_or_else(|| OoxmlError::InvalidSelector(format!("unknown node type '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_indexed_by_kind() {
        for kind in NodeKind::ALL {
            assert_eq!(kind.spec().kind, kind);
            assert_eq!(kind.as_str().parse::<NodeKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_default_scopes() {
        assert_eq!(NodeKind::Slide.scope(), Scope::Presentation);
        assert_eq!(NodeKind::Section.scope(), Scope::Presentation);
        assert_eq!(NodeKind::Comment.scope(), Scope::Comments);
        assert_eq!(NodeKind::TableCell.scope(), Scope::Slide);
    }

    #[test]
    fn test_unknown_kind() {
        assert!(matches!(
            "math".parse::<NodeKind>(),
            Err(OoxmlError::InvalidSelector(_))
        ));
    }

    #[test]
    fn test_image_predicate_excludes_media() {
        let doc = XmlDocument::parse(
            br#"<r><p:pic><a:blip/></p:pic><p:pic><a:blip/><a:videoFile/></p:pic></r>"#,
        )
        .unwrap();
        let pics = doc.find_all(doc.root(), "p:pic");
        let image = NodeKind::Image.spec().predicate;
        let video = NodeKind::Video.spec().predicate;
        assert!(image.test(&doc, pics[0]));
        assert!(!image.test(&doc, pics[1]));
        assert!(video.test(&doc, pics[1]));
    }
}
