//! Where copied dependency parts go.
//!
//! Keyed by relationship type. Each rule names the destination folder and
//! file stem for copies, plus the content type override to register, for
//! parts whose type is not implied by their extension (ink, diagrams,
//! charts). Media keep relying on extension defaults.
use crate::ooxml::opc::constants::content_type as ct;
use phf::phf_map;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyRule {
    pub dir: &'static str,
    pub stem: &'static str,
    pub content_type: Option<&'static str>,
}

const fn rule(dir: &'static str, stem: &'static str, content_type: Option<&'static str>) -> CopyRule {
    CopyRule {
        dir,
        stem,
        content_type,
    }
}

static RULES: phf::Map<&'static str, CopyRule> = phf_map! {
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" => rule("/ppt/media", "image", None),
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/audio" => rule("/ppt/media", "media", None),
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/video" => rule("/ppt/media", "media", None),
    "http://schemas.microsoft.com/office/2007/relationships/media" => rule("/ppt/media", "media", None),
    "http://schemas.microsoft.com/office/2017/06/relationships/model3d" => rule("/ppt/media", "model3d", None),
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/oleObject" => rule("/ppt/embeddings", "oleObject", None),
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/package" => rule("/ppt/embeddings", "package", None),
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/customXml" => rule("/ppt/ink", "ink", Some(ct::INKML)),
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/diagramLayout" => rule("/ppt/diagrams", "layout", Some(ct::DML_DIAGRAM_LAYOUT)),
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/diagramData" => rule("/ppt/diagrams", "data", Some(ct::DML_DIAGRAM_DATA)),
    "http://schemas.microsoft.com/office/2007/relationships/diagramDrawing" => rule("/ppt/diagrams", "drawing", Some(ct::DML_DIAGRAM_DRAWING)),
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/diagramColors" => rule("/ppt/diagrams", "colors", Some(ct::DML_DIAGRAM_COLORS)),
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/diagramQuickStyle" => rule("/ppt/diagrams", "quickStyle", Some(ct::DML_DIAGRAM_STYLE)),
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/tags" => rule("/ppt/tags", "tag", Some(ct::PML_TAGS)),
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/chart" => rule("/ppt/charts", "chart", Some(ct::DML_CHART)),
    "http://schemas.microsoft.com/office/2014/relationships/chartEx" => rule("/ppt/charts", "chart", Some(ct::DML_CHART_EX)),
    "http://schemas.microsoft.com/office/2011/relationships/chartColorStyle" => rule("/ppt/charts", "colors", Some(ct::DML_CHART_COLOR_STYLE)),
    "http://schemas.microsoft.com/office/2011/relationships/chartStyle" => rule("/ppt/charts", "style", Some(ct::DML_CHART_STYLE)),
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/chartUserShapes" => rule("/ppt/drawings", "drawing", Some(ct::DML_CHARTSHAPES)),
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/comments" => rule("/ppt/comments", "comment", Some(ct::PML_COMMENTS)),
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesSlide" => rule("/ppt/notesSlides", "notesSlide", Some(ct::PML_NOTES_SLIDE)),
};

/// Embedded workbook behind a chart.
const CHART_WORKBOOK: CopyRule = rule("/ppt/embeddings", "Microsoft_Excel_Worksheet", None);

/// Copy rule for a relationship of `reltype`. `under_chart` selects the
/// workbook naming for packages embedded in charts.
pub fn rule_for(reltype: &str, under_chart: bool) -> Option<CopyRule> {
    let found = RULES.get(reltype).copied()?;
    if under_chart && found.stem == "package" {
        return Some(CHART_WORKBOOK);
    }
    Some(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::opc::constants::relationship_type as rt;

    #[test]
    fn test_every_owned_dependency_has_a_rule() {
        for reltype in [
            rt::IMAGE,
            rt::AUDIO,
            rt::VIDEO,
            rt::MEDIA,
            rt::MODEL_3D,
            rt::INK,
            rt::CHART,
            rt::CHART_EX,
            rt::CHART_COLOR_STYLE,
            rt::CHART_STYLE,
            rt::CHART_USER_SHAPES,
            rt::DIAGRAM_COLORS,
            rt::DIAGRAM_DATA,
            rt::DIAGRAM_DRAWING,
            rt::DIAGRAM_LAYOUT,
            rt::DIAGRAM_QUICK_STYLE,
            rt::OLE_OBJECT,
            rt::PACKAGE,
            rt::TAGS,
            rt::NOTES_SLIDE,
            rt::COMMENTS,
        ] {
            assert!(rule_for(reltype, false).is_some(), "{reltype}");
        }
        assert!(rule_for(rt::HYPERLINK, false).is_none());
        assert!(rule_for(rt::SLIDE_LAYOUT, false).is_none());
    }

    #[test]
    fn test_structural_parts_carry_overrides() {
        assert_eq!(rule_for(rt::INK, false).unwrap().content_type, Some(ct::INKML));
        assert_eq!(rule_for(rt::IMAGE, false).unwrap().content_type, None);
        assert_eq!(rule_for(rt::DIAGRAM_QUICK_STYLE, false).unwrap().stem, "quickStyle");
    }

    #[test]
    fn test_chart_workbooks_renamed() {
        assert_eq!(rule_for(rt::PACKAGE, false).unwrap().stem, "package");
        let workbook = rule_for(rt::PACKAGE, true).unwrap();
        assert_eq!(workbook.stem, "Microsoft_Excel_Worksheet");
        assert_eq!(workbook.dir, "/ppt/embeddings");
    }
}
