//! Connector shapes between two existing shapes.
//!
//! A connector (`p:cxnSp`) is a line whose ends are glued to connection
//! sites of other shapes. Rectangular shapes expose four sites, numbered
//! counter-clockwise from the top.
//!
//! ```yaml
//! placement:
//!   coordinateX: 1970000
//!   coordinateY: 875000
//!   sizeX: 3430000
//!   sizeY: 0
//! start: { shape: 4 }
//! end: { shape: 5, side: top }
//! geometry: bentConnector3
//! color: FF0000
//! lineWidth: 25400
//! ```
use crate::common::error::{Error, Result as CommonResult};
use crate::common::xml::escape_xml;
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::pptx::Package;
use crate::ooxml::pptx::ids::{IdAllocator, shape_ids};
use crate::ooxml::pptx::query::QueryOptions;
use serde::Deserialize;

/// Connection site on the glued shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Top,
    Left,
    Bottom,
    Right,
}

impl Side {
    /// Site index (`idx`) of a rectangular shape.
    pub fn index(self) -> u32 {
        match self {
            Side::Top => 0,
            Side::Left => 1,
            Side::Bottom => 2,
            Side::Right => 3,
        }
    }
}

/// Where the connector sits, in EMUs. Every field is required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Placement {
    pub coordinate_x: Option<i64>,
    pub coordinate_y: Option<i64>,
    pub size_x: Option<i64>,
    pub size_y: Option<i64>,
    /// Shape name; `Connector {id}` when unset
    pub name: Option<String>,
}

impl Placement {
    pub fn new(x: i64, y: i64, cx: i64, cy: i64) -> Self {
        Self {
            coordinate_x: Some(x),
            coordinate_y: Some(y),
            size_x: Some(cx),
            size_y: Some(cy),
            name: None,
        }
    }

    fn resolve(&self) -> Result<[i64; 4]> {
        let field = |value: Option<i64>, name: &str| {
            value.ok_or_else(|| OoxmlError::InvalidSelector(format!("placement is missing {name}")))
        };
        let rect = [
            field(self.coordinate_x, "coordinateX")?,
            field(self.coordinate_y, "coordinateY")?,
            field(self.size_x, "sizeX")?,
            field(self.size_y, "sizeY")?,
        ];
        if rect[2] < 0 || rect[3] < 0 {
            return Err(OoxmlError::InvalidSelector("placement size must not be negative".to_string()));
        }
        Ok(rect)
    }
}

/// One glued end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Connection {
    /// `cNvPr/@id` of the shape on the active slide
    pub shape: u32,
    #[serde(default)]
    pub side: Option<Side>,
}

impl Connection {
    pub fn new(shape: u32) -> Self {
        Self { shape, side: None }
    }

    pub fn side(mut self, side: Side) -> Self {
        self.side = Some(side);
        self
    }
}

/// A connector to insert.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorSpec {
    #[serde(default)]
    pub placement: Placement,
    pub start: Connection,
    pub end: Connection,
    /// Preset geometry, `straightConnector1` when unset
    #[serde(default)]
    pub geometry: Option<String>,
    /// Line end decoration at the tail, `triangle` when unset
    #[serde(default)]
    pub tail_end: Option<String>,
    /// Line color as six hex digits
    #[serde(default)]
    pub color: Option<String>,
    /// Line width in EMUs
    #[serde(default)]
    pub line_width: Option<u32>,
    #[serde(default)]
    pub dash: Option<String>,
    #[serde(default)]
    pub flip_h: bool,
    #[serde(default)]
    pub flip_v: bool,
}

impl ConnectorSpec {
    pub fn new(placement: Placement, start: Connection, end: Connection) -> Self {
        Self {
            placement,
            start,
            end,
            geometry: None,
            tail_end: None,
            color: None,
            line_width: None,
            dash: None,
            flip_h: false,
            flip_v: false,
        }
    }

    pub fn from_yaml(yaml: &str) -> CommonResult<Self> {
        serde_saphyr::from_str(yaml).map_err(|e| Error::Config(e.to_string()))
    }

    fn markup(&self, id: u32) -> Result<String> {
        let [x, y, cx, cy] = self.placement.resolve()?;
        let name = match &self.placement.name {
            Some(name) => escape_xml(name),
            None => format!("Connector {id}"),
        };
        let start_idx = self.start.side.unwrap_or(Side::Right).index();
        let end_idx = self.end.side.unwrap_or(Side::Left).index();

        let mut xfrm_attrs = String::new();
        if self.flip_h {
            xfrm_attrs.push_str(r#" flipH="1""#);
        }
        if self.flip_v {
            xfrm_attrs.push_str(r#" flipV="1""#);
        }
        let geometry = escape_xml(self.geometry.as_deref().unwrap_or("straightConnector1"));

        let mut line = match self.line_width {
            Some(w) => format!(r#"<a:ln w="{w}">"#),
            None => "<a:ln>".to_string(),
        };
        if let Some(color) = &self.color {
            if color.len() != 6 || !color.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(OoxmlError::InvalidSelector(format!("color {color:?} is not RRGGBB")));
            }
            line.push_str(&format!(r#"<a:solidFill><a:srgbClr val="{color}"/></a:solidFill>"#));
        }
        if let Some(dash) = &self.dash {
            line.push_str(&format!(r#"<a:prstDash val="{}"/>"#, escape_xml(dash)));
        }
        line.push_str(&format!(
            r#"<a:tailEnd type="{}"/></a:ln>"#,
            escape_xml(self.tail_end.as_deref().unwrap_or("triangle"))
        ));

        Ok(format!(
            concat!(
                r#"<p:cxnSp><p:nvCxnSpPr><p:cNvPr id="{id}" name="{name}"/><p:cNvCxnSpPr><a:cxnSpLocks/>"#,
                r#"<a:stCxn id="{start}" idx="{start_idx}"/><a:endCxn id="{end}" idx="{end_idx}"/></p:cNvCxnSpPr><p:nvPr/></p:nvCxnSpPr>"#,
                r#"<p:spPr><a:xfrm{xfrm_attrs}><a:off x="{x}" y="{y}"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm>"#,
                r#"<a:prstGeom prst="{geometry}"><a:avLst/></a:prstGeom>{line}</p:spPr>"#,
                r#"<p:style><a:lnRef idx="1"><a:schemeClr val="accent1"/></a:lnRef><a:fillRef idx="0"><a:schemeClr val="accent1"/></a:fillRef>"#,
                r#"<a:effectRef idx="0"><a:schemeClr val="accent1"/></a:effectRef><a:fontRef idx="minor"><a:schemeClr val="tx1"/></a:fontRef></p:style></p:cxnSp>"#,
            ),
            id = id,
            name = name,
            start = self.start.shape,
            start_idx = start_idx,
            end = self.end.shape,
            end_idx = end_idx,
            xfrm_attrs = xfrm_attrs,
            x = x,
            y = y,
            cx = cx,
            cy = cy,
            geometry = geometry,
            line = line,
        ))
    }
}

/// Insert a connector into the active slide. Returns its shape id.
pub fn add_connector(pkg: &mut Package, spec: &ConnectorSpec, options: &QueryOptions) -> Result<u32> {
    add_connector_with(pkg, spec, options, &mut IdAllocator::new())
}

pub fn add_connector_with(
    pkg: &mut Package,
    spec: &ConnectorSpec,
    options: &QueryOptions,
    alloc: &mut IdAllocator,
) -> Result<u32> {
    let slide = pkg
        .slide_partname(options.active_slide)?
        .ok_or_else(|| OoxmlError::PartNotFound(format!("slide at position {}", options.active_slide)))?;
    let mut doc = pkg.opc().xml(&slide)?;
    let used = shape_ids(&doc);
    for end in [spec.start.shape, spec.end.shape] {
        if !used.contains(&end) {
            return Err(OoxmlError::InvalidSelector(format!("no shape with id {end} on {slide}")));
        }
    }
    let Some(tree) = doc.find(doc.root(), "p:spTree") else {
        return Err(OoxmlError::InvalidFormat(format!("{slide} has no p:spTree")));
    };

    let id = alloc.new_shape_id(&used);
    let node = doc.parse_fragment(&spec.markup(id)?)?;
    doc.append_child(tree, node)?;
    pkg.opc_mut().put_xml(&slide, &doc);
    tracing::debug!(%slide, id, start = spec.start.shape, end = spec.end.shape, "added connector");
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::pptx::ids::testing::SequenceEntropy;
    use crate::ooxml::pptx::query::{NodeKind, Selector, select};
    use crate::ooxml::pptx::testutil::{DeckBuilder, title_shape};

    fn two_boxes() -> Package {
        DeckBuilder::new()
            .slide_with("a", &title_shape(3, "b"))
            .slide("other")
            .build()
    }

    #[test]
    fn test_connector_between_shapes() {
        let mut pkg = two_boxes();
        let spec = ConnectorSpec::new(
            Placement::new(1_970_000, 875_000, 3_430_000, 0),
            Connection::new(2),
            Connection::new(3),
        );
        let mut alloc = IdAllocator::with_entropy(Box::new(SequenceEntropy::new(vec![0, 4_000_001])));
        let id = add_connector_with(&mut pkg, &spec, &QueryOptions::default(), &mut alloc).unwrap();
        assert_eq!(id, 5_000_000);

        let found = select(&pkg, &Selector::new(NodeKind::Connector), &QueryOptions::default())
            .unwrap()
            .unwrap();
        assert_eq!(found.nodes.len(), 1);
        let doc = &found.doc;
        let cxn = found.nodes[0];
        let st = doc.find(cxn, "a:stCxn").unwrap();
        let end = doc.find(cxn, "a:endCxn").unwrap();
        assert_eq!((doc.attr_u32(st, "id"), doc.attr_u32(st, "idx")), (Some(2), Some(3)));
        assert_eq!((doc.attr_u32(end, "id"), doc.attr_u32(end, "idx")), (Some(3), Some(1)));
        let geom = doc.find(cxn, "a:prstGeom").unwrap();
        assert_eq!(doc.attr(geom, "prst").as_deref(), Some("straightConnector1"));
        let tail = doc.find(cxn, "a:tailEnd").unwrap();
        assert_eq!(doc.attr(tail, "type").as_deref(), Some("triangle"));
        let ext = doc.find(cxn, "a:ext").unwrap();
        assert_eq!(doc.attr(ext, "cx").as_deref(), Some("3430000"));
    }

    #[test]
    fn test_connector_from_yaml_with_styling() {
        let spec = ConnectorSpec::from_yaml(
            "placement: { coordinateX: 10, coordinateY: 20, sizeX: 30, sizeY: 40, name: Link }\n\
             start: { shape: 2, side: bottom }\n\
             end: { shape: 3, side: top }\n\
             geometry: bentConnector3\n\
             color: 0000FF\n\
             lineWidth: 25400\n\
             flipV: true\n",
        )
        .unwrap();
        assert_eq!(spec.start.side, Some(Side::Bottom));

        let mut pkg = two_boxes();
        add_connector(&mut pkg, &spec, &QueryOptions::default()).unwrap();
        let slide = pkg.slide_partname(0).unwrap().unwrap();
        let xml = pkg.opc().xml(&slide).unwrap().to_xml();
        assert!(xml.contains(r#"name="Link""#));
        assert!(xml.contains(r#"<a:stCxn id="2" idx="2"/>"#));
        assert!(xml.contains(r#"<a:endCxn id="3" idx="0"/>"#));
        assert!(xml.contains(r#"<a:ln w="25400"><a:solidFill><a:srgbClr val="0000FF"/>"#));
        assert!(xml.contains(r#"<a:xfrm flipV="1">"#));
        assert!(xml.contains(r#"prst="bentConnector3""#));
    }

    #[test]
    fn test_incomplete_placement_rejected() {
        let mut pkg = two_boxes();
        let mut spec = ConnectorSpec::new(Placement::new(0, 0, 10, 10), Connection::new(2), Connection::new(3));
        spec.placement.size_y = None;
        let err = add_connector(&mut pkg, &spec, &QueryOptions::default()).unwrap_err();
        assert!(matches!(err, OoxmlError::InvalidSelector(ref m) if m.contains("sizeY")));

        let spec = ConnectorSpec::new(Placement::new(0, 0, 10, 10), Connection::new(2), Connection::new(99));
        let err = add_connector(&mut pkg, &spec, &QueryOptions::default()).unwrap_err();
        assert!(matches!(err, OoxmlError::InvalidSelector(_)));

        let slide = pkg.slide_partname(0).unwrap().unwrap();
        assert!(!pkg.opc().xml(&slide).unwrap().to_xml().contains("p:cxnSp"));
    }

    #[test]
    fn test_connector_on_other_slide() {
        let mut pkg = two_boxes();
        let spec = ConnectorSpec::new(Placement::new(0, 0, 10, 10), Connection::new(2), Connection::new(2));
        let options = QueryOptions { active_slide: 1 };
        add_connector(&mut pkg, &spec, &options).unwrap();
        let second = pkg.slide_partname(1).unwrap().unwrap();
        assert!(pkg.opc().xml(&second).unwrap().to_xml().contains("p:cxnSp"));
        let missing = QueryOptions { active_slide: 7 };
        assert!(matches!(
            add_connector(&mut pkg, &spec, &missing),
            Err(OoxmlError::PartNotFound(_))
        ));
    }
}
