/// Chart family classification.
///
/// A chart part names its type through the first `*Chart` child of
/// `c:plotArea`. The tag is looked up in a fixed table; anything not in the
/// table is reported as [`OoxmlError::UnknownChartType`] rather than guessed.
use crate::common::xml::XmlDocument;
use crate::ooxml::error::{OoxmlError, Result};
use std::fmt;

/// Chart family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartFamily {
    Area,
    /// Bar and column charts
    Bar,
    Bubble,
    Doughnut,
    Line,
    /// Pie-of-pie and bar-of-pie
    OfPie,
    Pie,
    Radar,
    Scatter,
    Stock,
    Surface,
}

impl ChartFamily {
    pub fn as_str(self) -> &'static str {
        match self {
            ChartFamily::Area => "area",
            ChartFamily::Bar => "bar",
            ChartFamily::Bubble => "bubble",
            ChartFamily::Doughnut => "doughnut",
            ChartFamily::Line => "line",
            ChartFamily::OfPie => "ofPie",
            ChartFamily::Pie => "pie",
            ChartFamily::Radar => "radar",
            ChartFamily::Scatter => "scatter",
            ChartFamily::Stock => "stock",
            ChartFamily::Surface => "surface",
        }
    }
}

impl fmt::Display for ChartFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Flat,
    ThreeD,
}

/// Solid used by 3-D bar charts (`c:shape/@val`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BarShape {
    Box,
    Cylinder,
    Cone,
    Pyramid,
}

impl BarShape {
    fn from_val(val: &str) -> Option<Self> {
        match val {
            "box" => Some(BarShape::Box),
            "cylinder" => Some(BarShape::Cylinder),
            // coneToMax and pyramidToMax only differ in how the tip is cut
            "cone" | "coneToMax" => Some(BarShape::Cone),
            "pyramid" | "pyramidToMax" => Some(BarShape::Pyramid),
            _ => None,
        }
    }
}

/// Result of classifying one chart part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChartKind {
    pub family: ChartFamily,
    pub dimension: Dimension,
    pub shape: Option<BarShape>,
}

static CHART_TAGS: phf::Map<&'static str, (ChartFamily, Dimension)> = phf::phf_map! {
    "areaChart" => (ChartFamily::Area, Dimension::Flat),
    "area3DChart" => (ChartFamily::Area, Dimension::ThreeD),
    "barChart" => (ChartFamily::Bar, Dimension::Flat),
    "bar3DChart" => (ChartFamily::Bar, Dimension::ThreeD),
    "colChart" => (ChartFamily::Bar, Dimension::Flat),
    "col3DChart" => (ChartFamily::Bar, Dimension::ThreeD),
    "bubbleChart" => (ChartFamily::Bubble, Dimension::Flat),
    "doughnutChart" => (ChartFamily::Doughnut, Dimension::Flat),
    "lineChart" => (ChartFamily::Line, Dimension::Flat),
    "line3DChart" => (ChartFamily::Line, Dimension::ThreeD),
    "ofPieChart" => (ChartFamily::OfPie, Dimension::Flat),
    "pieChart" => (ChartFamily::Pie, Dimension::Flat),
    "pie3DChart" => (ChartFamily::Pie, Dimension::ThreeD),
    "radarChart" => (ChartFamily::Radar, Dimension::Flat),
    "scatterChart" => (ChartFamily::Scatter, Dimension::Flat),
    "stockChart" => (ChartFamily::Stock, Dimension::Flat),
    "surfaceChart" => (ChartFamily::Surface, Dimension::Flat),
    "surface3DChart" => (ChartFamily::Surface, Dimension::ThreeD),
};

/// Look up a plot-area child tag (without prefix).
pub fn lookup(tag: &str) -> Result<(ChartFamily, Dimension)> {
    CHART_TAGS
        .get(tag)
        .copied()
        .ok_or_else(|| OoxmlError::UnknownChartType(tag.to_string()))
}

/// Classify a parsed `c:chartSpace` part by its first plot.
pub fn classify(doc: &XmlDocument) -> Result<ChartKind> {
    let plot_area = doc
        .find(doc.root(), "c:plotArea")
        .ok_or_else(|| OoxmlError::UnknownChartType("no c:plotArea".to_string()))?;
    let plot = doc
        .element_children(plot_area)
        .find(|&n| doc.local_name(n).ends_with("Chart"))
        .ok_or_else(|| OoxmlError::UnknownChartType("empty c:plotArea".to_string()))?;

    let (family, dimension) = lookup(doc.local_name(plot))?;
    let shape = match (family, dimension) {
        (ChartFamily::Bar, Dimension::ThreeD) => Some(
            doc.child(plot, "c:shape")
                .and_then(|s| doc.attr_raw(s, "val"))
                .and_then(BarShape::from_val)
                .unwrap_or(BarShape::Box),
        ),
        _ => None,
    };
    Ok(ChartKind {
        family,
        dimension,
        shape,
    })
}
