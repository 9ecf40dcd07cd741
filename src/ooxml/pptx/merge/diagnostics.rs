//! What a merge skipped, and what it did.
use crate::ooxml::opc::PackURI;
use crate::ooxml::pptx::chart::ChartFamily;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// A relationship points at a part the source package does not contain
    MissingPart,
    /// A chart plot tag is not in the family table; the chart is still copied
    UnknownChartType,
    /// A slide link or section entry names a slide that was not merged
    UnmappedSlide,
    /// A layout, master or theme reference has no counterpart in the target
    UnresolvedReference,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DiagnosticKind::MissingPart => "missing part",
            DiagnosticKind::UnknownChartType => "unknown chart type",
            DiagnosticKind::UnmappedSlide => "unmapped slide",
            DiagnosticKind::UnresolvedReference => "unresolved reference",
        })
    }
}

/// One reference a merge skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeDiagnostic {
    /// 0-based position of the source package in the merge input
    pub source_index: usize,
    /// Part of the source package holding the reference
    pub part: PackURI,
    pub r_id: Option<String>,
    pub kind: DiagnosticKind,
}

impl MergeDiagnostic {
    pub fn new(source_index: usize, part: PackURI, r_id: Option<String>, kind: DiagnosticKind) -> Self {
        let diagnostic = Self {
            source_index,
            part,
            r_id,
            kind,
        };
        tracing::warn!(%diagnostic, "merge skipped a reference");
        diagnostic
    }
}

impl fmt::Display for MergeDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source {}: {} in {}", self.source_index, self.kind, self.part)?;
        if let Some(r_id) = &self.r_id {
            write!(f, " ({r_id})")?;
        }
        Ok(())
    }
}

/// Summary returned by a merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub slides_added: usize,
    pub authors_added: usize,
    pub sections_merged: usize,
    /// Family of every chart copied, in copy order
    pub chart_families: Vec<ChartFamily>,
    pub diagnostics: Vec<MergeDiagnostic>,
}

impl MergeReport {
    /// Whether every reference was carried over.
    #[inline]
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn diagnostics_of(&self, kind: DiagnosticKind) -> impl Iterator<Item = &MergeDiagnostic> {
        self.diagnostics.iter().filter(move |d| d.kind == kind)
    }
}
