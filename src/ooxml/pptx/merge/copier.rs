//! Copying parts from a source package into the merge target.
//!
//! One [`PartCopier`] serves one source package. It copies each source part
//! at most once and rewrites the relationships of every copy:
//!
//! - external targets are kept verbatim;
//! - layout, master, theme and notes/handout master targets must already be
//!   mapped (they are copied up front);
//! - slide-to-slide links are deferred until every slide has a copy;
//! - anything else is copied recursively, named by the reltype table or,
//!   for unknown types, next to the source location.
//!
//! References that cannot be carried are dropped and reported.
use super::diagnostics::{DiagnosticKind, MergeDiagnostic};
use super::reltable::{self, CopyRule};
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::constants::{content_type as ct, relationship_type as rt};
use crate::ooxml::opc::package::is_xml_content_type;
use crate::ooxml::opc::{OpcPackage, PackURI, Relationships};
use crate::ooxml::pptx::chart::{self, ChartFamily};
use crate::ooxml::pptx::ids::{IdAllocator, stem_base};
use crate::ooxml::pptx::mutate::deps::users_of;
use std::collections::HashMap;

/// How a copy is named.
#[derive(Debug, Clone, Copy)]
pub enum Naming {
    /// Same folder and stem as the source part
    Beside,
    Rule(CopyRule),
}

#[derive(Debug, Clone)]
struct DeferredLink {
    source: PackURI,
    copy: PackURI,
    r_id: String,
    target: PackURI,
}

pub struct PartCopier<'s> {
    source: &'s OpcPackage,
    source_index: usize,
    copies: HashMap<PackURI, PackURI>,
    deferred: Vec<DeferredLink>,
    pub diagnostics: Vec<MergeDiagnostic>,
    pub chart_families: Vec<ChartFamily>,
}

impl<'s> PartCopier<'s> {
    pub fn new(source: &'s OpcPackage, source_index: usize) -> Self {
        Self {
            source,
            source_index,
            copies: HashMap::new(),
            deferred: Vec::new(),
            diagnostics: Vec::new(),
            chart_families: Vec::new(),
        }
    }

    #[inline]
    pub fn source(&self) -> &'s OpcPackage {
        self.source
    }

    #[inline]
    pub fn source_index(&self) -> usize {
        self.source_index
    }

    pub fn copy_of(&self, source_part: &PackURI) -> Option<&PackURI> {
        self.copies.get(source_part)
    }

    /// Record that references to `source_part` resolve to `target_part`
    /// without copying anything.
    pub fn map(&mut self, source_part: PackURI, target_part: PackURI) {
        self.copies.insert(source_part, target_part);
    }

    pub fn report(&mut self, part: &PackURI, r_id: Option<&str>, kind: DiagnosticKind) {
        self.diagnostics.push(MergeDiagnostic::new(
            self.source_index,
            part.clone(),
            r_id.map(str::to_string),
            kind,
        ));
    }

    /// Copy a part's bytes and content type, but not its relationships.
    /// Returns `None` when the source has no such part.
    pub fn copy_blob(
        &mut self,
        target: &mut OpcPackage,
        alloc: &mut IdAllocator,
        part: &PackURI,
        naming: Naming,
    ) -> Result<Option<PackURI>> {
        if let Some(done) = self.copies.get(part) {
            return Ok(Some(done.clone()));
        }
        let Some(blob) = self.source.get_opt(part) else {
            return Ok(None);
        };
        let (dir, stem, content_type) = match naming {
            Naming::Beside => (part.base_uri(), stem_base(part.stem()), None),
            Naming::Rule(rule) => (rule.dir, rule.stem, rule.content_type),
        };
        let copy = alloc.new_partname(target, dir, stem, part.ext())?;
        target.add(&copy, blob.to_vec());
        self.carry_content_type(target, part, &copy, content_type);
        self.copies.insert(part.clone(), copy.clone());
        tracing::trace!(source = %part, %copy, "copied part");
        Ok(Some(copy))
    }

    /// Copy a part together with everything it depends on.
    pub fn copy_part(
        &mut self,
        target: &mut OpcPackage,
        alloc: &mut IdAllocator,
        part: &PackURI,
        naming: Naming,
    ) -> Result<Option<PackURI>> {
        if let Some(done) = self.copies.get(part) {
            return Ok(Some(done.clone()));
        }
        let Some(copy) = self.copy_blob(target, alloc, part, naming)? else {
            return Ok(None);
        };
        self.copy_rels(target, alloc, part, &copy)?;
        Ok(Some(copy))
    }

    /// Give `copy` the relationships of `part`, rewritten for the target.
    /// Markup using a relationship that could not be carried is removed.
    pub fn copy_rels(
        &mut self,
        target: &mut OpcPackage,
        alloc: &mut IdAllocator,
        part: &PackURI,
        copy: &PackURI,
    ) -> Result<()> {
        let src_rels = self.source.relationships_of(part)?;
        let under_chart = matches!(
            self.source.content_type_of(part),
            Ok(ct::DML_CHART | ct::DML_CHART_EX)
        );
        let mut rels = Relationships::new(copy.base_uri());
        let mut dropped = Vec::new();

        for rel in src_rels.iter() {
            if rel.is_external() {
                rels.insert(rel.clone());
                continue;
            }
            let src_target = match src_rels.target_partname(rel) {
                Ok(t) if self.source.contains(&t) => t,
                _ => {
                    self.report(part, Some(rel.r_id()), DiagnosticKind::MissingPart);
                    dropped.push(rel.r_id().to_string());
                    continue;
                },
            };

            let new_target = match rel.reltype() {
                rt::SLIDE => {
                    self.deferred.push(DeferredLink {
                        source: part.clone(),
                        copy: copy.clone(),
                        r_id: rel.r_id().to_string(),
                        target: src_target.clone(),
                    });
                    src_target
                },
                rt::SLIDE_LAYOUT | rt::SLIDE_MASTER | rt::THEME | rt::NOTES_MASTER | rt::HANDOUT_MASTER => {
                    match self.copies.get(&src_target) {
                        Some(mapped) => mapped.clone(),
                        None => {
                            self.report(part, Some(rel.r_id()), DiagnosticKind::UnresolvedReference);
                            dropped.push(rel.r_id().to_string());
                            continue;
                        },
                    }
                },
                reltype => {
                    let naming = reltable::rule_for(reltype, under_chart).map_or(Naming::Beside, Naming::Rule);
                    let fresh = !self.copies.contains_key(&src_target);
                    let Some(copied) = self.copy_part(target, alloc, &src_target, naming)? else {
                        continue;
                    };
                    if fresh && reltype == rt::CHART {
                        self.classify_chart(&src_target);
                    }
                    copied
                },
            };

            let mut carried = rel.clone();
            carried.set_target_ref(new_target.relative_ref(copy.base_uri()));
            rels.insert(carried);
        }
        target.set_relationships(copy, &rels);
        if !dropped.is_empty() {
            strip_users(target, copy, &dropped)?;
        }
        Ok(())
    }

    /// Point deferred slide links at the merged slide copies. Links to
    /// slides that were not merged are dropped with the markup using them.
    pub fn resolve_slide_links(&mut self, target: &mut OpcPackage) -> Result<()> {
        for link in std::mem::take(&mut self.deferred) {
            let mut rels = target.relationships_of(&link.copy)?;
            match self.copies.get(&link.target) {
                Some(merged) => rels.retarget(&link.r_id, merged)?,
                None => {
                    rels.remove(&link.r_id);
                    strip_users(target, &link.copy, std::slice::from_ref(&link.r_id))?;
                    self.report(&link.source, Some(&link.r_id), DiagnosticKind::UnmappedSlide);
                },
            }
            target.set_relationships(&link.copy, &rels);
        }
        Ok(())
    }

    fn classify_chart(&mut self, chart_part: &PackURI) {
        let kind = self
            .source
            .xml(chart_part)
            .map_err(OoxmlError::from)
            .and_then(|doc| chart::classify(&doc));
        match kind {
            Ok(kind) => {
                tracing::debug!(part = %chart_part, family = %kind.family, "classified chart");
                self.chart_families.push(kind.family);
            },
            Err(_) => self.report(chart_part, None, DiagnosticKind::UnknownChartType),
        }
    }

    /// Register the copy's content type: the rule's override, else the
    /// source override, else make sure the extension default exists.
    fn carry_content_type(
        &self,
        target: &mut OpcPackage,
        part: &PackURI,
        copy: &PackURI,
        rule_type: Option<&'static str>,
    ) {
        let src_types = self.source.content_types();
        match rule_type.or_else(|| src_types.override_for(part)) {
            Some(content_type) => target.content_types_mut().set_override(copy, content_type),
            None => {
                let ext = copy.ext();
                if let Some(default) = src_types.default_for(ext)
                    && !target.content_types().has_default(ext)
                {
                    target.content_types_mut().add_default(ext, default);
                }
            },
        }
    }
}

/// Detach the markup in `part` that uses any of `r_ids`.
fn strip_users(target: &mut OpcPackage, part: &PackURI, r_ids: &[String]) -> Result<()> {
    if !target.content_type_of(part).is_ok_and(is_xml_content_type) {
        return Ok(());
    }
    let mut doc = target.xml(part)?;
    let users: Vec<_> = r_ids.iter().flat_map(|r_id| users_of(&doc, r_id)).collect();
    if users.is_empty() {
        return Ok(());
    }
    for node in users {
        doc.detach(node);
    }
    target.put_xml(part, &doc);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::pptx::testutil::DeckBuilder;

    fn uri(s: &str) -> PackURI {
        PackURI::new(s).unwrap()
    }

    #[test]
    fn test_copy_chart_with_subparts() {
        let source = DeckBuilder::new().slide("a").chart(0, "bar3DChart").build();
        let mut target = DeckBuilder::new().slide("t").build().into_opc();
        let mut alloc = IdAllocator::new();
        let mut copier = PartCopier::new(source.opc(), 0);

        let chart = uri("/ppt/charts/chart1.xml");
        let copy = copier
            .copy_part(&mut target, &mut alloc, &chart, Naming::Rule(reltable::rule_for(rt::CHART, false).unwrap()))
            .unwrap()
            .unwrap();
        assert!(copy.as_str().starts_with("/ppt/charts/chart"));
        assert_eq!(target.content_type_of(&copy).unwrap(), ct::DML_CHART);

        let rels = target.relationships_of(&copy).unwrap();
        let workbook = rels.target_partname(rels.of_type(rt::PACKAGE).next().unwrap()).unwrap();
        assert!(workbook.as_str().starts_with("/ppt/embeddings/Microsoft_Excel_Worksheet"));
        assert!(target.contains(&workbook));
        assert_eq!(target.content_type_of(&workbook).unwrap(), ct::OFC_SPREADSHEET);
        let style = rels.target_partname(rels.of_type(rt::CHART_STYLE).next().unwrap()).unwrap();
        assert_eq!(target.content_type_of(&style).unwrap(), ct::DML_CHART_STYLE);
    }

    #[test]
    fn test_copies_are_memoised() {
        let source = DeckBuilder::new()
            .slide("a")
            .slide("b")
            .image(0, "shared.png")
            .image(1, "shared.png")
            .build();
        let mut target = DeckBuilder::new().build().into_opc();
        let mut alloc = IdAllocator::new();
        let mut copier = PartCopier::new(source.opc(), 0);
        let layout = uri("/ppt/slideLayouts/slideLayout1.xml");
        copier.map(layout.clone(), layout);

        let first = copier
            .copy_part(&mut target, &mut alloc, &uri("/ppt/slides/slide1.xml"), Naming::Beside)
            .unwrap()
            .unwrap();
        let second = copier
            .copy_part(&mut target, &mut alloc, &uri("/ppt/slides/slide2.xml"), Naming::Beside)
            .unwrap()
            .unwrap();
        let image_of = |slide: &PackURI| {
            let rels = target.relationships_of(slide).unwrap();
            rels.target_partname(rels.of_type(rt::IMAGE).next().unwrap()).unwrap()
        };
        assert_eq!(image_of(&first), image_of(&second));
        assert!(image_of(&first).as_str().starts_with("/ppt/media/image"));
        assert!(copier.diagnostics.is_empty());
    }

    #[test]
    fn test_unmapped_structural_reference_is_reported() {
        let source = DeckBuilder::new().slide("a").build();
        let mut target = DeckBuilder::new().build().into_opc();
        let mut alloc = IdAllocator::new();
        let mut copier = PartCopier::new(source.opc(), 3);
        let copy = copier
            .copy_part(&mut target, &mut alloc, &uri("/ppt/slides/slide1.xml"), Naming::Beside)
            .unwrap()
            .unwrap();
        assert!(target.relationships_of(&copy).unwrap().is_empty());
        assert_eq!(copier.diagnostics.len(), 1);
        assert_eq!(copier.diagnostics[0].kind, DiagnosticKind::UnresolvedReference);
        assert_eq!(copier.diagnostics[0].source_index, 3);
    }

    #[test]
    fn test_missing_source_part_is_skipped() {
        let source = DeckBuilder::new().slide("a").image(0, "gone.png").build();
        let mut opc = source.into_opc();
        opc.delete("/ppt/media/gone.png");
        let mut target = DeckBuilder::new().build().into_opc();
        let mut alloc = IdAllocator::new();
        let mut copier = PartCopier::new(&opc, 0);
        let layout = uri("/ppt/slideLayouts/slideLayout1.xml");
        copier.map(layout.clone(), layout);
        let copy = copier
            .copy_part(&mut target, &mut alloc, &uri("/ppt/slides/slide1.xml"), Naming::Beside)
            .unwrap()
            .unwrap();
        assert_eq!(target.relationships_of(&copy).unwrap().of_type(rt::IMAGE).count(), 0);
        assert_eq!(copier.diagnostics[0].kind, DiagnosticKind::MissingPart);
        assert_eq!(copier.diagnostics[0].r_id.as_deref(), Some("rId2"));
    }
}
