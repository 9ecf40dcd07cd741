//! Part dependencies of slide markup.
//!
//! Markup points at other parts through `r:*` attributes (`r:embed`,
//! `r:id`, `r:link`, `r:dm` ...) naming relationships of the owning part.
//! A reference of an owned kind (media, charts, diagrams, embeddings, notes,
//! comments) makes the target part belong to its referrer: it is duplicated
//! with it and deleted once nothing refers to it any more.

use crate::common::xml::{NodeId, XmlDocument};
use crate::ooxml::error::Result;
use crate::ooxml::opc::constants::relationship_type as rt;
use crate::ooxml::opc::{OpcPackage, PackURI, Relationships};
use crate::ooxml::pptx::ids::{IdAllocator, stem_base};
use std::collections::HashSet;

/// Relationship types whose targets are owned by the referring part.
pub const OWNED_RELTYPES: &[&str] = &[
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
];

#[inline]
pub fn is_owned(reltype: &str) -> bool {
    OWNED_RELTYPES.contains(&reltype)
}

/// One `r:*` attribute inside a subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelRef {
    pub node: NodeId,
    pub attr: String,
    pub r_id: String,
}

/// `r:*` attributes of `node` and its descendants, in document order.
pub fn r_refs(doc: &XmlDocument, node: NodeId) -> Vec<RelRef> {
    std::iter::once(node)
        .chain(doc.descendants(node))
        .flat_map(|n| {
            doc.attributes(n)
                .iter()
                .filter(|a| a.name().starts_with("r:"))
                .map(move |a| RelRef {
                    node: n,
                    attr: a.name().to_string(),
                    r_id: a.value(),
                })
        })
        .collect()
}

/// Every rId referenced from the attached tree.
pub fn referenced_r_ids(doc: &XmlDocument) -> HashSet<String> {
    r_refs(doc, doc.root()).into_iter().map(|r| r.r_id).collect()
}

/// Elements carrying an `r:*` attribute equal to `r_id`.
pub fn users_of(doc: &XmlDocument, r_id: &str) -> Vec<NodeId> {
    let mut nodes: Vec<NodeId> = r_refs(doc, doc.root())
        .into_iter()
        .filter(|r| r.r_id == r_id)
        .map(|r| r.node)
        .collect();
    nodes.dedup();
    nodes
}

/// Internal targets of owned relationships of `partname`.
pub fn owned_targets(opc: &OpcPackage, partname: &PackURI) -> Result<Vec<PackURI>> {
    let rels = opc.relationships_of(partname)?;
    Ok(rels
        .iter()
        .filter(|r| !r.is_external() && is_owned(r.reltype()))
        .filter_map(|r| rels.target_partname(r).ok())
        .collect())
}

/// Delete `partname` and, recursively, the parts it owns, unless something
/// outside that set still refers to it. Returns how many parts were deleted.
pub fn prune(opc: &mut OpcPackage, partname: &PackURI) -> Result<usize> {
    if !opc.contains(partname) {
        return Ok(0);
    }
    let owned = owned_targets(opc, partname)?;
    let still_referenced = opc
        .referrers(partname)
        .into_iter()
        .any(|(source, _)| &source != partname && !owned.contains(&source));
    if still_referenced {
        return Ok(0);
    }
    opc.delete(partname);
    tracing::debug!(%partname, "pruned unreferenced part");
    let mut removed = 1;
    for child in owned {
        removed += prune(opc, &child)?;
    }
    Ok(removed)
}

/// Drop relationships in `candidates` that the markup of `source` no longer
/// uses, then prune their owned targets.
pub fn release_unreferenced(
    opc: &mut OpcPackage,
    source: &PackURI,
    doc: &XmlDocument,
    candidates: &[String],
) -> Result<usize> {
    let used = referenced_r_ids(doc);
    let mut rels = opc.relationships_of(source)?;
    let mut released = Vec::new();
    for r_id in candidates {
        if used.contains(r_id) {
            continue;
        }
        let Some(rel) = rels.remove(r_id) else {
            continue;
        };
        if !rel.is_external()
            && is_owned(rel.reltype())
            && let Ok(target) = PackURI::from_rel_ref(rels.base_uri(), rel.target_ref())
        {
            released.push(target);
        }
    }
    opc.set_relationships(source, &rels);

    let mut removed = 0;
    for target in released {
        removed += prune(opc, &target)?;
    }
    Ok(removed)
}

/// Outcome of [`duplicate_part`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Duplicate {
    pub partname: PackURI,
    /// `(original, copy)` for every owned part duplicated along with it
    pub copies: Vec<(PackURI, PackURI)>,
}

/// Copy a part next to itself under a fresh name.
///
/// Owned targets referenced only by `source` are duplicated too; shared ones
/// stay shared. Content-type overrides follow the copies.
pub fn duplicate_part(
    opc: &mut OpcPackage,
    alloc: &mut IdAllocator,
    source: &PackURI,
) -> Result<Duplicate> {
    let blob = opc.get(source)?.to_vec();
    let partname = alloc.new_partname(opc, source.base_uri(), stem_base(source.stem()), source.ext())?;
    opc.add(&partname, blob);
    if let Some(content_type) = opc.content_types().override_for(source).map(str::to_string) {
        opc.content_types_mut().set_override(&partname, &content_type);
    }

    let src_rels = opc.relationships_of(source)?;
    let mut rels = Relationships::new(partname.base_uri());
    let mut copies = Vec::new();
    for rel in src_rels.iter() {
        let mut copy = rel.clone();
        if !rel.is_external()
            && is_owned(rel.reltype())
            && let Ok(target) = src_rels.target_partname(rel)
            && opc.contains(&target)
            && exclusively_owned(opc, &target, source)
        {
            let child = duplicate_part(opc, alloc, &target)?;
            copy.set_target_ref(child.partname.relative_ref(partname.base_uri()));
            copies.push((target, child.partname.clone()));
            copies.extend(child.copies);
        }
        rels.insert(copy);
    }
    opc.set_relationships(&partname, &rels);
    tracing::trace!(%source, copy = %partname, "duplicated part");

    Ok(Duplicate { partname, copies })
}

fn exclusively_owned(opc: &OpcPackage, target: &PackURI, owner: &PackURI) -> bool {
    opc.referrers(target)
        .iter()
        .all(|(source, _)| source == owner || source == target)
}
