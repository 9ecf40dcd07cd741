//! Structural selectors over presentation parts.
//!
//! A [`Selector`] names a node kind plus optional filters. Queries are
//! compiled ([`CompiledQuery`]) and evaluated against the part that kind
//! lives in: the active slide, the presentation part, or the active slide's
//! comments part.
//!
//! ```rust,no_run
//! use quince::ooxml::pptx::{NodeKind, Package, QueryOptions, Selector, select};
//!
//! let pkg = Package::open("deck.pptx")?;
//! let options = QueryOptions { active_slide: 1 };
//! if let Some(selection) = select(&pkg, &Selector::new(NodeKind::Image).nth(1), &options)? {
//!     println!("{} matches in {}", selection.nodes.len(), selection.partname);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod compile;
pub mod filter;
pub mod kind;
pub mod occurrence;

pub use compile::{Axis, CompiledQuery, Condition, Step};
pub use filter::{AttributeFilter, Selector};
pub use kind::{KindSpec, NodeKind, Predicate, Scope};
pub use occurrence::Occurrence;

use crate::common::xml::{NodeId, XmlDocument};
use crate::ooxml::error::Result;
use crate::ooxml::opc::PackURI;
use crate::ooxml::opc::constants::relationship_type as rt;
use crate::ooxml::pptx::Package;
use serde::Deserialize;

/// Evaluation context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryOptions {
    /// 0-based position of the slide that slide-scoped kinds query
    pub active_slide: usize,
}

/// Matches of one query together with the parsed part they live in.
#[derive(Debug, Clone)]
pub struct Selection {
    pub partname: PackURI,
    pub doc: XmlDocument,
    pub nodes: Vec<NodeId>,
}

impl Selection {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// The part a scope resolves to, or `None` when it does not exist (no such
/// slide, or a slide without comments).
pub fn scope_part(pkg: &Package, scope: Scope, options: &QueryOptions) -> Result<Option<PackURI>> {
    match scope {
        Scope::Presentation => Ok(Some(pkg.presentation_partname().clone())),
        Scope::Slide => pkg.slide_partname(options.active_slide),
        Scope::Comments => {
            let Some(slide) = pkg.slide_partname(options.active_slide)? else {
                return Ok(None);
            };
            let rels = pkg.opc().relationships_of(&slide)?;
            match rels.of_type(rt::COMMENTS).next() {
                Some(rel) => Ok(Some(rels.target_partname(rel)?)),
                None => Ok(None),
            }
        },
    }
}

/// Compile and evaluate a selector against one parsed part.
pub fn select_in(doc: &XmlDocument, selector: &Selector) -> Result<Vec<NodeId>> {
    Ok(CompiledQuery::compile(selector)?.evaluate(doc))
}

/// Run a selector against the part its kind is scoped to.
pub fn select(pkg: &Package, selector: &Selector, options: &QueryOptions) -> Result<Option<Selection>> {
    let query = CompiledQuery::compile(selector)?;
    let Some(partname) = scope_part(pkg, selector.kind.scope(), options)? else {
        tracing::debug!(kind = %selector.kind, slide = options.active_slide, "selector scope has no part");
        return Ok(None);
    };
    let doc = pkg.opc().xml(&partname)?;
    let nodes = query.evaluate(&doc);
    tracing::debug!(kind = %selector.kind, %partname, matches = nodes.len(), "evaluated selector");
    Ok(Some(Selection {
        partname,
        doc,
        nodes,
    }))
}

/// Compiled form of a selector and what it currently matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryInfo {
    pub query: String,
    pub partname: Option<PackURI>,
    /// Serialized markup of each match
    pub matches: Vec<String>,
}

pub fn query_info(pkg: &Package, selector: &Selector, options: &QueryOptions) -> Result<QueryInfo> {
    let query = CompiledQuery::compile(selector)?.to_string();
    Ok(match select(pkg, selector, options)? {
        Some(selection) => QueryInfo {
            query,
            matches: selection
                .nodes
                .iter()
                .map(|&n| selection.doc.serialize(n))
                .collect(),
            partname: Some(selection.partname),
        },
        None => QueryInfo {
            query,
            partname: None,
            matches: Vec::new(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::pptx::testutil::DeckBuilder;

    #[test]
    fn test_slide_scoped_query_follows_active_slide() {
        let pkg = DeckBuilder::new().slide("first").slide("second").image(1, "a.png").build();
        let image = Selector::new(NodeKind::Image);
        let on_first = select(&pkg, &image, &QueryOptions::default()).unwrap().unwrap();
        assert!(on_first.is_empty());
        let on_second = select(&pkg, &image, &QueryOptions { active_slide: 1 }).unwrap().unwrap();
        assert_eq!(on_second.nodes.len(), 1);
        assert_eq!(on_second.partname.as_str(), "/ppt/slides/slide2.xml");
    }

    #[test]
    fn test_out_of_range_slide_is_empty() {
        let pkg = DeckBuilder::new().slide("only").build();
        let shape = Selector::new(NodeKind::Shape);
        assert!(select(&pkg, &shape, &QueryOptions { active_slide: 4 }).unwrap().is_none());
        let info = query_info(&pkg, &shape, &QueryOptions { active_slide: 4 }).unwrap();
        assert!(info.matches.is_empty());
        assert!(info.partname.is_none());
    }

    #[test]
    fn test_presentation_scoped_kinds() {
        let pkg = DeckBuilder::new()
            .slide("a")
            .slide("b")
            .slide("c")
            .section("S1", &[0, 1])
            .section("S2", &[2])
            .build();
        let options = QueryOptions { active_slide: 2 };
        let slides = select(&pkg, &Selector::new(NodeKind::Slide), &options).unwrap().unwrap();
        assert_eq!(slides.nodes.len(), 3);
        let last = select(
            &pkg,
            &Selector::new(NodeKind::Section).occurrence(Occurrence::Last),
            &options,
        )
        .unwrap()
        .unwrap();
        assert_eq!(last.doc.attr(last.nodes[0], "name").as_deref(), Some("S2"));
    }

    #[test]
    fn test_comment_kind() {
        let pkg = DeckBuilder::new()
            .slide("a")
            .comment(0, "Alice", "hello")
            .comment(0, "Bob", "world")
            .build();
        let info = query_info(
            &pkg,
            &Selector::new(NodeKind::Comment).contains("world"),
            &QueryOptions::default(),
        )
        .unwrap();
        assert_eq!(info.partname.unwrap().as_str(), "/ppt/comments/comment1.xml");
        assert_eq!(info.matches.len(), 1);
        assert!(info.matches[0].contains("authorId=\"1\""));
        assert_eq!(info.query, "//p:cmLst//p:cm[1=1 and contains(., 'world')]");
    }

    #[test]
    fn test_query_options_from_yaml() {
        let options: QueryOptions = serde_saphyr::from_str("activeSlide: 3").unwrap();
        assert_eq!(options.active_slide, 3);
    }
}
