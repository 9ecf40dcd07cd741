//! Whole-package helpers built on the query and mutation layers.
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::pptx::Package;
use crate::ooxml::pptx::mutate::ElementMutator;
use crate::ooxml::pptx::query::{NodeKind, Occurrence, Selector};
use aho_corasick::{AhoCorasick, MatchKind};

/// Replace text inside `a:t` runs of every slide, or only of the slide at
/// 0-based `slide`. Replacements apply in one pass, earlier pairs winning
/// on overlap. Returns how many runs changed.
///
/// Text split across several runs is not matched.
pub fn search_and_replace<S, R>(pkg: &mut Package, pairs: &[(S, R)], slide: Option<usize>) -> Result<usize>
where
    S: AsRef<str>,
    R: AsRef<str>,
{
    let (patterns, replacements): (Vec<&str>, Vec<&str>) = pairs
        .iter()
        .map(|(s, r)| (s.as_ref(), r.as_ref()))
        .filter(|(s, _)| !s.is_empty())
        .unzip();
    if patterns.is_empty() {
        return Ok(0);
    }
    let automaton = AhoCorasick::builder()
        .match_kind(MatchKind::LeftmostFirst)
        .build(&patterns)
        .map_err(|e| OoxmlError::InvalidSelector(format!("search terms: {e}")))?;

    let slides = pkg.slide_partnames()?;
    let targets: Vec<_> = match slide {
        Some(position) => slides.into_iter().skip(position).take(1).collect(),
        None => slides,
    };

    let mut changed = 0;
    for partname in targets {
        let mut doc = pkg.opc().xml(&partname)?;
        let mut touched = false;
        for run in doc.find_all(doc.root(), "a:t") {
            let text = doc.text_content(run);
            if !automaton.is_match(&text) {
                continue;
            }
            let replaced = automaton.replace_all(&text, &replacements);
            doc.set_text(run, &replaced);
            touched = true;
            changed += 1;
        }
        if touched {
            pkg.opc_mut().put_xml(&partname, &doc);
        }
    }
    tracing::debug!(pairs = patterns.len(), changed, "replaced text");
    Ok(changed)
}

/// Remove the slides at the given 0-based positions, pruning the parts
/// only they used. Returns how many slides were removed.
pub fn remove_slides(pkg: &mut Package, positions: &[usize]) -> Result<usize> {
    if positions.is_empty() {
        return Ok(0);
    }
    let selector = Selector::new(NodeKind::Slide).occurrence(Occurrence::Positions(
        positions.iter().map(|p| p + 1).collect(),
    ));
    ElementMutator::new(pkg).remove_nodes(&selector)
}

/// One package per slide, each keeping only that slide.
pub fn split(pkg: &Package) -> Result<Vec<Package>> {
    let count = pkg.slide_partnames()?.len();
    let mut parts = Vec::with_capacity(count);
    for keep in 0..count {
        let mut single = pkg.clone();
        let others: Vec<usize> = (0..count).filter(|&p| p != keep).collect();
        remove_slides(&mut single, &others)?;
        parts.push(single);
    }
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::pptx::testutil::DeckBuilder;

    fn texts(pkg: &Package, position: usize) -> Vec<String> {
        let partname = pkg.slide_partname(position).unwrap().unwrap();
        let doc = pkg.opc().xml(&partname).unwrap();
        doc.find_all(doc.root(), "a:t")
            .into_iter()
            .map(|t| doc.text_content(t))
            .collect()
    }

    #[test]
    fn test_search_and_replace_everywhere() {
        let mut pkg = DeckBuilder::new()
            .slide("Hello $NAME$")
            .slide("Bye $NAME$ and co")
            .slide("untouched")
            .build();
        let changed = search_and_replace(&mut pkg, &[("$NAME$", "Ada <3"), ("Bye", "See you")], None).unwrap();
        assert_eq!(changed, 2);
        assert_eq!(texts(&pkg, 0), ["Hello Ada <3"]);
        assert_eq!(texts(&pkg, 1), ["See you Ada <3 and co"]);
        assert_eq!(texts(&pkg, 2), ["untouched"]);
        let slide = pkg.slide_partname(0).unwrap().unwrap();
        assert!(pkg.opc().xml(&slide).unwrap().to_xml().contains("Ada &lt;3"));
    }

    #[test]
    fn test_search_and_replace_one_slide() {
        let mut pkg = DeckBuilder::new().slide("x").slide("x").build();
        assert_eq!(search_and_replace(&mut pkg, &[("x", "y")], Some(1)).unwrap(), 1);
        assert_eq!(texts(&pkg, 0), ["x"]);
        assert_eq!(texts(&pkg, 1), ["y"]);
        assert_eq!(search_and_replace(&mut pkg, &[("x", "y")], Some(5)).unwrap(), 0);
        assert_eq!(search_and_replace::<&str, &str>(&mut pkg, &[("", "z")], None).unwrap(), 0);
    }

    #[test]
    fn test_remove_slides_by_position() {
        let mut pkg = DeckBuilder::new().slide("a").slide("b").slide("c").build();
        assert_eq!(remove_slides(&mut pkg, &[0, 2]).unwrap(), 2);
        assert_eq!(pkg.presentation().unwrap().slide_ids(), [257]);
        assert_eq!(texts(&pkg, 0), ["b"]);
        assert_eq!(remove_slides(&mut pkg, &[]).unwrap(), 0);
    }

    #[test]
    fn test_split_drops_foreign_media() {
        let pkg = DeckBuilder::new()
            .slide("a")
            .slide("b")
            .image(0, "first.png")
            .image(1, "second.png")
            .build();
        let parts = split(&pkg).unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(texts(&parts[0], 0), ["a"]);
        assert!(parts[0].opc().contains("/ppt/media/first.png"));
        assert!(!parts[0].opc().contains("/ppt/media/second.png"));
        assert_eq!(texts(&parts[1], 0), ["b"]);
        assert!(!parts[1].opc().contains("/ppt/media/first.png"));
        assert_eq!(parts[1].slide_partnames().unwrap().len(), 1);
    }
}
