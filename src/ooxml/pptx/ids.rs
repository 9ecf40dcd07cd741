//! Collision-free identifier and part-name allocation.
//!
//! Nothing here keeps a durable counter. Every allocation takes the set of
//! identifiers already live in its scope (obtained by scanning the package)
//! and returns a value outside it. Randomness comes through
//! [`EntropySource`] so tests can pin it.

use crate::common::xml::XmlDocument;
use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::opc::{OpcPackage, PackURI};
use std::collections::{BTreeSet, HashMap, HashSet};

/// First ordinary slide id.
pub const SLIDE_ID_MIN: u32 = 256;

/// Slide ids are 31-bit.
pub const SLIDE_ID_MAX: u32 = MASTER_ID_MIN - 1;

/// Slide master and layout ids live at or above 2^31.
pub const MASTER_ID_MIN: u32 = 1 << 31;
pub const MASTER_ID_MAX: u32 = u32::MAX;

/// Reserved band probed for new shape ids.
pub const SHAPE_ID_MIN: u32 = 999_999;
pub const SHAPE_ID_MAX: u32 = 999_999_999;

/// Random probes before falling back to a linear scan of the band.
const SHAPE_ID_PROBES: usize = 64;

/// Source of randomized seeds.
pub trait EntropySource {
    fn next_u32(&mut self) -> u32;
}

/// Thread-local generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadEntropy;

impl EntropySource for ThreadEntropy {
    fn next_u32(&mut self) -> u32 {
        crate::common::id::random_u32()
    }
}

/// Pick a shape id in the reserved band that is absent from `used`.
pub fn new_shape_id(used: &HashSet<u32>, entropy: &mut dyn EntropySource) -> u32 {
    let span = SHAPE_ID_MAX - SHAPE_ID_MIN + 1;
    let mut candidate = SHAPE_ID_MIN;
    for _ in 0..SHAPE_ID_PROBES {
        candidate = SHAPE_ID_MIN + entropy.next_u32() % span;
        if !used.contains(&candidate) {
            return candidate;
        }
    }
    // Dense scope: walk forward from the last probe, wrapping inside the band.
    loop {
        candidate = if candidate >= SHAPE_ID_MAX {
            SHAPE_ID_MIN
        } else {
            candidate + 1
        };
        if !used.contains(&candidate) {
            return candidate;
        }
    }
}

/// Current maximum plus one, never below `floor`.
pub fn next_sequential<I: IntoIterator<Item = u32>>(used: I, floor: u32) -> Result<u32> {
    match used.into_iter().max() {
        None => Ok(floor),
        Some(max) => max
            .checked_add(1)
            .map(|next| next.max(floor))
            .ok_or(OpcError::IdSpaceExhausted {
                floor,
                ceiling: u32::MAX,
            }),
    }
}

/// Id source over the inclusive band `floor..=ceiling`, seeded from a
/// scanned scope.
///
/// Ids continue from the band's current maximum. Once the top of the band
/// is reached, the lowest free values below it are handed out instead.
/// Every value returned is absent from the scope and from earlier takes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdSequence {
    floor: u32,
    ceiling: u32,
    /// `None` once the band top was passed
    next: Option<u32>,
    used: BTreeSet<u32>,
}

impl IdSequence {
    pub fn new<I: IntoIterator<Item = u32>>(used: I, floor: u32, ceiling: u32) -> Self {
        let used: BTreeSet<u32> = used.into_iter().filter(|id| (floor..=ceiling).contains(id)).collect();
        let next = match used.last() {
            None => Some(floor),
            Some(&max) => max.checked_add(1).filter(|&n| n <= ceiling),
        };
        Self {
            floor,
            ceiling,
            next,
            used,
        }
    }

    /// Ordinary slide ids: `256..=2^31-1`.
    pub fn slides<I: IntoIterator<Item = u32>>(used: I) -> Self {
        Self::new(used, SLIDE_ID_MIN, SLIDE_ID_MAX)
    }

    /// Shared master and layout ids: `2^31..=u32::MAX`.
    pub fn masters<I: IntoIterator<Item = u32>>(used: I) -> Self {
        Self::new(used, MASTER_ID_MIN, MASTER_ID_MAX)
    }

    /// Hand out the next id, or `IdSpaceExhausted` when the band is full.
    pub fn take(&mut self) -> Result<u32> {
        let id = match self.next {
            Some(id) => {
                self.next = id.checked_add(1).filter(|&n| n <= self.ceiling);
                id
            },
            None => self.lowest_gap().ok_or(OpcError::IdSpaceExhausted {
                floor: self.floor,
                ceiling: self.ceiling,
            })?,
        };
        self.used.insert(id);
        Ok(id)
    }

    fn lowest_gap(&self) -> Option<u32> {
        let mut candidate = self.floor;
        for &id in self.used.range(self.floor..=self.ceiling) {
            if id != candidate {
                return Some(candidate);
            }
            candidate = candidate.checked_add(1)?;
        }
        (candidate <= self.ceiling).then_some(candidate)
    }
}

/// Part-name stem without its trailing counter: `slide12` gives `slide`.
pub fn stem_base(stem: &str) -> &str {
    match stem.trim_end_matches(|c: char| c.is_ascii_digit()) {
        "" => "part",
        base => base,
    }
}

/// Every `cNvPr` id in a part: the shape id scope of one slide.
pub fn shape_ids(doc: &XmlDocument) -> HashSet<u32> {
    doc.descendants(doc.root())
        .filter(|&n| doc.local_name(n) == "cNvPr")
        .filter_map(|n| doc.attr_u32(n, "id"))
        .collect()
}

/// Per-operation allocator bundling the entropy source with part naming.
pub struct IdAllocator {
    entropy: Box<dyn EntropySource>,
    seed: u32,
    counters: HashMap<String, u32>,
    issued: HashSet<String>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::with_entropy(Box::new(ThreadEntropy))
    }

    pub fn with_entropy(mut entropy: Box<dyn EntropySource>) -> Self {
        let seed = 1000 + entropy.next_u32() % 9000;
        Self {
            entropy,
            seed,
            counters: HashMap::new(),
            issued: HashSet::new(),
        }
    }

    /// Randomized seed embedded in every part name from this allocator.
    #[inline]
    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Fresh part name `/{dir}/{stem}{seed}{n}.{ext}`, unused in `pkg` and
    /// not issued before by this allocator.
    pub fn new_partname(
        &mut self,
        pkg: &OpcPackage,
        dir: &str,
        stem: &str,
        ext: &str,
    ) -> Result<PackURI> {
        let dir = dir.trim_end_matches('/');
        let key = format!("{dir}/{stem}");
        let counter = self.counters.entry(key).or_insert(0);
        loop {
            *counter += 1;
            let name = format!("{dir}/{stem}{}{}.{ext}", self.seed, counter);
            if !pkg.contains(&name) && !self.issued.contains(&name) {
                self.issued.insert(name.clone());
                tracing::trace!(partname = %name, "allocated part name");
                return PackURI::new(name);
            }
        }
    }

    /// Fresh numeric suffix for sibling parts of one kind, e.g. `48213`.
    pub fn new_part_suffix(
        &mut self,
        pkg: &OpcPackage,
        dir: &str,
        stem: &str,
        ext: &str,
    ) -> Result<String> {
        let partname = self.new_partname(pkg, dir, stem, ext)?;
        Ok(partname
            .stem()
            .strip_prefix(stem)
            .unwrap_or_default()
            .to_string())
    }

    pub fn new_shape_id(&mut self, used: &HashSet<u32>) -> u32 {
        new_shape_id(used, self.entropy.as_mut())
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::SequenceEntropy;
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_next_sequential_respects_floor() {
        assert_eq!(next_sequential(std::iter::empty(), SLIDE_ID_MIN).unwrap(), 256);
        assert_eq!(next_sequential([256, 300, 257], SLIDE_ID_MIN).unwrap(), 301);
        assert_eq!(next_sequential([3, 4], SLIDE_ID_MIN).unwrap(), 256);
        assert_eq!(next_sequential([2147483649], MASTER_ID_MIN).unwrap(), 2147483650);
        assert_eq!(next_sequential(std::iter::empty(), MASTER_ID_MIN).unwrap(), 2147483648);
        assert!(matches!(
            next_sequential([u32::MAX], 0),
            Err(OpcError::IdSpaceExhausted { .. })
        ));
    }

    #[test]
    fn test_id_sequence_is_strictly_increasing() {
        let mut seq = IdSequence::slides([256, 257]);
        assert_eq!(seq.take().unwrap(), 258);
        assert_eq!(seq.take().unwrap(), 259);
        let mut seq = IdSequence::masters(std::iter::empty());
        assert_eq!(seq.take().unwrap(), 2147483648);
        assert_eq!(seq.take().unwrap(), 2147483649);
    }

    #[test]
    fn test_master_ids_fill_gaps_at_band_top() {
        let mut seq = IdSequence::masters([u32::MAX - 1, MASTER_ID_MIN, MASTER_ID_MIN + 2]);
        assert_eq!(seq.take().unwrap(), u32::MAX);
        assert_eq!(seq.take().unwrap(), MASTER_ID_MIN + 1);
        assert_eq!(seq.take().unwrap(), MASTER_ID_MIN + 3);
    }

    #[test]
    fn test_slide_ids_stay_below_master_band() {
        let mut seq = IdSequence::slides([SLIDE_ID_MAX, 256]);
        assert_eq!(seq.take().unwrap(), 257);
        assert_eq!(seq.take().unwrap(), 258);
        // Ids outside the band do not push the sequence past its top
        let mut seq = IdSequence::slides([MASTER_ID_MIN + 5]);
        assert_eq!(seq.take().unwrap(), 256);
    }

    #[test]
    fn test_exhausted_band_is_an_error() {
        let mut seq = IdSequence::new([10, 12], 10, 12);
        assert_eq!(seq.take().unwrap(), 11);
        let err = seq.take().unwrap_err();
        assert!(matches!(err, OpcError::IdSpaceExhausted { floor: 10, ceiling: 12 }));
        assert!(seq.take().is_err());

        let mut top = IdSequence::new([u32::MAX - 1], u32::MAX - 1, u32::MAX);
        assert_eq!(top.take().unwrap(), u32::MAX);
        assert!(top.take().is_err());
    }

    #[test]
    fn test_shape_id_retries_past_collisions() {
        let used: HashSet<u32> = [SHAPE_ID_MIN, SHAPE_ID_MIN + 1].into_iter().collect();
        let mut entropy = SequenceEntropy::new(vec![0, 1, 5]);
        assert_eq!(new_shape_id(&used, &mut entropy), SHAPE_ID_MIN + 5);
    }

    #[test]
    fn test_shape_id_linear_fallback() {
        let used: HashSet<u32> = [SHAPE_ID_MIN].into_iter().collect();
        let mut entropy = SequenceEntropy::new(vec![0]);
        assert_eq!(new_shape_id(&used, &mut entropy), SHAPE_ID_MIN + 1);
    }

    #[test]
    fn test_partnames_unique_within_operation() {
        let mut pkg = OpcPackage::new();
        let mut alloc = IdAllocator::with_entropy(Box::new(SequenceEntropy::new(vec![234])));
        assert_eq!(alloc.seed(), 1234);

        pkg.add("/ppt/slides/slide12341.xml", Vec::new());
        let a = alloc.new_partname(&pkg, "/ppt/slides", "slide", "xml").unwrap();
        let b = alloc.new_partname(&pkg, "/ppt/slides/", "slide", "xml").unwrap();
        assert_eq!(a.as_str(), "/ppt/slides/slide12342.xml");
        assert_eq!(b.as_str(), "/ppt/slides/slide12343.xml");
        assert_eq!(
            alloc.new_part_suffix(&pkg, "/ppt/media", "image", "png").unwrap(),
            "12341"
        );
    }

    #[test]
    fn test_stem_base() {
        assert_eq!(stem_base("slide12"), "slide");
        assert_eq!(stem_base("Microsoft_Excel_Worksheet1"), "Microsoft_Excel_Worksheet");
        assert_eq!(stem_base("theme"), "theme");
        assert_eq!(stem_base("42"), "part");
    }

    #[test]
    fn test_shape_ids_scan() {
        let doc = XmlDocument::parse(
            br#"<p:sld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/></p:nvGrpSpPr><p:sp><p:nvSpPr><p:cNvPr id="4" name="Title"/></p:nvSpPr></p:sp></p:spTree></p:sld>"#,
        )
        .unwrap();
        let ids = shape_ids(&doc);
        assert_eq!(ids, [1, 4].into_iter().collect());
    }

    proptest! {
        #[test]
        fn prop_new_shape_id_absent_then_unique(
            used in proptest::collection::hash_set(SHAPE_ID_MIN..SHAPE_ID_MIN + 200, 0..150),
            seeds in proptest::collection::vec(any::<u32>(), 1..8),
        ) {
            let mut entropy = SequenceEntropy::new(seeds.iter().map(|s| s % 200).collect());
            let mut scope = used.clone();
            for _ in 0..20 {
                let id = new_shape_id(&scope, &mut entropy);
                prop_assert!(!scope.contains(&id));
                prop_assert!((SHAPE_ID_MIN..=SHAPE_ID_MAX).contains(&id));
                scope.insert(id);
            }
        }

        #[test]
        fn prop_sequence_ids_absent_from_scope(
            used in proptest::collection::vec(0u32..100_000, 0..50),
        ) {
            let mut seq = IdSequence::slides(used.iter().copied());
            let mut seen: HashSet<u32> = used.iter().copied().collect();
            for _ in 0..10 {
                let id = seq.take().unwrap();
                prop_assert!(id >= SLIDE_ID_MIN);
                prop_assert!(seen.insert(id));
            }
        }

        #[test]
        fn prop_sequence_unique_near_band_top(
            used in proptest::collection::vec(u32::MAX - 40..=u32::MAX, 0..30),
            takes in 1usize..60,
        ) {
            let mut seq = IdSequence::masters(used.iter().copied());
            let mut seen: HashSet<u32> = used.iter().copied().collect();
            for _ in 0..takes {
                let id = seq.take().unwrap();
                prop_assert!(id >= MASTER_ID_MIN);
                prop_assert!(seen.insert(id));
            }
        }
    }
}
