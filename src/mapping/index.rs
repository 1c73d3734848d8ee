//! Memoized, bidirectional range lookup over a fixed list of mappings.
//!
//! A `MappingIndex` is built once from an immutable list of `Mapping`s. For
//! each coordinate space it lazily builds a sorted array of every boundary
//! offset, where each slot records the mappings active at that offset. A
//! query binary-searches the slot range covering the requested span and then
//! applies each candidate's matching rule.

use std::collections::HashSet;
use std::ops::{Range, RangeInclusive};
use std::sync::OnceLock;

use serde::Serialize;

/// How a query range must relate to a mapping's declared range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MappingKind {
    /// Query must equal the declared range; the counterpart is returned as-is.
    Totally,
    /// Query must lie inside the declared range; endpoints are shifted independently.
    Offset,
    /// Query must lie inside the declared range; the whole counterpart is returned.
    Expand,
}

/// Coordinate space a query is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Source,
    Generated,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Source => Side::Generated,
            Side::Generated => Side::Source,
        }
    }
}

/// One `(kind, source, generated)` triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RangePair {
    pub kind: MappingKind,
    pub source: Range<usize>,
    pub generated: Range<usize>,
}

impl RangePair {
    pub fn new(kind: MappingKind, source: Range<usize>, generated: Range<usize>) -> Self {
        Self {
            kind,
            source,
            generated,
        }
    }

    /// The range on the given side.
    pub fn range(&self, side: Side) -> &Range<usize> {
        match side {
            Side::Source => &self.source,
            Side::Generated => &self.generated,
        }
    }

    /// Translate `query` (expressed on `from`) to the opposite side, if this
    /// triple's matching rule accepts it.
    pub fn translate(&self, from: Side, query: &Range<usize>) -> Option<Range<usize>> {
        let from_range = self.range(from);
        let to_range = self.range(from.opposite());

        match self.kind {
            MappingKind::Totally => (query == from_range).then(|| to_range.clone()),
            MappingKind::Offset => {
                if !contains(from_range, query) {
                    return None;
                }
                let to_len = to_range.end - to_range.start;
                let start = to_range.start + (query.start - from_range.start).min(to_len);
                let end = to_range.end - (from_range.end - query.end).min(to_len);
                Some(start..end.max(start))
            }
            MappingKind::Expand => contains(from_range, query).then(|| to_range.clone()),
        }
    }
}

fn contains(outer: &Range<usize>, inner: &Range<usize>) -> bool {
    outer.start <= inner.start && inner.end <= outer.end
}

/// A correspondence unit between source and generated text.
///
/// `additional` triples are fallbacks tried in order when the primary triple
/// does not accept a query. The first one that does is used.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mapping<D> {
    pub primary: RangePair,
    pub additional: Vec<RangePair>,
    pub data: D,
}

impl<D> Mapping<D> {
    pub fn new(kind: MappingKind, source: Range<usize>, generated: Range<usize>, data: D) -> Self {
        Self {
            primary: RangePair::new(kind, source, generated),
            additional: Vec::new(),
            data,
        }
    }

    /// Shorthand for an `Offset` mapping over two equally long ranges.
    pub fn offset(source_start: usize, generated_start: usize, len: usize, data: D) -> Self {
        Self::new(
            MappingKind::Offset,
            source_start..source_start + len,
            generated_start..generated_start + len,
            data,
        )
    }

    pub fn with_additional(mut self, pair: RangePair) -> Self {
        self.additional.push(pair);
        self
    }

    /// The primary triple followed by the fallbacks, in trial order.
    pub fn pairs(&self) -> impl Iterator<Item = &RangePair> {
        std::iter::once(&self.primary).chain(self.additional.iter())
    }

    /// Translate `query` from `side` using the first triple that accepts it.
    pub fn translate(&self, side: Side, query: &Range<usize>) -> Option<Range<usize>> {
        self.pairs().find_map(|pair| pair.translate(side, query))
    }
}

/// Sorted boundary offsets for one side, each with the mappings active there.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct OffsetMemo {
    offsets: Vec<usize>,
    slots: Vec<Vec<usize>>,
}

impl OffsetMemo {
    fn build<D>(mappings: &[Mapping<D>], side: Side) -> Self {
        let mut offsets: Vec<usize> = mappings
            .iter()
            .flat_map(Mapping::pairs)
            .flat_map(|pair| {
                let range = pair.range(side);
                [range.start, range.end]
            })
            .collect();
        offsets.sort_unstable();
        offsets.dedup();

        let mut slots = vec![Vec::new(); offsets.len()];
        for (index, mapping) in mappings.iter().enumerate() {
            for pair in mapping.pairs() {
                let range = pair.range(side);
                let first = offsets.partition_point(|&o| o < range.start);
                let last = offsets.partition_point(|&o| o <= range.end);
                for slot in &mut slots[first..last] {
                    // Mappings are visited in index order, so a duplicate can
                    // only ever be the most recent entry.
                    if slot.last() != Some(&index) {
                        slot.push(index);
                    }
                }
            }
        }

        Self { offsets, slots }
    }

    /// Slots covering `query`, clamped to the known offsets.
    fn covering(&self, query: &Range<usize>) -> Option<RangeInclusive<usize>> {
        let last = self.offsets.len().checked_sub(1)?;
        let first = self
            .offsets
            .partition_point(|&o| o <= query.start)
            .saturating_sub(1);
        let end = self.offsets.partition_point(|&o| o < query.end).min(last);
        Some(first..=end.max(first))
    }
}

/// Immutable list of mappings with lazily built lookup tables.
///
/// The list is never mutated after construction; a changed mapping list is a
/// new `MappingIndex` with fresh memo tables.
#[derive(Debug, Clone)]
pub struct MappingIndex<D> {
    mappings: Vec<Mapping<D>>,
    source_memo: OnceLock<OffsetMemo>,
    generated_memo: OnceLock<OffsetMemo>,
}

impl<D> Default for MappingIndex<D> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<D> MappingIndex<D> {
    pub fn new(mappings: Vec<Mapping<D>>) -> Self {
        Self {
            mappings,
            source_memo: OnceLock::new(),
            generated_memo: OnceLock::new(),
        }
    }

    pub fn mappings(&self) -> &[Mapping<D>] {
        &self.mappings
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    fn memo(&self, side: Side) -> &OffsetMemo {
        let cell = match side {
            Side::Source => &self.source_memo,
            Side::Generated => &self.generated_memo,
        };
        cell.get_or_init(|| OffsetMemo::build(&self.mappings, side))
    }

    /// Sorted boundary offsets for `side`.
    pub fn offsets(&self, side: Side) -> &[usize] {
        &self.memo(side).offsets
    }

    /// Translate `query` from `side` to the opposite side.
    ///
    /// Yields `(translated_range, mapping)` for every mapping whose data passes
    /// `filter` and whose matching rule accepts the query. Each mapping is
    /// considered at most once. Queries outside all known offsets are clamped
    /// and simply produce no matches.
    pub fn translate<'a, F>(
        &'a self,
        side: Side,
        query: Range<usize>,
        filter: F,
    ) -> impl Iterator<Item = (Range<usize>, &'a Mapping<D>)> + 'a
    where
        F: Fn(&D) -> bool + 'a,
    {
        let query = query.start..query.end.max(query.start);
        let candidates = if self.mappings.is_empty() {
            None
        } else {
            let memo = self.memo(side);
            memo.covering(&query).map(|slots| (memo, slots))
        };
        let mut seen = HashSet::new();

        candidates
            .into_iter()
            .flat_map(|(memo, slots)| slots.flat_map(move |slot| memo.slots[slot].iter().copied()))
            .filter(move |&index| seen.insert(index))
            .filter_map(move |index| {
                let mapping = &self.mappings[index];
                if !filter(&mapping.data) {
                    return None;
                }
                mapping
                    .translate(side, &query)
                    .map(|range| (range, mapping))
            })
    }

    /// Generated ranges corresponding to a source range.
    pub fn to_generated<'a, F>(
        &'a self,
        query: Range<usize>,
        filter: F,
    ) -> impl Iterator<Item = (Range<usize>, &'a Mapping<D>)> + 'a
    where
        F: Fn(&D) -> bool + 'a,
    {
        self.translate(Side::Source, query, filter)
    }

    /// Source ranges corresponding to a generated range.
    pub fn to_source<'a, F>(
        &'a self,
        query: Range<usize>,
        filter: F,
    ) -> impl Iterator<Item = (Range<usize>, &'a Mapping<D>)> + 'a
    where
        F: Fn(&D) -> bool + 'a,
    {
        self.translate(Side::Generated, query, filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(mappings: Vec<Mapping<bool>>) -> MappingIndex<bool> {
        MappingIndex::new(mappings)
    }

    fn any(_: &bool) -> bool {
        true
    }

    fn generated(index: &MappingIndex<bool>, query: Range<usize>) -> Vec<Range<usize>> {
        index.to_generated(query, any).map(|(r, _)| r).collect()
    }

    fn source(index: &MappingIndex<bool>, query: Range<usize>) -> Vec<Range<usize>> {
        index.to_source(query, any).map(|(r, _)| r).collect()
    }

    #[test]
    fn empty_index_yields_nothing() {
        let idx = index(vec![]);
        assert!(generated(&idx, 0..10).is_empty());
        assert!(source(&idx, 5..5).is_empty());
        assert!(idx.offsets(Side::Source).is_empty());
    }

    #[test]
    fn offset_translates_sub_ranges() {
        let idx = index(vec![Mapping::offset(20, 6, 10, true)]);
        assert_eq!(generated(&idx, 22..25), vec![8..11]);
        assert_eq!(source(&idx, 8..11), vec![22..25]);
        assert_eq!(generated(&idx, 20..30), vec![6..16]);
    }

    #[test]
    fn offset_round_trip() {
        let idx = index(vec![Mapping::offset(100, 3, 40, true)]);
        for start in 100..140 {
            for end in start..=140 {
                let there = generated(&idx, start..end);
                assert_eq!(there.len(), 1);
                let back = source(&idx, there[0].clone());
                assert_eq!(back, vec![start..end]);
            }
        }
    }

    #[test]
    fn offset_clamps_when_lengths_differ() {
        // "{{ a }}" in source becomes "(a)" in generated.
        let idx = index(vec![Mapping::new(MappingKind::Offset, 10..17, 0..3, true)]);
        assert_eq!(generated(&idx, 10..17), vec![0..3]);
        assert_eq!(generated(&idx, 10..10), vec![0..0]);
        assert_eq!(generated(&idx, 17..17), vec![3..3]);
        assert_eq!(generated(&idx, 15..16), vec![3..3]);
    }

    #[test]
    fn totally_requires_exact_range() {
        let idx = index(vec![Mapping::new(MappingKind::Totally, 5..10, 50..60, true)]);
        assert_eq!(generated(&idx, 5..10), vec![50..60]);
        assert!(generated(&idx, 6..10).is_empty());
        assert!(generated(&idx, 5..9).is_empty());
        assert!(generated(&idx, 4..10).is_empty());
        assert!(generated(&idx, 5..11).is_empty());
    }

    #[test]
    fn expand_returns_whole_counterpart() {
        let idx = index(vec![Mapping::new(MappingKind::Expand, 5..10, 50..80, true)]);
        for query in [5..10, 5..5, 6..8, 9..10, 10..10] {
            assert_eq!(generated(&idx, query), vec![50..80]);
        }
        assert!(generated(&idx, 4..6).is_empty());
    }

    #[test]
    fn additional_pairs_are_tried_in_order() {
        let mapping = Mapping::new(MappingKind::Totally, 0..4, 100..104, true)
            .with_additional(RangePair::new(MappingKind::Expand, 0..10, 200..210))
            .with_additional(RangePair::new(MappingKind::Offset, 0..10, 300..310));
        let idx = index(vec![mapping]);

        assert_eq!(generated(&idx, 0..4), vec![100..104]);
        // Primary rejects, first fallback accepts; the second is never consulted.
        assert_eq!(generated(&idx, 2..3), vec![200..210]);
        assert!(generated(&idx, 11..12).is_empty());
    }

    #[test]
    fn overlapping_mappings_are_all_reported() {
        let idx = index(vec![
            Mapping::offset(0, 0, 10, true),
            Mapping::new(MappingKind::Expand, 2..8, 40..45, false),
            Mapping::offset(20, 20, 5, true),
        ]);
        assert_eq!(generated(&idx, 3..4), vec![3..4, 40..45]);
    }

    #[test]
    fn filter_rejects_mapping_data() {
        let idx = index(vec![
            Mapping::offset(0, 0, 10, false),
            Mapping::offset(0, 100, 10, true),
        ]);
        let hits: Vec<_> = idx.to_generated(1..2, |d| *d).map(|(r, _)| r).collect();
        assert_eq!(hits, vec![101..102]);
    }

    #[test]
    fn out_of_range_queries_are_clamped() {
        let idx = index(vec![Mapping::offset(10, 0, 5, true)]);
        assert!(generated(&idx, 0..2).is_empty());
        assert!(generated(&idx, 100..200).is_empty());
        assert!(generated(&idx, usize::MAX - 1..usize::MAX).is_empty());
        // Reversed ranges are normalized instead of panicking.
        #[allow(clippy::reversed_empty_ranges)]
        let reversed = 12..11;
        assert_eq!(generated(&idx, reversed), vec![2..2]);
    }

    #[test]
    fn offsets_are_strictly_increasing_and_stable() {
        let mappings = vec![
            Mapping::offset(30, 0, 5, true),
            Mapping::offset(0, 10, 10, true),
            Mapping::new(MappingKind::Expand, 5..30, 40..41, true)
                .with_additional(RangePair::new(MappingKind::Totally, 7..9, 1..2)),
        ];
        let first = index(mappings.clone());
        let second = index(mappings);

        let offsets = first.offsets(Side::Source);
        assert_eq!(offsets, &[0, 5, 7, 9, 10, 30, 35]);
        assert!(offsets.windows(2).all(|w| w[0] < w[1]));

        for side in [Side::Source, Side::Generated] {
            assert_eq!(first.memo(side), second.memo(side));
        }
    }
}
