//! Reversal pattern matching over confirmed pivot labels
//!
//! A pattern is a literal label sequence. Only the tail of the label stream is
//! compared, position by position, so a call costs O(patterns x length) and is
//! idempotent for an unchanged stream: only the newest pivot can complete a
//! pattern.

use std::sync::OnceLock;

use crate::store::ConfirmedPivot;
use crate::{Direction, PivotType};

/// Unique identifier for a pattern group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub struct PatternId(pub &'static str);

impl PatternId {
    /// Returns the string identifier
    #[inline]
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

/// Named set of label sequences that share a meaning
#[derive(Debug, Clone)]
pub struct PatternGroup {
    pub id: PatternId,
    pub direction: Direction,
    pub sequences: Vec<Vec<PivotType>>,
}

impl PatternGroup {
    pub fn new(id: &'static str, direction: Direction) -> Self {
        Self {
            id: PatternId(id),
            direction,
            sequences: Vec::new(),
        }
    }

    /// Add one literal sequence (empty sequences never match and are ignored)
    pub fn sequence(mut self, labels: &[PivotType]) -> Self {
        if !labels.is_empty() {
            self.sequences.push(labels.to_vec());
        }
        self
    }

    /// Length of the first sequence in this group that the tail of `labels` equals
    pub fn matching_len(&self, labels: &[PivotType]) -> Option<usize> {
        self.sequences
            .iter()
            .find(|seq| labels.ends_with(seq.as_slice()))
            .map(Vec::len)
    }
}

/// Result of a pattern match
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternMatch {
    pub pattern_id: PatternId,
    pub direction: Direction,
    pub start_index: usize,
    pub end_index: usize,
}

// ============================================================
// LIBRARY
// ============================================================

use PivotType::{HH, HL, LH, LL};

const BULLISH_REVERSAL: &[&[PivotType]] = &[
    &[HH, HL, HH, HL, HH],
    &[LH, HL, HH, HL, HH],
    &[HH, HH, HH],
    &[HH, HL, HH, HH],
];

const BEARISH_REVERSAL: &[&[PivotType]] = &[
    &[LL, LL, LH, LL],
    &[LL, LH, LL, LH, LL],
    &[LL, LL, LL],
    &[LL, LH, LL],
];

/// Ordered collection of pattern groups; the first matching group wins
#[derive(Debug, Clone, Default)]
pub struct PatternLibrary {
    groups: Vec<PatternGroup>,
}

impl PatternLibrary {
    /// Library with no groups
    pub fn empty() -> Self {
        Self::default()
    }

    /// Bullish then bearish reversal groups
    pub fn builtin() -> Self {
        let group = |id, direction, sequences: &[&[PivotType]]| {
            sequences
                .iter()
                .fold(PatternGroup::new(id, direction), |g, seq| g.sequence(seq))
        };
        Self::empty()
            .with_group(group("bullish_reversal", Direction::Bullish, BULLISH_REVERSAL))
            .with_group(group("bearish_reversal", Direction::Bearish, BEARISH_REVERSAL))
    }

    /// Append a group after the existing ones
    pub fn with_group(mut self, group: PatternGroup) -> Self {
        self.groups.push(group);
        self
    }

    pub fn groups(&self) -> &[PatternGroup] {
        &self.groups
    }

    /// Match the tail of `labels` against every group in order
    pub fn find(&self, labels: &[PivotType]) -> Option<PatternMatch> {
        self.groups.iter().find_map(|group| {
            group.matching_len(labels).map(|len| PatternMatch {
                pattern_id: group.id,
                direction: group.direction,
                start_index: labels.len() - len,
                end_index: labels.len() - 1,
            })
        })
    }
}

/// Match against the builtin library
pub fn match_pattern(labels: &[PivotType]) -> Option<PatternMatch> {
    static BUILTIN: OnceLock<PatternLibrary> = OnceLock::new();
    BUILTIN.get_or_init(PatternLibrary::builtin).find(labels)
}

// ============================================================
// ALERT EVENT
// ============================================================

/// Raised when a newly confirmed pivot completes a pattern.
/// Delivery and formatting belong to the host.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PatternAlert {
    pub pattern: PatternId,
    pub direction: Direction,
    pub triggering_price: f64,
    /// Most recent pivots, oldest first
    pub recent_pivots: Vec<ConfirmedPivot>,
}
