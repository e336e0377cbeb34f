//! Pivot store: ingestion, confirmation and the merged pivot view
//!
//! Every observation goes through the same fixed sequence:
//!
//! 1. append to the bounded price history
//! 2. advance every pending candidate (improve its extreme, or count a
//!    non-improving candle)
//! 3. confirm candidates that sat out the confirmation window, labelling them
//!    through the [`PivotClassifier`]
//! 4. open new candidates where the high or low is a significant raw extreme
//!
//! Confirmed pivots come from two origins, the engine itself and an operator,
//! kept in separate bounded lists and merged by time for every downstream use.

use std::collections::VecDeque;

use tracing::{debug, info, trace, warn};

use crate::classify::{is_significant, PivotClassifier, StructureClassifier};
use crate::config::StoreConfig;
use crate::levels::{support_resistance, SupportResistance};
use crate::patterns::{PatternAlert, PatternLibrary};
use crate::time::TimeOfDay;
use crate::{
    Direction, Hlc, HlcExt, PivotError, PivotKind, PivotType, PriceObservation, Result,
};

/// Pivots carried in a [`PatternAlert`]
pub const ALERT_PIVOTS: usize = 5;

// ============================================================
// PIVOT RECORDS
// ============================================================

/// Origin of a confirmed pivot. Declaration order is the tie-break order in
/// the merged view: operator pivots sort first at equal times.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum PivotSource {
    Operator,
    System,
}

/// A labelled swing point
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ConfirmedPivot {
    pub time: TimeOfDay,
    pub price: f64,
    #[serde(rename = "type")]
    pub pivot_type: PivotType,
    pub source: PivotSource,
}

/// Best price seen by a candidate, keyed by side
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Extreme {
    High { price: f64, at: TimeOfDay },
    Low { price: f64, at: TimeOfDay },
}

/// A raw extreme waiting to be confirmed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingPivot {
    pub opened_at: TimeOfDay,
    pub open_price: f64,
    pub extreme: Extreme,
    /// Non-improving observations since the last improvement
    pub confirmations: usize,
    /// Observations since the last improvement that moved away from the extreme
    pub opposing_moves: usize,
}

impl PendingPivot {
    pub fn open(kind: PivotKind, time: TimeOfDay, price: f64) -> Self {
        let extreme = match kind {
            PivotKind::High => Extreme::High { price, at: time },
            PivotKind::Low => Extreme::Low { price, at: time },
        };
        Self {
            opened_at: time,
            open_price: price,
            extreme,
            confirmations: 0,
            opposing_moves: 0,
        }
    }

    #[inline]
    pub fn kind(&self) -> PivotKind {
        match self.extreme {
            Extreme::High { .. } => PivotKind::High,
            Extreme::Low { .. } => PivotKind::Low,
        }
    }

    #[inline]
    pub fn extreme_price(&self) -> f64 {
        match self.extreme {
            Extreme::High { price, .. } | Extreme::Low { price, .. } => price,
        }
    }

    #[inline]
    pub fn extreme_at(&self) -> TimeOfDay {
        match self.extreme {
            Extreme::High { at, .. } | Extreme::Low { at, .. } => at,
        }
    }

    /// Fold one observation in. Returns true when the extreme improved.
    pub fn observe<T: Hlc>(&mut self, bar: &T) -> bool {
        let improved = match &mut self.extreme {
            Extreme::High { price, at } if bar.high() > *price => {
                *price = bar.high();
                *at = bar.time();
                true
            }
            Extreme::Low { price, at } if bar.low() < *price => {
                *price = bar.low();
                *at = bar.time();
                true
            }
            _ => false,
        };

        if improved {
            self.confirmations = 0;
            self.opposing_moves = 0;
        } else {
            // a bar that only matches the extreme counts against it too
            self.confirmations += 1;
            self.opposing_moves += 1;
        }
        improved
    }

    #[inline]
    pub fn is_confirmed(&self, window: usize) -> bool {
        self.confirmations >= window && self.opposing_moves >= window
    }
}

// ============================================================
// OUTCOMES
// ============================================================

/// What a single observation changed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepOutcome {
    /// Pivots confirmed during this step, in confirmation order
    pub confirmed: Vec<ConfirmedPivot>,
    /// Candidates opened during this step
    pub opened: usize,
    /// Pattern completed by this step's confirmations
    pub alert: Option<PatternAlert>,
}

impl StepOutcome {
    #[inline]
    pub fn has_new_pivots(&self) -> bool {
        !self.confirmed.is_empty()
    }
}

/// Snapshot of store occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct StoreStatus {
    pub observations: usize,
    pub history_len: usize,
    pub pending: usize,
    pub system_pivots: usize,
    pub operator_pivots: usize,
    pub last_time: Option<TimeOfDay>,
}

/// One row of the pivot export
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct PivotReportRow {
    pub time: TimeOfDay,
    #[serde(rename = "type")]
    pub pivot_type: PivotType,
    pub price: f64,
    pub source: PivotSource,
    /// Percent change from the previous pivot
    pub change_pct: Option<f64>,
    pub direction: Option<Direction>,
}

// ============================================================
// STORE
// ============================================================

/// Owns all pivot state for one asset
#[derive(Debug)]
pub struct PivotStore<C: PivotClassifier = StructureClassifier> {
    config: StoreConfig,
    classifier: C,
    library: PatternLibrary,
    history: VecDeque<PriceObservation>,
    pending: Vec<PendingPivot>,
    system: VecDeque<ConfirmedPivot>,
    operator: VecDeque<ConfirmedPivot>,
    observations: usize,
}

impl PivotStore<StructureClassifier> {
    /// Store with the default classifier and builtin patterns
    pub fn new(config: StoreConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_parts(config, StructureClassifier, PatternLibrary::builtin()))
    }
}

impl<C: PivotClassifier> PivotStore<C> {
    pub(crate) fn with_parts(config: StoreConfig, classifier: C, library: PatternLibrary) -> Self {
        Self {
            history: VecDeque::with_capacity(config.history_capacity.get() + 1),
            pending: Vec::with_capacity(config.max_pending.get()),
            system: VecDeque::new(),
            operator: VecDeque::new(),
            observations: 0,
            config,
            classifier,
            library,
        }
    }

    // ===========================================
    // Ingestion
    // ===========================================

    /// Process one observation. Fails only on malformed input, in which case
    /// nothing is mutated.
    pub fn record<T: Hlc>(&mut self, bar: &T) -> Result<StepOutcome> {
        let index = self.observations;
        if let Err(e) = bar.validate() {
            let e = match e {
                PivotError::InvalidObservation { reason, .. } => {
                    PivotError::InvalidObservation { index, reason }
                }
                other => other,
            };
            warn!(index, error = %e, "observation rejected");
            return Err(e);
        }

        let obs = PriceObservation::from_hlc(bar);
        if let Some(prev) = self.history.back() {
            if obs.time < prev.time {
                warn!(prev = %prev.time, time = %obs.time, "observation earlier than previous");
            }
        }

        let prior = self.lookback_extremes();
        self.push_history(obs);
        self.observations += 1;

        self.advance_pending(&obs);
        let confirmed = self.confirm_ready();
        let opened = self.open_candidates(&obs, prior);

        let alert = if confirmed.is_empty() {
            None
        } else {
            self.check_pattern(obs.close)
        };

        Ok(StepOutcome {
            confirmed,
            opened,
            alert,
        })
    }

    /// Insert an operator-supplied pivot from raw command arguments.
    pub fn add_operator_pivot(
        &mut self,
        pivot_type: &str,
        price: f64,
        time: &str,
    ) -> Result<ConfirmedPivot> {
        let pivot_type: PivotType = pivot_type.parse()?;
        let time: TimeOfDay = time
            .parse()
            .map_err(|_| PivotError::InvalidPivotInput(format!("malformed time {time:?}")))?;
        self.insert_operator_pivot(pivot_type, price, time)
    }

    /// Insert an operator-supplied pivot, bypassing detection.
    pub fn insert_operator_pivot(
        &mut self,
        pivot_type: PivotType,
        price: f64,
        time: TimeOfDay,
    ) -> Result<ConfirmedPivot> {
        if !price.is_finite() || price <= 0.0 {
            return Err(PivotError::InvalidPivotInput(format!(
                "price must be positive, got {price}"
            )));
        }
        if price > self.config.max_operator_price {
            return Err(PivotError::InvalidPivotInput(format!(
                "price {price} exceeds limit {}",
                self.config.max_operator_price
            )));
        }

        let pivot = ConfirmedPivot {
            time,
            price,
            pivot_type,
            source: PivotSource::Operator,
        };
        self.operator.push_back(pivot);
        if self.operator.len() > self.config.max_operator_pivots.get() {
            if let Some(evicted) = self.operator.pop_front() {
                debug!(time = %evicted.time, "operator pivot evicted");
            }
        }
        info!(time = %time, price, label = %pivot_type, "operator pivot added");
        Ok(pivot)
    }

    /// Reset history, candidates and both pivot lists.
    pub fn clear(&mut self) {
        self.history.clear();
        self.pending.clear();
        self.system.clear();
        self.operator.clear();
        self.observations = 0;
        debug!("pivot store cleared");
    }

    /// Remove one confirmed pivot from the list of its origin.
    pub fn remove_pivot(&mut self, pivot: &ConfirmedPivot) -> bool {
        let list = match pivot.source {
            PivotSource::System => &mut self.system,
            PivotSource::Operator => &mut self.operator,
        };
        match list.iter().position(|p| p == pivot) {
            Some(pos) => {
                list.remove(pos);
                debug!(time = %pivot.time, label = %pivot.pivot_type, "pivot removed");
                true
            }
            None => false,
        }
    }

    // ===========================================
    // Queries
    // ===========================================

    /// System and operator pivots merged, ascending by time, operator first on ties.
    pub fn all_pivots(&self) -> Vec<ConfirmedPivot> {
        let mut merged: Vec<ConfirmedPivot> =
            self.system.iter().chain(self.operator.iter()).copied().collect();
        merged.sort_by_key(|p| (p.time, p.source));
        merged
    }

    /// Last `count` pivots of the merged view, oldest first
    pub fn recent_pivots(&self, count: usize) -> Vec<ConfirmedPivot> {
        let mut merged = self.all_pivots();
        let skip = merged.len().saturating_sub(count);
        merged.drain(..skip);
        merged
    }

    /// Labels of the merged view
    pub fn labels(&self) -> Vec<PivotType> {
        self.all_pivots().iter().map(|p| p.pivot_type).collect()
    }

    /// Evaluate the pattern library against the current labels.
    pub fn check_pattern(&self, triggering_price: f64) -> Option<PatternAlert> {
        let hit = self.library.find(&self.labels())?;
        info!(
            pattern = hit.pattern_id.as_str(),
            price = triggering_price,
            "pattern detected"
        );
        Some(PatternAlert {
            pattern: hit.pattern_id,
            direction: hit.direction,
            triggering_price,
            recent_pivots: self.recent_pivots(ALERT_PIVOTS),
        })
    }

    /// Merged pivots with the move from each one's predecessor
    pub fn report(&self) -> Vec<PivotReportRow> {
        let mut prev: Option<f64> = None;
        self.all_pivots()
            .into_iter()
            .map(|p| {
                let change_pct = prev.map(|before| (p.price - before) / before * 100.0);
                prev = Some(p.price);
                PivotReportRow {
                    time: p.time,
                    pivot_type: p.pivot_type,
                    price: p.price,
                    source: p.source,
                    change_pct,
                    direction: change_pct.map(Direction::of_change),
                }
            })
            .collect()
    }

    /// Support/resistance levels over the last `lookback` observations
    pub fn support_resistance(&self, lookback: usize) -> Result<SupportResistance> {
        let skip = self.history.len().saturating_sub(lookback);
        let recent: Vec<PriceObservation> = self.history.iter().skip(skip).copied().collect();
        support_resistance(&recent, lookback)
    }

    pub fn status(&self) -> StoreStatus {
        StoreStatus {
            observations: self.observations,
            history_len: self.history.len(),
            pending: self.pending.len(),
            system_pivots: self.system.len(),
            operator_pivots: self.operator.len(),
            last_time: self.history.back().map(|o| o.time),
        }
    }

    pub fn pending(&self) -> &[PendingPivot] {
        &self.pending
    }

    pub fn history(&self) -> impl ExactSizeIterator<Item = &PriceObservation> + '_ {
        self.history.iter()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // ===========================================
    // Internal helpers
    // ===========================================

    /// Max high and min low over the last `extreme_lookback` observations,
    /// `None` when the filter is off or history is empty
    fn lookback_extremes(&self) -> Option<(f64, f64)> {
        let lookback = self.config.extreme_lookback;
        if lookback == 0 {
            return None;
        }
        let skip = self.history.len().saturating_sub(lookback);
        self.history.iter().skip(skip).fold(None, |acc, o| match acc {
            None => Some((o.high, o.low)),
            Some((h, l)) => Some((f64::max(h, o.high), f64::min(l, o.low))),
        })
    }

    fn push_history(&mut self, obs: PriceObservation) {
        self.history.push_back(obs);
        if self.history.len() > self.config.history_capacity.get() {
            self.history.pop_front();
        }
    }

    fn advance_pending(&mut self, obs: &PriceObservation) {
        for candidate in &mut self.pending {
            let improved = candidate.observe(obs);
            trace!(
                kind = ?candidate.kind(),
                extreme = candidate.extreme_price(),
                improved,
                confirmations = candidate.confirmations,
                opposing = candidate.opposing_moves,
                "candidate advanced"
            );
        }
    }

    fn confirm_ready(&mut self) -> Vec<ConfirmedPivot> {
        let window = self.config.confirmation_window.get();
        let (ready, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|c| c.is_confirmed(window));
        self.pending = waiting;

        let mut confirmed = Vec::with_capacity(ready.len());
        for candidate in ready {
            let prior: Vec<f64> = self.all_pivots().iter().map(|p| p.price).collect();
            let label = self.classifier.label(
                candidate.kind(),
                candidate.extreme_price(),
                &prior,
                self.config.trend_window.get(),
            );
            let Some(pivot_type) = label else {
                debug!(
                    kind = ?candidate.kind(),
                    price = candidate.extreme_price(),
                    "classification undetermined, candidate dropped"
                );
                continue;
            };

            let pivot = ConfirmedPivot {
                time: candidate.extreme_at(),
                price: candidate.extreme_price(),
                pivot_type,
                source: PivotSource::System,
            };
            self.push_system(pivot);
            info!(time = %pivot.time, price = pivot.price, label = %pivot_type, "pivot confirmed");
            confirmed.push(pivot);
        }
        confirmed
    }

    fn push_system(&mut self, pivot: ConfirmedPivot) {
        self.system.push_back(pivot);
        if self.system.len() > self.config.max_stored_pivots.get() {
            if let Some(evicted) = self.system.pop_front() {
                debug!(time = %evicted.time, "system pivot evicted");
            }
        }
    }

    fn open_candidates(&mut self, obs: &PriceObservation, prior: Option<(f64, f64)>) -> usize {
        let interval = self.config.interval();
        let spacing = self.config.min_pivot_spacing;
        let last = self.all_pivots().last().copied();
        let mut opened = 0;

        for kind in [PivotKind::High, PivotKind::Low] {
            let price = obs.price_for(kind);

            let raw_extreme = match (kind, prior) {
                (_, None) => true,
                (PivotKind::High, Some((high, _))) => price > high,
                (PivotKind::Low, Some((_, low))) => price < low,
            };
            if !raw_extreme {
                continue;
            }

            if let Some(last) = last {
                let elapsed = obs.time.candles_between(last.time, interval);
                if !is_significant(
                    price,
                    last.price,
                    elapsed,
                    self.config.min_price_change.get(),
                    spacing,
                ) {
                    trace!(?kind, price, elapsed, "extreme below significance");
                    continue;
                }
            }

            let covered = self.pending.iter().any(|c| {
                c.kind() == kind && c.extreme_at().candles_between(obs.time, interval) <= spacing
            });
            if covered {
                continue;
            }

            if self.pending.len() >= self.config.max_pending.get() {
                let superseded = self.pending.remove(0);
                debug!(
                    kind = ?superseded.kind(),
                    price = superseded.extreme_price(),
                    "candidate superseded"
                );
            }
            self.pending.push(PendingPivot::open(kind, obs.time, price));
            debug!(?kind, price, time = %obs.time, "candidate opened");
            opened += 1;
        }
        opened
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreBuilder;

    fn t(s: &str) -> TimeOfDay {
        s.parse().unwrap()
    }

    fn bar(time: &str, high: f64, low: f64, close: f64) -> PriceObservation {
        PriceObservation::new(t(time), high, low, close)
    }

    #[test]
    fn test_pending_high_tracks_max() {
        let mut c = PendingPivot::open(PivotKind::High, t("10:00"), 100.0);
        assert!(!c.observe(&bar("10:30", 99.0, 98.0, 98.5)));
        assert_eq!((c.confirmations, c.opposing_moves), (1, 1));

        assert!(c.observe(&bar("11:00", 101.0, 99.0, 100.5)));
        assert_eq!(c.extreme_price(), 101.0);
        assert_eq!(c.extreme_at(), t("11:00"));
        assert_eq!((c.confirmations, c.opposing_moves), (0, 0));
        assert_eq!(c.opened_at, t("10:00"));
        assert_eq!(c.open_price, 100.0);
    }

    #[test]
    fn test_pending_low_tracks_min() {
        let mut c = PendingPivot::open(PivotKind::Low, t("10:00"), 100.0);
        assert!(c.observe(&bar("10:30", 101.0, 99.0, 100.0)));
        assert_eq!(c.extreme_price(), 99.0);
        assert!(!c.observe(&bar("11:00", 101.0, 99.0, 100.0)));
        assert_eq!(c.kind(), PivotKind::Low);
    }

    #[test]
    fn test_counters_advance_on_close_at_extreme() {
        let mut c = PendingPivot::open(PivotKind::High, t("10:00"), 100.0);
        c.observe(&bar("10:30", 99.0, 98.0, 98.5));
        c.observe(&bar("11:00", 100.0, 98.0, 100.0));
        assert_eq!((c.confirmations, c.opposing_moves), (2, 2));
        assert!(c.is_confirmed(2));
        assert!(!c.is_confirmed(3));

        c.observe(&bar("11:30", 100.0, 99.5, 100.0));
        assert!(c.is_confirmed(3));
        assert_eq!(c.extreme_at(), t("10:00"));
    }

    #[test]
    fn test_rejects_malformed_observation_without_mutation() {
        let mut store = PivotStore::new(StoreConfig::default()).unwrap();
        store.record(&bar("10:00", 101.0, 99.0, 100.0)).unwrap();
        let before = store.status();

        let err = store.record(&bar("10:30", 98.0, 99.0, 98.5)).unwrap_err();
        assert_eq!(
            err,
            PivotError::InvalidObservation {
                index: 1,
                reason: "high < low"
            }
        );
        assert_eq!(store.status(), before);
    }

    #[test]
    fn test_first_observation_opens_both_sides() {
        let mut store = PivotStore::new(StoreConfig::default()).unwrap();
        let outcome = store.record(&bar("10:00", 101.0, 99.0, 100.0)).unwrap();
        assert_eq!(outcome.opened, 2);
        assert!(!outcome.has_new_pivots());
        assert_eq!(store.pending().len(), 2);
    }

    #[test]
    fn test_lookback_filter_is_opt_in() {
        let range = |store: &mut PivotStore| {
            store.record(&bar("10:00", 101.0, 99.0, 100.0)).unwrap();
            ["10:30", "11:00", "11:30"]
                .map(|time| store.record(&bar(time, 100.5, 99.5, 100.0)).unwrap())
        };

        let mut store = PivotStore::new(StoreConfig::default()).unwrap();
        let outcomes = range(&mut store);
        assert_eq!(outcomes[2].confirmed.len(), 2);
        assert_eq!(outcomes[2].opened, 2);

        let mut filtered = StoreBuilder::new().extreme_lookback(3).build().unwrap();
        let outcomes = range(&mut filtered);
        assert_eq!(outcomes[2].confirmed.len(), 2);
        assert_eq!(outcomes[2].opened, 0);
        assert!(filtered.pending().is_empty());
    }

    #[test]
    fn test_history_is_bounded() {
        let mut store = StoreBuilder::new()
            .history_capacity(5)
            .extreme_lookback(2)
            .build()
            .unwrap();
        for i in 0..12u16 {
            let time = TimeOfDay::new_const(0, 0).wrapping_add(i * 30);
            store.record(&PriceObservation::new(time, 101.0, 99.0, 100.0)).unwrap();
        }
        assert_eq!(store.history().len(), 5);
        assert_eq!(store.status().observations, 12);
        assert_eq!(store.history().next().unwrap().time, t("03:30"));
    }

    #[test]
    fn test_operator_pivot_validation() {
        let mut store = PivotStore::new(StoreConfig::default()).unwrap();
        assert!(store.add_operator_pivot("HH", 83000.0, "14:30").is_ok());
        for (label, price, time) in [
            ("XX", 100.0, "10:00"),
            ("HH", 0.0, "10:00"),
            ("HH", -5.0, "10:00"),
            ("HH", f64::NAN, "10:00"),
            ("HH", 600_000.0, "10:00"),
            ("HH", 100.0, "25:00"),
            ("HH", 100.0, "noon"),
        ] {
            let err = store.add_operator_pivot(label, price, time).unwrap_err();
            assert!(
                matches!(err, PivotError::InvalidPivotInput(_)),
                "{label} {price} {time}: {err:?}"
            );
        }
        assert_eq!(store.all_pivots().len(), 1);
    }

    #[test]
    fn test_merge_ordering_and_tie_break() {
        let mut store = PivotStore::new(StoreConfig::default()).unwrap();
        store.push_system(ConfirmedPivot {
            time: t("06:00"),
            price: 100.0,
            pivot_type: PivotType::LL,
            source: PivotSource::System,
        });
        store.add_operator_pivot("HH", 105.0, "11:00").unwrap();
        store.push_system(ConfirmedPivot {
            time: t("11:00"),
            price: 104.0,
            pivot_type: PivotType::LH,
            source: PivotSource::System,
        });
        store.add_operator_pivot("HL", 102.0, "08:00").unwrap();

        let times: Vec<String> = store.all_pivots().iter().map(|p| p.time.to_string()).collect();
        assert_eq!(times, ["06:00", "08:00", "11:00", "11:00"]);
        let all = store.all_pivots();
        assert_eq!(all[2].source, PivotSource::Operator);
        assert_eq!(all[3].source, PivotSource::System);
    }

    #[test]
    fn test_system_pivots_evicted_separately() {
        let mut store = StoreBuilder::new()
            .max_stored_pivots(2)
            .max_operator_pivots(3)
            .build()
            .unwrap();
        for (i, time) in ["01:00", "02:00", "03:00"].iter().enumerate() {
            store.push_system(ConfirmedPivot {
                time: t(time),
                price: 100.0 + i as f64,
                pivot_type: PivotType::HH,
                source: PivotSource::System,
            });
            store.add_operator_pivot("LL", 90.0, time).unwrap();
        }
        let status = store.status();
        assert_eq!(status.system_pivots, 2);
        assert_eq!(status.operator_pivots, 3);
        assert_eq!(store.all_pivots()[0].source, PivotSource::Operator);
    }

    #[test]
    fn test_remove_pivot() {
        let mut store = PivotStore::new(StoreConfig::default()).unwrap();
        let pivot = store.add_operator_pivot("LH", 82000.0, "13:30").unwrap();
        assert!(store.remove_pivot(&pivot));
        assert!(!store.remove_pivot(&pivot));
        assert!(store.all_pivots().is_empty());
    }

    #[test]
    fn test_recent_pivots() {
        let mut store = PivotStore::new(StoreConfig::default()).unwrap();
        for (label, price, time) in [
            ("LL", 100.0, "10:00"),
            ("LH", 104.0, "11:00"),
            ("LL", 99.0, "12:00"),
        ] {
            store.add_operator_pivot(label, price, time).unwrap();
        }
        let recent = store.recent_pivots(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].time, t("11:00"));
        assert_eq!(store.recent_pivots(10).len(), 3);
        assert!(store.recent_pivots(0).is_empty());
    }

    #[test]
    fn test_report_rows() {
        let mut store = PivotStore::new(StoreConfig::default()).unwrap();
        store.add_operator_pivot("LL", 100.0, "10:00").unwrap();
        store.add_operator_pivot("LH", 102.0, "11:00").unwrap();
        store.add_operator_pivot("LL", 102.0, "12:00").unwrap();

        let rows = store.report();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].change_pct, None);
        assert!((rows[1].change_pct.unwrap() - 2.0).abs() < 1e-9);
        assert_eq!(rows[1].direction, Some(Direction::Bullish));
        assert_eq!(rows[2].direction, Some(Direction::Neutral));

        let json = serde_json::to_value(&rows[1]).unwrap();
        assert_eq!(json["type"], "LH");
        assert_eq!(json["time"], "11:00");
        assert_eq!(json["source"], "Operator");
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut store = PivotStore::new(StoreConfig::default()).unwrap();
        store.record(&bar("10:00", 101.0, 99.0, 100.0)).unwrap();
        store.add_operator_pivot("HH", 105.0, "09:00").unwrap();
        store.clear();

        let status = store.status();
        assert_eq!(status.observations, 0);
        assert_eq!(status.history_len, 0);
        assert_eq!(status.pending, 0);
        assert_eq!(status.system_pivots + status.operator_pivots, 0);
        assert!(store.all_pivots().is_empty());
        assert_eq!(status.last_time, None);
    }

    #[test]
    fn test_check_pattern_on_operator_pivots() {
        let mut store = PivotStore::new(StoreConfig::default()).unwrap();
        store.add_operator_pivot("LL", 100.0, "10:00").unwrap();
        store.add_operator_pivot("LH", 104.0, "11:00").unwrap();
        assert!(store.check_pattern(101.0).is_none());

        store.add_operator_pivot("LL", 98.0, "12:00").unwrap();
        let alert = store.check_pattern(99.0).unwrap();
        assert_eq!(alert.pattern.as_str(), "bearish_reversal");
        assert_eq!(alert.triggering_price, 99.0);
        assert_eq!(alert.recent_pivots.len(), 3);
    }

    #[test]
    fn test_custom_classifier() {
        struct AlwaysHigherHigh;
        impl PivotClassifier for AlwaysHigherHigh {
            fn label(&self, _: PivotKind, _: f64, _: &[f64], _: usize) -> Option<PivotType> {
                Some(PivotType::HH)
            }
        }

        let mut store = StoreBuilder::new()
            .classifier(AlwaysHigherHigh)
            .build()
            .unwrap();
        // open, then three non-improving candles on both sides
        store.record(&bar("10:00", 102.0, 98.0, 100.0)).unwrap();
        store.record(&bar("10:30", 101.0, 99.0, 100.0)).unwrap();
        store.record(&bar("11:00", 101.0, 99.0, 100.0)).unwrap();
        let outcome = store.record(&bar("11:30", 101.0, 99.0, 100.0)).unwrap();
        assert_eq!(outcome.confirmed.len(), 2);
        assert!(outcome.confirmed.iter().all(|p| p.pivot_type == PivotType::HH));
    }
}
