//! Store configuration and builder
//!
//! All thresholds are fixed for the lifetime of a [`PivotStore`]; changing
//! sensitivity means building a new store.

use crate::classify::{PivotClassifier, StructureClassifier};
use crate::patterns::PatternLibrary;
use crate::store::PivotStore;
use crate::{Period, PivotError, Ratio, Result};

/// Largest grid interval accepted (12 hours)
pub const MAX_INTERVAL_MINUTES: usize = 720;

/// Tunables of a pivot store
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Minimum relative move from the last pivot for an extreme to count
    pub min_price_change: Ratio,
    /// Candles that must elapse after the last pivot before a new candidate opens
    pub min_pivot_spacing: usize,
    /// Non-improving observations needed to confirm a candidate
    pub confirmation_window: Period,
    /// Prior pivots used for trend-aware classification
    pub trend_window: Period,
    /// Previous observations a high/low must beat before it is considered,
    /// 0 to consider every observation
    pub extreme_lookback: usize,
    pub history_capacity: Period,
    pub max_pending: Period,
    /// Ring bound for system-detected pivots
    pub max_stored_pivots: Period,
    /// Ring bound for operator-supplied pivots
    pub max_operator_pivots: Period,
    /// Observation grid, used to turn time gaps into candle counts
    pub interval_minutes: Period,
    /// Upper sanity bound on operator-supplied prices
    pub max_operator_price: f64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            min_price_change: Ratio::new_const(0.004),
            min_pivot_spacing: 2,
            confirmation_window: Period::new_const(3),
            trend_window: Period::new_const(5),
            extreme_lookback: 0,
            history_capacity: Period::new_const(100),
            max_pending: Period::new_const(8),
            max_stored_pivots: Period::new_const(50),
            max_operator_pivots: Period::new_const(100),
            interval_minutes: Period::new_const(30),
            max_operator_price: 500_000.0,
        }
    }
}

impl StoreConfig {
    /// Check cross-field constraints the newtypes cannot express
    pub fn validate(&self) -> Result<()> {
        if self.trend_window.get() < 3 {
            return Err(PivotError::InvalidConfig(format!(
                "trend_window must be at least 3, got {}",
                self.trend_window.get()
            )));
        }
        if self.history_capacity.get() < self.extreme_lookback {
            return Err(PivotError::InvalidConfig(format!(
                "history_capacity ({}) must cover extreme_lookback ({})",
                self.history_capacity.get(),
                self.extreme_lookback
            )));
        }
        if self.interval_minutes.get() > MAX_INTERVAL_MINUTES {
            return Err(PivotError::OutOfRange {
                field: "interval_minutes",
                value: self.interval_minutes.get() as f64,
                min: 1.0,
                max: MAX_INTERVAL_MINUTES as f64,
            });
        }
        if !self.max_operator_price.is_finite() || self.max_operator_price <= 0.0 {
            return Err(PivotError::InvalidValue(
                "max_operator_price must be finite and > 0",
            ));
        }
        Ok(())
    }

    /// Grid interval as minutes
    #[inline]
    pub(crate) fn interval(&self) -> u16 {
        self.interval_minutes.get() as u16
    }
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for [`PivotStore`] instances
pub struct StoreBuilder<C: PivotClassifier = StructureClassifier> {
    classifier: C,
    library: PatternLibrary,
    min_price_change: f64,
    min_pivot_spacing: usize,
    confirmation_window: usize,
    trend_window: usize,
    extreme_lookback: usize,
    history_capacity: usize,
    max_pending: usize,
    max_stored_pivots: usize,
    max_operator_pivots: usize,
    interval_minutes: usize,
    max_operator_price: f64,
}

impl Default for StoreBuilder<StructureClassifier> {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreBuilder<StructureClassifier> {
    pub fn new() -> Self {
        Self::from_config(StoreConfig::default())
    }

    /// Start from an existing configuration
    pub fn from_config(config: StoreConfig) -> Self {
        Self {
            classifier: StructureClassifier,
            library: PatternLibrary::builtin(),
            min_price_change: config.min_price_change.get(),
            min_pivot_spacing: config.min_pivot_spacing,
            confirmation_window: config.confirmation_window.get(),
            trend_window: config.trend_window.get(),
            extreme_lookback: config.extreme_lookback,
            history_capacity: config.history_capacity.get(),
            max_pending: config.max_pending.get(),
            max_stored_pivots: config.max_stored_pivots.get(),
            max_operator_pivots: config.max_operator_pivots.get(),
            interval_minutes: config.interval_minutes.get(),
            max_operator_price: config.max_operator_price,
        }
    }
}

impl<C: PivotClassifier> StoreBuilder<C> {
    /// Change the classification policy
    pub fn classifier<C2: PivotClassifier>(self, classifier: C2) -> StoreBuilder<C2> {
        StoreBuilder {
            classifier,
            library: self.library,
            min_price_change: self.min_price_change,
            min_pivot_spacing: self.min_pivot_spacing,
            confirmation_window: self.confirmation_window,
            trend_window: self.trend_window,
            extreme_lookback: self.extreme_lookback,
            history_capacity: self.history_capacity,
            max_pending: self.max_pending,
            max_stored_pivots: self.max_stored_pivots,
            max_operator_pivots: self.max_operator_pivots,
            interval_minutes: self.interval_minutes,
            max_operator_price: self.max_operator_price,
        }
    }

    /// Replace the pattern library used for alerts
    pub fn patterns(mut self, library: PatternLibrary) -> Self {
        self.library = library;
        self
    }

    pub fn min_price_change(mut self, fraction: f64) -> Self {
        self.min_price_change = fraction;
        self
    }

    pub fn min_pivot_spacing(mut self, candles: usize) -> Self {
        self.min_pivot_spacing = candles;
        self
    }

    pub fn confirmation_window(mut self, candles: usize) -> Self {
        self.confirmation_window = candles;
        self
    }

    pub fn trend_window(mut self, pivots: usize) -> Self {
        self.trend_window = pivots;
        self
    }

    pub fn extreme_lookback(mut self, candles: usize) -> Self {
        self.extreme_lookback = candles;
        self
    }

    pub fn history_capacity(mut self, observations: usize) -> Self {
        self.history_capacity = observations;
        self
    }

    pub fn max_pending(mut self, candidates: usize) -> Self {
        self.max_pending = candidates;
        self
    }

    pub fn max_stored_pivots(mut self, pivots: usize) -> Self {
        self.max_stored_pivots = pivots;
        self
    }

    pub fn max_operator_pivots(mut self, pivots: usize) -> Self {
        self.max_operator_pivots = pivots;
        self
    }

    pub fn interval_minutes(mut self, minutes: usize) -> Self {
        self.interval_minutes = minutes;
        self
    }

    pub fn max_operator_price(mut self, price: f64) -> Self {
        self.max_operator_price = price;
        self
    }

    /// Validate and produce the configuration only
    pub fn build_config(&self) -> Result<StoreConfig> {
        let config = StoreConfig {
            min_price_change: Ratio::new(self.min_price_change)?,
            min_pivot_spacing: self.min_pivot_spacing,
            confirmation_window: Period::new(self.confirmation_window)?,
            trend_window: Period::new(self.trend_window)?,
            extreme_lookback: self.extreme_lookback,
            history_capacity: Period::new(self.history_capacity)?,
            max_pending: Period::new(self.max_pending)?,
            max_stored_pivots: Period::new(self.max_stored_pivots)?,
            max_operator_pivots: Period::new(self.max_operator_pivots)?,
            interval_minutes: Period::new(self.interval_minutes)?,
            max_operator_price: self.max_operator_price,
        };
        config.validate()?;
        Ok(config)
    }

    /// Build the store
    pub fn build(self) -> Result<PivotStore<C>> {
        let config = self.build_config()?;
        Ok(PivotStore::with_parts(config, self.classifier, self.library))
    }
}
