//! # swingpivot - incremental swing pivot detection
//!
//! Consumes one high/low/close observation per fixed interval and maintains the
//! structurally significant swing points of a single asset, labelled against
//! recent structure as Higher-High, Higher-Low, Lower-High or Lower-Low.
//! Confirmed labels feed a suffix pattern matcher that recognises short
//! reversal sequences.
//!
//! ## Quick Start
//!
//! ```rust
//! use swingpivot::prelude::*;
//!
//! let mut store = StoreBuilder::new()
//!     .min_pivot_spacing(1)
//!     .build()
//!     .unwrap();
//!
//! let time: TimeOfDay = "10:00".parse().unwrap();
//! let outcome = store
//!     .record(&PriceObservation::new(time, 101.0, 99.0, 100.0))
//!     .unwrap();
//! assert!(!outcome.has_new_pivots());
//!
//! for pivot in store.all_pivots() {
//!     println!("{} {} {:.2}", pivot.time, pivot.pivot_type, pivot.price);
//! }
//!
//! if let Some(hit) = match_pattern(&[PivotType::LL, PivotType::LH, PivotType::LL]) {
//!     assert_eq!(hit.pattern_id.as_str(), "bearish_reversal");
//! }
//! ```

pub mod classify;
pub mod config;
pub mod levels;
pub mod params;
pub mod patterns;
pub mod store;
pub mod time;

pub mod prelude {
    pub use crate::{
        // Classification
        classify::{PivotClassifier, StructureClassifier},
        // Configuration
        config::{StoreBuilder, StoreConfig},
        // Levels
        levels::{support_resistance, LevelId, SupportResistance},
        // Parameters
        params::{ParamMeta, ParamType, Parameterized},
        // Patterns
        patterns::{match_pattern, PatternAlert, PatternGroup, PatternId, PatternLibrary, PatternMatch},
        // Parallel
        replay_parallel,
        // Store
        store::{ConfirmedPivot, PendingPivot, PivotSource, PivotStore, StepOutcome, StoreStatus},
        time::TimeOfDay,
        // Types
        Direction,
        Hlc,
        HlcExt,
        Period,
        // Errors
        PivotError,
        PivotKind,
        PivotType,
        PriceObservation,
        Ratio,
        ReplayError,
        ReplayResult,
        Result,
    };
}

use std::fmt;
use std::str::FromStr;

use store::{ConfirmedPivot, PivotStore};
use time::TimeOfDay;

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, PivotError>;

/// Errors surfaced by the pivot engine
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PivotError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid observation #{index}: {reason}")]
    InvalidObservation { index: usize, reason: &'static str },

    #[error("Invalid pivot input: {0}")]
    InvalidPivotInput(String),

    #[error("Invalid time of day: {0:?} (expected HH:MM)")]
    InvalidTime(String),

    #[error("Insufficient history: need {need} observations, got {got}")]
    InsufficientHistory { need: usize, got: usize },
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Normalized value in range 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Ratio(f64);

impl Ratio {
    /// Create a new Ratio, validating the value is in [0.0, 1.0]
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || value.is_infinite() {
            return Err(PivotError::InvalidValue("Ratio cannot be NaN or infinite"));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(PivotError::OutOfRange {
                field: "Ratio",
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl serde::Serialize for Ratio {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Ratio {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Ratio::new(value).map_err(serde::de::Error::custom)
    }
}

/// Count of observations or pivots (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period(usize);

impl Period {
    /// Create a new Period, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(PivotError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OBSERVATION TRAITS
// ============================================================

/// One interval of price action as the engine sees it
pub trait Hlc {
    fn time(&self) -> TimeOfDay;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
}

impl<T: Hlc + ?Sized> Hlc for &T {
    fn time(&self) -> TimeOfDay {
        (**self).time()
    }

    fn high(&self) -> f64 {
        (**self).high()
    }

    fn low(&self) -> f64 {
        (**self).low()
    }

    fn close(&self) -> f64 {
        (**self).close()
    }
}

/// Extension trait with computed properties for observations
pub trait HlcExt: Hlc {
    /// Relevant price for one side of the market
    #[inline]
    fn price_for(&self, kind: PivotKind) -> f64 {
        match kind {
            PivotKind::High => self.high(),
            PivotKind::Low => self.low(),
        }
    }

    /// Validate observation consistency. The index is always 0 here; callers
    /// that know the position remap it.
    fn validate(&self) -> Result<()> {
        let (high, low, close) = (self.high(), self.low(), self.close());
        if high.is_nan() || low.is_nan() || close.is_nan() {
            return Err(PivotError::InvalidObservation {
                index: 0,
                reason: "NaN in observation",
            });
        }
        if high.is_infinite() || low.is_infinite() || close.is_infinite() {
            return Err(PivotError::InvalidObservation {
                index: 0,
                reason: "Infinite value in observation",
            });
        }
        if high < low {
            return Err(PivotError::InvalidObservation {
                index: 0,
                reason: "high < low",
            });
        }
        if low <= 0.0 {
            return Err(PivotError::InvalidObservation {
                index: 0,
                reason: "non-positive price",
            });
        }
        Ok(())
    }
}

impl<T: Hlc + ?Sized> HlcExt for T {}

/// Owned observation record, as kept in the store's history
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PriceObservation {
    pub time: TimeOfDay,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl PriceObservation {
    pub fn new(time: TimeOfDay, high: f64, low: f64, close: f64) -> Self {
        Self {
            time,
            high,
            low,
            close,
        }
    }

    pub fn from_hlc<T: Hlc>(bar: &T) -> Self {
        Self::new(bar.time(), bar.high(), bar.low(), bar.close())
    }
}

impl Hlc for PriceObservation {
    fn time(&self) -> TimeOfDay {
        self.time
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }
}

// ============================================================
// PIVOT LABELS
// ============================================================

/// Side of the market a pivot marks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum PivotKind {
    High,
    Low,
}

/// Structural label of a confirmed pivot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum PivotType {
    /// Higher-High
    HH,
    /// Higher-Low
    HL,
    /// Lower-High
    LH,
    /// Lower-Low
    LL,
}

impl PivotType {
    pub const ALL: [PivotType; 4] = [PivotType::HH, PivotType::HL, PivotType::LH, PivotType::LL];

    #[inline]
    pub fn kind(self) -> PivotKind {
        match self {
            PivotType::HH | PivotType::LH => PivotKind::High,
            PivotType::HL | PivotType::LL => PivotKind::Low,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PivotType::HH => "HH",
            PivotType::HL => "HL",
            PivotType::LH => "LH",
            PivotType::LL => "LL",
        }
    }
}

impl fmt::Display for PivotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PivotType {
    type Err = PivotError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HH" => Ok(PivotType::HH),
            "HL" => Ok(PivotType::HL),
            "LH" => Ok(PivotType::LH),
            "LL" => Ok(PivotType::LL),
            _ => Err(PivotError::InvalidPivotInput(format!(
                "unknown pivot type {s:?}, expected one of HH, HL, LH, LL"
            ))),
        }
    }
}

/// Direction/bias of a move or pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Direction {
    Bullish,
    Neutral,
    Bearish,
}

impl Direction {
    #[inline]
    pub fn is_bullish(self) -> bool {
        matches!(self, Direction::Bullish)
    }

    #[inline]
    pub fn is_bearish(self) -> bool {
        matches!(self, Direction::Bearish)
    }

    /// Sign of a price change
    pub fn of_change(change: f64) -> Self {
        if change > 0.0 {
            Direction::Bullish
        } else if change < 0.0 {
            Direction::Bearish
        } else {
            Direction::Neutral
        }
    }
}

// ============================================================
// PARALLEL REPLAY
// ============================================================

use config::StoreConfig;
use patterns::PatternAlert;
use rayon::prelude::*;

/// Result of replaying a single instrument
#[derive(Debug)]
pub struct ReplayResult {
    pub symbol: String,
    pub pivots: Vec<ConfirmedPivot>,
    pub alerts: Vec<PatternAlert>,
}

/// Error from replaying a single instrument
#[derive(Debug)]
pub struct ReplayError {
    pub symbol: String,
    pub error: PivotError,
}

/// Replay the history of several instruments, each through its own store.
pub fn replay_parallel<'a, T, I>(
    config: &StoreConfig,
    instruments: I,
) -> (Vec<ReplayResult>, Vec<ReplayError>)
where
    T: Hlc + Sync + 'a,
    I: IntoParallelIterator<Item = (&'a str, &'a [T])>,
{
    let results: Vec<_> = instruments
        .into_par_iter()
        .map(|(symbol, bars)| {
            replay(config, bars)
                .map(|(pivots, alerts)| ReplayResult {
                    symbol: symbol.to_string(),
                    pivots,
                    alerts,
                })
                .map_err(|error| ReplayError {
                    symbol: symbol.to_string(),
                    error,
                })
        })
        .collect();

    let mut successes = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(r) => successes.push(r),
            Err(e) => errors.push(e),
        }
    }

    (successes, errors)
}

fn replay<T: Hlc>(
    config: &StoreConfig,
    bars: &[T],
) -> Result<(Vec<ConfirmedPivot>, Vec<PatternAlert>)> {
    let mut store = PivotStore::new(config.clone())?;
    let mut alerts = Vec::new();
    for bar in bars {
        if let Some(alert) = store.record(bar)?.alert {
            alerts.push(alert);
        }
    }
    Ok((store.all_pivots(), alerts))
}

// ============================================================
// TESTS
// ============================================================
