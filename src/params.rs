//! Parameter metadata for the store tunables
//!
//! Every field of [`StoreConfig`] is described by a [`ParamMeta`] so hosts can
//! enumerate tunables, document them, and run grid searches over detection
//! sensitivity.
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use swingpivot::params::Parameterized;
//! use swingpivot::prelude::*;
//!
//! for param in StoreConfig::param_meta() {
//!     println!("{}: {:?} (default: {})", param.name, param.param_type, param.default);
//! }
//!
//! let mut overrides = HashMap::new();
//! overrides.insert("min_pivot_spacing", 4.0);
//! let config = StoreConfig::with_params(&overrides).unwrap();
//! assert_eq!(config.min_pivot_spacing, 4);
//! ```

use std::collections::HashMap;

use crate::config::StoreConfig;
use crate::{PivotError, Period, Ratio, Result};

// ============================================================
// PARAMETER TYPES
// ============================================================

/// Type of parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// Fraction in 0.0..=1.0
    Ratio,
    /// Positive integer
    Period,
    /// Non-negative integer
    Count,
    /// Positive finite price
    Price,
}

/// Metadata for a single tunable
#[derive(Debug, Clone)]
pub struct ParamMeta {
    /// Field name in [`StoreConfig`]
    pub name: &'static str,
    pub param_type: ParamType,
    pub default: f64,
    /// Range for optimization: (min, max, step)
    pub range: (f64, f64, f64),
    pub description: &'static str,
}

impl ParamMeta {
    pub const fn ratio(
        name: &'static str,
        default: f64,
        range: (f64, f64, f64),
        description: &'static str,
    ) -> Self {
        Self {
            name,
            param_type: ParamType::Ratio,
            default,
            range,
            description,
        }
    }

    pub const fn period(
        name: &'static str,
        default: f64,
        range: (f64, f64, f64),
        description: &'static str,
    ) -> Self {
        Self {
            name,
            param_type: ParamType::Period,
            default,
            range,
            description,
        }
    }

    pub const fn count(
        name: &'static str,
        default: f64,
        range: (f64, f64, f64),
        description: &'static str,
    ) -> Self {
        Self {
            name,
            param_type: ParamType::Count,
            default,
            range,
            description,
        }
    }

    pub const fn price(
        name: &'static str,
        default: f64,
        range: (f64, f64, f64),
        description: &'static str,
    ) -> Self {
        Self {
            name,
            param_type: ParamType::Price,
            default,
            range,
            description,
        }
    }

    /// All values for grid search, `min` to `max` inclusive
    pub fn generate_grid(&self) -> Vec<f64> {
        let (min, max, step) = self.range;
        if step <= 0.0 {
            return vec![min];
        }
        let mut values = Vec::new();
        let mut i = 0u32;
        loop {
            let v = min + step * f64::from(i);
            if v > max + step * 1e-9 {
                break;
            }
            values.push(v);
            i += 1;
        }
        values
    }

    /// Check a value against the optimization range and the parameter type
    pub fn validate(&self, value: f64) -> Result<()> {
        let (min, max, _) = self.range;
        if value.is_nan() || value < min || value > max {
            return Err(PivotError::OutOfRange {
                field: self.name,
                value,
                min,
                max,
            });
        }
        match self.param_type {
            ParamType::Ratio | ParamType::Price => Ok(()),
            ParamType::Period if value < 1.0 || value.fract() != 0.0 => {
                Err(PivotError::InvalidValue("Period must be a positive integer"))
            }
            ParamType::Count if value < 0.0 || value.fract() != 0.0 => {
                Err(PivotError::InvalidValue("Count must be a non-negative integer"))
            }
            ParamType::Period | ParamType::Count => Ok(()),
        }
    }
}

// ============================================================
// PARAMETERIZED TRAIT
// ============================================================

/// Types that can be built from a sparse parameter map
pub trait Parameterized: Sized {
    fn param_meta() -> &'static [ParamMeta];

    /// Missing keys take their defaults. Unknown keys are rejected.
    fn with_params(params: &HashMap<&str, f64>) -> Result<Self>;
}

const STORE_PARAMS: &[ParamMeta] = &[
    ParamMeta::ratio(
        "min_price_change",
        0.004,
        (0.001, 0.02, 0.001),
        "Minimum relative move from the last pivot",
    ),
    ParamMeta::count(
        "min_pivot_spacing",
        2.0,
        (0.0, 10.0, 1.0),
        "Candles required after the last pivot",
    ),
    ParamMeta::period(
        "confirmation_window",
        3.0,
        (1.0, 10.0, 1.0),
        "Non-improving candles needed to confirm",
    ),
    ParamMeta::period(
        "trend_window",
        5.0,
        (3.0, 11.0, 2.0),
        "Prior pivots used for trend-aware labels",
    ),
    ParamMeta::count(
        "extreme_lookback",
        0.0,
        (0.0, 6.0, 1.0),
        "Candles a high/low must beat, 0 for none",
    ),
    ParamMeta::period(
        "history_capacity",
        100.0,
        (10.0, 1000.0, 10.0),
        "Observations kept in history",
    ),
    ParamMeta::period(
        "max_pending",
        8.0,
        (1.0, 32.0, 1.0),
        "Concurrent pending candidates",
    ),
    ParamMeta::period(
        "max_stored_pivots",
        50.0,
        (5.0, 500.0, 5.0),
        "System pivots retained",
    ),
    ParamMeta::period(
        "max_operator_pivots",
        100.0,
        (5.0, 500.0, 5.0),
        "Operator pivots retained",
    ),
    ParamMeta::period(
        "interval_minutes",
        30.0,
        (1.0, 720.0, 1.0),
        "Observation grid in minutes",
    ),
    ParamMeta::price(
        "max_operator_price",
        500_000.0,
        (1.0, 10_000_000.0, 1000.0),
        "Upper bound on operator prices",
    ),
];

impl Parameterized for StoreConfig {
    fn param_meta() -> &'static [ParamMeta] {
        STORE_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        if let Some(unknown) = params
            .keys()
            .find(|key| !STORE_PARAMS.iter().any(|m| m.name == **key))
        {
            return Err(PivotError::InvalidConfig(format!("unknown parameter {unknown:?}")));
        }

        let defaults = StoreConfig::default();
        let config = StoreConfig {
            min_price_change: get_ratio(params, "min_price_change", defaults.min_price_change.get())?,
            min_pivot_spacing: get_count(params, "min_pivot_spacing", defaults.min_pivot_spacing)?,
            confirmation_window: get_period(
                params,
                "confirmation_window",
                defaults.confirmation_window.get(),
            )?,
            trend_window: get_period(params, "trend_window", defaults.trend_window.get())?,
            extreme_lookback: get_count(params, "extreme_lookback", defaults.extreme_lookback)?,
            history_capacity: get_period(params, "history_capacity", defaults.history_capacity.get())?,
            max_pending: get_period(params, "max_pending", defaults.max_pending.get())?,
            max_stored_pivots: get_period(
                params,
                "max_stored_pivots",
                defaults.max_stored_pivots.get(),
            )?,
            max_operator_pivots: get_period(
                params,
                "max_operator_pivots",
                defaults.max_operator_pivots.get(),
            )?,
            interval_minutes: get_period(params, "interval_minutes", defaults.interval_minutes.get())?,
            max_operator_price: params
                .get("max_operator_price")
                .copied()
                .unwrap_or(defaults.max_operator_price),
        };
        config.validate()?;
        Ok(config)
    }
}

// ============================================================
// PARAMETER VALUE HELPERS
// ============================================================

/// Ratio from params with default fallback
pub fn get_ratio(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<Ratio> {
    let value = params.get(key).copied().unwrap_or(default);
    Ratio::new(value)
}

/// Period from params with default fallback
pub fn get_period(params: &HashMap<&str, f64>, key: &str, default: usize) -> Result<Period> {
    match params.get(key) {
        Some(&value) => Period::new(whole(key, value)?),
        None => Period::new(default),
    }
}

/// Non-negative count from params with default fallback
pub fn get_count(params: &HashMap<&str, f64>, key: &str, default: usize) -> Result<usize> {
    params.get(key).map_or(Ok(default), |&value| whole(key, value))
}

fn whole(key: &str, value: f64) -> Result<usize> {
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 {
        return Err(PivotError::InvalidConfig(format!(
            "{key} must be a non-negative integer, got {value}"
        )));
    }
    Ok(value as usize)
}

// ============================================================
// TESTS
// ============================================================
