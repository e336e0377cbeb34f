//! Support and resistance levels from recent price history
//!
//! Classic floor-trader pivot point over a lookback window, with Fibonacci
//! style second levels:
//!
//! ```text
//! PP     = (max high + min low + last close) / 3
//! R1, S1 = 2·PP - min low, 2·PP - max high
//! R2, S2 = PP ± 0.618·range
//! R3, S3 = PP ± range
//! ```
//!
//! A level's strength is the share of closes in the window that landed
//! strictly within 0.1% of it, as a percentage.

use crate::{Hlc, PivotError, PivotKind, Result};

/// Relative distance at which a close counts as touching a level
pub const TOUCH_TOLERANCE: f64 = 0.001;

const FIB_RATIO: f64 = 0.618;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum LevelId {
    R3,
    R2,
    R1,
    PP,
    S1,
    S2,
    S3,
}

impl LevelId {
    /// Pivot side a touch of this level suggests
    pub fn pivot_kind(self) -> Option<PivotKind> {
        match self {
            LevelId::R1 | LevelId::R2 | LevelId::R3 => Some(PivotKind::High),
            LevelId::S1 | LevelId::S2 | LevelId::S3 => Some(PivotKind::Low),
            LevelId::PP => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Level {
    pub id: LevelId,
    pub price: f64,
    /// 0..=100
    pub strength: f64,
}

/// Seven levels ordered from R3 down to S3
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SupportResistance {
    pub levels: [Level; 7],
    pub lookback: usize,
}

impl SupportResistance {
    pub fn get(&self, id: LevelId) -> &Level {
        // levels are stored in LevelId declaration order
        &self.levels[id as usize]
    }

    pub fn pivot_point(&self) -> f64 {
        self.get(LevelId::PP).price
    }

    /// Strongest level within `tolerance` (relative) of `price` whose strength
    /// is at least `min_strength`.
    pub fn touching(&self, price: f64, tolerance: f64, min_strength: f64) -> Option<&Level> {
        self.levels
            .iter()
            .filter(|l| l.strength >= min_strength)
            .filter(|l| l.price > 0.0 && ((price - l.price) / l.price).abs() <= tolerance)
            .max_by(|a, b| a.strength.total_cmp(&b.strength))
    }
}

/// Compute levels over the last `lookback` observations of `history`.
pub fn support_resistance<T: Hlc>(history: &[T], lookback: usize) -> Result<SupportResistance> {
    if lookback == 0 {
        return Err(PivotError::InvalidValue("lookback must be > 0"));
    }
    if history.len() < lookback {
        return Err(PivotError::InsufficientHistory {
            need: lookback,
            got: history.len(),
        });
    }
    let window = &history[history.len() - lookback..];

    let max_high = window.iter().map(Hlc::high).fold(f64::NEG_INFINITY, f64::max);
    let min_low = window.iter().map(Hlc::low).fold(f64::INFINITY, f64::min);
    let last_close = window[lookback - 1].close();
    let range = max_high - min_low;

    let pp = (max_high + min_low + last_close) / 3.0;
    let prices = [
        (LevelId::R3, pp + range),
        (LevelId::R2, pp + FIB_RATIO * range),
        (LevelId::R1, 2.0 * pp - min_low),
        (LevelId::PP, pp),
        (LevelId::S1, 2.0 * pp - max_high),
        (LevelId::S2, pp - FIB_RATIO * range),
        (LevelId::S3, pp - range),
    ];

    let levels = prices.map(|(id, price)| Level {
        id,
        price,
        strength: strength(window, price, lookback),
    });

    Ok(SupportResistance { levels, lookback })
}

fn strength<T: Hlc>(window: &[T], level: f64, lookback: usize) -> f64 {
    if level <= 0.0 {
        return 0.0;
    }
    let touches = window
        .iter()
        .filter(|bar| ((bar.close() - level) / level).abs() < TOUCH_TOLERANCE)
        .count();
    (touches as f64 / lookback as f64 * 100.0).min(100.0)
}
