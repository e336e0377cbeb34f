//! Classification policy for pivot candidates
//!
//! Two decisions live here:
//!
//! - **Significance**: whether a raw high/low is far enough (in price and in
//!   candles) from the last confirmed pivot to be worth tracking.
//! - **Labelling**: which of HH/HL/LH/LL a confirmed extreme receives, given
//!   the prices of the pivots confirmed before it.
//!
//! With fewer than `window` prior pivots the label compares against the last
//! pivot only. Once the window is full, the local trend sign and the shape of
//! the window (a middle peak or trough) decide, and extremes that go against
//! the trend must clear an averaging check or they get no label at all.

use crate::{PivotKind, PivotType};

// ============================================================
// SIGNIFICANCE
// ============================================================

/// `|price - reference| / reference`
#[inline]
pub fn relative_change(price: f64, reference: f64) -> f64 {
    if reference <= 0.0 {
        return f64::INFINITY;
    }
    (price - reference).abs() / reference
}

/// Whether an extreme is far enough from the last pivot to open a candidate.
/// Both the relative move and the elapsed candle count must strictly exceed
/// their thresholds.
#[inline]
pub fn is_significant(
    price: f64,
    last_pivot_price: f64,
    elapsed_candles: usize,
    min_change: f64,
    min_spacing: usize,
) -> bool {
    relative_change(price, last_pivot_price) > min_change && elapsed_candles > min_spacing
}

// ============================================================
// TREND
// ============================================================

/// +1 when pairwise increases outnumber decreases, -1 for the reverse, 0 on a tie.
pub fn trend_sign(prices: &[f64]) -> i8 {
    let (up, down) = prices.windows(2).fold((0usize, 0usize), |(up, down), w| {
        if w[1] > w[0] {
            (up + 1, down)
        } else if w[1] < w[0] {
            (up, down + 1)
        } else {
            (up, down)
        }
    });
    match up.cmp(&down) {
        std::cmp::Ordering::Greater => 1,
        std::cmp::Ordering::Less => -1,
        std::cmp::Ordering::Equal => 0,
    }
}

// ============================================================
// CLASSIFIER
// ============================================================

/// Assigns a structural label to a candidate extreme
pub trait PivotClassifier: Send + Sync {
    /// `prior` holds the prices of all confirmed pivots in time order.
    /// `None` means the candidate cannot be labelled and is dropped.
    fn label(&self, kind: PivotKind, price: f64, prior: &[f64], window: usize) -> Option<PivotType>;
}

/// Default policy: bootstrap rule on sparse history, trend and local
/// structure once `window` pivots exist.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructureClassifier;

impl PivotClassifier for StructureClassifier {
    fn label(&self, kind: PivotKind, price: f64, prior: &[f64], window: usize) -> Option<PivotType> {
        if window < 3 || prior.len() < window {
            return Some(bootstrap_label(kind, price, prior.last().copied()));
        }
        let recent = &prior[prior.len() - window..];
        structural_label(kind, price, recent)
    }
}

/// Two-point rule. With no reference at all the first high is HH and the
/// first low is LL.
pub fn bootstrap_label(kind: PivotKind, price: f64, last: Option<f64>) -> PivotType {
    match (kind, last) {
        (PivotKind::High, None) => PivotType::HH,
        (PivotKind::Low, None) => PivotType::LL,
        (PivotKind::High, Some(last)) if price > last => PivotType::HH,
        (PivotKind::High, Some(_)) => PivotType::LH,
        (PivotKind::Low, Some(last)) if price < last => PivotType::LL,
        (PivotKind::Low, Some(_)) => PivotType::HL,
    }
}

/// Trend-aware rule over a full window. `None` for fewer than three prices,
/// which leave no middle pivot with two neighbours.
pub fn structural_label(kind: PivotKind, price: f64, recent: &[f64]) -> Option<PivotType> {
    if recent.len() < 3 {
        return None;
    }
    let max = recent.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = recent.iter().copied().fold(f64::INFINITY, f64::min);
    let mid = recent.len() / 2;
    let (before, middle, after) = (recent[mid - 1], recent[mid], recent[mid + 1]);
    let trend = trend_sign(recent);

    match kind {
        PivotKind::High if trend > 0 => {
            let middle_peak = middle > before && middle > after;
            if price > max || (middle_peak && price > middle) {
                Some(PivotType::HH)
            } else {
                Some(PivotType::LH)
            }
        }
        PivotKind::High => {
            if price < min {
                return Some(PivotType::LH);
            }
            let above = mean(recent.iter().copied().filter(|&p| p > price))?;
            (price < above).then_some(PivotType::LH)
        }
        PivotKind::Low if trend < 0 => {
            let middle_trough = middle < before && middle < after;
            if price < min || (middle_trough && price < middle) {
                Some(PivotType::LL)
            } else {
                Some(PivotType::HL)
            }
        }
        PivotKind::Low => {
            if price > max {
                return Some(PivotType::HL);
            }
            let below = mean(recent.iter().copied().filter(|&p| p < price))?;
            (price > below).then_some(PivotType::HL)
        }
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    const UP: [f64; 5] = [100.0, 102.0, 101.0, 104.0, 106.0];
    const DOWN: [f64; 5] = [106.0, 104.0, 105.0, 102.0, 100.0];

    #[test]
    fn test_relative_change() {
        assert!((relative_change(101.0, 100.0) - 0.01).abs() < 1e-12);
        assert!((relative_change(99.0, 100.0) - 0.01).abs() < 1e-12);
        assert!(relative_change(1.0, 0.0).is_infinite());
    }

    #[test]
    fn test_significance_is_strict() {
        assert!(is_significant(101.0, 100.0, 3, 0.004, 2));
        // spacing must be exceeded, not met
        assert!(!is_significant(101.0, 100.0, 2, 0.004, 2));
        // move must be exceeded, not met
        assert!(!is_significant(100.4, 100.0, 5, 0.01, 2));
        assert!(!is_significant(100.2, 100.0, 5, 0.004, 2));
    }

    #[test]
    fn test_trend_sign() {
        assert_eq!(trend_sign(&UP), 1);
        assert_eq!(trend_sign(&DOWN), -1);
        assert_eq!(trend_sign(&[100.0, 101.0, 100.0, 101.0, 100.0]), 0);
        assert_eq!(trend_sign(&[100.0, 100.0, 100.0]), 0);
        assert_eq!(trend_sign(&[]), 0);
    }

    #[test]
    fn test_bootstrap_without_reference() {
        assert_eq!(bootstrap_label(PivotKind::High, 100.0, None), PivotType::HH);
        assert_eq!(bootstrap_label(PivotKind::Low, 100.0, None), PivotType::LL);
    }

    #[test]
    fn test_bootstrap_two_point() {
        assert_eq!(bootstrap_label(PivotKind::High, 101.0, Some(100.0)), PivotType::HH);
        assert_eq!(bootstrap_label(PivotKind::High, 100.0, Some(100.0)), PivotType::LH);
        assert_eq!(bootstrap_label(PivotKind::Low, 99.0, Some(100.0)), PivotType::LL);
        assert_eq!(bootstrap_label(PivotKind::Low, 100.0, Some(100.0)), PivotType::HL);
    }

    #[test]
    fn test_sparse_history_uses_bootstrap() {
        let c = StructureClassifier;
        let prior = [100.0, 104.0, 101.0, 105.0];
        assert_eq!(c.label(PivotKind::High, 106.0, &prior, 5), Some(PivotType::HH));
        assert_eq!(c.label(PivotKind::High, 104.0, &prior, 5), Some(PivotType::LH));
        assert_eq!(c.label(PivotKind::Low, 99.0, &[], 5), Some(PivotType::LL));
    }

    #[test]
    fn test_uptrend_high() {
        // new max
        assert_eq!(structural_label(PivotKind::High, 107.0, &UP), Some(PivotType::HH));
        // below max, middle (101) is not a peak
        assert_eq!(structural_label(PivotKind::High, 105.0, &UP), Some(PivotType::LH));

        // middle 104 is a local peak; 104.5 clears it
        let peaked = [100.0, 101.0, 104.0, 102.0, 106.0];
        assert_eq!(trend_sign(&peaked), 1);
        assert_eq!(structural_label(PivotKind::High, 104.5, &peaked), Some(PivotType::HH));
        assert_eq!(structural_label(PivotKind::High, 103.0, &peaked), Some(PivotType::LH));
    }

    #[test]
    fn test_non_uptrend_high() {
        // below every prior pivot
        assert_eq!(structural_label(PivotKind::High, 99.0, &DOWN), Some(PivotType::LH));
        // inside the range: prices above exist, so it verifies
        assert_eq!(structural_label(PivotKind::High, 103.0, &DOWN), Some(PivotType::LH));
        // above everything in a downtrend: nothing to compare against
        assert_eq!(structural_label(PivotKind::High, 110.0, &DOWN), None);
    }

    #[test]
    fn test_downtrend_low() {
        assert_eq!(structural_label(PivotKind::Low, 99.0, &DOWN), Some(PivotType::LL));
        assert_eq!(structural_label(PivotKind::Low, 101.0, &DOWN), Some(PivotType::HL));

        let troughed = [106.0, 105.0, 101.0, 103.0, 100.0];
        assert_eq!(trend_sign(&troughed), -1);
        assert_eq!(structural_label(PivotKind::Low, 100.5, &troughed), Some(PivotType::LL));
        assert_eq!(structural_label(PivotKind::Low, 102.0, &troughed), Some(PivotType::HL));
    }

    #[test]
    fn test_non_downtrend_low() {
        assert_eq!(structural_label(PivotKind::Low, 107.0, &UP), Some(PivotType::HL));
        assert_eq!(structural_label(PivotKind::Low, 103.0, &UP), Some(PivotType::HL));
        // below everything in an uptrend
        assert_eq!(structural_label(PivotKind::Low, 95.0, &UP), None);
    }

    #[test]
    fn test_flat_window_is_non_trending() {
        let flat = [100.0; 5];
        assert_eq!(trend_sign(&flat), 0);
        // equal prices are not strictly above or below
        assert_eq!(structural_label(PivotKind::High, 100.0, &flat), None);
        assert_eq!(structural_label(PivotKind::Low, 100.0, &flat), None);
        assert_eq!(structural_label(PivotKind::High, 99.0, &flat), Some(PivotType::LH));
        assert_eq!(structural_label(PivotKind::Low, 101.0, &flat), Some(PivotType::HL));
    }

    #[test]
    fn test_short_window_has_no_structural_label() {
        assert_eq!(structural_label(PivotKind::High, 105.0, &[]), None);
        assert_eq!(structural_label(PivotKind::Low, 95.0, &[100.0]), None);
        assert_eq!(structural_label(PivotKind::High, 105.0, &[100.0, 102.0]), None);
        assert!(structural_label(PivotKind::High, 105.0, &[100.0, 102.0, 101.0]).is_some());
    }

    #[test]
    fn test_label_uses_latest_window() {
        let c = StructureClassifier;
        let mut prior = vec![500.0, 1.0];
        prior.extend_from_slice(&UP);
        assert_eq!(c.label(PivotKind::High, 107.0, &prior, 5), Some(PivotType::HH));
    }
}
