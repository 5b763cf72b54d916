//! Strictly increasing sequence generation.
//!
//! The walk picks an average stride of `spread / (size + 1)` and adds a
//! seeded jitter of at most 0.8 strides per position. Each position keeps
//! enough headroom for the ones after it. A uniform shift then pulls the
//! whole run back inside `[min, max]` where possible, and a final repair
//! pass restores strict monotonicity.
//!
//! # Invariants
//!
//! 1. `len() == size`
//! 2. `values[i] > values[i - 1]` for every `i > 0`
//! 3. Identical inputs yield identical output
//!
//! The `[min, max]` bound is a soft target: for ranges narrower than `size`
//! the repair pass may push values past `max`.

use std::ops::Deref;

use crate::SeededRng;

/// Largest jitter as a fraction of the average stride.
const JITTER_RATIO: f64 = 0.8;

/// An immutable, strictly increasing run of integers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Sequence(Vec<i64>);

impl Sequence {
    /// Wrap values that are already strictly increasing.
    ///
    /// Returns `None` if any value is not greater than its predecessor.
    pub fn from_sorted(values: Vec<i64>) -> Option<Self> {
        values
            .windows(2)
            .all(|w| w[0] < w[1])
            .then_some(Sequence(values))
    }

    /// The values as a slice.
    #[inline]
    pub fn values(&self) -> &[i64] {
        &self.0
    }
}

impl Deref for Sequence {
    type Target = [i64];

    fn deref(&self) -> &[i64] {
        &self.0
    }
}

impl AsRef<[i64]> for Sequence {
    fn as_ref(&self) -> &[i64] {
        &self.0
    }
}

/// Generate a sorted sequence of `size` distinct values near `[min, max]`.
///
/// A zero seed is treated as 1. The walk runs in `i128`, so extreme bounds
/// cannot overflow; values that would leave the `i64` range are pinned to
/// its edges, keeping count and strict order.
pub fn generate(size: usize, min: i64, max: i64, seed: u32) -> Sequence {
    if size == 0 {
        return Sequence::default();
    }

    let mut rng = SeededRng::new(if seed == 0 { 1 } else { seed });
    let (min, max) = (i128::from(min), i128::from(max));
    let count = size as i128;
    let spread = (max - min).max(count + 4);
    let base_step = (spread / (count + 1)).max(1);

    let mut values: Vec<i128> = Vec::with_capacity(size);
    let mut cursor = min + base_step;

    for index in 0..count {
        let jitter = round_half_up((rng.next_f64() - 0.5) * base_step as f64 * JITTER_RATIO);
        cursor = (cursor + 1).max(cursor + i128::from(jitter) + base_step);

        let remaining = count - index;
        let max_allowed = max - (remaining - 1);
        if cursor > max_allowed {
            cursor = max_allowed;
        }
        if let Some(&prev) = values.last() {
            if cursor <= prev {
                cursor = prev + 1;
            }
        }
        values.push(cursor);
    }

    // Shift back under the ceiling, then above the floor.
    let overflow = values[values.len() - 1] - max;
    if overflow > 0 {
        values.iter_mut().for_each(|v| *v -= overflow);
    }
    let underflow = min - values[0];
    if underflow > 0 {
        values.iter_mut().for_each(|v| *v += underflow);
    }

    for i in 1..values.len() {
        if values[i] <= values[i - 1] {
            values[i] = values[i - 1] + 1;
        }
    }

    Sequence(fit_i64(values))
}

/// Pin a strictly increasing run into `i64`, leaving one slot per element.
/// Identity when the run already fits.
fn fit_i64(values: Vec<i128>) -> Vec<i64> {
    let last = values.len() as i128 - 1;
    values
        .into_iter()
        .enumerate()
        .map(|(i, v)| {
            let i = i as i128;
            let low = i128::from(i64::MIN) + i;
            let high = i128::from(i64::MAX) - (last - i);
            v.clamp(low, high) as i64
        })
        .collect()
}

/// The element a fresh sequence is recentered on: `values[len / 2]`.
pub fn middle(values: &[i64]) -> Option<i64> {
    values.get(values.len() / 2).copied()
}

/// Round to nearest, ties toward positive infinity.
fn round_half_up(x: f64) -> i64 {
    (x + 0.5).floor() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strictly_increasing(values: &[i64]) -> bool {
        values.windows(2).all(|w| w[0] < w[1])
    }

    #[test]
    fn empty_for_zero_size() {
        assert!(generate(0, 2, 90, 9473).is_empty());
    }

    #[test]
    fn default_configuration_is_pinned() {
        let seq = generate(12, 2, 90, 9473);
        assert_eq!(
            seq.values(),
            &[16, 22, 30, 37, 41, 49, 53, 59, 63, 70, 76, 84]
        );
    }

    #[test]
    fn deterministic() {
        assert_eq!(generate(20, -50, 50, 7), generate(20, -50, 50, 7));
    }

    #[test]
    fn seed_zero_matches_seed_one() {
        assert_eq!(generate(10, 0, 100, 0), generate(10, 0, 100, 1));
    }

    #[test]
    fn stays_in_range_when_it_fits() {
        for seed in 0..200 {
            let seq = generate(36, 2, 90, seed);
            assert_eq!(seq.len(), 36);
            assert!(strictly_increasing(&seq));
            assert!(seq[0] >= 2, "seed {seed}: {:?}", seq.values());
            assert!(seq[35] <= 90, "seed {seed}: {:?}", seq.values());
        }
    }

    #[test]
    fn degenerate_range_keeps_count_and_order() {
        let seq = generate(5, 0, 3, 7);
        assert_eq!(seq.values(), &[0, 1, 2, 3, 4]);

        let seq = generate(10, 5, 5, 11);
        assert_eq!(seq.len(), 10);
        assert!(strictly_increasing(&seq));
    }

    #[test]
    fn extreme_bounds_do_not_overflow() {
        let cases = [
            (i64::MIN, 90),
            (2, i64::MAX),
            (i64::MIN, i64::MAX),
            (i64::MAX, i64::MIN),
            (i64::MAX - 1, i64::MAX),
            (i64::MIN, i64::MIN + 2),
        ];
        for (min, max) in cases {
            let seq = generate(12, min, max, 9473);
            assert_eq!(seq.len(), 12, "[{min}, {max}]");
            assert!(strictly_increasing(&seq), "[{min}, {max}]: {:?}", seq.values());
        }
    }

    #[test]
    fn narrow_range_at_the_top_is_pinned_to_max() {
        let seq = generate(3, i64::MAX, i64::MAX, 1);
        assert_eq!(seq.values(), &[i64::MAX - 2, i64::MAX - 1, i64::MAX]);
    }

    #[test]
    fn single_element() {
        let seq = generate(1, 0, 10, 99);
        assert_eq!(seq.len(), 1);
        assert!((0..=10).contains(&seq[0]));
    }

    #[test]
    fn from_sorted_checks_order() {
        assert!(Sequence::from_sorted(vec![2, 5, 9, 14, 20]).is_some());
        assert!(Sequence::from_sorted(vec![]).is_some());
        assert!(Sequence::from_sorted(vec![1, 1]).is_none());
        assert!(Sequence::from_sorted(vec![3, 2]).is_none());
    }

    #[test]
    fn middle_element() {
        assert_eq!(middle(&[1, 2, 3, 4]), Some(3));
        assert_eq!(middle(&[1, 2, 3]), Some(2));
        assert_eq!(middle(&[]), None);
    }

    #[test]
    fn rounding_ties_go_up() {
        assert_eq!(round_half_up(2.5), 3);
        assert_eq!(round_half_up(-2.5), -2);
        assert_eq!(round_half_up(-2.6), -3);
    }
}
