//! Search keys.

use std::cmp::Ordering;
use std::fmt;

/// 2^63 as a float; the first value above every `i64`.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// A finite search key.
///
/// Whole numbers that fit in an `i64` are `Whole`. Anything else finite
/// (fractional, or beyond the `i64` range) is `Real` and can never equal an
/// element, so searching for it always ends in a miss.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Target {
    Whole(i64),
    Real(f64),
}

impl Target {
    /// Classify a float. `None` for NaN and infinities.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        if value.fract() == 0.0 && (-I64_BOUND..I64_BOUND).contains(&value) {
            Some(Target::Whole(value as i64))
        } else {
            Some(Target::Real(value))
        }
    }

    /// Parse user input: an integer literal, or any finite float.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if let Ok(v) = input.parse::<i64>() {
            return Some(Target::Whole(v));
        }
        input.parse::<f64>().ok().and_then(Self::from_f64)
    }

    /// The whole value, if there is one.
    pub fn as_whole(&self) -> Option<i64> {
        match *self {
            Target::Whole(v) => Some(v),
            Target::Real(_) => None,
        }
    }

    /// How `value` orders against this key.
    pub fn compare(&self, value: i64) -> Ordering {
        match *self {
            Target::Whole(t) => value.cmp(&t),
            Target::Real(t) if t >= I64_BOUND => Ordering::Less,
            Target::Real(t) if t < -I64_BOUND => Ordering::Greater,
            Target::Real(t) => match value.cmp(&(t.floor() as i64)) {
                Ordering::Equal if t.fract() == 0.0 => Ordering::Equal,
                Ordering::Equal => Ordering::Less,
                other => other,
            },
        }
    }
}

impl Default for Target {
    fn default() -> Self {
        Target::Whole(0)
    }
}

impl From<i64> for Target {
    fn from(value: i64) -> Self {
        Target::Whole(value)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Whole(v) => write!(f, "{v}"),
            Target::Real(v) => write!(f, "{v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_finite_numbers() {
        assert_eq!(Target::parse("14"), Some(Target::Whole(14)));
        assert_eq!(Target::parse(" -3 "), Some(Target::Whole(-3)));
        assert_eq!(Target::parse("14.0"), Some(Target::Whole(14)));
        assert_eq!(Target::parse("14.5"), Some(Target::Real(14.5)));
        assert_eq!(Target::parse("1e300"), Some(Target::Real(1e300)));
    }

    #[test]
    fn parse_rejects_non_finite_and_garbage() {
        for input in ["", "abc", "NaN", "inf", "-infinity", "1.2.3"] {
            assert_eq!(Target::parse(input), None, "{input:?}");
        }
    }

    #[test]
    fn fractional_key_sits_between_neighbours() {
        let t = Target::Real(14.5);
        assert_eq!(t.compare(14), Ordering::Less);
        assert_eq!(t.compare(15), Ordering::Greater);

        let t = Target::Real(-2.5);
        assert_eq!(t.compare(-3), Ordering::Less);
        assert_eq!(t.compare(-2), Ordering::Greater);
    }

    #[test]
    fn out_of_range_keys_bound_everything() {
        assert_eq!(Target::Real(1e300).compare(i64::MAX), Ordering::Less);
        assert_eq!(Target::Real(-1e300).compare(i64::MIN), Ordering::Greater);
    }

    #[test]
    fn whole_compares_exactly() {
        assert_eq!(Target::Whole(9).compare(9), Ordering::Equal);
        assert_eq!(Target::Whole(9).compare(8), Ordering::Less);
        assert_eq!(Target::Whole(9).as_whole(), Some(9));
        assert_eq!(Target::Real(9.5).as_whole(), None);
        assert_eq!(Target::Real(2.25).to_string(), "2.25");
    }
}
