//! Binary search traces.
//!
//! Both variants record one [`Step`] per probe and stop on the first match.
//! An unsuccessful search ends with a single `Miss` step whose bounds have
//! crossed (`low > high`) and whose `value` is `None`.

use std::cmp::Ordering;
use std::ops::Index;

use crate::target::Target;

/// Which way the search went after a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Direction {
    /// Probed value was larger than the target; keep the left half.
    Left,
    /// Probed value was smaller than the target; keep the right half.
    Right,
    /// Probed value equals the target.
    Found,
    /// Bounds crossed without a match.
    Miss,
}

impl Direction {
    /// Human-readable label for renderers.
    pub fn label(&self) -> &'static str {
        match self {
            Direction::Left => "Search left half",
            Direction::Right => "Search right half",
            Direction::Found => "Target found",
            Direction::Miss => "Target missing",
        }
    }

    /// Whether this direction ends a trace.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Direction::Found | Direction::Miss)
    }
}

/// Algorithmic formulation of the search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Variant {
    /// A `while low <= high` loop.
    #[default]
    Iterative,
    /// One call per probe on `(low, high, depth)`.
    Recursive,
}

/// One probe of the search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Step {
    pub low: i64,
    pub high: i64,
    pub mid: i64,
    /// Inspected value; `None` only on a terminal miss.
    pub value: Option<i64>,
    pub direction: Direction,
    /// Iteration count or recursion depth, from 0.
    pub depth: u32,
}

/// How a trace ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Outcome {
    /// The search located the target.
    Found,
    /// The search ran out of range.
    Miss,
    /// Nothing was searched (empty sequence).
    Empty,
}

/// Ordered, immutable list of steps for one search run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Trace {
    steps: Vec<Step>,
}

impl Trace {
    /// All steps in probe order.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    /// The terminal step, if any.
    pub fn last(&self) -> Option<&Step> {
        self.steps.last()
    }

    /// Index of the terminal step.
    pub fn last_index(&self) -> Option<usize> {
        self.steps.len().checked_sub(1)
    }

    pub fn outcome(&self) -> Outcome {
        match self.last().map(|s| s.direction) {
            Some(Direction::Found) => Outcome::Found,
            Some(_) => Outcome::Miss,
            None => Outcome::Empty,
        }
    }
}

impl Index<usize> for Trace {
    type Output = Step;

    fn index(&self, index: usize) -> &Step {
        &self.steps[index]
    }
}

/// Build the trace of a binary search for `target` in `values`.
///
/// `values` must be sorted ascending. An empty slice gives an empty trace.
pub fn build_trace(values: &[i64], target: i64, variant: Variant) -> Trace {
    search_trace(values, Target::Whole(target), variant)
}

/// Like [`build_trace`], for any finite key. A non-whole key probes the
/// same bounds a whole key between its neighbours would, and always misses.
pub fn search_trace(values: &[i64], target: Target, variant: Variant) -> Trace {
    if values.is_empty() {
        return Trace::default();
    }

    let high = values.len() as i64 - 1;
    let mut steps = Vec::new();
    match variant {
        Variant::Iterative => iterative(values, target, high, &mut steps),
        Variant::Recursive => recursive(values, target, 0, high, 0, &mut steps),
    }
    Trace { steps }
}

#[inline]
fn midpoint(low: i64, high: i64) -> i64 {
    (low + high).div_euclid(2)
}

/// Probe `mid` and classify the comparison.
fn probe(values: &[i64], target: Target, low: i64, high: i64, depth: u32) -> Step {
    let mid = midpoint(low, high);
    let value = values[mid as usize];
    let direction = match target.compare(value) {
        Ordering::Equal => Direction::Found,
        Ordering::Greater => Direction::Left,
        Ordering::Less => Direction::Right,
    };
    Step {
        low,
        high,
        mid,
        value: Some(value),
        direction,
        depth,
    }
}

fn miss(low: i64, high: i64, depth: u32) -> Step {
    Step {
        low,
        high,
        mid: midpoint(low, high),
        value: None,
        direction: Direction::Miss,
        depth,
    }
}

fn iterative(values: &[i64], target: Target, high: i64, steps: &mut Vec<Step>) {
    let mut low = 0;
    let mut high = high;
    let mut depth = 0;

    while low <= high {
        let step = probe(values, target, low, high, depth);
        steps.push(step);
        match step.direction {
            Direction::Left => high = step.mid - 1,
            Direction::Right => low = step.mid + 1,
            Direction::Found | Direction::Miss => return,
        }
        depth += 1;
    }

    steps.push(miss(low, high, depth));
}

fn recursive(
    values: &[i64],
    target: Target,
    low: i64,
    high: i64,
    depth: u32,
    steps: &mut Vec<Step>,
) {
    if low > high {
        steps.push(miss(low, high, depth));
        return;
    }

    let step = probe(values, target, low, high, depth);
    steps.push(step);
    match step.direction {
        Direction::Left => recursive(values, target, low, step.mid - 1, depth + 1, steps),
        Direction::Right => recursive(values, target, step.mid + 1, high, depth + 1, steps),
        Direction::Found | Direction::Miss => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: [i64; 5] = [2, 5, 9, 14, 20];

    fn tuple(s: &Step) -> (i64, i64, i64, Option<i64>, Direction, u32) {
        (s.low, s.high, s.mid, s.value, s.direction, s.depth)
    }

    #[test]
    fn empty_sequence_gives_empty_trace() {
        for variant in [Variant::Iterative, Variant::Recursive] {
            let trace = build_trace(&[], 3, variant);
            assert!(trace.is_empty());
            assert_eq!(trace.outcome(), Outcome::Empty);
        }
    }

    #[test]
    fn finds_fourteen_in_two_steps() {
        let trace = build_trace(&SAMPLE, 14, Variant::Iterative);
        assert_eq!(trace.len(), 2);
        assert_eq!(tuple(&trace[0]), (0, 4, 2, Some(9), Direction::Right, 0));
        assert_eq!(tuple(&trace[1]), (3, 4, 3, Some(14), Direction::Found, 1));
        assert_eq!(trace.outcome(), Outcome::Found);
    }

    #[test]
    fn target_above_max_misses() {
        let trace = build_trace(&SAMPLE, 99, Variant::Iterative);
        let last = trace.last().unwrap();
        assert_eq!(last.direction, Direction::Miss);
        assert_eq!(last.value, None);
        assert!(last.low > last.high);
        assert_eq!((last.low, last.high), (5, 4));
        assert_eq!(trace.outcome(), Outcome::Miss);
    }

    #[test]
    fn target_below_min_misses_with_negative_high() {
        let trace = build_trace(&SAMPLE, -1, Variant::Recursive);
        let last = trace.last().unwrap();
        assert_eq!(last.direction, Direction::Miss);
        assert_eq!((last.low, last.high, last.mid), (0, -1, -1));
        assert_eq!(last.value, None);
    }

    #[test]
    fn single_element_hit() {
        let trace = build_trace(&[7], 7, Variant::Recursive);
        assert_eq!(trace.len(), 1);
        assert_eq!(trace[0].direction, Direction::Found);
    }

    #[test]
    fn single_element_miss() {
        let trace = build_trace(&[7], 8, Variant::Iterative);
        assert_eq!(trace.len(), 2);
        assert_eq!(trace[0].direction, Direction::Right);
        assert_eq!(tuple(&trace[1]), (1, 0, 0, None, Direction::Miss, 1));
    }

    #[test]
    fn variants_agree_on_every_target() {
        for target in -2..25 {
            assert_eq!(
                build_trace(&SAMPLE, target, Variant::Iterative),
                build_trace(&SAMPLE, target, Variant::Recursive),
                "target {target}"
            );
        }
    }

    #[test]
    fn nothing_follows_a_terminal_step() {
        for target in -2..25 {
            let trace = build_trace(&SAMPLE, target, Variant::Recursive);
            let terminal = trace
                .steps()
                .iter()
                .position(|s| s.direction.is_terminal())
                .unwrap();
            assert_eq!(terminal, trace.len() - 1);
        }
    }

    #[test]
    fn fractional_target_misses_between_neighbours() {
        for variant in [Variant::Iterative, Variant::Recursive] {
            let trace = search_trace(&SAMPLE, Target::Real(14.5), variant);
            let directions: Vec<Direction> = trace.steps().iter().map(|s| s.direction).collect();
            assert_eq!(
                directions,
                vec![Direction::Right, Direction::Right, Direction::Left, Direction::Miss]
            );
            assert_eq!(tuple(&trace[3]), (4, 3, 3, None, Direction::Miss, 3));
            // Same probes as the absent whole key just above it.
            assert_eq!(trace, build_trace(&SAMPLE, 15, variant));
        }
    }

    #[test]
    fn depth_counts_from_zero() {
        let trace = build_trace(&SAMPLE, 20, Variant::Recursive);
        let depths: Vec<u32> = trace.steps().iter().map(|s| s.depth).collect();
        assert_eq!(depths, vec![0, 1, 2]);
    }

    #[test]
    fn labels() {
        assert_eq!(Direction::Left.label(), "Search left half");
        assert_eq!(Direction::Miss.label(), "Target missing");
    }
}
