//! Bisect Search
//!
//! Deterministic inputs and traces for binary search playback.
//!
//! # Sequence Generation
//!
//! A sorted sequence is produced from `(size, min, max, seed)` by walking
//! forward with an average stride plus seeded jitter. Width is a soft
//! target: the count and strict monotonicity always hold, even when the
//! range is too narrow to fit every value.
//!
//! # Traces
//!
//! A [`Trace`] is the ordered list of probes a binary search makes for one
//! `(sequence, target, variant)` triple. The iterative and recursive
//! [`Variant`]s are observationally identical: same bounds, same midpoints,
//! same directions, same depths.
//!
//! ```
//! use bisect_search::{build_trace, Direction, Variant};
//!
//! let trace = build_trace(&[2, 5, 9, 14, 20], 14, Variant::Iterative);
//! assert_eq!(trace.len(), 2);
//! assert_eq!(trace.last().map(|s| s.direction), Some(Direction::Found));
//! ```

mod rng;
mod sequence;
mod target;
mod trace;

pub use rng::SeededRng;
pub use sequence::{generate, middle, Sequence};
pub use target::Target;
pub use trace::{build_trace, search_trace, Direction, Outcome, Step, Trace, Variant};
