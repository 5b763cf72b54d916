//! Seeded pseudo-random stream.
//!
//! A 32-bit mulberry stream: tiny state, good enough mixing for picking
//! jitter and loop targets, and bit-for-bit reproducible from its seed.

/// Weyl increment added to the state on every draw.
const INCREMENT: u32 = 0x6d2b_79f5;

/// Deterministic random stream. Same seed, same stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeededRng {
    state: u32,
}

impl SeededRng {
    /// Create a stream from a seed.
    pub fn new(seed: u32) -> Self {
        Self {
            state: seed.wrapping_add(INCREMENT),
        }
    }

    /// Next raw 32-bit output.
    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(INCREMENT);
        let mut x = self.state;
        x = (x ^ (x >> 15)).wrapping_mul(1 | x);
        x ^= x.wrapping_add((x ^ (x >> 7)).wrapping_mul(61 | x));
        x ^ (x >> 14)
    }

    /// Next value in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        f64::from(self.next_u32()) / 4_294_967_296.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_outputs_for_seed_one() {
        let mut rng = SeededRng::new(1);
        assert_eq!(rng.next_u32(), 11_749_833);
        assert_eq!(rng.next_u32(), 2_265_367_787);
        assert_eq!(rng.next_u32(), 4_213_581_821);
    }

    #[test]
    fn same_seed_same_stream() {
        let mut a = SeededRng::new(9473);
        let mut b = SeededRng::new(9473);
        for _ in 0..64 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = SeededRng::new(1);
        let mut b = SeededRng::new(2);
        let same = (0..16).filter(|_| a.next_u32() == b.next_u32()).count();
        assert!(same < 16);
    }

    #[test]
    fn floats_stay_in_unit_interval() {
        let mut rng = SeededRng::new(42);
        for _ in 0..1000 {
            let v = rng.next_f64();
            assert!((0.0..1.0).contains(&v));
        }
    }
}
