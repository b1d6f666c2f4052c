//! Seeded randomness for game rounds and fault injection.
//!
//! The games and the chaos transport both need randomness that can be pinned
//! to a seed, so that a test can replay the exact same round or the exact
//! same fault pattern. A self-contained PCG32 (the XSH-RR variant, 64 bits
//! of state, 32-bit output, period 2^64) covers that without a `rand`
//! dependency. See <https://www.pcg-random.org/> for the family.
//!
//! ```rust
//! use arcade_hub::rng::Pcg32;
//!
//! let mut rng = Pcg32::seed_from_u64(12345);
//! let roll = rng.gen_range(0..100);
//! assert!(roll < 100);
//! ```

use tracing::warn;

/// The LCG multiplier for 64-bit PCG state, from the reference
/// implementation.
const PCG_MULTIPLIER: u64 = 6364136223846793005;

/// The reference single-stream increment.
const PCG_DEFAULT_INCREMENT: u64 = 1442695040888963407;

/// A PCG32 generator.
///
/// Statistically solid and fast, and deliberately not cryptographic: its
/// job is replayable game rounds, not secrets. Cloning captures the stream
/// position, so a clone continues exactly where its source was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pcg32 {
    state: u64,
    inc: u64,
}

impl Pcg32 {
    /// Creates a generator on a chosen stream.
    ///
    /// The stream value selects one of the generator's independent
    /// sequences; the required odd increment is derived from it here.
    #[must_use]
    pub const fn new(state: u64, stream: u64) -> Self {
        let inc = (stream << 1) | 1;
        // Reference seeding: step from zero, fold in the seed, step again.
        let mut g = Self { state: 0, inc };
        g.state = g.state.wrapping_mul(PCG_MULTIPLIER).wrapping_add(g.inc);
        g.state = g.state.wrapping_add(state);
        g.state = g.state.wrapping_mul(PCG_MULTIPLIER).wrapping_add(g.inc);
        g
    }

    /// Creates a generator from a single seed on the default stream.
    ///
    /// This is the constructor tests reach for; one seed pins the whole
    /// sequence.
    #[must_use]
    pub const fn seed_from_u64(seed: u64) -> Self {
        Self::new(seed, PCG_DEFAULT_INCREMENT)
    }

    /// Creates a generator seeded from system entropy.
    ///
    /// Intentionally non-deterministic; the game constructors use this by
    /// default. Replayable behavior wants [`Pcg32::seed_from_u64`] instead.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self::seed_from_u64(entropy_seed())
    }

    /// Advances the state and returns the next 32-bit draw.
    #[inline]
    #[must_use]
    pub fn next_u32(&mut self) -> u32 {
        let prev = self.state;
        self.state = prev.wrapping_mul(PCG_MULTIPLIER).wrapping_add(self.inc);
        // XSH-RR output permutation.
        let xorshifted = (((prev >> 18) ^ prev) >> 27) as u32;
        let rot = (prev >> 59) as u32;
        xorshifted.rotate_right(rot)
    }

    /// Returns the next 64-bit draw, high word first.
    #[inline]
    #[must_use]
    pub fn next_u64(&mut self) -> u64 {
        let high = u64::from(self.next_u32());
        (high << 32) | u64::from(self.next_u32())
    }

    /// Draws a `u32` uniformly from `[start, end)`.
    ///
    /// An empty range is a caller bug; it is logged and answered with
    /// `range.start` rather than a panic mid-round.
    pub fn gen_range(&mut self, range: std::ops::Range<u32>) -> u32 {
        let span = range.end.wrapping_sub(range.start);
        if span == 0 {
            warn!(
                start = range.start,
                end = range.end,
                "gen_range called with empty range"
            );
            return range.start;
        }
        range.start.wrapping_add(self.draw_below(span))
    }

    /// Draws a `usize` uniformly from `[start, end)`.
    ///
    /// Empty ranges behave as in [`gen_range`](Self::gen_range).
    pub fn gen_range_usize(&mut self, range: std::ops::Range<usize>) -> usize {
        let span = range.end.wrapping_sub(range.start);
        if span == 0 {
            warn!(
                start = range.start,
                end = range.end,
                "gen_range_usize called with empty range"
            );
            return range.start;
        }
        let offset = match u32::try_from(span) {
            Ok(span32) => self.draw_below(span32) as usize,
            Err(_) => self.draw_below_u64(span as u64) as usize,
        };
        range.start.wrapping_add(offset)
    }

    /// Draws `true` with the given probability, clamped to `[0.0, 1.0]`.
    pub fn gen_bool(&mut self, probability: f64) -> bool {
        let p = probability.clamp(0.0, 1.0);
        let threshold = (p * f64::from(u32::MAX)) as u32;
        self.next_u32() < threshold
    }

    /// Uniform draw in `[0, span)` by rejection, so no modulo bias.
    fn draw_below(&mut self, span: u32) -> u32 {
        let threshold = span.wrapping_neg() % span;
        loop {
            let draw = self.next_u32();
            if draw >= threshold {
                return draw % span;
            }
        }
    }

    /// 64-bit variant of [`draw_below`](Self::draw_below) for spans past
    /// `u32::MAX`.
    fn draw_below_u64(&mut self, span: u64) -> u64 {
        let threshold = span.wrapping_neg() % span;
        loop {
            let draw = self.next_u64();
            if draw >= threshold {
                return draw % span;
            }
        }
    }
}

/// Derives a seed for [`Pcg32::from_entropy`].
///
/// Mixes the wall clock with a per-process randomized hash of the current
/// thread id. Not cryptographically secure, but more than enough to keep two
/// freshly started games from playing the same round.
fn entropy_seed() -> u64 {
    use std::hash::{BuildHasher, Hash, Hasher};

    let clock = web_time::SystemTime::now()
        .duration_since(web_time::UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_nanos() as u64);

    // RandomState is seeded randomly per process, which covers the case of
    // two processes starting within the same clock tick.
    let mut hasher = std::collections::hash_map::RandomState::new().build_hasher();
    std::thread::current().id().hash(&mut hasher);
    clock.hash(&mut hasher);

    hasher.finish().wrapping_add(0x9e3779b97f4a7c15)
}

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    fn draws(rng: &mut Pcg32, count: usize) -> Vec<u32> {
        (0..count).map(|_| rng.next_u32()).collect()
    }

    #[test]
    fn same_seed_replays_the_sequence() {
        let mut a = Pcg32::seed_from_u64(12345);
        let mut b = Pcg32::seed_from_u64(12345);
        assert_eq!(draws(&mut a, 1000), draws(&mut b, 1000));
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = Pcg32::seed_from_u64(12345);
        let mut b = Pcg32::seed_from_u64(54321);
        assert_ne!(draws(&mut a, 8), draws(&mut b, 8));
    }

    // Pins the output for seed 0. If this changes, every seeded game round
    // replays differently after an upgrade.
    #[test]
    fn seed_zero_keeps_its_sequence() {
        let mut rng = Pcg32::seed_from_u64(0);
        assert_eq!(
            draws(&mut rng, 5),
            vec![0x348a_463f, 0x4f20_5a1b, 0x2946_c488, 0x805e_36de, 0x79f9_94a9]
        );
    }

    #[test]
    fn output_spreads_across_the_high_nibble() {
        let mut rng = Pcg32::seed_from_u64(42);
        let mut buckets = [0_u32; 16];
        for _ in 0..16_000 {
            buckets[(rng.next_u32() >> 28) as usize] += 1;
        }
        // Expected 1000 per bucket; wide bands keep this stable.
        for &count in &buckets {
            assert!((500..1500).contains(&count), "skewed bucket: {count}");
        }
    }

    #[test]
    fn gen_range_stays_within_bounds() {
        let mut rng = Pcg32::seed_from_u64(42);
        for _ in 0..1000 {
            assert!((10..20).contains(&rng.gen_range(10..20)));
            assert!((3..9).contains(&rng.gen_range_usize(3..9)));
        }
    }

    #[test]
    fn single_value_spans_always_yield_that_value() {
        let mut rng = Pcg32::seed_from_u64(42);
        for _ in 0..100 {
            assert_eq!(rng.gen_range(42..43), 42);
        }
    }

    #[test]
    fn empty_spans_fall_back_to_the_start() {
        let mut rng = Pcg32::seed_from_u64(42);
        assert_eq!(rng.gen_range(100..100), 100);
        assert_eq!(rng.gen_range(0..0), 0);
        assert_eq!(rng.gen_range_usize(500..500), 500);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn usize_spans_past_u32_take_the_wide_path() {
        let mut rng = Pcg32::seed_from_u64(42);
        let start = (u32::MAX as usize) + 1000;
        for _ in 0..100 {
            let drawn = rng.gen_range_usize(start..start + 1000);
            assert!((start..start + 1000).contains(&drawn));
        }
    }

    #[test]
    fn gen_bool_honors_the_edges_and_the_midpoint() {
        let mut rng = Pcg32::seed_from_u64(42);
        for _ in 0..100 {
            assert!(!rng.gen_bool(0.0));
            assert!(rng.gen_bool(1.0));
        }

        let heads = (0..10_000).filter(|_| rng.gen_bool(0.5)).count();
        assert!((4500..5500).contains(&heads), "lopsided coin: {heads}");
    }

    #[test]
    fn next_u64_fills_the_high_word() {
        let mut rng = Pcg32::seed_from_u64(42);
        let wide = (0..1000).any(|_| rng.next_u64() > u64::from(u32::MAX));
        assert!(wide, "no draw ever exceeded 32 bits");
    }

    #[test]
    fn from_entropy_produces_a_working_generator() {
        let mut rng = Pcg32::from_entropy();
        let _ = rng.next_u32();
    }
}

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Seeded replays are the whole point of this module: any seed must
        /// reproduce its sequence exactly.
        #[test]
        fn prop_any_seed_replays_exactly(seed in any::<u64>()) {
            let mut a = Pcg32::seed_from_u64(seed);
            let mut b = Pcg32::seed_from_u64(seed);
            for _ in 0..100 {
                prop_assert_eq!(a.next_u32(), b.next_u32());
            }
        }

        /// Range draws never land outside the requested span, for both the
        /// `u32` and `usize` entry points.
        #[test]
        fn prop_range_draws_stay_in_span(
            seed in any::<u64>(),
            start in 0_u32..1000,
            span in 1_u32..1000,
        ) {
            let end = start + span;
            let mut rng = Pcg32::seed_from_u64(seed);
            for _ in 0..100 {
                prop_assert!((start..end).contains(&rng.gen_range(start..end)));
                let (s, e) = (start as usize, end as usize);
                prop_assert!((s..e).contains(&rng.gen_range_usize(s..e)));
            }
        }

        /// `gen_bool(p)` comes up true close to `p` of the time.
        #[test]
        fn prop_gen_bool_tracks_its_probability(
            seed in any::<u64>(),
            probability in 0.1_f64..0.9,
        ) {
            let mut rng = Pcg32::seed_from_u64(seed);
            let hits = (0..1000).filter(|_| rng.gen_bool(probability)).count();
            let observed = hits as f64 / 1000.0;
            prop_assert!(
                (observed - probability).abs() < 0.15,
                "gen_bool({}) hit {} of the time",
                probability,
                observed
            );
        }

        /// A clone taken mid-stream stays in step with its source.
        #[test]
        fn prop_clones_stay_in_step(seed in any::<u64>(), advance in 0_usize..100) {
            let mut source = Pcg32::seed_from_u64(seed);
            for _ in 0..advance {
                let _ = source.next_u32();
            }
            let mut clone = source.clone();
            for _ in 0..50 {
                prop_assert_eq!(source.next_u32(), clone.next_u32());
            }
        }
    }
}
