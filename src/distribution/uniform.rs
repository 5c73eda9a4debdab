//! Uniform value distribution
//!
//! Every rank in `[0, cardinality)` is equally likely.
//!
//! Long values keep a sign quirk: they are a full signed 64-bit draw reduced
//! with `%` by the cardinality, so roughly half of them are negative. Fields
//! built on longs (plain longs and timestamp offsets) therefore spread on
//! both sides of zero.
//!
//! # Example
//!
//! ```
//! use indexpulse::distribution::RankDistribution;
//! use indexpulse::distribution::uniform::UniformDistribution;
//! use rand::SeedableRng;
//! use rand_xoshiro::Xoshiro256PlusPlus;
//!
//! let dist = UniformDistribution::new(1, 100_000);
//! let mut rng = Xoshiro256PlusPlus::seed_from_u64(5151);
//!
//! for _ in 0..10 {
//!     assert!(dist.next_rank(&mut rng) < 100_000);
//! }
//! ```

use super::RankDistribution;
use rand::Rng;

/// Uniform rank generator
#[derive(Debug, Clone)]
pub struct UniformDistribution {
    avg_size: u32,
    cardinality: u32,
}

impl UniformDistribution {
    /// `cardinality` must be at least 1; [`ValueDistribution::new`]
    /// validates it before getting here.
    ///
    /// [`ValueDistribution::new`]: super::ValueDistribution::new
    pub fn new(avg_size: u32, cardinality: u32) -> Self {
        Self {
            avg_size,
            cardinality: cardinality.max(1),
        }
    }
}

impl RankDistribution for UniformDistribution {
    fn cardinality(&self) -> u32 {
        self.cardinality
    }

    fn avg_size(&self) -> u32 {
        self.avg_size
    }

    #[inline(always)]
    fn next_rank<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        rng.gen_range(0..self.cardinality)
    }

    #[inline]
    fn next_long<R: Rng + ?Sized>(&self, rng: &mut R) -> i64 {
        rng.gen::<i64>() % i64::from(self.cardinality)
    }
}
