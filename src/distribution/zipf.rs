//! Zipf value distribution
//!
//! Power-law rank generator where a few low ranks receive most of the draws,
//! the way a handful of words dominate natural text.
//!
//! # Characteristics
//!
//! - P(k) ∝ 1 / k^s over `k = 1..=cardinality`, with `s = 1.0`
//! - The sampler yields `k` starting at 1; ranks are `k - 1`
//! - Sampling is rejection based (`rand_distr::Zipf`), so no CDF table is
//!   built and large cardinalities cost nothing up front
//!
//! # Example
//!
//! ```
//! use indexpulse::distribution::RankDistribution;
//! use indexpulse::distribution::zipf::ZipfDistribution;
//! use rand::SeedableRng;
//! use rand_xoshiro::Xoshiro256PlusPlus;
//!
//! let dist = ZipfDistribution::new(15, 20_000).unwrap();
//! let mut rng = Xoshiro256PlusPlus::seed_from_u64(5151);
//! assert!(dist.next_rank(&mut rng) < 20_000);
//! ```

use super::RankDistribution;
use crate::config::ConfigError;
use rand::Rng;
use rand_distr::{Distribution as _, Zipf};

/// Exponent of the rank-frequency power law
pub const ZIPF_EXPONENT: f64 = 1.0;

/// Zipf rank generator
///
/// Each worker builds its own instance as part of its field set, so the
/// sampler is never shared between threads.
#[derive(Debug, Clone)]
pub struct ZipfDistribution {
    avg_size: u32,
    cardinality: u32,
    sampler: Zipf<f64>,
}

impl ZipfDistribution {
    /// Create a sampler over `cardinality` elements
    ///
    /// # Errors
    ///
    /// `InvalidCardinality` when `cardinality` is zero.
    pub fn new(avg_size: u32, cardinality: u32) -> Result<Self, ConfigError> {
        let sampler = Zipf::new(u64::from(cardinality), ZIPF_EXPONENT)
            .map_err(|_| ConfigError::InvalidCardinality(u64::from(cardinality)))?;

        Ok(Self {
            avg_size,
            cardinality,
            sampler,
        })
    }
}

impl RankDistribution for ZipfDistribution {
    fn cardinality(&self) -> u32 {
        self.cardinality
    }

    fn avg_size(&self) -> u32 {
        self.avg_size
    }

    #[inline]
    fn next_rank<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        // Sample is an integral float in [1, cardinality]
        let element = self.sampler.sample(rng) as u32;
        element.saturating_sub(1).min(self.cardinality - 1)
    }

    #[inline]
    fn next_long<R: Rng + ?Sized>(&self, rng: &mut R) -> i64 {
        i64::from(self.next_rank(rng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    #[test]
    fn test_zipf_rank_bounds() {
        let dist = ZipfDistribution::new(1, 1000).unwrap();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);

        for _ in 0..10_000 {
            assert!(dist.next_rank(&mut rng) < 1000);
        }
    }

    #[test]
    fn test_zipf_cardinality_one() {
        let dist = ZipfDistribution::new(1, 1).unwrap();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(2);

        for _ in 0..100 {
            assert_eq!(dist.next_rank(&mut rng), 0);
        }
    }

    #[test]
    fn test_zipf_zero_cardinality() {
        assert!(matches!(
            ZipfDistribution::new(1, 0),
            Err(ConfigError::InvalidCardinality(0))
        ));
    }

    #[test]
    fn test_zipf_seeded() {
        let dist = ZipfDistribution::new(1, 1000).unwrap();
        let mut rng1 = Xoshiro256PlusPlus::seed_from_u64(12345);
        let mut rng2 = Xoshiro256PlusPlus::seed_from_u64(12345);

        for _ in 0..10 {
            assert_eq!(dist.next_rank(&mut rng1), dist.next_rank(&mut rng2));
        }
    }

    #[test]
    fn test_zipf_skew() {
        let num_ranks = 1000u32;
        let dist = ZipfDistribution::new(1, num_ranks).unwrap();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
        let mut buckets = vec![0u32; 10];
        let mut rank_zero = 0u32;
        let mut rank_last = 0u32;

        for _ in 0..20_000 {
            let rank = dist.next_rank(&mut rng);
            buckets[(rank * 10 / num_ranks) as usize] += 1;
            if rank == 0 {
                rank_zero += 1;
            } else if rank == num_ranks - 1 {
                rank_last += 1;
            }
        }

        assert!(buckets[0] > buckets[9] * 2,
            "Zipf skew insufficient: bucket[0]={} bucket[9]={}",
            buckets[0], buckets[9]);
        assert!(rank_zero > rank_last * 20,
            "rank 0 drawn {} times, rank {} drawn {} times",
            rank_zero, num_ranks - 1, rank_last);
    }

    #[test]
    fn test_zipf_long_matches_rank_range() {
        let dist = ZipfDistribution::new(1, 500).unwrap();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(8);

        for _ in 0..1000 {
            let value = dist.next_long(&mut rng);
            assert!((0..500).contains(&value));
        }
    }
}
