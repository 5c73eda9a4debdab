//! Value distributions
//!
//! A distribution turns the worker's random source into a *rank*: an integer
//! in `[0, cardinality)` that selects one of a bounded set of value
//! instances. Every generated value is derived from a rank:
//!
//! - **ints**: the rank itself
//! - **longs**: a long draw reduced by the cardinality
//! - **floats / doubles**: a random number memoized per rank, so the same
//!   rank always yields the same value within one field
//! - **strings**: the corpus word at that rank
//!
//! # Distributions
//!
//! - **Uniform**: every rank equally likely
//! - **Zipf**: low ranks drawn far more often than high ranks
//!
//! The variant is chosen once when a field is configured; draws dispatch
//! through the [`ValueDistribution`] enum without any boxing.
//!
//! # Example
//!
//! ```
//! use indexpulse::distribution::{RankDistribution, ValueDistribution, DistributionKind};
//! use rand::SeedableRng;
//! use rand_xoshiro::Xoshiro256PlusPlus;
//!
//! let dist = ValueDistribution::new(DistributionKind::Zipf, 1, 1000).unwrap();
//! let mut rng = Xoshiro256PlusPlus::seed_from_u64(5151);
//! let rank = dist.next_rank(&mut rng);
//! assert!(rank < 1000);
//! ```

pub mod uniform;
pub mod zipf;

use crate::config::ConfigError;
use crate::corpus::WordCorpus;
use crate::field::FieldValue;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uniform::UniformDistribution;
use zipf::ZipfDistribution;

/// Rank-to-value memo owned by a single field instance
pub type ValueCache = HashMap<u32, FieldValue>;

/// Upper bound on rank redraws when a rank falls past the end of the corpus.
/// After this many misses the rank is folded into the corpus instead.
pub const MAX_RANK_REDRAWS: usize = 1024;

/// Distribution selector as written in a field spec (`u` or `z`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistributionKind {
    Uniform,
    Zipf,
}

impl DistributionKind {
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'u' => Some(Self::Uniform),
            'z' => Some(Self::Zipf),
            _ => None,
        }
    }
}

/// Rank generator contract shared by all distributions
///
/// Implementations hold no mutable state: randomness comes from the
/// caller's per-worker RNG, and memoized values live in the caller's
/// [`ValueCache`].
pub trait RankDistribution {
    /// Number of distinct ranks this distribution can produce
    fn cardinality(&self) -> u32;

    /// Average value size budget carried from the field spec
    fn avg_size(&self) -> u32;

    /// Draw a rank in `[0, cardinality)`
    fn next_rank<R: Rng + ?Sized>(&self, rng: &mut R) -> u32;

    /// Draw a long value
    fn next_long<R: Rng + ?Sized>(&self, rng: &mut R) -> i64;

    /// Float for the next rank, synthesized on first sight and cached
    fn next_float<R: Rng + ?Sized>(&self, cache: &mut ValueCache, rng: &mut R) -> f32 {
        let rank = self.next_rank(rng);
        if let Some(FieldValue::Float(value)) = cache.get(&rank) {
            return *value;
        }
        let value = random_float(rng);
        cache.insert(rank, FieldValue::Float(value));
        value
    }

    /// Double for the next rank, synthesized on first sight and cached
    fn next_double<R: Rng + ?Sized>(&self, cache: &mut ValueCache, rng: &mut R) -> f64 {
        let rank = self.next_rank(rng);
        if let Some(FieldValue::Double(value)) = cache.get(&rank) {
            return *value;
        }
        let value = random_double(rng);
        cache.insert(rank, FieldValue::Double(value));
        value
    }

    /// Corpus word at the next rank
    ///
    /// Ranks past the end of the corpus are redrawn, up to
    /// [`MAX_RANK_REDRAWS`] times, then folded modulo the corpus size, so
    /// this always terminates even when the cardinality exceeds the corpus.
    fn next_string<R: Rng + ?Sized>(&self, corpus: &WordCorpus, rng: &mut R) -> String {
        let size = corpus.len();
        if size == 0 {
            return String::new();
        }

        let mut rank = self.next_rank(rng) as usize;
        let mut redraws = 0;
        while rank >= size {
            if redraws == MAX_RANK_REDRAWS {
                rank %= size;
                break;
            }
            rank = self.next_rank(rng) as usize;
            redraws += 1;
        }
        corpus.get(rank).unwrap_or_default().to_owned()
    }
}

/// Uniform or Zipf distribution, fixed at field construction
#[derive(Debug, Clone)]
pub enum ValueDistribution {
    Uniform(UniformDistribution),
    Zipf(ZipfDistribution),
}

impl ValueDistribution {
    /// Build the distribution for a field
    ///
    /// # Errors
    ///
    /// `InvalidCardinality` if the cardinality is zero or does not fit in a
    /// signed 32-bit rank.
    pub fn new(kind: DistributionKind, avg_size: u32, cardinality: u32) -> Result<Self, ConfigError> {
        if cardinality == 0 || cardinality > i32::MAX as u32 {
            return Err(ConfigError::InvalidCardinality(cardinality as u64));
        }
        Ok(match kind {
            DistributionKind::Uniform => {
                Self::Uniform(UniformDistribution::new(avg_size, cardinality))
            }
            DistributionKind::Zipf => Self::Zipf(ZipfDistribution::new(avg_size, cardinality)?),
        })
    }

    #[cfg(test)]
    pub(crate) fn kind(&self) -> DistributionKind {
        match self {
            Self::Uniform(_) => DistributionKind::Uniform,
            Self::Zipf(_) => DistributionKind::Zipf,
        }
    }
}

impl RankDistribution for ValueDistribution {
    fn cardinality(&self) -> u32 {
        match self {
            Self::Uniform(dist) => dist.cardinality(),
            Self::Zipf(dist) => dist.cardinality(),
        }
    }

    fn avg_size(&self) -> u32 {
        match self {
            Self::Uniform(dist) => dist.avg_size(),
            Self::Zipf(dist) => dist.avg_size(),
        }
    }

    #[inline]
    fn next_rank<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        match self {
            Self::Uniform(dist) => dist.next_rank(rng),
            Self::Zipf(dist) => dist.next_rank(rng),
        }
    }

    #[inline]
    fn next_long<R: Rng + ?Sized>(&self, rng: &mut R) -> i64 {
        match self {
            Self::Uniform(dist) => dist.next_long(rng),
            Self::Zipf(dist) => dist.next_long(rng),
        }
    }
}

/// Fresh float: unit draw scaled by a signed 32-bit draw
fn random_float<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    let unit: f32 = rng.gen();
    unit * rng.gen::<i32>() as f32
}

/// Fresh double: unit draw scaled by a signed 32-bit draw
fn random_double<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let unit: f64 = rng.gen();
    unit * rng.gen::<i32>() as f64
}
