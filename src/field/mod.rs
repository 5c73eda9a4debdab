//! Field definitions and per-worker field generators
//!
//! A field is configured by a name and a spec string:
//!
//! ```text
//! name:  <anything>_<suffix>
//! spec:  type:avgSize:cardinality:distribution:nullPercent[:mapFile]
//! ```
//!
//! The suffix picks how a value is emitted (`_i` int, `_l` long, `_f`
//! float, `_d` double, `_s` string, `_ss` multi-valued string, `_en` free
//! text, `_tdt` timestamp, `_b` boolean). The spec string picks the distribution
//! feeding it. The trailing map file segment is accepted and ignored.
//!
//! [`FieldDefinition`] is the parsed, immutable form and is shared across
//! workers. [`FieldSpec`] is what a worker draws from: it owns the
//! distribution instance and the rank-to-value cache, so it must never be
//! shared between workers.

pub mod value;

pub use value::{format_timestamp, FieldValue};

use crate::config::ConfigError;
use crate::corpus::WordCorpus;
use crate::distribution::{DistributionKind, RankDistribution, ValueCache, ValueDistribution};
use chrono::{DateTime, Utc};
use rand::Rng;
use std::fmt;
use std::sync::Arc;

/// Base instant of generated timestamps (2013-05-08T20:36:38Z), in epoch millis
pub const DATE_BASE_MS: i64 = 1_368_045_398_000;

/// Upper bound of values drawn for one multi-valued field in one document
pub const MAX_MULTI_VALUES: usize = 20;

/// How a field's value is produced, selected by the name suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Int,
    Long,
    Float,
    Double,
    Str,
    MultiStr,
    Text,
    Timestamp,
    Bool,
}

impl FieldKind {
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "i" => Some(Self::Int),
            "l" => Some(Self::Long),
            "f" => Some(Self::Float),
            "d" => Some(Self::Double),
            "s" => Some(Self::Str),
            "ss" => Some(Self::MultiStr),
            "en" => Some(Self::Text),
            "tdt" => Some(Self::Timestamp),
            "b" => Some(Self::Bool),
            _ => None,
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Int => "i",
            Self::Long => "l",
            Self::Float => "f",
            Self::Double => "d",
            Self::Str => "s",
            Self::MultiStr => "ss",
            Self::Text => "en",
            Self::Timestamp => "tdt",
            Self::Bool => "b",
        }
    }

    /// Whether values are words drawn from the corpus
    pub fn uses_corpus(&self) -> bool {
        matches!(self, Self::Str | Self::MultiStr | Self::Text)
    }
}

/// Declared datatype from the first spec segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Datatype {
    Int,
    Long,
    Float,
    Double,
    String,
}

impl Datatype {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "i" => Some(Self::Int),
            "l" => Some(Self::Long),
            "f" => Some(Self::Float),
            "d" => Some(Self::Double),
            "s" => Some(Self::String),
            _ => None,
        }
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::String => "string",
        };
        write!(f, "{}", name)
    }
}

/// Parsed, immutable field configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDefinition {
    name: String,
    kind: FieldKind,
    datatype: Datatype,
    distribution: DistributionKind,
    avg_size: u32,
    cardinality: u32,
    null_percent: u8,
    words: Option<u32>,
}

impl FieldDefinition {
    /// Parse a field from its name, spec string and optional words-per-text
    ///
    /// # Errors
    ///
    /// - `UnsupportedFieldSuffix` when the name has no known suffix
    /// - `InvalidFieldSpec` when the spec string has the wrong shape
    /// - `InvalidCardinality` when the cardinality is outside `[1, i32::MAX]`
    /// - `InvalidNullPercent` when the null percentage is outside `[0, 100]`
    /// - `MissingParameter` when a free-text field has no positive word count
    pub fn parse(name: &str, spec: &str, words: Option<u32>) -> Result<Self, ConfigError> {
        let suffix = name.rsplit_once('_').map(|(_, suffix)| suffix).unwrap_or("");
        let kind = FieldKind::from_suffix(suffix).ok_or_else(|| {
            ConfigError::UnsupportedFieldSuffix {
                field: name.to_string(),
                suffix: suffix.to_string(),
            }
        })?;

        let invalid = |reason: &str| ConfigError::InvalidFieldSpec {
            field: name.to_string(),
            spec: spec.to_string(),
            reason: reason.to_string(),
        };

        let parts: Vec<&str> = spec.split(':').map(str::trim).collect();
        if parts.len() != 5 && parts.len() != 6 {
            return Err(invalid("expected type:avgSize:cardinality:distribution:nullPercent"));
        }

        let datatype = Datatype::from_code(parts[0])
            .ok_or_else(|| invalid("type must be one of i, l, f, d, s"))?;
        let avg_size: u32 = parts[1]
            .parse()
            .map_err(|_| invalid("avgSize must be a non-negative integer"))?;
        let cardinality: u64 = parts[2]
            .parse()
            .map_err(|_| invalid("cardinality must be a positive integer"))?;
        if cardinality == 0 || cardinality > i32::MAX as u64 {
            return Err(ConfigError::InvalidCardinality(cardinality));
        }

        let mut codes = parts[3].chars();
        let distribution = match (codes.next(), codes.next()) {
            (Some(code), None) => DistributionKind::from_code(code),
            _ => None,
        }
        .ok_or_else(|| invalid("distribution must be u or z"))?;

        let null_percent: i64 = parts[4]
            .parse()
            .map_err(|_| invalid("nullPercent must be an integer"))?;
        if !(0..=100).contains(&null_percent) {
            return Err(ConfigError::InvalidNullPercent {
                field: name.to_string(),
                value: null_percent,
            });
        }

        if kind == FieldKind::Text && !matches!(words, Some(count) if count > 0) {
            return Err(ConfigError::MissingParameter(format!("words for field '{}'", name)));
        }

        Ok(Self {
            name: name.to_string(),
            kind,
            datatype,
            distribution,
            avg_size,
            cardinality: cardinality as u32,
            null_percent: null_percent as u8,
            words,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn datatype(&self) -> Datatype {
        self.datatype
    }

    pub fn distribution(&self) -> DistributionKind {
        self.distribution
    }

    pub fn cardinality(&self) -> u32 {
        self.cardinality
    }

    pub fn null_percent(&self) -> u8 {
        self.null_percent
    }

    pub fn words(&self) -> Option<u32> {
        self.words
    }

    /// Build a worker-owned generator for this field
    pub fn instantiate(&self, corpus: Arc<WordCorpus>) -> Result<FieldSpec, ConfigError> {
        let distribution = ValueDistribution::new(self.distribution, self.avg_size, self.cardinality)?;
        Ok(FieldSpec {
            definition: self.clone(),
            distribution,
            cache: ValueCache::new(),
            corpus,
        })
    }
}

/// Per-worker field generator
///
/// Holds the distribution and its value cache. Not `Sync` in spirit: each
/// worker builds its own set from the shared definitions.
#[derive(Debug)]
pub struct FieldSpec {
    definition: FieldDefinition,
    distribution: ValueDistribution,
    cache: ValueCache,
    corpus: Arc<WordCorpus>,
}

impl FieldSpec {
    pub fn name(&self) -> &str {
        self.definition.name()
    }

    pub fn kind(&self) -> FieldKind {
        self.definition.kind()
    }

    pub fn definition(&self) -> &FieldDefinition {
        &self.definition
    }

    pub fn is_multi_valued(&self) -> bool {
        self.definition.kind() == FieldKind::MultiStr
    }

    /// Next value, or `None` when the null draw hits
    ///
    /// A value is produced only when a draw in `[1, 100]` is strictly
    /// greater than the null percentage.
    pub fn next<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<FieldValue> {
        let pct: u8 = rng.gen_range(1..=100);
        if pct > self.definition.null_percent {
            Some(self.next_no_null(rng))
        } else {
            None
        }
    }

    /// Next value, skipping the null draw
    pub fn next_no_null<R: Rng + ?Sized>(&mut self, rng: &mut R) -> FieldValue {
        let dist = &self.distribution;
        match self.definition.kind {
            FieldKind::Text => {
                let max_words = self.definition.words.unwrap_or(1).max(1);
                let count = rng.gen_range(1..=max_words);
                let mut text = String::new();
                for i in 0..count {
                    if i > 0 {
                        text.push(' ');
                    }
                    text.push_str(&dist.next_string(&self.corpus, rng));
                }
                FieldValue::Str(text)
            }
            FieldKind::Timestamp => {
                let millis = DATE_BASE_MS + dist.next_long(rng) * 1000;
                FieldValue::Timestamp(DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or_default())
            }
            FieldKind::Str | FieldKind::MultiStr => FieldValue::Str(dist.next_string(&self.corpus, rng)),
            FieldKind::Bool => FieldValue::Bool(rng.gen()),
            FieldKind::Long => FieldValue::Long(dist.next_long(rng)),
            // Cardinality is capped at i32::MAX, so every rank fits
            FieldKind::Int => FieldValue::Int(dist.next_rank(rng) as i32),
            FieldKind::Float => FieldValue::Float(dist.next_float(&mut self.cache, rng)),
            FieldKind::Double => FieldValue::Double(dist.next_double(&mut self.cache, rng)),
        }
    }
}

/// Instantiate a full worker-owned field set
pub fn instantiate_all(
    definitions: &[FieldDefinition],
    corpus: &Arc<WordCorpus>,
) -> Result<Vec<FieldSpec>, ConfigError> {
    definitions
        .iter()
        .map(|definition| definition.instantiate(Arc::clone(corpus)))
        .collect()
}
