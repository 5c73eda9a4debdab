//! Word corpus shared by every string and free-text field
//!
//! The corpus is loaded from a plain word list (one word per line), trimmed,
//! stripped of blank lines and shuffled once with its own seeded RNG so the
//! ordering of the source file does not leak into the rank-to-word mapping.
//! After loading it is immutable; workers read it concurrently through an
//! `Arc` without any locking.
//!
//! [`WordCorpus::shared`] is the process-wide accessor: the first caller
//! loads the list and every later caller (from any thread) gets the same
//! `Arc`, regardless of the path it asks for.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::info;

/// Process-wide corpus, loaded at most once.
static SHARED_CORPUS: Mutex<Option<Arc<WordCorpus>>> = Mutex::new(None);

/// Errors raised while loading a word list
#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("word list {} not found", .0.display())]
    NotFound(PathBuf),

    #[error("word list {0} contains no words")]
    Empty(String),

    #[error("failed to read word list {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Immutable, shuffled list of words
#[derive(Debug)]
pub struct WordCorpus {
    words: Vec<String>,
}

impl WordCorpus {
    /// Load and shuffle a word list from disk
    ///
    /// # Errors
    ///
    /// `NotFound` if the file does not exist, `Empty` if it holds no
    /// non-blank lines, `Io` for any other read failure.
    pub fn load(path: &Path, shuffle_seed: u64) -> Result<Self, CorpusError> {
        let contents = fs::read_to_string(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                CorpusError::NotFound(path.to_path_buf())
            } else {
                CorpusError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        let mut words: Vec<String> = contents
            .lines()
            .map(str::trim)
            .filter(|word| !word.is_empty())
            .map(str::to_owned)
            .collect();
        if words.is_empty() {
            return Err(CorpusError::Empty(path.display().to_string()));
        }

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(shuffle_seed);
        words.shuffle(&mut rng);

        Ok(Self { words })
    }

    /// Build a corpus from words already in memory, keeping their order
    ///
    /// Blank entries are dropped, the rest are trimmed.
    pub fn from_words<I, S>(words: I) -> Result<Self, CorpusError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words: Vec<String> = words
            .into_iter()
            .map(|word| word.as_ref().trim().to_owned())
            .filter(|word| !word.is_empty())
            .collect();
        if words.is_empty() {
            return Err(CorpusError::Empty("<in-memory>".to_string()));
        }
        Ok(Self { words })
    }

    /// Process-wide corpus, loading it on first use
    ///
    /// Concurrent callers block until the first load completes. A failed
    /// load leaves nothing behind, so a later call may try again.
    pub fn shared(path: &Path, shuffle_seed: u64) -> Result<Arc<Self>, CorpusError> {
        let mut slot = SHARED_CORPUS
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(corpus) = slot.as_ref() {
            return Ok(corpus.clone());
        }

        let corpus = Arc::new(Self::load(path, shuffle_seed)?);
        info!("Loaded {} words from {}", corpus.len(), path.display());
        *slot = Some(corpus.clone());
        Ok(corpus)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Word at `rank`, if in bounds
    pub fn get(&self, rank: usize) -> Option<&str> {
        self.words.get(rank).map(String::as_str)
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }
}
