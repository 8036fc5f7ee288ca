//! Validated observation corpus.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One observed symbol sequence. Indices are in `[0, M)` and the sequence
/// is never empty once it sits inside a [`Corpus`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObservationSequence(Vec<usize>);

impl ObservationSequence {
    pub fn symbols(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[usize]> for ObservationSequence {
    fn as_ref(&self) -> &[usize] {
        &self.0
    }
}

/// Immutable set of sequences over an alphabet of `n_symbols` symbols.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Corpus {
    n_symbols: usize,
    sequences: Vec<ObservationSequence>,
}

impl Corpus {
    /// Validate and wrap raw sequences.
    ///
    /// Rejects empty sequences and any symbol outside `[0, n_symbols)`.
    /// A corpus with no sequences at all is allowed.
    pub fn new(n_symbols: usize, sequences: Vec<Vec<usize>>) -> Result<Self> {
        if n_symbols == 0 {
            return Err(Error::InvalidDimensions("M (symbols) must be at least 1".into()));
        }
        for (k, seq) in sequences.iter().enumerate() {
            if seq.is_empty() {
                return Err(Error::EmptySequence { sequence: k });
            }
            if let Some(position) = seq.iter().position(|&s| s >= n_symbols) {
                return Err(Error::SymbolOutOfRange {
                    sequence: k,
                    position,
                    symbol: seq[position],
                    n_symbols,
                });
            }
        }
        Ok(Self {
            n_symbols,
            sequences: sequences.into_iter().map(ObservationSequence).collect(),
        })
    }

    pub fn n_symbols(&self) -> usize {
        self.n_symbols
    }

    /// Number of sequences (K).
    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    pub fn sequences(&self) -> &[ObservationSequence] {
        &self.sequences
    }

    pub fn iter(&self) -> impl Iterator<Item = &[usize]> + '_ {
        self.sequences.iter().map(ObservationSequence::symbols)
    }

    /// Sum of all sequence lengths.
    pub fn total_symbols(&self) -> usize {
        self.sequences.iter().map(ObservationSequence::len).sum()
    }

    /// Longest sequence length (0 for an empty corpus).
    pub fn max_len(&self) -> usize {
        self.sequences
            .iter()
            .map(ObservationSequence::len)
            .max()
            .unwrap_or(0)
    }

    /// Occurrences of each symbol across the concatenated corpus.
    pub fn symbol_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.n_symbols];
        for seq in self.iter() {
            for &s in seq {
                counts[s] += 1;
            }
        }
        counts
    }
}
