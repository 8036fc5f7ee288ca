//! Discrete HMM parameters.
//!
//! A model owns the transition matrix `A` (N×N), the emission matrix `B`
//! (N×M) and the initial distribution `Pi` (N). Every row of `A` and `B`
//! and the vector `Pi` are probability distributions. Randomly drawn models
//! satisfy this by construction; supplied models carry it as a caller
//! precondition and are only checked for shape and finite non-negative
//! entries.

use hmm_math::{l1_normalize, max_row_deviation, sum_deviation, Matrix};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Upper bound on `N*N + N*M`, the number of cells in `A` and `B` together.
///
/// Dimensions come from request headers; anything larger is refused before
/// allocation (16Mi cells is 128 MiB per copy of the model).
pub const MAX_MODEL_CELLS: usize = 1 << 24;

/// How the starting model of a training run was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitMode {
    /// Rows drawn uniformly at random, then L1-normalized.
    Random,
    /// Matrices supplied by the caller.
    Supplied,
}

impl InitMode {
    /// Decode the numeric flag of the text corpus format.
    pub fn from_flag(flag: u64) -> Result<Self> {
        match flag {
            0 => Ok(InitMode::Random),
            1 => Ok(InitMode::Supplied),
            other => Err(Error::InvalidInitMode(other)),
        }
    }

    pub fn flag(self) -> u64 {
        match self {
            InitMode::Random => 0,
            InitMode::Supplied => 1,
        }
    }
}

impl std::fmt::Display for InitMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InitMode::Random => write!(f, "random"),
            InitMode::Supplied => write!(f, "supplied"),
        }
    }
}

/// Parameters of a discrete hidden Markov model.
#[derive(Debug, Clone, PartialEq)]
pub struct HmmModel {
    transition: Matrix,
    emission: Matrix,
    initial: Vec<f64>,
}

impl HmmModel {
    /// Draw a model with every row sampled uniformly on (0, 1] and L1-normalized.
    pub fn random<R: Rng + ?Sized>(n_states: usize, n_symbols: usize, rng: &mut R) -> Result<Self> {
        check_dimensions(n_states, n_symbols)?;

        let too_large =
            || Error::InvalidDimensions(format!("{n_states}x{n_symbols} model is too large"));
        let mut transition = Matrix::try_zeros(n_states, n_states).ok_or_else(too_large)?;
        let mut emission = Matrix::try_zeros(n_states, n_symbols).ok_or_else(too_large)?;
        let mut initial = vec![0.0; n_states];

        for i in 0..n_states {
            random_distribution(transition.row_mut(i), rng);
            random_distribution(emission.row_mut(i), rng);
        }
        random_distribution(&mut initial, rng);

        Ok(Self {
            transition,
            emission,
            initial,
        })
    }

    /// Build a model from supplied parameters.
    ///
    /// Values are taken as given; rows are not re-normalized.
    pub fn from_parts(transition: Matrix, emission: Matrix, initial: Vec<f64>) -> Result<Self> {
        let n = initial.len();
        let m = emission.cols();
        check_dimensions(n, m)?;

        if transition.shape() != (n, n) {
            return Err(Error::ShapeMismatch {
                name: "A",
                expected: format!("{n}x{n}"),
                actual: format!("{}x{}", transition.rows(), transition.cols()),
            });
        }
        if emission.rows() != n {
            return Err(Error::ShapeMismatch {
                name: "B",
                expected: format!("{n}x{m}"),
                actual: format!("{}x{}", emission.rows(), emission.cols()),
            });
        }

        check_entries("A", &transition)?;
        check_entries("B", &emission)?;
        for (i, &v) in initial.iter().enumerate() {
            if !(v.is_finite() && v >= 0.0) {
                return Err(Error::InvalidParameter {
                    name: "Pi",
                    row: 0,
                    col: i,
                    value: v,
                });
            }
        }

        Ok(Self {
            transition,
            emission,
            initial,
        })
    }

    /// Build a model from nested rows, checking that every row has the same width.
    pub fn from_nested(a: &[Vec<f64>], b: &[Vec<f64>], pi: &[f64]) -> Result<Self> {
        let transition = nested_matrix("A", a, pi.len())?;
        let emission = nested_matrix("B", b, b.first().map_or(0, Vec::len))?;
        Self::from_parts(transition, emission, pi.to_vec())
    }

    pub fn n_states(&self) -> usize {
        self.initial.len()
    }

    pub fn n_symbols(&self) -> usize {
        self.emission.cols()
    }

    /// Transition matrix `A`.
    pub fn transition(&self) -> &Matrix {
        &self.transition
    }

    /// Emission matrix `B`.
    pub fn emission(&self) -> &Matrix {
        &self.emission
    }

    /// Initial distribution `Pi`.
    pub fn initial(&self) -> &[f64] {
        &self.initial
    }

    /// Largest deviation from 1 over all rows of `A`, `B` and `Pi`.
    pub fn stochastic_deviation(&self) -> f64 {
        max_row_deviation(&self.transition)
            .max(max_row_deviation(&self.emission))
            .max(sum_deviation(&self.initial))
    }

    /// Fail with [`Error::NotStochastic`] naming the worst offender when any
    /// row deviates from 1 by more than `tolerance`.
    pub fn check_stochastic(&self, tolerance: f64) -> Result<()> {
        let candidates = [
            ("A", max_row_deviation(&self.transition)),
            ("B", max_row_deviation(&self.emission)),
            ("Pi", sum_deviation(&self.initial)),
        ];
        for (name, deviation) in candidates {
            if !(deviation <= tolerance) {
                return Err(Error::NotStochastic {
                    name,
                    deviation,
                    tolerance,
                });
            }
        }
        Ok(())
    }

    /// Replace all three parameter sets at once.
    pub(crate) fn replace(&mut self, transition: Matrix, emission: Matrix, initial: Vec<f64>) {
        debug_assert_eq!(transition.shape(), self.transition.shape());
        debug_assert_eq!(emission.shape(), self.emission.shape());
        debug_assert_eq!(initial.len(), self.initial.len());
        self.transition = transition;
        self.emission = emission;
        self.initial = initial;
    }

    /// Mutable access for single-entry edits outside training (sensitivity sweeps).
    pub(crate) fn parts_mut(&mut self) -> (&mut Matrix, &mut Matrix, &mut Vec<f64>) {
        (&mut self.transition, &mut self.emission, &mut self.initial)
    }
}

/// Reject empty alphabets and state spaces, and models over [`MAX_MODEL_CELLS`].
pub(crate) fn check_dimensions(n_states: usize, n_symbols: usize) -> Result<()> {
    if n_states == 0 {
        return Err(Error::InvalidDimensions("N (states) must be at least 1".into()));
    }
    if n_symbols == 0 {
        return Err(Error::InvalidDimensions("M (symbols) must be at least 1".into()));
    }
    let cells = n_states
        .checked_add(n_symbols)
        .and_then(|width| width.checked_mul(n_states));
    match cells {
        Some(cells) if cells <= MAX_MODEL_CELLS => Ok(()),
        _ => Err(Error::InvalidDimensions(format!(
            "N={n_states}, M={n_symbols} needs more than {MAX_MODEL_CELLS} parameters"
        ))),
    }
}

fn check_entries(name: &'static str, m: &Matrix) -> Result<()> {
    for r in 0..m.rows() {
        for (c, &v) in m.row(r).iter().enumerate() {
            if !(v.is_finite() && v >= 0.0) {
                return Err(Error::InvalidParameter {
                    name,
                    row: r,
                    col: c,
                    value: v,
                });
            }
        }
    }
    Ok(())
}

fn nested_matrix(name: &'static str, rows: &[Vec<f64>], expected_cols: usize) -> Result<Matrix> {
    Matrix::from_rows(rows).ok_or_else(|| Error::ShapeMismatch {
        name,
        expected: format!("rows of width {expected_cols}"),
        actual: format!(
            "row widths {:?}",
            rows.iter().map(Vec::len).collect::<Vec<_>>()
        ),
    })
}

fn random_distribution<R: Rng + ?Sized>(row: &mut [f64], rng: &mut R) {
    for v in row.iter_mut() {
        // random() is in [0, 1); flip it so no entry is exactly zero.
        *v = 1.0 - rng.random::<f64>();
    }
    l1_normalize(row);
}
