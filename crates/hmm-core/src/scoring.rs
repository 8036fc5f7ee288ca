//! Likelihood evaluation and single-parameter sensitivity sweeps.

use hmm_math::{ln_floored, log_sum_exp, Matrix, LOG_PROB_FLOOR};
use serde::{Deserialize, Serialize};

use crate::baum_welch::forward;
use crate::corpus::Corpus;
use crate::error::{Error, Result};
use crate::model::HmmModel;

/// Corpus log-likelihood from the scaled forward pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorpusScore {
    pub log_likelihood: f64,
    pub per_sequence: Vec<f64>,
    pub near_zero_steps: usize,
}

fn check_alphabet(model: &HmmModel, corpus: &Corpus) -> Result<()> {
    if model.n_symbols() != corpus.n_symbols() {
        return Err(Error::AlphabetMismatch {
            model: model.n_symbols(),
            corpus: corpus.n_symbols(),
        });
    }
    Ok(())
}

/// Score every sequence with the scaled forward pass (`-sum ln c[t]`).
pub fn score_corpus(model: &HmmModel, corpus: &Corpus, epsilon: f64) -> Result<CorpusScore> {
    check_alphabet(model, corpus)?;
    let mut alpha = Matrix::default();
    let mut per_sequence = Vec::with_capacity(corpus.len());
    let mut near_zero_steps = 0;
    for obs in corpus.iter() {
        let scaling = forward(model, obs, epsilon, &mut alpha);
        near_zero_steps += scaling.near_zero_steps();
        per_sequence.push(scaling.log_likelihood());
    }
    Ok(CorpusScore {
        log_likelihood: per_sequence.iter().sum(),
        per_sequence,
        near_zero_steps,
    })
}

/// Corpus log-likelihood from an unscaled forward recursion in log space.
///
/// Probabilities are floored at [`LOG_PROB_FLOOR`] before taking logs.
/// Independent of the scaling scheme, so it cross-checks [`score_corpus`].
pub fn log_domain_likelihood(model: &HmmModel, corpus: &Corpus) -> Result<f64> {
    check_alphabet(model, corpus)?;
    let n = model.n_states();
    let a = model.transition();
    let b = model.emission();
    let ln = |p: f64| ln_floored(p, LOG_PROB_FLOOR);

    let mut log_alpha = vec![0.0; n];
    let mut next = vec![0.0; n];
    let mut terms = vec![0.0; n];
    let mut total = 0.0;

    for obs in corpus.iter() {
        let Some((&first, rest)) = obs.split_first() else {
            continue;
        };
        for (i, la) in log_alpha.iter_mut().enumerate() {
            *la = ln(model.initial()[i]) + ln(b[(i, first)]);
        }
        for &symbol in rest {
            for (j, slot) in next.iter_mut().enumerate() {
                for (i, term) in terms.iter_mut().enumerate() {
                    *term = log_alpha[i] + ln(a[(i, j)]);
                }
                *slot = log_sum_exp(&terms) + ln(b[(j, symbol)]);
            }
            std::mem::swap(&mut log_alpha, &mut next);
        }
        total += log_sum_exp(&log_alpha);
    }
    Ok(total)
}

/// Which parameter set a sensitivity edit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterTarget {
    #[serde(rename = "A")]
    Transition,
    #[serde(rename = "B")]
    Emission,
    #[serde(rename = "Pi")]
    Initial,
}

impl ParameterTarget {
    pub fn name(self) -> &'static str {
        match self {
            ParameterTarget::Transition => "A",
            ParameterTarget::Emission => "B",
            ParameterTarget::Initial => "Pi",
        }
    }
}

impl std::fmt::Display for ParameterTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for ParameterTarget {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "A" | "a" | "transition" => Ok(ParameterTarget::Transition),
            "B" | "b" | "emission" => Ok(ParameterTarget::Emission),
            "Pi" | "pi" | "PI" | "initial" => Ok(ParameterTarget::Initial),
            other => Err(format!("unknown parameter set {other:?}, expected A, B or Pi")),
        }
    }
}

/// A parameter cell, parsed from `A:row:col`, `B:row:col` or `Pi:i`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterCell {
    pub target: ParameterTarget,
    pub row: usize,
    pub col: usize,
}

impl std::str::FromStr for ParameterCell {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let index = |p: &str| {
            p.trim()
                .parse::<usize>()
                .map_err(|_| format!("invalid index {p:?} in {s:?}"))
        };
        match parts.as_slice() {
            [target, i] => {
                let target: ParameterTarget = target.parse()?;
                if target != ParameterTarget::Initial {
                    return Err(format!("{target} needs row and column: {target}:row:col"));
                }
                Ok(Self {
                    target,
                    row: 0,
                    col: index(*i)?,
                })
            }
            [target, row, col] => Ok(Self {
                target: target.parse()?,
                row: index(*row)?,
                col: index(*col)?,
            }),
            _ => Err(format!("expected A:row:col, B:row:col or Pi:i, got {s:?}")),
        }
    }
}

/// Set one entry and rescale the rest of its row so the row stays stochastic.
///
/// `value` is clamped to `[0, 1]`. The other entries are scaled
/// proportionally to share `1 - value`; if they are all zero they split it
/// evenly. A one-entry row is always `[1.0]`.
pub fn perturb_entry(
    model: &HmmModel,
    target: ParameterTarget,
    row: usize,
    col: usize,
    value: f64,
) -> Result<HmmModel> {
    if !value.is_finite() {
        return Err(Error::InvalidParameter {
            name: target.name(),
            row,
            col,
            value,
        });
    }

    let mut edited = model.clone();
    let (a, b, pi) = edited.parts_mut();
    let (rows, cols, cells): (usize, usize, &mut [f64]) = match target {
        ParameterTarget::Transition => (a.rows(), a.cols(), a.as_mut_slice()),
        ParameterTarget::Emission => (b.rows(), b.cols(), b.as_mut_slice()),
        ParameterTarget::Initial => (1, pi.len(), pi.as_mut_slice()),
    };
    if row >= rows || col >= cols {
        return Err(Error::ParameterIndex {
            name: target.name(),
            row,
            col,
            rows,
            cols,
        });
    }

    redistribute(&mut cells[row * cols..(row + 1) * cols], col, value.clamp(0.0, 1.0));
    Ok(edited)
}

fn redistribute(row: &mut [f64], col: usize, value: f64) {
    row[col] = value;
    let others = row.len() - 1;
    if others == 0 {
        row[col] = 1.0;
        return;
    }
    let rest = 1.0 - value;
    let sum_others: f64 = row
        .iter()
        .enumerate()
        .filter(|&(j, _)| j != col)
        .map(|(_, v)| v)
        .sum();
    for (j, v) in row.iter_mut().enumerate() {
        if j == col {
            continue;
        }
        *v = if sum_others > 0.0 {
            *v * rest / sum_others
        } else {
            rest / others as f64
        };
    }
}

/// One point of a sensitivity sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepPoint {
    /// Requested value after clamping to [0, 1].
    pub value: f64,
    pub log_likelihood: f64,
    /// `log_likelihood - baseline`.
    pub delta: f64,
    /// Delta as a percentage of `|baseline|` (0 when the baseline is 0).
    pub relative_change_pct: f64,
}

/// Log-likelihood response to moving one parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensitivityReport {
    pub cell: ParameterCell,
    pub baseline_value: f64,
    pub baseline_log_likelihood: f64,
    pub points: Vec<SweepPoint>,
}

/// Score the corpus with one cell set to each of `values` in turn.
pub fn sensitivity_sweep(
    model: &HmmModel,
    corpus: &Corpus,
    cell: ParameterCell,
    values: &[f64],
    epsilon: f64,
) -> Result<SensitivityReport> {
    let baseline_value = cell_value(model, cell)?;
    let baseline = score_corpus(model, corpus, epsilon)?.log_likelihood;

    let mut points = Vec::with_capacity(values.len());
    for &value in values {
        let edited = perturb_entry(model, cell.target, cell.row, cell.col, value)?;
        let ll = score_corpus(&edited, corpus, epsilon)?.log_likelihood;
        let delta = ll - baseline;
        points.push(SweepPoint {
            value: value.clamp(0.0, 1.0),
            log_likelihood: ll,
            delta,
            relative_change_pct: if baseline != 0.0 {
                delta / baseline.abs() * 100.0
            } else {
                0.0
            },
        });
    }

    Ok(SensitivityReport {
        cell,
        baseline_value,
        baseline_log_likelihood: baseline,
        points,
    })
}

fn cell_value(model: &HmmModel, cell: ParameterCell) -> Result<f64> {
    let (rows, cols) = match cell.target {
        ParameterTarget::Transition => model.transition().shape(),
        ParameterTarget::Emission => model.emission().shape(),
        ParameterTarget::Initial => (1, model.n_states()),
    };
    if cell.row >= rows || cell.col >= cols {
        return Err(Error::ParameterIndex {
            name: cell.target.name(),
            row: cell.row,
            col: cell.col,
            rows,
            cols,
        });
    }
    Ok(match cell.target {
        ParameterTarget::Transition => model.transition()[(cell.row, cell.col)],
        ParameterTarget::Emission => model.emission()[(cell.row, cell.col)],
        ParameterTarget::Initial => model.initial()[cell.col],
    })
}
