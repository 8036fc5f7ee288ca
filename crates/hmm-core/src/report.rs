//! Training reports and output renderings.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use hmm_config::ConfigSnapshot;
use serde::{Deserialize, Serialize};

use crate::baum_welch::{IterationRecord, TrainingConfig, TrainingOutcome};
use crate::error::Result;
use crate::model::InitMode;
use crate::scoring::{CorpusScore, SensitivityReport};

/// Supported output formats for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Pretty-printed JSON (default)
    #[default]
    Json,

    /// Human-readable Markdown
    Md,

    /// One-line summary for quick status checks
    Summary,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Md => write!(f, "md"),
            OutputFormat::Summary => write!(f, "summary"),
        }
    }
}

/// Final model, convergence history and run provenance.
///
/// The first seven fields keep the layout `{N, M, executionTime, history,
/// A, B, Pi}` so existing consumers of the dump keep working.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingReport {
    #[serde(rename = "N")]
    pub n: usize,
    #[serde(rename = "M")]
    pub m: usize,
    /// Wall-clock training time in seconds.
    pub execution_time: f64,
    pub history: Vec<IterationRecord>,
    #[serde(rename = "A")]
    pub a: Vec<Vec<f64>>,
    #[serde(rename = "B")]
    pub b: Vec<Vec<f64>>,
    #[serde(rename = "Pi")]
    pub pi: Vec<f64>,

    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    pub iterations: usize,
    pub epsilon: f64,
    pub sequences: usize,
    pub init_mode: InitMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<ConfigSnapshot>,
}

impl TrainingReport {
    pub fn new(
        outcome: &TrainingOutcome,
        config: &TrainingConfig,
        sequences: usize,
        init_mode: InitMode,
        run_id: impl Into<String>,
    ) -> Self {
        let model = &outcome.model;
        Self {
            n: model.n_states(),
            m: model.n_symbols(),
            execution_time: outcome.elapsed.as_secs_f64(),
            history: outcome.history.records().to_vec(),
            a: model.transition().to_nested(),
            b: model.emission().to_nested(),
            pi: model.initial().to_vec(),
            run_id: run_id.into(),
            generated_at: Utc::now(),
            iterations: outcome.history.len(),
            epsilon: config.epsilon,
            sequences,
            init_mode,
            config: None,
        }
    }

    pub fn with_config(mut self, snapshot: ConfigSnapshot) -> Self {
        self.config = Some(snapshot);
        self
    }

    pub fn final_log_likelihood(&self) -> Option<f64> {
        self.history.last().map(|r| r.log_likelihood)
    }

    /// Render in the requested format with `precision` decimals for text output.
    pub fn render(&self, format: OutputFormat, precision: usize) -> Result<String> {
        Ok(match format {
            OutputFormat::Json => serde_json::to_string_pretty(self)?,
            OutputFormat::Md => self.to_markdown(precision),
            OutputFormat::Summary => self.to_summary(precision),
        })
    }

    fn to_summary(&self, precision: usize) -> String {
        format!(
            "trained N={} M={} on {} sequences: {} iterations, log-likelihood {}, {:.3}s",
            self.n,
            self.m,
            self.sequences,
            self.iterations,
            fmt_opt(self.final_log_likelihood(), precision),
            self.execution_time
        )
    }

    fn to_markdown(&self, p: usize) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# HMM training report\n");
        let _ = writeln!(out, "- Run: `{}`", self.run_id);
        let _ = writeln!(out, "- Generated: {}", self.generated_at.to_rfc3339());
        let _ = writeln!(
            out,
            "- States (N): {}, symbols (M): {}, sequences: {}",
            self.n, self.m, self.sequences
        );
        let _ = writeln!(out, "- Initial model: {}", self.init_mode);
        let _ = writeln!(
            out,
            "- Iterations: {}, epsilon: {:e}",
            self.iterations, self.epsilon
        );
        let _ = writeln!(out, "- Execution time: {:.4} s", self.execution_time);
        let _ = writeln!(
            out,
            "- Final log-likelihood: {}",
            fmt_opt(self.final_log_likelihood(), p)
        );

        let states: Vec<String> = (0..self.n).map(|i| format!("s{i}")).collect();
        let symbols: Vec<String> = (0..self.m).map(|k| k.to_string()).collect();

        let _ = writeln!(out, "\n## Transition matrix (A)\n");
        markdown_matrix(&mut out, "from \\ to", &states, &states, &self.a, p);
        let _ = writeln!(out, "\n## Emission matrix (B)\n");
        markdown_matrix(&mut out, "state \\ symbol", &states, &symbols, &self.b, p);
        let _ = writeln!(out, "\n## Initial distribution (Pi)\n");
        let _ = writeln!(out, "| state | probability |\n|---|---|");
        for (i, v) in self.pi.iter().enumerate() {
            let _ = writeln!(out, "| s{i} | {v:.p$} |");
        }

        let _ = writeln!(out, "\n## Convergence history\n");
        let _ = writeln!(out, "| iter | log-likelihood | near-zero denominators |\n|---|---|---|");
        for r in &self.history {
            let _ = writeln!(
                out,
                "| {} | {:.p$} | {} |",
                r.iter, r.log_likelihood, r.near_zero_denominators
            );
        }
        out
    }
}

/// Render a corpus score.
pub fn render_score(score: &CorpusScore, format: OutputFormat, precision: usize) -> Result<String> {
    let p = precision;
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(score)?,
        OutputFormat::Summary => format!(
            "log-likelihood {:.p$} over {} sequences ({} near-zero steps)",
            score.log_likelihood,
            score.per_sequence.len(),
            score.near_zero_steps
        ),
        OutputFormat::Md => {
            let mut out = String::new();
            let _ = writeln!(out, "# Corpus score\n");
            let _ = writeln!(out, "- Log-likelihood: {:.p$}", score.log_likelihood);
            let _ = writeln!(out, "- Near-zero steps: {}\n", score.near_zero_steps);
            let _ = writeln!(out, "| sequence | log-likelihood |\n|---|---|");
            for (k, ll) in score.per_sequence.iter().enumerate() {
                let _ = writeln!(out, "| {k} | {ll:.p$} |");
            }
            out
        }
    })
}

/// Render a sensitivity sweep.
pub fn render_sweep(
    sweep: &SensitivityReport,
    format: OutputFormat,
    precision: usize,
) -> Result<String> {
    let p = precision;
    let cell = &sweep.cell;
    let label = format!("{}[{}][{}]", cell.target, cell.row, cell.col);
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(sweep)?,
        OutputFormat::Summary => {
            let worst = sweep
                .points
                .iter()
                .map(|pt| pt.delta)
                .fold(0.0f64, f64::min);
            format!(
                "{label}: baseline {:.p$} (log-likelihood {:.p$}), {} points, largest drop {:.p$}",
                sweep.baseline_value,
                sweep.baseline_log_likelihood,
                sweep.points.len(),
                worst
            )
        }
        OutputFormat::Md => {
            let mut out = String::new();
            let _ = writeln!(out, "# Sensitivity of {label}\n");
            let _ = writeln!(
                out,
                "- Baseline value: {:.p$}\n- Baseline log-likelihood: {:.p$}\n",
                sweep.baseline_value, sweep.baseline_log_likelihood
            );
            let _ = writeln!(
                out,
                "| value | log-likelihood | delta | change % |\n|---|---|---|---|"
            );
            for pt in &sweep.points {
                let _ = writeln!(
                    out,
                    "| {:.p$} | {:.p$} | {:.p$} | {:.2} |",
                    pt.value, pt.log_likelihood, pt.delta, pt.relative_change_pct
                );
            }
            out
        }
    })
}

fn markdown_matrix(
    out: &mut String,
    corner: &str,
    rows: &[String],
    cols: &[String],
    values: &[Vec<f64>],
    p: usize,
) {
    let _ = writeln!(out, "| {} | {} |", corner, cols.join(" | "));
    let _ = writeln!(out, "|{}", "---|".repeat(cols.len() + 1));
    for (label, row) in rows.iter().zip(values) {
        let cells: Vec<String> = row.iter().map(|v| format!("{v:.p$}")).collect();
        let _ = writeln!(out, "| {} | {} |", label, cells.join(" | "));
    }
}

fn fmt_opt(value: Option<f64>, p: usize) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.p$}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baum_welch::train;
    use crate::corpus::Corpus;
    use crate::model::HmmModel;

    fn report() -> TrainingReport {
        let corpus = Corpus::new(2, vec![vec![0, 1, 0, 1, 0]]).unwrap();
        let model = HmmModel::from_nested(
            &[vec![0.7, 0.3], vec![0.4, 0.6]],
            &[vec![0.5, 0.5], vec![0.1, 0.9]],
            &[0.6, 0.4],
        )
        .unwrap();
        let config = TrainingConfig::default().with_max_iterations(3);
        let outcome = train(&corpus, model, config).unwrap();
        TrainingReport::new(&outcome, &config, corpus.len(), InitMode::Supplied, "run-test")
    }

    #[test]
    fn json_keeps_dump_layout() {
        let json: serde_json::Value =
            serde_json::from_str(&report().render(OutputFormat::Json, 6).unwrap()).unwrap();
        for key in ["N", "M", "executionTime", "history", "A", "B", "Pi"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert_eq!(json["history"][0]["iter"], 1);
        assert!(json["history"][0]["logLikelihood"].is_f64());
        assert_eq!(json["initMode"], "supplied");
        assert_eq!(json["runId"], "run-test");
        assert!(json.get("config").is_none());
    }

    #[test]
    fn markdown_has_all_sections() {
        let md = report().render(OutputFormat::Md, 4).unwrap();
        assert!(md.contains("## Transition matrix (A)"));
        assert!(md.contains("## Emission matrix (B)"));
        assert!(md.contains("## Initial distribution (Pi)"));
        assert!(md.contains("| 3 |"));
    }

    #[test]
    fn summary_is_one_line() {
        let s = report().render(OutputFormat::Summary, 3).unwrap();
        assert!(!s.contains('\n'));
        assert!(s.contains("3 iterations"));
    }

    #[test]
    fn report_round_trips_through_json() {
        let r = report();
        let text = serde_json::to_string(&r).unwrap();
        let back: TrainingReport = serde_json::from_str(&text).unwrap();
        assert_eq!(back, r);
    }
}
