//! Corpus readers and writers.
//!
//! Two request formats are accepted:
//!
//! **Text stream** (whitespace-separated, `#` starts a comment):
//!
//! ```text
//! N M K
//! initMode          # 0 = random, 1 = supplied
//! maxIter           # 0 = configured default
//! T  s_0 ... s_T-1  # repeated K times
//! A (N*N values)    # only when initMode = 1
//! B (N*M values)
//! Pi (N values)
//! ```
//!
//! **JSON request**:
//!
//! ```json
//! {"N": 2, "M": 2, "observations": [[0, 1, 0]],
//!  "initParams": {"A": [[..]], "B": [[..]], "Pi": [..]}, "maxIter": 50}
//! ```

use std::fmt::Write as _;
use std::path::Path;

use clap::ValueEnum;
use hmm_math::Matrix;
use serde::{Deserialize, Serialize};

use crate::corpus::Corpus;
use crate::error::{Error, Result};
use crate::model::{check_dimensions, HmmModel, InitMode};

/// Upper bound on speculative pre-allocation driven by counts read from input.
const MAX_PREALLOC: usize = 1 << 16;

/// Input encoding for `train`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    /// Whitespace-separated integer stream.
    Text,
    /// JSON request object.
    Json,
}

impl InputFormat {
    /// Guess from a file extension: `.json` is JSON, anything else is text.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => InputFormat::Json,
            _ => InputFormat::Text,
        }
    }
}

impl std::fmt::Display for InputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputFormat::Text => write!(f, "text"),
            InputFormat::Json => write!(f, "json"),
        }
    }
}

/// A parsed and validated training request.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingInput {
    pub n_states: usize,
    pub n_symbols: usize,
    pub corpus: Corpus,
    /// Caller-supplied starting model; `None` means draw one at random.
    pub initial: Option<HmmModel>,
    /// Iteration count carried in the request; `None` when absent or zero.
    pub max_iterations: Option<usize>,
}

impl TrainingInput {
    pub fn init_mode(&self) -> InitMode {
        if self.initial.is_some() {
            InitMode::Supplied
        } else {
            InitMode::Random
        }
    }
}

/// `A`, `B` and `Pi` as nested arrays.
///
/// Used for `initParams` in JSON requests and as the model file of `score`
/// and `sample`. Unknown fields are ignored so a training report can be fed
/// back as a model file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    #[serde(rename = "A")]
    pub a: Vec<Vec<f64>>,
    #[serde(rename = "B")]
    pub b: Vec<Vec<f64>>,
    #[serde(rename = "Pi")]
    pub pi: Vec<f64>,
}

impl ModelParams {
    pub fn from_model(model: &HmmModel) -> Self {
        Self {
            a: model.transition().to_nested(),
            b: model.emission().to_nested(),
            pi: model.initial().to_vec(),
        }
    }

    pub fn into_model(self) -> Result<HmmModel> {
        HmmModel::from_nested(&self.a, &self.b, &self.pi)
    }
}

/// Parse a model file (`{"A": .., "B": .., "Pi": ..}`).
pub fn parse_model_json(input: &str) -> Result<HmmModel> {
    let params: ModelParams = serde_json::from_str(input).map_err(|e| Error::invalid_json(&e))?;
    params.into_model()
}

/// Parse a request in the given format.
pub fn parse_input(input: &str, format: InputFormat) -> Result<TrainingInput> {
    match format {
        InputFormat::Text => parse_text(input),
        InputFormat::Json => parse_json(input),
    }
}

/// Parse the whitespace-separated text stream.
pub fn parse_text(input: &str) -> Result<TrainingInput> {
    let mut tokens = Tokens::new(input);

    let n_states = tokens.next_count("N (number of states)")?;
    let n_symbols = tokens.next_count("M (number of symbols)")?;
    let n_sequences = tokens.next_count("K (number of sequences)")?;
    check_dimensions(n_states, n_symbols)?;

    let init_mode = InitMode::from_flag(tokens.next_u64("init mode flag")?)?;
    let max_iterations = Some(tokens.next_count("maxIter")?).filter(|&n| n > 0);

    let mut sequences = Vec::with_capacity(n_sequences.min(MAX_PREALLOC));
    for k in 0..n_sequences {
        let len = tokens.next_count("sequence length")?;
        if len == 0 {
            return Err(Error::EmptySequence { sequence: k });
        }
        let mut seq = Vec::with_capacity(len.min(MAX_PREALLOC));
        for _ in 0..len {
            seq.push(tokens.next_count("symbol index")?);
        }
        sequences.push(seq);
    }
    let corpus = Corpus::new(n_symbols, sequences)?;

    let initial = match init_mode {
        InitMode::Random => None,
        InitMode::Supplied => {
            let a = tokens.next_matrix(n_states, n_states, "transition value")?;
            let b = tokens.next_matrix(n_states, n_symbols, "emission value")?;
            let mut pi = Vec::with_capacity(n_states.min(MAX_PREALLOC));
            for _ in 0..n_states {
                pi.push(tokens.next_f64("initial probability")?);
            }
            Some(HmmModel::from_parts(a, b, pi)?)
        }
    };

    tokens.expect_end()?;

    Ok(TrainingInput {
        n_states,
        n_symbols,
        corpus,
        initial,
        max_iterations,
    })
}

#[derive(Debug, Deserialize)]
struct TrainRequest {
    #[serde(rename = "N")]
    n: usize,
    #[serde(rename = "M")]
    m: usize,
    #[serde(default)]
    observations: Vec<Vec<usize>>,
    #[serde(rename = "initParams", default)]
    init_params: Option<ModelParams>,
    #[serde(rename = "maxIter", default)]
    max_iter: Option<usize>,
}

/// Parse a JSON training request.
pub fn parse_json(input: &str) -> Result<TrainingInput> {
    let request: TrainRequest = serde_json::from_str(input).map_err(|e| Error::invalid_json(&e))?;
    check_dimensions(request.n, request.m)?;

    let corpus = Corpus::new(request.m, request.observations)?;
    let initial = match request.init_params {
        Some(params) => {
            let model = params.into_model()?;
            if model.n_states() != request.n || model.n_symbols() != request.m {
                return Err(Error::ShapeMismatch {
                    name: "initParams",
                    expected: format!("N={} M={}", request.n, request.m),
                    actual: format!("N={} M={}", model.n_states(), model.n_symbols()),
                });
            }
            Some(model)
        }
        None => None,
    };

    Ok(TrainingInput {
        n_states: request.n,
        n_symbols: request.m,
        corpus,
        initial,
        max_iterations: request.max_iter.filter(|&n| n > 0),
    })
}

/// Write a corpus in the text stream format.
///
/// With `model`, the stream uses init mode 1 and carries its parameters.
pub fn render_text_input(
    n_states: usize,
    corpus: &Corpus,
    model: Option<&HmmModel>,
    max_iterations: Option<usize>,
) -> String {
    let mut out = String::new();
    let mode = if model.is_some() {
        InitMode::Supplied
    } else {
        InitMode::Random
    };
    // Writing to a String cannot fail.
    let _ = writeln!(out, "{} {} {}", n_states, corpus.n_symbols(), corpus.len());
    let _ = writeln!(out, "{}", mode.flag());
    let _ = writeln!(out, "{}", max_iterations.unwrap_or(0));
    for seq in corpus.iter() {
        let _ = writeln!(out, "{}", seq.len());
        let _ = writeln!(out, "{}", join(seq.iter()));
    }
    if let Some(model) = model {
        for row in model.transition().iter_rows() {
            let _ = writeln!(out, "{}", join(row.iter()));
        }
        for row in model.emission().iter_rows() {
            let _ = writeln!(out, "{}", join(row.iter()));
        }
        let _ = writeln!(out, "{}", join(model.initial().iter()));
    }
    out
}

fn join<T: std::fmt::Display>(values: impl Iterator<Item = T>) -> String {
    values.map(|v| v.to_string()).collect::<Vec<_>>().join(" ")
}

/// Token cursor over the text stream with comments stripped.
struct Tokens<'a> {
    inner: Box<dyn Iterator<Item = &'a str> + 'a>,
    position: usize,
}

impl<'a> Tokens<'a> {
    fn new(input: &'a str) -> Self {
        let inner = input
            .lines()
            .map(|line| line.split('#').next().unwrap_or(""))
            .flat_map(str::split_whitespace);
        Self {
            inner: Box::new(inner),
            position: 0,
        }
    }

    fn next_token(&mut self, expected: &str) -> Result<&'a str> {
        self.position += 1;
        self.inner.next().ok_or_else(|| Error::MalformedInput {
            position: self.position,
            expected: expected.to_string(),
            found: "end of input".to_string(),
        })
    }

    fn malformed(&self, expected: &str, found: &str) -> Error {
        Error::MalformedInput {
            position: self.position,
            expected: expected.to_string(),
            found: format!("{found:?}"),
        }
    }

    fn next_u64(&mut self, expected: &str) -> Result<u64> {
        let tok = self.next_token(expected)?;
        tok.parse::<u64>()
            .map_err(|_| self.malformed(&format!("{expected} (non-negative integer)"), tok))
    }

    fn next_count(&mut self, expected: &str) -> Result<usize> {
        let tok = self.next_token(expected)?;
        tok.parse::<usize>()
            .map_err(|_| self.malformed(&format!("{expected} (non-negative integer)"), tok))
    }

    fn next_f64(&mut self, expected: &str) -> Result<f64> {
        let tok = self.next_token(expected)?;
        tok.parse::<f64>()
            .map_err(|_| self.malformed(&format!("{expected} (number)"), tok))
    }

    fn next_matrix(&mut self, rows: usize, cols: usize, expected: &str) -> Result<Matrix> {
        let mut data = Vec::with_capacity(rows.saturating_mul(cols).min(MAX_PREALLOC));
        for _ in 0..rows.saturating_mul(cols) {
            data.push(self.next_f64(expected)?);
        }
        Matrix::from_flat(rows, cols, data).ok_or_else(|| Error::ShapeMismatch {
            name: "matrix",
            expected: format!("{rows}x{cols}"),
            actual: "overflowing size".to_string(),
        })
    }

    fn expect_end(&mut self) -> Result<()> {
        match self.inner.next() {
            None => Ok(()),
            Some(tok) => {
                self.position += 1;
                Err(self.malformed("end of input", tok))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RANDOM_INIT: &str = "2 3 2\n0\n10\n3\n0 1 2\n1\n2\n";

    #[test]
    fn parses_random_init_stream() {
        let input = parse_text(RANDOM_INIT).unwrap();
        assert_eq!(input.n_states, 2);
        assert_eq!(input.n_symbols, 3);
        assert_eq!(input.corpus.len(), 2);
        assert_eq!(input.corpus.sequences()[0].symbols(), &[0, 1, 2]);
        assert_eq!(input.max_iterations, Some(10));
        assert_eq!(input.init_mode(), InitMode::Random);
    }

    #[test]
    fn parses_supplied_init_stream_with_comments() {
        let text = "\
# scenario A
2 2 1   # N M K
1       # supplied
0       # default iterations
5
0 1 0 1 0
0.7 0.3
0.4 0.6
0.5 0.5
0.1 0.9
0.6 0.4
";
        let input = parse_text(text).unwrap();
        assert_eq!(input.max_iterations, None);
        let model = input.initial.unwrap();
        assert_eq!(model.transition().row(1), &[0.4, 0.6]);
        assert_eq!(model.emission().row(1), &[0.1, 0.9]);
        assert_eq!(model.initial(), &[0.6, 0.4]);
    }

    #[test]
    fn reports_truncation_position() {
        let err = parse_text("2 2 1\n0\n0\n3\n0 1").unwrap_err();
        match err {
            Error::MalformedInput {
                position, found, ..
            } => {
                assert_eq!(position, 9);
                assert_eq!(found, "end of input");
            }
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn rejects_negative_and_garbage_tokens() {
        assert!(matches!(
            parse_text("2 -2 1"),
            Err(Error::MalformedInput { position: 2, .. })
        ));
        assert!(matches!(
            parse_text("2 2 1\n0\n0\n1\nx"),
            Err(Error::MalformedInput { position: 7, .. })
        ));
    }

    #[test]
    fn rejects_zero_dimensions_and_empty_sequences() {
        assert!(matches!(
            parse_text("0 2 0\n0\n0"),
            Err(Error::InvalidDimensions(_))
        ));
        assert!(matches!(
            parse_text("1 2 2\n0\n0\n1 0\n0"),
            Err(Error::EmptySequence { sequence: 1 })
        ));
    }

    #[test]
    fn rejects_oversized_header() {
        assert!(matches!(
            parse_text("4294967296 4294967296 0\n0\n0\n"),
            Err(Error::InvalidDimensions(_))
        ));
        assert!(matches!(
            parse_json(r#"{"N": 200000, "M": 3, "observations": []}"#),
            Err(Error::InvalidDimensions(_))
        ));
    }

    #[test]
    fn rejects_out_of_range_symbols() {
        assert!(matches!(
            parse_text("1 2 1\n0\n0\n2\n0 2"),
            Err(Error::SymbolOutOfRange {
                sequence: 0,
                position: 1,
                symbol: 2,
                n_symbols: 2
            })
        ));
    }

    #[test]
    fn rejects_bad_init_mode_and_trailing_tokens() {
        assert!(matches!(
            parse_text("1 1 0\n2\n0"),
            Err(Error::InvalidInitMode(2))
        ));
        assert!(matches!(
            parse_text("1 1 0\n0\n0\n7"),
            Err(Error::MalformedInput { position: 6, .. })
        ));
    }

    #[test]
    fn empty_corpus_is_accepted() {
        let input = parse_text("2 2 0\n0\n0\n").unwrap();
        assert!(input.corpus.is_empty());
    }

    #[test]
    fn parses_json_request() {
        let json = r#"{
            "N": 2, "M": 2,
            "observations": [[0, 1, 0, 1, 0]],
            "initParams": {
                "A": [[0.7, 0.3], [0.4, 0.6]],
                "B": [[0.5, 0.5], [0.1, 0.9]],
                "Pi": [0.6, 0.4]
            },
            "maxIter": 5
        }"#;
        let input = parse_json(json).unwrap();
        assert_eq!(input.max_iterations, Some(5));
        assert_eq!(input.init_mode(), InitMode::Supplied);
        assert_eq!(input.corpus.total_symbols(), 5);
    }

    #[test]
    fn json_init_params_must_match_dimensions() {
        let json = r#"{"N": 3, "M": 2, "observations": [[0]],
            "initParams": {"A": [[1.0]], "B": [[0.5, 0.5]], "Pi": [1.0]}}"#;
        assert!(matches!(
            parse_json(json),
            Err(Error::ShapeMismatch {
                name: "initParams",
                ..
            })
        ));
    }

    #[test]
    fn json_syntax_errors_are_input_errors() {
        let err = parse_json("{\"N\": 2,").unwrap_err();
        assert!(matches!(err, Error::InvalidJson { line: 1, .. }));
        assert_eq!(err.category(), crate::error::ErrorCategory::Input);
    }

    #[test]
    fn rendered_stream_parses_back() {
        let original = parse_text(RANDOM_INIT).unwrap();
        let model = HmmModel::from_nested(
            &[vec![0.25, 0.75], vec![0.5, 0.5]],
            &[vec![0.1, 0.2, 0.7], vec![0.3, 0.3, 0.4]],
            &[0.9, 0.1],
        )
        .unwrap();
        let text = render_text_input(2, &original.corpus, Some(&model), Some(4));
        let parsed = parse_text(&text).unwrap();
        assert_eq!(parsed.corpus, original.corpus);
        assert_eq!(parsed.initial.as_ref(), Some(&model));
        assert_eq!(parsed.max_iterations, Some(4));
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(InputFormat::from_path(Path::new("a.JSON")), InputFormat::Json);
        assert_eq!(InputFormat::from_path(Path::new("a.txt")), InputFormat::Text);
        assert_eq!(InputFormat::from_path(Path::new("-")), InputFormat::Text);
    }

    #[test]
    fn model_file_ignores_report_fields() {
        let json = r#"{"N": 1, "M": 2, "history": [], "A": [[1.0]], "B": [[0.3, 0.7]], "Pi": [1.0]}"#;
        let model = parse_model_json(json).unwrap();
        assert_eq!(model.emission().row(0), &[0.3, 0.7]);
    }
}
