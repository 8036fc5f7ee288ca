//! hmm-train - discrete HMM training CLI
//!
//! Reads an observation corpus, runs scaled Baum-Welch re-estimation for a
//! fixed number of iterations and prints the trained model with its
//! convergence history. `score` and `sample` reuse a trained model.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, CommandFactory, Parser, Subcommand};
use hmm_config::{load_config, load_config_file, ConfigSnapshot, ResolvedConfig};
use hmm_core::exit_codes::ExitCode;
use hmm_core::logging::{
    event_names, generate_run_id, init_logging, LogConfig, LogContext, LogFormat, LogLevel, Stage,
};
use hmm_core::report::{render_score, render_sweep};
use hmm_core::{
    log_event, parse_input, parse_model_json, render_text_input, sample_corpus, score_corpus,
    sensitivity_sweep, HmmModel, InputFormat, OutputFormat, ParameterCell, Result, Trainer,
    TrainingConfig, TrainingReport,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "hmm-train")]
#[command(author, version, about = "Scaled Baum-Welch training for discrete HMMs", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Path to trainer config file (also HMM_TRAIN_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log output format on stderr
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a model on an observation corpus
    Train(TrainArgs),

    /// Score a corpus under a trained model
    Score(ScoreArgs),

    /// Sample a corpus from a trained model
    Sample(SampleArgs),

    /// Configuration management
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),

    /// Print version information
    Version,
}

#[derive(Args, Debug)]
struct TrainArgs {
    /// Corpus file (stdin when omitted)
    #[arg(long, short = 'i')]
    input: Option<PathBuf>,

    /// Corpus format (defaults to the file extension, else text)
    #[arg(long, value_enum)]
    input_format: Option<InputFormat>,

    /// Number of EM iterations (overrides input and config)
    #[arg(long, short = 'n')]
    iterations: Option<usize>,

    /// Additive floor applied before each normalizing division
    #[arg(long)]
    epsilon: Option<f64>,

    /// Seed for the random initial model
    #[arg(long)]
    seed: Option<u64>,

    /// Run the per-sequence E-step on the thread pool
    #[arg(long)]
    parallel: bool,

    /// Write the report here instead of stdout
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ScoreArgs {
    /// Model file (a training report or {"A", "B", "Pi"})
    #[arg(long, short = 'm')]
    model: PathBuf,

    /// Corpus file (stdin when omitted)
    #[arg(long, short = 'i')]
    input: Option<PathBuf>,

    /// Corpus format (defaults to the file extension, else text)
    #[arg(long, value_enum)]
    input_format: Option<InputFormat>,

    /// Sweep one parameter: A:row:col, B:row:col or Pi:i
    #[arg(long, requires = "values")]
    sweep: Option<ParameterCell>,

    /// Values for the swept parameter
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    values: Vec<f64>,

    /// Additive floor applied before each normalizing division
    #[arg(long)]
    epsilon: Option<f64>,
}

#[derive(Args, Debug)]
struct SampleArgs {
    /// Model file (a training report or {"A", "B", "Pi"})
    #[arg(long, short = 'm')]
    model: PathBuf,

    /// Symbols per sequence
    #[arg(long, short = 'l')]
    length: usize,

    /// Number of sequences
    #[arg(long, short = 'c', default_value_t = 1)]
    count: usize,

    /// Seed for reproducible draws
    #[arg(long)]
    seed: Option<u64>,

    /// Emit init mode 1 with the model parameters appended
    #[arg(long)]
    include_model: bool,

    /// Write the corpus here instead of stdout
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show the effective configuration and where it came from
    Show,
    /// Validate a config file (the resolved one when PATH is omitted)
    Validate {
        /// Path to config file
        path: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    shell: clap_complete::Shell,
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() {
                ExitCode::ArgsError
            } else {
                ExitCode::Clean
            };
            let _ = err.print();
            std::process::exit(code.as_i32());
        }
    };

    let cli_level = LogLevel::from_verbosity(cli.global.verbose, cli.global.quiet);
    let log_config = LogConfig::from_env(cli_level, cli.global.log_format);
    init_logging(&log_config);

    let command = match &cli.command {
        Commands::Train(_) => "train",
        Commands::Score(_) => "score",
        Commands::Sample(_) => "sample",
        Commands::Config(_) => "config",
        Commands::Completions(_) => "completions",
        Commands::Version => "version",
    };
    let ctx = LogContext::new(generate_run_id(), command);

    let result = match &cli.command {
        Commands::Train(args) => run_train(&cli.global, args, &ctx),
        Commands::Score(args) => run_score(&cli.global, args, &ctx),
        Commands::Sample(args) => run_sample(&cli.global, args, &ctx),
        Commands::Config(args) => run_config(&cli.global, args, &ctx),
        Commands::Completions(args) => run_completions(args),
        Commands::Version => print_version(&cli.global),
    };

    let exit_code = match result {
        Ok(()) => ExitCode::Clean,
        Err(err) => {
            let code = ExitCode::from(&err);
            log_event!(
                ctx,
                ERROR,
                event_names::INTERNAL_ERROR,
                Stage::Report,
                err.to_string(),
                code = err.code(),
                exit = code.code_name()
            );
            report_error(&cli.global, &err);
            code
        }
    };

    std::process::exit(exit_code.as_i32());
}

fn report_error(global: &GlobalOpts, err: &hmm_core::Error) {
    match global.format {
        OutputFormat::Json => {
            let body = serde_json::json!({ "status": "error", "error": err.to_json() });
            match serde_json::to_string_pretty(&body) {
                Ok(text) => eprintln!("{text}"),
                Err(_) => eprintln!("error: {err}"),
            }
        }
        OutputFormat::Summary => eprintln!("error [{}]: {}", err.code(), err),
        OutputFormat::Md => {
            eprintln!("# Error\n");
            eprintln!("- Code: {}", err.code());
            eprintln!("- Message: {}", err);
        }
    }
}

// ============================================================================
// Command implementations
// ============================================================================

fn run_train(global: &GlobalOpts, args: &TrainArgs, ctx: &LogContext) -> Result<()> {
    log_event!(ctx, INFO, event_names::RUN_STARTED, Stage::Init, "starting train command");

    let resolved = resolve_config(global, ctx)?;
    let training = &resolved.config.training;

    let started = Instant::now();
    let format = args
        .input_format
        .unwrap_or_else(|| format_for(args.input.as_deref()));
    let text = read_source(args.input.as_deref())?;
    let input = parse_input(&text, format)?;
    log_event!(
        ctx,
        INFO,
        event_names::INPUT_PARSED,
        Stage::Parse,
        "corpus parsed",
        format = tracing::field::display(format),
        n_states = input.n_states,
        n_symbols = input.n_symbols,
        sequences = input.corpus.len(),
        symbols = input.corpus.total_symbols(),
        parse_ms = started.elapsed().as_millis() as u64
    );

    let max_iterations = args
        .iterations
        .or(input.max_iterations)
        .unwrap_or(training.max_iterations);
    let config = TrainingConfig::from_config(&resolved.config)
        .with_max_iterations(max_iterations)
        .with_epsilon(args.epsilon.unwrap_or(training.epsilon))
        .with_parallel(args.parallel || training.parallel);
    config.validate()?;

    let init_mode = input.init_mode();
    let model = match input.initial {
        Some(model) => {
            let deviation = model.stochastic_deviation();
            if deviation > training.stochastic_tolerance {
                log_event!(
                    ctx,
                    WARN,
                    event_names::INPUT_NOT_STOCHASTIC,
                    Stage::Parse,
                    "supplied parameters are not row-stochastic; results are undefined",
                    deviation = deviation
                );
            }
            model
        }
        None => {
            let mut rng = seeded_rng(args.seed.or(training.seed));
            HmmModel::random(input.n_states, input.n_symbols, &mut rng)?
        }
    };

    let sequences = input.corpus.len();
    let outcome = Trainer::new(&input.corpus, model, config)?.run()?;

    let report = TrainingReport::new(&outcome, &config, sequences, init_mode, ctx.run_id.as_str())
        .with_config(ConfigSnapshot::from_resolved(&resolved));
    let rendered = report.render(global.format, resolved.config.output.precision)?;
    write_payload(args.output.as_deref(), &rendered)?;

    log_event!(
        ctx,
        INFO,
        event_names::RUN_FINISHED,
        Stage::Report,
        "train command finished",
        duration_ms = started.elapsed().as_millis() as u64
    );
    Ok(())
}

fn run_score(global: &GlobalOpts, args: &ScoreArgs, ctx: &LogContext) -> Result<()> {
    log_event!(ctx, INFO, event_names::RUN_STARTED, Stage::Init, "starting score command");

    let resolved = resolve_config(global, ctx)?;
    let epsilon = args.epsilon.unwrap_or(resolved.config.training.epsilon);
    TrainingConfig::default().with_epsilon(epsilon).validate()?;
    let precision = resolved.config.output.precision;

    let model = parse_model_json(&read_source(Some(&args.model))?)?;
    let format = args
        .input_format
        .unwrap_or_else(|| format_for(args.input.as_deref()));
    let input = parse_input(&read_source(args.input.as_deref())?, format)?;

    let rendered = match args.sweep {
        Some(cell) => {
            let sweep = sensitivity_sweep(&model, &input.corpus, cell, &args.values, epsilon)?;
            render_sweep(&sweep, global.format, precision)?
        }
        None => {
            let score = score_corpus(&model, &input.corpus, epsilon)?;
            log_event!(
                ctx,
                INFO,
                event_names::SCORE_FINISHED,
                Stage::Score,
                "corpus scored",
                log_likelihood = score.log_likelihood,
                near_zero_steps = score.near_zero_steps
            );
            render_score(&score, global.format, precision)?
        }
    };
    write_payload(None, &rendered)
}

fn run_sample(global: &GlobalOpts, args: &SampleArgs, ctx: &LogContext) -> Result<()> {
    log_event!(ctx, INFO, event_names::RUN_STARTED, Stage::Init, "starting sample command");

    let resolved = resolve_config(global, ctx)?;
    let model = parse_model_json(&read_source(Some(&args.model))?)?;
    let mut rng = seeded_rng(args.seed.or(resolved.config.training.seed));
    let corpus = sample_corpus(&model, args.count, args.length, &mut rng)?;

    log_event!(
        ctx,
        INFO,
        event_names::SAMPLE_FINISHED,
        Stage::Sample,
        "corpus sampled",
        sequences = corpus.len(),
        length = args.length
    );

    let carried = args.include_model.then_some(&model);
    let text = render_text_input(model.n_states(), &corpus, carried, None);
    write_payload(args.output.as_deref(), text.trim_end())
}

fn run_config(global: &GlobalOpts, args: &ConfigArgs, ctx: &LogContext) -> Result<()> {
    match &args.command {
        ConfigCommands::Show => {
            let resolved = resolve_config(global, ctx)?;
            let snapshot = resolved.snapshot();
            let rendered = match global.format {
                OutputFormat::Json => serde_json::to_string_pretty(&snapshot)?,
                OutputFormat::Summary => format!(
                    "config from {} ({}): {} iterations, epsilon {:e}",
                    snapshot.path.as_deref().unwrap_or("built-in defaults"),
                    snapshot.source,
                    snapshot.config.training.max_iterations,
                    snapshot.config.training.epsilon
                ),
                OutputFormat::Md => config_markdown(&snapshot),
            };
            write_payload(None, &rendered)
        }
        ConfigCommands::Validate { path } => {
            let (path, sha256) = match path {
                Some(path) => {
                    let (_, sha256) = load_config_file(path)?;
                    (Some(path.display().to_string()), Some(sha256))
                }
                None => {
                    let resolved = load_config(global.config.as_deref())?;
                    (
                        resolved.path.as_ref().map(|p| p.display().to_string()),
                        resolved.sha256,
                    )
                }
            };
            let rendered = match global.format {
                OutputFormat::Json => serde_json::to_string_pretty(&serde_json::json!({
                    "status": "valid",
                    "path": path,
                    "sha256": sha256,
                }))?,
                _ => format!(
                    "valid: {}",
                    path.as_deref().unwrap_or("built-in defaults")
                ),
            };
            write_payload(None, &rendered)
        }
    }
}

fn config_markdown(snapshot: &ConfigSnapshot) -> String {
    let training = &snapshot.config.training;
    format!(
        "# Effective configuration\n\n\
         - Source: {}\n\
         - Path: {}\n\
         - SHA-256: {}\n\n\
         | key | value |\n|---|---|\n\
         | training.max_iterations | {} |\n\
         | training.epsilon | {:e} |\n\
         | training.parallel | {} |\n\
         | training.seed | {} |\n\
         | training.stochastic_tolerance | {:e} |\n\
         | output.precision | {} |",
        snapshot.source,
        snapshot.path.as_deref().unwrap_or("-"),
        snapshot.sha256.as_deref().unwrap_or("-"),
        training.max_iterations,
        training.epsilon,
        training.parallel,
        training
            .seed
            .map_or_else(|| "-".to_string(), |s| s.to_string()),
        training.stochastic_tolerance,
        snapshot.config.output.precision
    )
}

fn run_completions(args: &CompletionsArgs) -> Result<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(args.shell, &mut cmd, name, &mut std::io::stdout());
    Ok(())
}

fn print_version(global: &GlobalOpts) -> Result<()> {
    let rendered = match global.format {
        OutputFormat::Json => serde_json::to_string_pretty(&serde_json::json!({
            "hmm_train_version": env!("CARGO_PKG_VERSION"),
            "config_schema_version": hmm_config::CONFIG_SCHEMA_VERSION,
            "parallel": cfg!(feature = "parallel"),
        }))?,
        _ => format!(
            "hmm-train {}\nconfig schema version: {}",
            env!("CARGO_PKG_VERSION"),
            hmm_config::CONFIG_SCHEMA_VERSION
        ),
    };
    write_payload(None, &rendered)
}

// ============================================================================
// Helpers
// ============================================================================

fn resolve_config(global: &GlobalOpts, ctx: &LogContext) -> Result<ResolvedConfig> {
    let resolved = load_config(global.config.as_deref())?;
    match &resolved.path {
        Some(path) => log_event!(
            ctx,
            INFO,
            event_names::CONFIG_LOADED,
            Stage::Init,
            "configuration loaded",
            path = tracing::field::display(path.display()),
            source = tracing::field::display(resolved.source)
        ),
        None => log_event!(
            ctx,
            DEBUG,
            event_names::CONFIG_DEFAULT_USED,
            Stage::Init,
            "no config file found, using built-in defaults"
        ),
    }
    Ok(resolved)
}

fn format_for(path: Option<&Path>) -> InputFormat {
    path.map_or(InputFormat::Text, InputFormat::from_path)
}

fn read_source(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) if path != Path::new("-") => Ok(std::fs::read_to_string(path)?),
        _ => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
    }
}

fn write_payload(path: Option<&Path>, text: &str) -> Result<()> {
    match path {
        Some(path) => std::fs::write(path, format!("{text}\n"))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{text}")?;
            stdout.flush()?;
        }
    }
    Ok(())
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}
