//! Run-scoped structured logging on stderr.
//!
//! stdout carries only command payloads (reports, scores, sampled corpora),
//! so logs never mix with output that is piped into another command. Events
//! use stable targets from [`event_names`] and carry the run id and
//! subcommand of a [`LogContext`]:
//!
//! ```ignore
//! let ctx = LogContext::new(generate_run_id(), "train");
//! log_event!(ctx, INFO, event_names::TRAIN_STARTED, Stage::Train, "starting EM",
//!     sequences = 12);
//! ```

pub mod config;
pub mod events;

pub use config::{LogConfig, LogEnv, LogFormat, LogLevel};
pub use events::{event_names, LogContext, Stage};

use std::io::IsTerminal;
use std::sync::Once;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

static INIT: Once = Once::new();

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber writing to stderr.
///
/// Only the first call has an effect. A full `RUST_LOG` directive string
/// replaces the level filter derived from `config`.
pub fn init_logging(config: &LogConfig) {
    let config = config.clone();
    INIT.call_once(move || {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.level.to_string()));

        let layer = stderr_layer(&config).with_filter(filter);
        if let Err(err) = tracing_subscriber::registry().with(layer).try_init() {
            eprintln!("warning: logging already initialized: {err}");
        }
    });
}

fn stderr_layer(config: &LogConfig) -> BoxedLayer {
    match config.format {
        LogFormat::Jsonl => fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_span_list(false)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Human => {
            let human = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_ansi(std::io::stderr().is_terminal());
            if config.timestamps {
                human.boxed()
            } else {
                human.without_time().boxed()
            }
        }
    }
}

/// Initialize logging with defaults (for tests and simple cases).
pub fn init_default_logging() {
    init_logging(&LogConfig::from_env(None, None));
}

/// Generate a unique run ID for this invocation.
pub fn generate_run_id() -> String {
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    format!("run-{}", &uuid[..12])
}

/// Structured event logging with run context.
///
/// ```ignore
/// log_event!(ctx, INFO, event_names::TRAIN_ITERATION, Stage::Train, "iteration done",
///     iter = 3, log_likelihood = -41.2);
/// ```
#[macro_export]
macro_rules! log_event {
    ($ctx:expr, INFO, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)*) => {
        tracing::info!(
            target: $event,
            run_id = %$ctx.run_id,
            command = %$ctx.command,
            stage = %$stage,
            $($key = $val,)*
            "{}", $msg
        )
    };
    ($ctx:expr, DEBUG, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)*) => {
        tracing::debug!(
            target: $event,
            run_id = %$ctx.run_id,
            command = %$ctx.command,
            stage = %$stage,
            $($key = $val,)*
            "{}", $msg
        )
    };
    ($ctx:expr, WARN, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)*) => {
        tracing::warn!(
            target: $event,
            run_id = %$ctx.run_id,
            command = %$ctx.command,
            stage = %$stage,
            $($key = $val,)*
            "{}", $msg
        )
    };
    ($ctx:expr, ERROR, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)*) => {
        tracing::error!(
            target: $event,
            run_id = %$ctx.run_id,
            command = %$ctx.command,
            stage = %$stage,
            $($key = $val,)*
            "{}", $msg
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_run_id() {
        let id1 = generate_run_id();
        let id2 = generate_run_id();

        assert!(id1.starts_with("run-"));
        assert_ne!(id1, id2);
        assert_eq!(id1.len(), 16);
        assert!(id1[4..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_log_context_creation() {
        let ctx = LogContext::new("run-123", "train");
        assert_eq!(ctx.run_id, "run-123");
        assert_eq!(ctx.command, "train");
    }

    #[test]
    fn test_init_is_idempotent() {
        let config = LogConfig::default().with_level(LogLevel::Off);
        init_logging(&config);
        init_logging(&config);
        let ctx = LogContext::new("run-test", "test");
        crate::log_event!(ctx, DEBUG, event_names::RUN_STARTED, Stage::Init, "noop", n = 1);
    }
}
