//! Tracing subscriber setup.
//!
//! Logs go to stderr so stdout stays clean for command output and `--json`.
//! `GIT_ISSUE_LOG` replaces the computed filter entirely;
//! `GIT_ISSUE_LOG_FORMAT=json` switches to one JSON object per line.

use std::env;
use std::str::FromStr;

use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Environment variable holding an `EnvFilter` directive.
pub const LOG_ENV: &str = "GIT_ISSUE_LOG";
/// Environment variable selecting the log format.
pub const LOG_FORMAT_ENV: &str = "GIT_ISSUE_LOG_FORMAT";

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "compact" | "text" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// The default filter directive for the given verbosity.
#[must_use]
pub fn default_directive(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn",
        1 => "git_issue=info,issue_core=info,warn",
        2 => "git_issue=debug,issue_core=debug,info",
        _ => "trace",
    }
}

/// Install the global subscriber.
///
/// `format` wins over `GIT_ISSUE_LOG_FORMAT`; an unrecognised value in the
/// environment falls back to compact output.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging(verbose: u8, quiet: bool, format: Option<LogFormat>) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet)));

    let format = format.unwrap_or_else(|| {
        env::var(LOG_FORMAT_ENV)
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or_default()
    });

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_target(false).with_writer(std::io::stderr))
            .try_init(),
    }
}
