use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::OnceLock;

use clap::ValueEnum;
use tracing::debug;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const FILTER_ENV: &str = "ROTOR_LOG_FILTER";
const TRACE_DEPS_ENV: &str = "ROTOR_TRACE_DEPS";

#[derive(Clone, Copy, Debug, Default, ValueEnum, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Parts of the client that log under their own `rotor.*` target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Subsystem {
    Link,
    Normalize,
    Command,
    Session,
    Capture,
    Console,
}

impl Subsystem {
    pub fn target(self) -> &'static str {
        match self {
            Subsystem::Link => "rotor.link",
            Subsystem::Normalize => "rotor.normalize",
            Subsystem::Command => "rotor.command",
            Subsystem::Session => "rotor.session",
            Subsystem::Capture => "rotor.capture",
            Subsystem::Console => "rotor.console",
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct LogConfig {
    pub level: LogLevel,
    pub file: Option<PathBuf>,
    /// Subsystems logged at `trace` regardless of `level`.
    pub traced: Vec<Subsystem>,
}

#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error("failed to open log file {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to configure logger: {0}")]
    Configure(String),
}

static GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Install the global subscriber. Later calls are no-ops.
pub fn init(config: &LogConfig) -> Result<(), InitError> {
    if GUARD.get().is_some() {
        return Ok(());
    }

    let directives = match std::env::var(FILTER_ENV) {
        Ok(filter) => filter,
        Err(_) => {
            let allow_deps = std::env::var(TRACE_DEPS_ENV)
                .map(|value| value != "0" && !value.is_empty())
                .unwrap_or(false);
            directives_for(config.level, &config.traced, allow_deps)
        }
    };
    let env_filter = EnvFilter::try_new(&directives)
        .map_err(|err| InitError::Configure(format!("{directives:?}: {err}")))?;

    let (writer, guard) = match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| InitError::Io {
                    path: path.clone(),
                    source,
                })?;
            tracing_appender::non_blocking(file)
        }
        None => tracing_appender::non_blocking(std::io::stderr()),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_level(true)
        .with_target(config.level >= LogLevel::Debug || !config.traced.is_empty())
        .with_ansi(config.file.is_none())
        .with_writer(writer)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|err| InitError::Configure(err.to_string()))?;

    let _ = GUARD.set(guard);
    debug!(target: "rotor.console", filter = %directives, "logging initialised");
    Ok(())
}

/// Filter directives: every `rotor.*` target follows `level`, traced
/// subsystems go to `trace`, and dependencies stay at `info` or quieter
/// unless `allow_deps` is set.
fn directives_for(level: LogLevel, traced: &[Subsystem], allow_deps: bool) -> String {
    let deps = if allow_deps {
        level
    } else {
        level.min(LogLevel::Info)
    };
    let mut directives = format!("{},rotor={}", deps.directive(), level.directive());
    for subsystem in traced {
        directives.push_str(&format!(",{}=trace", subsystem.target()));
    }
    directives
}
