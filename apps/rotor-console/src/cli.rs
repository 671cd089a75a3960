use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use rotor_proto::{DEFAULT_HTTP_PORT, DEFAULT_STREAM_PORT};
use rotor_sync::EndpointConfig;

use crate::logging::{LogConfig, LogLevel, Subsystem};

#[derive(Parser, Debug)]
#[command(
    name = "rotor-console",
    about = "Monitor and command a rotor stick controller from the terminal",
    author,
    version
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        env = "ROTOR_CONTROLLER",
        default_value = "127.0.0.1",
        help = "Controller host, optionally with a ws://, wss://, http:// or https:// prefix"
    )]
    pub controller: String,

    #[arg(
        long,
        global = true,
        env = "ROTOR_HTTP_PORT",
        default_value_t = DEFAULT_HTTP_PORT,
        help = "Port of the controller's HTTP API"
    )]
    pub http_port: u16,

    #[arg(
        long,
        global = true,
        env = "ROTOR_STREAM_PORT",
        default_value_t = DEFAULT_STREAM_PORT,
        help = "Port of the controller's push stream"
    )]
    pub stream_port: u16,

    #[arg(
        long,
        global = true,
        env = "ROTOR_TLS",
        default_value_t = false,
        help = "Use wss:// and https:// even for a bare host"
    )]
    pub tls: bool,

    #[arg(
        long,
        global = true,
        env = "ROTOR_RECONNECT_MS",
        default_value_t = 2_000,
        help = "Delay before redialing a closed push stream"
    )]
    pub reconnect_ms: u64,

    #[command(flatten)]
    pub logging: LoggingArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Follow the controller and accept operator commands on stdin (default)
    Run(RunArgs),
    /// Print the controller's log ring, newest first
    Logs,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    #[arg(
        long = "capture-file",
        value_name = "PATH",
        env = "ROTOR_CAPTURE_FILE",
        help = "Append captured telemetry lines to this file on exit"
    )]
    pub capture_file: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct LoggingArgs {
    #[arg(
        long = "log-level",
        value_enum,
        global = true,
        env = "ROTOR_LOG_LEVEL",
        default_value_t = LogLevel::Info,
        help = "Minimum log level (error, warn, info, debug, trace)"
    )]
    pub level: LogLevel,

    #[arg(
        long = "log-file",
        value_name = "PATH",
        global = true,
        env = "ROTOR_LOG_FILE",
        help = "Write logs to the specified file instead of stderr"
    )]
    pub file: Option<PathBuf>,

    #[arg(
        long = "trace",
        value_enum,
        value_delimiter = ',',
        value_name = "SUBSYSTEM",
        global = true,
        env = "ROTOR_TRACE",
        help = "Log these subsystems at trace (link, normalize, command, session, capture, console)"
    )]
    pub traced: Vec<Subsystem>,
}

impl LoggingArgs {
    pub fn to_config(&self) -> LogConfig {
        LogConfig {
            level: self.level,
            file: self.file.clone(),
            traced: self.traced.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Mode {
    Run { capture_file: Option<PathBuf> },
    Logs,
}

/// Validated console settings.
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    pub endpoint: EndpointConfig,
    pub logging: LogConfig,
    pub mode: Mode,
}

impl TryFrom<Cli> for ConsoleConfig {
    type Error = anyhow::Error;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        if cli.reconnect_ms == 0 {
            anyhow::bail!("--reconnect-ms must be greater than zero");
        }
        let endpoint = EndpointConfig::new(&cli.controller)
            .with_context(|| format!("invalid controller: {}", cli.controller))?
            .with_ports(cli.http_port, cli.stream_port)
            .with_reconnect_delay(Duration::from_millis(cli.reconnect_ms));
        // An explicit secure scheme wins over a missing --tls flag.
        let endpoint = if cli.tls {
            endpoint.with_tls(true)
        } else {
            endpoint
        };
        endpoint
            .stream_url()
            .context("controller does not form a valid stream url")?;

        let mode = match cli.command.unwrap_or(Command::Run(RunArgs::default())) {
            Command::Run(args) => Mode::Run {
                capture_file: args.capture_file,
            },
            Command::Logs => Mode::Logs,
        };

        Ok(ConsoleConfig {
            endpoint,
            logging: cli.logging.to_config(),
            mode,
        })
    }
}
