mod cli;
mod logging;
mod operator;
mod render;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use rotor_sync::{spawn_session, ControlClient, EndpointConfig};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};

use cli::{Cli, ConsoleConfig, Mode};
use operator::{parse_line, Input, HELP};
use render::ConsoleObserver;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ConsoleConfig::try_from(cli)?;
    logging::init(&config.logging).context("failed to initialise logging")?;

    match config.mode {
        Mode::Run { capture_file } => run(&config.endpoint, capture_file.as_deref()).await,
        Mode::Logs => print_logs(&config.endpoint).await,
    }
}

async fn run(endpoint: &EndpointConfig, capture_file: Option<&Path>) -> Result<()> {
    let session = spawn_session(endpoint, ConsoleObserver::new(std::io::stdout()))
        .context("failed to start session")?;
    let stream_url = endpoint.stream_url()?;
    let http_base = endpoint.http_base()?;
    info!(
        target: "rotor.console",
        stream = %stream_url,
        http = %http_base,
        "monitoring controller; type `help` for commands"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                match parse_line(&line) {
                    Ok(None) => {}
                    Ok(Some(Input::Operator(op))) => {
                        if !session.handle.send(op) {
                            warn!(target: "rotor.console", "session engine stopped");
                            break;
                        }
                    }
                    Ok(Some(Input::Help)) => println!("{HELP}"),
                    Ok(Some(Input::Quit)) => break,
                    Err(err) => eprintln!("{err}"),
                }
            }
        }
    }

    session.handle.shutdown();
    let mut state = session.engine.await.context("session engine failed")?;
    if let Err(err) = session.link.await {
        warn!(target: "rotor.console", error = %err, "connection task failed");
    }

    if let Some(path) = capture_file {
        let captured = state.capture_mut().take();
        export_capture(path, &captured).await?;
    }
    Ok(())
}

async fn export_capture(path: &Path, captured: &str) -> Result<()> {
    if captured.is_empty() {
        info!(target: "rotor.console", path = %path.display(), "no telemetry captured");
        return Ok(());
    }
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .with_context(|| format!("failed to open capture file {}", path.display()))?;
    file.write_all(captured.as_bytes())
        .await
        .with_context(|| format!("failed to write capture file {}", path.display()))?;
    file.flush().await?;
    info!(
        target: "rotor.console",
        path = %path.display(),
        lines = captured.lines().count(),
        "telemetry capture exported"
    );
    Ok(())
}

async fn print_logs(endpoint: &EndpointConfig) -> Result<()> {
    let client = ControlClient::new(endpoint.http_base()?);
    let mut entries = client
        .fetch_logs()
        .await
        .with_context(|| format!("failed to fetch logs from {}", client.base_url()))?;
    entries.reverse();
    for entry in &entries {
        println!("{}", render::log_line(entry));
    }
    Ok(())
}
