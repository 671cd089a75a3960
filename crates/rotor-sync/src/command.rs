//! Control commands and the HTTP client that carries them.
//!
//! Commands are fire-and-forget from the caller's point of view: the
//! [`CommandDispatcher`] spawns the request and hands the outcome back to
//! the session engine as an event. The engine applies the server's reply;
//! the request itself never touches local state, so a rejected or reordered
//! command cannot leave the local view ahead of the controller.

use reqwest::{Client, Response, StatusCode};
use rotor_proto::{
    AltArmForm, AutopilotPatch, CommandReply, EnabledBody, LogEntry, PidPatch, PATH_ALT_ARM,
    PATH_AUTOPILOT, PATH_CYCLIC_FEEDBACK, PATH_LOGS, PATH_PID, PATH_STATE, PATH_TELEMETRY,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use url::Url;

use crate::model::{wrap_heading, HorizontalMode, Snapshot, VerticalMode};
use crate::normalize::normalize;
use crate::session::EngineEvent;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status: {status} body={body}")]
    UnexpectedStatus { status: StatusCode, body: String },
    #[error("could not decode reply: {0}")]
    Decode(String),
    #[error("invalid endpoint url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Horizontal modes the operator may select directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalSelect {
    Roll,
    Heading,
}

impl From<HorizontalSelect> for HorizontalMode {
    fn from(value: HorizontalSelect) -> Self {
        match value {
            HorizontalSelect::Roll => HorizontalMode::Roll,
            HorizontalSelect::Heading => HorizontalMode::Heading,
        }
    }
}

/// Vertical modes the operator may select directly. Altitude hold is only
/// reached through arming and capture on the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalSelect {
    Pitch,
    VerticalSpeed,
}

impl From<VerticalSelect> for VerticalMode {
    fn from(value: VerticalSelect) -> Self {
        match value {
            VerticalSelect::Pitch => VerticalMode::Pitch,
            VerticalSelect::VerticalSpeed => VerticalMode::VerticalSpeed,
        }
    }
}

/// Attitude targets that can be nudged relative to their displayed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetAxis {
    Pitch,
    Roll,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetAutopilotEnabled(bool),
    SetHorizontalMode(HorizontalSelect),
    SetVerticalMode(VerticalSelect),
    SetAltitudeHoldArmed(bool),
    SetSelectedHeading(f64),
    SetSelectedVerticalSpeed(f64),
    SetSelectedAltitude(f64),
    SetSelectedPitch(f64),
    SetSelectedRoll(f64),
    SetPidGains(PidPatch),
    SetCyclicFeedback(bool),
    SetTelemetryRecording(bool),
}

enum ControlRequest {
    Json {
        path: &'static str,
        body: serde_json::Value,
    },
    Form {
        path: &'static str,
        form: AltArmForm,
    },
}

impl Command {
    pub fn label(&self) -> &'static str {
        match self {
            Command::SetAutopilotEnabled(_) => "autopilot_enabled",
            Command::SetHorizontalMode(_) => "horizontal_mode",
            Command::SetVerticalMode(_) => "vertical_mode",
            Command::SetAltitudeHoldArmed(_) => "alt_hold_armed",
            Command::SetSelectedHeading(_) => "selected_heading",
            Command::SetSelectedVerticalSpeed(_) => "selected_vertical_speed",
            Command::SetSelectedAltitude(_) => "selected_altitude",
            Command::SetSelectedPitch(_) => "selected_pitch",
            Command::SetSelectedRoll(_) => "selected_roll",
            Command::SetPidGains(_) => "pid_gains",
            Command::SetCyclicFeedback(_) => "cyclic_feedback",
            Command::SetTelemetryRecording(_) => "telemetry_recording",
        }
    }

    fn request(&self) -> Result<ControlRequest, CommandError> {
        let autopilot = |patch: AutopilotPatch| -> Result<ControlRequest, CommandError> {
            Ok(ControlRequest::Json {
                path: PATH_AUTOPILOT,
                body: to_body(&patch)?,
            })
        };
        match self {
            Command::SetAutopilotEnabled(enabled) => autopilot(AutopilotPatch {
                enabled: Some(*enabled),
                ..Default::default()
            }),
            Command::SetHorizontalMode(mode) => autopilot(AutopilotPatch {
                horizontal_mode: Some(HorizontalMode::from(*mode).as_wire().to_owned()),
                ..Default::default()
            }),
            Command::SetVerticalMode(mode) => autopilot(AutopilotPatch {
                vertical_mode: Some(VerticalMode::from(*mode).as_wire().to_owned()),
                ..Default::default()
            }),
            Command::SetSelectedHeading(heading) => autopilot(AutopilotPatch {
                selected_heading: Some(wrap_heading(*heading)),
                ..Default::default()
            }),
            Command::SetSelectedVerticalSpeed(vs) => autopilot(AutopilotPatch {
                selected_vertical_speed: Some(*vs),
                ..Default::default()
            }),
            Command::SetSelectedAltitude(altitude) => autopilot(AutopilotPatch {
                selected_altitude: Some(*altitude),
                ..Default::default()
            }),
            Command::SetSelectedPitch(pitch) => autopilot(AutopilotPatch {
                selected_pitch: Some(*pitch),
                ..Default::default()
            }),
            Command::SetSelectedRoll(roll) => autopilot(AutopilotPatch {
                selected_roll: Some(*roll),
                ..Default::default()
            }),
            Command::SetAltitudeHoldArmed(armed) => Ok(ControlRequest::Form {
                path: PATH_ALT_ARM,
                form: AltArmForm { armed: *armed },
            }),
            Command::SetPidGains(gains) => Ok(ControlRequest::Json {
                path: PATH_PID,
                body: to_body(gains)?,
            }),
            Command::SetCyclicFeedback(enabled) => Ok(ControlRequest::Json {
                path: PATH_CYCLIC_FEEDBACK,
                body: to_body(&EnabledBody { enabled: *enabled })?,
            }),
            Command::SetTelemetryRecording(enabled) => Ok(ControlRequest::Json {
                path: PATH_TELEMETRY,
                body: to_body(&EnabledBody { enabled: *enabled })?,
            }),
        }
    }
}

fn to_body<T: Serialize>(value: &T) -> Result<serde_json::Value, CommandError> {
    serde_json::to_value(value).map_err(|err| CommandError::Decode(err.to_string()))
}

/// Async request/response client for the controller's HTTP API.
#[derive(Debug, Clone)]
pub struct ControlClient {
    http: Client,
    base_url: Url,
}

impl ControlClient {
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn execute(&self, command: &Command) -> Result<CommandReply, CommandError> {
        let res = match command.request()? {
            ControlRequest::Json { path, body } => {
                self.http.post(self.url(path)?).json(&body).send().await?
            }
            ControlRequest::Form { path, form } => {
                self.http.post(self.url(path)?).form(&form).send().await?
            }
        };
        let body = success_body(res).await?;
        if body.trim().is_empty() {
            return Ok(CommandReply::default());
        }
        decode(&body)
    }

    /// One-shot read of the full state document, normalized like a pushed
    /// frame.
    pub async fn fetch_state(&self) -> Result<Snapshot, CommandError> {
        let res = self.http.get(self.url(PATH_STATE)?).send().await?;
        let body = success_body(res).await?;
        normalize(&body).map_err(|err| CommandError::Decode(err.to_string()))
    }

    /// One-shot read of the controller's log ring, oldest first.
    pub async fn fetch_logs(&self) -> Result<Vec<LogEntry>, CommandError> {
        let res = self.http.get(self.url(PATH_LOGS)?).send().await?;
        let body = success_body(res).await?;
        decode(&body)
    }

    fn url(&self, path: &str) -> Result<Url, CommandError> {
        Ok(self.base_url.join(path)?)
    }
}

async fn success_body(res: Response) -> Result<String, CommandError> {
    let status = res.status();
    if status.is_success() {
        Ok(res.text().await?)
    } else {
        let body = res.text().await.unwrap_or_default();
        Err(CommandError::UnexpectedStatus { status, body })
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, CommandError> {
    serde_json::from_str(body).map_err(|err| CommandError::Decode(err.to_string()))
}

/// Result of one dispatched command, delivered back to the engine.
#[derive(Debug)]
pub struct CommandOutcome {
    pub command: Command,
    pub result: Result<CommandReply, CommandError>,
}

/// Where the engine sends operator commands.
pub trait CommandSink: Send {
    fn dispatch(&self, command: Command);
}

impl<F> CommandSink for F
where
    F: Fn(Command) + Send,
{
    fn dispatch(&self, command: Command) {
        (self)(command)
    }
}

/// Issues commands on their own tasks and reports outcomes to the engine.
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    client: ControlClient,
    events: mpsc::UnboundedSender<EngineEvent>,
}

impl CommandDispatcher {
    pub fn new(client: ControlClient, events: mpsc::UnboundedSender<EngineEvent>) -> Self {
        Self { client, events }
    }

    /// Spawn the request and return immediately. No retries, no ordering
    /// between commands: replies may arrive in any order.
    pub fn spawn(&self, command: Command) -> JoinHandle<()> {
        let client = self.client.clone();
        let events = self.events.clone();
        debug!(target: "rotor.command", command = command.label(), "dispatching command");
        tokio::spawn(async move {
            let result = client.execute(&command).await;
            if let Err(err) = &result {
                warn!(
                    target: "rotor.command",
                    command = command.label(),
                    error = %err,
                    "control command failed"
                );
            }
            if events
                .send(EngineEvent::CommandDone(CommandOutcome { command, result }))
                .is_err()
            {
                debug!(target: "rotor.command", "session engine gone; dropping outcome");
            }
        })
    }
}

impl CommandSink for CommandDispatcher {
    fn dispatch(&self, command: Command) {
        let _ = self.spawn(command);
    }
}
