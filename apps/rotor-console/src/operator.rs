//! Line-oriented operator commands read from stdin.

use rotor_proto::PidPatch;
use rotor_sync::{Command, EditableField, HorizontalSelect, Operator, TargetAxis, VerticalSelect};
use thiserror::Error;

pub const HELP: &str = "\
commands:
  ap on|off                 engage or disengage the autopilot
  hmode roll|hdg            select horizontal mode
  vmode pitch|vs            select vertical mode
  alts arm|disarm           arm altitude hold
  hdg <deg> | vs <fpm> | alt <ft>
                            set a target directly
  pitch <+/-deg> | roll <+/-deg>
                            nudge the attitude target
  pid pitch|roll <kp> <ki> <kd> | pid heading|vs <kp>
  feedback on|off           cyclic force feedback
  record on|off             telemetry recording
  edit hdg|vs|alt [value]   hold a field against pushed updates
  commit hdg|vs|alt         send the edited value
  cancel hdg|vs|alt         drop the edit
  status | help | quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Operator(Operator),
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("unknown command {0:?}; try `help`")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("not a number: {0:?}")]
    Number(String),
}

/// Parse one line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<Input>, ParseError> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((&head, args)) = words.split_first() else {
        return Ok(None);
    };

    let command = |command: Command| Ok(Some(Input::Operator(Operator::Command(command))));
    let op = |op: Operator| Ok(Some(Input::Operator(op)));

    match (head, args) {
        ("ap", [state]) => command(Command::SetAutopilotEnabled(on_off(state, "ap on|off")?)),
        ("hmode", ["roll"]) => command(Command::SetHorizontalMode(HorizontalSelect::Roll)),
        ("hmode", ["hdg"]) => command(Command::SetHorizontalMode(HorizontalSelect::Heading)),
        ("hmode", _) => Err(ParseError::Usage("hmode roll|hdg")),
        ("vmode", ["pitch"]) => command(Command::SetVerticalMode(VerticalSelect::Pitch)),
        ("vmode", ["vs"]) => command(Command::SetVerticalMode(VerticalSelect::VerticalSpeed)),
        ("vmode", _) => Err(ParseError::Usage("vmode pitch|vs")),
        ("alts", ["arm"]) => command(Command::SetAltitudeHoldArmed(true)),
        ("alts", ["disarm"]) => command(Command::SetAltitudeHoldArmed(false)),
        ("alts", _) => Err(ParseError::Usage("alts arm|disarm")),
        ("hdg", [value]) => command(Command::SetSelectedHeading(number(value)?)),
        ("vs", [value]) => command(Command::SetSelectedVerticalSpeed(number(value)?)),
        ("alt", [value]) => command(Command::SetSelectedAltitude(number(value)?)),
        ("pitch", [delta]) => op(Operator::AdjustTarget {
            axis: TargetAxis::Pitch,
            delta: number(delta)?,
        }),
        ("roll", [delta]) => op(Operator::AdjustTarget {
            axis: TargetAxis::Roll,
            delta: number(delta)?,
        }),
        ("pid", [axis, rest @ ..]) => command(Command::SetPidGains(pid_patch(axis, rest)?)),
        ("feedback", [state]) => {
            command(Command::SetCyclicFeedback(on_off(state, "feedback on|off")?))
        }
        ("record", [state]) => {
            command(Command::SetTelemetryRecording(on_off(state, "record on|off")?))
        }
        ("edit", [name]) => op(Operator::BeginEdit(field(name, "edit hdg|vs|alt [value]")?)),
        ("edit", [name, value]) => op(Operator::EditValue(
            field(name, "edit hdg|vs|alt [value]")?,
            number(value)?,
        )),
        ("commit", [name]) => op(Operator::CommitEdit(field(name, "commit hdg|vs|alt")?)),
        ("cancel", [name]) => op(Operator::EndEdit(field(name, "cancel hdg|vs|alt")?)),
        ("status", []) => op(Operator::Status),
        ("help" | "?", _) => Ok(Some(Input::Help)),
        ("quit" | "exit", []) => Ok(Some(Input::Quit)),
        ("ap" | "hdg" | "vs" | "alt" | "pitch" | "roll" | "feedback" | "record", _) => {
            Err(ParseError::Usage(usage_for(head)))
        }
        ("pid", _) => Err(ParseError::Usage(PID_USAGE)),
        ("edit" | "commit" | "cancel" | "status" | "quit" | "exit", _) => {
            Err(ParseError::Usage(usage_for(head)))
        }
        _ => Err(ParseError::Unknown(head.to_owned())),
    }
}

const PID_USAGE: &str = "pid pitch|roll <kp> <ki> <kd> | pid heading|vs <kp>";

fn usage_for(head: &str) -> &'static str {
    match head {
        "ap" => "ap on|off",
        "hdg" => "hdg <deg>",
        "vs" => "vs <fpm>",
        "alt" => "alt <ft>",
        "pitch" => "pitch <+/-deg>",
        "roll" => "roll <+/-deg>",
        "feedback" => "feedback on|off",
        "record" => "record on|off",
        "edit" => "edit hdg|vs|alt [value]",
        "commit" => "commit hdg|vs|alt",
        "cancel" => "cancel hdg|vs|alt",
        "status" => "status",
        _ => "quit",
    }
}

fn on_off(word: &str, usage: &'static str) -> Result<bool, ParseError> {
    match word {
        "on" => Ok(true),
        "off" => Ok(false),
        _ => Err(ParseError::Usage(usage)),
    }
}

fn number(word: &str) -> Result<f64, ParseError> {
    word.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| ParseError::Number(word.to_owned()))
}

fn field(name: &str, usage: &'static str) -> Result<EditableField, ParseError> {
    EditableField::from_short_name(name).ok_or(ParseError::Usage(usage))
}

fn pid_patch(axis: &str, values: &[&str]) -> Result<PidPatch, ParseError> {
    let mut patch = PidPatch::default();
    match (axis, values) {
        ("pitch", [kp, ki, kd]) => {
            patch.pitch_kp = Some(number(kp)?);
            patch.pitch_ki = Some(number(ki)?);
            patch.pitch_kd = Some(number(kd)?);
        }
        ("roll", [kp, ki, kd]) => {
            patch.roll_kp = Some(number(kp)?);
            patch.roll_ki = Some(number(ki)?);
            patch.roll_kd = Some(number(kd)?);
        }
        ("heading", [kp]) => patch.heading_kp = Some(number(kp)?),
        ("vs", [kp]) => patch.vs_kp = Some(number(kp)?),
        _ => return Err(ParseError::Usage(PID_USAGE)),
    }
    Ok(patch)
}
