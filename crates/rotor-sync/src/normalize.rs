//! Maps pushed documents of either wire generation onto [`Snapshot`].
//!
//! Modern `sensors`/`joystick` sections are the base. When a frame also
//! carries the legacy `axes` triplet, each legacy value only fills a field
//! the modern section left absent; legacy data never overrides modern data
//! from the same frame. A frame that cannot be mapped is rejected as a
//! whole so nothing is partially applied.

use rotor_proto::{RawAutopilot, RawFrame, RawJoystick, RawSensors, RawSimulator};
use serde_json::Value;
use thiserror::Error;

use crate::model::{
    clamp_axis, wrap_heading, AutopilotState, HorizontalMode, Joystick, PidGains, Sensors,
    SimulatorState, Snapshot, VerticalMode, AXIS_CENTER,
};

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("frame is not valid utf-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("frame could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("frame is not a json object")]
    NotAnObject,
    #[error("malformed {field}: {reason}")]
    Malformed { field: &'static str, reason: String },
}

pub type NormalizeResult<T> = Result<T, NormalizeError>;

pub fn normalize(text: &str) -> NormalizeResult<Snapshot> {
    normalize_with(text, None)
}

pub fn normalize_bytes(bytes: &[u8]) -> NormalizeResult<Snapshot> {
    normalize_bytes_with(bytes, None)
}

/// Normalize a pushed frame that follows an earlier snapshot.
///
/// A frame without an `autopilot` section says nothing about the autopilot,
/// so `previous` is carried over instead of being reset.
pub fn normalize_with(
    text: &str,
    previous: Option<&AutopilotState>,
) -> NormalizeResult<Snapshot> {
    let value: Value = serde_json::from_str(text)?;
    normalize_value(value, previous)
}

pub fn normalize_bytes_with(
    bytes: &[u8],
    previous: Option<&AutopilotState>,
) -> NormalizeResult<Snapshot> {
    normalize_with(std::str::from_utf8(bytes)?, previous)
}

pub fn normalize_value(value: Value, previous: Option<&AutopilotState>) -> NormalizeResult<Snapshot> {
    if !value.is_object() {
        return Err(NormalizeError::NotAnObject);
    }
    let frame: RawFrame = serde_json::from_value(value)?;
    normalize_frame(frame, previous)
}

pub fn normalize_frame(
    frame: RawFrame,
    previous: Option<&AutopilotState>,
) -> NormalizeResult<Snapshot> {
    let mut sensors = frame.sensors.unwrap_or_default();
    let mut joystick = frame.joystick.unwrap_or_default();

    if let Some(axes) = frame.axes.as_deref() {
        let axis = |index: usize| axes.get(index).copied().flatten();
        sensors.cyclic_x = sensors.cyclic_x.or(axis(0));
        sensors.cyclic_y = sensors.cyclic_y.or(axis(1));
        sensors.collective = sensors.collective.or(axis(2));
        joystick.cyclic_x = joystick.cyclic_x.or(axis(0));
        joystick.cyclic_y = joystick.cyclic_y.or(axis(1));
        joystick.buttons = joystick.buttons.or(frame.buttons);
        sensors.raw_x = sensors.raw_x.or(frame.raw_x);
        sensors.raw_y = sensors.raw_y.or(frame.raw_y);
        sensors.raw_z = sensors.raw_z.or(frame.raw_z);
        sensors.cyclic_valid = sensors.cyclic_valid.or(frame.cyclic_valid);
    }

    // A present section is the full autopilot state, so it lays over the
    // defaults rather than over `previous`.
    let autopilot = match frame.autopilot {
        Some(raw) => merge_autopilot(&AutopilotState::default(), raw)?,
        None => previous.cloned().unwrap_or_default(),
    };

    Ok(Snapshot {
        sensors: sensors_from_raw(sensors),
        joystick: joystick_from_raw(joystick),
        autopilot,
        simulator: frame.simulator.map(simulator_from_raw).unwrap_or_default(),
        telemetry: frame.telemetry,
        cyclic_feedback_enabled: frame.cyclic_feedback_enabled.unwrap_or(false),
    })
}

/// Lay a (possibly partial) autopilot section over `base`.
///
/// Pushed frames use the default state as base. Command replies use the
/// current state so a reply that omits a field leaves it as it was.
pub fn merge_autopilot(base: &AutopilotState, raw: RawAutopilot) -> NormalizeResult<AutopilotState> {
    let horizontal_mode = match raw.horizontal_mode.as_deref() {
        Some(name) => HorizontalMode::from_wire(name).ok_or_else(|| NormalizeError::Malformed {
            field: "autopilot.horizontalMode",
            reason: format!("unknown mode {name:?}"),
        })?,
        None => base.horizontal_mode,
    };
    let vertical_mode = match raw.vertical_mode.as_deref() {
        Some(name) => VerticalMode::from_wire(name).ok_or_else(|| NormalizeError::Malformed {
            field: "autopilot.verticalMode",
            reason: format!("unknown mode {name:?}"),
        })?,
        None => base.vertical_mode,
    };

    let gains = PidGains {
        pitch_kp: raw.pitch_kp.unwrap_or(base.gains.pitch_kp),
        pitch_ki: raw.pitch_ki.unwrap_or(base.gains.pitch_ki),
        pitch_kd: raw.pitch_kd.unwrap_or(base.gains.pitch_kd),
        roll_kp: raw.roll_kp.unwrap_or(base.gains.roll_kp),
        roll_ki: raw.roll_ki.unwrap_or(base.gains.roll_ki),
        roll_kd: raw.roll_kd.unwrap_or(base.gains.roll_kd),
        heading_kp: raw.heading_kp.unwrap_or(base.gains.heading_kp),
        vs_kp: raw.vs_kp.unwrap_or(base.gains.vs_kp),
    };

    Ok(AutopilotState {
        enabled: raw.enabled.unwrap_or(base.enabled),
        horizontal_mode,
        vertical_mode,
        selected_roll: raw.selected_roll.or(base.selected_roll),
        selected_pitch: raw.selected_pitch.or(base.selected_pitch),
        selected_heading: raw.selected_heading.map(wrap_heading).or(base.selected_heading),
        selected_vertical_speed: raw.selected_vertical_speed.or(base.selected_vertical_speed),
        selected_altitude: raw.selected_altitude.or(base.selected_altitude),
        captured_altitude: raw.captured_altitude.or(base.captured_altitude),
        alt_hold_armed: raw.alt_hold_armed.unwrap_or(base.alt_hold_armed),
        gains,
    })
}

fn sensors_from_raw(raw: RawSensors) -> Sensors {
    Sensors {
        cyclic_x: axis_or_center(raw.cyclic_x),
        cyclic_y: axis_or_center(raw.cyclic_y),
        collective: axis_or_center(raw.collective),
        raw_x: raw.raw_x,
        raw_y: raw.raw_y,
        raw_z: raw.raw_z,
        cyclic_valid: raw.cyclic_valid.unwrap_or(false),
    }
}

fn joystick_from_raw(raw: RawJoystick) -> Joystick {
    Joystick {
        cyclic_x: axis_or_center(raw.cyclic_x),
        cyclic_y: axis_or_center(raw.cyclic_y),
        collective: raw.collective.map(clamp_axis),
        buttons: raw.buttons.unwrap_or(0),
    }
}

fn simulator_from_raw(raw: RawSimulator) -> SimulatorState {
    SimulatorState {
        speed: raw.speed.unwrap_or_default(),
        altitude: raw.altitude.unwrap_or_default(),
        heading: raw.heading.unwrap_or_default(),
        vertical_speed: raw.vertical_speed.unwrap_or_default(),
        pitch: raw.pitch.unwrap_or_default(),
        roll: raw.roll.unwrap_or_default(),
        last_sim_data_age_ms: raw
            .last_sim_data_age_ms
            .filter(|age| age.is_finite())
            .map(|age| age.max(0.0).round() as u64),
    }
}

fn axis_or_center(value: Option<f64>) -> u16 {
    value.map(clamp_axis).unwrap_or(AXIS_CENTER)
}
