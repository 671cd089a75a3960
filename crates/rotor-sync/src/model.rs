//! Canonical state model.
//!
//! Every other module reads and writes these types only. A [`Snapshot`] is
//! produced once per pushed frame and then shared as `Arc<Snapshot>`;
//! consumers treat it as frozen. Command replies produce a fresh snapshot
//! through [`Snapshot::with_autopilot`] instead of mutating in place.

use std::fmt;

/// Lower bound of every calibrated axis.
pub const AXIS_MIN: u16 = 0;
/// Upper bound of every calibrated axis.
pub const AXIS_MAX: u16 = 10_000;
/// Value an axis takes before any reading has arrived.
pub const AXIS_CENTER: u16 = 5_000;
/// Number of joystick buttons carried in the bitmask.
pub const BUTTON_COUNT: u8 = 32;

/// Clamp an arbitrary reading onto the 0–10000 axis scale.
///
/// Out-of-range input is clamped, never rejected. Non-finite values fall
/// back to the centre.
pub fn clamp_axis(value: f64) -> u16 {
    if !value.is_finite() {
        return AXIS_CENTER;
    }
    value.round().clamp(f64::from(AXIS_MIN), f64::from(AXIS_MAX)) as u16
}

/// Wrap a heading into `[0, 360)`.
pub fn wrap_heading(degrees: f64) -> f64 {
    if !degrees.is_finite() {
        return 0.0;
    }
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs.
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sensors {
    pub cyclic_x: u16,
    pub cyclic_y: u16,
    pub collective: u16,
    pub raw_x: Option<i64>,
    pub raw_y: Option<i64>,
    pub raw_z: Option<i64>,
    pub cyclic_valid: bool,
}

impl Default for Sensors {
    fn default() -> Self {
        Self {
            cyclic_x: AXIS_CENTER,
            cyclic_y: AXIS_CENTER,
            collective: AXIS_CENTER,
            raw_x: None,
            raw_y: None,
            raw_z: None,
            cyclic_valid: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Joystick {
    pub cyclic_x: u16,
    pub cyclic_y: u16,
    /// Collective output; older firmware does not report it.
    pub collective: Option<u16>,
    /// Bit `i` set means button `i` is pressed.
    pub buttons: u32,
}

impl Default for Joystick {
    fn default() -> Self {
        Self {
            cyclic_x: AXIS_CENTER,
            cyclic_y: AXIS_CENTER,
            collective: None,
            buttons: 0,
        }
    }
}

impl Joystick {
    pub fn is_pressed(&self, button: u8) -> bool {
        button < BUTTON_COUNT && self.buttons & (1u32 << button) != 0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum HorizontalMode {
    #[default]
    Off,
    Roll,
    Heading,
}

impl HorizontalMode {
    pub fn as_wire(self) -> &'static str {
        match self {
            HorizontalMode::Off => "off",
            HorizontalMode::Roll => "roll",
            HorizontalMode::Heading => "hdg",
        }
    }

    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "off" => Some(HorizontalMode::Off),
            "roll" => Some(HorizontalMode::Roll),
            "hdg" => Some(HorizontalMode::Heading),
            _ => None,
        }
    }
}

impl fmt::Display for HorizontalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum VerticalMode {
    #[default]
    Off,
    Pitch,
    VerticalSpeed,
    AltitudeHold,
}

impl VerticalMode {
    pub fn as_wire(self) -> &'static str {
        match self {
            VerticalMode::Off => "off",
            VerticalMode::Pitch => "pitch",
            VerticalMode::VerticalSpeed => "vs",
            VerticalMode::AltitudeHold => "alts",
        }
    }

    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "off" => Some(VerticalMode::Off),
            "pitch" => Some(VerticalMode::Pitch),
            "vs" => Some(VerticalMode::VerticalSpeed),
            "alts" => Some(VerticalMode::AltitudeHold),
            _ => None,
        }
    }
}

impl fmt::Display for VerticalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// PID tuning scalars reported by (and sent to) the controller.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PidGains {
    pub pitch_kp: f64,
    pub pitch_ki: f64,
    pub pitch_kd: f64,
    pub roll_kp: f64,
    pub roll_ki: f64,
    pub roll_kd: f64,
    pub heading_kp: f64,
    pub vs_kp: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AutopilotState {
    pub enabled: bool,
    pub horizontal_mode: HorizontalMode,
    pub vertical_mode: VerticalMode,
    // Targets stay `None` until the controller reports them; older
    // firmware never sends pitch or roll.
    pub selected_roll: Option<f64>,
    pub selected_pitch: Option<f64>,
    /// Degrees in `[0, 360)`.
    pub selected_heading: Option<f64>,
    pub selected_vertical_speed: Option<f64>,
    pub selected_altitude: Option<f64>,
    /// Altitude latched when altitude hold engaged. Zero means nothing has
    /// been captured yet.
    pub captured_altitude: Option<f64>,
    pub alt_hold_armed: bool,
    pub gains: PidGains,
}

impl AutopilotState {
    /// The altitude altitude-hold is governing: the captured value when one
    /// has been latched, otherwise the selected (armed) altitude.
    pub fn active_altitude(&self) -> Option<f64> {
        self.captured_altitude
            .filter(|captured| *captured != 0.0)
            .or(self.selected_altitude)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulatorState {
    pub speed: f64,
    pub altitude: f64,
    pub heading: f64,
    pub vertical_speed: f64,
    pub pitch: f64,
    pub roll: f64,
    /// Milliseconds since the controller last heard from the simulator;
    /// `None` when it never has.
    pub last_sim_data_age_ms: Option<u64>,
}

/// One normalized state update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub sensors: Sensors,
    pub joystick: Joystick,
    pub autopilot: AutopilotState,
    pub simulator: SimulatorState,
    /// Pre-formatted telemetry line, only present while some client has
    /// recording armed on the controller.
    pub telemetry: Option<String>,
    pub cyclic_feedback_enabled: bool,
}

impl Snapshot {
    /// Copy of this snapshot with the autopilot section replaced.
    pub fn with_autopilot(&self, autopilot: AutopilotState) -> Snapshot {
        Snapshot {
            autopilot,
            ..self.clone()
        }
    }

    pub fn with_cyclic_feedback(&self, enabled: bool) -> Snapshot {
        Snapshot {
            cyclic_feedback_enabled: enabled,
            ..self.clone()
        }
    }
}
