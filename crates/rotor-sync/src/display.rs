//! UI-facing values derived from a [`Snapshot`].
//!
//! Nothing here holds state; every function is a pure projection of the
//! canonical model so renderers never re-implement mode or precedence rules.

use std::fmt;

use crate::model::{
    AutopilotState, HorizontalMode, Sensors, SimulatorState, VerticalMode, AXIS_MAX,
    BUTTON_COUNT,
};

/// Simulator data older than this is shown as stale.
pub const SIM_DATA_STALE_AFTER_MS: u64 = 2_000;

/// Horizontal position of an axis value, 0 % = left, 100 % = right.
pub fn axis_x_percent(value: u16) -> f64 {
    percent_of_axis(f64::from(value))
}

/// Vertical position of an axis value measured from the top, so full
/// forward (10000) sits at 0 %.
pub fn axis_y_percent(value: u16) -> f64 {
    percent_of_axis(f64::from(AXIS_MAX) - f64::from(value))
}

/// Fill level of the collective bar.
pub fn collective_percent(value: u16) -> f64 {
    percent_of_axis(f64::from(value))
}

fn percent_of_axis(value: f64) -> f64 {
    (value / f64::from(AXIS_MAX) * 100.0).clamp(0.0, 100.0)
}

/// Zero-based indices of the pressed buttons.
pub fn pressed_buttons(mask: u32) -> Vec<u8> {
    (0..BUTTON_COUNT)
        .filter(|bit| mask & (1u32 << bit) != 0)
        .collect()
}

/// An autopilot target, or the `--` placeholder when it was never reported.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetValue(pub Option<f64>);

impl fmt::Display for TargetValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(value) => fmt::Display::fmt(&value, f),
            None => f.write_str("--"),
        }
    }
}

/// A raw sensor count, or the `--` placeholder when the frame had none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawReading(pub Option<i64>);

impl fmt::Display for RawReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(value) => write!(f, "{value}"),
            None => f.write_str("--"),
        }
    }
}

pub fn raw_readings(sensors: &Sensors) -> [RawReading; 3] {
    [
        RawReading(sensors.raw_x),
        RawReading(sensors.raw_y),
        RawReading(sensors.raw_z),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclicStatus {
    Receiving,
    NoData,
}

pub fn cyclic_status(sensors: &Sensors) -> CyclicStatus {
    if sensors.cyclic_valid {
        CyclicStatus::Receiving
    } else {
        CyclicStatus::NoData
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulatorLink {
    Never,
    Live { age_ms: u64 },
    Stale { age_ms: u64 },
}

pub fn simulator_link(simulator: &SimulatorState) -> SimulatorLink {
    match simulator.last_sim_data_age_ms {
        None => SimulatorLink::Never,
        Some(age_ms) if age_ms <= SIM_DATA_STALE_AFTER_MS => SimulatorLink::Live { age_ms },
        Some(age_ms) => SimulatorLink::Stale { age_ms },
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HorizontalTarget {
    Roll(TargetValue),
    Heading(TargetValue),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VerticalTarget {
    Pitch(TargetValue),
    VerticalSpeed(TargetValue),
    Altitude(TargetValue),
}

/// Autopilot annunciation: which modes light up, which targets are active
/// and which are merely armed.
#[derive(Debug, Clone, PartialEq)]
pub struct AutopilotView {
    pub enabled: bool,
    pub horizontal_mode: HorizontalMode,
    pub vertical_mode: VerticalMode,
    pub active_horizontal: Option<HorizontalTarget>,
    pub active_vertical: Option<VerticalTarget>,
    pub armed_heading: Option<f64>,
    pub armed_altitude: Option<f64>,
}

impl AutopilotView {
    pub fn derive(ap: &AutopilotState) -> Self {
        // Disabled shows both axes off; the stored modes are left alone so
        // re-enabling brings them back.
        let (horizontal_mode, vertical_mode) = if ap.enabled {
            (ap.horizontal_mode, ap.vertical_mode)
        } else {
            (HorizontalMode::Off, VerticalMode::Off)
        };

        let active_horizontal = match horizontal_mode {
            HorizontalMode::Off => None,
            HorizontalMode::Roll => Some(HorizontalTarget::Roll(TargetValue(ap.selected_roll))),
            HorizontalMode::Heading => {
                Some(HorizontalTarget::Heading(TargetValue(ap.selected_heading)))
            }
        };
        let active_vertical = match vertical_mode {
            VerticalMode::Off => None,
            VerticalMode::Pitch => Some(VerticalTarget::Pitch(TargetValue(ap.selected_pitch))),
            VerticalMode::VerticalSpeed => Some(VerticalTarget::VerticalSpeed(TargetValue(
                ap.selected_vertical_speed,
            ))),
            VerticalMode::AltitudeHold => {
                Some(VerticalTarget::Altitude(TargetValue(ap.active_altitude())))
            }
        };

        let armed_heading = ap
            .selected_heading
            .filter(|_| horizontal_mode != HorizontalMode::Heading);
        let armed_altitude = ap
            .selected_altitude
            .filter(|_| ap.alt_hold_armed && vertical_mode != VerticalMode::AltitudeHold);

        Self {
            enabled: ap.enabled,
            horizontal_mode,
            vertical_mode,
            active_horizontal,
            active_vertical,
            armed_heading,
            armed_altitude,
        }
    }

    /// Altitude shown in the active slot, if altitude hold is engaged.
    pub fn active_altitude(&self) -> Option<f64> {
        match self.active_vertical {
            Some(VerticalTarget::Altitude(alt)) => alt.0,
            _ => None,
        }
    }
}
