use serde::{Deserialize, Serialize};

use crate::frame::RawAutopilot;

/// Partial update accepted by `POST /api/autopilot`. Only the fields that
/// are set end up in the JSON body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutopilotPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub horizontal_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertical_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_heading: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_vertical_speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_altitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_pitch: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_roll: Option<f64>,
}

/// Partial update accepted by `POST /api/pid`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PidPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch_kp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch_ki: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch_kd: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roll_kp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roll_ki: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roll_kd: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading_kp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vs_kp: Option<f64>,
}

impl PidPatch {
    pub fn is_empty(&self) -> bool {
        *self == PidPatch::default()
    }
}

/// `{ "enabled": bool }` body used by the cyclic feedback and telemetry
/// toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnabledBody {
    pub enabled: bool,
}

/// Form body for `POST /api/autopilot/alt_arm`.
///
/// This endpoint takes `application/x-www-form-urlencoded` (`armed=true`)
/// while every other control endpoint takes JSON. Servers in the field
/// depend on it, so the encoding must stay as is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AltArmForm {
    pub armed: bool,
}

/// Reply body of the control endpoints. Autopilot endpoints return the
/// full autopilot state; the toggles may return only `enabled`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autopilot: Option<RawAutopilot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}
