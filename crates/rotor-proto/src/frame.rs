use serde::{Deserialize, Serialize};

/// One pushed state document, in whichever generation the firmware speaks.
///
/// Current firmware sends the nested `sensors`/`joystick`/`autopilot`/
/// `simulator` sections. Older firmware sends a flat `axes` triplet plus
/// top-level `buttons`, `rawX/Y/Z` and `cyclicValid`; those legacy keys
/// are kept here so the normalizer can use them as fallbacks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFrame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensors: Option<RawSensors>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joystick: Option<RawJoystick>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autopilot: Option<RawAutopilot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulator: Option<RawSimulator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telemetry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cyclic_feedback_enabled: Option<bool>,

    // Legacy layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axes: Option<Vec<Option<f64>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buttons: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_x: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_y: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_z: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cyclic_valid: Option<bool>,
}

impl RawFrame {
    /// Whether the document carries the legacy flat layout.
    pub fn is_legacy(&self) -> bool {
        self.axes.is_some()
    }
}

/// Stick sensor readings: calibrated axes on the 0–10000 scale plus the
/// raw encoder/ADC counts they were derived from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSensors {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cyclic_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cyclic_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collective: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_x: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_y: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_z: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cyclic_valid: Option<bool>,
}

/// Values the controller presents to the PC as a joystick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawJoystick {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cyclic_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cyclic_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collective: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buttons: Option<u32>,
}

/// Autopilot section, also returned by the control endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAutopilot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub horizontal_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertical_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_roll: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_pitch: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_heading: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_vertical_speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_altitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured_altitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_hold_armed: Option<bool>,
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

/// Flight simulator readings relayed by the controller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSimulator {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertical_speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roll: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sim_data_age_ms: Option<f64>,
}
