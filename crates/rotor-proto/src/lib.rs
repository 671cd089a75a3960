//! Wire shapes spoken by the rotor controller.
//!
//! Everything here mirrors what the controller firmware actually puts on the
//! wire: the JSON documents pushed over the state stream (both the current
//! `sensors`/`joystick` layout and the older flat `axes` layout), the bodies
//! accepted by the `/api/*` control endpoints, and the `/logs` entries. The
//! shapes are deliberately loose (every field optional) so that the client
//! can decide how to fill gaps instead of failing inside serde.

pub mod control;
pub mod frame;
pub mod logs;

pub use control::{AltArmForm, AutopilotPatch, CommandReply, EnabledBody, PidPatch};
pub use frame::{RawAutopilot, RawFrame, RawJoystick, RawSensors, RawSimulator};
pub use logs::LogEntry;

/// Port the controller serves its push stream on.
pub const DEFAULT_STREAM_PORT: u16 = 81;

/// Port the controller serves its HTTP API on.
pub const DEFAULT_HTTP_PORT: u16 = 80;

pub const PATH_AUTOPILOT: &str = "/api/autopilot";
pub const PATH_ALT_ARM: &str = "/api/autopilot/alt_arm";
pub const PATH_PID: &str = "/api/pid";
pub const PATH_CYCLIC_FEEDBACK: &str = "/api/cyclic_feedback";
pub const PATH_TELEMETRY: &str = "/api/telemetry";
pub const PATH_STATE: &str = "/api/state";
pub const PATH_LOGS: &str = "/logs";
