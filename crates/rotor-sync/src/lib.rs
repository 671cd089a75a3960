//! Client-side state synchronization for the rotor stick controller.
//!
//! Responsibilities:
//! - keeping a push-stream connection to the controller alive
//! - normalizing pushed documents of either firmware generation into one model
//! - issuing control commands and applying only what the controller confirms
//! - protecting fields the operator is editing from being overwritten
//! - measuring the update rate and capturing telemetry lines on request

pub mod capture;
pub mod command;
pub mod config;
pub mod display;
pub mod link;
pub mod model;
pub mod normalize;
pub mod rate;
pub mod reconcile;
pub mod session;

pub use capture::TelemetryCapture;
pub use command::{
    Command, CommandDispatcher, CommandError, CommandOutcome, CommandSink, ControlClient,
    HorizontalSelect, TargetAxis, VerticalSelect,
};
pub use config::{ConfigError, EndpointConfig};
pub use display::AutopilotView;
pub use link::{
    ConnectionManager, Connector, FrameStream, LinkMachine, LinkState, TransportError, WireFrame,
    WsConnector, RECONNECT_DELAY,
};
pub use model::{AutopilotState, HorizontalMode, Snapshot, VerticalMode};
pub use normalize::{normalize, NormalizeError};
pub use rate::RateMonitor;
pub use reconcile::{ControlInputs, EditGuard, EditSet, EditableField};
pub use session::{
    spawn_session, spawn_session_with, EngineEvent, Operator, Session, SessionHandle,
    SessionObserver, SessionState, SyncEngine,
};
