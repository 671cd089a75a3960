//! The session engine: one task that owns all client state.
//!
//! Everything that changes state arrives as an [`EngineEvent`] on a single
//! unbounded queue: link transitions and frames from the connection
//! manager, outcomes from command tasks, and operator input. The engine
//! handles them strictly in arrival order, so a snapshot is always applied
//! completely before the next event is looked at.

use std::sync::Arc;
use std::time::Instant;

use rotor_proto::CommandReply;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};

use crate::capture::TelemetryCapture;
use crate::command::{
    Command, CommandDispatcher, CommandError, CommandOutcome, CommandSink, ControlClient,
    TargetAxis,
};
use crate::config::{ConfigError, EndpointConfig};
use crate::link::{ConnectionManager, Connector, LinkState, WireFrame, WsConnector};
use crate::model::Snapshot;
use crate::normalize::{merge_autopilot, normalize_bytes_with, normalize_with};
use crate::rate::{RateMonitor, RATE_WINDOW};
use crate::reconcile::{reconcile, ControlInputs, EditGuard, EditSet, EditableField};

#[derive(Debug)]
pub enum EngineEvent {
    Link(LinkState),
    Frame(WireFrame),
    CommandDone(CommandOutcome),
    Operator(Operator),
    /// One-shot state read taken at start-up. Ignored once a pushed
    /// snapshot has been applied.
    Seed(Snapshot),
    Shutdown,
}

/// Operator intent, as produced by whatever front end drives the session.
#[derive(Debug, Clone, PartialEq)]
pub enum Operator {
    Command(Command),
    AdjustTarget { axis: TargetAxis, delta: f64 },
    BeginEdit(EditableField),
    EditValue(EditableField, f64),
    /// Abandon an edit; the field snaps back to the controller's value.
    EndEdit(EditableField),
    /// Send the edited value and release the field.
    CommitEdit(EditableField),
    Status,
}

/// Everything the client knows, owned by the engine.
#[derive(Debug)]
pub struct SessionState {
    snapshot: Option<Arc<Snapshot>>,
    link: LinkState,
    rate: RateMonitor,
    capture: TelemetryCapture,
    inputs: ControlInputs,
    edits: EditSet,
    applied: u64,
    dropped: u64,
}

impl SessionState {
    pub fn new(now: Instant) -> Self {
        Self {
            snapshot: None,
            link: LinkState::Connecting,
            rate: RateMonitor::new(now),
            capture: TelemetryCapture::new(),
            inputs: ControlInputs::default(),
            edits: EditSet::new(),
            applied: 0,
            dropped: 0,
        }
    }

    pub fn snapshot(&self) -> Option<&Arc<Snapshot>> {
        self.snapshot.as_ref()
    }

    pub fn link(&self) -> LinkState {
        self.link
    }

    pub fn rate(&self) -> u32 {
        self.rate.rate()
    }

    pub fn capture(&self) -> &TelemetryCapture {
        &self.capture
    }

    pub fn capture_mut(&mut self) -> &mut TelemetryCapture {
        &mut self.capture
    }

    pub fn inputs(&self) -> &ControlInputs {
        &self.inputs
    }

    pub fn is_editing(&self, field: EditableField) -> bool {
        self.edits.is_editing(field)
    }

    /// Pushed snapshots applied so far.
    pub fn applied_frames(&self) -> u64 {
        self.applied
    }

    /// Frames rejected by the normalizer.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped
    }

    fn install(&mut self, snapshot: Arc<Snapshot>) {
        let report = reconcile(&mut self.inputs, &snapshot.autopilot, &self.edits);
        if !report.suppressed.is_empty() {
            trace!(
                target: "rotor.session",
                suppressed = ?report.suppressed,
                "kept operator edits over pushed values"
            );
        }
        self.snapshot = Some(snapshot);
    }
}

/// Receives session changes. Every method defaults to doing nothing.
pub trait SessionObserver: Send {
    fn link_changed(&mut self, _state: LinkState) {}

    fn snapshot_applied(&mut self, _session: &SessionState) {}

    fn rate_updated(&mut self, _rate: u32) {}

    fn command_failed(&mut self, _command: &Command, _error: &CommandError) {}

    fn status(&mut self, _session: &SessionState) {}
}

impl SessionObserver for () {}

pub struct SyncEngine<S: CommandSink, O: SessionObserver> {
    state: SessionState,
    sink: S,
    observer: O,
}

impl<S: CommandSink, O: SessionObserver> SyncEngine<S, O> {
    pub fn new(sink: S, observer: O, now: Instant) -> Self {
        Self {
            state: SessionState::new(now),
            sink,
            observer,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Apply one event. The only place session state changes.
    pub fn handle(&mut self, event: EngineEvent, now: Instant) {
        match event {
            EngineEvent::Link(link) => {
                if self.state.link != link {
                    self.state.link = link;
                    self.observer.link_changed(link);
                }
            }
            EngineEvent::Frame(frame) => self.apply_frame(frame, now),
            EngineEvent::CommandDone(outcome) => self.apply_outcome(outcome),
            EngineEvent::Operator(op) => self.apply_operator(op),
            EngineEvent::Seed(snapshot) => {
                if self.state.snapshot.is_none() {
                    debug!(target: "rotor.session", "seeded from state read");
                    self.state.install(Arc::new(snapshot));
                    self.observer.snapshot_applied(&self.state);
                }
            }
            EngineEvent::Shutdown => {}
        }
    }

    /// Close the rate window if it is due.
    pub fn tick(&mut self, now: Instant) {
        if let Some(rate) = self.state.rate.roll(now) {
            trace!(target: "rotor.session", rate, "rate window closed");
            self.observer.rate_updated(rate);
        }
    }

    /// Drain the queue until a shutdown event arrives or every sender is
    /// gone. Returns the final state so the caller can export the capture.
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<EngineEvent>) -> SessionState {
        let mut ticker = tokio::time::interval(RATE_WINDOW);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                event = events.recv() => match event {
                    Some(EngineEvent::Shutdown) | None => break,
                    Some(event) => {
                        let now = tokio::time::Instant::now().into_std();
                        self.handle(event, now);
                    }
                },
                _ = ticker.tick() => self.tick(tokio::time::Instant::now().into_std()),
            }
        }
        info!(
            target: "rotor.session",
            applied = self.state.applied,
            dropped = self.state.dropped,
            "session engine stopped"
        );
        self.state
    }

    fn apply_frame(&mut self, frame: WireFrame, now: Instant) {
        let previous = self.state.snapshot.as_ref().map(|snapshot| &snapshot.autopilot);
        let parsed = match &frame {
            WireFrame::Text(text) => normalize_with(text, previous),
            WireFrame::Binary(bytes) => normalize_bytes_with(bytes, previous),
            WireFrame::Close(_) => return,
        };
        let snapshot = match parsed {
            Ok(snapshot) => snapshot,
            Err(err) => {
                self.state.dropped += 1;
                warn!(
                    target: "rotor.normalize",
                    error = %err,
                    dropped = self.state.dropped,
                    "dropping malformed frame"
                );
                return;
            }
        };

        self.state.capture.observe(&snapshot);
        self.state.install(Arc::new(snapshot));
        self.state.applied += 1;
        self.state.rate.record();
        self.observer.snapshot_applied(&self.state);
        self.tick(now);
    }

    fn apply_outcome(&mut self, outcome: CommandOutcome) {
        let CommandOutcome { command, result } = outcome;
        match result {
            Ok(reply) => self.apply_reply(&command, reply),
            Err(err) => {
                debug!(
                    target: "rotor.session",
                    command = command.label(),
                    "command failed; state left as is"
                );
                self.observer.command_failed(&command, &err);
            }
        }
    }

    fn apply_reply(&mut self, command: &Command, reply: CommandReply) {
        if let Command::SetTelemetryRecording(requested) = command {
            // The 2xx is the confirmation; the echoed flag wins when present.
            let armed = reply.enabled.unwrap_or(*requested);
            info!(target: "rotor.capture", armed, "telemetry recording acknowledged");
            self.state.capture.set_armed(armed);
        }

        // Before the first push the reply lands on the default snapshot.
        let current = self.state.snapshot.clone().unwrap_or_default();
        let mut next: Option<Snapshot> = None;
        if let Some(raw) = reply.autopilot {
            match merge_autopilot(&current.autopilot, raw) {
                Ok(autopilot) => next = Some(current.with_autopilot(autopilot)),
                Err(err) => {
                    warn!(
                        target: "rotor.command",
                        command = command.label(),
                        error = %err,
                        "ignoring malformed command reply"
                    );
                }
            }
        }
        if let (Command::SetCyclicFeedback(_), Some(enabled)) = (command, reply.enabled) {
            let base = next.as_ref().unwrap_or(current.as_ref());
            next = Some(base.with_cyclic_feedback(enabled));
        }

        if let Some(snapshot) = next {
            trace!(target: "rotor.session", command = command.label(), "applied command reply");
            self.state.install(Arc::new(snapshot));
            self.observer.snapshot_applied(&self.state);
        }
    }

    fn apply_operator(&mut self, op: Operator) {
        match op {
            Operator::Command(command) => self.sink.dispatch(command),
            Operator::AdjustTarget { axis, delta } => self.adjust_target(axis, delta),
            Operator::BeginEdit(field) => {
                self.state.edits.begin(field);
            }
            Operator::EditValue(field, value) => {
                self.state.edits.begin(field);
                self.state.inputs.set_local(field, value);
            }
            Operator::EndEdit(field) => {
                self.state.edits.end(field);
                if let Some(snapshot) = &self.state.snapshot {
                    reconcile(&mut self.state.inputs, &snapshot.autopilot, &self.state.edits);
                }
            }
            Operator::CommitEdit(field) => {
                self.state.edits.end(field);
                match self.state.inputs.get(field) {
                    Some(value) => self.sink.dispatch(set_command(field, value)),
                    None => warn!(
                        target: "rotor.session",
                        field = %field,
                        "nothing to commit for field"
                    ),
                }
            }
            Operator::Status => self.observer.status(&self.state),
        }
    }

    /// Nudge the pitch or roll target relative to what is displayed now.
    /// Two quick nudges before the first reply both start from the same
    /// displayed value; the controller keeps whichever lands last.
    fn adjust_target(&mut self, axis: TargetAxis, delta: f64) {
        let autopilot = self.state.snapshot.as_ref().map(|snapshot| &snapshot.autopilot);
        let current = autopilot.and_then(|ap| match axis {
            TargetAxis::Pitch => ap.selected_pitch,
            TargetAxis::Roll => ap.selected_roll,
        });
        let Some(current) = current else {
            warn!(target: "rotor.session", ?axis, "target not reported yet; ignoring adjustment");
            return;
        };
        let command = match axis {
            TargetAxis::Pitch => Command::SetSelectedPitch(current + delta),
            TargetAxis::Roll => Command::SetSelectedRoll(current + delta),
        };
        self.sink.dispatch(command);
    }
}

fn set_command(field: EditableField, value: f64) -> Command {
    match field {
        EditableField::SelectedHeading => Command::SetSelectedHeading(value),
        EditableField::SelectedVerticalSpeed => Command::SetSelectedVerticalSpeed(value),
        EditableField::SelectedAltitude => Command::SetSelectedAltitude(value),
    }
}

/// Front-end side of a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    events: mpsc::UnboundedSender<EngineEvent>,
}

impl SessionHandle {
    /// Returns `false` once the engine has stopped.
    pub fn send(&self, op: Operator) -> bool {
        self.events.send(EngineEvent::Operator(op)).is_ok()
    }

    pub fn command(&self, command: Command) -> bool {
        self.send(Operator::Command(command))
    }

    pub fn adjust_target(&self, axis: TargetAxis, delta: f64) -> bool {
        self.send(Operator::AdjustTarget { axis, delta })
    }

    pub fn shutdown(&self) {
        let _ = self.events.send(EngineEvent::Shutdown);
    }
}

pub struct Session {
    pub handle: SessionHandle,
    pub engine: JoinHandle<SessionState>,
    pub link: JoinHandle<()>,
}

/// Start a session against the controller over WebSocket.
pub fn spawn_session<O>(config: &EndpointConfig, observer: O) -> Result<Session, ConfigError>
where
    O: SessionObserver + 'static,
{
    spawn_session_with(config, WsConnector, observer)
}

/// Start a session with a custom push-stream connector.
pub fn spawn_session_with<C, O>(
    config: &EndpointConfig,
    connector: C,
    observer: O,
) -> Result<Session, ConfigError>
where
    C: Connector + 'static,
    O: SessionObserver + 'static,
{
    let stream_url = config.stream_url()?;
    let client = ControlClient::new(config.http_base()?);
    let (tx, rx) = mpsc::unbounded_channel();

    let dispatcher = CommandDispatcher::new(client.clone(), tx.clone());
    let engine = SyncEngine::new(dispatcher, observer, Instant::now());
    let engine = tokio::spawn(engine.run(rx));

    let manager = ConnectionManager::new(connector, stream_url)
        .with_reconnect_delay(config.reconnect_delay);
    let link = tokio::spawn(manager.run(tx.clone()));

    let seed_tx = tx.clone();
    tokio::spawn(async move {
        match client.fetch_state().await {
            Ok(snapshot) => {
                let _ = seed_tx.send(EngineEvent::Seed(snapshot));
            }
            Err(err) => debug!(target: "rotor.session", error = %err, "initial state read failed"),
        }
    });

    Ok(Session {
        handle: SessionHandle { events: tx },
        engine,
        link,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use rotor_proto::RawAutopilot;
    use serde_json::json;

    use super::*;
    use crate::model::{HorizontalMode, VerticalMode};
    use crate::normalize::normalize;

    type Sent = Arc<Mutex<Vec<Command>>>;

    fn engine() -> (SyncEngine<impl CommandSink, ()>, Sent, Instant) {
        let sent: Sent = Arc::default();
        let sink = {
            let sent = Arc::clone(&sent);
            move |command: Command| sent.lock().expect("lock").push(command)
        };
        let now = Instant::now();
        (SyncEngine::new(sink, (), now), sent, now)
    }

    fn frame(value: serde_json::Value) -> EngineEvent {
        EngineEvent::Frame(WireFrame::Text(value.to_string()))
    }

    fn ap_frame(heading: f64, vs: f64, alt: f64) -> EngineEvent {
        frame(json!({
            "sensors": {"cyclicX": 5000, "cyclicY": 5000, "collective": 5000},
            "autopilot": {
                "enabled": true,
                "horizontalMode": "hdg",
                "verticalMode": "vs",
                "selectedHeading": heading,
                "selectedVerticalSpeed": vs,
                "selectedAltitude": alt,
                "selectedPitch": 2.0,
                "selectedRoll": -1.0
            }
        }))
    }

    fn done(command: Command, reply: serde_json::Value) -> EngineEvent {
        EngineEvent::CommandDone(CommandOutcome {
            command,
            result: Ok(serde_json::from_value(reply).expect("reply")),
        })
    }

    #[test]
    fn applies_frames_and_counts_rate() {
        let (mut engine, _, start) = engine();
        for i in 0..42u64 {
            engine.handle(ap_frame(90.0, 0.0, 1000.0), start + Duration::from_millis(i * 20));
        }
        assert_eq!(engine.state().applied_frames(), 42);
        assert_eq!(engine.state().rate(), 0);
        engine.tick(start + RATE_WINDOW);
        assert_eq!(engine.state().rate(), 42);
        engine.tick(start + RATE_WINDOW * 2);
        assert_eq!(engine.state().rate(), 0);
    }

    #[test]
    fn malformed_frame_leaves_state_untouched() {
        let (mut engine, _, now) = engine();
        engine.handle(ap_frame(90.0, 0.0, 1000.0), now);
        let before = Arc::clone(engine.state().snapshot().expect("snapshot"));

        engine.handle(EngineEvent::Frame(WireFrame::Text("{not json".into())), now);
        engine.handle(frame(json!({"autopilot": {"horizontalMode": "sideways"}})), now);
        engine.handle(frame(json!([1, 2, 3])), now);

        assert!(Arc::ptr_eq(&before, engine.state().snapshot().expect("snapshot")));
        assert_eq!(engine.state().dropped_frames(), 3);
        assert_eq!(engine.state().applied_frames(), 1);

        let next = ap_frame(91.0, 0.0, 1000.0);
        let EngineEvent::Frame(WireFrame::Text(text)) = &next else {
            unreachable!()
        };
        let alone = normalize(text).expect("valid frame");
        engine.handle(next, now);
        assert_eq!(engine.state().applied_frames(), 2);
        assert_eq!(**engine.state().snapshot().expect("snapshot"), alone);
    }

    #[test]
    fn edited_field_survives_pushed_updates() {
        let (mut engine, sent, now) = engine();
        engine.handle(ap_frame(90.0, 500.0, 3000.0), now);

        engine.handle(EngineEvent::Operator(Operator::EditValue(EditableField::SelectedHeading, 27.0)), now);
        engine.handle(ap_frame(95.0, -200.0, 3100.0), now);

        let inputs = engine.state().inputs();
        assert_eq!(inputs.selected_heading, Some(27.0));
        assert_eq!(inputs.selected_vertical_speed, Some(-200.0));
        assert_eq!(inputs.selected_altitude, Some(3100.0));
        // The canonical state still follows the controller.
        let snapshot = engine.state().snapshot().expect("snapshot");
        assert_eq!(snapshot.autopilot.selected_heading, Some(95.0));

        engine.handle(EngineEvent::Operator(Operator::CommitEdit(EditableField::SelectedHeading)), now);
        assert_eq!(*sent.lock().expect("lock"), vec![Command::SetSelectedHeading(27.0)]);
        assert!(!engine.state().is_editing(EditableField::SelectedHeading));
        // No optimistic update: the input follows the next push again.
        engine.handle(ap_frame(95.0, -200.0, 3100.0), now);
        assert_eq!(engine.state().inputs().selected_heading, Some(95.0));
    }

    #[test]
    fn cancelled_edit_snaps_back() {
        let (mut engine, sent, now) = engine();
        engine.handle(ap_frame(90.0, 500.0, 3000.0), now);
        engine.handle(EngineEvent::Operator(Operator::EditValue(EditableField::SelectedAltitude, 4500.0)), now);
        assert_eq!(engine.state().inputs().selected_altitude, Some(4500.0));

        engine.handle(EngineEvent::Operator(Operator::EndEdit(EditableField::SelectedAltitude)), now);
        assert_eq!(engine.state().inputs().selected_altitude, Some(3000.0));
        assert!(sent.lock().expect("lock").is_empty());
    }

    #[test]
    fn reply_replaces_snapshot_copy_on_write() {
        let (mut engine, _, now) = engine();
        engine.handle(ap_frame(90.0, 500.0, 3000.0), now);
        let before = Arc::clone(engine.state().snapshot().expect("snapshot"));

        engine.handle(
            done(
                Command::SetHorizontalMode(crate::command::HorizontalSelect::Roll),
                json!({"autopilot": {"horizontalMode": "roll", "selectedRoll": 4.0}}),
            ),
            now,
        );

        let after = engine.state().snapshot().expect("snapshot");
        assert_eq!(before.autopilot.horizontal_mode, HorizontalMode::Heading);
        assert_eq!(after.autopilot.horizontal_mode, HorizontalMode::Roll);
        assert_eq!(after.autopilot.selected_roll, Some(4.0));
        // Fields the reply left out keep their current values.
        assert_eq!(after.autopilot.vertical_mode, VerticalMode::VerticalSpeed);
        assert_eq!(after.autopilot.selected_heading, Some(90.0));
        assert_eq!(after.sensors, before.sensors);
    }

    #[test]
    fn reply_respects_focus_guard() {
        let (mut engine, _, now) = engine();
        engine.handle(ap_frame(90.0, 500.0, 3000.0), now);
        engine.handle(EngineEvent::Operator(Operator::BeginEdit(EditableField::SelectedVerticalSpeed)), now);
        engine.handle(
            done(
                Command::SetSelectedAltitude(3500.0),
                json!({"autopilot": {"selectedAltitude": 3500.0, "selectedVerticalSpeed": 700.0}}),
            ),
            now,
        );
        let inputs = engine.state().inputs();
        assert_eq!(inputs.selected_altitude, Some(3500.0));
        assert_eq!(inputs.selected_vertical_speed, Some(500.0));
    }

    #[test]
    fn failed_command_changes_nothing() {
        let (mut engine, _, now) = engine();
        engine.handle(ap_frame(90.0, 500.0, 3000.0), now);
        let before = Arc::clone(engine.state().snapshot().expect("snapshot"));

        engine.handle(
            EngineEvent::CommandDone(CommandOutcome {
                command: Command::SetAutopilotEnabled(false),
                result: Err(CommandError::Decode("boom".into())),
            }),
            now,
        );
        engine.handle(
            EngineEvent::CommandDone(CommandOutcome {
                command: Command::SetTelemetryRecording(true),
                result: Err(CommandError::Decode("boom".into())),
            }),
            now,
        );

        assert!(Arc::ptr_eq(&before, engine.state().snapshot().expect("snapshot")));
        assert!(!engine.state().capture().is_armed());
    }

    #[test]
    fn commands_are_not_applied_before_reply() {
        let (mut engine, sent, now) = engine();
        engine.handle(ap_frame(90.0, 500.0, 3000.0), now);
        engine.handle(
            EngineEvent::Operator(Operator::Command(Command::SetAutopilotEnabled(false))),
            now,
        );
        assert_eq!(sent.lock().expect("lock").len(), 1);
        assert!(engine.state().snapshot().expect("snapshot").autopilot.enabled);
    }

    #[test]
    fn adjust_target_reads_displayed_value() {
        let (mut engine, sent, now) = engine();
        engine.handle(
            EngineEvent::Operator(Operator::AdjustTarget { axis: TargetAxis::Pitch, delta: 1.0 }),
            now,
        );
        assert!(sent.lock().expect("lock").is_empty());

        engine.handle(ap_frame(90.0, 0.0, 0.0), now);
        engine.handle(
            EngineEvent::Operator(Operator::AdjustTarget { axis: TargetAxis::Pitch, delta: 1.0 }),
            now,
        );
        engine.handle(
            EngineEvent::Operator(Operator::AdjustTarget { axis: TargetAxis::Pitch, delta: 1.0 }),
            now,
        );
        engine.handle(
            EngineEvent::Operator(Operator::AdjustTarget { axis: TargetAxis::Roll, delta: -2.5 }),
            now,
        );
        // Both pitch nudges start from the same displayed value.
        assert_eq!(
            *sent.lock().expect("lock"),
            vec![
                Command::SetSelectedPitch(3.0),
                Command::SetSelectedPitch(3.0),
                Command::SetSelectedRoll(-3.5),
            ]
        );
    }

    #[test]
    fn recording_arms_from_reply_only() {
        let (mut engine, _, now) = engine();
        let line = |t: u32| {
            frame(json!({"telemetry": format!("t={t}")}))
        };
        engine.handle(line(0), now);
        engine.handle(done(Command::SetTelemetryRecording(true), json!({"enabled": true})), now);
        assert!(engine.state().capture().is_armed());
        engine.handle(line(1), now);
        engine.handle(frame(json!({})), now);
        engine.handle(line(2), now);
        engine.handle(done(Command::SetTelemetryRecording(false), json!({"enabled": false})), now);
        engine.handle(line(3), now);
        assert_eq!(engine.state().capture().contents(), "t=1\nt=2\n");
    }

    #[test]
    fn recording_arms_on_reply_without_echo() {
        let (mut engine, _, now) = engine();
        engine.handle(done(Command::SetTelemetryRecording(true), json!({})), now);
        assert!(engine.state().capture().is_armed());
        engine.handle(frame(json!({"telemetry": "t=1"})), now);
        assert_eq!(engine.state().capture().contents(), "t=1\n");

        engine.handle(
            done(Command::SetTelemetryRecording(false), json!({"autopilot": {}})),
            now,
        );
        assert!(!engine.state().capture().is_armed());
    }

    #[test]
    fn frame_without_autopilot_keeps_known_targets() {
        let (mut engine, sent, now) = engine();
        engine.handle(ap_frame(90.0, 500.0, 3000.0), now);
        engine.handle(frame(json!({"axes": [1000, 2000, 3000], "buttons": 5})), now);

        let snapshot = engine.state().snapshot().expect("snapshot");
        assert_eq!(snapshot.sensors.cyclic_x, 1000);
        assert!(snapshot.autopilot.enabled);
        assert_eq!(snapshot.autopilot.selected_heading, Some(90.0));
        assert_eq!(engine.state().inputs().selected_heading, Some(90.0));
        assert_eq!(engine.state().inputs().selected_altitude, Some(3000.0));

        engine.handle(
            EngineEvent::Operator(Operator::AdjustTarget { axis: TargetAxis::Pitch, delta: 1.0 }),
            now,
        );
        assert_eq!(*sent.lock().expect("lock"), vec![Command::SetSelectedPitch(3.0)]);
    }

    #[test]
    fn unreported_targets_are_not_adjusted() {
        let (mut engine, sent, now) = engine();
        engine.handle(frame(json!({"axes": [1, 2, 3]})), now);
        assert_eq!(engine.state().inputs(), &ControlInputs::default());

        engine.handle(
            frame(json!({"autopilot": {"enabled": true, "selectedHeading": 45}})),
            now,
        );
        engine.handle(
            EngineEvent::Operator(Operator::AdjustTarget { axis: TargetAxis::Roll, delta: 1.0 }),
            now,
        );
        assert!(sent.lock().expect("lock").is_empty());
        assert_eq!(engine.state().inputs().selected_heading, Some(45.0));
        assert_eq!(engine.state().inputs().selected_altitude, None);
    }

    #[test]
    fn reply_before_first_push_is_applied() {
        let (mut engine, _, now) = engine();
        engine.handle(
            done(
                Command::SetSelectedAltitude(2500.0),
                json!({"autopilot": {"enabled": true, "selectedAltitude": 2500.0}}),
            ),
            now,
        );
        let snapshot = engine.state().snapshot().expect("snapshot");
        assert!(snapshot.autopilot.enabled);
        assert_eq!(snapshot.autopilot.selected_altitude, Some(2500.0));
        assert_eq!(engine.state().inputs().selected_altitude, Some(2500.0));
        assert_eq!(engine.state().applied_frames(), 0);
    }

    #[test]
    fn feedback_reply_updates_flag() {
        let (mut engine, _, now) = engine();
        engine.handle(ap_frame(0.0, 0.0, 0.0), now);
        engine.handle(done(Command::SetCyclicFeedback(true), json!({"enabled": true})), now);
        assert!(engine.state().snapshot().expect("snapshot").cyclic_feedback_enabled);
    }

    #[test]
    fn seed_only_fills_an_empty_session() {
        let (mut engine, _, now) = engine();
        let mut seeded = Snapshot::default();
        seeded.autopilot.selected_altitude = Some(1200.0);
        engine.handle(EngineEvent::Seed(seeded.clone()), now);
        assert_eq!(engine.state().inputs().selected_altitude, Some(1200.0));
        assert_eq!(engine.state().applied_frames(), 0);

        engine.handle(ap_frame(0.0, 0.0, 3000.0), now);
        seeded.autopilot.selected_altitude = Some(1.0);
        engine.handle(EngineEvent::Seed(seeded), now);
        assert_eq!(engine.state().inputs().selected_altitude, Some(3000.0));
    }

    #[test]
    fn merge_keeps_unknown_reply_modes_out() {
        let base = crate::model::AutopilotState::default();
        let raw = RawAutopilot {
            vertical_mode: Some("loop".into()),
            ..Default::default()
        };
        assert!(merge_autopilot(&base, raw).is_err());
    }

    #[test_timeout::tokio_timeout_test(10, paused)]
    async fn run_ticks_rate_down_to_zero() {
        #[derive(Default)]
        struct Rates(Arc<Mutex<Vec<u32>>>);
        impl SessionObserver for Rates {
            fn rate_updated(&mut self, rate: u32) {
                self.0.lock().expect("lock").push(rate);
            }
        }

        let rates = Rates::default();
        let seen = Arc::clone(&rates.0);
        let engine = SyncEngine::new(|_: Command| {}, rates, tokio::time::Instant::now().into_std());
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(engine.run(rx));

        for _ in 0..5 {
            tx.send(ap_frame(0.0, 0.0, 0.0)).expect("send");
        }
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        tx.send(EngineEvent::Shutdown).expect("send");
        let state = task.await.expect("join");

        assert_eq!(state.applied_frames(), 5);
        assert_eq!(*seen.lock().expect("lock"), vec![5, 0]);
    }
}
