use std::fmt::Write as _;
use std::io::Write;

use rotor_proto::LogEntry;
use rotor_sync::display::{
    axis_x_percent, axis_y_percent, collective_percent, cyclic_status, pressed_buttons,
    raw_readings, simulator_link, CyclicStatus, HorizontalTarget, SimulatorLink, VerticalTarget,
};
use rotor_sync::{
    AutopilotView, Command, CommandError, EditableField, LinkState, SessionObserver, SessionState,
};
use tracing::{info, warn};

/// Writes a one-line summary every second and a full panel on request.
pub struct ConsoleObserver<W: Write + Send> {
    out: W,
    last_summary: Option<String>,
}

impl<W: Write + Send> ConsoleObserver<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            last_summary: None,
        }
    }

    fn emit(&mut self, text: &str) {
        if let Err(err) = writeln!(self.out, "{text}").and_then(|_| self.out.flush()) {
            warn!(target: "rotor.console", error = %err, "failed to write console output");
        }
    }
}

impl<W: Write + Send> SessionObserver for ConsoleObserver<W> {
    fn link_changed(&mut self, state: LinkState) {
        info!(target: "rotor.console", link = ?state, "push stream");
    }

    fn snapshot_applied(&mut self, session: &SessionState) {
        self.last_summary = Some(summary_line(session));
    }

    fn rate_updated(&mut self, _rate: u32) {
        // Rate rolls once per second; reuse it as the refresh tick.
        if let Some(summary) = self.last_summary.take() {
            self.emit(&summary);
        }
    }

    fn command_failed(&mut self, command: &Command, error: &CommandError) {
        self.emit(&format!("! {} failed: {error}", command.label()));
    }

    fn status(&mut self, session: &SessionState) {
        let panel = status_panel(session);
        self.emit(&panel);
    }
}

/// One `/logs` entry as printed by the `logs` subcommand.
pub fn log_line(entry: &LogEntry) -> String {
    format!("{} {:<5} {}", entry.timestamp, entry.level_name(), entry.message)
}

fn link_word(state: LinkState) -> &'static str {
    match state {
        LinkState::Connecting => "connecting",
        LinkState::Open => "connected",
        LinkState::Closed => "disconnected",
    }
}

pub fn summary_line(session: &SessionState) -> String {
    let mut line = format!("[{} {:>3} Hz]", link_word(session.link()), session.rate());
    let Some(snapshot) = session.snapshot() else {
        line.push_str(" waiting for state");
        return line;
    };
    let sensors = &snapshot.sensors;
    let _ = write!(
        line,
        " cyc {:5.1}%/{:5.1}% col {:5.1}%",
        axis_x_percent(sensors.cyclic_x),
        axis_y_percent(sensors.cyclic_y),
        collective_percent(sensors.collective)
    );
    let view = AutopilotView::derive(&snapshot.autopilot);
    let _ = write!(
        line,
        " | AP {} {}/{}",
        if view.enabled { "ON " } else { "OFF" },
        view.horizontal_mode,
        view.vertical_mode
    );
    if session.capture().is_armed() {
        let _ = write!(line, " | REC {}", session.capture().line_count());
    }
    line
}

pub fn status_panel(session: &SessionState) -> String {
    let mut panel = String::new();
    let _ = writeln!(
        panel,
        "link: {}  rate: {} Hz  applied: {}  dropped: {}",
        link_word(session.link()),
        session.rate(),
        session.applied_frames(),
        session.dropped_frames()
    );
    let Some(snapshot) = session.snapshot() else {
        panel.push_str("no state received yet");
        return panel;
    };

    let sensors = &snapshot.sensors;
    let [raw_x, raw_y, raw_z] = raw_readings(sensors);
    let _ = writeln!(
        panel,
        "sensors: x {} y {} col {}  raw {raw_x}/{raw_y}/{raw_z}  cyclic {}",
        sensors.cyclic_x,
        sensors.cyclic_y,
        sensors.collective,
        match cyclic_status(sensors) {
            CyclicStatus::Receiving => "receiving",
            CyclicStatus::NoData => "no data",
        }
    );
    let joystick = &snapshot.joystick;
    let buttons = pressed_buttons(joystick.buttons);
    let _ = writeln!(
        panel,
        "joystick: x {} y {}  buttons {}",
        joystick.cyclic_x,
        joystick.cyclic_y,
        if buttons.is_empty() {
            "none".to_owned()
        } else {
            buttons
                .iter()
                .map(|b| b.to_string())
                .collect::<Vec<_>>()
                .join(",")
        }
    );

    let view = AutopilotView::derive(&snapshot.autopilot);
    let horizontal = match view.active_horizontal {
        Some(HorizontalTarget::Roll(deg)) => format!("roll {deg:.1}°"),
        Some(HorizontalTarget::Heading(deg)) => format!("hdg {deg:03.0}°"),
        None => "-".to_owned(),
    };
    let vertical = match view.active_vertical {
        Some(VerticalTarget::Pitch(deg)) => format!("pitch {deg:.1}°"),
        Some(VerticalTarget::VerticalSpeed(fpm)) => format!("vs {fpm:.0} fpm"),
        Some(VerticalTarget::Altitude(ft)) => format!("alt {ft:.0} ft"),
        None => "-".to_owned(),
    };
    let _ = write!(
        panel,
        "autopilot: {}  {} [{horizontal}]  {} [{vertical}]",
        if view.enabled { "engaged" } else { "off" },
        view.horizontal_mode,
        view.vertical_mode
    );
    if let Some(hdg) = view.armed_heading {
        let _ = write!(panel, "  armed hdg {hdg:03.0}°");
    }
    if let Some(alt) = view.armed_altitude {
        let _ = write!(panel, "  armed alt {alt:.0} ft");
    }
    panel.push('\n');

    let inputs = session.inputs();
    let _ = write!(panel, "inputs:");
    for field in EditableField::ALL {
        let value = inputs
            .get(field)
            .map(|v| format!("{v:.0}"))
            .unwrap_or_else(|| "--".to_owned());
        let marker = if session.is_editing(field) { "*" } else { "" };
        let _ = write!(panel, " {field}={value}{marker}");
    }
    panel.push('\n');

    let sim = &snapshot.simulator;
    let link = match simulator_link(sim) {
        SimulatorLink::Never => "no data".to_owned(),
        SimulatorLink::Live { age_ms } => format!("live ({age_ms} ms)"),
        SimulatorLink::Stale { age_ms } => format!("stale ({age_ms} ms)"),
    };
    let _ = writeln!(
        panel,
        "simulator: {link}  ias {:.0} alt {:.0} hdg {:03.0} vs {:.0} pitch {:.1} roll {:.1}",
        sim.speed, sim.altitude, sim.heading, sim.vertical_speed, sim.pitch, sim.roll
    );
    let _ = write!(
        panel,
        "feedback: {}  recording: {} ({} lines)",
        if snapshot.cyclic_feedback_enabled { "on" } else { "off" },
        if session.capture().is_armed() { "on" } else { "off" },
        session.capture().line_count()
    );
    panel
}
