use tracing::trace;

use crate::model::Snapshot;

/// Append-only recorder for the controller's pre-formatted telemetry lines.
///
/// Arming is driven by the reply to the telemetry-recording command, never
/// by the request. The controller omits the `telemetry` field whenever no
/// client is recording, so frames without it are simply skipped.
#[derive(Debug, Default, Clone)]
pub struct TelemetryCapture {
    armed: bool,
    buffer: String,
    lines: usize,
}

impl TelemetryCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Arm or disarm. Disarming keeps what was captured so far.
    pub fn set_armed(&mut self, armed: bool) {
        self.armed = armed;
    }

    /// Append the snapshot's telemetry line if armed and present.
    /// Returns whether a line was captured.
    pub fn observe(&mut self, snapshot: &Snapshot) -> bool {
        if !self.armed {
            return false;
        }
        let Some(line) = snapshot.telemetry.as_deref() else {
            return false;
        };
        self.buffer.push_str(line);
        self.buffer.push('\n');
        self.lines += 1;
        trace!(target: "rotor.capture", lines = self.lines, "captured telemetry line");
        true
    }

    pub fn contents(&self) -> &str {
        &self.buffer
    }

    pub fn line_count(&self) -> usize {
        self.lines
    }

    /// Drain the buffer, leaving the arming state untouched.
    pub fn take(&mut self) -> String {
        self.lines = 0;
        std::mem::take(&mut self.buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_line(line: Option<&str>) -> Snapshot {
        Snapshot {
            telemetry: line.map(str::to_owned),
            ..Default::default()
        }
    }

    #[test]
    fn ignores_lines_while_disarmed() {
        let mut capture = TelemetryCapture::new();
        assert!(!capture.observe(&with_line(Some("t=0"))));
        assert_eq!(capture.contents(), "");
    }

    #[test]
    fn appends_verbatim_newline_terminated() {
        let mut capture = TelemetryCapture::new();
        capture.set_armed(true);
        assert!(capture.observe(&with_line(Some("t=1,alt=100"))));
        assert!(!capture.observe(&with_line(None)));
        assert!(capture.observe(&with_line(Some("t=2,alt=101 "))));
        assert_eq!(capture.contents(), "t=1,alt=100\nt=2,alt=101 \n");
        assert_eq!(capture.line_count(), 2);
    }

    #[test]
    fn disarm_keeps_buffer_and_take_drains_it() {
        let mut capture = TelemetryCapture::new();
        capture.set_armed(true);
        capture.observe(&with_line(Some("a")));
        capture.set_armed(false);
        capture.observe(&with_line(Some("b")));
        assert_eq!(capture.take(), "a\n");
        assert_eq!(capture.contents(), "");
        assert_eq!(capture.line_count(), 0);
        assert!(!capture.is_armed());
    }
}
