use serde::{Deserialize, Serialize};

/// One entry of the controller's in-memory log ring, as served by `GET /logs`.
///
/// The firmware pads level names to a fixed width (`"INFO "`), so callers
/// should go through [`LogEntry::level_name`] rather than comparing `level`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: String,
    pub message: String,
}

impl LogEntry {
    pub fn level_name(&self) -> &str {
        self.level.trim()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_padded_level() {
        let entries: Vec<LogEntry> = serde_json::from_str(
            r#"[{"timestamp":"00:00:01.200","level":"WARN ","message":"no sim data"}]"#,
        )
        .expect("log entries");
        assert_eq!(entries[0].level_name(), "WARN");
        assert_eq!(entries[0].message, "no sim data");
    }
}
