//! Generation log: the ordered, append-only record of phase events for a run.
//!
//! Entries are never edited or removed once written. The orchestrator is the
//! only writer; the store persists new entries by appending rows, never by
//! rewriting the existing sequence.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Tag identifying which step of the run produced an entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogPhase {
    Init,
    Research,
    Design,
    Storyboard,
    Error,
}

impl LogPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Research => "research",
            Self::Design => "design",
            Self::Storyboard => "storyboard",
            Self::Error => "error",
        }
    }
}

impl FromStr for LogPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "init" => Ok(Self::Init),
            "research" => Ok(Self::Research),
            "design" => Ok(Self::Design),
            "storyboard" => Ok(Self::Storyboard),
            "error" => Ok(Self::Error),
            _ => Err(format!("Invalid log phase: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// RFC 3339, UTC.
    pub timestamp: String,
    pub phase: LogPhase,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl LogEntry {
    pub fn new(phase: LogPhase, message: impl Into<String>) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            phase,
            message: message.into(),
            duration_ms: None,
        }
    }

    pub fn timed(phase: LogPhase, message: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            duration_ms: Some(duration_ms),
            ..Self::new(phase, message)
        }
    }
}

/// Append-only sequence of log entries.
///
/// Entries can only be added; nothing removes, replaces or reorders them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenerationLog {
    entries: Vec<LogEntry>,
}

impl GenerationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.last()
    }

    pub fn into_entries(self) -> Vec<LogEntry> {
        self.entries
    }
}

impl FromIterator<LogEntry> for GenerationLog {
    fn from_iter<I: IntoIterator<Item = LogEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_serializes_camel_case_and_omits_missing_duration() {
        let entry = LogEntry::new(LogPhase::Init, "Course generation started");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["phase"], "init");
        assert!(json.get("durationMs").is_none());

        let timed = LogEntry::timed(LogPhase::Research, "Research completed", 1200);
        let json = serde_json::to_value(&timed).unwrap();
        assert_eq!(json["durationMs"], 1200);
    }

    #[test]
    fn test_timestamp_is_rfc3339() {
        let entry = LogEntry::new(LogPhase::Design, "x");
        assert!(chrono::DateTime::parse_from_rfc3339(&entry.timestamp).is_ok());
    }

    #[test]
    fn test_log_preserves_existing_entries_on_append() {
        let mut log = GenerationLog::new();
        log.push(LogEntry::new(LogPhase::Init, "first"));
        let snapshot = log.entries().to_vec();

        log.push(LogEntry::new(LogPhase::Research, "second"));
        log.push(LogEntry::new(LogPhase::Research, "third"));

        assert_eq!(log.entries().len(), 3);
        assert_eq!(&log.entries()[..1], snapshot.as_slice());
        assert_eq!(log.last().unwrap().message, "third");
    }

    #[test]
    fn test_log_serializes_as_plain_array() {
        let log: GenerationLog = vec![LogEntry::new(LogPhase::Error, "boom")]
            .into_iter()
            .collect();
        let json = serde_json::to_value(&log).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["message"], "boom");
    }

    #[test]
    fn test_log_phase_parses() {
        assert_eq!("storyboard".parse::<LogPhase>().unwrap(), LogPhase::Storyboard);
        assert!("validation".parse::<LogPhase>().is_err());
    }
}
