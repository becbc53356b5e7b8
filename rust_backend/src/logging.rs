//! Structured run logging.
//!
//! Every component receives an explicit [`LogSink`] instead of reaching for a
//! process-wide logger. [`RunLog`] keeps the records of one run in memory so
//! they can be exported next to the other artifacts, and mirrors each record
//! to the `log` facade so a binary can still stream them to the console.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a run log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One structured log record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub component: String,
    pub message: String,
}

impl fmt::Display for LogRecord {
    /// `timestamp | LEVEL    | component | message`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {:<8} | {} | {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.level.as_str(),
            self.component,
            self.message
        )
    }
}

/// Destination for structured log records.
pub trait LogSink {
    fn record(&mut self, record: LogRecord);

    fn info(&mut self, component: &str, message: String) {
        self.emit(LogLevel::Info, component, message);
    }

    fn warning(&mut self, component: &str, message: String) {
        self.emit(LogLevel::Warning, component, message);
    }

    fn error(&mut self, component: &str, message: String) {
        self.emit(LogLevel::Error, component, message);
    }

    fn emit(&mut self, level: LogLevel, component: &str, message: String) {
        self.record(LogRecord {
            timestamp: Utc::now(),
            level,
            component: component.to_string(),
            message,
        });
    }
}

/// In-memory sink for one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct RunLog {
    records: Vec<LogRecord>,
    mirror: bool,
}

impl RunLog {
    /// Creates a sink that also forwards records to the `log` facade.
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            mirror: true,
        }
    }

    /// Creates a sink that only keeps records in memory.
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    pub fn count(&self, level: LogLevel) -> usize {
        self.records.iter().filter(|r| r.level == level).count()
    }

    /// Records emitted by `component`, in order.
    pub fn messages_from<'a>(&'a self, component: &'a str) -> impl Iterator<Item = &'a LogRecord> {
        self.records.iter().filter(move |r| r.component == component)
    }

    /// Renders the run log as text, one record per line.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for record in &self.records {
            out.push_str(&record.to_string());
            out.push('\n');
        }
        out
    }
}

impl LogSink for RunLog {
    fn record(&mut self, record: LogRecord) {
        if self.mirror {
            let level = match record.level {
                LogLevel::Info => log::Level::Info,
                LogLevel::Warning => log::Level::Warn,
                LogLevel::Error => log::Level::Error,
            };
            log::log!(target: record.component.as_str(), level, "{}", record.message);
        }
        self.records.push(record);
    }
}

/// Writes a boxed section title, used at stage boundaries.
pub fn log_section(sink: &mut dyn LogSink, component: &str, title: &str) {
    let rule = "=".repeat(60);
    sink.info(component, rule.clone());
    sink.info(component, format!("  {}", title));
    sink.info(component, rule);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_log_keeps_order_and_levels() {
        let mut log = RunLog::silent();
        log.info("cleaning", "start".to_string());
        log.warning("cleaning", "odd value".to_string());
        log.error("pipeline", "abort".to_string());

        assert_eq!(log.records().len(), 3);
        assert_eq!(log.count(LogLevel::Warning), 1);
        assert_eq!(log.messages_from("cleaning").count(), 2);
        assert_eq!(log.records()[2].level, LogLevel::Error);
    }

    #[test]
    fn test_record_format() {
        let mut log = RunLog::silent();
        log.warning("validator", "3 nulls".to_string());
        let text = log.to_text();
        assert!(text.contains("| WARNING  | validator | 3 nulls"));
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn test_log_section() {
        let mut log = RunLog::silent();
        log_section(&mut log, "pipeline", "CLEANING");
        assert_eq!(log.records().len(), 3);
        assert_eq!(log.records()[1].message, "  CLEANING");
    }
}
