//! Logging sink for recoverable fit anomalies
//!
//! Bad prefixes, degenerate x-axes and solver failures are never fatal to the
//! process; they are reported through a [`FitLog`] handed to
//! [`FitLogic`](super::FitLogic) at construction.

use std::sync::Mutex;

/// Receiver for warnings and errors raised while building and running fits
#[cfg_attr(test, mockall::automock)]
pub trait FitLog: Send + Sync {
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Forwards to the `tracing` macros
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl FitLog for TracingLog {
    fn warn(&self, message: &str) {
        tracing::warn!("{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!("{}", message);
    }
}

/// Severity of a captured message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Warn,
    Error,
}

/// Keeps every message in memory, for callers that want to inspect what a fit
/// reported instead of sending it to a subscriber
#[derive(Debug, Default)]
pub struct MemoryLog {
    records: Mutex<Vec<(LogLevel, String)>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the captured messages in arrival order
    pub fn records(&self) -> Vec<(LogLevel, String)> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Captured messages of one level
    pub fn messages(&self, level: LogLevel) -> Vec<String> {
        self.records()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }

    fn push(&self, level: LogLevel, message: &str) {
        if let Ok(mut records) = self.records.lock() {
            records.push((level, message.to_string()));
        }
    }
}

impl FitLog for MemoryLog {
    fn warn(&self, message: &str) {
        tracing::warn!("{}", message);
        self.push(LogLevel::Warn, message);
    }

    fn error(&self, message: &str) {
        tracing::error!("{}", message);
        self.push(LogLevel::Error, message);
    }
}
