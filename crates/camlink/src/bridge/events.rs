//! Log and status events the bridge reports to its host.
//!
//! Purely observational: nothing in the bridge depends on an observer being
//! present or doing anything. Every log event also goes to the `log` facade, so a
//! [`NoopObserver`] loses nothing that the terminal wouldn't show.

use serde::{Deserialize, Serialize};

/// Severity of a [`LogEvent`]. `Success` marks the end of a user-visible step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEvent {
    pub level: LogLevel,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl LogEvent {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Re-emits the event through the `log` facade.
    pub(crate) fn forward_to_log(&self) {
        let target = "camlink::bridge";
        let details = self.details.as_deref().map(|d| format!(" ({d})")).unwrap_or_default();
        match self.level {
            LogLevel::Debug => log::debug!(target: target, "{}{}", self.message, details),
            LogLevel::Info | LogLevel::Success => log::info!(target: target, "{}{}", self.message, details),
            LogLevel::Warning => log::warn!(target: target, "{}{}", self.message, details),
            LogLevel::Error => log::error!(target: target, "{}{}", self.message, details),
        }
    }
}

/// Connection state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Error,
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEvent {
    pub status: ConnectionStatus,
}

/// Receives bridge events. Called from whichever thread runs the bridge call.
pub trait BridgeObserver: Send + Sync {
    fn on_log(&self, event: &LogEvent);
    fn on_status(&self, event: &StatusEvent);
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl BridgeObserver for NoopObserver {
    fn on_log(&self, _event: &LogEvent) {}
    fn on_status(&self, _event: &StatusEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event_serialization() {
        let event = LogEvent::new(LogLevel::Success, "Connected to camera").with_details("Canon EOS R6");
        assert_eq!(
            serde_json::to_string(&event).unwrap(),
            r#"{"level":"SUCCESS","message":"Connected to camera","details":"Canon EOS R6"}"#
        );

        let event = LogEvent::new(LogLevel::Warning, "No event channel");
        assert_eq!(
            serde_json::to_string(&event).unwrap(),
            r#"{"level":"WARNING","message":"No event channel"}"#
        );
    }

    #[test]
    fn test_status_event_serialization() {
        let event = StatusEvent {
            status: ConnectionStatus::Disconnected,
        };
        assert_eq!(serde_json::to_string(&event).unwrap(), r#"{"status":"disconnected"}"#);
    }

    #[test]
    fn test_noop_observer_accepts_events() {
        let observer = NoopObserver;
        let event = LogEvent::new(LogLevel::Debug, "ignored");
        observer.on_log(&event);
        observer.on_status(&StatusEvent {
            status: ConnectionStatus::Connecting,
        });
        event.forward_to_log();
    }
}
