//! Observability subsystem
//!
//! Provides:
//! - Structured logging (JSON lines on stderr)
//! - Deterministic counters
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on parameterization results
//! 3. No async or background threads
//!
//! # Usage
//!
//! ```ignore
//! use matchparam::observability::{log_event_with_fields, metrics, Event};
//!
//! log_event_with_fields(Event::ConfigLoaded, &[("path", "matchparam.json")]);
//! let snapshot = metrics::global().snapshot();
//! ```

mod events;
mod logger;
pub mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};

/// Log an event at INFO, or FATAL for fatal events
pub fn log_event(event: Event) {
    log_event_with_fields(event, &[]);
}

/// Log an event with fields at INFO, or FATAL for fatal events
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    let severity = if event.is_fatal() {
        Severity::Fatal
    } else {
        Severity::Info
    };
    Logger::log(severity, event.as_str(), fields);
}

/// Log an event at an explicit severity
pub fn log_event_at(severity: Severity, event: Event, fields: &[(&str, &str)]) {
    Logger::log(severity, event.as_str(), fields);
}
