//! `EventSink`: the typed progress/message/query collaborator interface
//! (spec.md §6). The core never prints or reads a terminal directly — every
//! user-visible or user-interactive moment goes through this trait so a host
//! can route it to a TUI, a log file, or a scripted answer.

use std::fmt;

/// Severity of a `Message` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Events the core emits while driving a solve/schedule pipeline.
#[derive(Debug, Clone)]
pub enum Event<'a> {
    /// Coarse progress through a bounded piece of work (e.g. per-remote
    /// query, per scheduler pass).
    Progress { current: u64, total: u64 },
    /// A human-readable message at a given severity.
    Message { level: MessageLevel, text: &'a str },
    /// A trigger/hook name about to run, and whether this is cleanup-phase.
    /// Dispatch itself is out of scope; this is notification only.
    Trigger { name: &'a str, cleanup: bool },
    /// Result of a conflict-discovery pass, for progress reporting.
    IntegrityCheck { conflict_count: usize },
}

impl fmt::Display for Event<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Progress { current, total } => write!(f, "progress {current}/{total}"),
            Self::Message { level, text } => write!(f, "[{level:?}] {text}"),
            Self::Trigger { name, cleanup } => {
                write!(f, "trigger {name} (cleanup={cleanup})")
            }
            Self::IntegrityCheck { conflict_count } => {
                write!(f, "integrity check: {conflict_count} conflict(s)")
            }
        }
    }
}

/// Collaborator that receives events and answers interactive prompts.
///
/// Implementations must be cheap to call repeatedly; the core calls this at
/// every well-defined cancellation point (spec.md §5).
pub trait EventSink: Send + Sync {
    /// Deliver an event. Return `true` to request cancellation (observed at
    /// the next well-defined checkpoint), `false` to continue.
    fn emit(&self, event: &Event<'_>) -> bool {
        let _ = event;
        false
    }

    /// Ask the user a yes/no question (e.g. "drop this failed literal?").
    /// Non-interactive hosts should return a fixed policy answer.
    fn query_yes_no(&self, text: &str) -> bool {
        let _ = text;
        false
    }

    /// Ask the user to pick among options; `None` means "none selected".
    fn query_select(&self, text: &str, options: &[&str]) -> Option<usize> {
        let _ = (text, options);
        None
    }
}

/// An `EventSink` that discards everything and never cancels; useful in
/// tests and as a default.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventSink;

impl EventSink for NullEventSink {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_sink_never_cancels() {
        let sink = NullEventSink;
        assert!(!sink.emit(&Event::Progress {
            current: 1,
            total: 2
        }));
        assert!(!sink.query_yes_no("drop foo?"));
        assert_eq!(sink.query_select("pick one", &["a", "b"]), None);
    }
}
