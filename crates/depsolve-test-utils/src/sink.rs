//! An `EventSink` that records every event as a display string and answers
//! interactive queries from a fixed, configurable policy, so a test can
//! assert on what the core reported without wiring up a real UI.

use depsolve_core::{Event, EventSink};
use parking_lot::Mutex;

#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<String>>,
    yes_no_answer: bool,
    select_answer: Option<usize>,
}

impl RecordingEventSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn answering_yes_no(mut self, answer: bool) -> Self {
        self.yes_no_answer = answer;
        self
    }

    #[must_use]
    pub fn answering_select(mut self, answer: Option<usize>) -> Self {
        self.select_answer = answer;
        self
    }

    #[must_use]
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }
}

impl EventSink for RecordingEventSink {
    fn emit(&self, event: &Event<'_>) -> bool {
        self.events.lock().push(event.to_string());
        false
    }

    fn query_yes_no(&self, _text: &str) -> bool {
        self.yes_no_answer
    }

    fn query_select(&self, _text: &str, _options: &[&str]) -> Option<usize> {
        self.select_answer
    }
}
