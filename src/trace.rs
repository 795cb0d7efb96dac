//! Event recording for tests and monitoring.
//!
//! A [`Trace`] subscribes to the event bus and keeps every event in order,
//! with query helpers for the properties tests care about (state history,
//! dispatch counts, settings changes).

use std::sync::Mutex;

use crate::event::{EventSink, SchedEvent};
use crate::thread::ThreadState;
use crate::types::{ThreadId, Ticks};

#[derive(Default)]
pub struct Trace {
    events: Mutex<Vec<SchedEvent>>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events recorded so far, in publication order.
    pub fn events(&self) -> Vec<SchedEvent> {
        self.events.lock().unwrap().clone()
    }

    /// The sequence of states a thread moved through.
    pub fn states(&self, id: ThreadId) -> Vec<ThreadState> {
        self.events()
            .iter()
            .filter_map(|e| match e {
                SchedEvent::StateChanged { id: i, state } if *i == id => Some(*state),
                _ => None,
            })
            .collect()
    }

    /// How many times a thread entered the Running state.
    pub fn dispatch_count(&self, id: ThreadId) -> usize {
        self.states(id)
            .iter()
            .filter(|s| **s == ThreadState::Running)
            .count()
    }

    /// The last quantum published, if any.
    pub fn last_quantum(&self) -> Option<Ticks> {
        self.events().iter().rev().find_map(|e| match e {
            SchedEvent::QuantumChanged { quantum } => Some(*quantum),
            _ => None,
        })
    }

    pub fn retired(&self, id: ThreadId) -> bool {
        self.events()
            .iter()
            .any(|e| matches!(e, SchedEvent::ThreadRetired { id: i } if *i == id))
    }

    /// Pretty-print the trace for debugging.
    pub fn dump(&self) {
        for event in self.events() {
            eprintln!("{event:?}");
        }
    }
}

impl EventSink for Trace {
    fn notify(&self, event: &SchedEvent) {
        self.events.lock().unwrap().push(*event);
    }
}
