//! Typed change events and the publish/subscribe bus.
//!
//! Every observable mutation in the simulation (state change, priority
//! change, counter movement, quantum/preemption settings) is published as a
//! [`SchedEvent`]. Zero or more sinks subscribe independently: the console
//! display, the text logger, or a recording [`Trace`](crate::trace::Trace)
//! in tests. Scheduling code never talks to a presentation layer directly.

use std::sync::{Arc, RwLock};

use crate::thread::ThreadState;
use crate::types::{Priority, ThreadId, Ticks};

/// A single observable change in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedEvent {
    /// A thread was created and admitted to the registry.
    ThreadCreated {
        id: ThreadId,
        burst: Ticks,
        wait: Ticks,
        priority: Priority,
        cycles: u32,
    },
    /// A thread moved to a new state.
    StateChanged { id: ThreadId, state: ThreadState },
    /// A thread's priority was promoted or demoted.
    PriorityChanged { id: ThreadId, priority: Priority },
    /// The running thread's burst counter moved.
    RunRemaining { id: ThreadId, remaining: Ticks },
    /// A blocked thread's wait counter moved.
    BlockRemaining { id: ThreadId, remaining: Ticks },
    /// A queued thread accumulated another tick of queue time.
    QueueTime { id: ThreadId, total: Ticks },
    /// The running thread was displaced in favor of another.
    Preempted { id: ThreadId },
    /// A finished thread left the registry.
    ThreadRetired { id: ThreadId },
    /// The ready queues were empty when the running slot was filled.
    CpuIdle,
    /// The active quantum changed.
    QuantumChanged { quantum: Ticks },
    /// Quantum-expiry preemption was turned on or off.
    PreemptChanged { enabled: bool },
}

/// A consumer of simulation events.
///
/// Sinks are called with the kernel lock held, so they must not call back
/// into the simulation.
pub trait EventSink: Send + Sync {
    fn notify(&self, event: &SchedEvent);
}

/// Fan-out bus from the simulation core to its observers.
#[derive(Default)]
pub struct EventBus {
    sinks: RwLock<Vec<Arc<dyn EventSink>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, sink: Arc<dyn EventSink>) {
        self.sinks.write().unwrap().push(sink);
    }

    pub fn publish(&self, event: SchedEvent) {
        for sink in self.sinks.read().unwrap().iter() {
            sink.notify(&event);
        }
    }
}
