//! simsched - Preemptive CPU scheduling simulator.
//!
//! Simulated execution units ("threads", not real threads) cycle through
//! Queued, Running and Blocked under a pluggable queue-selection policy,
//! driven one tick at a time by a single background clock thread.
//!
//! # Architecture
//!
//! - **Kernel**: registry, single Running slot, quantum/preemption settings,
//!   lifecycle routing between threads and policy
//! - **Policies**: 5-level priority feedback queue (default) or plain FIFO
//! - **Clock**: the one background thread; pause/resume/step handshake
//! - **Events**: every mutation published on a bus; display, logger and
//!   test traces subscribe independently
//!
//! # Usage
//!
//! ```rust,no_run
//! use simsched::{PriorityFeedback, Simulation};
//!
//! let sim = Simulation::new(Box::new(PriorityFeedback::new()));
//! sim.create_thread_with(4, 4, 0, 3);
//! sim.resume();
//! while sim.thread_count() > 0 {
//!     std::thread::sleep(std::time::Duration::from_millis(100));
//! }
//! ```

pub mod clock;
pub mod event;
pub mod kernel;
pub mod logger;
pub mod policy;
pub mod scenario;
pub mod sim;
pub mod thread;
pub mod trace;
pub mod types;

// Re-export the main public types for convenience.
pub use clock::{Clock, RunMode};
pub use event::{EventBus, EventSink, SchedEvent};
pub use kernel::{Kernel, ThreadSnapshot};
pub use logger::LogWriter;
pub use policy::{
    EnqueueOutcome, EnqueueReason, Fifo, PriorityFeedback, SchedPolicy, QUANTUM_FOR_PRIORITY,
};
pub use scenario::ThreadSpec;
pub use sim::Simulation;
pub use thread::{SimThread, ThreadState};
pub use trace::Trace;
pub use types::{Priority, ThreadId, Ticks, MAX_PRIORITY, MIN_PRIORITY, PRIORITY_LEVELS};
