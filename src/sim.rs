//! The simulation facade: kernel + clock + event bus.
//!
//! `Simulation` is the surface the outside world (CLI, a display layer)
//! talks to. It owns the kernel behind a mutex, lazily starts the clock
//! driver on the first thread creation, and forwards control commands.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::clock::Clock;
use crate::event::{EventBus, EventSink};
use crate::kernel::{Kernel, ThreadSnapshot};
use crate::policy::SchedPolicy;
use crate::scenario::ThreadSpec;
use crate::types::{Priority, ThreadId, Ticks};

pub struct Simulation {
    kernel: Arc<Mutex<Kernel>>,
    events: Arc<EventBus>,
    /// Started by the first thread creation.
    clock: Mutex<Option<Clock>>,
}

impl Simulation {
    pub fn new(policy: Box<dyn SchedPolicy>) -> Self {
        let events = Arc::new(EventBus::new());
        Simulation {
            kernel: Arc::new(Mutex::new(Kernel::new(policy, events.clone()))),
            events,
            clock: Mutex::new(None),
        }
    }

    /// Like [`Simulation::new`] but with a fixed seed for randomized
    /// thread timings.
    pub fn new_seeded(policy: Box<dyn SchedPolicy>, seed: u64) -> Self {
        let events = Arc::new(EventBus::new());
        Simulation {
            kernel: Arc::new(Mutex::new(Kernel::new_seeded(policy, events.clone(), seed))),
            events,
            clock: Mutex::new(None),
        }
    }

    pub fn subscribe(&self, sink: Arc<dyn EventSink>) {
        self.events.subscribe(sink);
    }

    fn ensure_clock(&self) {
        let mut clock = self.clock.lock().unwrap();
        if clock.is_none() {
            *clock = Some(Clock::spawn(self.kernel.clone()));
        }
    }

    pub fn create_thread(&self, priority: Priority) -> ThreadId {
        let id = self.kernel.lock().unwrap().create_thread(priority);
        self.ensure_clock();
        id
    }

    pub fn create_thread_with(
        &self,
        burst: Ticks,
        wait: Ticks,
        priority: Priority,
        cycles: u32,
    ) -> ThreadId {
        let id = self
            .kernel
            .lock()
            .unwrap()
            .create_thread_with(burst, wait, priority, cycles);
        self.ensure_clock();
        id
    }

    pub fn create(&self, spec: &ThreadSpec) -> ThreadId {
        match *spec {
            ThreadSpec::Random { priority } => self.create_thread(priority),
            ThreadSpec::Explicit {
                burst,
                wait,
                priority,
                cycles,
            } => self.create_thread_with(burst, wait, priority, cycles),
        }
    }

    // Driver control surface. All of these are no-ops until the first
    // thread creation has started the clock.

    /// Toggle between stopped and running; returns `true` if now running.
    pub fn toggle(&self) -> bool {
        self.clock
            .lock()
            .unwrap()
            .as_ref()
            .map(Clock::toggle)
            .unwrap_or(false)
    }

    pub fn resume(&self) {
        if let Some(clock) = self.clock.lock().unwrap().as_ref() {
            clock.resume();
        }
    }

    pub fn pause(&self) {
        if let Some(clock) = self.clock.lock().unwrap().as_ref() {
            clock.pause();
        }
    }

    /// Advance the simulation by exactly one time unit.
    pub fn step(&self) {
        if let Some(clock) = self.clock.lock().unwrap().as_ref() {
            clock.step();
        }
    }

    pub fn set_speed(&self, interval: Duration) {
        if let Some(clock) = self.clock.lock().unwrap().as_ref() {
            clock.set_speed(interval);
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.clock
            .lock()
            .unwrap()
            .as_ref()
            .map(Clock::is_stopped)
            .unwrap_or(true)
    }

    // Settings and registry access.

    pub fn set_preempt(&self, enabled: bool) {
        self.kernel.lock().unwrap().set_preempt(enabled);
    }

    pub fn preempt(&self) -> bool {
        self.kernel.lock().unwrap().preempt()
    }

    pub fn set_quantum(&self, quantum: Ticks) {
        self.kernel.lock().unwrap().set_quantum(quantum);
    }

    pub fn quantum(&self) -> Ticks {
        self.kernel.lock().unwrap().quantum()
    }

    /// Registry enumeration for a display refresh.
    pub fn snapshot(&self) -> Vec<ThreadSnapshot> {
        self.kernel.lock().unwrap().snapshot()
    }

    pub fn thread_count(&self) -> usize {
        self.kernel.lock().unwrap().thread_count()
    }

    pub fn now(&self) -> u64 {
        self.kernel.lock().unwrap().now()
    }

    pub fn policy_name(&self) -> &'static str {
        self.kernel.lock().unwrap().policy_name()
    }
}
