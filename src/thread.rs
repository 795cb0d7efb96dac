//! Simulated thread state machine.
//!
//! A [`SimThread`] is not a real thread: it is a record of one simulated
//! execution unit, advanced one tick at a time by the clock driver. It owns
//! its burst/wait counters and publishes every mutation on the event bus.

use std::sync::Arc;

use crate::event::{EventBus, SchedEvent};
use crate::types::{Priority, ThreadId, Ticks, MAX_PRIORITY};

/// The lifecycle state of a simulated thread.
///
/// Legal transitions: Queued→Running, Running→Blocked, Running→Done,
/// Blocked→Queued, plus Queued→Queued when a thread is reordered by
/// preemption. Enforcing legality is the kernel's job; an illegal
/// transition is a coordination bug and panics there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    Queued,
    Running,
    Blocked,
    Done,
}

impl std::fmt::Display for ThreadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ThreadState::Queued => "Queued",
            ThreadState::Running => "Running",
            ThreadState::Blocked => "Blocked",
            ThreadState::Done => "Done",
        };
        f.write_str(s)
    }
}

/// One simulated execution unit.
pub struct SimThread {
    id: ThreadId,
    priority: Priority,
    state: ThreadState,
    /// Configured CPU burst length.
    burst_length: Ticks,
    /// Ticks left in the current burst. Always in [1, burst_length].
    run_remaining: Ticks,
    /// Configured I/O wait length.
    wait_length: Ticks,
    /// Ticks left in the current wait. Always in [1, wait_length].
    block_remaining: Ticks,
    /// Full Queued→Running→Blocked cycles left before the thread is done.
    cycles_remaining: u32,
    /// Total ticks spent in the ready queues, for display only.
    queue_time: Ticks,
    events: Arc<EventBus>,
}

impl SimThread {
    pub(crate) fn new(
        id: ThreadId,
        burst: Ticks,
        wait: Ticks,
        priority: Priority,
        cycles: u32,
        events: Arc<EventBus>,
    ) -> Self {
        assert!(burst >= 1, "thread {id}: burst must be at least one tick");
        assert!(wait >= 1, "thread {id}: wait must be at least one tick");
        assert!(cycles >= 1, "thread {id}: cycle count must be at least one");
        assert!(
            priority <= MAX_PRIORITY,
            "thread {id}: priority {priority} out of range"
        );
        let thread = SimThread {
            id,
            priority,
            state: ThreadState::Queued,
            burst_length: burst,
            run_remaining: burst,
            wait_length: wait,
            block_remaining: wait,
            cycles_remaining: cycles,
            queue_time: 0,
            events,
        };
        thread.events.publish(SchedEvent::ThreadCreated {
            id,
            burst,
            wait,
            priority,
            cycles,
        });
        thread
    }

    pub fn id(&self) -> ThreadId {
        self.id
    }

    pub fn state(&self) -> ThreadState {
        self.state
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn burst_length(&self) -> Ticks {
        self.burst_length
    }

    pub fn run_remaining(&self) -> Ticks {
        self.run_remaining
    }

    pub fn wait_length(&self) -> Ticks {
        self.wait_length
    }

    pub fn block_remaining(&self) -> Ticks {
        self.block_remaining
    }

    pub fn cycles_remaining(&self) -> u32 {
        self.cycles_remaining
    }

    pub fn queue_time(&self) -> Ticks {
        self.queue_time
    }

    pub(crate) fn set_state(&mut self, state: ThreadState) {
        self.state = state;
        self.events.publish(SchedEvent::StateChanged { id: self.id, state });
    }

    pub(crate) fn set_priority(&mut self, priority: Priority) {
        assert!(
            priority <= MAX_PRIORITY,
            "thread {}: priority {priority} out of range",
            self.id
        );
        self.priority = priority;
        self.events
            .publish(SchedEvent::PriorityChanged { id: self.id, priority });
    }

    /// Advance the current burst by one tick.
    ///
    /// Returns `true` while the burst continues. At the burst boundary the
    /// counter resets to the full burst length, one cycle is consumed, and
    /// `false` is returned.
    pub(crate) fn advance_run(&mut self) -> bool {
        debug_assert_eq!(self.state, ThreadState::Running);
        self.run_remaining -= 1;
        let more = if self.run_remaining == 0 {
            self.run_remaining = self.burst_length;
            self.cycles_remaining -= 1;
            false
        } else {
            true
        };
        self.events.publish(SchedEvent::RunRemaining {
            id: self.id,
            remaining: self.run_remaining,
        });
        more
    }

    /// Advance the current wait by one tick.
    ///
    /// Returns `true` while the thread keeps waiting, `false` once the wait
    /// period has elapsed (the counter resets to the full wait length).
    pub(crate) fn advance_block(&mut self) -> bool {
        debug_assert_eq!(self.state, ThreadState::Blocked);
        self.block_remaining -= 1;
        let more = if self.block_remaining == 0 {
            self.block_remaining = self.wait_length;
            false
        } else {
            true
        };
        self.events.publish(SchedEvent::BlockRemaining {
            id: self.id,
            remaining: self.block_remaining,
        });
        more
    }

    pub(crate) fn add_queue_time(&mut self) {
        self.queue_time += 1;
        self.events.publish(SchedEvent::QueueTime {
            id: self.id,
            total: self.queue_time,
        });
    }
}
