//! Queue-selection policies.
//!
//! The kernel routes every ready thread through a [`SchedPolicy`], which
//! owns the ready queues and decides dispatch, queueing, and preemption.
//! Two policies exist: [`PriorityFeedback`] (the default, a 5-level
//! multi-level feedback queue) and [`Fifo`] (a single queue, with round
//! robin behavior when quantum-expiry preemption is on). The two are never
//! mixed; the choice is made once at simulation construction.

use std::collections::VecDeque;

use crate::thread::SimThread;
use crate::types::{ThreadId, Ticks, MAX_PRIORITY, MIN_PRIORITY, PRIORITY_LEVELS};

/// Round robin quantum per priority level, in ticks.
pub const QUANTUM_FOR_PRIORITY: [Ticks; PRIORITY_LEVELS] = [4, 8, 16, 25, 40];

/// Why a thread is entering the ready queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueReason {
    /// Just created.
    New,
    /// Finished an I/O wait. Rewarded with a one-level promotion.
    ReturnedFromBlock,
    /// Ran out its quantum. Penalized with a one-level demotion.
    QuantumExceeded,
    /// Displaced by a higher-priority thread. Priority unchanged.
    Preempted,
}

/// What the kernel should do with a thread that just became ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// The running slot is free: dispatch the thread immediately.
    Dispatch,
    /// Displace the running thread and switch to the given quantum.
    Preempt { quantum: Ticks },
    /// The thread was parked in a ready queue.
    Queued,
}

/// The queue-selection policy contract.
///
/// `enqueue` may adjust the thread's priority (promotion/demotion) before
/// deciding. Threads displaced by a `Preempt` outcome are handed back via
/// `enqueue` with [`EnqueueReason::Preempted`]; requeue reasons
/// (`QuantumExceeded`, `Preempted`) always park the thread, since the
/// kernel follows them with a `pick_next`.
pub trait SchedPolicy: Send {
    fn name(&self) -> &'static str;

    /// Quantum in force before the first preemption switches it.
    fn initial_quantum(&self) -> Ticks {
        3
    }

    /// Whether quantum-expiry preemption starts out enabled.
    fn initial_preempt(&self) -> bool {
        true
    }

    fn enqueue(
        &mut self,
        thread: &mut SimThread,
        reason: EnqueueReason,
        running: Option<&SimThread>,
    ) -> EnqueueOutcome;

    /// Pull the next thread to run, or `None` to idle the CPU.
    fn pick_next(&mut self) -> Option<ThreadId>;
}

/// Multi-level feedback queue over five priority levels.
///
/// Priority acts as coarse feedback: exceeding a quantum demotes a thread
/// one level, returning from a wait promotes it one level, which penalizes
/// CPU-bound behavior and rewards interactive behavior without true aging
/// timers. A thread entering the queues with strictly higher priority than
/// the running one preempts it, and the active quantum switches to the
/// table value for the entering thread's level.
#[derive(Default)]
pub struct PriorityFeedback {
    ready: [VecDeque<ThreadId>; PRIORITY_LEVELS],
}

impl PriorityFeedback {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SchedPolicy for PriorityFeedback {
    fn name(&self) -> &'static str {
        "mlfq"
    }

    fn enqueue(
        &mut self,
        thread: &mut SimThread,
        reason: EnqueueReason,
        running: Option<&SimThread>,
    ) -> EnqueueOutcome {
        match reason {
            EnqueueReason::ReturnedFromBlock if thread.priority() < MAX_PRIORITY => {
                thread.set_priority(thread.priority() + 1);
            }
            EnqueueReason::QuantumExceeded if thread.priority() > MIN_PRIORITY => {
                thread.set_priority(thread.priority() - 1);
            }
            _ => {}
        }

        let id = thread.id();
        let priority = thread.priority();

        match reason {
            // Requeue paths never dispatch; pick_next follows immediately.
            EnqueueReason::QuantumExceeded | EnqueueReason::Preempted => {
                self.ready[priority as usize].push_back(id);
                EnqueueOutcome::Queued
            }
            EnqueueReason::New | EnqueueReason::ReturnedFromBlock => match running {
                None => EnqueueOutcome::Dispatch,
                Some(running) if priority > running.priority() => EnqueueOutcome::Preempt {
                    quantum: QUANTUM_FOR_PRIORITY[priority as usize],
                },
                Some(_) => {
                    self.ready[priority as usize].push_back(id);
                    EnqueueOutcome::Queued
                }
            },
        }
    }

    fn pick_next(&mut self) -> Option<ThreadId> {
        // Level 0 is scanned first; FIFO within a level.
        self.ready.iter_mut().find_map(|queue| queue.pop_front())
    }
}

/// Single FIFO queue with no priority adjustment and no preemption on
/// enqueue. With quantum-expiry preemption on this is plain round robin;
/// with it off, first-come first-served.
#[derive(Default)]
pub struct Fifo {
    ready: VecDeque<ThreadId>,
}

impl Fifo {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SchedPolicy for Fifo {
    fn name(&self) -> &'static str {
        "fifo"
    }

    fn enqueue(
        &mut self,
        thread: &mut SimThread,
        reason: EnqueueReason,
        running: Option<&SimThread>,
    ) -> EnqueueOutcome {
        match reason {
            EnqueueReason::QuantumExceeded | EnqueueReason::Preempted => {
                self.ready.push_back(thread.id());
                EnqueueOutcome::Queued
            }
            EnqueueReason::New | EnqueueReason::ReturnedFromBlock => {
                if running.is_none() {
                    EnqueueOutcome::Dispatch
                } else {
                    self.ready.push_back(thread.id());
                    EnqueueOutcome::Queued
                }
            }
        }
    }

    fn pick_next(&mut self) -> Option<ThreadId> {
        self.ready.pop_front()
    }
}
