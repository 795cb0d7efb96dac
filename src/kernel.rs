//! The coordinator: registry, running slot, and lifecycle routing.
//!
//! `Kernel` owns every live [`SimThread`], the single Running slot, the
//! active quantum, and the preemption flag. The clock driver calls
//! [`Kernel::tick`] once per elapsed time unit; everything else (thread
//! creation, quantum/preemption settings) enters through short lock-held
//! calls from outside the driver.
//!
//! State preconditions on the lifecycle entry points (`system_call` on a
//! non-Running thread, dispatching a non-Queued thread) are coordination
//! bugs between kernel and policy, and panic rather than return an error.

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::event::{EventBus, SchedEvent};
use crate::policy::{EnqueueOutcome, EnqueueReason, SchedPolicy};
use crate::thread::{SimThread, ThreadState};
use crate::types::{Priority, ThreadId, Ticks};

/// Point-in-time copy of one thread's display-relevant fields, for registry
/// enumeration by a presentation layer.
#[derive(Debug, Clone, Copy)]
pub struct ThreadSnapshot {
    pub id: ThreadId,
    pub state: ThreadState,
    pub priority: Priority,
    pub burst_length: Ticks,
    pub run_remaining: Ticks,
    pub wait_length: Ticks,
    pub block_remaining: Ticks,
    pub cycles_remaining: u32,
    pub queue_time: Ticks,
}

pub struct Kernel {
    /// Live threads, keyed by id. Ids are assigned in creation order, so
    /// iteration order matches insertion order.
    threads: BTreeMap<ThreadId, SimThread>,
    running: Option<ThreadId>,
    next_id: u32,
    quantum: Ticks,
    /// Ticks elapsed in the current quantum window.
    quantum_elapsed: Ticks,
    /// Set when a thread is dispatched; consumed by `tick` to restart the
    /// quantum window, so a quantum-expiry interrupt never fires in a tick
    /// that already rescheduled for another reason.
    dispatched: bool,
    preempt: bool,
    now: u64,
    policy: Box<dyn SchedPolicy>,
    events: Arc<EventBus>,
    rng: SmallRng,
}

impl Kernel {
    pub fn new(policy: Box<dyn SchedPolicy>, events: Arc<EventBus>) -> Self {
        Self::with_rng(policy, events, SmallRng::from_entropy())
    }

    /// Like [`Kernel::new`] but with a fixed seed for reproducible runs.
    pub fn new_seeded(policy: Box<dyn SchedPolicy>, events: Arc<EventBus>, seed: u64) -> Self {
        Self::with_rng(policy, events, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(policy: Box<dyn SchedPolicy>, events: Arc<EventBus>, rng: SmallRng) -> Self {
        let mut kernel = Kernel {
            threads: BTreeMap::new(),
            running: None,
            next_id: 0,
            quantum: 1,
            quantum_elapsed: 0,
            dispatched: false,
            preempt: false,
            now: 0,
            policy,
            events,
            rng,
        };
        // The policy dictates its startup settings.
        kernel.set_quantum(kernel.policy.initial_quantum());
        kernel.set_preempt(kernel.policy.initial_preempt());
        kernel
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn quantum(&self) -> Ticks {
        self.quantum
    }

    pub fn set_quantum(&mut self, quantum: Ticks) {
        assert!(quantum >= 1, "quantum must be at least one tick");
        self.quantum = quantum;
        self.events.publish(SchedEvent::QuantumChanged { quantum });
    }

    pub fn preempt(&self) -> bool {
        self.preempt
    }

    pub fn set_preempt(&mut self, enabled: bool) {
        self.preempt = enabled;
        self.events.publish(SchedEvent::PreemptChanged { enabled });
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    pub fn running(&self) -> Option<ThreadId> {
        self.running
    }

    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    pub fn threads(&self) -> impl Iterator<Item = &SimThread> {
        self.threads.values()
    }

    /// Enumerate the registry for a display refresh.
    pub fn snapshot(&self) -> Vec<ThreadSnapshot> {
        self.threads
            .values()
            .map(|t| ThreadSnapshot {
                id: t.id(),
                state: t.state(),
                priority: t.priority(),
                burst_length: t.burst_length(),
                run_remaining: t.run_remaining(),
                wait_length: t.wait_length(),
                block_remaining: t.block_remaining(),
                cycles_remaining: t.cycles_remaining(),
                queue_time: t.queue_time(),
            })
            .collect()
    }

    /// Create a thread with a random burst (3-10) and wait (15-60) and a
    /// fixed budget of 10 cycles.
    pub fn create_thread(&mut self, priority: Priority) -> ThreadId {
        let burst = self.rng.gen_range(3..=10);
        let wait = self.rng.gen_range(15..=60);
        self.create_thread_with(burst, wait, priority, 10)
    }

    /// Create a thread with fully explicit parameters. The thread is placed
    /// in Queued, registered, and handed to the policy.
    pub fn create_thread_with(
        &mut self,
        burst: Ticks,
        wait: Ticks,
        priority: Priority,
        cycles: u32,
    ) -> ThreadId {
        let id = ThreadId(self.next_id);
        self.next_id += 1;
        let mut thread = SimThread::new(id, burst, wait, priority, cycles, self.events.clone());
        thread.set_state(ThreadState::Queued);
        self.threads.insert(id, thread);
        self.admit(id, EnqueueReason::New);
        id
    }

    /// Route a ready thread through the policy and apply its decision.
    fn admit(&mut self, id: ThreadId, reason: EnqueueReason) {
        let mut thread = self
            .threads
            .remove(&id)
            .unwrap_or_else(|| panic!("admit: thread {id} not in registry"));
        let running = self.running.and_then(|rid| self.threads.get(&rid));
        let outcome = self.policy.enqueue(&mut thread, reason, running);
        self.threads.insert(id, thread);

        match outcome {
            EnqueueOutcome::Queued => {}
            EnqueueOutcome::Dispatch => self.set_running(Some(id)),
            EnqueueOutcome::Preempt { quantum } => {
                let old = self
                    .running
                    .take()
                    .unwrap_or_else(|| panic!("preempt decision with no running thread"));
                let displaced = self.threads.get_mut(&old).unwrap();
                displaced.set_state(ThreadState::Queued);
                self.events.publish(SchedEvent::Preempted { id: old });
                self.set_quantum(quantum);
                self.set_running(Some(id));
                self.admit(old, EnqueueReason::Preempted);
            }
        }
    }

    /// Burst completed on the running thread. Retires it if its cycle
    /// budget is spent, otherwise parks it in Blocked; either way the
    /// running slot is refilled from the policy.
    pub fn system_call(&mut self, id: ThreadId) {
        let thread = self
            .threads
            .get_mut(&id)
            .unwrap_or_else(|| panic!("system_call: thread {id} not in registry"));
        assert_eq!(
            thread.state(),
            ThreadState::Running,
            "system_call: thread {id} is not Running"
        );
        if thread.cycles_remaining() == 0 {
            thread.set_state(ThreadState::Done);
            self.threads.remove(&id);
            self.events.publish(SchedEvent::ThreadRetired { id });
        } else {
            thread.set_state(ThreadState::Blocked);
        }
        self.running = None;
        self.schedule();
    }

    /// Wait elapsed on a blocked thread: back into the ready queues, with
    /// the return-from-block promotion.
    pub fn done_waiting(&mut self, id: ThreadId) {
        let thread = self
            .threads
            .get_mut(&id)
            .unwrap_or_else(|| panic!("done_waiting: thread {id} not in registry"));
        assert_eq!(
            thread.state(),
            ThreadState::Blocked,
            "done_waiting: thread {id} is not Blocked"
        );
        thread.set_state(ThreadState::Queued);
        self.admit(id, EnqueueReason::ReturnedFromBlock);
    }

    /// Quantum expired: requeue the running thread (with demotion) and
    /// reschedule.
    pub fn interrupt(&mut self) {
        if let Some(id) = self.running.take() {
            let thread = self.threads.get_mut(&id).unwrap();
            thread.set_state(ThreadState::Queued);
            self.events.publish(SchedEvent::Preempted { id });
            self.admit(id, EnqueueReason::QuantumExceeded);
        }
        self.schedule();
    }

    fn schedule(&mut self) {
        let next = self.policy.pick_next();
        self.set_running(next);
    }

    /// Install a Queued thread in the running slot, or idle the CPU.
    pub fn set_running(&mut self, id: Option<ThreadId>) {
        match id {
            None => {
                self.running = None;
                self.events.publish(SchedEvent::CpuIdle);
            }
            Some(id) => {
                let thread = self
                    .threads
                    .get_mut(&id)
                    .unwrap_or_else(|| panic!("set_running: thread {id} not in registry"));
                assert_eq!(
                    thread.state(),
                    ThreadState::Queued,
                    "set_running: thread {id} is not Queued"
                );
                thread.set_state(ThreadState::Running);
                self.running = Some(id);
                self.dispatched = true;
            }
        }
    }

    /// Advance the simulation by one time unit.
    ///
    /// Queued threads accumulate queue time, Blocked threads count down
    /// their waits (re-entering the queues on expiry), and the Running
    /// thread counts down its burst (issuing a system call at the
    /// boundary). A tick that dispatched a thread restarts the quantum
    /// window; otherwise the window grows and, once a full quantum has
    /// passed with preemption enabled, the quantum-expiry interrupt fires.
    pub fn tick(&mut self) {
        self.now += 1;

        let ids: Vec<ThreadId> = self.threads.keys().copied().collect();
        for id in ids {
            // A done_waiting earlier in this loop can preempt and reshuffle
            // states, so re-check on every access.
            let Some(state) = self.threads.get(&id).map(|t| t.state()) else {
                continue;
            };
            match state {
                ThreadState::Queued => self.threads.get_mut(&id).unwrap().add_queue_time(),
                ThreadState::Blocked => {
                    if !self.threads.get_mut(&id).unwrap().advance_block() {
                        self.done_waiting(id);
                    }
                }
                ThreadState::Running | ThreadState::Done => {}
            }
        }

        let mut burst_end = false;
        if let Some(id) = self.running {
            if !self.threads.get_mut(&id).unwrap().advance_run() {
                burst_end = true;
                self.system_call(id);
            }
        }

        if burst_end || std::mem::take(&mut self.dispatched) {
            self.quantum_elapsed = 0;
        } else {
            self.quantum_elapsed += 1;
            if self.preempt && self.quantum_elapsed >= self.quantum {
                self.interrupt();
                self.quantum_elapsed = 0;
            }
        }
    }
}
