//! Preemption and quantum-expiry scenarios.

use std::sync::Arc;

use simsched::{
    EventBus, Fifo, Kernel, PriorityFeedback, SchedEvent, SchedPolicy, ThreadState, Trace,
};

fn kernel_with_trace(policy: Box<dyn SchedPolicy>) -> (Kernel, Arc<Trace>) {
    let events = Arc::new(EventBus::new());
    let trace = Arc::new(Trace::new());
    events.subscribe(trace.clone());
    (Kernel::new_seeded(policy, events, 42), trace)
}

/// With a priority-0 thread running, a priority-4 arrival preempts it: the
/// displaced thread returns to Queued at its own level and the active
/// quantum becomes the table value for level 4.
#[test]
fn higher_priority_arrival_preempts_running_thread() {
    let (mut kernel, trace) = kernel_with_trace(Box::new(PriorityFeedback::new()));

    let low = kernel.create_thread_with(9, 4, 0, 3);
    assert_eq!(kernel.running(), Some(low));

    let high = kernel.create_thread_with(9, 4, 4, 3);
    assert_eq!(kernel.running(), Some(high));
    assert_eq!(kernel.quantum(), 40);
    assert_eq!(trace.last_quantum(), Some(40));

    let low_thread = kernel.threads().find(|t| t.id() == low).unwrap();
    assert_eq!(low_thread.state(), ThreadState::Queued);
    assert_eq!(low_thread.priority(), 0);
    assert!(trace
        .events()
        .iter()
        .any(|e| matches!(e, SchedEvent::Preempted { id } if *id == low)));
}

/// An equal-priority arrival does not preempt.
#[test]
fn equal_priority_arrival_waits_its_turn() {
    let (mut kernel, _trace) = kernel_with_trace(Box::new(PriorityFeedback::new()));
    let first = kernel.create_thread_with(9, 4, 2, 3);
    let second = kernel.create_thread_with(9, 4, 2, 3);
    assert_eq!(kernel.running(), Some(first));
    let t = kernel.threads().find(|t| t.id() == second).unwrap();
    assert_eq!(t.state(), ThreadState::Queued);
}

/// Under FIFO with preemption on, quantum expiry rotates equal threads
/// round-robin: with the default quantum of 3 and the dispatch tick
/// excluded from the window, the slot flips every 4 ticks.
#[test]
fn fifo_quantum_expiry_rotates_round_robin() {
    let (mut kernel, trace) = kernel_with_trace(Box::new(Fifo::new()));
    let a = kernel.create_thread_with(30, 4, 0, 1);
    let b = kernel.create_thread_with(30, 4, 0, 1);
    assert_eq!(kernel.running(), Some(a));

    for _ in 0..4 {
        kernel.tick();
    }
    assert_eq!(kernel.running(), Some(b));

    for _ in 0..4 {
        kernel.tick();
    }
    assert_eq!(kernel.running(), Some(a));
    assert_eq!(trace.dispatch_count(a), 2);
    assert_eq!(trace.dispatch_count(b), 1);
}

/// A tick that dispatches restarts the quantum window, so a lone thread
/// with quantum 3 is interrupted every 4th tick.
#[test]
fn dispatch_tick_does_not_count_against_the_quantum() {
    let (mut kernel, trace) = kernel_with_trace(Box::new(PriorityFeedback::new()));
    kernel.create_thread_with(30, 4, 0, 1);

    for _ in 0..12 {
        kernel.tick();
    }
    let preemptions = trace
        .events()
        .iter()
        .filter(|e| matches!(e, SchedEvent::Preempted { .. }))
        .count();
    assert_eq!(preemptions, 3);
}

/// With quantum-expiry preemption off, FIFO is first-come first-served:
/// the running thread keeps the CPU through its whole burst.
#[test]
fn fcfs_runs_bursts_to_completion() {
    let (mut kernel, _trace) = kernel_with_trace(Box::new(Fifo::new()));
    kernel.set_preempt(false);
    let a = kernel.create_thread_with(10, 4, 0, 1);
    let b = kernel.create_thread_with(10, 4, 0, 1);

    for _ in 0..9 {
        kernel.tick();
        assert_eq!(kernel.running(), Some(a));
    }
    kernel.tick();
    // a's burst ends on tick 10 and it is done; b takes over.
    assert_eq!(kernel.running(), Some(b));
}
