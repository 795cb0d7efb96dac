//! Line-oriented log sink.
//!
//! Subscribes to the event bus and renders lifecycle events as text, to the
//! console (through the `log` facade) and optionally to an append-only log
//! file. File trouble is not the simulation's problem: the first open or
//! write error is reported once and file output is disabled from then on.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use log::{info, warn};

use crate::event::{EventSink, SchedEvent};
use crate::thread::ThreadState;

enum FileState {
    Disabled,
    /// Opened lazily on first write.
    Pending(PathBuf),
    Open(File),
    /// Gave up after an open/write error.
    Failed,
}

pub struct LogWriter {
    console: bool,
    file: Mutex<FileState>,
}

impl LogWriter {
    pub fn new(console: bool, file: Option<PathBuf>) -> Self {
        LogWriter {
            console,
            file: Mutex::new(match file {
                Some(path) => FileState::Pending(path),
                None => FileState::Disabled,
            }),
        }
    }

    fn write_line(&self, line: &str) {
        if self.console {
            info!("{line}");
        }

        let mut state = self.file.lock().unwrap();
        if let FileState::Pending(path) = &*state {
            match OpenOptions::new().create(true).append(true).open(path) {
                Ok(file) => *state = FileState::Open(file),
                Err(err) => {
                    warn!("cannot open log file {}: {err}; file logging disabled", path.display());
                    *state = FileState::Failed;
                }
            }
        }
        if let FileState::Open(file) = &mut *state {
            if let Err(err) = writeln!(file, "{line}") {
                warn!("cannot write log file: {err}; file logging disabled");
                *state = FileState::Failed;
            }
        }
    }
}

impl EventSink for LogWriter {
    fn notify(&self, event: &SchedEvent) {
        let line = match event {
            SchedEvent::ThreadCreated {
                id,
                burst,
                wait,
                priority,
                cycles,
            } => format!(
                "new thread {id}: burst {burst}, wait {wait}, priority {priority}, cycles {cycles}"
            ),
            SchedEvent::StateChanged { id, state } => match state {
                ThreadState::Running => format!("thread {id}: running"),
                ThreadState::Blocked => format!("thread {id}: waiting"),
                ThreadState::Queued => format!("thread {id}: queued"),
                ThreadState::Done => format!("thread {id}: all done"),
            },
            SchedEvent::PriorityChanged { id, priority } => {
                format!("thread {id}: priority now {priority}")
            }
            SchedEvent::Preempted { id } => format!("thread {id}: preempted"),
            SchedEvent::ThreadRetired { id } => format!("thread {id}: retired"),
            SchedEvent::CpuIdle => "cpu idle".to_string(),
            SchedEvent::QuantumChanged { quantum } => format!("quantum set to {quantum}"),
            SchedEvent::PreemptChanged { enabled } => format!(
                "preemption {}",
                if *enabled { "enabled" } else { "disabled" }
            ),
            // Counter movement is for the display layer, not the text log.
            SchedEvent::RunRemaining { .. }
            | SchedEvent::BlockRemaining { .. }
            | SchedEvent::QueueTime { .. } => return,
        };
        self.write_line(&line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ThreadId;

    #[test]
    fn open_failure_disables_file_output_permanently() {
        let writer = LogWriter::new(false, Some(PathBuf::from("/nonexistent-dir/sched.log")));
        writer.notify(&SchedEvent::CpuIdle);
        assert!(matches!(*writer.file.lock().unwrap(), FileState::Failed));
        // Subsequent events take the disabled path without retrying.
        writer.notify(&SchedEvent::Preempted { id: ThreadId(0) });
        assert!(matches!(*writer.file.lock().unwrap(), FileState::Failed));
    }

    #[test]
    fn lines_are_appended_to_the_log_file() {
        let path = std::env::temp_dir().join(format!("simsched-log-{}", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let writer = LogWriter::new(false, Some(path.clone()));
        writer.notify(&SchedEvent::QuantumChanged { quantum: 3 });
        writer.notify(&SchedEvent::CpuIdle);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "quantum set to 3\ncpu idle\n");
        let _ = std::fs::remove_file(&path);
    }
}
