//! Workload definitions: thread specs and preset scenarios.

use std::str::FromStr;

use anyhow::{anyhow, bail, Result};

use crate::types::{Priority, Ticks, MAX_PRIORITY};

/// Creation parameters for one simulated thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadSpec {
    /// Randomized burst and wait, 10 cycles.
    Random { priority: Priority },
    /// Fully explicit parameters.
    Explicit {
        burst: Ticks,
        wait: Ticks,
        priority: Priority,
        cycles: u32,
    },
}

impl FromStr for ThreadSpec {
    type Err = anyhow::Error;

    /// Parses `burst:wait:priority:cycles`, or a bare priority for
    /// randomized timings.
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        let field = |i: usize, name: &str| -> Result<u32> {
            parts[i]
                .trim()
                .parse()
                .map_err(|_| anyhow!("bad {name} in thread spec {s:?}"))
        };
        let priority_field = |i: usize| -> Result<Priority> {
            let p = field(i, "priority")?;
            if p > MAX_PRIORITY as u32 {
                bail!("priority {p} out of range 0-{MAX_PRIORITY} in thread spec {s:?}");
            }
            Ok(p as Priority)
        };
        match parts.len() {
            1 => Ok(ThreadSpec::Random {
                priority: priority_field(0)?,
            }),
            4 => {
                let burst = field(0, "burst")?;
                let wait = field(1, "wait")?;
                let priority = priority_field(2)?;
                let cycles = field(3, "cycles")?;
                if burst == 0 || wait == 0 || cycles == 0 {
                    bail!("burst, wait and cycles must be positive in thread spec {s:?}");
                }
                Ok(ThreadSpec::Explicit {
                    burst,
                    wait,
                    priority,
                    cycles,
                })
            }
            _ => bail!("thread spec {s:?} is neither `priority` nor `burst:wait:priority:cycles`"),
        }
    }
}

/// Canned workloads.
pub fn preset(name: &str) -> Option<Vec<ThreadSpec>> {
    let explicit = |burst, wait, priority, cycles| ThreadSpec::Explicit {
        burst,
        wait,
        priority,
        cycles,
    };
    match name {
        // Three short threads with identical wait times.
        "three" => Some(vec![
            explicit(4, 4, 0, 3),
            explicit(8, 4, 0, 3),
            explicit(5, 4, 0, 3),
        ]),
        // CPU-bound low-priority threads competing with interactive
        // high-priority ones; exercises promotion, demotion and preemption.
        "mlfq" => {
            let mut specs = vec![explicit(30, 50, 0, 10); 4];
            specs.extend(std::iter::repeat(ThreadSpec::Random { priority: 4 }).take(6));
            Some(specs)
        }
        // Ten randomized threads across two priority levels.
        "ten" => {
            let mut specs = vec![ThreadSpec::Random { priority: 0 }; 5];
            specs.extend(std::iter::repeat(ThreadSpec::Random { priority: 1 }).take(5));
            Some(specs)
        }
        _ => None,
    }
}
