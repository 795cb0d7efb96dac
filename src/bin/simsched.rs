use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::info;

use simsched::scenario::{self, ThreadSpec};
use simsched::{Fifo, LogWriter, PriorityFeedback, SchedPolicy, Simulation};

/// simsched: preemptive CPU scheduling simulator
///
/// Simulated threads cycle through Queued, Running and Blocked states under
/// a priority scheduler, driven by a periodic clock. The default policy is a
/// 5-level multi-level feedback queue: a thread that exceeds its quantum is
/// demoted one level, a thread returning from I/O wait is promoted one
/// level, and a higher-priority arrival preempts the running thread. The
/// alternate FIFO policy keeps a single queue with no priority adjustment;
/// with preemption on it degenerates to round robin.
///
/// Threads come from a preset workload (--preset) or from repeated --thread
/// specs. The simulation runs until every thread has finished its cycles or
/// Ctrl-C is pressed; progress is reported as line-oriented text on the
/// console and optionally appended to a log file.
#[derive(Debug, Parser)]
struct Opts {
    /// Scheduling policy.
    #[clap(long, value_enum, default_value_t = PolicyArg::Mlfq)]
    policy: PolicyArg,

    /// Thread spec `burst:wait:priority:cycles`, or a bare priority for
    /// randomized burst/wait and 10 cycles. May be repeated.
    #[clap(short = 't', long = "thread", value_name = "SPEC")]
    threads: Vec<String>,

    /// Preset workload: three, mlfq, or ten. Default when no --thread is
    /// given is "mlfq".
    #[clap(long, conflicts_with = "threads")]
    preset: Option<String>,

    /// Tick interval in milliseconds.
    #[clap(short, long, default_value = "250")]
    speed_ms: u64,

    /// Disable quantum-expiry preemption.
    #[clap(long)]
    no_preempt: bool,

    /// Override the policy's initial quantum, in ticks.
    #[clap(long)]
    quantum: Option<u32>,

    /// Append the simulation log to this file.
    #[clap(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Seed for randomized thread timings. Random if unset.
    #[clap(long)]
    seed: Option<u64>,

    /// Enable verbose output.
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum PolicyArg {
    /// 5-level priority feedback queue.
    Mlfq,
    /// Single FIFO queue.
    Fifo,
}

fn collect_specs(opts: &Opts) -> Result<Vec<ThreadSpec>> {
    if let Some(name) = &opts.preset {
        return scenario::preset(name).ok_or_else(|| anyhow!("unknown preset {name:?}"));
    }
    if opts.threads.is_empty() {
        return Ok(scenario::preset("mlfq").unwrap());
    }
    opts.threads.iter().map(|s| s.parse()).collect()
}

fn main() -> Result<()> {
    let opts = Opts::parse();

    let llv = match opts.verbose {
        0 => simplelog::LevelFilter::Info,
        1 => simplelog::LevelFilter::Debug,
        _ => simplelog::LevelFilter::Trace,
    };
    let mut lcfg = simplelog::ConfigBuilder::new();
    lcfg.set_time_level(simplelog::LevelFilter::Error)
        .set_location_level(simplelog::LevelFilter::Off)
        .set_target_level(simplelog::LevelFilter::Off)
        .set_thread_level(simplelog::LevelFilter::Off);
    simplelog::TermLogger::init(
        llv,
        lcfg.build(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    ctrlc::set_handler(move || {
        shutdown_clone.store(true, Ordering::Relaxed);
    })
    .context("Error setting Ctrl-C handler")?;

    let specs = collect_specs(&opts)?;

    let policy: Box<dyn SchedPolicy> = match opts.policy {
        PolicyArg::Mlfq => Box::new(PriorityFeedback::new()),
        PolicyArg::Fifo => Box::new(Fifo::new()),
    };
    let sim = match opts.seed {
        Some(seed) => Simulation::new_seeded(policy, seed),
        None => Simulation::new(policy),
    };
    sim.subscribe(Arc::new(LogWriter::new(true, opts.log_file.clone())));

    for spec in &specs {
        sim.create(spec);
    }
    if let Some(quantum) = opts.quantum {
        sim.set_quantum(quantum);
    }
    if opts.no_preempt {
        sim.set_preempt(false);
    }
    sim.set_speed(Duration::from_millis(opts.speed_ms));

    info!(
        "running {} threads under {} ({} ms/tick)",
        specs.len(),
        sim.policy_name(),
        opts.speed_ms
    );
    sim.resume();

    while !shutdown.load(Ordering::Relaxed) {
        std::thread::sleep(Duration::from_millis(100));
        if sim.thread_count() == 0 {
            info!("all threads finished after {} ticks", sim.now());
            break;
        }
    }
    sim.pause();
    Ok(())
}
