//! # stripprobe - Main Entry Point
//!
//! Parses offsets, resolves them against the target, attaches the three
//! probes and holds them until SIGINT/SIGTERM.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, warn};

use stripprobe::cli::Args;
use stripprobe::domain::{Error, InputError};
use stripprobe::preflight::{raise_memlock_rlimit, run_preflight_checks};
use stripprobe::probing::{
    print_probe_hits, AyaBackend, ProbePlan, RequestedOffsets, Session, ShutdownSignals,
    DEFAULT_UNIT_PATH,
};

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;
const EXIT_NOPERM: i32 = 77;

fn main() {
    let args = Args::parse();
    init_logging(args.quiet);
    std::process::exit(match run(args) {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn init_logging(quiet: bool) {
    let default_filter = if quiet { "warn" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<InputError>().is_some()
        || matches!(err.downcast_ref::<Error>(), Some(Error::Input(_)))
    {
        return EXIT_USAGE;
    }
    let msg = format!("{err:#}").to_lowercase();
    if msg.contains("permission denied")
        || msg.contains("operation not permitted")
        || msg.contains("requires root")
    {
        EXIT_NOPERM
    } else {
        EXIT_ERROR
    }
}

#[tokio::main]
async fn run(args: Args) -> Result<()> {
    // Offsets are validated before the target is touched
    let offsets = RequestedOffsets::parse(&args.read_offset, &args.write_offset)?;

    run_preflight_checks(&args.target, args.resolve_only, args.quiet)?;
    let target = std::fs::canonicalize(&args.target)
        .with_context(|| format!("Failed to resolve path: {}", args.target.display()))?;

    let plan = ProbePlan::resolve(&target, offsets)?;

    if !args.quiet || args.resolve_only {
        println!("stripprobe v{}", env!("CARGO_PKG_VERSION"));
        println!("target: {}", target.display());
        println!("base: 0x{:x}", plan.base);
        println!("read: {} (entry)", plan.read);
        println!("write: {} (entry + return)", plan.write);
    }

    if args.resolve_only {
        return Ok(());
    }

    raise_memlock_rlimit();

    // Before anything is acquired, so an early Ctrl+C still gets a teardown
    let mut signals =
        ShutdownSignals::install().context("Failed to install termination signal handlers")?;

    let unit_path = args.program.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_UNIT_PATH));
    let backend = AyaBackend::new(unit_path, args.pid);
    let mut session = Session::establish(backend, &plan, &args.attach_strategy())?;

    if !args.quiet {
        println!("Probes attached, waiting for trace events (Ctrl+C to detach)");
        println!("  sudo cat /sys/kernel/debug/tracing/trace_pipe");
    }

    let termination = session.run_until(signals.recv()).await;
    info!("Received {termination}, detaching probes");

    if let Some(bpf) = session.unit_mut() {
        if let Err(e) = print_probe_hits(bpf) {
            warn!("Probe hit counters unavailable: {e:#}");
        }
    }

    let report = session.teardown();
    if !report.is_clean() {
        bail!(
            "{} of {} resources failed to release",
            report.failures.len(),
            report.failures.len() + report.released.len()
        );
    }

    if !args.quiet {
        println!("Detached {} resources", report.released.len());
    }

    Ok(())
}
