// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod pool;
pub mod store;
pub mod types;

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::ConfigFile;
use crate::config::loader::load_and_validate;
use crate::dag::{DependencyGraph, PendingSet, ReadinessOracle};
use crate::engine::{CoreScheduler, Runtime, RuntimeOptions, StopSignal, drain};
use crate::exec::{ProcessRunner, RealExecutorBackend, SolverCommand, Transport, UnitContext};
use crate::fs::{FileSystem, RealFileSystem};
use crate::pool::{MachineListFile, MachinePool};
use crate::store::ArtifactStore;
use crate::types::OnExit;

/// How many ready cells `--dry-run` lists.
const DRY_RUN_READY_PREVIEW: usize = 10;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and CLI overrides
/// - store, machine pool and stop signal
/// - executor and control loop
/// - Ctrl-C handling
/// - drain/abandon of units still running when the loop stops
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args.config.clone();
    let mut cfg = load_and_validate(&config_path)?;
    apply_overrides(&mut cfg, &args);

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let graph = DependencyGraph::new(cfg.bounds());
    let store = ArtifactStore::new(Arc::clone(&fs), cfg.store.root.clone());
    let pool = MachinePool::new(Box::new(MachineListFile::new(
        Arc::clone(&fs),
        cfg.machines.file.clone(),
    )));

    if args.dry_run {
        print_dry_run(&cfg, &graph, &store, &pool);
        return Ok(());
    }

    store.ensure_layout()?;

    let stop = StopSignal::new(Arc::clone(&fs), cfg.control.stop_file.clone());
    if stop.is_set() {
        warn!(
            sentinel = %stop.sentinel().display(),
            "stop file already present; nothing will be dispatched"
        );
    }

    // Ctrl-C → stop dispatching; a second Ctrl-C exits at once.
    {
        let stop = stop.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            warn!("Ctrl+C received; no further cells will be dispatched");
            stop.trigger();

            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("second Ctrl+C; exiting without waiting for running units");
                std::process::exit(130);
            }
        });
    }

    let ctx = Arc::new(UnitContext {
        graph,
        store: store.clone(),
        remote_root: cfg.remote_root().clone(),
        solver: SolverCommand {
            program: cfg.solver.program.clone(),
            remote_program: cfg.remote_program().to_string(),
            subcommand: cfg.solver.subcommand.clone(),
        },
        transport: Transport {
            ssh_program: cfg.remote.ssh.clone(),
            scp_program: cfg.remote.scp.clone(),
            options: cfg.remote.options.clone(),
        },
        runner: Arc::new(ProcessRunner),
    });
    let executor = RealExecutorBackend::new(ctx);

    let core = CoreScheduler::new(graph, Arc::new(store), pool, runtime_options(&cfg));
    let report = Runtime::new(core, executor, stop).run().await;

    match cfg.control.on_exit {
        OnExit::Drain => {
            let failed = drain(report.outstanding).await;
            if failed > 0 {
                warn!(failed, "some units failed while draining");
            }
        }
        OnExit::Abandon => {
            if !report.outstanding.is_empty() {
                let cells: Vec<String> = report
                    .outstanding
                    .iter()
                    .map(|t| format!("({}) on {}", t.cell(), t.machine()))
                    .collect();
                warn!(?cells, "abandoning running units");
            }
        }
    }

    info!(
        reason = %report.reason,
        dispatched = report.dispatched,
        failed = report.failed,
        pending = report.pending_left,
        "cellfarm finished"
    );
    Ok(())
}

fn apply_overrides(cfg: &mut ConfigFile, args: &CliArgs) {
    if let Some(ms) = args.poll_ms {
        cfg.control.poll_interval_ms = ms;
    }
    if let Some(on_exit) = args.on_exit {
        cfg.control.on_exit = on_exit;
    }
    if let Some(on_failure) = args.on_failure {
        cfg.control.on_failure = on_failure;
    }
}

pub fn runtime_options(cfg: &ConfigFile) -> RuntimeOptions {
    RuntimeOptions {
        poll_interval: cfg.poll_interval(),
        on_failure: cfg.control.on_failure,
        max_attempts: cfg.control.max_attempts,
    }
}

/// Print what a run would do: grid size, store progress, machines and the
/// cells that are ready right now.
fn print_dry_run(cfg: &ConfigFile, graph: &DependencyGraph, store: &ArtifactStore, pool: &MachinePool) {
    let bounds = graph.bounds();
    let pending = PendingSet::from_grid(graph, store);
    let total = bounds.cell_count();

    println!("cellfarm dry-run");
    println!("  grid: a_max = {}, b_max = {}", bounds.a_max, bounds.b_max);
    println!("  cells: {total} total, {} done, {} pending", total - pending.len(), pending.len());
    println!("  critical path: {} cells", graph.critical_path_len());
    println!("  store: {}", store.root().display());
    println!(
        "  solver: {} {} <a> <b> <t>",
        cfg.solver.program, cfg.solver.subcommand
    );
    println!("  stop file: {}", cfg.control.stop_file.display());
    println!(
        "  control: poll {} ms, on_exit {:?}, on_failure {:?}, max_attempts {}",
        cfg.control.poll_interval_ms,
        cfg.control.on_exit,
        cfg.control.on_failure,
        cfg.control.max_attempts
    );
    println!();

    let machines = pool.allowed_machines();
    println!("machines ({}) from {}:", machines.len(), cfg.machines.file.display());
    for machine in &machines {
        println!("  - {machine}");
    }
    println!();

    let oracle = ReadinessOracle::new(graph, store);
    let ready: Vec<_> = pending
        .iter()
        .copied()
        .filter(|cell| oracle.is_ready(*cell))
        .collect();
    println!("ready now ({}):", ready.len());
    for cell in ready.iter().take(DRY_RUN_READY_PREVIEW) {
        println!("  - {cell}");
    }
    if ready.len() > DRY_RUN_READY_PREVIEW {
        println!("  ... and {} more", ready.len() - DRY_RUN_READY_PREVIEW);
    }

    debug!("dry-run complete (no execution)");
}
