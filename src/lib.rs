// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod watch;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{Settings, load_settings};
use crate::engine::{CHANGE_QUEUE_CAPACITY, CycleCommands, Orchestrator, OrchestratorOptions};
use crate::exec::{ShellBackend, run_command};
use crate::watch::{EventFilter, Watcher};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - settings resolution (CLI + optional `Watchrun.toml`)
/// - path registration with the file watcher
/// - init / prep commands at startup
/// - the watch event loop and the cycle orchestrator
/// - Ctrl-C / SIGTERM handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let settings = load_settings(&args, &cwd)?;

    if args.dry_run {
        print_dry_run(&settings);
        return Ok(());
    }

    let shutdown = CancellationToken::new();
    spawn_shutdown_listener(shutdown.clone());

    let (queue, changes) = engine::queue::channel(CHANGE_QUEUE_CAPACITY);

    // Register every root before anything runs; a bad path aborts startup.
    let mut watcher = Watcher::new(EventFilter::new(settings.extensions.clone()))?;
    for path in &settings.paths {
        watcher.add_path(path)?;
    }
    info!(
        roots = ?settings.paths,
        watched = watcher.registry().len(),
        extensions = ?settings.extensions,
        "paths registered"
    );

    if let Some(init) = &settings.init_cmd {
        run_command(&shutdown, init, true).await?;
    }
    if let Some(prep) = &settings.prep_cmd {
        run_command(&shutdown, prep, true).await?;
    }

    let watcher_handle = watcher.spawn(queue.clone(), shutdown.clone());

    let commands = CycleCommands {
        prep: settings.prep_cmd.clone(),
        run: settings.run_cmd.clone(),
    };
    let orchestrator = Orchestrator::new(
        ShellBackend,
        commands,
        queue,
        shutdown.clone(),
        OrchestratorOptions::default(),
    );
    let result = orchestrator.run(changes).await;

    shutdown.cancel();
    watcher_handle.join().await;

    debug!("watchrun finished");
    Ok(result?)
}

/// Ctrl-C (and SIGTERM on unix) → cancel the root token.
fn spawn_shutdown_listener(shutdown: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        res = tokio::signal::ctrl_c() => {
                            if let Err(e) = res {
                                warn!(error = %e, "failed to listen for Ctrl+C");
                                return;
                            }
                        }
                        _ = sigterm.recv() => {}
                    }
                }
                Err(e) => {
                    warn!(error = %e, "failed to install SIGTERM handler");
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        warn!(error = %e, "failed to listen for Ctrl+C");
                        return;
                    }
                }
            }
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
        }

        info!("shutdown signal received");
        shutdown.cancel();
    });
}

/// Simple dry-run output: print the resolved settings.
fn print_dry_run(settings: &Settings) {
    println!("watchrun dry-run");
    println!("  init_cmd: {}", settings.init_cmd.as_deref().unwrap_or("-"));
    println!("  prep_cmd: {}", settings.prep_cmd.as_deref().unwrap_or("-"));
    println!("  run_cmd:  {}", settings.run_cmd);
    if settings.extensions.is_empty() {
        println!("  file_extensions: (all)");
    } else {
        println!("  file_extensions: {}", settings.extensions.join(","));
    }
    println!("  paths:");
    for path in &settings.paths {
        println!("    - {}", path.display());
    }

    debug!("dry-run complete (nothing executed)");
}
