//! `animatron` – command line entry point.
//!
//! 1. Loads `~/.animatron/config.toml`, writing the defaults on first run.
//! 2. Wires the `tracing` pipeline (console plus optional OTLP).
//! 3. Runs the selected mode against the simulated body until it finishes
//!    or **Ctrl-C** asks for a graceful shutdown.
//!
//! ```text
//! animatron track            # idle until a target shows up, then follow it
//! animatron idle             # idle behaviors only
//! animatron play breathing   # preview one catalog entry
//! animatron list             # show the configured catalog
//! ```

mod config;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use animatron_hal::{BodyLayout, PanTiltGaze, SimAudio, SimBody, detection_feed, spawn_duty_cycle};
use animatron_runtime::{BehaviorTask, ModeArbiter, Player, Robot, build_idle, init_tracing};
use animatron_types::{AnimError, Mode, ModeChange};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "animatron", version, about = "Behavior supervisor for an animatronic head")]
struct Cli {
    /// Config file to use instead of `~/.animatron/config.toml`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Play idle behaviors at random, forever.
    Idle,
    /// Idle while nothing is in view, follow the target when it appears.
    Track,
    /// Play a single catalog behavior and exit.
    Play {
        /// Catalog name of the behavior.
        name: String,
    },
    /// List the configured behaviors.
    List,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let cfg = match load_config(cli.config.clone()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{} {e}", "✗".red().bold());
            return ExitCode::FAILURE;
        }
    };

    // Hold the guard until exit so pending spans are flushed.
    let _guard = init_tracing("animatron", cfg.log_format);

    let shutdown = CancellationToken::new();
    let on_ctrlc = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping behaviors …".yellow().bold());
        on_ctrlc.cancel();
    }) {
        warn!("Failed to install Ctrl-C handler: {e}");
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{} failed to start the runtime: {e}", "✗".red().bold());
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli.command, cfg, shutdown)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e}", "✗".red().bold());
            ExitCode::FAILURE
        }
    }
}

/// Read the config, seeding the file with defaults when it does not exist.
fn load_config(path: Option<PathBuf>) -> Result<Config, AnimError> {
    let path = path.unwrap_or_else(config::config_path);
    if let Some(cfg) = config::load_from(&path)? {
        return Ok(cfg);
    }
    let mut cfg = Config::default();
    config::save_to(&cfg, &path)?;
    println!(
        "{} wrote default configuration to {}",
        "✓".green(),
        path.display()
    );
    config::apply_env_overrides(&mut cfg);
    Ok(cfg)
}

fn sim_robot() -> Robot {
    let layout = BodyLayout::default();
    Robot::new(
        Arc::new(SimBody::new(&layout)),
        Arc::new(PanTiltGaze::default()),
        layout,
    )
    .with_audio(Arc::new(SimAudio::default()))
}

async fn run(command: Command, cfg: Config, shutdown: CancellationToken) -> Result<(), AnimError> {
    let robot = sim_robot();
    match command {
        Command::List => {
            list(&cfg);
            Ok(())
        }
        Command::Idle => {
            let idle = build_idle(&cfg.behaviors, &cfg.idle)?;
            let task = BehaviorTask::root(Arc::new(idle), robot);
            drive(&task, &shutdown).await
        }
        Command::Track => {
            let idle = build_idle(&cfg.behaviors, &cfg.idle)?;
            let (publisher, feed) = detection_feed();
            let detector = spawn_duty_cycle(publisher, cfg.simulation.detection.clone());
            let arbiter = ModeArbiter::new(
                &cfg.arbiter,
                &cfg.tracking,
                Arc::new(feed),
                Arc::new(idle),
                robot.clone(),
            );
            let printer = tokio::spawn(print_mode_changes(arbiter.subscribe()));
            let task = BehaviorTask::root(Arc::new(arbiter), robot);

            let result = drive(&task, &shutdown).await;
            // The arbiter owned the only feed and the only change sender.
            drop(task);
            detector.abort();
            let _ = printer.await;
            result
        }
        Command::Play { name } => {
            let spec = cfg
                .behaviors
                .iter()
                .find(|s| s.name() == name)
                .ok_or_else(|| AnimError::UnknownBehavior(name.clone()))?;
            let player = Player::new(spec.build()?, Duration::from_millis(cfg.idle.relax_ms));
            let task = BehaviorTask::root(Arc::new(player), robot);
            drive(&task, &shutdown).await
        }
    }
}

/// Start `task` and keep it running until it ends or `shutdown` fires.
async fn drive(task: &BehaviorTask, shutdown: &CancellationToken) -> Result<(), AnimError> {
    let started = tokio::select! {
        result = task.start() => Some(result),
        _ = shutdown.cancelled() => None,
    };
    if let Some(result) = started {
        result?;
        info!(behavior = task.name(), "started");
        tokio::select! {
            _ = task.wait() => info!(behavior = task.name(), "finished"),
            _ = shutdown.cancelled() => info!(behavior = task.name(), "shutdown requested"),
        }
    }
    if let Err(e) = task.stop().await {
        warn!(behavior = task.name(), error = %e, "stop reported cancellation");
    }
    Ok(())
}

async fn print_mode_changes(mut changes: broadcast::Receiver<ModeChange>) {
    loop {
        match changes.recv().await {
            Ok(change) => {
                let to = match change.to {
                    Mode::Idle => change.to.to_string().cyan(),
                    Mode::Tracking => change.to.to_string().green(),
                };
                let from = change
                    .from
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "[{}] mode {} → {}",
                    change.timestamp.format("%H:%M:%S%.3f"),
                    from.dimmed(),
                    to.bold()
                );
            }
            Err(RecvError::Lagged(n)) => warn!(skipped = n, "mode change printer lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}

fn list(cfg: &Config) {
    println!("{}", "Behaviors".bold());
    for spec in &cfg.behaviors {
        let name = spec.name();
        if cfg.idle.rest.as_deref() == Some(name) {
            println!("  {} {}", name.cyan(), "(rest)".dimmed());
        } else {
            println!("  {}", name.cyan());
        }
    }
}
