//! `roomscan` – headless room calibration.
//!
//! Runs one calibration session against a simulated room and reports the
//! result.  It:
//!
//! 1. Loads `~/.roomscan/config.toml` plus `ROOMSCAN_*` overrides.
//! 2. Builds the demo room (floor, four walls, a table, a shelf and a pillar)
//!    and an observer turning on the spot in its middle.
//! 3. Runs the calibration, printing coverage as it grows.
//! 4. Intercepts **Ctrl-C** to cancel the session; nothing is persisted.
//! 5. Prints a summary, or with `--json` the record as persisted.

mod config;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use roomscan_hal::SweepPoseSource;
use roomscan_memory::{SqliteStore, load_calibration};
use roomscan_middleware::{EventBus, Topic};
use roomscan_perception::BoxScene;
use roomscan_runtime::{CalibrationController, RunOutcome, init_tracing};
use roomscan_types::{CalibrationRecord, EventPayload, SurfaceType, Vec3};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, warn};

use crate::config::CliConfig;

/// Eye height and sweep of the simulated observer.
const OBSERVER_POSITION: Vec3 = Vec3::new(0.0, 1.6, 0.0);
const SWEEP_YAW_STEP_DEG: f32 = 20.0;
const SWEEP_PITCH_DEG: f32 = -35.0;

// ─────────────────────────────────────────────────────────────────────────────
// Arguments
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "roomscan")]
#[command(about = "Calibrate a simulated room and persist the detected surfaces", long_about = None)]
struct Args {
    /// SQLite database for the calibration record (default: ~/.roomscan/calibration.db)
    #[arg(long, value_name = "PATH")]
    db: Option<String>,

    /// Print the persisted record as JSON instead of a summary
    #[arg(long)]
    json: bool,

    /// Write the effective configuration to ~/.roomscan/config.toml and exit
    #[arg(long)]
    init_config: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Entry point
// ─────────────────────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    let _guard = init_tracing("roomscan");

    let args = Args::parse();

    let cfg = match config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            let mut cfg = CliConfig::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
    };

    if args.init_config {
        return match config::save(&cfg) {
            Ok(()) => {
                println!(
                    "  {} Config saved to {}",
                    "✓".green().bold(),
                    config::config_path().display().to_string().bold()
                );
                ExitCode::SUCCESS
            }
            Err(e) => {
                println!("{}: {}", "Error saving config".red(), e);
                ExitCode::FAILURE
            }
        };
    }

    let db_path = args
        .db
        .or_else(|| cfg.db_path.clone())
        .unwrap_or_else(|| config::default_db_path().display().to_string());

    match calibrate(&cfg, &db_path, args.json) {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "calibration aborted");
            println!("{}: {}", "Calibration failed".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn calibrate(cfg: &CliConfig, db_path: &str, json: bool) -> Result<ExitCode, String> {
    config::prepare_db_dir(Path::new(db_path))?;
    let store = Arc::new(
        SqliteStore::open(db_path).map_err(|e| format!("cannot open {db_path}: {e}"))?,
    );

    let bus = EventBus::default();
    let mut controller = CalibrationController::new(
        cfg.calibration.clone(),
        Box::new(SweepPoseSource::new(
            OBSERVER_POSITION,
            SWEEP_YAW_STEP_DEG,
            SWEEP_PITCH_DEG,
        )),
        Arc::new(BoxScene::demo_room()),
        store.clone(),
    )
    .map_err(|e| e.to_string())?
    .with_bus(bus.clone());

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    let handle = controller.handle();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – cancelling calibration …".yellow().bold());
        handle.cancel();
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; calibration cannot be cancelled");
    }

    let runtime = tokio::runtime::Runtime::new().map_err(|e| e.to_string())?;

    let mut progress = bus.subscribe_to(Topic::Progress);
    let printer = runtime.spawn(async move {
        loop {
            match progress.recv().await {
                Ok(event) => {
                    if let EventPayload::ScanProgress { coverage } = event.payload
                        && !json
                    {
                        println!("  Scanning … {:>5.1}%", coverage * 100.0);
                    }
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });

    let outcome = runtime.block_on(controller.run());
    printer.abort();
    let outcome = outcome.map_err(|e| e.to_string())?;

    match outcome {
        RunOutcome::Completed(record) => {
            if json {
                let persisted = load_calibration(store.as_ref(), &cfg.calibration.storage_key)
                    .map_err(|e| e.to_string())?
                    .unwrap_or(record);
                let raw = serde_json::to_string_pretty(&persisted).map_err(|e| e.to_string())?;
                println!("{raw}");
            } else {
                print_summary(&record, db_path);
            }
            Ok(ExitCode::SUCCESS)
        }
        RunOutcome::Cancelled => {
            println!("{}", "  Calibration cancelled – nothing was saved.".yellow());
            Ok(ExitCode::from(130))
        }
        RunOutcome::AlreadyActive => {
            println!("{}", "  A calibration is already running.".yellow());
            Ok(ExitCode::FAILURE)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Summary
// ─────────────────────────────────────────────────────────────────────────────

fn print_summary(record: &CalibrationRecord, db_path: &str) {
    println!();
    println!("{}", "  Room calibration complete".bold().green());
    println!(
        "  Coverage: {}   Center: ({:.2}, {:.2}, {:.2})",
        format!("{:.1}%", record.scan_coverage * 100.0).bold(),
        record.center_point.x,
        record.center_point.y,
        record.center_point.z
    );

    for kind in [SurfaceType::Floor, SurfaceType::Wall, SurfaceType::Table, SurfaceType::Shelf] {
        let total = record.surfaces.iter().filter(|s| s.surface_type == kind).count();
        let visible = record
            .visible_surfaces()
            .filter(|s| s.surface_type == kind)
            .count();
        println!("    {:<6} {:>3} detected, {:>3} visible", kind.to_string(), total, visible);
    }

    println!();
    for surface in &record.surfaces {
        let status = if surface.is_visible {
            "visible".green()
        } else {
            "occluded".dimmed()
        };
        println!(
            "    {:<6} at ({:>5.2}, {:>5.2}, {:>5.2})  {:.2} × {:.2} m  {}",
            surface.surface_type.to_string(),
            surface.position.x,
            surface.position.y,
            surface.position.z,
            surface.width,
            surface.depth,
            status
        );
    }

    println!();
    println!("  Saved to {}", db_path.bold());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("roomscan").chain(list.iter().copied()))
    }

    #[test]
    fn no_arguments_means_defaults() {
        let parsed = args(&[]).unwrap();
        assert!(parsed.db.is_none());
        assert!(!parsed.json);
        assert!(!parsed.init_config);
    }

    #[test]
    fn db_and_json_flags_are_parsed() {
        let parsed = args(&["--json", "--db", "/tmp/room.db"]).unwrap();
        assert!(parsed.json);
        assert_eq!(parsed.db.as_deref(), Some("/tmp/room.db"));
    }

    #[test]
    fn init_config_flag_is_parsed() {
        assert!(args(&["--init-config"]).unwrap().init_config);
    }

    #[test]
    fn db_without_path_is_rejected() {
        assert!(args(&["--db"]).is_err());
    }

    #[test]
    fn unknown_argument_is_rejected() {
        let err = args(&["--fast"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }

    #[test]
    fn help_is_generated() {
        let err = args(&["--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn argument_definitions_are_consistent() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
