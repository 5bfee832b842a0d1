mod cli;
mod error_fmt;
mod logging;
mod replay;
mod report;
mod simulate;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::Result;
use kegmon_config::Config;
use kegmon_core::{ChangeDetection, Channel};
use serde_json::json;

use crate::cli::{Cli, Commands, DEFAULT_LOG_LEVEL, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    // Only fails if a handler is already installed.
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();
    if let Err(e) = ctrlc::set_handler(move || stop_flag.store(true, Ordering::Relaxed)) {
        eprintln!("failed to install Ctrl-C handler: {e}");
    }

    if let Err(e) = run(cli, &stop) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

fn run(cli: Cli, stop: &Arc<AtomicBool>) -> Result<()> {
    let cfg = kegmon_config::load_file(&cli.config)?;
    cfg.validate()?;

    let level = match cfg.logging.level.as_deref() {
        Some(l) if cli.log_level == DEFAULT_LOG_LEVEL => l,
        _ => cli.log_level.as_str(),
    };
    logging::init(cli.json, level, &cfg.logging);
    tracing::debug!(config = %cli.config.display(), "config loaded");

    match &cli.cmd {
        Commands::Replay { trace } => replay::run(&cfg, trace, cli.json),
        Commands::Simulate { seconds, speed } => simulate::run(&cfg, *seconds, *speed, cli.json, stop),
        Commands::SelfCheck => self_check(&cli, &cfg),
    }
}

fn self_check(cli: &Cli, cfg: &Config) -> Result<()> {
    let manager = ChangeDetection::from_config(cfg)?;
    let det = manager.detection_cfg();
    if cli.json {
        let channels: Vec<_> = Channel::ALL
            .into_iter()
            .map(|ch| {
                let c = manager.channel_cfg(ch);
                json!({
                    "channel": ch.name(),
                    "keg_weight_kg": c.keg_weight_kg,
                    "max_valid_weight_kg": c.max_valid_weight_kg,
                    "glass_volume_l": c.glass_volume_l,
                })
            })
            .collect();
        println!(
            "{}",
            json!({
                "type": "self_check",
                "ok": true,
                "config": cli.config.display().to_string(),
                "stability_filter": det.stability_filter.name(),
                "pour_filter": det.pour_filter.name(),
                "channels": channels,
            })
        );
    } else {
        println!("config OK: {}", cli.config.display());
        println!(
            "filters: stability={} pour={}, sampling at {} Hz",
            det.stability_filter.name(),
            det.pour_filter.name(),
            cfg.sampling.rate_hz
        );
        for ch in Channel::ALL {
            let c = manager.channel_cfg(ch);
            println!(
                "{ch}: keg {:.2} kg, valid up to {:.2} kg, glass {:.2} L",
                c.keg_weight_kg, c.max_valid_weight_kg, c.glass_volume_l
            );
        }
    }
    Ok(())
}
