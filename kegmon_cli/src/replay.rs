//! Offline replay of a recorded weight trace through the filter bank and detector.

use std::path::Path;

use csv::{ReaderBuilder, Trim};
use eyre::{Result, WrapErr};
use kegmon_config::Config;
use kegmon_core::{CHANNEL_COUNT, ChangeDetection, Channel, FilterBank, FilterParams};

use crate::report;

const HEADERS: [&str; 3] = ["timestamp_ms", "channel", "weight_kg"];

/// One parsed trace row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceRow {
    pub timestamp_ms: u64,
    pub channel: Channel,
    /// `NaN` for an empty cell (a failed read).
    pub weight_kg: f32,
}

/// Parse a `timestamp_ms,channel,weight_kg` CSV. Errors name the offending line.
pub fn read_trace(path: &Path) -> Result<Vec<TraceRow>> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .comment(Some(b'#'))
        .from_path(path)
        .wrap_err_with(|| format!("open trace {}", path.display()))?;

    let headers = rdr.headers()?.clone();
    if headers.len() < HEADERS.len() || headers.iter().zip(HEADERS).any(|(h, want)| !h.eq_ignore_ascii_case(want)) {
        eyre::bail!("trace must have headers 'timestamp_ms,channel,weight_kg'");
    }

    let mut rows = Vec::new();
    let mut last_ts = 0;
    for rec in rdr.records() {
        let rec = rec.wrap_err("read trace row")?;
        let line = rec.position().map_or(0, csv::Position::line);
        let field = |i: usize| rec.get(i).unwrap_or("");

        let timestamp_ms: u64 = field(0)
            .parse()
            .map_err(|e| eyre::eyre!("trace line {line}: timestamp_ms '{}': {e}", field(0)))?;
        if timestamp_ms < last_ts {
            eyre::bail!("trace line {line}: timestamp_ms {timestamp_ms} goes back in time (previous {last_ts})");
        }
        last_ts = timestamp_ms;
        let channel: Channel = field(1)
            .parse()
            .map_err(|e| eyre::eyre!("trace line {line}: {e}"))?;
        let weight_kg = match field(2) {
            "" => f32::NAN,
            w => w
                .parse()
                .map_err(|e| eyre::eyre!("trace line {line}: weight_kg '{w}': {e}"))?,
        };
        rows.push(TraceRow {
            timestamp_ms,
            channel,
            weight_kg,
        });
    }
    Ok(rows)
}

/// Feed `rows` through a fresh bank and manager, printing events as they are
/// raised. Returns the manager for the summary.
pub fn replay_rows(cfg: &Config, rows: &[TraceRow], json: bool) -> Result<ChangeDetection> {
    let params = FilterParams::from(&cfg.filters);
    let mut banks: [FilterBank; CHANNEL_COUNT] = std::array::from_fn(|_| FilterBank::new(&params));
    let mut manager = ChangeDetection::from_config(cfg)?;

    if let Some(first) = rows.first() {
        manager.fire_startup_event(first.timestamp_ms);
    }
    for row in rows {
        let reading = banks[row.channel.index()].update(row.weight_kg);
        manager.update(row.channel, &reading, row.timestamp_ms);
        while let Some(e) = manager.get_next_event() {
            report::print_event(&e, json);
        }
    }
    tracing::info!(rows = rows.len(), "replay finished");
    Ok(manager)
}

pub fn run(cfg: &Config, trace: &Path, json: bool) -> Result<()> {
    let rows = read_trace(trace)?;
    let manager = replay_rows(cfg, &rows, json)?;
    report::print_summary(&manager, json);
    Ok(())
}
