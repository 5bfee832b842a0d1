//! Human and JSON-lines rendering of events and per-channel summaries.

use kegmon_core::{ChangeDetection, ChangeEvent, Channel, EventKind};
use serde_json::{Value, json};

pub fn event_json(e: &ChangeEvent) -> Value {
    let mut v = json!({
        "type": "event",
        "event": e.kind.name(),
        "channel": e.channel.name(),
        "ts_ms": e.timestamp_ms,
    });
    let details = match e.kind {
        EventKind::Startup => json!({}),
        EventKind::StableDetected {
            stable_weight_kg,
            stable_volume_l,
            duration_ms,
        } => json!({
            "stable_weight_kg": stable_weight_kg,
            "stable_volume_l": stable_volume_l,
            "duration_ms": duration_ms,
        }),
        EventKind::PourStarted {
            pre_pour_weight_kg,
            average_slope_kg_per_s,
        } => json!({
            "pre_pour_weight_kg": pre_pour_weight_kg,
            "average_slope_kg_per_s": average_slope_kg_per_s,
        }),
        EventKind::PourCompleted(p) => json!({
            "pre_pour_weight_kg": p.pre_pour_weight_kg,
            "post_pour_weight_kg": p.post_pour_weight_kg,
            "pour_weight_kg": p.pour_weight_kg,
            "pour_volume_l": p.pour_volume_l,
            "duration_ms": p.duration_ms,
            "average_slope_kg_per_s": p.average_slope_kg_per_s,
        }),
        EventKind::KegRemoved {
            previous_weight_kg,
            current_weight_kg,
        }
        | EventKind::KegReplaced {
            previous_weight_kg,
            current_weight_kg,
        } => json!({
            "previous_weight_kg": previous_weight_kg,
            "current_weight_kg": current_weight_kg,
        }),
        EventKind::InvalidWeight {
            weight_kg,
            min_valid_weight_kg,
            max_valid_weight_kg,
        } => json!({
            "weight_kg": weight_kg,
            "min_valid_weight_kg": min_valid_weight_kg,
            "max_valid_weight_kg": max_valid_weight_kg,
        }),
    };
    v["details"] = details;
    v
}

pub fn event_line(e: &ChangeEvent) -> String {
    let head = format!("[{:>9} ms] {} {:<15}", e.timestamp_ms, e.channel, e.kind.name());
    let tail = match e.kind {
        EventKind::Startup => String::new(),
        EventKind::StableDetected {
            stable_weight_kg,
            stable_volume_l,
            duration_ms,
        } => format!("{stable_weight_kg:.3} kg ({stable_volume_l:.2} L) after {duration_ms} ms"),
        EventKind::PourStarted {
            pre_pour_weight_kg,
            average_slope_kg_per_s,
        } => format!("from {pre_pour_weight_kg:.3} kg at {average_slope_kg_per_s:.3} kg/s"),
        EventKind::PourCompleted(p) => format!(
            "{:.3} L ({:.3} -> {:.3} kg) in {} ms",
            p.pour_volume_l, p.pre_pour_weight_kg, p.post_pour_weight_kg, p.duration_ms
        ),
        EventKind::KegRemoved {
            previous_weight_kg,
            current_weight_kg,
        }
        | EventKind::KegReplaced {
            previous_weight_kg,
            current_weight_kg,
        } => format!("{previous_weight_kg:.3} -> {current_weight_kg:.3} kg"),
        EventKind::InvalidWeight {
            weight_kg,
            min_valid_weight_kg,
            max_valid_weight_kg,
        } => match weight_kg {
            Some(w) => format!("{w:.3} kg outside [{min_valid_weight_kg}, {max_valid_weight_kg}]"),
            None => "no reading".to_string(),
        },
    };
    format!("{head} {tail}").trim_end().to_string()
}

pub fn print_event(e: &ChangeEvent, json: bool) {
    if json {
        println!("{}", event_json(e));
    } else {
        println!("{}", event_line(e));
    }
}

/// Channels that saw at least one reading.
fn active(m: &ChangeDetection) -> impl Iterator<Item = Channel> + '_ {
    Channel::ALL
        .into_iter()
        .filter(|ch| m.sample_statistics(*ch).total_readings > 0)
}

pub fn summary_json(m: &ChangeDetection) -> Value {
    let channels: Vec<Value> = active(m)
        .map(|ch| {
            let s = m.statistics(ch);
            let r = m.sample_statistics(ch);
            json!({
                "channel": ch.name(),
                "state": m.state_name(ch),
                "stable_weight_kg": m.stable_weight(ch),
                "stable_volume_l": m.stable_volume(ch),
                "glasses_remaining": m.glasses_remaining(ch),
                "total_pours": s.total_pours,
                "total_pour_volume_l": s.total_pour_volume_l,
                "avg_pour_volume_l": s.avg_pour_volume_l(),
                "max_pour_volume_l": m.max_pour_volume(ch),
                "keg_replacements": s.keg_replacements,
                "keg_removals": s.keg_removals,
                "state_transitions": s.state_transitions,
                "readings": r.total_readings,
                "invalid_readings": r.invalid_readings,
                "quality_pct": r.quality_pct(),
                "frequency_hz": r.frequency_hz(),
                "stable_variance": r.stable_variance,
            })
        })
        .collect();
    json!({ "type": "summary", "channels": channels })
}

pub fn print_summary(m: &ChangeDetection, json: bool) {
    if json {
        println!("{}", summary_json(m));
        return;
    }
    println!("--- summary ---");
    for ch in active(m) {
        let s = m.statistics(ch);
        let r = m.sample_statistics(ch);
        println!(
            "{ch}: {state}, {kg:.3} kg ({glasses:.1} glasses left), {pours} pours / {vol:.2} L, \
             {repl} keg changes, {q:.1}% valid of {n} readings",
            state = m.state_name(ch),
            kg = m.stable_weight(ch),
            glasses = m.glasses_remaining(ch),
            pours = s.total_pours,
            vol = s.total_pour_volume_l,
            repl = s.keg_replacements,
            q = r.quality_pct(),
            n = r.total_readings,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kegmon_core::PourDetails;

    #[test]
    fn pour_json_carries_details() {
        let e = ChangeEvent::new(
            Channel::U2,
            1234,
            EventKind::PourCompleted(PourDetails {
                pre_pour_weight_kg: 10.0,
                post_pour_weight_kg: 9.5,
                pour_weight_kg: 0.5,
                pour_volume_l: 0.5,
                duration_ms: 4000,
                average_slope_kg_per_s: -0.125,
            }),
        );
        let v = event_json(&e);
        assert_eq!(v["event"], "pour_completed");
        assert_eq!(v["channel"], "U2");
        assert_eq!(v["ts_ms"], 1234);
        assert_eq!(v["details"]["duration_ms"], 4000);
        assert!(event_line(&e).contains("0.500 L"));
    }

    #[test]
    fn missing_weight_renders_as_null() {
        let e = ChangeEvent::new(
            Channel::U1,
            0,
            EventKind::InvalidWeight {
                weight_kg: None,
                min_valid_weight_kg: 0.0,
                max_valid_weight_kg: 30.0,
            },
        );
        assert!(event_json(&e)["details"]["weight_kg"].is_null());
        assert!(event_line(&e).ends_with("no reading"));
    }

    #[test]
    fn startup_line_has_no_trailing_space() {
        let line = event_line(&ChangeEvent::startup(0));
        assert!(line.ends_with("startup"));
    }
}
