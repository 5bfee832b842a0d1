//! Human-readable error descriptions and structured JSON error formatting.

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    use kegmon_core::error::{BuildError, KegmonError};

    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid detection settings ({msg}).\nLikely causes: Out-of-range values in the [detection] table.\nHow to fix: Edit the config file, then rerun. See etc/kegmon.toml for a sample."
            ),
            BuildError::InvalidChannel { channel, reason } => format!(
                "What happened: Invalid calibration for {channel} ({reason}).\nLikely causes: keg_weight_kg above max_valid_weight_kg, or a non-numeric value in [[channels]].\nHow to fix: Weigh the empty keg again and fix the matching [[channels]] entry."
            ),
        };
    }

    if let Some(ke) = err.downcast_ref::<KegmonError>() {
        return match ke {
            KegmonError::Timeout(ch) => format!(
                "What happened: Load cell on {ch} did not answer in time.\nLikely causes: Loose wiring, no power, or sampling.timeout_ms too low.\nHow to fix: Check the sensor connection and consider raising sampling.timeout_ms."
            ),
            KegmonError::Config(msg) => format!(
                "What happened: Configuration error ({msg}).\nLikely causes: A typo or a value of the wrong type in the TOML.\nHow to fix: Edit the config file and try again."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from config or trace loading
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.starts_with("read config") {
        return format!(
            "What happened: Could not read the config file.\nLikely causes: Wrong --config path or missing permissions.\nHow to fix: Pass --config <FILE> pointing at a readable TOML file. Original: {msg}"
        );
    }
    if lower.starts_with("parse config") {
        return format!(
            "What happened: The config file is not valid TOML for this tool.\nLikely causes: Syntax error, unknown filter name, or a wrong value type.\nHow to fix: Compare with etc/kegmon.toml. Original: {msg}"
        );
    }
    if lower.contains("must be") {
        return format!(
            "What happened: Configuration is invalid ({msg}).\nLikely causes: An out-of-range value in the TOML.\nHow to fix: Edit the named field and try again."
        );
    }
    if lower.contains("trace must have headers") {
        return "Invalid headers in trace CSV. Expected 'timestamp_ms,channel,weight_kg'.".to_string();
    }
    if lower.contains("trace") {
        return format!(
            "What happened: The replay trace could not be read.\nLikely causes: A malformed row or a channel other than U1..U4.\nHow to fix: Fix the row named below. Original: {msg}"
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!("Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}")
}

/// Stable exit codes: 3 for rejected detector settings, 4 for runtime faults, 1 otherwise.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    use kegmon_core::error::{BuildError, KegmonError};
    if err.downcast_ref::<BuildError>().is_some() {
        return 3;
    }
    if err.downcast_ref::<KegmonError>().is_some() {
        return 4;
    }
    1
}

fn reason_name(err: &eyre::Report) -> &'static str {
    use kegmon_core::error::{BuildError, KegmonError};
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::InvalidConfig(_) => "InvalidConfig",
            BuildError::InvalidChannel { .. } => "InvalidChannel",
        };
    }
    match err.downcast_ref::<KegmonError>() {
        Some(KegmonError::Source { .. }) => "Source",
        Some(KegmonError::Timeout(_)) => "Timeout",
        Some(KegmonError::Config(_)) => "Config",
        Some(KegmonError::State(_)) => "State",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use kegmon_core::error::BuildError;
    use serde_json::json;

    if let Some(BuildError::InvalidChannel { channel, .. }) = err.downcast_ref::<BuildError>() {
        return json!({
            "type": "error",
            "reason": reason_name(err),
            "details": { "channel": channel.name() },
            "message": humanize(err),
        })
        .to_string();
    }
    json!({ "type": "error", "reason": reason_name(err), "message": humanize(err) }).to_string()
}
