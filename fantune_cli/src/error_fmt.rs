//! Human-readable error descriptions and structured JSON error formatting.

use fantune_core::error::FanError;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(fe) = err.downcast_ref::<FanError>() {
        return match fe {
            FanError::Config(msg) if msg.contains("max rpm CSV must have headers") => {
                "Invalid headers in max RPM CSV. Expected 'device_type,max_rpm'.".to_string()
            }
            FanError::Config(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML, a malformed max RPM CSV, or a device type missing from [max_fan_rpm].\nHow to fix: Edit the config (or pass --rpm-table), then rerun."
            ),
            FanError::Device(msg) => format!(
                "What happened: The fan controller failed ({msg}).\nLikely causes: USB link dropped, firmware reset, or a wrong serial channel in [logger].\nHow to fix: Reconnect the device and rerun. Zero power was commanded on the way out; check the fan has stopped."
            ),
            FanError::InvalidPower(p) => format!(
                "What happened: Overshoot was requested at {p}% power.\nLikely causes: A non-positive sweep.min_power slipped past validation.\nHow to fix: Use a minimum power above 0."
            ),
            FanError::Io(msg) => format!(
                "What happened: File access failed ({msg}).\nLikely causes: The telemetry log directory does not exist or is not writable.\nHow to fix: Pick a writable path with --log or logger.path."
            ),
            FanError::Logger(msg) => format!(
                "What happened: The telemetry logger stopped ({msg}).\nLikely causes: See the preceding log lines.\nHow to fix: Re-run with --log-level=debug for details."
            ),
            FanError::Cancelled => {
                "Sweep interrupted; fan power set to 0%.".to_string()
            }
        };
    }

    // Generic fallback
    let msg = err.to_string();
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable process exit codes per error kind.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match err.downcast_ref::<FanError>() {
        Some(FanError::Config(_)) => 3,
        Some(FanError::Device(_)) => 4,
        Some(FanError::Io(_)) => 5,
        Some(FanError::Cancelled) => 130,
        _ => 1,
    }
}

pub fn reason_name(err: &eyre::Report) -> &'static str {
    match err.downcast_ref::<FanError>() {
        Some(FanError::Config(_)) => "Config",
        Some(FanError::Device(_)) => "Device",
        Some(FanError::InvalidPower(_)) => "InvalidPower",
        Some(FanError::Io(_)) => "Io",
        Some(FanError::Logger(_)) => "Logger",
        Some(FanError::Cancelled) => "Cancelled",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": reason_name(err),
        "error": err.to_string(),
        "message": humanize(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(FanError::Config("x".into()), 3, "Config")]
    #[case(FanError::Device("x".into()), 4, "Device")]
    #[case(FanError::Io("x".into()), 5, "Io")]
    #[case(FanError::Logger("x".into()), 1, "Logger")]
    #[case(FanError::InvalidPower(0.0), 1, "InvalidPower")]
    #[case(FanError::Cancelled, 130, "Cancelled")]
    fn exit_codes_are_stable(#[case] e: FanError, #[case] code: i32, #[case] reason: &str) {
        let report = eyre::Report::new(e);
        assert_eq!(exit_code_for_error(&report), code);
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&report)).unwrap();
        assert_eq!(v["reason"], reason);
    }

    #[test]
    fn untyped_errors_fall_back() {
        let report = eyre::eyre!("boom");
        assert_eq!(exit_code_for_error(&report), 1);
        assert!(humanize(&report).contains("Original: boom"));
    }
}
