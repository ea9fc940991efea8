//! Integration test: launching a storm from a configuration file.
//!
//! Validates that:
//! 1. A dry run with a bounded tick count writes valid NDJSON records.
//! 2. The first activation of every target is logged with a null rateDelta.
//! 3. Configuration, seed and output problems surface as launch errors.
//! 4. A rejected launch leaves an existing output file untouched.
//!
//! Run: cargo test -p netstorm --test launch_test

use std::path::PathBuf;

use netstorm::{LaunchError, LaunchOptions, launch};
use netstorm_core::ConfigurationError;
use netstorm_runtime::structured_log::validate_record_file;
use netstorm_runtime::{Diagnostics, Verbosity};

fn unique_path(prefix: &str, suffix: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("{prefix}-{}-{nanos}{suffix}", std::process::id()))
}

fn write_config(json: &str) -> PathBuf {
    let path = unique_path("netstorm-config", ".json");
    std::fs::write(&path, json).unwrap();
    path
}

const CONTINUOUS: &str = r#"{
    "storms": [
        {"name":"uplink","type":"simplex","simplex_time_coef":0.37,"simplex_y":0.5,
         "iptables":["INPUT","OUTPUT -d 10.0.0.9"]}
    ]
}"#;

#[test]
fn dry_run_writes_records() {
    let config = write_config(CONTINUOUS);
    let output = unique_path("netstorm-records", ".ndjson");
    let diag = Diagnostics::capture(Verbosity::Debug);

    let mut opts = LaunchOptions::new(&config);
    opts.output = Some(output.clone());
    opts.dry_run = true;
    opts.interval_ms = 10;
    opts.max_ticks = Some(3);
    opts.seed = Some("0xC0FFEE".to_string());

    let summary = launch(&opts, &diag).expect("dry run succeeds");
    assert_eq!(summary.ticks, 3);
    assert!(summary.cycles >= 1);

    let records = validate_record_file(&output).expect("valid NDJSON");
    assert!(records.len() >= 2);
    assert!(records[..2].iter().all(|r| r.name == "uplink" && r.rate_delta.is_none()));
    assert!(records.iter().all(|r| (0.0..=1.0).contains(&r.rate)));

    let text = diag.captured();
    assert!(text.contains("seed 0x0000000000C0FFEE"));
    assert!(text.contains("dry run, skipping: iptables -p tcp -A INPUT"));
    assert!(text.contains("-A OUTPUT -d 10.0.0.9 -m statistic"));

    let _ = std::fs::remove_file(config);
    let _ = std::fs::remove_file(output);
}

#[test]
fn missing_config_is_reported() {
    let opts = LaunchOptions::new(unique_path("netstorm-missing", ".json"));
    let err = launch(&opts, &Diagnostics::capture(Verbosity::Quiet)).unwrap_err();
    assert!(matches!(err, LaunchError::Config(ConfigurationError::Io { .. })));
    assert!(err.to_string().starts_with("error reading configuration file"));
}

#[test]
fn unknown_storm_type_stops_before_first_tick() {
    let config = write_config(r#"{"storms":[{"name":"x","type":"sawtooth","iptables":["INPUT"]}]}"#);
    let mut opts = LaunchOptions::new(&config);
    opts.dry_run = true;
    let err = launch(&opts, &Diagnostics::capture(Verbosity::Quiet)).unwrap_err();
    assert!(matches!(
        err,
        LaunchError::Config(ConfigurationError::UnknownStormType { .. })
    ));
    let _ = std::fs::remove_file(config);
}

#[test]
fn bad_seed_and_interval_are_rejected() {
    let config = write_config(CONTINUOUS);

    let mut opts = LaunchOptions::new(&config);
    opts.seed = Some("not-a-seed".to_string());
    let err = launch(&opts, &Diagnostics::capture(Verbosity::Quiet)).unwrap_err();
    assert!(matches!(err, LaunchError::Seed { .. }));

    let mut opts = LaunchOptions::new(&config);
    opts.dry_run = true;
    opts.interval_ms = 0;
    let err = launch(&opts, &Diagnostics::capture(Verbosity::Quiet)).unwrap_err();
    assert!(err.to_string().contains("interval must be greater than zero"));

    let _ = std::fs::remove_file(config);
}

#[test]
fn rejected_launch_keeps_previous_records() {
    let config = write_config(CONTINUOUS);
    let output = unique_path("netstorm-previous", ".ndjson");
    let previous = "{\"name\":\"uplink\",\"rate\":0.5,\"rateDelta\":null,\"@timestamp\":1}\n";
    std::fs::write(&output, previous).unwrap();

    let mut opts = LaunchOptions::new(&config);
    opts.output = Some(output.clone());
    opts.dry_run = true;
    opts.interval_ms = 0;
    let err = launch(&opts, &Diagnostics::capture(Verbosity::Quiet)).unwrap_err();
    assert!(matches!(err, LaunchError::Scheduler(_)), "got {err}");
    assert_eq!(std::fs::read_to_string(&output).unwrap(), previous);

    let _ = std::fs::remove_file(config);
    let _ = std::fs::remove_file(output);
}

#[test]
fn failing_iptables_is_fatal() {
    let config = write_config(CONTINUOUS);
    let mut opts = LaunchOptions::new(&config);
    let output = unique_path("netstorm-fatal", ".ndjson");
    opts.output = Some(output.clone());
    opts.iptables = "/nonexistent/netstorm-iptables".to_string();
    opts.interval_ms = 5;
    opts.max_ticks = Some(10);
    let err = launch(&opts, &Diagnostics::capture(Verbosity::Quiet)).unwrap_err();
    assert!(err.to_string().contains("directive #0"));
    let _ = std::fs::remove_file(config);
    let _ = std::fs::remove_file(output);
}
