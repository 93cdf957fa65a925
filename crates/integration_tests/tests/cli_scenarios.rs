//! Scenarios driven through the CLI command layer, as the binary runs them.

use anyhow::Result;
use integration_tests::{init_test_logging, RepositoryScenario};
use reconfigure_cli::commands::repository_cmd::{self, RepositoryArgs};
use reconfigure_cli::commands::{execute, RunOptions};
use reconfigure_cli::config::{AppConfig, DefaultsConfig, ReportFormat};
use reconfigure_cli::errors::Error;
use serde_json::Value;

fn args_for(scenario: &RepositoryScenario, test: bool) -> RepositoryArgs {
    RepositoryArgs {
        cfg: Some(scenario.config.display().to_string()),
        options: RunOptions {
            test,
            ..RunOptions::default()
        },
    }
}

/// The JSON report carries every outcome and backup of the run.
#[test]
fn test_json_report_describes_the_run() -> Result<()> {
    init_test_logging();
    let scenario = RepositoryScenario::new()?;
    let settings = repository_cmd::settings(&args_for(&scenario, false), &AppConfig::default())?
        .with_timestamp(integration_tests::RUN_TIMESTAMP);
    let mut out = Vec::new();

    execute(settings, ReportFormat::Json, &mut out)?;

    let report: Value = serde_json::from_slice(&out)?;
    assert_eq!(report["profile"], "repository");
    assert_eq!(report["dry_run"], false);
    let targets: Vec<&str> = report["outcomes"]
        .as_array()
        .expect("outcomes is an array")
        .iter()
        .filter_map(|outcome| outcome["target"].as_str())
        .collect();
    assert_eq!(targets, vec!["DB1", "DB2", "repositories"]);
    assert_eq!(report["backups"][0]["written"], true);
    Ok(())
}

/// `--test` reports skips and exits cleanly.
#[test]
fn test_dry_run_flag_skips_every_target() -> Result<()> {
    init_test_logging();
    let scenario = RepositoryScenario::new()?;
    let settings = repository_cmd::settings(&args_for(&scenario, true), &AppConfig::default())?;
    let mut out = Vec::new();

    let report = execute(settings, ReportFormat::Json, &mut out)?;

    assert_eq!(report.summary().skipped, 3);
    let json: Value = serde_json::from_slice(&out)?;
    assert_eq!(json["dry_run"], true);
    assert_eq!(json["outcomes"][0]["status"], "SKIPPED_DRY_RUN");
    Ok(())
}

/// The settings file can name the configuration when `--cfg` is absent.
#[test]
fn test_settings_default_cfg_is_used() -> Result<()> {
    init_test_logging();
    let scenario = RepositoryScenario::new()?;
    let app_config = AppConfig {
        defaults: DefaultsConfig {
            cfg: Some(scenario.config.display().to_string()),
            base: None,
        },
        ..AppConfig::default()
    };
    let args = RepositoryArgs {
        cfg: None,
        options: RunOptions {
            test: true,
            ..RunOptions::default()
        },
    };

    let settings = repository_cmd::settings(&args, &app_config)?;

    assert_eq!(settings.config_path, scenario.config);
    Ok(())
}

/// Failed targets surface as an error with exit status 1 after the report
/// is printed.
#[test]
fn test_unreachable_catalog_exits_with_failure() -> Result<()> {
    init_test_logging();
    let scenario = RepositoryScenario::new()?;
    std::fs::remove_file(&scenario.catalog)?;
    let settings = repository_cmd::settings(&args_for(&scenario, false), &AppConfig::default())?
        .with_timestamp(integration_tests::RUN_TIMESTAMP);
    let mut out = Vec::new();

    let result = execute(settings, ReportFormat::Json, &mut out);

    match result {
        Err(error @ Error::TargetsFailed { .. }) => assert_eq!(error.exit_code(), 1),
        other => panic!("Expected TargetsFailed, got {:?}", other),
    }
    let json: Value = serde_json::from_slice(&out)?;
    assert_eq!(json["outcomes"][0]["status"], "FAILED");
    assert!(json["outcomes"][0]["reason"]
        .as_str()
        .is_some_and(|reason| reason.contains("Relational session unavailable")));
    Ok(())
}
