//! `rollup prune` end to end

use crate::common::{FakeSnapshot, FakeZfs};
use anyhow::Result;

const HOURLY_THREE: &str = r#"
[[tier]]
name = "hourly"
abbreviation = "h"
granularity = "hour"
capacity = 3
"#;

/// Six hourly snapshots and a manual one between auto-01 and auto-02
fn hourly_fixture() -> Result<FakeZfs> {
    let mut snapshots: Vec<FakeSnapshot> = (0..6)
        .map(|h| FakeSnapshot::at_hour("tank/data", &format!("auto-{:02}", h), h, 100))
        .collect();
    snapshots.push(
        FakeSnapshot::at_hour("tank/data", "manual-1", 1, 100)
            .creation(&(crate::common::fake_zfs::DAY_ONE + 5400).to_string()),
    );

    let fake = FakeZfs::new(&snapshots)?;
    fake.write_config(HOURLY_THREE)?;
    Ok(fake)
}

#[test]
fn test_dry_run_lists_decisions_without_destroying() -> Result<()> {
    let fake = hourly_fixture()?;

    let result = fake.rollup(&["prune", "-t", "tank/data"]).assert_success()?;

    assert!(result.contains_stdout("tank/data"));
    assert!(result.contains_stdout("pruning"));
    assert!(result.contains_stdout("@auto-00"));
    assert!(result.contains_stdout("@auto-05"));
    // Test mode implies verbose
    assert!(result.contains_stdout("ignoring:"));
    assert!(result.contains_stdout("@manual-1"));
    assert!(result.contains_stdout("latest"));
    assert!(result.contains_stdout("3 snapshots"));
    assert!(result.contains_stdout("would be destroyed"));

    assert!(fake.destroyed().is_empty());
    Ok(())
}

#[test]
fn test_live_run_destroys_oldest_buckets() -> Result<()> {
    let fake = hourly_fixture()?;

    fake.rollup(&["prune", "tank/data"]).assert_success()?;

    assert_eq!(
        fake.destroyed(),
        vec!["tank/data@auto-00", "tank/data@auto-01", "tank/data@auto-02"]
    );
    // Lock released
    assert!(!fake.dir().join("rollup.lock").exists());

    // Nothing left to do on the second run
    let again = fake.rollup(&["prune", "tank/data"]).assert_success()?;
    assert!(again.contains_stdout("Nothing to prune"));
    assert_eq!(fake.destroyed().len(), 3);
    Ok(())
}

#[test]
fn test_print_commands_breaks_ranges_at_survivors() -> Result<()> {
    let fake = hourly_fixture()?;

    let result = fake
        .rollup(&["prune", "-t", "--print-commands", "tank/data"])
        .assert_success()?;

    let lines: Vec<&str> = result.stdout.lines().collect();
    assert_eq!(lines.len(), 2, "{}", result.stdout);
    assert!(lines[0].ends_with("destroy -n tank/data@auto-00%auto-01"));
    assert!(lines[1].ends_with("destroy -n tank/data@auto-02"));
    assert!(fake.destroyed().is_empty());
    Ok(())
}

#[test]
fn test_json_output() -> Result<()> {
    let fake = hourly_fixture()?;

    let result = fake.rollup(&["prune", "-t", "--json", "tank/data"]).assert_success()?;
    let json = result.json()?;

    assert_eq!(json["report"]["mode"], "dry_run");
    assert_eq!(json["report"]["deletions"].as_array().map(Vec::len), Some(3));
    assert_eq!(json["ignored"][0]["name"], "manual-1");
    assert_eq!(json["decisions"]["datasets"][0]["dataset"], "tank/data");
    Ok(())
}

#[test]
fn test_rejected_dataset_does_not_block_others() -> Result<()> {
    let mut snapshots: Vec<FakeSnapshot> = (0..6)
        .map(|h| FakeSnapshot::at_hour("tank/data", &format!("auto-{:02}", h), h, 100))
        .collect();
    snapshots.push(FakeSnapshot::at_hour("tank/bad", "auto-00", 0, 100).creation("yesterday"));
    let fake = FakeZfs::new(&snapshots)?;
    fake.write_config(HOURLY_THREE)?;

    let result = fake.rollup(&["prune", "-r", "tank"]).assert_failure()?;

    assert!(result.contains_stderr("rejected"));
    assert!(result.contains_stderr("tank/bad"));
    assert_eq!(fake.destroyed().len(), 3);
    Ok(())
}

#[test]
fn test_destroy_failure_sets_exit_status() -> Result<()> {
    let fake = hourly_fixture()?;
    fake.fail_destroy("tank/data@auto-01")?;

    let result = fake.rollup(&["prune", "tank/data"]).assert_failure()?;

    assert!(result.contains_stderr("failed to destroy tank/data@auto-01"));
    assert_eq!(fake.destroyed(), vec!["tank/data@auto-00", "tank/data@auto-02"]);
    Ok(())
}

#[test]
fn test_missing_datasets_is_usage_error() -> Result<()> {
    let fake = hourly_fixture()?;
    let result = crate::rollup!(fake.dir(), "prune").assert_failure()?;
    assert!(result.contains_stderr("Usage"));
    Ok(())
}
