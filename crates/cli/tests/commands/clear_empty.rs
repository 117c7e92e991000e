//! `rollup clear-empty` end to end

use crate::common::{FakeSnapshot, FakeZfs};
use anyhow::Result;

/// auto-01 and auto-02 are empty; auto-04 is empty but latest
fn empty_fixture() -> Result<FakeZfs> {
    let used = [100, 0, 0, 100, 0];
    let snapshots: Vec<FakeSnapshot> = used
        .iter()
        .enumerate()
        .map(|(h, used)| {
            FakeSnapshot::at_hour("tank/data", &format!("auto-{:02}", h), h as i64, *used)
        })
        .collect();
    FakeZfs::new(&snapshots)
}

#[test]
fn test_dry_run_reports_iterations() -> Result<()> {
    let fake = empty_fixture()?;

    let result = fake.rollup(&["clear-empty", "-t", "tank/data"]).assert_success()?;

    assert!(result.contains_stdout("Would destroy tank/data@auto-01"));
    assert!(result.contains_stdout("Would destroy tank/data@auto-02"));
    assert!(!result.contains_stdout("auto-04"));
    assert!(fake.destroyed().is_empty());
    Ok(())
}

#[test]
fn test_live_run_deletes_oldest_first() -> Result<()> {
    let fake = empty_fixture()?;

    fake.rollup(&["clear-empty", "tank/data"]).assert_success()?;

    assert_eq!(fake.destroyed(), vec!["tank/data@auto-01", "tank/data@auto-02"]);
    Ok(())
}

#[test]
fn test_json_report() -> Result<()> {
    let fake = empty_fixture()?;

    let result = fake.rollup(&["clear-empty", "-t", "--json", "tank/data"]).assert_success()?;
    let json = result.json()?;

    assert_eq!(json["iterations"], 2);
    assert_eq!(json["decisions"][0]["iteration"], 1);
    assert_eq!(json["decisions"][1]["snapshot"]["name"], "auto-02");
    assert_eq!(json["stopped"], false);
    Ok(())
}

#[test]
fn test_failed_destroy_is_not_retried() -> Result<()> {
    let fake = empty_fixture()?;
    fake.fail_destroy("tank/data@auto-01")?;

    let result = fake.rollup(&["clear-empty", "tank/data"]).assert_failure()?;

    assert!(result.contains_stderr("failed to destroy tank/data@auto-01"));
    assert_eq!(fake.destroyed(), vec!["tank/data@auto-02"]);
    Ok(())
}

#[test]
fn test_protected_and_foreign_snapshots_are_left_alone() -> Result<()> {
    let snapshots = vec![
        FakeSnapshot::at_hour("tank/data", "auto-00", 0, 0).protected("replicating"),
        FakeSnapshot::at_hour("tank/data", "manual-01", 1, 0),
        FakeSnapshot::at_hour("tank/data", "auto-02", 2, 0),
        FakeSnapshot::at_hour("tank/data", "auto-03", 3, 100),
    ];
    let fake = FakeZfs::new(&snapshots)?;

    fake.rollup(&["clear-empty", "tank/data"]).assert_success()?;

    assert_eq!(fake.destroyed(), vec!["tank/data@auto-02"]);
    Ok(())
}
