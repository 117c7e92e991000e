//! `rollup config` and `rollup tiers`

use crate::common::FakeZfs;
use anyhow::Result;

#[test]
fn test_example_is_valid_config() -> Result<()> {
    let fake = FakeZfs::new(&[])?;

    let example = crate::rollup!(fake.dir(), "config", "example").assert_success()?;
    assert!(example.contains_stdout("[[tier]]"));

    let path = fake.dir().join("example.toml");
    std::fs::write(&path, &example.stdout)?;
    let path = path.to_str().unwrap();
    let tiers = crate::rollup!(fake.dir(), "--config", path, "tiers").assert_success()?;
    assert!(tiers.contains_stdout("hourly (h): per hour, keep 24"));
    assert!(tiers.contains_stdout("weekly (w): per week, keep unbounded"));
    Ok(())
}

#[test]
fn test_tiers_from_config() -> Result<()> {
    let fake = FakeZfs::new(&[])?;
    fake.write_config(
        r#"
[prune]
representative = "last"

[[tier]]
name = "frequent"
period = "15m"
capacity = 4
"#,
    )?;

    let result = fake.rollup(&["tiers"]).assert_success()?;
    assert!(result.contains_stdout("frequent (f): every 15m, keep 4"));
    assert!(result.contains_stdout("last (newest snapshot in each bucket)"));
    Ok(())
}

#[test]
fn test_invalid_config_is_rejected() -> Result<()> {
    let fake = FakeZfs::new(&[])?;
    fake.write_config("[[tier]]\nname = \"odd\"\n")?;

    let result = fake.rollup(&["tiers"]).assert_failure()?;
    assert!(result.contains_stderr("Invalid configuration"));
    Ok(())
}

#[test]
fn test_missing_explicit_config_fails() -> Result<()> {
    let fake = FakeZfs::new(&[])?;
    let missing = fake.dir().join("missing.toml");

    crate::rollup!(fake.dir(), "--config", missing.to_str().unwrap(), "tiers").assert_failure()?;
    Ok(())
}

#[test]
fn test_config_path_create() -> Result<()> {
    let fake = FakeZfs::new(&[])?;
    let path = fake.dir().join("nested/config.toml");

    let arg = path.to_str().unwrap();

    let result = crate::rollup!(fake.dir(), "--config", arg, "config", "path", "--create")
        .assert_success()?;
    assert!(result.contains_stdout("Created config file"));
    assert!(path.exists());

    let list = crate::rollup!(fake.dir(), "--config", arg, "config", "list").assert_success()?;
    assert!(list.contains_stdout("freenas:state"));
    Ok(())
}
