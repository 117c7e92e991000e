//! A fake `zfs` program backed by files in a temporary directory
//!
//! `get` prints `inventory.tsv` minus every snapshot listed in
//! `destroyed.log`; `destroy` appends to `destroyed.log`, or fails for
//! snapshots listed in `fail.list`.

use super::cli::RollupCommand;
use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// 2024-05-10T00:00:00Z
pub const DAY_ONE: i64 = 1_715_299_200;
pub const HOUR: i64 = 3600;

const SCRIPT: &str = r#"#!/bin/sh
dir="$(dirname "$0")"
touch "$dir/destroyed.log" "$dir/destroyed.pat" "$dir/fail.list"
case "$1" in
    get)
        grep -v -F -f "$dir/destroyed.pat" "$dir/inventory.tsv" || true
        ;;
    destroy)
        if grep -q -x -F "$2" "$dir/fail.list"; then
            echo "cannot destroy '$2': dataset is busy" >&2
            exit 1
        fi
        echo "$2" >> "$dir/destroyed.log"
        printf '%s\t\n' "$2" >> "$dir/destroyed.pat"
        ;;
    *)
        echo "unsupported: $*" >&2
        exit 2
        ;;
esac
"#;

/// One inventory entry
pub struct FakeSnapshot {
    pub dataset: String,
    pub name: String,
    pub creation: String,
    pub used: String,
    pub protection: String,
}

impl FakeSnapshot {
    /// Snapshot created `hour` hours after [`DAY_ONE`]
    pub fn at_hour(dataset: &str, name: &str, hour: i64, used: u64) -> Self {
        Self {
            dataset: dataset.to_string(),
            name: name.to_string(),
            creation: (DAY_ONE + hour * HOUR).to_string(),
            used: used.to_string(),
            protection: "-".to_string(),
        }
    }

    pub fn creation(mut self, value: &str) -> Self {
        self.creation = value.to_string();
        self
    }

    pub fn protected(mut self, tag: &str) -> Self {
        self.protection = tag.to_string();
        self
    }
}

/// Temporary directory holding the fake program, its state and a config file
pub struct FakeZfs {
    temp_dir: TempDir,
}

impl FakeZfs {
    pub fn new(snapshots: &[FakeSnapshot]) -> Result<Self> {
        let temp_dir = TempDir::new().context("Failed to create temp dir")?;
        let fake = Self { temp_dir };

        std::fs::write(fake.script_path(), SCRIPT)?;
        std::fs::set_permissions(fake.script_path(), std::fs::Permissions::from_mode(0o755))?;

        let mut inventory = String::new();
        for snap in snapshots {
            let full = format!("{}@{}", snap.dataset, snap.name);
            writeln!(inventory, "{}\ttype\tsnapshot", full)?;
            writeln!(inventory, "{}\tcreation\t{}", full, snap.creation)?;
            writeln!(inventory, "{}\tused\t{}", full, snap.used)?;
            writeln!(inventory, "{}\tfreenas:state\t{}", full, snap.protection)?;
        }
        std::fs::write(fake.dir().join("inventory.tsv"), inventory)?;

        fake.write_config("")?;
        Ok(fake)
    }

    pub fn dir(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn script_path(&self) -> PathBuf {
        self.dir().join("zfs")
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir().join("config.toml")
    }

    /// `rollup --config <config_path> <args>`, run in this directory
    pub fn rollup(&self, args: &[&str]) -> RollupCommand {
        let config = self.config_path().to_string_lossy().into_owned();
        let mut cmd = RollupCommand::new(self.dir());
        cmd.args(&["--config", config.as_str()]).args(args);
        cmd
    }

    /// Write the config file: `[zfs]` pointing at the fake, followed by `extra`
    pub fn write_config(&self, extra: &str) -> Result<()> {
        let config = format!(
            "[zfs]\ncommand = {:?}\nlock_file = {:?}\n\n{}",
            self.script_path().to_string_lossy(),
            self.dir().join("rollup.lock").to_string_lossy(),
            extra
        );
        std::fs::write(self.config_path(), config)?;
        Ok(())
    }

    /// Make destroy fail for `dataset@name`
    pub fn fail_destroy(&self, full_name: &str) -> Result<()> {
        std::fs::write(self.dir().join("fail.list"), format!("{}\n", full_name))?;
        Ok(())
    }

    /// Snapshots destroyed so far, in order
    pub fn destroyed(&self) -> Vec<String> {
        std::fs::read_to_string(self.dir().join("destroyed.log"))
            .map(|log| log.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }
}
