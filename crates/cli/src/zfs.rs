//! `zfs` command-line adapter

use crate::system_config::ZfsConfig;
use rollup_core::{
    parse_zfs_get, Inventory, InventoryProvider, MutationError, ProviderError, SnapshotDestroyer,
};
use std::process::{Command, Output};
use tracing::debug;

/// Lists and destroys snapshots by running the `zfs` program
#[derive(Debug, Clone)]
pub struct ZfsCommand {
    program: String,
    protection_property: String,
}

impl ZfsCommand {
    pub fn new(config: &ZfsConfig) -> Self {
        Self {
            program: config.command.clone(),
            protection_property: config.protection_property.clone(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn get_args(&self, root: &str, recursive: bool) -> Vec<String> {
        let flags = if recursive { "-Hpr" } else { "-Hp" };
        vec![
            "get".to_string(),
            "-t".to_string(),
            "snapshot".to_string(),
            flags.to_string(),
            "-o".to_string(),
            "name,property,value".to_string(),
            format!("type,creation,used,{}", self.protection_property),
            root.to_string(),
        ]
    }

    fn output(&self, args: &[String]) -> std::io::Result<Output> {
        debug!(program = %self.program, args = ?args, "Running");
        Command::new(&self.program).args(args).output()
    }

    fn describe(&self, args: &[String]) -> String {
        format!("{} {}", self.program, args.join(" "))
    }
}

impl InventoryProvider for ZfsCommand {
    fn fetch_snapshots(
        &self,
        roots: &[String],
        recursive: bool,
    ) -> Result<Inventory, ProviderError> {
        let mut inventory = Inventory::new();

        for root in roots {
            let args = self.get_args(root, recursive);
            let output = self.output(&args).map_err(|source| ProviderError::Spawn {
                command: self.describe(&args),
                source,
            })?;

            if !output.status.success() {
                return Err(ProviderError::Failed {
                    command: self.describe(&args),
                    status: output.status.to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                });
            }

            let stdout = String::from_utf8_lossy(&output.stdout);
            inventory.absorb(parse_zfs_get(&stdout, root, recursive, &self.protection_property)?);
        }

        Ok(inventory)
    }
}

impl SnapshotDestroyer for ZfsCommand {
    fn destroy(&self, dataset: &str, name: &str) -> Result<(), MutationError> {
        let args = vec!["destroy".to_string(), format!("{}@{}", dataset, name)];
        let output = self
            .output(&args)
            .map_err(|err| MutationError::new(dataset, name, err.to_string()))?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let reason = if stderr.is_empty() {
            output.status.to_string()
        } else {
            stderr
        };
        Err(MutationError::new(dataset, name, reason))
    }
}
