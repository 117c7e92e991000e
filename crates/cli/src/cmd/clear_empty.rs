//! Destroy zero-usage snapshots, one per dataset per iteration

use super::{blocking, stop_on_ctrl_c};
use crate::locks::RunLock;
use crate::system_config::SystemConfig;
use crate::util;
use crate::zfs::ZfsCommand;
use anyhow::Result;
use owo_colors::OwoColorize;
use retention::{EmptinessPruner, PrunerReport, RunMode};
use rollup_core::EligibilityFilter;

/// Command-line options of `rollup clear-empty`
pub struct ClearEmptyOptions {
    pub datasets: Vec<String>,
    pub test: bool,
    pub recursive: bool,
    pub prefixes: Vec<String>,
    pub json: bool,
}

pub async fn run(config: SystemConfig, opts: ClearEmptyOptions) -> Result<()> {
    let recursive = opts.recursive || config.prune.recursive;
    let filter = if opts.prefixes.is_empty() {
        EligibilityFilter::new(&config.prune.prefixes)
    } else {
        EligibilityFilter::new(&opts.prefixes)
    };
    let mode = RunMode::from_test_flag(opts.test);
    let _lock = if mode.is_live() {
        Some(RunLock::acquire(&config.zfs.lock_path())?)
    } else {
        None
    };

    let zfs = ZfsCommand::new(&config.zfs);
    let stop = stop_on_ctrl_c();
    let roots = opts.datasets.clone();

    let report = blocking(move || {
        let report = EmptinessPruner::new(zfs.clone(), zfs, roots)
            .recursive(recursive)
            .filter(filter)
            .mode(mode)
            .stop_flag(stop)
            .run()?;
        Ok(report)
    })
    .await?;

    if opts.json {
        util::print_json(&report)?;
    } else {
        render(&report);
    }

    util::print_problems(&report.rejected, &report.failures);

    if !report.is_clean() {
        anyhow::bail!(
            "{} failed, {} rejected",
            util::plural(report.failures.len(), "destroy call"),
            util::plural(report.rejected.len(), "dataset")
        );
    }

    Ok(())
}

fn render(report: &PrunerReport) {
    for decision in &report.decisions {
        let snap = &decision.snapshot;
        let failed = report
            .failures
            .iter()
            .any(|f| f.dataset == snap.dataset && f.name == snap.name);
        if failed {
            continue;
        }

        let verb = match report.mode {
            RunMode::Live => "Destroyed",
            RunMode::DryRun => "Would destroy",
        };
        println!(
            "{} {} {}",
            verb,
            snap.full_name(),
            format!("(iteration {})", decision.iteration).dimmed()
        );
    }

    if report.decisions.is_empty() {
        println!("{}", "No empty snapshots".dimmed());
    } else {
        println!();
        println!(
            "{} in {}",
            util::plural(report.decisions.len() - report.failures.len(), "empty snapshot").yellow(),
            util::plural(report.iterations, "iteration")
        );
    }

    if report.stopped {
        println!("{}", "Stopped on request; run again to continue".yellow());
    }
}
