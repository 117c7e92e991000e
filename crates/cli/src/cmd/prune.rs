//! Tiered retention: evaluate every dataset, then destroy what no tier keeps

use super::blocking;
use crate::locks::RunLock;
use crate::system_config::SystemConfig;
use crate::util;
use crate::zfs::ZfsCommand;
use anyhow::Result;
use owo_colors::OwoColorize;
use retention::{
    apply_decisions, destroy_ranges, Decision, DecisionSet, RetentionEvaluator, RunMode, RunReport,
    TierSpec,
};
use rollup_core::{EligibilityFilter, Inventory, InventoryProvider, SnapshotRecord};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Command-line options of `rollup prune`
pub struct PruneOptions {
    pub datasets: Vec<String>,
    pub test: bool,
    pub verbose: bool,
    pub empty: bool,
    pub recursive: bool,
    pub prefixes: Vec<String>,
    pub json: bool,
    pub print_commands: bool,
}

/// Everything one prune run produced
struct Outcome {
    inventory: Inventory,
    ignored: Vec<SnapshotRecord>,
    decisions: DecisionSet,
    report: RunReport,
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    decisions: &'a DecisionSet,
    ignored: &'a [SnapshotRecord],
    report: &'a RunReport,
}

pub async fn run(config: SystemConfig, opts: PruneOptions) -> Result<()> {
    let policy = config
        .policy()?
        .with_prune_empty(config.prune.prune_empty || opts.empty);
    let tiers = policy.tiers().to_vec();
    let recursive = opts.recursive || config.prune.recursive;
    let filter = if opts.prefixes.is_empty() {
        EligibilityFilter::new(&config.prune.prefixes)
    } else {
        EligibilityFilter::new(&opts.prefixes)
    };

    // Printing commands never destroys anything itself
    let mode = if opts.print_commands {
        RunMode::DryRun
    } else {
        RunMode::from_test_flag(opts.test)
    };
    let _lock = if mode.is_live() {
        Some(RunLock::acquire(&config.zfs.lock_path())?)
    } else {
        None
    };

    let zfs = ZfsCommand::new(&config.zfs);
    let program = zfs.program().to_string();
    let roots = opts.datasets.clone();

    let outcome = blocking(move || {
        let inventory = zfs.fetch_snapshots(&roots, recursive)?;
        let (eligible, ignored) = filter.partition(&inventory);
        let decisions = RetentionEvaluator::new(&policy).evaluate(&eligible);
        let report = apply_decisions(&decisions, &zfs, mode);
        Ok(Outcome {
            inventory,
            ignored,
            decisions,
            report,
        })
    })
    .await?;

    if opts.print_commands {
        print_commands(&program, &outcome, opts.test, opts.verbose);
    } else if opts.json {
        util::print_json(&JsonOutput {
            decisions: &outcome.decisions,
            ignored: &outcome.ignored,
            report: &outcome.report,
        })?;
    } else {
        // Test mode always shows the full picture
        render(&outcome, &tiers, opts.verbose || opts.test);
        print_summary(&outcome.report);
    }

    util::print_problems(&outcome.report.rejected, &outcome.report.failures);

    if !outcome.report.is_clean() {
        anyhow::bail!(
            "{} failed, {} rejected",
            util::plural(outcome.report.failures.len(), "destroy call"),
            util::plural(outcome.report.rejected.len(), "dataset")
        );
    }

    Ok(())
}

fn render(outcome: &Outcome, tiers: &[TierSpec], verbose: bool) {
    for (dataset, all) in outcome.inventory.datasets() {
        if outcome.report.rejected.contains_key(dataset) {
            continue;
        }

        let by_name: BTreeMap<&str, &Decision> = outcome
            .decisions
            .get(dataset)
            .map(|d| d.decisions.iter().map(|x| (x.snapshot.name.as_str(), x)).collect())
            .unwrap_or_default();

        let has_deletions = by_name.values().any(|d| d.is_delete());
        if !verbose && !has_deletions {
            continue;
        }

        println!("{}", dataset.bold());
        for snap in all {
            match by_name.get(snap.name.as_str()) {
                Some(decision) if verbose => print_decision(decision, tiers),
                Some(decision) if decision.is_delete() => {
                    println!("\t{}\t@{}", "pruning".red(), snap.name);
                }
                Some(_) => {}
                None if verbose => println!("\t{}\t@{}", "ignoring:".dimmed(), snap.name),
                None => {}
            }
        }
    }
}

fn print_decision(decision: &Decision, tiers: &[TierSpec]) {
    let snap = &decision.snapshot;
    let verb = if decision.is_delete() {
        "pruning".red().to_string()
    } else {
        String::new()
    };
    let latest = if decision.latest {
        format!("  {}", "latest".green())
    } else {
        String::new()
    };

    println!(
        "\t{}\t@{}  {}  {}  {}{}",
        verb,
        snap.name,
        util::format_timestamp(&snap.created_at).dimmed(),
        decision.flags(tiers),
        util::format_size(snap.used_bytes),
        latest
    );
}

fn print_summary(report: &RunReport) {
    let count = report.deletions.len();
    println!();

    if count == 0 {
        println!("{}", "Nothing to prune".dimmed());
        return;
    }

    match report.mode {
        RunMode::DryRun => println!(
            "{} would be destroyed {}",
            util::plural(count, "snapshot").yellow(),
            "(test mode, nothing deleted)".dimmed()
        ),
        RunMode::Live => println!(
            "Destroyed {} of {}",
            report.destroyed().to_string().green(),
            util::plural(count, "snapshot")
        ),
    }
}

/// `zfs destroy` lines covering every deletion, coalesced into ranges
fn print_commands(program: &str, outcome: &Outcome, test: bool, verbose: bool) {
    let mut flags = String::new();
    if test {
        flags.push_str(" -n");
    }
    if verbose {
        flags.push_str(" -v");
    }

    for dataset in &outcome.decisions.datasets {
        let doomed: BTreeSet<&str> = dataset
            .deletions()
            .map(|d| d.snapshot.name.as_str())
            .collect();
        if doomed.is_empty() {
            continue;
        }

        let all = outcome.inventory.get(&dataset.dataset).unwrap_or_default();
        for range in destroy_ranges(&dataset.dataset, all, &doomed) {
            println!("{} destroy{} {}", program, flags, range);
        }
    }
}
