//! Command dispatch: one handler per subcommand

use std::io::{self, Write};
use std::path::Path;

use chrono::NaiveDate;
use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, info, instrument};

use crate::application::{EdgeChanges, EdgeSet};
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, local_config_path, Settings, LOCAL_CONFIG_FILE};
use crate::domain::{invariants, BuildStats, Coverage, OverlapPolicy};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::{InfraError, ReferenceForest};

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Tree { snapshot, plain }) => _tree(&container(cli)?, snapshot, *plain),
        Some(Commands::Edges { snapshot }) => _edges(&container(cli)?, snapshot),
        Some(Commands::Refine { changes, reference }) => {
            _refine(&container(cli)?, changes, reference.as_deref())
        }
        Some(Commands::Diff { old, new, date }) => _diff(&container(cli)?, old, new, *date),
        Some(Commands::Coverage { snapshot }) => _coverage(&container(cli)?, snapshot),
        Some(Commands::Verify { snapshot }) => _verify(&container(cli)?, snapshot),
        Some(Commands::Config { command }) => match command {
            ConfigCommands::Show => _config_show(&container(cli)?.settings),
            ConfigCommands::Path => _config_path(cli.config.as_deref()),
        },
        Some(Commands::Completion { shell }) => _completion(*shell),
        None => {
            Cli::command()
                .print_help()
                .map_err(|e| InfraError::io("print help", e))?;
            Ok(())
        }
    }
}

/// Load layered settings, apply global flags and wire up services.
fn container(cli: &Cli) -> CliResult<ServiceContainer> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if cli.tolerate_overlaps {
        settings.overlap_policy = OverlapPolicy::Tolerate;
    }
    debug!(?settings, "settings loaded");
    Ok(ServiceContainer::new(settings))
}

fn report_stats(stats: &BuildStats) {
    info!(
        ranges = stats.ranges,
        roots = stats.roots,
        max_depth = stats.max_depth,
        overlaps = stats.overlaps,
        "forest built"
    );
    if let Some(message) = overlap_warning(stats) {
        output::warning(&message);
    }
}

fn overlap_warning(stats: &BuildStats) -> Option<String> {
    (stats.overlaps > 0).then(|| {
        format!(
            "{} partially overlapping range(s); containment not guaranteed for them",
            stats.overlaps
        )
    })
}

#[instrument(skip(container))]
fn _tree(container: &ServiceContainer, snapshot: &Path, plain: bool) -> CliResult<()> {
    let (forest, stats) = container.load_built(snapshot)?;
    report_stats(&stats);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    container
        .printer(plain)
        .write(&forest, &mut out)
        .map_err(|e| InfraError::io("write tree", e))?;
    Ok(())
}

#[instrument(skip(container))]
fn _edges(container: &ServiceContainer, snapshot: &Path) -> CliResult<()> {
    let (forest, stats) = container.load_built(snapshot)?;
    report_stats(&stats);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for (_, node) in forest.iter() {
        let parent = forest.parent(node).map_or("-", |p| p.identity());
        writeln!(out, "{}\t{}", node.identity(), parent)
            .map_err(|e| InfraError::io("write edges", e))?;
    }
    Ok(())
}

#[instrument(skip(container))]
fn _refine(container: &ServiceContainer, changes: &Path, reference: Option<&Path>) -> CliResult<()> {
    let reference_path = reference
        .map(Path::to_path_buf)
        .or_else(|| container.settings.reference_snapshot.clone())
        .ok_or_else(|| {
            CliError::InvalidArgs(
                "no reference snapshot: pass --reference or set reference_snapshot".into(),
            )
        })?;
    debug!(reference = %reference_path.display(), "loading reference snapshot");

    let builder = container.builder();
    let reference = ReferenceForest::new(container.snapshots.load_forest(&reference_path)?, &builder)?;

    let mut forest = container.snapshots.load_forest(changes)?;
    let report = container.refinement().refine(&mut forest, &reference)?;
    report_stats(report.second_pass.as_ref().unwrap_or(&report.first_pass));
    info!(
        injected = report.injected.len(),
        roots_before = report.first_pass.roots,
        "refinement done"
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    container
        .printer(false)
        .write(&forest, &mut out)
        .map_err(|e| InfraError::io("write tree", e))?;
    Ok(())
}

#[instrument(skip(container))]
fn _diff(
    container: &ServiceContainer,
    old: &Path,
    new: &Path,
    date: Option<NaiveDate>,
) -> CliResult<()> {
    let (previous, stats) = container.load_built(old)?;
    report_stats(&stats);
    let (current, stats) = container.load_built(new)?;
    report_stats(&stats);

    let first_seen = date.unwrap_or_else(|| chrono::Local::now().date_naive());
    let changes = EdgeSet::from_forest(&previous).diff(&EdgeSet::from_forest(&current), first_seen);
    print_changes(&changes);
    Ok(())
}

fn print_changes(changes: &EdgeChanges) {
    if changes.is_empty() {
        output::success("No supernet changes");
        return;
    }
    if !changes.added.is_empty() {
        output::header("Added:");
        for link in &changes.added {
            output::diff_add(&format!("{} -> {} ({})", link.child, link.parent, link.first_seen));
        }
    }
    if !changes.reparented.is_empty() {
        output::header("Reparented:");
        for moved in &changes.reparented {
            output::diff_change(&format!(
                "{}: {} -> {} ({})",
                moved.child, moved.previous_parent, moved.parent, moved.first_seen
            ));
        }
    }
    if !changes.removed.is_empty() {
        output::header("Removed:");
        for (child, parent) in &changes.removed {
            output::diff_remove(&format!("{child} -> {parent}"));
        }
    }
}

#[instrument(skip(container))]
fn _coverage(container: &ServiceContainer, snapshot: &Path) -> CliResult<()> {
    let (forest, stats) = container.load_built(snapshot)?;
    report_stats(&stats);

    let coverage = forest.coverage();
    match coverage.family {
        Some(family) => {
            output::header(&format!("{family} coverage"));
            for line in coverage_lines(&coverage) {
                output::detail(&line);
            }
        }
        None => output::info("Empty snapshot"),
    }
    Ok(())
}

fn coverage_lines(coverage: &Coverage) -> [String; 3] {
    [
        format!("{} blocks", coverage.blocks),
        format!("{} top-level blocks", coverage.roots),
        format!(
            "{} addresses, {:.2}% of the space",
            coverage.addresses,
            coverage.share() * 100.0
        ),
    ]
}

#[instrument(skip(container))]
fn _verify(container: &ServiceContainer, snapshot: &Path) -> CliResult<()> {
    let (forest, stats) = container.load_built(snapshot)?;
    report_stats(&stats);

    let violations = invariants::check(&forest);
    if violations.is_empty() {
        output::success(&format!(
            "{} ranges, {} roots, depth {}: all invariants hold",
            stats.ranges, stats.roots, stats.max_depth
        ));
        return Ok(());
    }
    for violation in &violations {
        output::failure(violation);
    }
    Err(CliError::VerificationFailed(violations.len()))
}

fn _config_show(settings: &Settings) -> CliResult<()> {
    let rendered = toml::to_string_pretty(settings).map_err(|e| {
        crate::application::ApplicationError::Config {
            message: format!("serialize settings: {e}"),
        }
    })?;
    output::info(&rendered);
    Ok(())
}

fn _config_path(explicit: Option<&Path>) -> CliResult<()> {
    match global_config_path() {
        Some(path) => output::action("global", &path.display()),
        None => output::action("global", &"<no config directory>"),
    }
    let local = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| local_config_path(Path::new(".")));
    output::action("local", &local.display());
    if !local.exists() {
        output::detail(&format!("(not found, {LOCAL_CONFIG_FILE} is optional)"));
    }
    Ok(())
}

fn _completion(shell: clap_complete::Shell) -> CliResult<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
    Ok(())
}
