//! CLI argument definitions using clap

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{ArgAction, Parser, Subcommand, ValueHint};

/// Rebuild supernet/subnet containment forests from allocation snapshots
#[derive(Parser, Debug)]
#[command(name = "netforest")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (default: ./.netforest.toml)
    #[arg(short, long, global = true, env = "NETFOREST_CONFIG", value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Keep going on partially overlapping ranges instead of failing
    #[arg(long, global = true)]
    pub tolerate_overlaps: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a snapshot and print its containment forest
    Tree {
        /// Snapshot file
        #[arg(value_hint = ValueHint::FilePath)]
        snapshot: PathBuf,
        /// Print block identities only
        #[arg(long)]
        plain: bool,
    },

    /// Print child/parent edges in tree order
    Edges {
        /// Snapshot file
        #[arg(value_hint = ValueHint::FilePath)]
        snapshot: PathBuf,
    },

    /// Attach the roots of a partial snapshot under their known ancestors
    Refine {
        /// Partial snapshot (e.g. blocks changed on one day)
        #[arg(value_hint = ValueHint::FilePath)]
        changes: PathBuf,
        /// Full snapshot providing known ancestors
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        reference: Option<PathBuf>,
    },

    /// Show supernet links added, moved or removed between two snapshots
    Diff {
        /// Previous snapshot
        #[arg(value_hint = ValueHint::FilePath)]
        old: PathBuf,
        /// Current snapshot
        #[arg(value_hint = ValueHint::FilePath)]
        new: PathBuf,
        /// First-seen date for new links (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Count the addresses a snapshot covers, nested blocks counted once
    Coverage {
        /// Snapshot file
        #[arg(value_hint = ValueHint::FilePath)]
        snapshot: PathBuf,
    },

    /// Build a snapshot and check the forest invariants
    Verify {
        /// Snapshot file
        #[arg(value_hint = ValueHint::FilePath)]
        snapshot: PathBuf,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective settings
    Show,
    /// Show config file locations
    Path,
}
