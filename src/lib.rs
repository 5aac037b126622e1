//! netforest: supernet/subnet containment forests for IP and AS number allocations
//!
//! Layers, innermost first:
//! - [`domain`]: ranges, the forest, the sweep-line builder, printer and invariant checks
//! - [`application`]: snapshot parsing, two-pass refinement, edge diffs
//! - [`infrastructure`]: filesystem and ancestor lookup implementations, DI container
//! - [`cli`]: argument parsing and command dispatch

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
