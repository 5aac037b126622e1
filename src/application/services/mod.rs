//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (FileSystem, AncestorLookup)
//! but are themselves concrete structs, not traits.

mod refinement;
mod snapshot;

pub use refinement::{RefinementReport, RefinementService, INJECTED_KEY, INJECTED_VALUE};
pub use snapshot::{Snapshot, SnapshotEntry, SnapshotService};
