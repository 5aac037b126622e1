//! Domain layer: ranges, the containment forest and its builder
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod builder;
pub mod error;
pub mod forest;
pub mod invariants;
pub mod printer;
pub mod range;

pub use builder::{BuildStats, HierarchyBuilder, OverlapPolicy};
pub use error::{DomainError, DomainResult};
pub use forest::{Coverage, Forest, Node, PreOrderIterator};
pub use invariants::Violation;
pub use printer::TreePrinter;
pub use range::{AddressFamily, Range};
