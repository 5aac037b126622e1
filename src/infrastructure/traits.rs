//! I/O boundary traits for testability
//!
//! These traits abstract external I/O operations, allowing services
//! to be tested with mock implementations.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use crate::application::ApplicationResult;
use crate::domain::Range;

/// Filesystem abstraction for testability.
pub trait FileSystem: Send + Sync {
    /// Read file contents to string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Check if path is a file.
    fn is_file(&self, path: &Path) -> bool;
}

/// A block known from earlier data, returned by an [`AncestorLookup`].
#[derive(Debug, Clone)]
pub struct Ancestor {
    pub range: Range,
    /// Caller metadata attached to the injected node
    pub annotations: BTreeMap<String, String>,
}

/// Source of true ancestors for blocks that end up as roots of a partial
/// snapshot (a block allocated before the snapshot and absent from it).
pub trait AncestorLookup {
    /// Tightest known range containing `range`, if any.
    fn ancestor_of(&self, range: &Range) -> ApplicationResult<Option<Ancestor>>;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Real filesystem implementation.
#[derive(Debug, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }
}
