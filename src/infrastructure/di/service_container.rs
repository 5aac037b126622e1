//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::path::Path;
use std::sync::Arc;

use crate::application::services::{RefinementService, SnapshotService};
use crate::application::ApplicationResult;
use crate::config::Settings;
use crate::domain::{BuildStats, Forest, HierarchyBuilder, TreePrinter};
use crate::infrastructure::traits::{FileSystem, RealFileSystem};

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    pub snapshots: SnapshotService,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        Self::with_deps(settings, Arc::new(RealFileSystem))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(settings: Settings, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            settings: Arc::new(settings),
            snapshots: SnapshotService::new(fs),
        }
    }

    /// Hierarchy builder configured from settings.
    pub fn builder(&self) -> HierarchyBuilder {
        HierarchyBuilder::new()
            .with_overlap_policy(self.settings.overlap_policy)
            .with_progress_interval(self.settings.progress_interval)
    }

    pub fn refinement(&self) -> RefinementService {
        RefinementService::new(self.builder())
    }

    /// Tree printer honoring the `annotate` setting; `plain` forces identities only.
    pub fn printer(&self, plain: bool) -> TreePrinter {
        if plain || !self.settings.annotate {
            TreePrinter::without_annotations()
        } else {
            TreePrinter::new()
        }
    }

    /// Load a snapshot file and build its forest.
    pub fn load_built(&self, path: &Path) -> ApplicationResult<(Forest, BuildStats)> {
        let mut forest = self.snapshots.load_forest(path)?;
        let stats = self.builder().build(&mut forest)?;
        Ok((forest, stats))
    }
}
