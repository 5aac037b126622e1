//! Two-pass refinement of a partial snapshot
//!
//! A snapshot holding only the blocks that changed on a given day has roots
//! whose real supernet is absent from it. The first build exposes those
//! roots, the lookup supplies their known ancestors, which are injected as
//! extra nodes before building again.

use tracing::{debug, instrument, warn};

use crate::application::ApplicationResult;
use crate::domain::{BuildStats, Forest, HierarchyBuilder, Range};
use crate::infrastructure::traits::AncestorLookup;

/// Annotation marking nodes injected by the refinement.
pub const INJECTED_KEY: &str = "type";
pub const INJECTED_VALUE: &str = "parent info";

/// Outcome of [`RefinementService::refine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefinementReport {
    pub first_pass: BuildStats,
    /// None when no ancestor was injected and the first build stands
    pub second_pass: Option<BuildStats>,
    /// Identities of injected ancestors, in root order
    pub injected: Vec<String>,
}

pub struct RefinementService {
    builder: HierarchyBuilder,
}

impl RefinementService {
    pub fn new(builder: HierarchyBuilder) -> Self {
        Self { builder }
    }

    #[instrument(level = "debug", skip_all, fields(ranges = forest.len()))]
    pub fn refine(
        &self,
        forest: &mut Forest,
        lookup: &dyn AncestorLookup,
    ) -> ApplicationResult<RefinementReport> {
        let first_pass = self.builder.build(forest)?;

        let roots: Vec<Range> = forest.roots().map(|node| node.range().clone()).collect();
        let mut injected = Vec::new();

        for root in &roots {
            let Some(ancestor) = lookup.ancestor_of(root)? else {
                debug!(root = root.identity(), "no known ancestor");
                continue;
            };
            let identity = ancestor.range.identity().to_string();
            if forest.contains(&identity) {
                continue;
            }
            if !ancestor.range.contains(root) {
                warn!(root = root.identity(), ancestor = %identity, "lookup returned a non-enclosing range, ignored");
                continue;
            }

            forest.insert(ancestor.range)?;
            forest.annotate(&identity, INJECTED_KEY, INJECTED_VALUE)?;
            for (key, value) in ancestor.annotations {
                forest.annotate(&identity, key, value)?;
            }
            debug!(root = root.identity(), ancestor = %identity, "ancestor injected");
            injected.push(identity);
        }

        let second_pass = if injected.is_empty() {
            None
        } else {
            Some(self.builder.build(forest)?)
        };

        Ok(RefinementReport {
            first_pass,
            second_pass,
            injected,
        })
    }
}
