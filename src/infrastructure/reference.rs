//! Ancestor lookup backed by a previously built full snapshot.

use std::cmp::Reverse;

use generational_arena::Index;
use tracing::{debug, instrument};

use crate::application::ApplicationResult;
use crate::domain::{DomainResult, Forest, HierarchyBuilder, Node, Range};
use crate::infrastructure::traits::{Ancestor, AncestorLookup};

/// Full snapshot used as the source of known supernets.
///
/// A block present in the reference gets its reference parent. A block the
/// reference has never seen gets the tightest reference block enclosing it:
/// the last block in nesting order starting at or before it, or the first of
/// that block's ancestors that encloses it.
#[derive(Debug)]
pub struct ReferenceForest {
    forest: Forest,
    /// Handles in nesting order `(start asc, end desc, identity asc)`
    by_start: Vec<Index>,
}

impl ReferenceForest {
    /// Wrap `forest`, building it first if needed.
    pub fn new(mut forest: Forest, builder: &HierarchyBuilder) -> DomainResult<Self> {
        if !forest.is_built() {
            builder.build(&mut forest)?;
        }
        let mut by_start = forest.handles();
        by_start.sort_unstable_by(|&a, &b| {
            let (a, b) = (forest.node_at(a).range(), forest.node_at(b).range());
            (a.start(), Reverse(a.end()), a.identity())
                .cmp(&(b.start(), Reverse(b.end()), b.identity()))
        });
        Ok(Self { forest, by_start })
    }

    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    // Any enclosing block starts at or before `range` and, in a laminar
    // forest, contains the last block starting there, so it is on that
    // block's ancestor chain.
    fn tightest_enclosing(&self, range: &Range) -> Option<&Node> {
        let pos = self
            .by_start
            .partition_point(|&h| self.forest.node_at(h).range().start() <= range.start());
        let mut current = pos
            .checked_sub(1)
            .map(|i| self.forest.node_at(self.by_start[i]));
        while let Some(node) = current {
            if node.range().contains(range) {
                return Some(node);
            }
            current = self.forest.parent(node);
        }
        None
    }
}

impl AncestorLookup for ReferenceForest {
    #[instrument(level = "trace", skip(self), fields(identity = range.identity()))]
    fn ancestor_of(&self, range: &Range) -> ApplicationResult<Option<Ancestor>> {
        if self.forest.family() != Some(range.family()) {
            debug!("reference holds another family");
            return Ok(None);
        }

        let parent = match self.forest.get(range.identity()) {
            Some(node) => self.forest.parent(node),
            None => self.tightest_enclosing(range),
        };

        Ok(parent.map(|node| Ancestor {
            range: node.range().clone(),
            annotations: node.annotations().clone(),
        }))
    }
}
