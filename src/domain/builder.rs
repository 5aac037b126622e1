//! Sweep-line reconstruction of the containment hierarchy.
//!
//! Every range contributes a start event at its first value and a stop event
//! just past its last value. Sorting all events and replaying them while
//! keeping the currently open ranges on a stack yields, for each range, its
//! tightest enclosing range: whatever is on top of the stack when it starts.
//!
//! Event order:
//! 1. boundary ascending (stop boundaries are exclusive, `end + 1`)
//! 2. stop before start at the same boundary
//! 3. starts follow the nesting order `(start asc, end desc, identity asc)`,
//!    stops follow its mirror, so the last range opened is the first closed
//!
//! With a laminar input every stop pops the top of the stack. A stop that
//! finds another range on top is a partial overlap and is handled according
//! to [`OverlapPolicy`].

use generational_arena::Index;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::forest::Forest;
use crate::domain::invariants;

/// What to do with ranges that partially overlap (neither nested nor disjoint).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlapPolicy {
    /// Fail the build with [`DomainError::PartialOverlap`]
    #[default]
    Reject,
    /// Close the range out of order, log a warning and keep going.
    /// Containment is not guaranteed for the ranges involved.
    Tolerate,
}

/// Summary of one build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub ranges: usize,
    pub roots: usize,
    pub max_depth: usize,
    /// Partial overlaps closed out of order (always 0 under `Reject`)
    pub overlaps: usize,
}

/// Default number of events between two progress log lines.
pub const DEFAULT_PROGRESS_INTERVAL: usize = 1_000_000;

/// Recomputes parent/children/roots of a [`Forest`] from its ranges.
///
/// The builder holds configuration only; each call to [`build`](Self::build)
/// resets the forest and recomputes it from scratch, so it can be called again
/// after nodes were added (two-pass refinement) and always yields the same
/// result for the same set of ranges.
#[derive(Debug, Clone)]
pub struct HierarchyBuilder {
    overlap_policy: OverlapPolicy,
    progress_interval: usize,
}

impl Default for HierarchyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HierarchyBuilder {
    pub fn new() -> Self {
        Self {
            overlap_policy: OverlapPolicy::default(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }

    pub fn with_overlap_policy(mut self, overlap_policy: OverlapPolicy) -> Self {
        self.overlap_policy = overlap_policy;
        self
    }

    /// Log a progress checkpoint every `events` sweep events, 0 disables.
    pub fn with_progress_interval(mut self, events: usize) -> Self {
        self.progress_interval = events;
        self
    }

    pub fn overlap_policy(&self) -> OverlapPolicy {
        self.overlap_policy
    }

    /// Rebuild all links of `forest`.
    ///
    /// On error the forest is left with no links at all.
    #[instrument(level = "debug", skip(self, forest), fields(ranges = forest.len()))]
    pub fn build(&self, forest: &mut Forest) -> DomainResult<BuildStats> {
        forest.reset_links();

        let order = nesting_order(forest);
        let events = sweep_events(forest, &order);
        debug!(events = events.len(), "events sorted");

        match self.sweep(forest, &order, &events) {
            Ok(stats) => {
                forest.mark_built();
                debug_assert!(
                    self.overlap_policy == OverlapPolicy::Tolerate
                        || invariants::check(forest).is_empty(),
                    "sweep produced an inconsistent forest"
                );
                info!(
                    ranges = stats.ranges,
                    roots = stats.roots,
                    max_depth = stats.max_depth,
                    overlaps = stats.overlaps,
                    "hierarchy built"
                );
                Ok(stats)
            }
            Err(e) => {
                forest.reset_links();
                Err(e)
            }
        }
    }

    fn sweep(&self, forest: &mut Forest, order: &[Index], events: &[Event]) -> DomainResult<BuildStats> {
        let total = events.len();
        let mut active: Vec<usize> = Vec::with_capacity(64);
        let mut closed = vec![false; order.len()];
        let mut depth = vec![0usize; order.len()];
        let mut stats = BuildStats {
            ranges: order.len(),
            ..BuildStats::default()
        };

        for (processed, event) in events.iter().enumerate() {
            if self.progress_interval > 0 && processed > 0 && processed % self.progress_interval == 0 {
                debug!(processed, total, open = active.len(), "sweep progress");
            }

            let handle = order[event.rank];
            let degenerate = forest.node_at(handle).range().is_degenerate();

            match event.kind {
                EventKind::Start => {
                    match active.last() {
                        Some(&top) => {
                            forest.link(order[top], handle);
                            depth[event.rank] = depth[top] + 1;
                        }
                        None => {
                            forest.push_root(handle);
                            stats.roots += 1;
                        }
                    }
                    stats.max_depth = stats.max_depth.max(depth[event.rank] + 1);
                    if !degenerate {
                        active.push(event.rank);
                    }
                }
                EventKind::Stop if !degenerate => {
                    self.close(forest, order, &mut active, &mut closed, event.rank, &mut stats)?;
                }
                EventKind::Stop => {}
            }
        }

        Ok(stats)
    }

    fn close(
        &self,
        forest: &Forest,
        order: &[Index],
        active: &mut Vec<usize>,
        closed: &mut [bool],
        rank: usize,
        stats: &mut BuildStats,
    ) -> DomainResult<()> {
        let Some(&top) = active.last() else {
            return Ok(());
        };

        if top != rank {
            let outer = forest.node_at(order[rank]).identity();
            let inner = forest.node_at(order[top]).identity();
            match self.overlap_policy {
                OverlapPolicy::Reject => {
                    return Err(DomainError::PartialOverlap {
                        outer: outer.to_string(),
                        inner: inner.to_string(),
                    });
                }
                OverlapPolicy::Tolerate => {
                    warn!(outer, inner, "partial overlap, range closed out of order");
                    stats.overlaps += 1;
                    closed[rank] = true;
                    return Ok(());
                }
            }
        }

        active.pop();
        while let Some(&top) = active.last() {
            if !closed[top] {
                break;
            }
            active.pop();
        }
        Ok(())
    }
}

/// Position on the sweep line.
///
/// 129-bit so the exclusive end of a range ending at `u128::MAX` is
/// representable: `(carry, offset)` compares as `carry * 2^128 + offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Boundary {
    carry: bool,
    offset: u128,
}

impl Boundary {
    fn at(value: u128) -> Self {
        Self {
            carry: false,
            offset: value,
        }
    }

    fn after(value: u128) -> Self {
        match value.checked_add(1) {
            Some(offset) => Self { carry: false, offset },
            None => Self { carry: true, offset: 0 },
        }
    }
}

// Stop sorts before Start
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum EventKind {
    Stop,
    Start,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Event {
    boundary: Boundary,
    kind: EventKind,
    tie: usize,
    rank: usize,
}

/// Handles sorted so that an enclosing range comes before everything it
/// encloses; exact duplicates are ordered by identity.
fn nesting_order(forest: &Forest) -> Vec<Index> {
    let mut handles = forest.handles();
    handles.sort_unstable_by(|&a, &b| {
        let a = forest.node_at(a).range();
        let b = forest.node_at(b).range();
        a.start()
            .cmp(&b.start())
            .then_with(|| b.end().cmp(&a.end()))
            .then_with(|| a.identity().cmp(b.identity()))
    });
    handles
}

fn sweep_events(forest: &Forest, order: &[Index]) -> Vec<Event> {
    let n = order.len();
    let mut events = Vec::with_capacity(2 * n);
    for (rank, &handle) in order.iter().enumerate() {
        let range = forest.node_at(handle).range();
        events.push(Event {
            boundary: Boundary::at(range.start()),
            kind: EventKind::Start,
            tie: rank,
            rank,
        });
        events.push(Event {
            boundary: Boundary::after(range.end()),
            kind: EventKind::Stop,
            tie: n - 1 - rank,
            rank,
        });
    }
    events.sort_unstable();
    events
}
