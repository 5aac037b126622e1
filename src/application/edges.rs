//! Supernet edges of a built forest and their changes between snapshots.
//!
//! The forest itself is recomputed from scratch for every snapshot; what is
//! worth persisting is the child → parent relation, recorded once with the
//! date it was first seen.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::domain::Forest;

/// New child → parent link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupernetLink {
    pub child: String,
    pub parent: String,
    pub first_seen: NaiveDate,
}

/// Child whose tightest enclosing block changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reparented {
    pub child: String,
    pub previous_parent: String,
    pub parent: String,
    pub first_seen: NaiveDate,
}

/// Difference between two edge sets, each list sorted by child identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeChanges {
    pub added: Vec<SupernetLink>,
    pub reparented: Vec<Reparented>,
    /// `(child, previous parent)` links that no longer exist
    pub removed: Vec<(String, String)>,
}

impl EdgeChanges {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.reparented.is_empty() && self.removed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.added.len() + self.reparented.len() + self.removed.len()
    }
}

/// Child identity → parent identity for every non-root node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeSet {
    edges: BTreeMap<String, String>,
}

impl EdgeSet {
    pub fn from_forest(forest: &Forest) -> Self {
        let edges = forest
            .nodes()
            .filter_map(|node| {
                forest
                    .parent(node)
                    .map(|parent| (node.identity().to_string(), parent.identity().to_string()))
            })
            .collect();
        Self { edges }
    }

    pub fn parent_of(&self, child: &str) -> Option<&str> {
        self.edges.get(child).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.edges.iter().map(|(c, p)| (c.as_str(), p.as_str()))
    }

    /// Changes from `self` (previous snapshot) to `current`, new links
    /// stamped with `first_seen`.
    pub fn diff(&self, current: &EdgeSet, first_seen: NaiveDate) -> EdgeChanges {
        let mut changes = EdgeChanges::default();

        for (child, parent) in current.iter() {
            match self.parent_of(child) {
                None => changes.added.push(SupernetLink {
                    child: child.to_string(),
                    parent: parent.to_string(),
                    first_seen,
                }),
                Some(previous) if previous != parent => changes.reparented.push(Reparented {
                    child: child.to_string(),
                    previous_parent: previous.to_string(),
                    parent: parent.to_string(),
                    first_seen,
                }),
                Some(_) => {}
            }
        }

        for (child, parent) in self.iter() {
            if current.parent_of(child).is_none() {
                changes.removed.push((child.to_string(), parent.to_string()));
            }
        }

        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AddressFamily, HierarchyBuilder, Range};

    fn edges(ranges: &[(&str, u128, u128)]) -> EdgeSet {
        let mut forest = Forest::from_ranges(
            ranges
                .iter()
                .map(|&(id, s, e)| Range::spanning(id, AddressFamily::Ipv4, s, e).unwrap()),
        )
        .unwrap();
        HierarchyBuilder::new().build(&mut forest).unwrap();
        EdgeSet::from_forest(&forest)
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[test]
    fn given_forest_when_collecting_edges_then_skips_roots() {
        let set = edges(&[("A", 0, 100), ("B", 10, 20), ("D", 15, 18)]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.parent_of("D"), Some("B"));
        assert_eq!(set.parent_of("A"), None);
    }

    #[test]
    fn given_same_snapshot_when_diffing_then_no_changes() {
        let set = edges(&[("A", 0, 100), ("B", 10, 20)]);
        assert!(set.diff(&set.clone(), day()).is_empty());
    }

    #[test]
    fn given_new_intermediate_block_when_diffing_then_reports_all_kinds() {
        let before = edges(&[("A", 0, 100), ("D", 15, 18), ("X", 50, 60), ("Y", 55, 56)]);
        let after = edges(&[("A", 0, 100), ("B", 10, 20), ("D", 15, 18), ("Y", 55, 56)]);

        let changes = before.diff(&after, day());

        assert_eq!(
            changes.added,
            vec![SupernetLink {
                child: "B".into(),
                parent: "A".into(),
                first_seen: day()
            }]
        );
        assert_eq!(
            changes.reparented,
            vec![
                Reparented {
                    child: "D".into(),
                    previous_parent: "A".into(),
                    parent: "B".into(),
                    first_seen: day()
                },
                Reparented {
                    child: "Y".into(),
                    previous_parent: "X".into(),
                    parent: "A".into(),
                    first_seen: day()
                },
            ]
        );
        assert_eq!(changes.removed, vec![("X".to_string(), "A".to_string())]);
        assert_eq!(changes.len(), 4);
    }
}
