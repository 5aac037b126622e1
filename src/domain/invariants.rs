//! Structural checks over a built forest.

use std::collections::HashSet;
use std::fmt;

use generational_arena::Index;
use itertools::Itertools;

use crate::domain::forest::Forest;

/// One broken property of a forest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// Child range is not inside its parent range
    NotContained { child: String, parent: String },
    /// A single-address range has children
    DegenerateParent { parent: String },
    /// Two children of the same parent partially overlap
    SiblingOverlap { first: String, second: String },
    /// Children are not in ascending start order
    SiblingOrder { first: String, second: String },
    /// Parent lists a child whose parent link points elsewhere
    BrokenLink { child: String, parent: String },
    /// Node in the root list has a parent
    RootWithParent { root: String },
    /// Node without parent missing from the root list
    Unrooted { identity: String },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::NotContained { child, parent } => {
                write!(f, "{child} is not contained in its parent {parent}")
            }
            Violation::DegenerateParent { parent } => {
                write!(f, "single-address range {parent} has children")
            }
            Violation::SiblingOverlap { first, second } => {
                write!(f, "siblings {first} and {second} partially overlap")
            }
            Violation::SiblingOrder { first, second } => {
                write!(f, "sibling {second} starts before {first}")
            }
            Violation::BrokenLink { child, parent } => {
                write!(f, "{parent} lists {child} as child but {child} points elsewhere")
            }
            Violation::RootWithParent { root } => write!(f, "root {root} has a parent"),
            Violation::Unrooted { identity } => {
                write!(f, "{identity} has no parent and is not a root")
            }
        }
    }
}

/// Check containment, sibling order and overlap, degeneracy and link
/// symmetry. An unbuilt forest has no links and only gets the link checks.
pub fn check(forest: &Forest) -> Vec<Violation> {
    let mut violations = Vec::new();

    let roots: HashSet<_> = forest.root_handles().iter().copied().collect();
    for &root in &roots {
        let node = forest.node_at(root);
        if !node.is_root() {
            violations.push(Violation::RootWithParent {
                root: node.identity().to_string(),
            });
        }
    }

    for handle in forest.handles() {
        let node = forest.node_at(handle);
        let range = node.range();

        if forest.is_built() && node.is_root() && !roots.contains(&handle) {
            violations.push(Violation::Unrooted {
                identity: node.identity().to_string(),
            });
        }

        if range.is_degenerate() && !node.children.is_empty() {
            violations.push(Violation::DegenerateParent {
                parent: node.identity().to_string(),
            });
        }

        for &child_handle in &node.children {
            let child = forest.node_at(child_handle);
            if child.parent != Some(handle) {
                violations.push(Violation::BrokenLink {
                    child: child.identity().to_string(),
                    parent: node.identity().to_string(),
                });
            }
            if !range.contains(child.range()) {
                violations.push(Violation::NotContained {
                    child: child.identity().to_string(),
                    parent: node.identity().to_string(),
                });
            }
        }

        check_siblings(forest, &node.children, &mut violations);
    }

    violations
}

fn check_siblings(forest: &Forest, children: &[Index], violations: &mut Vec<Violation>) {
    let siblings: Vec<_> = children.iter().map(|&h| forest.node_at(h)).collect();

    for (a, b) in siblings.iter().tuple_windows() {
        if b.range().start() < a.range().start() {
            violations.push(Violation::SiblingOrder {
                first: a.identity().to_string(),
                second: b.identity().to_string(),
            });
        }
    }

    // compare each sibling with the one reaching furthest so far
    let mut reach = match siblings.first() {
        Some(first) => *first,
        None => return,
    };
    for &node in siblings.iter().skip(1) {
        if reach.range().partially_overlaps(node.range()) {
            violations.push(Violation::SiblingOverlap {
                first: reach.identity().to_string(),
                second: node.identity().to_string(),
            });
        }
        if node.range().end() > reach.range().end() {
            reach = node;
        }
    }
}
