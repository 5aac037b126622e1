//! Arena-backed containment forest.

use std::collections::{BTreeMap, HashMap};

use generational_arena::{Arena, Index};
use tracing::instrument;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::range::{AddressFamily, Range};

/// Forest node: one range plus its containment links.
///
/// Links are arena handles resolved through the owning [`Forest`], so a node
/// never owns its parent and the forest can be rebuilt without cycle breaking.
#[derive(Debug, Clone)]
pub struct Node {
    range: Range,
    /// Handle of the tightest enclosing node, None for roots
    pub(crate) parent: Option<Index>,
    /// Handles of directly contained nodes, ascending start order
    pub(crate) children: Vec<Index>,
    /// Opaque caller metadata (status, country code, organization, ...)
    annotations: BTreeMap<String, String>,
}

impl Node {
    fn new(range: Range) -> Self {
        Self {
            range,
            parent: None,
            children: Vec::new(),
            annotations: BTreeMap::new(),
        }
    }

    pub fn range(&self) -> &Range {
        &self.range
    }

    pub fn identity(&self) -> &str {
        self.range.identity()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn annotations(&self) -> &BTreeMap<String, String> {
        &self.annotations
    }
}

/// All nodes of one build cycle, keyed by range identity.
///
/// A forest holds ranges of a single [`AddressFamily`]: IPv4 and AS numbers
/// share the same numeric space, so mixing them would fabricate containment.
#[derive(Debug, Clone)]
pub struct Forest {
    family: Option<AddressFamily>,
    arena: Arena<Node>,
    index: HashMap<String, Index>,
    roots: Vec<Index>,
    built: bool,
}

impl Default for Forest {
    fn default() -> Self {
        Self::new()
    }
}

impl Forest {
    pub fn new() -> Self {
        Self {
            family: None,
            arena: Arena::new(),
            index: HashMap::new(),
            roots: Vec::new(),
            built: false,
        }
    }

    /// Populate a forest from a flat list of ranges.
    pub fn from_ranges<I>(ranges: I) -> DomainResult<Self>
    where
        I: IntoIterator<Item = Range>,
    {
        let mut forest = Self::new();
        for range in ranges {
            forest.insert(range)?;
        }
        Ok(forest)
    }

    /// Add a range. Any previous build result is discarded.
    #[instrument(level = "trace", skip(self), fields(identity = range.identity()))]
    pub fn insert(&mut self, range: Range) -> DomainResult<()> {
        if let Some(expected) = self.family {
            if expected != range.family() {
                return Err(DomainError::MixedFamilies {
                    identity: range.identity().to_string(),
                    expected,
                    found: range.family(),
                });
            }
        }
        if self.index.contains_key(range.identity()) {
            return Err(DomainError::DuplicateIdentity(range.identity().to_string()));
        }

        self.invalidate();
        self.family = Some(range.family());
        let identity = range.identity().to_string();
        let handle = self.arena.insert(Node::new(range));
        self.index.insert(identity, handle);
        Ok(())
    }

    /// Remove a range by identity. Any previous build result is discarded.
    #[instrument(level = "trace", skip(self))]
    pub fn remove(&mut self, identity: &str) -> Option<Range> {
        let handle = self.index.remove(identity)?;
        self.invalidate();
        let node = self.arena.remove(handle)?;
        if self.arena.is_empty() {
            self.family = None;
        }
        Some(node.range)
    }

    /// Attach a caller-defined key/value to a node. Does not affect the build.
    pub fn annotate(
        &mut self,
        identity: &str,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> DomainResult<()> {
        let handle = self.handle(identity)?;
        if let Some(node) = self.arena.get_mut(handle) {
            node.annotations.insert(key.into(), value.into());
        }
        Ok(())
    }

    pub fn get(&self, identity: &str) -> Option<&Node> {
        self.index.get(identity).and_then(|&h| self.arena.get(h))
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.index.contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn family(&self) -> Option<AddressFamily> {
        self.family
    }

    /// True once a build has run and no node was added or removed since.
    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Tightest enclosing node of `node`.
    pub fn parent(&self, node: &Node) -> Option<&Node> {
        node.parent.and_then(|h| self.arena.get(h))
    }

    /// Direct children of `node` in ascending start order.
    pub fn children<'a>(&'a self, node: &'a Node) -> impl Iterator<Item = &'a Node> + 'a {
        node.children.iter().filter_map(move |&h| self.arena.get(h))
    }

    /// Identity of the parent of `identity`, if any.
    pub fn parent_of(&self, identity: &str) -> Option<&str> {
        self.get(identity)
            .and_then(|node| self.parent(node))
            .map(Node::identity)
    }

    /// Identities of the children of `identity`, in ascending start order.
    pub fn children_of(&self, identity: &str) -> Vec<&str> {
        match self.get(identity) {
            Some(node) => self.children(node).map(Node::identity).collect(),
            None => Vec::new(),
        }
    }

    /// Root nodes in ascending start order.
    pub fn roots(&self) -> impl Iterator<Item = &Node> + '_ {
        self.roots.iter().filter_map(move |&h| self.arena.get(h))
    }

    pub fn root_identities(&self) -> Vec<&str> {
        self.roots().map(Node::identity).collect()
    }

    /// All nodes in storage order (not tree order).
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.arena.iter().map(|(_, node)| node)
    }

    /// Pre-order depth-first walk over all roots.
    pub fn iter(&self) -> PreOrderIterator<'_> {
        PreOrderIterator::new(self)
    }

    /// Number of levels of the deepest tree, 0 for an empty forest.
    #[instrument(level = "debug", skip(self))]
    pub fn depth(&self) -> usize {
        self.iter().map(|(depth, _)| depth + 1).max().unwrap_or(0)
    }

    /// Addresses covered by the forest, each counted once.
    ///
    /// Roots never overlap one another, so their sizes add up to the covered
    /// space. Before a build there are no roots and nothing is covered. With
    /// tolerated overlaps, the part of a child reaching past its root is not
    /// counted.
    pub fn coverage(&self) -> Coverage {
        let addresses = self
            .roots()
            .try_fold(0u128, |acc, node| acc.checked_add(node.range().address_count()))
            .unwrap_or(u128::MAX);
        Coverage {
            family: self.family,
            blocks: self.len(),
            roots: self.roots.len(),
            addresses,
        }
    }

    fn handle(&self, identity: &str) -> DomainResult<Index> {
        self.index
            .get(identity)
            .copied()
            .ok_or_else(|| DomainError::UnknownIdentity(identity.to_string()))
    }

    fn invalidate(&mut self) {
        if self.built {
            self.reset_links();
        }
    }

    // ---- builder access ----

    pub(crate) fn handles(&self) -> Vec<Index> {
        self.arena.iter().map(|(h, _)| h).collect()
    }

    pub(crate) fn node_at(&self, handle: Index) -> &Node {
        &self.arena[handle]
    }

    pub(crate) fn reset_links(&mut self) {
        self.roots.clear();
        for (_, node) in self.arena.iter_mut() {
            node.parent = None;
            node.children.clear();
        }
        self.built = false;
    }

    pub(crate) fn link(&mut self, parent: Index, child: Index) {
        self.arena[child].parent = Some(parent);
        self.arena[parent].children.push(child);
    }

    pub(crate) fn push_root(&mut self, handle: Index) {
        self.roots.push(handle);
    }

    pub(crate) fn mark_built(&mut self) {
        self.built = true;
    }

    pub(crate) fn root_handles(&self) -> &[Index] {
        &self.roots
    }
}

/// Share of the family's address space covered by a built forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coverage {
    pub family: Option<AddressFamily>,
    pub blocks: usize,
    pub roots: usize,
    /// Saturates at `u128::MAX` when the roots tile the whole IPv6 space
    pub addresses: u128,
}

impl Coverage {
    /// Covered fraction of the family space, 0.0 for an empty forest.
    pub fn share(&self) -> f64 {
        match self.family {
            // max_value() + 1 overflows u128 for IPv6, so widen first
            Some(family) => self.addresses as f64 / (family.max_value() as f64 + 1.0),
            None => 0.0,
        }
    }
}

/// Iterative pre-order traversal yielding `(depth, node)`, roots at depth 0.
pub struct PreOrderIterator<'a> {
    forest: &'a Forest,
    stack: Vec<(Index, usize)>,
}

impl<'a> PreOrderIterator<'a> {
    fn new(forest: &'a Forest) -> Self {
        let stack = forest.roots.iter().rev().map(|&h| (h, 0)).collect();
        Self { forest, stack }
    }
}

impl<'a> Iterator for PreOrderIterator<'a> {
    type Item = (usize, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current, depth)) = self.stack.pop() {
            if let Some(node) = self.forest.arena.get(current) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.children.iter().rev() {
                    self.stack.push((child, depth + 1));
                }
                return Some((depth, node));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asn(identity: &str, start: u128, end: u128) -> Range {
        Range::spanning(identity, AddressFamily::Asn, start, end).unwrap()
    }

    #[test]
    fn given_duplicate_identity_when_inserting_then_rejects() {
        let mut forest = Forest::new();
        forest.insert(asn("a", 0, 10)).unwrap();
        let err = forest.insert(asn("a", 20, 30)).unwrap_err();
        assert_eq!(err, DomainError::DuplicateIdentity("a".into()));
        assert_eq!(forest.len(), 1);
        assert_eq!(forest.get("a").unwrap().range().start(), 0);
    }

    #[test]
    fn given_other_family_when_inserting_then_rejects() {
        let mut forest = Forest::new();
        forest.insert(asn("AS1", 1, 1)).unwrap();
        let v4 = Range::spanning("0.0.0.1/32", AddressFamily::Ipv4, 1, 1).unwrap();
        assert!(matches!(
            forest.insert(v4),
            Err(DomainError::MixedFamilies { expected: AddressFamily::Asn, .. })
        ));
    }

    #[test]
    fn given_removed_last_node_when_inserting_other_family_then_accepts() {
        let mut forest = Forest::new();
        forest.insert(asn("AS1", 1, 1)).unwrap();
        assert!(forest.remove("AS1").is_some());
        assert!(forest.family().is_none());
        let v4 = Range::spanning("0.0.0.1/32", AddressFamily::Ipv4, 1, 1).unwrap();
        forest.insert(v4).unwrap();
        assert_eq!(forest.family(), Some(AddressFamily::Ipv4));
    }

    #[test]
    fn given_unknown_identity_when_annotating_then_errors() {
        let mut forest = Forest::new();
        assert_eq!(
            forest.annotate("missing", "cc", "FR").unwrap_err(),
            DomainError::UnknownIdentity("missing".into())
        );
    }

    #[test]
    fn given_unbuilt_forest_when_querying_then_has_no_links() {
        let forest = Forest::from_ranges(vec![asn("a", 0, 10), asn("b", 2, 3)]).unwrap();
        assert!(!forest.is_built());
        assert_eq!(forest.parent_of("b"), None);
        assert!(forest.root_identities().is_empty());
        assert_eq!(forest.depth(), 0);
    }

    #[test]
    fn given_nested_blocks_when_measuring_coverage_then_counts_each_address_once() {
        let mut forest = Forest::from_ranges(vec![
            asn("AS0-AS99", 0, 99),
            asn("AS10-AS19", 10, 19),
            asn("AS12", 12, 12),
            asn("AS200-AS249", 200, 249),
        ])
        .unwrap();
        crate::domain::builder::HierarchyBuilder::new()
            .build(&mut forest)
            .unwrap();

        let coverage = forest.coverage();

        assert_eq!(coverage.blocks, 4);
        assert_eq!(coverage.roots, 2);
        assert_eq!(coverage.addresses, 150);
        assert_eq!(coverage.family, Some(AddressFamily::Asn));
        assert!((coverage.share() - 150.0 / 4_294_967_296.0).abs() < 1e-15);
    }

    #[test]
    fn given_both_ipv6_halves_when_measuring_coverage_then_saturates_at_full_space() {
        let half = 1u128 << 127;
        let mut forest = Forest::from_ranges(vec![
            Range::spanning("::/1", AddressFamily::Ipv6, 0, half - 1).unwrap(),
            Range::spanning("8000::/1", AddressFamily::Ipv6, half, u128::MAX).unwrap(),
        ])
        .unwrap();
        crate::domain::builder::HierarchyBuilder::new()
            .build(&mut forest)
            .unwrap();

        let coverage = forest.coverage();

        assert_eq!(coverage.addresses, u128::MAX);
        assert!((coverage.share() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn given_empty_forest_when_measuring_coverage_then_nothing_covered() {
        let coverage = Forest::new().coverage();
        assert_eq!(coverage.addresses, 0);
        assert_eq!(coverage.share(), 0.0);
    }
}
